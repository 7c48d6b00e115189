use serde::Serialize;

use crate::models::domain::{Deck, MarkdownNote, Quiz};

#[derive(Debug, Serialize)]
pub struct QuizResponse {
    pub quiz: Quiz,
}

#[derive(Debug, Serialize)]
pub struct DeckResponse {
    pub deck: Deck,
}

#[derive(Debug, Serialize)]
pub struct NoteResponse {
    pub note: MarkdownNote,
}

#[derive(Debug, Serialize)]
pub struct PromptResponse {
    pub response: String,
    pub model_used: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub uptime: String,
}
