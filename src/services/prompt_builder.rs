use crate::{
    backends::BackendCapability,
    constants::prompts::{
        DECK_CARD_RULES, DECK_PROMPT_HEADER, JSON_ONLY_INSTRUCTION, NOTE_PROMPT,
        QUIZ_PROMPT_HEADER, QUIZ_QUESTION_RULES, SOURCE_LABEL,
    },
    errors::AppResult,
    models::{domain::GenerationRequest, prompt::Prompt, shape::ArtifactShape},
    services::file_ingestion::{self, SourceMaterial},
};

/// Instruction for a request, independent of the backend that will serve it.
/// Uploads are ingested here, so unsupported or unreadable files fail before
/// any backend is contacted.
pub fn build_prompt(request: GenerationRequest) -> AppResult<Prompt> {
    match request {
        GenerationRequest::Prompt { text, .. } => Ok(Prompt::text(text)),
        GenerationRequest::NoteToQuiz { source, count } => Ok(build_quiz_prompt(&source, count)),
        GenerationRequest::NoteToDeck { source, count } => Ok(build_deck_prompt(&source, count)),
        GenerationRequest::FileToNote { bytes, mime_type } => {
            let material = file_ingestion::extract_source(bytes, &mime_type)?;
            Ok(build_note_prompt(material))
        }
    }
}

/// Specializes a prompt for the backend about to receive it.
pub fn prompt_for_capability(
    prompt: &Prompt,
    shape: Option<ArtifactShape>,
    capability: BackendCapability,
) -> AppResult<Prompt> {
    match (capability, shape) {
        (BackendCapability::LocalUnstructured, Some(shape)) => {
            with_shape_description(prompt.clone(), shape)
        }
        _ => Ok(prompt.clone()),
    }
}

pub fn build_quiz_prompt(source: &str, count: u32) -> Prompt {
    Prompt::text(format!(
        "{QUIZ_PROMPT_HEADER}\n{SOURCE_LABEL}\n{source}\n\nGenerate {count} questions.\n{QUIZ_QUESTION_RULES}"
    ))
}

pub fn build_deck_prompt(source: &str, count: u32) -> Prompt {
    Prompt::text(format!(
        "{DECK_PROMPT_HEADER}\n{SOURCE_LABEL}\n{source}\n\nGenerate {count} flashcards.\n{DECK_CARD_RULES}"
    ))
}

/// The note instruction followed by the extracted text or the inline image.
pub fn build_note_prompt(material: SourceMaterial) -> Prompt {
    let prompt = Prompt::text(NOTE_PROMPT);
    match material {
        SourceMaterial::Text(text) => prompt.with_text(text),
        SourceMaterial::Image { mime_type, data } => prompt.with_image(mime_type, data),
    }
}

/// Adds an inline description of the target shape for backends without
/// native schema support.
pub fn with_shape_description(prompt: Prompt, shape: ArtifactShape) -> AppResult<Prompt> {
    let schema = serde_json::to_string_pretty(&shape.json_schema()?)?;
    Ok(prompt.with_text(format!(
        "{JSON_ONLY_INSTRUCTION}\nThe object is a {}.\n{schema}",
        shape.name()
    )))
}
