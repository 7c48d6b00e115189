use crate::models::shape::ArtifactShape;

/// Which backends a request may be served by.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendPreference {
    /// Orchestrator policy: local first when usable, remote otherwise.
    Auto,
    /// Straight to the hosted model, never the local one.
    RemoteOnly,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GenerationRequest {
    Prompt {
        text: String,
        preference: BackendPreference,
    },
    NoteToQuiz {
        source: String,
        count: u32,
    },
    NoteToDeck {
        source: String,
        count: u32,
    },
    FileToNote {
        bytes: Vec<u8>,
        mime_type: String,
    },
}

impl GenerationRequest {
    /// Target shape of the request; `None` means free text.
    pub fn shape(&self) -> Option<ArtifactShape> {
        match self {
            GenerationRequest::Prompt { .. } => None,
            GenerationRequest::NoteToQuiz { .. } => Some(ArtifactShape::Quiz),
            GenerationRequest::NoteToDeck { .. } => Some(ArtifactShape::Deck),
            GenerationRequest::FileToNote { .. } => Some(ArtifactShape::MarkdownNote),
        }
    }

    pub fn preference(&self) -> BackendPreference {
        match self {
            GenerationRequest::Prompt { preference, .. } => *preference,
            _ => BackendPreference::Auto,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            GenerationRequest::Prompt { .. } => "prompt",
            GenerationRequest::NoteToQuiz { .. } => "note_to_quiz",
            GenerationRequest::NoteToDeck { .. } => "note_to_deck",
            GenerationRequest::FileToNote { .. } => "file_to_note",
        }
    }
}
