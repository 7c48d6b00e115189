use serde::Deserialize;
use validator::Validate;

pub const DEFAULT_GENERATED_NUM: u32 = 10;
pub const MAX_GENERATED_NUM: u32 = 100;

fn default_generated_num() -> u32 {
    DEFAULT_GENERATED_NUM
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PromptRequest {
    #[validate(length(min = 1, message = "prompt must not be empty"))]
    pub prompt: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct GenerateFromNoteRequest {
    #[validate(length(min = 1, message = "note_content must not be empty"))]
    pub note_content: String,

    #[serde(default = "default_generated_num")]
    #[validate(range(min = 1, max = 100))]
    pub generated_num: u32,
}
