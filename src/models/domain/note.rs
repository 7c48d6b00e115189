use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize, Validate, JsonSchema)]
pub struct MarkdownNote {
    #[validate(length(min = 1))]
    pub title: String,
    pub content: String, // markdown
}
