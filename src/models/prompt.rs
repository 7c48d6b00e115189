/// One ordered piece of the instruction sent to a backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PromptPart {
    Text(String),
    InlineImage { mime_type: String, data: Vec<u8> },
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Prompt {
    pub parts: Vec<PromptPart>,
}

impl Prompt {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            parts: vec![PromptPart::Text(text.into())],
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.parts.push(PromptPart::Text(text.into()));
        self
    }

    pub fn with_image(mut self, mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        self.parts.push(PromptPart::InlineImage {
            mime_type: mime_type.into(),
            data,
        });
        self
    }

    pub fn has_images(&self) -> bool {
        self.parts
            .iter()
            .any(|p| matches!(p, PromptPart::InlineImage { .. }))
    }

    /// Text parts joined by blank lines. Image parts are skipped.
    pub fn flatten_text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                PromptPart::Text(text) => Some(text.as_str()),
                PromptPart::InlineImage { .. } => None,
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}
