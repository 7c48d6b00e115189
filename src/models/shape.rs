use schemars::{schema_for, JsonSchema};
use serde_json::Value;

use crate::{
    errors::{AppError, AppResult},
    models::domain::{Deck, MarkdownNote, Quiz},
};

/// Keywords schema-constrained providers reject in strict mode.
const STRICT_UNSUPPORTED_KEYWORDS: &[&str] = &[
    "$schema",
    "default",
    "format",
    "minLength",
    "maxLength",
    "minItems",
    "maxItems",
    "pattern",
];

/// The fixed set of structured output shapes a generation can target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArtifactShape {
    Quiz,
    Deck,
    MarkdownNote,
}

impl ArtifactShape {
    pub const ALL: [ArtifactShape; 3] = [
        ArtifactShape::Quiz,
        ArtifactShape::Deck,
        ArtifactShape::MarkdownNote,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ArtifactShape::Quiz => "Quiz",
            ArtifactShape::Deck => "Deck",
            ArtifactShape::MarkdownNote => "MarkdownNote",
        }
    }

    /// JSON Schema generated from the domain type.
    pub fn json_schema(&self) -> AppResult<Value> {
        match self {
            ArtifactShape::Quiz => schema_value::<Quiz>(),
            ArtifactShape::Deck => schema_value::<Deck>(),
            ArtifactShape::MarkdownNote => schema_value::<MarkdownNote>(),
        }
    }

    /// Schema rewritten for strict structured-output mode: every property is
    /// required, no additional properties, no validation-only keywords.
    pub fn strict_json_schema(&self) -> AppResult<Value> {
        let mut schema = self.json_schema()?;
        make_strict(&mut schema);
        Ok(schema)
    }
}

impl std::fmt::Display for ArtifactShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

fn schema_value<T: JsonSchema>() -> AppResult<Value> {
    Ok(serde_json::to_value(schema_for!(T))?)
}

fn make_strict(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for keyword in STRICT_UNSUPPORTED_KEYWORDS {
                map.remove(*keyword);
            }

            let property_names: Option<Vec<Value>> = map
                .get("properties")
                .and_then(Value::as_object)
                .map(|props| props.keys().cloned().map(Value::String).collect());

            if let Some(names) = property_names {
                map.insert("required".to_string(), Value::Array(names));
                map.insert("additionalProperties".to_string(), Value::Bool(false));
            }

            for (key, child) in map.iter_mut() {
                // property names are user keys, not schema keywords
                if key == "properties" || key == "$defs" || key == "definitions" {
                    if let Value::Object(entries) = child {
                        entries.values_mut().for_each(make_strict);
                    }
                } else {
                    make_strict(child);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(make_strict),
        _ => {}
    }
}

/// A fully validated generation result.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Artifact {
    Quiz(Quiz),
    Deck(Deck),
    Note(MarkdownNote),
    Text(String),
}

impl Artifact {
    pub fn shape(&self) -> Option<ArtifactShape> {
        match self {
            Artifact::Quiz(_) => Some(ArtifactShape::Quiz),
            Artifact::Deck(_) => Some(ArtifactShape::Deck),
            Artifact::Note(_) => Some(ArtifactShape::MarkdownNote),
            Artifact::Text(_) => None,
        }
    }

    pub fn into_quiz(self) -> AppResult<Quiz> {
        match self {
            Artifact::Quiz(quiz) => Ok(quiz),
            other => Err(mismatch("Quiz", &other)),
        }
    }

    pub fn into_deck(self) -> AppResult<Deck> {
        match self {
            Artifact::Deck(deck) => Ok(deck),
            other => Err(mismatch("Deck", &other)),
        }
    }

    pub fn into_note(self) -> AppResult<MarkdownNote> {
        match self {
            Artifact::Note(note) => Ok(note),
            other => Err(mismatch("MarkdownNote", &other)),
        }
    }

    pub fn into_text(self) -> AppResult<String> {
        match self {
            Artifact::Text(text) => Ok(text),
            other => Err(mismatch("text", &other)),
        }
    }
}

fn mismatch(expected: &str, got: &Artifact) -> AppError {
    let got = got.shape().map(|s| s.name()).unwrap_or("text");
    AppError::InternalError(format!("expected a {} artifact, got {}", expected, got))
}
