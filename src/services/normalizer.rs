use serde::de::DeserializeOwned;
use serde_json::Value;
use validator::Validate;

use crate::{
    backends::RawResult,
    errors::{AppError, AppResult},
    models::{
        domain::{Deck, MarkdownNote, Quiz},
        shape::{Artifact, ArtifactShape},
    },
};

/// Turns backend output into a validated artifact of the requested shape.
#[derive(Clone, Debug, Default)]
pub struct Normalizer {
    strict_quiz_validation: bool,
}

impl Normalizer {
    pub fn new(strict_quiz_validation: bool) -> Self {
        Self {
            strict_quiz_validation,
        }
    }

    pub fn normalize(&self, raw: RawResult, shape: Option<ArtifactShape>) -> AppResult<Artifact> {
        let Some(shape) = shape else {
            return Ok(match raw {
                RawResult::Structured(value) => Artifact::Text(value.to_string()),
                RawResult::Unstructured(text) => Artifact::Text(text),
            });
        };

        match raw {
            RawResult::Structured(value) => self.parse_artifact(value, shape).map_err(|e| match e {
                AppError::MalformedOutput { reason, .. } => AppError::SchemaViolation(reason),
                other => other,
            }),
            RawResult::Unstructured(text) => {
                let value = extract_json_payload(&text)?;
                self.parse_artifact(value, shape).map_err(|e| match e {
                    AppError::MalformedOutput { reason, .. } => AppError::malformed(reason, text),
                    other => other,
                })
            }
        }
    }

    fn parse_artifact(&self, value: Value, shape: ArtifactShape) -> AppResult<Artifact> {
        match shape {
            ArtifactShape::Quiz => {
                let quiz: Quiz = parse_shape(value, shape)?;
                self.check_quiz(&quiz)?;
                Ok(Artifact::Quiz(quiz))
            }
            ArtifactShape::Deck => parse_shape::<Deck>(value, shape).map(Artifact::Deck),
            ArtifactShape::MarkdownNote => {
                parse_shape::<MarkdownNote>(value, shape).map(Artifact::Note)
            }
        }
    }

    fn check_quiz(&self, quiz: &Quiz) -> AppResult<()> {
        let issues = quiz.quality_issues();
        if issues.is_empty() {
            return Ok(());
        }

        if self.strict_quiz_validation {
            return Err(AppError::SchemaViolation(issues.join("; ")));
        }

        for issue in &issues {
            log::warn!("Quiz \"{}\" {}", quiz.title, issue);
        }
        Ok(())
    }
}

fn parse_shape<T>(value: Value, shape: ArtifactShape) -> AppResult<T>
where
    T: DeserializeOwned + Validate,
{
    // Reported as MalformedOutput here; the caller decides the final kind.
    let parsed: T = serde_json::from_value(value)
        .map_err(|e| AppError::malformed(format!("output is not a valid {}: {}", shape, e), ""))?;

    parsed
        .validate()
        .map_err(|e| AppError::SchemaViolation(format!("{} failed validation: {}", shape, e)))?;

    Ok(parsed)
}

/// Recovers a JSON value from free text. Tries the span from the first `{`
/// to the last `}`, then the whole trimmed text.
pub fn extract_json_payload(text: &str) -> AppResult<Value> {
    let trimmed = text.trim();

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            if let Ok(value) = serde_json::from_str(&trimmed[start..=end]) {
                return Ok(value);
            }
        }
    }

    serde_json::from_str(trimmed)
        .map_err(|e| AppError::malformed(format!("no parseable JSON in model output: {}", e), text))
}
