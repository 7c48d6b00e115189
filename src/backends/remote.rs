use std::time::Duration;

use async_openai::{config::OpenAIConfig, error::OpenAIError, Client};
use async_trait::async_trait;
use backoff::ExponentialBackoffBuilder;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    backends::{BackendCapability, GenerationBackend, RawResult},
    config::Config,
    errors::{AppError, AppResult},
    models::{
        prompt::{Prompt, PromptPart},
        shape::ArtifactShape,
    },
};

/// Hosted model behind an OpenAI-compatible chat-completions endpoint. The
/// provider enforces the response schema server-side.
pub struct RemoteStructuredBackend {
    client: Client<OpenAIConfig>,
    model: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionBody {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

impl RemoteStructuredBackend {
    pub fn new(config: &Config) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(config.model_api_key.expose_secret())
            .with_api_base(config.model_api_base.as_str());

        // One attempt per request. Fallback and the request timeout are
        // decided by the orchestrator.
        let single_attempt = ExponentialBackoffBuilder::new()
            .with_max_elapsed_time(Some(Duration::ZERO))
            .build();

        Self {
            client: Client::with_config(openai_config).with_backoff(single_attempt),
            model: config.remote_model.clone(),
        }
    }

    /// Chat-completion request body. Shaped requests carry a strict
    /// `json_schema` response format.
    pub fn request_body(&self, prompt: &Prompt, shape: Option<ArtifactShape>) -> AppResult<Value> {
        let mut body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": message_content(prompt) }],
        });

        if let Some(shape) = shape {
            body["response_format"] = json!({
                "type": "json_schema",
                "json_schema": {
                    "name": shape.name(),
                    "schema": shape.strict_json_schema()?,
                    "strict": true,
                },
            });
        }

        Ok(body)
    }
}

fn message_content(prompt: &Prompt) -> Value {
    if !prompt.has_images() {
        return Value::String(prompt.flatten_text());
    }

    let parts: Vec<Value> = prompt
        .parts
        .iter()
        .map(|part| match part {
            PromptPart::Text(text) => json!({ "type": "text", "text": text }),
            PromptPart::InlineImage { mime_type, data } => json!({
                "type": "image_url",
                "image_url": {
                    "url": format!("data:{};base64,{}", mime_type, STANDARD.encode(data)),
                },
            }),
        })
        .collect();

    Value::Array(parts)
}

fn map_provider_error(err: OpenAIError) -> AppError {
    match err {
        OpenAIError::Reqwest(inner) if inner.is_timeout() => {
            AppError::BackendTimeout(format!("remote model request timed out: {}", inner))
        }
        OpenAIError::Reqwest(inner) if inner.is_connect() => {
            AppError::BackendUnavailable(format!("remote model is unreachable: {}", inner))
        }
        other => AppError::BackendError(other.to_string()),
    }
}

fn into_raw_result(body: ChatCompletionBody, shape: Option<ArtifactShape>) -> AppResult<RawResult> {
    let choice = body
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| AppError::BackendError("remote model returned no choices".to_string()))?;

    if let Some(refusal) = choice.message.refusal {
        return Err(AppError::BackendError(format!("remote model refused: {}", refusal)));
    }

    let content = choice.message.content.ok_or_else(|| {
        AppError::BackendError(format!(
            "remote model returned an empty message (finish_reason: {})",
            choice.finish_reason.as_deref().unwrap_or("unknown")
        ))
    })?;

    match shape {
        Some(shape) => serde_json::from_str(&content)
            .map(RawResult::Structured)
            .map_err(|e| {
                AppError::SchemaViolation(format!(
                    "remote model returned non-JSON content for {}: {}",
                    shape, e
                ))
            }),
        None => Ok(RawResult::Unstructured(content)),
    }
}

#[async_trait]
impl GenerationBackend for RemoteStructuredBackend {
    fn capability(&self) -> BackendCapability {
        BackendCapability::RemoteStructured
    }

    fn label(&self) -> String {
        self.model.clone()
    }

    fn is_available(&self) -> bool {
        true
    }

    fn accepts(&self, _prompt: &Prompt) -> bool {
        true
    }

    async fn warm_up(&self) -> AppResult<()> {
        Ok(())
    }

    async fn generate(
        &self,
        prompt: &Prompt,
        shape: Option<ArtifactShape>,
    ) -> AppResult<RawResult> {
        let body = self.request_body(prompt, shape)?;

        log::debug!(
            "Calling remote model {} (shape: {})",
            self.model,
            shape.map(|s| s.name()).unwrap_or("text")
        );

        let response: ChatCompletionBody = self
            .client
            .chat()
            .create_byot(body)
            .await
            .map_err(map_provider_error)?;

        into_raw_result(response, shape)
    }
}
