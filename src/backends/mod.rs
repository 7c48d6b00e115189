pub mod local;
pub mod remote;

use async_trait::async_trait;
use serde_json::Value;

use crate::{
    errors::AppResult,
    models::{prompt::Prompt, shape::ArtifactShape},
};

pub use local::{LlamaServerLoader, LocalModel, LocalUnstructuredBackend, ModelLoader};
pub use remote::RemoteStructuredBackend;

/// Output of a backend before normalization.
#[derive(Clone, Debug, PartialEq)]
pub enum RawResult {
    /// Already shaped by the provider.
    Structured(Value),
    /// Free text that may wrap a JSON payload.
    Unstructured(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendCapability {
    RemoteStructured,
    LocalUnstructured,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    fn capability(&self) -> BackendCapability;

    /// Reported to callers as the backend that served a request.
    fn label(&self) -> String;

    /// False once the backend is known to be unusable for this process.
    fn is_available(&self) -> bool;

    fn accepts(&self, prompt: &Prompt) -> bool;

    /// True when a request would not first wait on initialization.
    fn is_ready(&self) -> bool {
        true
    }

    /// Starts initialization in the background and returns immediately.
    fn start_warm_up(&self) {}

    /// Performs any one-time initialization ahead of the first request.
    async fn warm_up(&self) -> AppResult<()>;

    async fn generate(&self, prompt: &Prompt, shape: Option<ArtifactShape>)
        -> AppResult<RawResult>;
}
