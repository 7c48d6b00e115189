use std::{sync::Arc, time::Duration};

use secrecy::ExposeSecret;
use uuid::Uuid;

use crate::{
    backends::{
        GenerationBackend, LlamaServerLoader, LocalUnstructuredBackend, RemoteStructuredBackend,
    },
    config::Config,
    errors::{AppError, AppResult},
    models::{
        domain::{BackendPreference, GenerationRequest},
        prompt::Prompt,
        shape::{Artifact, ArtifactShape},
    },
    services::{normalizer::Normalizer, prompt_builder},
};

/// Lifecycle of a single request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationStage {
    Idle,
    BackendSelected,
    Generating,
    Normalizing,
    Done,
    Failed,
}

impl std::fmt::Display for GenerationStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GenerationStage::Idle => write!(f, "idle"),
            GenerationStage::BackendSelected => write!(f, "backend_selected"),
            GenerationStage::Generating => write!(f, "generating"),
            GenerationStage::Normalizing => write!(f, "normalizing"),
            GenerationStage::Done => write!(f, "done"),
            GenerationStage::Failed => write!(f, "failed"),
        }
    }
}

struct StageTracker {
    trace_id: Uuid,
    stage: GenerationStage,
}

impl StageTracker {
    fn new(kind: &str) -> Self {
        let trace_id = Uuid::new_v4();
        log::debug!("[{}] {} request received", trace_id, kind);
        Self {
            trace_id,
            stage: GenerationStage::Idle,
        }
    }

    fn advance(&mut self, next: GenerationStage) {
        log::debug!("[{}] {} -> {}", self.trace_id, self.stage, next);
        self.stage = next;
    }
}

/// A backend together with the time it is given per request.
#[derive(Clone)]
pub struct BackendSlot {
    pub backend: Arc<dyn GenerationBackend>,
    pub timeout: Duration,
}

impl BackendSlot {
    pub fn new(backend: Arc<dyn GenerationBackend>, timeout: Duration) -> Self {
        Self { backend, timeout }
    }
}

/// A validated artifact and the backend that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fulfilled {
    pub artifact: Artifact,
    pub served_by: String,
}

pub struct Orchestrator {
    remote: Option<BackendSlot>,
    local: Option<BackendSlot>,
    fallback_enabled: bool,
    normalizer: Normalizer,
}

impl Orchestrator {
    pub fn new(
        remote: Option<BackendSlot>,
        local: Option<BackendSlot>,
        fallback_enabled: bool,
        normalizer: Normalizer,
    ) -> Self {
        Self {
            remote,
            local,
            fallback_enabled,
            normalizer,
        }
    }

    /// Wires the backends the configuration enables.
    pub fn from_config(config: &Config) -> Self {
        let remote = if config.model_api_key.expose_secret().is_empty() {
            log::warn!("No model API key configured, the remote backend is disabled");
            None
        } else {
            Some(BackendSlot::new(
                Arc::new(RemoteStructuredBackend::new(config)),
                config.remote_timeout(),
            ))
        };

        let local = config.local_model_path.as_ref().map(|path| {
            let loader = LlamaServerLoader::new(
                config.local_model_runner.clone(),
                path.clone(),
                config.local_model_max_tokens,
                config.local_model_startup_timeout(),
            );
            let backend = LocalUnstructuredBackend::new(loader.label(), Arc::new(loader));
            BackendSlot::new(Arc::new(backend), config.local_model_timeout())
        });

        log::info!(
            "Generation backends: remote={}, local={}, fallback={}",
            remote.as_ref().map(|s| s.backend.label()).unwrap_or_else(|| "none".to_string()),
            local.as_ref().map(|s| s.backend.label()).unwrap_or_else(|| "none".to_string()),
            config.local_fallback_enabled
        );

        Self::new(
            remote,
            local,
            config.local_fallback_enabled,
            Normalizer::new(config.strict_quiz_validation),
        )
    }

    /// Loads the local model ahead of the first request.
    pub async fn warm_up(&self) -> AppResult<()> {
        match &self.local {
            Some(slot) => slot.backend.warm_up().await,
            None => Ok(()),
        }
    }

    /// Ordered attempts for a prompt. Only the last one's failure reaches
    /// the caller.
    pub fn plan(&self, prompt: &Prompt, preference: BackendPreference) -> AppResult<Vec<BackendSlot>> {
        let mut attempts = Vec::new();

        let usable_local = self
            .local
            .as_ref()
            .filter(|slot| slot.backend.is_available() && slot.backend.accepts(prompt))
            .filter(|slot| {
                // A cold local model loads in the background while the
                // remote serves.
                if self.remote.is_none() || slot.backend.is_ready() {
                    return true;
                }
                slot.backend.start_warm_up();
                false
            });

        match (preference, usable_local) {
            (BackendPreference::Auto, Some(local)) => {
                attempts.push(local.clone());
                if self.fallback_enabled {
                    attempts.extend(self.remote.clone());
                }
            }
            _ => attempts.extend(self.remote.clone()),
        }

        if attempts.is_empty() {
            return Err(AppError::BackendUnavailable(
                "no generation backend is available for this request".to_string(),
            ));
        }
        Ok(attempts)
    }

    pub async fn fulfill(&self, request: GenerationRequest) -> AppResult<Fulfilled> {
        let mut tracker = StageTracker::new(request.kind());
        let result = self.run(request, &mut tracker).await;

        match &result {
            Ok(fulfilled) => {
                tracker.advance(GenerationStage::Done);
                log::info!(
                    "[{}] Served by {}",
                    tracker.trace_id,
                    fulfilled.served_by
                );
            }
            Err(err) => {
                tracker.advance(GenerationStage::Failed);
                log::error!("[{}] Generation failed: {}", tracker.trace_id, err);
            }
        }
        result
    }

    async fn run(
        &self,
        request: GenerationRequest,
        tracker: &mut StageTracker,
    ) -> AppResult<Fulfilled> {
        let shape = request.shape();
        let preference = request.preference();
        let base_prompt = prompt_builder::build_prompt(request)?;

        let attempts = self.plan(&base_prompt, preference)?;
        let last = attempts.len() - 1;

        let mut last_error = None;
        for (index, slot) in attempts.iter().enumerate() {
            tracker.advance(GenerationStage::BackendSelected);
            match self.attempt(slot, &base_prompt, shape, tracker).await {
                Ok(fulfilled) => return Ok(fulfilled),
                Err(err) if index < last => {
                    log::warn!(
                        "[{}] {} failed, falling back: {}",
                        tracker.trace_id,
                        slot.backend.label(),
                        err
                    );
                }
                Err(err) => last_error = Some(err),
            }
        }

        Err(last_error.unwrap_or_else(|| {
            AppError::BackendUnavailable("no generation backend produced a result".to_string())
        }))
    }

    async fn attempt(
        &self,
        slot: &BackendSlot,
        base_prompt: &Prompt,
        shape: Option<ArtifactShape>,
        tracker: &mut StageTracker,
    ) -> AppResult<Fulfilled> {
        let backend = &slot.backend;
        let label = backend.label();
        let prompt = prompt_builder::prompt_for_capability(base_prompt, shape, backend.capability())?;

        tracker.advance(GenerationStage::Generating);
        log::debug!("[{}] Generating with {}", tracker.trace_id, label);

        let raw = tokio::time::timeout(slot.timeout, backend.generate(&prompt, shape))
            .await
            .map_err(|_| {
                AppError::BackendTimeout(format!(
                    "{} did not answer within {}s",
                    label,
                    slot.timeout.as_secs_f32()
                ))
            })??;

        tracker.advance(GenerationStage::Normalizing);
        let artifact = self.normalizer.normalize(raw, shape)?;

        Ok(Fulfilled {
            artifact,
            served_by: label,
        })
    }
}
