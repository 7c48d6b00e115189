use std::{
    fs::File,
    io::Read,
    net::TcpListener,
    panic::{catch_unwind, AssertUnwindSafe},
    path::{Path, PathBuf},
    process::{Child, Command, Stdio},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot, OnceCell};

use crate::{
    backends::{BackendCapability, GenerationBackend, RawResult},
    errors::{AppError, AppResult},
    models::{prompt::Prompt, shape::ArtifactShape},
};

const GGUF_MAGIC: &[u8; 4] = b"GGUF";
const HEALTH_POLL_INTERVAL: Duration = Duration::from_millis(250);
const COMPLETION_REQUEST_TIMEOUT: Duration = Duration::from_secs(300);
/// A loaded local model. `generate` blocks the calling thread.
pub trait LocalModel: Send {
    fn name(&self) -> &str;
    fn generate(&mut self, prompt: &str) -> AppResult<String>;
}

/// Produces a [`LocalModel`]. Loading is blocking and may be slow.
pub trait ModelLoader: Send + Sync {
    fn load(&self) -> AppResult<Box<dyn LocalModel>>;
}

struct GenerationJob {
    prompt: String,
    reply: oneshot::Sender<AppResult<String>>,
}

/// Queue in front of the single thread that owns the model.
struct ModelWorker {
    jobs: mpsc::UnboundedSender<GenerationJob>,
}

impl ModelWorker {
    fn spawn(model: Box<dyn LocalModel>) -> AppResult<Self> {
        let (jobs, queue) = mpsc::unbounded_channel();

        std::thread::Builder::new()
            .name("local-model".to_string())
            .spawn(move || run_worker(model, queue))
            .map_err(|e| {
                AppError::BackendUnavailable(format!("failed to start local model worker: {}", e))
            })?;

        Ok(Self { jobs })
    }
}

fn run_worker(mut model: Box<dyn LocalModel>, mut queue: mpsc::UnboundedReceiver<GenerationJob>) {
    log::info!("Local model worker started for {}", model.name());

    while let Some(job) = queue.blocking_recv() {
        // The caller timed out or disconnected while the job was queued.
        if job.reply.is_closed() {
            log::debug!("Skipping abandoned local generation job");
            continue;
        }

        let result = catch_unwind(AssertUnwindSafe(|| model.generate(&job.prompt)))
            .unwrap_or_else(|_| {
                Err(AppError::BackendError("local model panicked during generation".to_string()))
            });

        if job.reply.send(result).is_err() {
            log::debug!("Local generation finished after its caller went away");
        }
    }

    log::info!("Local model worker stopped");
}

/// Shared with the detached load task.
struct LocalState {
    label: String,
    loader: Arc<dyn ModelLoader>,
    worker: OnceCell<ModelWorker>,
    load_failed: AtomicBool,
    loading_in_background: AtomicBool,
}

impl LocalState {
    async fn load(&self) -> AppResult<()> {
        self.worker
            .get_or_try_init(|| async {
                log::info!("Loading local model {}", self.label);
                let loader = Arc::clone(&self.loader);
                let worker =
                    tokio::task::spawn_blocking(move || loader.load().and_then(ModelWorker::spawn))
                        .await
                        .map_err(|e| {
                            AppError::BackendUnavailable(format!(
                                "local model loader crashed: {}",
                                e
                            ))
                        })??;
                log::info!("Local model {} loaded", self.label);
                Ok(worker)
            })
            .await
            .map(|_| ())
            .map_err(|err| {
                log::error!("Failed to load local model {}: {}", self.label, err);
                self.load_failed.store(true, Ordering::SeqCst);
                err
            })
    }
}

/// Locally loaded model emitting free text. The model is loaded at most once
/// and then serves every request through one worker. Loading runs on its own
/// task, so a caller that stops waiting does not abandon it.
pub struct LocalUnstructuredBackend {
    state: Arc<LocalState>,
}

impl LocalUnstructuredBackend {
    pub fn new(label: impl Into<String>, loader: Arc<dyn ModelLoader>) -> Self {
        Self {
            state: Arc::new(LocalState {
                label: label.into(),
                loader,
                worker: OnceCell::new(),
                load_failed: AtomicBool::new(false),
                loading_in_background: AtomicBool::new(false),
            }),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.state.worker.initialized()
    }

    async fn worker(&self) -> AppResult<&ModelWorker> {
        if let Some(worker) = self.state.worker.get() {
            return Ok(worker);
        }

        let state = Arc::clone(&self.state);
        tokio::spawn(async move { state.load().await })
            .await
            .map_err(|e| AppError::BackendUnavailable(format!("local model load task failed: {}", e)))??;

        self.state
            .worker
            .get()
            .ok_or_else(|| AppError::BackendUnavailable("local model is not loaded".to_string()))
    }
}

#[async_trait]
impl GenerationBackend for LocalUnstructuredBackend {
    fn capability(&self) -> BackendCapability {
        BackendCapability::LocalUnstructured
    }

    fn label(&self) -> String {
        self.state.label.clone()
    }

    fn is_available(&self) -> bool {
        !self.state.load_failed.load(Ordering::SeqCst)
    }

    fn accepts(&self, prompt: &Prompt) -> bool {
        !prompt.has_images()
    }

    fn is_ready(&self) -> bool {
        self.is_loaded()
    }

    fn start_warm_up(&self) {
        if self.is_loaded() || !self.is_available() {
            return;
        }
        if self.state.loading_in_background.swap(true, Ordering::SeqCst) {
            return;
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            self.state.loading_in_background.store(false, Ordering::SeqCst);
            log::warn!("No async runtime to load local model {} on", self.state.label);
            return;
        };

        let state = Arc::clone(&self.state);
        runtime.spawn(async move {
            // Failures are logged and recorded by `load`.
            let _ = state.load().await;
            state.loading_in_background.store(false, Ordering::SeqCst);
        });
    }

    async fn warm_up(&self) -> AppResult<()> {
        self.worker().await.map(|_| ())
    }

    async fn generate(
        &self,
        prompt: &Prompt,
        _shape: Option<ArtifactShape>,
    ) -> AppResult<RawResult> {
        if !self.accepts(prompt) {
            return Err(AppError::BackendError(
                "local model cannot take image input".to_string(),
            ));
        }

        let worker = self.worker().await?;
        let (reply, response) = oneshot::channel();
        worker
            .jobs
            .send(GenerationJob {
                prompt: prompt.flatten_text(),
                reply,
            })
            .map_err(|_| AppError::BackendUnavailable("local model worker has stopped".to_string()))?;

        let text = response.await.map_err(|_| {
            AppError::BackendError("local model worker dropped the request".to_string())
        })??;

        Ok(RawResult::Unstructured(text))
    }
}

/// Starts a llama.cpp `llama-server` process for a GGUF model file. The
/// process holds the weights for as long as the model is alive.
pub struct LlamaServerLoader {
    runner: String,
    model_path: PathBuf,
    max_tokens: u32,
    startup_timeout: Duration,
}

impl LlamaServerLoader {
    pub fn new(
        runner: impl Into<String>,
        model_path: impl Into<PathBuf>,
        max_tokens: u32,
        startup_timeout: Duration,
    ) -> Self {
        Self {
            runner: runner.into(),
            model_path: model_path.into(),
            max_tokens,
            startup_timeout,
        }
    }

    /// Label derived from the model file name.
    pub fn label(&self) -> String {
        let stem = self
            .model_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("model");
        format!("local:{}", stem)
    }

    fn spawn_server(&self, port: u16) -> AppResult<Child> {
        Command::new(&self.runner)
            .arg("--model")
            .arg(&self.model_path)
            .arg("--host")
            .arg("127.0.0.1")
            .arg("--port")
            .arg(port.to_string())
            .arg("--n-predict")
            .arg(self.max_tokens.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                AppError::BackendUnavailable(format!(
                    "cannot start local model runner '{}': {}",
                    self.runner, e
                ))
            })
    }

    fn wait_until_healthy(&self, child: &mut Child, client: &CompletionClient) -> AppResult<()> {
        let deadline = Instant::now() + self.startup_timeout;

        loop {
            if let Ok(Some(status)) = child.try_wait() {
                return Err(AppError::BackendUnavailable(format!(
                    "local model runner '{}' exited with {} while loading",
                    self.runner, status
                )));
            }
            if client.is_healthy() {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(AppError::BackendUnavailable(format!(
                    "local model runner did not become ready within {}s",
                    self.startup_timeout.as_secs()
                )));
            }
            std::thread::sleep(HEALTH_POLL_INTERVAL);
        }
    }
}

fn check_gguf(path: &Path) -> AppResult<()> {
    let unavailable = |reason: String| {
        AppError::BackendUnavailable(format!("local model {}: {}", path.display(), reason))
    };

    let mut file = File::open(path).map_err(|e| unavailable(e.to_string()))?;
    let mut magic = [0u8; 4];
    file.read_exact(&mut magic)
        .map_err(|e| unavailable(format!("unreadable header: {}", e)))?;

    if &magic != GGUF_MAGIC {
        return Err(unavailable("not a GGUF model file".to_string()));
    }
    Ok(())
}

fn free_local_port() -> AppResult<u16> {
    TcpListener::bind(("127.0.0.1", 0))
        .and_then(|listener| listener.local_addr())
        .map(|addr| addr.port())
        .map_err(|e| AppError::BackendUnavailable(format!("no free port for local model: {}", e)))
}

impl ModelLoader for LlamaServerLoader {
    fn load(&self) -> AppResult<Box<dyn LocalModel>> {
        check_gguf(&self.model_path)?;

        let port = free_local_port()?;
        let client = CompletionClient::new(format!("http://127.0.0.1:{}", port), self.max_tokens)?;
        let mut child = self.spawn_server(port)?;

        if let Err(err) = self.wait_until_healthy(&mut child, &client) {
            stop_server(&mut child);
            return Err(err);
        }

        log::info!(
            "Local model {} served by {} on port {}",
            self.model_path.display(),
            self.runner,
            port
        );

        Ok(Box::new(LlamaServerModel {
            name: self.label(),
            server: child,
            client,
        }))
    }
}

fn stop_server(child: &mut Child) {
    if let Err(e) = child.kill() {
        log::debug!("Local model runner already stopped: {}", e);
    }
    let _ = child.wait();
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    prompt: &'a str,
    n_predict: u32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    content: String,
}

/// Blocking client for a llama-server HTTP endpoint.
struct CompletionClient {
    http: reqwest::blocking::Client,
    base_url: String,
    max_tokens: u32,
}

impl CompletionClient {
    fn new(base_url: String, max_tokens: u32) -> AppResult<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(COMPLETION_REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AppError::BackendUnavailable(format!("local model client: {}", e)))?;

        Ok(Self {
            http,
            base_url,
            max_tokens,
        })
    }

    fn is_healthy(&self) -> bool {
        self.http
            .get(format!("{}/health", self.base_url))
            .timeout(HEALTH_POLL_INTERVAL * 4)
            .send()
            .map(|response| response.status().is_success())
            .unwrap_or(false)
    }

    fn complete(&self, prompt: &str) -> AppResult<String> {
        let response = self
            .http
            .post(format!("{}/completion", self.base_url))
            .json(&CompletionRequest {
                prompt,
                n_predict: self.max_tokens,
            })
            .send()
            .map_err(|e| AppError::BackendError(format!("local model request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(AppError::BackendError(format!(
                "local model returned HTTP {}: {}",
                status, body
            )));
        }

        response
            .json::<CompletionResponse>()
            .map(|body| body.content)
            .map_err(|e| AppError::BackendError(format!("unreadable local model response: {}", e)))
    }
}

struct LlamaServerModel {
    name: String,
    server: Child,
    client: CompletionClient,
}

impl LocalModel for LlamaServerModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn generate(&mut self, prompt: &str) -> AppResult<String> {
        if let Ok(Some(status)) = self.server.try_wait() {
            return Err(AppError::BackendUnavailable(format!(
                "local model runner exited with {}",
                status
            )));
        }
        self.client.complete(prompt)
    }
}

impl Drop for LlamaServerModel {
    fn drop(&mut self) {
        log::info!("Stopping local model runner for {}", self.name);
        stop_server(&mut self.server);
    }
}
