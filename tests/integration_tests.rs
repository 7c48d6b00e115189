use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use actix_web::{http::StatusCode, test, web, App};
use async_trait::async_trait;
use secrecy::SecretString;
use serde_json::json;

use study_ai_service::{
    app_state::AppState,
    auth::{GatewayKeyMiddleware, DIRECT_ACCESS_MESSAGE, GATEWAY_KEY_HEADER},
    backends::{BackendCapability, GenerationBackend, RawResult},
    config::{Config, Environment},
    errors::AppResult,
    handlers::configure_routes,
    models::{prompt::Prompt, shape::ArtifactShape},
    services::{BackendSlot, Normalizer, Orchestrator},
};

const GATEWAY_KEY: &str = "integration-gateway-key";

fn config() -> Config {
    Config {
        environment: Environment::Development,
        web_server_host: "127.0.0.1".to_string(),
        web_server_port: 0,
        gateway_api_key: SecretString::from(GATEWAY_KEY.to_string()),
        model_api_key: SecretString::from("unused".to_string()),
        model_api_base: "http://127.0.0.1:9".to_string(),
        remote_model: "fake".to_string(),
        remote_timeout_secs: 5,
        local_model_path: None,
        local_model_runner: "llama-server".to_string(),
        local_model_max_tokens: 64,
        local_model_timeout_secs: 1,
        local_model_startup_secs: 5,
        local_model_preload: false,
        local_fallback_enabled: false,
        strict_quiz_validation: false,
        max_upload_bytes: 1024 * 1024,
    }
}

/// Remote stand-in that records how often it was reached.
struct RecordingBackend {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl GenerationBackend for RecordingBackend {
    fn capability(&self) -> BackendCapability {
        BackendCapability::RemoteStructured
    }

    fn label(&self) -> String {
        "gemini-fake".to_string()
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
        _prompt: &Prompt,
        shape: Option<ArtifactShape>,
    ) -> AppResult<RawResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(match shape {
            Some(ArtifactShape::Quiz) => RawResult::Structured(json!({
                "title": "Planets",
                "questions": [{
                    "text": "Mercury is the closest planet to the sun.",
                    "type": "true-false",
                    "boolean_answer": true
                }]
            })),
            Some(ArtifactShape::Deck) => RawResult::Structured(json!({
                "title": "Planets",
                "cards": [{ "front": "Largest planet", "back": "Jupiter" }]
            })),
            Some(ArtifactShape::MarkdownNote) => RawResult::Structured(json!({
                "title": "Planets",
                "content": "# Planets"
            })),
            None => RawResult::Unstructured("Mercury".to_string()),
        })
    }
}

fn state(calls: Arc<AtomicUsize>) -> AppState {
    let orchestrator = Orchestrator::new(
        Some(BackendSlot::new(
            Arc::new(RecordingBackend { calls }),
            Duration::from_secs(5),
        )),
        None,
        false,
        Normalizer::default(),
    );
    AppState::with_orchestrator(config(), orchestrator)
}

macro_rules! app {
    ($calls:expr) => {{
        let state = state($calls);
        let gate = GatewayKeyMiddleware::new(&state.config.gateway_api_key);
        test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(|cfg| configure_routes(cfg, gate)),
        )
        .await
    }};
}

fn multipart(content_type: &str, body: &[u8]) -> (String, Vec<u8>) {
    let boundary = "----studyaiboundary";
    let mut payload = format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"upload\"\r\nContent-Type: {content_type}\r\n\r\n"
    )
    .into_bytes();
    payload.extend_from_slice(body);
    payload.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    (format!("multipart/form-data; boundary={boundary}"), payload)
}

#[actix_web::test]
async fn missing_gateway_key_is_forbidden_before_generation() {
    let calls = Arc::new(AtomicUsize::new(0));
    let app = app!(calls.clone());

    let req = test::TestRequest::post()
        .uri("/api/v1/notes/generate-quiz")
        .set_json(json!({ "note_content": "# Planets" }))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["detail"], DIRECT_ACCESS_MESSAGE);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[actix_web::test]
async fn v2_routes_are_gated_too() {
    let calls = Arc::new(AtomicUsize::new(0));
    let app = app!(calls.clone());

    let req = test::TestRequest::post()
        .uri("/api/v2/prompt")
        .insert_header((GATEWAY_KEY_HEADER, "wrong"))
        .set_json(json!({ "prompt": "hi" }))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[actix_web::test]
async fn health_is_open_without_gateway_key() {
    let app = app!(Arc::new(AtomicUsize::new(0)));

    let req = test::TestRequest::get().uri("/api/health").to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "service-ai");
}

#[actix_web::test]
async fn plain_text_upload_is_rejected_naming_the_type() {
    let calls = Arc::new(AtomicUsize::new(0));
    let app = app!(calls.clone());
    let (content_type, payload) = multipart("text/plain", b"just some notes");

    let req = test::TestRequest::post()
        .uri("/api/v1/notes/upload")
        .insert_header((GATEWAY_KEY_HEADER, GATEWAY_KEY))
        .insert_header(("content-type", content_type))
        .set_payload(payload)
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert!(body["detail"].as_str().unwrap().contains("text/plain"));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[actix_web::test]
async fn corrupt_pdf_upload_is_a_processing_error() {
    let app = app!(Arc::new(AtomicUsize::new(0)));
    let (content_type, payload) = multipart("application/pdf", b"%PDF-1.4 not really");

    let req = test::TestRequest::post()
        .uri("/api/v1/notes/upload")
        .insert_header((GATEWAY_KEY_HEADER, GATEWAY_KEY))
        .insert_header(("content-type", content_type))
        .set_payload(payload)
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "FILE_PROCESSING_ERROR");
}

#[actix_web::test]
async fn generate_quiz_returns_quiz_envelope() {
    let calls = Arc::new(AtomicUsize::new(0));
    let app = app!(calls.clone());

    let req = test::TestRequest::post()
        .uri("/api/v1/notes/generate-quiz")
        .insert_header((GATEWAY_KEY_HEADER, GATEWAY_KEY))
        .set_json(json!({ "note_content": "# Planets", "generated_num": 1 }))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["quiz"]["title"], "Planets");
    assert_eq!(body["quiz"]["questions"][0]["type"], "true-false");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[actix_web::test]
async fn generate_deck_returns_deck_envelope() {
    let app = app!(Arc::new(AtomicUsize::new(0)));

    let req = test::TestRequest::post()
        .uri("/api/v1/notes/generate-deck")
        .insert_header((GATEWAY_KEY_HEADER, GATEWAY_KEY))
        .set_json(json!({ "note_content": "# Planets" }))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["deck"]["cards"][0]["back"], "Jupiter");
}

#[actix_web::test]
async fn v1_prompt_returns_plain_text() {
    let app = app!(Arc::new(AtomicUsize::new(0)));

    let req = test::TestRequest::post()
        .uri("/api/v1/prompt")
        .insert_header((GATEWAY_KEY_HEADER, GATEWAY_KEY))
        .set_json(json!({ "prompt": "Closest planet to the sun?" }))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body = test::read_body(resp).await;
    assert_eq!(body, "Mercury");
}

#[actix_web::test]
async fn v2_prompt_reports_the_serving_model() {
    let app = app!(Arc::new(AtomicUsize::new(0)));

    let req = test::TestRequest::post()
        .uri("/api/v2/prompt")
        .insert_header((GATEWAY_KEY_HEADER, GATEWAY_KEY))
        .set_json(json!({ "prompt": "Closest planet to the sun?" }))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["response"], "Mercury");
    assert_eq!(body["model_used"], "gemini-fake");
}

#[actix_web::test]
async fn empty_prompt_is_a_validation_error() {
    let calls = Arc::new(AtomicUsize::new(0));
    let app = app!(calls.clone());

    let req = test::TestRequest::post()
        .uri("/api/v2/prompt")
        .insert_header((GATEWAY_KEY_HEADER, GATEWAY_KEY))
        .set_json(json!({ "prompt": "" }))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}
