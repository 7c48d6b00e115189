use actix_web::{post, web, HttpResponse};
use validator::Validate;

use crate::{
    app_state::AppState,
    errors::AppError,
    models::{
        domain::{BackendPreference, GenerationRequest},
        dto::{request::PromptRequest, response::PromptResponse},
    },
};

/// Free-text answer straight from the hosted model.
#[post("/prompt")]
async fn prompt_v1(
    state: web::Data<AppState>,
    request: web::Json<PromptRequest>,
) -> Result<HttpResponse, AppError> {
    request.validate()?;

    let fulfilled = state
        .orchestrator
        .fulfill(GenerationRequest::Prompt {
            text: request.into_inner().prompt,
            preference: BackendPreference::RemoteOnly,
        })
        .await?;

    Ok(HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .body(fulfilled.artifact.into_text()?))
}

/// Free-text answer under the local-first policy, annotated with the backend
/// that produced it.
#[post("/prompt")]
async fn prompt_v2(
    state: web::Data<AppState>,
    request: web::Json<PromptRequest>,
) -> Result<HttpResponse, AppError> {
    request.validate()?;

    let fulfilled = state
        .orchestrator
        .fulfill(GenerationRequest::Prompt {
            text: request.into_inner().prompt,
            preference: BackendPreference::Auto,
        })
        .await?;

    Ok(HttpResponse::Ok().json(PromptResponse {
        model_used: fulfilled.served_by,
        response: fulfilled.artifact.into_text()?,
    }))
}
