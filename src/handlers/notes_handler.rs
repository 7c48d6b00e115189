use actix_multipart::Multipart;
use actix_web::{post, web, HttpResponse};
use futures::TryStreamExt;
use validator::Validate;

use crate::{
    app_state::AppState,
    errors::AppError,
    models::{
        domain::GenerationRequest,
        dto::{
            request::GenerateFromNoteRequest,
            response::{DeckResponse, NoteResponse, QuizResponse},
        },
    },
};

const UNKNOWN_MIME_TYPE: &str = "application/octet-stream";

#[post("/notes/generate-quiz")]
async fn generate_quiz(
    state: web::Data<AppState>,
    request: web::Json<GenerateFromNoteRequest>,
) -> Result<HttpResponse, AppError> {
    request.validate()?;
    let request = request.into_inner();

    let fulfilled = state
        .orchestrator
        .fulfill(GenerationRequest::NoteToQuiz {
            source: request.note_content,
            count: request.generated_num,
        })
        .await?;

    Ok(HttpResponse::Ok().json(QuizResponse {
        quiz: fulfilled.artifact.into_quiz()?,
    }))
}

#[post("/notes/generate-deck")]
async fn generate_deck(
    state: web::Data<AppState>,
    request: web::Json<GenerateFromNoteRequest>,
) -> Result<HttpResponse, AppError> {
    request.validate()?;
    let request = request.into_inner();

    let fulfilled = state
        .orchestrator
        .fulfill(GenerationRequest::NoteToDeck {
            source: request.note_content,
            count: request.generated_num,
        })
        .await?;

    Ok(HttpResponse::Ok().json(DeckResponse {
        deck: fulfilled.artifact.into_deck()?,
    }))
}

/// Turns the first file of a multipart upload (PDF or image) into a note.
#[post("/notes/upload")]
async fn upload_note(
    state: web::Data<AppState>,
    mut payload: Multipart,
) -> Result<HttpResponse, AppError> {
    let mut field = payload
        .try_next()
        .await?
        .ok_or_else(|| AppError::ValidationError("No file was uploaded".to_string()))?;

    let mime_type = field
        .content_type()
        .map(|mime| mime.to_string())
        .unwrap_or_else(|| UNKNOWN_MIME_TYPE.to_string());

    let max_bytes = state.config.max_upload_bytes;
    let mut bytes = Vec::new();
    while let Some(chunk) = field.try_next().await? {
        if bytes.len() + chunk.len() > max_bytes {
            return Err(AppError::ValidationError(format!(
                "Uploaded file exceeds the {} byte limit",
                max_bytes
            )));
        }
        bytes.extend_from_slice(&chunk);
    }

    log::debug!("Received {} upload of {} bytes", mime_type, bytes.len());

    let fulfilled = state
        .orchestrator
        .fulfill(GenerationRequest::FileToNote { bytes, mime_type })
        .await?;

    Ok(HttpResponse::Ok().json(NoteResponse {
        note: fulfilled.artifact.into_note()?,
    }))
}
