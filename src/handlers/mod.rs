pub mod health_handler;
pub mod notes_handler;
pub mod prompt_handler;

use actix_web::web;

use crate::{auth::GatewayKeyMiddleware, errors::AppError};

pub use health_handler::health_check;
pub use notes_handler::{generate_deck, generate_quiz, upload_note};
pub use prompt_handler::{prompt_v1, prompt_v2};

/// Registers every route. Everything under `/api/v1` and `/api/v2` sits
/// behind the gateway key check; health does not.
pub fn configure_routes(cfg: &mut web::ServiceConfig, gate: GatewayKeyMiddleware) {
    cfg.app_data(json_config())
        .service(health_check)
        .service(
            web::scope("/api/v1")
                .wrap(gate.clone())
                .service(prompt_v1)
                .service(generate_quiz)
                .service(generate_deck)
                .service(upload_note),
        )
        .service(web::scope("/api/v2").wrap(gate).service(prompt_v2));
}

fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        AppError::ValidationError(format!("Invalid request body: {}", err)).into()
    })
}
