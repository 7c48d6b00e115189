use actix_web::{get, HttpResponse};

use crate::{models::dto::response::HealthResponse, uptime};

pub const SERVICE_NAME: &str = "service-ai";

#[get("/api/health")]
async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy",
        service: SERVICE_NAME,
        uptime: uptime::format_uptime(uptime::uptime()),
    })
}
