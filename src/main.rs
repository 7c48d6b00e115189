use actix_web::{middleware::Logger, web, App, HttpServer};

use study_ai_service::{
    app_state::AppState, auth::GatewayKeyMiddleware, config::Config, handlers, uptime,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::from_env();

    let default_filter = if config.is_development() { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    uptime::mark_started();

    if let Err(err) = config.validate_for_production() {
        log::error!("Refusing to start: {}", err);
        return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, err.to_string()));
    }

    let host = config.web_server_host.clone();
    let port = config.web_server_port;
    let is_development = config.is_development();
    let gate = GatewayKeyMiddleware::new(&config.gateway_api_key);
    let preload = config.local_model_preload;

    let state = AppState::new(config);

    if preload {
        if let Err(err) = state.orchestrator.warm_up().await {
            log::warn!("Local model preload failed, continuing without it: {}", err);
        }
    }

    log::info!("Starting service-ai on {}:{}", host, port);

    let server = HttpServer::new(move || {
        let gate = gate.clone();
        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(Logger::default())
            .configure(|cfg| handlers::configure_routes(cfg, gate))
    });

    let server = if is_development {
        server.workers(1)
    } else {
        server
    };

    server.bind((host.as_str(), port))?.run().await
}
