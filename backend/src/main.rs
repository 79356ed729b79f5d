mod config;
mod detector;
mod locator;
mod pipeline;
mod routes;
mod run;
mod scanner;
mod state;
mod templates;
mod upload;

use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use config::AppConfig;
use detector::TorchDetector;
use routes::configure_routes;
use state::AppState;
use std::env;
use std::sync::Arc;
use templates::Templates;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    if let Ok(current_dir) = env::current_dir() {
        log::info!("Current working directory: {}", current_dir.display());
    } else {
        log::error!("Failed to get the current working directory.");
    }

    let config = AppConfig::load().map_err(|e| {
        log::error!("Failed to load configuration: {}", e);
        std::io::Error::other(format!("Configuration failed: {}", e))
    })?;

    for dir in [config.paths.upload_dir(), config.paths.prediction_dir()] {
        std::fs::create_dir_all(&dir)?;
        log::info!("Using directory {}", dir.display());
    }

    let templates = Templates::load(&config.paths.template_dir).map_err(|e| {
        log::error!("Failed to load templates: {}", e);
        std::io::Error::other(format!("Template loading failed: {}", e))
    })?;

    let detector = TorchDetector::load(&config.model, &config.video).map_err(|e| {
        log::error!("Failed to preload model at startup: {}", e);
        std::io::Error::other(format!("Model loading failed: {}", e))
    })?;

    let bind_address = config.bind_address();
    let static_dir = config.paths.static_dir.clone();
    let state = web::Data::new(AppState::new(config, Arc::new(detector), templates));

    log::info!("Starting server on {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(state.clone())
            .configure(|cfg| configure_routes(cfg, static_dir.clone()))
    })
    .bind(&bind_address)?
    .run()
    .await
}
