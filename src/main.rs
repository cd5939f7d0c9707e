// src/main.rs
mod composer;
mod config;
mod handlers;
mod models;
mod probe;
mod storage;
mod text;
mod utils;

use actix_web::{web, App, HttpServer};
use composer::Composer;
use config::Config;
use env_logger::Env;
use log::{error, info, warn};
use probe::JavaProber;
use std::io::ErrorKind;
use std::sync::Arc;
use storage::memory::ServerStorage;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();

    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let config = Config::from_env();

    let storage = Arc::new(ServerStorage::new());
    match storage.load_file(&config.catalog_path) {
        Ok(count) => info!("Loaded {} servers from {} ({} unique)", count, config.catalog_path, storage.len()),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            warn!("Catalog {} not found, starting empty", config.catalog_path);
        }
        Err(e) => {
            error!("Failed to load catalog {}: {}", config.catalog_path, e);
            return Err(e);
        }
    }

    let prober = Arc::new(JavaProber::new(config.probe_timeout(), config.probe_protocol_version));
    let composer = web::Data::new(Composer::new(storage, prober, config.palette));

    let bind = config.bind();
    info!("Starting server on {}", bind);
    HttpServer::new(move || {
        App::new()
            .app_data(composer.clone())
            .app_data(web::JsonConfig::default().error_handler(utils::json_error_handler))
            .route("/", web::get().to(handlers::index::index))
            .route("/card", web::post().to(handlers::card::get_card))
            .route("/card/navigate", web::post().to(handlers::card::navigate))
    })
        .bind(&bind)?
        .run().await
}
