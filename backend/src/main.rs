mod bootstrap;
mod config;
mod error;
mod expiry;
mod freshness;
mod imaging;
mod ocr;
mod routes;
mod storage;
#[cfg(test)]
mod testing;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use config::AppConfig;
use expiry::DateExtractor;
use freshness::{load_classifier, FreshnessAnalyzer};
use imaging::Preprocessor;
use ocr::{OcrHandler, TesseractRecognizer};
use routes::{configure_routes, AppContext};
use storage::UploadStore;

fn startup_error(context: &str, e: impl std::fmt::Display) -> std::io::Error {
    log::error!("{}: {}", context, e);
    std::io::Error::new(std::io::ErrorKind::Other, format!("{}: {}", context, e))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = AppConfig::load().map_err(|e| startup_error("Invalid configuration", e))?;

    if let Ok(current_dir) = std::env::current_dir() {
        log::info!("Current working directory: {}", current_dir.display());
    }

    let http_client = reqwest::Client::builder()
        .cookie_store(true)
        .build()
        .map_err(|e| startup_error("Failed to build HTTP client", e))?;
    if let Err(e) = bootstrap::ensure_model(&config.model, &http_client).await {
        log::error!("Model download failed: {}", e);
    }

    let classifier =
        load_classifier(&config.model).map_err(|e| startup_error("Model loading failed", e))?;
    let recognizer = TesseractRecognizer::load(&config.ocr)
        .map_err(|e| startup_error("OCR engine unavailable", e))?;
    let dates = DateExtractor::from_config(&config.date_service)
        .map_err(|e| startup_error("Date service setup failed", e))?;
    let uploads = UploadStore::create(&config.server.upload_dir, config.server.max_upload_bytes)
        .map_err(|e| startup_error("Upload directory unavailable", e))?;

    let preprocessor = Preprocessor::new((config.model.input_width, config.model.input_height));
    let ctx = AppContext {
        analyzer: web::Data::new(FreshnessAnalyzer::new(classifier, preprocessor)),
        ocr: web::Data::new(OcrHandler::new(Arc::new(recognizer))),
        dates: web::Data::new(dates),
        uploads: web::Data::new(uploads),
        static_dir: config.server.static_dir.clone(),
    };

    let bind_address = config.bind_address();
    log::info!("Starting server on {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allowed_methods(vec!["GET", "POST", "OPTIONS"])
                    .allowed_headers(vec![
                        actix_web::http::header::ACCEPT,
                        actix_web::http::header::CONTENT_TYPE,
                    ])
                    .max_age(3600),
            )
            .configure(|cfg| configure_routes(cfg, &ctx))
    })
    .bind(&bind_address)?
    .run()
    .await
}
