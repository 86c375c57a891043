#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web upload server for the blood report parser.
//!
//! Accepts PDF or plain text blood reports, runs them through the
//! [`blood_report`] pipeline, saves each parsed record as a timestamped
//! JSON file and returns the record to the caller.

mod handlers;
pub mod interactive;

use std::path::PathBuf;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};

/// Default bind address.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1";

/// Default port.
pub const DEFAULT_PORT: u16 = 8000;

/// Default upper bound on an upload body, in bytes.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Server settings, read from the environment by [`ServerConfig::from_env`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address to bind (`BIND_ADDR`).
    pub bind_addr: String,
    /// Port to listen on (`PORT`).
    pub port: u16,
    /// Directory parsed records are written to (`REPORT_OUTPUT_DIR`).
    pub output_dir: PathBuf,
    /// Largest accepted request body (`MAX_UPLOAD_BYTES`).
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            port: DEFAULT_PORT,
            output_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl ServerConfig {
    /// Builds a config from environment variables, falling back to the
    /// defaults for anything unset or unparseable.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            output_dir: std::env::var_os("REPORT_OUTPUT_DIR")
                .map_or(defaults.output_dir, PathBuf::from),
            max_upload_bytes: std::env::var("MAX_UPLOAD_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_upload_bytes),
        }
    }
}

/// Shared application state.
pub struct AppState {
    /// Directory parsed records are written to.
    pub output_dir: PathBuf,
}

/// Registers every route of the service.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(handlers::index))
        .route("/debug", web::get().to(handlers::debug))
        .route("/ocr/upload", web::post().to(handlers::upload))
        .route("/parse-text", web::post().to(handlers::parse_text))
        .service(web::scope("/api").route("/health", web::get().to(handlers::health)));
}

/// Starts the blood report server.
///
/// This is a regular async function; the caller provides the runtime
/// (e.g. via `#[actix_web::main]`) and initializes logging.
///
/// # Errors
///
/// Returns an `std::io::Result` error if the HTTP server fails to bind or
/// encounters a runtime error.
#[allow(clippy::future_not_send)]
pub async fn run_server(config: ServerConfig) -> std::io::Result<()> {
    log::info!("Saving parsed reports to {}", config.output_dir.display());

    let state = web::Data::new(AppState {
        output_dir: config.output_dir,
    });
    let max_upload_bytes = config.max_upload_bytes;

    log::info!("Starting server on {}:{}", config.bind_addr, config.port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .app_data(web::PayloadConfig::new(max_upload_bytes))
            .configure(configure)
    })
    .bind((config.bind_addr, config.port))?
    .run()
    .await
}
