//! Study tracking server.
//!
//! Persists one document per named user (subjects + daily logs) in SQLite and
//! exposes full-collection read/replace operations over HTTP/JSON.
//!
//! # Configuration
//!
//! Environment variables:
//! - `STUDYTRACK_PORT`: Port to listen on (default: 3000)
//! - `STUDYTRACK_DATABASE_PATH`: SQLite file (default: <data_dir>/studytrack/studytrack.db)
//! - `STUDYTRACK_CONFIG`: Path to config file (default: <config_dir>/studytrack/config.yaml)
//!
//! # Endpoints
//!
//! - `GET /health`: Health check
//! - `GET /api/users`: All user names
//! - `GET /api/{user}`: Full user record (creates a blank one if absent)
//! - `GET|POST /api/{user}/subjects`: Read / replace the whole subjects array
//! - `DELETE /api/{user}/subjects/{id}`: Remove one subject by id
//! - `GET|POST /api/{user}/dailylogs`: Read / replace the whole daily-log array

use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod db;
mod models;
mod server;

use config::Config;
use db::{init_db, UserRepository};
use server::{router, seed_known_users, AppState};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "studytrack=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match Config::load(None) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Database: {}", config.database_path.display());

    let pool = match init_db(config.database_path.clone()).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("Failed to initialize database: {}", e);
            std::process::exit(1);
        }
    };

    let repo = Arc::new(UserRepository::new(pool));

    // Seed before the listener binds so no request can observe a half-seeded
    // store. Safe to re-run on every start.
    if let Err(e) = seed_known_users(&repo).await {
        tracing::error!("Failed to seed users: {}", e);
        std::process::exit(1);
    }

    let state = AppState { repo };

    // The front end is served separately during development; allow any origin
    // like the original deployment did.
    let app = router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Starting server on {}", addr);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
