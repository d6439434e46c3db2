//! Soroban IDE backend.
//!
//! A thin REST layer over three collaborators:
//!
//! | Concern        | Module       | Backing                                   |
//! |----------------|--------------|-------------------------------------------|
//! | Project store  | [`db`]       | SQLite, one JSON-embedded row per project |
//! | Compilation    | [`compiler`] | `cargo build` for `wasm32-unknown-unknown` |
//! | Deployment     | [`deployer`] | `stellar contract deploy` + Soroban RPC   |
//!
//! Handlers enforce request shape only; there are no business rules beyond
//! CRUD validation.

pub mod api;
pub mod compiler;
pub mod config;
pub mod db;
pub mod deployer;
pub mod errors;
pub mod rpc;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use reqwest::Client;
use sqlx::SqlitePool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use compiler::Compiler;
use config::Config;
use deployer::Deployer;

pub struct AppState {
    pub pool: SqlitePool,
    pub config: Config,
    /// HTTP client for Soroban RPC calls.
    pub client: Client,
    pub compiler: Arc<dyn Compiler>,
    pub deployer: Arc<dyn Deployer>,
}

/// Build the API router over `state`.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(api::health))
        .route(
            "/api/projects",
            get(api::list_projects).post(api::create_project),
        )
        .route(
            "/api/projects/:id",
            get(api::get_project)
                .patch(api::update_project)
                .put(api::update_project)
                .delete(api::delete_project),
        )
        .route("/api/compile", post(api::compile))
        .route("/api/deploy", post(api::deploy))
        .route("/api/templates", get(api::list_templates))
        .route("/api/network/status", get(api::network_status))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
