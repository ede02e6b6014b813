use axum::Router;
use sqlx::SqlitePool;

/// Human-readable application name, used in logs and startup output.
pub const APP_NAME: &str = "Canopy";

/// Shared state available to all handlers via Axum's state extractor.
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: config::Config,
}

/// All API routes. Merged into the full router in lib.rs.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(features::onboarding::routes())
        .merge(features::organizations::routes())
        .merge(features::users::routes())
        .merge(features::customers::routes())
        .merge(features::leads::routes())
        .merge(features::proposals::routes())
        .merge(features::work_orders::routes())
        .merge(features::invoices::routes())
        .merge(features::audit::routes())
}

pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod features;
pub mod identity;
pub mod scope;
pub mod single_writer;
pub mod tenant;
