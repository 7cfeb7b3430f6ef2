//! Route modules for the Receipt Scanner server

pub mod health;
pub mod lookup;
pub mod receipts;
pub mod session;

use axum::{routing::get, Router};

use crate::state::AppState;

/// All endpoints, bound to the application state
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .merge(receipts::router())
        .merge(lookup::router())
        .with_state(state)
}
