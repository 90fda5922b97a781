//! HTTP control surface
//!
//! JSON endpoints over the set engine plus an SSE stream of dispatcher
//! events.

pub mod handlers;
pub mod sse;

use crate::engine::SetEngine;
use crate::state::SharedState;
use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared application context passed to all handlers
#[derive(Clone)]
pub struct AppContext {
    pub state: Arc<SharedState>,
    pub engine: Arc<SetEngine>,
}

impl AppContext {
    pub fn new(state: Arc<SharedState>, engine: Arc<SetEngine>) -> Self {
        Self { state, engine }
    }
}

/// Build the application router
pub fn build_router(ctx: AppContext) -> Router {
    Router::new()
        .route("/health", get(handlers::health))

        // Catalog
        .route("/catalog/tunes", get(handlers::list_tunes))
        .route("/catalog/types", get(handlers::list_types))
        .route("/catalog/keys", get(handlers::list_keys))

        // Filters
        .route("/filters", get(handlers::get_filters).post(handlers::set_filters))

        // Draws
        .route("/draw", get(handlers::get_draw))
        .route("/draw/spin", post(handlers::spin))
        .route("/draw/spin-with", post(handlers::spin_with))
        .route("/draw/spin-matching", post(handlers::spin_matching))
        .route("/draw/seed", post(handlers::seed_and_spin))
        .route("/draw/more", post(handlers::draw_one_more))
        .route("/draw/reset", post(handlers::reset_draw))
        .route("/draw/move", post(handlers::move_in_draw))
        .route("/draw/:tune_id", delete(handlers::remove_from_draw))

        // Working sequence
        .route("/set", get(handlers::get_working))
        .route("/set/clear", post(handlers::clear_all))
        .route("/set/:tune_id", delete(handlers::remove_from_working))

        // Favorites
        .route("/favorites", get(handlers::list_favorites))
        .route("/favorites/:tune_id/toggle", post(handlers::toggle_favorite))

        // Saved collections
        .route("/collections", get(handlers::list_collections).post(handlers::save_collection))
        .route("/collections/:id/load", post(handlers::load_collection))
        .route("/collections/:id", delete(handlers::delete_collection))

        // SSE event stream
        .route("/events", get(sse::event_stream))

        .with_state(ctx)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
