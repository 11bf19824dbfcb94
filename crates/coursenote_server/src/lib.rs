//! HTTP surface for the CourseNote annotation store.
//!
//! # Responsibility
//! - Map REST requests onto `AnnotationService` use-cases.
//! - Serialize canonical timestamps as RFC 3339 UTC instants.
//!
//! # Invariants
//! - Handlers never reason about wall-clock time; parsing goes through
//!   `coursenote_core::time`.
//! - Blocking SQLite work runs on the blocking thread pool.

mod api;
pub mod errors;
pub mod model;
pub mod state;

use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;

pub use errors::ApiError;
pub use state::AppState;

/// Builds the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(api::health))
        .route(
            "/annotations",
            get(api::list_annotations).post(api::create_annotation),
        )
        .route(
            "/annotations/:id",
            get(api::get_annotation)
                .put(api::update_annotation)
                .delete(api::delete_annotation),
        )
        .with_state(state)
        .layer(CorsLayer::permissive())
}
