//! HTTP API layer for content-poll.
//!
//! Routes live under [`API_PREFIX`]:
//!
//! - **Votes**: `POST /block/{poll_id}/vote`, `GET /block/{poll_id}/results`
//! - **Admin**: posts summary, overview, orphans, purge and content-saved
//!   hooks, guarded by a bearer token
//!
//! Built on Axum 0.8 with Tower middleware stack.

pub mod endpoints;
pub mod extractors;
pub mod middleware;

use axum::Router;
use tower_http::trace::TraceLayer;

pub use endpoints::router;
pub use middleware::{AppState, CookieSettings};

/// Mount point of every route.
pub const API_PREFIX: &str = "/content-poll/v1";

/// Build the application with tracing attached.
pub fn app(state: AppState) -> Router {
    Router::new()
        .nest(API_PREFIX, router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
