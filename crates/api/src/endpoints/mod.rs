//! API endpoints.

mod admin;
mod votes;

use axum::Router;

use crate::middleware::AppState;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/block", votes::router())
        .nest("/admin", admin::router())
}
