pub mod boards;
pub mod codes;
pub mod library;
pub mod profile;
pub mod progress;
pub mod seed;
pub mod speak;

use axum::Router;

use crate::state::AppState;

/// Every API route except the test seed.
pub fn api() -> Router<AppState> {
    Router::new()
        .merge(codes::router())
        .merge(progress::router())
        .merge(speak::router())
        .merge(profile::router())
        .merge(boards::router())
        .merge(library::router())
}
