pub mod error;
pub mod handlers;
pub mod state;

pub use state::ApiState;

use axum::{
    Router,
    routing::{get, post},
};

use crate::infra::http::RouterState;

pub fn build_api_router() -> Router<RouterState> {
    Router::new()
        .route("/api/search", get(handlers::search))
        .route("/api/suggestions", get(handlers::suggestions))
        .route("/api/repos/{owner}/{repo}/readme", get(handlers::readme))
        .route("/api/render", post(handlers::render))
        .route("/api/theme/{file}", get(handlers::theme_stylesheet))
        .route("/api/products", get(handlers::products))
        .route("/api/checkout", post(handlers::checkout))
        .route("/api/auth/signup", post(handlers::sign_up))
        .route("/api/auth/token", post(handlers::sign_in))
        .route("/api/auth/logout", post(handlers::sign_out))
}
