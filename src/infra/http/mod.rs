pub mod api;
mod middleware;
mod pages;

pub use api::{ApiState, build_api_router};
pub use middleware::RequestContext;
pub use pages::{PageState, build_page_router};

use axum::extract::FromRef;
use axum::{Router, middleware as axum_middleware, routing::get};

use middleware::{log_responses, set_request_context};

#[derive(Clone)]
pub struct RouterState {
    pub api: ApiState,
    pub pages: PageState,
}

impl FromRef<RouterState> for ApiState {
    fn from_ref(state: &RouterState) -> Self {
        state.api.clone()
    }
}

impl FromRef<RouterState> for PageState {
    fn from_ref(state: &RouterState) -> Self {
        state.pages.clone()
    }
}

/// Complete application router: JSON API, health check and page shells.
pub fn build_router(state: RouterState) -> Router {
    build_api_router()
        .route("/_health", get(api::handlers::health))
        .merge(build_page_router())
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}
