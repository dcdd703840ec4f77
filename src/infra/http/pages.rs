use axum::{
    Router,
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
};
use gitreader_api_types::ProductView;

use crate::domain::routes::{self, PageRoute};
use crate::presentation::views::{
    CancelTemplate, ExplorerView, IndexTemplate, LayoutChrome, SuccessTemplate,
    render_template_response,
};

use super::RouterState;
use super::api::error::ApiError;

#[derive(Clone)]
pub struct PageState {
    pub products: Vec<ProductView>,
    pub checkout_enabled: bool,
    pub sign_in_enabled: bool,
}

pub fn build_page_router() -> Router<RouterState> {
    Router::new()
        .route(PageRoute::Explorer.path(), get(explorer))
        .route(PageRoute::CheckoutSuccess.path(), get(checkout_success))
        .route(PageRoute::CheckoutCancel.path(), get(checkout_cancel))
        .fallback(fallback)
}

async fn explorer(State(state): State<PageState>) -> Response {
    render_page(&state, PageRoute::Explorer)
}

async fn checkout_success(State(state): State<PageState>) -> Response {
    render_page(&state, PageRoute::CheckoutSuccess)
}

async fn checkout_cancel(State(state): State<PageState>) -> Response {
    render_page(&state, PageRoute::CheckoutCancel)
}

/// Unknown paths show the explorer, matching client-side routing. Unknown
/// API paths stay JSON 404s.
async fn fallback(State(state): State<PageState>, request: Request<Body>) -> Response {
    let path = request.uri().path();
    if path.starts_with("/api/") {
        return ApiError::not_found("Unknown API endpoint").into_response();
    }
    render_page(&state, routes::resolve(path))
}

fn render_page(state: &PageState, route: PageRoute) -> Response {
    let chrome = LayoutChrome::for_route(route);
    match route {
        PageRoute::Explorer => render_template_response(
            IndexTemplate {
                chrome,
                view: ExplorerView::new(
                    &state.products,
                    state.checkout_enabled,
                    state.sign_in_enabled,
                ),
            },
            StatusCode::OK,
        ),
        PageRoute::CheckoutSuccess => {
            render_template_response(SuccessTemplate { chrome }, StatusCode::OK)
        }
        PageRoute::CheckoutCancel => {
            render_template_response(CancelTemplate { chrome }, StatusCode::OK)
        }
    }
}
