use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use gitreader_api_types::{
    AuthSessionView, AuthUserView, CheckoutResponseBody, CredentialsBody, ProductsResponse,
    RenderRequestBody, RenderResponse, RenderedBlockView, SignUpResponse, SuggestionsResponse,
    Theme,
};
use serde::Deserialize;
use time::OffsetDateTime;

use crate::application::checkout::StartCheckoutCommand;
use crate::application::providers::{AuthSession, SignUpOutcome};
use crate::application::render::{RenderRequest, RenderedDocument, stylesheet};
use crate::application::search::SearchTicket;
use crate::domain::repository::RepositoryRef;

use super::error::ApiError;
use super::state::ApiState;

/// Largest Markdown body accepted by the render endpoint.
pub const MAX_RENDER_BYTES: usize = 512 * 1024;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SearchParams {
    pub q: String,
    pub page: Option<u32>,
    pub session: Option<String>,
    pub seq: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SuggestionParams {
    pub q: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ThemeParams {
    pub theme: Option<Theme>,
}

pub async fn search(
    State(state): State<ApiState>,
    Query(params): Query<SearchParams>,
) -> Result<impl IntoResponse, ApiError> {
    let ticket = match (params.session, params.seq) {
        (Some(session), Some(seq)) => Some(state.search.sequencer().observe(&session, seq)),
        (Some(session), None) => Some(state.search.sequencer().issue(&session)),
        (None, _) => None,
    };

    let response = state
        .search
        .search(&params.q, params.page.unwrap_or(1), ticket)
        .await?;
    Ok(Json(response))
}

pub async fn suggestions(
    State(state): State<ApiState>,
    Query(params): Query<SuggestionParams>,
) -> impl IntoResponse {
    let today = OffsetDateTime::now_utc().date();
    let suggestions = state
        .suggestions
        .suggestions(today, params.q.as_deref())
        .await;
    Json(SuggestionsResponse { suggestions })
}

pub async fn readme(
    State(state): State<ApiState>,
    Path((owner, repo)): Path<(String, String)>,
    Query(params): Query<ThemeParams>,
) -> Result<impl IntoResponse, ApiError> {
    let repository = RepositoryRef::new(&owner, &repo)?;
    let document = state
        .readme
        .readme(&repository, params.theme.unwrap_or_default())
        .await?;
    Ok(Json(render_response(&document)))
}

pub async fn render(
    State(state): State<ApiState>,
    Json(body): Json<RenderRequestBody>,
) -> Result<impl IntoResponse, ApiError> {
    if body.markdown.len() > MAX_RENDER_BYTES {
        return Err(ApiError::bad_request(
            "Markdown body too large",
            Some(format!("limit is {MAX_RENDER_BYTES} bytes")),
        ));
    }

    let mut request = RenderRequest::new(body.markdown, body.theme.unwrap_or_default());
    if let Some(base_url) = body.base_url.filter(|url| !url.trim().is_empty()) {
        request = request.with_base_url(base_url);
    }

    let document = state.readme.render(&request);
    Ok(Json(render_response(&document)))
}

/// Serves `/api/theme/{light|dark}.css`.
pub async fn theme_stylesheet(Path(file): Path<String>) -> Result<Response, ApiError> {
    let theme = file
        .strip_suffix(".css")
        .and_then(|name| name.parse::<Theme>().ok())
        .ok_or_else(|| ApiError::not_found("Unknown theme stylesheet"))?;

    let mut response = stylesheet(theme).to_string().into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/css; charset=utf-8"),
    );
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=3600"),
    );
    Ok(response)
}

pub async fn products(State(state): State<ApiState>) -> impl IntoResponse {
    let products = state
        .checkout
        .catalog()
        .products()
        .iter()
        .map(|product| product.view())
        .collect();
    Json(ProductsResponse { products })
}

pub async fn checkout(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(body): Json<gitreader_api_types::CheckoutRequestBody>,
) -> Result<impl IntoResponse, ApiError> {
    let token = extract_token(headers.get(header::AUTHORIZATION));
    let command = StartCheckoutCommand {
        price_id: body.price_id,
        success_url: body.success_url,
        cancel_url: body.cancel_url,
    };

    let session = state.checkout.start(token.as_deref(), command).await?;
    Ok((
        StatusCode::CREATED,
        Json(CheckoutResponseBody {
            session_id: session.session_id,
            url: session.url,
        }),
    ))
}

pub async fn sign_up(
    State(state): State<ApiState>,
    Json(body): Json<CredentialsBody>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state.account.sign_up(&body.email, &body.password).await?;
    let response = match outcome {
        SignUpOutcome::SignedIn(session) => SignUpResponse {
            user: user_view(&session),
            session: Some(session_view(session)),
            confirmation_required: false,
        },
        SignUpOutcome::ConfirmationRequired { user_id, email } => SignUpResponse {
            user: AuthUserView { id: user_id, email },
            session: None,
            confirmation_required: true,
        },
    };
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn sign_in(
    State(state): State<ApiState>,
    Json(body): Json<CredentialsBody>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state.account.sign_in(&body.email, &body.password).await?;
    Ok(Json(session_view(session)))
}

pub async fn sign_out(
    State(state): State<ApiState>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let token = extract_token(headers.get(header::AUTHORIZATION));
    state.account.sign_out(token.as_deref()).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn user_view(session: &AuthSession) -> AuthUserView {
    AuthUserView {
        id: session.user_id.clone(),
        email: session.email.clone(),
    }
}

fn session_view(session: AuthSession) -> AuthSessionView {
    AuthSessionView {
        user: user_view(&session),
        access_token: session.access_token,
        expires_in: session.expires_in,
    }
}

pub async fn health() -> StatusCode {
    StatusCode::NO_CONTENT
}

pub fn stylesheet_url(theme: Theme) -> String {
    format!("/api/theme/{}.css", theme.as_str())
}

pub fn render_response(document: &RenderedDocument) -> RenderResponse {
    RenderResponse {
        theme: document.theme,
        html: document.html.clone(),
        degraded: document.degraded,
        blocks: document.blocks.iter().map(RenderedBlockView::from).collect(),
        stylesheet_url: stylesheet_url(document.theme),
    }
}

fn extract_token(header: Option<&HeaderValue>) -> Option<String> {
    let raw = header?.to_str().ok()?;
    let bearer = raw.strip_prefix("Bearer ")?;
    Some(bearer.to_string())
}
