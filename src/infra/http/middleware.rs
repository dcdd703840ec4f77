//! Per-request correlation and structured outcome logging.
//!
//! Every request gets an id (the caller's `x-request-id` when it looks sane)
//! and a [`RequestSubject`] naming the search session or repository it is
//! about. Both ride on a tracing span, so handler logs carry them too.

use std::time::{Duration, Instant};

use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, Request, Uri},
    middleware::Next,
    response::Response,
};
use tracing::{Instrument, Span, debug, error, field::Empty, info_span, warn};
use url::form_urlencoded;
use uuid::Uuid;

use crate::application::error::ErrorReport;

pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");
const MAX_REQUEST_ID_LEN: usize = 64;
const MAX_SESSION_LEN: usize = 64;

/// What a request concerns, as far as the logs are interested.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RequestSubject {
    Search {
        session: Option<String>,
        seq: Option<u64>,
        page: Option<u32>,
    },
    Readme {
        repository: String,
    },
    Account,
    Checkout,
    #[default]
    Other,
}

impl RequestSubject {
    pub fn from_uri(uri: &Uri) -> Self {
        let segments: Vec<&str> = uri.path().trim_matches('/').split('/').collect();
        match segments.as_slice() {
            ["api", "search"] => Self::search(uri.query().unwrap_or_default()),
            ["api", "repos", owner, repo, "readme"] => Self::Readme {
                repository: format!("{owner}/{repo}"),
            },
            ["api", "auth", _] => Self::Account,
            ["api", "checkout"] => Self::Checkout,
            _ => Self::Other,
        }
    }

    fn search(query: &str) -> Self {
        let (mut session, mut seq, mut page) = (None, None, None);
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            match &*key {
                "session" => session = Some(value.chars().take(MAX_SESSION_LEN).collect()),
                "seq" => seq = value.parse().ok(),
                "page" => page = value.parse().ok(),
                _ => {}
            }
        }
        Self::Search { session, seq, page }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Search { .. } => "search",
            Self::Readme { .. } => "readme",
            Self::Account => "account",
            Self::Checkout => "checkout",
            Self::Other => "other",
        }
    }

    fn record(&self, span: &Span) {
        match self {
            Self::Search { session, seq, page } => {
                if let Some(session) = session {
                    span.record("session", session.as_str());
                }
                if let Some(seq) = seq {
                    span.record("seq", seq);
                }
                if let Some(page) = page {
                    span.record("page", page);
                }
            }
            Self::Readme { repository } => {
                span.record("repository", repository.as_str());
            }
            _ => {}
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub request_id: String,
    pub subject: RequestSubject,
}

impl RequestContext {
    fn for_request(request: &Request<Body>) -> Self {
        let request_id = request
            .headers()
            .get(&REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .filter(|value| is_acceptable_request_id(value))
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        Self {
            request_id,
            subject: RequestSubject::from_uri(request.uri()),
        }
    }
}

fn is_acceptable_request_id(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= MAX_REQUEST_ID_LEN
        && value
            .bytes()
            .all(|byte| byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.'))
}

/// Attach a [`RequestContext`] to the request and echo its id on the response.
pub async fn set_request_context(mut request: Request<Body>, next: Next) -> Response {
    let ctx = RequestContext::for_request(&request);
    request.extensions_mut().insert(ctx.clone());

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&ctx.request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response.extensions_mut().insert(ctx);
    response
}

/// Run the request inside a span carrying its subject, then log the outcome.
pub async fn log_responses(request: Request<Body>, next: Next) -> Response {
    let ctx = request
        .extensions()
        .get::<RequestContext>()
        .cloned()
        .unwrap_or_default();
    let span = info_span!(
        target: "gitreader::http",
        "request",
        request_id = %ctx.request_id,
        method = %request.method(),
        path = %request.uri().path(),
        subject = ctx.subject.label(),
        session = Empty,
        seq = Empty,
        page = Empty,
        repository = Empty,
    );
    ctx.subject.record(&span);

    let start = Instant::now();
    let mut response = next.run(request).instrument(span.clone()).await;
    let elapsed = start.elapsed();
    span.in_scope(|| log_outcome(&mut response, elapsed));
    response
}

fn log_outcome(response: &mut Response, elapsed: Duration) {
    let status = response.status();
    let elapsed_ms = elapsed.as_millis();
    if !status.is_client_error() && !status.is_server_error() {
        debug!(
            target = "gitreader::http::response",
            status = status.as_u16(),
            elapsed_ms,
            "request served"
        );
        return;
    }

    let (source, messages) = match response.extensions_mut().remove::<ErrorReport>() {
        Some(report) => (report.source, report.messages),
        None => ("unknown", Vec::new()),
    };
    let detail = messages
        .first()
        .map(String::as_str)
        .unwrap_or("no diagnostic available");

    if status.is_server_error() {
        error!(
            target = "gitreader::http::response",
            status = status.as_u16(),
            elapsed_ms,
            source,
            detail,
            chain = ?messages,
            "request failed"
        );
    } else {
        warn!(
            target = "gitreader::http::response",
            status = status.as_u16(),
            elapsed_ms,
            source,
            detail,
            "request rejected"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subject(uri: &str) -> RequestSubject {
        RequestSubject::from_uri(&uri.parse::<Uri>().expect("uri"))
    }

    #[test]
    fn search_requests_carry_session_and_sequence() {
        assert_eq!(
            subject("/api/search?q=rust+web&page=2&session=tab-1&seq=7"),
            RequestSubject::Search {
                session: Some("tab-1".to_string()),
                seq: Some(7),
                page: Some(2),
            }
        );
        assert_eq!(
            subject("/api/search?q=rust&seq=oops"),
            RequestSubject::Search {
                session: None,
                seq: None,
                page: None,
            }
        );
    }

    #[test]
    fn oversized_session_ids_are_cut_for_logging() {
        let long = "s".repeat(500);
        let RequestSubject::Search { session, .. } = subject(&format!("/api/search?session={long}"))
        else {
            panic!("search subject expected");
        };
        assert_eq!(session.map(|s| s.len()), Some(MAX_SESSION_LEN));
    }

    #[test]
    fn readme_requests_name_the_repository() {
        assert_eq!(
            subject("/api/repos/octo/demo/readme?theme=dark"),
            RequestSubject::Readme {
                repository: "octo/demo".to_string()
            }
        );
        assert_eq!(subject("/api/auth/token"), RequestSubject::Account);
        assert_eq!(subject("/api/checkout"), RequestSubject::Checkout);
        assert_eq!(subject("/"), RequestSubject::Other);
        assert_eq!(subject("/api/repos/octo/readme"), RequestSubject::Other);
    }

    #[test]
    fn caller_request_ids_are_reused_only_when_sane() {
        let with_id = Request::builder()
            .uri("/api/products")
            .header(&REQUEST_ID_HEADER, "edge-1234.abc")
            .body(Body::empty())
            .expect("request");
        assert_eq!(RequestContext::for_request(&with_id).request_id, "edge-1234.abc");

        let hostile = Request::builder()
            .uri("/api/products")
            .header(&REQUEST_ID_HEADER, "id with spaces")
            .body(Body::empty())
            .expect("request");
        let generated = RequestContext::for_request(&hostile).request_id;
        assert_ne!(generated, "id with spaces");
        assert!(Uuid::parse_str(&generated).is_ok());
    }
}
