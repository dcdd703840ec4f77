use axum::Json;
use axum::http::{HeaderValue, StatusCode, header::RETRY_AFTER};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::application::account::AccountError;
use crate::application::checkout::StartCheckoutError;
use crate::application::error::ErrorReport;
use crate::application::providers::{CheckoutError, IdentityError, ProviderError};
use crate::application::readme::{InFlightError, ReadmeError};
use crate::application::search::SearchError;
use crate::domain::error::DomainError;

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorMessage,
}

pub mod codes {
    pub const BAD_REQUEST: &str = "bad_request";
    pub const UNAUTHORIZED: &str = "unauthorized";
    pub const NOT_FOUND: &str = "not_found";
    pub const CONFLICT: &str = "in_flight";
    pub const RATE_LIMITED: &str = "rate_limited";
    pub const UPSTREAM: &str = "upstream_error";
    pub const CHECKOUT: &str = "checkout_error";
    pub const AUTH: &str = "auth_error";
    pub const UNAVAILABLE: &str = "unavailable";
}

#[derive(Debug, Serialize)]
pub struct ApiErrorMessage {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
    hint: Option<String>,
    retry_after: Option<u64>,
}

impl ApiError {
    pub fn new(
        status: StatusCode,
        code: &'static str,
        message: impl Into<String>,
        hint: Option<String>,
    ) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            hint,
            retry_after: None,
        }
    }

    pub fn bad_request(message: &'static str, hint: Option<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, codes::BAD_REQUEST, message, hint)
    }

    pub fn unauthorized(hint: Option<String>) -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            codes::UNAUTHORIZED,
            "Sign in required",
            hint,
        )
    }

    pub fn not_found(message: &'static str) -> Self {
        Self::new(StatusCode::NOT_FOUND, codes::NOT_FOUND, message, None)
    }

    pub fn rate_limited(retry_after: Option<u64>) -> Self {
        let hint = match retry_after {
            Some(seconds) => format!("Retry after {seconds} seconds"),
            None => "Wait a minute before searching again".to_string(),
        };
        Self {
            retry_after,
            ..Self::new(
                StatusCode::TOO_MANY_REQUESTS,
                codes::RATE_LIMITED,
                "GitHub rate limit exceeded",
                Some(hint),
            )
        }
    }

    pub fn upstream(hint: String) -> Self {
        Self::new(
            StatusCode::BAD_GATEWAY,
            codes::UPSTREAM,
            "GitHub request failed",
            Some(hint),
        )
    }

    pub fn unavailable(message: &'static str) -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            codes::UNAVAILABLE,
            message,
            None,
        )
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.code
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let detail = format!(
            "{}: {}",
            self.code,
            self.hint.as_deref().unwrap_or(&self.message)
        );
        let body = ApiErrorBody {
            error: ApiErrorMessage {
                code: self.code.to_string(),
                message: self.message,
                hint: self.hint,
            },
        };
        let mut response = (self.status, Json(body)).into_response();
        if let Some(seconds) = self.retry_after {
            if let Ok(value) = HeaderValue::from_str(&seconds.to_string()) {
                response.headers_mut().insert(RETRY_AFTER, value);
            }
        }
        // Attach a structured report so shared logging middleware can emit rich diagnostics.
        ErrorReport::from_message("infra::http::api", self.status, detail).attach(&mut response);
        response
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::UnknownProduct { .. } => {
                Self::new(StatusCode::NOT_FOUND, codes::NOT_FOUND, "Unknown product", Some(err.to_string()))
            }
            other => Self::bad_request("Invalid request", Some(other.to_string())),
        }
    }
}

impl From<ProviderError> for ApiError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::RateLimited { retry_after } => Self::rate_limited(retry_after),
            ProviderError::NotFound => Self::not_found("Repository or README not found"),
            other => Self::upstream(other.to_string()),
        }
    }
}

impl From<SearchError> for ApiError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::Domain(err) => err.into(),
            SearchError::Provider(err) => err.into(),
        }
    }
}

impl From<ReadmeError> for ApiError {
    fn from(err: ReadmeError) -> Self {
        match err {
            ReadmeError::InFlight(InFlightError::AlreadyRunning { repository }) => Self::new(
                StatusCode::CONFLICT,
                codes::CONFLICT,
                "README is already loading",
                Some(repository),
            ),
            ReadmeError::Provider(err) => err.into(),
        }
    }
}

impl From<IdentityError> for ApiError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::Disabled => Self::unavailable("Sign-in is not configured"),
            IdentityError::Invalid => {
                Self::unauthorized(Some("Access token is invalid or expired".to_string()))
            }
            IdentityError::Rejected { status, message } => {
                let status = StatusCode::from_u16(status)
                    .ok()
                    .filter(StatusCode::is_client_error)
                    .unwrap_or(StatusCode::BAD_REQUEST);
                Self::new(status, codes::AUTH, message, None)
            }
            IdentityError::Provider(ProviderError::RateLimited { retry_after }) => Self {
                retry_after,
                ..Self::new(
                    StatusCode::TOO_MANY_REQUESTS,
                    codes::RATE_LIMITED,
                    "Too many sign-in attempts",
                    None,
                )
            },
            IdentityError::Provider(err) => Self::new(
                StatusCode::BAD_GATEWAY,
                codes::UPSTREAM,
                "Identity provider request failed",
                Some(err.to_string()),
            ),
        }
    }
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        match err {
            CheckoutError::Disabled => Self::unavailable("Checkout is not configured"),
            CheckoutError::Rejected { message, .. } => Self::new(
                StatusCode::BAD_GATEWAY,
                codes::CHECKOUT,
                message,
                None,
            ),
            CheckoutError::Provider(err) => err.into(),
        }
    }
}

impl From<AccountError> for ApiError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::Unauthenticated => Self::unauthorized(None),
            AccountError::Domain(err) => err.into(),
            AccountError::Identity(err) => err.into(),
        }
    }
}

impl From<StartCheckoutError> for ApiError {
    fn from(err: StartCheckoutError) -> Self {
        match err {
            StartCheckoutError::Unauthenticated => Self::unauthorized(None),
            StartCheckoutError::Identity(err) => err.into(),
            StartCheckoutError::Domain(err) => err.into(),
            StartCheckoutError::Checkout(err) => err.into(),
        }
    }
}
