//! Collaborator traits describing the external services the explorer talks to.

use async_trait::async_trait;
use gitreader_api_types::{CheckoutMode, RepositorySummary};
use thiserror::Error;
use time::Date;

use crate::domain::account::Credentials;
use crate::domain::repository::{RepositoryRef, SearchPage, SearchQuery};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("upstream rate limit exceeded")]
    RateLimited { retry_after: Option<u64> },
    #[error("resource not found")]
    NotFound,
    #[error("upstream responded with status {status}")]
    Failed { status: u16 },
    #[error("network error: {0}")]
    Network(String),
    #[error("could not decode upstream payload: {0}")]
    Decode(String),
}

impl ProviderError {
    pub fn network(err: impl std::fmt::Display) -> Self {
        Self::Network(err.to_string())
    }

    pub fn decode(err: impl std::fmt::Display) -> Self {
        Self::Decode(err.to_string())
    }

    /// Short label used as a metrics dimension.
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::RateLimited { .. } => "rate_limited",
            ProviderError::NotFound => "not_found",
            ProviderError::Failed { .. } => "failed",
            ProviderError::Network(_) => "network",
            ProviderError::Decode(_) => "decode",
        }
    }
}

/// Repository search, sorted by stars descending.
#[async_trait]
pub trait RepositorySearch: Send + Sync {
    async fn search(
        &self,
        query: &SearchQuery,
        page: u32,
        per_page: u32,
    ) -> Result<SearchPage, ProviderError>;

    /// Repositories created on or after `since`, most starred first.
    async fn trending(
        &self,
        since: Date,
        limit: u32,
    ) -> Result<Vec<RepositorySummary>, ProviderError>;
}

/// Decoded README text plus the base its relative links resolve against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadmeDocument {
    pub markdown: String,
    pub base_url: Option<String>,
}

#[async_trait]
pub trait ReadmeSource: Send + Sync {
    async fn fetch_readme(&self, repository: &RepositoryRef)
    -> Result<ReadmeDocument, ProviderError>;
}

/// Authenticated user as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub email: Option<String>,
    /// Bearer token the user authenticated with, forwarded to the checkout provider.
    pub access_token: String,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("authentication is not configured")]
    Disabled,
    #[error("access token is invalid or expired")]
    Invalid,
    /// Message reported by the provider, safe to show to the user.
    #[error("{message}")]
    Rejected { status: u16, message: String },
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Session issued after a successful sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub access_token: String,
    pub expires_in: Option<u64>,
    pub user_id: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignUpOutcome {
    SignedIn(AuthSession),
    /// The account exists but the address must be confirmed before signing in.
    ConfirmationRequired {
        user_id: String,
        email: Option<String>,
    },
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn resolve(&self, access_token: &str) -> Result<Identity, IdentityError>;

    async fn sign_up(&self, credentials: &Credentials) -> Result<SignUpOutcome, IdentityError>;

    async fn sign_in(&self, credentials: &Credentials) -> Result<AuthSession, IdentityError>;

    /// Revoke the session behind `access_token`.
    async fn sign_out(&self, access_token: &str) -> Result<(), IdentityError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSessionRequest {
    pub price_id: String,
    pub mode: CheckoutMode,
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSession {
    pub session_id: String,
    pub url: String,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CheckoutError {
    #[error("checkout is not configured")]
    Disabled,
    /// Message reported by the provider, safe to show to the user.
    #[error("{message}")]
    Rejected { status: u16, message: String },
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

#[async_trait]
pub trait CheckoutGateway: Send + Sync {
    async fn create_session(
        &self,
        request: &CheckoutSessionRequest,
        identity: &Identity,
    ) -> Result<CheckoutSession, CheckoutError>;
}
