//! Account endpoints of a hosted auth service: bearer-token lookup against its
//! user endpoint plus sign-up, password sign-in and sign-out on the sibling
//! `signup`, `token` and `logout` routes.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{
    Client, RequestBuilder, StatusCode,
    header::{AUTHORIZATION, HeaderValue},
};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::application::providers::{
    AuthSession, Identity, IdentityError, IdentityProvider, ProviderError, SignUpOutcome,
};
use crate::config::IdentitySettings;
use crate::domain::account::Credentials;

use super::error::InfraError;

pub(crate) const API_KEY_HEADER: &str = "apikey";
const IDENTITY_TIMEOUT: Duration = Duration::from_secs(10);
const SIGN_UP_PATH: &str = "signup";
const SIGN_IN_PATH: &str = "token?grant_type=password";
const SIGN_OUT_PATH: &str = "logout";

#[derive(Debug, Deserialize)]
struct UserInfo {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Serialize)]
struct CredentialsPayload<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenReply {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
    user: UserInfo,
}

/// Sign-up answers with a session when confirmation is off and with the bare
/// user otherwise.
#[derive(Debug, Deserialize)]
struct SignUpReply {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
    #[serde(default)]
    user: Option<UserInfo>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct AuthErrorReply {
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl AuthErrorReply {
    fn into_message(self) -> Option<String> {
        [self.error_description, self.msg, self.message, self.error]
            .into_iter()
            .flatten()
            .map(|message| message.trim().to_string())
            .find(|message| !message.is_empty())
    }
}

pub struct HttpIdentityProvider {
    client: Client,
    userinfo_url: Url,
    api_key: Option<String>,
}

impl HttpIdentityProvider {
    pub fn new(userinfo_url: Url, api_key: Option<String>) -> Result<Self, InfraError> {
        let client = Client::builder()
            .timeout(IDENTITY_TIMEOUT)
            .build()
            .map_err(|err| InfraError::upstream("identity", err.to_string()))?;
        Ok(Self {
            client,
            userinfo_url,
            api_key,
        })
    }

    /// Resolve an account route next to the configured user endpoint.
    fn sibling(&self, path: &str) -> Result<Url, IdentityError> {
        sibling_url(&self.userinfo_url, path)
    }

    fn with_api_key(&self, request: RequestBuilder) -> RequestBuilder {
        match self.api_key.as_deref() {
            Some(key) => request.header(API_KEY_HEADER, key),
            None => request,
        }
    }

    async fn post_credentials(
        &self,
        path: &str,
        credentials: &Credentials,
    ) -> Result<(StatusCode, Vec<u8>), IdentityError> {
        let payload = CredentialsPayload {
            email: credentials.email(),
            password: credentials.password(),
        };
        let request = self
            .with_api_key(self.client.post(self.sibling(path)?))
            .json(&payload);
        let response = request.send().await.map_err(ProviderError::network)?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(ProviderError::network)?;
        Ok((status, bytes.to_vec()))
    }
}

fn bearer(access_token: &str) -> Result<HeaderValue, IdentityError> {
    HeaderValue::from_str(&format!("Bearer {access_token}")).map_err(|_| IdentityError::Invalid)
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn resolve(&self, access_token: &str) -> Result<Identity, IdentityError> {
        let request = self
            .with_api_key(self.client.get(self.userinfo_url.clone()))
            .header(AUTHORIZATION, bearer(access_token)?);

        let response = request.send().await.map_err(ProviderError::network)?;
        let status = response.status();
        if let Some(err) = identity_status_error(status) {
            debug!(
                target = "gitreader::identity",
                status = status.as_u16(),
                "Identity lookup rejected"
            );
            return Err(err);
        }

        let bytes = response.bytes().await.map_err(ProviderError::network)?;
        let user: UserInfo = serde_json::from_slice(&bytes).map_err(ProviderError::decode)?;
        Ok(Identity {
            user_id: user.id,
            email: user.email,
            access_token: access_token.to_string(),
        })
    }

    async fn sign_up(&self, credentials: &Credentials) -> Result<SignUpOutcome, IdentityError> {
        let (status, body) = self.post_credentials(SIGN_UP_PATH, credentials).await?;
        interpret_sign_up(status, &body)
    }

    async fn sign_in(&self, credentials: &Credentials) -> Result<AuthSession, IdentityError> {
        let (status, body) = self.post_credentials(SIGN_IN_PATH, credentials).await?;
        interpret_token(status, &body)
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), IdentityError> {
        let request = self
            .with_api_key(self.client.post(self.sibling(SIGN_OUT_PATH)?))
            .header(AUTHORIZATION, bearer(access_token)?);
        let response = request.send().await.map_err(ProviderError::network)?;
        match identity_status_error(response.status()) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

fn sibling_url(userinfo_url: &Url, path: &str) -> Result<Url, IdentityError> {
    userinfo_url
        .join(path)
        .map_err(|err| IdentityError::Provider(ProviderError::network(err)))
}

fn identity_status_error(status: StatusCode) -> Option<IdentityError> {
    match status {
        status if status.is_success() => None,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Some(IdentityError::Invalid),
        StatusCode::TOO_MANY_REQUESTS => Some(IdentityError::Provider(
            ProviderError::RateLimited { retry_after: None },
        )),
        other => Some(IdentityError::Provider(ProviderError::Failed {
            status: other.as_u16(),
        })),
    }
}

/// Failed sign-up or sign-in. Client errors carry the provider's message.
fn auth_failure(status: StatusCode, body: &[u8]) -> IdentityError {
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        return identity_status_error(status).unwrap_or(IdentityError::Provider(
            ProviderError::Failed {
                status: status.as_u16(),
            },
        ));
    }

    let message = serde_json::from_slice::<AuthErrorReply>(body)
        .ok()
        .and_then(AuthErrorReply::into_message);
    debug!(
        target = "gitreader::identity",
        status = status.as_u16(),
        "Account request rejected"
    );
    match message {
        Some(message) => IdentityError::Rejected {
            status: status.as_u16(),
            message,
        },
        None => identity_status_error(status).unwrap_or(IdentityError::Provider(
            ProviderError::Failed {
                status: status.as_u16(),
            },
        )),
    }
}

fn interpret_token(status: StatusCode, body: &[u8]) -> Result<AuthSession, IdentityError> {
    if !status.is_success() {
        return Err(auth_failure(status, body));
    }
    let reply: TokenReply = serde_json::from_slice(body).map_err(ProviderError::decode)?;
    Ok(AuthSession {
        access_token: reply.access_token,
        expires_in: reply.expires_in,
        user_id: reply.user.id,
        email: reply.user.email,
    })
}

fn interpret_sign_up(status: StatusCode, body: &[u8]) -> Result<SignUpOutcome, IdentityError> {
    if !status.is_success() {
        return Err(auth_failure(status, body));
    }
    let reply: SignUpReply = serde_json::from_slice(body).map_err(ProviderError::decode)?;
    let (user_id, email) = match (reply.user, reply.id) {
        (Some(user), _) => (user.id, user.email),
        (None, Some(id)) => (id, reply.email),
        (None, None) => {
            return Err(ProviderError::decode("sign-up reply has no user").into());
        }
    };

    Ok(match reply.access_token {
        Some(access_token) => SignUpOutcome::SignedIn(AuthSession {
            access_token,
            expires_in: reply.expires_in,
            user_id,
            email,
        }),
        None => SignUpOutcome::ConfirmationRequired { user_id, email },
    })
}

/// Used when no identity endpoint is configured; every lookup fails.
pub struct DisabledIdentity;

#[async_trait]
impl IdentityProvider for DisabledIdentity {
    async fn resolve(&self, _access_token: &str) -> Result<Identity, IdentityError> {
        Err(IdentityError::Disabled)
    }

    async fn sign_up(&self, _credentials: &Credentials) -> Result<SignUpOutcome, IdentityError> {
        Err(IdentityError::Disabled)
    }

    async fn sign_in(&self, _credentials: &Credentials) -> Result<AuthSession, IdentityError> {
        Err(IdentityError::Disabled)
    }

    async fn sign_out(&self, _access_token: &str) -> Result<(), IdentityError> {
        Err(IdentityError::Disabled)
    }
}

/// Pick the identity backend the settings describe.
pub fn identity_provider(
    settings: &IdentitySettings,
) -> Result<Arc<dyn IdentityProvider>, InfraError> {
    match settings.userinfo_url.clone() {
        Some(url) => Ok(Arc::new(HttpIdentityProvider::new(
            url,
            settings.api_key.clone(),
        )?)),
        None => Ok(Arc::new(DisabledIdentity)),
    }
}
