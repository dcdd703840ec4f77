//! Email and password accounts proxied to the identity provider.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::application::providers::{AuthSession, IdentityError, IdentityProvider, SignUpOutcome};
use crate::domain::account::Credentials;
use crate::domain::error::DomainError;

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("sign in required")]
    Unauthenticated,
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Identity(#[from] IdentityError),
}

pub struct AccountService {
    identity: Arc<dyn IdentityProvider>,
}

impl AccountService {
    pub fn new(identity: Arc<dyn IdentityProvider>) -> Self {
        Self { identity }
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, AccountError> {
        let credentials = Credentials::new(email, password)?;
        let outcome = self.identity.sign_up(&credentials).await?;
        info!(
            target = "application::account",
            confirmation_required = matches!(outcome, SignUpOutcome::ConfirmationRequired { .. }),
            "Account created"
        );
        Ok(outcome)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AccountError> {
        let credentials = Credentials::new(email, password)?;
        let session = self.identity.sign_in(&credentials).await?;
        info!(
            target = "application::account",
            user_id = %session.user_id,
            "Signed in"
        );
        Ok(session)
    }

    /// An already expired or revoked token counts as signed out.
    pub async fn sign_out(&self, access_token: Option<&str>) -> Result<(), AccountError> {
        let token = access_token
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(AccountError::Unauthenticated)?;

        match self.identity.sign_out(token).await {
            Ok(()) => Ok(()),
            Err(IdentityError::Invalid) => {
                debug!(
                    target = "application::account",
                    "Sign-out with a stale token"
                );
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }
}
