//! Donation checkout: resolves the caller, validates the product and asks the
//! payment provider for a hosted checkout session.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;
use url::Url;

use crate::application::providers::{
    CheckoutError, CheckoutGateway, CheckoutSession, CheckoutSessionRequest, IdentityError,
    IdentityProvider,
};
use crate::domain::error::DomainError;
use crate::domain::products::ProductCatalog;

/// Checkout inputs as received from the client. The billing mode always comes
/// from the catalog entry for `price_id`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartCheckoutCommand {
    pub price_id: String,
    pub success_url: Option<String>,
    pub cancel_url: Option<String>,
}

#[derive(Debug, Error)]
pub enum StartCheckoutError {
    #[error("sign in required")]
    Unauthenticated,
    #[error(transparent)]
    Identity(#[from] IdentityError),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Checkout(#[from] CheckoutError),
}

pub struct CheckoutService {
    catalog: ProductCatalog,
    identity: Arc<dyn IdentityProvider>,
    gateway: Arc<dyn CheckoutGateway>,
    success_url: String,
    cancel_url: String,
}

impl CheckoutService {
    pub fn new(
        catalog: ProductCatalog,
        identity: Arc<dyn IdentityProvider>,
        gateway: Arc<dyn CheckoutGateway>,
        success_url: impl Into<String>,
        cancel_url: impl Into<String>,
    ) -> Self {
        Self {
            catalog,
            identity,
            gateway,
            success_url: success_url.into(),
            cancel_url: cancel_url.into(),
        }
    }

    pub fn catalog(&self) -> &ProductCatalog {
        &self.catalog
    }

    /// Start a checkout for the bearer of `access_token`.
    pub async fn start(
        &self,
        access_token: Option<&str>,
        command: StartCheckoutCommand,
    ) -> Result<CheckoutSession, StartCheckoutError> {
        let token = access_token
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(StartCheckoutError::Unauthenticated)?;
        let identity = self.identity.resolve(token).await?;

        let product = self.catalog.require_price(command.price_id.trim())?;
        let request = CheckoutSessionRequest {
            price_id: product.price_id.clone(),
            mode: product.mode,
            success_url: return_url(command.success_url, &self.success_url)?,
            cancel_url: return_url(command.cancel_url, &self.cancel_url)?,
        };

        let session = self.gateway.create_session(&request, &identity).await?;
        info!(
            target = "application::checkout",
            user_id = %identity.user_id,
            price_id = %request.price_id,
            mode = request.mode.as_str(),
            session_id = %session.session_id,
            "Checkout session created"
        );
        Ok(session)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// A client-supplied return URL must share the configured URL's origin.
fn return_url(requested: Option<String>, configured: &str) -> Result<String, DomainError> {
    let Some(requested) = non_blank(requested) else {
        return Ok(configured.to_string());
    };
    let allowed = Url::parse(configured).ok().map(|url| url.origin());
    match (Url::parse(&requested), allowed) {
        (Ok(url), Some(origin)) if origin.is_tuple() && url.origin() == origin => Ok(requested),
        _ => Err(DomainError::ForeignReturnUrl { url: requested }),
    }
}
