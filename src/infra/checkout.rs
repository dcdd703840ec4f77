//! Hosted checkout session creation through a serverless payment function.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{
    Client, StatusCode,
    header::{AUTHORIZATION, HeaderValue},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::application::providers::{
    CheckoutError, CheckoutGateway, CheckoutSession, CheckoutSessionRequest, Identity,
    ProviderError,
};
use crate::config::CheckoutSettings;

use super::error::InfraError;
use super::identity::API_KEY_HEADER;

const CHECKOUT_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Serialize)]
struct SessionPayload<'a> {
    price_id: &'a str,
    mode: &'a str,
    success_url: &'a str,
    cancel_url: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionReply {
    #[serde(default)]
    session_id: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

pub struct HttpCheckoutGateway {
    client: Client,
    endpoint: Url,
    api_key: Option<String>,
}

impl HttpCheckoutGateway {
    pub fn new(endpoint: Url, api_key: Option<String>) -> Result<Self, InfraError> {
        let client = Client::builder()
            .timeout(CHECKOUT_TIMEOUT)
            .build()
            .map_err(|err| InfraError::upstream("checkout", err.to_string()))?;
        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }
}

#[async_trait]
impl CheckoutGateway for HttpCheckoutGateway {
    async fn create_session(
        &self,
        request: &CheckoutSessionRequest,
        identity: &Identity,
    ) -> Result<CheckoutSession, CheckoutError> {
        let payload = SessionPayload {
            price_id: &request.price_id,
            mode: request.mode.as_str(),
            success_url: &request.success_url,
            cancel_url: &request.cancel_url,
        };
        let bearer = HeaderValue::from_str(&format!("Bearer {}", identity.access_token))
            .map_err(ProviderError::network)?;

        let mut builder = self
            .client
            .post(self.endpoint.clone())
            .header(AUTHORIZATION, bearer)
            .json(&payload);
        if let Some(key) = self.api_key.as_deref() {
            builder = builder.header(API_KEY_HEADER, key);
        }

        let response = builder.send().await.map_err(ProviderError::network)?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(ProviderError::network)?;
        interpret_reply(status, &bytes)
    }
}

fn interpret_reply(status: StatusCode, body: &[u8]) -> Result<CheckoutSession, CheckoutError> {
    let reply = serde_json::from_slice::<SessionReply>(body).ok();

    if !status.is_success() {
        return Err(match reply.and_then(|reply| reply.error) {
            Some(message) => CheckoutError::Rejected {
                status: status.as_u16(),
                message,
            },
            None => CheckoutError::Provider(ProviderError::Failed {
                status: status.as_u16(),
            }),
        });
    }

    let reply = reply.ok_or_else(|| ProviderError::decode("checkout reply is not JSON"))?;
    if let Some(message) = reply.error {
        return Err(CheckoutError::Rejected {
            status: status.as_u16(),
            message,
        });
    }

    match (reply.session_id, reply.url) {
        (Some(session_id), Some(url)) => Ok(CheckoutSession { session_id, url }),
        _ => Err(ProviderError::decode("checkout reply is missing the session URL").into()),
    }
}

/// Used when no checkout endpoint is configured.
pub struct DisabledCheckout;

#[async_trait]
impl CheckoutGateway for DisabledCheckout {
    async fn create_session(
        &self,
        _request: &CheckoutSessionRequest,
        _identity: &Identity,
    ) -> Result<CheckoutSession, CheckoutError> {
        Err(CheckoutError::Disabled)
    }
}

/// Pick the checkout backend the settings describe.
pub fn checkout_gateway(
    settings: &CheckoutSettings,
) -> Result<Arc<dyn CheckoutGateway>, InfraError> {
    match settings.endpoint.clone() {
        Some(endpoint) => Ok(Arc::new(HttpCheckoutGateway::new(
            endpoint,
            settings.api_key.clone(),
        )?)),
        None => Ok(Arc::new(DisabledCheckout)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn successful_reply_yields_session() {
        let session = interpret_reply(
            StatusCode::OK,
            br#"{"sessionId":"cs_test_1","url":"https://checkout.stripe.com/c/pay/cs_test_1"}"#,
        )
        .expect("session");
        assert_eq!(session.session_id, "cs_test_1");
        assert!(session.url.starts_with("https://checkout.stripe.com/"));
    }

    #[test]
    fn error_message_is_surfaced() {
        let err = interpret_reply(
            StatusCode::BAD_REQUEST,
            br#"{"error":"No such price: 'price_x'"}"#,
        )
        .expect_err("rejected");
        assert_eq!(
            err,
            CheckoutError::Rejected {
                status: 400,
                message: "No such price: 'price_x'".to_string()
            }
        );
        assert_eq!(err.to_string(), "No such price: 'price_x'");
    }

    #[test]
    fn opaque_failure_keeps_status() {
        let err = interpret_reply(StatusCode::BAD_GATEWAY, b"<html>bad gateway</html>")
            .expect_err("failed");
        assert_eq!(
            err,
            CheckoutError::Provider(ProviderError::Failed { status: 502 })
        );
    }

    #[test]
    fn missing_url_is_a_decode_error() {
        let err = interpret_reply(StatusCode::OK, br#"{"sessionId":"cs_test_1"}"#)
            .expect_err("incomplete");
        assert!(matches!(
            err,
            CheckoutError::Provider(ProviderError::Decode(_))
        ));
    }

    #[test]
    fn session_payload_uses_snake_case_fields() {
        let payload = SessionPayload {
            price_id: "price_1",
            mode: "payment",
            success_url: "https://example.com/success",
            cancel_url: "https://example.com/cancel",
        };
        let json = serde_json::to_value(&payload).expect("serialize");
        assert_eq!(json["price_id"], "price_1");
        assert_eq!(json["mode"], "payment");
        assert_eq!(json["cancel_url"], "https://example.com/cancel");
    }
}
