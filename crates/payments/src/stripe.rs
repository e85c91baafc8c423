//! Stripe payment intents over HTTPS.
//!
//! Intents are created with a form-encoded `POST /v1/payment_intents` and read
//! back with `GET /v1/payment_intents/{id}`. Amounts travel in minor units.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use carefund_core::gateway::{
    GatewayError, GatewayErrorKind, IntentStatus, IntentVerification, PaymentGateway,
    PaymentIntent,
};
use carefund_shared::types::{Currency, Money};

/// Default Stripe API host.
pub const DEFAULT_API_BASE: &str = "https://api.stripe.com";

// Connect-level bound; the overall call is bounded by `TimeoutGateway`.
const CONNECT_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Deserialize)]
struct IntentBody {
    id: String,
    #[serde(default)]
    client_secret: Option<String>,
    status: String,
    currency: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Stripe-backed [`PaymentGateway`].
#[derive(Debug, Clone)]
pub struct StripeGateway {
    client: Client,
    api_base: String,
    secret_key: String,
}

impl StripeGateway {
    /// Creates a gateway authenticating with `secret_key` against `api_base`.
    pub fn new(secret_key: impl Into<String>, api_base: impl Into<String>) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| GatewayError::new(GatewayErrorKind::NetworkError, e.to_string()))?;
        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            secret_key: secret_key.into(),
        })
    }

    fn intents_url(&self) -> String {
        format!("{}/v1/payment_intents", self.api_base)
    }

    async fn read_intent(response: reqwest::Response) -> Result<IntentBody, GatewayError> {
        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;
        if !status.is_success() {
            let error = classify_error(status, &body);
            warn!(http_status = %status, kind = %error.kind, "Stripe request failed");
            return Err(error);
        }
        serde_json::from_str(&body).map_err(|e| {
            GatewayError::new(
                GatewayErrorKind::InvalidRequest,
                format!("Unreadable payment intent: {e}"),
            )
        })
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_intent(&self, money: Money, description: String) -> Result<PaymentIntent, GatewayError> {
        let form = intent_form(money, &description)?;
        let response = self
            .client
            .post(self.intents_url())
            .bearer_auth(&self.secret_key)
            .form(&form)
            .send()
            .await
            .map_err(transport_error)?;

        let intent = Self::read_intent(response).await?;
        let client_secret = intent.client_secret.ok_or_else(|| {
            GatewayError::new(
                GatewayErrorKind::InvalidRequest,
                "Payment intent has no client secret",
            )
        })?;
        let currency = parse_currency(&intent.currency)?;
        debug!(intent_id = %intent.id, amount = %money.amount, %currency, "Stripe intent created");

        Ok(PaymentIntent {
            id: intent.id,
            client_secret,
            currency,
        })
    }

    async fn verify_intent(&self, intent_id: String) -> Result<IntentVerification, GatewayError> {
        let response = self
            .client
            .get(format!("{}/{intent_id}", self.intents_url()))
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(transport_error)?;

        let intent = Self::read_intent(response).await?;
        let status = map_status(&intent.status);
        debug!(intent_id = %intent.id, stripe_status = %intent.status, %status, "Stripe intent verified");

        Ok(IntentVerification {
            id: intent.id,
            status,
            currency: parse_currency(&intent.currency)?,
            processor: "stripe".to_string(),
        })
    }
}

/// Form fields for a card payment intent.
fn intent_form(money: Money, description: &str) -> Result<Vec<(&'static str, String)>, GatewayError> {
    let minor = money
        .to_minor_units()
        .filter(|m| *m > 0)
        .ok_or_else(|| {
            GatewayError::new(
                GatewayErrorKind::InvalidRequest,
                format!("Amount {} cannot be charged", money.amount),
            )
        })?;
    Ok(vec![
        ("amount", minor.to_string()),
        ("currency", money.currency.as_lower().to_string()),
        ("description", description.to_string()),
        ("payment_method_types[]", "card".to_string()),
    ])
}

/// Collapses Stripe's intent lifecycle onto the three outcomes the ledger acts on.
///
/// Only `succeeded` and `canceled` are final; every other status can still
/// move, so it reads as pending.
fn map_status(status: &str) -> IntentStatus {
    match status {
        "succeeded" => IntentStatus::Succeeded,
        "canceled" => IntentStatus::Failed,
        _ => IntentStatus::Pending,
    }
}

fn parse_currency(code: &str) -> Result<Currency, GatewayError> {
    code.parse()
        .map_err(|e: String| GatewayError::new(GatewayErrorKind::InvalidRequest, e))
}

fn classify_error(status: StatusCode, body: &str) -> GatewayError {
    let detail = serde_json::from_str::<ErrorEnvelope>(body).ok().map(|e| e.error);
    let error_type = detail.as_ref().and_then(|d| d.kind.as_deref());
    let message = detail
        .as_ref()
        .and_then(|d| d.message.clone())
        .unwrap_or_else(|| format!("HTTP {status}"));

    let kind = match (status, error_type) {
        (StatusCode::TOO_MANY_REQUESTS, _) => GatewayErrorKind::RateLimited,
        (StatusCode::UNAUTHORIZED, _) | (_, Some("authentication_error")) => {
            GatewayErrorKind::AuthFailed
        }
        (_, Some("card_error")) => GatewayErrorKind::CardError,
        (s, _) if s.is_server_error() => GatewayErrorKind::NetworkError,
        _ => GatewayErrorKind::InvalidRequest,
    };
    GatewayError::new(kind, message)
}

fn transport_error(err: reqwest::Error) -> GatewayError {
    let kind = if err.is_timeout() {
        GatewayErrorKind::Timeout
    } else {
        GatewayErrorKind::NetworkError
    };
    GatewayError::new(kind, format!("Network error connecting to Stripe: {err}"))
}
