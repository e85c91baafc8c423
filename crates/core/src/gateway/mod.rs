//! Payment gateway port.
//!
//! The donation workflow talks to the payment processor only through
//! [`PaymentGateway`]. Production uses the Stripe adapter from
//! `carefund-payments`; development and tests use [`SandboxGateway`].
//!
//! # Modules
//!
//! - `sandbox` - In-process gateway with scriptable settlement
//! - `timeout` - Bounded-latency wrapper around any gateway

pub mod sandbox;
pub mod timeout;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use carefund_shared::types::{Currency, Money};

pub use sandbox::SandboxGateway;
pub use timeout::TimeoutGateway;

/// Handle returned when a payment intent is opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntent {
    /// Gateway intent id, stored as the donation's `transaction_id`.
    pub id: String,
    /// Secret the client uses to complete payment out of band.
    pub client_secret: String,
    /// Currency the intent was opened in.
    pub currency: Currency,
}

/// Settlement state reported by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntentStatus {
    /// Payment captured.
    Succeeded,
    /// Still waiting on the payer or the processor.
    Pending,
    /// Payment will not complete.
    Failed,
}

impl IntentStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Pending => "pending",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for IntentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of verifying an intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentVerification {
    /// Intent id that was verified.
    pub id: String,
    /// Reported settlement state.
    pub status: IntentStatus,
    /// Currency the payment settled in.
    pub currency: Currency,
    /// Processor that handled the payment, e.g. `stripe`.
    pub processor: String,
}

/// Gateway failure categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayErrorKind {
    /// The card was declined or is unusable.
    CardError,
    /// The processor throttled the request.
    RateLimited,
    /// The request was malformed or referenced an unknown intent.
    InvalidRequest,
    /// The gateway credentials were rejected.
    AuthFailed,
    /// The processor could not be reached.
    NetworkError,
    /// The call exceeded its deadline.
    Timeout,
}

impl GatewayErrorKind {
    /// Returns the wire name of the kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CardError => "card_error",
            Self::RateLimited => "rate_limited",
            Self::InvalidRequest => "invalid_request",
            Self::AuthFailed => "auth_failed",
            Self::NetworkError => "network_error",
            Self::Timeout => "timeout",
        }
    }
}

impl fmt::Display for GatewayErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error raised by a payment gateway.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Payment gateway {kind}: {message}")]
pub struct GatewayError {
    /// Failure category.
    pub kind: GatewayErrorKind,
    /// Processor-supplied detail.
    pub message: String,
}

impl GatewayError {
    /// Creates a gateway error.
    pub fn new(kind: GatewayErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Returns true if retrying the same call later may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self.kind,
            GatewayErrorKind::RateLimited | GatewayErrorKind::NetworkError | GatewayErrorKind::Timeout
        )
    }
}

/// Creates and verifies payment intents.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Opens an intent for `amount`, labelled with `description`.
    async fn create_intent(
        &self,
        amount: Money,
        description: String,
    ) -> Result<PaymentIntent, GatewayError>;

    /// Looks up the settlement state of an intent.
    async fn verify_intent(&self, intent_id: String) -> Result<IntentVerification, GatewayError>;
}
