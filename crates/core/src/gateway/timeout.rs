//! Deadline wrapper for payment gateways.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use carefund_shared::types::Money;

use super::{GatewayError, GatewayErrorKind, IntentVerification, PaymentGateway, PaymentIntent};

/// Bounds every call to the inner gateway by `limit`.
///
/// An elapsed call surfaces as a transient `Timeout` error. The donation it
/// belonged to stays `pending` and confirmation can simply be retried.
pub struct TimeoutGateway {
    inner: Arc<dyn PaymentGateway>,
    limit: Duration,
}

impl TimeoutGateway {
    /// Wraps `inner` with the given deadline.
    pub fn new(inner: Arc<dyn PaymentGateway>, limit: Duration) -> Self {
        Self { inner, limit }
    }

    fn elapsed(&self, operation: &str) -> GatewayError {
        let limit_ms = u64::try_from(self.limit.as_millis()).unwrap_or(u64::MAX);
        warn!(operation, limit_ms, "Payment gateway call timed out");
        GatewayError::new(
            GatewayErrorKind::Timeout,
            format!("{operation} did not complete within {limit_ms} ms"),
        )
    }
}

#[async_trait]
impl PaymentGateway for TimeoutGateway {
    async fn create_intent(
        &self,
        amount: Money,
        description: String,
    ) -> Result<PaymentIntent, GatewayError> {
        tokio::time::timeout(self.limit, self.inner.create_intent(amount, description))
            .await
            .map_err(|_| self.elapsed("create_intent"))?
    }

    async fn verify_intent(&self, intent_id: String) -> Result<IntentVerification, GatewayError> {
        tokio::time::timeout(self.limit, self.inner.verify_intent(intent_id))
            .await
            .map_err(|_| self.elapsed("verify_intent"))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{IntentStatus, MockPaymentGateway};
    use carefund_shared::types::Currency;

    #[tokio::test]
    async fn test_fast_call_passes_through() {
        let mut mock = MockPaymentGateway::new();
        mock.expect_verify_intent().returning(|id| {
            Ok(IntentVerification {
                id,
                status: IntentStatus::Succeeded,
                currency: Currency::Usd,
                processor: "stripe".into(),
            })
        });
        let fast = TimeoutGateway::new(Arc::new(mock), Duration::from_secs(1));
        let verified = fast.verify_intent("pi_1".into()).await.unwrap();
        assert_eq!(verified.status, IntentStatus::Succeeded);
    }

    struct Stalled;

    #[async_trait]
    impl PaymentGateway for Stalled {
        async fn create_intent(&self, _: Money, _: String) -> Result<PaymentIntent, GatewayError> {
            std::future::pending().await
        }

        async fn verify_intent(&self, _: String) -> Result<IntentVerification, GatewayError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_stalled_gateway_times_out() {
        let gateway = TimeoutGateway::new(Arc::new(Stalled), Duration::from_millis(20));
        let err = gateway.verify_intent("pi_1".into()).await.unwrap_err();
        assert_eq!(err.kind, GatewayErrorKind::Timeout);
        assert!(err.is_transient());

        let err = gateway
            .create_intent(
                Money::new(rust_decimal::Decimal::ONE, Currency::Usd),
                "Donation".into(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind, GatewayErrorKind::Timeout);
    }
}
