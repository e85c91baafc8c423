//! In-process payment gateway for development and tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

use carefund_shared::types::{Currency, Money};

use super::{
    GatewayError, GatewayErrorKind, IntentStatus, IntentVerification, PaymentGateway,
    PaymentIntent,
};

#[derive(Debug, Clone)]
struct SandboxIntent {
    amount: Money,
    status: IntentStatus,
    settled_currency: Currency,
}

#[derive(Debug, Default)]
struct SandboxState {
    intents: HashMap<String, SandboxIntent>,
    create_failures: VecDeque<GatewayError>,
    verify_failures: VecDeque<GatewayError>,
}

/// A gateway that never leaves the process.
///
/// Intents start `pending` unless an auto-settle status is configured. Tests
/// drive settlement with [`SandboxGateway::settle`] and queue failures with
/// [`SandboxGateway::fail_next_create`] / [`SandboxGateway::fail_next_verify`].
#[derive(Debug, Default)]
pub struct SandboxGateway {
    state: Mutex<SandboxState>,
    auto_settle: Option<IntentStatus>,
    verify_calls: AtomicUsize,
}

impl SandboxGateway {
    /// Creates a sandbox whose intents stay `pending` until settled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a sandbox that settles every new intent to `status` immediately.
    #[must_use]
    pub fn auto_settling(status: IntentStatus) -> Self {
        Self {
            auto_settle: Some(status),
            ..Self::default()
        }
    }

    fn state(&self) -> MutexGuard<'_, SandboxState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sets the settlement state of an intent. Returns false for unknown ids.
    pub fn settle(&self, intent_id: &str, status: IntentStatus) -> bool {
        match self.state().intents.get_mut(intent_id) {
            Some(intent) => {
                intent.status = status;
                true
            }
            None => false,
        }
    }

    /// Settles an intent in a currency other than the one it was opened in.
    pub fn settle_in(&self, intent_id: &str, status: IntentStatus, currency: Currency) -> bool {
        match self.state().intents.get_mut(intent_id) {
            Some(intent) => {
                intent.status = status;
                intent.settled_currency = currency;
                true
            }
            None => false,
        }
    }

    /// Makes the next `create_intent` call fail with `error`.
    pub fn fail_next_create(&self, error: GatewayError) {
        self.state().create_failures.push_back(error);
    }

    /// Makes the next `verify_intent` call fail with `error`.
    pub fn fail_next_verify(&self, error: GatewayError) {
        self.state().verify_failures.push_back(error);
    }

    /// Number of `verify_intent` calls received so far.
    pub fn verify_calls(&self) -> usize {
        self.verify_calls.load(Ordering::SeqCst)
    }

    /// Amount an intent was opened for.
    pub fn intent_amount(&self, intent_id: &str) -> Option<Money> {
        self.state().intents.get(intent_id).map(|i| i.amount)
    }
}

#[async_trait]
impl PaymentGateway for SandboxGateway {
    async fn create_intent(
        &self,
        amount: Money,
        description: String,
    ) -> Result<PaymentIntent, GatewayError> {
        let mut state = self.state();
        if let Some(err) = state.create_failures.pop_front() {
            return Err(err);
        }
        if !amount.is_positive() || amount.to_minor_units().is_none() {
            return Err(GatewayError::new(
                GatewayErrorKind::InvalidRequest,
                format!("Invalid amount {}", amount.amount),
            ));
        }

        let token = Uuid::new_v4().simple().to_string();
        let id = format!("pi_sandbox_{}", &token[..24]);
        let client_secret = format!("{id}_secret_{}", &token[24..]);
        state.intents.insert(
            id.clone(),
            SandboxIntent {
                amount,
                status: self.auto_settle.unwrap_or(IntentStatus::Pending),
                settled_currency: amount.currency,
            },
        );
        debug!(intent_id = %id, amount = %amount.amount, %description, "Sandbox intent created");

        Ok(PaymentIntent {
            id,
            client_secret,
            currency: amount.currency,
        })
    }

    async fn verify_intent(&self, intent_id: String) -> Result<IntentVerification, GatewayError> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state();
        if let Some(err) = state.verify_failures.pop_front() {
            return Err(err);
        }
        let intent = state.intents.get(&intent_id).ok_or_else(|| {
            GatewayError::new(
                GatewayErrorKind::InvalidRequest,
                format!("No such payment_intent: '{intent_id}'"),
            )
        })?;
        Ok(IntentVerification {
            status: intent.status,
            currency: intent.settled_currency,
            processor: "sandbox".to_string(),
            id: intent_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn usd(amount: rust_decimal::Decimal) -> Money {
        Money::new(amount, Currency::Usd)
    }

    #[tokio::test]
    async fn test_intent_lifecycle() {
        let gateway = SandboxGateway::new();
        let intent = gateway.create_intent(usd(dec!(25)), "Donation".into()).await.unwrap();
        assert!(intent.id.starts_with("pi_"));
        assert!(intent.client_secret.starts_with(&intent.id));
        assert_eq!(gateway.intent_amount(&intent.id), Some(usd(dec!(25))));

        let verified = gateway.verify_intent(intent.id.clone()).await.unwrap();
        assert_eq!(verified.status, IntentStatus::Pending);

        assert!(gateway.settle(&intent.id, IntentStatus::Succeeded));
        let verified = gateway.verify_intent(intent.id.clone()).await.unwrap();
        assert_eq!(verified.status, IntentStatus::Succeeded);
        assert_eq!(verified.currency, Currency::Usd);
        assert_eq!(gateway.verify_calls(), 2);
    }

    #[tokio::test]
    async fn test_auto_settle() {
        let gateway = SandboxGateway::auto_settling(IntentStatus::Failed);
        let intent = gateway.create_intent(usd(dec!(5)), "Donation".into()).await.unwrap();
        let verified = gateway.verify_intent(intent.id).await.unwrap();
        assert_eq!(verified.status, IntentStatus::Failed);
    }

    #[tokio::test]
    async fn test_rejects_bad_amounts() {
        let gateway = SandboxGateway::new();
        for amount in [dec!(0), dec!(-3), dec!(1.005)] {
            let err = gateway.create_intent(usd(amount), "Donation".into()).await.unwrap_err();
            assert_eq!(err.kind, GatewayErrorKind::InvalidRequest);
        }
    }

    #[tokio::test]
    async fn test_queued_failures_fire_once() {
        let gateway = SandboxGateway::new();
        gateway.fail_next_create(GatewayError::new(GatewayErrorKind::CardError, "declined"));
        assert!(gateway.create_intent(usd(dec!(1)), "d".into()).await.is_err());
        let intent = gateway.create_intent(usd(dec!(1)), "d".into()).await.unwrap();

        gateway.fail_next_verify(GatewayError::new(GatewayErrorKind::NetworkError, "reset"));
        let err = gateway.verify_intent(intent.id.clone()).await.unwrap_err();
        assert!(err.is_transient());
        assert!(gateway.verify_intent(intent.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_unknown_intent() {
        let gateway = SandboxGateway::new();
        let err = gateway.verify_intent("pi_missing".into()).await.unwrap_err();
        assert_eq!(err.kind, GatewayErrorKind::InvalidRequest);
        assert!(!gateway.settle("pi_missing", IntentStatus::Succeeded));
    }
}
