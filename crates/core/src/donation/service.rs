//! Donation state machine.
//!
//! Pure transition logic. `DonationWorkflow` feeds it the stored donation and
//! the gateway's verification and persists whatever action comes back.

use chrono::Utc;

use carefund_shared::types::PaymentRecordId;

use crate::donation::types::{
    Donation, DonationAction, DonationStatus, NewDonation, PaymentRecord,
};
use crate::error::{FundingError, FundingResult};
use crate::gateway::{IntentStatus, IntentVerification};
use crate::ledger::validate_amount;

/// Longest donor message accepted.
pub const MAX_MESSAGE_LEN: usize = 1000;

fn invalid(from: DonationStatus, to: DonationStatus) -> FundingError {
    FundingError::InvalidTransition {
        entity: "donation",
        from: from.as_str(),
        to: to.as_str(),
    }
}

/// Stateless service for donation transitions.
pub struct DonationService;

impl DonationService {
    /// Validates a donation request before any gateway call.
    pub fn validate_new(input: &NewDonation) -> FundingResult<()> {
        validate_amount(input.amount)?;
        if input
            .message
            .as_ref()
            .is_some_and(|m| m.chars().count() > MAX_MESSAGE_LEN)
        {
            return Err(FundingError::Validation(format!(
                "Donor message must be at most {MAX_MESSAGE_LEN} characters"
            )));
        }
        Ok(())
    }

    /// Complete a pending donation.
    pub fn complete(current: DonationStatus) -> FundingResult<DonationAction> {
        match current {
            DonationStatus::Pending => Ok(DonationAction::Complete {
                new_status: DonationStatus::Completed,
                completed_at: Utc::now(),
            }),
            _ => Err(invalid(current, DonationStatus::Completed)),
        }
    }

    /// Fail a pending donation.
    pub fn fail(current: DonationStatus, reason: String) -> FundingResult<DonationAction> {
        match current {
            DonationStatus::Pending => Ok(DonationAction::Fail {
                new_status: DonationStatus::Failed,
                reason,
            }),
            _ => Err(invalid(current, DonationStatus::Failed)),
        }
    }

    /// Decides what a verified intent means for a pending donation.
    ///
    /// # Returns
    /// * `Ok(Complete)` if the intent succeeded in the donation's currency
    /// * `Ok(Fail)` for any other verified status, or a capture in another currency
    /// * `Err(InvalidTransition)` if the donation is already resolved
    pub fn decide(
        donation: &Donation,
        verification: &IntentVerification,
    ) -> FundingResult<DonationAction> {
        match verification.status {
            IntentStatus::Succeeded if verification.currency == donation.currency => {
                Self::complete(donation.status)
            }
            IntentStatus::Succeeded => Self::fail(
                donation.status,
                format!(
                    "Payment settled in {} but the donation was opened in {}",
                    verification.currency, donation.currency
                ),
            ),
            IntentStatus::Failed => Self::fail(donation.status, "Payment failed".to_string()),
            IntentStatus::Pending => Self::fail(
                donation.status,
                "Payment not completed (status: pending)".to_string(),
            ),
        }
    }

    /// Applies a validated action to the donation record.
    pub fn apply(donation: &mut Donation, action: DonationAction) {
        donation.status = action.new_status();
        match action {
            DonationAction::Complete { completed_at, .. } => {
                donation.completed_at = Some(completed_at);
            }
            DonationAction::Fail { reason, .. } => {
                donation.failure_reason = Some(reason);
            }
        }
    }

    /// Builds the payment record for a donation that `apply` just resolved.
    #[must_use]
    pub fn payment_record(donation: &Donation, verification: &IntentVerification) -> PaymentRecord {
        PaymentRecord {
            id: PaymentRecordId::new(),
            donation_id: donation.id,
            payment_method: verification.processor.clone(),
            transaction_reference: verification.id.clone(),
            amount: donation.amount,
            currency: verification.currency,
            status: verification.status,
            error_message: donation.failure_reason.clone(),
            processed_at: donation.completed_at.unwrap_or_else(Utc::now),
        }
    }

    /// Check if a status transition is valid.
    #[must_use]
    pub fn is_valid_transition(from: DonationStatus, to: DonationStatus) -> bool {
        matches!(
            (from, to),
            (
                DonationStatus::Pending,
                DonationStatus::Completed | DonationStatus::Failed
            )
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carefund_shared::types::{CampaignId, Currency, DonationId};
    use rust_decimal_macros::dec;

    fn pending() -> Donation {
        Donation {
            id: DonationId::new(),
            campaign_id: CampaignId::new(),
            donor_id: None,
            amount: dec!(40),
            currency: Currency::Usd,
            status: DonationStatus::Pending,
            transaction_id: "pi_test".into(),
            is_anonymous: false,
            donor_message: None,
            failure_reason: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    fn verified(status: IntentStatus, currency: Currency) -> IntentVerification {
        IntentVerification {
            id: "pi_test".into(),
            status,
            currency,
            processor: "stripe".into(),
        }
    }

    #[test]
    fn test_succeeded_completes() {
        let mut donation = pending();
        let action =
            DonationService::decide(&donation, &verified(IntentStatus::Succeeded, Currency::Usd))
                .unwrap();
        DonationService::apply(&mut donation, action);
        assert_eq!(donation.status, DonationStatus::Completed);
        assert!(donation.completed_at.is_some());
    }

    #[test]
    fn test_failed_fails() {
        let action =
            DonationService::decide(&pending(), &verified(IntentStatus::Failed, Currency::Usd))
                .unwrap();
        assert_eq!(action.new_status(), DonationStatus::Failed);
    }

    #[test]
    fn test_currency_mismatch_fails() {
        let mut donation = pending();
        let action =
            DonationService::decide(&donation, &verified(IntentStatus::Succeeded, Currency::Eur))
                .unwrap();
        DonationService::apply(&mut donation, action);
        assert_eq!(donation.status, DonationStatus::Failed);
        assert!(donation.failure_reason.unwrap().contains("EUR"));
    }

    #[test]
    fn test_payment_record_mirrors_resolution() {
        let mut donation = pending();
        let verification = verified(IntentStatus::Succeeded, Currency::Usd);
        let action = DonationService::decide(&donation, &verification).unwrap();
        DonationService::apply(&mut donation, action);

        let record = DonationService::payment_record(&donation, &verification);
        assert_eq!(record.donation_id, donation.id);
        assert_eq!(record.payment_method, "stripe");
        assert_eq!(record.transaction_reference, "pi_test");
        assert_eq!(record.amount, dec!(40));
        assert_eq!(record.status, IntentStatus::Succeeded);
        assert_eq!(Some(record.processed_at), donation.completed_at);
        assert!(record.error_message.is_none());
    }

    #[test]
    fn test_payment_record_keeps_settled_currency_and_reason() {
        let mut donation = pending();
        let verification = verified(IntentStatus::Succeeded, Currency::Lkr);
        let action = DonationService::decide(&donation, &verification).unwrap();
        DonationService::apply(&mut donation, action);

        let record = DonationService::payment_record(&donation, &verification);
        assert_eq!(record.currency, Currency::Lkr);
        assert_eq!(record.status, IntentStatus::Succeeded);
        assert!(record.error_message.unwrap().contains("LKR"));
    }

    #[test]
    fn test_unfinished_intent_fails() {
        let mut donation = pending();
        let action =
            DonationService::decide(&donation, &verified(IntentStatus::Pending, Currency::Usd))
                .unwrap();
        DonationService::apply(&mut donation, action);
        assert_eq!(donation.status, DonationStatus::Failed);
        assert!(donation.completed_at.is_none());
        assert!(donation.failure_reason.unwrap().contains("pending"));
    }

    #[test]
    fn test_resolved_donation_cannot_move() {
        let mut donation = pending();
        donation.status = DonationStatus::Completed;
        for status in [IntentStatus::Succeeded, IntentStatus::Failed, IntentStatus::Pending] {
            let err = DonationService::decide(&donation, &verified(status, Currency::Usd)).unwrap_err();
            assert!(matches!(err, FundingError::InvalidTransition { .. }));
        }
    }

    #[test]
    fn test_validate_new() {
        let mut input = NewDonation {
            campaign_id: CampaignId::new(),
            amount: dec!(25),
            donor_id: None,
            is_anonymous: false,
            message: Some("Get well soon".into()),
        };
        assert!(DonationService::validate_new(&input).is_ok());

        input.message = Some("x".repeat(MAX_MESSAGE_LEN + 1));
        assert!(matches!(
            DonationService::validate_new(&input),
            Err(FundingError::Validation(_))
        ));

        input.message = None;
        input.amount = dec!(0.001);
        assert!(matches!(
            DonationService::validate_new(&input),
            Err(FundingError::InvalidAmount(_))
        ));
    }
}
