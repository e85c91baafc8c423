//! Property-based tests for DonationService.

use chrono::Utc;
use proptest::prelude::*;
use rust_decimal::Decimal;

use carefund_shared::types::{CampaignId, Currency, DonationId};

use crate::donation::service::DonationService;
use crate::donation::types::{Donation, DonationStatus};
use crate::error::FundingError;
use crate::gateway::{IntentStatus, IntentVerification};

fn arb_status() -> impl Strategy<Value = DonationStatus> {
    prop_oneof![
        Just(DonationStatus::Pending),
        Just(DonationStatus::Completed),
        Just(DonationStatus::Failed),
        Just(DonationStatus::Refunded),
    ]
}

fn arb_intent_status() -> impl Strategy<Value = IntentStatus> {
    prop_oneof![
        Just(IntentStatus::Succeeded),
        Just(IntentStatus::Pending),
        Just(IntentStatus::Failed),
    ]
}

fn arb_currency() -> impl Strategy<Value = Currency> {
    prop_oneof![
        Just(Currency::Usd),
        Just(Currency::Lkr),
        Just(Currency::Eur),
        Just(Currency::Gbp),
    ]
}

fn donation(status: DonationStatus, currency: Currency, cents: i64) -> Donation {
    Donation {
        id: DonationId::new(),
        campaign_id: CampaignId::new(),
        donor_id: None,
        amount: Decimal::new(cents, 2),
        currency,
        status,
        transaction_id: "pi_prop".into(),
        is_anonymous: false,
        donor_message: None,
        failure_reason: None,
        created_at: Utc::now(),
        completed_at: None,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Only a pending donation can be moved by a verification, and only to a terminal status.
    #[test]
    fn prop_decide_respects_state_machine(
        status in arb_status(),
        intent in arb_intent_status(),
        opened in arb_currency(),
        settled in arb_currency(),
        cents in 1i64..1_000_000,
    ) {
        let donation = donation(status, opened, cents);
        let verification = IntentVerification {
            id: "pi_prop".into(),
            status: intent,
            currency: settled,
            processor: "stripe".into(),
        };

        match DonationService::decide(&donation, &verification) {
            Ok(action) => {
                prop_assert_eq!(status, DonationStatus::Pending);
                prop_assert!(action.new_status().is_terminal());
                prop_assert!(DonationService::is_valid_transition(status, action.new_status()));
                let completes = action.new_status() == DonationStatus::Completed;
                prop_assert_eq!(completes, intent == IntentStatus::Succeeded && opened == settled);
            }
            Err(FundingError::InvalidTransition { .. }) => {
                prop_assert!(status.is_terminal());
            }
            Err(other) => prop_assert!(false, "unexpected error {other}"),
        }
    }

    /// Terminal statuses admit no further transition.
    #[test]
    fn prop_terminal_is_final(from in arb_status(), to in arb_status()) {
        if from.is_terminal() {
            prop_assert!(!DonationService::is_valid_transition(from, to));
        }
    }
}
