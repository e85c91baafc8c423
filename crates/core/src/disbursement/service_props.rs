//! Property-based tests for DisbursementService.

use proptest::prelude::*;
use uuid::Uuid;

use carefund_shared::types::UserId;

use crate::disbursement::service::DisbursementService;
use crate::disbursement::types::DisbursementStatus;
use crate::error::FundingError;

fn arb_status() -> impl Strategy<Value = DisbursementStatus> {
    prop_oneof![
        Just(DisbursementStatus::Pending),
        Just(DisbursementStatus::Approved),
        Just(DisbursementStatus::Processed),
        Just(DisbursementStatus::Failed),
    ]
}

fn arb_user() -> impl Strategy<Value = UserId> {
    any::<u128>().prop_map(|n| UserId::from_uuid(Uuid::from_u128(n)))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Every action a service method returns is a valid transition, and every
    /// refusal is an `InvalidTransition`.
    #[test]
    fn prop_actions_follow_state_machine(status in arb_status(), admin in arb_user()) {
        let attempts = [
            DisbursementService::approve(status, admin, None),
            DisbursementService::reject(status, admin, None),
            DisbursementService::process(status),
            DisbursementService::fail_payout(status, "bounced".into()),
            DisbursementService::cancel_for_fraud(status),
        ];
        for attempt in attempts {
            match attempt {
                Ok(action) => prop_assert!(DisbursementService::is_valid_transition(status, action.new_status())),
                Err(FundingError::InvalidTransition { .. }) => {}
                Err(other) => prop_assert!(false, "unexpected error {other}"),
            }
        }
    }

    /// Terminal disbursements refuse every action.
    #[test]
    fn prop_terminal_refuses_everything(admin in arb_user()) {
        for status in [DisbursementStatus::Processed, DisbursementStatus::Failed] {
            prop_assert!(DisbursementService::approve(status, admin, None).is_err());
            prop_assert!(DisbursementService::reject(status, admin, None).is_err());
            prop_assert!(DisbursementService::process(status).is_err());
            prop_assert!(DisbursementService::fail_payout(status, "x".into()).is_err());
            prop_assert!(DisbursementService::cancel_for_fraud(status).is_err());
        }
    }
}
