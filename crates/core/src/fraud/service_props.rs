//! Property-based tests for FraudService.

use proptest::prelude::*;
use uuid::Uuid;

use carefund_shared::types::UserId;

use crate::fraud::service::FraudService;
use crate::fraud::types::FraudReportStatus;

fn arb_status() -> impl Strategy<Value = FraudReportStatus> {
    prop_oneof![
        Just(FraudReportStatus::Pending),
        Just(FraudReportStatus::Investigating),
        Just(FraudReportStatus::Confirmed),
        Just(FraudReportStatus::Dismissed),
    ]
}

fn arb_notes() -> impl Strategy<Value = Option<String>> {
    prop_oneof![Just(None), "[a-zA-Z0-9 ]{0,60}".prop_map(Some)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Every accepted action is a valid transition recorded against the reviewing admin.
    #[test]
    fn prop_actions_are_valid_transitions(status in arb_status(), notes in arb_notes(), n in any::<u128>()) {
        let admin = UserId::from_uuid(Uuid::from_u128(n));
        let attempts = [
            FraudService::investigate(status, admin, notes.clone()),
            FraudService::confirm(status, admin, notes.clone()),
            FraudService::dismiss(status, admin, notes),
        ];
        for action in attempts.into_iter().flatten() {
            prop_assert!(FraudService::is_valid_transition(status, action.new_status));
            prop_assert_eq!(action.reviewed_by, admin);
            if let Some(n) = &action.notes {
                prop_assert!(!n.trim().is_empty());
            }
        }
    }

    /// Verdicts cannot be reopened.
    #[test]
    fn prop_verdicts_are_final(to in arb_status()) {
        prop_assert!(!FraudService::is_valid_transition(FraudReportStatus::Confirmed, to));
        prop_assert!(!FraudService::is_valid_transition(FraudReportStatus::Dismissed, to));
    }
}
