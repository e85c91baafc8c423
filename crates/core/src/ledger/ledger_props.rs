//! Property-based tests for ledger arithmetic.

use proptest::prelude::*;
use rust_decimal::Decimal;

use carefund_shared::types::UserId;
use carefund_shared::types::money::MAX_AMOUNT;

use crate::error::FundingError;
use crate::ledger::balance::{available_balance, credit, debit};
use crate::ledger::types::Campaign;

/// Strategy for positive amounts with at most two decimal places.
fn arb_amount() -> impl Strategy<Value = Decimal> {
    (1i64..10_000_000).prop_map(|cents| Decimal::new(cents, 2))
}

fn campaign_with(raised: Decimal) -> Campaign {
    let mut campaign = Campaign::new(UserId::new(), "Surgery fund", Decimal::new(100_000, 0));
    campaign.funds_raised = raised;
    campaign
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Credits then debits of the same amounts land back on the start.
    #[test]
    fn prop_credit_then_debit_restores(start in arb_amount(), amounts in prop::collection::vec(arb_amount(), 1..20)) {
        let mut campaign = campaign_with(start);
        for amount in &amounts {
            credit(&mut campaign, *amount).unwrap();
        }
        for amount in amounts.iter().rev() {
            debit(&mut campaign, *amount).unwrap();
        }
        prop_assert_eq!(campaign.funds_raised, start);
    }

    /// A debit either succeeds or leaves the balance untouched; it never goes negative.
    #[test]
    fn prop_debit_never_negative(raised in arb_amount(), amount in arb_amount()) {
        let mut campaign = campaign_with(raised);
        match debit(&mut campaign, amount) {
            Ok(after) => {
                prop_assert!(amount <= raised);
                prop_assert_eq!(after, raised - amount);
            }
            Err(FundingError::NegativeBalance { .. }) => {
                prop_assert!(amount > raised);
                prop_assert_eq!(campaign.funds_raised, raised);
            }
            Err(other) => prop_assert!(false, "unexpected error {other}"),
        }
        prop_assert!(campaign.funds_raised >= Decimal::ZERO);
    }

    /// Available balance equals funds raised minus every reservation.
    #[test]
    fn prop_available_balance_subtracts_reservations(
        raised in arb_amount(),
        reservations in prop::collection::vec(arb_amount(), 0..10),
    ) {
        let total: Decimal = reservations.iter().copied().sum();
        prop_assert_eq!(available_balance(raised, reservations), raised - total);
    }

    /// Credits are never capped by the target.
    #[test]
    fn prop_credit_is_uncapped(amount in arb_amount()) {
        let mut campaign = campaign_with(campaign_with(Decimal::ZERO).target_amount);
        let before = campaign.funds_raised;
        credit(&mut campaign, amount).unwrap();
        prop_assert_eq!(campaign.funds_raised, before + amount);
        prop_assert!(campaign.progress_percentage() >= Decimal::ONE_HUNDRED);
        prop_assert!(campaign.remaining_amount() < Decimal::ZERO);
    }

    /// Near the column ceiling a credit either fits or changes nothing.
    #[test]
    fn prop_credit_stays_within_column_range(headroom in arb_amount(), amount in arb_amount()) {
        let raised = MAX_AMOUNT - headroom;
        let mut campaign = campaign_with(raised);
        match credit(&mut campaign, amount) {
            Ok(after) => {
                prop_assert!(amount <= headroom);
                prop_assert_eq!(after, raised + amount);
            }
            Err(FundingError::BalanceOverflow { .. }) => {
                prop_assert!(amount > headroom);
                prop_assert_eq!(campaign.funds_raised, raised);
            }
            Err(other) => prop_assert!(false, "unexpected error {other}"),
        }
        prop_assert!(campaign.funds_raised <= MAX_AMOUNT);
    }
}
