//! Pure balance arithmetic for the campaign ledger.
//!
//! These functions never touch storage. The store-backed `CampaignLedger`
//! calls them while it holds the campaign row lock.

use chrono::Utc;
use rust_decimal::Decimal;

use carefund_shared::types::money::MAX_AMOUNT;

use crate::error::{FundingError, FundingResult};
use crate::ledger::types::Campaign;

/// `funds_raised` minus every outstanding reservation.
#[must_use]
pub fn available_balance<I>(funds_raised: Decimal, reservations: I) -> Decimal
where
    I: IntoIterator<Item = Decimal>,
{
    funds_raised - reservations.into_iter().sum::<Decimal>()
}

/// Rejects `amount` if it exceeds `available`.
pub fn ensure_covered(campaign: &Campaign, amount: Decimal, available: Decimal) -> FundingResult<()> {
    if amount > available {
        return Err(FundingError::InsufficientBalance {
            campaign_id: campaign.id,
            requested: amount,
            available,
        });
    }
    Ok(())
}

/// Adds `amount` to the campaign's raised total.
///
/// There is no cap against `target_amount`: overfunding is allowed. The total
/// is still bounded by `MAX_AMOUNT`.
pub fn credit(campaign: &mut Campaign, amount: Decimal) -> FundingResult<Decimal> {
    if amount <= Decimal::ZERO {
        return Err(FundingError::InvalidAmount(amount));
    }
    campaign.funds_raised = campaign
        .funds_raised
        .checked_add(amount)
        .filter(|total| *total <= MAX_AMOUNT)
        .ok_or(FundingError::BalanceOverflow {
            campaign_id: campaign.id,
            amount,
            funds_raised: campaign.funds_raised,
        })?;
    campaign.updated_at = Utc::now();
    Ok(campaign.funds_raised)
}

/// Subtracts `amount` from the campaign's raised total.
pub fn debit(campaign: &mut Campaign, amount: Decimal) -> FundingResult<Decimal> {
    if amount <= Decimal::ZERO {
        return Err(FundingError::InvalidAmount(amount));
    }
    if campaign.funds_raised - amount < Decimal::ZERO {
        return Err(FundingError::NegativeBalance {
            campaign_id: campaign.id,
            amount,
            funds_raised: campaign.funds_raised,
        });
    }
    campaign.funds_raised -= amount;
    campaign.updated_at = Utc::now();
    Ok(campaign.funds_raised)
}

#[cfg(test)]
mod tests {
    use super::*;
    use carefund_shared::types::UserId;
    use rust_decimal_macros::dec;

    fn campaign(raised: Decimal) -> Campaign {
        let mut c = Campaign::new(UserId::new(), "Dialysis for Kamala", dec!(1000));
        c.funds_raised = raised;
        c
    }

    #[test]
    fn test_available_balance() {
        assert_eq!(available_balance(dec!(500), [dec!(300)]), dec!(200));
        assert_eq!(available_balance(dec!(500), Vec::new()), dec!(500));
        assert_eq!(available_balance(dec!(600), [dec!(300), dec!(300)]), dec!(0));
    }

    #[test]
    fn test_ensure_covered_boundary() {
        let c = campaign(dec!(500));
        assert!(ensure_covered(&c, dec!(200), dec!(200)).is_ok());
        let err = ensure_covered(&c, dec!(300), dec!(200)).unwrap_err();
        assert!(matches!(
            err,
            FundingError::InsufficientBalance { available, .. } if available == dec!(200)
        ));
    }

    #[test]
    fn test_credit_allows_overfunding() {
        let mut c = campaign(dec!(0));
        assert_eq!(credit(&mut c, dec!(400)).unwrap(), dec!(400));
        assert_eq!(credit(&mut c, dec!(700)).unwrap(), dec!(1100));
        assert_eq!(c.progress_percentage(), dec!(110));
    }

    #[test]
    fn test_credit_rejects_non_positive() {
        let mut c = campaign(dec!(10));
        assert!(matches!(credit(&mut c, dec!(0)), Err(FundingError::InvalidAmount(_))));
        assert_eq!(c.funds_raised, dec!(10));
    }

    #[test]
    fn test_credit_past_storable_range_is_rejected() {
        let mut c = campaign(MAX_AMOUNT - dec!(1));
        assert_eq!(credit(&mut c, dec!(1)).unwrap(), MAX_AMOUNT);

        let err = credit(&mut c, dec!(0.01)).unwrap_err();
        assert!(matches!(err, FundingError::BalanceOverflow { .. }));
        assert_eq!(err.error_code(), "BALANCE_OVERFLOW");
        assert_eq!(c.funds_raised, MAX_AMOUNT);

        let mut huge = campaign(Decimal::MAX);
        assert!(matches!(
            credit(&mut huge, Decimal::MAX),
            Err(FundingError::BalanceOverflow { .. })
        ));
        assert_eq!(huge.funds_raised, Decimal::MAX);
    }

    #[test]
    fn test_debit_never_goes_negative() {
        let mut c = campaign(dec!(100));
        assert_eq!(debit(&mut c, dec!(100)).unwrap(), dec!(0));
        let err = debit(&mut c, dec!(0.01)).unwrap_err();
        assert!(matches!(err, FundingError::NegativeBalance { .. }));
        assert_eq!(c.funds_raised, dec!(0));
    }
}
