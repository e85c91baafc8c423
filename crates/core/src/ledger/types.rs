//! Campaign ledger domain types.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

use carefund_shared::types::{CampaignId, UserId};

/// Campaign status.
///
/// The valid transitions are:
/// - Pending → Approved (admin approval)
/// - Pending → Rejected (admin rejection)
/// - any non-terminal → Suspended (confirmed fraud only)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CampaignStatus {
    /// Submitted by a partner, awaiting review.
    Pending,
    /// Live: accepts donations and disbursement requests.
    Approved,
    /// Turned down by an admin.
    Rejected,
    /// Halted by a confirmed fraud report. No reinstatement path.
    Suspended,
    /// Closed after reaching its goal.
    Completed,
}

impl CampaignStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Suspended => "suspended",
            Self::Completed => "completed",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            "suspended" => Some(Self::Suspended),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }

    /// Returns true if the campaign may accept donations and payout requests.
    #[must_use]
    pub fn accepts_money_movement(&self) -> bool {
        matches!(self, Self::Approved)
    }
}

impl fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A fundraising campaign and its running raised total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Campaign {
    /// Campaign id.
    pub id: CampaignId,
    /// Public title, used in payment descriptions.
    pub title: String,
    /// Partner that owns the campaign and receives payouts.
    pub partner_id: UserId,
    /// Fundraising goal.
    pub target_amount: Decimal,
    /// Authoritative running total held by the ledger.
    pub funds_raised: Decimal,
    /// Lifecycle status.
    pub status: CampaignStatus,
    /// Reason recorded when an admin rejects the campaign.
    pub rejection_reason: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Campaign {
    /// Creates a `pending` campaign with nothing raised.
    #[must_use]
    pub fn new(partner_id: UserId, title: impl Into<String>, target_amount: Decimal) -> Self {
        let now = Utc::now();
        Self {
            id: CampaignId::new(),
            title: title.into(),
            partner_id,
            target_amount,
            funds_raised: Decimal::ZERO,
            status: CampaignStatus::Pending,
            rejection_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Progress towards the target in percent, rounded to two places.
    ///
    /// Exceeds 100 when the campaign is overfunded; zero when there is no target.
    /// Saturates at `Decimal::MAX` instead of overflowing.
    #[must_use]
    pub fn progress_percentage(&self) -> Decimal {
        if self.target_amount.is_zero() {
            return Decimal::ZERO;
        }
        self.funds_raised
            .checked_div(self.target_amount)
            .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
            .map_or(Decimal::MAX, |pct| {
                pct.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
            })
    }

    /// Amount still missing to reach the target; negative when overfunded.
    #[must_use]
    pub fn remaining_amount(&self) -> Decimal {
        self.target_amount - self.funds_raised
    }
}

/// Input for a partner's campaign submission.
#[derive(Debug, Clone, Deserialize)]
pub struct NewCampaign {
    /// Public title.
    pub title: String,
    /// Fundraising goal.
    pub target_amount: Decimal,
}

/// Snapshot of a campaign's ledger position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerBalance {
    /// The campaign.
    pub campaign_id: CampaignId,
    /// Running raised total.
    pub funds_raised: Decimal,
    /// Sum of pending and approved disbursements.
    pub reserved: Decimal,
    /// `funds_raised - reserved`.
    pub available: Decimal,
    /// Fundraising goal.
    pub target_amount: Decimal,
    /// Progress towards the goal.
    pub progress_percentage: Decimal,
    /// Campaign status at snapshot time.
    pub status: CampaignStatus,
}

/// Progress figures returned alongside a confirmed donation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CampaignProgress {
    /// Running raised total.
    pub funds_raised: Decimal,
    /// Fundraising goal.
    pub target_amount: Decimal,
    /// Progress towards the goal.
    pub progress_percentage: Decimal,
}

impl From<&Campaign> for CampaignProgress {
    fn from(campaign: &Campaign) -> Self {
        Self {
            funds_raised: campaign.funds_raised,
            target_amount: campaign.target_amount,
            progress_percentage: campaign.progress_percentage(),
        }
    }
}

/// Result of recomputing the funding equality from donation and payout records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvariantReport {
    /// The campaign.
    pub campaign_id: CampaignId,
    /// Stored running total.
    pub funds_raised: Decimal,
    /// Sum of completed donations.
    pub completed_donations: Decimal,
    /// Sum of processed disbursements.
    pub processed_disbursements: Decimal,
}

impl InvariantReport {
    /// Returns true if `funds_raised` equals donations minus payouts.
    #[must_use]
    pub fn holds(&self) -> bool {
        self.funds_raised == self.completed_donations - self.processed_disbursements
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carefund_shared::types::money::MAX_AMOUNT;
    use rust_decimal_macros::dec;

    fn campaign(target: Decimal, raised: Decimal) -> Campaign {
        let mut c = Campaign::new(UserId::new(), "Heart surgery for Nimal", target);
        c.funds_raised = raised;
        c
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            CampaignStatus::Pending,
            CampaignStatus::Approved,
            CampaignStatus::Rejected,
            CampaignStatus::Suspended,
            CampaignStatus::Completed,
        ] {
            assert_eq!(CampaignStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(CampaignStatus::parse("APPROVED"), Some(CampaignStatus::Approved));
        assert_eq!(CampaignStatus::parse("cancelled"), None);
    }

    #[test]
    fn test_only_approved_moves_money() {
        assert!(CampaignStatus::Approved.accepts_money_movement());
        assert!(!CampaignStatus::Pending.accepts_money_movement());
        assert!(!CampaignStatus::Suspended.accepts_money_movement());
        assert!(!CampaignStatus::Rejected.accepts_money_movement());
        assert!(!CampaignStatus::Completed.accepts_money_movement());
    }

    #[test]
    fn test_progress_percentage() {
        assert_eq!(campaign(dec!(1000), dec!(400)).progress_percentage(), dec!(40));
        assert_eq!(campaign(dec!(1000), dec!(1100)).progress_percentage(), dec!(110));
        assert_eq!(campaign(dec!(3), dec!(1)).progress_percentage(), dec!(33.33));
        assert_eq!(campaign(dec!(0), dec!(50)).progress_percentage(), dec!(0));
    }

    #[test]
    fn test_progress_percentage_saturates() {
        assert_eq!(campaign(dec!(0.01), Decimal::MAX).progress_percentage(), Decimal::MAX);
        assert_eq!(
            campaign(dec!(0.01), MAX_AMOUNT).progress_percentage(),
            dec!(999999999999999999900)
        );
    }

    #[test]
    fn test_remaining_amount_goes_negative_when_overfunded() {
        assert_eq!(campaign(dec!(1000), dec!(1100)).remaining_amount(), dec!(-100));
    }

    #[test]
    fn test_invariant_report() {
        let report = InvariantReport {
            campaign_id: CampaignId::new(),
            funds_raised: dec!(700),
            completed_donations: dec!(1000),
            processed_disbursements: dec!(300),
        };
        assert!(report.holds());
        assert!(!InvariantReport {
            funds_raised: dec!(701),
            ..report
        }
        .holds());
    }
}
