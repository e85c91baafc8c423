//! Campaign status transitions.

use chrono::{DateTime, Utc};

use carefund_shared::types::UserId;

use crate::error::{FundingError, FundingResult};
use crate::ledger::types::CampaignStatus;

/// Transition produced by `CampaignService`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CampaignAction {
    /// Admin approved the campaign.
    Approve {
        /// Always `Approved`.
        new_status: CampaignStatus,
        /// Approving admin.
        approved_by: UserId,
        /// Approval timestamp.
        approved_at: DateTime<Utc>,
    },
    /// Admin turned the campaign down.
    Reject {
        /// Always `Rejected`.
        new_status: CampaignStatus,
        /// Reason shown to the partner.
        rejection_reason: String,
    },
    /// Confirmed fraud halted the campaign.
    Suspend {
        /// Always `Suspended`.
        new_status: CampaignStatus,
    },
}

impl CampaignAction {
    /// Returns the status the campaign moves to.
    #[must_use]
    pub fn new_status(&self) -> CampaignStatus {
        match self {
            Self::Approve { new_status, .. }
            | Self::Reject { new_status, .. }
            | Self::Suspend { new_status } => *new_status,
        }
    }
}

fn invalid(from: CampaignStatus, to: CampaignStatus) -> FundingError {
    FundingError::InvalidTransition {
        entity: "campaign",
        from: from.as_str(),
        to: to.as_str(),
    }
}

/// Stateless validator for campaign status changes.
pub struct CampaignService;

impl CampaignService {
    /// Approve a pending campaign.
    pub fn approve(current: CampaignStatus, approved_by: UserId) -> FundingResult<CampaignAction> {
        match current {
            CampaignStatus::Pending => Ok(CampaignAction::Approve {
                new_status: CampaignStatus::Approved,
                approved_by,
                approved_at: Utc::now(),
            }),
            _ => Err(invalid(current, CampaignStatus::Approved)),
        }
    }

    /// Reject a pending campaign. The reason is required.
    pub fn reject(current: CampaignStatus, rejection_reason: String) -> FundingResult<CampaignAction> {
        if rejection_reason.trim().is_empty() {
            return Err(FundingError::Validation("Rejection reason is required".to_string()));
        }
        match current {
            CampaignStatus::Pending => Ok(CampaignAction::Reject {
                new_status: CampaignStatus::Rejected,
                rejection_reason,
            }),
            _ => Err(invalid(current, CampaignStatus::Rejected)),
        }
    }

    /// Suspend a campaign after confirmed fraud.
    ///
    /// Confirmed fraud overrides every status. Suspending an already
    /// suspended campaign is allowed so a second confirmed report succeeds.
    #[must_use]
    pub fn suspend(current: CampaignStatus) -> CampaignAction {
        tracing::debug!(from = %current, "Suspending campaign");
        CampaignAction::Suspend {
            new_status: CampaignStatus::Suspended,
        }
    }

    /// Check if a status transition is valid.
    #[must_use]
    pub fn is_valid_transition(from: CampaignStatus, to: CampaignStatus) -> bool {
        matches!(
            (from, to),
            (
                CampaignStatus::Pending,
                CampaignStatus::Approved | CampaignStatus::Rejected
            ) | (_, CampaignStatus::Suspended)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_approve_from_pending() {
        let admin = UserId::new();
        let action = CampaignService::approve(CampaignStatus::Pending, admin).unwrap();
        assert_eq!(action.new_status(), CampaignStatus::Approved);
        assert!(matches!(action, CampaignAction::Approve { approved_by, .. } if approved_by == admin));
    }

    #[test]
    fn test_approve_twice_fails() {
        let err = CampaignService::approve(CampaignStatus::Approved, UserId::new()).unwrap_err();
        assert!(matches!(
            err,
            FundingError::InvalidTransition { from: "approved", to: "approved", .. }
        ));
    }

    #[test]
    fn test_reject_requires_reason() {
        assert!(matches!(
            CampaignService::reject(CampaignStatus::Pending, "  ".into()),
            Err(FundingError::Validation(_))
        ));
        let action =
            CampaignService::reject(CampaignStatus::Pending, "Missing medical report".into()).unwrap();
        assert_eq!(action.new_status(), CampaignStatus::Rejected);
    }

    #[test]
    fn test_suspended_never_returns_to_approved() {
        assert!(CampaignService::approve(CampaignStatus::Suspended, UserId::new()).is_err());
        assert!(!CampaignService::is_valid_transition(
            CampaignStatus::Suspended,
            CampaignStatus::Approved
        ));
    }

    #[test]
    fn test_suspend_is_repeatable() {
        for status in [CampaignStatus::Approved, CampaignStatus::Suspended, CampaignStatus::Rejected] {
            assert_eq!(CampaignService::suspend(status).new_status(), CampaignStatus::Suspended);
            assert!(CampaignService::is_valid_transition(status, CampaignStatus::Suspended));
        }
    }
}
