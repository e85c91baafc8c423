//! Disbursement domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use carefund_shared::types::{CampaignId, DisbursementId, UserId};

/// Disbursement status.
///
/// `pending → approved → processed | failed`, plus `pending → failed` on
/// rejection or fraud confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisbursementStatus {
    /// Requested by the partner.
    Pending,
    /// Approved by an admin, awaiting payout.
    Approved,
    /// Paid out and debited from the campaign.
    Processed,
    /// Rejected, cancelled by fraud confirmation, or payout failed.
    Failed,
}

impl DisbursementStatus {
    /// Statuses whose amount is held against the available balance.
    pub const RESERVING: [Self; 2] = [Self::Pending, Self::Approved];

    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Processed => "processed",
            Self::Failed => "failed",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "processed" => Some(Self::Processed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Returns true if the amount is still reserved against the campaign.
    #[must_use]
    pub fn reserves_funds(&self) -> bool {
        Self::RESERVING.contains(self)
    }

    /// Returns true once the disbursement can no longer change.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Processed | Self::Failed)
    }
}

impl fmt::Display for DisbursementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Destination account for a payout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankDetails {
    /// Account number.
    pub account_number: String,
    /// Bank name.
    pub bank_name: String,
}

/// A payout request against a campaign's balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Disbursement {
    /// Disbursement id.
    pub id: DisbursementId,
    /// Campaign paying out.
    pub campaign_id: CampaignId,
    /// Partner who asked for the payout.
    pub requested_by: UserId,
    /// Amount in major units.
    pub amount: Decimal,
    /// Lifecycle status.
    pub status: DisbursementStatus,
    /// Destination account.
    pub bank: BankDetails,
    /// Admin who approved or rejected the request.
    pub approved_by: Option<UserId>,
    /// Approval timestamp.
    pub approved_at: Option<DateTime<Utc>>,
    /// Reviewer notes.
    pub approval_notes: Option<String>,
    /// Payout timestamp.
    pub processed_at: Option<DateTime<Utc>>,
    /// Why the request failed, if it did.
    pub failure_reason: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Input for `request_disbursement`.
///
/// Missing bank fields fall back to the partner profile.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DisbursementRequest {
    /// Amount to pay out.
    pub amount: Decimal,
    /// Destination account number override.
    pub bank_account_number: Option<String>,
    /// Destination bank override.
    pub bank_name: Option<String>,
}

/// Result reported by the external payout executor.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum PayoutResult {
    /// Money left the platform.
    Succeeded,
    /// The bank transfer bounced or was refused.
    Failed {
        /// Executor-supplied detail.
        reason: String,
    },
}

/// Transition produced by `DisbursementService`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisbursementAction {
    /// Admin approved the request.
    Approve {
        /// Always `Approved`.
        new_status: DisbursementStatus,
        /// Approving admin.
        approved_by: UserId,
        /// Approval timestamp.
        approved_at: DateTime<Utc>,
        /// Reviewer notes.
        approval_notes: Option<String>,
    },
    /// Admin turned the request down.
    Reject {
        /// Always `Failed`.
        new_status: DisbursementStatus,
        /// Rejecting admin.
        rejected_by: UserId,
        /// Reviewer notes.
        notes: Option<String>,
    },
    /// Payout completed.
    Process {
        /// Always `Processed`.
        new_status: DisbursementStatus,
        /// Payout timestamp.
        processed_at: DateTime<Utc>,
    },
    /// Payout failed or the campaign was suspended.
    Fail {
        /// Always `Failed`.
        new_status: DisbursementStatus,
        /// Failure detail.
        reason: String,
    },
}

impl DisbursementAction {
    /// Returns the status the disbursement moves to.
    #[must_use]
    pub fn new_status(&self) -> DisbursementStatus {
        match self {
            Self::Approve { new_status, .. }
            | Self::Reject { new_status, .. }
            | Self::Process { new_status, .. }
            | Self::Fail { new_status, .. } => *new_status,
        }
    }
}
