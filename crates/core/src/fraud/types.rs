//! Fraud report domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use carefund_shared::types::{CampaignId, FraudReportId, UserId};

use crate::disbursement::types::Disbursement;
use crate::ledger::types::Campaign;

/// Fraud report status.
///
/// `pending → investigating → confirmed | dismissed`, and `pending` may go
/// straight to either verdict. Verdicts are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FraudReportStatus {
    /// Filed, not yet looked at.
    Pending,
    /// An admin is looking into it.
    Investigating,
    /// Fraud established; the campaign is suspended.
    Confirmed,
    /// No fraud found.
    Dismissed,
}

impl FraudReportStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Investigating => "investigating",
            Self::Confirmed => "confirmed",
            Self::Dismissed => "dismissed",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "investigating" => Some(Self::Investigating),
            "confirmed" => Some(Self::Confirmed),
            "dismissed" => Some(Self::Dismissed),
            _ => None,
        }
    }

    /// Returns true for a final verdict.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Confirmed | Self::Dismissed)
    }
}

impl fmt::Display for FraudReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A report that a campaign may be fraudulent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FraudReport {
    /// Report id.
    pub id: FraudReportId,
    /// Reported campaign.
    pub campaign_id: CampaignId,
    /// Reporter, `None` for anonymous reports.
    pub reported_by: Option<UserId>,
    /// What the reporter observed.
    pub description: String,
    /// Reference to uploaded evidence.
    pub evidence_file: Option<String>,
    /// Lifecycle status.
    pub status: FraudReportStatus,
    /// Admin notes accumulated during review.
    pub investigation_notes: Option<String>,
    /// Admin who last moved the report.
    pub reviewed_by: Option<UserId>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Input for `file_fraud_report`.
#[derive(Debug, Clone, Deserialize)]
pub struct NewFraudReport {
    /// What the reporter observed.
    pub description: String,
    /// Reference to uploaded evidence.
    pub evidence_file: Option<String>,
}

/// Transition produced by `FraudService`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FraudAction {
    /// Status the report moves to.
    pub new_status: FraudReportStatus,
    /// Reviewing admin.
    pub reviewed_by: UserId,
    /// Notes to store, if any.
    pub notes: Option<String>,
}

/// Result of `confirm_fraud`.
#[derive(Debug, Clone, Serialize)]
pub struct FraudConfirmation {
    /// The confirmed report.
    pub report: FraudReport,
    /// The suspended campaign.
    pub campaign: Campaign,
    /// Pending disbursements moved to `failed` by the confirmation.
    pub rejected_disbursements: Vec<Disbursement>,
}
