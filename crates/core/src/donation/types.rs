//! Donation domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use carefund_shared::types::{CampaignId, Currency, DonationId, PaymentRecordId, UserId};

use crate::gateway::IntentStatus;
use crate::ledger::types::CampaignProgress;

/// Donation status.
///
/// `pending → completed | failed`. `refunded` is representable but no
/// operation produces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DonationStatus {
    /// Intent opened, payment not yet confirmed.
    Pending,
    /// Payment captured and credited to the campaign.
    Completed,
    /// Payment did not go through.
    Failed,
    /// Payment returned to the donor.
    Refunded,
}

impl DonationStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            "refunded" => Some(Self::Refunded),
            _ => None,
        }
    }

    /// Returns true once the donation can no longer change.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for DonationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single gift to a campaign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Donation {
    /// Donation id.
    pub id: DonationId,
    /// Campaign receiving the gift.
    pub campaign_id: CampaignId,
    /// Identified donor, `None` for guests.
    pub donor_id: Option<UserId>,
    /// Amount in major units.
    pub amount: Decimal,
    /// Currency the intent was opened in.
    pub currency: Currency,
    /// Lifecycle status.
    pub status: DonationStatus,
    /// Gateway intent id. Unique across all donations.
    pub transaction_id: String,
    /// Hide the donor's name publicly and skip their running total.
    pub is_anonymous: bool,
    /// Optional note to the beneficiary.
    pub donor_message: Option<String>,
    /// Why the payment failed, if it did.
    pub failure_reason: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Set when the donation completes.
    pub completed_at: Option<DateTime<Utc>>,
}

impl Donation {
    /// Returns true if confirming this donation should bump the donor's total.
    #[must_use]
    pub fn counts_toward_donor(&self) -> bool {
        self.donor_id.is_some() && !self.is_anonymous
    }
}

/// What the gateway reported when a confirmation resolved a donation.
///
/// Written in the same transaction as the donation's terminal status, one per
/// donation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
    /// Record id.
    pub id: PaymentRecordId,
    /// The donation this payment resolved.
    pub donation_id: DonationId,
    /// Processor that handled the payment.
    pub payment_method: String,
    /// Gateway intent id. Unique across all records.
    pub transaction_reference: String,
    /// Donation amount in major units.
    pub amount: Decimal,
    /// Currency the gateway reported, which may differ from the donation's.
    pub currency: Currency,
    /// Settlement state the gateway reported.
    pub status: IntentStatus,
    /// Why the donation failed, if it did.
    pub error_message: Option<String>,
    /// When the confirmation resolved the payment.
    pub processed_at: DateTime<Utc>,
}

/// Input for `create_donation`.
#[derive(Debug, Clone, Deserialize)]
pub struct NewDonation {
    /// Campaign to give to.
    pub campaign_id: CampaignId,
    /// Amount in major units.
    pub amount: Decimal,
    /// Acting donor, `None` for guest checkout.
    pub donor_id: Option<UserId>,
    /// Hide the donor publicly.
    #[serde(default)]
    pub is_anonymous: bool,
    /// Optional note to the beneficiary.
    pub message: Option<String>,
}

/// Transition produced by `DonationService`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DonationAction {
    /// Payment captured.
    Complete {
        /// Always `Completed`.
        new_status: DonationStatus,
        /// Completion timestamp.
        completed_at: DateTime<Utc>,
    },
    /// Payment failed.
    Fail {
        /// Always `Failed`.
        new_status: DonationStatus,
        /// Failure detail.
        reason: String,
    },
}

impl DonationAction {
    /// Returns the status the donation moves to.
    #[must_use]
    pub fn new_status(&self) -> DonationStatus {
        match self {
            Self::Complete { new_status, .. } | Self::Fail { new_status, .. } => *new_status,
        }
    }
}

/// Result of `create_donation`.
#[derive(Debug, Clone, Serialize)]
pub struct DonationCreated {
    /// The persisted pending donation.
    pub donation: Donation,
    /// Secret for completing payment client-side.
    pub client_secret: String,
    /// Currency of the intent.
    pub currency: Currency,
}

/// How a confirmation call resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationOutcome {
    /// This call completed the donation and credited the campaign.
    Completed,
    /// This call marked the donation failed.
    Failed,
    /// An earlier call had already resolved it; nothing changed.
    AlreadyResolved,
}

/// Result of `confirm_donation`.
#[derive(Debug, Clone, Serialize)]
pub struct DonationConfirmation {
    /// The donation as stored after this call.
    pub donation: Donation,
    /// What this call did.
    pub outcome: ConfirmationOutcome,
    /// Campaign totals after this call.
    pub campaign_progress: CampaignProgress,
}
