//! Campaign ledger.
//!
//! This module owns a campaign's `target_amount`, `funds_raised` and status:
//! - Campaign domain types and balance snapshots
//! - Pure balance arithmetic (available balance, credit, debit)
//! - Campaign status transitions
//! - The store-backed ledger used by every workflow

pub mod balance;
pub mod campaign_ledger;
pub mod service;
pub mod types;

#[cfg(test)]
mod ledger_props;

pub use balance::available_balance;
pub use campaign_ledger::{CampaignLedger, validate_amount};
pub use service::{CampaignAction, CampaignService};
pub use types::{
    Campaign, CampaignProgress, CampaignStatus, InvariantReport, LedgerBalance, NewCampaign,
};
