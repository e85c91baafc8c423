//! Donation workflow.
//!
//! `pending → completed | failed`. Creation opens a payment intent;
//! confirmation verifies it and, on success, credits the campaign ledger in
//! the same transaction that completes the donation.
//!
//! # Modules
//!
//! - `types` - Donation domain types
//! - `service` - State transition logic
//! - `workflow` - Store- and gateway-backed orchestration

pub mod service;
pub mod types;
pub mod workflow;

#[cfg(test)]
mod service_props;

pub use service::DonationService;
pub use types::{
    ConfirmationOutcome, Donation, DonationAction, DonationConfirmation, DonationCreated,
    DonationStatus, NewDonation, PaymentRecord,
};
pub use workflow::DonationWorkflow;
