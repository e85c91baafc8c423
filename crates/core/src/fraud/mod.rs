//! Fraud workflow.
//!
//! `pending → investigating → confirmed | dismissed`, with direct verdicts
//! from `pending` also allowed. Confirmation suspends the campaign and fails
//! its pending disbursements atomically. There is no path back.

pub mod service;
pub mod types;
pub mod workflow;

#[cfg(test)]
mod service_props;

pub use service::FraudService;
pub use types::{FraudAction, FraudConfirmation, FraudReport, FraudReportStatus, NewFraudReport};
pub use workflow::FraudWorkflow;
