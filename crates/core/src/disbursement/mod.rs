//! Disbursement workflow.
//!
//! `pending → approved → processed | failed`, and `pending → failed` on
//! rejection or fraud confirmation. Pending and approved disbursements reserve
//! their amount against the campaign's available balance.
//!
//! # Modules
//!
//! - `types` - Disbursement domain types
//! - `service` - State transition logic
//! - `workflow` - Store-backed orchestration

pub mod service;
pub mod types;
pub mod workflow;

#[cfg(test)]
mod service_props;

pub use service::DisbursementService;
pub use types::{
    BankDetails, Disbursement, DisbursementAction, DisbursementRequest, DisbursementStatus,
    PayoutResult,
};
pub use workflow::DisbursementWorkflow;
