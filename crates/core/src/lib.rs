//! Core funding logic for CareFund.
//!
//! This crate contains the campaign funding ledger and the workflows that move
//! money through it, with ZERO web or database dependencies. Persistence and
//! the payment processor are reached only through the `store` and `gateway`
//! ports.
//!
//! # Modules
//!
//! - `ledger` - Campaign balances, credit/debit, campaign status
//! - `donation` - Donation intake and idempotent confirmation
//! - `disbursement` - Payout requests, review and settlement
//! - `fraud` - Fraud reports and forced suspension
//! - `identity` - Users and their role-tagged profiles
//! - `gateway` - Payment gateway port, sandbox and timeout wrapper
//! - `store` - Persistence port and in-memory implementation

pub mod disbursement;
pub mod donation;
pub mod error;
pub mod fraud;
pub mod funding;
pub mod gateway;
pub mod identity;
pub mod ledger;
pub mod store;

pub use error::{ErrorKind, FundingError, FundingResult};
pub use funding::FundingService;
