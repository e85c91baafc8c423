//! Payment processor adapters for CareFund.
//!
//! Implements the `PaymentGateway` port from `carefund-core` against Stripe's
//! payment intents API.

pub mod stripe;

pub use stripe::StripeGateway;
