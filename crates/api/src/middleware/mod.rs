//! Request identity.

pub mod auth;

pub use auth::{AuthUser, MaybeUser, USER_ID_HEADER};
