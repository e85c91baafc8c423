//! Funding error types.
//!
//! Every workflow operation returns `Result<_, FundingError>`. Each variant
//! belongs to exactly one `ErrorKind`, and the boundary conversion into
//! `AppError` is exhaustive.

use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use carefund_shared::AppError;
use carefund_shared::types::CampaignId;

use crate::gateway::GatewayError;
use crate::ledger::types::CampaignStatus;
use crate::store::StoreError;

/// Result alias for funding operations.
pub type FundingResult<T> = Result<T, FundingError>;

/// Error taxonomy shared by all workflows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed input or wrong precondition state.
    Validation,
    /// Referenced entity does not exist.
    NotFound,
    /// Role or ownership mismatch.
    Authorization,
    /// Payment gateway failure.
    Gateway,
    /// The mutation would break the funding invariant.
    InvariantViolation,
    /// Lost a serialization race.
    ConcurrencyConflict,
    /// Unexpected internal failure.
    Internal,
}

/// Errors that can occur while moving money through a campaign.
#[derive(Debug, Error)]
pub enum FundingError {
    /// Amount is not positive, has fractional cents, or exceeds the storable range.
    #[error("Invalid amount {0}: must be positive, at most 99999999999999999.99 and have at most two decimal places")]
    InvalidAmount(Decimal),

    /// Campaign is not in `approved` status.
    #[error("Campaign {campaign_id} is {status}; only approved campaigns move money")]
    CampaignNotApproved {
        /// The campaign.
        campaign_id: CampaignId,
        /// Its current status.
        status: CampaignStatus,
    },

    /// Attempted a status transition the state machine does not allow.
    #[error("Invalid {entity} status transition from {from} to {to}")]
    InvalidTransition {
        /// Entity name (donation, disbursement, ...).
        entity: &'static str,
        /// Current status.
        from: &'static str,
        /// Attempted status.
        to: &'static str,
    },

    /// Any other malformed input.
    #[error("{0}")]
    Validation(String),

    /// Entity not found.
    #[error("{entity} {id} not found")]
    NotFound {
        /// Entity name.
        entity: &'static str,
        /// Requested id.
        id: Uuid,
    },

    /// Actor lacks the role or ownership the operation requires.
    #[error("{0}")]
    Unauthorized(String),

    /// Payment gateway failure.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// Disbursement exceeds the campaign's available balance.
    #[error("Requested {requested} exceeds available balance {available} of campaign {campaign_id}")]
    InsufficientBalance {
        /// The campaign.
        campaign_id: CampaignId,
        /// Requested amount.
        requested: Decimal,
        /// Available balance at check time.
        available: Decimal,
    },

    /// Debit would take `funds_raised` below zero.
    #[error("Debit of {amount} would take funds raised {funds_raised} of campaign {campaign_id} below zero")]
    NegativeBalance {
        /// The campaign.
        campaign_id: CampaignId,
        /// Debit amount.
        amount: Decimal,
        /// Funds raised before the debit.
        funds_raised: Decimal,
    },

    /// Credit would push `funds_raised` past the storable range.
    #[error("Credit of {amount} would overflow funds raised {funds_raised} of campaign {campaign_id}")]
    BalanceOverflow {
        /// The campaign.
        campaign_id: CampaignId,
        /// Credit amount.
        amount: Decimal,
        /// Funds raised before the credit.
        funds_raised: Decimal,
    },

    /// Persistence failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl FundingError {
    /// Creates a not-found error for the given entity.
    pub fn not_found(entity: &'static str, id: impl Into<Uuid>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Returns the taxonomy kind of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidAmount(_)
            | Self::CampaignNotApproved { .. }
            | Self::InvalidTransition { .. }
            | Self::Validation(_) => ErrorKind::Validation,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Unauthorized(_) => ErrorKind::Authorization,
            Self::Gateway(_) => ErrorKind::Gateway,
            Self::InsufficientBalance { .. }
            | Self::NegativeBalance { .. }
            | Self::BalanceOverflow { .. } => ErrorKind::InvariantViolation,
            Self::Store(StoreError::UniqueViolation(_) | StoreError::SerializationFailure(_)) => {
                ErrorKind::ConcurrencyConflict
            }
            Self::Store(StoreError::Database(_)) => ErrorKind::Internal,
        }
    }

    /// Returns true if the same call may succeed when retried later.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Gateway(e) => e.is_transient(),
            other => other.kind() == ErrorKind::ConcurrencyConflict,
        }
    }

    /// HTTP status this error renders with at the boundary.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::Validation => 400,
            ErrorKind::Authorization => 403,
            ErrorKind::NotFound => 404,
            ErrorKind::ConcurrencyConflict => 409,
            ErrorKind::InvariantViolation => 422,
            ErrorKind::Gateway if self.is_retryable() => 503,
            ErrorKind::Gateway => 402,
            ErrorKind::Internal => 500,
        }
    }

    /// Stable machine-readable code.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidAmount(_) => "INVALID_AMOUNT",
            Self::CampaignNotApproved { .. } => "CAMPAIGN_NOT_APPROVED",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Unauthorized(_) => "AUTHORIZATION_ERROR",
            Self::Gateway(_) => "GATEWAY_ERROR",
            Self::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            Self::NegativeBalance { .. } => "NEGATIVE_BALANCE",
            Self::BalanceOverflow { .. } => "BALANCE_OVERFLOW",
            Self::Store(StoreError::UniqueViolation(_) | StoreError::SerializationFailure(_)) => {
                "CONCURRENCY_CONFLICT"
            }
            Self::Store(StoreError::Database(_)) => "INTERNAL_ERROR",
        }
    }
}

impl From<FundingError> for AppError {
    fn from(err: FundingError) -> Self {
        let retryable = err.is_retryable();
        let message = err.to_string();
        match err.kind() {
            ErrorKind::Validation => Self::Validation(message),
            ErrorKind::NotFound => Self::NotFound(message),
            ErrorKind::Authorization => Self::Authorization(message),
            ErrorKind::Gateway => Self::Gateway { message, retryable },
            ErrorKind::InvariantViolation => Self::InvariantViolation(message),
            ErrorKind::ConcurrencyConflict => Self::ConcurrencyConflict(message),
            ErrorKind::Internal => Self::Internal(message),
        }
    }
}
