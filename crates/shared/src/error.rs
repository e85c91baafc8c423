//! Application-wide error types.
//!
//! `AppError` is the boundary error every workflow failure is mapped onto
//! before it leaves the service. Its variants mirror the funding error
//! taxonomy one to one.

use thiserror::Error;

/// Result type alias using `AppError`.
pub type AppResult<T> = Result<T, AppError>;

/// Generic message returned in place of internal failure details.
pub const INTERNAL_ERROR_MESSAGE: &str = "An internal error occurred";

/// Application error types.
#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed input or a precondition state that does not allow the call.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Role or ownership mismatch.
    #[error("Not authorized: {0}")]
    Authorization(String),

    /// Payment gateway rejected or could not be reached.
    #[error("Payment gateway error: {message}")]
    Gateway {
        /// Human-readable gateway message.
        message: String,
        /// Whether the caller may retry the same call later.
        retryable: bool,
    },

    /// The mutation would break the funding invariant.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Lost a serialization race; the caller should retry.
    #[error("Concurrency conflict: {0}")]
    ConcurrencyConflict(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::Gateway {
                retryable: false, ..
            } => 402,
            Self::Authorization(_) => 403,
            Self::NotFound(_) => 404,
            Self::ConcurrencyConflict(_) => 409,
            Self::InvariantViolation(_) => 422,
            Self::Gateway {
                retryable: true, ..
            } => 503,
            Self::Internal(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Authorization(_) => "AUTHORIZATION_ERROR",
            Self::Gateway { .. } => "GATEWAY_ERROR",
            Self::InvariantViolation(_) => "INVARIANT_VIOLATION",
            Self::ConcurrencyConflict(_) => "CONCURRENCY_CONFLICT",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns the taxonomy name of this error.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound(_) => "not_found",
            Self::Authorization(_) => "authorization",
            Self::Gateway { .. } => "gateway",
            Self::InvariantViolation(_) => "invariant_violation",
            Self::ConcurrencyConflict(_) => "concurrency_conflict",
            Self::Internal(_) => "internal",
        }
    }

    /// Returns true if retrying the same call later may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Gateway {
                retryable: true, ..
            } | Self::ConcurrencyConflict(_)
        )
    }

    /// Returns the message that is safe to show to the caller.
    ///
    /// Internal failures never leak their detail.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Internal(_) => INTERNAL_ERROR_MESSAGE.to_string(),
            Self::Validation(msg)
            | Self::NotFound(msg)
            | Self::Authorization(msg)
            | Self::InvariantViolation(msg)
            | Self::ConcurrencyConflict(msg)
            | Self::Gateway { message: msg, .. } => msg.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn gateway(retryable: bool) -> AppError {
        AppError::Gateway {
            message: "msg".into(),
            retryable,
        }
    }

    #[rstest]
    #[case(AppError::Validation(String::new()), 400, "VALIDATION_ERROR")]
    #[case(AppError::NotFound(String::new()), 404, "NOT_FOUND")]
    #[case(AppError::Authorization(String::new()), 403, "AUTHORIZATION_ERROR")]
    #[case(gateway(false), 402, "GATEWAY_ERROR")]
    #[case(gateway(true), 503, "GATEWAY_ERROR")]
    #[case(AppError::InvariantViolation(String::new()), 422, "INVARIANT_VIOLATION")]
    #[case(AppError::ConcurrencyConflict(String::new()), 409, "CONCURRENCY_CONFLICT")]
    #[case(AppError::Internal(String::new()), 500, "INTERNAL_ERROR")]
    fn test_status_and_code(#[case] err: AppError, #[case] status: u16, #[case] code: &str) {
        assert_eq!(err.status_code(), status);
        assert_eq!(err.error_code(), code);
        assert_eq!(err.kind(), code.trim_end_matches("_ERROR").to_lowercase());
    }

    #[test]
    fn test_retryable() {
        assert!(gateway(true).is_retryable());
        assert!(AppError::ConcurrencyConflict("race".into()).is_retryable());
        assert!(!gateway(false).is_retryable());
        assert!(!AppError::Validation("bad".into()).is_retryable());
    }

    #[test]
    fn test_internal_message_is_hidden() {
        let err = AppError::Internal("connection refused on 10.0.0.3".into());
        assert_eq!(err.public_message(), INTERNAL_ERROR_MESSAGE);
        assert!(err.to_string().contains("10.0.0.3"));
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            AppError::Validation("msg".into()).to_string(),
            "Validation error: msg"
        );
        assert_eq!(
            AppError::Authorization("msg".into()).to_string(),
            "Not authorized: msg"
        );
        assert_eq!(gateway(true).to_string(), "Payment gateway error: msg");
        assert_eq!(
            AppError::InvariantViolation("msg".into()).public_message(),
            "msg"
        );
    }
}
