//! API route definitions.

use axum::Router;
use serde::Deserialize;
use validator::Validate;

use carefund_shared::AppError;
use carefund_shared::types::PageRequest;

use crate::AppState;
use crate::error::ApiError;

pub mod campaigns;
pub mod disbursements;
pub mod donations;
pub mod fraud;
pub mod health;

/// Creates the API router with all routes.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(health::routes())
        .merge(campaigns::routes())
        .merge(donations::routes())
        .merge(disbursements::routes())
        .merge(fraud::routes())
}

/// Optional reviewer notes sent with admin decisions.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct ReviewRequest {
    /// Free-text notes stored with the decision.
    #[serde(default)]
    #[validate(length(max = 5000))]
    pub notes: Option<String>,
}

/// `?page=&per_page=&status=` for admin list endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// Status filter, lowercase.
    pub status: Option<String>,
    /// 1-indexed page.
    pub page: Option<u32>,
    /// Page size, clamped to 1..=100.
    pub per_page: Option<u32>,
}

impl ListQuery {
    /// Normalized page request.
    pub fn page_request(&self) -> PageRequest {
        let defaults = PageRequest::default();
        PageRequest::new(
            self.page.unwrap_or(defaults.page),
            self.per_page.unwrap_or(defaults.per_page),
        )
    }

    /// Parses the status filter with `parse`, rejecting unknown values.
    pub fn status<T>(&self, parse: impl Fn(&str) -> Option<T>) -> Result<Option<T>, ApiError> {
        match self.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            None => Ok(None),
            Some(raw) => parse(raw)
                .map(Some)
                .ok_or_else(|| AppError::Validation(format!("Unknown status: {raw}")).into()),
        }
    }
}
