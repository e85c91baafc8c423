//! Fraud report review. Admin only.

use axum::{
    Router,
    extract::{Path, Query, State},
    response::Response,
    routing::{get, post},
};

use carefund_core::fraud::FraudReportStatus;
use carefund_shared::types::FraudReportId;

use super::{ListQuery, ReviewRequest};
use crate::error::ApiResult;
use crate::extractors::ValidatedJson;
use crate::middleware::AuthUser;
use crate::{AppState, response};

/// Creates the fraud report routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/fraud-reports", get(list_fraud_reports))
        .route("/fraud-reports/{id}/investigate", post(investigate))
        .route("/fraud-reports/{id}/confirm", post(confirm))
        .route("/fraud-reports/{id}/dismiss", post(dismiss))
}

/// GET `/fraud-reports?status=`
async fn list_fraud_reports(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ListQuery>,
) -> ApiResult<Response> {
    let status = query.status(FraudReportStatus::parse)?;
    let page = state
        .funding
        .fraud
        .list_fraud_reports(auth.user_id(), status, query.page_request())
        .await?;
    Ok(response::page("Fraud reports", page))
}

/// POST `/fraud-reports/{id}/investigate`
async fn investigate(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<FraudReportId>,
    ValidatedJson(body): ValidatedJson<ReviewRequest>,
) -> ApiResult<Response> {
    let report = state
        .funding
        .fraud
        .investigate(auth.user_id(), id, body.notes)
        .await?;
    Ok(response::ok("Fraud report under investigation", report))
}

/// POST `/fraud-reports/{id}/confirm` - Suspends the campaign.
async fn confirm(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<FraudReportId>,
    ValidatedJson(body): ValidatedJson<ReviewRequest>,
) -> ApiResult<Response> {
    let confirmation = state
        .funding
        .fraud
        .confirm_fraud(auth.user_id(), id, body.notes)
        .await?;
    Ok(response::ok("Fraud confirmed and campaign suspended", confirmation))
}

/// POST `/fraud-reports/{id}/dismiss`
async fn dismiss(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<FraudReportId>,
    ValidatedJson(body): ValidatedJson<ReviewRequest>,
) -> ApiResult<Response> {
    let report = state
        .funding
        .fraud
        .dismiss(auth.user_id(), id, body.notes)
        .await?;
    Ok(response::ok("Fraud report dismissed", report))
}
