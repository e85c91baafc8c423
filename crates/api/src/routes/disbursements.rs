//! Disbursement review and payout recording. Admin only.

use axum::{
    Router,
    extract::{Path, Query, State},
    response::Response,
    routing::{get, post},
};
use serde::Deserialize;
use validator::Validate;

use carefund_core::disbursement::{DisbursementStatus, PayoutResult};
use carefund_shared::types::DisbursementId;

use super::{ListQuery, ReviewRequest};
use crate::error::ApiResult;
use crate::extractors::ValidatedJson;
use crate::middleware::AuthUser;
use crate::{AppState, response};

/// Creates the disbursement routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/disbursements", get(list_disbursements))
        .route("/disbursements/{id}/approve", post(approve_disbursement))
        .route("/disbursements/{id}/reject", post(reject_disbursement))
        .route("/disbursements/{id}/process", post(process_disbursement))
}

/// Payout outcome, `{"result": "succeeded"}` or `{"result": "failed", "reason": …}`.
#[derive(Debug, Deserialize, Validate)]
pub struct ProcessPayoutRequest {
    /// What the payout executor reported.
    #[serde(flatten)]
    pub outcome: PayoutResult,
}

/// GET `/disbursements?status=`
async fn list_disbursements(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ListQuery>,
) -> ApiResult<Response> {
    let status = query.status(DisbursementStatus::parse)?;
    let page = state
        .funding
        .disbursements
        .list_disbursements(auth.user_id(), status, query.page_request())
        .await?;
    Ok(response::page("Disbursements", page))
}

/// POST `/disbursements/{id}/approve`
async fn approve_disbursement(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DisbursementId>,
    ValidatedJson(body): ValidatedJson<ReviewRequest>,
) -> ApiResult<Response> {
    let disbursement = state
        .funding
        .disbursements
        .approve_disbursement(auth.user_id(), id, body.notes)
        .await?;
    Ok(response::ok("Disbursement approved", disbursement))
}

/// POST `/disbursements/{id}/reject`
async fn reject_disbursement(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DisbursementId>,
    ValidatedJson(body): ValidatedJson<ReviewRequest>,
) -> ApiResult<Response> {
    let disbursement = state
        .funding
        .disbursements
        .reject_disbursement(auth.user_id(), id, body.notes)
        .await?;
    Ok(response::ok("Disbursement rejected", disbursement))
}

/// POST `/disbursements/{id}/process`
async fn process_disbursement(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DisbursementId>,
    ValidatedJson(body): ValidatedJson<ProcessPayoutRequest>,
) -> ApiResult<Response> {
    let disbursement = state
        .funding
        .disbursements
        .process_disbursement(auth.user_id(), id, body.outcome)
        .await?;
    let message = match disbursement.status {
        DisbursementStatus::Processed => "Disbursement processed",
        _ => "Payout failed",
    };
    Ok(response::ok(message, disbursement))
}
