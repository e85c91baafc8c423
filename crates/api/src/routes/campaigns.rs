//! Campaign review, balance and per-campaign sub-resources.

use axum::{
    Router,
    extract::{Path, Query, State},
    response::Response,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use carefund_core::disbursement::DisbursementRequest;
use carefund_core::donation::{Donation, DonationStatus};
use carefund_core::fraud::NewFraudReport;
use carefund_core::ledger::NewCampaign;
use carefund_shared::types::{CampaignId, Currency, DonationId, UserId};

use super::ListQuery;
use crate::error::ApiResult;
use crate::extractors::ValidatedJson;
use crate::middleware::{AuthUser, MaybeUser};
use crate::{AppState, response};

/// Creates the campaign routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/campaigns", post(submit_campaign))
        .route("/campaigns/{id}/approve", post(approve_campaign))
        .route("/campaigns/{id}/reject", post(reject_campaign))
        .route("/campaigns/{id}/balance", get(campaign_balance))
        .route("/campaigns/{id}/invariant", get(campaign_invariant))
        .route("/campaigns/{id}/donations", get(list_campaign_donations))
        .route("/campaigns/{id}/disbursements", post(request_disbursement))
        .route("/campaigns/{id}/fraud-reports", post(file_fraud_report))
}

/// Request body for submitting a campaign.
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitCampaignRequest {
    /// Public title.
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    /// Fundraising goal.
    pub target_amount: Decimal,
}

/// Request body for rejecting a campaign.
#[derive(Debug, Deserialize, Validate)]
pub struct RejectCampaignRequest {
    /// Shown to the partner.
    #[validate(length(min = 1, max = 2000))]
    pub reason: String,
}

/// Request body for a disbursement.
#[derive(Debug, Deserialize, Validate)]
pub struct RequestDisbursementBody {
    /// Amount to pay out.
    pub amount: Decimal,
    /// Overrides the partner profile's account.
    #[validate(length(min = 1, max = 64))]
    pub bank_account_number: Option<String>,
    /// Overrides the partner profile's bank.
    #[validate(length(min = 1, max = 255))]
    pub bank_name: Option<String>,
}

/// Request body for a fraud report.
#[derive(Debug, Deserialize, Validate)]
pub struct FileFraudReportRequest {
    /// What the reporter observed.
    #[validate(length(min = 1, max = 5000))]
    pub description: String,
    /// Reference to uploaded evidence.
    #[validate(length(max = 500))]
    pub evidence_file: Option<String>,
}

/// Donation as shown on a campaign page. Anonymous donors are not revealed.
#[derive(Debug, Serialize)]
pub struct PublicDonation {
    /// Donation id.
    pub id: DonationId,
    /// Donor, hidden for anonymous gifts.
    pub donor_id: Option<UserId>,
    /// Amount.
    pub amount: Decimal,
    /// Currency.
    pub currency: Currency,
    /// Lifecycle status.
    pub status: DonationStatus,
    /// Whether the donor asked to stay anonymous.
    pub is_anonymous: bool,
    /// Note to the beneficiary.
    pub donor_message: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Completion time.
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<Donation> for PublicDonation {
    fn from(d: Donation) -> Self {
        Self {
            id: d.id,
            donor_id: if d.is_anonymous { None } else { d.donor_id },
            amount: d.amount,
            currency: d.currency,
            status: d.status,
            is_anonymous: d.is_anonymous,
            donor_message: d.donor_message,
            created_at: d.created_at,
            completed_at: d.completed_at,
        }
    }
}

/// POST `/campaigns` - Partner submits a campaign for review.
async fn submit_campaign(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(body): ValidatedJson<SubmitCampaignRequest>,
) -> ApiResult<Response> {
    let campaign = state
        .funding
        .ledger
        .submit_campaign(
            auth.user_id(),
            NewCampaign {
                title: body.title,
                target_amount: body.target_amount,
            },
        )
        .await?;
    Ok(response::created("Campaign submitted for review", campaign))
}

/// POST `/campaigns/{id}/approve`
async fn approve_campaign(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<CampaignId>,
) -> ApiResult<Response> {
    let campaign = state.funding.ledger.approve_campaign(auth.user_id(), id).await?;
    Ok(response::ok("Campaign approved", campaign))
}

/// POST `/campaigns/{id}/reject`
async fn reject_campaign(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<CampaignId>,
    ValidatedJson(body): ValidatedJson<RejectCampaignRequest>,
) -> ApiResult<Response> {
    let campaign = state
        .funding
        .ledger
        .reject_campaign(auth.user_id(), id, body.reason)
        .await?;
    Ok(response::ok("Campaign rejected", campaign))
}

/// GET `/campaigns/{id}/balance`
async fn campaign_balance(
    State(state): State<AppState>,
    Path(id): Path<CampaignId>,
) -> ApiResult<Response> {
    let balance = state.funding.ledger.balance(id).await?;
    Ok(response::ok("Campaign balance", balance))
}

/// GET `/campaigns/{id}/invariant` - Recomputes `funds_raised` from records.
async fn campaign_invariant(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<CampaignId>,
) -> ApiResult<Response> {
    let report = state
        .funding
        .ledger
        .audit_invariant(auth.user_id(), id)
        .await?;
    let message = if report.holds() {
        "Funding invariant holds"
    } else {
        "Funding invariant violated"
    };
    Ok(response::ok(message, report))
}

/// GET `/campaigns/{id}/donations`
async fn list_campaign_donations(
    State(state): State<AppState>,
    Path(id): Path<CampaignId>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Response> {
    let page = state
        .funding
        .donations
        .list_donations(id, query.page_request())
        .await?
        .map(PublicDonation::from);
    Ok(response::page("Campaign donations", page))
}

/// POST `/campaigns/{id}/disbursements`
async fn request_disbursement(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<CampaignId>,
    ValidatedJson(body): ValidatedJson<RequestDisbursementBody>,
) -> ApiResult<Response> {
    let disbursement = state
        .funding
        .disbursements
        .request_disbursement(
            auth.user_id(),
            id,
            DisbursementRequest {
                amount: body.amount,
                bank_account_number: body.bank_account_number,
                bank_name: body.bank_name,
            },
        )
        .await?;
    Ok(response::created("Disbursement requested", disbursement))
}

/// POST `/campaigns/{id}/fraud-reports` - Guests may report.
async fn file_fraud_report(
    State(state): State<AppState>,
    MaybeUser(reporter): MaybeUser,
    Path(id): Path<CampaignId>,
    ValidatedJson(body): ValidatedJson<FileFraudReportRequest>,
) -> ApiResult<Response> {
    let report = state
        .funding
        .fraud
        .file_fraud_report(
            reporter,
            id,
            NewFraudReport {
                description: body.description,
                evidence_file: body.evidence_file,
            },
        )
        .await?;
    info!(report_id = %report.id, campaign_id = %id, "Fraud report received");
    Ok(response::created("Fraud report submitted", report))
}
