//! Donation intake and confirmation.

use axum::{
    Router,
    extract::{Path, State},
    response::Response,
    routing::post,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use validator::Validate;

use carefund_core::donation::{ConfirmationOutcome, NewDonation};
use carefund_shared::types::{CampaignId, DonationId};

use crate::error::ApiResult;
use crate::extractors::ValidatedJson;
use crate::middleware::MaybeUser;
use crate::{AppState, response};

/// Creates the donation routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/donations", post(create_donation))
        .route("/donations/{id}/confirm", post(confirm_donation))
}

/// Request body for a donation.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateDonationRequest {
    /// Campaign to give to.
    pub campaign_id: CampaignId,
    /// Amount in major units.
    pub amount: Decimal,
    /// Hide the donor publicly.
    #[serde(default)]
    pub is_anonymous: bool,
    /// Note to the beneficiary.
    #[validate(length(max = 1000))]
    pub message: Option<String>,
}

/// POST `/donations` - Opens a payment intent. Guests donate without `x-user-id`.
async fn create_donation(
    State(state): State<AppState>,
    MaybeUser(donor): MaybeUser,
    ValidatedJson(body): ValidatedJson<CreateDonationRequest>,
) -> ApiResult<Response> {
    let created = state
        .funding
        .donations
        .create_donation(NewDonation {
            campaign_id: body.campaign_id,
            amount: body.amount,
            donor_id: donor,
            is_anonymous: body.is_anonymous,
            message: body.message,
        })
        .await?;
    Ok(response::created("Donation created", created))
}

/// POST `/donations/{id}/confirm` - Safe to repeat.
async fn confirm_donation(
    State(state): State<AppState>,
    Path(id): Path<DonationId>,
) -> ApiResult<Response> {
    let confirmation = state.funding.donations.confirm_donation(id).await?;
    let message = match confirmation.outcome {
        ConfirmationOutcome::Completed => "Donation confirmed",
        ConfirmationOutcome::Failed => "Payment failed",
        ConfirmationOutcome::AlreadyResolved => "Donation already resolved",
    };
    Ok(response::ok(message, confirmation))
}
