//! Disbursement payout: request, review, settle.
//!
//! Every mutation locks the campaign row before the disbursement row, so the
//! balance check and the status change it guards are serialized per campaign.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{info, warn};

use carefund_shared::types::{CampaignId, DisbursementId, PageRequest, PageResponse, UserId};

use crate::disbursement::service::DisbursementService;
use crate::disbursement::types::{
    Disbursement, DisbursementRequest, DisbursementStatus, PayoutResult,
};
use crate::error::{FundingError, FundingResult};
use crate::identity::{User, load_actor};
use crate::ledger::balance::{available_balance, ensure_covered};
use crate::ledger::{Campaign, CampaignLedger, CampaignStatus, validate_amount};
use crate::store::{FundingStore, FundingTx};

/// Drives disbursements from request to payout.
#[derive(Clone)]
pub struct DisbursementWorkflow {
    store: Arc<dyn FundingStore>,
}

impl DisbursementWorkflow {
    /// Creates a workflow over `store`.
    pub fn new(store: Arc<dyn FundingStore>) -> Self {
        Self { store }
    }

    /// Records a `pending` payout request from the campaign's own partner.
    ///
    /// The amount must fit in the campaign's available balance.
    pub async fn request_disbursement(
        &self,
        actor: UserId,
        campaign_id: CampaignId,
        request: DisbursementRequest,
    ) -> FundingResult<Disbursement> {
        validate_amount(request.amount)?;
        let partner = load_actor(self.store.as_ref(), actor).await?;
        let profile = partner.require_partner()?;

        let mut tx = self.store.begin().await?;
        let campaign = CampaignLedger::lock_campaign(tx.as_mut(), campaign_id).await?;
        if campaign.partner_id != partner.id {
            return Err(FundingError::Unauthorized(format!(
                "Campaign {campaign_id} does not belong to partner {}",
                partner.id
            )));
        }
        CampaignLedger::ensure_accepts_money(&campaign)?;

        let available = CampaignLedger::available_in(tx.as_mut(), &campaign).await?;
        ensure_covered(&campaign, request.amount, available).inspect_err(|_| {
            warn!(%campaign_id, requested = %request.amount, %available, "Disbursement request exceeds available balance");
        })?;
        let bank = DisbursementService::resolve_bank(&request, profile)?;

        let now = Utc::now();
        let disbursement = Disbursement {
            id: DisbursementId::new(),
            campaign_id,
            requested_by: partner.id,
            amount: request.amount,
            status: DisbursementStatus::Pending,
            bank,
            approved_by: None,
            approved_at: None,
            approval_notes: None,
            processed_at: None,
            failure_reason: None,
            created_at: now,
            updated_at: now,
        };
        tx.insert_disbursement(&disbursement).await?;
        tx.commit().await?;

        info!(
            disbursement_id = %disbursement.id,
            %campaign_id,
            amount = %disbursement.amount,
            available_before = %available,
            "Disbursement requested"
        );
        Ok(disbursement)
    }

    /// Admin approval: `pending → approved`.
    ///
    /// Re-checks the campaign status and re-checks that this amount plus every
    /// other pending or approved disbursement still fits in `funds_raised`.
    pub async fn approve_disbursement(
        &self,
        actor: UserId,
        disbursement_id: DisbursementId,
        notes: Option<String>,
    ) -> FundingResult<Disbursement> {
        let admin = self.admin(actor).await?;
        let (mut tx, campaign, mut disbursement) = self.lock_pair(disbursement_id).await?;

        let action = DisbursementService::approve(disbursement.status, admin.id, notes)?;
        CampaignLedger::ensure_accepts_money(&campaign)?;

        let reserved_by_others =
            CampaignLedger::reserved_in(tx.as_mut(), campaign.id, Some(disbursement.id)).await?;
        let available = available_balance(campaign.funds_raised, [reserved_by_others]);
        ensure_covered(&campaign, disbursement.amount, available).inspect_err(|_| {
            warn!(
                %disbursement_id,
                campaign_id = %campaign.id,
                amount = %disbursement.amount,
                %available,
                "Approval would over-commit campaign funds"
            );
        })?;

        DisbursementService::apply(&mut disbursement, action);
        tx.update_disbursement(&disbursement).await?;
        tx.commit().await?;

        info!(%disbursement_id, admin_id = %admin.id, amount = %disbursement.amount, "Disbursement approved");
        Ok(disbursement)
    }

    /// Admin rejection: `pending → failed`. Releases the reservation.
    pub async fn reject_disbursement(
        &self,
        actor: UserId,
        disbursement_id: DisbursementId,
        notes: Option<String>,
    ) -> FundingResult<Disbursement> {
        let admin = self.admin(actor).await?;
        let (mut tx, _campaign, mut disbursement) = self.lock_pair(disbursement_id).await?;

        let action = DisbursementService::reject(disbursement.status, admin.id, notes)?;
        DisbursementService::apply(&mut disbursement, action);
        tx.update_disbursement(&disbursement).await?;
        tx.commit().await?;

        info!(%disbursement_id, admin_id = %admin.id, "Disbursement rejected");
        Ok(disbursement)
    }

    /// Records the payout executor's result for an `approved` disbursement.
    ///
    /// Success debits the campaign in the same transaction; failure only
    /// releases the reservation.
    pub async fn process_disbursement(
        &self,
        actor: UserId,
        disbursement_id: DisbursementId,
        result: PayoutResult,
    ) -> FundingResult<Disbursement> {
        let admin = self.admin(actor).await?;
        let (mut tx, mut campaign, mut disbursement) = self.lock_pair(disbursement_id).await?;

        if campaign.status == CampaignStatus::Suspended {
            warn!(
                %disbursement_id,
                campaign_id = %campaign.id,
                "Settling an approved payout on a suspended campaign"
            );
        }

        match result {
            PayoutResult::Succeeded => {
                let action = DisbursementService::process(disbursement.status)?;
                let funds_raised =
                    CampaignLedger::debit(tx.as_mut(), &mut campaign, disbursement.amount).await?;
                DisbursementService::apply(&mut disbursement, action);
                tx.update_disbursement(&disbursement).await?;
                tx.commit().await?;
                info!(
                    %disbursement_id,
                    admin_id = %admin.id,
                    amount = %disbursement.amount,
                    %funds_raised,
                    "Disbursement processed"
                );
            }
            PayoutResult::Failed { reason } => {
                let action = DisbursementService::fail_payout(disbursement.status, reason)?;
                DisbursementService::apply(&mut disbursement, action);
                tx.update_disbursement(&disbursement).await?;
                tx.commit().await?;
                warn!(
                    %disbursement_id,
                    reason = disbursement.failure_reason.as_deref().unwrap_or_default(),
                    "Disbursement payout failed"
                );
            }
        }
        Ok(disbursement)
    }

    /// Disbursements across all campaigns. Admin only.
    pub async fn list_disbursements(
        &self,
        actor: UserId,
        status: Option<DisbursementStatus>,
        page: PageRequest,
    ) -> FundingResult<PageResponse<Disbursement>> {
        self.admin(actor).await?;
        Ok(self.store.list_disbursements(status, page).await?)
    }

    /// Sum of a campaign's pending and approved disbursements.
    pub async fn reserved_total(&self, campaign_id: CampaignId) -> FundingResult<Decimal> {
        let mut tx = self.store.begin().await?;
        CampaignLedger::lock_campaign(tx.as_mut(), campaign_id).await?;
        CampaignLedger::reserved_in(tx.as_mut(), campaign_id, None).await
    }

    async fn admin(&self, actor: UserId) -> FundingResult<User> {
        let user = load_actor(self.store.as_ref(), actor).await?;
        user.require_admin()?;
        Ok(user)
    }

    /// Opens a transaction holding the campaign lock, then the disbursement lock.
    async fn lock_pair(
        &self,
        disbursement_id: DisbursementId,
    ) -> FundingResult<(Box<dyn FundingTx>, Campaign, Disbursement)> {
        let campaign_id = self
            .store
            .find_disbursement(disbursement_id)
            .await?
            .ok_or_else(|| FundingError::not_found("Disbursement", disbursement_id))?
            .campaign_id;

        let mut tx = self.store.begin().await?;
        let campaign = CampaignLedger::lock_campaign(tx.as_mut(), campaign_id).await?;
        let disbursement = tx
            .lock_disbursement(disbursement_id)
            .await?
            .ok_or_else(|| FundingError::not_found("Disbursement", disbursement_id))?;
        Ok((tx, campaign, disbursement))
    }
}
