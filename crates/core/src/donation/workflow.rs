//! Donation intake: open a payment intent, then confirm it into a ledger credit.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use carefund_shared::types::{CampaignId, Currency, DonationId, Money, PageRequest, PageResponse};

use crate::donation::service::DonationService;
use crate::donation::types::{
    ConfirmationOutcome, Donation, DonationAction, DonationConfirmation, DonationCreated,
    DonationStatus, NewDonation,
};
use crate::error::{FundingError, FundingResult};
use crate::gateway::{IntentStatus, PaymentGateway};
use crate::identity::load_actor;
use crate::ledger::{Campaign, CampaignLedger, CampaignProgress};
use crate::store::{FundingStore, FundingTx};

/// Drives donations from request to credit.
#[derive(Clone)]
pub struct DonationWorkflow {
    store: Arc<dyn FundingStore>,
    gateway: Arc<dyn PaymentGateway>,
    currency: Currency,
}

impl DonationWorkflow {
    /// Creates a workflow that opens intents in `currency`.
    pub fn new(
        store: Arc<dyn FundingStore>,
        gateway: Arc<dyn PaymentGateway>,
        currency: Currency,
    ) -> Self {
        Self {
            store,
            gateway,
            currency,
        }
    }

    /// Opens a payment intent and records a `pending` donation.
    ///
    /// Nothing is persisted if validation or the gateway call fails.
    pub async fn create_donation(&self, input: NewDonation) -> FundingResult<DonationCreated> {
        DonationService::validate_new(&input)?;

        if let Some(donor_id) = input.donor_id {
            let donor = load_actor(self.store.as_ref(), donor_id).await?;
            donor.require_donor()?;
        }

        let campaign = self
            .store
            .find_campaign(input.campaign_id)
            .await?
            .ok_or_else(|| FundingError::not_found("Campaign", input.campaign_id))?;
        CampaignLedger::ensure_accepts_money(&campaign)?;

        let amount = Money::new(input.amount, self.currency);
        let intent = self
            .gateway
            .create_intent(amount, format!("Donation to campaign: {}", campaign.title))
            .await
            .inspect_err(|e| {
                warn!(campaign_id = %campaign.id, amount = %input.amount, error = %e, "Payment intent creation failed");
            })?;

        let donation = Donation {
            id: DonationId::new(),
            campaign_id: campaign.id,
            donor_id: input.donor_id,
            amount: input.amount,
            currency: intent.currency,
            status: DonationStatus::Pending,
            transaction_id: intent.id.clone(),
            is_anonymous: input.is_anonymous,
            donor_message: input
                .message
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty()),
            failure_reason: None,
            created_at: Utc::now(),
            completed_at: None,
        };

        let mut tx = self.store.begin().await?;
        // Fraud confirmation may have suspended the campaign during the gateway call.
        let locked = CampaignLedger::lock_campaign(tx.as_mut(), campaign.id).await?;
        CampaignLedger::ensure_accepts_money(&locked)?;
        tx.insert_donation(&donation).await?;
        tx.commit().await?;

        info!(
            donation_id = %donation.id,
            campaign_id = %donation.campaign_id,
            amount = %donation.amount,
            transaction_id = %donation.transaction_id,
            "Donation created"
        );

        Ok(DonationCreated {
            donation,
            client_secret: intent.client_secret,
            currency: intent.currency,
        })
    }

    /// Confirms a donation against the gateway. Safe to call any number of times.
    ///
    /// A donation that is already `completed` or `failed` is returned as
    /// `AlreadyResolved` without asking the gateway again. Gateway errors leave
    /// the donation `pending`; any verified status other than a capture fails it.
    /// Either resolution writes a payment record in the same transaction.
    pub async fn confirm_donation(&self, donation_id: DonationId) -> FundingResult<DonationConfirmation> {
        let existing = self
            .store
            .find_donation(donation_id)
            .await?
            .ok_or_else(|| FundingError::not_found("Donation", donation_id))?;
        if existing.status.is_terminal() {
            let campaign = self.campaign(existing.campaign_id).await?;
            debug!(%donation_id, status = %existing.status, "Donation already resolved");
            return Ok(Self::resolved(existing, &campaign));
        }

        // Verify outside the transaction so no row lock is held across the network call.
        let verification = self
            .gateway
            .verify_intent(existing.transaction_id.clone())
            .await
            .inspect_err(|e| {
                warn!(%donation_id, transaction_id = %existing.transaction_id, error = %e, "Payment verification failed");
            })?;

        let mut tx = self.store.begin().await?;
        let mut donation = tx
            .lock_donation(donation_id)
            .await?
            .ok_or_else(|| FundingError::not_found("Donation", donation_id))?;
        if donation.status.is_terminal() {
            let campaign = Self::campaign_in(tx.as_mut(), donation.campaign_id).await?;
            debug!(%donation_id, status = %donation.status, "Donation resolved by a concurrent confirmation");
            return Ok(Self::resolved(donation, &campaign));
        }

        let action = DonationService::decide(&donation, &verification)?;
        if verification.status == IntentStatus::Succeeded
            && verification.currency != donation.currency
        {
            // Money was captured but is not credited; an operator has to reconcile or refund it.
            error!(
                %donation_id,
                transaction_id = %donation.transaction_id,
                expected = %donation.currency,
                settled = %verification.currency,
                amount = %donation.amount,
                "Captured payment settled in a different currency, marking donation failed for reconciliation"
            );
        }

        let (campaign, outcome) = match action {
            DonationAction::Complete { .. } => {
                let mut campaign =
                    CampaignLedger::lock_campaign(tx.as_mut(), donation.campaign_id).await?;
                if !campaign.status.accepts_money_movement() {
                    warn!(
                        %donation_id,
                        campaign_id = %campaign.id,
                        status = %campaign.status,
                        "Crediting a captured payment to a campaign that no longer accepts donations"
                    );
                }
                CampaignLedger::credit(tx.as_mut(), &mut campaign, donation.amount).await?;
                DonationService::apply(&mut donation, action);
                tx.update_donation(&donation).await?;

                if donation.counts_toward_donor() {
                    Self::record_for_donor(tx.as_mut(), &donation).await?;
                }
                (campaign, ConfirmationOutcome::Completed)
            }
            DonationAction::Fail { .. } => {
                DonationService::apply(&mut donation, action);
                tx.update_donation(&donation).await?;
                let campaign = Self::campaign_in(tx.as_mut(), donation.campaign_id).await?;
                (campaign, ConfirmationOutcome::Failed)
            }
        };
        let record = DonationService::payment_record(&donation, &verification);
        tx.insert_payment_record(&record).await?;
        tx.commit().await?;

        match outcome {
            ConfirmationOutcome::Completed => info!(
                %donation_id,
                campaign_id = %campaign.id,
                amount = %donation.amount,
                funds_raised = %campaign.funds_raised,
                "Donation completed"
            ),
            _ => info!(
                %donation_id,
                reason = donation.failure_reason.as_deref().unwrap_or_default(),
                "Donation failed"
            ),
        }

        Ok(DonationConfirmation {
            campaign_progress: CampaignProgress::from(&campaign),
            donation,
            outcome,
        })
    }

    /// Donations to a campaign, newest first.
    pub async fn list_donations(
        &self,
        campaign_id: CampaignId,
        page: PageRequest,
    ) -> FundingResult<PageResponse<Donation>> {
        self.campaign(campaign_id).await?;
        Ok(self.store.list_donations(campaign_id, page).await?)
    }

    async fn record_for_donor(tx: &mut dyn FundingTx, donation: &Donation) -> FundingResult<()> {
        let Some(donor_id) = donation.donor_id else {
            return Ok(());
        };
        let Some(mut donor) = tx.lock_user(donor_id).await? else {
            warn!(donation_id = %donation.id, %donor_id, "Donor vanished before confirmation");
            return Ok(());
        };
        if donor.record_donation(donation.amount) {
            tx.update_user(&donor).await?;
        }
        Ok(())
    }

    async fn campaign(&self, id: CampaignId) -> FundingResult<Campaign> {
        self.store
            .find_campaign(id)
            .await?
            .ok_or_else(|| FundingError::not_found("Campaign", id))
    }

    async fn campaign_in(tx: &mut dyn FundingTx, id: CampaignId) -> FundingResult<Campaign> {
        tx.find_campaign(id)
            .await?
            .ok_or_else(|| FundingError::not_found("Campaign", id))
    }

    fn resolved(donation: Donation, campaign: &Campaign) -> DonationConfirmation {
        DonationConfirmation {
            donation,
            outcome: ConfirmationOutcome::AlreadyResolved,
            campaign_progress: CampaignProgress::from(campaign),
        }
    }
}
