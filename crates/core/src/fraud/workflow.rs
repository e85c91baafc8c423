//! Fraud reporting and the suspension it can force.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use carefund_shared::types::{CampaignId, FraudReportId, PageRequest, PageResponse, UserId};

use crate::disbursement::service::DisbursementService;
use crate::disbursement::types::DisbursementStatus;
use crate::error::{FundingError, FundingResult};
use crate::fraud::service::FraudService;
use crate::fraud::types::{FraudAction, FraudConfirmation, FraudReport, FraudReportStatus, NewFraudReport};
use crate::identity::{User, load_actor};
use crate::ledger::{CampaignLedger, CampaignService};
use crate::store::FundingStore;

/// Drives fraud reports from filing to verdict.
#[derive(Clone)]
pub struct FraudWorkflow {
    store: Arc<dyn FundingStore>,
}

impl FraudWorkflow {
    /// Creates a workflow over `store`.
    pub fn new(store: Arc<dyn FundingStore>) -> Self {
        Self { store }
    }

    /// Files a `pending` report. Anyone may report, including anonymous visitors.
    pub async fn file_fraud_report(
        &self,
        reporter: Option<UserId>,
        campaign_id: CampaignId,
        input: NewFraudReport,
    ) -> FundingResult<FraudReport> {
        FraudService::validate_new(&input)?;
        if let Some(reporter_id) = reporter {
            load_actor(self.store.as_ref(), reporter_id)
                .await?
                .require_active()?;
        }

        let campaign = self
            .store
            .find_campaign(campaign_id)
            .await?
            .ok_or_else(|| FundingError::not_found("Campaign", campaign_id))?;

        let now = Utc::now();
        let report = FraudReport {
            id: FraudReportId::new(),
            campaign_id: campaign.id,
            reported_by: reporter,
            description: input.description.trim().to_string(),
            evidence_file: input.evidence_file.filter(|f| !f.trim().is_empty()),
            status: FraudReportStatus::Pending,
            investigation_notes: None,
            reviewed_by: None,
            created_at: now,
            updated_at: now,
        };
        let mut tx = self.store.begin().await?;
        tx.insert_fraud_report(&report).await?;
        tx.commit().await?;

        info!(report_id = %report.id, %campaign_id, anonymous = reporter.is_none(), "Fraud report filed");
        Ok(report)
    }

    /// `pending → investigating`.
    pub async fn investigate(
        &self,
        actor: UserId,
        report_id: FraudReportId,
        notes: Option<String>,
    ) -> FundingResult<FraudReport> {
        let admin = self.admin(actor).await?;
        let report = self
            .transition(report_id, |status| FraudService::investigate(status, admin.id, notes))
            .await?;
        info!(%report_id, admin_id = %admin.id, "Fraud report under investigation");
        Ok(report)
    }

    /// `→ dismissed`. The campaign is untouched.
    pub async fn dismiss(
        &self,
        actor: UserId,
        report_id: FraudReportId,
        notes: Option<String>,
    ) -> FundingResult<FraudReport> {
        let admin = self.admin(actor).await?;
        let report = self
            .transition(report_id, |status| FraudService::dismiss(status, admin.id, notes))
            .await?;
        info!(%report_id, admin_id = %admin.id, "Fraud report dismissed");
        Ok(report)
    }

    /// `→ confirmed`, suspending the campaign and failing its pending
    /// disbursements in the same transaction.
    ///
    /// Approved disbursements are left for the payout executor.
    pub async fn confirm_fraud(
        &self,
        actor: UserId,
        report_id: FraudReportId,
        notes: Option<String>,
    ) -> FundingResult<FraudConfirmation> {
        let admin = self.admin(actor).await?;

        let mut tx = self.store.begin().await?;
        let mut report = tx
            .lock_fraud_report(report_id)
            .await?
            .ok_or_else(|| FundingError::not_found("Fraud report", report_id))?;
        let action = FraudService::confirm(report.status, admin.id, notes)?;

        let mut campaign = CampaignLedger::lock_campaign(tx.as_mut(), report.campaign_id).await?;
        let previous_status = campaign.status;
        let suspend = CampaignService::suspend(campaign.status);
        CampaignLedger::apply(&mut campaign, suspend);
        tx.update_campaign(&campaign).await?;

        let pending = tx
            .disbursements_for_campaign(campaign.id, &[DisbursementStatus::Pending])
            .await?;
        let mut rejected_disbursements = Vec::with_capacity(pending.len());
        for mut disbursement in pending {
            let cancel = DisbursementService::cancel_for_fraud(disbursement.status)?;
            DisbursementService::apply(&mut disbursement, cancel);
            tx.update_disbursement(&disbursement).await?;
            rejected_disbursements.push(disbursement);
        }

        FraudService::apply(&mut report, action);
        tx.update_fraud_report(&report).await?;
        tx.commit().await?;

        warn!(
            %report_id,
            campaign_id = %campaign.id,
            from = %previous_status,
            admin_id = %admin.id,
            rejected = rejected_disbursements.len(),
            "Fraud confirmed, campaign suspended"
        );

        Ok(FraudConfirmation {
            report,
            campaign,
            rejected_disbursements,
        })
    }

    /// Fraud reports across all campaigns. Admin only.
    pub async fn list_fraud_reports(
        &self,
        actor: UserId,
        status: Option<FraudReportStatus>,
        page: PageRequest,
    ) -> FundingResult<PageResponse<FraudReport>> {
        self.admin(actor).await?;
        Ok(self.store.list_fraud_reports(status, page).await?)
    }

    async fn admin(&self, actor: UserId) -> FundingResult<User> {
        let user = load_actor(self.store.as_ref(), actor).await?;
        user.require_admin()?;
        Ok(user)
    }

    /// Locks a report and applies a transition that has no campaign effect.
    async fn transition(
        &self,
        report_id: FraudReportId,
        decide: impl FnOnce(FraudReportStatus) -> FundingResult<FraudAction> + Send,
    ) -> FundingResult<FraudReport> {
        let mut tx = self.store.begin().await?;
        let mut report = tx
            .lock_fraud_report(report_id)
            .await?
            .ok_or_else(|| FundingError::not_found("Fraud report", report_id))?;
        let action = decide(report.status)?;
        FraudService::apply(&mut report, action);
        tx.update_fraud_report(&report).await?;
        tx.commit().await?;
        Ok(report)
    }
}
