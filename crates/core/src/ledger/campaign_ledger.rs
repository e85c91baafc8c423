//! Store-backed campaign ledger.
//!
//! `CampaignLedger` is the only code that writes `funds_raised`. Workflows call
//! its transaction-scoped associated functions with their own open
//! transaction, so the credit or debit commits together with the status change
//! that caused it.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{info, warn};

use carefund_shared::types::money::{MAX_AMOUNT, has_valid_scale};
use carefund_shared::types::{CampaignId, DisbursementId, UserId};

use crate::disbursement::types::DisbursementStatus;
use crate::error::{FundingError, FundingResult};
use crate::identity::load_actor;
use crate::ledger::balance;
use crate::ledger::service::{CampaignAction, CampaignService};
use crate::ledger::types::{Campaign, InvariantReport, LedgerBalance, NewCampaign};
use crate::store::{FundingStore, FundingTx};

/// Validates a money amount supplied by a caller.
pub fn validate_amount(amount: Decimal) -> FundingResult<()> {
    if amount <= Decimal::ZERO || amount > MAX_AMOUNT || !has_valid_scale(amount) {
        return Err(FundingError::InvalidAmount(amount));
    }
    Ok(())
}

/// Single source of truth for campaign balances.
#[derive(Clone)]
pub struct CampaignLedger {
    store: Arc<dyn FundingStore>,
}

impl CampaignLedger {
    /// Creates a ledger over `store`.
    pub fn new(store: Arc<dyn FundingStore>) -> Self {
        Self { store }
    }

    /// Locks a campaign row inside `tx`.
    pub async fn lock_campaign(tx: &mut dyn FundingTx, id: CampaignId) -> FundingResult<Campaign> {
        tx.lock_campaign(id)
            .await?
            .ok_or_else(|| FundingError::not_found("Campaign", id))
    }

    /// Fails unless the campaign is `approved`.
    pub fn ensure_accepts_money(campaign: &Campaign) -> FundingResult<()> {
        if campaign.status.accepts_money_movement() {
            Ok(())
        } else {
            Err(FundingError::CampaignNotApproved {
                campaign_id: campaign.id,
                status: campaign.status,
            })
        }
    }

    /// Sum of pending and approved disbursements, optionally leaving one out.
    ///
    /// The caller must hold the campaign lock.
    pub async fn reserved_in(
        tx: &mut dyn FundingTx,
        campaign_id: CampaignId,
        excluding: Option<DisbursementId>,
    ) -> FundingResult<Decimal> {
        let reserving = tx
            .disbursements_for_campaign(campaign_id, &DisbursementStatus::RESERVING)
            .await?;
        Ok(reserving
            .iter()
            .filter(|d| Some(d.id) != excluding)
            .map(|d| d.amount)
            .sum())
    }

    /// Available balance of a locked campaign.
    pub async fn available_in(tx: &mut dyn FundingTx, campaign: &Campaign) -> FundingResult<Decimal> {
        let reserved = Self::reserved_in(tx, campaign.id, None).await?;
        Ok(balance::available_balance(campaign.funds_raised, [reserved]))
    }

    /// Credits a locked campaign and stages the update in `tx`.
    pub async fn credit(
        tx: &mut dyn FundingTx,
        campaign: &mut Campaign,
        amount: Decimal,
    ) -> FundingResult<Decimal> {
        let funds_raised = balance::credit(campaign, amount)?;
        tx.update_campaign(campaign).await?;
        Ok(funds_raised)
    }

    /// Debits a locked campaign and stages the update in `tx`.
    pub async fn debit(
        tx: &mut dyn FundingTx,
        campaign: &mut Campaign,
        amount: Decimal,
    ) -> FundingResult<Decimal> {
        let funds_raised = balance::debit(campaign, amount).inspect_err(|e| {
            warn!(campaign_id = %campaign.id, %amount, error = %e, "Debit rejected");
        })?;
        tx.update_campaign(campaign).await?;
        Ok(funds_raised)
    }

    /// Consistent snapshot of a campaign's balance.
    pub async fn balance(&self, campaign_id: CampaignId) -> FundingResult<LedgerBalance> {
        let mut tx = self.store.begin().await?;
        let campaign = Self::lock_campaign(tx.as_mut(), campaign_id).await?;
        let reserved = Self::reserved_in(tx.as_mut(), campaign_id, None).await?;
        Ok(LedgerBalance {
            campaign_id,
            funds_raised: campaign.funds_raised,
            reserved,
            available: balance::available_balance(campaign.funds_raised, [reserved]),
            target_amount: campaign.target_amount,
            progress_percentage: campaign.progress_percentage(),
            status: campaign.status,
        })
    }

    /// `funds_raised` minus pending and approved disbursements.
    pub async fn available_balance(&self, campaign_id: CampaignId) -> FundingResult<Decimal> {
        Ok(self.balance(campaign_id).await?.available)
    }

    /// Recomputes the funding equality from donation and payout records.
    pub async fn verify_invariant(&self, campaign_id: CampaignId) -> FundingResult<InvariantReport> {
        let mut tx = self.store.begin().await?;
        let campaign = Self::lock_campaign(tx.as_mut(), campaign_id).await?;
        let report = InvariantReport {
            campaign_id,
            funds_raised: campaign.funds_raised,
            completed_donations: tx.completed_donation_total(campaign_id).await?,
            processed_disbursements: tx.processed_disbursement_total(campaign_id).await?,
        };
        if !report.holds() {
            warn!(
                %campaign_id,
                funds_raised = %report.funds_raised,
                completed = %report.completed_donations,
                processed = %report.processed_disbursements,
                "Funding invariant does not hold"
            );
        }
        Ok(report)
    }

    /// Admin read of [`Self::verify_invariant`].
    pub async fn audit_invariant(
        &self,
        actor: UserId,
        campaign_id: CampaignId,
    ) -> FundingResult<InvariantReport> {
        load_actor(self.store.as_ref(), actor).await?.require_admin()?;
        self.verify_invariant(campaign_id).await
    }

    /// Creates a `pending` campaign owned by the acting partner.
    pub async fn submit_campaign(&self, actor: UserId, input: NewCampaign) -> FundingResult<Campaign> {
        let partner = load_actor(self.store.as_ref(), actor).await?;
        partner.require_partner()?;

        let title = input.title.trim();
        if title.is_empty() {
            return Err(FundingError::Validation("Campaign title is required".to_string()));
        }
        validate_amount(input.target_amount)?;

        let campaign = Campaign::new(partner.id, title, input.target_amount);
        let mut tx = self.store.begin().await?;
        tx.insert_campaign(&campaign).await?;
        tx.commit().await?;

        info!(campaign_id = %campaign.id, partner_id = %partner.id, target = %campaign.target_amount, "Campaign submitted");
        Ok(campaign)
    }

    /// Admin approval: `pending → approved`.
    pub async fn approve_campaign(&self, actor: UserId, campaign_id: CampaignId) -> FundingResult<Campaign> {
        let admin = load_actor(self.store.as_ref(), actor).await?;
        admin.require_admin()?;

        let mut tx = self.store.begin().await?;
        let mut campaign = Self::lock_campaign(tx.as_mut(), campaign_id).await?;
        let action = CampaignService::approve(campaign.status, admin.id)?;
        Self::apply(&mut campaign, action);
        tx.update_campaign(&campaign).await?;
        tx.commit().await?;

        info!(%campaign_id, admin_id = %admin.id, "Campaign approved");
        Ok(campaign)
    }

    /// Admin rejection: `pending → rejected`.
    pub async fn reject_campaign(
        &self,
        actor: UserId,
        campaign_id: CampaignId,
        reason: String,
    ) -> FundingResult<Campaign> {
        let admin = load_actor(self.store.as_ref(), actor).await?;
        admin.require_admin()?;

        let mut tx = self.store.begin().await?;
        let mut campaign = Self::lock_campaign(tx.as_mut(), campaign_id).await?;
        let action = CampaignService::reject(campaign.status, reason)?;
        Self::apply(&mut campaign, action);
        tx.update_campaign(&campaign).await?;
        tx.commit().await?;

        info!(%campaign_id, admin_id = %admin.id, "Campaign rejected");
        Ok(campaign)
    }

    /// Applies a validated status transition to a campaign.
    pub fn apply(campaign: &mut Campaign, action: CampaignAction) {
        campaign.status = action.new_status();
        campaign.updated_at = Utc::now();
        if let CampaignAction::Reject {
            rejection_reason, ..
        } = action
        {
            campaign.rejection_reason = Some(rejection_reason);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{AdminProfile, PartnerProfile, Role, User};
    use crate::store::InMemoryStore;
    use rust_decimal_macros::dec;

    struct Fixture {
        ledger: CampaignLedger,
        store: Arc<InMemoryStore>,
        admin: User,
        partner: User,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        let admin = User::new("admin@carefund.org", "Admin", Role::Admin(AdminProfile::default()));
        let partner = User::new(
            "ops@lankacare.org",
            "Lanka Care",
            Role::Partner(PartnerProfile {
                organization_name: "Lanka Care Foundation".into(),
                bank_account_number: None,
                bank_name: None,
                is_verified: true,
            }),
        );
        let mut tx = store.begin().await.unwrap();
        tx.insert_user(&admin).await.unwrap();
        tx.insert_user(&partner).await.unwrap();
        tx.commit().await.unwrap();
        Fixture {
            ledger: CampaignLedger::new(store.clone()),
            store,
            admin,
            partner,
        }
    }

    fn new_campaign(target: Decimal) -> NewCampaign {
        NewCampaign {
            title: "Kidney transplant for Ruwan".into(),
            target_amount: target,
        }
    }

    #[test]
    fn test_validate_amount() {
        assert!(validate_amount(dec!(10.25)).is_ok());
        assert!(validate_amount(dec!(0)).is_err());
        assert!(validate_amount(dec!(-1)).is_err());
        assert!(validate_amount(dec!(1.001)).is_err());
    }

    #[test]
    fn test_validate_amount_caps_at_column_range() {
        assert!(validate_amount(MAX_AMOUNT).is_ok());
        assert!(matches!(
            validate_amount(dec!(100000000000000000)),
            Err(FundingError::InvalidAmount(_))
        ));
        assert!(matches!(
            validate_amount(Decimal::MAX),
            Err(FundingError::InvalidAmount(_))
        ));
    }

    #[tokio::test]
    async fn test_submit_and_approve() {
        let f = fixture().await;
        let campaign = f
            .ledger
            .submit_campaign(f.partner.id, new_campaign(dec!(1000)))
            .await
            .unwrap();
        assert_eq!(campaign.status, crate::ledger::types::CampaignStatus::Pending);
        assert_eq!(campaign.partner_id, f.partner.id);

        let approved = f.ledger.approve_campaign(f.admin.id, campaign.id).await.unwrap();
        assert!(approved.status.accepts_money_movement());

        let err = f.ledger.approve_campaign(f.admin.id, campaign.id).await.unwrap_err();
        assert!(matches!(err, FundingError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_only_partners_submit_and_only_admins_decide() {
        let f = fixture().await;
        let err = f
            .ledger
            .submit_campaign(f.admin.id, new_campaign(dec!(1000)))
            .await
            .unwrap_err();
        assert!(matches!(err, FundingError::Unauthorized(_)));

        let campaign = f
            .ledger
            .submit_campaign(f.partner.id, new_campaign(dec!(1000)))
            .await
            .unwrap();
        let err = f
            .ledger
            .approve_campaign(f.partner.id, campaign.id)
            .await
            .unwrap_err();
        assert!(matches!(err, FundingError::Unauthorized(_)));
        assert_eq!(
            f.store.find_campaign(campaign.id).await.unwrap().unwrap().status,
            crate::ledger::types::CampaignStatus::Pending
        );
    }

    #[tokio::test]
    async fn test_reject_records_reason() {
        let f = fixture().await;
        let campaign = f
            .ledger
            .submit_campaign(f.partner.id, new_campaign(dec!(500)))
            .await
            .unwrap();
        let rejected = f
            .ledger
            .reject_campaign(f.admin.id, campaign.id, "Documents unreadable".into())
            .await
            .unwrap();
        assert_eq!(rejected.rejection_reason.as_deref(), Some("Documents unreadable"));
    }

    #[tokio::test]
    async fn test_submit_validates_input() {
        let f = fixture().await;
        let err = f
            .ledger
            .submit_campaign(f.partner.id, new_campaign(dec!(0)))
            .await
            .unwrap_err();
        assert!(matches!(err, FundingError::InvalidAmount(_)));

        let err = f
            .ledger
            .submit_campaign(
                f.partner.id,
                NewCampaign {
                    title: "  ".into(),
                    target_amount: dec!(10),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, FundingError::Validation(_)));
    }

    #[tokio::test]
    async fn test_credit_and_debit_inside_transaction() {
        let f = fixture().await;
        let campaign = f
            .ledger
            .submit_campaign(f.partner.id, new_campaign(dec!(1000)))
            .await
            .unwrap();

        let mut tx = f.store.begin().await.unwrap();
        let mut locked = CampaignLedger::lock_campaign(tx.as_mut(), campaign.id).await.unwrap();
        CampaignLedger::credit(tx.as_mut(), &mut locked, dec!(400)).await.unwrap();
        let err = CampaignLedger::debit(tx.as_mut(), &mut locked, dec!(500)).await.unwrap_err();
        assert!(matches!(err, FundingError::NegativeBalance { .. }));
        CampaignLedger::debit(tx.as_mut(), &mut locked, dec!(100)).await.unwrap();
        tx.commit().await.unwrap();

        let balance = f.ledger.balance(campaign.id).await.unwrap();
        assert_eq!(balance.funds_raised, dec!(300));
        assert_eq!(balance.available, dec!(300));
        assert_eq!(balance.progress_percentage, dec!(30));
    }

    #[tokio::test]
    async fn test_invariant_audit_is_admin_only() {
        let f = fixture().await;
        let campaign = f
            .ledger
            .submit_campaign(f.partner.id, new_campaign(dec!(1000)))
            .await
            .unwrap();

        let err = f
            .ledger
            .audit_invariant(f.partner.id, campaign.id)
            .await
            .unwrap_err();
        assert!(matches!(err, FundingError::Unauthorized(_)));

        let report = f.ledger.audit_invariant(f.admin.id, campaign.id).await.unwrap();
        assert!(report.holds());
        assert_eq!(report.completed_donations, dec!(0));
    }

    #[tokio::test]
    async fn test_balance_of_unknown_campaign() {
        let f = fixture().await;
        let err = f.ledger.balance(CampaignId::new()).await.unwrap_err();
        assert!(matches!(err, FundingError::NotFound { entity: "Campaign", .. }));
    }
}
