//! Persistence port for the funding ledger.
//!
//! Workflows never touch a database directly. They receive an
//! `Arc<dyn FundingStore>`, open a [`FundingTx`], lock the rows they are about
//! to read-check-write, stage their changes and commit. Dropping a
//! transaction without committing rolls it back.
//!
//! Row locks are exclusive and held until commit or drop. Every workflow
//! acquires them in the same order: donation or fraud report, then campaign,
//! then disbursement, then user.

pub mod memory;

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

use carefund_shared::types::{
    CampaignId, DisbursementId, DonationId, FraudReportId, PageRequest, PageResponse, UserId,
};

use crate::disbursement::types::{Disbursement, DisbursementStatus};
use crate::donation::types::{Donation, PaymentRecord};
use crate::fraud::types::{FraudReport, FraudReportStatus};
use crate::identity::User;
use crate::ledger::types::Campaign;

pub use memory::InMemoryStore;

/// Persistence failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Any failure of the underlying storage.
    #[error("Database error: {0}")]
    Database(String),

    /// A unique constraint rejected the write.
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    /// The transaction lost a serialization race and should be retried.
    #[error("Serialization failure: {0}")]
    SerializationFailure(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Entry point into persistence.
#[async_trait]
pub trait FundingStore: Send + Sync {
    /// Opens a transaction.
    async fn begin(&self) -> StoreResult<Box<dyn FundingTx>>;

    /// Reads a campaign without locking it.
    async fn find_campaign(&self, id: CampaignId) -> StoreResult<Option<Campaign>>;

    /// Reads a user without locking it.
    async fn find_user(&self, id: UserId) -> StoreResult<Option<User>>;

    /// Reads a donation without locking it.
    async fn find_donation(&self, id: DonationId) -> StoreResult<Option<Donation>>;

    /// Reads a disbursement without locking it.
    async fn find_disbursement(&self, id: DisbursementId) -> StoreResult<Option<Disbursement>>;

    /// Reads a fraud report without locking it.
    async fn find_fraud_report(&self, id: FraudReportId) -> StoreResult<Option<FraudReport>>;

    /// Reads the payment record of a resolved donation.
    async fn find_payment_record(&self, donation_id: DonationId) -> StoreResult<Option<PaymentRecord>>;

    /// Donations to a campaign, newest first.
    async fn list_donations(
        &self,
        campaign_id: CampaignId,
        page: PageRequest,
    ) -> StoreResult<PageResponse<Donation>>;

    /// Disbursements across all campaigns, newest first.
    async fn list_disbursements(
        &self,
        status: Option<DisbursementStatus>,
        page: PageRequest,
    ) -> StoreResult<PageResponse<Disbursement>>;

    /// Fraud reports across all campaigns, newest first.
    async fn list_fraud_reports(
        &self,
        status: Option<FraudReportStatus>,
        page: PageRequest,
    ) -> StoreResult<PageResponse<FraudReport>>;
}

/// An open unit of work.
#[async_trait]
pub trait FundingTx: Send {
    /// Locks and reads a campaign.
    async fn lock_campaign(&mut self, id: CampaignId) -> StoreResult<Option<Campaign>>;

    /// Locks and reads a user.
    async fn lock_user(&mut self, id: UserId) -> StoreResult<Option<User>>;

    /// Locks and reads a donation.
    async fn lock_donation(&mut self, id: DonationId) -> StoreResult<Option<Donation>>;

    /// Locks and reads a disbursement.
    async fn lock_disbursement(&mut self, id: DisbursementId) -> StoreResult<Option<Disbursement>>;

    /// Locks and reads a fraud report.
    async fn lock_fraud_report(&mut self, id: FraudReportId) -> StoreResult<Option<FraudReport>>;

    /// Reads a campaign inside the transaction without locking it.
    async fn find_campaign(&mut self, id: CampaignId) -> StoreResult<Option<Campaign>>;

    /// Reads a user inside the transaction without locking it.
    async fn find_user(&mut self, id: UserId) -> StoreResult<Option<User>>;

    /// Inserts a campaign.
    async fn insert_campaign(&mut self, campaign: &Campaign) -> StoreResult<()>;

    /// Inserts a user.
    async fn insert_user(&mut self, user: &User) -> StoreResult<()>;

    /// Inserts a donation. Fails with `UniqueViolation` on a reused `transaction_id`.
    async fn insert_donation(&mut self, donation: &Donation) -> StoreResult<()>;

    /// Inserts a disbursement.
    async fn insert_disbursement(&mut self, disbursement: &Disbursement) -> StoreResult<()>;

    /// Inserts a fraud report.
    async fn insert_fraud_report(&mut self, report: &FraudReport) -> StoreResult<()>;

    /// Inserts a payment record. Fails with `UniqueViolation` on a reused
    /// `transaction_reference`.
    async fn insert_payment_record(&mut self, record: &PaymentRecord) -> StoreResult<()>;

    /// Overwrites a campaign.
    async fn update_campaign(&mut self, campaign: &Campaign) -> StoreResult<()>;

    /// Overwrites a user.
    async fn update_user(&mut self, user: &User) -> StoreResult<()>;

    /// Overwrites a donation.
    async fn update_donation(&mut self, donation: &Donation) -> StoreResult<()>;

    /// Overwrites a disbursement.
    async fn update_disbursement(&mut self, disbursement: &Disbursement) -> StoreResult<()>;

    /// Overwrites a fraud report.
    async fn update_fraud_report(&mut self, report: &FraudReport) -> StoreResult<()>;

    /// A campaign's disbursements in any of `statuses`, oldest first.
    async fn disbursements_for_campaign(
        &mut self,
        campaign_id: CampaignId,
        statuses: &[DisbursementStatus],
    ) -> StoreResult<Vec<Disbursement>>;

    /// Sum of a campaign's completed donations.
    async fn completed_donation_total(&mut self, campaign_id: CampaignId) -> StoreResult<Decimal>;

    /// Sum of a campaign's processed disbursements.
    async fn processed_disbursement_total(&mut self, campaign_id: CampaignId)
    -> StoreResult<Decimal>;

    /// Makes every staged change durable and releases all locks.
    async fn commit(self: Box<Self>) -> StoreResult<()>;
}
