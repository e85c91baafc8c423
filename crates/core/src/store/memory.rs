//! In-memory implementation of the funding store.
//!
//! Rows live in plain hash maps behind a `RwLock`. Row locks are per-row
//! `tokio` mutexes, so two campaigns never contend. A transaction stages its
//! writes privately (and reads its own writes); commit applies them in one
//! step under the table write lock, re-checking uniqueness, and only then
//! releases the row locks it holds. A row's mutex is dropped from the lock
//! table once no transaction holds or awaits it.

use std::collections::{HashMap, HashSet};
use std::fmt::Display;
use std::hash::Hash;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use dashmap::DashMap;
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};

use carefund_shared::types::{
    CampaignId, DisbursementId, DonationId, FraudReportId, PageRequest, PageResponse,
    PaymentRecordId, UserId,
};

use super::{FundingStore, FundingTx, StoreError, StoreResult};
use crate::disbursement::types::{Disbursement, DisbursementStatus};
use crate::donation::types::{Donation, DonationStatus, PaymentRecord};
use crate::fraud::types::{FraudReport, FraudReportStatus};
use crate::identity::User;
use crate::ledger::types::Campaign;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum RowKey {
    Campaign(CampaignId),
    User(UserId),
    Donation(DonationId),
    Disbursement(DisbursementId),
    FraudReport(FraudReportId),
    PaymentRecord(PaymentRecordId),
}

#[derive(Debug, Default)]
struct Tables {
    campaigns: HashMap<CampaignId, Campaign>,
    users: HashMap<UserId, User>,
    donations: HashMap<DonationId, Donation>,
    disbursements: HashMap<DisbursementId, Disbursement>,
    fraud_reports: HashMap<FraudReportId, FraudReport>,
    payment_records: HashMap<PaymentRecordId, PaymentRecord>,
}

impl Tables {
    fn contains(&self, key: RowKey) -> bool {
        match key {
            RowKey::Campaign(id) => self.campaigns.contains_key(&id),
            RowKey::User(id) => self.users.contains_key(&id),
            RowKey::Donation(id) => self.donations.contains_key(&id),
            RowKey::Disbursement(id) => self.disbursements.contains_key(&id),
            RowKey::FraudReport(id) => self.fraud_reports.contains_key(&id),
            RowKey::PaymentRecord(id) => self.payment_records.contains_key(&id),
        }
    }
}

/// A storable entity.
trait Row: Clone + Send + Sync + 'static {
    type Id: Copy + Eq + Hash + Display + Send;
    const ENTITY: &'static str;

    fn row_id(&self) -> Self::Id;
    fn key(id: Self::Id) -> RowKey;
    fn table(tables: &Tables) -> &HashMap<Self::Id, Self>;
    fn table_mut(tables: &mut Tables) -> &mut HashMap<Self::Id, Self>;
}

macro_rules! impl_row {
    ($row:ty, $id:ty, $variant:ident, $field:ident, $entity:expr) => {
        impl Row for $row {
            type Id = $id;
            const ENTITY: &'static str = $entity;

            fn row_id(&self) -> Self::Id {
                self.id
            }

            fn key(id: Self::Id) -> RowKey {
                RowKey::$variant(id)
            }

            fn table(tables: &Tables) -> &HashMap<Self::Id, Self> {
                &tables.$field
            }

            fn table_mut(tables: &mut Tables) -> &mut HashMap<Self::Id, Self> {
                &mut tables.$field
            }
        }
    };
}

impl_row!(Campaign, CampaignId, Campaign, campaigns, "campaign");
impl_row!(User, UserId, User, users, "user");
impl_row!(Donation, DonationId, Donation, donations, "donation");
impl_row!(Disbursement, DisbursementId, Disbursement, disbursements, "disbursement");
impl_row!(FraudReport, FraudReportId, FraudReport, fraud_reports, "fraud report");
impl_row!(PaymentRecord, PaymentRecordId, PaymentRecord, payment_records, "payment record");

/// Committed rows overlaid with a transaction's staged rows.
fn merged<'a, K, V>(
    committed: &'a HashMap<K, V>,
    staged: &'a HashMap<K, V>,
) -> impl Iterator<Item = &'a V> + 'a
where
    K: Eq + Hash,
{
    committed
        .iter()
        .filter(|(id, _)| !staged.contains_key(*id))
        .map(|(_, row)| row)
        .chain(staged.values())
}

fn paginate<T>(rows: Vec<T>, page: PageRequest) -> PageResponse<T> {
    let page = page.normalized();
    let total = u64::try_from(rows.len()).unwrap_or(u64::MAX);
    let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
    let limit = usize::try_from(page.limit()).unwrap_or(usize::MAX);
    let data = rows.into_iter().skip(offset).take(limit).collect();
    PageResponse::new(data, page, total)
}

fn poisoned() -> StoreError {
    StoreError::Database("in-memory tables are poisoned".to_string())
}

#[derive(Debug, Default)]
struct Shared {
    tables: RwLock<Tables>,
    row_locks: DashMap<RowKey, Arc<Mutex<()>>>,
}

impl Shared {
    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Tables>> {
        self.tables.read().map_err(|_| poisoned())
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Tables>> {
        self.tables.write().map_err(|_| poisoned())
    }

    fn get<R: Row>(&self, id: R::Id) -> StoreResult<Option<R>> {
        Ok(R::table(&*self.read()?).get(&id).cloned())
    }
}

/// Process-local funding store.
///
/// Cloning is cheap; clones share the same tables.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    shared: Arc<Shared>,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FundingStore for InMemoryStore {
    async fn begin(&self) -> StoreResult<Box<dyn FundingTx>> {
        Ok(Box::new(InMemoryTx {
            shared: Arc::clone(&self.shared),
            staged: Tables::default(),
            new_rows: HashSet::new(),
            held: HashMap::new(),
        }))
    }

    async fn find_campaign(&self, id: CampaignId) -> StoreResult<Option<Campaign>> {
        self.shared.get::<Campaign>(id)
    }

    async fn find_user(&self, id: UserId) -> StoreResult<Option<User>> {
        self.shared.get::<User>(id)
    }

    async fn find_donation(&self, id: DonationId) -> StoreResult<Option<Donation>> {
        self.shared.get::<Donation>(id)
    }

    async fn find_disbursement(&self, id: DisbursementId) -> StoreResult<Option<Disbursement>> {
        self.shared.get::<Disbursement>(id)
    }

    async fn find_fraud_report(&self, id: FraudReportId) -> StoreResult<Option<FraudReport>> {
        self.shared.get::<FraudReport>(id)
    }

    async fn find_payment_record(&self, donation_id: DonationId) -> StoreResult<Option<PaymentRecord>> {
        Ok(self
            .shared
            .read()?
            .payment_records
            .values()
            .find(|r| r.donation_id == donation_id)
            .cloned())
    }

    async fn list_donations(
        &self,
        campaign_id: CampaignId,
        page: PageRequest,
    ) -> StoreResult<PageResponse<Donation>> {
        let mut rows: Vec<Donation> = self
            .shared
            .read()?
            .donations
            .values()
            .filter(|d| d.campaign_id == campaign_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(paginate(rows, page))
    }

    async fn list_disbursements(
        &self,
        status: Option<DisbursementStatus>,
        page: PageRequest,
    ) -> StoreResult<PageResponse<Disbursement>> {
        let mut rows: Vec<Disbursement> = self
            .shared
            .read()?
            .disbursements
            .values()
            .filter(|d| status.is_none_or(|s| d.status == s))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(paginate(rows, page))
    }

    async fn list_fraud_reports(
        &self,
        status: Option<FraudReportStatus>,
        page: PageRequest,
    ) -> StoreResult<PageResponse<FraudReport>> {
        let mut rows: Vec<FraudReport> = self
            .shared
            .read()?
            .fraud_reports
            .values()
            .filter(|r| status.is_none_or(|s| r.status == s))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(paginate(rows, page))
    }
}

/// Transaction over an [`InMemoryStore`].
pub struct InMemoryTx {
    shared: Arc<Shared>,
    staged: Tables,
    new_rows: HashSet<RowKey>,
    held: HashMap<RowKey, OwnedMutexGuard<()>>,
}

impl InMemoryTx {
    async fn acquire(&mut self, key: RowKey) {
        if self.held.contains_key(&key) {
            return;
        }
        let mutex = Arc::clone(&self.shared.row_locks.entry(key).or_default());
        let guard = mutex.lock_owned().await;
        self.held.insert(key, guard);
    }

    fn release(&mut self) {
        for (key, guard) in self.held.drain() {
            drop(guard);
            self.shared
                .row_locks
                .remove_if(&key, |_, mutex| Arc::strong_count(mutex) == 1);
        }
    }

    fn get<R: Row>(&self, id: R::Id) -> StoreResult<Option<R>> {
        if let Some(row) = R::table(&self.staged).get(&id) {
            return Ok(Some(row.clone()));
        }
        self.shared.get::<R>(id)
    }

    async fn lock<R: Row>(&mut self, id: R::Id) -> StoreResult<Option<R>> {
        self.acquire(R::key(id)).await;
        self.get::<R>(id)
    }

    fn insert<R: Row>(&mut self, row: &R) -> StoreResult<()> {
        let id = row.row_id();
        let exists = R::table(&self.staged).contains_key(&id)
            || R::table(&*self.shared.read()?).contains_key(&id);
        if exists {
            return Err(StoreError::UniqueViolation(format!(
                "{} {id} already exists",
                R::ENTITY
            )));
        }
        R::table_mut(&mut self.staged).insert(id, row.clone());
        self.new_rows.insert(R::key(id));
        Ok(())
    }

    fn update<R: Row>(&mut self, row: &R) -> StoreResult<()> {
        let id = row.row_id();
        let exists = R::table(&self.staged).contains_key(&id)
            || R::table(&*self.shared.read()?).contains_key(&id);
        if !exists {
            return Err(StoreError::Database(format!("{} {id} does not exist", R::ENTITY)));
        }
        R::table_mut(&mut self.staged).insert(id, row.clone());
        Ok(())
    }
}

impl Drop for InMemoryTx {
    fn drop(&mut self) {
        self.release();
    }
}

fn duplicate_transaction_id(transaction_id: &str) -> StoreError {
    StoreError::UniqueViolation(format!("transaction_id {transaction_id} is already recorded"))
}

fn duplicate_reference(reference: &str) -> StoreError {
    StoreError::UniqueViolation(format!("transaction_reference {reference} is already recorded"))
}

#[async_trait]
impl FundingTx for InMemoryTx {
    async fn lock_campaign(&mut self, id: CampaignId) -> StoreResult<Option<Campaign>> {
        self.lock::<Campaign>(id).await
    }

    async fn lock_user(&mut self, id: UserId) -> StoreResult<Option<User>> {
        self.lock::<User>(id).await
    }

    async fn lock_donation(&mut self, id: DonationId) -> StoreResult<Option<Donation>> {
        self.lock::<Donation>(id).await
    }

    async fn lock_disbursement(&mut self, id: DisbursementId) -> StoreResult<Option<Disbursement>> {
        self.lock::<Disbursement>(id).await
    }

    async fn lock_fraud_report(&mut self, id: FraudReportId) -> StoreResult<Option<FraudReport>> {
        self.lock::<FraudReport>(id).await
    }

    async fn find_campaign(&mut self, id: CampaignId) -> StoreResult<Option<Campaign>> {
        self.get::<Campaign>(id)
    }

    async fn find_user(&mut self, id: UserId) -> StoreResult<Option<User>> {
        self.get::<User>(id)
    }

    async fn insert_campaign(&mut self, campaign: &Campaign) -> StoreResult<()> {
        self.insert(campaign)
    }

    async fn insert_user(&mut self, user: &User) -> StoreResult<()> {
        self.insert(user)
    }

    async fn insert_donation(&mut self, donation: &Donation) -> StoreResult<()> {
        let taken = {
            let tables = self.shared.read()?;
            merged(&tables.donations, &self.staged.donations)
                .any(|d| d.transaction_id == donation.transaction_id)
        };
        if taken {
            return Err(duplicate_transaction_id(&donation.transaction_id));
        }
        self.insert(donation)
    }

    async fn insert_disbursement(&mut self, disbursement: &Disbursement) -> StoreResult<()> {
        self.insert(disbursement)
    }

    async fn insert_fraud_report(&mut self, report: &FraudReport) -> StoreResult<()> {
        self.insert(report)
    }

    async fn insert_payment_record(&mut self, record: &PaymentRecord) -> StoreResult<()> {
        let taken = {
            let tables = self.shared.read()?;
            merged(&tables.payment_records, &self.staged.payment_records)
                .any(|r| r.transaction_reference == record.transaction_reference)
        };
        if taken {
            return Err(duplicate_reference(&record.transaction_reference));
        }
        self.insert(record)
    }

    async fn update_campaign(&mut self, campaign: &Campaign) -> StoreResult<()> {
        self.update(campaign)
    }

    async fn update_user(&mut self, user: &User) -> StoreResult<()> {
        self.update(user)
    }

    async fn update_donation(&mut self, donation: &Donation) -> StoreResult<()> {
        self.update(donation)
    }

    async fn update_disbursement(&mut self, disbursement: &Disbursement) -> StoreResult<()> {
        self.update(disbursement)
    }

    async fn update_fraud_report(&mut self, report: &FraudReport) -> StoreResult<()> {
        self.update(report)
    }

    async fn disbursements_for_campaign(
        &mut self,
        campaign_id: CampaignId,
        statuses: &[DisbursementStatus],
    ) -> StoreResult<Vec<Disbursement>> {
        let tables = self.shared.read()?;
        let mut rows: Vec<Disbursement> = merged(&tables.disbursements, &self.staged.disbursements)
            .filter(|d| d.campaign_id == campaign_id && statuses.contains(&d.status))
            .cloned()
            .collect();
        rows.sort_by_key(|d| (d.created_at, d.id));
        Ok(rows)
    }

    async fn completed_donation_total(&mut self, campaign_id: CampaignId) -> StoreResult<Decimal> {
        let tables = self.shared.read()?;
        Ok(merged(&tables.donations, &self.staged.donations)
            .filter(|d| d.campaign_id == campaign_id && d.status == DonationStatus::Completed)
            .map(|d| d.amount)
            .sum())
    }

    async fn processed_disbursement_total(
        &mut self,
        campaign_id: CampaignId,
    ) -> StoreResult<Decimal> {
        let tables = self.shared.read()?;
        Ok(merged(&tables.disbursements, &self.staged.disbursements)
            .filter(|d| d.campaign_id == campaign_id && d.status == DisbursementStatus::Processed)
            .map(|d| d.amount)
            .sum())
    }

    async fn commit(mut self: Box<Self>) -> StoreResult<()> {
        let staged = std::mem::take(&mut self.staged);

        {
            let mut tables = self.shared.write()?;

            if let Some(key) = self.new_rows.iter().find(|key| tables.contains(**key)) {
                return Err(StoreError::UniqueViolation(format!("{key:?} already exists")));
            }
            for donation in staged.donations.values() {
                let clash = tables
                    .donations
                    .values()
                    .any(|d| d.id != donation.id && d.transaction_id == donation.transaction_id);
                if clash {
                    return Err(duplicate_transaction_id(&donation.transaction_id));
                }
            }
            for record in staged.payment_records.values() {
                let clash = tables.payment_records.values().any(|r| {
                    r.id != record.id && r.transaction_reference == record.transaction_reference
                });
                if clash {
                    return Err(duplicate_reference(&record.transaction_reference));
                }
            }

            tables.campaigns.extend(staged.campaigns);
            tables.users.extend(staged.users);
            tables.donations.extend(staged.donations);
            tables.disbursements.extend(staged.disbursements);
            tables.fraud_reports.extend(staged.fraud_reports);
            tables.payment_records.extend(staged.payment_records);
        }

        self.release();
        Ok(())
    }
}
