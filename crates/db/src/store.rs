//! PostgreSQL implementation of the funding persistence port.
//!
//! Every `lock_*` call issues `SELECT … FOR UPDATE` inside the open
//! transaction, so the row stays locked until commit or rollback. A
//! `SeaFundingTx` dropped without commit is rolled back by `SeaORM`.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RuntimeErr, TransactionTrait,
};
use tracing::{debug, warn};

use carefund_core::disbursement::{Disbursement, DisbursementStatus};
use carefund_core::donation::{Donation, DonationStatus, PaymentRecord};
use carefund_core::fraud::{FraudReport, FraudReportStatus};
use carefund_core::identity::User;
use carefund_core::ledger::Campaign;
use carefund_core::store::{FundingStore, FundingTx, StoreError, StoreResult};
use carefund_shared::types::{
    CampaignId, DisbursementId, DonationId, FraudReportId, PageRequest, PageResponse, UserId,
};

use crate::convert::{
    campaign_active, campaign_from_model, disbursement_active, disbursement_from_model,
    donation_active, donation_from_model, fraud_report_active, fraud_report_from_model,
    payment_record_active, payment_record_from_model, user_active, user_from_model,
};
use crate::entities::sea_orm_active_enums::{
    DisbursementStatus as DbDisbursementStatus, DonationStatus as DbDonationStatus,
    FraudReportStatus as DbFraudReportStatus,
};
use crate::entities::{campaigns, disbursements, donations, fraud_reports, payment_records, users};

const UNIQUE_VIOLATION: &str = "23505";
const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";

fn sqlstate(err: &DbErr) -> Option<String> {
    match err {
        DbErr::Query(RuntimeErr::SqlxError(sqlx::Error::Database(e)))
        | DbErr::Exec(RuntimeErr::SqlxError(sqlx::Error::Database(e)))
        | DbErr::Conn(RuntimeErr::SqlxError(sqlx::Error::Database(e))) => {
            e.code().map(|c| c.into_owned())
        }
        _ => None,
    }
}

/// Maps a database error onto the store taxonomy.
pub(crate) fn map_db_err(err: DbErr) -> StoreError {
    match sqlstate(&err).as_deref() {
        Some(UNIQUE_VIOLATION) => StoreError::UniqueViolation(err.to_string()),
        Some(SERIALIZATION_FAILURE | DEADLOCK_DETECTED) => {
            warn!(error = %err, "Transaction lost a serialization race");
            StoreError::SerializationFailure(err.to_string())
        }
        _ => match err {
            DbErr::RecordNotUpdated => StoreError::Database("Row to update does not exist".to_string()),
            other => StoreError::Database(other.to_string()),
        },
    }
}

async fn page_of<E, M, T, F>(
    select: sea_orm::Select<E>,
    db: &DatabaseConnection,
    page: PageRequest,
    convert: F,
) -> StoreResult<PageResponse<T>>
where
    E: EntityTrait<Model = M>,
    M: sea_orm::FromQueryResult + Send + Sync,
    T: Send,
    F: Fn(M) -> StoreResult<T> + Send,
{
    let page = page.normalized();
    let paginator = select.paginate(db, u64::from(page.per_page));
    let total = paginator.num_items().await.map_err(map_db_err)?;
    let models = paginator
        .fetch_page(u64::from(page.page - 1))
        .await
        .map_err(map_db_err)?;
    let data = models.into_iter().map(convert).collect::<StoreResult<Vec<_>>>()?;
    Ok(PageResponse::new(data, page, total))
}

/// Funding store backed by a `SeaORM` connection pool.
#[derive(Debug, Clone)]
pub struct SeaFundingStore {
    db: DatabaseConnection,
}

impl SeaFundingStore {
    /// Creates a store over an open connection.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl FundingStore for SeaFundingStore {
    async fn begin(&self) -> StoreResult<Box<dyn FundingTx>> {
        let txn = self.db.begin().await.map_err(map_db_err)?;
        Ok(Box::new(SeaFundingTx { txn }))
    }

    async fn find_campaign(&self, id: CampaignId) -> StoreResult<Option<Campaign>> {
        let model = campaigns::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(map_db_err)?;
        Ok(model.map(campaign_from_model))
    }

    async fn find_user(&self, id: UserId) -> StoreResult<Option<User>> {
        let model = users::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(map_db_err)?;
        Ok(model.map(user_from_model))
    }

    async fn find_donation(&self, id: DonationId) -> StoreResult<Option<Donation>> {
        donations::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(map_db_err)?
            .map(donation_from_model)
            .transpose()
    }

    async fn find_disbursement(&self, id: DisbursementId) -> StoreResult<Option<Disbursement>> {
        let model = disbursements::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(map_db_err)?;
        Ok(model.map(disbursement_from_model))
    }

    async fn find_fraud_report(&self, id: FraudReportId) -> StoreResult<Option<FraudReport>> {
        let model = fraud_reports::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(map_db_err)?;
        Ok(model.map(fraud_report_from_model))
    }

    async fn find_payment_record(&self, donation_id: DonationId) -> StoreResult<Option<PaymentRecord>> {
        payment_records::Entity::find()
            .filter(payment_records::Column::DonationId.eq(donation_id.into_inner()))
            .one(&self.db)
            .await
            .map_err(map_db_err)?
            .map(payment_record_from_model)
            .transpose()
    }

    async fn list_donations(
        &self,
        campaign_id: CampaignId,
        page: PageRequest,
    ) -> StoreResult<PageResponse<Donation>> {
        let select = donations::Entity::find()
            .filter(donations::Column::CampaignId.eq(campaign_id.into_inner()))
            .order_by_desc(donations::Column::CreatedAt)
            .order_by_desc(donations::Column::Id);
        page_of(select, &self.db, page, donation_from_model).await
    }

    async fn list_disbursements(
        &self,
        status: Option<DisbursementStatus>,
        page: PageRequest,
    ) -> StoreResult<PageResponse<Disbursement>> {
        let mut select = disbursements::Entity::find();
        if let Some(status) = status {
            select = select.filter(disbursements::Column::Status.eq(DbDisbursementStatus::from(status)));
        }
        let select = select
            .order_by_desc(disbursements::Column::CreatedAt)
            .order_by_desc(disbursements::Column::Id);
        page_of(select, &self.db, page, |m| Ok(disbursement_from_model(m))).await
    }

    async fn list_fraud_reports(
        &self,
        status: Option<FraudReportStatus>,
        page: PageRequest,
    ) -> StoreResult<PageResponse<FraudReport>> {
        let mut select = fraud_reports::Entity::find();
        if let Some(status) = status {
            select = select.filter(
                fraud_reports::Column::Status.eq(DbFraudReportStatus::from(status)),
            );
        }
        let select = select
            .order_by_desc(fraud_reports::Column::CreatedAt)
            .order_by_desc(fraud_reports::Column::Id);
        page_of(select, &self.db, page, |m| Ok(fraud_report_from_model(m))).await
    }
}

/// An open PostgreSQL transaction.
pub struct SeaFundingTx {
    txn: DatabaseTransaction,
}

impl SeaFundingTx {
    async fn sum_amount<E: EntityTrait>(
        &self,
        amount: E::Column,
        filters: sea_orm::Condition,
    ) -> StoreResult<Decimal> {
        let total: Option<Option<Decimal>> = E::find()
            .select_only()
            .column_as(Expr::col(amount).sum(), "total")
            .filter(filters)
            .into_tuple()
            .one(&self.txn)
            .await
            .map_err(map_db_err)?;
        Ok(total.flatten().unwrap_or(Decimal::ZERO))
    }
}

#[async_trait]
impl FundingTx for SeaFundingTx {
    async fn lock_campaign(&mut self, id: CampaignId) -> StoreResult<Option<Campaign>> {
        let model = campaigns::Entity::find_by_id(id.into_inner())
            .lock_exclusive()
            .one(&self.txn)
            .await
            .map_err(map_db_err)?;
        Ok(model.map(campaign_from_model))
    }

    async fn lock_user(&mut self, id: UserId) -> StoreResult<Option<User>> {
        let model = users::Entity::find_by_id(id.into_inner())
            .lock_exclusive()
            .one(&self.txn)
            .await
            .map_err(map_db_err)?;
        Ok(model.map(user_from_model))
    }

    async fn lock_donation(&mut self, id: DonationId) -> StoreResult<Option<Donation>> {
        donations::Entity::find_by_id(id.into_inner())
            .lock_exclusive()
            .one(&self.txn)
            .await
            .map_err(map_db_err)?
            .map(donation_from_model)
            .transpose()
    }

    async fn lock_disbursement(&mut self, id: DisbursementId) -> StoreResult<Option<Disbursement>> {
        let model = disbursements::Entity::find_by_id(id.into_inner())
            .lock_exclusive()
            .one(&self.txn)
            .await
            .map_err(map_db_err)?;
        Ok(model.map(disbursement_from_model))
    }

    async fn lock_fraud_report(&mut self, id: FraudReportId) -> StoreResult<Option<FraudReport>> {
        let model = fraud_reports::Entity::find_by_id(id.into_inner())
            .lock_exclusive()
            .one(&self.txn)
            .await
            .map_err(map_db_err)?;
        Ok(model.map(fraud_report_from_model))
    }

    async fn find_campaign(&mut self, id: CampaignId) -> StoreResult<Option<Campaign>> {
        let model = campaigns::Entity::find_by_id(id.into_inner())
            .one(&self.txn)
            .await
            .map_err(map_db_err)?;
        Ok(model.map(campaign_from_model))
    }

    async fn find_user(&mut self, id: UserId) -> StoreResult<Option<User>> {
        let model = users::Entity::find_by_id(id.into_inner())
            .one(&self.txn)
            .await
            .map_err(map_db_err)?;
        Ok(model.map(user_from_model))
    }

    async fn insert_campaign(&mut self, campaign: &Campaign) -> StoreResult<()> {
        campaign_active(campaign).insert(&self.txn).await.map_err(map_db_err)?;
        Ok(())
    }

    async fn insert_user(&mut self, user: &User) -> StoreResult<()> {
        user_active(user).insert(&self.txn).await.map_err(map_db_err)?;
        Ok(())
    }

    async fn insert_donation(&mut self, donation: &Donation) -> StoreResult<()> {
        donation_active(donation).insert(&self.txn).await.map_err(map_db_err)?;
        debug!(donation_id = %donation.id, transaction_id = %donation.transaction_id, "Donation row inserted");
        Ok(())
    }

    async fn insert_disbursement(&mut self, disbursement: &Disbursement) -> StoreResult<()> {
        disbursement_active(disbursement).insert(&self.txn).await.map_err(map_db_err)?;
        Ok(())
    }

    async fn insert_fraud_report(&mut self, report: &FraudReport) -> StoreResult<()> {
        fraud_report_active(report).insert(&self.txn).await.map_err(map_db_err)?;
        Ok(())
    }

    async fn insert_payment_record(&mut self, record: &PaymentRecord) -> StoreResult<()> {
        payment_record_active(record).insert(&self.txn).await.map_err(map_db_err)?;
        debug!(donation_id = %record.donation_id, reference = %record.transaction_reference, status = %record.status, "Payment record inserted");
        Ok(())
    }

    async fn update_campaign(&mut self, campaign: &Campaign) -> StoreResult<()> {
        campaign_active(campaign).update(&self.txn).await.map_err(map_db_err)?;
        Ok(())
    }

    async fn update_user(&mut self, user: &User) -> StoreResult<()> {
        let mut active = user_active(user);
        // created_at is immutable once registered
        active.created_at = sea_orm::ActiveValue::NotSet;
        active.update(&self.txn).await.map_err(map_db_err)?;
        Ok(())
    }

    async fn update_donation(&mut self, donation: &Donation) -> StoreResult<()> {
        donation_active(donation).update(&self.txn).await.map_err(map_db_err)?;
        Ok(())
    }

    async fn update_disbursement(&mut self, disbursement: &Disbursement) -> StoreResult<()> {
        disbursement_active(disbursement).update(&self.txn).await.map_err(map_db_err)?;
        Ok(())
    }

    async fn update_fraud_report(&mut self, report: &FraudReport) -> StoreResult<()> {
        fraud_report_active(report).update(&self.txn).await.map_err(map_db_err)?;
        Ok(())
    }

    async fn disbursements_for_campaign(
        &mut self,
        campaign_id: CampaignId,
        statuses: &[DisbursementStatus],
    ) -> StoreResult<Vec<Disbursement>> {
        if statuses.is_empty() {
            return Ok(Vec::new());
        }
        let statuses: Vec<DbDisbursementStatus> = statuses.iter().copied().map(Into::into).collect();
        let models = disbursements::Entity::find()
            .filter(disbursements::Column::CampaignId.eq(campaign_id.into_inner()))
            .filter(disbursements::Column::Status.is_in(statuses))
            .order_by_asc(disbursements::Column::CreatedAt)
            .order_by_asc(disbursements::Column::Id)
            .all(&self.txn)
            .await
            .map_err(map_db_err)?;
        Ok(models.into_iter().map(disbursement_from_model).collect())
    }

    async fn completed_donation_total(&mut self, campaign_id: CampaignId) -> StoreResult<Decimal> {
        let filters = sea_orm::Condition::all()
            .add(donations::Column::CampaignId.eq(campaign_id.into_inner()))
            .add(donations::Column::Status.eq(DbDonationStatus::from(DonationStatus::Completed)));
        self.sum_amount::<donations::Entity>(donations::Column::Amount, filters)
            .await
    }

    async fn processed_disbursement_total(&mut self, campaign_id: CampaignId) -> StoreResult<Decimal> {
        let filters = sea_orm::Condition::all()
            .add(disbursements::Column::CampaignId.eq(campaign_id.into_inner()))
            .add(
                disbursements::Column::Status
                    .eq(DbDisbursementStatus::from(DisbursementStatus::Processed)),
            );
        self.sum_amount::<disbursements::Entity>(disbursements::Column::Amount, filters)
            .await
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.txn.commit().await.map_err(map_db_err)
    }
}
