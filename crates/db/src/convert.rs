//! Conversions between `SeaORM` models and ledger domain types.

use chrono::{DateTime, FixedOffset, Utc};
use rust_decimal::Decimal;
use sea_orm::ActiveValue::Set;

use carefund_core::disbursement::{BankDetails, Disbursement, DisbursementStatus};
use carefund_core::donation::{Donation, DonationStatus, PaymentRecord};
use carefund_core::fraud::{FraudReport, FraudReportStatus};
use carefund_core::gateway::IntentStatus;
use carefund_core::identity::{AdminProfile, DonorProfile, PartnerProfile, Role, User};
use carefund_core::ledger::{Campaign, CampaignStatus};
use carefund_core::store::{StoreError, StoreResult};
use carefund_shared::types::{
    CampaignId, Currency, DisbursementId, DonationId, FraudReportId, PaymentRecordId, UserId,
};

use crate::entities::sea_orm_active_enums::{
    self as db, CampaignStatus as DbCampaignStatus, DisbursementStatus as DbDisbursementStatus,
    DonationStatus as DbDonationStatus, FraudReportStatus as DbFraudReportStatus,
    PaymentStatus as DbPaymentStatus,
};
use crate::entities::{campaigns, disbursements, donations, fraud_reports, payment_records, users};

macro_rules! map_enum {
    ($db:ident, $domain:ident, [$($variant:ident),+ $(,)?]) => {
        impl From<$domain> for $db {
            fn from(value: $domain) -> Self {
                match value {
                    $($domain::$variant => Self::$variant,)+
                }
            }
        }

        impl From<$db> for $domain {
            fn from(value: $db) -> Self {
                match value {
                    $($db::$variant => Self::$variant,)+
                }
            }
        }
    };
}

map_enum!(
    DbCampaignStatus,
    CampaignStatus,
    [Pending, Approved, Rejected, Suspended, Completed]
);
map_enum!(DbDonationStatus, DonationStatus, [Pending, Completed, Failed, Refunded]);
map_enum!(
    DbDisbursementStatus,
    DisbursementStatus,
    [Pending, Approved, Processed, Failed]
);
map_enum!(
    DbFraudReportStatus,
    FraudReportStatus,
    [Pending, Investigating, Confirmed, Dismissed]
);
map_enum!(DbPaymentStatus, IntentStatus, [Succeeded, Pending, Failed]);

fn utc(ts: DateTime<FixedOffset>) -> DateTime<Utc> {
    ts.with_timezone(&Utc)
}

fn fixed(ts: DateTime<Utc>) -> DateTime<FixedOffset> {
    ts.into()
}

pub(crate) fn campaign_from_model(m: campaigns::Model) -> Campaign {
    Campaign {
        id: CampaignId::from_uuid(m.id),
        title: m.title,
        partner_id: UserId::from_uuid(m.partner_id),
        target_amount: m.target_amount,
        funds_raised: m.funds_raised,
        status: m.status.into(),
        rejection_reason: m.rejection_reason,
        created_at: utc(m.created_at),
        updated_at: utc(m.updated_at),
    }
}

pub(crate) fn campaign_active(c: &Campaign) -> campaigns::ActiveModel {
    campaigns::ActiveModel {
        id: Set(c.id.into_inner()),
        partner_id: Set(c.partner_id.into_inner()),
        title: Set(c.title.clone()),
        target_amount: Set(c.target_amount),
        funds_raised: Set(c.funds_raised),
        status: Set(c.status.into()),
        rejection_reason: Set(c.rejection_reason.clone()),
        created_at: Set(fixed(c.created_at)),
        updated_at: Set(fixed(c.updated_at)),
    }
}

/// Rebuilds the role payload from the flattened profile columns.
pub(crate) fn user_from_model(m: users::Model) -> User {
    let role = match m.role {
        db::UserRole::Donor => Role::Donor(DonorProfile {
            total_donated: m.total_donated,
        }),
        db::UserRole::Partner => Role::Partner(PartnerProfile {
            organization_name: m.organization_name.unwrap_or_default(),
            bank_account_number: m.bank_account_number,
            bank_name: m.bank_name,
            is_verified: m.is_verified,
        }),
        db::UserRole::Admin => Role::Admin(AdminProfile {
            super_admin: m.super_admin,
        }),
    };
    User {
        id: UserId::from_uuid(m.id),
        email: m.email,
        display_name: m.display_name,
        is_active: m.is_active,
        role,
        created_at: utc(m.created_at),
    }
}

pub(crate) fn user_active(u: &User) -> users::ActiveModel {
    let mut model = users::ActiveModel {
        id: Set(u.id.into_inner()),
        email: Set(u.email.clone()),
        display_name: Set(u.display_name.clone()),
        is_active: Set(u.is_active),
        role: Set(db::UserRole::Donor),
        total_donated: Set(Decimal::ZERO),
        organization_name: Set(None),
        bank_account_number: Set(None),
        bank_name: Set(None),
        is_verified: Set(false),
        super_admin: Set(false),
        created_at: Set(fixed(u.created_at)),
        updated_at: Set(fixed(Utc::now())),
    };
    match &u.role {
        Role::Donor(profile) => {
            model.total_donated = Set(profile.total_donated);
        }
        Role::Partner(profile) => {
            model.role = Set(db::UserRole::Partner);
            model.organization_name = Set(Some(profile.organization_name.clone()));
            model.bank_account_number = Set(profile.bank_account_number.clone());
            model.bank_name = Set(profile.bank_name.clone());
            model.is_verified = Set(profile.is_verified);
        }
        Role::Admin(profile) => {
            model.role = Set(db::UserRole::Admin);
            model.super_admin = Set(profile.super_admin);
        }
    }
    model
}

pub(crate) fn donation_from_model(m: donations::Model) -> StoreResult<Donation> {
    let currency: Currency = m.currency.parse().map_err(StoreError::Database)?;
    Ok(Donation {
        id: DonationId::from_uuid(m.id),
        campaign_id: CampaignId::from_uuid(m.campaign_id),
        donor_id: m.donor_id.map(UserId::from_uuid),
        amount: m.amount,
        currency,
        status: m.status.into(),
        transaction_id: m.transaction_id,
        is_anonymous: m.is_anonymous,
        donor_message: m.donor_message,
        failure_reason: m.failure_reason,
        created_at: utc(m.created_at),
        completed_at: m.completed_at.map(utc),
    })
}

pub(crate) fn donation_active(d: &Donation) -> donations::ActiveModel {
    donations::ActiveModel {
        id: Set(d.id.into_inner()),
        campaign_id: Set(d.campaign_id.into_inner()),
        donor_id: Set(d.donor_id.map(UserId::into_inner)),
        amount: Set(d.amount),
        currency: Set(d.currency.to_string()),
        status: Set(d.status.into()),
        transaction_id: Set(d.transaction_id.clone()),
        is_anonymous: Set(d.is_anonymous),
        donor_message: Set(d.donor_message.clone()),
        failure_reason: Set(d.failure_reason.clone()),
        created_at: Set(fixed(d.created_at)),
        completed_at: Set(d.completed_at.map(fixed)),
    }
}

pub(crate) fn payment_record_from_model(m: payment_records::Model) -> StoreResult<PaymentRecord> {
    let currency: Currency = m.currency.parse().map_err(StoreError::Database)?;
    Ok(PaymentRecord {
        id: PaymentRecordId::from_uuid(m.id),
        donation_id: DonationId::from_uuid(m.donation_id),
        payment_method: m.payment_method,
        transaction_reference: m.transaction_reference,
        amount: m.amount,
        currency,
        status: m.status.into(),
        error_message: m.error_message,
        processed_at: utc(m.processed_at),
    })
}

pub(crate) fn payment_record_active(r: &PaymentRecord) -> payment_records::ActiveModel {
    payment_records::ActiveModel {
        id: Set(r.id.into_inner()),
        donation_id: Set(r.donation_id.into_inner()),
        payment_method: Set(r.payment_method.clone()),
        transaction_reference: Set(r.transaction_reference.clone()),
        amount: Set(r.amount),
        currency: Set(r.currency.to_string()),
        status: Set(r.status.into()),
        error_message: Set(r.error_message.clone()),
        processed_at: Set(fixed(r.processed_at)),
    }
}

pub(crate) fn disbursement_from_model(m: disbursements::Model) -> Disbursement {
    Disbursement {
        id: DisbursementId::from_uuid(m.id),
        campaign_id: CampaignId::from_uuid(m.campaign_id),
        requested_by: UserId::from_uuid(m.requested_by),
        amount: m.amount,
        status: m.status.into(),
        bank: BankDetails {
            account_number: m.bank_account_number,
            bank_name: m.bank_name,
        },
        approved_by: m.approved_by.map(UserId::from_uuid),
        approved_at: m.approved_at.map(utc),
        approval_notes: m.approval_notes,
        processed_at: m.processed_at.map(utc),
        failure_reason: m.failure_reason,
        created_at: utc(m.created_at),
        updated_at: utc(m.updated_at),
    }
}

pub(crate) fn disbursement_active(d: &Disbursement) -> disbursements::ActiveModel {
    disbursements::ActiveModel {
        id: Set(d.id.into_inner()),
        campaign_id: Set(d.campaign_id.into_inner()),
        requested_by: Set(d.requested_by.into_inner()),
        amount: Set(d.amount),
        status: Set(d.status.into()),
        bank_account_number: Set(d.bank.account_number.clone()),
        bank_name: Set(d.bank.bank_name.clone()),
        approved_by: Set(d.approved_by.map(UserId::into_inner)),
        approved_at: Set(d.approved_at.map(fixed)),
        approval_notes: Set(d.approval_notes.clone()),
        processed_at: Set(d.processed_at.map(fixed)),
        failure_reason: Set(d.failure_reason.clone()),
        created_at: Set(fixed(d.created_at)),
        updated_at: Set(fixed(d.updated_at)),
    }
}

pub(crate) fn fraud_report_from_model(m: fraud_reports::Model) -> FraudReport {
    FraudReport {
        id: FraudReportId::from_uuid(m.id),
        campaign_id: CampaignId::from_uuid(m.campaign_id),
        reported_by: m.reported_by.map(UserId::from_uuid),
        description: m.description,
        evidence_file: m.evidence_file,
        status: m.status.into(),
        investigation_notes: m.investigation_notes,
        reviewed_by: m.reviewed_by.map(UserId::from_uuid),
        created_at: utc(m.created_at),
        updated_at: utc(m.updated_at),
    }
}

pub(crate) fn fraud_report_active(r: &FraudReport) -> fraud_reports::ActiveModel {
    fraud_reports::ActiveModel {
        id: Set(r.id.into_inner()),
        campaign_id: Set(r.campaign_id.into_inner()),
        reported_by: Set(r.reported_by.map(UserId::into_inner)),
        description: Set(r.description.clone()),
        evidence_file: Set(r.evidence_file.clone()),
        status: Set(r.status.into()),
        investigation_notes: Set(r.investigation_notes.clone()),
        reviewed_by: Set(r.reviewed_by.map(UserId::into_inner)),
        created_at: Set(fixed(r.created_at)),
        updated_at: Set(fixed(r.updated_at)),
    }
}
