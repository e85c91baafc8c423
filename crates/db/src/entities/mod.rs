//! `SeaORM` entity definitions for the funding schema.

pub mod prelude;

pub mod campaigns;
pub mod disbursements;
pub mod donations;
pub mod fraud_reports;
pub mod payment_records;
pub mod sea_orm_active_enums;
pub mod users;
