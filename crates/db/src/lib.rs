//! PostgreSQL persistence for the CareFund ledger.
//!
//! This crate provides:
//! - `SeaORM` entity definitions for the funding schema
//! - Database migrations
//! - `SeaFundingStore`, the PostgreSQL implementation of the funding store port

pub mod entities;
pub mod migration;
pub mod store;

mod convert;

pub use store::{SeaFundingStore, SeaFundingTx};

use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};

use carefund_shared::config::DatabaseConfig;

/// Establishes a pooled connection to the database.
///
/// # Errors
///
/// Returns an error if no URL is configured or the connection cannot be established.
pub async fn connect(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let url = config
        .url
        .as_deref()
        .ok_or_else(|| DbErr::Custom("database.url is not configured".to_string()))?;
    let mut options = ConnectOptions::new(url);
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(false);
    Database::connect(options).await
}
