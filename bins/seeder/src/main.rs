//! Database seeder for CareFund development and testing.
//!
//! Seeds one user per role and an approved campaign with fixed ids, so the
//! `x-user-id` header values below can be used straight away against a
//! local server.
//!
//! Usage: cargo run --bin seeder

use anyhow::Context;
use rust_decimal::Decimal;
use uuid::Uuid;

use carefund_core::identity::{AdminProfile, DonorProfile, PartnerProfile, Role, User};
use carefund_core::ledger::{Campaign, CampaignStatus};
use carefund_core::store::FundingStore;
use carefund_db::SeaFundingStore;
use carefund_shared::config::DatabaseConfig;
use carefund_shared::types::{CampaignId, UserId};

/// Admin user id.
const ADMIN_ID: u128 = 0x0000_0000_0000_0000_0000_0000_0000_0001;
/// Partner user id.
const PARTNER_ID: u128 = 0x0000_0000_0000_0000_0000_0000_0000_0002;
/// Donor user id.
const DONOR_ID: u128 = 0x0000_0000_0000_0000_0000_0000_0000_0003;
/// Approved campaign id.
const CAMPAIGN_ID: u128 = 0x0000_0000_0000_0000_0000_0000_0000_0010;

fn user_id(raw: u128) -> UserId {
    UserId::from_uuid(Uuid::from_u128(raw))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let database_url =
        std::env::var("DATABASE_URL").context("DATABASE_URL must be set in environment")?;

    println!("Connecting to database...");
    let db = carefund_db::connect(&DatabaseConfig {
        url: Some(database_url),
        ..DatabaseConfig::default()
    })
    .await
    .context("Failed to connect to database")?;
    let store = SeaFundingStore::new(db);

    println!("Seeding users...");
    seed_users(&store).await?;

    println!("Seeding approved campaign...");
    seed_campaign(&store).await?;

    println!("Seeding complete!");
    println!("  admin   x-user-id: {}", user_id(ADMIN_ID));
    println!("  partner x-user-id: {}", user_id(PARTNER_ID));
    println!("  donor   x-user-id: {}", user_id(DONOR_ID));
    println!("  campaign id:       {}", Uuid::from_u128(CAMPAIGN_ID));
    Ok(())
}

async fn seed_users(store: &SeaFundingStore) -> anyhow::Result<()> {
    let users = [
        (
            ADMIN_ID,
            User::new(
                "admin@carefund.dev",
                "CareFund Admin",
                Role::Admin(AdminProfile { super_admin: true }),
            ),
        ),
        (
            PARTNER_ID,
            User::new(
                "partner@carefund.dev",
                "Lanka Care Foundation",
                Role::Partner(PartnerProfile {
                    organization_name: "Lanka Care Foundation".to_string(),
                    bank_account_number: Some("0012345678".to_string()),
                    bank_name: Some("Bank of Ceylon".to_string()),
                    is_verified: true,
                }),
            ),
        ),
        (
            DONOR_ID,
            User::new(
                "donor@carefund.dev",
                "Test Donor",
                Role::Donor(DonorProfile::default()),
            ),
        ),
    ];

    let mut tx = store.begin().await?;
    for (raw_id, mut user) in users {
        user.id = user_id(raw_id);
        if store.find_user(user.id).await?.is_some() {
            println!("  {} already exists, skipping...", user.email);
            continue;
        }
        tx.insert_user(&user).await?;
        println!("  Created {}", user.email);
    }
    tx.commit().await?;
    Ok(())
}

async fn seed_campaign(store: &SeaFundingStore) -> anyhow::Result<()> {
    let id = CampaignId::from_uuid(Uuid::from_u128(CAMPAIGN_ID));
    if store.find_campaign(id).await?.is_some() {
        println!("  Campaign already exists, skipping...");
        return Ok(());
    }

    let mut campaign = Campaign::new(
        user_id(PARTNER_ID),
        "Open-heart surgery for Nimal",
        Decimal::new(1_500_000, 2),
    );
    campaign.id = id;
    campaign.status = CampaignStatus::Approved;

    let mut tx = store.begin().await?;
    tx.insert_campaign(&campaign).await?;
    tx.commit().await?;
    println!("  Created campaign {}", campaign.title);
    Ok(())
}
