//! Funding schema.
//!
//! Creates the enums and the six tables the ledger works on. The database
//! backs the ledger's own checks: `transaction_id` and
//! `transaction_reference` are unique and `funds_raised` can never go negative.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: ENUMS
        // ============================================================
        db.execute_unprepared(ENUMS_SQL).await?;

        // ============================================================
        // PART 2: USERS
        // ============================================================
        db.execute_unprepared(USERS_SQL).await?;

        // ============================================================
        // PART 3: CAMPAIGN LEDGER
        // ============================================================
        db.execute_unprepared(CAMPAIGNS_SQL).await?;

        // ============================================================
        // PART 4: MONEY MOVEMENT
        // ============================================================
        db.execute_unprepared(DONATIONS_SQL).await?;
        db.execute_unprepared(PAYMENT_RECORDS_SQL).await?;
        db.execute_unprepared(DISBURSEMENTS_SQL).await?;

        // ============================================================
        // PART 5: FRAUD
        // ============================================================
        db.execute_unprepared(FRAUD_REPORTS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_SQL).await?;
        Ok(())
    }
}

const ENUMS_SQL: &str = r"
CREATE TYPE user_role AS ENUM ('donor', 'partner', 'admin');
CREATE TYPE campaign_status AS ENUM ('pending', 'approved', 'rejected', 'suspended', 'completed');
CREATE TYPE donation_status AS ENUM ('pending', 'completed', 'failed', 'refunded');
CREATE TYPE disbursement_status AS ENUM ('pending', 'approved', 'processed', 'failed');
CREATE TYPE fraud_report_status AS ENUM ('pending', 'investigating', 'confirmed', 'dismissed');
CREATE TYPE payment_status AS ENUM ('succeeded', 'pending', 'failed');
";

const USERS_SQL: &str = r"
-- One row per user; the role-specific profile columns are NULL/default for other roles
CREATE TABLE users (
    id UUID PRIMARY KEY,
    email VARCHAR(255) NOT NULL UNIQUE,
    display_name VARCHAR(255) NOT NULL,
    is_active BOOLEAN NOT NULL DEFAULT true,
    role user_role NOT NULL,
    total_donated NUMERIC(19, 2) NOT NULL DEFAULT 0,
    organization_name VARCHAR(255),
    bank_account_number VARCHAR(64),
    bank_name VARCHAR(255),
    is_verified BOOLEAN NOT NULL DEFAULT false,
    super_admin BOOLEAN NOT NULL DEFAULT false,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_total_donated_non_negative CHECK (total_donated >= 0),
    CONSTRAINT chk_partner_has_organization CHECK (role <> 'partner' OR organization_name IS NOT NULL)
);
";

const CAMPAIGNS_SQL: &str = r"
CREATE TABLE campaigns (
    id UUID PRIMARY KEY,
    partner_id UUID NOT NULL REFERENCES users(id),
    title VARCHAR(255) NOT NULL,
    target_amount NUMERIC(19, 2) NOT NULL,
    funds_raised NUMERIC(19, 2) NOT NULL DEFAULT 0,
    status campaign_status NOT NULL DEFAULT 'pending',
    rejection_reason TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_target_positive CHECK (target_amount > 0),
    CONSTRAINT chk_funds_raised_non_negative CHECK (funds_raised >= 0)
);

CREATE INDEX idx_campaigns_partner ON campaigns(partner_id);
CREATE INDEX idx_campaigns_status ON campaigns(status);
";

const DONATIONS_SQL: &str = r"
CREATE TABLE donations (
    id UUID PRIMARY KEY,
    campaign_id UUID NOT NULL REFERENCES campaigns(id),
    donor_id UUID REFERENCES users(id),
    amount NUMERIC(19, 2) NOT NULL,
    currency VARCHAR(3) NOT NULL,
    status donation_status NOT NULL DEFAULT 'pending',
    transaction_id VARCHAR(255) NOT NULL,
    is_anonymous BOOLEAN NOT NULL DEFAULT false,
    donor_message TEXT,
    failure_reason TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    completed_at TIMESTAMPTZ,
    CONSTRAINT uq_donations_transaction_id UNIQUE (transaction_id),
    CONSTRAINT chk_donation_amount_positive CHECK (amount > 0),
    CONSTRAINT chk_completed_has_timestamp CHECK (status <> 'completed' OR completed_at IS NOT NULL)
);

-- Ledger aggregates filter by campaign and status
CREATE INDEX idx_donations_campaign_status ON donations(campaign_id, status);
CREATE INDEX idx_donations_campaign_created ON donations(campaign_id, created_at DESC);
CREATE INDEX idx_donations_donor ON donations(donor_id) WHERE donor_id IS NOT NULL;
";

const PAYMENT_RECORDS_SQL: &str = r"
-- Gateway settlement written when a confirmation resolves a donation
CREATE TABLE payment_records (
    id UUID PRIMARY KEY,
    donation_id UUID NOT NULL REFERENCES donations(id),
    payment_method VARCHAR(50) NOT NULL,
    transaction_reference VARCHAR(255) NOT NULL,
    amount NUMERIC(19, 2) NOT NULL,
    currency VARCHAR(3) NOT NULL,
    status payment_status NOT NULL,
    error_message TEXT,
    processed_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT uq_payment_records_reference UNIQUE (transaction_reference),
    CONSTRAINT uq_payment_records_donation UNIQUE (donation_id),
    CONSTRAINT chk_payment_amount_positive CHECK (amount > 0)
);
";

const DISBURSEMENTS_SQL: &str = r"
CREATE TABLE disbursements (
    id UUID PRIMARY KEY,
    campaign_id UUID NOT NULL REFERENCES campaigns(id),
    requested_by UUID NOT NULL REFERENCES users(id),
    amount NUMERIC(19, 2) NOT NULL,
    status disbursement_status NOT NULL DEFAULT 'pending',
    bank_account_number VARCHAR(64) NOT NULL,
    bank_name VARCHAR(255) NOT NULL,
    approved_by UUID REFERENCES users(id),
    approved_at TIMESTAMPTZ,
    approval_notes TEXT,
    processed_at TIMESTAMPTZ,
    failure_reason TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_disbursement_amount_positive CHECK (amount > 0),
    CONSTRAINT chk_processed_has_timestamp CHECK (status <> 'processed' OR processed_at IS NOT NULL)
);

-- Reservation sums filter by campaign and status
CREATE INDEX idx_disbursements_campaign_status ON disbursements(campaign_id, status);
CREATE INDEX idx_disbursements_status_created ON disbursements(status, created_at DESC);
";

const FRAUD_REPORTS_SQL: &str = r"
CREATE TABLE fraud_reports (
    id UUID PRIMARY KEY,
    campaign_id UUID NOT NULL REFERENCES campaigns(id),
    reported_by UUID REFERENCES users(id),
    description TEXT NOT NULL,
    evidence_file VARCHAR(500),
    status fraud_report_status NOT NULL DEFAULT 'pending',
    investigation_notes TEXT,
    reviewed_by UUID REFERENCES users(id),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_description_not_blank CHECK (length(trim(description)) > 0)
);

CREATE INDEX idx_fraud_reports_campaign ON fraud_reports(campaign_id);
CREATE INDEX idx_fraud_reports_status_created ON fraud_reports(status, created_at DESC);
";

const DROP_SQL: &str = r"
DROP TABLE IF EXISTS fraud_reports CASCADE;
DROP TABLE IF EXISTS disbursements CASCADE;
DROP TABLE IF EXISTS payment_records CASCADE;
DROP TABLE IF EXISTS donations CASCADE;
DROP TABLE IF EXISTS campaigns CASCADE;
DROP TABLE IF EXISTS users CASCADE;
DROP TYPE IF EXISTS payment_status;
DROP TYPE IF EXISTS fraud_report_status;
DROP TYPE IF EXISTS disbursement_status;
DROP TYPE IF EXISTS donation_status;
DROP TYPE IF EXISTS campaign_status;
DROP TYPE IF EXISTS user_role;
";
