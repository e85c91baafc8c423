//! End-to-end funding scenarios over the in-memory store and sandbox gateway.
//!
//! These tests drive the public workflow API only and check the funding
//! equality after every scenario.

#![allow(clippy::uninlined_format_args)]

use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::sync::Barrier;

use carefund_core::disbursement::{
    BankDetails, Disbursement, DisbursementRequest, DisbursementStatus, PayoutResult,
};
use carefund_core::donation::{ConfirmationOutcome, Donation, DonationStatus, NewDonation};
use carefund_core::fraud::NewFraudReport;
use carefund_core::gateway::{GatewayError, GatewayErrorKind, IntentStatus, SandboxGateway};
use carefund_core::identity::{AdminProfile, DonorProfile, PartnerProfile, Role, User};
use carefund_core::ledger::{Campaign, CampaignStatus, NewCampaign};
use carefund_core::store::{FundingStore, InMemoryStore};
use carefund_core::{ErrorKind, FundingError, FundingService};
use carefund_shared::types::{Currency, DisbursementId};

struct World {
    store: Arc<InMemoryStore>,
    gateway: Arc<SandboxGateway>,
    funding: FundingService,
    admin: User,
    partner: User,
    donor: User,
}

async fn world() -> World {
    let store = Arc::new(InMemoryStore::new());
    let gateway = Arc::new(SandboxGateway::new());
    let admin = User::new("admin@carefund.org", "Admin", Role::Admin(AdminProfile::default()));
    let partner = User::new(
        "ops@lankacare.org",
        "Lanka Care",
        Role::Partner(PartnerProfile {
            organization_name: "Lanka Care Foundation".into(),
            bank_account_number: Some("0012345678".into()),
            bank_name: Some("Bank of Ceylon".into()),
            is_verified: true,
        }),
    );
    let donor = User::new("amal@example.com", "Amal", Role::Donor(DonorProfile::default()));

    let mut tx = store.begin().await.unwrap();
    for user in [&admin, &partner, &donor] {
        tx.insert_user(user).await.unwrap();
    }
    tx.commit().await.unwrap();

    World {
        funding: FundingService::new(store.clone(), gateway.clone(), Currency::Usd),
        store,
        gateway,
        admin,
        partner,
        donor,
    }
}

impl World {
    async fn approved_campaign(&self, target: Decimal) -> Campaign {
        let campaign = self
            .funding
            .ledger
            .submit_campaign(
                self.partner.id,
                NewCampaign {
                    title: "Heart surgery for Nimal".into(),
                    target_amount: target,
                },
            )
            .await
            .unwrap();
        self.funding
            .ledger
            .approve_campaign(self.admin.id, campaign.id)
            .await
            .unwrap()
    }

    async fn open_donation(&self, campaign: &Campaign, amount: Decimal) -> Donation {
        self.funding
            .donations
            .create_donation(NewDonation {
                campaign_id: campaign.id,
                amount,
                donor_id: Some(self.donor.id),
                is_anonymous: false,
                message: Some("Get well soon".into()),
            })
            .await
            .unwrap()
            .donation
    }

    async fn donate(&self, campaign: &Campaign, amount: Decimal) -> Donation {
        let donation = self.open_donation(campaign, amount).await;
        assert!(self.gateway.settle(&donation.transaction_id, IntentStatus::Succeeded));
        let confirmed = self
            .funding
            .donations
            .confirm_donation(donation.id)
            .await
            .unwrap();
        assert_eq!(confirmed.outcome, ConfirmationOutcome::Completed);
        confirmed.donation
    }

    async fn request(&self, campaign: &Campaign, amount: Decimal) -> Result<Disbursement, FundingError> {
        self.funding
            .disbursements
            .request_disbursement(
                self.partner.id,
                campaign.id,
                DisbursementRequest {
                    amount,
                    ..DisbursementRequest::default()
                },
            )
            .await
    }

    async fn funds_raised(&self, campaign: &Campaign) -> Decimal {
        self.store
            .find_campaign(campaign.id)
            .await
            .unwrap()
            .unwrap()
            .funds_raised
    }

    async fn assert_invariant(&self, campaign: &Campaign) {
        let report = self.funding.ledger.verify_invariant(campaign.id).await.unwrap();
        assert!(
            report.holds(),
            "funds_raised {} != completed {} - processed {}",
            report.funds_raised,
            report.completed_donations,
            report.processed_disbursements
        );
    }
}

#[tokio::test]
async fn test_overfunding_is_allowed() {
    let w = world().await;
    let campaign = w.approved_campaign(dec!(1000)).await;

    w.donate(&campaign, dec!(400)).await;
    let balance = w.funding.ledger.balance(campaign.id).await.unwrap();
    assert_eq!(balance.funds_raised, dec!(400));
    assert_eq!(balance.progress_percentage, dec!(40));

    w.donate(&campaign, dec!(700)).await;
    let balance = w.funding.ledger.balance(campaign.id).await.unwrap();
    assert_eq!(balance.funds_raised, dec!(1100));
    assert_eq!(balance.progress_percentage, dec!(110));

    let donor = w.store.find_user(w.donor.id).await.unwrap().unwrap();
    assert_eq!(donor.require_donor().unwrap().total_donated, dec!(1100));
    w.assert_invariant(&campaign).await;
}

#[tokio::test]
async fn test_confirmation_is_idempotent() {
    let w = world().await;
    let campaign = w.approved_campaign(dec!(1000)).await;
    let completed = w.donate(&campaign, dec!(250)).await;
    let verify_calls = w.gateway.verify_calls();

    for _ in 0..3 {
        let again = w
            .funding
            .donations
            .confirm_donation(completed.id)
            .await
            .unwrap();
        assert_eq!(again.outcome, ConfirmationOutcome::AlreadyResolved);
        assert_eq!(again.donation.status, DonationStatus::Completed);
        assert_eq!(again.campaign_progress.funds_raised, dec!(250));
    }
    assert_eq!(w.gateway.verify_calls(), verify_calls);

    let failing = w.open_donation(&campaign, dec!(80)).await;
    w.gateway.settle(&failing.transaction_id, IntentStatus::Failed);
    let first = w.funding.donations.confirm_donation(failing.id).await.unwrap();
    assert_eq!(first.outcome, ConfirmationOutcome::Failed);
    w.gateway.settle(&failing.transaction_id, IntentStatus::Succeeded);
    let second = w.funding.donations.confirm_donation(failing.id).await.unwrap();
    assert_eq!(second.outcome, ConfirmationOutcome::AlreadyResolved);
    assert_eq!(second.donation.status, DonationStatus::Failed);

    assert_eq!(w.funds_raised(&campaign).await, dec!(250));
    w.assert_invariant(&campaign).await;
}

#[tokio::test]
async fn test_concurrent_confirmations_credit_once() {
    const CONFIRMERS: usize = 32;

    let w = world().await;
    let campaign = w.approved_campaign(dec!(1000)).await;
    let donation = w.open_donation(&campaign, dec!(75)).await;
    w.gateway.settle(&donation.transaction_id, IntentStatus::Succeeded);

    let barrier = Arc::new(Barrier::new(CONFIRMERS));
    let handles = (0..CONFIRMERS).map(|_| {
        let funding = w.funding.clone();
        let barrier = Arc::clone(&barrier);
        let id = donation.id;
        tokio::spawn(async move {
            barrier.wait().await;
            funding.donations.confirm_donation(id).await
        })
    });
    let results = join_all(handles).await;

    let mut completed = 0;
    let mut already = 0;
    for result in results {
        match result.unwrap().unwrap().outcome {
            ConfirmationOutcome::Completed => completed += 1,
            ConfirmationOutcome::AlreadyResolved => already += 1,
            ConfirmationOutcome::Failed => panic!("no confirmation should fail"),
        }
    }
    assert_eq!(completed, 1);
    assert_eq!(already, CONFIRMERS - 1);
    assert_eq!(w.funds_raised(&campaign).await, dec!(75));

    let donor = w.store.find_user(w.donor.id).await.unwrap().unwrap();
    assert_eq!(donor.require_donor().unwrap().total_donated, dec!(75));
    w.assert_invariant(&campaign).await;
}

#[tokio::test]
async fn test_unfinished_payment_fails_donation() {
    let w = world().await;
    let campaign = w.approved_campaign(dec!(1000)).await;
    let donation = w.open_donation(&campaign, dec!(10)).await;

    let confirmed = w.funding.donations.confirm_donation(donation.id).await.unwrap();
    assert_eq!(confirmed.outcome, ConfirmationOutcome::Failed);
    assert_eq!(confirmed.donation.status, DonationStatus::Failed);
    assert_eq!(w.funds_raised(&campaign).await, dec!(0));
    let record = w.store.find_payment_record(donation.id).await.unwrap().unwrap();
    assert_eq!(record.status, IntentStatus::Pending);
    assert_eq!(record.payment_method, "sandbox");

    // A late capture does not revive a failed donation.
    w.gateway.settle(&donation.transaction_id, IntentStatus::Succeeded);
    let again = w.funding.donations.confirm_donation(donation.id).await.unwrap();
    assert_eq!(again.outcome, ConfirmationOutcome::AlreadyResolved);
    assert_eq!(again.donation.status, DonationStatus::Failed);
    assert_eq!(w.funds_raised(&campaign).await, dec!(0));
    w.assert_invariant(&campaign).await;
}

#[tokio::test]
async fn test_gateway_errors_are_retryable() {
    let w = world().await;
    let campaign = w.approved_campaign(dec!(1000)).await;
    let donation = w.open_donation(&campaign, dec!(60)).await;
    w.gateway.settle(&donation.transaction_id, IntentStatus::Succeeded);

    w.gateway
        .fail_next_verify(GatewayError::new(GatewayErrorKind::RateLimited, "slow down"));
    let err = w.funding.donations.confirm_donation(donation.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Gateway);
    assert!(err.is_retryable());

    let stored = w.store.find_donation(donation.id).await.unwrap().unwrap();
    assert_eq!(stored.status, DonationStatus::Pending);
    assert_eq!(w.funds_raised(&campaign).await, dec!(0));
    assert!(w.store.find_payment_record(donation.id).await.unwrap().is_none());

    let confirmed = w.funding.donations.confirm_donation(donation.id).await.unwrap();
    assert_eq!(confirmed.outcome, ConfirmationOutcome::Completed);
    assert_eq!(w.funds_raised(&campaign).await, dec!(60));

    let record = w.store.find_payment_record(donation.id).await.unwrap().unwrap();
    assert_eq!(record.transaction_reference, donation.transaction_id);
    assert_eq!(record.status, IntentStatus::Succeeded);
    assert_eq!(record.amount, dec!(60));
    assert_eq!(record.currency, Currency::Usd);
    assert_eq!(Some(record.processed_at), confirmed.donation.completed_at);
    assert!(record.error_message.is_none());
}

#[tokio::test]
async fn test_currency_mismatch_fails_donation() {
    let w = world().await;
    let campaign = w.approved_campaign(dec!(1000)).await;
    let donation = w.open_donation(&campaign, dec!(60)).await;
    w.gateway
        .settle_in(&donation.transaction_id, IntentStatus::Succeeded, Currency::Lkr);

    let confirmed = w.funding.donations.confirm_donation(donation.id).await.unwrap();
    assert_eq!(confirmed.outcome, ConfirmationOutcome::Failed);
    assert_eq!(w.funds_raised(&campaign).await, dec!(0));

    // The capture stays on record for reconciliation.
    let record = w.store.find_payment_record(donation.id).await.unwrap().unwrap();
    assert_eq!(record.status, IntentStatus::Succeeded);
    assert_eq!(record.currency, Currency::Lkr);
    assert_eq!(record.amount, dec!(60));
    assert!(record.error_message.unwrap().contains("LKR"));

    let again = w.funding.donations.confirm_donation(donation.id).await.unwrap();
    assert_eq!(again.outcome, ConfirmationOutcome::AlreadyResolved);
    assert_eq!(again.donation.status, DonationStatus::Failed);
    assert_eq!(w.funds_raised(&campaign).await, dec!(0));
    w.assert_invariant(&campaign).await;
}

#[tokio::test]
async fn test_balance_boundary() {
    let w = world().await;
    let campaign = w.approved_campaign(dec!(1000)).await;
    w.donate(&campaign, dec!(500)).await;

    w.request(&campaign, dec!(300)).await.unwrap();

    let err = w.request(&campaign, dec!(300)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvariantViolation);
    assert!(matches!(
        err,
        FundingError::InsufficientBalance { available, .. } if available == dec!(200)
    ));

    let exact = w.request(&campaign, dec!(200)).await.unwrap();
    assert_eq!(exact.status, DisbursementStatus::Pending);
    assert_eq!(w.funding.ledger.available_balance(campaign.id).await.unwrap(), dec!(0));
    w.assert_invariant(&campaign).await;
}

#[tokio::test]
async fn test_concurrent_requests_never_overcommit() {
    const REQUESTS: usize = 12;

    let w = world().await;
    let campaign = w.approved_campaign(dec!(1000)).await;
    w.donate(&campaign, dec!(500)).await;

    let barrier = Arc::new(Barrier::new(REQUESTS));
    let handles = (0..REQUESTS).map(|_| {
        let funding = w.funding.clone();
        let barrier = Arc::clone(&barrier);
        let partner = w.partner.id;
        let campaign_id = campaign.id;
        tokio::spawn(async move {
            barrier.wait().await;
            funding
                .disbursements
                .request_disbursement(
                    partner,
                    campaign_id,
                    DisbursementRequest {
                        amount: dec!(100),
                        ..DisbursementRequest::default()
                    },
                )
                .await
        })
    });

    let accepted = join_all(handles)
        .await
        .into_iter()
        .filter(|r| matches!(r, Ok(Ok(_))))
        .count();
    assert_eq!(accepted, 5);
    assert_eq!(w.funding.ledger.available_balance(campaign.id).await.unwrap(), dec!(0));
}

#[tokio::test]
async fn test_approval_rechecks_balance() {
    let w = world().await;
    let campaign = w.approved_campaign(dec!(1000)).await;
    w.donate(&campaign, dec!(600)).await;

    let first = w.request(&campaign, dec!(300)).await.unwrap();
    assert_eq!(w.funding.ledger.available_balance(campaign.id).await.unwrap(), dec!(300));
    let second = w.request(&campaign, dec!(300)).await.unwrap();

    w.funding
        .disbursements
        .approve_disbursement(w.admin.id, first.id, None)
        .await
        .unwrap();
    w.funding
        .disbursements
        .approve_disbursement(w.admin.id, second.id, Some("Hospital invoice attached".into()))
        .await
        .unwrap();

    // A request admitted before the re-check existed, written straight to the store.
    let now = Utc::now();
    let legacy = Disbursement {
        id: DisbursementId::new(),
        campaign_id: campaign.id,
        requested_by: w.partner.id,
        amount: dec!(300),
        status: DisbursementStatus::Pending,
        bank: BankDetails {
            account_number: "0012345678".into(),
            bank_name: "Bank of Ceylon".into(),
        },
        approved_by: None,
        approved_at: None,
        approval_notes: None,
        processed_at: None,
        failure_reason: None,
        created_at: now,
        updated_at: now,
    };
    let mut tx = w.store.begin().await.unwrap();
    tx.insert_disbursement(&legacy).await.unwrap();
    tx.commit().await.unwrap();

    let err = w
        .funding
        .disbursements
        .approve_disbursement(w.admin.id, legacy.id, None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvariantViolation);
    let stored = w.store.find_disbursement(legacy.id).await.unwrap().unwrap();
    assert_eq!(stored.status, DisbursementStatus::Pending);
}

#[tokio::test]
async fn test_fraud_confirmation_cascades() {
    let w = world().await;
    let campaign = w.approved_campaign(dec!(1000)).await;
    w.donate(&campaign, dec!(500)).await;
    let pending = w.request(&campaign, dec!(200)).await.unwrap();

    let report = w
        .funding
        .fraud
        .file_fraud_report(
            Some(w.donor.id),
            campaign.id,
            NewFraudReport {
                description: "Beneficiary says they never asked for funds".into(),
                evidence_file: Some("reports/ev-1.pdf".into()),
            },
        )
        .await
        .unwrap();
    w.funding
        .fraud
        .investigate(w.admin.id, report.id, Some("Calling beneficiary".into()))
        .await
        .unwrap();
    let confirmation = w
        .funding
        .fraud
        .confirm_fraud(w.admin.id, report.id, Some("Confirmed by phone".into()))
        .await
        .unwrap();

    assert_eq!(confirmation.campaign.status, CampaignStatus::Suspended);
    assert_eq!(confirmation.rejected_disbursements.len(), 1);
    assert_eq!(confirmation.rejected_disbursements[0].id, pending.id);
    let stored = w.store.find_disbursement(pending.id).await.unwrap().unwrap();
    assert_eq!(stored.status, DisbursementStatus::Failed);

    let err = w
        .funding
        .donations
        .create_donation(NewDonation {
            campaign_id: campaign.id,
            amount: dec!(10),
            donor_id: None,
            is_anonymous: true,
            message: None,
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let err = w.request(&campaign, dec!(10)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    assert_eq!(w.funds_raised(&campaign).await, dec!(500));
    w.assert_invariant(&campaign).await;
}

#[tokio::test]
async fn test_approved_payout_settles_after_suspension() {
    let w = world().await;
    let campaign = w.approved_campaign(dec!(1000)).await;
    w.donate(&campaign, dec!(500)).await;
    let approved = w.request(&campaign, dec!(200)).await.unwrap();
    w.funding
        .disbursements
        .approve_disbursement(w.admin.id, approved.id, None)
        .await
        .unwrap();

    let report = w
        .funding
        .fraud
        .file_fraud_report(
            None,
            campaign.id,
            NewFraudReport {
                description: "Duplicate campaign".into(),
                evidence_file: None,
            },
        )
        .await
        .unwrap();
    let confirmation = w
        .funding
        .fraud
        .confirm_fraud(w.admin.id, report.id, None)
        .await
        .unwrap();
    assert!(confirmation.rejected_disbursements.is_empty());

    let err = w
        .funding
        .disbursements
        .approve_disbursement(w.admin.id, approved.id, None)
        .await
        .unwrap_err();
    assert!(matches!(err, FundingError::InvalidTransition { .. }));

    let processed = w
        .funding
        .disbursements
        .process_disbursement(w.admin.id, approved.id, PayoutResult::Succeeded)
        .await
        .unwrap();
    assert_eq!(processed.status, DisbursementStatus::Processed);
    assert_eq!(w.funds_raised(&campaign).await, dec!(300));
    w.assert_invariant(&campaign).await;
}

#[tokio::test]
async fn test_invariant_after_mixed_sequence() {
    let w = world().await;
    let campaign = w.approved_campaign(dec!(5000)).await;

    for amount in [dec!(120.50), dec!(80), dec!(999.99)] {
        w.donate(&campaign, amount).await;
    }
    let failed = w.open_donation(&campaign, dec!(40)).await;
    w.gateway.settle(&failed.transaction_id, IntentStatus::Failed);
    w.funding.donations.confirm_donation(failed.id).await.unwrap();
    w.open_donation(&campaign, dec!(15)).await;

    let paid = w.request(&campaign, dec!(400)).await.unwrap();
    let bounced = w.request(&campaign, dec!(100)).await.unwrap();
    let rejected = w.request(&campaign, dec!(50)).await.unwrap();
    let disbursements = &w.funding.disbursements;
    disbursements.approve_disbursement(w.admin.id, paid.id, None).await.unwrap();
    disbursements.approve_disbursement(w.admin.id, bounced.id, None).await.unwrap();
    disbursements
        .process_disbursement(w.admin.id, paid.id, PayoutResult::Succeeded)
        .await
        .unwrap();
    disbursements
        .process_disbursement(
            w.admin.id,
            bounced.id,
            PayoutResult::Failed {
                reason: "Beneficiary account frozen".into(),
            },
        )
        .await
        .unwrap();
    disbursements
        .reject_disbursement(w.admin.id, rejected.id, None)
        .await
        .unwrap();

    let report = w.funding.ledger.verify_invariant(campaign.id).await.unwrap();
    assert!(report.holds());
    assert_eq!(report.completed_donations, dec!(1200.49));
    assert_eq!(report.processed_disbursements, dec!(400));
    assert_eq!(report.funds_raised, dec!(800.49));

    let balance = w.funding.ledger.balance(campaign.id).await.unwrap();
    assert_eq!(balance.reserved, dec!(0));
    assert_eq!(balance.available, dec!(800.49));
}
