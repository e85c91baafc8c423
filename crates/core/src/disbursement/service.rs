//! Disbursement state machine.

use chrono::Utc;

use carefund_shared::types::UserId;

use crate::disbursement::types::{
    BankDetails, Disbursement, DisbursementAction, DisbursementRequest, DisbursementStatus,
};
use crate::error::{FundingError, FundingResult};
use crate::identity::PartnerProfile;

/// Failure reason recorded on pending disbursements cancelled by confirmed fraud.
pub const FRAUD_CANCELLATION_REASON: &str = "Campaign suspended after confirmed fraud";

fn invalid(from: DisbursementStatus, to: DisbursementStatus) -> FundingError {
    FundingError::InvalidTransition {
        entity: "disbursement",
        from: from.as_str(),
        to: to.as_str(),
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Stateless service for disbursement transitions.
///
/// All methods are associated functions that validate a transition and return
/// the `DisbursementAction` to persist.
pub struct DisbursementService;

impl DisbursementService {
    /// Resolves the payout account, falling back to the partner profile.
    pub fn resolve_bank(
        request: &DisbursementRequest,
        profile: &PartnerProfile,
    ) -> FundingResult<BankDetails> {
        let account_number = non_blank(request.bank_account_number.as_deref())
            .or_else(|| non_blank(profile.bank_account_number.as_deref()));
        let bank_name = non_blank(request.bank_name.as_deref())
            .or_else(|| non_blank(profile.bank_name.as_deref()));

        match (account_number, bank_name) {
            (Some(account_number), Some(bank_name)) => Ok(BankDetails {
                account_number,
                bank_name,
            }),
            _ => Err(FundingError::Validation(
                "Bank account number and bank name are required".to_string(),
            )),
        }
    }

    /// Approve a pending disbursement.
    pub fn approve(
        current: DisbursementStatus,
        approved_by: UserId,
        approval_notes: Option<String>,
    ) -> FundingResult<DisbursementAction> {
        match current {
            DisbursementStatus::Pending => Ok(DisbursementAction::Approve {
                new_status: DisbursementStatus::Approved,
                approved_by,
                approved_at: Utc::now(),
                approval_notes,
            }),
            _ => Err(invalid(current, DisbursementStatus::Approved)),
        }
    }

    /// Reject a pending disbursement.
    pub fn reject(
        current: DisbursementStatus,
        rejected_by: UserId,
        notes: Option<String>,
    ) -> FundingResult<DisbursementAction> {
        match current {
            DisbursementStatus::Pending => Ok(DisbursementAction::Reject {
                new_status: DisbursementStatus::Failed,
                rejected_by,
                notes,
            }),
            _ => Err(invalid(current, DisbursementStatus::Failed)),
        }
    }

    /// Record a successful payout of an approved disbursement.
    pub fn process(current: DisbursementStatus) -> FundingResult<DisbursementAction> {
        match current {
            DisbursementStatus::Approved => Ok(DisbursementAction::Process {
                new_status: DisbursementStatus::Processed,
                processed_at: Utc::now(),
            }),
            _ => Err(invalid(current, DisbursementStatus::Processed)),
        }
    }

    /// Record a failed payout of an approved disbursement.
    pub fn fail_payout(
        current: DisbursementStatus,
        reason: String,
    ) -> FundingResult<DisbursementAction> {
        match current {
            DisbursementStatus::Approved => Ok(DisbursementAction::Fail {
                new_status: DisbursementStatus::Failed,
                reason,
            }),
            _ => Err(invalid(current, DisbursementStatus::Failed)),
        }
    }

    /// Cancel a pending disbursement because its campaign was suspended.
    pub fn cancel_for_fraud(current: DisbursementStatus) -> FundingResult<DisbursementAction> {
        match current {
            DisbursementStatus::Pending => Ok(DisbursementAction::Fail {
                new_status: DisbursementStatus::Failed,
                reason: FRAUD_CANCELLATION_REASON.to_string(),
            }),
            _ => Err(invalid(current, DisbursementStatus::Failed)),
        }
    }

    /// Applies a validated action to the disbursement record.
    pub fn apply(disbursement: &mut Disbursement, action: DisbursementAction) {
        disbursement.status = action.new_status();
        disbursement.updated_at = Utc::now();
        match action {
            DisbursementAction::Approve {
                approved_by,
                approved_at,
                approval_notes,
                ..
            } => {
                disbursement.approved_by = Some(approved_by);
                disbursement.approved_at = Some(approved_at);
                disbursement.approval_notes = approval_notes;
            }
            DisbursementAction::Reject {
                rejected_by, notes, ..
            } => {
                disbursement.approved_by = Some(rejected_by);
                disbursement.approval_notes = notes;
                disbursement.failure_reason = Some("Rejected by reviewer".to_string());
            }
            DisbursementAction::Process { processed_at, .. } => {
                disbursement.processed_at = Some(processed_at);
            }
            DisbursementAction::Fail { reason, .. } => {
                disbursement.failure_reason = Some(reason);
            }
        }
    }

    /// Check if a status transition is valid.
    ///
    /// Valid transitions:
    /// - Pending → Approved (approve)
    /// - Pending → Failed (reject, fraud cancellation)
    /// - Approved → Processed (payout succeeded)
    /// - Approved → Failed (payout failed)
    #[must_use]
    pub fn is_valid_transition(from: DisbursementStatus, to: DisbursementStatus) -> bool {
        matches!(
            (from, to),
            (
                DisbursementStatus::Pending,
                DisbursementStatus::Approved | DisbursementStatus::Failed
            ) | (
                DisbursementStatus::Approved,
                DisbursementStatus::Processed | DisbursementStatus::Failed
            )
        )
    }
}
