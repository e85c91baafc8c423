//! Fraud report state machine.

use chrono::Utc;

use carefund_shared::types::UserId;

use crate::error::{FundingError, FundingResult};
use crate::fraud::types::{FraudAction, FraudReport, FraudReportStatus, NewFraudReport};

/// Longest report description accepted.
pub const MAX_DESCRIPTION_LEN: usize = 5000;

fn invalid(from: FraudReportStatus, to: FraudReportStatus) -> FundingError {
    FundingError::InvalidTransition {
        entity: "fraud report",
        from: from.as_str(),
        to: to.as_str(),
    }
}

fn clean(notes: Option<String>) -> Option<String> {
    notes.map(|n| n.trim().to_string()).filter(|n| !n.is_empty())
}

/// Stateless service for fraud report transitions.
pub struct FraudService;

impl FraudService {
    /// Validates a new report.
    pub fn validate_new(input: &NewFraudReport) -> FundingResult<()> {
        let description = input.description.trim();
        if description.is_empty() {
            return Err(FundingError::Validation("Description is required".to_string()));
        }
        if description.chars().count() > MAX_DESCRIPTION_LEN {
            return Err(FundingError::Validation(format!(
                "Description must be at most {MAX_DESCRIPTION_LEN} characters"
            )));
        }
        Ok(())
    }

    /// Start investigating a pending report.
    pub fn investigate(
        current: FraudReportStatus,
        reviewed_by: UserId,
        notes: Option<String>,
    ) -> FundingResult<FraudAction> {
        match current {
            FraudReportStatus::Pending => Ok(FraudAction {
                new_status: FraudReportStatus::Investigating,
                reviewed_by,
                notes: clean(notes),
            }),
            _ => Err(invalid(current, FraudReportStatus::Investigating)),
        }
    }

    /// Confirm fraud. The caller must suspend the campaign in the same transaction.
    pub fn confirm(
        current: FraudReportStatus,
        reviewed_by: UserId,
        notes: Option<String>,
    ) -> FundingResult<FraudAction> {
        match current {
            FraudReportStatus::Pending | FraudReportStatus::Investigating => Ok(FraudAction {
                new_status: FraudReportStatus::Confirmed,
                reviewed_by,
                notes: clean(notes),
            }),
            _ => Err(invalid(current, FraudReportStatus::Confirmed)),
        }
    }

    /// Dismiss a report. No campaign effect.
    pub fn dismiss(
        current: FraudReportStatus,
        reviewed_by: UserId,
        notes: Option<String>,
    ) -> FundingResult<FraudAction> {
        match current {
            FraudReportStatus::Pending | FraudReportStatus::Investigating => Ok(FraudAction {
                new_status: FraudReportStatus::Dismissed,
                reviewed_by,
                notes: clean(notes),
            }),
            _ => Err(invalid(current, FraudReportStatus::Dismissed)),
        }
    }

    /// Applies a validated action. Notes accumulate, one line per review step.
    pub fn apply(report: &mut FraudReport, action: FraudAction) {
        report.status = action.new_status;
        report.reviewed_by = Some(action.reviewed_by);
        report.updated_at = Utc::now();
        if let Some(notes) = action.notes {
            report.investigation_notes = Some(match report.investigation_notes.take() {
                Some(existing) => format!("{existing}\n{notes}"),
                None => notes,
            });
        }
    }

    /// Check if a status transition is valid.
    ///
    /// Valid transitions:
    /// - Pending → Investigating
    /// - Pending | Investigating → Confirmed | Dismissed
    #[must_use]
    pub fn is_valid_transition(from: FraudReportStatus, to: FraudReportStatus) -> bool {
        matches!(
            (from, to),
            (FraudReportStatus::Pending, FraudReportStatus::Investigating)
                | (
                    FraudReportStatus::Pending | FraudReportStatus::Investigating,
                    FraudReportStatus::Confirmed | FraudReportStatus::Dismissed
                )
        )
    }
}
