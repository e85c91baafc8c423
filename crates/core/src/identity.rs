//! Platform users and their role-specific profiles.
//!
//! A user carries exactly one role. Workflows match on it exhaustively to
//! decide what the actor may do; there is no role inheritance.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use carefund_shared::types::UserId;

use crate::error::{FundingError, FundingResult};
use crate::store::FundingStore;

/// Running totals kept for a donor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DonorProfile {
    /// Sum of the donor's completed, non-anonymous donations.
    pub total_donated: Decimal,
}

/// Organisation details for a fundraising partner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartnerProfile {
    /// Registered name of the organisation.
    pub organization_name: String,
    /// Default payout account.
    pub bank_account_number: Option<String>,
    /// Bank holding the payout account.
    pub bank_name: Option<String>,
    /// Whether the platform has verified the organisation.
    pub is_verified: bool,
}

/// Administrator settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AdminProfile {
    /// Super admins may manage other admins.
    pub super_admin: bool,
}

/// Role tag with its payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Role {
    /// Gives money to campaigns.
    Donor(DonorProfile),
    /// Runs campaigns and receives payouts.
    Partner(PartnerProfile),
    /// Reviews campaigns, payouts and fraud reports.
    Admin(AdminProfile),
}

/// Payload-free role discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleKind {
    /// Donor
    Donor,
    /// Partner
    Partner,
    /// Admin
    Admin,
}

impl RoleKind {
    /// Returns the string representation of the role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Donor => "donor",
            Self::Partner => "partner",
            Self::Admin => "admin",
        }
    }

    /// Parses a role from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "donor" => Some(Self::Donor),
            "partner" => Some(Self::Partner),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

impl fmt::Display for RoleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Role {
    /// Returns the discriminant.
    #[must_use]
    pub fn kind(&self) -> RoleKind {
        match self {
            Self::Donor(_) => RoleKind::Donor,
            Self::Partner(_) => RoleKind::Partner,
            Self::Admin(_) => RoleKind::Admin,
        }
    }
}

/// An authenticated platform user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// User id.
    pub id: UserId,
    /// Login email.
    pub email: String,
    /// Name shown on campaigns and donations.
    pub display_name: String,
    /// Deactivated users cannot act.
    pub is_active: bool,
    /// Role and profile.
    pub role: Role,
    /// Registration timestamp.
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Creates an active user.
    #[must_use]
    pub fn new(email: impl Into<String>, display_name: impl Into<String>, role: Role) -> Self {
        Self {
            id: UserId::new(),
            email: email.into(),
            display_name: display_name.into(),
            is_active: true,
            role,
            created_at: Utc::now(),
        }
    }

    fn ensure_active(&self) -> FundingResult<()> {
        if self.is_active {
            Ok(())
        } else {
            Err(FundingError::Unauthorized(format!("User {} is deactivated", self.id)))
        }
    }

    fn wrong_role(&self, expected: RoleKind) -> FundingError {
        FundingError::Unauthorized(format!(
            "User {} is a {}, this action requires a {}",
            self.id,
            self.role.kind(),
            expected
        ))
    }

    /// Returns the admin profile of an active admin.
    pub fn require_admin(&self) -> FundingResult<&AdminProfile> {
        self.ensure_active()?;
        match &self.role {
            Role::Admin(profile) => Ok(profile),
            Role::Donor(_) | Role::Partner(_) => Err(self.wrong_role(RoleKind::Admin)),
        }
    }

    /// Returns the partner profile of an active partner.
    pub fn require_partner(&self) -> FundingResult<&PartnerProfile> {
        self.ensure_active()?;
        match &self.role {
            Role::Partner(profile) => Ok(profile),
            Role::Donor(_) | Role::Admin(_) => Err(self.wrong_role(RoleKind::Partner)),
        }
    }

    /// Returns the donor profile of an active donor.
    pub fn require_donor(&self) -> FundingResult<&DonorProfile> {
        self.ensure_active()?;
        match &self.role {
            Role::Donor(profile) => Ok(profile),
            Role::Partner(_) | Role::Admin(_) => Err(self.wrong_role(RoleKind::Donor)),
        }
    }

    /// Requires any active user, whatever the role.
    pub fn require_active(&self) -> FundingResult<()> {
        self.ensure_active()
    }

    /// Adds a completed donation to the donor's running total.
    ///
    /// Returns false, leaving the user untouched, when the user is not a donor.
    pub fn record_donation(&mut self, amount: Decimal) -> bool {
        match &mut self.role {
            Role::Donor(profile) => {
                profile.total_donated += amount;
                true
            }
            Role::Partner(_) | Role::Admin(_) => false,
        }
    }
}

/// Loads the acting user named by an already-authenticated identity.
///
/// An id with no matching user is an authorization failure, not a lookup miss.
pub async fn load_actor(store: &dyn FundingStore, id: UserId) -> FundingResult<User> {
    store
        .find_user(id)
        .await?
        .ok_or_else(|| FundingError::Unauthorized(format!("Unknown user {id}")))
}
