//! Entity re-exports.

pub use super::campaigns::Entity as Campaigns;
pub use super::disbursements::Entity as Disbursements;
pub use super::donations::Entity as Donations;
pub use super::fraud_reports::Entity as FraudReports;
pub use super::payment_records::Entity as PaymentRecords;
pub use super::users::Entity as Users;
