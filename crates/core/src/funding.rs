//! Wiring of the ledger and the three workflows over one store.

use std::sync::Arc;

use carefund_shared::types::Currency;

use crate::disbursement::DisbursementWorkflow;
use crate::donation::DonationWorkflow;
use crate::fraud::FraudWorkflow;
use crate::gateway::PaymentGateway;
use crate::ledger::CampaignLedger;
use crate::store::FundingStore;

/// Every funding operation, sharing one store and one gateway.
#[derive(Clone)]
pub struct FundingService {
    /// Campaign ledger and campaign administration.
    pub ledger: CampaignLedger,
    /// Donation intake.
    pub donations: DonationWorkflow,
    /// Disbursement payout.
    pub disbursements: DisbursementWorkflow,
    /// Fraud reporting.
    pub fraud: FraudWorkflow,
}

impl FundingService {
    /// Builds all workflows over `store`. Donation intents open in `currency`.
    pub fn new(
        store: Arc<dyn FundingStore>,
        gateway: Arc<dyn PaymentGateway>,
        currency: Currency,
    ) -> Self {
        Self {
            ledger: CampaignLedger::new(Arc::clone(&store)),
            donations: DonationWorkflow::new(Arc::clone(&store), gateway, currency),
            disbursements: DisbursementWorkflow::new(Arc::clone(&store)),
            fraud: FraudWorkflow::new(store),
        }
    }
}
