use serde::{Deserialize, Serialize};

use crate::domain::{
    Balance, Cents, Transaction, compute_balances, outstanding_credit, plan_settlements,
};
use crate::storage::LedgerSnapshot;

/// Answer to a balance query: every participant's net position plus the
/// payments that would clear them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripBalances {
    pub balances: Vec<Balance>,
    pub transactions: Vec<Transaction>,
}

impl TripBalances {
    /// Aggregate the snapshot, then plan settlements from the result.
    pub fn from_snapshot(snapshot: &LedgerSnapshot) -> Self {
        let balances = compute_balances(
            &snapshot.participants,
            &snapshot.expenses,
            &snapshot.settlements,
        );
        let transactions = plan_settlements(&balances);
        Self {
            balances,
            transactions,
        }
    }

    /// Total credit still owed to creditors.
    pub fn outstanding(&self) -> Cents {
        outstanding_credit(&self.balances)
    }

    pub fn is_settled(&self) -> bool {
        self.balances.iter().all(Balance::is_settled)
    }
}
