use serde::{Deserialize, Serialize};

use super::{Balance, Cents, ParticipantId, ParticipantRef, money};

/// A suggested payment that would help clear the ledger. Not recorded until
/// someone turns it into a settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub from: ParticipantRef,
    pub to: ParticipantRef,
    /// Always positive
    #[serde(with = "money::decimal")]
    pub amount: Cents,
}

/// Remaining amount of one side of the matching.
struct Position {
    who: ParticipantRef,
    remaining: Cents,
}

/// Amounts are whole cents, so anything below half a cent is already zero.
fn is_cleared(amount: Cents) -> bool {
    amount <= 0
}

/// Plan payments that bring every balance to zero, largest amounts first.
///
/// Creditors and debtors are each sorted by amount, largest first (ties keep
/// input order). Two cursors then walk both lists: each step moves
/// `min(creditor, debtor)` from the current debtor to the current creditor
/// and advances whichever side (or both) is cleared.
///
/// At most `#creditors + #debtors - 1` transactions are produced. This is a
/// greedy heuristic, not a minimum-count solver.
pub fn plan_settlements(balances: &[Balance]) -> Vec<Transaction> {
    let mut creditors: Vec<Position> = balances
        .iter()
        .filter(|b| b.is_creditor())
        .map(|b| Position {
            who: ParticipantRef {
                id: b.participant_id,
                name: b.name.clone(),
            },
            remaining: b.net,
        })
        .collect();
    let mut debtors: Vec<Position> = balances
        .iter()
        .filter(|b| b.is_debtor())
        .map(|b| Position {
            who: ParticipantRef {
                id: b.participant_id,
                name: b.name.clone(),
            },
            remaining: -b.net,
        })
        .collect();

    // sort_by is stable: equal amounts keep input order
    creditors.sort_by(|a, b| b.remaining.cmp(&a.remaining));
    debtors.sort_by(|a, b| b.remaining.cmp(&a.remaining));

    let mut transactions = Vec::new();
    let (mut ci, mut di) = (0, 0);

    while ci < creditors.len() && di < debtors.len() {
        let settle = creditors[ci].remaining.min(debtors[di].remaining);

        if settle > 0 {
            transactions.push(Transaction {
                from: debtors[di].who.clone(),
                to: creditors[ci].who.clone(),
                amount: settle,
            });
        }

        creditors[ci].remaining -= settle;
        debtors[di].remaining -= settle;

        if is_cleared(creditors[ci].remaining) {
            ci += 1;
        }
        if is_cleared(debtors[di].remaining) {
            di += 1;
        }
    }

    tracing::debug!(
        creditors = creditors.len(),
        debtors = debtors.len(),
        transactions = transactions.len(),
        "planned settlements"
    );

    transactions
}

/// Balances as they would be once every transaction had been paid.
pub fn apply_transactions(balances: &[Balance], transactions: &[Transaction]) -> Vec<Balance> {
    let paid = |id: ParticipantId| -> Cents {
        transactions
            .iter()
            .map(|t| {
                if t.from.id == id {
                    t.amount
                } else if t.to.id == id {
                    -t.amount
                } else {
                    0
                }
            })
            .sum()
    };

    balances
        .iter()
        .map(|b| Balance {
            net: b.net + paid(b.participant_id),
            ..b.clone()
        })
        .collect()
}
