use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{Cents, Expense, Participant, ParticipantId, Settlement, money};

/// Net position of one participant.
/// Positive: the group owes them. Negative: they owe the group. Zero: settled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Balance {
    pub participant_id: ParticipantId,
    pub name: String,
    #[serde(with = "money::decimal")]
    pub net: Cents,
}

impl Balance {
    pub fn is_creditor(&self) -> bool {
        self.net > 0
    }

    pub fn is_debtor(&self) -> bool {
        self.net < 0
    }

    pub fn is_settled(&self) -> bool {
        self.net == 0
    }
}

/// Per-participant running totals, indexed by input position.
struct Accumulator {
    index: HashMap<ParticipantId, usize>,
    totals: Vec<Cents>,
}

impl Accumulator {
    fn new(participants: &[Participant]) -> Self {
        Self {
            index: participants
                .iter()
                .enumerate()
                .map(|(i, p)| (p.id, i))
                .collect(),
            totals: vec![0; participants.len()],
        }
    }

    /// Unknown participants are skipped, not rejected.
    fn add(&mut self, participant_id: ParticipantId, amount: Cents) {
        if let Some(&i) = self.index.get(&participant_id) {
            self.totals[i] += amount;
        }
    }
}

/// Compute one net balance per participant, in input order.
///
/// - the payer of an expense is credited its full amount;
/// - every split debits its participant by the share (even when the expense
///   has no payer, in which case nobody is credited);
/// - a settlement credits the paying debtor (`from_id`) and debits the
///   receiving creditor (`to_id`).
///
/// References to participants outside `participants` are ignored.
pub fn compute_balances(
    participants: &[Participant],
    expenses: &[Expense],
    settlements: &[Settlement],
) -> Vec<Balance> {
    let mut acc = Accumulator::new(participants);

    for expense in expenses {
        if let Some(payer) = expense.paid_by {
            acc.add(payer, expense.amount_cents);
        }
        for split in &expense.splits {
            acc.add(split.participant_id, -split.amount_cents);
        }
    }

    for settlement in settlements {
        acc.add(settlement.from_id, settlement.amount_cents);
        acc.add(settlement.to_id, -settlement.amount_cents);
    }

    participants
        .iter()
        .zip(acc.totals)
        .map(|(participant, net)| Balance {
            participant_id: participant.id,
            name: participant.name.clone(),
            net,
        })
        .collect()
}

/// Sum of all net balances. Zero for any consistent ledger.
pub fn total_net(balances: &[Balance]) -> Cents {
    balances.iter().map(|b| b.net).sum()
}

/// Total credit still outstanding (sum of positive balances).
pub fn outstanding_credit(balances: &[Balance]) -> Cents {
    balances.iter().map(|b| b.net.max(0)).sum()
}
