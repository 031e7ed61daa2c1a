use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Cents, ParticipantId, TripId};

pub type ExpenseId = Uuid;
pub type SplitId = Uuid;

/// Money spent on behalf of the group. The payer (if any) fronted
/// `amount_cents`; each split is one participant's share of it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expense {
    pub id: ExpenseId,
    pub trip_id: TripId,
    pub description: Option<String>,
    /// Total amount in cents (never negative)
    pub amount_cents: Cents,
    /// Participant who paid. Expenses without a payer still debit their splits.
    pub paid_by: Option<ParticipantId>,
    pub splits: Vec<ExpenseSplit>,
    /// When the money was spent in the real world
    pub spent_at: DateTime<Utc>,
    /// When we recorded the expense
    pub created_at: DateTime<Utc>,
}

/// One participant's share of an expense.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseSplit {
    pub id: SplitId,
    pub expense_id: ExpenseId,
    pub participant_id: ParticipantId,
    pub amount_cents: Cents,
}

impl Expense {
    pub fn new(trip_id: TripId, amount_cents: Cents, spent_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            trip_id,
            description: None,
            amount_cents,
            paid_by: None,
            splits: Vec::new(),
            spent_at,
            created_at: Utc::now(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_payer(mut self, payer: ParticipantId) -> Self {
        self.paid_by = Some(payer);
        self
    }

    pub fn with_split(mut self, participant_id: ParticipantId, amount_cents: Cents) -> Self {
        self.splits.push(ExpenseSplit {
            id: Uuid::new_v4(),
            expense_id: self.id,
            participant_id,
            amount_cents,
        });
        self
    }

    pub fn with_splits(self, shares: impl IntoIterator<Item = (ParticipantId, Cents)>) -> Self {
        shares.into_iter().fold(self, |expense, (participant_id, amount)| {
            expense.with_split(participant_id, amount)
        })
    }

    /// Sum of all split amounts.
    pub fn split_total(&self) -> Cents {
        self.splits.iter().map(|s| s.amount_cents).sum()
    }

    /// True when the splits account for exactly the expense amount.
    /// Under-specified splits are allowed; they just leave the ledger unbalanced.
    pub fn is_fully_split(&self) -> bool {
        self.split_total() == self.amount_cents
    }

    /// Participant that appears more than once in this expense's splits, if any.
    pub fn duplicate_split_participant(&self) -> Option<ParticipantId> {
        self.splits.iter().enumerate().find_map(|(i, split)| {
            self.splits[..i]
                .iter()
                .any(|earlier| earlier.participant_id == split.participant_id)
                .then_some(split.participant_id)
        })
    }
}

/// Divide `amount_cents` into equal shares, one per participant.
/// Leftover cents go one each to the first participants, so the shares
/// always add up to the amount: 1000 over three is 334/333/333.
pub fn split_evenly(
    amount_cents: Cents,
    participants: &[ParticipantId],
) -> Vec<(ParticipantId, Cents)> {
    if participants.is_empty() {
        return Vec::new();
    }

    let count = participants.len() as Cents;
    // Euclidean division keeps the leftover in 0..count for negative amounts.
    let base = amount_cents.div_euclid(count);
    let remainder = amount_cents.rem_euclid(count) as usize;

    participants
        .iter()
        .enumerate()
        .map(|(i, id)| (*id, if i < remainder { base + 1 } else { base }))
        .collect()
}
