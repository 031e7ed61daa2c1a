use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use super::{
    Cents, Expense, ExpenseId, Participant, ParticipantId, Settlement, SettlementId,
    compute_balances, format_cents, total_net,
};

/// Something that keeps a trip's ledger from summing to zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IntegrityIssue {
    /// Split shares do not add up to the expense amount.
    UnevenSplit {
        expense_id: ExpenseId,
        amount: Cents,
        split_total: Cents,
    },
    /// Nobody is credited for this expense.
    MissingPayer { expense_id: ExpenseId },
    /// An expense names a payer or split participant outside the trip.
    UnknownExpenseParticipant {
        expense_id: ExpenseId,
        participant_id: ParticipantId,
    },
    /// A settlement names a participant outside the trip.
    UnknownSettlementParticipant {
        settlement_id: SettlementId,
        participant_id: ParticipantId,
    },
}

impl fmt::Display for IntegrityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntegrityIssue::UnevenSplit {
                expense_id,
                amount,
                split_total,
            } => write!(
                f,
                "expense {} is {} but its splits total {}",
                expense_id,
                format_cents(*amount),
                format_cents(*split_total)
            ),
            IntegrityIssue::MissingPayer { expense_id } => {
                write!(f, "expense {} has no payer", expense_id)
            }
            IntegrityIssue::UnknownExpenseParticipant {
                expense_id,
                participant_id,
            } => write!(
                f,
                "expense {} references unknown participant {}",
                expense_id, participant_id
            ),
            IntegrityIssue::UnknownSettlementParticipant {
                settlement_id,
                participant_id,
            } => write!(
                f,
                "settlement {} references unknown participant {}",
                settlement_id, participant_id
            ),
        }
    }
}

/// Read-only diagnosis of a trip ledger.
#[derive(Debug, Clone, Serialize)]
pub struct IntegrityReport {
    pub participant_count: usize,
    pub expense_count: usize,
    pub settlement_count: usize,
    /// Sum of all net balances; zero when the ledger is consistent.
    pub imbalance: Cents,
    pub issues: Vec<IntegrityIssue>,
}

impl IntegrityReport {
    pub fn is_balanced(&self) -> bool {
        self.imbalance == 0
    }

    pub fn is_healthy(&self) -> bool {
        self.issues.is_empty() && self.is_balanced()
    }
}

/// Inspect a trip snapshot for the records that break the zero-sum rule.
pub fn check_integrity(
    participants: &[Participant],
    expenses: &[Expense],
    settlements: &[Settlement],
) -> IntegrityReport {
    let known: HashSet<ParticipantId> = participants.iter().map(|p| p.id).collect();
    let mut issues = Vec::new();

    for expense in expenses {
        match expense.paid_by {
            None => issues.push(IntegrityIssue::MissingPayer {
                expense_id: expense.id,
            }),
            Some(payer) if !known.contains(&payer) => {
                issues.push(IntegrityIssue::UnknownExpenseParticipant {
                    expense_id: expense.id,
                    participant_id: payer,
                })
            }
            Some(_) => {}
        }

        for split in &expense.splits {
            if !known.contains(&split.participant_id) {
                issues.push(IntegrityIssue::UnknownExpenseParticipant {
                    expense_id: expense.id,
                    participant_id: split.participant_id,
                });
            }
        }

        if !expense.is_fully_split() {
            issues.push(IntegrityIssue::UnevenSplit {
                expense_id: expense.id,
                amount: expense.amount_cents,
                split_total: expense.split_total(),
            });
        }
    }

    for settlement in settlements {
        for id in [settlement.from_id, settlement.to_id] {
            if !known.contains(&id) {
                issues.push(IntegrityIssue::UnknownSettlementParticipant {
                    settlement_id: settlement.id,
                    participant_id: id,
                });
            }
        }
    }

    let balances = compute_balances(participants, expenses, settlements);

    IntegrityReport {
        participant_count: participants.len(),
        expense_count: expenses.len(),
        settlement_count: settlements.len(),
        imbalance: total_net(&balances),
        issues,
    }
}
