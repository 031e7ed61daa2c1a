use proptest::prelude::*;
use tripsplit::domain::{
    Balance, Expense, Participant, Settlement, Trip, apply_transactions, compute_balances,
    outstanding_credit, plan_settlements, split_evenly, total_net,
};

/// Balances that sum to zero: random debts, with the last participant
/// absorbing whatever is left.
fn zero_sum_balances() -> impl Strategy<Value = Vec<Balance>> {
    prop::collection::vec(-50_000i64..50_000, 1..12).prop_map(|mut nets| {
        let sum: i64 = nets.iter().sum();
        nets.push(-sum);
        nets.into_iter()
            .enumerate()
            .map(|(i, net)| Balance {
                participant_id: uuid::Uuid::new_v4(),
                name: format!("P{i}"),
                net,
            })
            .collect()
    })
}

proptest! {
    #[test]
    fn plan_pays_out_exactly_the_outstanding_credit(balances in zero_sum_balances()) {
        let plan = plan_settlements(&balances);
        let total: i64 = plan.iter().map(|t| t.amount).sum();
        prop_assert_eq!(total, outstanding_credit(&balances));
    }

    #[test]
    fn plan_amounts_are_positive_and_directed(balances in zero_sum_balances()) {
        let plan = plan_settlements(&balances);
        for t in &plan {
            prop_assert!(t.amount > 0);
            prop_assert_ne!(t.from.id, t.to.id);
            let from = balances.iter().find(|b| b.participant_id == t.from.id).unwrap();
            let to = balances.iter().find(|b| b.participant_id == t.to.id).unwrap();
            prop_assert!(from.is_debtor());
            prop_assert!(to.is_creditor());
        }
    }

    #[test]
    fn plan_clears_every_balance(balances in zero_sum_balances()) {
        let plan = plan_settlements(&balances);
        let after = apply_transactions(&balances, &plan);
        prop_assert!(after.iter().all(Balance::is_settled));
        prop_assert!(plan_settlements(&after).is_empty());
    }

    #[test]
    fn plan_stays_within_transaction_bound(balances in zero_sum_balances()) {
        let plan = plan_settlements(&balances);
        let creditors = balances.iter().filter(|b| b.is_creditor()).count();
        let debtors = balances.iter().filter(|b| b.is_debtor()).count();
        if creditors + debtors > 0 {
            prop_assert!(plan.len() <= creditors + debtors - 1);
        } else {
            prop_assert!(plan.is_empty());
        }
    }

    #[test]
    fn fully_split_expenses_sum_to_zero(
        people in 1usize..8,
        amounts in prop::collection::vec((0i64..100_000, 0usize..8), 0..20),
    ) {
        let trip = Trip::new("Property");
        let participants: Vec<_> = (0..people)
            .map(|i| Participant::new(trip.id, format!("P{i}")))
            .collect();
        let ids: Vec<_> = participants.iter().map(|p| p.id).collect();

        let expenses: Vec<_> = amounts
            .iter()
            .map(|&(amount, payer)| {
                Expense::new(trip.id, amount, chrono::Utc::now())
                    .with_payer(ids[payer % people])
                    .with_splits(split_evenly(amount, &ids))
            })
            .collect();

        let balances = compute_balances(&participants, &expenses, &[]);
        prop_assert_eq!(balances.len(), people);
        prop_assert_eq!(total_net(&balances), 0);
    }

    #[test]
    fn recording_the_plan_as_settlements_clears_the_ledger(
        people in 2usize..8,
        amounts in prop::collection::vec((1i64..100_000, 0usize..8), 1..15),
        payments in prop::collection::vec((0usize..8, 0usize..8, 1i64..50_000), 0..10),
    ) {
        let trip = Trip::new("Property");
        let participants: Vec<_> = (0..people)
            .map(|i| Participant::new(trip.id, format!("P{i}")))
            .collect();
        let ids: Vec<_> = participants.iter().map(|p| p.id).collect();

        let expenses: Vec<_> = amounts
            .iter()
            .map(|&(amount, payer)| {
                Expense::new(trip.id, amount, chrono::Utc::now())
                    .with_payer(ids[payer % people])
                    .with_splits(split_evenly(amount, &ids))
            })
            .collect();
        let mut settlements: Vec<_> = payments
            .iter()
            .filter(|&&(from, to, _)| from % people != to % people)
            .map(|&(from, to, amount)| {
                Settlement::new(trip.id, ids[from % people], ids[to % people], amount)
            })
            .collect();

        let balances = compute_balances(&participants, &expenses, &settlements);
        prop_assert_eq!(total_net(&balances), 0);

        let plan = plan_settlements(&balances);
        settlements.extend(
            plan.iter()
                .map(|t| Settlement::new(trip.id, t.from.id, t.to.id, t.amount)),
        );

        let after = compute_balances(&participants, &expenses, &settlements);
        prop_assert!(after.iter().all(Balance::is_settled));
        prop_assert!(plan_settlements(&after).is_empty());
    }
}

#[test]
fn empty_input_plans_nothing() {
    assert!(plan_settlements(&[]).is_empty());
    assert!(compute_balances(&[], &[], &[]).is_empty());
}
