//! Even cost split across all current travelers.

use crate::domain::entities::{Expense, Owed, RecordId, Traveler};
use std::collections::HashMap;

pub type OwedByTraveler = HashMap<RecordId, Owed>;

/// Sum of all expense amounts. Saturates instead of overflowing.
pub fn total_amount(expenses: &[Expense]) -> u64 {
    expenses
        .iter()
        .fold(0u64, |sum, expense| sum.saturating_add(expense.amount))
}

/// Every traveler owes `round(total / travelers, 2)`.
///
/// The rounding remainder is not redistributed: 10 split three ways is 3.33
/// each. No travelers means no split at all (empty map).
pub fn compute_owed(expenses: &[Expense], travelers: &[Traveler]) -> OwedByTraveler {
    let mut owed = OwedByTraveler::new();
    if travelers.is_empty() {
        return owed;
    }
    let share = even_share(total_amount(expenses), travelers.len());
    for traveler in travelers {
        owed.insert(traveler.id.clone(), share);
    }
    owed
}

/// `total / count` in cents, rounded half up.
fn even_share(total: u64, count: usize) -> Owed {
    let count = count as u128;
    let cents = (u128::from(total) * 200 + count) / (2 * count);
    Owed::from_cents(u64::try_from(cents).unwrap_or(u64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expense(id: &str, amount: u64) -> Expense {
        Expense {
            id: RecordId::new(id),
            category: "misc".into(),
            amount,
        }
    }

    fn traveler(id: &str) -> Traveler {
        Traveler {
            id: RecordId::new(id),
            name: id.to_uppercase(),
        }
    }

    #[test]
    fn splits_evenly() {
        let expenses = vec![expense("e1", 30), expense("e2", 20)];
        let travelers = vec![traveler("a"), traveler("b")];
        let owed = compute_owed(&expenses, &travelers);
        assert_eq!(owed.len(), 2);
        assert_eq!(owed[&RecordId::new("a")].to_string(), "25.00");
        assert_eq!(owed[&RecordId::new("b")].to_string(), "25.00");
    }

    #[test]
    fn no_travelers_means_no_split() {
        let expenses = vec![expense("e1", 10)];
        assert!(compute_owed(&expenses, &[]).is_empty());
        assert!(compute_owed(&[], &[]).is_empty());
    }

    #[test]
    fn remainder_is_not_reconciled() {
        let expenses = vec![expense("e1", 10)];
        let travelers = vec![traveler("a"), traveler("b"), traveler("c")];
        let owed = compute_owed(&expenses, &travelers);
        assert!(owed.values().all(|o| o.cents() == 333));
        let reassembled: u64 = owed.values().map(Owed::cents).sum();
        assert_eq!(reassembled, 999);
    }

    #[test]
    fn rounds_half_up() {
        // 1 / 8 = 0.125
        let travelers: Vec<_> = (0..8).map(|i| traveler(&format!("t{i}"))).collect();
        let owed = compute_owed(&[expense("e1", 1)], &travelers);
        assert!(owed.values().all(|o| o.to_string() == "0.13"));

        // 2 / 3 = 0.666..
        let owed = compute_owed(&[expense("e1", 2)], &travelers[..3]);
        assert!(owed.values().all(|o| o.to_string() == "0.67"));
    }

    #[test]
    fn share_matches_mean_for_many_inputs() {
        for n in 1..=7usize {
            let travelers: Vec<_> = (0..n).map(|i| traveler(&format!("t{i}"))).collect();
            for amounts in [vec![], vec![0], vec![1, 2, 3], vec![99, 1, 1000, 7]] {
                let expenses: Vec<_> = amounts
                    .iter()
                    .enumerate()
                    .map(|(i, a)| expense(&format!("e{i}"), *a))
                    .collect();
                let total: u64 = amounts.iter().sum();
                let expected = ((total as f64 / n as f64) * 100.0).round() as u64;
                let owed = compute_owed(&expenses, &travelers);
                assert_eq!(owed.len(), n);
                assert!(owed.values().all(|o| o.cents() == expected), "n={n} a={amounts:?}");
            }
        }
    }

    #[test]
    fn total_saturates() {
        let expenses = vec![expense("e1", u64::MAX), expense("e2", 5)];
        assert_eq!(total_amount(&expenses), u64::MAX);
        assert_eq!(total_amount(&[]), 0);
    }
}
