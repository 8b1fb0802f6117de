//! Derived budget metrics. Pure functions; nothing here touches the
//! store or the ambient clock.

use chrono::{DateTime, Utc};
use common::clock::days_until;
use serde::Serialize;

use crate::models::Budget;

/// Cents left before the limit, floored at zero.
pub fn remaining(budget: &Budget) -> i64 {
    (budget.limit_amount - budget.spent).max(0)
}

/// Spend as a percentage of the limit. A non-positive limit cannot be
/// divided by and reads as 0% used.
pub fn percentage_used(budget: &Budget) -> f64 {
    if budget.limit_amount <= 0 {
        return 0.0;
    }
    budget.spent as f64 / budget.limit_amount as f64 * 100.0
}

pub fn is_over_budget(budget: &Budget) -> bool {
    budget.spent > budget.limit_amount
}

/// Whole days until the period window closes, floored at zero.
pub fn days_remaining(budget: &Budget, now: DateTime<Utc>) -> i64 {
    days_until(now, budget.end_date).max(0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Threshold {
    #[serde(rename = "75")]
    At75Percent,
    #[serde(rename = "90")]
    At90Percent,
    #[serde(rename = "limit")]
    AtLimit,
}

/// The notification bands currently occupied, filtered by the budget's
/// flags. The bands do not overlap (75 ⇒ [75,90), 90 ⇒ [90,100),
/// limit ⇒ [100,∞)), so at most one tag comes back per call.
pub fn crossed_thresholds(budget: &Budget) -> Vec<Threshold> {
    let percentage = percentage_used(budget);
    let mut thresholds = Vec::new();

    if budget.notifications.at_75_percent && (75.0..90.0).contains(&percentage) {
        thresholds.push(Threshold::At75Percent);
    }
    if budget.notifications.at_90_percent && (90.0..100.0).contains(&percentage) {
        thresholds.push(Threshold::At90Percent);
    }
    if budget.notifications.at_limit && percentage >= 100.0 {
        thresholds.push(Threshold::AtLimit);
    }

    thresholds
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BudgetPeriod, NotificationFlags};
    use chrono::TimeZone;

    fn dt(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn budget(limit: i64, spent: i64) -> Budget {
        Budget {
            id: 1,
            user_id: 1,
            name: "Groceries".to_string(),
            category: "Food".to_string(),
            limit_amount: limit,
            period: BudgetPeriod::Monthly,
            spent,
            start_date: dt(2024, 3, 1),
            end_date: dt(2024, 4, 1),
            is_active: true,
            notifications: NotificationFlags::default(),
        }
    }

    #[test]
    fn test_remaining_floors_at_zero() {
        assert_eq!(remaining(&budget(40000, 15000)), 25000);
        assert_eq!(remaining(&budget(40000, 50000)), 0);
    }

    #[test]
    fn test_percentage_used_zero_limit_guard() {
        assert_eq!(percentage_used(&budget(0, 5000)), 0.0);
        assert_eq!(percentage_used(&budget(40000, 10000)), 25.0);
    }

    #[test]
    fn test_over_budget_is_strict() {
        assert!(!is_over_budget(&budget(40000, 40000)));
        assert!(is_over_budget(&budget(40000, 40001)));
    }

    #[test]
    fn test_days_remaining_clamps_after_window() {
        let b = budget(40000, 0);
        assert_eq!(days_remaining(&b, dt(2024, 3, 29)), 3);
        assert_eq!(days_remaining(&b, dt(2024, 4, 5)), 0);
    }

    #[test]
    fn test_thresholds_bands() {
        assert!(crossed_thresholds(&budget(10000, 7400)).is_empty());
        assert_eq!(
            crossed_thresholds(&budget(10000, 7500)),
            vec![Threshold::At75Percent]
        );
        assert_eq!(
            crossed_thresholds(&budget(10000, 9000)),
            vec![Threshold::At90Percent]
        );
    }

    #[test]
    fn test_threshold_at_exactly_limit_is_only_limit() {
        // 100% with every flag enabled: the 90 band is half-open, so
        // only the limit tag fires.
        assert_eq!(
            crossed_thresholds(&budget(10000, 10000)),
            vec![Threshold::AtLimit]
        );
    }

    #[test]
    fn test_threshold_limit_sticks_past_overage() {
        assert_eq!(
            crossed_thresholds(&budget(10000, 25000)),
            vec![Threshold::AtLimit]
        );
    }

    #[test]
    fn test_thresholds_respect_flags() {
        let mut b = budget(10000, 7600);
        b.notifications.at_75_percent = false;
        assert!(crossed_thresholds(&b).is_empty());

        let mut b = budget(10000, 12000);
        b.notifications.at_limit = false;
        assert!(crossed_thresholds(&b).is_empty());
    }
}
