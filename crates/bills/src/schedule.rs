//! Recurrence arithmetic for bills.
//!
//! Everything here is pure: callers pass "now" explicitly and apply the
//! results (new due date, deactivation on expiry) through the
//! repository themselves.

use chrono::{DateTime, Duration, Months, Utc};
use common::clock::days_until;

use crate::models::{Bill, RecurrenceRule, RecurrenceType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NextOccurrence {
    pub due: DateTime<Utc>,
    /// The pattern ran past its end date. `due` then holds the last
    /// valid occurrence, and the bill must be deactivated in the same
    /// transaction that stores it.
    pub expired: bool,
}

fn step(from: DateTime<Utc>, rule: &RecurrenceRule) -> DateTime<Utc> {
    match rule.kind {
        RecurrenceType::Weekly => from + Duration::days(7 * i64::from(rule.interval)),
        // Calendar month arithmetic; chrono clamps overflow, so
        // Jan 31 + 1 month lands on the end of February.
        RecurrenceType::Monthly => from + Months::new(rule.interval),
        RecurrenceType::Yearly => from + Months::new(12 * rule.interval),
        RecurrenceType::Custom => from + Duration::days(i64::from(rule.interval)),
    }
}

/// Earliest occurrence of the pattern strictly after `now`, anchored at
/// `anchor`. A future anchor passes through unchanged.
pub fn next_occurrence(
    anchor: DateTime<Utc>,
    rule: &RecurrenceRule,
    now: DateTime<Utc>,
) -> NextOccurrence {
    if anchor > now {
        return NextOccurrence {
            due: anchor,
            expired: false,
        };
    }

    let mut next = anchor;
    let mut last_valid = anchor;
    while next <= now {
        if rule.end_date.map_or(true, |end| next <= end) {
            last_valid = next;
        }
        next = step(next, rule);
    }

    match rule.end_date {
        Some(end) if next > end => NextOccurrence {
            due: last_valid,
            expired: true,
        },
        _ => NextOccurrence {
            due: next,
            expired: false,
        },
    }
}

/// Whole days until the bill is due, rounded up. Negative once overdue.
pub fn days_until_due(bill: &Bill, now: DateTime<Utc>) -> i64 {
    days_until(now, bill.next_due_date)
}

pub fn is_overdue(bill: &Bill, now: DateTime<Utc>) -> bool {
    now > bill.next_due_date
}

/// A reminder fires only when the day count is non-negative and
/// explicitly listed. Overdue bills never remind; due-today reminds
/// only if 0 is listed.
pub fn should_send_reminder(bill: &Bill, now: DateTime<Utc>) -> bool {
    let days = days_until_due(bill, now);
    if days < 0 {
        return false;
    }
    u32::try_from(days)
        .map(|d| bill.reminder_days.contains(&d))
        .unwrap_or(false)
}

/// Schedule advance applied by `mark_as_paid`. Anchored at the current
/// `next_due_date`, so an early payment still moves a full cycle
/// forward rather than resetting to the payment time.
pub fn advance_after_payment(bill: &Bill, paid_date: DateTime<Utc>) -> NextOccurrence {
    let reference = paid_date.max(bill.next_due_date);
    next_occurrence(bill.next_due_date, &bill.recurrence, reference)
}
