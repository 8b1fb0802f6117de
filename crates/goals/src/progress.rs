//! Goal progress and completion projection. Pure functions over a
//! loaded goal and an explicit "now"; persistence of the achievement
//! flags is the caller's job.

use chrono::{DateTime, Duration, Utc};
use common::clock::days_until;

use crate::models::Goal;

/// Tolerance band for the on-track check, in percentage points.
const ON_TRACK_TOLERANCE: f64 = 5.0;

const AVG_DAYS_PER_MONTH: f64 = 30.44;
const MS_PER_DAY: f64 = 86_400_000.0;

/// Progress toward the target, capped at 100. A non-positive target
/// reads as 0% rather than dividing by zero.
pub fn progress_percentage(goal: &Goal) -> f64 {
    if goal.target_amount <= 0 {
        return 0.0;
    }
    (goal.current_amount as f64 / goal.target_amount as f64 * 100.0).min(100.0)
}

/// Cents still to contribute, floored at zero.
pub fn remaining_amount(goal: &Goal) -> i64 {
    (goal.target_amount - goal.current_amount).max(0)
}

/// Whole days until the target date, floored at zero.
pub fn days_remaining(goal: &Goal, now: DateTime<Utc>) -> i64 {
    days_until(now, goal.target_date).max(0)
}

/// Cents per month needed to land on the target date, using the
/// 30.44-day average month. Zero when there is no time or nothing left.
pub fn monthly_contribution_needed(goal: &Goal, now: DateTime<Utc>) -> i64 {
    let remaining = remaining_amount(goal);
    let days = days_remaining(goal, now);
    if days <= 0 || remaining <= 0 {
        return 0;
    }
    let months_remaining = days as f64 / AVG_DAYS_PER_MONTH;
    (remaining as f64 / months_remaining).round() as i64
}

/// Where a linear schedule from creation to target date says progress
/// should be by `now`, as a percentage in [0, 100].
pub fn expected_progress(goal: &Goal, now: DateTime<Utc>) -> f64 {
    let total = (goal.target_date - goal.created_at).num_milliseconds();
    let elapsed = (now - goal.created_at).num_milliseconds();

    if total <= 0 {
        // Degenerate schedule: the goal should already be complete.
        return 100.0;
    }
    if elapsed <= 0 {
        return 0.0;
    }
    (elapsed as f64 / total as f64 * 100.0).min(100.0)
}

pub fn is_on_track(goal: &Goal, now: DateTime<Utc>) -> bool {
    progress_percentage(goal) >= expected_progress(goal, now) - ON_TRACK_TOLERANCE
}

/// Average contribution velocity in cents per day over the goal's
/// whole lifetime since `created_at`.
pub fn daily_contribution_rate(goal: &Goal, now: DateTime<Utc>) -> f64 {
    let days_since_creation = ((now - goal.created_at).num_milliseconds() as f64 / MS_PER_DAY)
        .max(1.0);
    goal.current_amount as f64 / days_since_creation
}

/// When the goal will complete at the current velocity.
///
/// Achieved goals report their achieved date (completion is a fact,
/// not a projection). `None` means the velocity is zero and no
/// completion can be projected; that is a definite answer, not an
/// error.
pub fn projected_completion_date(goal: &Goal, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    if goal.is_achieved {
        return goal.achieved_date;
    }

    let remaining = remaining_amount(goal);
    if remaining <= 0 {
        return Some(now);
    }

    let rate = daily_contribution_rate(goal, now);
    if rate <= 0.0 {
        return None;
    }

    let days_to_completion = remaining as f64 / rate;
    Some(now + Duration::milliseconds((days_to_completion * MS_PER_DAY) as i64))
}

/// Re-derives the achievement invariant after an amount mutation:
/// `is_achieved` holds exactly when the target is reached, and
/// `achieved_date` moves in lockstep. Returns true when either field
/// changed and needs persisting. Both directions are reachable:
/// raising the target un-achieves a previously achieved goal.
pub fn reconcile_achievement(goal: &mut Goal, now: DateTime<Utc>) -> bool {
    if goal.current_amount >= goal.target_amount && !goal.is_achieved {
        goal.is_achieved = true;
        goal.achieved_date = Some(now);
        true
    } else if goal.current_amount < goal.target_amount && goal.is_achieved {
        goal.is_achieved = false;
        goal.achieved_date = None;
        true
    } else {
        false
    }
}
