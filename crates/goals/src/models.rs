use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalType {
    Savings,
    DebtPayoff,
    Investment,
    EmergencyFund,
    Vacation,
    Purchase,
    Other,
}

impl GoalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GoalType::Savings => "savings",
            GoalType::DebtPayoff => "debt_payoff",
            GoalType::Investment => "investment",
            GoalType::EmergencyFund => "emergency_fund",
            GoalType::Vacation => "vacation",
            GoalType::Purchase => "purchase",
            GoalType::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Result<Self, String> {
        match s {
            "savings" => Ok(GoalType::Savings),
            "debt_payoff" => Ok(GoalType::DebtPayoff),
            "investment" => Ok(GoalType::Investment),
            "emergency_fund" => Ok(GoalType::EmergencyFund),
            "vacation" => Ok(GoalType::Vacation),
            "purchase" => Ok(GoalType::Purchase),
            "other" => Ok(GoalType::Other),
            other => Err(format!("Unknown goal type: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalPriority {
    Low,
    Medium,
    High,
}

impl GoalPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            GoalPriority::Low => "low",
            GoalPriority::Medium => "medium",
            GoalPriority::High => "high",
        }
    }

    pub fn parse(s: &str) -> Result<Self, String> {
        match s {
            "low" => Ok(GoalPriority::Low),
            "medium" => Ok(GoalPriority::Medium),
            "high" => Ok(GoalPriority::High),
            other => Err(format!("Unknown goal priority: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub target_amount: i64, // Cents
    pub current_amount: i64, // Cents
    pub target_date: DateTime<Utc>,
    pub goal_type: GoalType,
    pub priority: GoalPriority,
    pub is_active: bool,
    pub is_achieved: bool,
    pub achieved_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RawCreateGoalRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    #[validate(range(min = 0.01))]
    pub target_amount_dollars: f64,
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub current_amount_dollars: f64,
    pub target_date: DateTime<Utc>,
    pub goal_type: String,
    pub priority: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateGoalRequest {
    name: String,
    description: Option<String>,
    target_amount: i64,
    current_amount: i64,
    target_date: DateTime<Utc>,
    goal_type: GoalType,
    priority: GoalPriority,
}

impl CreateGoalRequest {
    /// `now` is needed because a goal's target date must be strictly in
    /// the future at creation.
    pub fn new(raw: RawCreateGoalRequest, now: DateTime<Utc>) -> Result<Self, String> {
        if raw.name.trim().is_empty() {
            return Err("Goal name cannot be empty".to_string());
        }
        if raw.target_amount_dollars <= 0.0 {
            return Err("Target amount must be a positive number".to_string());
        }
        if raw.current_amount_dollars < 0.0 {
            return Err("Current amount must be a non-negative number".to_string());
        }
        if raw.target_date <= now {
            return Err("Target date must be in the future".to_string());
        }
        let goal_type = GoalType::parse(&raw.goal_type)?;
        let priority = match raw.priority.as_deref() {
            Some(p) => GoalPriority::parse(p)?,
            None => GoalPriority::Medium,
        };

        Ok(Self {
            name: raw.name.trim().to_string(),
            description: raw
                .description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
            target_amount: (raw.target_amount_dollars * 100.0).round() as i64,
            current_amount: (raw.current_amount_dollars * 100.0).round() as i64,
            target_date: raw.target_date,
            goal_type,
            priority,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn target_amount(&self) -> i64 {
        self.target_amount
    }

    pub fn current_amount(&self) -> i64 {
        self.current_amount
    }

    pub fn target_date(&self) -> DateTime<Utc> {
        self.target_date
    }

    pub fn goal_type(&self) -> GoalType {
        self.goal_type
    }

    pub fn priority(&self) -> GoalPriority {
        self.priority
    }

    pub fn is_achieved(&self) -> bool {
        self.current_amount >= self.target_amount
    }
}

// Read model: the goal plus every derived metric, including the
// completion projection.
#[derive(Debug, Serialize)]
pub struct GoalView {
    #[serde(flatten)]
    pub goal: Goal,
    pub progress_percentage: f64,
    pub remaining_amount: i64,
    pub days_remaining: i64,
    pub monthly_contribution_needed: i64,
    pub expected_progress: f64,
    pub is_on_track: bool,
    pub projected_completion_date: Option<DateTime<Utc>>,
}

impl GoalView {
    pub fn new(goal: Goal, now: DateTime<Utc>) -> Self {
        use crate::progress;

        let progress_percentage = progress::progress_percentage(&goal);
        let remaining_amount = progress::remaining_amount(&goal);
        let days_remaining = progress::days_remaining(&goal, now);
        let monthly_contribution_needed = progress::monthly_contribution_needed(&goal, now);
        let expected_progress = progress::expected_progress(&goal, now);
        let is_on_track = progress::is_on_track(&goal, now);
        let projected_completion_date = progress::projected_completion_date(&goal, now);

        Self {
            goal,
            progress_percentage,
            remaining_amount,
            days_remaining,
            monthly_contribution_needed,
            expected_progress,
            is_on_track,
            projected_completion_date,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn dt(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn raw() -> RawCreateGoalRequest {
        RawCreateGoalRequest {
            name: "Emergency fund".to_string(),
            description: Some("Six months of expenses".to_string()),
            target_amount_dollars: 10000.0,
            current_amount_dollars: 0.0,
            target_date: dt(2025, 1, 1),
            goal_type: "emergency_fund".to_string(),
            priority: None,
        }
    }

    #[test]
    fn test_create_goal_request_defaults_priority() {
        let req = CreateGoalRequest::new(raw(), dt(2024, 1, 1)).unwrap();
        assert_eq!(req.priority(), GoalPriority::Medium);
        assert_eq!(req.target_amount(), 1000000);
        assert!(!req.is_achieved());
    }

    #[test]
    fn test_create_goal_request_rejects_past_target_date() {
        assert!(CreateGoalRequest::new(raw(), dt(2025, 1, 1)).is_err());
        assert!(CreateGoalRequest::new(raw(), dt(2025, 6, 1)).is_err());
    }

    #[test]
    fn test_create_goal_request_rejects_zero_target() {
        let mut r = raw();
        r.target_amount_dollars = 0.0;
        assert!(CreateGoalRequest::new(r, dt(2024, 1, 1)).is_err());
    }

    #[test]
    fn test_create_goal_request_unknown_type() {
        let mut r = raw();
        r.goal_type = "lottery".to_string();
        assert!(CreateGoalRequest::new(r, dt(2024, 1, 1)).is_err());
    }
}
