use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetPeriod {
    Monthly,
    Weekly,
    Yearly,
}

impl BudgetPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            BudgetPeriod::Monthly => "monthly",
            BudgetPeriod::Weekly => "weekly",
            BudgetPeriod::Yearly => "yearly",
        }
    }

    pub fn parse(s: &str) -> Result<Self, String> {
        match s {
            "monthly" => Ok(BudgetPeriod::Monthly),
            "weekly" => Ok(BudgetPeriod::Weekly),
            "yearly" => Ok(BudgetPeriod::Yearly),
            other => Err(format!("Unknown budget period: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationFlags {
    pub at_75_percent: bool,
    pub at_90_percent: bool,
    pub at_limit: bool,
}

impl Default for NotificationFlags {
    fn default() -> Self {
        Self {
            at_75_percent: true,
            at_90_percent: true,
            at_limit: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub category: String,
    pub limit_amount: i64, // Cents
    pub period: BudgetPeriod,
    pub spent: i64, // Cents
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub is_active: bool,
    pub notifications: NotificationFlags,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RawCreateBudgetRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 1, max = 50))]
    pub category: String,
    #[validate(range(min = 0.01))]
    pub limit_dollars: f64,
    pub period: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[serde(default)]
    pub notifications: NotificationFlags,
}

#[derive(Debug, Serialize)]
pub struct CreateBudgetRequest {
    name: String,
    category: String,
    limit_amount: i64,
    period: BudgetPeriod,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    notifications: NotificationFlags,
}

impl CreateBudgetRequest {
    pub fn new(raw: RawCreateBudgetRequest) -> Result<Self, String> {
        if raw.name.trim().is_empty() {
            return Err("Budget name cannot be empty".to_string());
        }
        if raw.limit_dollars <= 0.0 {
            return Err("Budget limit must be positive".to_string());
        }
        if raw.start_date >= raw.end_date {
            return Err("End date must be after start date".to_string());
        }
        let period = BudgetPeriod::parse(&raw.period)?;

        Ok(Self {
            name: raw.name.trim().to_string(),
            category: raw.category.trim().to_string(),
            limit_amount: (raw.limit_dollars * 100.0).round() as i64,
            period,
            start_date: raw.start_date,
            end_date: raw.end_date,
            notifications: raw.notifications,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn limit_amount(&self) -> i64 {
        self.limit_amount
    }

    pub fn period(&self) -> BudgetPeriod {
        self.period
    }

    pub fn start_date(&self) -> DateTime<Utc> {
        self.start_date
    }

    pub fn end_date(&self) -> DateTime<Utc> {
        self.end_date
    }

    pub fn notifications(&self) -> NotificationFlags {
        self.notifications
    }
}

// Read model: the budget plus its derived usage metrics.
#[derive(Debug, Serialize)]
pub struct BudgetView {
    #[serde(flatten)]
    pub budget: Budget,
    pub remaining: i64,
    pub percentage_used: f64,
    pub is_over_budget: bool,
    pub days_remaining: i64,
}

impl BudgetView {
    pub fn new(budget: Budget, now: DateTime<Utc>) -> Self {
        let remaining = crate::progress::remaining(&budget);
        let percentage_used = crate::progress::percentage_used(&budget);
        let is_over_budget = crate::progress::is_over_budget(&budget);
        let days_remaining = crate::progress::days_remaining(&budget, now);
        Self {
            budget,
            remaining,
            percentage_used,
            is_over_budget,
            days_remaining,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn raw() -> RawCreateBudgetRequest {
        RawCreateBudgetRequest {
            name: "Groceries".to_string(),
            category: "Food".to_string(),
            limit_dollars: 400.0,
            period: "monthly".to_string(),
            start_date: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
            end_date: Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap(),
            notifications: NotificationFlags::default(),
        }
    }

    #[test]
    fn test_create_budget_request_valid() {
        let req = CreateBudgetRequest::new(raw()).unwrap();
        assert_eq!(req.limit_amount(), 40000);
        assert_eq!(req.period(), BudgetPeriod::Monthly);
    }

    #[test]
    fn test_create_budget_request_inverted_window() {
        let mut r = raw();
        r.end_date = r.start_date;
        assert!(CreateBudgetRequest::new(r).is_err());
    }

    #[test]
    fn test_create_budget_request_zero_limit() {
        let mut r = raw();
        r.limit_dollars = 0.0;
        assert!(CreateBudgetRequest::new(r).is_err());
    }

    #[test]
    fn test_create_budget_request_unknown_period() {
        let mut r = raw();
        r.period = "daily".to_string();
        assert!(CreateBudgetRequest::new(r).is_err());
    }
}
