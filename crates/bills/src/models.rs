use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

pub const MAX_REMINDER_DAYS: u32 = 365;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecurrenceType {
    Monthly,
    Weekly,
    Yearly,
    Custom,
}

impl RecurrenceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecurrenceType::Monthly => "monthly",
            RecurrenceType::Weekly => "weekly",
            RecurrenceType::Yearly => "yearly",
            RecurrenceType::Custom => "custom",
        }
    }

    pub fn parse(s: &str) -> Result<Self, String> {
        match s {
            "monthly" => Ok(RecurrenceType::Monthly),
            "weekly" => Ok(RecurrenceType::Weekly),
            "yearly" => Ok(RecurrenceType::Yearly),
            "custom" => Ok(RecurrenceType::Custom),
            other => Err(format!("Unknown recurrence type: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurrenceRule {
    #[serde(rename = "type")]
    pub kind: RecurrenceType,
    pub interval: u32,
    pub end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bill {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub amount: i64, // Cents
    pub category: String,
    pub due_date: DateTime<Utc>,
    pub recurrence: RecurrenceRule,
    pub reminder_days: Vec<u32>,
    pub is_auto_pay: bool,
    pub last_paid_date: Option<DateTime<Utc>>,
    pub next_due_date: DateTime<Utc>,
    pub is_active: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RawCreateBillRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(range(min = 0.0))]
    pub amount_dollars: f64,
    #[validate(length(min = 1, max = 50))]
    pub category: String,
    pub due_date: DateTime<Utc>,
    pub recurrence_type: String,
    #[validate(range(min = 1))]
    pub recurrence_interval: u32,
    pub recurrence_end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reminder_days: Vec<u32>,
    #[serde(default)]
    pub is_auto_pay: bool,
}

#[derive(Debug, Serialize)]
pub struct CreateBillRequest {
    name: String,
    amount: i64,
    category: String,
    due_date: DateTime<Utc>,
    recurrence: RecurrenceRule,
    reminder_days: Vec<u32>,
    is_auto_pay: bool,
}

impl CreateBillRequest {
    pub fn new(raw: RawCreateBillRequest) -> Result<Self, String> {
        if raw.name.trim().is_empty() {
            return Err("Bill name cannot be empty".to_string());
        }
        if raw.amount_dollars < 0.0 {
            return Err("Amount must be a non-negative number".to_string());
        }
        if raw.recurrence_interval < 1 {
            return Err("Recurrence interval must be at least 1".to_string());
        }
        let kind = RecurrenceType::parse(&raw.recurrence_type)?;
        if let Some(end) = raw.recurrence_end_date {
            if end < raw.due_date {
                return Err("Recurrence end date cannot be before the due date".to_string());
            }
        }
        if raw.reminder_days.iter().any(|d| *d > MAX_REMINDER_DAYS) {
            return Err(format!(
                "Reminder days cannot exceed {}",
                MAX_REMINDER_DAYS
            ));
        }

        Ok(Self {
            name: raw.name.trim().to_string(),
            amount: (raw.amount_dollars * 100.0).round() as i64,
            category: raw.category.trim().to_string(),
            due_date: raw.due_date,
            recurrence: RecurrenceRule {
                kind,
                interval: raw.recurrence_interval,
                end_date: raw.recurrence_end_date,
            },
            reminder_days: raw.reminder_days,
            is_auto_pay: raw.is_auto_pay,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn amount(&self) -> i64 {
        self.amount
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn due_date(&self) -> DateTime<Utc> {
        self.due_date
    }

    pub fn recurrence(&self) -> &RecurrenceRule {
        &self.recurrence
    }

    pub fn reminder_days(&self) -> &[u32] {
        &self.reminder_days
    }

    pub fn is_auto_pay(&self) -> bool {
        self.is_auto_pay
    }
}

// Read model: the bill plus its date-derived fields, computed once at
// the handler boundary with an explicit "now".
#[derive(Debug, Serialize)]
pub struct BillView {
    #[serde(flatten)]
    pub bill: Bill,
    pub days_until_due: i64,
    pub is_overdue: bool,
}

impl BillView {
    pub fn new(bill: Bill, now: DateTime<Utc>) -> Self {
        let days_until_due = crate::schedule::days_until_due(&bill, now);
        let is_overdue = crate::schedule::is_overdue(&bill, now);
        Self {
            bill,
            days_until_due,
            is_overdue,
        }
    }
}
