use crate::models::{Bill, CreateBillRequest, RecurrenceRule, RecurrenceType};
use crate::schedule::NextOccurrence;
use chrono::{DateTime, Utc};
use database::{self, RepositoryError};
use sqlx::FromRow;

#[derive(FromRow)]
struct BillRecord {
    id: i64,
    user_id: i64,
    name: String,
    amount: i64,
    category: String,
    due_date: DateTime<Utc>,
    recurrence_type: String,
    recurrence_interval: i64,
    recurrence_end_date: Option<DateTime<Utc>>,
    reminder_days: String,
    is_auto_pay: bool,
    last_paid_date: Option<DateTime<Utc>>,
    next_due_date: DateTime<Utc>,
    is_active: bool,
}

impl TryFrom<BillRecord> for Bill {
    type Error = RepositoryError;

    fn try_from(record: BillRecord) -> Result<Self, Self::Error> {
        let kind = RecurrenceType::parse(&record.recurrence_type)
            .map_err(RepositoryError::Corrupt)?;
        let interval = u32::try_from(record.recurrence_interval)
            .ok()
            .filter(|i| *i >= 1)
            .ok_or_else(|| {
                RepositoryError::Corrupt(format!(
                    "Invalid recurrence interval: {}",
                    record.recurrence_interval
                ))
            })?;
        let reminder_days: Vec<u32> = serde_json::from_str(&record.reminder_days)
            .map_err(|e| RepositoryError::Corrupt(format!("Invalid reminder days: {}", e)))?;

        Ok(Bill {
            id: record.id,
            user_id: record.user_id,
            name: record.name,
            amount: record.amount,
            category: record.category,
            due_date: record.due_date,
            recurrence: RecurrenceRule {
                kind,
                interval,
                end_date: record.recurrence_end_date,
            },
            reminder_days,
            is_auto_pay: record.is_auto_pay,
            last_paid_date: record.last_paid_date,
            next_due_date: record.next_due_date,
            is_active: record.is_active,
        })
    }
}

const BILL_COLUMNS: &str = "id, user_id, name, amount, category, due_date, recurrence_type, \
     recurrence_interval, recurrence_end_date, reminder_days, is_auto_pay, last_paid_date, \
     next_due_date, is_active";

pub(crate) struct BillRepository<'a> {
    conn: &'a mut database::Connection,
}

impl<'a> BillRepository<'a> {
    pub fn new(conn: &'a mut database::Connection) -> Self {
        Self { conn }
    }

    pub async fn create(
        &mut self,
        user_id: i64,
        req: &CreateBillRequest,
        next: &NextOccurrence,
    ) -> Result<i64, RepositoryError> {
        let reminder_days = serde_json::to_string(req.reminder_days())
            .map_err(|e| RepositoryError::Corrupt(e.to_string()))?;

        let id: i64 = sqlx::query_scalar(
            "INSERT INTO bills (user_id, name, amount, category, due_date, recurrence_type, \
             recurrence_interval, recurrence_end_date, reminder_days, is_auto_pay, \
             next_due_date, is_active) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) RETURNING id",
        )
        .bind(user_id)
        .bind(req.name())
        .bind(req.amount())
        .bind(req.category())
        .bind(req.due_date())
        .bind(req.recurrence().kind.as_str())
        .bind(i64::from(req.recurrence().interval))
        .bind(req.recurrence().end_date)
        .bind(reminder_days)
        .bind(req.is_auto_pay())
        .bind(next.due)
        .bind(!next.expired)
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(id)
    }

    pub async fn update(
        &mut self,
        user_id: i64,
        id: i64,
        req: &CreateBillRequest,
        next: &NextOccurrence,
    ) -> Result<(), RepositoryError> {
        let reminder_days = serde_json::to_string(req.reminder_days())
            .map_err(|e| RepositoryError::Corrupt(e.to_string()))?;

        let result = sqlx::query(
            "UPDATE bills SET name = $1, amount = $2, category = $3, due_date = $4, \
             recurrence_type = $5, recurrence_interval = $6, recurrence_end_date = $7, \
             reminder_days = $8, is_auto_pay = $9, next_due_date = $10, is_active = $11 \
             WHERE id = $12 AND user_id = $13",
        )
        .bind(req.name())
        .bind(req.amount())
        .bind(req.category())
        .bind(req.due_date())
        .bind(req.recurrence().kind.as_str())
        .bind(i64::from(req.recurrence().interval))
        .bind(req.recurrence().end_date)
        .bind(reminder_days)
        .bind(req.is_auto_pay())
        .bind(next.due)
        .bind(!next.expired)
        .bind(id)
        .bind(user_id)
        .execute(&mut *self.conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    pub async fn find_by_id(
        &mut self,
        user_id: i64,
        id: i64,
    ) -> Result<Option<Bill>, RepositoryError> {
        let record = sqlx::query_as::<_, BillRecord>(&format!(
            "SELECT {} FROM bills WHERE id = $1 AND user_id = $2",
            BILL_COLUMNS
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&mut *self.conn)
        .await?;

        record.map(Bill::try_from).transpose()
    }

    pub async fn list_active(&mut self, user_id: i64) -> Result<Vec<Bill>, RepositoryError> {
        let records = sqlx::query_as::<_, BillRecord>(&format!(
            "SELECT {} FROM bills WHERE user_id = $1 AND is_active = 1 ORDER BY next_due_date",
            BILL_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&mut *self.conn)
        .await?;

        records.into_iter().map(Bill::try_from).collect()
    }

    pub async fn list_due_before(
        &mut self,
        user_id: i64,
        before: DateTime<Utc>,
    ) -> Result<Vec<Bill>, RepositoryError> {
        let records = sqlx::query_as::<_, BillRecord>(&format!(
            "SELECT {} FROM bills WHERE user_id = $1 AND is_active = 1 AND next_due_date <= $2 \
             ORDER BY next_due_date",
            BILL_COLUMNS
        ))
        .bind(user_id)
        .bind(before)
        .fetch_all(&mut *self.conn)
        .await?;

        records.into_iter().map(Bill::try_from).collect()
    }

    pub async fn list_overdue(
        &mut self,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<Bill>, RepositoryError> {
        let records = sqlx::query_as::<_, BillRecord>(&format!(
            "SELECT {} FROM bills WHERE user_id = $1 AND is_active = 1 AND next_due_date < $2 \
             ORDER BY next_due_date",
            BILL_COLUMNS
        ))
        .bind(user_id)
        .bind(now)
        .fetch_all(&mut *self.conn)
        .await?;

        records.into_iter().map(Bill::try_from).collect()
    }

    /// Stores a payment and the advanced schedule atomically: the new
    /// due date, the paid date, and any deactivation on expiry land in
    /// the same statement.
    pub async fn record_payment(
        &mut self,
        user_id: i64,
        id: i64,
        paid_date: DateTime<Utc>,
        next: &NextOccurrence,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE bills SET last_paid_date = $1, next_due_date = $2, is_active = $3 \
             WHERE id = $4 AND user_id = $5",
        )
        .bind(paid_date)
        .bind(next.due)
        .bind(!next.expired)
        .bind(id)
        .bind(user_id)
        .execute(&mut *self.conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    pub async fn set_amount(
        &mut self,
        user_id: i64,
        id: i64,
        amount: i64,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE bills SET amount = $1 WHERE id = $2 AND user_id = $3")
            .bind(amount)
            .bind(id)
            .bind(user_id)
            .execute(&mut *self.conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    pub async fn deactivate(&mut self, user_id: i64, id: i64) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE bills SET is_active = 0 WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&mut *self.conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawCreateBillRequest;
    use chrono::TimeZone;
    use database::get_test_db;

    fn dt(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn request(due: DateTime<Utc>) -> CreateBillRequest {
        CreateBillRequest::new(RawCreateBillRequest {
            name: "Internet".to_string(),
            amount_dollars: 59.99,
            category: "Utilities".to_string(),
            due_date: due,
            recurrence_type: "monthly".to_string(),
            recurrence_interval: 1,
            recurrence_end_date: None,
            reminder_days: vec![3, 1],
            is_auto_pay: true,
        })
        .unwrap()
    }

    fn live(due: DateTime<Utc>) -> NextOccurrence {
        NextOccurrence {
            due,
            expired: false,
        }
    }

    #[tokio::test]
    async fn test_create_and_find_bill() {
        let db = get_test_db().await;
        let mut uow = db.begin().await.unwrap();
        let mut repo = BillRepository::new(uow.connection());

        let id = repo
            .create(1, &request(dt(2024, 6, 1)), &live(dt(2024, 6, 1)))
            .await
            .unwrap();
        assert!(id > 0);

        let bill = repo.find_by_id(1, id).await.unwrap().unwrap();
        assert_eq!(bill.name, "Internet");
        assert_eq!(bill.amount, 5999);
        assert_eq!(bill.reminder_days, vec![3, 1]);
        assert_eq!(bill.next_due_date, dt(2024, 6, 1));
        assert!(bill.is_active);
    }

    #[tokio::test]
    async fn test_find_is_owner_scoped() {
        let db = get_test_db().await;
        let mut uow = db.begin().await.unwrap();
        let mut repo = BillRepository::new(uow.connection());

        let id = repo
            .create(1, &request(dt(2024, 6, 1)), &live(dt(2024, 6, 1)))
            .await
            .unwrap();

        assert!(repo.find_by_id(2, id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_active_ordered_by_next_due() {
        let db = get_test_db().await;
        let mut uow = db.begin().await.unwrap();
        let mut repo = BillRepository::new(uow.connection());

        repo.create(1, &request(dt(2024, 7, 1)), &live(dt(2024, 7, 1)))
            .await
            .unwrap();
        repo.create(1, &request(dt(2024, 6, 1)), &live(dt(2024, 6, 1)))
            .await
            .unwrap();

        let bills = repo.list_active(1).await.unwrap();
        assert_eq!(bills.len(), 2);
        assert_eq!(bills[0].next_due_date, dt(2024, 6, 1));
    }

    #[tokio::test]
    async fn test_record_payment_advances_and_deactivates_on_expiry() {
        let db = get_test_db().await;
        let mut uow = db.begin().await.unwrap();
        let mut repo = BillRepository::new(uow.connection());

        let id = repo
            .create(1, &request(dt(2024, 6, 1)), &live(dt(2024, 6, 1)))
            .await
            .unwrap();

        let expired = NextOccurrence {
            due: dt(2024, 6, 1),
            expired: true,
        };
        repo.record_payment(1, id, dt(2024, 6, 1), &expired)
            .await
            .unwrap();

        let bill = repo.find_by_id(1, id).await.unwrap().unwrap();
        assert_eq!(bill.last_paid_date, Some(dt(2024, 6, 1)));
        assert!(!bill.is_active);
    }

    #[tokio::test]
    async fn test_deactivate_soft_deletes() {
        let db = get_test_db().await;
        let mut uow = db.begin().await.unwrap();
        let mut repo = BillRepository::new(uow.connection());

        let id = repo
            .create(1, &request(dt(2024, 6, 1)), &live(dt(2024, 6, 1)))
            .await
            .unwrap();
        repo.deactivate(1, id).await.unwrap();

        // Row still exists but no longer lists as active.
        assert!(repo.find_by_id(1, id).await.unwrap().is_some());
        assert!(repo.list_active(1).await.unwrap().is_empty());
    }
}
