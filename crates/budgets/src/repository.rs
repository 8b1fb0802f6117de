use crate::models::{Budget, BudgetPeriod, CreateBudgetRequest, NotificationFlags};
use chrono::{DateTime, Utc};
use database::{self, RepositoryError};
use sqlx::FromRow;

#[derive(FromRow)]
struct BudgetRecord {
    id: i64,
    user_id: i64,
    name: String,
    category: String,
    limit_amount: i64,
    period: String,
    spent: i64,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    is_active: bool,
    notify_at_75: bool,
    notify_at_90: bool,
    notify_at_limit: bool,
}

impl TryFrom<BudgetRecord> for Budget {
    type Error = RepositoryError;

    fn try_from(record: BudgetRecord) -> Result<Self, Self::Error> {
        let period = BudgetPeriod::parse(&record.period).map_err(RepositoryError::Corrupt)?;

        Ok(Budget {
            id: record.id,
            user_id: record.user_id,
            name: record.name,
            category: record.category,
            limit_amount: record.limit_amount,
            period,
            spent: record.spent,
            start_date: record.start_date,
            end_date: record.end_date,
            is_active: record.is_active,
            notifications: NotificationFlags {
                at_75_percent: record.notify_at_75,
                at_90_percent: record.notify_at_90,
                at_limit: record.notify_at_limit,
            },
        })
    }
}

const BUDGET_COLUMNS: &str = "id, user_id, name, category, limit_amount, period, spent, \
     start_date, end_date, is_active, notify_at_75, notify_at_90, notify_at_limit";

pub(crate) struct BudgetRepository<'a> {
    conn: &'a mut database::Connection,
}

impl<'a> BudgetRepository<'a> {
    pub fn new(conn: &'a mut database::Connection) -> Self {
        Self { conn }
    }

    pub async fn create(
        &mut self,
        user_id: i64,
        req: &CreateBudgetRequest,
    ) -> Result<i64, RepositoryError> {
        let flags = req.notifications();
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO budgets (user_id, name, category, limit_amount, period, start_date, \
             end_date, notify_at_75, notify_at_90, notify_at_limit) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING id",
        )
        .bind(user_id)
        .bind(req.name())
        .bind(req.category())
        .bind(req.limit_amount())
        .bind(req.period().as_str())
        .bind(req.start_date())
        .bind(req.end_date())
        .bind(flags.at_75_percent)
        .bind(flags.at_90_percent)
        .bind(flags.at_limit)
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(id)
    }

    pub async fn find_by_id(
        &mut self,
        user_id: i64,
        id: i64,
    ) -> Result<Option<Budget>, RepositoryError> {
        let record = sqlx::query_as::<_, BudgetRecord>(&format!(
            "SELECT {} FROM budgets WHERE id = $1 AND user_id = $2",
            BUDGET_COLUMNS
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&mut *self.conn)
        .await?;

        record.map(Budget::try_from).transpose()
    }

    pub async fn list_active(&mut self, user_id: i64) -> Result<Vec<Budget>, RepositoryError> {
        let records = sqlx::query_as::<_, BudgetRecord>(&format!(
            "SELECT {} FROM budgets WHERE user_id = $1 AND is_active = 1 ORDER BY id DESC",
            BUDGET_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&mut *self.conn)
        .await?;

        records.into_iter().map(Budget::try_from).collect()
    }

    pub async fn list_current(
        &mut self,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<Budget>, RepositoryError> {
        let records = sqlx::query_as::<_, BudgetRecord>(&format!(
            "SELECT {} FROM budgets WHERE user_id = $1 AND is_active = 1 \
             AND start_date <= $2 AND end_date >= $3",
            BUDGET_COLUMNS
        ))
        .bind(user_id)
        .bind(now)
        .bind(now)
        .fetch_all(&mut *self.conn)
        .await?;

        records.into_iter().map(Budget::try_from).collect()
    }

    /// Absolute set, clamped to zero in SQL. Last-writer-wins is
    /// acceptable here.
    pub async fn set_spent(
        &mut self,
        user_id: i64,
        id: i64,
        amount: i64,
    ) -> Result<(), RepositoryError> {
        let result =
            sqlx::query("UPDATE budgets SET spent = MAX(0, $1) WHERE id = $2 AND user_id = $3")
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

    /// In-place increment so concurrent spend events cannot lose
    /// updates. No clamp: exceeding the limit is the over-budget
    /// signal.
    pub async fn increment_spent(
        &mut self,
        user_id: i64,
        id: i64,
        delta: i64,
    ) -> Result<(), RepositoryError> {
        let result =
            sqlx::query("UPDATE budgets SET spent = spent + $1 WHERE id = $2 AND user_id = $3")
                .bind(delta)
                .bind(id)
                .bind(user_id)
                .execute(&mut *self.conn)
                .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    pub async fn reset_period(
        &mut self,
        user_id: i64,
        id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE budgets SET spent = 0, start_date = $1, end_date = $2 \
             WHERE id = $3 AND user_id = $4",
        )
        .bind(start)
        .bind(end)
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
        let result = sqlx::query("UPDATE budgets SET is_active = 0 WHERE id = $1 AND user_id = $2")
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
    use crate::models::RawCreateBudgetRequest;
    use chrono::TimeZone;
    use database::get_test_db;

    fn dt(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn request() -> CreateBudgetRequest {
        CreateBudgetRequest::new(RawCreateBudgetRequest {
            name: "Groceries".to_string(),
            category: "Food".to_string(),
            limit_dollars: 400.0,
            period: "monthly".to_string(),
            start_date: dt(2024, 3, 1),
            end_date: dt(2024, 4, 1),
            notifications: NotificationFlags::default(),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_create_and_find_budget() {
        let db = get_test_db().await;
        let mut uow = db.begin().await.unwrap();
        let mut repo = BudgetRepository::new(uow.connection());

        let id = repo.create(1, &request()).await.unwrap();
        let budget = repo.find_by_id(1, id).await.unwrap().unwrap();

        assert_eq!(budget.limit_amount, 40000);
        assert_eq!(budget.spent, 0);
        assert_eq!(budget.period, BudgetPeriod::Monthly);
        assert!(budget.notifications.at_limit);
    }

    #[tokio::test]
    async fn test_set_spent_clamps_negative_to_zero() {
        let db = get_test_db().await;
        let mut uow = db.begin().await.unwrap();
        let mut repo = BudgetRepository::new(uow.connection());

        let id = repo.create(1, &request()).await.unwrap();
        repo.set_spent(1, id, -5000).await.unwrap();

        let budget = repo.find_by_id(1, id).await.unwrap().unwrap();
        assert_eq!(budget.spent, 0);
    }

    #[tokio::test]
    async fn test_increment_spent_accumulates_past_limit() {
        let db = get_test_db().await;
        let mut uow = db.begin().await.unwrap();
        let mut repo = BudgetRepository::new(uow.connection());

        let id = repo.create(1, &request()).await.unwrap();
        repo.increment_spent(1, id, 30000).await.unwrap();
        repo.increment_spent(1, id, 30000).await.unwrap();

        let budget = repo.find_by_id(1, id).await.unwrap().unwrap();
        // Over the 40000 limit; intentionally unclamped.
        assert_eq!(budget.spent, 60000);
    }

    #[tokio::test]
    async fn test_reset_period_zeroes_spent_and_moves_window() {
        let db = get_test_db().await;
        let mut uow = db.begin().await.unwrap();
        let mut repo = BudgetRepository::new(uow.connection());

        let id = repo.create(1, &request()).await.unwrap();
        repo.increment_spent(1, id, 12345).await.unwrap();
        repo.reset_period(1, id, dt(2024, 4, 1), dt(2024, 5, 1))
            .await
            .unwrap();

        let budget = repo.find_by_id(1, id).await.unwrap().unwrap();
        assert_eq!(budget.spent, 0);
        assert_eq!(budget.start_date, dt(2024, 4, 1));
        assert_eq!(budget.end_date, dt(2024, 5, 1));
    }

    #[tokio::test]
    async fn test_list_current_filters_by_window() {
        let db = get_test_db().await;
        let mut uow = db.begin().await.unwrap();
        let mut repo = BudgetRepository::new(uow.connection());

        repo.create(1, &request()).await.unwrap();

        assert_eq!(repo.list_current(1, dt(2024, 3, 15)).await.unwrap().len(), 1);
        assert!(repo.list_current(1, dt(2024, 5, 15)).await.unwrap().is_empty());
        assert!(repo.list_current(2, dt(2024, 3, 15)).await.unwrap().is_empty());
    }
}
