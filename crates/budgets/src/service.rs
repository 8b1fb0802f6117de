use crate::models::{BudgetView, CreateBudgetRequest, RawCreateBudgetRequest};
use crate::progress::{self, Threshold};
use crate::repository::BudgetRepository;
use chrono::{DateTime, Utc};
use database::{Database, RepositoryError};
use tracing::instrument;

#[derive(Debug, thiserror::Error)]
pub enum BudgetError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Database error: {0}")]
    Infrastructure(String),
    #[error("Budget not found")]
    NotFound,
}

impl From<RepositoryError> for BudgetError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => BudgetError::NotFound,
            RepositoryError::Infrastructure(e) => BudgetError::Infrastructure(e.to_string()),
            _ => BudgetError::Infrastructure(err.to_string()),
        }
    }
}

pub struct BudgetService;

impl BudgetService {
    #[instrument(skip(db, raw))]
    pub async fn create_budget(
        db: &Database,
        user_id: i64,
        raw: RawCreateBudgetRequest,
    ) -> Result<i64, BudgetError> {
        let req = CreateBudgetRequest::new(raw).map_err(BudgetError::InvalidInput)?;

        let mut uow = db.begin().await.map_err(RepositoryError::from)?;
        let mut repo = BudgetRepository::new(uow.connection());

        let id = repo.create(user_id, &req).await?;

        uow.commit().await.map_err(RepositoryError::from)?;

        Ok(id)
    }

    #[instrument(skip(db))]
    pub async fn get_budget(
        db: &Database,
        user_id: i64,
        id: i64,
        now: DateTime<Utc>,
    ) -> Result<BudgetView, BudgetError> {
        let mut uow = db.begin().await.map_err(RepositoryError::from)?;
        let mut repo = BudgetRepository::new(uow.connection());

        let budget = repo
            .find_by_id(user_id, id)
            .await?
            .ok_or(BudgetError::NotFound)?;

        Ok(BudgetView::new(budget, now))
    }

    #[instrument(skip(db))]
    pub async fn list_budgets(
        db: &Database,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<BudgetView>, BudgetError> {
        let mut uow = db.begin().await.map_err(RepositoryError::from)?;
        let mut repo = BudgetRepository::new(uow.connection());

        let budgets = repo.list_active(user_id).await?;

        Ok(budgets.into_iter().map(|b| BudgetView::new(b, now)).collect())
    }

    #[instrument(skip(db))]
    pub async fn current_budgets(
        db: &Database,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<BudgetView>, BudgetError> {
        let mut uow = db.begin().await.map_err(RepositoryError::from)?;
        let mut repo = BudgetRepository::new(uow.connection());

        let budgets = repo.list_current(user_id, now).await?;

        Ok(budgets.into_iter().map(|b| BudgetView::new(b, now)).collect())
    }

    /// Absolute replacement; negative inputs clamp to zero rather than
    /// erroring.
    #[instrument(skip(db))]
    pub async fn update_spent(
        db: &Database,
        user_id: i64,
        id: i64,
        amount_dollars: f64,
    ) -> Result<(), BudgetError> {
        let amount = (amount_dollars * 100.0).round() as i64;

        let mut uow = db.begin().await.map_err(RepositoryError::from)?;
        let mut repo = BudgetRepository::new(uow.connection());

        repo.set_spent(user_id, id, amount).await?;

        uow.commit().await.map_err(RepositoryError::from)?;
        Ok(())
    }

    /// Additive spend, atomic in the store so concurrent transactions
    /// on the same category never lose an update. Callers needing a
    /// floor clamp before calling.
    #[instrument(skip(db))]
    pub async fn add_to_spent(
        db: &Database,
        user_id: i64,
        id: i64,
        delta_dollars: f64,
    ) -> Result<(), BudgetError> {
        let delta = (delta_dollars * 100.0).round() as i64;

        let mut uow = db.begin().await.map_err(RepositoryError::from)?;
        let mut repo = BudgetRepository::new(uow.connection());

        repo.increment_spent(user_id, id, delta).await?;

        uow.commit().await.map_err(RepositoryError::from)?;
        Ok(())
    }

    /// Zeroes spend and swaps in the new window unconditionally; the
    /// caller owns any overlap policy.
    #[instrument(skip(db))]
    pub async fn reset_for_new_period(
        db: &Database,
        user_id: i64,
        id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<(), BudgetError> {
        if start >= end {
            return Err(BudgetError::InvalidInput(
                "End date must be after start date".to_string(),
            ));
        }

        let mut uow = db.begin().await.map_err(RepositoryError::from)?;
        let mut repo = BudgetRepository::new(uow.connection());

        repo.reset_period(user_id, id, start, end).await?;

        uow.commit().await.map_err(RepositoryError::from)?;
        Ok(())
    }

    /// Threshold tags the notification collaborator should act on.
    #[instrument(skip(db))]
    pub async fn check_notification_threshold(
        db: &Database,
        user_id: i64,
        id: i64,
    ) -> Result<Vec<Threshold>, BudgetError> {
        let mut uow = db.begin().await.map_err(RepositoryError::from)?;
        let mut repo = BudgetRepository::new(uow.connection());

        let budget = repo
            .find_by_id(user_id, id)
            .await?
            .ok_or(BudgetError::NotFound)?;

        Ok(progress::crossed_thresholds(&budget))
    }

    #[instrument(skip(db))]
    pub async fn deactivate_budget(db: &Database, user_id: i64, id: i64) -> Result<(), BudgetError> {
        let mut uow = db.begin().await.map_err(RepositoryError::from)?;
        let mut repo = BudgetRepository::new(uow.connection());

        repo.deactivate(user_id, id).await?;

        uow.commit().await.map_err(RepositoryError::from)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NotificationFlags;
    use chrono::TimeZone;
    use database::get_test_db;

    fn dt(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn raw() -> RawCreateBudgetRequest {
        RawCreateBudgetRequest {
            name: "Dining".to_string(),
            category: "Food".to_string(),
            limit_dollars: 100.0,
            period: "monthly".to_string(),
            start_date: dt(2024, 3, 1),
            end_date: dt(2024, 4, 1),
            notifications: NotificationFlags::default(),
        }
    }

    #[tokio::test]
    async fn test_update_spent_clamps_negative() {
        let db = get_test_db().await;

        let id = BudgetService::create_budget(&db, 1, raw()).await.unwrap();
        BudgetService::update_spent(&db, 1, id, -50.0).await.unwrap();

        let view = BudgetService::get_budget(&db, 1, id, dt(2024, 3, 10)).await.unwrap();
        assert_eq!(view.budget.spent, 0);
    }

    #[tokio::test]
    async fn test_threshold_tags_from_spend() {
        let db = get_test_db().await;

        let id = BudgetService::create_budget(&db, 1, raw()).await.unwrap();
        BudgetService::add_to_spent(&db, 1, id, 92.0).await.unwrap();

        let tags = BudgetService::check_notification_threshold(&db, 1, id).await.unwrap();
        assert_eq!(tags, vec![Threshold::At90Percent]);

        BudgetService::add_to_spent(&db, 1, id, 8.0).await.unwrap();
        let tags = BudgetService::check_notification_threshold(&db, 1, id).await.unwrap();
        assert_eq!(tags, vec![Threshold::AtLimit]);
    }

    #[tokio::test]
    async fn test_reset_rejects_inverted_window() {
        let db = get_test_db().await;

        let id = BudgetService::create_budget(&db, 1, raw()).await.unwrap();
        let result =
            BudgetService::reset_for_new_period(&db, 1, id, dt(2024, 5, 1), dt(2024, 4, 1)).await;

        assert!(matches!(result, Err(BudgetError::InvalidInput(_))));
    }
}
