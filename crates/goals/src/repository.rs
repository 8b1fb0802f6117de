use crate::models::{CreateGoalRequest, Goal, GoalPriority, GoalType};
use chrono::{DateTime, Utc};
use database::{self, RepositoryError};
use sqlx::FromRow;

#[derive(FromRow)]
struct GoalRecord {
    id: i64,
    user_id: i64,
    name: String,
    description: Option<String>,
    target_amount: i64,
    current_amount: i64,
    target_date: DateTime<Utc>,
    goal_type: String,
    priority: String,
    is_active: bool,
    is_achieved: bool,
    achieved_date: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<GoalRecord> for Goal {
    type Error = RepositoryError;

    fn try_from(record: GoalRecord) -> Result<Self, Self::Error> {
        let goal_type = GoalType::parse(&record.goal_type).map_err(RepositoryError::Corrupt)?;
        let priority = GoalPriority::parse(&record.priority).map_err(RepositoryError::Corrupt)?;

        Ok(Goal {
            id: record.id,
            user_id: record.user_id,
            name: record.name,
            description: record.description,
            target_amount: record.target_amount,
            current_amount: record.current_amount,
            target_date: record.target_date,
            goal_type,
            priority,
            is_active: record.is_active,
            is_achieved: record.is_achieved,
            achieved_date: record.achieved_date,
            created_at: record.created_at,
        })
    }
}

const GOAL_COLUMNS: &str = "id, user_id, name, description, target_amount, current_amount, \
     target_date, goal_type, priority, is_active, is_achieved, achieved_date, created_at";

pub(crate) struct GoalRepository<'a> {
    conn: &'a mut database::Connection,
}

impl<'a> GoalRepository<'a> {
    pub fn new(conn: &'a mut database::Connection) -> Self {
        Self { conn }
    }

    pub async fn create(
        &mut self,
        user_id: i64,
        req: &CreateGoalRequest,
        created_at: DateTime<Utc>,
    ) -> Result<i64, RepositoryError> {
        let achieved_date = req.is_achieved().then_some(created_at);

        let id: i64 = sqlx::query_scalar(
            "INSERT INTO goals (user_id, name, description, target_amount, current_amount, \
             target_date, goal_type, priority, is_achieved, achieved_date, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) RETURNING id",
        )
        .bind(user_id)
        .bind(req.name())
        .bind(req.description())
        .bind(req.target_amount())
        .bind(req.current_amount())
        .bind(req.target_date())
        .bind(req.goal_type().as_str())
        .bind(req.priority().as_str())
        .bind(req.is_achieved())
        .bind(achieved_date)
        .bind(created_at)
        .fetch_one(&mut *self.conn)
        .await?;

        Ok(id)
    }

    pub async fn find_by_id(
        &mut self,
        user_id: i64,
        id: i64,
    ) -> Result<Option<Goal>, RepositoryError> {
        let record = sqlx::query_as::<_, GoalRecord>(&format!(
            "SELECT {} FROM goals WHERE id = $1 AND user_id = $2",
            GOAL_COLUMNS
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&mut *self.conn)
        .await?;

        record.map(Goal::try_from).transpose()
    }

    pub async fn list_active(&mut self, user_id: i64) -> Result<Vec<Goal>, RepositoryError> {
        let records = sqlx::query_as::<_, GoalRecord>(&format!(
            "SELECT {} FROM goals WHERE user_id = $1 AND is_active = 1 \
             ORDER BY CASE priority WHEN 'high' THEN 0 WHEN 'medium' THEN 1 ELSE 2 END, \
             target_date",
            GOAL_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&mut *self.conn)
        .await?;

        records.into_iter().map(Goal::try_from).collect()
    }

    pub async fn list_achieved(&mut self, user_id: i64) -> Result<Vec<Goal>, RepositoryError> {
        let records = sqlx::query_as::<_, GoalRecord>(&format!(
            "SELECT {} FROM goals WHERE user_id = $1 AND is_achieved = 1 \
             ORDER BY achieved_date DESC",
            GOAL_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&mut *self.conn)
        .await?;

        records.into_iter().map(Goal::try_from).collect()
    }

    /// Atomic, clamped increment: contributions land in-place so
    /// concurrent events cannot lose updates, and the amount never
    /// exceeds the target (excess is capped, not carried over).
    pub async fn increment_contribution(
        &mut self,
        user_id: i64,
        id: i64,
        delta: i64,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE goals SET current_amount = MIN(target_amount, current_amount + $1) \
             WHERE id = $2 AND user_id = $3",
        )
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

    pub async fn set_target(
        &mut self,
        user_id: i64,
        id: i64,
        target_amount: i64,
        target_date: Option<DateTime<Utc>>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE goals SET target_amount = $1, target_date = COALESCE($2, target_date) \
             WHERE id = $3 AND user_id = $4",
        )
        .bind(target_amount)
        .bind(target_date)
        .bind(id)
        .bind(user_id)
        .execute(&mut *self.conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    pub async fn set_achievement(
        &mut self,
        user_id: i64,
        id: i64,
        is_achieved: bool,
        achieved_date: Option<DateTime<Utc>>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE goals SET is_achieved = $1, achieved_date = $2 \
             WHERE id = $3 AND user_id = $4",
        )
        .bind(is_achieved)
        .bind(achieved_date)
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
        let result = sqlx::query("UPDATE goals SET is_active = 0 WHERE id = $1 AND user_id = $2")
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
    use crate::models::RawCreateGoalRequest;
    use chrono::TimeZone;
    use database::get_test_db;

    fn dt(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn request(priority: Option<&str>) -> CreateGoalRequest {
        CreateGoalRequest::new(
            RawCreateGoalRequest {
                name: "Car".to_string(),
                description: None,
                target_amount_dollars: 5000.0,
                current_amount_dollars: 0.0,
                target_date: dt(2025, 1, 1),
                goal_type: "purchase".to_string(),
                priority: priority.map(str::to_string),
            },
            dt(2024, 1, 1),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_create_and_find_goal() {
        let db = get_test_db().await;
        let mut uow = db.begin().await.unwrap();
        let mut repo = GoalRepository::new(uow.connection());

        let id = repo.create(1, &request(None), dt(2024, 1, 1)).await.unwrap();
        let goal = repo.find_by_id(1, id).await.unwrap().unwrap();

        assert_eq!(goal.target_amount, 500000);
        assert_eq!(goal.current_amount, 0);
        assert_eq!(goal.priority, GoalPriority::Medium);
        assert_eq!(goal.created_at, dt(2024, 1, 1));
        assert!(!goal.is_achieved);
    }

    #[tokio::test]
    async fn test_increment_contribution_caps_at_target() {
        let db = get_test_db().await;
        let mut uow = db.begin().await.unwrap();
        let mut repo = GoalRepository::new(uow.connection());

        let id = repo.create(1, &request(None), dt(2024, 1, 1)).await.unwrap();
        repo.increment_contribution(1, id, 400000).await.unwrap();
        repo.increment_contribution(1, id, 400000).await.unwrap();

        let goal = repo.find_by_id(1, id).await.unwrap().unwrap();
        // 800000 contributed, capped at the 500000 target.
        assert_eq!(goal.current_amount, 500000);
    }

    #[tokio::test]
    async fn test_set_target_keeps_date_when_absent() {
        let db = get_test_db().await;
        let mut uow = db.begin().await.unwrap();
        let mut repo = GoalRepository::new(uow.connection());

        let id = repo.create(1, &request(None), dt(2024, 1, 1)).await.unwrap();
        repo.set_target(1, id, 600000, None).await.unwrap();

        let goal = repo.find_by_id(1, id).await.unwrap().unwrap();
        assert_eq!(goal.target_amount, 600000);
        assert_eq!(goal.target_date, dt(2025, 1, 1));
    }

    #[tokio::test]
    async fn test_list_active_orders_by_priority_then_date() {
        let db = get_test_db().await;
        let mut uow = db.begin().await.unwrap();
        let mut repo = GoalRepository::new(uow.connection());

        repo.create(1, &request(Some("low")), dt(2024, 1, 1)).await.unwrap();
        repo.create(1, &request(Some("high")), dt(2024, 1, 1)).await.unwrap();
        repo.create(1, &request(Some("medium")), dt(2024, 1, 1)).await.unwrap();

        let goals = repo.list_active(1).await.unwrap();
        let priorities: Vec<_> = goals.iter().map(|g| g.priority).collect();
        assert_eq!(
            priorities,
            vec![GoalPriority::High, GoalPriority::Medium, GoalPriority::Low]
        );
    }

    #[tokio::test]
    async fn test_owner_scoping() {
        let db = get_test_db().await;
        let mut uow = db.begin().await.unwrap();
        let mut repo = GoalRepository::new(uow.connection());

        let id = repo.create(1, &request(None), dt(2024, 1, 1)).await.unwrap();

        assert!(repo.find_by_id(2, id).await.unwrap().is_none());
        assert!(matches!(
            repo.increment_contribution(2, id, 1000).await,
            Err(RepositoryError::NotFound)
        ));
    }
}
