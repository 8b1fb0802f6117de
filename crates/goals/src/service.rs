use crate::models::{CreateGoalRequest, GoalView, RawCreateGoalRequest};
use crate::progress;
use crate::repository::GoalRepository;
use chrono::{DateTime, Utc};
use database::{Database, RepositoryError};
use tracing::instrument;

#[derive(Debug, thiserror::Error)]
pub enum GoalError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Database error: {0}")]
    Infrastructure(String),
    #[error("Goal not found")]
    NotFound,
}

impl From<RepositoryError> for GoalError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => GoalError::NotFound,
            RepositoryError::Infrastructure(e) => GoalError::Infrastructure(e.to_string()),
            _ => GoalError::Infrastructure(err.to_string()),
        }
    }
}

pub struct GoalService;

impl GoalService {
    #[instrument(skip(db, raw))]
    pub async fn create_goal(
        db: &Database,
        user_id: i64,
        raw: RawCreateGoalRequest,
        now: DateTime<Utc>,
    ) -> Result<i64, GoalError> {
        let req = CreateGoalRequest::new(raw, now).map_err(GoalError::InvalidInput)?;

        let mut uow = db.begin().await.map_err(RepositoryError::from)?;
        let mut repo = GoalRepository::new(uow.connection());

        let id = repo.create(user_id, &req, now).await?;

        uow.commit().await.map_err(RepositoryError::from)?;

        Ok(id)
    }

    #[instrument(skip(db))]
    pub async fn get_goal(
        db: &Database,
        user_id: i64,
        id: i64,
        now: DateTime<Utc>,
    ) -> Result<GoalView, GoalError> {
        let mut uow = db.begin().await.map_err(RepositoryError::from)?;
        let mut repo = GoalRepository::new(uow.connection());

        let goal = repo
            .find_by_id(user_id, id)
            .await?
            .ok_or(GoalError::NotFound)?;

        Ok(GoalView::new(goal, now))
    }

    #[instrument(skip(db))]
    pub async fn list_goals(
        db: &Database,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<GoalView>, GoalError> {
        let mut uow = db.begin().await.map_err(RepositoryError::from)?;
        let mut repo = GoalRepository::new(uow.connection());

        let goals = repo.list_active(user_id).await?;

        Ok(goals.into_iter().map(|g| GoalView::new(g, now)).collect())
    }

    #[instrument(skip(db))]
    pub async fn achieved_goals(
        db: &Database,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<GoalView>, GoalError> {
        let mut uow = db.begin().await.map_err(RepositoryError::from)?;
        let mut repo = GoalRepository::new(uow.connection());

        let goals = repo.list_achieved(user_id).await?;

        Ok(goals.into_iter().map(|g| GoalView::new(g, now)).collect())
    }

    /// Records a contribution: atomic clamped increment, then the
    /// achievement flags are re-derived from the new amounts inside the
    /// same transaction.
    #[instrument(skip(db))]
    pub async fn add_contribution(
        db: &Database,
        user_id: i64,
        id: i64,
        amount_dollars: f64,
        now: DateTime<Utc>,
    ) -> Result<GoalView, GoalError> {
        if amount_dollars <= 0.0 {
            return Err(GoalError::InvalidInput(
                "Contribution amount must be a positive number".to_string(),
            ));
        }
        let amount = (amount_dollars * 100.0).round() as i64;

        let mut uow = db.begin().await.map_err(RepositoryError::from)?;
        let mut repo = GoalRepository::new(uow.connection());

        repo.increment_contribution(user_id, id, amount).await?;

        let mut goal = repo
            .find_by_id(user_id, id)
            .await?
            .ok_or(GoalError::NotFound)?;

        if progress::reconcile_achievement(&mut goal, now) {
            repo.set_achievement(user_id, id, goal.is_achieved, goal.achieved_date)
                .await?;
        }

        uow.commit().await.map_err(RepositoryError::from)?;

        Ok(GoalView::new(goal, now))
    }

    /// Moves the goalposts. Raising the target above the saved amount
    /// un-achieves the goal; lowering it below can achieve it.
    #[instrument(skip(db))]
    pub async fn update_target(
        db: &Database,
        user_id: i64,
        id: i64,
        target_dollars: f64,
        target_date: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<GoalView, GoalError> {
        if target_dollars <= 0.0 {
            return Err(GoalError::InvalidInput(
                "Target amount must be a positive number".to_string(),
            ));
        }
        if let Some(date) = target_date {
            if date <= now {
                return Err(GoalError::InvalidInput(
                    "Target date must be in the future".to_string(),
                ));
            }
        }
        let target = (target_dollars * 100.0).round() as i64;

        let mut uow = db.begin().await.map_err(RepositoryError::from)?;
        let mut repo = GoalRepository::new(uow.connection());

        repo.set_target(user_id, id, target, target_date).await?;

        let mut goal = repo
            .find_by_id(user_id, id)
            .await?
            .ok_or(GoalError::NotFound)?;

        if progress::reconcile_achievement(&mut goal, now) {
            repo.set_achievement(user_id, id, goal.is_achieved, goal.achieved_date)
                .await?;
        }

        uow.commit().await.map_err(RepositoryError::from)?;

        Ok(GoalView::new(goal, now))
    }

    #[instrument(skip(db))]
    pub async fn deactivate_goal(db: &Database, user_id: i64, id: i64) -> Result<(), GoalError> {
        let mut uow = db.begin().await.map_err(RepositoryError::from)?;
        let mut repo = GoalRepository::new(uow.connection());

        repo.deactivate(user_id, id).await?;

        uow.commit().await.map_err(RepositoryError::from)?;
        Ok(())
    }
}
