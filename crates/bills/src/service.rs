use crate::models::{BillView, CreateBillRequest, RawCreateBillRequest};
use crate::repository::BillRepository;
use crate::schedule;
use chrono::{DateTime, Duration, Utc};
use database::{Database, RepositoryError};
use tracing::instrument;

#[derive(Debug, thiserror::Error)]
pub enum BillError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Database error: {0}")]
    Infrastructure(String),
    #[error("Bill not found")]
    NotFound,
}

impl From<RepositoryError> for BillError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => BillError::NotFound,
            RepositoryError::Infrastructure(e) => BillError::Infrastructure(e.to_string()),
            _ => BillError::Infrastructure(err.to_string()),
        }
    }
}

pub struct BillService;

impl BillService {
    #[instrument(skip(db, raw))]
    pub async fn create_bill(
        db: &Database,
        user_id: i64,
        raw: RawCreateBillRequest,
        now: DateTime<Utc>,
    ) -> Result<i64, BillError> {
        let req = CreateBillRequest::new(raw).map_err(BillError::InvalidInput)?;
        let next = schedule::next_occurrence(req.due_date(), req.recurrence(), now);

        let mut uow = db.begin().await.map_err(RepositoryError::from)?;
        let mut repo = BillRepository::new(uow.connection());

        let id = repo.create(user_id, &req, &next).await?;

        uow.commit().await.map_err(RepositoryError::from)?;

        Ok(id)
    }

    /// Full update; the schedule is recomputed because the anchor or
    /// the recurrence rule may have changed.
    #[instrument(skip(db, raw))]
    pub async fn update_bill(
        db: &Database,
        user_id: i64,
        id: i64,
        raw: RawCreateBillRequest,
        now: DateTime<Utc>,
    ) -> Result<BillView, BillError> {
        let req = CreateBillRequest::new(raw).map_err(BillError::InvalidInput)?;
        let next = schedule::next_occurrence(req.due_date(), req.recurrence(), now);

        let mut uow = db.begin().await.map_err(RepositoryError::from)?;
        let mut repo = BillRepository::new(uow.connection());

        repo.update(user_id, id, &req, &next).await?;
        let bill = repo.find_by_id(user_id, id).await?.ok_or(BillError::NotFound)?;

        uow.commit().await.map_err(RepositoryError::from)?;

        Ok(BillView::new(bill, now))
    }

    #[instrument(skip(db))]
    pub async fn get_bill(
        db: &Database,
        user_id: i64,
        id: i64,
        now: DateTime<Utc>,
    ) -> Result<BillView, BillError> {
        let mut uow = db.begin().await.map_err(RepositoryError::from)?;
        let mut repo = BillRepository::new(uow.connection());

        let bill = repo.find_by_id(user_id, id).await?.ok_or(BillError::NotFound)?;

        Ok(BillView::new(bill, now))
    }

    #[instrument(skip(db))]
    pub async fn list_bills(
        db: &Database,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<BillView>, BillError> {
        let mut uow = db.begin().await.map_err(RepositoryError::from)?;
        let mut repo = BillRepository::new(uow.connection());

        let bills = repo.list_active(user_id).await?;

        Ok(bills.into_iter().map(|b| BillView::new(b, now)).collect())
    }

    #[instrument(skip(db))]
    pub async fn upcoming_bills(
        db: &Database,
        user_id: i64,
        now: DateTime<Utc>,
        days: i64,
    ) -> Result<Vec<BillView>, BillError> {
        if days < 0 {
            return Err(BillError::InvalidInput(
                "Days must be non-negative".to_string(),
            ));
        }

        let mut uow = db.begin().await.map_err(RepositoryError::from)?;
        let mut repo = BillRepository::new(uow.connection());

        let bills = repo
            .list_due_before(user_id, now + Duration::days(days))
            .await?;

        Ok(bills.into_iter().map(|b| BillView::new(b, now)).collect())
    }

    #[instrument(skip(db))]
    pub async fn overdue_bills(
        db: &Database,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<BillView>, BillError> {
        let mut uow = db.begin().await.map_err(RepositoryError::from)?;
        let mut repo = BillRepository::new(uow.connection());

        let bills = repo.list_overdue(user_id, now).await?;

        Ok(bills.into_iter().map(|b| BillView::new(b, now)).collect())
    }

    /// Active bills whose reminder fires at `now`. The caller (the
    /// notification collaborator) decides how to deliver.
    #[instrument(skip(db))]
    pub async fn reminders_due(
        db: &Database,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<BillView>, BillError> {
        let mut uow = db.begin().await.map_err(RepositoryError::from)?;
        let mut repo = BillRepository::new(uow.connection());

        let bills = repo.list_active(user_id).await?;

        Ok(bills
            .into_iter()
            .filter(|b| schedule::should_send_reminder(b, now))
            .map(|b| BillView::new(b, now))
            .collect())
    }

    /// Records a payment and advances the schedule one cycle from the
    /// current due date. There is no double-payment dedup: callers that
    /// can double-submit must serialize per bill.
    #[instrument(skip(db))]
    pub async fn mark_as_paid(
        db: &Database,
        user_id: i64,
        id: i64,
        paid_date: DateTime<Utc>,
    ) -> Result<BillView, BillError> {
        let mut uow = db.begin().await.map_err(RepositoryError::from)?;
        let mut repo = BillRepository::new(uow.connection());

        let bill = repo.find_by_id(user_id, id).await?.ok_or(BillError::NotFound)?;
        if !bill.is_active {
            return Err(BillError::InvalidInput(
                "Cannot record a payment on an inactive bill".to_string(),
            ));
        }

        let next = schedule::advance_after_payment(&bill, paid_date);
        repo.record_payment(user_id, id, paid_date, &next).await?;
        let updated = repo.find_by_id(user_id, id).await?.ok_or(BillError::NotFound)?;

        uow.commit().await.map_err(RepositoryError::from)?;

        Ok(BillView::new(updated, paid_date))
    }

    #[instrument(skip(db))]
    pub async fn update_amount(
        db: &Database,
        user_id: i64,
        id: i64,
        amount_dollars: f64,
    ) -> Result<(), BillError> {
        if amount_dollars < 0.0 {
            return Err(BillError::InvalidInput(
                "Amount must be a non-negative number".to_string(),
            ));
        }
        let amount = (amount_dollars * 100.0).round() as i64;

        let mut uow = db.begin().await.map_err(RepositoryError::from)?;
        let mut repo = BillRepository::new(uow.connection());

        repo.set_amount(user_id, id, amount).await?;

        uow.commit().await.map_err(RepositoryError::from)?;
        Ok(())
    }

    #[instrument(skip(db))]
    pub async fn deactivate_bill(db: &Database, user_id: i64, id: i64) -> Result<(), BillError> {
        let mut uow = db.begin().await.map_err(RepositoryError::from)?;
        let mut repo = BillRepository::new(uow.connection());

        repo.deactivate(user_id, id).await?;

        uow.commit().await.map_err(RepositoryError::from)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecurrenceType;
    use chrono::TimeZone;
    use database::get_test_db;

    fn dt(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn raw(due: DateTime<Utc>, end: Option<DateTime<Utc>>) -> RawCreateBillRequest {
        RawCreateBillRequest {
            name: "Gym".to_string(),
            amount_dollars: 25.0,
            category: "Health".to_string(),
            due_date: due,
            recurrence_type: "monthly".to_string(),
            recurrence_interval: 1,
            recurrence_end_date: end,
            reminder_days: vec![1],
            is_auto_pay: false,
        }
    }

    #[tokio::test]
    async fn test_create_rolls_past_anchor_to_next_cycle() {
        let db = get_test_db().await;

        // Anchored Jan 1, created mid-March: first live occurrence Apr 1.
        let id = BillService::create_bill(&db, 1, raw(dt(2024, 1, 1), None), dt(2024, 3, 15))
            .await
            .unwrap();
        let view = BillService::get_bill(&db, 1, id, dt(2024, 3, 15)).await.unwrap();

        assert_eq!(view.bill.next_due_date, dt(2024, 4, 1));
        assert_eq!(view.bill.recurrence.kind, RecurrenceType::Monthly);
        assert!(view.bill.is_active);
    }

    #[tokio::test]
    async fn test_mark_as_paid_advances_schedule() {
        let db = get_test_db().await;

        let id = BillService::create_bill(&db, 1, raw(dt(2024, 6, 1), None), dt(2024, 5, 1))
            .await
            .unwrap();
        let view = BillService::mark_as_paid(&db, 1, id, dt(2024, 6, 1)).await.unwrap();

        assert_eq!(view.bill.last_paid_date, Some(dt(2024, 6, 1)));
        assert_eq!(view.bill.next_due_date, dt(2024, 7, 1));
        assert!(view.bill.is_active);
    }

    #[tokio::test]
    async fn test_mark_as_paid_expires_past_end_date() {
        let db = get_test_db().await;

        let id = BillService::create_bill(
            &db,
            1,
            raw(dt(2024, 6, 1), Some(dt(2024, 6, 15))),
            dt(2024, 5, 1),
        )
        .await
        .unwrap();
        let view = BillService::mark_as_paid(&db, 1, id, dt(2024, 6, 1)).await.unwrap();

        // Next cycle would be Jul 1, past the end date: keep the last
        // valid occurrence and deactivate.
        assert_eq!(view.bill.next_due_date, dt(2024, 6, 1));
        assert!(!view.bill.is_active);
    }

    #[tokio::test]
    async fn test_reminders_due_filters_by_day_list() {
        let db = get_test_db().await;

        let id = BillService::create_bill(&db, 1, raw(dt(2024, 6, 10), None), dt(2024, 6, 1))
            .await
            .unwrap();

        // reminder_days = [1]: fires exactly one day out.
        let due = BillService::reminders_due(&db, 1, dt(2024, 6, 9)).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].bill.id, id);

        let not_due = BillService::reminders_due(&db, 1, dt(2024, 6, 7)).await.unwrap();
        assert!(not_due.is_empty());
    }

    #[tokio::test]
    async fn test_update_amount_rejects_negative() {
        let db = get_test_db().await;

        let id = BillService::create_bill(&db, 1, raw(dt(2024, 6, 1), None), dt(2024, 5, 1))
            .await
            .unwrap();
        let result = BillService::update_amount(&db, 1, id, -10.0).await;

        assert!(matches!(result, Err(BillError::InvalidInput(_))));
    }
}
