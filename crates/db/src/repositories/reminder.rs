//! Reminder repository — scheduled notifications for upcoming events.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};

use crate::entities::{reminder, Reminder};
use fedevents_common::{AppError, AppResult};

/// Reminder repository for database operations.
#[derive(Clone)]
pub struct ReminderRepository {
    db: Arc<DatabaseConnection>,
}

impl ReminderRepository {
    /// Create a new reminder repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a reminder by id.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<reminder::Model>> {
        Reminder::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Insert a new reminder row.
    pub async fn create(&self, model: reminder::ActiveModel) -> AppResult<reminder::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Rows due to fire: `status = PENDING AND remind_at <= now`, oldest
    /// first, capped at `limit` per tick.
    pub async fn find_due(&self, now: DateTime<Utc>, limit: u64) -> AppResult<Vec<reminder::Model>> {
        Reminder::find()
            .filter(reminder::Column::Status.eq(reminder::ReminderStatus::Pending))
            .filter(reminder::Column::RemindAt.lte(now))
            .order_by_asc(reminder::Column::RemindAt)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Claim a due reminder by conditionally moving it `PENDING -> SENT`.
    /// Returns `false` if another ticker instance already claimed it first
    /// (the row no longer reads as PENDING).
    pub async fn claim(&self, id: &str) -> AppResult<bool> {
        let Some(row) = self.find_by_id(id).await? else {
            return Ok(false);
        };
        if row.status != reminder::ReminderStatus::Pending {
            return Ok(false);
        }
        let mut active: reminder::ActiveModel = row.into();
        active.status = Set(reminder::ReminderStatus::Sent);
        active
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(true)
    }

    /// Cancel a pending reminder (event deleted, or attendee un-RSVP'd).
    pub async fn cancel(&self, id: &str) -> AppResult<()> {
        let Some(row) = self.find_by_id(id).await? else {
            return Ok(());
        };
        let mut active: reminder::ActiveModel = row.into();
        active.status = Set(reminder::ReminderStatus::Cancelled);
        active
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Pending reminders tied to an event, for recurrence materialization and
    /// cascade-cancel when the event is deleted or rescheduled.
    pub async fn find_pending_by_event(&self, event_id: &str) -> AppResult<Vec<reminder::Model>> {
        Reminder::find()
            .filter(reminder::Column::EventId.eq(event_id))
            .filter(reminder::Column::Status.eq(reminder::ReminderStatus::Pending))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn test_row(id: &str, status: reminder::ReminderStatus) -> reminder::Model {
        reminder::Model {
            id: id.to_string(),
            user_id: "u1".to_string(),
            event_id: "e1".to_string(),
            remind_at: Utc::now().into(),
            minutes_before_start: 60,
            status,
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn claim_succeeds_on_pending_row() {
        let row = test_row("r1", reminder::ReminderStatus::Pending);
        let sent = reminder::Model {
            status: reminder::ReminderStatus::Sent,
            ..row.clone()
        };
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![row]])
                .append_query_results([vec![sent]])
                .into_connection(),
        );

        let repo = ReminderRepository::new(db);
        assert!(repo.claim("r1").await.unwrap());
    }

    #[tokio::test]
    async fn claim_fails_on_already_sent_row() {
        let row = test_row("r1", reminder::ReminderStatus::Sent);
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![row]])
                .into_connection(),
        );

        let repo = ReminderRepository::new(db);
        assert!(!repo.claim("r1").await.unwrap());
    }
}
