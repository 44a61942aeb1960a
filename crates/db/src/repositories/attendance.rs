//! Attendance repository.

use std::sync::Arc;

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, Set,
};

use crate::entities::{attendance, Attendance};
use fedevents_common::{AppError, AppResult};

/// Attendance repository for database operations.
#[derive(Clone)]
pub struct AttendanceRepository {
    db: Arc<DatabaseConnection>,
}

impl AttendanceRepository {
    /// Create a new attendance repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find the attendance row for `(event_id, user_id)`, the composite key
    /// composite key (at most one status per event per user).
    pub async fn find_by_pair(
        &self,
        event_id: &str,
        user_id: &str,
    ) -> AppResult<Option<attendance::Model>> {
        Attendance::find()
            .filter(attendance::Column::EventId.eq(event_id))
            .filter(attendance::Column::UserId.eq(user_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find by the `ActivityPub` activity id that produced the row (the
    /// remote `Accept`/`TentativeAccept`/`Reject`), for idempotent upserts.
    pub async fn find_by_external_id(
        &self,
        external_id: &str,
    ) -> AppResult<Option<attendance::Model>> {
        Attendance::find()
            .filter(attendance::Column::ExternalId.eq(external_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Insert a new attendance row.
    pub async fn create(&self, model: attendance::ActiveModel) -> AppResult<attendance::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Upsert `(event_id, user_id)` to `status`, keyed by the composite
    /// unique pair. Returns the resulting row.
    pub async fn upsert_status(
        &self,
        event_id: &str,
        user_id: &str,
        status: attendance::AttendanceStatus,
        external_id: Option<String>,
        id_gen: impl Fn() -> String,
    ) -> AppResult<attendance::Model> {
        if let Some(existing) = self.find_by_pair(event_id, user_id).await? {
            let mut active: attendance::ActiveModel = existing.into();
            active.status = Set(status);
            active.updated_at = Set(Some(chrono::Utc::now().into()));
            if let Some(eid) = external_id {
                active.external_id = Set(Some(eid));
            }
            return active
                .update(self.db.as_ref())
                .await
                .map_err(|e| AppError::Database(e.to_string()));
        }

        let now = chrono::Utc::now();
        let active = attendance::ActiveModel {
            id: Set(id_gen()),
            event_id: Set(event_id.to_string()),
            user_id: Set(user_id.to_string()),
            status: Set(status),
            external_id: Set(external_id),
            created_at: Set(now.into()),
            updated_at: Set(None),
        };
        self.create(active).await
    }

    /// Delete the attendance row for `(event_id, user_id)`, if any.
    pub async fn delete_by_pair(&self, event_id: &str, user_id: &str) -> AppResult<bool> {
        let Some(existing) = self.find_by_pair(event_id, user_id).await? else {
            return Ok(false);
        };
        existing
            .delete(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(true)
    }

    /// All attendance rows for an event, for addressing/notification fan-out.
    pub async fn find_by_event(&self, event_id: &str) -> AppResult<Vec<attendance::Model>> {
        Attendance::find()
            .filter(attendance::Column::EventId.eq(event_id))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count of attendance rows created for `event_id` on or after `since`
    /// (used by the trending scorer's engagement window).
    pub async fn count_since(
        &self,
        event_id: &str,
        since: chrono::DateTime<chrono::Utc>,
    ) -> AppResult<u64> {
        Attendance::find()
            .filter(attendance::Column::EventId.eq(event_id))
            .filter(attendance::Column::CreatedAt.gte(since))
            .count(self.db.as_ref())
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

    fn test_row(event_id: &str, user_id: &str) -> attendance::Model {
        attendance::Model {
            id: "a1".to_string(),
            event_id: event_id.to_string(),
            user_id: user_id.to_string(),
            status: attendance::AttendanceStatus::Attending,
            external_id: None,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn upsert_updates_existing_row() {
        let row = test_row("e1", "u1");
        let updated = attendance::Model {
            status: attendance::AttendanceStatus::Maybe,
            ..row.clone()
        };
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![row]])
                .append_query_results([vec![updated]])
                .into_connection(),
        );

        let repo = AttendanceRepository::new(db);
        let result = repo
            .upsert_status(
                "e1",
                "u1",
                attendance::AttendanceStatus::Maybe,
                None,
                || "unused".to_string(),
            )
            .await
            .unwrap();
        assert_eq!(result.status, attendance::AttendanceStatus::Maybe);
    }

    #[tokio::test]
    async fn delete_by_pair_missing_is_noop() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<attendance::Model>::new()])
                .into_connection(),
        );

        let repo = AttendanceRepository::new(db);
        let deleted = repo.delete_by_pair("e1", "u1").await.unwrap();
        assert!(!deleted);
    }
}
