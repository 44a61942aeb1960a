//! Processed activity repository — replay-defense ledger for inbound activities.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

use crate::entities::{processed_activity, ProcessedActivity};
use fedevents_common::{AppError, AppResult};

/// Processed activity repository for database operations.
#[derive(Clone)]
pub struct ProcessedActivityRepository {
    db: Arc<DatabaseConnection>,
}

impl ProcessedActivityRepository {
    /// Create a new processed activity repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Whether `activity_id` has already been processed.
    pub async fn exists(&self, activity_id: &str) -> AppResult<bool> {
        ProcessedActivity::find_by_id(activity_id)
            .one(self.db.as_ref())
            .await
            .map(|row| row.is_some())
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Record `activity_id` as processed, expiring after `ttl_days`. Callers
    /// should have already checked `exists` inside the same inbound-request
    /// handling path; a duplicate insert surfaces as a database error due to
    /// the primary key, which the caller treats the same as "already seen".
    pub async fn insert(&self, activity_id: &str, ttl_days: i64) -> AppResult<()> {
        let now = Utc::now();
        let active = processed_activity::ActiveModel {
            activity_id: Set(activity_id.to_string()),
            expires_at: Set((now + chrono::Duration::days(ttl_days)).into()),
        };
        active
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Delete rows whose `expires_at` has passed (GC ticker).
    pub async fn delete_expired(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let result = ProcessedActivity::delete_many()
            .filter(processed_activity::Column::ExpiresAt.lte(now))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    #[tokio::test]
    async fn exists_true_when_row_present() {
        let row = processed_activity::Model {
            activity_id: "https://remote/activities/1".to_string(),
            expires_at: Utc::now().into(),
        };
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[row]])
                .into_connection(),
        );

        let repo = ProcessedActivityRepository::new(db);
        assert!(repo.exists("https://remote/activities/1").await.unwrap());
    }

    #[tokio::test]
    async fn exists_false_when_absent() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<processed_activity::Model>::new()])
                .into_connection(),
        );

        let repo = ProcessedActivityRepository::new(db);
        assert!(!repo.exists("https://remote/activities/1").await.unwrap());
    }

    #[tokio::test]
    async fn delete_expired_reports_rows_affected() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 3,
                }])
                .into_connection(),
        );

        let repo = ProcessedActivityRepository::new(db);
        let deleted = repo.delete_expired(Utc::now()).await.unwrap();
        assert_eq!(deleted, 3);
    }
}
