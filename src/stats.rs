use sqlx::SqlitePool;

use crate::{error::AppError, model::TaskSummary};

#[derive(Debug, Clone)]
pub struct StatsAggregator {
    pool: SqlitePool,
}

impl StatsAggregator {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Both counts come from one statement, so they describe the same
    /// snapshot and `completed + pending == total` always holds.
    pub async fn summary(&self, owner_id: &str) -> Result<TaskSummary, AppError> {
        let (total, completed): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COALESCE(SUM(completed), 0) FROM tasks WHERE user_id = ?",
        )
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(TaskSummary {
            total,
            completed,
            pending: total - completed,
        })
    }
}
