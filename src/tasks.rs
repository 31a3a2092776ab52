//! Owner-scoped task operations. Every statement here carries
//! `user_id = <caller>` so a task owned by someone else behaves exactly like a
//! task that does not exist.

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::{
    error::AppError,
    filter::{parse_due_date, TaskFilter},
    model::Task,
    schema::{CreateTaskSchema, TaskFilterParams, UpdateTaskSchema},
};

const TASK_COLUMNS: &str =
    "id, title, description, completed, priority, due_date, user_id, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct TaskService {
    pool: SqlitePool,
}

impl TaskService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Most recently created first; an empty result is not an error.
    pub async fn list(
        &self,
        owner_id: &str,
        params: &TaskFilterParams,
    ) -> Result<Vec<Task>, AppError> {
        let filter = TaskFilter::build(owner_id, params)?;

        let mut builder = QueryBuilder::<Sqlite>::new(format!("SELECT {TASK_COLUMNS} FROM tasks"));
        filter.push_where(&mut builder);
        builder.push(" ORDER BY created_at DESC, rowid DESC");

        let tasks = builder
            .build_query_as::<Task>()
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .filter(|task| filter.matches_title(&task.title))
            .collect();
        Ok(tasks)
    }

    pub async fn create(&self, owner_id: &str, fields: CreateTaskSchema) -> Result<Task, AppError> {
        let title = fields.title.trim();
        if title.is_empty() {
            return Err(AppError::Validation("Title is required".to_string()));
        }
        let due_date = due_date_field(fields.due_date.as_deref())?;
        let now = Utc::now();

        let task = sqlx::query_as::<_, Task>(&format!(
            "INSERT INTO tasks (id, title, description, completed, priority, due_date, user_id, created_at, updated_at) \
             VALUES (?, ?, ?, 0, ?, ?, ?, ?, ?) RETURNING {TASK_COLUMNS}"
        ))
        .bind(Uuid::new_v4().to_string())
        .bind(title)
        .bind(fields.description)
        .bind(non_blank(fields.priority))
        .bind(due_date)
        .bind(owner_id)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!(task_id = %task.id, owner_id, "task created");
        Ok(task)
    }

    pub async fn get(&self, owner_id: &str, task_id: &str) -> Result<Task, AppError> {
        sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id = ? AND user_id = ?"
        ))
        .bind(task_id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::NotFound("task"))
    }

    pub async fn update(
        &self,
        owner_id: &str,
        task_id: &str,
        fields: UpdateTaskSchema,
    ) -> Result<Task, AppError> {
        let title = match fields.title {
            Some(title) if title.trim().is_empty() => {
                return Err(AppError::Validation("Title cannot be empty".to_string()))
            }
            Some(title) => Some(title.trim().to_string()),
            None => None,
        };
        let due_date = due_date_field(fields.due_date.as_deref())?;

        let mut builder = QueryBuilder::<Sqlite>::new("UPDATE tasks SET updated_at = ");
        builder.push_bind(Utc::now());
        if let Some(title) = title {
            builder.push(", title = ").push_bind(title);
        }
        if let Some(description) = fields.description {
            builder.push(", description = ").push_bind(description);
        }
        if let Some(priority) = fields.priority {
            builder.push(", priority = ").push_bind(non_blank(Some(priority)));
        }
        if let Some(due_date) = due_date {
            builder.push(", due_date = ").push_bind(due_date);
        }
        if let Some(completed) = fields.completed {
            builder.push(", completed = ").push_bind(completed);
        }
        builder
            .push(" WHERE id = ")
            .push_bind(task_id.to_string())
            .push(" AND user_id = ")
            .push_bind(owner_id.to_string())
            .push(format!(" RETURNING {TASK_COLUMNS}"));

        builder
            .build_query_as::<Task>()
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::NotFound("task"))
    }

    pub async fn set_completion(
        &self,
        owner_id: &str,
        task_id: &str,
        completed: bool,
    ) -> Result<Task, AppError> {
        sqlx::query_as::<_, Task>(&format!(
            "UPDATE tasks SET completed = ?, updated_at = ? WHERE id = ? AND user_id = ? \
             RETURNING {TASK_COLUMNS}"
        ))
        .bind(completed)
        .bind(Utc::now())
        .bind(task_id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::NotFound("task"))
    }

    pub async fn delete(&self, owner_id: &str, task_id: &str) -> Result<(), AppError> {
        let rows_affected = sqlx::query("DELETE FROM tasks WHERE id = ? AND user_id = ?")
            .bind(task_id)
            .bind(owner_id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        if rows_affected == 0 {
            return Err(AppError::NotFound("task"));
        }
        tracing::debug!(task_id, owner_id, "task deleted");
        Ok(())
    }
}

/// Number of tasks the owner has.
pub async fn count_owned(pool: &SqlitePool, owner_id: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM tasks WHERE user_id = ?")
        .bind(owner_id)
        .fetch_one(pool)
        .await
}

fn due_date_field(raw: Option<&str>) -> Result<Option<DateTime<Utc>>, AppError> {
    match raw.map(str::trim).filter(|raw| !raw.is_empty()) {
        Some(raw) => parse_due_date(raw)
            .map(Some)
            .ok_or(AppError::InvalidParameter("dueDate")),
        None => Ok(None),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
