//! Translation of the optional list-filter parameters into an owner-scoped
//! predicate over tasks.
//!
//! [`TaskFilter::build`] is pure: it only inspects its arguments and returns an
//! immutable list of clauses. The clauses are combined conjunctively and the
//! owner clause is always first, so no filter can ever select another user's
//! rows.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use sqlx::{QueryBuilder, Sqlite};

use crate::{error::AppError, schema::TaskFilterParams};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Clause {
    Owner(String),
    Completed(bool),
    Priority(String),
    /// Case-insensitive substring match on the title.
    TitleContains(String),
    DueDate(DateTime<Utc>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFilter {
    clauses: Vec<Clause>,
}

impl TaskFilter {
    pub fn build(owner_id: &str, params: &TaskFilterParams) -> Result<Self, AppError> {
        let mut clauses = vec![Clause::Owner(owner_id.to_string())];

        match present(&params.status) {
            Some("completed") => clauses.push(Clause::Completed(true)),
            Some("pending") => clauses.push(Clause::Completed(false)),
            _ => {}
        }

        if let Some(priority) = present(&params.priority) {
            clauses.push(Clause::Priority(priority.to_string()));
        }

        if let Some(search) = present(&params.search) {
            clauses.push(Clause::TitleContains(search.to_string()));
        }

        if let Some(raw) = present(&params.due_date) {
            let due = parse_due_date(raw).ok_or(AppError::InvalidParameter("dueDate"))?;
            clauses.push(Clause::DueDate(due));
        }

        Ok(Self { clauses })
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    /// Appends the store-side part of the predicate as a `WHERE` clause with
    /// every value bound. The title search is not rendered here: SQLite's
    /// `lower()` only folds ASCII, so it is applied by [`TaskFilter::matches_title`]
    /// on the already owner-scoped rows.
    pub fn push_where(&self, builder: &mut QueryBuilder<'_, Sqlite>) {
        builder.push(" WHERE ");
        let mut first = true;
        for clause in &self.clauses {
            if matches!(clause, Clause::TitleContains(_)) {
                continue;
            }
            if !first {
                builder.push(" AND ");
            }
            first = false;
            match clause {
                Clause::Owner(owner) => {
                    builder.push("user_id = ").push_bind(owner.clone());
                }
                Clause::Completed(completed) => {
                    builder.push("completed = ").push_bind(*completed);
                }
                Clause::Priority(priority) => {
                    builder.push("priority = ").push_bind(priority.clone());
                }
                Clause::DueDate(due) => {
                    builder.push("due_date = ").push_bind(*due);
                }
                Clause::TitleContains(_) => {}
            }
        }
    }

    /// Unicode case-insensitive substring test for the title clauses. True
    /// when the filter has no search.
    pub fn matches_title(&self, title: &str) -> bool {
        let folded = title.to_lowercase();
        self.clauses.iter().all(|clause| match clause {
            Clause::TitleContains(needle) => folded.contains(&needle.to_lowercase()),
            _ => true,
        })
    }
}

// Empty query values count as absent
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Accepts an RFC 3339 timestamp or a bare `YYYY-MM-DD` date (midnight UTC).
pub fn parse_due_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Some(timestamp.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
    let midnight = date.and_hms_opt(0, 0, 0)?;
    Some(Utc.from_utc_datetime(&midnight))
}
