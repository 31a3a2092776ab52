use std::time::Duration;

use sqlx::{migrate::MigrateDatabase, sqlite::SqlitePoolOptions, Sqlite, SqlitePool};

use crate::config::Config;

const SCHEMA: [&str; 3] = [
    r#"CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY NOT NULL,
        username TEXT NOT NULL UNIQUE,
        email TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        created_at TEXT NOT NULL
    );"#,
    r#"CREATE TABLE IF NOT EXISTS tasks (
        id TEXT PRIMARY KEY NOT NULL,
        user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        title TEXT NOT NULL,
        description TEXT,
        completed BOOLEAN NOT NULL DEFAULT 0,
        priority TEXT,
        due_date TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );"#,
    "CREATE INDEX IF NOT EXISTS tasks_user_created ON tasks (user_id, created_at);",
];

/// Opens the pool, creating the database file when it does not exist yet.
pub async fn connect(config: &Config) -> Result<SqlitePool, sqlx::Error> {
    let url = config.database_url.as_str();

    if !Sqlite::database_exists(url).await.unwrap_or(false) {
        tracing::info!(url, "creating database");
        Sqlite::create_database(url).await?;
    }

    // An in-memory database lives only as long as its connection
    let in_memory = url.contains(":memory:");
    let options = if in_memory {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
    } else {
        SqlitePoolOptions::new().max_connections(config.database_max_connections)
    };

    let pool = options.connect(url).await?;
    tracing::info!(in_memory, "connection to the database is successful");
    Ok(pool)
}

pub async fn init_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    tracing::debug!("schema ready");
    Ok(())
}
