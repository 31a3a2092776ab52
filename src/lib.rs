pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod filter;
pub mod handler;
pub mod middleware;
pub mod model;
pub mod route;
pub mod schema;
pub mod stats;
pub mod tasks;

use sqlx::SqlitePool;

use crate::{auth::AuthService, config::Config, stats::StatsAggregator, tasks::TaskService};

// Struct representing the application state
pub struct AppState {
    pub config: Config,
    pub auth: AuthService,
    pub tasks: TaskService,
    pub stats: StatsAggregator,
}

impl AppState {
    pub fn new(config: Config, db: SqlitePool) -> Self {
        Self {
            auth: AuthService::new(db.clone(), &config),
            tasks: TaskService::new(db.clone()),
            stats: StatsAggregator::new(db),
            config,
        }
    }
}
