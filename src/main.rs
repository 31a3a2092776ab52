use std::{net::SocketAddr, sync::Arc};

use axum::Server;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use task_manager_api::{config::Config, db, route::create_router, AppState};

// Entry point of the application
#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "task_manager_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(error = %err, "invalid configuration");
            std::process::exit(1);
        }
    };

    let pool = match db::connect(&config).await {
        Ok(pool) => pool,
        Err(err) => {
            tracing::error!(error = %err, "failed to connect to the database");
            std::process::exit(1);
        }
    };

    if let Err(err) = db::init_schema(&pool).await {
        tracing::error!(error = %err, "failed to create tables");
        std::process::exit(1);
    }

    let addr: SocketAddr = match format!("{}:{}", config.host, config.port).parse() {
        Ok(addr) => addr,
        Err(err) => {
            tracing::error!(error = %err, host = %config.host, "invalid bind address");
            std::process::exit(1);
        }
    };

    let app = create_router(Arc::new(AppState::new(config, pool)));

    tracing::info!(%addr, "server started successfully");

    if let Err(err) = Server::bind(&addr)
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %err, "server error");
        std::process::exit(1);
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
