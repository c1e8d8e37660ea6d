use std::sync::Arc;

use migration::{Migrator, MigratorTrait};
use server::ServerOptions;
use tokio::sync::watch;

mod scheduler;
mod settings;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = settings::Settings::new()?;
    let mut tasks = tokio::task::JoinSet::new();

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "moneta={level},server={level},engine={level},migration={level}",
            level = settings.app.level
        ))
        .init();

    let db = connect_database(&settings.server.database).await?;
    let engine = Arc::new(
        engine::Engine::builder()
            .database(db)
            .password_iterations(settings.auth.password_iterations)
            .job_lease(chrono::Duration::seconds(settings.scheduler.lease_secs))
            .build()
            .await?,
    );

    let scheduler_config = scheduler::SchedulerConfig::from(&settings.scheduler);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    {
        let engine = engine.clone();
        let addr = settings.server.addr();
        let options = ServerOptions {
            max_attempts: scheduler_config.max_attempts,
            retry_delay: scheduler_config.retry_delay,
        };
        let mut shutdown = shutdown_rx.clone();
        tasks.spawn(async move {
            let signal = async move {
                let _ = shutdown.wait_for(|stop| *stop).await;
            };
            if let Err(err) = server::run(engine, options, &addr, signal).await {
                tracing::error!("server failed: {err}");
            }
        });
    }

    if settings.scheduler.enabled {
        let engine = engine.clone();
        let shutdown = shutdown_rx.clone();
        tasks.spawn(async move {
            scheduler::run(engine, scheduler_config, shutdown).await;
        });
    } else {
        tracing::info!("recurring scheduler disabled");
    }

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown requested");
        }
        _ = tasks.join_next() => {
            tracing::warn!("a task stopped, shutting down");
        }
    }
    let _ = shutdown_tx.send(true);
    while tasks.join_next().await.is_some() {}

    Ok(())
}

async fn connect_database(
    config: &settings::Database,
) -> Result<sea_orm::DatabaseConnection, Box<dyn std::error::Error + Send + Sync>> {
    let database = sea_orm::Database::connect(config.url()).await?;
    Migrator::up(&database, None).await?;
    tracing::info!("database ready");
    Ok(database)
}
