//! Recurring transactions scheduler: a ticker enqueues due rules and wakes a
//! pool of workers that drain the job queue.

use std::{sync::Arc, time::Duration};

use chrono::Utc;
use engine::{Engine, EngineError};
use tokio::{
    sync::{Notify, watch},
    task::JoinSet,
};
use tracing::{debug, info, warn};

use crate::settings;

#[derive(Clone, Copy, Debug)]
pub struct SchedulerConfig {
    pub tick: Duration,
    pub workers: usize,
    pub max_attempts: u32,
    pub retry_delay: chrono::Duration,
}

impl From<&settings::Scheduler> for SchedulerConfig {
    fn from(value: &settings::Scheduler) -> Self {
        Self {
            tick: Duration::from_secs(value.tick_secs.max(1)),
            workers: value.workers.max(1),
            max_attempts: value.max_attempts.max(1),
            retry_delay: chrono::Duration::seconds(value.retry_delay_secs.max(0)),
        }
    }
}

/// Enqueues the due rules and tells whether there is something to run.
async fn tick(engine: &Engine, config: &SchedulerConfig) -> Result<bool, EngineError> {
    let now = Utc::now();
    let enqueued = engine.enqueue_due_rules(now, config.max_attempts).await?;
    if enqueued > 0 {
        info!(enqueued, "recurring jobs enqueued");
    }
    engine.has_runnable_jobs(now).await
}

/// Claims and processes jobs until none is runnable. Returns the number of
/// transactions created.
async fn drain(engine: &Engine, config: &SchedulerConfig, worker: usize) -> Result<u64, EngineError> {
    let mut materialized = 0;
    loop {
        let now = Utc::now();
        let Some(job) = engine.claim_next_job(now).await? else {
            return Ok(materialized);
        };
        match engine.process_job(job.id, now).await {
            Ok(created) => {
                debug!(worker, job_id = %job.id, created, "recurring job completed");
                materialized += created;
            }
            Err(err) => {
                warn!(worker, job_id = %job.id, attempt = job.attempts, "recurring job failed: {err}");
                engine
                    .fail_job(job.id, &err.to_string(), now, config.retry_delay)
                    .await?;
            }
        }
    }
}

async fn worker(
    id: usize,
    engine: Arc<Engine>,
    config: SchedulerConfig,
    wake: Arc<Notify>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            _ = wake.notified() => {
                if let Err(err) = drain(&engine, &config, id).await {
                    warn!(worker = id, "recurring worker error: {err}");
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    debug!(worker = id, "recurring worker shutting down");
                    break;
                }
            }
        }
    }
}

/// Runs the ticker and `config.workers` workers until `shutdown` flips to
/// `true`.
pub async fn run(engine: Arc<Engine>, config: SchedulerConfig, mut shutdown: watch::Receiver<bool>) {
    let wake = Arc::new(Notify::new());
    let mut workers = JoinSet::new();
    for id in 0..config.workers {
        workers.spawn(worker(
            id,
            engine.clone(),
            config,
            wake.clone(),
            shutdown.clone(),
        ));
    }
    info!(workers = config.workers, tick = ?config.tick, "recurring scheduler started");

    let mut interval = tokio::time::interval(config.tick);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = interval.tick() => {
                debug!("recurring scheduler tick");
                match tick(&engine, &config).await {
                    Ok(true) => {
                        for _ in 0..config.workers {
                            wake.notify_one();
                        }
                    }
                    Ok(false) => {}
                    Err(err) => warn!("recurring scheduler tick failed: {err}"),
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("recurring scheduler shutting down");
                    break;
                }
            }
        }
    }

    while workers.join_next().await.is_some() {}
}

#[cfg(test)]
mod tests {
    use chrono::Duration as ChronoDuration;
    use engine::{AccountKind, Currency, Frequency, NewAccountCmd, NewTransactionCmd, RecurrenceSpec};
    use migration::MigratorTrait;
    use sea_orm::Database;
    use uuid::Uuid;

    use super::*;

    fn config() -> SchedulerConfig {
        SchedulerConfig {
            tick: Duration::from_millis(20),
            workers: 2,
            max_attempts: 3,
            retry_delay: ChronoDuration::seconds(30),
        }
    }

    async fn engine_with_rule() -> (Arc<Engine>, Uuid, Uuid) {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        migration::Migrator::up(&db, None).await.unwrap();
        let engine = Engine::builder()
            .database(db)
            .password_iterations(1_000)
            .build()
            .await
            .unwrap();
        let user = engine
            .register("sched@example.com", "correct horse", None, None)
            .await
            .unwrap();
        let account = engine
            .new_account(
                user.id,
                NewAccountCmd::new("Main", AccountKind::Checking, Currency::Eur),
            )
            .await
            .unwrap();
        let start = Utc::now() - ChronoDuration::days(3);
        engine
            .new_transaction(
                user.id,
                NewTransactionCmd::expense(500, start)
                    .account(account.id)
                    .recurring(RecurrenceSpec::new(Frequency::Daily, 1)),
            )
            .await
            .unwrap();
        (Arc::new(engine), user.id, account.id)
    }

    #[tokio::test]
    async fn tick_then_drain_materializes_due_occurrences() {
        let (engine, user_id, account_id) = engine_with_rule().await;
        let config = config();

        assert!(tick(&engine, &config).await.unwrap());
        let created = drain(&engine, &config, 0).await.unwrap();
        assert_eq!(created, 3);
        assert!(!tick(&engine, &config).await.unwrap());

        let account = engine.account(user_id, account_id).await.unwrap();
        assert_eq!(account.balance_minor, -4 * 500);
    }

    #[tokio::test]
    async fn run_processes_jobs_and_stops_on_shutdown() {
        let (engine, user_id, _) = engine_with_rule().await;
        let (tx, rx) = watch::channel(false);

        let handle = tokio::spawn(run(engine.clone(), config(), rx));
        let mut completed = 0;
        for _ in 0..100 {
            tokio::time::sleep(Duration::from_millis(20)).await;
            completed = engine.queue_stats(Some(user_id)).await.unwrap().completed;
            if completed > 0 {
                break;
            }
        }
        assert_eq!(completed, 1);

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
