use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use sea_orm::{
    ActiveValue, Condition, DatabaseTransaction, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, TransactionTrait, prelude::*, sea_query::Expr,
};

use crate::{
    EngineError, JobStatus, QueueStats, RecurringJob, RecurringRule, ResultEngine, RunReport,
    Transaction,
    recurrence::occurrence,
    recurring_jobs, recurring_rules, transactions,
};

use super::{Engine, with_tx};

/// Upper bound of occurrences created by a single job. A rule that is further
/// behind stays due and is picked up again on the next pass.
const MAX_CATCH_UP: u32 = 500;

impl Engine {
    /// Recurring rules of a user, newest first.
    pub async fn recurring_rules(&self, user_id: Uuid) -> ResultEngine<Vec<RecurringRule>> {
        recurring_rules::Entity::find()
            .filter(recurring_rules::Column::UserId.eq(user_id))
            .order_by_desc(recurring_rules::Column::CreatedAt)
            .all(&self.database)
            .await?
            .into_iter()
            .map(RecurringRule::try_from)
            .collect()
    }

    /// Stops a rule. Jobs not yet started are dropped; existing occurrences
    /// stay.
    pub async fn cancel_recurring_rule(
        &self,
        user_id: Uuid,
        rule_id: Uuid,
    ) -> ResultEngine<RecurringRule> {
        with_tx!(self, |db_tx| {
            let model = recurring_rules::Entity::find_by_id(rule_id)
                .filter(recurring_rules::Column::UserId.eq(user_id))
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("recurring rule not exists".to_string()))?;

            recurring_jobs::Entity::delete_many()
                .filter(recurring_jobs::Column::RuleId.eq(rule_id))
                .filter(recurring_jobs::Column::Status.is_in([
                    JobStatus::Waiting.as_str(),
                    JobStatus::Delayed.as_str(),
                ]))
                .exec(&db_tx)
                .await?;

            let mut active: recurring_rules::ActiveModel = model.into();
            active.is_active = ActiveValue::Set(false);
            let model = active.update(&db_tx).await?;
            tracing::info!(%rule_id, "recurring rule cancelled");
            RecurringRule::try_from(model)
        })
    }

    /// Enqueues one `waiting` job for every active rule that is due at `now`
    /// and has no pending job yet. Returns the number of new jobs.
    pub async fn enqueue_due_rules(&self, now: DateTime<Utc>, max_attempts: u32) -> ResultEngine<u64> {
        self.enqueue_rules(None, now, max_attempts).await
    }

    /// Same as [`Engine::enqueue_due_rules`], restricted to one user.
    pub async fn enqueue_user_rules(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
        max_attempts: u32,
    ) -> ResultEngine<u64> {
        self.enqueue_rules(Some(user_id), now, max_attempts).await
    }

    async fn enqueue_rules(
        &self,
        user_id: Option<Uuid>,
        now: DateTime<Utc>,
        max_attempts: u32,
    ) -> ResultEngine<u64> {
        let max_attempts = i32::try_from(max_attempts.max(1)).unwrap_or(i32::MAX);
        with_tx!(self, |db_tx| {
            let mut query = recurring_rules::Entity::find()
                .filter(recurring_rules::Column::IsActive.eq(true))
                .filter(recurring_rules::Column::NextRunAt.lte(now));
            if let Some(user_id) = user_id {
                query = query.filter(recurring_rules::Column::UserId.eq(user_id));
            }
            let due = query.all(&db_tx).await?;

            let mut enqueued = 0;
            for rule in due {
                let pending = recurring_jobs::Entity::find()
                    .filter(recurring_jobs::Column::RuleId.eq(rule.id))
                    .filter(recurring_jobs::Column::Status.is_in(
                        JobStatus::pending().map(JobStatus::as_str),
                    ))
                    .count(&db_tx)
                    .await?;
                if pending > 0 {
                    continue;
                }

                recurring_jobs::ActiveModel {
                    id: ActiveValue::Set(Uuid::new_v4()),
                    rule_id: ActiveValue::Set(rule.id),
                    status: ActiveValue::Set(JobStatus::Waiting.as_str().to_string()),
                    attempts: ActiveValue::Set(0),
                    max_attempts: ActiveValue::Set(max_attempts),
                    run_at: ActiveValue::Set(now),
                    last_error: ActiveValue::Set(None),
                    created_at: ActiveValue::Set(now),
                    updated_at: ActiveValue::Set(now),
                    finished_at: ActiveValue::Set(None),
                }
                .insert(&db_tx)
                .await?;
                enqueued += 1;
            }
            if enqueued > 0 {
                tracing::info!(enqueued, "recurring jobs enqueued");
            }
            Ok(enqueued)
        })
    }

    /// Moves the oldest runnable job to `active` and returns it.
    ///
    /// Runnable means `waiting` or `delayed` with `run_at <= now`, or
    /// `active` past its lease (the worker holding it is gone). A stalled job
    /// with no attempts left is marked `failed` instead.
    ///
    /// The status switch is a conditional update, so two workers racing for
    /// the same row cannot both win: the loser retries with the next job.
    pub async fn claim_next_job(&self, now: DateTime<Utc>) -> ResultEngine<Option<RecurringJob>> {
        self.claim_job(None, now).await
    }

    async fn claim_job(
        &self,
        user_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> ResultEngine<Option<RecurringJob>> {
        let stale_before = now - self.job_lease;
        loop {
            let mut query = recurring_jobs::Entity::find()
                .filter(runnable(now, stale_before))
                .order_by_asc(recurring_jobs::Column::RunAt)
                .order_by_asc(recurring_jobs::Column::CreatedAt);
            if let Some(user_id) = user_id {
                query = query
                    .inner_join(recurring_rules::Entity)
                    .filter(recurring_rules::Column::UserId.eq(user_id));
            }
            let Some(candidate) = query.one(&self.database).await? else {
                return Ok(None);
            };

            let stalled = candidate.status == JobStatus::Active.as_str();
            if stalled && candidate.attempts >= candidate.max_attempts {
                let result = recurring_jobs::Entity::update_many()
                    .col_expr(
                        recurring_jobs::Column::Status,
                        Expr::value(JobStatus::Failed.as_str()),
                    )
                    .col_expr(
                        recurring_jobs::Column::LastError,
                        Expr::value("worker lease expired"),
                    )
                    .col_expr(recurring_jobs::Column::UpdatedAt, Expr::value(now))
                    .col_expr(recurring_jobs::Column::FinishedAt, Expr::value(now))
                    .filter(recurring_jobs::Column::Id.eq(candidate.id))
                    .filter(runnable(now, stale_before))
                    .exec(&self.database)
                    .await?;
                if result.rows_affected > 0 {
                    tracing::warn!(
                        job_id = %candidate.id,
                        attempts = candidate.attempts,
                        "stalled recurring job failed permanently"
                    );
                }
                continue;
            }

            let result = recurring_jobs::Entity::update_many()
                .col_expr(
                    recurring_jobs::Column::Status,
                    Expr::value(JobStatus::Active.as_str()),
                )
                .col_expr(
                    recurring_jobs::Column::Attempts,
                    Expr::col(recurring_jobs::Column::Attempts).add(1),
                )
                .col_expr(recurring_jobs::Column::UpdatedAt, Expr::value(now))
                .filter(recurring_jobs::Column::Id.eq(candidate.id))
                .filter(runnable(now, stale_before))
                .exec(&self.database)
                .await?;
            if result.rows_affected == 0 {
                tracing::debug!(job_id = %candidate.id, "job claimed by another worker");
                continue;
            }
            if stalled {
                tracing::warn!(job_id = %candidate.id, "reclaimed stalled recurring job");
            }

            let model = recurring_jobs::Entity::find_by_id(candidate.id)
                .one(&self.database)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("job not exists".to_string()))?;
            return RecurringJob::try_from(model).map(Some);
        }
    }

    /// Materializes every occurrence of the job's rule that is due at `now`
    /// and marks the job `completed`. Returns the number of transactions
    /// created.
    ///
    /// Occurrences already present (same rule, same date) are never created
    /// twice. Rules past their end date are deactivated.
    pub async fn process_job(&self, job_id: Uuid, now: DateTime<Utc>) -> ResultEngine<u64> {
        with_tx!(self, |db_tx| {
            let job = recurring_jobs::Entity::find_by_id(job_id)
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("job not exists".to_string()))?;
            if job.status != JobStatus::Active.as_str() {
                return Err(EngineError::InvalidKind(format!(
                    "job {job_id} is {}, not active",
                    job.status
                )));
            }

            let created = match recurring_rules::Entity::find_by_id(job.rule_id)
                .one(&db_tx)
                .await?
            {
                Some(rule) => self.materialize_rule(&db_tx, rule, now).await?,
                None => 0,
            };

            let mut active: recurring_jobs::ActiveModel = job.into();
            active.status = ActiveValue::Set(JobStatus::Completed.as_str().to_string());
            active.last_error = ActiveValue::Set(None);
            active.updated_at = ActiveValue::Set(now);
            active.finished_at = ActiveValue::Set(Some(now));
            active.update(&db_tx).await?;
            Ok(created)
        })
    }

    async fn materialize_rule(
        &self,
        db_tx: &DatabaseTransaction,
        rule_model: recurring_rules::Model,
        now: DateTime<Utc>,
    ) -> ResultEngine<u64> {
        let rule = RecurringRule::try_from(rule_model.clone())?;
        if !rule.is_active {
            return Ok(0);
        }

        let Some(template) = transactions::Entity::find_by_id(rule.template_transaction_id)
            .one(db_tx)
            .await?
        else {
            tracing::warn!(rule_id = %rule.id, "template transaction missing, deactivating rule");
            let mut active: recurring_rules::ActiveModel = rule_model.into();
            active.is_active = ActiveValue::Set(false);
            active.update(db_tx).await?;
            return Ok(0);
        };
        let template = Transaction::try_from(template)?;

        let mut n = rule.occurrences;
        let mut next = occurrence(rule.starts_at, rule.frequency, rule.interval, n)?;
        let mut created = 0;
        let mut steps = 0;
        while next <= now
            && rule.end_date.is_none_or(|end| next <= end)
            && steps < MAX_CATCH_UP
        {
            let exists = transactions::Entity::find()
                .filter(transactions::Column::RecurringRuleId.eq(rule.id))
                .filter(transactions::Column::OccurredAt.eq(next))
                .count(db_tx)
                .await?
                > 0;
            if !exists {
                let tx = Transaction {
                    id: Uuid::new_v4(),
                    occurred_at: next,
                    recurring_rule_id: Some(rule.id),
                    attachments: Vec::new(),
                    created_at: now,
                    ..template.clone()
                };
                self.insert_transaction(db_tx, &tx).await?;
                created += 1;
            }
            n += 1;
            steps += 1;
            next = occurrence(rule.starts_at, rule.frequency, rule.interval, n)?;
        }

        let finished = rule.end_date.is_some_and(|end| next > end);
        let mut active: recurring_rules::ActiveModel = rule_model.into();
        active.occurrences = ActiveValue::Set(i32::try_from(n).unwrap_or(i32::MAX));
        active.next_run_at = ActiveValue::Set(next);
        if created > 0 {
            active.last_run_at = ActiveValue::Set(Some(now));
        }
        if finished {
            tracing::info!(rule_id = %rule.id, "recurring rule reached its end date");
            active.is_active = ActiveValue::Set(false);
        }
        active.update(db_tx).await?;
        Ok(created)
    }

    /// Records a failed attempt.
    ///
    /// The job is retried after `retry_delay × attempts` while attempts are
    /// left, otherwise it ends up `failed`.
    pub async fn fail_job(
        &self,
        job_id: Uuid,
        error: &str,
        now: DateTime<Utc>,
        retry_delay: Duration,
    ) -> ResultEngine<RecurringJob> {
        with_tx!(self, |db_tx| {
            let model = recurring_jobs::Entity::find_by_id(job_id)
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("job not exists".to_string()))?;
            let attempts = model.attempts;
            let exhausted = attempts >= model.max_attempts;

            let mut active: recurring_jobs::ActiveModel = model.into();
            active.last_error = ActiveValue::Set(Some(error.to_string()));
            active.updated_at = ActiveValue::Set(now);
            if exhausted {
                tracing::warn!(%job_id, attempts, error, "recurring job failed permanently");
                active.status = ActiveValue::Set(JobStatus::Failed.as_str().to_string());
                active.finished_at = ActiveValue::Set(Some(now));
            } else {
                let backoff = retry_delay * attempts.max(1);
                tracing::warn!(%job_id, attempts, error, "recurring job failed, retrying later");
                active.status = ActiveValue::Set(JobStatus::Delayed.as_str().to_string());
                active.run_at = ActiveValue::Set(now + backoff);
            }
            let model = active.update(&db_tx).await?;
            RecurringJob::try_from(model)
        })
    }

    /// Job counts per status, for everyone or for the rules of one user.
    pub async fn queue_stats(&self, user_id: Option<Uuid>) -> ResultEngine<QueueStats> {
        let mut query = recurring_jobs::Entity::find()
            .select_only()
            .column(recurring_jobs::Column::Status)
            .column_as(recurring_jobs::Column::Id.count(), "count")
            .group_by(recurring_jobs::Column::Status);
        if let Some(user_id) = user_id {
            query = query
                .inner_join(recurring_rules::Entity)
                .filter(recurring_rules::Column::UserId.eq(user_id));
        }
        let rows: Vec<(String, i64)> = query.into_tuple().all(&self.database).await?;

        let mut stats = QueueStats::default();
        for (status, count) in rows {
            stats.add(
                JobStatus::try_from(status.as_str())?,
                u64::try_from(count).unwrap_or_default(),
            );
        }
        Ok(stats)
    }

    /// Enqueues due rules and processes runnable jobs until none is left.
    ///
    /// With a user only that user's rules and jobs are touched. Failing jobs
    /// go through [`Engine::fail_job`]; they are not retried within the same
    /// pass.
    pub async fn run_recurring(
        &self,
        user_id: Option<Uuid>,
        now: DateTime<Utc>,
        max_attempts: u32,
        retry_delay: Duration,
    ) -> ResultEngine<RunReport> {
        let mut report = RunReport {
            enqueued: self.enqueue_rules(user_id, now, max_attempts).await?,
            ..RunReport::default()
        };

        while let Some(job) = self.claim_job(user_id, now).await? {
            match self.process_job(job.id, now).await {
                Ok(created) => {
                    report.completed += 1;
                    report.materialized += created;
                }
                Err(err) => {
                    report.failed += 1;
                    self.fail_job(job.id, &err.to_string(), now, retry_delay)
                        .await?;
                }
            }
        }
        Ok(report)
    }

    /// Runnable jobs at `now`, any user, stalled ones included. Used by
    /// workers to decide whether to keep polling.
    pub async fn has_runnable_jobs(&self, now: DateTime<Utc>) -> ResultEngine<bool> {
        let count = recurring_jobs::Entity::find()
            .filter(runnable(now, now - self.job_lease))
            .count(&self.database)
            .await?;
        Ok(count > 0)
    }
}

/// Jobs a worker may claim: due `waiting`/`delayed` ones and `active` ones
/// whose lease started before `stale_before`.
fn runnable(now: DateTime<Utc>, stale_before: DateTime<Utc>) -> Condition {
    Condition::any()
        .add(
            Condition::all()
                .add(recurring_jobs::Column::Status.is_in([
                    JobStatus::Waiting.as_str(),
                    JobStatus::Delayed.as_str(),
                ]))
                .add(recurring_jobs::Column::RunAt.lte(now)),
        )
        .add(
            Condition::all()
                .add(recurring_jobs::Column::Status.eq(JobStatus::Active.as_str()))
                .add(recurring_jobs::Column::UpdatedAt.lte(stale_before)),
        )
}
