//! Recurring rules and the job queue behind them.

use api_types::recurring::{
    QueueStatsView, RecurringRuleListResponse, RecurringRuleView, RunReportView,
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use axum_extra::extract::WithRejection;
use chrono::Utc;
use engine::{RecurringRule, User};
use uuid::Uuid;

use crate::{ApiPath, ServerError, convert::frequency_to_api, server::ServerState};

fn map_rule(rule: RecurringRule) -> RecurringRuleView {
    RecurringRuleView {
        id: rule.id,
        template_transaction_id: rule.template_transaction_id,
        frequency: frequency_to_api(rule.frequency),
        interval: rule.interval,
        starts_at: rule.starts_at,
        end_date: rule.end_date,
        occurrences: rule.occurrences,
        next_run_at: rule.next_run_at,
        is_active: rule.is_active,
        last_run_at: rule.last_run_at,
    }
}

pub async fn list(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
) -> Result<Json<RecurringRuleListResponse>, ServerError> {
    let rules = state
        .engine
        .recurring_rules(user.id)
        .await?
        .into_iter()
        .map(map_rule)
        .collect();
    Ok(Json(RecurringRuleListResponse { rules }))
}

pub async fn cancel(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    WithRejection(Path(rule_id), _): ApiPath<Uuid>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .cancel_recurring_rule(user.id, rule_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Materializes the caller's due occurrences right away instead of waiting
/// for the scheduler.
pub async fn run(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
) -> Result<Json<RunReportView>, ServerError> {
    let report = state
        .engine
        .run_recurring(
            Some(user.id),
            Utc::now(),
            state.options.max_attempts,
            state.options.retry_delay,
        )
        .await?;
    Ok(Json(RunReportView {
        enqueued: report.enqueued,
        completed: report.completed,
        failed: report.failed,
        materialized: report.materialized,
    }))
}

pub async fn stats(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
) -> Result<Json<QueueStatsView>, ServerError> {
    let stats = state.engine.queue_stats(Some(user.id)).await?;
    Ok(Json(QueueStatsView {
        waiting: stats.waiting,
        active: stats.active,
        completed: stats.completed,
        failed: stats.failed,
        delayed: stats.delayed,
    }))
}
