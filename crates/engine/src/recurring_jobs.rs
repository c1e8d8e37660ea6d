//! Recurring job queue rows.
//!
//! Lifecycle: `waiting` → `active` → `completed`, or on error
//! `active` → `delayed` (retry later) → `active` ... → `failed` once
//! `max_attempts` is exhausted. An `active` job whose lease ran out is
//! claimed again as if it were `delayed`.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::EngineError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Waiting,
    Active,
    Completed,
    Failed,
    Delayed,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Delayed => "delayed",
        }
    }

    /// Statuses that still hold a rule: no new job is enqueued for it.
    pub fn pending() -> [JobStatus; 3] {
        [Self::Waiting, Self::Active, Self::Delayed]
    }
}

impl TryFrom<&str> for JobStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "waiting" => Ok(Self::Waiting),
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "delayed" => Ok(Self::Delayed),
            other => Err(EngineError::InvalidKind(format!(
                "invalid job status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurringJob {
    pub id: Uuid,
    pub rule_id: Uuid,
    pub status: JobStatus,
    pub attempts: u32,
    pub max_attempts: u32,
    pub run_at: DateTime<Utc>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// Job counts per status.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub waiting: u64,
    pub active: u64,
    pub completed: u64,
    pub failed: u64,
    pub delayed: u64,
}

impl QueueStats {
    pub(crate) fn add(&mut self, status: JobStatus, count: u64) {
        let slot = match status {
            JobStatus::Waiting => &mut self.waiting,
            JobStatus::Active => &mut self.active,
            JobStatus::Completed => &mut self.completed,
            JobStatus::Failed => &mut self.failed,
            JobStatus::Delayed => &mut self.delayed,
        };
        *slot += count;
    }
}

/// Outcome of one enqueue-and-drain pass over the queue.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub enqueued: u64,
    pub completed: u64,
    pub failed: u64,
    /// Transactions created by the completed jobs.
    pub materialized: u64,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "recurring_jobs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub rule_id: Uuid,
    pub status: String,
    pub attempts: i32,
    pub max_attempts: i32,
    pub run_at: DateTimeUtc,
    pub last_error: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
    pub finished_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::recurring_rules::Entity",
        from = "Column::RuleId",
        to = "super::recurring_rules::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Rules,
}

impl Related<super::recurring_rules::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Rules.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for RecurringJob {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            rule_id: model.rule_id,
            status: JobStatus::try_from(model.status.as_str())?,
            attempts: u32::try_from(model.attempts).unwrap_or_default(),
            max_attempts: u32::try_from(model.max_attempts).unwrap_or_default(),
            run_at: model.run_at,
            last_error: model.last_error,
            created_at: model.created_at,
            updated_at: model.updated_at,
            finished_at: model.finished_at,
        })
    }
}
