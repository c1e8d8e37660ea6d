//! Recurring rules.
//!
//! A rule repeats a template transaction. Occurrence `0` is the template
//! itself; `occurrences` counts how many have been materialized so far, so
//! `next_run_at` is always `occurrence(starts_at, frequency, interval,
//! occurrences)`.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, recurrence::Frequency};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurringRule {
    pub id: Uuid,
    pub user_id: Uuid,
    pub template_transaction_id: Uuid,
    pub frequency: Frequency,
    pub interval: u32,
    pub starts_at: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub occurrences: u32,
    pub next_run_at: DateTime<Utc>,
    pub is_active: bool,
    pub last_run_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "recurring_rules")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub template_transaction_id: Uuid,
    pub frequency: String,
    pub interval: i32,
    pub starts_at: DateTimeUtc,
    pub end_date: Option<DateTimeUtc>,
    pub occurrences: i32,
    pub next_run_at: DateTimeUtc,
    pub is_active: bool,
    pub last_run_at: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::recurring_jobs::Entity")]
    Jobs,
}

impl Related<super::recurring_jobs::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Jobs.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for RecurringRule {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let non_negative = |value: i32, label: &str| {
            u32::try_from(value)
                .map_err(|_| EngineError::Internal(format!("invalid stored {label}: {value}")))
        };
        Ok(Self {
            id: model.id,
            user_id: model.user_id,
            template_transaction_id: model.template_transaction_id,
            frequency: Frequency::try_from(model.frequency.as_str())?,
            interval: non_negative(model.interval, "interval")?,
            starts_at: model.starts_at,
            end_date: model.end_date,
            occurrences: non_negative(model.occurrences, "occurrences")?,
            next_run_at: model.next_run_at,
            is_active: model.is_active,
            last_run_at: model.last_run_at,
            created_at: model.created_at,
        })
    }
}
