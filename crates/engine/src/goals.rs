//! Savings and payoff goals.

use chrono::{DateTime, Datelike, Utc};
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Currency, EngineError, util::model_currency};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalKind {
    Savings,
    DebtPayoff,
    EmergencyFund,
    Investment,
    Purchase,
    Other,
}

impl GoalKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Savings => "savings",
            Self::DebtPayoff => "debt_payoff",
            Self::EmergencyFund => "emergency_fund",
            Self::Investment => "investment",
            Self::Purchase => "purchase",
            Self::Other => "other",
        }
    }
}

impl TryFrom<&str> for GoalKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "savings" => Ok(Self::Savings),
            "debt_payoff" => Ok(Self::DebtPayoff),
            "emergency_fund" => Ok(Self::EmergencyFund),
            "investment" => Ok(Self::Investment),
            "purchase" => Ok(Self::Purchase),
            "other" => Ok(Self::Other),
            other => Err(EngineError::InvalidKind(format!(
                "invalid goal kind: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goal {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub kind: GoalKind,
    pub target_amount_minor: i64,
    pub current_amount_minor: i64,
    pub currency: Currency,
    pub target_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Derived progress of a [`Goal`] at a given instant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GoalProgress {
    /// 0.00 – 100.00
    pub percent: f64,
    pub remaining_minor: i64,
    pub achieved: bool,
    /// Started months until the target date; `None` without a target date.
    pub months_left: Option<u32>,
    /// Contribution per month needed to reach the target in time.
    pub monthly_required_minor: Option<i64>,
}

impl Goal {
    pub fn progress(&self, now: DateTime<Utc>) -> GoalProgress {
        let remaining_minor = (self.target_amount_minor - self.current_amount_minor).max(0);
        let achieved = remaining_minor == 0;
        let percent = if self.target_amount_minor <= 0 {
            100.0
        } else {
            let raw = self.current_amount_minor as f64 * 100.0 / self.target_amount_minor as f64;
            (raw.clamp(0.0, 100.0) * 100.0).round() / 100.0
        };

        let months_left = self.target_date.map(|target| months_until(now, target));
        let monthly_required_minor = months_left.map(|months| match months {
            0 => remaining_minor,
            months => {
                let months = i64::from(months);
                (remaining_minor + months - 1) / months
            }
        });

        GoalProgress {
            percent,
            remaining_minor,
            achieved,
            months_left,
            monthly_required_minor,
        }
    }
}

/// Number of started months between `now` and `target` (0 when the target is
/// in the past).
fn months_until(now: DateTime<Utc>, target: DateTime<Utc>) -> u32 {
    if target <= now {
        return 0;
    }
    let mut months = (target.year() - now.year()) * 12 + target.month() as i32 - now.month() as i32;
    if target.day() > now.day() {
        months += 1;
    }
    u32::try_from(months.max(1)).unwrap_or(1)
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "goals")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub kind: String,
    pub target_amount_minor: i64,
    pub current_amount_minor: i64,
    pub currency: String,
    pub target_date: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Goal> for ActiveModel {
    fn from(goal: &Goal) -> Self {
        Self {
            id: ActiveValue::Set(goal.id),
            user_id: ActiveValue::Set(goal.user_id),
            name: ActiveValue::Set(goal.name.clone()),
            kind: ActiveValue::Set(goal.kind.as_str().to_string()),
            target_amount_minor: ActiveValue::Set(goal.target_amount_minor),
            current_amount_minor: ActiveValue::Set(goal.current_amount_minor),
            currency: ActiveValue::Set(goal.currency.code().to_string()),
            target_date: ActiveValue::Set(goal.target_date),
            created_at: ActiveValue::Set(goal.created_at),
        }
    }
}

impl TryFrom<Model> for Goal {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            user_id: model.user_id,
            name: model.name,
            kind: GoalKind::try_from(model.kind.as_str())?,
            target_amount_minor: model.target_amount_minor,
            current_amount_minor: model.current_amount_minor,
            currency: model_currency(&model.currency)?,
            target_date: model.target_date,
            created_at: model.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn goal(target: i64, current: i64, target_date: Option<DateTime<Utc>>) -> Goal {
        Goal {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            name: "Bike".to_string(),
            kind: GoalKind::Purchase,
            target_amount_minor: target,
            current_amount_minor: current,
            currency: Currency::Eur,
            target_date,
            created_at: Utc::now(),
        }
    }

    fn day(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn percent_is_capped_and_rounded() {
        let now = day(2024, 1, 15);
        assert_eq!(goal(3000, 1000, None).progress(now).percent, 33.33);
        let done = goal(1000, 1500, None).progress(now);
        assert_eq!(done.percent, 100.0);
        assert!(done.achieved);
        assert_eq!(done.remaining_minor, 0);
    }

    #[test]
    fn monthly_requirement_rounds_up() {
        let now = day(2024, 1, 15);
        let progress = goal(10_000, 1_000, Some(day(2024, 3, 10))).progress(now);
        assert_eq!(progress.months_left, Some(2));
        assert_eq!(progress.monthly_required_minor, Some(4_500));

        let progress = goal(10_000, 0, Some(day(2024, 4, 20))).progress(now);
        assert_eq!(progress.months_left, Some(4));
        assert_eq!(progress.monthly_required_minor, Some(2_500));
    }

    #[test]
    fn overdue_goal_requires_everything_now() {
        let now = day(2024, 6, 1);
        let progress = goal(10_000, 4_000, Some(day(2024, 5, 1))).progress(now);
        assert_eq!(progress.months_left, Some(0));
        assert_eq!(progress.monthly_required_minor, Some(6_000));
    }

    #[test]
    fn no_target_date_no_schedule() {
        let progress = goal(10_000, 0, None).progress(day(2024, 1, 1));
        assert_eq!(progress.months_left, None);
        assert_eq!(progress.monthly_required_minor, None);
    }
}
