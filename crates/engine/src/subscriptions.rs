//! Subscriptions: periodic payments (streaming, gym, insurance...).
//!
//! Like recurring rules, the schedule is anchored on `starts_at`:
//! `next_payment_date == occurrence(starts_at, frequency, interval,
//! payments_made)`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    Currency, EngineError, ResultEngine,
    recurrence::Frequency,
    util::{add_minor, model_currency},
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: Uuid,
    pub user_id: Uuid,
    pub account_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub name: String,
    pub amount_minor: i64,
    pub currency: Currency,
    pub frequency: Frequency,
    pub interval: u32,
    pub starts_at: DateTime<Utc>,
    pub payments_made: u32,
    pub next_payment_date: DateTime<Utc>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Subscription {
    /// Average monthly cost, rounded to the nearest minor unit.
    pub fn monthly_cost_minor(&self) -> i64 {
        (self.amount_minor as f64 * self.frequency.per_month(self.interval)).round() as i64
    }

    /// Average yearly cost, rounded to the nearest minor unit.
    pub fn yearly_cost_minor(&self) -> i64 {
        (self.amount_minor as f64 * self.frequency.per_month(self.interval) * 12.0).round() as i64
    }
}

/// Equivalent cost of the active subscriptions of one currency.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionSummary {
    pub currency: Currency,
    pub active_count: u64,
    pub monthly_minor: i64,
    pub yearly_minor: i64,
}

/// Sum active subscriptions per currency.
pub fn summarize(subscriptions: &[Subscription]) -> ResultEngine<Vec<SubscriptionSummary>> {
    let mut out: BTreeMap<Currency, SubscriptionSummary> = BTreeMap::new();
    for sub in subscriptions.iter().filter(|s| s.is_active) {
        let entry = out.entry(sub.currency).or_insert(SubscriptionSummary {
            currency: sub.currency,
            active_count: 0,
            monthly_minor: 0,
            yearly_minor: 0,
        });
        entry.active_count += 1;
        entry.monthly_minor = add_minor(entry.monthly_minor, sub.monthly_cost_minor())?;
        entry.yearly_minor = add_minor(entry.yearly_minor, sub.yearly_cost_minor())?;
    }
    Ok(out.into_values().collect())
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "subscriptions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub account_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub name: String,
    pub amount_minor: i64,
    pub currency: String,
    pub frequency: String,
    pub interval: i32,
    pub starts_at: DateTimeUtc,
    pub payments_made: i32,
    pub next_payment_date: DateTimeUtc,
    pub is_active: bool,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Subscription> for ActiveModel {
    fn from(value: &Subscription) -> Self {
        Self {
            id: ActiveValue::Set(value.id),
            user_id: ActiveValue::Set(value.user_id),
            account_id: ActiveValue::Set(value.account_id),
            category_id: ActiveValue::Set(value.category_id),
            name: ActiveValue::Set(value.name.clone()),
            amount_minor: ActiveValue::Set(value.amount_minor),
            currency: ActiveValue::Set(value.currency.code().to_string()),
            frequency: ActiveValue::Set(value.frequency.as_str().to_string()),
            interval: ActiveValue::Set(i32::try_from(value.interval).unwrap_or(i32::MAX)),
            starts_at: ActiveValue::Set(value.starts_at),
            payments_made: ActiveValue::Set(i32::try_from(value.payments_made).unwrap_or(i32::MAX)),
            next_payment_date: ActiveValue::Set(value.next_payment_date),
            is_active: ActiveValue::Set(value.is_active),
            created_at: ActiveValue::Set(value.created_at),
        }
    }
}

impl TryFrom<Model> for Subscription {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let non_negative = |value: i32, label: &str| {
            u32::try_from(value)
                .map_err(|_| EngineError::Internal(format!("invalid stored {label}: {value}")))
        };
        Ok(Self {
            id: model.id,
            user_id: model.user_id,
            account_id: model.account_id,
            category_id: model.category_id,
            name: model.name,
            amount_minor: model.amount_minor,
            currency: model_currency(&model.currency)?,
            frequency: Frequency::try_from(model.frequency.as_str())?,
            interval: non_negative(model.interval, "interval")?,
            starts_at: model.starts_at,
            payments_made: non_negative(model.payments_made, "payments_made")?,
            next_payment_date: model.next_payment_date,
            is_active: model.is_active,
            created_at: model.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sub(amount: i64, frequency: Frequency, interval: u32, currency: Currency) -> Subscription {
        let now = Utc::now();
        Subscription {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            account_id: None,
            category_id: None,
            name: "Streaming".to_string(),
            amount_minor: amount,
            currency,
            frequency,
            interval,
            starts_at: now,
            payments_made: 0,
            next_payment_date: now,
            is_active: true,
            created_at: now,
        }
    }

    #[test]
    fn costs_are_normalized_to_month_and_year() {
        let yearly = sub(12_000, Frequency::Yearly, 1, Currency::Eur);
        assert_eq!(yearly.monthly_cost_minor(), 1_000);
        assert_eq!(yearly.yearly_cost_minor(), 12_000);

        let quarterly = sub(3_000, Frequency::Monthly, 3, Currency::Eur);
        assert_eq!(quarterly.monthly_cost_minor(), 1_000);
        assert_eq!(quarterly.yearly_cost_minor(), 12_000);
    }

    #[test]
    fn summary_skips_inactive_and_splits_currencies() {
        let mut paused = sub(5_000, Frequency::Monthly, 1, Currency::Eur);
        paused.is_active = false;
        let items = vec![
            sub(999, Frequency::Monthly, 1, Currency::Eur),
            sub(1_299, Frequency::Monthly, 1, Currency::Usd),
            paused,
        ];
        let summary = summarize(&items).unwrap();
        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].currency, Currency::Eur);
        assert_eq!(summary[0].active_count, 1);
        assert_eq!(summary[0].monthly_minor, 999);
        assert_eq!(summary[0].yearly_minor, 11_988);
        assert_eq!(summary[1].currency, Currency::Usd);
    }
}
