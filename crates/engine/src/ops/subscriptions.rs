use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use sea_orm::{QueryFilter, QueryOrder, TransactionTrait, prelude::*};

use crate::{
    EngineError, NewSubscriptionCmd, ResultEngine, Subscription, SubscriptionSummary, Transaction,
    TransactionKind, UpdateSubscriptionCmd,
    recurrence::{occurrence, validate_interval},
    subscriptions,
    util::{ensure_currency, ensure_positive, model_currency, normalize_required_name},
};

use super::{Engine, with_tx};

const MAX_UPCOMING_DAYS: u32 = 366;

impl Engine {
    pub async fn new_subscription(
        &self,
        user_id: Uuid,
        cmd: NewSubscriptionCmd,
    ) -> ResultEngine<Subscription> {
        let name = normalize_required_name(&cmd.name, "subscription")?;
        ensure_positive(cmd.amount_minor, "amount")?;
        validate_interval(cmd.interval)?;

        with_tx!(self, |db_tx| {
            let mut currency = match cmd.currency {
                Some(currency) => currency,
                None => self.user_currency(&db_tx, user_id).await?,
            };
            if let Some(account_id) = cmd.account_id {
                let account = self.require_account(&db_tx, user_id, account_id).await?;
                let account_currency = model_currency(&account.currency)?;
                if let Some(explicit) = cmd.currency {
                    ensure_currency(account_currency, explicit, "account")?;
                }
                currency = account_currency;
            }
            if let Some(category_id) = cmd.category_id {
                self.require_visible_category(&db_tx, user_id, category_id)
                    .await?;
            }

            let subscription = Subscription {
                id: Uuid::new_v4(),
                user_id,
                account_id: cmd.account_id,
                category_id: cmd.category_id,
                name,
                amount_minor: cmd.amount_minor,
                currency,
                frequency: cmd.frequency,
                interval: cmd.interval,
                starts_at: cmd.starts_at,
                payments_made: 0,
                next_payment_date: cmd.starts_at,
                is_active: true,
                created_at: Utc::now(),
            };
            let model: subscriptions::ActiveModel = (&subscription).into();
            model.insert(&db_tx).await?;
            Ok(subscription)
        })
    }

    /// Subscriptions of a user by next payment date.
    pub async fn subscriptions(&self, user_id: Uuid) -> ResultEngine<Vec<Subscription>> {
        subscriptions::Entity::find()
            .filter(subscriptions::Column::UserId.eq(user_id))
            .order_by_asc(subscriptions::Column::NextPaymentDate)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Subscription::try_from)
            .collect()
    }

    pub async fn subscription(&self, user_id: Uuid, subscription_id: Uuid) -> ResultEngine<Subscription> {
        with_tx!(self, |db_tx| {
            let model = self
                .require_subscription(&db_tx, user_id, subscription_id)
                .await?;
            Subscription::try_from(model)
        })
    }

    pub async fn update_subscription(
        &self,
        user_id: Uuid,
        subscription_id: Uuid,
        cmd: UpdateSubscriptionCmd,
    ) -> ResultEngine<Subscription> {
        with_tx!(self, |db_tx| {
            let model = self
                .require_subscription(&db_tx, user_id, subscription_id)
                .await?;
            let mut subscription = Subscription::try_from(model)?;

            if let Some(name) = cmd.name.as_deref() {
                subscription.name = normalize_required_name(name, "subscription")?;
            }
            if let Some(amount_minor) = cmd.amount_minor {
                ensure_positive(amount_minor, "amount")?;
                subscription.amount_minor = amount_minor;
            }
            if let Some(account_id) = cmd.account_id {
                if let Some(account_id) = account_id {
                    let account = self.require_account(&db_tx, user_id, account_id).await?;
                    ensure_currency(
                        model_currency(&account.currency)?,
                        subscription.currency,
                        "account",
                    )?;
                }
                subscription.account_id = account_id;
            }
            if let Some(category_id) = cmd.category_id {
                if let Some(category_id) = category_id {
                    self.require_visible_category(&db_tx, user_id, category_id)
                        .await?;
                }
                subscription.category_id = category_id;
            }
            if let Some(is_active) = cmd.is_active {
                subscription.is_active = is_active;
            }

            let active: subscriptions::ActiveModel = (&subscription).into();
            active.update(&db_tx).await?;
            Ok(subscription)
        })
    }

    pub async fn delete_subscription(&self, user_id: Uuid, subscription_id: Uuid) -> ResultEngine<()> {
        let result = subscriptions::Entity::delete_many()
            .filter(subscriptions::Column::Id.eq(subscription_id))
            .filter(subscriptions::Column::UserId.eq(user_id))
            .exec(&self.database)
            .await?;
        if result.rows_affected == 0 {
            return Err(EngineError::KeyNotFound(
                "subscription not exists".to_string(),
            ));
        }
        Ok(())
    }

    /// Active subscriptions due within `days` from `now`, overdue ones
    /// included.
    pub async fn upcoming_subscriptions(
        &self,
        user_id: Uuid,
        days: u32,
        now: DateTime<Utc>,
    ) -> ResultEngine<Vec<Subscription>> {
        if days > MAX_UPCOMING_DAYS {
            return Err(EngineError::InvalidDate(format!(
                "days must be at most {MAX_UPCOMING_DAYS}"
            )));
        }
        let horizon = now + Duration::days(i64::from(days));
        subscriptions::Entity::find()
            .filter(subscriptions::Column::UserId.eq(user_id))
            .filter(subscriptions::Column::IsActive.eq(true))
            .filter(subscriptions::Column::NextPaymentDate.lte(horizon))
            .order_by_asc(subscriptions::Column::NextPaymentDate)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Subscription::try_from)
            .collect()
    }

    /// Records the next payment as an expense and moves the schedule one
    /// period ahead.
    pub async fn pay_subscription(
        &self,
        user_id: Uuid,
        subscription_id: Uuid,
    ) -> ResultEngine<(Subscription, Transaction)> {
        with_tx!(self, |db_tx| {
            let model = self
                .require_subscription(&db_tx, user_id, subscription_id)
                .await?;
            let mut subscription = Subscription::try_from(model)?;
            if !subscription.is_active {
                return Err(EngineError::InvalidKind(format!(
                    "subscription '{}' is not active",
                    subscription.name
                )));
            }

            let mut tx = Transaction {
                id: Uuid::new_v4(),
                user_id,
                account_id: subscription.account_id,
                to_account_id: None,
                category_id: subscription.category_id,
                kind: TransactionKind::Expense,
                amount_minor: subscription.amount_minor,
                currency: subscription.currency,
                description: Some(subscription.name.clone()),
                occurred_at: subscription.next_payment_date,
                tags: vec!["subscription".to_string()],
                recurring_rule_id: None,
                attachments: Vec::new(),
                created_at: Utc::now(),
            };
            self.validate_transaction(&db_tx, &mut tx, Some(subscription.currency))
                .await?;
            self.insert_transaction(&db_tx, &tx).await?;

            subscription.payments_made += 1;
            subscription.next_payment_date = occurrence(
                subscription.starts_at,
                subscription.frequency,
                subscription.interval,
                subscription.payments_made,
            )?;
            let active: subscriptions::ActiveModel = (&subscription).into();
            active.update(&db_tx).await?;
            tracing::debug!(%subscription_id, next = %subscription.next_payment_date, "subscription paid");
            Ok((subscription, tx))
        })
    }

    /// Monthly and yearly cost of the active subscriptions, per currency.
    pub async fn subscription_summary(&self, user_id: Uuid) -> ResultEngine<Vec<SubscriptionSummary>> {
        let items = self.subscriptions(user_id).await?;
        crate::subscriptions::summarize(&items)
    }

    async fn require_subscription(
        &self,
        db_tx: &sea_orm::DatabaseTransaction,
        user_id: Uuid,
        subscription_id: Uuid,
    ) -> ResultEngine<subscriptions::Model> {
        subscriptions::Entity::find_by_id(subscription_id)
            .filter(subscriptions::Column::UserId.eq(user_id))
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("subscription not exists".to_string()))
    }
}
