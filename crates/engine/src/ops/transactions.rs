use std::collections::HashMap;

use chrono::Utc;
use uuid::Uuid;

use sea_orm::{ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*};

use crate::{
    Attachment, Currency, EngineError, NewAttachmentCmd, NewTransactionCmd, RecurrenceSpec,
    RecurringRule, ResultEngine, Transaction, TransactionKind, UpdateTransactionCmd, attachments,
    recurrence::{occurrence, validate_interval},
    recurring_rules, transactions,
    util::{
        ensure_currency, ensure_positive, model_currency, normalize_optional_text, normalize_tags,
    },
};

use super::{Engine, patch_optional_text, with_tx};

mod list;

pub use list::TransactionListFilter;

impl Engine {
    /// Records an income, expense or transfer and moves the account balances
    /// accordingly, all in one DB transaction.
    ///
    /// With a recurrence the transaction becomes the template (and first
    /// occurrence) of a new recurring rule.
    pub async fn new_transaction(
        &self,
        user_id: Uuid,
        cmd: NewTransactionCmd,
    ) -> ResultEngine<Transaction> {
        with_tx!(self, |db_tx| {
            let fallback = match cmd.currency {
                Some(currency) => currency,
                None => self.user_currency(&db_tx, user_id).await?,
            };
            let mut tx = Transaction {
                id: Uuid::new_v4(),
                user_id,
                account_id: cmd.account_id,
                to_account_id: cmd.to_account_id,
                category_id: cmd.category_id,
                kind: cmd.kind,
                amount_minor: cmd.amount_minor,
                currency: fallback,
                description: normalize_optional_text(cmd.description.as_deref()),
                occurred_at: cmd.occurred_at,
                tags: normalize_tags(&cmd.tags)?,
                recurring_rule_id: None,
                attachments: Vec::new(),
                created_at: Utc::now(),
            };
            self.validate_transaction(&db_tx, &mut tx, cmd.currency)
                .await?;

            if let Some(spec) = &cmd.recurrence {
                let rule_id = self.create_rule_for(&db_tx, &tx, spec).await?;
                tx.recurring_rule_id = Some(rule_id);
            }

            self.insert_transaction(&db_tx, &tx).await?;
            tracing::debug!(transaction_id = %tx.id, kind = tx.kind.as_str(), "transaction created");
            Ok(tx)
        })
    }

    /// A transaction with its attachments.
    pub async fn transaction(&self, user_id: Uuid, transaction_id: Uuid) -> ResultEngine<Transaction> {
        with_tx!(self, |db_tx| {
            let model = self
                .require_transaction(&db_tx, user_id, transaction_id)
                .await?;
            let mut tx = Transaction::try_from(model)?;
            tx.attachments = attachments::Entity::find()
                .filter(attachments::Column::TransactionId.eq(transaction_id))
                .order_by_asc(attachments::Column::CreatedAt)
                .all(&db_tx)
                .await?
                .into_iter()
                .map(Attachment::from)
                .collect();
            Ok(tx)
        })
    }

    /// Patches a transaction. The old balance effect is reverted and the new
    /// one applied in the same DB transaction.
    pub async fn update_transaction(
        &self,
        user_id: Uuid,
        transaction_id: Uuid,
        cmd: UpdateTransactionCmd,
    ) -> ResultEngine<Transaction> {
        with_tx!(self, |db_tx| {
            let model = self
                .require_transaction(&db_tx, user_id, transaction_id)
                .await?;
            let old = Transaction::try_from(model)?;

            let mut tx = old.clone();
            if let Some(kind) = cmd.kind {
                tx.kind = kind;
            }
            if let Some(amount_minor) = cmd.amount_minor {
                tx.amount_minor = amount_minor;
            }
            if let Some(occurred_at) = cmd.occurred_at {
                tx.occurred_at = occurred_at;
            }
            if let Some(account_id) = cmd.account_id {
                tx.account_id = account_id;
            }
            if let Some(to_account_id) = cmd.to_account_id {
                tx.to_account_id = to_account_id;
            }
            if tx.kind != TransactionKind::Transfer && cmd.to_account_id.is_none() {
                tx.to_account_id = None;
            }
            if let Some(category_id) = cmd.category_id {
                tx.category_id = category_id;
            }
            tx.description = patch_optional_text(tx.description, cmd.description.as_deref());
            if let Some(tags) = &cmd.tags {
                tx.tags = normalize_tags(tags)?;
            }
            self.validate_transaction(&db_tx, &mut tx, None).await?;
            if tx.occurred_at != old.occurred_at {
                self.reanchor_rule(&db_tx, &tx).await?;
            }

            self.revert_balance_effects(&db_tx, &old.balance_effects())
                .await?;
            self.apply_balance_effects(&db_tx, &tx.balance_effects())
                .await?;
            let active = transactions::ActiveModel::try_from(&tx)?;
            active.update(&db_tx).await?;

            tx.attachments = attachments::Entity::find()
                .filter(attachments::Column::TransactionId.eq(transaction_id))
                .order_by_asc(attachments::Column::CreatedAt)
                .all(&db_tx)
                .await?
                .into_iter()
                .map(Attachment::from)
                .collect();
            Ok(tx)
        })
    }

    /// Deletes a transaction, reverting its balance effect.
    ///
    /// Deleting the template of a recurring rule stops the rule; already
    /// materialized occurrences stay.
    pub async fn delete_transaction(&self, user_id: Uuid, transaction_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let model = self
                .require_transaction(&db_tx, user_id, transaction_id)
                .await?;
            let tx = Transaction::try_from(model)?;

            self.revert_balance_effects(&db_tx, &tx.balance_effects())
                .await?;
            attachments::Entity::delete_many()
                .filter(attachments::Column::TransactionId.eq(transaction_id))
                .exec(&db_tx)
                .await?;

            let templates = recurring_rules::Entity::find()
                .filter(recurring_rules::Column::TemplateTransactionId.eq(transaction_id))
                .all(&db_tx)
                .await?;
            for rule in templates {
                tracing::info!(rule_id = %rule.id, "template deleted, deactivating recurring rule");
                let mut active: recurring_rules::ActiveModel = rule.into();
                active.is_active = ActiveValue::Set(false);
                active.update(&db_tx).await?;
            }

            transactions::Entity::delete_by_id(transaction_id)
                .exec(&db_tx)
                .await?;
            Ok(())
        })
    }

    /// Attaches file metadata (receipt, invoice...) to a transaction.
    pub async fn add_attachment(
        &self,
        user_id: Uuid,
        transaction_id: Uuid,
        cmd: NewAttachmentCmd,
    ) -> ResultEngine<Attachment> {
        let file_name = crate::util::normalize_required_name(&cmd.file_name, "file")?;
        let url = cmd.url.trim().to_string();
        if !(url.starts_with("https://") || url.starts_with("http://")) || url.contains(' ') {
            return Err(EngineError::InvalidName(format!(
                "attachment url must be http(s): {url}"
            )));
        }
        if cmd.size_bytes.is_some_and(|size| size < 0) {
            return Err(EngineError::InvalidAmount(
                "attachment size must be >= 0".to_string(),
            ));
        }

        with_tx!(self, |db_tx| {
            self.require_transaction(&db_tx, user_id, transaction_id)
                .await?;
            let model = attachments::ActiveModel {
                id: ActiveValue::Set(Uuid::new_v4()),
                transaction_id: ActiveValue::Set(transaction_id),
                file_name: ActiveValue::Set(file_name),
                url: ActiveValue::Set(url),
                content_type: ActiveValue::Set(normalize_optional_text(cmd.content_type.as_deref())),
                size_bytes: ActiveValue::Set(cmd.size_bytes),
                created_at: ActiveValue::Set(Utc::now()),
            }
            .insert(&db_tx)
            .await?;
            Ok(Attachment::from(model))
        })
    }

    pub async fn remove_attachment(
        &self,
        user_id: Uuid,
        transaction_id: Uuid,
        attachment_id: Uuid,
    ) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            self.require_transaction(&db_tx, user_id, transaction_id)
                .await?;
            let result = attachments::Entity::delete_many()
                .filter(attachments::Column::Id.eq(attachment_id))
                .filter(attachments::Column::TransactionId.eq(transaction_id))
                .exec(&db_tx)
                .await?;
            if result.rows_affected == 0 {
                return Err(EngineError::KeyNotFound(
                    "attachment not exists".to_string(),
                ));
            }
            Ok(())
        })
    }

    pub(super) async fn require_transaction(
        &self,
        db_tx: &DatabaseTransaction,
        user_id: Uuid,
        transaction_id: Uuid,
    ) -> ResultEngine<transactions::Model> {
        transactions::Entity::find_by_id(transaction_id)
            .filter(transactions::Column::UserId.eq(user_id))
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("transaction not exists".to_string()))
    }

    /// Stores a validated transaction and applies its balance effect.
    pub(super) async fn insert_transaction(
        &self,
        db_tx: &DatabaseTransaction,
        tx: &Transaction,
    ) -> ResultEngine<()> {
        let model = transactions::ActiveModel::try_from(tx)?;
        model.insert(db_tx).await?;
        self.apply_balance_effects(db_tx, &tx.balance_effects())
            .await
    }

    /// Checks amount, account shape, ownership and currency of `tx`.
    ///
    /// When an account is involved the transaction takes its currency;
    /// `explicit` must then agree with it. Without accounts `tx.currency` is
    /// kept.
    pub(super) async fn validate_transaction(
        &self,
        db_tx: &DatabaseTransaction,
        tx: &mut Transaction,
        explicit: Option<Currency>,
    ) -> ResultEngine<()> {
        ensure_positive(tx.amount_minor, "amount")?;

        match tx.kind {
            TransactionKind::Transfer => {
                let (Some(from), Some(to)) = (tx.account_id, tx.to_account_id) else {
                    return Err(EngineError::InvalidKind(
                        "a transfer needs both a source and a target account".to_string(),
                    ));
                };
                if from == to {
                    return Err(EngineError::InvalidKind(
                        "transfer accounts must differ".to_string(),
                    ));
                }
            }
            TransactionKind::Income | TransactionKind::Expense => {
                if tx.to_account_id.is_some() {
                    return Err(EngineError::InvalidKind(format!(
                        "{} cannot have a target account",
                        tx.kind.as_str()
                    )));
                }
            }
        }

        if let Some(account_id) = tx.account_id {
            let account = self.require_account(db_tx, tx.user_id, account_id).await?;
            let currency = model_currency(&account.currency)?;
            if let Some(explicit) = explicit {
                ensure_currency(currency, explicit, "account")?;
            }
            tx.currency = currency;
        }
        if let Some(to_account_id) = tx.to_account_id {
            let target = self
                .require_account(db_tx, tx.user_id, to_account_id)
                .await?;
            ensure_currency(tx.currency, model_currency(&target.currency)?, "target account")?;
        }
        if let Some(category_id) = tx.category_id {
            self.require_visible_category(db_tx, tx.user_id, category_id)
                .await?;
        }
        Ok(())
    }

    /// Moves the schedule of the active rule templated on `template` to the
    /// template's new date. Once occurrences exist the date is frozen.
    async fn reanchor_rule(&self, db_tx: &DatabaseTransaction, template: &Transaction) -> ResultEngine<()> {
        let Some(model) = recurring_rules::Entity::find()
            .filter(recurring_rules::Column::TemplateTransactionId.eq(template.id))
            .filter(recurring_rules::Column::IsActive.eq(true))
            .one(db_tx)
            .await?
        else {
            return Ok(());
        };
        let rule = RecurringRule::try_from(model.clone())?;
        if rule.occurrences > 1 {
            return Err(EngineError::InvalidDate(
                "the date of a recurring template cannot change after occurrences were created"
                    .to_string(),
            ));
        }
        if rule.end_date.is_some_and(|end| end < template.occurred_at) {
            return Err(EngineError::InvalidDate(
                "recurrence end date is before the first occurrence".to_string(),
            ));
        }

        let next_run_at = occurrence(template.occurred_at, rule.frequency, rule.interval, 1)?;
        let mut active: recurring_rules::ActiveModel = model.into();
        active.starts_at = ActiveValue::Set(template.occurred_at);
        active.next_run_at = ActiveValue::Set(next_run_at);
        active.update(db_tx).await?;
        tracing::debug!(rule_id = %rule.id, %next_run_at, "recurring rule re-anchored");
        Ok(())
    }

    async fn create_rule_for(
        &self,
        db_tx: &DatabaseTransaction,
        template: &Transaction,
        spec: &RecurrenceSpec,
    ) -> ResultEngine<Uuid> {
        validate_interval(spec.interval)?;
        if spec.end_date.is_some_and(|end| end < template.occurred_at) {
            return Err(EngineError::InvalidDate(
                "recurrence end date is before the first occurrence".to_string(),
            ));
        }

        let now = Utc::now();
        let rule_id = Uuid::new_v4();
        recurring_rules::ActiveModel {
            id: ActiveValue::Set(rule_id),
            user_id: ActiveValue::Set(template.user_id),
            template_transaction_id: ActiveValue::Set(template.id),
            frequency: ActiveValue::Set(spec.frequency.as_str().to_string()),
            interval: ActiveValue::Set(spec.interval as i32),
            starts_at: ActiveValue::Set(template.occurred_at),
            end_date: ActiveValue::Set(spec.end_date),
            occurrences: ActiveValue::Set(1),
            next_run_at: ActiveValue::Set(occurrence(
                template.occurred_at,
                spec.frequency,
                spec.interval,
                1,
            )?),
            is_active: ActiveValue::Set(true),
            last_run_at: ActiveValue::Set(None),
            created_at: ActiveValue::Set(now),
        }
        .insert(db_tx)
        .await?;
        Ok(rule_id)
    }

    /// Attachments of many transactions, grouped by transaction id.
    pub(super) async fn attachments_by_transaction(
        &self,
        db_tx: &DatabaseTransaction,
        ids: Vec<Uuid>,
    ) -> ResultEngine<HashMap<Uuid, Vec<Attachment>>> {
        let mut out: HashMap<Uuid, Vec<Attachment>> = HashMap::new();
        if ids.is_empty() {
            return Ok(out);
        }
        let models = attachments::Entity::find()
            .filter(attachments::Column::TransactionId.is_in(ids))
            .order_by_asc(attachments::Column::CreatedAt)
            .all(db_tx)
            .await?;
        for model in models {
            out.entry(model.transaction_id)
                .or_default()
                .push(Attachment::from(model));
        }
        Ok(out)
    }
}
