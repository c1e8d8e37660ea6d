//! Transaction primitives.
//!
//! A `Transaction` is a single recorded movement of money. When it references
//! accounts it changes their balances; [`Transaction::balance_effects`] is the
//! single place that decides by how much.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Currency, EngineError, ResultEngine, attachments::Attachment, util::model_currency};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Income,
    Expense,
    Transfer,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
            Self::Transfer => "transfer",
        }
    }
}

impl TryFrom<&str> for TransactionKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            "transfer" => Ok(Self::Transfer),
            other => Err(EngineError::InvalidKind(format!(
                "invalid transaction kind: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub account_id: Option<Uuid>,
    /// Destination account, only for transfers.
    pub to_account_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub kind: TransactionKind,
    /// Always > 0; the kind defines the direction.
    pub amount_minor: i64,
    pub currency: Currency,
    pub description: Option<String>,
    pub occurred_at: DateTime<Utc>,
    pub tags: Vec<String>,
    pub recurring_rule_id: Option<Uuid>,
    pub attachments: Vec<Attachment>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Signed balance change per account.
    ///
    /// - income: `+amount` on `account_id`
    /// - expense: `-amount` on `account_id`
    /// - transfer: `-amount` on `account_id`, `+amount` on `to_account_id`
    pub fn balance_effects(&self) -> Vec<(Uuid, i64)> {
        balance_effects(
            self.kind,
            self.account_id,
            self.to_account_id,
            self.amount_minor,
        )
    }

    /// Signed amount from the point of view of one account (0 if the
    /// transaction does not touch it).
    pub fn signed_amount_for(&self, account_id: Uuid) -> i64 {
        self.balance_effects()
            .into_iter()
            .filter(|(id, _)| *id == account_id)
            .map(|(_, amount)| amount)
            .sum()
    }
}

pub(crate) fn balance_effects(
    kind: TransactionKind,
    account_id: Option<Uuid>,
    to_account_id: Option<Uuid>,
    amount_minor: i64,
) -> Vec<(Uuid, i64)> {
    match kind {
        TransactionKind::Income => account_id.map(|id| (id, amount_minor)).into_iter().collect(),
        TransactionKind::Expense => account_id
            .map(|id| (id, -amount_minor))
            .into_iter()
            .collect(),
        TransactionKind::Transfer => account_id
            .map(|id| (id, -amount_minor))
            .into_iter()
            .chain(to_account_id.map(|id| (id, amount_minor)))
            .collect(),
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub account_id: Option<Uuid>,
    pub to_account_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub kind: String,
    pub amount_minor: i64,
    pub currency: String,
    pub description: Option<String>,
    pub occurred_at: DateTimeUtc,
    /// JSON array of strings.
    pub tags: String,
    pub recurring_rule_id: Option<Uuid>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::attachments::Entity")]
    Attachments,
}

impl Related<super::attachments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Attachments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

pub(crate) fn encode_tags(tags: &[String]) -> ResultEngine<String> {
    serde_json::to_string(tags).map_err(|e| EngineError::Internal(format!("tags encoding: {e}")))
}

fn decode_tags(raw: &str) -> ResultEngine<Vec<String>> {
    if raw.is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(raw).map_err(|e| EngineError::Internal(format!("tags decoding: {e}")))
}

impl TryFrom<&Transaction> for ActiveModel {
    type Error = EngineError;

    fn try_from(tx: &Transaction) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ActiveValue::Set(tx.id),
            user_id: ActiveValue::Set(tx.user_id),
            account_id: ActiveValue::Set(tx.account_id),
            to_account_id: ActiveValue::Set(tx.to_account_id),
            category_id: ActiveValue::Set(tx.category_id),
            kind: ActiveValue::Set(tx.kind.as_str().to_string()),
            amount_minor: ActiveValue::Set(tx.amount_minor),
            currency: ActiveValue::Set(tx.currency.code().to_string()),
            description: ActiveValue::Set(tx.description.clone()),
            occurred_at: ActiveValue::Set(tx.occurred_at),
            tags: ActiveValue::Set(encode_tags(&tx.tags)?),
            recurring_rule_id: ActiveValue::Set(tx.recurring_rule_id),
            created_at: ActiveValue::Set(tx.created_at),
        })
    }
}

impl TryFrom<Model> for Transaction {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            user_id: model.user_id,
            account_id: model.account_id,
            to_account_id: model.to_account_id,
            category_id: model.category_id,
            kind: TransactionKind::try_from(model.kind.as_str())?,
            amount_minor: model.amount_minor,
            currency: model_currency(&model.currency)?,
            description: model.description,
            occurred_at: model.occurred_at,
            tags: decode_tags(&model.tags)?,
            recurring_rule_id: model.recurring_rule_id,
            attachments: Vec::new(),
            created_at: model.created_at,
        })
    }
}
