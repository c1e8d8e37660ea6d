//! The module contains `Account` and its storage model.

use chrono::{DateTime, Utc};
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Currency, EngineError, util::model_currency};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountKind {
    Checking,
    Savings,
    CreditCard,
    Investment,
}

impl AccountKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Checking => "checking",
            Self::Savings => "savings",
            Self::CreditCard => "credit_card",
            Self::Investment => "investment",
        }
    }
}

impl TryFrom<&str> for AccountKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "checking" => Ok(Self::Checking),
            "savings" => Ok(Self::Savings),
            "credit_card" => Ok(Self::CreditCard),
            "investment" => Ok(Self::Investment),
            other => Err(EngineError::InvalidKind(format!(
                "invalid account kind: {other}"
            ))),
        }
    }
}

/// An account.
///
/// An account is a representation of a real bank account, a card, a brokerage
/// account or anything else where money is kept. Its balance is moved by
/// transactions and can be reconciled manually.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub kind: AccountKind,
    pub provider: Option<String>,
    pub balance_minor: i64,
    pub currency: Currency,
    pub is_active: bool,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub name_norm: String,
    pub kind: String,
    pub provider: Option<String>,
    pub balance_minor: i64,
    pub currency: String,
    pub is_active: bool,
    pub last_sync_at: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Users,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Account> for ActiveModel {
    fn from(value: &Account) -> Self {
        Self {
            id: ActiveValue::Set(value.id),
            user_id: ActiveValue::Set(value.user_id),
            name: ActiveValue::Set(value.name.clone()),
            name_norm: ActiveValue::Set(crate::util::normalize_key(&value.name)),
            kind: ActiveValue::Set(value.kind.as_str().to_string()),
            provider: ActiveValue::Set(value.provider.clone()),
            balance_minor: ActiveValue::Set(value.balance_minor),
            currency: ActiveValue::Set(value.currency.code().to_string()),
            is_active: ActiveValue::Set(value.is_active),
            last_sync_at: ActiveValue::Set(value.last_sync_at),
            created_at: ActiveValue::Set(value.created_at),
        }
    }
}

impl TryFrom<Model> for Account {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            user_id: model.user_id,
            name: model.name,
            kind: AccountKind::try_from(model.kind.as_str())?,
            provider: model.provider,
            balance_minor: model.balance_minor,
            currency: model_currency(&model.currency)?,
            is_active: model.is_active,
            last_sync_at: model.last_sync_at,
            created_at: model.created_at,
        })
    }
}
