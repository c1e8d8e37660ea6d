//! Command structs for engine operations.
//!
//! These types group parameters for write operations, keeping call sites
//! readable and avoiding long argument lists. `Update*Cmd` structs are
//! patches: `None` leaves a field untouched. Optional text fields are
//! cleared by passing an empty string; optional references use
//! `Some(None)`.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{AccountKind, Currency, GoalKind, InvestmentKind, TransactionKind, recurrence::Frequency};

/// Create an account.
#[derive(Clone, Debug)]
pub struct NewAccountCmd {
    pub name: String,
    pub kind: AccountKind,
    pub currency: Currency,
    pub provider: Option<String>,
    /// Opening balance; may be negative (e.g. card debt).
    pub balance_minor: i64,
}

impl NewAccountCmd {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: AccountKind, currency: Currency) -> Self {
        Self {
            name: name.into(),
            kind,
            currency,
            provider: None,
            balance_minor: 0,
        }
    }

    #[must_use]
    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    #[must_use]
    pub fn balance_minor(mut self, balance_minor: i64) -> Self {
        self.balance_minor = balance_minor;
        self
    }
}

#[derive(Clone, Debug, Default)]
pub struct UpdateAccountCmd {
    pub name: Option<String>,
    pub provider: Option<String>,
    pub is_active: Option<bool>,
    /// Reconciliation: overrides the balance and stamps `last_sync_at`.
    pub balance_minor: Option<i64>,
}

#[derive(Clone, Debug)]
pub struct NewCategoryCmd {
    pub name: String,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub parent_id: Option<Uuid>,
}

impl NewCategoryCmd {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            icon: None,
            color: None,
            parent_id: None,
        }
    }

    #[must_use]
    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    #[must_use]
    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    #[must_use]
    pub fn parent(mut self, parent_id: Uuid) -> Self {
        self.parent_id = Some(parent_id);
        self
    }
}

#[derive(Clone, Debug, Default)]
pub struct UpdateCategoryCmd {
    pub name: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub parent_id: Option<Option<Uuid>>,
}

/// Repetition attached to a new transaction. The transaction itself is the
/// first occurrence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecurrenceSpec {
    pub frequency: Frequency,
    pub interval: u32,
    pub end_date: Option<DateTime<Utc>>,
}

impl RecurrenceSpec {
    #[must_use]
    pub fn new(frequency: Frequency, interval: u32) -> Self {
        Self {
            frequency,
            interval,
            end_date: None,
        }
    }

    #[must_use]
    pub fn until(mut self, end_date: DateTime<Utc>) -> Self {
        self.end_date = Some(end_date);
        self
    }
}

/// Create an income, expense or transfer.
#[derive(Clone, Debug)]
pub struct NewTransactionCmd {
    pub kind: TransactionKind,
    pub amount_minor: i64,
    pub occurred_at: DateTime<Utc>,
    pub account_id: Option<Uuid>,
    pub to_account_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    /// Required to match the account currency when an account is set;
    /// otherwise defaults to the user currency.
    pub currency: Option<Currency>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub recurrence: Option<RecurrenceSpec>,
}

impl NewTransactionCmd {
    #[must_use]
    pub fn new(kind: TransactionKind, amount_minor: i64, occurred_at: DateTime<Utc>) -> Self {
        Self {
            kind,
            amount_minor,
            occurred_at,
            account_id: None,
            to_account_id: None,
            category_id: None,
            currency: None,
            description: None,
            tags: Vec::new(),
            recurrence: None,
        }
    }

    #[must_use]
    pub fn income(amount_minor: i64, occurred_at: DateTime<Utc>) -> Self {
        Self::new(TransactionKind::Income, amount_minor, occurred_at)
    }

    #[must_use]
    pub fn expense(amount_minor: i64, occurred_at: DateTime<Utc>) -> Self {
        Self::new(TransactionKind::Expense, amount_minor, occurred_at)
    }

    #[must_use]
    pub fn transfer(from: Uuid, to: Uuid, amount_minor: i64, occurred_at: DateTime<Utc>) -> Self {
        Self::new(TransactionKind::Transfer, amount_minor, occurred_at)
            .account(from)
            .to_account(to)
    }

    #[must_use]
    pub fn account(mut self, account_id: Uuid) -> Self {
        self.account_id = Some(account_id);
        self
    }

    #[must_use]
    pub fn to_account(mut self, account_id: Uuid) -> Self {
        self.to_account_id = Some(account_id);
        self
    }

    #[must_use]
    pub fn category(mut self, category_id: Uuid) -> Self {
        self.category_id = Some(category_id);
        self
    }

    #[must_use]
    pub fn currency(mut self, currency: Currency) -> Self {
        self.currency = Some(currency);
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn recurring(mut self, recurrence: RecurrenceSpec) -> Self {
        self.recurrence = Some(recurrence);
        self
    }
}

/// Update an existing transaction.
#[derive(Clone, Debug, Default)]
pub struct UpdateTransactionCmd {
    pub kind: Option<TransactionKind>,
    pub amount_minor: Option<i64>,
    pub occurred_at: Option<DateTime<Utc>>,
    pub account_id: Option<Option<Uuid>>,
    pub to_account_id: Option<Option<Uuid>>,
    pub category_id: Option<Option<Uuid>>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl UpdateTransactionCmd {
    #[must_use]
    pub fn amount_minor(mut self, amount_minor: i64) -> Self {
        self.amount_minor = Some(amount_minor);
        self
    }

    #[must_use]
    pub fn occurred_at(mut self, occurred_at: DateTime<Utc>) -> Self {
        self.occurred_at = Some(occurred_at);
        self
    }

    #[must_use]
    pub fn account(mut self, account_id: Option<Uuid>) -> Self {
        self.account_id = Some(account_id);
        self
    }

    #[must_use]
    pub fn category(mut self, category_id: Option<Uuid>) -> Self {
        self.category_id = Some(category_id);
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[derive(Clone, Debug)]
pub struct NewAttachmentCmd {
    pub file_name: String,
    pub url: String,
    pub content_type: Option<String>,
    pub size_bytes: Option<i64>,
}

#[derive(Clone, Debug)]
pub struct NewGoalCmd {
    pub name: String,
    pub kind: GoalKind,
    pub target_amount_minor: i64,
    pub current_amount_minor: i64,
    /// Defaults to the user currency.
    pub currency: Option<Currency>,
    pub target_date: Option<DateTime<Utc>>,
}

impl NewGoalCmd {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: GoalKind, target_amount_minor: i64) -> Self {
        Self {
            name: name.into(),
            kind,
            target_amount_minor,
            current_amount_minor: 0,
            currency: None,
            target_date: None,
        }
    }

    #[must_use]
    pub fn current_amount_minor(mut self, amount_minor: i64) -> Self {
        self.current_amount_minor = amount_minor;
        self
    }

    #[must_use]
    pub fn currency(mut self, currency: Currency) -> Self {
        self.currency = Some(currency);
        self
    }

    #[must_use]
    pub fn target_date(mut self, target_date: DateTime<Utc>) -> Self {
        self.target_date = Some(target_date);
        self
    }
}

#[derive(Clone, Debug, Default)]
pub struct UpdateGoalCmd {
    pub name: Option<String>,
    pub kind: Option<GoalKind>,
    pub target_amount_minor: Option<i64>,
    pub current_amount_minor: Option<i64>,
    pub target_date: Option<Option<DateTime<Utc>>>,
}

#[derive(Clone, Debug)]
pub struct NewInvestmentCmd {
    pub symbol: String,
    pub name: Option<String>,
    pub kind: InvestmentKind,
    pub quantity: f64,
    pub average_price_minor: i64,
    /// Defaults to the average price.
    pub current_price_minor: Option<i64>,
    pub currency: Currency,
    pub broker: Option<String>,
    pub sector: Option<String>,
}

impl NewInvestmentCmd {
    #[must_use]
    pub fn new(
        symbol: impl Into<String>,
        kind: InvestmentKind,
        quantity: f64,
        average_price_minor: i64,
        currency: Currency,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            name: None,
            kind,
            quantity,
            average_price_minor,
            current_price_minor: None,
            currency,
            broker: None,
            sector: None,
        }
    }

    #[must_use]
    pub fn current_price_minor(mut self, price_minor: i64) -> Self {
        self.current_price_minor = Some(price_minor);
        self
    }

    #[must_use]
    pub fn sector(mut self, sector: impl Into<String>) -> Self {
        self.sector = Some(sector.into());
        self
    }

    #[must_use]
    pub fn broker(mut self, broker: impl Into<String>) -> Self {
        self.broker = Some(broker.into());
        self
    }
}

#[derive(Clone, Debug, Default)]
pub struct UpdateInvestmentCmd {
    pub name: Option<String>,
    pub kind: Option<InvestmentKind>,
    pub quantity: Option<f64>,
    pub average_price_minor: Option<i64>,
    pub broker: Option<String>,
    pub sector: Option<String>,
}

#[derive(Clone, Debug)]
pub struct NewSubscriptionCmd {
    pub name: String,
    pub amount_minor: i64,
    /// Defaults to the account currency, then to the user currency.
    pub currency: Option<Currency>,
    pub frequency: Frequency,
    pub interval: u32,
    /// First payment date.
    pub starts_at: DateTime<Utc>,
    pub account_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
}

impl NewSubscriptionCmd {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        amount_minor: i64,
        frequency: Frequency,
        starts_at: DateTime<Utc>,
    ) -> Self {
        Self {
            name: name.into(),
            amount_minor,
            currency: None,
            frequency,
            interval: 1,
            starts_at,
            account_id: None,
            category_id: None,
        }
    }

    #[must_use]
    pub fn interval(mut self, interval: u32) -> Self {
        self.interval = interval;
        self
    }

    #[must_use]
    pub fn account(mut self, account_id: Uuid) -> Self {
        self.account_id = Some(account_id);
        self
    }

    #[must_use]
    pub fn category(mut self, category_id: Uuid) -> Self {
        self.category_id = Some(category_id);
        self
    }

    #[must_use]
    pub fn currency(mut self, currency: Currency) -> Self {
        self.currency = Some(currency);
        self
    }
}

#[derive(Clone, Debug, Default)]
pub struct UpdateSubscriptionCmd {
    pub name: Option<String>,
    pub amount_minor: Option<i64>,
    pub account_id: Option<Option<Uuid>>,
    pub category_id: Option<Option<Uuid>>,
    pub is_active: Option<bool>,
}
