//! JSON request and response bodies of the Moneta HTTP API.
//!
//! Amounts are integers in minor units of their currency (cents for EUR,
//! yen for JPY). Timestamps are RFC3339; any offset is accepted on input and
//! UTC is returned.

use serde::{Deserialize, Deserializer, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Eur,
    Usd,
    Gbp,
    Chf,
    Jpy,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

/// Error body returned with every non-2xx response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Distinguishes a missing field (`None`) from an explicit `null`
/// (`Some(None)`) in PATCH bodies. Use together with `#[serde(default)]`.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

pub mod user {
    use chrono::{DateTime, Utc};
    use uuid::Uuid;

    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct UserNew {
        pub email: String,
        pub password: String,
        pub name: Option<String>,
        pub currency: Option<Currency>,
    }

    /// `name: ""` clears the display name.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct UserUpdate {
        pub name: Option<String>,
        pub currency: Option<Currency>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PasswordChange {
        pub current_password: String,
        pub new_password: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct UserView {
        pub id: Uuid,
        pub email: String,
        pub name: Option<String>,
        pub currency: Currency,
        pub created_at: DateTime<Utc>,
    }
}

pub mod account {
    use chrono::{DateTime, Utc};
    use uuid::Uuid;

    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum AccountKind {
        Checking,
        Savings,
        CreditCard,
        Investment,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AccountNew {
        pub name: String,
        pub kind: AccountKind,
        pub currency: Currency,
        pub provider: Option<String>,
        /// Opening balance, 0 when absent.
        pub balance_minor: Option<i64>,
    }

    /// Setting `balance_minor` reconciles the account with its provider.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct AccountUpdate {
        pub name: Option<String>,
        pub provider: Option<String>,
        pub is_active: Option<bool>,
        pub balance_minor: Option<i64>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct AccountList {
        pub include_inactive: Option<bool>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AccountView {
        pub id: Uuid,
        pub name: String,
        pub kind: AccountKind,
        pub provider: Option<String>,
        pub balance_minor: i64,
        pub currency: Currency,
        pub is_active: bool,
        pub last_sync_at: Option<DateTime<Utc>>,
        pub created_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AccountListResponse {
        pub accounts: Vec<AccountView>,
    }
}

pub mod category {
    use uuid::Uuid;

    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CategoryNew {
        pub name: String,
        pub icon: Option<String>,
        pub color: Option<String>,
        pub parent_id: Option<Uuid>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct CategoryUpdate {
        pub name: Option<String>,
        pub icon: Option<String>,
        pub color: Option<String>,
        /// `null` detaches the category from its parent.
        #[serde(default, deserialize_with = "double_option")]
        pub parent_id: Option<Option<Uuid>>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CategoryView {
        pub id: Uuid,
        pub name: String,
        pub icon: Option<String>,
        pub color: Option<String>,
        pub parent_id: Option<Uuid>,
        pub is_system: bool,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CategoryListResponse {
        pub categories: Vec<CategoryView>,
    }
}

pub mod transaction {
    use chrono::{DateTime, Utc};
    use uuid::Uuid;

    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum TransactionKind {
        Income,
        Expense,
        Transfer,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Recurrence {
        pub frequency: Frequency,
        /// Defaults to 1.
        pub interval: Option<u32>,
        pub end_date: Option<DateTime<Utc>>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionNew {
        pub kind: TransactionKind,
        pub amount_minor: i64,
        pub occurred_at: DateTime<Utc>,
        pub account_id: Option<Uuid>,
        /// Required for transfers, rejected otherwise.
        pub to_account_id: Option<Uuid>,
        pub category_id: Option<Uuid>,
        /// Only needed without an account; must match the account otherwise.
        pub currency: Option<Currency>,
        pub description: Option<String>,
        #[serde(default)]
        pub tags: Vec<String>,
        pub recurrence: Option<Recurrence>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct TransactionUpdate {
        pub kind: Option<TransactionKind>,
        pub amount_minor: Option<i64>,
        pub occurred_at: Option<DateTime<Utc>>,
        #[serde(default, deserialize_with = "double_option")]
        pub account_id: Option<Option<Uuid>>,
        #[serde(default, deserialize_with = "double_option")]
        pub to_account_id: Option<Option<Uuid>>,
        #[serde(default, deserialize_with = "double_option")]
        pub category_id: Option<Option<Uuid>>,
        pub description: Option<String>,
        pub tags: Option<Vec<String>>,
    }

    /// Query string of `GET /transactions`.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct TransactionList {
        pub from: Option<DateTime<Utc>>,
        pub to: Option<DateTime<Utc>>,
        pub account_id: Option<Uuid>,
        pub category_id: Option<Uuid>,
        pub kind: Option<TransactionKind>,
        pub tag: Option<String>,
        pub search: Option<String>,
        pub limit: Option<u64>,
        /// Opaque cursor from `next_cursor`; pages go newest to oldest.
        pub cursor: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AttachmentNew {
        pub file_name: String,
        pub url: String,
        pub content_type: Option<String>,
        pub size_bytes: Option<i64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AttachmentView {
        pub id: Uuid,
        pub file_name: String,
        pub url: String,
        pub content_type: Option<String>,
        pub size_bytes: Option<i64>,
        pub created_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionView {
        pub id: Uuid,
        pub kind: TransactionKind,
        pub amount_minor: i64,
        pub currency: Currency,
        pub occurred_at: DateTime<Utc>,
        pub account_id: Option<Uuid>,
        pub to_account_id: Option<Uuid>,
        pub category_id: Option<Uuid>,
        pub description: Option<String>,
        pub tags: Vec<String>,
        pub recurring_rule_id: Option<Uuid>,
        pub attachments: Vec<AttachmentView>,
        pub created_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionListResponse {
        pub transactions: Vec<TransactionView>,
        pub next_cursor: Option<String>,
    }
}

pub mod recurring {
    use chrono::{DateTime, Utc};
    use uuid::Uuid;

    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct RecurringRuleView {
        pub id: Uuid,
        pub template_transaction_id: Uuid,
        pub frequency: Frequency,
        pub interval: u32,
        pub starts_at: DateTime<Utc>,
        pub end_date: Option<DateTime<Utc>>,
        pub occurrences: u32,
        pub next_run_at: DateTime<Utc>,
        pub is_active: bool,
        pub last_run_at: Option<DateTime<Utc>>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct RecurringRuleListResponse {
        pub rules: Vec<RecurringRuleView>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct QueueStatsView {
        pub waiting: u64,
        pub active: u64,
        pub completed: u64,
        pub failed: u64,
        pub delayed: u64,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct RunReportView {
        pub enqueued: u64,
        pub completed: u64,
        pub failed: u64,
        pub materialized: u64,
    }
}

pub mod goal {
    use chrono::{DateTime, Utc};
    use uuid::Uuid;

    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum GoalKind {
        Savings,
        DebtPayoff,
        EmergencyFund,
        Investment,
        Purchase,
        Other,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GoalNew {
        pub name: String,
        pub kind: GoalKind,
        pub target_amount_minor: i64,
        pub current_amount_minor: Option<i64>,
        pub currency: Option<Currency>,
        pub target_date: Option<DateTime<Utc>>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct GoalUpdate {
        pub name: Option<String>,
        pub kind: Option<GoalKind>,
        pub target_amount_minor: Option<i64>,
        pub current_amount_minor: Option<i64>,
        #[serde(default, deserialize_with = "double_option")]
        pub target_date: Option<Option<DateTime<Utc>>>,
    }

    /// Negative amounts withdraw.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct Contribution {
        pub amount_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GoalProgressView {
        pub percent: f64,
        pub remaining_minor: i64,
        pub achieved: bool,
        pub months_left: Option<u32>,
        pub monthly_required_minor: Option<i64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GoalView {
        pub id: Uuid,
        pub name: String,
        pub kind: GoalKind,
        pub target_amount_minor: i64,
        pub current_amount_minor: i64,
        pub currency: Currency,
        pub target_date: Option<DateTime<Utc>>,
        pub progress: GoalProgressView,
        pub created_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GoalListResponse {
        pub goals: Vec<GoalView>,
    }
}

pub mod investment {
    use chrono::{DateTime, Utc};
    use uuid::Uuid;

    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum InvestmentKind {
        Stock,
        Etf,
        Bond,
        Crypto,
        Fund,
        Other,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct InvestmentNew {
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

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct InvestmentUpdate {
        pub name: Option<String>,
        pub kind: Option<InvestmentKind>,
        pub quantity: Option<f64>,
        pub average_price_minor: Option<i64>,
        pub broker: Option<String>,
        pub sector: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PriceUpdate {
        pub price_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct InvestmentView {
        pub id: Uuid,
        pub symbol: String,
        pub name: Option<String>,
        pub kind: InvestmentKind,
        pub quantity: f64,
        pub average_price_minor: i64,
        pub current_price_minor: i64,
        pub currency: Currency,
        pub broker: Option<String>,
        pub sector: Option<String>,
        pub market_value_minor: i64,
        pub price_updated_at: Option<DateTime<Utc>>,
        pub created_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct InvestmentListResponse {
        pub investments: Vec<InvestmentView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AllocationView {
        pub key: String,
        pub value_minor: i64,
        pub percent: f64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct HoldingView {
        pub id: Uuid,
        pub symbol: String,
        pub market_value_minor: i64,
        pub cost_basis_minor: i64,
        pub gain_minor: i64,
        pub gain_percent: f64,
        pub weight_percent: f64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PortfolioView {
        pub currency: Currency,
        pub market_value_minor: i64,
        pub cost_basis_minor: i64,
        pub gain_minor: i64,
        pub gain_percent: f64,
        pub by_kind: Vec<AllocationView>,
        pub by_sector: Vec<AllocationView>,
        pub holdings: Vec<HoldingView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PortfolioResponse {
        pub portfolios: Vec<PortfolioView>,
    }
}

pub mod subscription {
    use chrono::{DateTime, Utc};
    use uuid::Uuid;

    use super::*;
    use crate::transaction::TransactionView;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SubscriptionNew {
        pub name: String,
        pub amount_minor: i64,
        pub frequency: Frequency,
        pub interval: Option<u32>,
        pub starts_at: DateTime<Utc>,
        pub account_id: Option<Uuid>,
        pub category_id: Option<Uuid>,
        pub currency: Option<Currency>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct SubscriptionUpdate {
        pub name: Option<String>,
        pub amount_minor: Option<i64>,
        #[serde(default, deserialize_with = "double_option")]
        pub account_id: Option<Option<Uuid>>,
        #[serde(default, deserialize_with = "double_option")]
        pub category_id: Option<Option<Uuid>>,
        pub is_active: Option<bool>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct UpcomingQuery {
        /// Defaults to 30.
        pub days: Option<u32>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SubscriptionView {
        pub id: Uuid,
        pub name: String,
        pub amount_minor: i64,
        pub currency: Currency,
        pub frequency: Frequency,
        pub interval: u32,
        pub starts_at: DateTime<Utc>,
        pub next_payment_date: DateTime<Utc>,
        pub payments_made: u32,
        pub account_id: Option<Uuid>,
        pub category_id: Option<Uuid>,
        pub is_active: bool,
        pub monthly_cost_minor: i64,
        pub created_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SubscriptionListResponse {
        pub subscriptions: Vec<SubscriptionView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SubscriptionSummaryView {
        pub currency: Currency,
        pub active_count: u64,
        pub monthly_minor: i64,
        pub yearly_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SubscriptionSummaryResponse {
        pub summaries: Vec<SubscriptionSummaryView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PaymentView {
        pub subscription: SubscriptionView,
        pub transaction: TransactionView,
    }
}

pub mod report {
    use chrono::{DateTime, Utc};
    use uuid::Uuid;

    use super::*;
    use crate::transaction::TransactionKind;

    /// Query string of the report endpoints. `currency` defaults to the
    /// user's currency.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct ReportQuery {
        pub from: Option<DateTime<Utc>>,
        pub to: Option<DateTime<Utc>>,
        pub currency: Option<Currency>,
        /// Only for `/reports/categories`, defaults to `expense`.
        pub kind: Option<TransactionKind>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SummaryView {
        pub currency: Currency,
        pub income_minor: i64,
        pub expense_minor: i64,
        pub net_minor: i64,
        pub count: u64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MonthlyView {
        pub month: String,
        pub income_minor: i64,
        pub expense_minor: i64,
        pub net_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct MonthlyResponse {
        pub currency: Currency,
        pub months: Vec<MonthlyView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CategoryTotalView {
        pub category_id: Option<Uuid>,
        pub name: String,
        pub total_minor: i64,
        pub count: u64,
        pub percent: f64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CategoryBreakdownResponse {
        pub currency: Currency,
        pub kind: TransactionKind,
        pub categories: Vec<CategoryTotalView>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct NetWorthView {
        pub currency: Currency,
        pub assets_minor: i64,
        pub liabilities_minor: i64,
        pub net_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct NetWorthResponse {
        pub net_worth: Vec<NetWorthView>,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn double_option_tells_null_from_missing() {
        let missing: transaction::TransactionUpdate = serde_json::from_str("{}").unwrap();
        assert_eq!(missing.category_id, None);

        let cleared: transaction::TransactionUpdate =
            serde_json::from_str(r#"{"category_id": null}"#).unwrap();
        assert_eq!(cleared.category_id, Some(None));

        let id = uuid::Uuid::nil();
        let set: transaction::TransactionUpdate =
            serde_json::from_str(&format!(r#"{{"category_id": "{id}"}}"#)).unwrap();
        assert_eq!(set.category_id, Some(Some(id)));
    }

    #[test]
    fn enums_use_wire_names() {
        assert_eq!(serde_json::to_string(&Currency::Chf).unwrap(), "\"CHF\"");
        assert_eq!(
            serde_json::to_string(&account::AccountKind::CreditCard).unwrap(),
            "\"credit_card\""
        );
        assert_eq!(
            serde_json::to_string(&goal::GoalKind::DebtPayoff).unwrap(),
            "\"debt_payoff\""
        );
    }
}
