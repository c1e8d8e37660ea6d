//! Report aggregations.
//!
//! Everything here is pure: the `ops::reports` layer loads the rows and hands
//! them over. Transfers move money between the user's own accounts, so they
//! never count as income or expense.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use csv::Writer;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    Account, Category, Currency, EngineError, Investment, Money, ResultEngine, Transaction,
    TransactionKind,
    util::{add_minor, sub_minor},
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub currency: Currency,
    pub income_minor: i64,
    pub expense_minor: i64,
    pub net_minor: i64,
    pub count: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyEntry {
    /// `YYYY-MM`
    pub month: String,
    pub income_minor: i64,
    pub expense_minor: i64,
    pub net_minor: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    /// `None` for the uncategorized bucket.
    pub category_id: Option<Uuid>,
    pub name: String,
    pub total_minor: i64,
    pub count: u64,
    pub percent: f64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetWorth {
    pub currency: Currency,
    pub assets_minor: i64,
    pub liabilities_minor: i64,
    pub net_minor: i64,
}

pub const UNCATEGORIZED: &str = "Uncategorized";

pub fn summarize(currency: Currency, transactions: &[Transaction]) -> ResultEngine<Summary> {
    let mut summary = Summary {
        currency,
        income_minor: 0,
        expense_minor: 0,
        net_minor: 0,
        count: 0,
    };
    for tx in transactions.iter().filter(|t| t.currency == currency) {
        match tx.kind {
            TransactionKind::Income => {
                summary.income_minor = add_minor(summary.income_minor, tx.amount_minor)?
            }
            TransactionKind::Expense => {
                summary.expense_minor = add_minor(summary.expense_minor, tx.amount_minor)?
            }
            TransactionKind::Transfer => continue,
        }
        summary.count += 1;
    }
    summary.net_minor = sub_minor(summary.income_minor, summary.expense_minor)?;
    Ok(summary)
}

fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

fn month_key(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

/// Per-month income and expense between `from` (inclusive) and `to`
/// (exclusive). Every month of the range is present, empty ones as zero.
pub fn monthly(
    currency: Currency,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    transactions: &[Transaction],
) -> ResultEngine<Vec<MonthlyEntry>> {
    if to <= from {
        return Err(EngineError::InvalidDate(
            "`to` must be after `from`".to_string(),
        ));
    }
    let first = month_start(from.date_naive());
    let last = month_start((to - Duration::nanoseconds(1)).date_naive());

    let mut months: BTreeMap<NaiveDate, MonthlyEntry> = BTreeMap::new();
    let mut cursor = first;
    while cursor <= last {
        months.insert(
            cursor,
            MonthlyEntry {
                month: month_key(cursor),
                income_minor: 0,
                expense_minor: 0,
                net_minor: 0,
            },
        );
        cursor = cursor
            .checked_add_months(chrono::Months::new(1))
            .ok_or_else(|| EngineError::InvalidDate("range overflows the calendar".to_string()))?;
    }

    for tx in transactions
        .iter()
        .filter(|t| t.currency == currency && t.occurred_at >= from && t.occurred_at < to)
    {
        let Some(entry) = months.get_mut(&month_start(tx.occurred_at.date_naive())) else {
            continue;
        };
        match tx.kind {
            TransactionKind::Income => {
                entry.income_minor = add_minor(entry.income_minor, tx.amount_minor)?
            }
            TransactionKind::Expense => {
                entry.expense_minor = add_minor(entry.expense_minor, tx.amount_minor)?
            }
            TransactionKind::Transfer => {}
        }
    }

    months
        .into_values()
        .map(|mut entry| -> ResultEngine<MonthlyEntry> {
            entry.net_minor = sub_minor(entry.income_minor, entry.expense_minor)?;
            Ok(entry)
        })
        .collect()
}

fn root_category<'c>(by_id: &HashMap<Uuid, &'c Category>, id: Uuid) -> Option<&'c Category> {
    let category = *by_id.get(&id)?;
    match category.parent_id {
        Some(parent) => by_id.get(&parent).copied().or(Some(category)),
        None => Some(category),
    }
}

/// Totals of one kind grouped by top-level category.
///
/// Child categories roll up into their parent; transactions without a
/// category (or with one no longer visible) land in [`UNCATEGORIZED`].
/// Sorted by descending total.
pub fn category_breakdown(
    currency: Currency,
    kind: TransactionKind,
    transactions: &[Transaction],
    categories: &[Category],
) -> ResultEngine<Vec<CategoryTotal>> {
    let by_id: HashMap<Uuid, &Category> = categories.iter().map(|c| (c.id, c)).collect();

    let mut totals: HashMap<Option<Uuid>, (String, i64, u64)> = HashMap::new();
    let mut grand_total = 0;
    for tx in transactions
        .iter()
        .filter(|t| t.currency == currency && t.kind == kind)
    {
        let bucket = tx.category_id.and_then(|id| root_category(&by_id, id));
        let key = bucket.map(|c| c.id);
        let name = bucket.map_or_else(|| UNCATEGORIZED.to_string(), |c| c.name.clone());
        let entry = totals.entry(key).or_insert((name, 0, 0));
        entry.1 = add_minor(entry.1, tx.amount_minor)?;
        entry.2 += 1;
        grand_total = add_minor(grand_total, tx.amount_minor)?;
    }

    let mut out: Vec<CategoryTotal> = totals
        .into_iter()
        .map(|(category_id, (name, total_minor, count))| CategoryTotal {
            category_id,
            name,
            total_minor,
            count,
            percent: if grand_total == 0 {
                0.0
            } else {
                (total_minor as f64 * 10_000.0 / grand_total as f64).round() / 100.0
            },
        })
        .collect();
    out.sort_by(|a, b| {
        b.total_minor
            .cmp(&a.total_minor)
            .then_with(|| a.name.cmp(&b.name))
    });
    Ok(out)
}

/// Assets and liabilities per currency. Positive balances are assets,
/// negative ones (overdrafts, card debt) liabilities. Investments count at
/// market value.
pub fn net_worth(accounts: &[Account], investments: &[Investment]) -> ResultEngine<Vec<NetWorth>> {
    fn bucket(out: &mut BTreeMap<Currency, NetWorth>, currency: Currency) -> &mut NetWorth {
        out.entry(currency).or_insert(NetWorth {
            currency,
            assets_minor: 0,
            liabilities_minor: 0,
            net_minor: 0,
        })
    }

    let mut out: BTreeMap<Currency, NetWorth> = BTreeMap::new();
    for account in accounts.iter().filter(|a| a.is_active) {
        let entry = bucket(&mut out, account.currency);
        if account.balance_minor >= 0 {
            entry.assets_minor = add_minor(entry.assets_minor, account.balance_minor)?;
        } else {
            entry.liabilities_minor =
                sub_minor(entry.liabilities_minor, account.balance_minor)?;
        }
    }
    for investment in investments {
        let entry = bucket(&mut out, investment.currency);
        entry.assets_minor = add_minor(entry.assets_minor, investment.market_value_minor())?;
    }

    out.into_values()
        .map(|mut entry| -> ResultEngine<NetWorth> {
            entry.net_minor = sub_minor(entry.assets_minor, entry.liabilities_minor)?;
            Ok(entry)
        })
        .collect()
}

#[derive(Serialize)]
struct ExportRow<'a> {
    date: String,
    kind: &'static str,
    amount: String,
    currency: &'static str,
    account: &'a str,
    to_account: &'a str,
    category: &'a str,
    description: &'a str,
    tags: String,
}

/// CSV export. Account and category ids are resolved to names; unknown ids
/// are written as empty cells.
pub fn export_csv(
    transactions: &[Transaction],
    accounts: &[Account],
    categories: &[Category],
) -> ResultEngine<String> {
    let account_names: HashMap<Uuid, &str> =
        accounts.iter().map(|a| (a.id, a.name.as_str())).collect();
    let category_names: HashMap<Uuid, &str> =
        categories.iter().map(|c| (c.id, c.name.as_str())).collect();
    let lookup = |names: &HashMap<Uuid, &str>, id: Option<Uuid>| -> String {
        id.and_then(|id| names.get(&id).map(|n| n.to_string()))
            .unwrap_or_default()
    };

    let mut writer = Writer::from_writer(vec![]);
    for tx in transactions {
        let account = lookup(&account_names, tx.account_id);
        let to_account = lookup(&account_names, tx.to_account_id);
        let category = lookup(&category_names, tx.category_id);
        writer
            .serialize(ExportRow {
                date: tx.occurred_at.to_rfc3339(),
                kind: tx.kind.as_str(),
                amount: Money::new(tx.amount_minor, tx.currency).format_major(),
                currency: tx.currency.code(),
                account: &account,
                to_account: &to_account,
                category: &category,
                description: tx.description.as_deref().unwrap_or_default(),
                tags: tx.tags.join(";"),
            })
            .map_err(|e| EngineError::Internal(format!("csv export: {e}")))?;
    }
    if transactions.is_empty() {
        writer
            .write_record([
                "date",
                "kind",
                "amount",
                "currency",
                "account",
                "to_account",
                "category",
                "description",
                "tags",
            ])
            .map_err(|e| EngineError::Internal(format!("csv export: {e}")))?;
    }

    let data = writer
        .into_inner()
        .map_err(|e| EngineError::Internal(format!("csv export: {e}")))?;
    String::from_utf8(data).map_err(|e| EngineError::Internal(format!("csv export: {e}")))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::AccountKind;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 10, 0, 0).unwrap()
    }

    fn tx(kind: TransactionKind, amount: i64, when: DateTime<Utc>, category: Option<Uuid>) -> Transaction {
        Transaction {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            account_id: None,
            to_account_id: None,
            category_id: category,
            kind,
            amount_minor: amount,
            currency: Currency::Eur,
            description: None,
            occurred_at: when,
            tags: Vec::new(),
            recurring_rule_id: None,
            attachments: Vec::new(),
            created_at: when,
        }
    }

    fn category(name: &str, parent: Option<Uuid>) -> Category {
        Category {
            id: Uuid::new_v4(),
            user_id: None,
            name: name.to_string(),
            icon: None,
            color: None,
            parent_id: parent,
            is_system: parent.is_none(),
        }
    }

    #[test]
    fn summary_ignores_transfers() {
        let items = vec![
            tx(TransactionKind::Income, 10_000, at(2024, 1, 1), None),
            tx(TransactionKind::Expense, 2_500, at(2024, 1, 2), None),
            tx(TransactionKind::Transfer, 7_000, at(2024, 1, 3), None),
        ];
        let summary = summarize(Currency::Eur, &items).unwrap();
        assert_eq!(summary.income_minor, 10_000);
        assert_eq!(summary.expense_minor, 2_500);
        assert_eq!(summary.net_minor, 7_500);
        assert_eq!(summary.count, 2);
    }

    #[test]
    fn sums_past_the_i64_range_are_rejected() {
        let half = i64::MAX / 2 + 1;
        let items = vec![
            tx(TransactionKind::Income, half, at(2024, 1, 1), None),
            tx(TransactionKind::Income, half, at(2024, 1, 2), None),
        ];
        assert!(matches!(
            summarize(Currency::Eur, &items),
            Err(EngineError::InvalidAmount(_))
        ));
        assert!(monthly(Currency::Eur, at(2024, 1, 1), at(2024, 2, 1), &items).is_err());
        assert!(category_breakdown(Currency::Eur, TransactionKind::Income, &items, &[]).is_err());
    }

    #[test]
    fn monthly_fills_empty_months() {
        let items = vec![
            tx(TransactionKind::Income, 1_000, at(2024, 1, 15), None),
            tx(TransactionKind::Expense, 400, at(2024, 3, 2), None),
        ];
        let series = monthly(Currency::Eur, at(2024, 1, 1), Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap(), &items)
            .unwrap();
        let months: Vec<&str> = series.iter().map(|m| m.month.as_str()).collect();
        assert_eq!(months, vec!["2024-01", "2024-02", "2024-03"]);
        assert_eq!(series[0].net_minor, 1_000);
        assert_eq!(series[1].net_minor, 0);
        assert_eq!(series[2].expense_minor, 400);
    }

    #[test]
    fn monthly_rejects_inverted_range() {
        assert!(monthly(Currency::Eur, at(2024, 2, 1), at(2024, 1, 1), &[]).is_err());
    }

    #[test]
    fn breakdown_rolls_children_up() {
        let food = category("Food & Dining", None);
        let groceries = category("Groceries", Some(food.id));
        let items = vec![
            tx(TransactionKind::Expense, 3_000, at(2024, 1, 1), Some(food.id)),
            tx(TransactionKind::Expense, 1_000, at(2024, 1, 2), Some(groceries.id)),
            tx(TransactionKind::Expense, 1_000, at(2024, 1, 3), None),
            tx(TransactionKind::Income, 9_000, at(2024, 1, 4), Some(food.id)),
        ];
        let breakdown = category_breakdown(
            Currency::Eur,
            TransactionKind::Expense,
            &items,
            &[food.clone(), groceries],
        )
        .unwrap();
        assert_eq!(breakdown.len(), 2);
        assert_eq!(breakdown[0].category_id, Some(food.id));
        assert_eq!(breakdown[0].total_minor, 4_000);
        assert_eq!(breakdown[0].count, 2);
        assert_eq!(breakdown[0].percent, 80.0);
        assert_eq!(breakdown[1].name, UNCATEGORIZED);
        assert_eq!(breakdown[1].percent, 20.0);
    }

    #[test]
    fn net_worth_splits_assets_and_liabilities() {
        let account = |balance: i64, kind: AccountKind, active: bool| Account {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            name: "a".to_string(),
            kind,
            provider: None,
            balance_minor: balance,
            currency: Currency::Eur,
            is_active: active,
            last_sync_at: None,
            created_at: Utc::now(),
        };
        let accounts = vec![
            account(50_000, AccountKind::Checking, true),
            account(-20_000, AccountKind::CreditCard, true),
            account(1_000_000, AccountKind::Savings, false),
        ];
        let worth = net_worth(&accounts, &[]).unwrap();
        assert_eq!(worth.len(), 1);
        assert_eq!(worth[0].assets_minor, 50_000);
        assert_eq!(worth[0].liabilities_minor, 20_000);
        assert_eq!(worth[0].net_minor, 30_000);
    }

    #[test]
    fn csv_has_header_and_resolved_names() {
        let food = category("Food & Dining", None);
        let mut lunch = tx(TransactionKind::Expense, 1_250, at(2024, 5, 6), Some(food.id));
        lunch.description = Some("Lunch, with team".to_string());
        lunch.tags = vec!["work".to_string(), "team".to_string()];
        let csv = export_csv(&[lunch], &[], &[food]).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("date,kind,amount,currency,account,to_account,category,description,tags")
        );
        assert_eq!(
            lines.next(),
            Some("2024-05-06T10:00:00+00:00,expense,12.50,EUR,,,Food & Dining,\"Lunch, with team\",work;team")
        );
    }

    #[test]
    fn empty_csv_still_has_header() {
        let csv = export_csv(&[], &[], &[]).unwrap();
        assert_eq!(
            csv.trim_end(),
            "date,kind,amount,currency,account,to_account,category,description,tags"
        );
    }
}
