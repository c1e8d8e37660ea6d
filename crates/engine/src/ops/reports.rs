use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    CategoryTotal, Currency, MonthlyEntry, NetWorth, ResultEngine, Summary, TransactionKind,
    reports,
};

use super::Engine;

impl Engine {
    /// Income, expense and net of one currency in `[from, to)`.
    pub async fn summary(
        &self,
        user_id: Uuid,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        currency: Currency,
    ) -> ResultEngine<Summary> {
        let items = self.transactions_in_range(user_id, from, to).await?;
        reports::summarize(currency, &items)
    }

    /// Month by month totals in `[from, to)`, empty months included.
    pub async fn monthly(
        &self,
        user_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        currency: Currency,
    ) -> ResultEngine<Vec<MonthlyEntry>> {
        let items = self
            .transactions_in_range(user_id, Some(from), Some(to))
            .await?;
        reports::monthly(currency, from, to, &items)
    }

    /// Totals of `kind` grouped by top-level category.
    pub async fn category_breakdown(
        &self,
        user_id: Uuid,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        kind: TransactionKind,
        currency: Currency,
    ) -> ResultEngine<Vec<CategoryTotal>> {
        let items = self.transactions_in_range(user_id, from, to).await?;
        let categories = self.categories(user_id).await?;
        reports::category_breakdown(currency, kind, &items, &categories)
    }

    /// Assets, liabilities and net worth per currency, investments included.
    pub async fn net_worth(&self, user_id: Uuid) -> ResultEngine<Vec<NetWorth>> {
        let accounts = self.accounts(user_id, false).await?;
        let investments = self.investments(user_id).await?;
        reports::net_worth(&accounts, &investments)
    }

    /// CSV of the transactions in `[from, to)`, oldest first.
    pub async fn export_csv(
        &self,
        user_id: Uuid,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> ResultEngine<String> {
        let items = self.transactions_in_range(user_id, from, to).await?;
        let accounts = self.accounts(user_id, true).await?;
        let categories = self.categories(user_id).await?;
        tracing::debug!(%user_id, rows = items.len(), "exporting transactions");
        reports::export_csv(&items, &accounts, &categories)
    }
}
