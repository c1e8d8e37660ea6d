use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sea_orm::{
    Condition, QueryFilter, QueryOrder, QuerySelect, TransactionTrait, prelude::*,
    sea_query::LikeExpr,
};

use crate::{
    EngineError, ResultEngine, Transaction, TransactionKind, transactions, util::escape_like,
};

use super::super::{Engine, with_tx};

/// Filters for listing transactions.
///
/// `from` is inclusive and `to` is exclusive (`[from, to)`), both in UTC.
#[derive(Clone, Debug, Default)]
pub struct TransactionListFilter {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    /// Matches the source or the target account.
    pub account_id: Option<Uuid>,
    /// Includes the direct subcategories of a parent category.
    pub category_id: Option<Uuid>,
    pub kind: Option<TransactionKind>,
    pub tag: Option<String>,
    /// Case-insensitive substring of the description.
    pub search: Option<String>,
}

fn validate_list_filter(filter: &TransactionListFilter) -> ResultEngine<()> {
    if let (Some(from), Some(to)) = (filter.from, filter.to)
        && from >= to
    {
        return Err(EngineError::InvalidDate(
            "invalid range: from must be < to".to_string(),
        ));
    }
    Ok(())
}

/// `%raw%` with `raw` matched literally.
fn literal_like(raw: &str) -> LikeExpr {
    LikeExpr::new(format!("%{}%", escape_like(raw))).escape('\\')
}

trait ApplyTxFilters: QueryFilter + Sized {
    fn apply_tx_filters(self, filter: &TransactionListFilter, categories: Option<Vec<Uuid>>) -> Self;
}

impl<T> ApplyTxFilters for T
where
    T: QueryFilter + Sized,
{
    fn apply_tx_filters(mut self, filter: &TransactionListFilter, categories: Option<Vec<Uuid>>) -> Self {
        if let Some(from) = filter.from {
            self = self.filter(transactions::Column::OccurredAt.gte(from));
        }
        if let Some(to) = filter.to {
            self = self.filter(transactions::Column::OccurredAt.lt(to));
        }
        if let Some(account_id) = filter.account_id {
            self = self.filter(
                Condition::any()
                    .add(transactions::Column::AccountId.eq(account_id))
                    .add(transactions::Column::ToAccountId.eq(account_id)),
            );
        }
        if let Some(categories) = categories {
            self = self.filter(transactions::Column::CategoryId.is_in(categories));
        }
        if let Some(kind) = filter.kind {
            self = self.filter(transactions::Column::Kind.eq(kind.as_str()));
        }
        if let Some(tag) = filter.tag.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            // tags are stored as a JSON array of lowercase strings: match one
            // whole encoded element
            let element = serde_json::Value::String(tag.to_lowercase()).to_string();
            self = self.filter(transactions::Column::Tags.like(literal_like(&element)));
        }
        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            self = self.filter(transactions::Column::Description.like(literal_like(search)));
        }
        self
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct TransactionsCursor {
    occurred_at: DateTime<Utc>,
    transaction_id: Uuid,
}

impl TransactionsCursor {
    fn encode(&self) -> ResultEngine<String> {
        let bytes = serde_json::to_vec(self)
            .map_err(|_| EngineError::InvalidCursor("invalid transactions cursor".to_string()))?;
        Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
    }

    fn decode(input: &str) -> ResultEngine<Self> {
        let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(input.as_bytes())
            .map_err(|_| EngineError::InvalidCursor("invalid transactions cursor".to_string()))?;
        serde_json::from_slice::<Self>(&bytes)
            .map_err(|_| EngineError::InvalidCursor("invalid transactions cursor".to_string()))
    }
}

impl Engine {
    /// Lists the user's transactions with cursor-based pagination.
    ///
    /// Pagination is newest → older by `(occurred_at DESC, id DESC)`; the
    /// returned cursor is `None` on the last page.
    pub async fn list_transactions(
        &self,
        user_id: Uuid,
        filter: &TransactionListFilter,
        limit: u64,
        cursor: Option<&str>,
    ) -> ResultEngine<(Vec<Transaction>, Option<String>)> {
        validate_list_filter(filter)?;
        let limit = limit.max(1);
        with_tx!(self, |db_tx| {
            let categories = match filter.category_id {
                Some(category_id) => Some(
                    self.category_with_children(&db_tx, user_id, category_id)
                        .await?,
                ),
                None => None,
            };

            let limit_plus_one = limit.saturating_add(1);
            let mut query = transactions::Entity::find()
                .filter(transactions::Column::UserId.eq(user_id))
                .order_by_desc(transactions::Column::OccurredAt)
                .order_by_desc(transactions::Column::Id)
                .limit(limit_plus_one);

            if let Some(cursor) = cursor {
                let cursor = TransactionsCursor::decode(cursor)?;
                query = query.filter(
                    Condition::any()
                        .add(transactions::Column::OccurredAt.lt(cursor.occurred_at))
                        .add(
                            Condition::all()
                                .add(transactions::Column::OccurredAt.eq(cursor.occurred_at))
                                .add(transactions::Column::Id.lt(cursor.transaction_id)),
                        ),
                );
            }
            query = query.apply_tx_filters(filter, categories);

            let rows: Vec<transactions::Model> = query.all(&db_tx).await?;
            let has_more = rows.len() > limit as usize;

            let mut out: Vec<Transaction> = rows
                .into_iter()
                .take(limit as usize)
                .map(Transaction::try_from)
                .collect::<ResultEngine<_>>()?;

            let mut attachments = self
                .attachments_by_transaction(&db_tx, out.iter().map(|t| t.id).collect())
                .await?;
            for tx in &mut out {
                tx.attachments = attachments.remove(&tx.id).unwrap_or_default();
            }

            let next_cursor = if has_more {
                out.last()
                    .map(|tx| TransactionsCursor {
                        occurred_at: tx.occurred_at,
                        transaction_id: tx.id,
                    })
                    .map(|c| c.encode())
                    .transpose()?
            } else {
                None
            };

            Ok((out, next_cursor))
        })
    }

    /// Every transaction of a user in `[from, to)`, oldest first. Used by
    /// reports and exports.
    pub(crate) async fn transactions_in_range(
        &self,
        user_id: Uuid,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> ResultEngine<Vec<Transaction>> {
        let filter = TransactionListFilter {
            from,
            to,
            ..Default::default()
        };
        validate_list_filter(&filter)?;
        transactions::Entity::find()
            .filter(transactions::Column::UserId.eq(user_id))
            .apply_tx_filters(&filter, None)
            .order_by_asc(transactions::Column::OccurredAt)
            .order_by_asc(transactions::Column::Id)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Transaction::try_from)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_roundtrip_and_garbage() {
        let cursor = TransactionsCursor {
            occurred_at: Utc::now(),
            transaction_id: Uuid::new_v4(),
        };
        let decoded = TransactionsCursor::decode(&cursor.encode().unwrap()).unwrap();
        assert_eq!(decoded.transaction_id, cursor.transaction_id);
        assert_eq!(decoded.occurred_at, cursor.occurred_at);

        assert!(matches!(
            TransactionsCursor::decode("not-a-cursor"),
            Err(EngineError::InvalidCursor(_))
        ));
    }
}
