use sea_orm::{
    Condition, DatabaseConnection, DatabaseTransaction, QueryFilter, prelude::*, sea_query::Expr,
};
use uuid::Uuid;

use crate::{
    Currency, EngineError, ResultEngine,
    password::DEFAULT_ITERATIONS,
    util::{add_minor, model_currency},
};

mod accounts;
mod categories;
mod goals;
mod investments;
mod recurring;
mod reports;
mod subscriptions;
mod transactions;
mod users;

pub use transactions::TransactionListFilter;

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
    password_iterations: u32,
    job_lease: chrono::Duration,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// The user row, or `KeyNotFound`.
    async fn require_user(
        &self,
        db_tx: &DatabaseTransaction,
        user_id: Uuid,
    ) -> ResultEngine<crate::users::Model> {
        crate::users::Entity::find_by_id(user_id)
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("user not exists".to_string()))
    }

    async fn user_currency(&self, db_tx: &DatabaseTransaction, user_id: Uuid) -> ResultEngine<Currency> {
        let user = self.require_user(db_tx, user_id).await?;
        model_currency(&user.currency)
    }

    /// An account owned by `user_id`. Accounts of other users are reported
    /// as missing.
    async fn require_account(
        &self,
        db_tx: &DatabaseTransaction,
        user_id: Uuid,
        account_id: Uuid,
    ) -> ResultEngine<crate::accounts::Model> {
        crate::accounts::Entity::find_by_id(account_id)
            .filter(crate::accounts::Column::UserId.eq(user_id))
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("account not exists".to_string()))
    }

    /// A system category or one owned by `user_id`.
    async fn require_visible_category(
        &self,
        db_tx: &DatabaseTransaction,
        user_id: Uuid,
        category_id: Uuid,
    ) -> ResultEngine<crate::categories::Model> {
        crate::categories::Entity::find_by_id(category_id)
            .filter(visible_categories(user_id))
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("category not exists".to_string()))
    }

    /// Add signed deltas to account balances.
    ///
    /// A balance that would leave the `i64` range is rejected with
    /// `InvalidAmount`, so the column never overflows inside SQLite.
    async fn apply_balance_effects(
        &self,
        db_tx: &DatabaseTransaction,
        effects: &[(Uuid, i64)],
    ) -> ResultEngine<()> {
        for (account_id, delta) in effects {
            if *delta == 0 {
                continue;
            }
            let Some(account) = crate::accounts::Entity::find_by_id(*account_id)
                .one(db_tx)
                .await?
            else {
                continue;
            };
            let balance_minor = add_minor(account.balance_minor, *delta)?;
            crate::accounts::Entity::update_many()
                .col_expr(
                    crate::accounts::Column::BalanceMinor,
                    Expr::value(balance_minor),
                )
                .filter(crate::accounts::Column::Id.eq(*account_id))
                .exec(db_tx)
                .await?;
        }
        Ok(())
    }

    async fn revert_balance_effects(
        &self,
        db_tx: &DatabaseTransaction,
        effects: &[(Uuid, i64)],
    ) -> ResultEngine<()> {
        let reverted: Vec<(Uuid, i64)> = effects
            .iter()
            .map(|(id, delta)| (*id, delta.saturating_neg()))
            .collect();
        self.apply_balance_effects(db_tx, &reverted).await
    }
}

/// Categories visible to a user: the system ones and their own.
fn visible_categories(user_id: Uuid) -> Condition {
    Condition::any()
        .add(crate::categories::Column::UserId.is_null())
        .add(crate::categories::Column::UserId.eq(user_id))
}

/// Text patch: `None` keeps `existing`, an empty string clears it.
fn patch_optional_text(existing: Option<String>, patch: Option<&str>) -> Option<String> {
    match patch {
        None => existing,
        Some(value) => crate::util::normalize_optional_text(Some(value)),
    }
}

/// The builder for `Engine`
pub struct EngineBuilder {
    database: DatabaseConnection,
    password_iterations: u32,
    job_lease: chrono::Duration,
}

/// How long a claimed job may stay `active` before another worker takes it
/// over.
pub const DEFAULT_JOB_LEASE_SECS: i64 = 600;

impl Default for EngineBuilder {
    fn default() -> Self {
        Self {
            database: DatabaseConnection::default(),
            password_iterations: DEFAULT_ITERATIONS,
            job_lease: chrono::Duration::seconds(DEFAULT_JOB_LEASE_SECS),
        }
    }
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// PBKDF2 iterations used for new password hashes.
    pub fn password_iterations(mut self, iterations: u32) -> EngineBuilder {
        self.password_iterations = iterations.max(1);
        self
    }

    /// Lease of a claimed recurring job. A job still `active` after it is
    /// considered stalled and can be claimed again.
    pub fn job_lease(mut self, lease: chrono::Duration) -> EngineBuilder {
        self.job_lease = lease.max(chrono::Duration::seconds(1));
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        Ok(Engine {
            database: self.database,
            password_iterations: self.password_iterations,
            job_lease: self.job_lease,
        })
    }
}
