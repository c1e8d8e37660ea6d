use chrono::Utc;
use uuid::Uuid;

use sea_orm::{ActiveValue, QueryFilter, QueryOrder, TransactionTrait, prelude::*, sea_query::Expr};

use crate::{
    Account, EngineError, NewAccountCmd, ResultEngine, UpdateAccountCmd, accounts, subscriptions,
    transactions,
    util::{ensure_in_range, normalize_key, normalize_optional_text, normalize_required_name},
};

use super::{Engine, patch_optional_text, with_tx};

impl Engine {
    /// Creates an account for `user_id`.
    ///
    /// The opening balance is stored as is and is not backed by a
    /// transaction; later reconciliations overwrite it the same way.
    pub async fn new_account(&self, user_id: Uuid, cmd: NewAccountCmd) -> ResultEngine<Account> {
        let name = normalize_required_name(&cmd.name, "account")?;
        ensure_in_range(cmd.balance_minor, "balance")?;
        with_tx!(self, |db_tx| {
            self.require_user(&db_tx, user_id).await?;
            self.ensure_account_name_free(&db_tx, user_id, &name, None)
                .await?;

            let account = Account {
                id: Uuid::new_v4(),
                user_id,
                name,
                kind: cmd.kind,
                provider: normalize_optional_text(cmd.provider.as_deref()),
                balance_minor: cmd.balance_minor,
                currency: cmd.currency,
                is_active: true,
                last_sync_at: None,
                created_at: Utc::now(),
            };
            let model: accounts::ActiveModel = (&account).into();
            model.insert(&db_tx).await?;
            Ok(account)
        })
    }

    /// Accounts of a user sorted by name. Inactive ones only on request.
    pub async fn accounts(&self, user_id: Uuid, include_inactive: bool) -> ResultEngine<Vec<Account>> {
        let mut query = accounts::Entity::find()
            .filter(accounts::Column::UserId.eq(user_id))
            .order_by_asc(accounts::Column::NameNorm);
        if !include_inactive {
            query = query.filter(accounts::Column::IsActive.eq(true));
        }
        query
            .all(&self.database)
            .await?
            .into_iter()
            .map(Account::try_from)
            .collect()
    }

    pub async fn account(&self, user_id: Uuid, account_id: Uuid) -> ResultEngine<Account> {
        with_tx!(self, |db_tx| {
            let model = self.require_account(&db_tx, user_id, account_id).await?;
            Account::try_from(model)
        })
    }

    /// Renames, (de)activates or reconciles an account.
    pub async fn update_account(
        &self,
        user_id: Uuid,
        account_id: Uuid,
        cmd: UpdateAccountCmd,
    ) -> ResultEngine<Account> {
        let name = cmd
            .name
            .as_deref()
            .map(|n| normalize_required_name(n, "account"))
            .transpose()?;
        if let Some(balance_minor) = cmd.balance_minor {
            ensure_in_range(balance_minor, "balance")?;
        }
        with_tx!(self, |db_tx| {
            let model = self.require_account(&db_tx, user_id, account_id).await?;
            let mut account = Account::try_from(model)?;

            if let Some(name) = name {
                self.ensure_account_name_free(&db_tx, user_id, &name, Some(account_id))
                    .await?;
                account.name = name;
            }
            account.provider = patch_optional_text(account.provider, cmd.provider.as_deref());
            if let Some(is_active) = cmd.is_active {
                account.is_active = is_active;
            }
            if let Some(balance_minor) = cmd.balance_minor {
                tracing::debug!(
                    %account_id,
                    from = account.balance_minor,
                    to = balance_minor,
                    "account reconciled"
                );
                account.balance_minor = balance_minor;
                account.last_sync_at = Some(Utc::now());
            }

            let active: accounts::ActiveModel = (&account).into();
            active.update(&db_tx).await?;
            Ok(account)
        })
    }

    /// Deletes an account.
    ///
    /// Transactions and subscriptions keep existing without it: their account
    /// references are cleared. Balances of the other side of a transfer are
    /// left untouched.
    pub async fn delete_account(&self, user_id: Uuid, account_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            self.require_account(&db_tx, user_id, account_id).await?;

            transactions::Entity::update_many()
                .col_expr(transactions::Column::AccountId, Expr::value(Option::<Uuid>::None))
                .filter(transactions::Column::AccountId.eq(account_id))
                .exec(&db_tx)
                .await?;
            transactions::Entity::update_many()
                .col_expr(transactions::Column::ToAccountId, Expr::value(Option::<Uuid>::None))
                .filter(transactions::Column::ToAccountId.eq(account_id))
                .exec(&db_tx)
                .await?;
            subscriptions::Entity::update_many()
                .col_expr(subscriptions::Column::AccountId, Expr::value(Option::<Uuid>::None))
                .filter(subscriptions::Column::AccountId.eq(account_id))
                .exec(&db_tx)
                .await?;

            accounts::Entity::delete_by_id(account_id)
                .exec(&db_tx)
                .await?;
            tracing::info!(%user_id, %account_id, "account deleted");
            Ok(())
        })
    }

    async fn ensure_account_name_free(
        &self,
        db_tx: &sea_orm::DatabaseTransaction,
        user_id: Uuid,
        name: &str,
        except: Option<Uuid>,
    ) -> ResultEngine<()> {
        let mut query = accounts::Entity::find()
            .filter(accounts::Column::UserId.eq(user_id))
            .filter(accounts::Column::NameNorm.eq(normalize_key(name)));
        if let Some(id) = except {
            query = query.filter(accounts::Column::Id.ne(id));
        }
        if query.one(db_tx).await?.is_some() {
            return Err(EngineError::ExistingKey(name.to_string()));
        }
        Ok(())
    }
}
