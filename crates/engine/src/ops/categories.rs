use uuid::Uuid;

use sea_orm::{
    ActiveValue, DatabaseTransaction, PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait,
    prelude::*, sea_query::Expr,
};

use crate::{
    Category, EngineError, NewCategoryCmd, ResultEngine, UpdateCategoryCmd, categories,
    subscriptions, transactions,
    util::{normalize_key, normalize_optional_text, normalize_required_name},
};

use super::{Engine, patch_optional_text, visible_categories, with_tx};

impl Engine {
    /// System categories plus the user's own, sorted by name.
    pub async fn categories(&self, user_id: Uuid) -> ResultEngine<Vec<Category>> {
        let models = categories::Entity::find()
            .filter(visible_categories(user_id))
            .order_by_asc(categories::Column::NameNorm)
            .all(&self.database)
            .await?;
        Ok(models.into_iter().map(Category::from).collect())
    }

    pub async fn new_category(&self, user_id: Uuid, cmd: NewCategoryCmd) -> ResultEngine<Category> {
        let name = normalize_required_name(&cmd.name, "category")?;
        with_tx!(self, |db_tx| {
            self.require_user(&db_tx, user_id).await?;
            self.ensure_category_name_free(&db_tx, user_id, &name, None)
                .await?;
            if let Some(parent_id) = cmd.parent_id {
                self.require_parent_category(&db_tx, user_id, parent_id)
                    .await?;
            }

            let model = categories::ActiveModel {
                id: ActiveValue::Set(Uuid::new_v4()),
                user_id: ActiveValue::Set(Some(user_id)),
                name_norm: ActiveValue::Set(normalize_key(&name)),
                name: ActiveValue::Set(name),
                icon: ActiveValue::Set(normalize_optional_text(cmd.icon.as_deref())),
                color: ActiveValue::Set(normalize_optional_text(cmd.color.as_deref())),
                parent_id: ActiveValue::Set(cmd.parent_id),
                is_system: ActiveValue::Set(false),
            }
            .insert(&db_tx)
            .await?;
            Ok(Category::from(model))
        })
    }

    /// Updates a user category. System categories are read-only.
    pub async fn update_category(
        &self,
        user_id: Uuid,
        category_id: Uuid,
        cmd: UpdateCategoryCmd,
    ) -> ResultEngine<Category> {
        let name = cmd
            .name
            .as_deref()
            .map(|n| normalize_required_name(n, "category"))
            .transpose()?;
        with_tx!(self, |db_tx| {
            let model = self
                .require_own_category(&db_tx, user_id, category_id)
                .await?;

            let mut active: categories::ActiveModel = model.clone().into();
            if let Some(name) = name {
                self.ensure_category_name_free(&db_tx, user_id, &name, Some(category_id))
                    .await?;
                active.name_norm = ActiveValue::Set(normalize_key(&name));
                active.name = ActiveValue::Set(name);
            }
            if cmd.icon.is_some() {
                active.icon = ActiveValue::Set(patch_optional_text(model.icon, cmd.icon.as_deref()));
            }
            if cmd.color.is_some() {
                active.color =
                    ActiveValue::Set(patch_optional_text(model.color, cmd.color.as_deref()));
            }
            if let Some(parent_id) = cmd.parent_id {
                if let Some(parent_id) = parent_id {
                    if parent_id == category_id {
                        return Err(EngineError::InvalidName(
                            "a category cannot be its own parent".to_string(),
                        ));
                    }
                    if self.count_children(&db_tx, category_id).await? > 0 {
                        return Err(EngineError::InvalidName(
                            "a category with subcategories cannot have a parent".to_string(),
                        ));
                    }
                    self.require_parent_category(&db_tx, user_id, parent_id)
                        .await?;
                }
                active.parent_id = ActiveValue::Set(parent_id);
            }

            let model = active.update(&db_tx).await?;
            Ok(Category::from(model))
        })
    }

    /// Deletes a user category.
    ///
    /// Categories with subcategories must be emptied first. Transactions and
    /// subscriptions using it become uncategorized.
    pub async fn delete_category(&self, user_id: Uuid, category_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            self.require_own_category(&db_tx, user_id, category_id)
                .await?;
            if self.count_children(&db_tx, category_id).await? > 0 {
                return Err(EngineError::InUse(
                    "category has subcategories".to_string(),
                ));
            }

            transactions::Entity::update_many()
                .col_expr(transactions::Column::CategoryId, Expr::value(Option::<Uuid>::None))
                .filter(transactions::Column::CategoryId.eq(category_id))
                .exec(&db_tx)
                .await?;
            subscriptions::Entity::update_many()
                .col_expr(subscriptions::Column::CategoryId, Expr::value(Option::<Uuid>::None))
                .filter(subscriptions::Column::CategoryId.eq(category_id))
                .exec(&db_tx)
                .await?;
            categories::Entity::delete_by_id(category_id)
                .exec(&db_tx)
                .await?;
            Ok(())
        })
    }

    /// Ids of a category and of its direct children.
    pub(super) async fn category_with_children(
        &self,
        db_tx: &DatabaseTransaction,
        user_id: Uuid,
        category_id: Uuid,
    ) -> ResultEngine<Vec<Uuid>> {
        self.require_visible_category(db_tx, user_id, category_id)
            .await?;
        let mut ids = vec![category_id];
        let children = categories::Entity::find()
            .filter(categories::Column::ParentId.eq(category_id))
            .filter(visible_categories(user_id))
            .all(db_tx)
            .await?;
        ids.extend(children.into_iter().map(|c| c.id));
        Ok(ids)
    }

    /// A category the user may modify. System categories exist for everyone
    /// but are `Forbidden`; other users' categories are missing.
    async fn require_own_category(
        &self,
        db_tx: &DatabaseTransaction,
        user_id: Uuid,
        category_id: Uuid,
    ) -> ResultEngine<categories::Model> {
        let model = self
            .require_visible_category(db_tx, user_id, category_id)
            .await?;
        if model.is_system || model.user_id.is_none() {
            return Err(EngineError::Forbidden(format!(
                "system category '{}' cannot be changed",
                model.name
            )));
        }
        Ok(model)
    }

    async fn require_parent_category(
        &self,
        db_tx: &DatabaseTransaction,
        user_id: Uuid,
        parent_id: Uuid,
    ) -> ResultEngine<()> {
        let parent = self
            .require_visible_category(db_tx, user_id, parent_id)
            .await?;
        if parent.parent_id.is_some() {
            return Err(EngineError::InvalidName(
                "categories can only be nested one level deep".to_string(),
            ));
        }
        Ok(())
    }

    async fn count_children(&self, db_tx: &DatabaseTransaction, category_id: Uuid) -> ResultEngine<u64> {
        Ok(categories::Entity::find()
            .filter(categories::Column::ParentId.eq(category_id))
            .count(db_tx)
            .await?)
    }

    async fn ensure_category_name_free(
        &self,
        db_tx: &DatabaseTransaction,
        user_id: Uuid,
        name: &str,
        except: Option<Uuid>,
    ) -> ResultEngine<()> {
        let mut query = categories::Entity::find()
            .filter(visible_categories(user_id))
            .filter(categories::Column::NameNorm.eq(normalize_key(name)));
        if let Some(id) = except {
            query = query.filter(categories::Column::Id.ne(id));
        }
        if query.one(db_tx).await?.is_some() {
            return Err(EngineError::ExistingKey(name.to_string()));
        }
        Ok(())
    }
}
