use chrono::Utc;
use uuid::Uuid;

use sea_orm::{ActiveValue, QueryFilter, TransactionTrait, prelude::*};

use crate::{
    Currency, EngineError, ResultEngine, User,
    password::{decoy_hash, hash_password_blocking, validate_password, verify_password_blocking},
    users,
    util::{normalize_email, normalize_optional_text},
};

use super::{Engine, patch_optional_text, with_tx};

impl Engine {
    /// Registers a new user.
    ///
    /// The email is the login name: it is trimmed, lowercased and must be
    /// unique.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: Option<&str>,
        currency: Option<Currency>,
    ) -> ResultEngine<User> {
        let email = normalize_email(email)?;
        validate_password(password)?;
        let password_hash = hash_password_blocking(password, self.password_iterations).await?;

        with_tx!(self, |db_tx| {
            let exists = users::Entity::find()
                .filter(users::Column::Email.eq(email.clone()))
                .one(&db_tx)
                .await?
                .is_some();
            if exists {
                return Err(EngineError::ExistingKey(email));
            }

            let model = users::ActiveModel {
                id: ActiveValue::Set(Uuid::new_v4()),
                email: ActiveValue::Set(email),
                password_hash: ActiveValue::Set(password_hash),
                name: ActiveValue::Set(normalize_optional_text(name)),
                currency: ActiveValue::Set(currency.unwrap_or_default().code().to_string()),
                created_at: ActiveValue::Set(Utc::now()),
            }
            .insert(&db_tx)
            .await?;

            tracing::info!(user_id = %model.id, "user registered");
            User::try_from(model)
        })
    }

    /// Checks email and password, returning the matching user.
    ///
    /// Unknown emails and wrong passwords are indistinguishable: both run
    /// a full PBKDF2 check, off the async executor.
    pub async fn authenticate(&self, email: &str, password: &str) -> ResultEngine<User> {
        let unauthorized = || EngineError::Unauthorized("invalid credentials".to_string());
        let model = match normalize_email(email) {
            Ok(email) => {
                users::Entity::find()
                    .filter(users::Column::Email.eq(email))
                    .one(&self.database)
                    .await?
            }
            Err(_) => None,
        };

        let stored = model
            .as_ref()
            .map_or_else(|| decoy_hash(self.password_iterations), |m| m.password_hash.clone());
        let verified = verify_password_blocking(password, &stored).await?;
        match model {
            Some(model) if verified => User::try_from(model),
            _ => Err(unauthorized()),
        }
    }

    pub async fn user(&self, user_id: Uuid) -> ResultEngine<User> {
        let model = users::Entity::find_by_id(user_id)
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("user not exists".to_string()))?;
        User::try_from(model)
    }

    /// Updates display name and default currency. An empty name clears it.
    pub async fn update_profile(
        &self,
        user_id: Uuid,
        name: Option<&str>,
        currency: Option<Currency>,
    ) -> ResultEngine<User> {
        with_tx!(self, |db_tx| {
            let model = self.require_user(&db_tx, user_id).await?;
            let name = patch_optional_text(model.name.clone(), name);
            let currency = currency.map_or(model.currency.clone(), |c| c.code().to_string());

            let mut active: users::ActiveModel = model.into();
            active.name = ActiveValue::Set(name);
            active.currency = ActiveValue::Set(currency);
            let model = active.update(&db_tx).await?;
            User::try_from(model)
        })
    }

    /// Replaces the password after checking the current one.
    pub async fn change_password(
        &self,
        user_id: Uuid,
        current: &str,
        new_password: &str,
    ) -> ResultEngine<()> {
        validate_password(new_password)?;
        with_tx!(self, |db_tx| {
            let model = self.require_user(&db_tx, user_id).await?;
            if !verify_password_blocking(current, &model.password_hash).await? {
                return Err(EngineError::Unauthorized(
                    "current password does not match".to_string(),
                ));
            }

            let password_hash =
                hash_password_blocking(new_password, self.password_iterations).await?;
            let mut active: users::ActiveModel = model.into();
            active.password_hash = ActiveValue::Set(password_hash);
            active.update(&db_tx).await?;
            tracing::info!(%user_id, "password changed");
            Ok(())
        })
    }
}
