use chrono::Utc;
use uuid::Uuid;

use sea_orm::{QueryFilter, QueryOrder, prelude::*};

use crate::{
    EngineError, Investment, NewInvestmentCmd, PortfolioSummary, ResultEngine,
    UpdateInvestmentCmd, investments,
    util::{ensure_non_negative, normalize_optional_text},
};

use super::{Engine, patch_optional_text};

const MAX_SYMBOL_LEN: usize = 20;

fn normalize_symbol(symbol: &str) -> ResultEngine<String> {
    let symbol = symbol.trim().to_uppercase();
    if symbol.is_empty() || symbol.len() > MAX_SYMBOL_LEN || symbol.contains(char::is_whitespace) {
        return Err(EngineError::InvalidName(format!("invalid symbol: '{symbol}'")));
    }
    Ok(symbol)
}

fn ensure_quantity(quantity: f64) -> ResultEngine<()> {
    if !quantity.is_finite() || quantity < 0.0 {
        return Err(EngineError::InvalidAmount(
            "quantity must be a finite number >= 0".to_string(),
        ));
    }
    Ok(())
}

impl Engine {
    pub async fn new_investment(&self, user_id: Uuid, cmd: NewInvestmentCmd) -> ResultEngine<Investment> {
        let symbol = normalize_symbol(&cmd.symbol)?;
        ensure_quantity(cmd.quantity)?;
        ensure_non_negative(cmd.average_price_minor, "average price")?;
        let current_price_minor = cmd.current_price_minor.unwrap_or(cmd.average_price_minor);
        ensure_non_negative(current_price_minor, "current price")?;

        let now = Utc::now();
        let investment = Investment {
            id: Uuid::new_v4(),
            user_id,
            symbol,
            name: normalize_optional_text(cmd.name.as_deref()),
            kind: cmd.kind,
            quantity: cmd.quantity,
            average_price_minor: cmd.average_price_minor,
            current_price_minor,
            currency: cmd.currency,
            broker: normalize_optional_text(cmd.broker.as_deref()),
            sector: normalize_optional_text(cmd.sector.as_deref()).map(|s| s.to_lowercase()),
            price_updated_at: Some(now),
            created_at: now,
        };
        let model: investments::ActiveModel = (&investment).into();
        model.insert(&self.database).await?;
        Ok(investment)
    }

    /// Holdings of a user sorted by symbol.
    pub async fn investments(&self, user_id: Uuid) -> ResultEngine<Vec<Investment>> {
        investments::Entity::find()
            .filter(investments::Column::UserId.eq(user_id))
            .order_by_asc(investments::Column::Symbol)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Investment::try_from)
            .collect()
    }

    pub async fn investment(&self, user_id: Uuid, investment_id: Uuid) -> ResultEngine<Investment> {
        let model = self.require_investment(user_id, investment_id).await?;
        Investment::try_from(model)
    }

    pub async fn update_investment(
        &self,
        user_id: Uuid,
        investment_id: Uuid,
        cmd: UpdateInvestmentCmd,
    ) -> ResultEngine<Investment> {
        let mut investment =
            Investment::try_from(self.require_investment(user_id, investment_id).await?)?;
        investment.name = patch_optional_text(investment.name, cmd.name.as_deref());
        if let Some(kind) = cmd.kind {
            investment.kind = kind;
        }
        if let Some(quantity) = cmd.quantity {
            ensure_quantity(quantity)?;
            investment.quantity = quantity;
        }
        if let Some(price) = cmd.average_price_minor {
            ensure_non_negative(price, "average price")?;
            investment.average_price_minor = price;
        }
        investment.broker = patch_optional_text(investment.broker, cmd.broker.as_deref());
        investment.sector = patch_optional_text(investment.sector, cmd.sector.as_deref())
            .map(|s| s.to_lowercase());

        let model: investments::ActiveModel = (&investment).into();
        model.update(&self.database).await?;
        Ok(investment)
    }

    /// Records a new market price.
    pub async fn update_price(
        &self,
        user_id: Uuid,
        investment_id: Uuid,
        price_minor: i64,
    ) -> ResultEngine<Investment> {
        ensure_non_negative(price_minor, "price")?;
        let mut investment =
            Investment::try_from(self.require_investment(user_id, investment_id).await?)?;
        investment.current_price_minor = price_minor;
        investment.price_updated_at = Some(Utc::now());

        let model: investments::ActiveModel = (&investment).into();
        model.update(&self.database).await?;
        tracing::debug!(%investment_id, price_minor, "investment price updated");
        Ok(investment)
    }

    pub async fn delete_investment(&self, user_id: Uuid, investment_id: Uuid) -> ResultEngine<()> {
        let result = investments::Entity::delete_many()
            .filter(investments::Column::Id.eq(investment_id))
            .filter(investments::Column::UserId.eq(user_id))
            .exec(&self.database)
            .await?;
        if result.rows_affected == 0 {
            return Err(EngineError::KeyNotFound("investment not exists".to_string()));
        }
        Ok(())
    }

    /// Portfolio value, gains and allocation, one entry per currency.
    pub async fn portfolio(&self, user_id: Uuid) -> ResultEngine<Vec<PortfolioSummary>> {
        let holdings = self.investments(user_id).await?;
        crate::investments::portfolio(&holdings)
    }

    async fn require_investment(
        &self,
        user_id: Uuid,
        investment_id: Uuid,
    ) -> ResultEngine<investments::Model> {
        investments::Entity::find_by_id(investment_id)
            .filter(investments::Column::UserId.eq(user_id))
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("investment not exists".to_string()))
    }
}
