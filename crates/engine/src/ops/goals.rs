use chrono::Utc;
use uuid::Uuid;

use sea_orm::{QueryFilter, QueryOrder, TransactionTrait, prelude::*};

use crate::{
    EngineError, Goal, NewGoalCmd, ResultEngine, UpdateGoalCmd, goals,
    util::{ensure_in_range, ensure_non_negative, ensure_positive, normalize_required_name},
};

use super::{Engine, with_tx};

impl Engine {
    pub async fn new_goal(&self, user_id: Uuid, cmd: NewGoalCmd) -> ResultEngine<Goal> {
        let name = normalize_required_name(&cmd.name, "goal")?;
        ensure_positive(cmd.target_amount_minor, "target amount")?;
        ensure_non_negative(cmd.current_amount_minor, "current amount")?;
        with_tx!(self, |db_tx| {
            let currency = match cmd.currency {
                Some(currency) => currency,
                None => self.user_currency(&db_tx, user_id).await?,
            };
            let goal = Goal {
                id: Uuid::new_v4(),
                user_id,
                name,
                kind: cmd.kind,
                target_amount_minor: cmd.target_amount_minor,
                current_amount_minor: cmd.current_amount_minor,
                currency,
                target_date: cmd.target_date,
                created_at: Utc::now(),
            };
            let model: goals::ActiveModel = (&goal).into();
            model.insert(&db_tx).await?;
            Ok(goal)
        })
    }

    /// Goals of a user, closest target date first, goals without a date last.
    pub async fn goals(&self, user_id: Uuid) -> ResultEngine<Vec<Goal>> {
        let mut items = goals::Entity::find()
            .filter(goals::Column::UserId.eq(user_id))
            .order_by_asc(goals::Column::CreatedAt)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Goal::try_from)
            .collect::<ResultEngine<Vec<_>>>()?;
        items.sort_by_key(|g| (g.target_date.is_none(), g.target_date));
        Ok(items)
    }

    pub async fn goal(&self, user_id: Uuid, goal_id: Uuid) -> ResultEngine<Goal> {
        let model = self.require_goal(user_id, goal_id).await?;
        Goal::try_from(model)
    }

    pub async fn update_goal(
        &self,
        user_id: Uuid,
        goal_id: Uuid,
        cmd: UpdateGoalCmd,
    ) -> ResultEngine<Goal> {
        let mut goal = Goal::try_from(self.require_goal(user_id, goal_id).await?)?;
        if let Some(name) = cmd.name.as_deref() {
            goal.name = normalize_required_name(name, "goal")?;
        }
        if let Some(kind) = cmd.kind {
            goal.kind = kind;
        }
        if let Some(target) = cmd.target_amount_minor {
            ensure_positive(target, "target amount")?;
            goal.target_amount_minor = target;
        }
        if let Some(current) = cmd.current_amount_minor {
            ensure_non_negative(current, "current amount")?;
            goal.current_amount_minor = current;
        }
        if let Some(target_date) = cmd.target_date {
            goal.target_date = target_date;
        }

        let model: goals::ActiveModel = (&goal).into();
        model.update(&self.database).await?;
        Ok(goal)
    }

    /// Adds to (or, with a negative amount, withdraws from) the saved amount.
    /// The result never goes below zero.
    pub async fn contribute(&self, user_id: Uuid, goal_id: Uuid, amount_minor: i64) -> ResultEngine<Goal> {
        if amount_minor == 0 {
            return Err(EngineError::InvalidAmount(
                "contribution must not be 0".to_string(),
            ));
        }
        ensure_in_range(amount_minor, "contribution")?;
        with_tx!(self, |db_tx| {
            let model = goals::Entity::find_by_id(goal_id)
                .filter(goals::Column::UserId.eq(user_id))
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("goal not exists".to_string()))?;
            let mut goal = Goal::try_from(model)?;
            goal.current_amount_minor = goal
                .current_amount_minor
                .saturating_add(amount_minor)
                .max(0);
            let active: goals::ActiveModel = (&goal).into();
            active.update(&db_tx).await?;
            Ok(goal)
        })
    }

    pub async fn delete_goal(&self, user_id: Uuid, goal_id: Uuid) -> ResultEngine<()> {
        let result = goals::Entity::delete_many()
            .filter(goals::Column::Id.eq(goal_id))
            .filter(goals::Column::UserId.eq(user_id))
            .exec(&self.database)
            .await?;
        if result.rows_affected == 0 {
            return Err(EngineError::KeyNotFound("goal not exists".to_string()));
        }
        Ok(())
    }

    async fn require_goal(&self, user_id: Uuid, goal_id: Uuid) -> ResultEngine<goals::Model> {
        goals::Entity::find_by_id(goal_id)
            .filter(goals::Column::UserId.eq(user_id))
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("goal not exists".to_string()))
    }
}
