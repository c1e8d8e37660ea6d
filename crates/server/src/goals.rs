//! Goals API endpoints.

use api_types::goal::{
    Contribution, GoalListResponse, GoalNew, GoalProgressView, GoalUpdate, GoalView,
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use axum_extra::extract::WithRejection;
use chrono::Utc;
use engine::{Goal, NewGoalCmd, UpdateGoalCmd, User};
use uuid::Uuid;

use crate::{
    ApiJson, ApiPath, ServerError,
    convert::{currency_from_api, currency_to_api, goal_kind_from_api, goal_kind_to_api},
    server::ServerState,
};

fn map_goal(goal: Goal) -> GoalView {
    let progress = goal.progress(Utc::now());
    GoalView {
        id: goal.id,
        name: goal.name,
        kind: goal_kind_to_api(goal.kind),
        target_amount_minor: goal.target_amount_minor,
        current_amount_minor: goal.current_amount_minor,
        currency: currency_to_api(goal.currency),
        target_date: goal.target_date,
        progress: GoalProgressView {
            percent: progress.percent,
            remaining_minor: progress.remaining_minor,
            achieved: progress.achieved,
            months_left: progress.months_left,
            monthly_required_minor: progress.monthly_required_minor,
        },
        created_at: goal.created_at,
    }
}

pub async fn list(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
) -> Result<Json<GoalListResponse>, ServerError> {
    let goals = state
        .engine
        .goals(user.id)
        .await?
        .into_iter()
        .map(map_goal)
        .collect();
    Ok(Json(GoalListResponse { goals }))
}

pub async fn create(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    WithRejection(Json(payload), _): ApiJson<GoalNew>,
) -> Result<(StatusCode, Json<GoalView>), ServerError> {
    let cmd = NewGoalCmd {
        name: payload.name,
        kind: goal_kind_from_api(payload.kind),
        target_amount_minor: payload.target_amount_minor,
        current_amount_minor: payload.current_amount_minor.unwrap_or(0),
        currency: payload.currency.map(currency_from_api),
        target_date: payload.target_date,
    };
    let goal = state.engine.new_goal(user.id, cmd).await?;
    Ok((StatusCode::CREATED, Json(map_goal(goal))))
}

pub async fn get(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    WithRejection(Path(goal_id), _): ApiPath<Uuid>,
) -> Result<Json<GoalView>, ServerError> {
    let goal = state.engine.goal(user.id, goal_id).await?;
    Ok(Json(map_goal(goal)))
}

pub async fn update(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    WithRejection(Path(goal_id), _): ApiPath<Uuid>,
    WithRejection(Json(payload), _): ApiJson<GoalUpdate>,
) -> Result<Json<GoalView>, ServerError> {
    let cmd = UpdateGoalCmd {
        name: payload.name,
        kind: payload.kind.map(goal_kind_from_api),
        target_amount_minor: payload.target_amount_minor,
        current_amount_minor: payload.current_amount_minor,
        target_date: payload.target_date,
    };
    let goal = state.engine.update_goal(user.id, goal_id, cmd).await?;
    Ok(Json(map_goal(goal)))
}

pub async fn contribute(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    WithRejection(Path(goal_id), _): ApiPath<Uuid>,
    WithRejection(Json(payload), _): ApiJson<Contribution>,
) -> Result<Json<GoalView>, ServerError> {
    let goal = state
        .engine
        .contribute(user.id, goal_id, payload.amount_minor)
        .await?;
    Ok(Json(map_goal(goal)))
}

pub async fn delete(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    WithRejection(Path(goal_id), _): ApiPath<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_goal(user.id, goal_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
