//! Registration and profile endpoints.

use api_types::user::{PasswordChange, UserNew, UserUpdate, UserView};
use axum::{Extension, Json, extract::State, http::StatusCode};
use axum_extra::extract::WithRejection;
use engine::User;

use crate::{
    ApiJson, ServerError,
    convert::{currency_from_api, currency_to_api},
    server::ServerState,
};

fn map_user(user: User) -> UserView {
    UserView {
        id: user.id,
        email: user.email,
        name: user.name,
        currency: currency_to_api(user.currency),
        created_at: user.created_at,
    }
}

pub async fn register(
    State(state): State<ServerState>,
    WithRejection(Json(payload), _): ApiJson<UserNew>,
) -> Result<(StatusCode, Json<UserView>), ServerError> {
    let user = state
        .engine
        .register(
            &payload.email,
            &payload.password,
            payload.name.as_deref(),
            payload.currency.map(currency_from_api),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(map_user(user))))
}

pub async fn me(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
) -> Result<Json<UserView>, ServerError> {
    let user = state.engine.user(user.id).await?;
    Ok(Json(map_user(user)))
}

pub async fn update(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    WithRejection(Json(payload), _): ApiJson<UserUpdate>,
) -> Result<Json<UserView>, ServerError> {
    let user = state
        .engine
        .update_profile(
            user.id,
            payload.name.as_deref(),
            payload.currency.map(currency_from_api),
        )
        .await?;
    Ok(Json(map_user(user)))
}

pub async fn change_password(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    WithRejection(Json(payload), _): ApiJson<PasswordChange>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .change_password(user.id, &payload.current_password, &payload.new_password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
