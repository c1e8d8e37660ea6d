//! Accounts API endpoints.

use api_types::account::{AccountList, AccountListResponse, AccountNew, AccountUpdate, AccountView};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use axum_extra::extract::WithRejection;
use engine::{Account, NewAccountCmd, UpdateAccountCmd, User};
use uuid::Uuid;

use crate::{
    ApiJson, ApiPath, ApiQuery, ServerError,
    convert::{account_kind_from_api, account_kind_to_api, currency_from_api, currency_to_api},
    server::ServerState,
};

fn map_account(account: Account) -> AccountView {
    AccountView {
        id: account.id,
        name: account.name,
        kind: account_kind_to_api(account.kind),
        provider: account.provider,
        balance_minor: account.balance_minor,
        currency: currency_to_api(account.currency),
        is_active: account.is_active,
        last_sync_at: account.last_sync_at,
        created_at: account.created_at,
    }
}

pub async fn list(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    WithRejection(Query(query), _): ApiQuery<AccountList>,
) -> Result<Json<AccountListResponse>, ServerError> {
    let accounts = state
        .engine
        .accounts(user.id, query.include_inactive.unwrap_or(false))
        .await?
        .into_iter()
        .map(map_account)
        .collect();
    Ok(Json(AccountListResponse { accounts }))
}

pub async fn create(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    WithRejection(Json(payload), _): ApiJson<AccountNew>,
) -> Result<(StatusCode, Json<AccountView>), ServerError> {
    let cmd = NewAccountCmd {
        name: payload.name,
        kind: account_kind_from_api(payload.kind),
        currency: currency_from_api(payload.currency),
        provider: payload.provider,
        balance_minor: payload.balance_minor.unwrap_or(0),
    };
    let account = state.engine.new_account(user.id, cmd).await?;
    Ok((StatusCode::CREATED, Json(map_account(account))))
}

pub async fn get(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    WithRejection(Path(account_id), _): ApiPath<Uuid>,
) -> Result<Json<AccountView>, ServerError> {
    let account = state.engine.account(user.id, account_id).await?;
    Ok(Json(map_account(account)))
}

pub async fn update(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    WithRejection(Path(account_id), _): ApiPath<Uuid>,
    WithRejection(Json(payload), _): ApiJson<AccountUpdate>,
) -> Result<Json<AccountView>, ServerError> {
    let cmd = UpdateAccountCmd {
        name: payload.name,
        provider: payload.provider,
        is_active: payload.is_active,
        balance_minor: payload.balance_minor,
    };
    let account = state
        .engine
        .update_account(user.id, account_id, cmd)
        .await?;
    Ok(Json(map_account(account)))
}

pub async fn delete(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    WithRejection(Path(account_id), _): ApiPath<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_account(user.id, account_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
