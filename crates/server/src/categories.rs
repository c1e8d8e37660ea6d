//! Categories API endpoints.

use api_types::category::{CategoryListResponse, CategoryNew, CategoryUpdate, CategoryView};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use axum_extra::extract::WithRejection;
use engine::{Category, NewCategoryCmd, UpdateCategoryCmd, User};
use uuid::Uuid;

use crate::{ApiJson, ApiPath, ServerError, server::ServerState};

fn map_category(category: Category) -> CategoryView {
    CategoryView {
        id: category.id,
        name: category.name,
        icon: category.icon,
        color: category.color,
        parent_id: category.parent_id,
        is_system: category.is_system,
    }
}

/// System categories first, then the user's own.
pub async fn list(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
) -> Result<Json<CategoryListResponse>, ServerError> {
    let categories = state
        .engine
        .categories(user.id)
        .await?
        .into_iter()
        .map(map_category)
        .collect();
    Ok(Json(CategoryListResponse { categories }))
}

pub async fn create(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    WithRejection(Json(payload), _): ApiJson<CategoryNew>,
) -> Result<(StatusCode, Json<CategoryView>), ServerError> {
    let cmd = NewCategoryCmd {
        name: payload.name,
        icon: payload.icon,
        color: payload.color,
        parent_id: payload.parent_id,
    };
    let category = state.engine.new_category(user.id, cmd).await?;
    Ok((StatusCode::CREATED, Json(map_category(category))))
}

pub async fn update(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    WithRejection(Path(category_id), _): ApiPath<Uuid>,
    WithRejection(Json(payload), _): ApiJson<CategoryUpdate>,
) -> Result<Json<CategoryView>, ServerError> {
    let cmd = UpdateCategoryCmd {
        name: payload.name,
        icon: payload.icon,
        color: payload.color,
        parent_id: payload.parent_id,
    };
    let category = state
        .engine
        .update_category(user.id, category_id, cmd)
        .await?;
    Ok(Json(map_category(category)))
}

pub async fn delete(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    WithRejection(Path(category_id), _): ApiPath<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_category(user.id, category_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
