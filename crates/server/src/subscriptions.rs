//! Subscriptions API endpoints.

use api_types::subscription::{
    PaymentView, SubscriptionListResponse, SubscriptionNew, SubscriptionSummaryResponse,
    SubscriptionSummaryView, SubscriptionUpdate, SubscriptionView, UpcomingQuery,
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use axum_extra::extract::WithRejection;
use chrono::Utc;
use engine::{NewSubscriptionCmd, Subscription, UpdateSubscriptionCmd, User};
use uuid::Uuid;

use crate::{
    ApiJson, ApiPath, ApiQuery, ServerError,
    convert::{currency_from_api, currency_to_api, frequency_from_api, frequency_to_api},
    server::ServerState,
    transactions::map_transaction,
};

const DEFAULT_UPCOMING_DAYS: u32 = 30;

fn map_subscription(subscription: Subscription) -> SubscriptionView {
    SubscriptionView {
        monthly_cost_minor: subscription.monthly_cost_minor(),
        id: subscription.id,
        name: subscription.name,
        amount_minor: subscription.amount_minor,
        currency: currency_to_api(subscription.currency),
        frequency: frequency_to_api(subscription.frequency),
        interval: subscription.interval,
        starts_at: subscription.starts_at,
        next_payment_date: subscription.next_payment_date,
        payments_made: subscription.payments_made,
        account_id: subscription.account_id,
        category_id: subscription.category_id,
        is_active: subscription.is_active,
        created_at: subscription.created_at,
    }
}

fn map_list(subscriptions: Vec<Subscription>) -> SubscriptionListResponse {
    SubscriptionListResponse {
        subscriptions: subscriptions.into_iter().map(map_subscription).collect(),
    }
}

pub async fn list(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
) -> Result<Json<SubscriptionListResponse>, ServerError> {
    let subscriptions = state.engine.subscriptions(user.id).await?;
    Ok(Json(map_list(subscriptions)))
}

pub async fn create(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    WithRejection(Json(payload), _): ApiJson<SubscriptionNew>,
) -> Result<(StatusCode, Json<SubscriptionView>), ServerError> {
    let cmd = NewSubscriptionCmd {
        name: payload.name,
        amount_minor: payload.amount_minor,
        currency: payload.currency.map(currency_from_api),
        frequency: frequency_from_api(payload.frequency),
        interval: payload.interval.unwrap_or(1),
        starts_at: payload.starts_at,
        account_id: payload.account_id,
        category_id: payload.category_id,
    };
    let subscription = state.engine.new_subscription(user.id, cmd).await?;
    Ok((StatusCode::CREATED, Json(map_subscription(subscription))))
}

pub async fn get(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    WithRejection(Path(subscription_id), _): ApiPath<Uuid>,
) -> Result<Json<SubscriptionView>, ServerError> {
    let subscription = state
        .engine
        .subscription(user.id, subscription_id)
        .await?;
    Ok(Json(map_subscription(subscription)))
}

pub async fn update(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    WithRejection(Path(subscription_id), _): ApiPath<Uuid>,
    WithRejection(Json(payload), _): ApiJson<SubscriptionUpdate>,
) -> Result<Json<SubscriptionView>, ServerError> {
    let cmd = UpdateSubscriptionCmd {
        name: payload.name,
        amount_minor: payload.amount_minor,
        account_id: payload.account_id,
        category_id: payload.category_id,
        is_active: payload.is_active,
    };
    let subscription = state
        .engine
        .update_subscription(user.id, subscription_id, cmd)
        .await?;
    Ok(Json(map_subscription(subscription)))
}

pub async fn delete(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    WithRejection(Path(subscription_id), _): ApiPath<Uuid>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .delete_subscription(user.id, subscription_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn upcoming(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    WithRejection(Query(query), _): ApiQuery<UpcomingQuery>,
) -> Result<Json<SubscriptionListResponse>, ServerError> {
    let days = query.days.unwrap_or(DEFAULT_UPCOMING_DAYS);
    let subscriptions = state
        .engine
        .upcoming_subscriptions(user.id, days, Utc::now())
        .await?;
    Ok(Json(map_list(subscriptions)))
}

pub async fn summary(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
) -> Result<Json<SubscriptionSummaryResponse>, ServerError> {
    let summaries = state
        .engine
        .subscription_summary(user.id)
        .await?
        .into_iter()
        .map(|s| SubscriptionSummaryView {
            currency: currency_to_api(s.currency),
            active_count: s.active_count,
            monthly_minor: s.monthly_minor,
            yearly_minor: s.yearly_minor,
        })
        .collect();
    Ok(Json(SubscriptionSummaryResponse { summaries }))
}

pub async fn pay(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    WithRejection(Path(subscription_id), _): ApiPath<Uuid>,
) -> Result<(StatusCode, Json<PaymentView>), ServerError> {
    let (subscription, transaction) = state
        .engine
        .pay_subscription(user.id, subscription_id)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(PaymentView {
            subscription: map_subscription(subscription),
            transaction: map_transaction(transaction),
        }),
    ))
}
