//! Transactions API endpoints

use api_types::transaction::{
    AttachmentNew, AttachmentView, TransactionList, TransactionListResponse, TransactionNew,
    TransactionUpdate, TransactionView,
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use axum_extra::extract::WithRejection;
use engine::{
    Attachment, NewAttachmentCmd, NewTransactionCmd, RecurrenceSpec, Transaction,
    TransactionListFilter, UpdateTransactionCmd, User,
};
use uuid::Uuid;

use crate::{
    ApiJson, ApiPath, ApiQuery, ServerError,
    convert::{
        currency_from_api, currency_to_api, frequency_from_api, transaction_kind_from_api,
        transaction_kind_to_api,
    },
    server::ServerState,
};

const DEFAULT_PAGE: u64 = 50;
const MAX_PAGE: u64 = 200;

fn map_attachment(attachment: Attachment) -> AttachmentView {
    AttachmentView {
        id: attachment.id,
        file_name: attachment.file_name,
        url: attachment.url,
        content_type: attachment.content_type,
        size_bytes: attachment.size_bytes,
        created_at: attachment.created_at,
    }
}

pub(crate) fn map_transaction(tx: Transaction) -> TransactionView {
    TransactionView {
        id: tx.id,
        kind: transaction_kind_to_api(tx.kind),
        amount_minor: tx.amount_minor,
        currency: currency_to_api(tx.currency),
        occurred_at: tx.occurred_at,
        account_id: tx.account_id,
        to_account_id: tx.to_account_id,
        category_id: tx.category_id,
        description: tx.description,
        tags: tx.tags,
        recurring_rule_id: tx.recurring_rule_id,
        attachments: tx.attachments.into_iter().map(map_attachment).collect(),
        created_at: tx.created_at,
    }
}

pub async fn list(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    WithRejection(Query(query), _): ApiQuery<TransactionList>,
) -> Result<Json<TransactionListResponse>, ServerError> {
    let limit = query.limit.unwrap_or(DEFAULT_PAGE);
    if limit == 0 || limit > MAX_PAGE {
        return Err(ServerError::Generic(format!(
            "limit must be between 1 and {MAX_PAGE}"
        )));
    }

    let filter = TransactionListFilter {
        from: query.from,
        to: query.to,
        account_id: query.account_id,
        category_id: query.category_id,
        kind: query.kind.map(transaction_kind_from_api),
        tag: query.tag,
        search: query.search,
    };
    let (items, next_cursor) = state
        .engine
        .list_transactions(user.id, &filter, limit, query.cursor.as_deref())
        .await?;

    Ok(Json(TransactionListResponse {
        transactions: items.into_iter().map(map_transaction).collect(),
        next_cursor,
    }))
}

pub async fn create(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    WithRejection(Json(payload), _): ApiJson<TransactionNew>,
) -> Result<(StatusCode, Json<TransactionView>), ServerError> {
    let recurrence = payload.recurrence.map(|r| RecurrenceSpec {
        frequency: frequency_from_api(r.frequency),
        interval: r.interval.unwrap_or(1),
        end_date: r.end_date,
    });
    let cmd = NewTransactionCmd {
        kind: transaction_kind_from_api(payload.kind),
        amount_minor: payload.amount_minor,
        occurred_at: payload.occurred_at,
        account_id: payload.account_id,
        to_account_id: payload.to_account_id,
        category_id: payload.category_id,
        currency: payload.currency.map(currency_from_api),
        description: payload.description,
        tags: payload.tags,
        recurrence,
    };
    let tx = state.engine.new_transaction(user.id, cmd).await?;
    Ok((StatusCode::CREATED, Json(map_transaction(tx))))
}

pub async fn get(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    WithRejection(Path(transaction_id), _): ApiPath<Uuid>,
) -> Result<Json<TransactionView>, ServerError> {
    let tx = state.engine.transaction(user.id, transaction_id).await?;
    Ok(Json(map_transaction(tx)))
}

pub async fn update(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    WithRejection(Path(transaction_id), _): ApiPath<Uuid>,
    WithRejection(Json(payload), _): ApiJson<TransactionUpdate>,
) -> Result<Json<TransactionView>, ServerError> {
    let cmd = UpdateTransactionCmd {
        kind: payload.kind.map(transaction_kind_from_api),
        amount_minor: payload.amount_minor,
        occurred_at: payload.occurred_at,
        account_id: payload.account_id,
        to_account_id: payload.to_account_id,
        category_id: payload.category_id,
        description: payload.description,
        tags: payload.tags,
    };
    let tx = state
        .engine
        .update_transaction(user.id, transaction_id, cmd)
        .await?;
    Ok(Json(map_transaction(tx)))
}

pub async fn delete(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    WithRejection(Path(transaction_id), _): ApiPath<Uuid>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .delete_transaction(user.id, transaction_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_attachment(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    WithRejection(Path(transaction_id), _): ApiPath<Uuid>,
    WithRejection(Json(payload), _): ApiJson<AttachmentNew>,
) -> Result<(StatusCode, Json<AttachmentView>), ServerError> {
    let cmd = NewAttachmentCmd {
        file_name: payload.file_name,
        url: payload.url,
        content_type: payload.content_type,
        size_bytes: payload.size_bytes,
    };
    let attachment = state
        .engine
        .add_attachment(user.id, transaction_id, cmd)
        .await?;
    Ok((StatusCode::CREATED, Json(map_attachment(attachment))))
}

pub async fn remove_attachment(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    WithRejection(Path((transaction_id, attachment_id)), _): ApiPath<(Uuid, Uuid)>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .remove_attachment(user.id, transaction_id, attachment_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
