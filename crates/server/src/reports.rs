//! Report endpoints. Amounts are never converted between currencies: every
//! report is computed for one currency, the user's own unless `currency` is
//! given.

use api_types::{
    report::{
        CategoryBreakdownResponse, CategoryTotalView, MonthlyResponse, MonthlyView,
        NetWorthResponse, NetWorthView, ReportQuery, SummaryView,
    },
    transaction::TransactionKind as ApiKind,
};
use axum::{
    Extension, Json,
    extract::{Query, State},
    http::header,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use engine::{Currency, User};

use crate::{
    ApiQuery, ServerError,
    convert::{currency_from_api, currency_to_api, transaction_kind_from_api},
    server::ServerState,
};

fn report_currency(user: &User, query: &ReportQuery) -> Currency {
    query.currency.map_or(user.currency, currency_from_api)
}

pub async fn summary(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    WithRejection(Query(query), _): ApiQuery<ReportQuery>,
) -> Result<Json<SummaryView>, ServerError> {
    let currency = report_currency(&user, &query);
    let summary = state
        .engine
        .summary(user.id, query.from, query.to, currency)
        .await?;
    Ok(Json(SummaryView {
        currency: currency_to_api(summary.currency),
        income_minor: summary.income_minor,
        expense_minor: summary.expense_minor,
        net_minor: summary.net_minor,
        count: summary.count,
    }))
}

pub async fn monthly(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    WithRejection(Query(query), _): ApiQuery<ReportQuery>,
) -> Result<Json<MonthlyResponse>, ServerError> {
    let (Some(from), Some(to)) = (query.from, query.to) else {
        return Err(ServerError::Generic(
            "from and to are required".to_string(),
        ));
    };
    let currency = report_currency(&user, &query);
    let months = state
        .engine
        .monthly(user.id, from, to, currency)
        .await?
        .into_iter()
        .map(|m| MonthlyView {
            month: m.month,
            income_minor: m.income_minor,
            expense_minor: m.expense_minor,
            net_minor: m.net_minor,
        })
        .collect();
    Ok(Json(MonthlyResponse {
        currency: currency_to_api(currency),
        months,
    }))
}

pub async fn categories(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    WithRejection(Query(query), _): ApiQuery<ReportQuery>,
) -> Result<Json<CategoryBreakdownResponse>, ServerError> {
    let kind = query.kind.unwrap_or(ApiKind::Expense);
    if kind == ApiKind::Transfer {
        return Err(ServerError::Generic(
            "breakdown is only available for income or expense".to_string(),
        ));
    }
    let currency = report_currency(&user, &query);
    let categories = state
        .engine
        .category_breakdown(
            user.id,
            query.from,
            query.to,
            transaction_kind_from_api(kind),
            currency,
        )
        .await?
        .into_iter()
        .map(|c| CategoryTotalView {
            category_id: c.category_id,
            name: c.name,
            total_minor: c.total_minor,
            count: c.count,
            percent: c.percent,
        })
        .collect();
    Ok(Json(CategoryBreakdownResponse {
        currency: currency_to_api(currency),
        kind,
        categories,
    }))
}

pub async fn net_worth(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
) -> Result<Json<NetWorthResponse>, ServerError> {
    let net_worth = state
        .engine
        .net_worth(user.id)
        .await?
        .into_iter()
        .map(|n| NetWorthView {
            currency: currency_to_api(n.currency),
            assets_minor: n.assets_minor,
            liabilities_minor: n.liabilities_minor,
            net_minor: n.net_minor,
        })
        .collect();
    Ok(Json(NetWorthResponse { net_worth }))
}

pub async fn export(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    WithRejection(Query(query), _): ApiQuery<ReportQuery>,
) -> Result<impl IntoResponse, ServerError> {
    let csv = state
        .engine
        .export_csv(user.id, query.from, query.to)
        .await?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"transactions.csv\"",
            ),
        ],
        csv,
    ))
}
