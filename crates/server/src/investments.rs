//! Investments API endpoints.

use api_types::investment::{
    AllocationView, HoldingView, InvestmentListResponse, InvestmentNew, InvestmentUpdate,
    InvestmentView, PortfolioResponse, PortfolioView, PriceUpdate,
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use axum_extra::extract::WithRejection;
use engine::{
    AllocationSlice, Investment, NewInvestmentCmd, PortfolioSummary, UpdateInvestmentCmd, User,
};
use uuid::Uuid;

use crate::{
    ApiJson, ApiPath, ServerError,
    convert::{currency_from_api, currency_to_api, investment_kind_from_api, investment_kind_to_api},
    server::ServerState,
};

fn map_investment(investment: Investment) -> InvestmentView {
    InvestmentView {
        market_value_minor: investment.market_value_minor(),
        id: investment.id,
        symbol: investment.symbol,
        name: investment.name,
        kind: investment_kind_to_api(investment.kind),
        quantity: investment.quantity,
        average_price_minor: investment.average_price_minor,
        current_price_minor: investment.current_price_minor,
        currency: currency_to_api(investment.currency),
        broker: investment.broker,
        sector: investment.sector,
        price_updated_at: investment.price_updated_at,
        created_at: investment.created_at,
    }
}

fn map_slice(slice: AllocationSlice) -> AllocationView {
    AllocationView {
        key: slice.key,
        value_minor: slice.value_minor,
        percent: slice.percent,
    }
}

fn map_portfolio(portfolio: PortfolioSummary) -> PortfolioView {
    PortfolioView {
        currency: currency_to_api(portfolio.currency),
        market_value_minor: portfolio.market_value_minor,
        cost_basis_minor: portfolio.cost_basis_minor,
        gain_minor: portfolio.gain_minor,
        gain_percent: portfolio.gain_percent,
        by_kind: portfolio.by_kind.into_iter().map(map_slice).collect(),
        by_sector: portfolio.by_sector.into_iter().map(map_slice).collect(),
        holdings: portfolio
            .holdings
            .into_iter()
            .map(|h| HoldingView {
                id: h.investment_id,
                symbol: h.symbol,
                market_value_minor: h.market_value_minor,
                cost_basis_minor: h.cost_basis_minor,
                gain_minor: h.gain_minor,
                gain_percent: h.gain_percent,
                weight_percent: h.weight_percent,
            })
            .collect(),
    }
}

pub async fn list(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
) -> Result<Json<InvestmentListResponse>, ServerError> {
    let investments = state
        .engine
        .investments(user.id)
        .await?
        .into_iter()
        .map(map_investment)
        .collect();
    Ok(Json(InvestmentListResponse { investments }))
}

pub async fn create(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    WithRejection(Json(payload), _): ApiJson<InvestmentNew>,
) -> Result<(StatusCode, Json<InvestmentView>), ServerError> {
    let cmd = NewInvestmentCmd {
        symbol: payload.symbol,
        name: payload.name,
        kind: investment_kind_from_api(payload.kind),
        quantity: payload.quantity,
        average_price_minor: payload.average_price_minor,
        current_price_minor: payload.current_price_minor,
        currency: currency_from_api(payload.currency),
        broker: payload.broker,
        sector: payload.sector,
    };
    let investment = state.engine.new_investment(user.id, cmd).await?;
    Ok((StatusCode::CREATED, Json(map_investment(investment))))
}

pub async fn get(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    WithRejection(Path(investment_id), _): ApiPath<Uuid>,
) -> Result<Json<InvestmentView>, ServerError> {
    let investment = state.engine.investment(user.id, investment_id).await?;
    Ok(Json(map_investment(investment)))
}

pub async fn update(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    WithRejection(Path(investment_id), _): ApiPath<Uuid>,
    WithRejection(Json(payload), _): ApiJson<InvestmentUpdate>,
) -> Result<Json<InvestmentView>, ServerError> {
    let cmd = UpdateInvestmentCmd {
        name: payload.name,
        kind: payload.kind.map(investment_kind_from_api),
        quantity: payload.quantity,
        average_price_minor: payload.average_price_minor,
        broker: payload.broker,
        sector: payload.sector,
    };
    let investment = state
        .engine
        .update_investment(user.id, investment_id, cmd)
        .await?;
    Ok(Json(map_investment(investment)))
}

pub async fn update_price(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    WithRejection(Path(investment_id), _): ApiPath<Uuid>,
    WithRejection(Json(payload), _): ApiJson<PriceUpdate>,
) -> Result<Json<InvestmentView>, ServerError> {
    let investment = state
        .engine
        .update_price(user.id, investment_id, payload.price_minor)
        .await?;
    Ok(Json(map_investment(investment)))
}

pub async fn delete(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    WithRejection(Path(investment_id), _): ApiPath<Uuid>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .delete_investment(user.id, investment_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn portfolio(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
) -> Result<Json<PortfolioResponse>, ServerError> {
    let portfolios = state
        .engine
        .portfolio(user.id)
        .await?
        .into_iter()
        .map(map_portfolio)
        .collect();
    Ok(Json(PortfolioResponse { portfolios }))
}
