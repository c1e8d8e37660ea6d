//! Investment holdings and portfolio maths.
//!
//! Prices are stored in minor units of the holding currency, quantities as
//! `f64` (fractional shares and crypto). Values derived from both are rounded
//! to the nearest minor unit.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    Currency, EngineError, ResultEngine,
    util::{add_minor, model_currency, sub_minor},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvestmentKind {
    Stock,
    Etf,
    Bond,
    Crypto,
    Fund,
    Other,
}

impl InvestmentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stock => "stock",
            Self::Etf => "etf",
            Self::Bond => "bond",
            Self::Crypto => "crypto",
            Self::Fund => "fund",
            Self::Other => "other",
        }
    }
}

impl TryFrom<&str> for InvestmentKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "stock" => Ok(Self::Stock),
            "etf" => Ok(Self::Etf),
            "bond" => Ok(Self::Bond),
            "crypto" => Ok(Self::Crypto),
            "fund" => Ok(Self::Fund),
            "other" => Ok(Self::Other),
            other => Err(EngineError::InvalidKind(format!(
                "invalid investment kind: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Investment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub symbol: String,
    pub name: Option<String>,
    pub kind: InvestmentKind,
    pub quantity: f64,
    pub average_price_minor: i64,
    pub current_price_minor: i64,
    pub currency: Currency,
    pub broker: Option<String>,
    pub sector: Option<String>,
    pub price_updated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Investment {
    pub fn market_value_minor(&self) -> i64 {
        scale(self.quantity, self.current_price_minor)
    }

    pub fn cost_basis_minor(&self) -> i64 {
        scale(self.quantity, self.average_price_minor)
    }
}

fn scale(quantity: f64, price_minor: i64) -> i64 {
    (quantity * price_minor as f64).round() as i64
}

fn percent(part: i64, whole: i64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    (part as f64 * 10_000.0 / whole as f64).round() / 100.0
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HoldingValue {
    pub investment_id: Uuid,
    pub symbol: String,
    pub kind: InvestmentKind,
    pub quantity: f64,
    pub market_value_minor: i64,
    pub cost_basis_minor: i64,
    pub gain_minor: i64,
    pub gain_percent: f64,
    /// Share of the currency bucket's market value.
    pub weight_percent: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AllocationSlice {
    pub key: String,
    pub value_minor: i64,
    pub percent: f64,
}

/// Portfolio figures for the holdings of one currency.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSummary {
    pub currency: Currency,
    pub market_value_minor: i64,
    pub cost_basis_minor: i64,
    pub gain_minor: i64,
    pub gain_percent: f64,
    pub by_kind: Vec<AllocationSlice>,
    pub by_sector: Vec<AllocationSlice>,
    pub holdings: Vec<HoldingValue>,
}

pub(crate) const UNCLASSIFIED_SECTOR: &str = "unclassified";

/// Group holdings by currency and compute value, gain and allocation.
///
/// Buckets are ordered by currency; allocation slices by descending value.
pub fn portfolio(investments: &[Investment]) -> ResultEngine<Vec<PortfolioSummary>> {
    let mut buckets: BTreeMap<Currency, Vec<&Investment>> = BTreeMap::new();
    for investment in investments {
        buckets.entry(investment.currency).or_default().push(investment);
    }

    buckets
        .into_iter()
        .map(|(currency, holdings)| -> ResultEngine<PortfolioSummary> {
            let mut market_value_minor = 0;
            let mut cost_basis_minor = 0;
            let mut by_kind: BTreeMap<String, i64> = BTreeMap::new();
            let mut by_sector: BTreeMap<String, i64> = BTreeMap::new();
            for holding in &holdings {
                let value = holding.market_value_minor();
                market_value_minor = add_minor(market_value_minor, value)?;
                cost_basis_minor = add_minor(cost_basis_minor, holding.cost_basis_minor())?;

                let kind = by_kind.entry(holding.kind.as_str().to_string()).or_default();
                *kind = add_minor(*kind, value)?;
                let sector = holding
                    .sector
                    .clone()
                    .unwrap_or_else(|| UNCLASSIFIED_SECTOR.to_string());
                let sector = by_sector.entry(sector).or_default();
                *sector = add_minor(*sector, value)?;
            }
            let gain_minor = sub_minor(market_value_minor, cost_basis_minor)?;
            let bucket_value_minor = market_value_minor;

            let holdings = holdings
                .iter()
                .map(|i| -> ResultEngine<HoldingValue> {
                    let market_value_minor = i.market_value_minor();
                    let cost_basis_minor = i.cost_basis_minor();
                    let gain_minor = sub_minor(market_value_minor, cost_basis_minor)?;
                    Ok(HoldingValue {
                        investment_id: i.id,
                        symbol: i.symbol.clone(),
                        kind: i.kind,
                        quantity: i.quantity,
                        market_value_minor,
                        cost_basis_minor,
                        gain_minor,
                        gain_percent: percent(gain_minor, cost_basis_minor),
                        weight_percent: percent(market_value_minor, bucket_value_minor),
                    })
                })
                .collect::<ResultEngine<Vec<_>>>()?;

            Ok(PortfolioSummary {
                currency,
                market_value_minor,
                cost_basis_minor,
                gain_minor,
                gain_percent: percent(gain_minor, cost_basis_minor),
                by_kind: slices(by_kind, market_value_minor),
                by_sector: slices(by_sector, market_value_minor),
                holdings,
            })
        })
        .collect()
}

fn slices(values: BTreeMap<String, i64>, total: i64) -> Vec<AllocationSlice> {
    let mut out: Vec<AllocationSlice> = values
        .into_iter()
        .map(|(key, value_minor)| AllocationSlice {
            percent: percent(value_minor, total),
            key,
            value_minor,
        })
        .collect();
    out.sort_by(|a, b| b.value_minor.cmp(&a.value_minor).then_with(|| a.key.cmp(&b.key)));
    out
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "investments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub symbol: String,
    pub name: Option<String>,
    pub kind: String,
    pub quantity: f64,
    pub average_price_minor: i64,
    pub current_price_minor: i64,
    pub currency: String,
    pub broker: Option<String>,
    pub sector: Option<String>,
    pub price_updated_at: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Investment> for ActiveModel {
    fn from(value: &Investment) -> Self {
        Self {
            id: ActiveValue::Set(value.id),
            user_id: ActiveValue::Set(value.user_id),
            symbol: ActiveValue::Set(value.symbol.clone()),
            name: ActiveValue::Set(value.name.clone()),
            kind: ActiveValue::Set(value.kind.as_str().to_string()),
            quantity: ActiveValue::Set(value.quantity),
            average_price_minor: ActiveValue::Set(value.average_price_minor),
            current_price_minor: ActiveValue::Set(value.current_price_minor),
            currency: ActiveValue::Set(value.currency.code().to_string()),
            broker: ActiveValue::Set(value.broker.clone()),
            sector: ActiveValue::Set(value.sector.clone()),
            price_updated_at: ActiveValue::Set(value.price_updated_at),
            created_at: ActiveValue::Set(value.created_at),
        }
    }
}

impl TryFrom<Model> for Investment {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            user_id: model.user_id,
            symbol: model.symbol,
            name: model.name,
            kind: InvestmentKind::try_from(model.kind.as_str())?,
            quantity: model.quantity,
            average_price_minor: model.average_price_minor,
            current_price_minor: model.current_price_minor,
            currency: model_currency(&model.currency)?,
            broker: model.broker,
            sector: model.sector,
            price_updated_at: model.price_updated_at,
            created_at: model.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn holding(
        symbol: &str,
        kind: InvestmentKind,
        quantity: f64,
        average: i64,
        current: i64,
        currency: Currency,
        sector: Option<&str>,
    ) -> Investment {
        Investment {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            symbol: symbol.to_string(),
            name: None,
            kind,
            quantity,
            average_price_minor: average,
            current_price_minor: current,
            currency,
            broker: None,
            sector: sector.map(ToString::to_string),
            price_updated_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn fractional_quantities_round_to_minor_units() {
        let btc = holding("BTC", InvestmentKind::Crypto, 0.015, 3_000_000, 4_000_033, Currency::Eur, None);
        assert_eq!(btc.market_value_minor(), 60_000);
        assert_eq!(btc.cost_basis_minor(), 45_000);
    }

    #[test]
    fn portfolio_groups_by_currency_and_allocates() {
        let items = vec![
            holding("VWCE", InvestmentKind::Etf, 10.0, 10_000, 12_000, Currency::Eur, None),
            holding("ASML", InvestmentKind::Stock, 1.0, 60_000, 40_000, Currency::Eur, Some("tech")),
            holding("AAPL", InvestmentKind::Stock, 2.0, 15_000, 20_000, Currency::Usd, Some("tech")),
        ];
        let buckets = portfolio(&items).unwrap();
        assert_eq!(buckets.len(), 2);

        let eur = &buckets[0];
        assert_eq!(eur.currency, Currency::Eur);
        assert_eq!(eur.market_value_minor, 160_000);
        assert_eq!(eur.cost_basis_minor, 160_000);
        assert_eq!(eur.gain_minor, 0);
        assert_eq!(eur.gain_percent, 0.0);
        assert_eq!(eur.by_kind[0].key, "etf");
        assert_eq!(eur.by_kind[0].percent, 75.0);
        assert_eq!(eur.by_kind[1].percent, 25.0);
        assert_eq!(eur.by_sector[0].key, UNCLASSIFIED_SECTOR);

        let asml = eur.holdings.iter().find(|h| h.symbol == "ASML").unwrap();
        assert_eq!(asml.gain_minor, -20_000);
        assert_eq!(asml.gain_percent, -33.33);
        assert_eq!(asml.weight_percent, 25.0);

        let usd = &buckets[1];
        assert_eq!(usd.gain_minor, 10_000);
        assert_eq!(usd.gain_percent, 33.33);
    }

    #[test]
    fn portfolio_totals_past_the_i64_range_are_rejected() {
        let items = vec![
            holding("A", InvestmentKind::Stock, 1e18, 10, 10, Currency::Eur, None),
            holding("B", InvestmentKind::Stock, 1e18, 10, 10, Currency::Eur, None),
        ];
        assert!(matches!(portfolio(&items), Err(EngineError::InvalidAmount(_))));
    }

    #[test]
    fn empty_portfolio_has_no_buckets() {
        assert!(portfolio(&[]).unwrap().is_empty());
    }
}
