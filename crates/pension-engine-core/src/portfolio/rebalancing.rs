use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::allocation::{recommend_portfolio, PortfolioRecommendation};
use crate::profile::MemberFinancialProfile;
use crate::types::{checked_mul, round_money, with_metadata, ComputationOutput, Money, Percent};
use crate::PensionResult;

/// Equity drift, in points, tolerated before rebalancing is advised.
pub const DRIFT_TOLERANCE: Percent = dec!(5);
/// Smallest per-class move worth trading, in points.
const MIN_TRADE_POINTS: Percent = dec!(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RebalanceDirection {
    IncreaseEquity,
    DecreaseEquity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeSide {
    Buy,
    Sell,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub asset_class: String,
    pub side: TradeSide,
    pub amount: Money,
    pub points: Percent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RebalancingPlan {
    pub needs_rebalancing: bool,
    pub drift_tolerance: Percent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<RebalanceDirection>,
    pub portfolio_value: Money,
    pub trades: Vec<Trade>,
    pub recommendation: PortfolioRecommendation,
}

/// Trades that move the member's savings onto the recommended allocation
/// once equity drift exceeds [`DRIFT_TOLERANCE`].
pub fn rebalancing_plan(profile: &MemberFinancialProfile) -> PensionResult<RebalancingPlan> {
    let recommendation = recommend_portfolio(profile)?;
    let deltas = recommendation.deltas;
    let needs_rebalancing = deltas.stocks.abs() > DRIFT_TOLERANCE;

    let direction = if !needs_rebalancing {
        None
    } else if deltas.stocks > Decimal::ZERO {
        Some(RebalanceDirection::IncreaseEquity)
    } else {
        Some(RebalanceDirection::DecreaseEquity)
    };

    let portfolio_value = profile.current_savings;
    let trades = if needs_rebalancing {
        [
            ("Equity", deltas.stocks),
            ("Bonds", deltas.bonds),
            ("Cash", deltas.cash),
        ]
        .into_iter()
        .filter(|(_, delta)| delta.abs() > MIN_TRADE_POINTS)
        .map(|(class, delta)| -> PensionResult<Trade> {
            let amount = checked_mul(delta.abs() / dec!(100), portfolio_value, "trade_amount")?;
            Ok(Trade {
                asset_class: class.to_string(),
                side: if delta > Decimal::ZERO {
                    TradeSide::Buy
                } else {
                    TradeSide::Sell
                },
                amount: round_money(amount),
                points: delta.abs(),
            })
        })
        .collect::<PensionResult<Vec<_>>>()?
    } else {
        Vec::new()
    };

    Ok(RebalancingPlan {
        needs_rebalancing,
        drift_tolerance: DRIFT_TOLERANCE,
        direction,
        portfolio_value,
        trades,
        recommendation,
    })
}

pub fn plan_rebalancing(
    profile: &MemberFinancialProfile,
) -> PensionResult<ComputationOutput<RebalancingPlan>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let plan = rebalancing_plan(profile)?;
    if plan.needs_rebalancing && plan.portfolio_value.is_zero() {
        warnings.push("No savings on record; trade amounts are zero".into());
    }
    if plan.needs_rebalancing {
        warnings.push("Consider rebalancing gradually over 3-6 months".into());
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Drift-band rebalancing against the recommended allocation",
        &serde_json::json!({
            "drift_tolerance_points": DRIFT_TOLERANCE.to_string(),
            "min_trade_points": MIN_TRADE_POINTS.to_string(),
        }),
        warnings,
        elapsed,
        plan,
    ))
}
