use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::profile::{AllocationPlan, MemberFinancialProfile, RiskTolerance};
use crate::types::{round_half_up, with_metadata, ComputationOutput, Percent, Rate};
use crate::PensionResult;

const EQUITY_FLOOR: Rate = dec!(0.15);
const EQUITY_CAP: Rate = dec!(0.90);
const CASH_FLOOR: Rate = dec!(0.05);
const CASH_CAP: Rate = dec!(0.25);
const GLIDE_START_AGE: u32 = 30;
const GLIDE_PER_YEAR: Rate = dec!(0.005);
const NEAR_RETIREMENT_YEARS: u32 = 7;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Recommended minus current, in percentage points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationDeltas {
    pub stocks: Percent,
    pub bonds: Percent,
    pub cash: Percent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioRecommendation {
    pub current_allocation: AllocationPlan,
    /// True when the current split was estimated from `investment_type`.
    pub current_is_estimated: bool,
    pub recommended_allocation: AllocationPlan,
    pub deltas: AllocationDeltas,
    pub rationale: String,
}

// ---------------------------------------------------------------------------
// Core functions
// ---------------------------------------------------------------------------

fn base_equity(tolerance: RiskTolerance) -> Rate {
    match tolerance {
        RiskTolerance::Low => dec!(0.40),
        RiskTolerance::Medium => dec!(0.60),
        RiskTolerance::High => dec!(0.75),
    }
}

/// Target stocks/bonds/cash split from age, tolerance, scheme type, horizon
/// and (optionally) withdrawal style. Always sums to exactly 100.
pub fn recommended_allocation(profile: &MemberFinancialProfile) -> AllocationPlan {
    let years_to_retirement = profile.retirement_age_goal.saturating_sub(profile.age);

    let mut equity = base_equity(profile.risk_tolerance);
    let glide = Decimal::from(profile.age.saturating_sub(GLIDE_START_AGE)) * GLIDE_PER_YEAR;
    equity -= glide;
    if profile.is_defined_benefit() {
        // The DB pension already behaves like a bond floor.
        equity += dec!(0.03);
    }
    if let Some(style) = profile.withdrawal_style {
        equity += style.equity_tilt();
    }
    if years_to_retirement <= NEAR_RETIREMENT_YEARS {
        equity -= dec!(0.05);
    }
    let equity = equity.clamp(EQUITY_FLOOR, EQUITY_CAP);

    let mut cash = dec!(0.10);
    if profile.age >= 55 {
        cash += dec!(0.05);
    }
    if profile.risk_tolerance == RiskTolerance::Low {
        cash += dec!(0.05);
    }
    let cash = cash.clamp(CASH_FLOOR, CASH_CAP);

    let bonds = (Decimal::ONE - equity - cash).max(Decimal::ZERO);
    let total = equity + bonds + cash;

    let stocks = round_half_up(equity / total * dec!(100), 1);
    let cash = round_half_up(cash / total * dec!(100), 1);
    AllocationPlan {
        stocks,
        bonds: (dec!(100) - stocks - cash).max(Decimal::ZERO),
        cash,
    }
}

pub fn allocation_deltas(current: &AllocationPlan, recommended: &AllocationPlan) -> AllocationDeltas {
    AllocationDeltas {
        stocks: round_half_up(recommended.stocks - current.stocks, 1),
        bonds: round_half_up(recommended.bonds - current.bonds, 1),
        cash: round_half_up(recommended.cash - current.cash, 1),
    }
}

/// One sentence explaining the largest move.
pub fn rationale(profile: &MemberFinancialProfile, deltas: &AllocationDeltas) -> String {
    let candidates = [
        ("equity", deltas.stocks),
        ("bond", deltas.bonds),
        ("cash", deltas.cash),
    ];
    // First of equal magnitudes wins, so equity leads ties.
    let (class, delta) = candidates
        .iter()
        .copied()
        .fold(candidates[0], |best, c| {
            if c.1.abs() > best.1.abs() {
                c
            } else {
                best
            }
        });

    let tolerance = match profile.risk_tolerance {
        RiskTolerance::Low => "low",
        RiskTolerance::Medium => "medium",
        RiskTolerance::High => "high",
    };
    let years = profile.retirement_age_goal.saturating_sub(profile.age);

    if delta.abs() < dec!(1) {
        return format!(
            "With {} risk tolerance at age {}, your current allocation is well aligned; review annually or after major life changes.",
            tolerance, profile.age
        );
    }
    let (verb, purpose) = if delta > Decimal::ZERO {
        (
            "increasing",
            match class {
                "equity" => "to capture more growth",
                "bond" => "to steady returns",
                _ => "to build a liquidity buffer",
            },
        )
    } else {
        (
            "reducing",
            match class {
                "equity" => "to preserve capital",
                "bond" => "to free room for growth assets",
                _ => "to put idle cash to work",
            },
        )
    };
    format!(
        "With {} risk tolerance at age {} and {} years to retirement, we recommend {} {} allocation by {} points {}.",
        tolerance,
        profile.age,
        years,
        verb,
        class,
        delta.abs(),
        purpose
    )
}

/// Recommended allocation diffed against the member's current one.
pub fn recommend_portfolio(profile: &MemberFinancialProfile) -> PensionResult<PortfolioRecommendation> {
    profile.validate()?;
    let current = profile.current_allocation_or_estimate();
    let recommended = recommended_allocation(profile);
    let deltas = allocation_deltas(&current, &recommended);
    let rationale = rationale(profile, &deltas);
    Ok(PortfolioRecommendation {
        current_allocation: current,
        current_is_estimated: profile.current_allocation.is_none(),
        recommended_allocation: recommended,
        deltas,
        rationale,
    })
}

pub fn optimize_portfolio(
    profile: &MemberFinancialProfile,
) -> PensionResult<ComputationOutput<PortfolioRecommendation>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let output = recommend_portfolio(profile)?;
    if output.current_is_estimated {
        warnings.push("Current allocation estimated from investment type".into());
    }
    if !output.current_allocation.is_balanced() {
        warnings.push(format!(
            "Current allocation sums to {} rather than 100",
            output.current_allocation.total()
        ));
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Rule-based glide path (tolerance base, age glide, scheme and horizon adjustments)",
        &serde_json::json!({
            "risk_tolerance": profile.risk_tolerance,
            "equity_bounds": [EQUITY_FLOOR.to_string(), EQUITY_CAP.to_string()],
            "cash_bounds": [CASH_FLOOR.to_string(), CASH_CAP.to_string()],
            "withdrawal_style": profile.withdrawal_style,
        }),
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
