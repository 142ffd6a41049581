//! Stochastic corpus projection.
//!
//! Each path draws an independent normal return for every year to the
//! retirement goal, compounds the pot at that return and adds the year's
//! contributions. Paths are summarised by nearest-rank percentiles, their
//! mean and the share that reach the member's target corpus.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use statrs::distribution::Normal;
use std::time::Instant;

use crate::error::PensionError;
use crate::planning::projection::derive_target_corpus;
use crate::profile::MemberFinancialProfile;
use crate::types::{
    checked_add, checked_mul, round_half_up, round_money, with_metadata, ComputationOutput, Money,
    Percent, Rate,
};
use crate::PensionResult;

pub const MIN_SIMULATIONS: u32 = 100;
pub const MAX_SIMULATIONS: u32 = 100_000;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonteCarloParameters {
    pub num_simulations: u32,
    /// Mean annual return; the member's expected return when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_return: Option<Rate>,
    /// Standard deviation of the annual return.
    pub return_volatility: Rate,
    /// Fixed seed for reproducible paths.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for MonteCarloParameters {
    fn default() -> Self {
        Self {
            num_simulations: 1_000,
            mean_return: None,
            return_volatility: dec!(0.12),
            seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusPercentiles {
    pub p10: Money,
    pub p25: Money,
    pub p50: Money,
    pub p75: Money,
    pub p90: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonteCarloResult {
    pub num_simulations: u32,
    pub years_to_retirement: u32,
    pub mean_return: Rate,
    pub return_volatility: Rate,
    pub target_corpus: Money,
    pub percentiles: CorpusPercentiles,
    pub mean: Money,
    /// Paths at or above the target corpus, whole percent.
    pub success_rate_pct: Percent,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn to_f64(value: Rate, field: &str) -> PensionResult<f64> {
    value.to_f64().ok_or_else(|| PensionError::InvalidAmount {
        field: field.into(),
        reason: format!("{} is not representable as a float", value),
    })
}

fn validate_parameters(params: &MonteCarloParameters) -> PensionResult<()> {
    if !(MIN_SIMULATIONS..=MAX_SIMULATIONS).contains(&params.num_simulations) {
        return Err(PensionError::InvalidAmount {
            field: "num_simulations".into(),
            reason: format!(
                "must be between {} and {} (got {})",
                MIN_SIMULATIONS, MAX_SIMULATIONS, params.num_simulations
            ),
        });
    }
    if params.return_volatility <= Decimal::ZERO {
        return Err(PensionError::InvalidAmount {
            field: "return_volatility".into(),
            reason: "must be greater than 0".into(),
        });
    }
    Ok(())
}

fn return_distribution(mean: Rate, volatility: Rate) -> PensionResult<Normal> {
    Normal::new(
        to_f64(mean, "mean_return")?,
        to_f64(volatility, "return_volatility")?,
    )
    .map_err(|e| PensionError::InvalidAmount {
        field: "return_volatility".into(),
        reason: format!("Invalid Normal parameters: {e}"),
    })
}

/// One path to the retirement goal. A draw at or below -100% empties the pot
/// rather than driving it negative.
fn simulate_path(
    rng: &mut StdRng,
    dist: &Normal,
    principal: Money,
    contribution: Money,
    years: u32,
) -> PensionResult<Money> {
    let mut balance = principal;
    for _ in 0..years {
        let drawn: f64 = rng.sample(dist);
        let rate = Decimal::from_f64(drawn).ok_or_else(|| PensionError::InvalidAmount {
            field: "return_volatility".into(),
            reason: format!("drawn return {} is outside the decimal range", drawn),
        })?;
        let factor = checked_add(Decimal::ONE, rate, "simulated_return")?.max(Decimal::ZERO);
        balance = checked_add(
            checked_mul(balance, factor, "simulated_corpus")?,
            contribution,
            "simulated_corpus",
        )?;
    }
    Ok(balance)
}

/// Nearest-rank percentile of an ascending, non-empty slice.
fn nearest_rank(sorted: &[Money], pct: usize) -> Money {
    let idx = (sorted.len() * pct / 100).min(sorted.len().saturating_sub(1));
    sorted.get(idx).copied().unwrap_or(Decimal::ZERO)
}

// ---------------------------------------------------------------------------
// Core functions
// ---------------------------------------------------------------------------

pub fn run_monte_carlo(
    profile: &MemberFinancialProfile,
    params: &MonteCarloParameters,
) -> PensionResult<MonteCarloResult> {
    let years = profile.years_to_retirement()?;
    validate_parameters(params)?;

    let mean_return = params.mean_return.unwrap_or(profile.expected_return_rate);
    let dist = return_distribution(mean_return, params.return_volatility)?;
    let mut rng = match params.seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };
    let target = derive_target_corpus(profile)?.target;
    let contribution = profile.total_annual_contribution();

    let n = params.num_simulations as usize;
    let mut paths = Vec::with_capacity(n);
    let mut sum = Decimal::ZERO;
    for _ in 0..n {
        let value = simulate_path(&mut rng, &dist, profile.current_savings, contribution, years)?;
        sum = checked_add(sum, value, "simulated_corpus")?;
        paths.push(value);
    }
    paths.sort();

    let successes = paths.iter().filter(|v| **v >= target).count();
    let total = Decimal::from(params.num_simulations);
    let success_rate_pct = round_half_up(
        Decimal::from(successes as u64) / total * dec!(100),
        0,
    );
    log::debug!(
        "member {}: {} of {} paths reach target {}",
        profile.member_id,
        successes,
        n,
        target
    );

    Ok(MonteCarloResult {
        num_simulations: params.num_simulations,
        years_to_retirement: years,
        mean_return,
        return_volatility: params.return_volatility,
        target_corpus: target,
        percentiles: CorpusPercentiles {
            p10: round_money(nearest_rank(&paths, 10)),
            p25: round_money(nearest_rank(&paths, 25)),
            p50: round_money(nearest_rank(&paths, 50)),
            p75: round_money(nearest_rank(&paths, 75)),
            p90: round_money(nearest_rank(&paths, 90)),
        },
        mean: round_money(sum / total),
        success_rate_pct,
    })
}

pub fn simulate_monte_carlo(
    profile: &MemberFinancialProfile,
    params: &MonteCarloParameters,
) -> PensionResult<ComputationOutput<MonteCarloResult>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let result = run_monte_carlo(profile, params)?;
    if params.seed.is_none() {
        warnings.push("No seed given; paths are not reproducible".into());
    }
    if result.target_corpus.is_zero() {
        warnings.push("Target corpus is zero; every path counts as a success".into());
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Monte Carlo projection (normal annual returns, nearest-rank percentiles)",
        &serde_json::json!({
            "num_simulations": params.num_simulations,
            "seed": params.seed,
            "mean_return": result.mean_return.to_string(),
            "return_volatility": params.return_volatility.to_string(),
            "annual_contribution": profile.total_annual_contribution().to_string(),
        }),
        warnings,
        elapsed,
        result,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planning::projection::project_corpus;

    const SEED: u64 = 42;

    fn default_profile() -> MemberFinancialProfile {
        MemberFinancialProfile::new("M-900", 30, 65)
            .with_income(dec!(60000))
            .with_savings(dec!(25000))
            .with_annual_contribution(dec!(6000))
            .with_return_rate(dec!(0.07))
    }

    fn seeded() -> MonteCarloParameters {
        MonteCarloParameters {
            seed: Some(SEED),
            ..MonteCarloParameters::default()
        }
    }

    // 1. Reproducibility
    #[test]
    fn test_seeded_reproducibility() {
        let a = run_monte_carlo(&default_profile(), &seeded()).unwrap();
        let b = run_monte_carlo(&default_profile(), &seeded()).unwrap();
        assert_eq!(a, b);
    }

    // 2. Shape
    #[test]
    fn test_percentiles_ordered() {
        let r = run_monte_carlo(&default_profile(), &seeded()).unwrap();
        let p = &r.percentiles;
        assert!(p.p10 <= p.p25);
        assert!(p.p25 <= p.p50);
        assert!(p.p50 <= p.p75);
        assert!(p.p75 <= p.p90);
        assert!(p.p10 < p.p90);
        assert!(r.success_rate_pct >= Decimal::ZERO && r.success_rate_pct <= dec!(100));
        assert_eq!(r.years_to_retirement, 35);
        assert_eq!(r.mean_return, dec!(0.07));
        assert_eq!(r.target_corpus, dec!(600000));
    }

    // 3. Near-zero volatility collapses onto the deterministic projection
    #[test]
    fn test_low_volatility_matches_projection() {
        let params = MonteCarloParameters {
            num_simulations: MIN_SIMULATIONS,
            return_volatility: dec!(0.0000001),
            ..seeded()
        };
        let r = run_monte_carlo(&default_profile(), &params).unwrap();
        let expected = project_corpus(&default_profile()).unwrap().projected_corpus;
        let drift = (r.percentiles.p50 - expected).abs() / expected;
        assert!(drift < dec!(0.001), "p50 {} vs {}", r.percentiles.p50, expected);
    }

    // 4. Success rate
    #[test]
    fn test_zero_target_always_succeeds() {
        let profile = MemberFinancialProfile::new("M-901", 40, 65).with_savings(dec!(1000));
        let out = simulate_monte_carlo(&profile, &seeded()).unwrap();
        assert_eq!(out.result.success_rate_pct, dec!(100));
        assert_eq!(out.warnings.len(), 1);
    }

    #[test]
    fn test_mean_return_override() {
        let params = MonteCarloParameters {
            mean_return: Some(dec!(0.02)),
            ..seeded()
        };
        let low = run_monte_carlo(&default_profile(), &params).unwrap();
        let base = run_monte_carlo(&default_profile(), &seeded()).unwrap();
        assert_eq!(low.mean_return, dec!(0.02));
        assert!(low.percentiles.p50 < base.percentiles.p50);
    }

    // 5. Validation
    #[test]
    fn test_simulation_count_bounds() {
        for n in [MIN_SIMULATIONS - 1, MAX_SIMULATIONS + 1] {
            let params = MonteCarloParameters {
                num_simulations: n,
                ..seeded()
            };
            let err = run_monte_carlo(&default_profile(), &params).unwrap_err();
            match err {
                PensionError::InvalidAmount { field, .. } => assert_eq!(field, "num_simulations"),
                other => panic!("Expected InvalidAmount, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_non_positive_volatility_rejected() {
        let params = MonteCarloParameters {
            return_volatility: Decimal::ZERO,
            ..seeded()
        };
        assert!(run_monte_carlo(&default_profile(), &params).is_err());
    }

    #[test]
    fn test_retired_member_rejected() {
        let retired = MemberFinancialProfile::new("M-902", 70, 65).with_savings(dec!(1000));
        let err = run_monte_carlo(&retired, &seeded()).unwrap_err();
        assert!(matches!(err, PensionError::InvalidAgeRange { .. }));
    }

    #[test]
    fn test_nearest_rank() {
        let sorted: Vec<Money> = (0..100).map(Decimal::from).collect();
        assert_eq!(nearest_rank(&sorted, 10), dec!(10));
        assert_eq!(nearest_rank(&sorted, 90), dec!(90));
        assert_eq!(nearest_rank(&[dec!(5)], 50), dec!(5));
    }
}
