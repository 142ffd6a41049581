use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::growth::{future_value_annuity, future_value_lump_sum};
use crate::planning::projection::{derive_target_corpus, SAFE_WITHDRAWAL_RATE};
use crate::profile::MemberFinancialProfile;
use crate::scenarios::what_if::improvement_pct;
use crate::types::{
    checked_add, checked_mul, checked_sub, with_metadata, ComputationOutput, Money, Percent, Rate,
};
use crate::PensionResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketRegime {
    pub name: String,
    pub equity_return: Rate,
    pub bond_return: Rate,
}

impl MarketRegime {
    fn new(name: &str, equity_return: Rate, bond_return: Rate) -> Self {
        Self {
            name: name.into(),
            equity_return,
            bond_return,
        }
    }
}

/// Shock sizes used by [`run_stress_tests`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StressParameters {
    pub market_regimes: Vec<MarketRegime>,
    pub high_inflation: Rate,
    pub life_expectancy: u32,
    /// Portfolio drop in the first retirement year.
    pub first_year_loss: Rate,
    /// Return earned in every later retirement year.
    pub recovery_return: Rate,
    /// Share of final income drawn each retirement year.
    pub income_replacement: Rate,
    pub retirement_years: u32,
}

impl Default for StressParameters {
    fn default() -> Self {
        Self {
            market_regimes: vec![
                MarketRegime::new("Bull Market", dec!(0.12), dec!(0.05)),
                MarketRegime::new("Normal Market", dec!(0.08), dec!(0.04)),
                MarketRegime::new("Bear Market", dec!(0.03), dec!(0.03)),
                MarketRegime::new("Recession", dec!(-0.05), dec!(0.02)),
            ],
            high_inflation: dec!(0.035),
            life_expectancy: 95,
            first_year_loss: dec!(0.20),
            recovery_return: dec!(0.08),
            income_replacement: dec!(0.80),
            retirement_years: 25,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StressKind {
    Market,
    Inflation,
    Longevity,
    SequenceOfReturns,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StressTestResult {
    pub name: String,
    pub kind: StressKind,
    /// Annual return the member's pot earns under the shock, where one applies.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applied_return: Option<Rate>,
    pub projected_value: Money,
    pub change_vs_baseline_pct: Percent,
    pub passed: bool,
    pub detail: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StressReport {
    pub baseline_value: Money,
    pub target_corpus: Money,
    pub tests: Vec<StressTestResult>,
    pub passed_tests: usize,
    pub total_tests: usize,
    pub insights: Vec<String>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Corpus at retirement under an arbitrary (possibly negative) return.
fn project_at(profile: &MemberFinancialProfile, rate: Rate, years: u32) -> PensionResult<Money> {
    checked_add(
        future_value_lump_sum(profile.current_savings, rate, years)?,
        future_value_annuity(profile.total_annual_contribution(), rate, years)?,
        "stressed_corpus",
    )
}

fn blended_return(equity_share: Rate, regime: &MarketRegime) -> PensionResult<Rate> {
    let equity = checked_mul(equity_share, regime.equity_return, "equity_return")?;
    let bonds = checked_mul(Decimal::ONE - equity_share, regime.bond_return, "bond_return")?;
    checked_add(equity, bonds, "blended_return")
}

fn pct(rate: Rate, field: &str) -> PensionResult<Percent> {
    checked_mul(rate, dec!(100), field)
}

// ---------------------------------------------------------------------------
// Individual tests
// ---------------------------------------------------------------------------

fn market_test(
    profile: &MemberFinancialProfile,
    regime: &MarketRegime,
    years: u32,
    baseline: Money,
    target: Money,
) -> PensionResult<StressTestResult> {
    let equity_pct = profile.estimated_equity_pct();
    let rate = blended_return(equity_pct / dec!(100), regime)?;
    let value = project_at(profile, rate, years)?;
    Ok(StressTestResult {
        name: format!("Market Stress: {}", regime.name),
        kind: StressKind::Market,
        applied_return: Some(rate),
        projected_value: value,
        change_vs_baseline_pct: improvement_pct(value, baseline)?,
        passed: value >= target,
        detail: format!(
            "{}% equity at {}% / bonds at {}%",
            equity_pct,
            pct(regime.equity_return, "equity_return")?,
            pct(regime.bond_return, "bond_return")?
        ),
    })
}

fn inflation_test(
    profile: &MemberFinancialProfile,
    params: &StressParameters,
    years: u32,
    baseline: Money,
    target: Money,
) -> PensionResult<StressTestResult> {
    let real = checked_sub(profile.expected_return_rate, params.high_inflation, "real_return")?;
    let value = project_at(profile, real, years)?;
    let inflation_pct = pct(params.high_inflation, "high_inflation")?;
    Ok(StressTestResult {
        name: format!("High Inflation ({}%)", inflation_pct),
        kind: StressKind::Inflation,
        applied_return: Some(real),
        projected_value: value,
        change_vs_baseline_pct: improvement_pct(value, baseline)?,
        passed: value >= target,
        detail: format!(
            "Real return {}% after {}% inflation",
            pct(real, "real_return")?,
            inflation_pct
        ),
    })
}

/// Level withdrawals at the safe rate from retirement to the planning age.
fn longevity_test(
    profile: &MemberFinancialProfile,
    params: &StressParameters,
    baseline: Money,
) -> PensionResult<StressTestResult> {
    let years_drawn = params
        .life_expectancy
        .saturating_sub(profile.retirement_age_goal);
    let annual = baseline * SAFE_WITHDRAWAL_RATE;
    let total = checked_mul(annual, Decimal::from(years_drawn), "longevity_withdrawals")?;
    let remaining = checked_sub(baseline, total, "longevity_withdrawals")?;
    Ok(StressTestResult {
        name: format!("Longevity to age {}", params.life_expectancy),
        kind: StressKind::Longevity,
        applied_return: None,
        projected_value: remaining,
        change_vs_baseline_pct: improvement_pct(remaining, baseline)?,
        passed: total <= baseline,
        detail: format!(
            "{} years of withdrawals at {} per year",
            years_drawn,
            annual.round_dp(2)
        ),
    })
}

/// Early drawdown then steady recovery, drawing a share of income each year.
fn sequence_test(
    profile: &MemberFinancialProfile,
    params: &StressParameters,
    baseline: Money,
) -> PensionResult<StressTestResult> {
    let withdrawal = checked_mul(profile.annual_income, params.income_replacement, "withdrawal")?;
    let after_loss = checked_mul(
        baseline,
        checked_sub(Decimal::ONE, params.first_year_loss, "first_year_loss")?,
        "first_year_loss",
    )?;
    let mut balance = checked_sub(after_loss, withdrawal, "sequence_balance")?;
    let mut depleted_after: Option<u32> = None;
    if balance <= Decimal::ZERO {
        depleted_after = Some(1);
    } else {
        let growth = checked_add(Decimal::ONE, params.recovery_return, "recovery_return")?;
        for year in 2..=params.retirement_years {
            let Some(grown) = balance.checked_mul(growth) else {
                break;
            };
            balance = checked_sub(grown, withdrawal, "sequence_balance")?;
            if balance <= Decimal::ZERO {
                depleted_after = Some(year);
                break;
            }
        }
    }
    let end_value = balance.max(Decimal::ZERO);
    let loss_pct = pct(params.first_year_loss, "first_year_loss")?;
    Ok(StressTestResult {
        name: "Sequence of Returns".into(),
        kind: StressKind::SequenceOfReturns,
        applied_return: Some(params.recovery_return),
        projected_value: end_value,
        change_vs_baseline_pct: improvement_pct(end_value, baseline)?,
        passed: depleted_after.is_none(),
        detail: match depleted_after {
            Some(year) => format!(
                "{}% loss in year 1; savings depleted in retirement year {}",
                loss_pct, year
            ),
            None => format!(
                "{}% loss in year 1; savings survive {} years of withdrawals",
                loss_pct, params.retirement_years
            ),
        },
    })
}

// ---------------------------------------------------------------------------
// Core functions
// ---------------------------------------------------------------------------

pub fn run_stress_tests(
    profile: &MemberFinancialProfile,
    params: &StressParameters,
) -> PensionResult<StressReport> {
    let years = profile.years_to_retirement()?;
    let baseline = project_at(profile, profile.expected_return_rate, years)?;
    let target = derive_target_corpus(profile)?.target;

    let mut tests = Vec::with_capacity(params.market_regimes.len() + 3);
    for regime in &params.market_regimes {
        tests.push(market_test(profile, regime, years, baseline, target)?);
    }
    tests.push(sequence_test(profile, params, baseline)?);
    tests.push(inflation_test(profile, params, years, baseline, target)?);
    tests.push(longevity_test(profile, params, baseline)?);

    let mut insights = Vec::new();
    if tests
        .iter()
        .any(|t| t.kind == StressKind::Market && t.change_vs_baseline_pct < dec!(-30))
    {
        insights.push(
            "Portfolio is vulnerable to prolonged bear markets; consider a more conservative allocation near retirement"
                .into(),
        );
    }
    if tests
        .iter()
        .any(|t| t.kind == StressKind::Inflation && t.projected_value < baseline * dec!(0.8))
    {
        insights.push(
            "High inflation poses significant risk to purchasing power; consider inflation-protected investments"
                .into(),
        );
    }
    if tests
        .iter()
        .any(|t| t.kind == StressKind::SequenceOfReturns && !t.passed)
    {
        insights.push("An early-retirement downturn could exhaust savings; hold a cash buffer for the first years".into());
    }

    let passed_tests = tests.iter().filter(|t| t.passed).count();
    Ok(StressReport {
        baseline_value: baseline,
        target_corpus: target,
        total_tests: tests.len(),
        passed_tests,
        tests,
        insights,
    })
}

pub fn stress_test(
    profile: &MemberFinancialProfile,
    params: &StressParameters,
) -> PensionResult<ComputationOutput<StressReport>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let report = run_stress_tests(profile, params)?;
    if report.target_corpus.is_zero() {
        warnings.push("Target corpus is zero; market and inflation tests pass trivially".into());
    }
    if profile.annual_income.is_zero() {
        warnings.push("No income on record; sequence test draws nothing".into());
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Deterministic stress tests (market regimes, inflation, longevity, sequence of returns)",
        &serde_json::json!({
            "market_regimes": params.market_regimes,
            "high_inflation": params.high_inflation.to_string(),
            "life_expectancy": params.life_expectancy,
            "first_year_loss": params.first_year_loss.to_string(),
            "recovery_return": params.recovery_return.to_string(),
        }),
        warnings,
        elapsed,
        report,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
