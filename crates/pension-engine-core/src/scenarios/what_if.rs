use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::PensionError;
use crate::planning::projection::{project_corpus, ProjectionResult, SAFE_WITHDRAWAL_RATE};
use crate::profile::{MemberFinancialProfile, MAX_AGE};
use crate::types::{
    checked_add, checked_div, checked_mul, checked_sub, round_half_up, with_metadata,
    ComputationOutput, Money, Percent, Rate,
};
use crate::PensionResult;

const DELAY_YEARS: u32 = 2;
const MAX_EXTRA_CONTRIBUTION: Money = dec!(5000);
const EXTRA_CONTRIBUTION_SHARE: Rate = dec!(0.05);
const RETURN_BUMP: Rate = dec!(0.02);
const RETURN_CAP: Rate = dec!(0.10);
const MATCH_SHARE_CAP: Rate = dec!(0.06);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// The single input a scenario changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioInput {
    RetirementAge,
    AnnualContribution,
    ReturnRate,
    EmployerContribution,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioDetails {
    pub changed_input: ScenarioInput,
    pub from: Decimal,
    pub to: Decimal,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub name: String,
    pub projected_value: Money,
    /// Whole percent over the baseline.
    pub improvement_pct: Percent,
    pub details: ScenarioDetails,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhatIfAnalysis {
    pub baseline: ProjectionResult,
    /// Improving scenarios, best first.
    pub scenarios: Vec<ScenarioResult>,
}

/// Deltas explored by [`sensitivity_grid`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SensitivityAdjustments {
    /// Added to the annual member contribution.
    pub contribution_changes: Vec<Money>,
    /// Added to the retirement age goal.
    pub retirement_age_changes: Vec<i32>,
    /// Replacement return rates.
    pub return_rates: Vec<Rate>,
}

impl Default for SensitivityAdjustments {
    fn default() -> Self {
        Self {
            contribution_changes: vec![dec!(0), dec!(1000), dec!(2000), dec!(5000)],
            retirement_age_changes: vec![-2, -1, 0, 1, 2],
            return_rates: vec![dec!(0.05), dec!(0.06), dec!(0.07), dec!(0.08), dec!(0.09)],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityPoint {
    pub label: String,
    pub changed_input: ScenarioInput,
    pub projected_value: Money,
    pub sustainable_withdrawal: Money,
    /// Withdrawal as a share of income; `None` without income.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub income_replacement_pct: Option<Percent>,
    pub change_vs_baseline_pct: Percent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityGrid {
    pub baseline_value: Money,
    pub points: Vec<SensitivityPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best: Option<SensitivityPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worst: Option<SensitivityPoint>,
    /// Adjustments that produced an invalid profile, with the reason.
    pub skipped: Vec<String>,
    pub insights: Vec<String>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// `round((value - baseline) / baseline × 100)`. A zero baseline reports 100
/// for any positive value.
pub fn improvement_pct(value: Money, baseline: Money) -> PensionResult<Percent> {
    if baseline.is_zero() {
        return Ok(if value > Decimal::ZERO {
            dec!(100)
        } else {
            Decimal::ZERO
        });
    }
    let change = checked_sub(value, baseline, "improvement_pct")?;
    let ratio = checked_div(change, baseline, "improvement_pct")?;
    Ok(round_half_up(checked_mul(ratio, dec!(100), "improvement_pct")?, 0))
}

fn perturbations(
    profile: &MemberFinancialProfile,
) -> PensionResult<Vec<(String, MemberFinancialProfile, ScenarioDetails)>> {
    let mut out = Vec::with_capacity(4);

    let goal = profile.retirement_age_goal;
    let delayed_goal = goal
        .checked_add(DELAY_YEARS)
        .ok_or_else(|| PensionError::InvalidAgeRange {
            field: "retirement_age_goal".into(),
            reason: format!("cannot delay retirement beyond age {}", goal),
        })?;
    let mut delayed = profile.clone();
    delayed.retirement_age_goal = delayed_goal;
    out.push((
        format!("Delay retirement by {} years", DELAY_YEARS),
        delayed,
        ScenarioDetails {
            changed_input: ScenarioInput::RetirementAge,
            from: Decimal::from(goal),
            to: Decimal::from(delayed_goal),
            description: format!("Retire at {} instead of {}", delayed_goal, goal),
        },
    ));

    let annual = profile.annual_contribution();
    let extra = checked_mul(profile.annual_income, EXTRA_CONTRIBUTION_SHARE, "annual_income")?
        .min(MAX_EXTRA_CONTRIBUTION);
    let raised = checked_add(annual, extra, "annual_contribution")?;
    out.push((
        "Increase annual contribution".to_string(),
        profile.clone().with_annual_contribution(raised),
        ScenarioDetails {
            changed_input: ScenarioInput::AnnualContribution,
            from: annual,
            to: raised,
            description: format!("Contribute an extra {} per year", extra.round_dp(2)),
        },
    ));

    let rate = profile.expected_return_rate;
    let bumped = checked_add(rate, RETURN_BUMP, "expected_return_rate")?.min(RETURN_CAP);
    let mut higher_return = profile.clone();
    higher_return.expected_return_rate = bumped;
    out.push((
        "Improve investment return".to_string(),
        higher_return,
        ScenarioDetails {
            changed_input: ScenarioInput::ReturnRate,
            from: rate,
            to: bumped,
            description: format!(
                "Earn {}% instead of {}%",
                bumped * dec!(100),
                checked_mul(rate, dec!(100), "expected_return_rate")?
            ),
        },
    ));

    let current_match = profile.employer_contribution();
    let maxed = checked_mul(profile.annual_income, MATCH_SHARE_CAP, "annual_income")?
        .min(checked_mul(current_match, dec!(2), "employer_contribution")?);
    out.push((
        "Maximize employer match".to_string(),
        profile.clone().with_employer_contribution(maxed),
        ScenarioDetails {
            changed_input: ScenarioInput::EmployerContribution,
            from: current_match,
            to: maxed,
            description: format!("Employer contributes {} per year", maxed.round_dp(2)),
        },
    ));

    Ok(out)
}

// ---------------------------------------------------------------------------
// Core functions
// ---------------------------------------------------------------------------

/// Every named perturbation against the baseline, unfiltered and in
/// definition order.
pub fn run_scenarios(
    profile: &MemberFinancialProfile,
) -> PensionResult<(ProjectionResult, Vec<ScenarioResult>)> {
    let baseline = project_corpus(profile)?;
    let mut results = Vec::new();
    for (name, variant, details) in perturbations(profile)? {
        let value = project_corpus(&variant)?.projected_corpus;
        results.push(ScenarioResult {
            name,
            projected_value: value,
            improvement_pct: improvement_pct(value, baseline.projected_corpus)?,
            details,
        });
    }
    Ok((baseline, results))
}

/// Scenarios that beat the baseline, ranked by improvement.
pub fn rank_scenarios(baseline: Money, scenarios: Vec<ScenarioResult>) -> Vec<ScenarioResult> {
    let mut improving: Vec<ScenarioResult> = scenarios
        .into_iter()
        .filter(|s| s.projected_value > baseline)
        .collect();
    improving.sort_by(|a, b| {
        b.improvement_pct
            .cmp(&a.improvement_pct)
            .then(b.projected_value.cmp(&a.projected_value))
    });
    improving
}

pub fn simulate_what_if(
    profile: &MemberFinancialProfile,
) -> PensionResult<ComputationOutput<WhatIfAnalysis>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let (baseline, all) = run_scenarios(profile)?;
    let total = all.len();
    let scenarios = rank_scenarios(baseline.projected_corpus, all);
    log::debug!(
        "member {}: {} of {} scenarios improve on baseline",
        profile.member_id,
        scenarios.len(),
        total
    );
    if baseline.projected_corpus.is_zero() {
        warnings.push("Baseline corpus is zero; improvements reported as 100%".into());
    }
    if scenarios.is_empty() {
        warnings.push("No scenario improves on the current plan".into());
    }

    let output = WhatIfAnalysis {
        baseline,
        scenarios,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "What-if perturbations (one input changed per scenario, ranked by % improvement)",
        &serde_json::json!({
            "delay_years": DELAY_YEARS,
            "max_extra_contribution": MAX_EXTRA_CONTRIBUTION.to_string(),
            "return_cap": RETURN_CAP.to_string(),
            "employer_match_cap_share": MATCH_SHARE_CAP.to_string(),
        }),
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Sensitivity grid
// ---------------------------------------------------------------------------

fn grid_point(
    label: String,
    changed_input: ScenarioInput,
    variant: &MemberFinancialProfile,
    baseline: Money,
) -> PensionResult<SensitivityPoint> {
    let value = project_corpus(variant)?.projected_corpus;
    let withdrawal = value * SAFE_WITHDRAWAL_RATE;
    let income_replacement_pct = if variant.annual_income > Decimal::ZERO {
        let share = checked_div(withdrawal, variant.annual_income, "income_replacement")?;
        Some(round_half_up(
            checked_mul(share, dec!(100), "income_replacement")?,
            0,
        ))
    } else {
        None
    };
    Ok(SensitivityPoint {
        label,
        changed_input,
        projected_value: value,
        sustainable_withdrawal: withdrawal,
        income_replacement_pct,
        change_vs_baseline_pct: improvement_pct(value, baseline)?,
    })
}

/// Projection across a grid of single-input adjustments.
pub fn sensitivity_grid(
    profile: &MemberFinancialProfile,
    adjustments: &SensitivityAdjustments,
) -> PensionResult<SensitivityGrid> {
    let baseline = project_corpus(profile)?.projected_corpus;
    let mut points = Vec::new();
    let mut skipped = Vec::new();

    let annual = profile.annual_contribution();
    for change in &adjustments.contribution_changes {
        let label = format!("Contribution {:+}", change);
        let adjusted = checked_add(annual, *change, "annual_contribution")?;
        if adjusted < Decimal::ZERO {
            skipped.push(format!("{}: contribution would be negative", label));
            continue;
        }
        let variant = profile.clone().with_annual_contribution(adjusted);
        points.push(grid_point(label, ScenarioInput::AnnualContribution, &variant, baseline)?);
    }

    for change in &adjustments.retirement_age_changes {
        let label = format!("Retirement {:+} years", change);
        let goal = i64::from(profile.retirement_age_goal) + i64::from(*change);
        if goal <= i64::from(profile.age) {
            skipped.push(format!("{}: retirement age would not be in the future", label));
            continue;
        }
        if goal > i64::from(MAX_AGE) {
            skipped.push(format!("{}: retirement age would exceed {}", label, MAX_AGE));
            continue;
        }
        let mut variant = profile.clone();
        variant.retirement_age_goal = goal as u32;
        points.push(grid_point(label, ScenarioInput::RetirementAge, &variant, baseline)?);
    }

    for rate in &adjustments.return_rates {
        let label = format!(
            "{}% annual return",
            checked_mul(*rate, dec!(100), "return_rates")?
        );
        if *rate < Decimal::ZERO {
            skipped.push(format!("{}: negative return", label));
            continue;
        }
        let mut variant = profile.clone();
        variant.expected_return_rate = *rate;
        points.push(grid_point(label, ScenarioInput::ReturnRate, &variant, baseline)?);
    }

    let best = points
        .iter()
        .max_by(|a, b| a.projected_value.cmp(&b.projected_value))
        .cloned();
    let worst = points
        .iter()
        .min_by(|a, b| a.projected_value.cmp(&b.projected_value))
        .cloned();

    let mut insights = Vec::new();
    if let Some(top) = points
        .iter()
        .filter(|p| p.changed_input == ScenarioInput::AnnualContribution)
        .max_by(|a, b| a.projected_value.cmp(&b.projected_value))
    {
        if top.change_vs_baseline_pct > Decimal::ZERO {
            insights.push(format!(
                "{} could improve retirement value by {}%",
                top.label, top.change_vs_baseline_pct
            ));
        }
    }
    if points
        .iter()
        .any(|p| p.changed_input == ScenarioInput::RetirementAge && p.change_vs_baseline_pct > Decimal::ZERO)
    {
        insights.push(
            "Delaying retirement could significantly boost retirement savings due to compound growth"
                .into(),
        );
    }

    Ok(SensitivityGrid {
        baseline_value: baseline,
        points,
        best,
        worst,
        skipped,
        insights,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
