use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::PensionError;
use crate::growth::{
    future_value_annuity, future_value_lump_sum, solve_periods_for_target, MAX_SOLVE_PERIODS,
};
use crate::profile::MemberFinancialProfile;
use crate::types::{
    checked_add, checked_div, checked_mul, round_half_up, with_metadata, ComputationOutput, Money,
    Percent, Rate,
};
use crate::PensionResult;

/// Share of the pot drawn each year in retirement.
pub const SAFE_WITHDRAWAL_RATE: Rate = dec!(0.04);
/// Inverse of the safe withdrawal rate: income × 25 buys that income.
pub const SAFE_WITHDRAWAL_MULTIPLE: Decimal = dec!(25);
/// Target pot as a multiple of salary when no income target is set.
pub const SALARY_MULTIPLE: Decimal = dec!(10);

const SCENARIO_RATES: [(&str, Rate); 3] = [
    ("conservative", dec!(0.06)),
    ("moderate", dec!(0.08)),
    ("aggressive", dec!(0.10)),
];

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionBreakdown {
    /// Current savings grown to retirement.
    pub lump_sum_fv: Money,
    /// Accumulated member and employer contributions.
    pub annuity_fv: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionResult {
    pub projected_corpus: Money,
    pub years_to_retirement: u32,
    pub breakdown: ProjectionBreakdown,
}

/// Which rule produced the target corpus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetPolicy {
    /// `target_retirement_income × 25`
    FourPercentRule,
    /// `salary × 10`
    SalaryMultiple,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetCorpus {
    pub policy: TargetPolicy,
    pub target: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioProjection {
    pub label: String,
    pub return_rate: Rate,
    pub projected_corpus: Money,
    /// First-year retirement income at the safe withdrawal rate.
    pub annual_income: Money,
    /// Retirement income as a percentage of current salary.
    pub replacement_ratio: Percent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectionAnalysis {
    pub projection: ProjectionResult,
    pub target: TargetCorpus,
    /// Age at which the current plan reaches the target, if it ever does.
    pub retirement_age_for_target: Option<u32>,
    pub scenarios: Vec<ScenarioProjection>,
}

// ---------------------------------------------------------------------------
// Core functions
// ---------------------------------------------------------------------------

/// Corpus at the retirement goal: savings compounded plus the annual
/// contribution stream (member and employer) as an ordinary annuity.
pub fn project_corpus(profile: &MemberFinancialProfile) -> PensionResult<ProjectionResult> {
    let years = profile.years_to_retirement()?;
    let rate = profile.expected_return_rate;

    let lump_sum_fv = future_value_lump_sum(profile.current_savings, rate, years)?;
    let annuity_fv = future_value_annuity(profile.total_annual_contribution(), rate, years)?;

    Ok(ProjectionResult {
        projected_corpus: checked_add(lump_sum_fv, annuity_fv, "projected_corpus")?,
        years_to_retirement: years,
        breakdown: ProjectionBreakdown {
            lump_sum_fv,
            annuity_fv,
        },
    })
}

/// Earliest age at which the current plan reaches `target_corpus`.
pub fn solve_retirement_age(
    profile: &MemberFinancialProfile,
    target_corpus: Money,
) -> PensionResult<u32> {
    profile.validate()?;
    let years = solve_periods_for_target(
        target_corpus,
        profile.current_savings,
        profile.total_annual_contribution(),
        profile.expected_return_rate,
        MAX_SOLVE_PERIODS,
    )?;
    Ok(profile.age + years)
}

/// Target corpus: an explicit income goal wins, otherwise a salary multiple.
pub fn derive_target_corpus(profile: &MemberFinancialProfile) -> PensionResult<TargetCorpus> {
    match profile.target_retirement_income {
        Some(income) if income > Decimal::ZERO => {
            log::debug!(
                "member {}: target from income goal {}",
                profile.member_id,
                income
            );
            Ok(TargetCorpus {
                policy: TargetPolicy::FourPercentRule,
                target: checked_mul(income, SAFE_WITHDRAWAL_MULTIPLE, "target_retirement_income")?,
            })
        }
        _ => {
            log::debug!(
                "member {}: target from salary multiple",
                profile.member_id
            );
            Ok(TargetCorpus {
                policy: TargetPolicy::SalaryMultiple,
                target: checked_mul(profile.salary(), SALARY_MULTIPLE, "salary")?,
            })
        }
    }
}

/// Projections at the three reference return rates.
pub fn project_scenarios(
    profile: &MemberFinancialProfile,
) -> PensionResult<Vec<ScenarioProjection>> {
    let salary = profile.salary();
    SCENARIO_RATES
        .iter()
        .map(|(label, rate)| -> PensionResult<ScenarioProjection> {
            let mut variant = profile.clone();
            variant.expected_return_rate = *rate;
            let projected = project_corpus(&variant)?.projected_corpus;
            let annual_income = projected * SAFE_WITHDRAWAL_RATE;
            let replacement_ratio = if salary > Decimal::ZERO {
                let share = checked_div(annual_income, salary, "replacement_ratio")?;
                round_half_up(checked_mul(share, dec!(100), "replacement_ratio")?, 1)
            } else {
                Decimal::ZERO
            };
            Ok(ScenarioProjection {
                label: label.to_string(),
                return_rate: *rate,
                projected_corpus: projected,
                annual_income,
                replacement_ratio,
            })
        })
        .collect()
}

/// Full projection report for one member.
pub fn analyze_projection(
    profile: &MemberFinancialProfile,
) -> PensionResult<ComputationOutput<ProjectionAnalysis>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let projection = project_corpus(profile)?;
    let target = derive_target_corpus(profile)?;

    let retirement_age_for_target = if target.target <= Decimal::ZERO {
        warnings.push("Target corpus is zero; no retirement age solved".into());
        None
    } else {
        match solve_retirement_age(profile, target.target) {
            Ok(age) => Some(age),
            Err(PensionError::TargetUnreachable { max_periods, .. }) => {
                warnings.push(format!(
                    "Target corpus {} is not reached within {} years at the current plan",
                    target.target.round_dp(2),
                    max_periods
                ));
                None
            }
            Err(e) => return Err(e),
        }
    };

    let scenarios = project_scenarios(profile)?;

    let output = ProjectionAnalysis {
        projection,
        target,
        retirement_age_for_target,
        scenarios,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Corpus projection (lump-sum FV + ordinary annuity FV, annual compounding)",
        &serde_json::json!({
            "age": profile.age,
            "retirement_age_goal": profile.retirement_age_goal,
            "expected_return_rate": profile.expected_return_rate.to_string(),
            "annual_contribution": profile.total_annual_contribution().to_string(),
            "safe_withdrawal_rate": SAFE_WITHDRAWAL_RATE.to_string(),
        }),
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
