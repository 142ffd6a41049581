use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::growth::{future_value_lump_sum, solve_annuity_payment};
use crate::planning::projection::{
    derive_target_corpus, project_corpus, TargetCorpus, SAFE_WITHDRAWAL_RATE,
};
use crate::profile::MemberFinancialProfile;
use crate::types::{
    checked_add, checked_div, checked_mul, checked_sub, round_half_up, with_metadata,
    ComputationOutput, Money, Percent, Rate,
};
use crate::PensionResult;

/// Step-ups applied to the current monthly contribution, in percent.
pub const IMPACT_INCREASES: [u32; 5] = [0, 10, 20, 50, 100];

const CATCH_UP_AGE: u32 = 50;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContributionImpact {
    pub increase_pct: u32,
    pub monthly_contribution: Money,
    pub projected_corpus: Money,
    /// Extra retirement income per month this level buys at the safe
    /// withdrawal rate.
    pub additional_monthly_income: Money,
}

/// Annual US tax-advantaged contribution limits (2024 plan year).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContributionLimits {
    pub plan_year: u16,
    pub limit_401k: Money,
    pub catch_up_401k: Money,
    pub total_401k: Money,
    pub limit_ira: Money,
    pub catch_up_ira: Money,
    pub total_ira: Money,
    pub total_annual: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContributionGap {
    pub target_corpus: Money,
    pub projected_corpus: Money,
    pub on_track: bool,
    pub surplus: Money,
    pub gap: Money,
    pub additional_annual_contribution: Money,
    pub additional_monthly_contribution: Money,
    /// Additional contribution as a share of income; `None` without income.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pct_of_income: Option<Percent>,
    /// The closing contribution would breach the member's annual limits.
    pub exceeds_limits: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContributionPlan {
    pub target: TargetCorpus,
    pub current_monthly_contribution: Money,
    pub required_monthly_contribution: Money,
    pub savings_rate_pct: Percent,
    pub impact: Vec<ContributionImpact>,
    pub gap: ContributionGap,
    pub limits: ContributionLimits,
}

/// What the pot supports once the member has stopped saving.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetiredDrawdown {
    pub current_savings: Money,
    pub withdrawal_rate: Rate,
    /// Annual draw at the safe withdrawal rate.
    pub sustainable_withdrawal: Money,
    pub monthly_withdrawal: Money,
    /// Annual draw as a whole percentage of income; `None` without income.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub income_replacement_pct: Option<Percent>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum ContributionAdvice {
    Accumulating(ContributionPlan),
    Retired(RetiredDrawdown),
}

// ---------------------------------------------------------------------------
// Core functions
// ---------------------------------------------------------------------------

/// Monthly member contribution that, with current savings, reaches `target`
/// at the retirement goal.
pub fn required_monthly_contribution(
    profile: &MemberFinancialProfile,
    target: Money,
) -> PensionResult<Money> {
    let years = profile.years_to_retirement()?;
    let rate = profile.expected_return_rate;
    let savings_fv = future_value_lump_sum(profile.current_savings, rate, years)?;
    let needed = checked_sub(target, savings_fv, "contribution_target")?;
    if needed <= Decimal::ZERO {
        return Ok(Decimal::ZERO);
    }
    let annual = solve_annuity_payment(needed, rate, years)?;
    Ok((annual / dec!(12)).max(Decimal::ZERO))
}

/// Monthly contribution over monthly income. `None` when there is no income.
pub fn savings_rate(profile: &MemberFinancialProfile) -> PensionResult<Option<Rate>> {
    if profile.annual_income <= Decimal::ZERO {
        return Ok(None);
    }
    let monthly_income = profile.annual_income / dec!(12);
    checked_div(profile.monthly_contribution(), monthly_income, "savings_rate").map(Some)
}

/// Savings rate in percent, one decimal. Zero without income.
pub fn savings_rate_pct(profile: &MemberFinancialProfile) -> PensionResult<Percent> {
    match savings_rate(profile)? {
        Some(rate) => Ok(round_half_up(
            checked_mul(rate, dec!(100), "savings_rate")?,
            1,
        )),
        None => Ok(Decimal::ZERO),
    }
}

/// Corpus at each contribution step-up in [`IMPACT_INCREASES`].
pub fn contribution_impact(
    profile: &MemberFinancialProfile,
) -> PensionResult<Vec<ContributionImpact>> {
    let base_monthly = profile.monthly_contribution();
    IMPACT_INCREASES
        .iter()
        .map(|&increase| -> PensionResult<ContributionImpact> {
            let step = Decimal::ONE + Decimal::from(increase) / dec!(100);
            let monthly = checked_mul(base_monthly, step, "monthly_contribution")?;
            let variant = profile.clone().with_monthly_contribution(monthly);
            let projected = project_corpus(&variant)?.projected_corpus;
            Ok(ContributionImpact {
                increase_pct: increase,
                monthly_contribution: monthly,
                projected_corpus: projected,
                additional_monthly_income: projected * SAFE_WITHDRAWAL_RATE / dec!(12),
            })
        })
        .collect()
}

pub fn contribution_limits(age: u32) -> ContributionLimits {
    let limit_401k = dec!(23000);
    let limit_ira = dec!(7000);
    let (catch_up_401k, catch_up_ira) = if age >= CATCH_UP_AGE {
        (dec!(7500), dec!(1000))
    } else {
        (Decimal::ZERO, Decimal::ZERO)
    };
    let total_401k = limit_401k + catch_up_401k;
    let total_ira = limit_ira + catch_up_ira;
    ContributionLimits {
        plan_year: 2024,
        limit_401k,
        catch_up_401k,
        total_401k,
        limit_ira,
        catch_up_ira,
        total_ira,
        total_annual: total_401k + total_ira,
    }
}

/// Gap between the projected corpus and `target`, with the level annual
/// top-up that closes it.
pub fn contribution_gap(
    profile: &MemberFinancialProfile,
    target: Money,
) -> PensionResult<ContributionGap> {
    let projection = project_corpus(profile)?;
    let projected = projection.projected_corpus;
    let difference = checked_sub(target, projected, "contribution_gap")?;

    if difference <= Decimal::ZERO {
        return Ok(ContributionGap {
            target_corpus: target,
            projected_corpus: projected,
            on_track: true,
            surplus: -difference,
            gap: Decimal::ZERO,
            additional_annual_contribution: Decimal::ZERO,
            additional_monthly_contribution: Decimal::ZERO,
            pct_of_income: None,
            exceeds_limits: false,
        });
    }

    let additional_annual = solve_annuity_payment(
        difference,
        profile.expected_return_rate,
        projection.years_to_retirement,
    )?;
    let pct_of_income = if profile.annual_income > Decimal::ZERO {
        let share = checked_div(additional_annual, profile.annual_income, "pct_of_income")?;
        Some(round_half_up(checked_mul(share, dec!(100), "pct_of_income")?, 1))
    } else {
        None
    };
    let limits = contribution_limits(profile.age);
    let planned_annual = checked_add(
        profile.annual_contribution(),
        additional_annual,
        "additional_annual_contribution",
    )?;

    Ok(ContributionGap {
        target_corpus: target,
        projected_corpus: projected,
        on_track: false,
        surplus: Decimal::ZERO,
        gap: difference,
        additional_annual_contribution: additional_annual,
        additional_monthly_contribution: additional_annual / dec!(12),
        pct_of_income,
        exceeds_limits: planned_annual > limits.total_annual,
    })
}

/// Drawdown capacity of a member at or past the retirement goal.
pub fn retired_drawdown(profile: &MemberFinancialProfile) -> PensionResult<RetiredDrawdown> {
    let sustainable = profile.current_savings * SAFE_WITHDRAWAL_RATE;
    let income_replacement_pct = if profile.annual_income > Decimal::ZERO {
        let share = checked_div(sustainable, profile.annual_income, "income_replacement")?;
        Some(round_half_up(
            checked_mul(share, dec!(100), "income_replacement")?,
            0,
        ))
    } else {
        None
    };
    Ok(RetiredDrawdown {
        current_savings: profile.current_savings,
        withdrawal_rate: SAFE_WITHDRAWAL_RATE,
        sustainable_withdrawal: round_half_up(sustainable, 2),
        monthly_withdrawal: round_half_up(sustainable / dec!(12), 2),
        income_replacement_pct,
    })
}

fn accumulation_plan(
    profile: &MemberFinancialProfile,
    warnings: &mut Vec<String>,
) -> PensionResult<ContributionPlan> {
    let target = derive_target_corpus(profile)?;
    let required = required_monthly_contribution(profile, target.target)?;
    let gap = contribution_gap(profile, target.target)?;
    let impact = contribution_impact(profile)?;
    let limits = contribution_limits(profile.age);

    if profile.annual_income <= Decimal::ZERO {
        warnings.push("No income on record; savings rate reported as 0".into());
    }
    if gap.exceeds_limits {
        warnings.push(format!(
            "Closing the gap needs more than the {} annual limit of {}",
            limits.plan_year, limits.total_annual
        ));
    }

    Ok(ContributionPlan {
        target,
        current_monthly_contribution: profile.monthly_contribution(),
        required_monthly_contribution: required,
        savings_rate_pct: savings_rate_pct(profile)?,
        impact,
        gap,
        limits,
    })
}

/// Contribution report: required level, savings rate, step-up impact, gap
/// and limits. Members at or past their goal get drawdown capacity instead.
pub fn plan_contributions(
    profile: &MemberFinancialProfile,
) -> PensionResult<ComputationOutput<ContributionAdvice>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    profile.validate()?;
    let (methodology, advice) = if profile.retirement_age_goal <= profile.age {
        log::debug!(
            "member {}: at or past goal age {}, reporting drawdown",
            profile.member_id,
            profile.retirement_age_goal
        );
        warnings.push("Member is already retired; no contribution plan applies".into());
        if profile.annual_income <= Decimal::ZERO {
            warnings.push("No income on record; income replacement not reported".into());
        }
        (
            "Retired drawdown (current savings at the safe withdrawal rate)",
            ContributionAdvice::Retired(retired_drawdown(profile)?),
        )
    } else {
        (
            "Contribution solver (inverse ordinary annuity on the residual target)",
            ContributionAdvice::Accumulating(accumulation_plan(profile, &mut warnings)?),
        )
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        methodology,
        &serde_json::json!({
            "expected_return_rate": profile.expected_return_rate.to_string(),
            "retirement_age_goal": profile.retirement_age_goal,
            "impact_increases_pct": IMPACT_INCREASES,
            "safe_withdrawal_rate": SAFE_WITHDRAWAL_RATE.to_string(),
        }),
        warnings,
        elapsed,
        advice,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
