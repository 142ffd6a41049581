use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;

use super::alerts::{AlertType, RiskAlert, Severity};
use crate::growth::solve_annuity_payment;
use crate::planning::projection::{project_corpus, SAFE_WITHDRAWAL_RATE};
use crate::profile::{MemberFinancialProfile, RiskTolerance};
use crate::types::{checked_div, checked_mul, round_half_up, round_money, Percent, Rate};
use crate::PensionResult;

/// A single independent risk check.
pub trait RiskRule {
    /// Stable identifier used in logs and report assumptions.
    fn name(&self) -> &'static str;

    /// `Ok(None)` when the member passes the check.
    fn evaluate(&self, profile: &MemberFinancialProfile) -> PensionResult<Option<RiskAlert>>;
}

/// Equity share suited to the member's age and tolerance.
pub fn recommended_equity_pct(tolerance: RiskTolerance, age: u32) -> Percent {
    let age = Decimal::from(age);
    match tolerance {
        RiskTolerance::Low => (dec!(100) - age).max(dec!(20)),
        RiskTolerance::Medium => (dec!(110) - age).max(dec!(30)),
        RiskTolerance::High => (dec!(120) - age).max(dec!(40)),
    }
}

/// Contribution rate (percent of income) suited to the member's age band.
pub fn recommended_contribution_rate_pct(age: u32) -> Percent {
    if age < 40 {
        dec!(15)
    } else if age < 50 {
        dec!(18)
    } else {
        dec!(20)
    }
}

fn years_ahead(profile: &MemberFinancialProfile) -> Option<u32> {
    profile
        .retirement_age_goal
        .checked_sub(profile.age)
        .filter(|y| *y > 0)
}

fn is_retired(profile: &MemberFinancialProfile) -> bool {
    profile.age >= profile.retirement_age_goal
}

// ---------------------------------------------------------------------------
// Asset allocation mismatch
// ---------------------------------------------------------------------------

pub struct AssetAllocationRule;

impl RiskRule for AssetAllocationRule {
    fn name(&self) -> &'static str {
        "asset_allocation"
    }

    fn evaluate(&self, profile: &MemberFinancialProfile) -> PensionResult<Option<RiskAlert>> {
        let current = profile.estimated_equity_pct();
        let recommended = recommended_equity_pct(profile.risk_tolerance, profile.age);
        let difference = (current - recommended).abs();
        if difference <= dec!(15) {
            return Ok(None);
        }

        let severity = if difference > dec!(30) {
            Severity::High
        } else {
            Severity::Medium
        };
        let over = current > recommended;
        let recommendations = if over {
            vec![
                "Reduce equity allocation to manage risk",
                "Increase bond allocation for stability",
                "Consider target-date funds for automatic rebalancing",
            ]
        } else {
            vec![
                "Increase equity allocation for growth potential",
                "Consider age-appropriate risk taking",
                "Review inflation protection strategies",
            ]
        };

        Ok(Some(RiskAlert {
            alert_type: AlertType::AssetAllocation,
            severity,
            title: if over {
                "Overexposed to Equity Risk".into()
            } else {
                "Too Conservative Allocation".into()
            },
            description: format!(
                "Current equity allocation ({}%) differs from recommended ({}%) by {} points",
                current, recommended, difference
            ),
            metrics: json!({
                "current_equity_pct": current,
                "recommended_equity_pct": recommended,
                "difference": difference,
                "is_overallocated": over,
            }),
            recommendations: recommendations.into_iter().map(String::from).collect(),
        }))
    }
}

// ---------------------------------------------------------------------------
// Low diversity
// ---------------------------------------------------------------------------

pub struct DiversityRule;

impl RiskRule for DiversityRule {
    fn name(&self) -> &'static str {
        "portfolio_diversity"
    }

    fn evaluate(&self, profile: &MemberFinancialProfile) -> PensionResult<Option<RiskAlert>> {
        let score = profile.diversity_score();
        if score >= 40 {
            return Ok(None);
        }
        let severity = if score < 25 {
            Severity::High
        } else {
            Severity::Medium
        };
        Ok(Some(RiskAlert {
            alert_type: AlertType::PortfolioDiversity,
            severity,
            title: "Concentrated Portfolio".into(),
            description: format!("Portfolio diversity score of {} is below 40", score),
            metrics: json!({
                "diversity_score": score,
                "threshold": 40,
            }),
            recommendations: vec![
                "Spread holdings across additional asset classes".into(),
                "Consider broad index or target-date funds".into(),
                "Reduce concentration in single holdings or sectors".into(),
            ],
        }))
    }
}

// ---------------------------------------------------------------------------
// Savings gap
// ---------------------------------------------------------------------------

/// Projected corpus against twelve years of income.
pub struct SavingsGapRule;

pub const SAVINGS_GAP_INCOME_MULTIPLE: Decimal = dec!(12);

impl RiskRule for SavingsGapRule {
    fn name(&self) -> &'static str {
        "savings_gap"
    }

    fn evaluate(&self, profile: &MemberFinancialProfile) -> PensionResult<Option<RiskAlert>> {
        let Some(years) = years_ahead(profile) else {
            return Ok(None);
        };
        let projected = project_corpus(profile)?.projected_corpus;
        let target = checked_mul(
            profile.annual_income,
            SAVINGS_GAP_INCOME_MULTIPLE,
            "annual_income",
        )?;
        if projected >= target {
            return Ok(None);
        }

        let gap = target - projected;
        let severity = if gap > target * dec!(0.30) {
            Severity::High
        } else {
            Severity::Medium
        };
        let extra_monthly =
            solve_annuity_payment(gap, profile.expected_return_rate, years)? / dec!(12);

        Ok(Some(RiskAlert {
            alert_type: AlertType::SavingsGap,
            severity,
            title: "Retirement Savings Shortfall".into(),
            description: format!(
                "Projected savings fall short of the retirement goal by {}",
                round_money(gap)
            ),
            metrics: json!({
                "current_savings": profile.current_savings,
                "projected_savings": round_money(projected),
                "target_savings": target,
                "savings_gap": round_money(gap),
                "additional_monthly_needed": round_money(extra_monthly),
                "years_to_retirement": years,
            }),
            recommendations: vec![
                format!("Increase monthly contributions by {}", round_money(extra_monthly)),
                "Consider maximizing employer match opportunities".into(),
                "Review and optimize investment allocations".into(),
                "Explore catch-up contributions if eligible".into(),
            ],
        }))
    }
}

// ---------------------------------------------------------------------------
// Low contribution rate
// ---------------------------------------------------------------------------

/// Member plus employer contributions as a share of income.
pub struct ContributionRateRule;

impl RiskRule for ContributionRateRule {
    fn name(&self) -> &'static str {
        "contribution_rate"
    }

    fn evaluate(&self, profile: &MemberFinancialProfile) -> PensionResult<Option<RiskAlert>> {
        if profile.annual_income <= Decimal::ZERO {
            return Ok(None);
        }
        let share = checked_div(
            profile.total_annual_contribution(),
            profile.annual_income,
            "contribution_rate",
        )?;
        let actual = round_half_up(checked_mul(share, dec!(100), "contribution_rate")?, 1);
        let recommended = recommended_contribution_rate_pct(profile.age);
        if actual >= recommended {
            return Ok(None);
        }
        let severity = if actual < recommended * dec!(0.6) {
            Severity::High
        } else {
            Severity::Medium
        };
        Ok(Some(RiskAlert {
            alert_type: AlertType::ContributionRate,
            severity,
            title: "Contribution Rate Below Target".into(),
            description: format!(
                "Contributing {}% of income against a recommended {}% for age {}",
                actual, recommended, profile.age
            ),
            metrics: json!({
                "actual_rate_pct": actual,
                "recommended_rate_pct": recommended,
                "annual_contribution": profile.total_annual_contribution(),
            }),
            recommendations: vec![
                format!("Gradually increase contributions to {}% of income", recommended),
                "Capture the full employer match".into(),
                "Automate annual contribution step-ups".into(),
            ],
        }))
    }
}

// ---------------------------------------------------------------------------
// Sequence-of-returns
// ---------------------------------------------------------------------------

/// Heavy equity exposure with a short horizon.
pub struct SequenceOfReturnsRule;

impl RiskRule for SequenceOfReturnsRule {
    fn name(&self) -> &'static str {
        "sequence_of_returns"
    }

    fn evaluate(&self, profile: &MemberFinancialProfile) -> PensionResult<Option<RiskAlert>> {
        let Some(years) = years_ahead(profile) else {
            return Ok(None);
        };
        let equity = profile.estimated_equity_pct();
        if years > 10 || equity <= dec!(60) {
            return Ok(None);
        }
        let severity = if years <= 5 {
            Severity::High
        } else {
            Severity::Medium
        };
        let equity_value = checked_mul(profile.current_savings, equity, "equity_value")? / dec!(100);
        Ok(Some(RiskAlert {
            alert_type: AlertType::SequenceOfReturns,
            severity,
            title: "High Market Risk Near Retirement".into(),
            description: format!(
                "{}% equity allocation with only {} years to retirement",
                equity, years
            ),
            metrics: json!({
                "equity_pct": equity,
                "equity_value": round_money(equity_value),
                "years_to_retirement": years,
                // 30% drawdown on the equity sleeve.
                "potential_loss": round_money(equity_value * dec!(0.30)),
            }),
            recommendations: vec![
                "Begin shifting to more conservative allocations".into(),
                "Consider a bond ladder for near-term expenses".into(),
                "Implement systematic rebalancing strategy".into(),
                "Review sequence of returns risk".into(),
            ],
        }))
    }
}

// ---------------------------------------------------------------------------
// Retired: withdrawal capacity
// ---------------------------------------------------------------------------

/// Income share a retired member's pot should replace at the safe rate.
pub const RETIRED_REPLACEMENT_FLOOR: Rate = dec!(0.70);

/// Safe withdrawal from the pot against the member's income, once retired.
pub struct WithdrawalRateRule;

impl RiskRule for WithdrawalRateRule {
    fn name(&self) -> &'static str {
        "withdrawal_rate"
    }

    fn evaluate(&self, profile: &MemberFinancialProfile) -> PensionResult<Option<RiskAlert>> {
        if !is_retired(profile) || profile.annual_income <= Decimal::ZERO {
            return Ok(None);
        }
        let safe_withdrawal = profile.current_savings * SAFE_WITHDRAWAL_RATE;
        let floor = profile.annual_income * RETIRED_REPLACEMENT_FLOOR;
        if safe_withdrawal >= floor {
            return Ok(None);
        }
        // Below the floor the ratio is under one.
        let replacement_pct = round_half_up(
            checked_div(safe_withdrawal, profile.annual_income, "income_replacement")? * dec!(100),
            0,
        );
        Ok(Some(RiskAlert {
            alert_type: AlertType::WithdrawalRate,
            severity: Severity::High,
            title: "Insufficient Retirement Income".into(),
            description: format!(
                "Current savings only support {}% income replacement",
                replacement_pct
            ),
            metrics: json!({
                "safe_withdrawal_amount": round_half_up(safe_withdrawal, 0),
                "income_replacement_pct": replacement_pct,
                "shortfall": round_half_up(floor - safe_withdrawal, 0),
            }),
            recommendations: vec![
                "Consider delaying retirement".into(),
                "Reduce retirement expenses".into(),
                "Explore part-time work options".into(),
            ],
        }))
    }
}

// ---------------------------------------------------------------------------
// Retired: longevity
// ---------------------------------------------------------------------------

/// Share of income a retired member is assumed to draw each year.
pub const RETIRED_DRAW_SHARE: Rate = dec!(0.80);
pub const PLANNING_LIFE_EXPECTANCY: u32 = 90;

/// Drawing most of former income from the pot outpaces the safe rate.
pub struct LongevityRule;

impl RiskRule for LongevityRule {
    fn name(&self) -> &'static str {
        "longevity"
    }

    fn evaluate(&self, profile: &MemberFinancialProfile) -> PensionResult<Option<RiskAlert>> {
        if !is_retired(profile) || profile.annual_income <= Decimal::ZERO {
            return Ok(None);
        }
        let draw = profile.annual_income * RETIRED_DRAW_SHARE;
        if draw <= profile.current_savings * SAFE_WITHDRAWAL_RATE {
            return Ok(None);
        }
        // An empty or near-empty pot has no representable rate.
        let withdrawal_rate_pct = draw
            .checked_div(profile.current_savings)
            .and_then(|r| r.checked_mul(dec!(100)))
            .map(|pct| round_half_up(pct, 0));
        // Over the safe rate the pot lasts under 25 years.
        let years_remaining = round_half_up(profile.current_savings / draw, 0);

        Ok(Some(RiskAlert {
            alert_type: AlertType::LongevityRisk,
            severity: Severity::High,
            title: "Risk of Outliving Savings".into(),
            description: match withdrawal_rate_pct {
                Some(pct) => format!("Current withdrawal rate of {}% may deplete savings", pct),
                None => "Planned withdrawals exceed current savings".into(),
            },
            metrics: json!({
                "current_withdrawal_rate_pct": withdrawal_rate_pct,
                "safe_withdrawal_rate_pct": SAFE_WITHDRAWAL_RATE * dec!(100),
                "years_of_savings_remaining": years_remaining,
                "planning_life_expectancy": PLANNING_LIFE_EXPECTANCY,
            }),
            recommendations: vec![
                "Consider annuity products for guaranteed income".into(),
                "Reduce withdrawal rate if possible".into(),
                "Explore part-time work or delayed Social Security".into(),
                "Review healthcare cost planning".into(),
            ],
        }))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn default_profile() -> MemberFinancialProfile {
        MemberFinancialProfile::new("M-400", 45, 65)
            .with_income(dec!(60000))
            .with_savings(dec!(150000))
            .with_annual_contribution(dec!(12000))
            .with_return_rate(dec!(0.06))
            .with_investment_type("Balanced")
            .with_diversity_score(70)
    }

    // 1. Recommended equity
    #[test]
    fn test_recommended_equity_floors() {
        assert_eq!(recommended_equity_pct(RiskTolerance::Low, 30), dec!(70));
        assert_eq!(recommended_equity_pct(RiskTolerance::Low, 90), dec!(20));
        assert_eq!(recommended_equity_pct(RiskTolerance::Medium, 45), dec!(65));
        assert_eq!(recommended_equity_pct(RiskTolerance::High, 95), dec!(40));
    }

    // 2. Asset allocation
    #[test]
    fn test_allocation_within_band_is_quiet() {
        // balanced 60 vs medium 65
        assert!(AssetAllocationRule
            .evaluate(&default_profile())
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_allocation_overexposed_high() {
        // equity + low diversity = 90 vs low-tolerance max(20, 100-60) = 40
        let p = MemberFinancialProfile::new("M", 60, 65)
            .with_investment_type("Equity Growth")
            .with_diversity_score(20)
            .with_risk_tolerance(RiskTolerance::Low);
        let alert = AssetAllocationRule.evaluate(&p).unwrap().unwrap();
        assert_eq!(alert.severity, Severity::High);
        assert_eq!(alert.title, "Overexposed to Equity Risk");
        assert_eq!(alert.metrics["is_overallocated"], true);
    }

    #[test]
    fn test_allocation_too_conservative_medium() {
        // bond 20 vs high-tolerance max(40, 120-80) = 40 => diff 20
        let p = MemberFinancialProfile::new("M", 80, 85)
            .with_investment_type("Bond Fund")
            .with_risk_tolerance(RiskTolerance::High);
        let alert = AssetAllocationRule.evaluate(&p).unwrap().unwrap();
        assert_eq!(alert.severity, Severity::Medium);
        assert_eq!(alert.title, "Too Conservative Allocation");
    }

    // 3. Diversity
    #[test]
    fn test_diversity_thresholds() {
        let p = default_profile().with_diversity_score(40);
        assert!(DiversityRule.evaluate(&p).unwrap().is_none());
        let p = default_profile().with_diversity_score(30);
        assert_eq!(
            DiversityRule.evaluate(&p).unwrap().unwrap().severity,
            Severity::Medium
        );
        let p = default_profile().with_diversity_score(10);
        assert_eq!(
            DiversityRule.evaluate(&p).unwrap().unwrap().severity,
            Severity::High
        );
    }

    // 4. Savings gap
    #[test]
    fn test_savings_gap_high_when_far_short() {
        let p = MemberFinancialProfile::new("M", 55, 65)
            .with_income(dec!(100000))
            .with_savings(dec!(10000))
            .with_return_rate(dec!(0.05));
        let alert = SavingsGapRule.evaluate(&p).unwrap().unwrap();
        assert_eq!(alert.severity, Severity::High);
        assert_eq!(alert.metrics["target_savings"], "1200000");
        assert_eq!(alert.recommendations.len(), 4);
    }

    #[test]
    fn test_savings_gap_quiet_when_on_track() {
        let p = default_profile().with_savings(dec!(2000000));
        assert!(SavingsGapRule.evaluate(&p).unwrap().is_none());
    }

    #[test]
    fn test_savings_gap_skips_retired_member() {
        let p = MemberFinancialProfile::new("M", 70, 65).with_income(dec!(50000));
        assert!(SavingsGapRule.evaluate(&p).unwrap().is_none());
    }

    // 5. Contribution rate
    #[test]
    fn test_contribution_rate_bands() {
        assert_eq!(recommended_contribution_rate_pct(39), dec!(15));
        assert_eq!(recommended_contribution_rate_pct(40), dec!(18));
        assert_eq!(recommended_contribution_rate_pct(50), dec!(20));
    }

    #[test]
    fn test_contribution_rate_severity() {
        // 12000 / 60000 = 20% vs 18%: fine
        assert!(ContributionRateRule
            .evaluate(&default_profile())
            .unwrap()
            .is_none());
        // 6000 / 60000 = 10% < 0.6 * 18 = 10.8
        let p = default_profile().with_annual_contribution(dec!(6000));
        assert_eq!(
            ContributionRateRule.evaluate(&p).unwrap().unwrap().severity,
            Severity::High
        );
        // 9000 / 60000 = 15%
        let p = default_profile().with_annual_contribution(dec!(9000));
        assert_eq!(
            ContributionRateRule.evaluate(&p).unwrap().unwrap().severity,
            Severity::Medium
        );
    }

    #[test]
    fn test_contribution_rate_counts_employer() {
        let p = default_profile()
            .with_annual_contribution(dec!(6000))
            .with_employer_contribution(dec!(6000));
        assert!(ContributionRateRule.evaluate(&p).unwrap().is_none());
    }

    #[test]
    fn test_contribution_rate_skipped_without_income() {
        let p = default_profile().with_income(Decimal::ZERO);
        assert!(ContributionRateRule.evaluate(&p).unwrap().is_none());
    }

    // 6. Sequence of returns
    #[test]
    fn test_sequence_rule() {
        let near = MemberFinancialProfile::new("M", 61, 65)
            .with_savings(dec!(500000))
            .with_investment_type("Aggressive");
        let alert = SequenceOfReturnsRule.evaluate(&near).unwrap().unwrap();
        assert_eq!(alert.severity, Severity::High);
        assert_eq!(alert.metrics["potential_loss"], "120000.00");

        let mid = MemberFinancialProfile::new("M", 57, 65).with_investment_type("Aggressive");
        assert_eq!(
            SequenceOfReturnsRule.evaluate(&mid).unwrap().unwrap().severity,
            Severity::Medium
        );

        let far = MemberFinancialProfile::new("M", 40, 65).with_investment_type("Aggressive");
        assert!(SequenceOfReturnsRule.evaluate(&far).unwrap().is_none());

        let balanced = MemberFinancialProfile::new("M", 61, 65).with_investment_type("Balanced");
        assert!(SequenceOfReturnsRule.evaluate(&balanced).unwrap().is_none());
    }

    // 7. Overflow
    #[test]
    fn test_contribution_rate_on_tiny_income_is_an_error() {
        let p = default_profile().with_income(dec!(0.0000000000000000000001));
        assert!(matches!(
            ContributionRateRule.evaluate(&p),
            Err(crate::PensionError::InvalidAmount { .. })
        ));
    }

    #[test]
    fn test_savings_gap_on_huge_income_is_an_error() {
        let p = default_profile().with_income(Decimal::MAX / dec!(2));
        assert!(SavingsGapRule.evaluate(&p).is_err());
    }

    // 8. Retired members
    fn retiree(savings: Decimal) -> MemberFinancialProfile {
        MemberFinancialProfile::new("M-401", 67, 65)
            .with_income(dec!(60000))
            .with_savings(savings)
    }

    #[test]
    fn test_withdrawal_rate_flags_thin_pot() {
        // 500000 × 4% = 20000 = 33% of 60000
        let alert = WithdrawalRateRule
            .evaluate(&retiree(dec!(500000)))
            .unwrap()
            .unwrap();
        assert_eq!(alert.alert_type, AlertType::WithdrawalRate);
        assert_eq!(alert.severity, Severity::High);
        assert_eq!(alert.metrics["income_replacement_pct"], "33");
        assert_eq!(alert.metrics["shortfall"], "22000");
    }

    #[test]
    fn test_withdrawal_rate_quiet_when_pot_suffices() {
        // 1,050,000 × 4% = 42000 = 70%
        assert!(WithdrawalRateRule
            .evaluate(&retiree(dec!(1050000)))
            .unwrap()
            .is_none());
        assert!(WithdrawalRateRule
            .evaluate(&default_profile())
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_longevity_flags_high_draw() {
        // 48000 / 600000 = 8%
        let alert = LongevityRule.evaluate(&retiree(dec!(600000))).unwrap().unwrap();
        assert_eq!(alert.alert_type, AlertType::LongevityRisk);
        assert_eq!(alert.metrics["current_withdrawal_rate_pct"], "8");
        // 600000 / 48000 = 12.5
        assert_eq!(alert.metrics["years_of_savings_remaining"], "13");

        // 48000 <= 1,200,000 × 4%
        assert!(LongevityRule
            .evaluate(&retiree(dec!(1200000)))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_longevity_with_empty_pot() {
        let alert = LongevityRule.evaluate(&retiree(Decimal::ZERO)).unwrap().unwrap();
        assert!(alert.metrics["current_withdrawal_rate_pct"].is_null());
        assert_eq!(alert.description, "Planned withdrawals exceed current savings");
    }

    #[test]
    fn test_retired_rules_skip_savers() {
        assert!(LongevityRule.evaluate(&default_profile()).unwrap().is_none());
        let no_income = retiree(dec!(1000)).with_income(Decimal::ZERO);
        assert!(LongevityRule.evaluate(&no_income).unwrap().is_none());
        assert!(WithdrawalRateRule.evaluate(&no_income).unwrap().is_none());
    }
}
