use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::planning::contribution::{savings_rate, savings_rate_pct};
use crate::planning::projection::{derive_target_corpus, project_corpus, TargetCorpus};
use crate::profile::MemberFinancialProfile;
use crate::types::{
    checked_div, checked_mul, round_half_up, with_metadata, ComputationOutput, Money, Percent,
    Rate,
};
use crate::PensionResult;

const FULL_SCORE: Percent = dec!(100);
/// Highest score reported while any shortfall remains.
const SHORTFALL_CEILING: Percent = dec!(99.9);
const MIN_SAVINGS_RATE: Rate = dec!(0.15);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub priority: Priority,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub description: String,
    pub action: String,
    pub impact: String,
}

impl Recommendation {
    fn new(
        priority: Priority,
        kind: &str,
        title: &str,
        description: &str,
        action: &str,
        impact: &str,
    ) -> Self {
        Self {
            priority,
            kind: kind.into(),
            title: title.into(),
            description: description.into(),
            action: action.into(),
            impact: impact.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadinessScore {
    /// 0..=100, one decimal place.
    pub readiness_score: Percent,
    pub projected_corpus: Money,
    pub target: TargetCorpus,
    pub shortfall: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResult {
    pub readiness_score: Percent,
    pub projected_corpus: Money,
    pub target: TargetCorpus,
    pub shortfall: Money,
    pub savings_rate_pct: Percent,
    pub recommendations: Vec<Recommendation>,
}

// ---------------------------------------------------------------------------
// Core functions
// ---------------------------------------------------------------------------

/// Projected corpus as a percentage of the target corpus, capped at 100.
/// A zero target scores 100.
pub fn score(profile: &MemberFinancialProfile) -> PensionResult<ReadinessScore> {
    let projected = project_corpus(profile)?.projected_corpus;
    let target = derive_target_corpus(profile)?;

    if target.target <= Decimal::ZERO {
        return Ok(ReadinessScore {
            readiness_score: FULL_SCORE,
            projected_corpus: projected,
            target,
            shortfall: Decimal::ZERO,
        });
    }

    let shortfall = (target.target - projected).max(Decimal::ZERO);
    // At or over target is a full score; below it the ratio is under one.
    let raw = if projected >= target.target {
        FULL_SCORE
    } else {
        let ratio = checked_div(projected, target.target, "readiness_score")?;
        checked_mul(ratio, dec!(100), "readiness_score")?
    };
    let mut readiness_score = round_half_up(raw, 1);
    if shortfall > Decimal::ZERO && readiness_score >= FULL_SCORE {
        readiness_score = SHORTFALL_CEILING;
    }

    Ok(ReadinessScore {
        readiness_score,
        projected_corpus: projected,
        target,
        shortfall,
    })
}

/// Advice for a readiness score. Every applicable rule fires; at most one
/// contribution-increase rule does.
pub fn recommend(
    score: Percent,
    profile: &MemberFinancialProfile,
) -> PensionResult<Vec<Recommendation>> {
    let mut out = Vec::new();

    if score < dec!(50) {
        out.push(Recommendation::new(
            Priority::High,
            "contribution_increase",
            "Significantly Increase Contributions",
            "Your current savings rate may not meet retirement goals. Consider increasing contributions by 50-100%.",
            "Increase monthly contribution",
            "High",
        ));
    } else if score < dec!(75) {
        out.push(Recommendation::new(
            Priority::Medium,
            "contribution_increase",
            "Moderate Contribution Increase",
            "You're on a reasonable track but could improve. Consider increasing contributions by 20-30%.",
            "Increase monthly contribution",
            "Medium",
        ));
    }

    // Undefined without income, so the rule stays silent.
    if let Some(rate) = savings_rate(profile)? {
        if rate < MIN_SAVINGS_RATE {
            out.push(Recommendation::new(
                Priority::Medium,
                "savings_rate",
                "Improve Savings Rate",
                "Aim to save at least 15% of your salary for retirement.",
                "Review budget and increase savings",
                "Medium",
            ));
        }
    }

    if score >= dec!(80) {
        out.push(Recommendation::new(
            Priority::Low,
            "optimization",
            "Optimize Investment Allocation",
            "You're well on track! Consider optimizing your investment mix for better returns.",
            "Review investment portfolio",
            "Low",
        ));
    }

    log::debug!(
        "member {}: score {} produced {} recommendations",
        profile.member_id,
        score,
        out.len()
    );
    Ok(out)
}

/// Readiness score with recommendations.
pub fn assess_readiness(
    profile: &MemberFinancialProfile,
) -> PensionResult<ComputationOutput<ReadinessResult>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let scored = score(profile)?;
    if scored.target.target <= Decimal::ZERO {
        warnings.push(
            "Target corpus is zero (no salary or income goal); readiness reported as 100".into(),
        );
    }
    let recommendations = recommend(scored.readiness_score, profile)?;

    let output = ReadinessResult {
        readiness_score: scored.readiness_score,
        projected_corpus: scored.projected_corpus,
        target: scored.target,
        shortfall: scored.shortfall,
        savings_rate_pct: savings_rate_pct(profile)?,
        recommendations,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Retirement readiness (projected corpus / target corpus, capped at 100)",
        &serde_json::json!({
            "target_policy": output.target.policy,
            "min_savings_rate": MIN_SAVINGS_RATE.to_string(),
            "rounding": "1dp half away from zero",
        }),
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn default_profile() -> MemberFinancialProfile {
        MemberFinancialProfile::new("M-300", 40, 65)
            .with_income(dec!(80000))
            .with_savings(dec!(100000))
            .with_monthly_contribution(dec!(800))
            .with_return_rate(dec!(0.06))
    }

    fn kinds(recs: &[Recommendation]) -> Vec<&str> {
        recs.iter().map(|r| r.kind.as_str()).collect()
    }

    // 1. Score bounds
    #[test]
    fn test_score_in_range() {
        let s = score(&default_profile()).unwrap();
        assert!(s.readiness_score >= Decimal::ZERO);
        assert!(s.readiness_score <= dec!(100));
        assert!(s.shortfall >= Decimal::ZERO);
    }

    #[test]
    fn test_score_capped_when_over_target() {
        let rich = default_profile().with_savings(dec!(5000000));
        let s = score(&rich).unwrap();
        assert_eq!(s.readiness_score, dec!(100));
        assert_eq!(s.shortfall, Decimal::ZERO);
    }

    // 2. Zero target
    #[test]
    fn test_zero_target_scores_full() {
        let profile = MemberFinancialProfile::new("M-0", 45, 65);
        let s = score(&profile).unwrap();
        assert_eq!(s.readiness_score, dec!(100));
        assert_eq!(s.shortfall, Decimal::ZERO);

        let out = assess_readiness(&profile).unwrap();
        assert_eq!(out.warnings.len(), 1);
    }

    // 3. Near-miss holds below 100
    #[test]
    fn test_small_shortfall_never_scores_100() {
        // Target 1,000,000 from income goal 40,000; projected just short.
        let profile = MemberFinancialProfile::new("M-1", 64, 65)
            .with_savings(dec!(999990))
            .with_return_rate(Decimal::ZERO)
            .with_target_income(dec!(40000));
        let s = score(&profile).unwrap();
        assert_eq!(s.shortfall, dec!(10));
        assert_eq!(s.readiness_score, dec!(99.9));
    }

    #[test]
    fn test_tiny_salary_with_large_pot_scores_full() {
        let profile = MemberFinancialProfile::new("M-2", 40, 65)
            .with_salary(dec!(0.0000000000000000000001))
            .with_savings(dec!(10000000));
        let s = score(&profile).unwrap();
        assert_eq!(s.readiness_score, dec!(100));
        assert_eq!(s.shortfall, Decimal::ZERO);
    }

    // 4. Recommendation rules
    #[test]
    fn test_low_score_high_priority() {
        let recs = recommend(dec!(40), &default_profile()).unwrap();
        assert_eq!(recs[0].priority, Priority::High);
        assert_eq!(kinds(&recs), vec!["contribution_increase", "savings_rate"]);
    }

    #[test]
    fn test_mid_score_single_contribution_rule() {
        let recs = recommend(dec!(60), &default_profile()).unwrap();
        let contribution_rules = recs
            .iter()
            .filter(|r| r.kind == "contribution_increase")
            .count();
        assert_eq!(contribution_rules, 1);
        assert_eq!(recs[0].priority, Priority::Medium);
    }

    #[test]
    fn test_high_score_optimization() {
        let saver = default_profile().with_monthly_contribution(dec!(2000));
        let recs = recommend(dec!(85), &saver).unwrap();
        assert_eq!(kinds(&recs), vec!["optimization"]);
        assert_eq!(recs[0].priority, Priority::Low);
    }

    #[test]
    fn test_band_between_75_and_80_is_quiet() {
        let saver = default_profile().with_monthly_contribution(dec!(2000));
        assert!(recommend(dec!(77), &saver).unwrap().is_empty());
    }

    #[test]
    fn test_savings_rule_skipped_without_income() {
        let no_income = default_profile().with_income(Decimal::ZERO);
        let recs = recommend(dec!(90), &no_income).unwrap();
        assert_eq!(kinds(&recs), vec!["optimization"]);
    }

    // 5. Serialization
    #[test]
    fn test_recommendation_serializes_type_and_priority() {
        let recs = recommend(dec!(10), &default_profile()).unwrap();
        let v = serde_json::to_value(&recs[0]).unwrap();
        assert_eq!(v["priority"], "high");
        assert_eq!(v["type"], "contribution_increase");
    }
}
