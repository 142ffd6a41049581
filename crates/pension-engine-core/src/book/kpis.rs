use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::PensionError;
use crate::planning::readiness;
use crate::profile::{MemberFinancialProfile, RiskTolerance};
use crate::risk::{RiskAlertEngine, RiskLevel};
use crate::types::{
    checked_add, checked_mul, round_half_up, round_money, with_metadata, ComputationOutput, Money,
    Percent, Rate,
};
use crate::PensionResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelShare {
    pub level: RiskLevel,
    pub count: usize,
    pub pct: Percent,
}

/// A member left out of the aggregates, with the reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExcludedMember {
    pub member_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookKpis {
    pub total_members: usize,
    pub assets_under_management: Money,
    /// Mean expected return, as a percentage to 2 dp.
    pub average_return_pct: Percent,
    pub high_tolerance_members: usize,
    /// None when no member has a readiness score (all at or past goal).
    pub average_readiness_score: Option<Percent>,
    pub scored_members: usize,
    pub risk_distribution: Vec<LevelShare>,
    pub excluded: Vec<ExcludedMember>,
}

// ---------------------------------------------------------------------------
// Core functions
// ---------------------------------------------------------------------------

fn share(count: usize, total: usize) -> Percent {
    if total == 0 {
        return Decimal::ZERO;
    }
    round_half_up(
        Decimal::from(count as u64) / Decimal::from(total as u64) * dec!(100),
        1,
    )
}

/// Aggregate KPIs for an advisor's book of members.
///
/// Members failing validation, or whose risk or readiness figures cannot be
/// computed, are listed in `excluded` and contribute to no aggregate.
/// Members already at their retirement goal count everywhere except the
/// readiness average. Fails only when a book-wide sum leaves the decimal
/// range.
pub fn compute_book_kpis(profiles: &[MemberFinancialProfile]) -> PensionResult<BookKpis> {
    let engine = RiskAlertEngine::standard();

    let mut excluded = Vec::new();
    let mut aum = Decimal::ZERO;
    let mut return_sum: Rate = Decimal::ZERO;
    let mut high_tolerance = 0usize;
    let mut readiness_sum = Decimal::ZERO;
    let mut scored = 0usize;
    let mut levels = [0usize; 4];
    let mut included = 0usize;

    for profile in profiles {
        let exclude = |e: PensionError| ExcludedMember {
            member_id: profile.member_id.clone(),
            reason: e.to_string(),
        };
        // Risk evaluation validates the profile first.
        let report = match engine.evaluate(profile) {
            Ok(report) => report,
            Err(e) => {
                excluded.push(exclude(e));
                continue;
            }
        };
        // After validation, an age-range error only means no future goal.
        let readiness_score = match readiness::score(profile) {
            Ok(s) => Some(s.readiness_score),
            Err(PensionError::InvalidAgeRange { .. }) => None,
            Err(e) => {
                excluded.push(exclude(e));
                continue;
            }
        };

        included += 1;
        aum = checked_add(aum, profile.current_savings, "assets_under_management")?;
        return_sum = checked_add(return_sum, profile.expected_return_rate, "average_return")?;
        if profile.risk_tolerance == RiskTolerance::High {
            high_tolerance += 1;
        }
        let slot = match report.risk_level {
            RiskLevel::Low => 0,
            RiskLevel::Medium => 1,
            RiskLevel::High => 2,
            RiskLevel::Critical => 3,
        };
        levels[slot] += 1;

        if let Some(score) = readiness_score {
            readiness_sum += score;
            scored += 1;
        }
    }

    let average_return_pct = if included == 0 {
        Decimal::ZERO
    } else {
        let mean = return_sum / Decimal::from(included as u64);
        round_half_up(checked_mul(mean, dec!(100), "average_return")?, 2)
    };
    let average_readiness_score = if scored == 0 {
        None
    } else {
        Some(round_half_up(readiness_sum / Decimal::from(scored as u64), 1))
    };

    let risk_distribution = [
        RiskLevel::Low,
        RiskLevel::Medium,
        RiskLevel::High,
        RiskLevel::Critical,
    ]
    .into_iter()
    .zip(levels)
    .map(|(level, count)| LevelShare {
        level,
        count,
        pct: share(count, included),
    })
    .collect();

    log::debug!(
        "book kpis: {} included, {} excluded, {} scored",
        included,
        excluded.len(),
        scored
    );

    Ok(BookKpis {
        total_members: included,
        assets_under_management: round_money(aum),
        average_return_pct,
        high_tolerance_members: high_tolerance,
        average_readiness_score,
        scored_members: scored,
        risk_distribution,
        excluded,
    })
}

pub fn book_kpis(
    profiles: &[MemberFinancialProfile],
) -> PensionResult<ComputationOutput<BookKpis>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let kpis = compute_book_kpis(profiles)?;
    if profiles.is_empty() {
        warnings.push("Book is empty".into());
    }
    for member in &kpis.excluded {
        warnings.push(format!("Excluded {}: {}", member.member_id, member.reason));
    }
    if kpis.scored_members < kpis.total_members {
        warnings.push(format!(
            "{} member(s) at or past their retirement goal have no readiness score",
            kpis.total_members - kpis.scored_members
        ));
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Advisor book aggregates (AUM, mean return, readiness, risk distribution)",
        &serde_json::json!({
            "members_supplied": profiles.len(),
            "risk_rules": RiskAlertEngine::standard().rule_names(),
        }),
        warnings,
        elapsed,
        kpis,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
