use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::rules::{
    AssetAllocationRule, ContributionRateRule, DiversityRule, LongevityRule, RiskRule,
    SavingsGapRule, SequenceOfReturnsRule, WithdrawalRateRule,
};
use crate::profile::MemberFinancialProfile;
use crate::types::{with_metadata, ComputationOutput};
use crate::PensionResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertType {
    AssetAllocation,
    PortfolioDiversity,
    SavingsGap,
    ContributionRate,
    SequenceOfReturns,
    WithdrawalRate,
    LongevityRisk,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAlert {
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub severity: Severity,
    pub title: String,
    pub description: String,
    pub metrics: serde_json::Value,
    pub recommendations: Vec<String>,
}

/// Follow-up task derived from the alerts raised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionItem {
    pub priority: Severity,
    pub category: String,
    pub action: String,
    pub timeline: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskReport {
    pub member_id: String,
    pub total_alerts: usize,
    pub risk_level: RiskLevel,
    pub alerts: Vec<RiskAlert>,
    pub action_plan: Vec<ActionItem>,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Ordered set of risk rules.
pub struct RiskAlertEngine {
    rules: Vec<Box<dyn RiskRule + Send + Sync>>,
}

impl RiskAlertEngine {
    /// Engine with no rules registered.
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// The five standard checks in their canonical order.
    pub fn standard() -> Self {
        Self::empty()
            .with_rule(AssetAllocationRule)
            .with_rule(DiversityRule)
            .with_rule(SavingsGapRule)
            .with_rule(ContributionRateRule)
            .with_rule(SequenceOfReturnsRule)
            .with_rule(WithdrawalRateRule)
            .with_rule(LongevityRule)
    }

    pub fn with_rule(mut self, rule: impl RiskRule + Send + Sync + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Run every rule against a validated profile.
    pub fn evaluate(&self, profile: &MemberFinancialProfile) -> PensionResult<RiskReport> {
        profile.validate()?;

        let mut alerts = Vec::new();
        for rule in &self.rules {
            if let Some(alert) = rule.evaluate(profile)? {
                log::debug!(
                    "member {}: rule {} raised {:?}",
                    profile.member_id,
                    rule.name(),
                    alert.severity
                );
                alerts.push(alert);
            }
        }

        Ok(RiskReport {
            member_id: profile.member_id.clone(),
            total_alerts: alerts.len(),
            risk_level: overall_risk_level(&alerts),
            action_plan: action_plan(&alerts),
            alerts,
        })
    }
}

impl Default for RiskAlertEngine {
    fn default() -> Self {
        Self::standard()
    }
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

pub fn overall_risk_level(alerts: &[RiskAlert]) -> RiskLevel {
    let high = alerts
        .iter()
        .filter(|a| a.severity == Severity::High)
        .count();
    let medium = alerts
        .iter()
        .filter(|a| a.severity == Severity::Medium)
        .count();
    match (high, medium) {
        (h, _) if h >= 2 => RiskLevel::Critical,
        (1, _) => RiskLevel::High,
        (_, m) if m >= 1 => RiskLevel::Medium,
        _ => RiskLevel::Low,
    }
}

fn action_for(alert_type: AlertType) -> ActionItem {
    let (priority, category, action, timeline) = match alert_type {
        AlertType::WithdrawalRate => (
            Severity::High,
            "Income Planning",
            "Review retirement income strategy immediately",
            "Within 30 days",
        ),
        AlertType::LongevityRisk => (
            Severity::High,
            "Income Planning",
            "Secure guaranteed income for later retirement years",
            "Within 90 days",
        ),
        AlertType::SavingsGap => (
            Severity::High,
            "Savings Strategy",
            "Increase retirement contributions",
            "Next payroll cycle",
        ),
        AlertType::ContributionRate => (
            Severity::Medium,
            "Savings Strategy",
            "Raise contribution rate toward the age-band target",
            "Next payroll cycle",
        ),
        AlertType::AssetAllocation => (
            Severity::Medium,
            "Portfolio Management",
            "Rebalance investment allocation",
            "Within 60 days",
        ),
        AlertType::PortfolioDiversity => (
            Severity::Medium,
            "Portfolio Management",
            "Broaden holdings across asset classes",
            "Within 60 days",
        ),
        AlertType::SequenceOfReturns => (
            Severity::High,
            "Risk Management",
            "Implement de-risking strategy",
            "Within 90 days",
        ),
    };
    ActionItem {
        priority,
        category: category.into(),
        action: action.into(),
        timeline: timeline.into(),
    }
}

/// One follow-up per alert type raised, highest priority first. With no
/// alerts the plan is a single maintenance review.
pub fn action_plan(alerts: &[RiskAlert]) -> Vec<ActionItem> {
    let mut seen: Vec<AlertType> = Vec::new();
    let mut plan: Vec<ActionItem> = Vec::new();
    for alert in alerts {
        if !seen.contains(&alert.alert_type) {
            seen.push(alert.alert_type);
            plan.push(action_for(alert.alert_type));
        }
    }
    if plan.is_empty() {
        plan.push(ActionItem {
            priority: Severity::Low,
            category: "Maintenance".into(),
            action: "Continue current strategy with periodic reviews".into(),
            timeline: "Annual review".into(),
        });
    }
    // Stable, so rule order is kept within a priority.
    plan.sort_by(|a, b| b.priority.cmp(&a.priority));
    plan
}

/// Risk report for one member using the standard rule set.
pub fn generate_risk_alerts(
    profile: &MemberFinancialProfile,
) -> PensionResult<ComputationOutput<RiskReport>> {
    let start = Instant::now();
    let engine = RiskAlertEngine::standard();
    let report = engine.evaluate(profile)?;

    let mut warnings: Vec<String> = Vec::new();
    if profile.retirement_age_goal <= profile.age {
        warnings.push(
            "Member is at or past the retirement goal; horizon-based rules were skipped".into(),
        );
    }
    if profile.annual_income.is_zero() {
        warnings.push("No income on record; contribution-rate rule was skipped".into());
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Rule-based risk alerts (independent threshold rules, severity roll-up)",
        &serde_json::json!({
            "rules": engine.rule_names(),
            "critical_threshold_high_alerts": 2,
        }),
        warnings,
        elapsed,
        report,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn alert(alert_type: AlertType, severity: Severity) -> RiskAlert {
        RiskAlert {
            alert_type,
            severity,
            title: String::new(),
            description: String::new(),
            metrics: serde_json::Value::Null,
            recommendations: Vec::new(),
        }
    }

    #[test]
    fn test_overall_level_ladder() {
        assert_eq!(overall_risk_level(&[]), RiskLevel::Low);
        assert_eq!(
            overall_risk_level(&[alert(AlertType::SavingsGap, Severity::Medium)]),
            RiskLevel::Medium
        );
        assert_eq!(
            overall_risk_level(&[
                alert(AlertType::SavingsGap, Severity::High),
                alert(AlertType::AssetAllocation, Severity::Medium),
            ]),
            RiskLevel::High
        );
        assert_eq!(
            overall_risk_level(&[
                alert(AlertType::SavingsGap, Severity::High),
                alert(AlertType::SequenceOfReturns, Severity::High),
            ]),
            RiskLevel::Critical
        );
        assert_eq!(
            overall_risk_level(&[alert(AlertType::PortfolioDiversity, Severity::Low)]),
            RiskLevel::Low
        );
    }

    #[test]
    fn test_action_plan_fallback() {
        let plan = action_plan(&[]);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].category, "Maintenance");
        assert_eq!(plan[0].priority, Severity::Low);
    }

    #[test]
    fn test_action_plan_sorted_by_priority() {
        let plan = action_plan(&[
            alert(AlertType::AssetAllocation, Severity::Medium),
            alert(AlertType::SavingsGap, Severity::High),
        ]);
        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].action, "Increase retirement contributions");
        assert_eq!(plan[1].timeline, "Within 60 days");
    }

    #[test]
    fn test_standard_engine_order() {
        assert_eq!(
            RiskAlertEngine::standard().rule_names(),
            vec![
                "asset_allocation",
                "portfolio_diversity",
                "savings_gap",
                "contribution_rate",
                "sequence_of_returns",
                "withdrawal_rate",
                "longevity",
            ]
        );
    }

    #[test]
    fn test_empty_engine_reports_low() {
        let profile = MemberFinancialProfile::new("M", 58, 62).with_income(dec!(50000));
        let report = RiskAlertEngine::empty().evaluate(&profile).unwrap();
        assert_eq!(report.total_alerts, 0);
        assert_eq!(report.risk_level, RiskLevel::Low);
    }

    #[test]
    fn test_retired_member_gets_income_alerts() {
        let retiree = MemberFinancialProfile::new("M", 70, 65)
            .with_income(dec!(40000))
            .with_savings(dec!(200000))
            .with_investment_type("Balanced");
        let report = RiskAlertEngine::standard().evaluate(&retiree).unwrap();
        let types: Vec<AlertType> = report.alerts.iter().map(|a| a.alert_type).collect();
        assert!(types.contains(&AlertType::WithdrawalRate));
        assert!(types.contains(&AlertType::LongevityRisk));
        assert!(!types.contains(&AlertType::SavingsGap));
        assert_eq!(report.risk_level, RiskLevel::Critical);
        assert_eq!(report.action_plan[0].category, "Income Planning");
    }

    #[test]
    fn test_alert_serializes_screaming_case() {
        let v = serde_json::to_value(alert(AlertType::SequenceOfReturns, Severity::High)).unwrap();
        assert_eq!(v["type"], "SEQUENCE_OF_RETURNS");
        assert_eq!(v["severity"], "HIGH");
    }
}
