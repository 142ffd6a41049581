use pension_engine_core::portfolio::{allocation, rebalancing};
use pension_engine_core::risk::{
    generate_risk_alerts, AlertType, RiskAlert, RiskAlertEngine, RiskLevel, RiskRule, Severity,
};
use pension_engine_core::scenarios::{stress, what_if};
use pension_engine_core::{
    AllocationPlan, MemberFinancialProfile, PensionResult, RiskTolerance, WithdrawalStyle,
};
use pretty_assertions::assert_eq;
use proptest::prelude::{prop_assert, proptest};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn near_retiree() -> MemberFinancialProfile {
    MemberFinancialProfile::new("M-2001", 60, 63)
        .with_income(dec!(100000))
        .with_savings(dec!(50000))
        .with_monthly_contribution(dec!(200))
        .with_return_rate(dec!(0.05))
        .with_investment_type("Aggressive Growth")
        .with_diversity_score(20)
}

fn well_positioned() -> MemberFinancialProfile {
    MemberFinancialProfile::new("M-2002", 30, 65)
        .with_income(dec!(60000))
        .with_savings(dec!(50000))
        .with_annual_contribution(dec!(12000))
        .with_return_rate(dec!(0.07))
        .with_diversity_score(70)
        .with_allocation(AllocationPlan {
            stocks: dec!(75),
            bonds: dec!(15),
            cash: dec!(10),
        })
}

// ===========================================================================
// Risk alerts
// ===========================================================================

#[test]
fn test_near_retiree_is_critical() {
    let out = generate_risk_alerts(&near_retiree()).unwrap();
    let report = &out.result;
    assert_eq!(report.total_alerts, 5);
    assert_eq!(report.risk_level, RiskLevel::Critical);
    assert!(report.alerts.iter().all(|a| a.severity == Severity::High));
    assert_eq!(report.action_plan[0].priority, Severity::High);
}

#[test]
fn test_well_positioned_member_is_low_risk() {
    let report = RiskAlertEngine::standard()
        .evaluate(&well_positioned())
        .unwrap();
    assert_eq!(report.total_alerts, 0);
    assert_eq!(report.risk_level, RiskLevel::Low);
    assert_eq!(report.action_plan.len(), 1);
    assert_eq!(report.action_plan[0].category, "Maintenance");
}

struct NoEmployerMatchRule;

impl RiskRule for NoEmployerMatchRule {
    fn name(&self) -> &'static str {
        "no_employer_match"
    }

    fn evaluate(&self, profile: &MemberFinancialProfile) -> PensionResult<Option<RiskAlert>> {
        if profile.employer_contribution() > Decimal::ZERO {
            return Ok(None);
        }
        Ok(Some(RiskAlert {
            alert_type: AlertType::ContributionRate,
            severity: Severity::Medium,
            title: "No Employer Contribution".into(),
            description: "No employer money is recorded for this member.".into(),
            metrics: serde_json::json!({}),
            recommendations: vec!["Check employer match eligibility".into()],
        }))
    }
}

#[test]
fn test_engine_accepts_custom_rules() {
    let engine = RiskAlertEngine::empty().with_rule(NoEmployerMatchRule);
    assert_eq!(engine.rule_names(), vec!["no_employer_match"]);

    let report = engine.evaluate(&well_positioned()).unwrap();
    assert_eq!(report.total_alerts, 1);
    assert_eq!(report.risk_level, RiskLevel::Medium);

    let matched = well_positioned().with_employer_contribution(dec!(3000));
    assert_eq!(engine.evaluate(&matched).unwrap().total_alerts, 0);
}

// ===========================================================================
// Portfolio
// ===========================================================================

#[test]
fn test_near_retiree_is_told_to_derisk() {
    let rec = allocation::recommend_portfolio(&near_retiree()).unwrap();
    assert!(rec.current_is_estimated);
    assert!(rec.deltas.stocks < Decimal::ZERO);
    assert!(rec.rationale.contains("reducing equity"), "{}", rec.rationale);

    let plan = rebalancing::rebalancing_plan(&near_retiree()).unwrap();
    assert!(plan.needs_rebalancing);
    assert_eq!(
        plan.direction,
        Some(rebalancing::RebalanceDirection::DecreaseEquity)
    );
}

// ===========================================================================
// Scenarios
// ===========================================================================

#[test]
fn test_what_if_ranked_best_first() {
    let out = what_if::simulate_what_if(&well_positioned()).unwrap();
    let scenarios = &out.result.scenarios;
    assert!(!scenarios.is_empty());
    assert!(scenarios
        .iter()
        .all(|s| s.projected_value > out.result.baseline.projected_corpus));
    for pair in scenarios.windows(2) {
        assert!(pair[0].improvement_pct >= pair[1].improvement_pct);
    }
    // No employer money to double, so that scenario is filtered out.
    assert!(scenarios
        .iter()
        .all(|s| s.details.changed_input != what_if::ScenarioInput::EmployerContribution));
}

#[test]
fn test_what_if_zero_baseline() {
    let member = MemberFinancialProfile::new("M-2003", 40, 65).with_income(dec!(50000));
    let out = what_if::simulate_what_if(&member).unwrap();
    assert_eq!(out.result.baseline.projected_corpus, Decimal::ZERO);
    assert_eq!(out.result.scenarios.len(), 1);
    assert_eq!(out.result.scenarios[0].improvement_pct, dec!(100));
    assert!(out.warnings.iter().any(|w| w.contains("Baseline corpus is zero")));
}

#[test]
fn test_sensitivity_grid_covers_every_adjustment() {
    let adjustments = what_if::SensitivityAdjustments::default();
    let grid = what_if::sensitivity_grid(&well_positioned(), &adjustments).unwrap();
    let requested = adjustments.contribution_changes.len()
        + adjustments.retirement_age_changes.len()
        + adjustments.return_rates.len();
    assert_eq!(grid.points.len() + grid.skipped.len(), requested);
    let best = grid.best.unwrap();
    let worst = grid.worst.unwrap();
    assert!(best.projected_value >= worst.projected_value);
}

#[test]
fn test_stress_report_shape() {
    let out = stress::stress_test(&well_positioned(), &stress::StressParameters::default()).unwrap();
    let report = &out.result;
    assert_eq!(report.total_tests, 7);
    assert_eq!(report.tests.len(), 7);
    assert!(report.passed_tests <= report.total_tests);

    let market: Vec<_> = report
        .tests
        .iter()
        .filter(|t| t.kind == stress::StressKind::Market)
        .collect();
    assert_eq!(market.len(), 4);
    let recession = market.last().unwrap();
    assert!(recession.projected_value < report.baseline_value);
}

// ===========================================================================
// Properties
// ===========================================================================

proptest! {
    #![proptest_config(proptest::test_runner::Config::with_cases(128))]

    #[test]
    fn prop_recommended_allocation_sums_to_100(
        age in 1u32..=100,
        horizon in 0u32..45,
        tolerance in 0u8..3,
        style in 0u8..5,
        defined_benefit in proptest::bool::ANY,
    ) {
        let tolerance = match tolerance {
            0 => RiskTolerance::Low,
            1 => RiskTolerance::Medium,
            _ => RiskTolerance::High,
        };
        let mut member = MemberFinancialProfile::new("P", age, age + horizon)
            .with_risk_tolerance(tolerance);
        member = match style {
            0 => member.with_withdrawal_style(WithdrawalStyle::Flexible),
            1 => member.with_withdrawal_style(WithdrawalStyle::Dynamic),
            2 => member.with_withdrawal_style(WithdrawalStyle::Fixed),
            3 => member.with_withdrawal_style(WithdrawalStyle::Bucket),
            _ => member,
        };
        if defined_benefit {
            member = member.with_pension_type("Defined Benefit");
        }

        let plan = allocation::recommended_allocation(&member);
        prop_assert!(plan.is_balanced(), "{:?}", plan);
        for weight in [plan.stocks, plan.bonds, plan.cash] {
            prop_assert!(weight >= Decimal::ZERO && weight <= dec!(100));
        }
    }
}
