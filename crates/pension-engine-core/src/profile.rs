use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::PensionError;
use crate::types::{checked_add, checked_mul, Money, Percent, Rate};
use crate::PensionResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Member's self-declared appetite for investment risk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskTolerance {
    #[serde(alias = "low", alias = "LOW")]
    Low,
    #[default]
    #[serde(alias = "medium", alias = "MEDIUM", alias = "Moderate", alias = "moderate")]
    Medium,
    #[serde(alias = "high", alias = "HIGH")]
    High,
}

/// How the member intends to draw down the pot once retired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WithdrawalStyle {
    #[serde(alias = "flexible")]
    Flexible,
    #[serde(alias = "dynamic")]
    Dynamic,
    #[serde(alias = "fixed")]
    Fixed,
    #[serde(alias = "bucket")]
    Bucket,
}

impl WithdrawalStyle {
    /// Equity adjustment applied by the portfolio optimizer.
    pub fn equity_tilt(self) -> Rate {
        match self {
            WithdrawalStyle::Flexible | WithdrawalStyle::Dynamic => dec!(0.03),
            WithdrawalStyle::Fixed | WithdrawalStyle::Bucket => dec!(-0.03),
        }
    }
}

/// Stocks / bonds / cash split, each on the 0..=100 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationPlan {
    pub stocks: Percent,
    pub bonds: Percent,
    pub cash: Percent,
}

impl AllocationPlan {
    pub fn total(&self) -> Percent {
        self.stocks
            .saturating_add(self.bonds)
            .saturating_add(self.cash)
    }

    /// Sums to 100 within a tenth of a point.
    pub fn is_balanced(&self) -> bool {
        (self.total() - dec!(100)).abs() <= dec!(0.1)
    }
}

/// Snapshot of a pension member's finances. Built per request and never
/// mutated by the calculators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberFinancialProfile {
    pub member_id: String,
    pub age: u32,
    pub retirement_age_goal: u32,
    #[serde(default)]
    pub annual_income: Money,
    #[serde(default, alias = "current_corpus", alias = "current_balance")]
    pub current_savings: Money,
    /// Member contribution per month. Derived from `annual_contribution` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_contribution: Option<Money>,
    /// Member contribution per year. Derived from `monthly_contribution` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annual_contribution: Option<Money>,
    /// Employer contribution per year.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employer_contribution: Option<Money>,
    #[serde(default)]
    pub expected_return_rate: Rate,
    #[serde(default)]
    pub risk_tolerance: RiskTolerance,
    /// Free-form fund label, e.g. "Aggressive Growth" or "Bond Index".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub investment_type: Option<String>,
    /// Free-form scheme label, e.g. "Defined Benefit".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pension_type: Option<String>,
    /// 0..=100. Treated as 50 when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub portfolio_diversity_score: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_retirement_income: Option<Money>,
    /// Falls back to `annual_income` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_salary: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub withdrawal_style: Option<WithdrawalStyle>,
    /// Stored allocation. Estimated from `investment_type` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_allocation: Option<AllocationPlan>,
}

pub const MAX_AGE: u32 = 100;
pub const NEUTRAL_DIVERSITY_SCORE: u32 = 50;

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

impl MemberFinancialProfile {
    pub fn new(member_id: impl Into<String>, age: u32, retirement_age_goal: u32) -> Self {
        Self {
            member_id: member_id.into(),
            age,
            retirement_age_goal,
            annual_income: Decimal::ZERO,
            current_savings: Decimal::ZERO,
            monthly_contribution: None,
            annual_contribution: None,
            employer_contribution: None,
            expected_return_rate: Decimal::ZERO,
            risk_tolerance: RiskTolerance::default(),
            investment_type: None,
            pension_type: None,
            portfolio_diversity_score: None,
            target_retirement_income: None,
            current_salary: None,
            withdrawal_style: None,
            current_allocation: None,
        }
    }

    pub fn with_income(mut self, annual_income: Money) -> Self {
        self.annual_income = annual_income;
        self
    }

    pub fn with_savings(mut self, current_savings: Money) -> Self {
        self.current_savings = current_savings;
        self
    }

    pub fn with_monthly_contribution(mut self, monthly: Money) -> Self {
        self.monthly_contribution = Some(monthly);
        self.annual_contribution = None;
        self
    }

    pub fn with_annual_contribution(mut self, annual: Money) -> Self {
        self.annual_contribution = Some(annual);
        self.monthly_contribution = None;
        self
    }

    pub fn with_employer_contribution(mut self, annual: Money) -> Self {
        self.employer_contribution = Some(annual);
        self
    }

    pub fn with_return_rate(mut self, rate: Rate) -> Self {
        self.expected_return_rate = rate;
        self
    }

    pub fn with_risk_tolerance(mut self, tolerance: RiskTolerance) -> Self {
        self.risk_tolerance = tolerance;
        self
    }

    pub fn with_investment_type(mut self, label: impl Into<String>) -> Self {
        self.investment_type = Some(label.into());
        self
    }

    pub fn with_pension_type(mut self, label: impl Into<String>) -> Self {
        self.pension_type = Some(label.into());
        self
    }

    pub fn with_diversity_score(mut self, score: u32) -> Self {
        self.portfolio_diversity_score = Some(score);
        self
    }

    pub fn with_target_income(mut self, income: Money) -> Self {
        self.target_retirement_income = Some(income);
        self
    }

    pub fn with_salary(mut self, salary: Money) -> Self {
        self.current_salary = Some(salary);
        self
    }

    pub fn with_withdrawal_style(mut self, style: WithdrawalStyle) -> Self {
        self.withdrawal_style = Some(style);
        self
    }

    pub fn with_allocation(mut self, plan: AllocationPlan) -> Self {
        self.current_allocation = Some(plan);
        self
    }
}

// ---------------------------------------------------------------------------
// Validation & derived values
// ---------------------------------------------------------------------------

fn non_negative(field: &str, value: Decimal) -> PensionResult<()> {
    if value < Decimal::ZERO {
        return Err(PensionError::InvalidAmount {
            field: field.into(),
            reason: format!("{} must be >= 0 (got {})", field, value),
        });
    }
    Ok(())
}

impl MemberFinancialProfile {
    /// Check field ranges. Does not require a future retirement age; see
    /// [`MemberFinancialProfile::years_to_retirement`].
    pub fn validate(&self) -> PensionResult<()> {
        if self.age == 0 || self.age > MAX_AGE {
            return Err(PensionError::InvalidAgeRange {
                field: "age".into(),
                reason: format!("age must be between 1 and {} (got {})", MAX_AGE, self.age),
            });
        }
        if self.retirement_age_goal > MAX_AGE {
            return Err(PensionError::InvalidAgeRange {
                field: "retirement_age_goal".into(),
                reason: format!(
                    "retirement_age_goal must be at most {} (got {})",
                    MAX_AGE, self.retirement_age_goal
                ),
            });
        }
        non_negative("annual_income", self.annual_income)?;
        non_negative("current_savings", self.current_savings)?;
        non_negative("expected_return_rate", self.expected_return_rate)?;
        let optional = [
            ("monthly_contribution", self.monthly_contribution),
            ("annual_contribution", self.annual_contribution),
            ("employer_contribution", self.employer_contribution),
            ("target_retirement_income", self.target_retirement_income),
            ("current_salary", self.current_salary),
        ];
        for (field, value) in optional {
            if let Some(v) = value {
                non_negative(field, v)?;
            }
        }
        if let Some(score) = self.portfolio_diversity_score {
            if score > 100 {
                return Err(PensionError::InvalidAmount {
                    field: "portfolio_diversity_score".into(),
                    reason: format!("score must be between 0 and 100 (got {})", score),
                });
            }
        }
        if let Some(plan) = &self.current_allocation {
            non_negative("current_allocation.stocks", plan.stocks)?;
            non_negative("current_allocation.bonds", plan.bonds)?;
            non_negative("current_allocation.cash", plan.cash)?;
        }
        // The derived accessors saturate; a valid profile never reaches the bound.
        if let (None, Some(m)) = (self.annual_contribution, self.monthly_contribution) {
            checked_mul(m, dec!(12), "annual_contribution")?;
        }
        checked_add(
            self.annual_contribution(),
            self.employer_contribution(),
            "total_annual_contribution",
        )?;
        Ok(())
    }

    /// Validated years until the retirement goal; must be positive.
    pub fn years_to_retirement(&self) -> PensionResult<u32> {
        self.validate()?;
        if self.retirement_age_goal <= self.age {
            return Err(PensionError::InvalidAgeRange {
                field: "retirement_age_goal".into(),
                reason: format!(
                    "retirement_age_goal ({}) must be greater than age ({})",
                    self.retirement_age_goal, self.age
                ),
            });
        }
        Ok(self.retirement_age_goal - self.age)
    }

    pub fn monthly_contribution(&self) -> Money {
        match (self.monthly_contribution, self.annual_contribution) {
            (Some(m), _) => m,
            (None, Some(a)) => a / dec!(12),
            (None, None) => Decimal::ZERO,
        }
    }

    pub fn annual_contribution(&self) -> Money {
        match (self.annual_contribution, self.monthly_contribution) {
            (Some(a), _) => a,
            (None, Some(m)) => m.saturating_mul(dec!(12)),
            (None, None) => Decimal::ZERO,
        }
    }

    pub fn employer_contribution(&self) -> Money {
        self.employer_contribution.unwrap_or(Decimal::ZERO)
    }

    /// Member plus employer money going into the pot each year.
    pub fn total_annual_contribution(&self) -> Money {
        self.annual_contribution()
            .saturating_add(self.employer_contribution())
    }

    pub fn salary(&self) -> Money {
        self.current_salary.unwrap_or(self.annual_income)
    }

    pub fn diversity_score(&self) -> u32 {
        self.portfolio_diversity_score
            .unwrap_or(NEUTRAL_DIVERSITY_SCORE)
    }

    pub fn is_defined_benefit(&self) -> bool {
        self.pension_type
            .as_deref()
            .map(|t| t.to_lowercase().contains("defined benefit"))
            .unwrap_or(false)
    }

    /// Equity share in percent: the stored allocation when present, otherwise
    /// a keyword estimate from `investment_type`.
    pub fn estimated_equity_pct(&self) -> Percent {
        if let Some(plan) = &self.current_allocation {
            return plan.stocks;
        }
        let label = self
            .investment_type
            .as_deref()
            .unwrap_or_default()
            .to_lowercase();
        let base = if ["equity", "aggressive", "growth"]
            .iter()
            .any(|k| label.contains(k))
        {
            dec!(80)
        } else if ["bond", "conservative"].iter().any(|k| label.contains(k)) {
            dec!(20)
        } else if ["target", "balanced"].iter().any(|k| label.contains(k)) {
            dec!(60)
        } else {
            dec!(50)
        };
        // Concentrated books tend to be equity-heavy.
        if self.diversity_score() < NEUTRAL_DIVERSITY_SCORE {
            base + dec!(10)
        } else {
            base
        }
    }

    /// Current stocks/bonds/cash split, estimated with a 10% cash sleeve when
    /// no allocation is stored.
    pub fn current_allocation_or_estimate(&self) -> AllocationPlan {
        if let Some(plan) = self.current_allocation {
            return plan;
        }
        let stocks = self.estimated_equity_pct();
        let cash = dec!(10);
        AllocationPlan {
            stocks,
            bonds: (dec!(100) - stocks - cash).max(Decimal::ZERO),
            cash,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> MemberFinancialProfile {
        MemberFinancialProfile::new("M-001", 40, 65)
            .with_income(dec!(60000))
            .with_savings(dec!(50000))
            .with_monthly_contribution(dec!(500))
            .with_return_rate(dec!(0.06))
    }

    #[test]
    fn test_contribution_derivation() {
        let p = base();
        assert_eq!(p.annual_contribution(), dec!(6000));
        let p = base().with_annual_contribution(dec!(2400));
        assert_eq!(p.monthly_contribution(), dec!(200));
        let p = MemberFinancialProfile::new("M", 30, 60);
        assert_eq!(p.monthly_contribution(), Decimal::ZERO);
        assert_eq!(p.annual_contribution(), Decimal::ZERO);
    }

    #[test]
    fn test_total_includes_employer() {
        let p = base().with_employer_contribution(dec!(1800));
        assert_eq!(p.total_annual_contribution(), dec!(7800));
    }

    #[test]
    fn test_age_bounds() {
        assert!(MemberFinancialProfile::new("M", 0, 65).validate().is_err());
        assert!(MemberFinancialProfile::new("M", 101, 110).validate().is_err());
        assert!(MemberFinancialProfile::new("M", 100, 100).validate().is_ok());
    }

    #[test]
    fn test_retirement_goal_bounded() {
        let err = MemberFinancialProfile::new("M", 40, 20_000_030)
            .validate()
            .unwrap_err();
        match err {
            PensionError::InvalidAgeRange { field, .. } => assert_eq!(field, "retirement_age_goal"),
            other => panic!("Expected InvalidAgeRange, got {:?}", other),
        }
        assert!(MemberFinancialProfile::new("M", 40, 101).validate().is_err());
        assert!(MemberFinancialProfile::new("M", 40, MAX_AGE).validate().is_ok());
    }

    #[test]
    fn test_unrepresentable_contribution_stream_rejected() {
        let p = base()
            .with_monthly_contribution(Decimal::MAX / dec!(2))
            .with_employer_contribution(Decimal::ZERO);
        assert!(matches!(
            p.validate(),
            Err(PensionError::InvalidAmount { .. })
        ));
        let p = base()
            .with_annual_contribution(Decimal::MAX)
            .with_employer_contribution(dec!(1));
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_years_to_retirement_requires_future_goal() {
        assert_eq!(base().years_to_retirement().unwrap(), 25);
        let err = MemberFinancialProfile::new("M", 65, 65)
            .years_to_retirement()
            .unwrap_err();
        assert!(matches!(err, PensionError::InvalidAgeRange { .. }));
    }

    #[test]
    fn test_negative_amount_rejected() {
        let err = base().with_savings(dec!(-1)).validate().unwrap_err();
        match err {
            PensionError::InvalidAmount { field, .. } => assert_eq!(field, "current_savings"),
            other => panic!("Expected InvalidAmount, got {:?}", other),
        }
    }

    #[test]
    fn test_diversity_score_above_100_rejected() {
        assert!(base().with_diversity_score(101).validate().is_err());
    }

    #[test]
    fn test_equity_estimate_keywords() {
        assert_eq!(
            base().with_investment_type("Aggressive Growth").estimated_equity_pct(),
            dec!(80)
        );
        assert_eq!(
            base().with_investment_type("Bond Index").estimated_equity_pct(),
            dec!(20)
        );
        assert_eq!(
            base().with_investment_type("Target Date 2050").estimated_equity_pct(),
            dec!(60)
        );
        assert_eq!(base().estimated_equity_pct(), dec!(50));
        assert_eq!(
            base()
                .with_investment_type("Equity")
                .with_diversity_score(30)
                .estimated_equity_pct(),
            dec!(90)
        );
    }

    #[test]
    fn test_stored_allocation_wins() {
        let plan = AllocationPlan {
            stocks: dec!(35),
            bonds: dec!(55),
            cash: dec!(10),
        };
        let p = base().with_investment_type("Equity").with_allocation(plan);
        assert_eq!(p.estimated_equity_pct(), dec!(35));
        assert_eq!(p.current_allocation_or_estimate(), plan);
    }

    #[test]
    fn test_deserialize_aliases_and_defaults() {
        let p: MemberFinancialProfile = serde_json::from_value(serde_json::json!({
            "member_id": "M-9",
            "age": 45,
            "retirement_age_goal": 65,
            "current_corpus": "1000",
            "risk_tolerance": "high"
        }))
        .unwrap();
        assert_eq!(p.current_savings, dec!(1000));
        assert_eq!(p.risk_tolerance, RiskTolerance::High);
        assert_eq!(p.diversity_score(), 50);
        assert_eq!(p.salary(), Decimal::ZERO);
    }

    #[test]
    fn test_defined_benefit_detection() {
        assert!(base().with_pension_type("Defined Benefit").is_defined_benefit());
        assert!(!base().with_pension_type("Defined Contribution").is_defined_benefit());
        assert!(!base().is_defined_benefit());
    }
}
