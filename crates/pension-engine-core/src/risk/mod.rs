//! Rule-based risk alerts for a single member.
//!
//! Each check is an independent [`RiskRule`]. [`RiskAlertEngine`] runs its
//! rules in registration order, collects the alerts they raise and rolls
//! them up into an overall [`RiskLevel`] plus a follow-up action plan.
//!
//! ```rust,ignore
//! use pension_engine_core::risk::RiskAlertEngine;
//!
//! let report = RiskAlertEngine::standard().evaluate(&profile)?;
//! println!("{:?}: {} alerts", report.risk_level, report.total_alerts);
//! ```

mod alerts;
mod rules;

pub use alerts::{
    action_plan, generate_risk_alerts, overall_risk_level, ActionItem, AlertType, RiskAlert,
    RiskAlertEngine, RiskLevel, RiskReport, Severity,
};

pub use rules::{
    recommended_equity_pct, recommended_contribution_rate_pct, AssetAllocationRule,
    ContributionRateRule, DiversityRule, LongevityRule, RiskRule, SavingsGapRule,
    SequenceOfReturnsRule, WithdrawalRateRule,
};
