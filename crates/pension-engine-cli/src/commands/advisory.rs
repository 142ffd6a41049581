use clap::Args;
use serde_json::Value;

use pension_engine_core::portfolio::{allocation, rebalancing};
use pension_engine_core::risk;
use pension_engine_core::MemberFinancialProfile;

use crate::input;

/// Arguments for risk alert generation
#[derive(Args)]
pub struct RiskAlertsArgs {
    /// Path to JSON member profile
    #[arg(long)]
    pub input: Option<String>,
}

/// Arguments for portfolio optimisation
#[derive(Args)]
pub struct OptimizeArgs {
    /// Path to JSON member profile
    #[arg(long)]
    pub input: Option<String>,

    /// Include drift-band rebalancing trades
    #[arg(long)]
    pub rebalance: bool,
}

pub fn run_risk_alerts(args: RiskAlertsArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let profile: MemberFinancialProfile = input::resolve(args.input.as_deref(), "risk-alerts")?;
    let result = risk::generate_risk_alerts(&profile)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_optimize(args: OptimizeArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let profile: MemberFinancialProfile = input::resolve(args.input.as_deref(), "optimize")?;
    if args.rebalance {
        let result = rebalancing::plan_rebalancing(&profile)?;
        return Ok(serde_json::to_value(result)?);
    }
    let result = allocation::optimize_portfolio(&profile)?;
    Ok(serde_json::to_value(result)?)
}
