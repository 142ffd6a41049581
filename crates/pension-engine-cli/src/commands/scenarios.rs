use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use pension_engine_core::scenarios::{monte_carlo, stress, what_if};
use pension_engine_core::MemberFinancialProfile;

use crate::input;

/// Arguments for what-if scenarios
#[derive(Args)]
pub struct WhatIfArgs {
    /// Path to JSON member profile
    #[arg(long)]
    pub input: Option<String>,

    /// Run the sensitivity grid instead of the ranked scenarios
    #[arg(long)]
    pub sensitivity: bool,

    /// Path to JSON sensitivity adjustments (defaults apply when omitted)
    #[arg(long, requires = "sensitivity")]
    pub adjustments: Option<String>,
}

/// Arguments for stress testing
#[derive(Args)]
pub struct StressTestArgs {
    /// Path to JSON member profile
    #[arg(long)]
    pub input: Option<String>,

    /// Path to JSON stress parameters (defaults apply when omitted)
    #[arg(long)]
    pub params: Option<String>,
}

/// Arguments for the Monte Carlo projection
#[derive(Args)]
pub struct MonteCarloArgs {
    /// Path to JSON member profile
    #[arg(long)]
    pub input: Option<String>,

    /// Path to JSON simulation parameters; flags below override it
    #[arg(long)]
    pub params: Option<String>,

    /// Number of simulated paths
    #[arg(long)]
    pub simulations: Option<u32>,

    /// Seed for reproducible paths
    #[arg(long)]
    pub seed: Option<u64>,

    /// Standard deviation of the annual return (e.g. 0.12)
    #[arg(long)]
    pub volatility: Option<Decimal>,

    /// Mean annual return (defaults to the member's expected return)
    #[arg(long)]
    pub mean_return: Option<Decimal>,
}

pub fn run_what_if(args: WhatIfArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let profile: MemberFinancialProfile = input::resolve(args.input.as_deref(), "what-if")?;
    if args.sensitivity {
        let adjustments: what_if::SensitivityAdjustments = match args.adjustments {
            Some(ref path) => input::file::read_json(path)?,
            None => what_if::SensitivityAdjustments::default(),
        };
        let grid = what_if::sensitivity_grid(&profile, &adjustments)?;
        return Ok(serde_json::to_value(grid)?);
    }
    let result = what_if::simulate_what_if(&profile)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_stress_test(args: StressTestArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let profile: MemberFinancialProfile = input::resolve(args.input.as_deref(), "stress-test")?;
    let params: stress::StressParameters = match args.params {
        Some(ref path) => input::file::read_json(path)?,
        None => stress::StressParameters::default(),
    };
    let result = stress::stress_test(&profile, &params)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_monte_carlo(args: MonteCarloArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let profile: MemberFinancialProfile = input::resolve(args.input.as_deref(), "monte-carlo")?;
    let mut params: monte_carlo::MonteCarloParameters = match args.params {
        Some(ref path) => input::file::read_json(path)?,
        None => monte_carlo::MonteCarloParameters::default(),
    };
    if let Some(n) = args.simulations {
        params.num_simulations = n;
    }
    if args.seed.is_some() {
        params.seed = args.seed;
    }
    if let Some(v) = args.volatility {
        params.return_volatility = v;
    }
    if args.mean_return.is_some() {
        params.mean_return = args.mean_return;
    }
    let result = monte_carlo::simulate_monte_carlo(&profile, &params)?;
    Ok(serde_json::to_value(result)?)
}
