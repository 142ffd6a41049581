use clap::Args;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;

use pension_engine_core::planning::{contribution, projection, readiness};
use pension_engine_core::MemberFinancialProfile;

use crate::input;

/// Arguments for corpus projection
#[derive(Args)]
pub struct ProjectArgs {
    /// Path to JSON member profile
    #[arg(long)]
    pub input: Option<String>,
}

/// Arguments for the retirement-age solver
#[derive(Args)]
pub struct RetirementAgeArgs {
    /// Path to JSON member profile
    #[arg(long)]
    pub input: Option<String>,

    /// Target corpus (defaults to the member's derived target)
    #[arg(long)]
    pub target_corpus: Option<Decimal>,
}

/// Arguments for readiness scoring
#[derive(Args)]
pub struct ReadinessArgs {
    /// Path to JSON member profile
    #[arg(long)]
    pub input: Option<String>,
}

/// Arguments for contribution planning
#[derive(Args)]
pub struct ContributionsArgs {
    /// Path to JSON member profile
    #[arg(long)]
    pub input: Option<String>,
}

#[derive(Debug, Serialize)]
struct RetirementAgeOutput {
    member_id: String,
    current_age: u32,
    retirement_age: u32,
    years_needed: u32,
    target_corpus: Decimal,
    target_source: &'static str,
}

pub fn run_project(args: ProjectArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let profile: MemberFinancialProfile = input::resolve(args.input.as_deref(), "project")?;
    let result = projection::analyze_projection(&profile)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_retirement_age(args: RetirementAgeArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let profile: MemberFinancialProfile =
        input::resolve(args.input.as_deref(), "retirement-age")?;

    let (target, source) = match args.target_corpus {
        Some(t) => (t, "argument"),
        None => (projection::derive_target_corpus(&profile)?.target, "derived"),
    };
    if target <= Decimal::ZERO {
        return Err("target corpus must be positive (pass --target-corpus)".into());
    }

    let age = projection::solve_retirement_age(&profile, target)?;
    let output = RetirementAgeOutput {
        member_id: profile.member_id.clone(),
        current_age: profile.age,
        retirement_age: age,
        years_needed: age - profile.age,
        target_corpus: target,
        target_source: source,
    };
    Ok(serde_json::to_value(output)?)
}

pub fn run_readiness(args: ReadinessArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let profile: MemberFinancialProfile = input::resolve(args.input.as_deref(), "readiness")?;
    let result = readiness::assess_readiness(&profile)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_contributions(args: ContributionsArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let profile: MemberFinancialProfile =
        input::resolve(args.input.as_deref(), "contributions")?;
    let result = contribution::plan_contributions(&profile)?;
    Ok(serde_json::to_value(result)?)
}
