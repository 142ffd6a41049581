use napi::Result as NapiResult;
use napi_derive::napi;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use pension_engine_core::book::kpis;
use pension_engine_core::planning::{contribution, projection, readiness};
use pension_engine_core::portfolio::{allocation, rebalancing};
use pension_engine_core::risk;
use pension_engine_core::scenarios::{monte_carlo, stress, what_if};
use pension_engine_core::MemberFinancialProfile;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

fn parse_profile(input_json: &str) -> NapiResult<MemberFinancialProfile> {
    serde_json::from_str(input_json).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Planning
// ---------------------------------------------------------------------------

#[napi]
pub fn project_corpus(input_json: String) -> NapiResult<String> {
    let profile = parse_profile(&input_json)?;
    let output = projection::analyze_projection(&profile).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[derive(Deserialize)]
struct RetirementAgeInput {
    profile: MemberFinancialProfile,
    target_corpus: Option<Decimal>,
}

#[derive(Serialize)]
struct RetirementAgeOutput {
    retirement_age: u32,
    target_corpus: Decimal,
}

#[napi]
pub fn solve_retirement_age(input_json: String) -> NapiResult<String> {
    let input: RetirementAgeInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let target = match input.target_corpus {
        Some(t) => t,
        None => {
            projection::derive_target_corpus(&input.profile)
                .map_err(to_napi_error)?
                .target
        }
    };
    let retirement_age =
        projection::solve_retirement_age(&input.profile, target).map_err(to_napi_error)?;
    serde_json::to_string(&RetirementAgeOutput {
        retirement_age,
        target_corpus: target,
    })
    .map_err(to_napi_error)
}

#[napi]
pub fn assess_readiness(input_json: String) -> NapiResult<String> {
    let profile = parse_profile(&input_json)?;
    let output = readiness::assess_readiness(&profile).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn plan_contributions(input_json: String) -> NapiResult<String> {
    let profile = parse_profile(&input_json)?;
    let output = contribution::plan_contributions(&profile).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Advisory
// ---------------------------------------------------------------------------

#[napi]
pub fn generate_risk_alerts(input_json: String) -> NapiResult<String> {
    let profile = parse_profile(&input_json)?;
    let output = risk::generate_risk_alerts(&profile).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn optimize_portfolio(input_json: String) -> NapiResult<String> {
    let profile = parse_profile(&input_json)?;
    let output = allocation::optimize_portfolio(&profile).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn plan_rebalancing(input_json: String) -> NapiResult<String> {
    let profile = parse_profile(&input_json)?;
    let output = rebalancing::plan_rebalancing(&profile).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[napi]
pub fn simulate_what_if(input_json: String) -> NapiResult<String> {
    let profile = parse_profile(&input_json)?;
    let output = what_if::simulate_what_if(&profile).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[derive(Deserialize)]
struct SensitivityInput {
    profile: MemberFinancialProfile,
    #[serde(default)]
    adjustments: what_if::SensitivityAdjustments,
}

#[napi]
pub fn sensitivity_grid(input_json: String) -> NapiResult<String> {
    let input: SensitivityInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        what_if::sensitivity_grid(&input.profile, &input.adjustments).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[derive(Deserialize)]
struct StressInput {
    profile: MemberFinancialProfile,
    #[serde(default)]
    params: stress::StressParameters,
}

#[napi]
pub fn stress_test(input_json: String) -> NapiResult<String> {
    let input: StressInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = stress::stress_test(&input.profile, &input.params).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[derive(Deserialize)]
struct MonteCarloInput {
    profile: MemberFinancialProfile,
    #[serde(default)]
    params: monte_carlo::MonteCarloParameters,
}

#[napi]
pub fn monte_carlo(input_json: String) -> NapiResult<String> {
    let input: MonteCarloInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        monte_carlo::simulate_monte_carlo(&input.profile, &input.params).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Book
// ---------------------------------------------------------------------------

#[napi]
pub fn book_kpis(input_json: String) -> NapiResult<String> {
    let members: Vec<MemberFinancialProfile> =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = kpis::book_kpis(&members).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}
