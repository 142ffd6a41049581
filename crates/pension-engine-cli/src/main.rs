mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::advisory::{OptimizeArgs, RiskAlertsArgs};
use commands::book::BookKpisArgs;
use commands::planning::{ContributionsArgs, ProjectArgs, ReadinessArgs, RetirementAgeArgs};
use commands::scenarios::{MonteCarloArgs, StressTestArgs, WhatIfArgs};

/// Pension projection and advisory analytics
#[derive(Parser)]
#[command(
    name = "pension",
    version,
    about = "Pension projection, readiness and advisory analytics",
    long_about = "A CLI for projecting pension corpora and advising members with \
                  decimal precision. Supports corpus projection, retirement-age solving, \
                  readiness scoring, contribution planning, risk alerts, portfolio \
                  optimisation, what-if scenarios, stress tests, Monte Carlo projection \
                  and advisor book KPIs."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Project the corpus at the retirement goal, with rate scenarios
    Project(ProjectArgs),
    /// Solve the earliest age at which a target corpus is reached
    RetirementAge(RetirementAgeArgs),
    /// Score retirement readiness and list recommendations
    Readiness(ReadinessArgs),
    /// Required contribution, step-up impact, gap and limits
    Contributions(ContributionsArgs),
    /// Run the risk rules and build an action plan
    RiskAlerts(RiskAlertsArgs),
    /// Recommend a target allocation (optionally with rebalancing trades)
    Optimize(OptimizeArgs),
    /// Rank single-input what-if scenarios (or a sensitivity grid)
    WhatIf(WhatIfArgs),
    /// Market, inflation, longevity and sequence-of-returns stress tests
    StressTest(StressTestArgs),
    /// Simulate corpus paths with normally distributed annual returns
    MonteCarlo(MonteCarloArgs),
    /// Aggregate KPIs over a JSON array of members
    BookKpis(BookKpisArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Project(args) => commands::planning::run_project(args),
        Commands::RetirementAge(args) => commands::planning::run_retirement_age(args),
        Commands::Readiness(args) => commands::planning::run_readiness(args),
        Commands::Contributions(args) => commands::planning::run_contributions(args),
        Commands::RiskAlerts(args) => commands::advisory::run_risk_alerts(args),
        Commands::Optimize(args) => commands::advisory::run_optimize(args),
        Commands::WhatIf(args) => commands::scenarios::run_what_if(args),
        Commands::StressTest(args) => commands::scenarios::run_stress_test(args),
        Commands::MonteCarlo(args) => commands::scenarios::run_monte_carlo(args),
        Commands::BookKpis(args) => commands::book::run_book_kpis(args),
        Commands::Version => {
            println!("pension {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
