use clap::Args;
use serde_json::Value;

use pension_engine_core::book::kpis;
use pension_engine_core::MemberFinancialProfile;

use crate::input;

/// Arguments for advisor book KPIs
#[derive(Args)]
pub struct BookKpisArgs {
    /// Path to JSON array of member profiles
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_book_kpis(args: BookKpisArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let members: Vec<MemberFinancialProfile> =
        input::resolve(args.input.as_deref(), "book-kpis")?;
    let result = kpis::book_kpis(&members)?;
    Ok(serde_json::to_value(result)?)
}
