pub mod error;
pub mod growth;
pub mod profile;
pub mod types;

#[cfg(feature = "planning")]
pub mod planning;

#[cfg(feature = "risk")]
pub mod risk;

#[cfg(feature = "portfolio")]
pub mod portfolio;

#[cfg(feature = "scenarios")]
pub mod scenarios;

#[cfg(feature = "book")]
pub mod book;

pub use error::PensionError;
pub use profile::{AllocationPlan, MemberFinancialProfile, RiskTolerance, WithdrawalStyle};
pub use types::*;

/// Standard result type for all pension-engine operations
pub type PensionResult<T> = Result<T, PensionError>;
