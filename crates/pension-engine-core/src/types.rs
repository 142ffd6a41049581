use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::PensionError;
use crate::PensionResult;

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Rates expressed as decimals (0.05 = 5%). Never as percentages.
pub type Rate = Decimal;

/// Percentages on the 0..=100 scale (readiness scores, allocation weights).
pub type Percent = Decimal;

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}

/// Round half away from zero to `dp` places (12.25 -> 12.3, not banker's 12.2).
pub fn round_half_up(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}

/// Round to cents.
pub fn round_money(value: Money) -> Money {
    round_half_up(value, 2)
}

// ---------------------------------------------------------------------------
// Checked arithmetic
// ---------------------------------------------------------------------------

// Member inputs are unbounded above and may be arbitrarily small, so any
// product, sum or quotient of them can leave the Decimal range.

pub fn checked_add(a: Decimal, b: Decimal, context: &str) -> PensionResult<Decimal> {
    a.checked_add(b).ok_or_else(|| PensionError::overflow(context))
}

pub fn checked_sub(a: Decimal, b: Decimal, context: &str) -> PensionResult<Decimal> {
    a.checked_sub(b).ok_or_else(|| PensionError::overflow(context))
}

pub fn checked_mul(a: Decimal, b: Decimal, context: &str) -> PensionResult<Decimal> {
    a.checked_mul(b).ok_or_else(|| PensionError::overflow(context))
}

/// `a / b`; a zero divisor is a `DivisionGuard`, an oversized quotient an
/// `InvalidAmount`.
pub fn checked_div(a: Decimal, b: Decimal, context: &str) -> PensionResult<Decimal> {
    if b.is_zero() {
        return Err(PensionError::DivisionGuard {
            context: context.into(),
        });
    }
    a.checked_div(b).ok_or_else(|| PensionError::overflow(context))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_round_half_up_midpoint() {
        assert_eq!(round_half_up(dec!(12.25), 1), dec!(12.3));
        assert_eq!(round_half_up(dec!(-12.25), 1), dec!(-12.3));
        assert_eq!(round_half_up(dec!(62.5), 0), dec!(63));
    }

    #[test]
    fn test_checked_ops_report_overflow() {
        let err = checked_mul(Decimal::MAX, dec!(2), "pot").unwrap_err();
        match err {
            PensionError::InvalidAmount { field, .. } => assert_eq!(field, "pot"),
            other => panic!("Expected InvalidAmount, got {:?}", other),
        }
        assert!(checked_add(Decimal::MAX, Decimal::ONE, "sum").is_err());
        assert!(checked_sub(Decimal::MIN, Decimal::ONE, "diff").is_err());
        assert!(checked_div(Decimal::MAX, dec!(0.0000000001), "ratio").is_err());
        assert_eq!(checked_div(dec!(10), dec!(4), "ratio").unwrap(), dec!(2.5));
    }

    #[test]
    fn test_checked_div_by_zero_is_guarded() {
        let err = checked_div(dec!(1), Decimal::ZERO, "ratio").unwrap_err();
        assert!(matches!(err, PensionError::DivisionGuard { .. }));
    }

    #[test]
    fn test_with_metadata_populates_envelope() {
        let out = with_metadata(
            "test",
            &serde_json::json!({ "a": 1 }),
            vec!["w".into()],
            42,
            dec!(1.5),
        );
        assert_eq!(out.methodology, "test");
        assert_eq!(out.warnings.len(), 1);
        assert_eq!(out.metadata.computation_time_us, 42);
        assert_eq!(out.metadata.precision, "rust_decimal_128bit");
        assert_eq!(out.assumptions["a"], 1);
    }
}
