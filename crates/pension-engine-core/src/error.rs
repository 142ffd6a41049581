use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PensionError {
    #[error("Invalid age range: {field}: {reason}")]
    InvalidAgeRange { field: String, reason: String },

    #[error("Invalid amount: {field}: {reason}")]
    InvalidAmount { field: String, reason: String },

    #[error("Target unreachable: {target} not reached within {max_periods} periods")]
    TargetUnreachable { target: Decimal, max_periods: u32 },

    #[error("Division guard tripped in {context}")]
    DivisionGuard { context: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl PensionError {
    /// Arithmetic on `context` left the representable Decimal range.
    pub fn overflow(context: &str) -> Self {
        PensionError::InvalidAmount {
            field: context.into(),
            reason: "Result exceeds the representable decimal range".into(),
        }
    }

    /// True for errors caused by the caller's input rather than by the engine.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            PensionError::InvalidAgeRange { .. }
                | PensionError::InvalidAmount { .. }
                | PensionError::SerializationError(_)
        )
    }
}

impl From<serde_json::Error> for PensionError {
    fn from(e: serde_json::Error) -> Self {
        PensionError::SerializationError(e.to_string())
    }
}
