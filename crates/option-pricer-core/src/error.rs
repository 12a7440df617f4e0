use thiserror::Error;

#[derive(Debug, Error)]
pub enum PricingError {
    #[error("Invalid parameter: {field} = {value} — {reason}")]
    InvalidParameter {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Numerically degenerate: {context}")]
    NumericalDegenerate { context: String },

    #[error("Invalid configuration: {field} — {reason}")]
    Configuration { field: String, reason: String },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl PricingError {
    pub(crate) fn invalid(
        field: impl Into<String>,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        PricingError::InvalidParameter {
            field: field.into(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        PricingError::Configuration {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Field named by an `InvalidParameter` or `Configuration` error.
    pub fn field(&self) -> Option<&str> {
        match self {
            PricingError::InvalidParameter { field, .. }
            | PricingError::Configuration { field, .. } => Some(field),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for PricingError {
    fn from(e: serde_json::Error) -> Self {
        PricingError::Serialization(e.to_string())
    }
}
