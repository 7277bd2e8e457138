use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RoiError {
    #[error("Missing field: '{0}'")]
    MissingField(&'static str),

    #[error("Invalid input: {field} {reason}")]
    InvalidInput { field: &'static str, reason: String },

    #[error("Annual profit is zero or negative. Please check your inputs.")]
    NonPositiveProfit,

    #[error("{0}")]
    Computation(String),
}

impl RoiError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        RoiError::InvalidInput {
            field,
            reason: reason.into(),
        }
    }

    /// Validation failures are the caller's fault; everything else is a
    /// failure inside the computation itself.
    pub fn is_validation(&self) -> bool {
        !matches!(self, RoiError::Computation(_))
    }
}
