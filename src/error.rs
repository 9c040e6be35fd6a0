use thiserror::Error;

#[derive(Error, Debug)]
pub enum LfcaError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid parameter {name}={value}: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Numeric failure: {0}")]
    NumericFailure(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LfcaError {
    /// Build an `InvalidParameter` from the parameter name, its offending value,
    /// and the violated constraint.
    pub fn invalid_parameter(
        name: &'static str,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        LfcaError::InvalidParameter {
            name,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LfcaError>;
