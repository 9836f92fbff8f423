use solu_engine::SoluError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Engine(SoluError),

    #[error("Configuration error: {0}")]
    Config(#[from] anyhow::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Operation cancelled by user")]
    Cancelled,
}

impl From<SoluError> for CliError {
    fn from(err: SoluError) -> Self {
        match err {
            SoluError::Cancelled => Self::Cancelled,
            other => Self::Engine(other),
        }
    }
}

impl CliError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Cancelled => 130,
            Self::InvalidInput(_) | Self::Engine(SoluError::InvalidQuery(_)) => 2,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancellation_maps_to_dedicated_variant() {
        let err = CliError::from(SoluError::Cancelled);
        assert!(matches!(err, CliError::Cancelled));
        assert_eq!(err.exit_code(), 130);
    }

    #[test]
    fn test_bad_query_is_a_usage_error() {
        let err = CliError::from(SoluError::InvalidQuery("year=2020".into()));
        assert_eq!(err.exit_code(), 2);
        assert_eq!(err.to_string(), "Invalid query: year=2020");
        assert_eq!(CliError::invalid_input("x").exit_code(), 2);
    }
}
