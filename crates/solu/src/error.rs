use reqwest::StatusCode;

// Error type shared by the engine components
#[derive(Debug, thiserror::Error)]
pub enum SoluError {
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Server returned status code {0}")]
    StatusCode(StatusCode),

    #[error("Empty response body from {0}")]
    EmptyBody(String),

    #[error("Invalid URL: {0}")]
    UrlError(String),

    #[error("Invalid subject code: {0}")]
    InvalidSubject(String),

    #[error("Invalid year code: {0}")]
    InvalidYear(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("TLS configuration error: {0}")]
    TlsError(String),

    #[error("Operation cancelled")]
    Cancelled,
}

impl From<url::ParseError> for SoluError {
    fn from(err: url::ParseError) -> Self {
        SoluError::UrlError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SoluError>;
