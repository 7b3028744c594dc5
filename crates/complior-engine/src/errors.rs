use thiserror::Error;

/// Stable machine-readable error surfaced to every external transport.
///
/// Mirrors the teacher's `RepoConfigError` shape (rich message + stable
/// code) but collapsed to a single cross-cutting type: the service layer is
/// the only place external callers see errors, so one enum is enough.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("validation error: {message}")]
    Validation { message: String },

    #[error("not found: {message}")]
    NotFound { message: String },

    #[error("configuration error: {message}")]
    Config { message: String },

    #[error("scan error: {message}")]
    Scan { message: String },

    #[error("tool error: {message}")]
    Tool { message: String },
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation {
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        ApiError::Config {
            message: message.into(),
        }
    }

    pub fn scan(message: impl Into<String>) -> Self {
        ApiError::Scan {
            message: message.into(),
        }
    }

    pub fn tool(message: impl Into<String>) -> Self {
        ApiError::Tool {
            message: message.into(),
        }
    }

    /// Stable code string, independent of the human message.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Validation { .. } => "validation",
            ApiError::NotFound { .. } => "not_found",
            ApiError::Config { .. } => "config",
            ApiError::Scan { .. } => "scan",
            ApiError::Tool { .. } => "tool",
        }
    }

    /// HTTP-ish status code for the request/response transport (§6).
    pub fn status(&self) -> u16 {
        match self {
            ApiError::Validation { .. } => 400,
            ApiError::NotFound { .. } => 404,
            ApiError::Config { .. } => 500,
            ApiError::Scan { .. } => 500,
            ApiError::Tool { .. } => 500,
        }
    }

    pub fn message(&self) -> String {
        match self {
            ApiError::Validation { message }
            | ApiError::NotFound { message }
            | ApiError::Config { message }
            | ApiError::Scan { message }
            | ApiError::Tool { message } => message.clone(),
        }
    }
}
