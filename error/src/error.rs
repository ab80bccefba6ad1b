use thiserror::Error;

/// Structured validation errors produced while parsing, merging and scoring
/// filters. All variants are terminal for the current request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GateError {
    #[error("unknown path: {0}")]
    UnknownPath(String),

    #[error("not filterable: {0}")]
    NotFilterable(String),

    #[error("unsupported operator '{operator}' on '{field}'")]
    UnsupportedOperator { field: String, operator: String },

    #[error("not mixable operators on '{0}'")]
    NotMixableOperators(String),

    #[error("request out of range: {0}")]
    RequestOutOfRange(String),

    #[error("remote lookup failed: {0}")]
    RemoteError(String),
}

impl GateError {
    pub fn unsupported_operator<F: Into<String>, O: Into<String>>(field: F, operator: O) -> Self {
        GateError::UnsupportedOperator { field: field.into(), operator: operator.into() }
    }
}

impl From<String> for GateError {
    fn from(s: String) -> Self {
        GateError::RemoteError(s)
    }
}

impl From<&str> for GateError {
    fn from(s: &str) -> Self {
        GateError::RemoteError(s.to_string())
    }
}
