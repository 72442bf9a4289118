use serde::Serialize;
use thiserror::Error;

/// Errors raised while building a manager or loading its configuration.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("unknown bucket `{0}`")]
    UnknownBucket(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("failed to render configuration: {0}")]
    ConfigRender(#[from] toml::ser::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    AccessDenied,
    Throttled,
    Network,
    InvalidKey,
    Service,
    Io,
}

impl ErrorKind {
    /// Maps an S3 error code onto a kind. Unknown codes are `Service`.
    pub fn from_code(code: Option<&str>) -> Self {
        match code {
            Some("NoSuchKey" | "NotFound" | "NoSuchBucket") => ErrorKind::NotFound,
            Some(
                "AccessDenied" | "InvalidAccessKeyId" | "SignatureDoesNotMatch"
                | "AllAccessDisabled",
            ) => ErrorKind::AccessDenied,
            Some("SlowDown" | "Throttling" | "ThrottlingException" | "RequestLimitExceeded") => {
                ErrorKind::Throttled
            }
            Some("KeyTooLongError" | "InvalidObjectName") => ErrorKind::InvalidKey,
            _ => ErrorKind::Service,
        }
    }

    /// Informational only. Nothing in this crate retries.
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::Throttled | ErrorKind::Network)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::AccessDenied => "access_denied",
            ErrorKind::Throttled => "throttled",
            ErrorKind::Network => "network",
            ErrorKind::InvalidKey => "invalid_key",
            ErrorKind::Service => "service",
            ErrorKind::Io => "io",
        }
    }
}

/// A failed call against an [`ObjectStore`](crate::storage::ObjectStore).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct StoreError {
    pub kind: ErrorKind,
    pub message: String,
}

impl StoreError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn not_found(key: &str) -> Self {
        Self::new(ErrorKind::NotFound, format!("The specified key does not exist: {key}"))
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        let kind = match err.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::NotFound,
            std::io::ErrorKind::PermissionDenied => ErrorKind::AccessDenied,
            _ => ErrorKind::Io,
        };
        Self::new(kind, err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::new(ErrorKind::Io, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_code() {
        assert_eq!(ErrorKind::from_code(Some("NoSuchKey")), ErrorKind::NotFound);
        assert_eq!(ErrorKind::from_code(Some("AccessDenied")), ErrorKind::AccessDenied);
        assert_eq!(ErrorKind::from_code(Some("SlowDown")), ErrorKind::Throttled);
        assert_eq!(ErrorKind::from_code(Some("InternalError")), ErrorKind::Service);
        assert_eq!(ErrorKind::from_code(None), ErrorKind::Service);
    }

    #[test]
    fn test_io_error_conversion() {
        let err: StoreError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert_eq!(err.kind, ErrorKind::NotFound);
        assert_eq!(err.to_string(), "gone");
        assert!(!err.kind.is_retryable());
        assert!(ErrorKind::Network.is_retryable());
    }
}
