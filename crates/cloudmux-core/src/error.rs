//! Control plane error types

use cloudmux_driver::{DriverError, Iid, ValidationError};
use thiserror::Error;

/// Control plane errors
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("{kind} not found: {name}")]
    NotFound { kind: String, name: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Dependency: {0}")]
    Dependency(String),

    #[error("Driver not found: provider={provider}, driver={driver}")]
    DriverNotFound { provider: String, driver: String },

    #[error("Driver load failed ({library}): {reason}")]
    DriverLoad { library: String, reason: String },

    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("{kind} {iid}: {source}")]
    Provider {
        kind: String,
        iid: Iid,
        #[source]
        source: DriverError,
    },

    #[error("Store error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Coarse classification used by transports to pick a status code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    UnsupportedOperation,
    NotFound,
    Conflict,
    Dependency,
    DriverNotFound,
    DriverLoad,
    Validation,
    Provider,
    Internal,
}

impl CoreError {
    pub fn not_found(kind: impl std::fmt::Display, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.to_string(),
            name: name.into(),
        }
    }

    /// Wraps a driver error with the resource it was about.
    ///
    /// Not-found and unsupported answers keep their meaning; everything else
    /// is a provider error carrying the original message.
    pub fn from_driver(kind: impl std::fmt::Display, iid: &Iid, err: DriverError) -> Self {
        match err {
            DriverError::NotFound(_) => {
                let name = if iid.name_id.is_empty() {
                    iid.system_id.clone()
                } else {
                    iid.name_id.clone()
                };
                Self::not_found(kind, name)
            }
            DriverError::Unsupported(what) => Self::UnsupportedOperation(what),
            source => Self::Provider {
                kind: kind.to_string(),
                iid: iid.clone(),
                source,
            },
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Configuration(_) => ErrorCategory::Configuration,
            Self::UnsupportedOperation(_) => ErrorCategory::UnsupportedOperation,
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::Conflict(_) => ErrorCategory::Conflict,
            Self::Dependency(_) => ErrorCategory::Dependency,
            Self::DriverNotFound { .. } => ErrorCategory::DriverNotFound,
            Self::DriverLoad { .. } => ErrorCategory::DriverLoad,
            Self::Validation(_) => ErrorCategory::Validation,
            Self::Provider { .. } => ErrorCategory::Provider,
            Self::Store(_) | Self::Io(_) | Self::Json(_) => ErrorCategory::Internal,
        }
    }

    /// Only provider failures may succeed on a later attempt; the core
    /// itself never retries.
    pub fn is_retryable(&self) -> bool {
        self.category() == ErrorCategory::Provider
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_driver_keeps_meaning() {
        let iid = Iid::new("vpc-01", "vpc-0abc");

        let err = CoreError::from_driver("VPC", &iid, DriverError::not_found("gone"));
        assert!(matches!(&err, CoreError::NotFound { name, .. } if name == "vpc-01"));

        let err = CoreError::from_driver("VPC", &iid, DriverError::provider("throttled"));
        assert_eq!(err.category(), ErrorCategory::Provider);
        assert!(err.is_retryable());
        let msg = err.to_string();
        assert!(msg.contains("VPC"));
        assert!(msg.contains("vpc-0abc"));
        assert!(msg.contains("throttled"));
    }

    #[test]
    fn test_not_found_uses_system_id_without_name() {
        let err = CoreError::from_driver("VM", &Iid::new("", "i-1"), DriverError::not_found("x"));
        assert_eq!(err.to_string(), "VM not found: i-1");
    }

    #[test]
    fn test_only_provider_errors_are_retryable() {
        assert!(!CoreError::Conflict("x".into()).is_retryable());
        assert!(!CoreError::Configuration("x".into()).is_retryable());
        assert!(
            !CoreError::DriverNotFound {
                provider: "AWS".into(),
                driver: "aws-driver".into()
            }
            .is_retryable()
        );
    }
}
