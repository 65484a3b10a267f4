//! Error types for Synheart Daily

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::types::MetricKind;

/// What was found to have no data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unavailable {
    Date(NaiveDate),
    Metric(MetricKind),
    /// The device has no health store at all
    Device,
}

impl fmt::Display for Unavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unavailable::Date(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            Unavailable::Metric(kind) => write!(f, "{kind}"),
            Unavailable::Device => f.write_str("this device"),
        }
    }
}

/// Errors raised while querying or aggregating health data
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HealthDataError {
    #[error("Please enable {0} access in Settings")]
    PermissionDenied(MetricKind),

    #[error("No data available for {0}")]
    DataUnavailable(Unavailable),

    #[error("Data validation failed: {0}")]
    ValidationFailed(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Unexpected error: {0}")]
    UnknownError(String),

    #[error("Invalid date: {0}")]
    InvalidDate(String),
}

impl HealthDataError {
    /// Suggested corrective action for the user
    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            HealthDataError::PermissionDenied(_) => {
                "Go to Settings → Privacy & Security → Health to enable access"
            }
            HealthDataError::DataUnavailable(_) => {
                "Try adding data manually or check your Health app"
            }
            HealthDataError::ValidationFailed(_) => "Please check your input and try again",
            HealthDataError::NetworkError(_) => "Check your internet connection and try again",
            HealthDataError::UnknownError(_) => "Please try again or restart the app",
            HealthDataError::InvalidDate(_) => "Please pick a different date",
        }
    }
}

impl From<PlatformError> for HealthDataError {
    fn from(err: PlatformError) -> Self {
        HealthDataError::UnknownError(err.to_string())
    }
}

/// Raw failure reported by the platform health store.
///
/// Codes are platform-defined; see [`crate::config::PlatformErrorCodes`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("platform error {code}: {message}")]
pub struct PlatformError {
    pub code: i64,
    pub message: String,
}

impl PlatformError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

pub type HealthResult<T> = Result<T, HealthDataError>;
