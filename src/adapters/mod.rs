//! Source query adapters
//!
//! Each adapter wraps one platform capability behind a uniform range query and
//! maps platform failures onto the shared error taxonomy.

mod sleep;
mod steps;

pub use sleep::{asleep_hours, SleepAdapter};
pub use steps::StepsAdapter;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::config::PlatformErrorCodes;
use crate::error::{HealthDataError, HealthResult, PlatformError, Unavailable};
use crate::platform::HealthQueryService;
use crate::types::{Capability, MetricKind};

/// Trait for per-metric source adapters
#[async_trait]
pub trait SourceQueryAdapter: Send + Sync {
    type Value: Copy + PartialEq + Send;

    /// Metric this adapter produces
    fn kind(&self) -> MetricKind;

    /// Value substituted when the source has nothing to report
    fn fallback(&self) -> Self::Value;

    /// Query the source over `[start, end)`.
    ///
    /// No data resolves to [`Self::fallback`]; only denied access, a missing
    /// capability, or a genuine platform failure produce an error.
    async fn query(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> HealthResult<Self::Value>;
}

/// Fail with `DataUnavailable` when the platform does not register `capability`
pub(crate) fn ensure_supported(
    service: &dyn HealthQueryService,
    capability: Capability,
) -> HealthResult<()> {
    if service.supports(capability) {
        Ok(())
    } else {
        Err(HealthDataError::DataUnavailable(Unavailable::Metric(
            capability.metric(),
        )))
    }
}

/// Sort a platform result into permission-denied, no-data, or unknown failure
pub(crate) fn classify<T>(
    kind: MetricKind,
    codes: &PlatformErrorCodes,
    result: Result<T, PlatformError>,
    no_data: T,
) -> HealthResult<T> {
    match result {
        Ok(value) => Ok(value),
        Err(err) if err.code == codes.permission_denied => {
            Err(HealthDataError::PermissionDenied(kind))
        }
        Err(err) if err.code == codes.no_data => Ok(no_data),
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_buckets() {
        let codes = PlatformErrorCodes::default();

        let denied = classify(MetricKind::Steps, &codes, Err(PlatformError::new(5, "x")), 0);
        assert_eq!(denied, Err(HealthDataError::PermissionDenied(MetricKind::Steps)));

        let empty = classify(MetricKind::Steps, &codes, Err(PlatformError::new(11, "x")), 0);
        assert_eq!(empty, Ok(0));

        let other = classify(MetricKind::Steps, &codes, Err(PlatformError::new(2, "boom")), 0);
        assert!(matches!(other, Err(HealthDataError::UnknownError(_))));

        assert_eq!(classify(MetricKind::Steps, &codes, Ok(42), 0), Ok(42));
    }

    #[test]
    fn test_classify_respects_configured_codes() {
        let codes = PlatformErrorCodes {
            permission_denied: 100,
            no_data: 200,
        };

        let result = classify(MetricKind::Sleep, &codes, Err(PlatformError::new(5, "x")), 0.0);
        assert!(matches!(result, Err(HealthDataError::UnknownError(_))));

        let result = classify(MetricKind::Sleep, &codes, Err(PlatformError::new(100, "x")), 0.0);
        assert_eq!(result, Err(HealthDataError::PermissionDenied(MetricKind::Sleep)));

        let result = classify(MetricKind::Sleep, &codes, Err(PlatformError::new(200, "x")), 0.0);
        assert_eq!(result, Ok(0.0));
    }
}
