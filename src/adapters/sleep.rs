//! Sleep analysis adapter
//!
//! Fetches sleep samples and converts the time spent in asleep stages to hours.
//! In-bed and awake samples are ignored.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use super::{classify, ensure_supported, SourceQueryAdapter};
use crate::config::PlatformErrorCodes;
use crate::error::HealthResult;
use crate::platform::HealthQueryService;
use crate::types::{Capability, MetricKind, SleepSample};

const SECONDS_PER_HOUR: f64 = 3600.0;

/// Total hours spent in asleep stages.
///
/// Overlapping samples (e.g. from two devices) are summed as-is, not merged.
pub fn asleep_hours(samples: &[SleepSample]) -> f64 {
    let seconds: f64 = samples
        .iter()
        .filter(|s| s.stage.is_asleep())
        .map(SleepSample::duration_seconds)
        .sum();
    seconds / SECONDS_PER_HOUR
}

/// Sleep analysis adapter
pub struct SleepAdapter {
    service: Arc<dyn HealthQueryService>,
    codes: PlatformErrorCodes,
}

impl SleepAdapter {
    pub fn new(service: Arc<dyn HealthQueryService>, codes: PlatformErrorCodes) -> Self {
        Self { service, codes }
    }
}

#[async_trait]
impl SourceQueryAdapter for SleepAdapter {
    type Value = f64;

    fn kind(&self) -> MetricKind {
        MetricKind::Sleep
    }

    fn fallback(&self) -> f64 {
        0.0
    }

    async fn query(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> HealthResult<f64> {
        ensure_supported(self.service.as_ref(), Capability::SleepAnalysis)?;

        let result = self
            .service
            .query_samples(Capability::SleepAnalysis, start, end)
            .await;
        let samples = classify(MetricKind::Sleep, &self.codes, result, Vec::new())?;

        Ok(asleep_hours(&samples))
    }
}
