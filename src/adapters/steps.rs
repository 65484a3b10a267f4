//! Step count adapter
//!
//! Issues a cumulative-sum query against the step-count capability.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use super::{classify, ensure_supported, SourceQueryAdapter};
use crate::config::PlatformErrorCodes;
use crate::error::HealthResult;
use crate::platform::HealthQueryService;
use crate::types::{Capability, MetricKind};

/// Step count adapter
pub struct StepsAdapter {
    service: Arc<dyn HealthQueryService>,
    codes: PlatformErrorCodes,
}

impl StepsAdapter {
    pub fn new(service: Arc<dyn HealthQueryService>, codes: PlatformErrorCodes) -> Self {
        Self { service, codes }
    }
}

#[async_trait]
impl SourceQueryAdapter for StepsAdapter {
    type Value = i64;

    fn kind(&self) -> MetricKind {
        MetricKind::Steps
    }

    fn fallback(&self) -> i64 {
        0
    }

    async fn query(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> HealthResult<i64> {
        ensure_supported(self.service.as_ref(), Capability::StepCount)?;

        let result = self
            .service
            .query_sum(Capability::StepCount, start, end)
            .await;
        let sum = classify(MetricKind::Steps, &self.codes, result, None)?;

        // Partial steps from fractional samples are dropped
        Ok(sum.map_or(0, |total| total.trunc() as i64))
    }
}
