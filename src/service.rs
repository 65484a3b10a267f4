//! Service facade
//!
//! Wires the permission gate, daily aggregator and range aggregator to one
//! platform store and one published state.

use chrono::NaiveDate;
use std::sync::Arc;

use crate::aggregator::DailyAggregator;
use crate::config::AggregatorConfig;
use crate::error::HealthResult;
use crate::permissions::PermissionGate;
use crate::platform::HealthQueryService;
use crate::range::RangeAggregator;
use crate::state::StateHandle;
use crate::types::{AuthorizationState, Capability, MetricsRecord};

/// Stateful entry point for hosts that want every component at once
pub struct DailyMetricsService {
    permissions: PermissionGate,
    range: RangeAggregator,
    state: StateHandle,
}

impl DailyMetricsService {
    /// Build the service and schedule the initial permission refresh
    pub fn new(service: Arc<dyn HealthQueryService>, config: AggregatorConfig) -> Self {
        let state = StateHandle::new();
        let permissions = PermissionGate::new(Arc::clone(&service), state.clone());
        let daily = DailyAggregator::new(service, config, state.clone());

        permissions.spawn_initial_refresh();

        Self {
            permissions,
            range: RangeAggregator::new(Arc::new(daily)),
            state,
        }
    }

    pub fn state(&self) -> &StateHandle {
        &self.state
    }

    pub fn permissions(&self) -> &PermissionGate {
        &self.permissions
    }

    pub fn daily(&self) -> &DailyAggregator {
        self.range.daily()
    }

    pub fn range(&self) -> &RangeAggregator {
        &self.range
    }

    pub async fn request_access(&self) -> bool {
        self.permissions.request_access().await
    }

    pub fn status_text(&self, capability: Capability) -> &'static str {
        self.permissions.status_text(capability)
    }

    pub fn status(&self, capability: Capability) -> AuthorizationState {
        self.permissions.status(capability)
    }

    pub async fn fetch_metrics(&self, date: NaiveDate) -> HealthResult<MetricsRecord> {
        self.daily().fetch_metrics(date).await
    }

    pub async fn fetch_todays_metrics(&self) -> HealthResult<MetricsRecord> {
        self.daily().fetch_todays_metrics().await
    }

    pub async fn fetch_weekly_metrics(&self) -> HealthResult<Vec<MetricsRecord>> {
        self.range.fetch_weekly_metrics().await
    }
}
