//! Daily aggregation
//!
//! For one calendar date: cut the `[midnight, midnight + 24h)` window, query the
//! step and sleep sources concurrently, substitute fallbacks for anything that
//! failed or came back empty, and build a fresh [`MetricsRecord`].

use chrono::NaiveDate;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::adapters::{SleepAdapter, SourceQueryAdapter, StepsAdapter};
use crate::config::AggregatorConfig;
use crate::error::HealthResult;
use crate::platform::HealthQueryService;
use crate::state::StateHandle;
use crate::types::{DayWindow, MetricKind, MetricsRecord};

/// Aggregates one day of metrics from the platform sources
pub struct DailyAggregator {
    steps: StepsAdapter,
    sleep: SleepAdapter,
    config: AggregatorConfig,
    state: StateHandle,
}

impl DailyAggregator {
    pub fn new(
        service: Arc<dyn HealthQueryService>,
        config: AggregatorConfig,
        state: StateHandle,
    ) -> Self {
        Self {
            steps: StepsAdapter::new(Arc::clone(&service), config.error_codes),
            sleep: SleepAdapter::new(service, config.error_codes),
            config,
            state,
        }
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    pub fn state(&self) -> &StateHandle {
        &self.state
    }

    /// Current date in the configured calendar
    pub fn today(&self) -> NaiveDate {
        self.config.zone.today()
    }

    /// Metrics for the current date
    pub async fn fetch_todays_metrics(&self) -> HealthResult<MetricsRecord> {
        self.fetch_metrics(self.today()).await
    }

    /// Metrics for `date`.
    ///
    /// Source failures never fail the call: a denied, missing, or broken source
    /// yields its zero fallback and the metric is marked for manual entry.
    /// Only a date whose window cannot be computed is an error.
    #[instrument(skip_all, fields(date = %date))]
    pub async fn fetch_metrics(&self, date: NaiveDate) -> HealthResult<MetricsRecord> {
        let _loading = self.state.begin_loading();
        let window = DayWindow::for_date(date, &self.config.zone)?;

        let (steps, sleep_hours) = tokio::join!(
            query_or_fallback(&self.steps, &window),
            query_or_fallback(&self.sleep, &window),
        );

        let mut manually_entered = BTreeSet::new();
        if steps == self.steps.fallback() {
            manually_entered.insert(MetricKind::Steps);
        }
        if sleep_hours == self.sleep.fallback() {
            manually_entered.insert(MetricKind::Sleep);
        }

        let record = MetricsRecord::new(date, steps, sleep_hours, 0, manually_entered);
        debug!(
            steps = record.steps,
            sleep_hours = record.sleep_hours,
            manually_entered = ?record.manually_entered,
            "aggregated daily metrics"
        );
        Ok(record)
    }
}

/// Run one source query, absorbing any error into the adapter's fallback
async fn query_or_fallback<A: SourceQueryAdapter>(adapter: &A, window: &DayWindow) -> A::Value {
    match adapter.query(window.start, window.end).await {
        Ok(value) => value,
        Err(err) => {
            warn!(
                metric = %adapter.kind(),
                date = %window.date,
                error = %err,
                "source query failed, using fallback"
            );
            adapter.fallback()
        }
    }
}
