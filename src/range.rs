//! Range aggregation
//!
//! Builds a trailing run of daily records by invoking the daily aggregator
//! once per date, oldest first. Days run one after another so at most one
//! day's queries are outstanding at a time.

use chrono::{Days, NaiveDate};
use std::sync::Arc;
use tracing::instrument;

use crate::aggregator::DailyAggregator;
use crate::error::{HealthDataError, HealthResult};
use crate::types::MetricsRecord;

/// Days in the weekly rollup
pub const WEEK_DAYS: u32 = 7;

/// Aggregates a contiguous run of days
#[derive(Clone)]
pub struct RangeAggregator {
    daily: Arc<DailyAggregator>,
}

impl RangeAggregator {
    pub fn new(daily: Arc<DailyAggregator>) -> Self {
        Self { daily }
    }

    pub fn daily(&self) -> &DailyAggregator {
        &self.daily
    }

    /// The seven days ending today, ascending
    pub async fn fetch_weekly_metrics(&self) -> HealthResult<Vec<MetricsRecord>> {
        self.fetch_range(self.daily.today(), WEEK_DAYS).await
    }

    /// The configured number of days ending today, ascending
    pub async fn fetch_trailing_metrics(&self) -> HealthResult<Vec<MetricsRecord>> {
        let days = self.daily.config().range_days;
        self.fetch_range(self.daily.today(), days).await
    }

    /// `days` consecutive records ending at `end`, ascending.
    ///
    /// The first failing day aborts the run; no partial sequence is returned.
    #[instrument(skip(self))]
    pub async fn fetch_range(&self, end: NaiveDate, days: u32) -> HealthResult<Vec<MetricsRecord>> {
        let dates = trailing_dates(end, days)?;

        let mut records = Vec::with_capacity(dates.len());
        for date in dates {
            records.push(self.daily.fetch_metrics(date).await?);
        }
        Ok(records)
    }
}

/// `days` consecutive dates ending at `end`, oldest first
fn trailing_dates(end: NaiveDate, days: u32) -> HealthResult<Vec<NaiveDate>> {
    if days == 0 {
        return Ok(Vec::new());
    }
    let start = end
        .checked_sub_days(Days::new(u64::from(days - 1)))
        .ok_or_else(|| HealthDataError::InvalidDate(format!("{days} days before {end}")))?;

    (0..u64::from(days))
        .map(|offset| {
            start.checked_add_days(Days::new(offset)).ok_or_else(|| {
                HealthDataError::InvalidDate(format!("{offset} days after {start}"))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AggregatorConfig, CalendarZone};
    use crate::platform::{InMemoryHealthStore, StepSample};
    use crate::state::StateHandle;
    use chrono::{Duration, TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn range(store: &Arc<InMemoryHealthStore>, config: AggregatorConfig) -> RangeAggregator {
        let daily = DailyAggregator::new(store.clone(), config, StateHandle::new());
        RangeAggregator::new(Arc::new(daily))
    }

    fn utc_config() -> AggregatorConfig {
        AggregatorConfig::default().with_zone(CalendarZone::utc())
    }

    #[test]
    fn test_trailing_dates() {
        let end = NaiveDate::from_ymd_opt(2024, 3, 2).unwrap();
        let dates = trailing_dates(end, 3).unwrap();
        assert_eq!(
            dates,
            vec![
                NaiveDate::from_ymd_opt(2024, 2, 29).unwrap(),
                NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
                end,
            ]
        );
        assert!(trailing_dates(end, 0).unwrap().is_empty());
    }

    #[test]
    fn test_trailing_dates_underflow() {
        let result = trailing_dates(NaiveDate::MIN, 2);
        assert!(matches!(result, Err(HealthDataError::InvalidDate(_))));
    }

    #[tokio::test]
    async fn test_weekly_metrics_end_today() {
        let store = Arc::new(InMemoryHealthStore::authorized());
        let range = range(&store, utc_config());

        let records = range.fetch_weekly_metrics().await.unwrap();
        let today = range.daily().today();

        assert_eq!(records.len(), 7);
        assert_eq!(records.last().map(|r| r.date), Some(today));
        for pair in records.windows(2) {
            assert_eq!(pair[1].date, pair[0].date + Duration::days(1));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_days_run_sequentially() {
        let store = Arc::new(InMemoryHealthStore::authorized());
        store.set_query_latency(std::time::Duration::from_millis(10));
        let range = range(&store, utc_config());

        range.fetch_weekly_metrics().await.unwrap();

        assert_eq!(store.total_queries(), 14);
        assert_eq!(store.peak_concurrent_queries(), 2);
    }

    #[tokio::test]
    async fn test_range_places_data_on_its_day() {
        let store = Arc::new(InMemoryHealthStore::authorized());
        let start = Utc.with_ymd_and_hms(2024, 1, 14, 12, 0, 0).unwrap();
        store.add_steps(StepSample::new(start, start + Duration::minutes(30), 1500.0));
        let range = range(&store, utc_config());

        let end = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let records = range.fetch_range(end, 3).await.unwrap();

        let steps: Vec<i64> = records.iter().map(|r| r.steps).collect();
        assert_eq!(steps, vec![0, 1500, 0]);
    }

    #[tokio::test]
    async fn test_trailing_metrics_use_configured_length() {
        let store = Arc::new(InMemoryHealthStore::authorized());
        let mut config = utc_config();
        config.range_days = 3;
        let range = range(&store, config);

        assert_eq!(range.fetch_trailing_metrics().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_failure_aborts_run() {
        let store = Arc::new(InMemoryHealthStore::authorized());
        let config = AggregatorConfig::default().with_zone(CalendarZone::Fixed {
            offset_seconds: 48 * 3600,
        });
        let range = range(&store, config);

        let end = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let result = range.fetch_range(end, 7).await;

        assert!(matches!(result, Err(HealthDataError::InvalidDate(_))));
        assert_eq!(store.total_queries(), 0);
    }

    #[tokio::test]
    async fn test_failure_after_successful_days_discards_them() {
        // The last representable date has no room for a 24h window
        let store = Arc::new(InMemoryHealthStore::authorized());
        let range = range(&store, utc_config());

        let result = range.fetch_range(NaiveDate::MAX, 3).await;

        assert!(matches!(result, Err(HealthDataError::InvalidDate(_))));
        assert_eq!(store.total_queries(), 4);
        assert!(!range.daily().state().is_loading());
    }
}
