//! Core types for Synheart Daily
//!
//! This module defines the data structures shared by every stage of the daily
//! aggregation: metric kinds, platform capabilities and their authorization
//! states, raw sleep samples, the aggregation window, and the per-day record.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::ops::RangeInclusive;
use uuid::Uuid;

use crate::config::CalendarZone;
use crate::error::{HealthDataError, HealthResult};

/// Domain-valid step count range
pub const STEPS_RANGE: RangeInclusive<i64> = 0..=50_000;
/// Domain-valid sleep duration range (hours)
pub const SLEEP_HOURS_RANGE: RangeInclusive<f64> = 0.0..=16.0;
/// Domain-valid screen time range (minutes)
pub const SCREEN_TIME_MINUTES_RANGE: RangeInclusive<i64> = 0..=1440;

/// Kind of metric carried by a daily record
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Steps,
    Sleep,
    ScreenTime,
}

impl MetricKind {
    pub const ALL: [MetricKind; 3] = [MetricKind::Steps, MetricKind::Sleep, MetricKind::ScreenTime];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Steps => "steps",
            MetricKind::Sleep => "sleep",
            MetricKind::ScreenTime => "screen_time",
        }
    }

    /// Platform capability backing this metric, if the platform provides one.
    ///
    /// Screen time is populated outside this crate and has no capability.
    pub fn capability(&self) -> Option<Capability> {
        match self {
            MetricKind::Steps => Some(Capability::StepCount),
            MetricKind::Sleep => Some(Capability::SleepAnalysis),
            MetricKind::ScreenTime => None,
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One queryable category of platform health data
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    StepCount,
    SleepAnalysis,
}

impl Capability {
    /// Capabilities this crate reads. Write access is never requested.
    pub const REQUIRED: [Capability; 2] = [Capability::StepCount, Capability::SleepAnalysis];

    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::StepCount => "step_count",
            Capability::SleepAnalysis => "sleep_analysis",
        }
    }

    /// Human label used in permission listings
    pub fn label(&self) -> &'static str {
        match self {
            Capability::StepCount => "Steps",
            Capability::SleepAnalysis => "Sleep",
        }
    }

    pub fn metric(&self) -> MetricKind {
        match self {
            Capability::StepCount => MetricKind::Steps,
            Capability::SleepAnalysis => MetricKind::Sleep,
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Last known authorization state for a capability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationState {
    #[default]
    NotDetermined,
    Denied,
    Authorized,
    Unknown,
}

impl AuthorizationState {
    /// Display text for permission listings
    pub fn status_text(&self) -> &'static str {
        match self {
            AuthorizationState::NotDetermined => "Not determined",
            AuthorizationState::Denied => "Denied",
            AuthorizationState::Authorized => "Authorized",
            AuthorizationState::Unknown => "Unknown",
        }
    }
}

/// Sleep stage classification attached to a platform sleep sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SleepStage {
    InBed,
    Awake,
    AsleepUnspecified,
    AsleepCore,
    AsleepDeep,
    AsleepRem,
    /// Legacy undifferentiated "asleep" tag
    Asleep,
}

impl SleepStage {
    /// Whether time in this stage counts toward sleep duration
    pub fn is_asleep(&self) -> bool {
        !matches!(self, SleepStage::InBed | SleepStage::Awake)
    }
}

/// A single sleep-analysis sample as reported by the platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SleepSample {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub stage: SleepStage,
}

impl SleepSample {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>, stage: SleepStage) -> Self {
        Self { start, end, stage }
    }

    /// Sample length in seconds (fractional)
    pub fn duration_seconds(&self) -> f64 {
        (self.end - self.start).num_milliseconds() as f64 / 1000.0
    }
}

/// Half-open aggregation window `[start, end)` for one calendar day.
///
/// Samples belong to the window when their *start* instant falls inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayWindow {
    pub date: NaiveDate,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DayWindow {
    /// Window from local midnight of `date` to 24 hours later
    pub fn for_date(date: NaiveDate, zone: &CalendarZone) -> HealthResult<Self> {
        let start = zone.start_of_day(date).ok_or_else(|| {
            HealthDataError::InvalidDate(format!("no local midnight for {date}"))
        })?;
        let end = start
            .checked_add_signed(Duration::hours(24))
            .ok_or_else(|| HealthDataError::InvalidDate(format!("window overflow for {date}")))?;
        Ok(Self { date, start, end })
    }

    /// Strict-start membership test
    pub fn contains_start(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant < self.end
    }
}

/// Aggregated metrics for one calendar date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsRecord {
    /// Unique per construction, never reused across calls
    pub id: Uuid,
    pub date: NaiveDate,
    pub steps: i64,
    pub sleep_hours: f64,
    /// Always 0 from this crate; filled in by the screen-time collaborator
    pub screen_time_minutes: i64,
    /// Metrics whose value is a fallback default and should be entered manually
    pub manually_entered: BTreeSet<MetricKind>,
    /// Metrics whose value was imputed (reserved)
    pub estimated_fields: BTreeSet<MetricKind>,
    pub last_updated: DateTime<Utc>,
}

impl MetricsRecord {
    /// Build a fresh record with a new id, stamped now
    pub fn new(
        date: NaiveDate,
        steps: i64,
        sleep_hours: f64,
        screen_time_minutes: i64,
        manually_entered: BTreeSet<MetricKind>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            date,
            steps,
            sleep_hours,
            screen_time_minutes,
            manually_entered,
            estimated_fields: BTreeSet::new(),
            last_updated: Utc::now(),
        }
    }

    /// All-zero record with no markers
    pub fn with_defaults(date: NaiveDate) -> Self {
        Self::new(date, 0, 0.0, 0, BTreeSet::new())
    }

    /// True when every numeric field lies within its domain-valid range.
    ///
    /// Advisory only: out-of-range records are still constructed and returned.
    pub fn is_valid(&self) -> bool {
        STEPS_RANGE.contains(&self.steps)
            && SLEEP_HOURS_RANGE.contains(&self.sleep_hours)
            && SCREEN_TIME_MINUTES_RANGE.contains(&self.screen_time_minutes)
    }

    pub fn needs_manual_entry(&self, kind: MetricKind) -> bool {
        self.manually_entered.contains(&kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    #[test]
    fn test_defaults_are_valid() {
        let record = MetricsRecord::with_defaults(date());
        assert!(record.is_valid());
        assert!(record.manually_entered.is_empty());
        assert!(record.estimated_fields.is_empty());
    }

    #[test]
    fn test_out_of_range_fields_are_invalid() {
        let mut record = MetricsRecord::with_defaults(date());
        record.steps = -1;
        assert!(!record.is_valid());

        let mut record = MetricsRecord::with_defaults(date());
        record.sleep_hours = 17.0;
        assert!(!record.is_valid());

        let mut record = MetricsRecord::with_defaults(date());
        record.screen_time_minutes = 1500;
        assert!(!record.is_valid());
    }

    #[test]
    fn test_range_bounds_are_inclusive() {
        let mut record = MetricsRecord::with_defaults(date());
        record.steps = 50_000;
        record.sleep_hours = 16.0;
        record.screen_time_minutes = 1440;
        assert!(record.is_valid());
    }

    #[test]
    fn test_sleep_stage_classification() {
        assert!(!SleepStage::InBed.is_asleep());
        assert!(!SleepStage::Awake.is_asleep());
        assert!(SleepStage::Asleep.is_asleep());
        assert!(SleepStage::AsleepUnspecified.is_asleep());
        assert!(SleepStage::AsleepCore.is_asleep());
        assert!(SleepStage::AsleepDeep.is_asleep());
        assert!(SleepStage::AsleepRem.is_asleep());
    }

    #[test]
    fn test_day_window_uses_zone_midnight() {
        let zone = CalendarZone::fixed(FixedOffset::east_opt(2 * 3600).unwrap());
        let window = DayWindow::for_date(date(), &zone).unwrap();

        assert_eq!(window.start, Utc.with_ymd_and_hms(2024, 1, 14, 22, 0, 0).unwrap());
        assert_eq!(window.end, Utc.with_ymd_and_hms(2024, 1, 15, 22, 0, 0).unwrap());
        assert!(window.contains_start(window.start));
        assert!(!window.contains_start(window.end));
    }

    #[test]
    fn test_status_text() {
        assert_eq!(AuthorizationState::NotDetermined.status_text(), "Not determined");
        assert_eq!(AuthorizationState::Denied.status_text(), "Denied");
        assert_eq!(AuthorizationState::Authorized.status_text(), "Authorized");
        assert_eq!(AuthorizationState::Unknown.status_text(), "Unknown");
    }

    #[test]
    fn test_metric_capability_mapping() {
        assert_eq!(MetricKind::Steps.capability(), Some(Capability::StepCount));
        assert_eq!(MetricKind::Sleep.capability(), Some(Capability::SleepAnalysis));
        assert_eq!(MetricKind::ScreenTime.capability(), None);
        assert_eq!(Capability::SleepAnalysis.metric(), MetricKind::Sleep);

        let backed: Vec<MetricKind> = MetricKind::ALL
            .into_iter()
            .filter(|kind| kind.capability().is_some())
            .collect();
        assert_eq!(backed, vec![MetricKind::Steps, MetricKind::Sleep]);
        for capability in Capability::REQUIRED {
            assert!(MetricKind::ALL.contains(&capability.metric()));
        }
    }
}
