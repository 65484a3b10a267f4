//! Aggregation configuration
//!
//! Platform error codes, the calendar used to cut days, and the length of the
//! trailing range. Everything can be loaded from the environment.

use chrono::{DateTime, FixedOffset, Local, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::env;

/// Platform code reported when read access was denied
pub const DEFAULT_PERMISSION_DENIED_CODE: i64 = 5;
/// Platform code reported when a query matched no data
pub const DEFAULT_NO_DATA_CODE: i64 = 11;
/// Default trailing range length in days
pub const DEFAULT_RANGE_DAYS: u32 = 7;

/// Platform error codes that map onto the permission-denied and no-data buckets.
///
/// Any other code is treated as a genuine failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformErrorCodes {
    pub permission_denied: i64,
    pub no_data: i64,
}

impl Default for PlatformErrorCodes {
    fn default() -> Self {
        Self {
            permission_denied: DEFAULT_PERMISSION_DENIED_CODE,
            no_data: DEFAULT_NO_DATA_CODE,
        }
    }
}

/// Calendar used to find midnight and "today"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CalendarZone {
    /// System local time zone
    #[default]
    Local,
    /// Fixed offset east of UTC
    Fixed { offset_seconds: i32 },
}

impl CalendarZone {
    pub fn utc() -> Self {
        CalendarZone::Fixed { offset_seconds: 0 }
    }

    pub fn fixed(offset: FixedOffset) -> Self {
        CalendarZone::Fixed {
            offset_seconds: offset.local_minus_utc(),
        }
    }

    /// Instant of local midnight on `date`, or `None` when it does not exist
    pub fn start_of_day(&self, date: NaiveDate) -> Option<DateTime<Utc>> {
        let midnight = date.and_hms_opt(0, 0, 0)?;
        match self {
            CalendarZone::Local => Local
                .from_local_datetime(&midnight)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc)),
            CalendarZone::Fixed { offset_seconds } => FixedOffset::east_opt(*offset_seconds)?
                .from_local_datetime(&midnight)
                .single()
                .map(|dt| dt.with_timezone(&Utc)),
        }
    }

    /// Current calendar date in this zone
    pub fn today(&self) -> NaiveDate {
        match self {
            CalendarZone::Local => Local::now().date_naive(),
            // An out-of-range offset falls back to the UTC date
            CalendarZone::Fixed { offset_seconds } => match FixedOffset::east_opt(*offset_seconds) {
                Some(offset) => Utc::now().with_timezone(&offset).date_naive(),
                None => Utc::now().date_naive(),
            },
        }
    }
}

/// Configuration shared by the aggregators and source adapters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatorConfig {
    pub error_codes: PlatformErrorCodes,
    pub zone: CalendarZone,
    /// Days covered by the trailing range, ending today
    pub range_days: u32,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            error_codes: PlatformErrorCodes::default(),
            zone: CalendarZone::Local,
            range_days: DEFAULT_RANGE_DAYS,
        }
    }
}

impl AggregatorConfig {
    /// Load configuration from environment variables.
    ///
    /// Unset or unparsable values fall back to defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let zone = env::var("DAILY_UTC_OFFSET_SECONDS")
            .ok()
            .and_then(|s| s.parse::<i32>().ok())
            .and_then(FixedOffset::east_opt)
            .map_or(CalendarZone::Local, CalendarZone::fixed);

        Self {
            error_codes: PlatformErrorCodes {
                permission_denied: env_parse_or(
                    "DAILY_PERMISSION_DENIED_CODE",
                    DEFAULT_PERMISSION_DENIED_CODE,
                ),
                no_data: env_parse_or("DAILY_NO_DATA_CODE", DEFAULT_NO_DATA_CODE),
            },
            zone,
            range_days: env_parse_or("DAILY_RANGE_DAYS", DEFAULT_RANGE_DAYS),
        }
    }

    pub fn with_zone(mut self, zone: CalendarZone) -> Self {
        self.zone = zone;
        self
    }

    pub fn with_error_codes(mut self, error_codes: PlatformErrorCodes) -> Self {
        self.error_codes = error_codes;
        self
    }
}

fn env_parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_defaults() {
        let config = AggregatorConfig::default();
        assert_eq!(config.error_codes.permission_denied, 5);
        assert_eq!(config.error_codes.no_data, 11);
        assert_eq!(config.range_days, 7);
        assert_eq!(config.zone, CalendarZone::Local);
    }

    #[test]
    fn test_fixed_zone_midnight() {
        let zone = CalendarZone::Fixed {
            offset_seconds: -5 * 3600,
        };
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let start = zone.start_of_day(date).unwrap();
        assert_eq!(start.hour(), 5);
        assert_eq!(start.date_naive(), date);
    }

    #[test]
    fn test_invalid_offset_has_no_midnight() {
        let zone = CalendarZone::Fixed {
            offset_seconds: 30 * 3600,
        };
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        assert!(zone.start_of_day(date).is_none());
    }

    #[test]
    fn test_config_serde() {
        let json = r#"{
            "error_codes": { "permission_denied": 7, "no_data": 9 },
            "zone": { "kind": "fixed", "offset_seconds": 3600 },
            "range_days": 14
        }"#;
        let config: AggregatorConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.error_codes.permission_denied, 7);
        assert_eq!(config.zone, CalendarZone::Fixed { offset_seconds: 3600 });
        assert_eq!(config.range_days, 14);
    }
}
