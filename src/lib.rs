//! Synheart Daily - On-device daily health-metrics aggregation
//!
//! Daily turns a platform health store into one well-formed record per calendar
//! day: per-source adapters query steps and sleep concurrently, missing or
//! denied sources fall back to zero and are marked for manual entry, and a
//! range aggregator rolls single days up into a trailing week.
//!
//! ## Modules
//!
//! - **Adapters**: One adapter per platform capability (steps, sleep)
//! - **Aggregators**: Daily fork-join aggregation and trailing-range rollups
//! - **Permissions**: Authorization tracking and access requests
//! - **Platform**: The query-service boundary and an in-memory store

pub mod adapters;
pub mod aggregator;
pub mod config;
pub mod error;
pub mod logging;
pub mod permissions;
pub mod platform;
pub mod range;
pub mod service;
pub mod state;
pub mod types;

pub use aggregator::DailyAggregator;
pub use config::{AggregatorConfig, CalendarZone, PlatformErrorCodes};
pub use error::{HealthDataError, HealthResult, PlatformError};
pub use permissions::PermissionGate;
pub use platform::{HealthQueryService, InMemoryHealthStore};
pub use range::RangeAggregator;
pub use service::DailyMetricsService;
pub use state::{ServiceState, StateHandle};
pub use types::{AuthorizationState, Capability, MetricKind, MetricsRecord};

/// Daily version
pub const DAILY_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name used in logs and CLI output
pub const PRODUCER_NAME: &str = "synheart-daily";
