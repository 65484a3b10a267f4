//! Platform health store boundary
//!
//! The aggregators never talk to a concrete health database. They consume the
//! narrow [`HealthQueryService`] trait below, which a platform binding (or the
//! in-memory store in [`memory`]) implements.

pub mod memory;

pub use memory::{HealthFixture, InMemoryHealthStore, StepSample};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::PlatformError;
use crate::types::{AuthorizationState, Capability, SleepSample};

/// Capability-gated query service exposed by the platform.
///
/// Range queries use strict-start semantics over `[start, end)`: a sample is
/// in range when its start instant is `>= start` and `< end`.
#[async_trait]
pub trait HealthQueryService: Send + Sync {
    /// Whether the device exposes health data at all
    fn is_available(&self) -> bool;

    /// Whether `capability` is registered on this platform
    fn supports(&self, _capability: Capability) -> bool {
        true
    }

    /// Current authorization state for `capability`
    fn authorization_status(&self, capability: Capability) -> AuthorizationState;

    /// Ask the user for read access. Completion says nothing about the answer.
    async fn request_authorization(&self, read: &[Capability]) -> Result<(), PlatformError>;

    /// Cumulative sum of a quantity over the range; `Ok(None)` means no data
    async fn query_sum(
        &self,
        capability: Capability,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Option<f64>, PlatformError>;

    /// Category samples in the range, in platform order
    async fn query_samples(
        &self,
        capability: Capability,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<SleepSample>, PlatformError>;
}
