//! In-memory health store
//!
//! Deterministic implementation of [`HealthQueryService`] backed by fixture
//! data. Used by the CLI and by tests; it follows the same strict-start range
//! semantics as a real platform store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use super::HealthQueryService;
use crate::error::PlatformError;
use crate::types::{AuthorizationState, Capability, SleepSample};

/// A quantity sample of step counts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepSample {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub count: f64,
}

impl StepSample {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>, count: f64) -> Self {
        Self { start, end, count }
    }
}

fn default_true() -> bool {
    true
}

fn default_grant() -> AuthorizationState {
    AuthorizationState::Authorized
}

/// Serializable contents of an [`InMemoryHealthStore`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthFixture {
    /// Whether health data exists on the device at all
    #[serde(default = "default_true")]
    pub available: bool,
    /// Capabilities the platform does not register
    #[serde(default)]
    pub unsupported: Vec<Capability>,
    /// Authorization state per capability; missing entries are not determined
    #[serde(default)]
    pub authorization: BTreeMap<Capability, AuthorizationState>,
    /// State assigned to not-determined capabilities when access is requested
    #[serde(default = "default_grant")]
    pub grant_on_request: AuthorizationState,
    /// Failure returned by the authorization request itself
    #[serde(default)]
    pub request_error: Option<PlatformError>,
    /// Failure returned by every query against a capability
    #[serde(default)]
    pub failures: BTreeMap<Capability, PlatformError>,
    /// Simulated latency applied to each query, in milliseconds
    #[serde(default)]
    pub query_latency_ms: u64,
    #[serde(default)]
    pub steps: Vec<StepSample>,
    #[serde(default)]
    pub sleep: Vec<SleepSample>,
}

impl Default for HealthFixture {
    fn default() -> Self {
        Self {
            available: true,
            unsupported: Vec::new(),
            authorization: BTreeMap::new(),
            grant_on_request: AuthorizationState::Authorized,
            request_error: None,
            failures: BTreeMap::new(),
            query_latency_ms: 0,
            steps: Vec::new(),
            sleep: Vec::new(),
        }
    }
}

/// Fixture-backed health store
#[derive(Debug, Default)]
pub struct InMemoryHealthStore {
    data: RwLock<HealthFixture>,
    active_queries: AtomicUsize,
    peak_queries: AtomicUsize,
    total_queries: AtomicUsize,
    authorization_requests: AtomicUsize,
}

impl InMemoryHealthStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fixture(fixture: HealthFixture) -> Self {
        Self {
            data: RwLock::new(fixture),
            ..Self::default()
        }
    }

    /// Parse a JSON fixture
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        Ok(Self::from_fixture(serde_json::from_str(json)?))
    }

    /// Store with every required capability already authorized
    pub fn authorized() -> Self {
        let store = Self::new();
        for capability in Capability::REQUIRED {
            store.set_authorization(capability, AuthorizationState::Authorized);
        }
        store
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HealthFixture> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HealthFixture> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_available(&self, available: bool) {
        self.write().available = available;
    }

    pub fn set_unsupported(&self, capability: Capability) {
        self.write().unsupported.push(capability);
    }

    pub fn set_authorization(&self, capability: Capability, state: AuthorizationState) {
        self.write().authorization.insert(capability, state);
    }

    pub fn set_grant_on_request(&self, state: AuthorizationState) {
        self.write().grant_on_request = state;
    }

    pub fn set_request_error(&self, error: Option<PlatformError>) {
        self.write().request_error = error;
    }

    /// Make every query against `capability` fail with `error`
    pub fn fail_with(&self, capability: Capability, error: PlatformError) {
        self.write().failures.insert(capability, error);
    }

    pub fn clear_failure(&self, capability: Capability) {
        self.write().failures.remove(&capability);
    }

    pub fn set_query_latency(&self, latency: Duration) {
        self.write().query_latency_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
    }

    pub fn add_steps(&self, sample: StepSample) {
        self.write().steps.push(sample);
    }

    pub fn add_sleep(&self, sample: SleepSample) {
        self.write().sleep.push(sample);
    }

    /// Snapshot of the current fixture contents
    pub fn fixture(&self) -> HealthFixture {
        self.read().clone()
    }

    /// Highest number of queries that were outstanding at the same time
    pub fn peak_concurrent_queries(&self) -> usize {
        self.peak_queries.load(Ordering::SeqCst)
    }

    pub fn total_queries(&self) -> usize {
        self.total_queries.load(Ordering::SeqCst)
    }

    pub fn authorization_requests(&self) -> usize {
        self.authorization_requests.load(Ordering::SeqCst)
    }

    /// Track an outstanding query for its lifetime and apply simulated latency
    async fn enter_query(&self, capability: Capability) -> Result<QueryTicket<'_>, PlatformError> {
        let active = self.active_queries.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_queries.fetch_max(active, Ordering::SeqCst);
        self.total_queries.fetch_add(1, Ordering::SeqCst);
        let ticket = QueryTicket { store: self };

        let (latency_ms, failure) = {
            let data = self.read();
            (data.query_latency_ms, data.failures.get(&capability).cloned())
        };
        if latency_ms > 0 {
            tokio::time::sleep(Duration::from_millis(latency_ms)).await;
        }
        match failure {
            Some(err) => Err(err),
            None => Ok(ticket),
        }
    }
}

struct QueryTicket<'a> {
    store: &'a InMemoryHealthStore,
}

impl Drop for QueryTicket<'_> {
    fn drop(&mut self) {
        self.store.active_queries.fetch_sub(1, Ordering::SeqCst);
    }
}

fn starts_within(start: DateTime<Utc>, from: DateTime<Utc>, to: DateTime<Utc>) -> bool {
    start >= from && start < to
}

#[async_trait]
impl HealthQueryService for InMemoryHealthStore {
    fn is_available(&self) -> bool {
        self.read().available
    }

    fn supports(&self, capability: Capability) -> bool {
        !self.read().unsupported.contains(&capability)
    }

    fn authorization_status(&self, capability: Capability) -> AuthorizationState {
        self.read()
            .authorization
            .get(&capability)
            .copied()
            .unwrap_or_default()
    }

    async fn request_authorization(&self, read: &[Capability]) -> Result<(), PlatformError> {
        self.authorization_requests.fetch_add(1, Ordering::SeqCst);
        let mut data = self.write();
        if let Some(err) = data.request_error.clone() {
            return Err(err);
        }
        let grant = data.grant_on_request;
        for capability in read {
            let state = data.authorization.entry(*capability).or_default();
            if *state == AuthorizationState::NotDetermined {
                *state = grant;
            }
        }
        Ok(())
    }

    async fn query_sum(
        &self,
        capability: Capability,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Option<f64>, PlatformError> {
        let _ticket = self.enter_query(capability).await?;
        if capability != Capability::StepCount {
            return Err(PlatformError::new(
                3,
                format!("{capability} is not a cumulative quantity"),
            ));
        }

        let data = self.read();
        let mut matched = data
            .steps
            .iter()
            .filter(|s| starts_within(s.start, start, end))
            .peekable();
        if matched.peek().is_none() {
            return Ok(None);
        }
        Ok(Some(matched.map(|s| s.count).sum()))
    }

    async fn query_samples(
        &self,
        capability: Capability,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<SleepSample>, PlatformError> {
        let _ticket = self.enter_query(capability).await?;
        if capability != Capability::SleepAnalysis {
            return Err(PlatformError::new(
                3,
                format!("{capability} is not a category type"),
            ));
        }

        Ok(self
            .read()
            .sleep
            .iter()
            .filter(|s| starts_within(s.start, start, end))
            .cloned()
            .collect())
    }
}
