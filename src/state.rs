//! Observable service state
//!
//! Loading flag, last error, and the cached permission map, published through
//! a `tokio::sync::watch` channel. Only the aggregators and the permission gate
//! write; any number of observers can [`StateHandle::subscribe`].

use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::watch;

use crate::error::HealthDataError;
use crate::types::{AuthorizationState, Capability};

/// Snapshot of the published state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServiceState {
    /// Number of aggregation or permission calls currently running
    pub in_flight: usize,
    pub last_error: Option<HealthDataError>,
    pub permissions: BTreeMap<Capability, AuthorizationState>,
}

impl ServiceState {
    pub fn is_loading(&self) -> bool {
        self.in_flight > 0
    }
}

/// Shared handle to the published state
#[derive(Debug, Clone)]
pub struct StateHandle {
    tx: Arc<watch::Sender<ServiceState>>,
}

impl Default for StateHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl StateHandle {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ServiceState::default());
        Self { tx: Arc::new(tx) }
    }

    /// Receiver notified on every state change
    pub fn subscribe(&self) -> watch::Receiver<ServiceState> {
        self.tx.subscribe()
    }

    pub fn snapshot(&self) -> ServiceState {
        self.tx.borrow().clone()
    }

    pub fn is_loading(&self) -> bool {
        self.tx.borrow().is_loading()
    }

    pub fn last_error(&self) -> Option<HealthDataError> {
        self.tx.borrow().last_error.clone()
    }

    pub fn permissions(&self) -> BTreeMap<Capability, AuthorizationState> {
        self.tx.borrow().permissions.clone()
    }

    /// Dismiss the last error
    pub fn clear_error(&self) {
        self.tx.send_modify(|state| state.last_error = None);
    }

    /// Mark a call as running until the returned guard is dropped.
    ///
    /// The guard is released on success, on error, and when the enclosing
    /// future is cancelled.
    pub(crate) fn begin_loading(&self) -> LoadingGuard {
        self.tx.send_modify(|state| state.in_flight += 1);
        LoadingGuard {
            tx: Arc::clone(&self.tx),
        }
    }

    pub(crate) fn set_error(&self, error: HealthDataError) {
        self.tx.send_modify(|state| state.last_error = Some(error));
    }

    pub(crate) fn set_permissions(&self, permissions: BTreeMap<Capability, AuthorizationState>) {
        self.tx.send_modify(|state| state.permissions = permissions);
    }
}

/// Scoped loading marker
#[must_use = "loading is cleared as soon as the guard is dropped"]
pub(crate) struct LoadingGuard {
    tx: Arc<watch::Sender<ServiceState>>,
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        self.tx
            .send_modify(|state| state.in_flight = state.in_flight.saturating_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MetricKind;

    #[test]
    fn test_guard_clears_loading() {
        let state = StateHandle::new();
        assert!(!state.is_loading());
        {
            let _guard = state.begin_loading();
            assert!(state.is_loading());
        }
        assert!(!state.is_loading());
    }

    #[test]
    fn test_overlapping_guards() {
        let state = StateHandle::new();
        let first = state.begin_loading();
        let second = state.begin_loading();
        drop(first);
        assert!(state.is_loading());
        drop(second);
        assert!(!state.is_loading());
    }

    #[test]
    fn test_error_slot() {
        let state = StateHandle::new();
        state.set_error(HealthDataError::PermissionDenied(MetricKind::Sleep));
        assert_eq!(
            state.last_error(),
            Some(HealthDataError::PermissionDenied(MetricKind::Sleep))
        );
        state.clear_error();
        assert_eq!(state.last_error(), None);
    }

    #[tokio::test]
    async fn test_observers_see_changes() {
        let state = StateHandle::new();
        let mut rx = state.subscribe();

        let guard = state.begin_loading();
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().is_loading());

        drop(guard);
        rx.changed().await.unwrap();
        assert!(!rx.borrow_and_update().is_loading());
    }
}
