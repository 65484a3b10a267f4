//! Permission gate
//!
//! Tracks the last known authorization state of each required capability and
//! wraps the platform's access request.
//!
//! A completed request does not mean access was granted: the platform hides
//! read-consent answers from the requester. Callers learn the real outcome
//! from the fallback markers on aggregated records.

use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{HealthDataError, Unavailable};
use crate::platform::HealthQueryService;
use crate::state::StateHandle;
use crate::types::{AuthorizationState, Capability};

/// Permission gate over the platform health store
#[derive(Clone)]
pub struct PermissionGate {
    service: Arc<dyn HealthQueryService>,
    state: StateHandle,
}

impl PermissionGate {
    pub fn new(service: Arc<dyn HealthQueryService>, state: StateHandle) -> Self {
        Self { service, state }
    }

    /// Re-read the authorization state of every required capability and publish it
    pub fn refresh(&self) {
        let permissions: BTreeMap<Capability, AuthorizationState> = Capability::REQUIRED
            .iter()
            .map(|&capability| (capability, self.service.authorization_status(capability)))
            .collect();
        debug!(?permissions, "refreshed permission status");
        self.state.set_permissions(permissions);
    }

    /// Schedule the start-up refresh without blocking the caller.
    ///
    /// Outside a tokio runtime the refresh runs inline and `None` is returned.
    pub fn spawn_initial_refresh(&self) -> Option<JoinHandle<()>> {
        match Handle::try_current() {
            Ok(handle) => {
                let gate = self.clone();
                Some(handle.spawn(async move { gate.refresh() }))
            }
            Err(_) => {
                self.refresh();
                None
            }
        }
    }

    /// Ask the platform for read access to every required capability.
    ///
    /// Returns `false` when the device has no health store or the request
    /// itself fails; `true` otherwise, whatever the user answered.
    pub async fn request_access(&self) -> bool {
        if !self.service.is_available() {
            warn!("health data is not available on this device");
            self.state
                .set_error(HealthDataError::DataUnavailable(Unavailable::Device));
            return false;
        }

        let _loading = self.state.begin_loading();
        let result = self
            .service
            .request_authorization(&Capability::REQUIRED)
            .await;
        self.refresh();

        match result {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, "authorization request failed");
                self.state.set_error(err.into());
                false
            }
        }
    }

    /// Current platform state for `capability`
    pub fn status(&self, capability: Capability) -> AuthorizationState {
        self.service.authorization_status(capability)
    }

    /// Display text for `capability`'s current state
    pub fn status_text(&self, capability: Capability) -> &'static str {
        self.status(capability).status_text()
    }

    /// Cached map from the last refresh
    pub fn permissions(&self) -> BTreeMap<Capability, AuthorizationState> {
        self.state.permissions()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PlatformError;
    use crate::platform::InMemoryHealthStore;

    fn gate(store: &Arc<InMemoryHealthStore>) -> (PermissionGate, StateHandle) {
        let state = StateHandle::new();
        (PermissionGate::new(store.clone(), state.clone()), state)
    }

    #[tokio::test]
    async fn test_request_resolves_true_even_when_denied() {
        let store = Arc::new(InMemoryHealthStore::new());
        store.set_grant_on_request(AuthorizationState::Denied);
        let (gate, state) = gate(&store);

        assert!(gate.request_access().await);
        assert_eq!(gate.status_text(Capability::StepCount), "Denied");
        assert_eq!(
            state.permissions().get(&Capability::SleepAnalysis),
            Some(&AuthorizationState::Denied)
        );
        assert!(!state.is_loading());
        assert_eq!(state.last_error(), None);
    }

    #[tokio::test]
    async fn test_unavailable_device_fails_closed() {
        let store = Arc::new(InMemoryHealthStore::new());
        store.set_available(false);
        let (gate, state) = gate(&store);

        assert!(!gate.request_access().await);
        assert_eq!(store.authorization_requests(), 0);
        assert_eq!(
            state.last_error(),
            Some(HealthDataError::DataUnavailable(Unavailable::Device))
        );
    }

    #[tokio::test]
    async fn test_request_error_is_published() {
        let store = Arc::new(InMemoryHealthStore::new());
        store.set_request_error(Some(PlatformError::new(1, "consent sheet failed")));
        let (gate, state) = gate(&store);

        assert!(!gate.request_access().await);
        assert!(matches!(
            state.last_error(),
            Some(HealthDataError::UnknownError(_))
        ));
        assert!(!state.is_loading());
        assert_eq!(
            state.permissions().get(&Capability::StepCount),
            Some(&AuthorizationState::NotDetermined)
        );
    }

    #[tokio::test]
    async fn test_initial_refresh_runs_in_background() {
        let store = Arc::new(InMemoryHealthStore::authorized());
        let (gate, state) = gate(&store);
        assert!(state.permissions().is_empty());

        let handle = gate.spawn_initial_refresh().unwrap();
        handle.await.unwrap();

        assert_eq!(
            state.permissions().get(&Capability::StepCount),
            Some(&AuthorizationState::Authorized)
        );
        assert_eq!(gate.status_text(Capability::SleepAnalysis), "Authorized");
    }

    #[test]
    fn test_initial_refresh_without_runtime() {
        let store = Arc::new(InMemoryHealthStore::new());
        let (gate, state) = gate(&store);

        assert!(gate.spawn_initial_refresh().is_none());
        assert_eq!(state.permissions().len(), 2);
        assert_eq!(gate.status_text(Capability::StepCount), "Not determined");
    }
}
