//! Drives one worker through its lifecycle the way a browser would.

use serde_json::Value;

use swcache_core::{Request, Response};

use crate::error::HostError;
use crate::lifecycle::{Lifecycle, WorkerState};
use crate::worker::OfflineCacheWorker;

/// Owns a worker and its lifecycle, and awaits each phase to completion.
pub struct ServiceHost {
    worker: OfflineCacheWorker,
    lifecycle: Lifecycle,
}

impl ServiceHost {
    /// `predecessor_active` tells whether an older worker still controls pages.
    pub fn new(worker: OfflineCacheWorker, predecessor_active: bool) -> Self {
        Self { worker, lifecycle: Lifecycle::new(predecessor_active) }
    }

    pub fn worker(&self) -> &OfflineCacheWorker {
        &self.worker
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    pub fn state(&self) -> WorkerState {
        self.lifecycle.state()
    }

    /// Run the install phase and, if nothing holds the worker back, activation.
    ///
    /// # Errors
    ///
    /// A failed install leaves the worker redundant and returns its error.
    pub async fn install(&self) -> Result<WorkerState, HostError> {
        self.lifecycle.transition(WorkerState::Installing);
        if let Err(e) = self.worker.install(&self.lifecycle).await {
            tracing::error!(error = %e, "install failed; worker is redundant");
            self.lifecycle.transition(WorkerState::Redundant);
            return Err(HostError::InstallFailed(e));
        }
        self.lifecycle.transition(WorkerState::Installed);
        self.promote_if_ready().await
    }

    /// Run the activate phase.
    ///
    /// Activation is best-effort: a cleanup failure is logged and the
    /// worker still becomes active.
    pub async fn activate(&self) -> Result<WorkerState, HostError> {
        let state = self.state();
        if state != WorkerState::Installed {
            return Err(HostError::InvalidState { expected: WorkerState::Installed, actual: state });
        }

        self.lifecycle.transition(WorkerState::Activating);
        match self.worker.activate(&self.lifecycle).await {
            Ok(removed) => tracing::info!(removed, "activated"),
            Err(e) => tracing::warn!(error = %e, "activation cleanup failed"),
        }
        self.lifecycle.transition(WorkerState::Activated);
        Ok(WorkerState::Activated)
    }

    /// Route a page fetch to the worker. Only an activated worker controls
    /// pages; in any other state the host answers nothing.
    pub async fn fetch(&self, request: Request) -> Option<Response> {
        let state = self.state();
        if !state.can_intercept_fetch() {
            tracing::debug!(url = %request.url, %state, "worker not active, fetch not intercepted");
            return None;
        }
        self.worker.fetch(request).await
    }

    /// Deliver a page message; a waiting worker told to skip waiting activates now.
    pub async fn message(&self, payload: &Value) -> Result<WorkerState, HostError> {
        self.worker.message(payload, &self.lifecycle);
        self.promote_if_ready().await
    }

    /// The previous worker released its last page.
    pub async fn release_predecessor(&self) -> Result<WorkerState, HostError> {
        self.lifecycle.release_predecessor();
        self.promote_if_ready().await
    }

    /// A newer worker replaced this one.
    pub async fn retire(&self) {
        self.worker.settle().await;
        self.lifecycle.transition(WorkerState::Redundant);
    }

    async fn promote_if_ready(&self) -> Result<WorkerState, HostError> {
        if self.lifecycle.is_promotable() {
            return self.activate().await;
        }
        if self.state() == WorkerState::Installed {
            tracing::info!("installed; waiting for the previous worker");
        }
        Ok(self.state())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;
    use swcache_core::{AssetManifest, BlobStore, CacheGeneration, Strategy};

    use super::*;
    use crate::testing::{StubFetcher, TestStore, url};

    fn host(store: Arc<TestStore>, fetcher: StubFetcher, predecessor_active: bool) -> ServiceHost {
        let worker = OfflineCacheWorker::new(
            CacheGeneration::new("github-pages-v2").unwrap(),
            AssetManifest::new([url("/"), url("/index.html")]),
            Strategy::CacheFirst,
            store,
            Arc::new(fetcher),
        );
        ServiceHost::new(worker, predecessor_active)
    }

    fn online() -> StubFetcher {
        StubFetcher::new().page(&url("/"), "root").page(&url("/index.html"), "index")
    }

    #[tokio::test]
    async fn test_install_then_activate() {
        let store = Arc::new(TestStore::new());
        store.open("github-pages-v1").await.unwrap();
        let host = host(store.clone(), online(), true);

        let state = host.install().await.unwrap();

        assert_eq!(state, WorkerState::Activated);
        assert!(host.lifecycle().controls_clients());
        assert_eq!(store.generations().await.unwrap(), vec!["github-pages-v2"]);
    }

    #[tokio::test]
    async fn test_failed_install_is_redundant() {
        let store = Arc::new(TestStore::new());
        store.open("github-pages-v1").await.unwrap();
        let host = host(store.clone(), StubFetcher::new(), false);

        let result = host.install().await;

        assert!(matches!(result, Err(HostError::InstallFailed(_))));
        assert_eq!(host.state(), WorkerState::Redundant);
        // The previous generation survives: activation never ran.
        assert!(store.generations().await.unwrap().contains(&"github-pages-v1".to_string()));
    }

    #[tokio::test]
    async fn test_waiting_worker_promoted_by_skip_waiting_message() {
        let host = host(Arc::new(TestStore::new()), online(), true);
        host.lifecycle.transition(WorkerState::Installed);

        let state = host.message(&json!({ "type": "OTHER" })).await.unwrap();
        assert_eq!(state, WorkerState::Installed);

        let state = host.message(&json!({ "type": "SKIP_WAITING" })).await.unwrap();
        assert_eq!(state, WorkerState::Activated);
        assert!(host.lifecycle().controls_clients());
    }

    #[tokio::test]
    async fn test_waiting_worker_promoted_when_predecessor_leaves() {
        let host = host(Arc::new(TestStore::new()), online(), true);
        host.lifecycle.transition(WorkerState::Installed);

        assert_eq!(host.release_predecessor().await.unwrap(), WorkerState::Activated);
    }

    #[tokio::test]
    async fn test_message_to_active_worker_changes_nothing() {
        let host = host(Arc::new(TestStore::new()), online(), false);
        host.install().await.unwrap();

        let state = host.message(&json!({ "type": "SKIP_WAITING" })).await.unwrap();
        assert_eq!(state, WorkerState::Activated);
    }

    #[tokio::test]
    async fn test_activate_requires_installed() {
        let host = host(Arc::new(TestStore::new()), online(), false);
        let result = host.activate().await;
        assert!(matches!(
            result,
            Err(HostError::InvalidState { expected: WorkerState::Installed, actual: WorkerState::Installing })
        ));
    }

    #[tokio::test]
    async fn test_installed_worker_serves_precached_assets_offline() {
        let store = Arc::new(TestStore::new());
        let fetcher = Arc::new(online());
        let worker = OfflineCacheWorker::new(
            CacheGeneration::new("github-pages-v2").unwrap(),
            AssetManifest::new([url("/"), url("/index.html")]),
            Strategy::CacheFirst,
            store,
            fetcher.clone(),
        );
        let host = ServiceHost::new(worker, false);
        host.install().await.unwrap();
        fetcher.set_offline(true);

        let response = host.fetch(Request::get(url("/index.html"))).await.unwrap();
        assert_eq!(response.text(), "index");
        assert_eq!(fetcher.calls(), 2, "only the install fetches");
    }

    #[tokio::test]
    async fn test_redundant_worker_does_not_intercept_fetches() {
        let store = Arc::new(TestStore::new());
        let fetcher = Arc::new(StubFetcher::new().page(&url("/"), "root"));
        let worker = OfflineCacheWorker::new(
            CacheGeneration::new("github-pages-v2").unwrap(),
            AssetManifest::new([url("/"), url("/index.html")]),
            Strategy::CacheFirst,
            store,
            fetcher.clone(),
        );
        let host = ServiceHost::new(worker, false);
        assert!(host.install().await.is_err());
        let calls = fetcher.calls();

        assert!(host.fetch(Request::get(url("/"))).await.is_none());
        assert_eq!(fetcher.calls(), calls);
    }

    #[tokio::test]
    async fn test_waiting_worker_does_not_intercept_fetches() {
        let store = Arc::new(TestStore::new());
        let fetcher = Arc::new(online());
        let worker = OfflineCacheWorker::new(
            CacheGeneration::new("github-pages-v2").unwrap(),
            AssetManifest::new([url("/"), url("/index.html")]),
            Strategy::CacheFirst,
            store,
            fetcher.clone(),
        );
        let host = ServiceHost::new(worker, true);
        host.lifecycle.transition(WorkerState::Installed);

        assert!(host.fetch(Request::get(url("/"))).await.is_none());
        assert_eq!(fetcher.calls(), 0);

        host.release_predecessor().await.unwrap();
        let response = host.fetch(Request::get(url("/"))).await.unwrap();
        assert_eq!(response.text(), "root");
    }

    #[tokio::test]
    async fn test_retire() {
        let host = host(Arc::new(TestStore::new()), online(), false);
        host.install().await.unwrap();
        host.retire().await;
        assert_eq!(host.state(), WorkerState::Redundant);
    }
}
