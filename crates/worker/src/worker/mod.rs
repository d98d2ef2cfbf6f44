//! The offline cache worker.
//!
//! One worker owns one current [`CacheGeneration`] and one [`AssetManifest`]
//! and reacts to four host events: install, activate, fetch and message.
//! Which fetch strategy runs is fixed at construction.

mod cache_first;
mod network_first;

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;
use tokio::task::JoinSet;

use swcache_client::Fetcher;
use swcache_core::{AssetManifest, BlobStore, CacheGeneration, Error, Request, Response, Strategy};

use crate::lifecycle::Host;

/// Message type that asks a waiting worker to take over immediately.
pub const SKIP_WAITING: &str = "SKIP_WAITING";

/// Versioned caching strategy reacting to host lifecycle events.
pub struct OfflineCacheWorker {
    generation: CacheGeneration,
    manifest: AssetManifest,
    strategy: Strategy,
    store: Arc<dyn BlobStore>,
    fetcher: Arc<dyn Fetcher>,
    pending: Mutex<JoinSet<()>>,
}

impl OfflineCacheWorker {
    pub fn new(
        generation: CacheGeneration, manifest: AssetManifest, strategy: Strategy, store: Arc<dyn BlobStore>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Self {
        Self { generation, manifest, strategy, store, fetcher, pending: Mutex::new(JoinSet::new()) }
    }

    pub fn generation(&self) -> &CacheGeneration {
        &self.generation
    }

    pub fn manifest(&self) -> &AssetManifest {
        &self.manifest
    }

    /// Pre-populate the current generation from the manifest.
    ///
    /// Every asset is fetched; a transport failure or a non-2xx status fails
    /// the whole install and nothing is written. On success all entries are
    /// stored together and the host is told to skip waiting.
    ///
    /// # Errors
    ///
    /// Returns the first store or network error encountered. Entries
    /// already written by an earlier, successful install are left alone.
    pub async fn install(&self, host: &dyn Host) -> Result<(), Error> {
        tracing::info!(generation = %self.generation, assets = self.manifest.len(), "installing");

        self.store.open(self.generation.as_str()).await.inspect_err(|e| {
            tracing::error!(generation = %self.generation, error = %e, "failed to open cache generation");
        })?;

        let mut entries = Vec::with_capacity(self.manifest.len());
        for url in self.manifest.urls() {
            let request = Request::get(url.as_str());
            let response = self.fetcher.fetch(&request).await.inspect_err(|e| {
                tracing::error!(url = %url, error = %e, "failed to fetch asset");
            })?;
            if !response.ok() {
                tracing::error!(url = %url, status = response.status, "asset returned a non-ok status");
                return Err(Error::HttpError(format!("{url}: status {}", response.status)));
            }
            entries.push((request, response));
        }

        self.store
            .put_all(self.generation.as_str(), entries)
            .await
            .inspect_err(|e| tracing::error!(generation = %self.generation, error = %e, "failed to store assets"))?;

        tracing::info!(generation = %self.generation, "assets cached, skipping wait");
        host.skip_waiting();
        Ok(())
    }

    /// Delete every generation except the current one, then claim clients.
    ///
    /// Returns how many stale generations were removed. A failed delete is
    /// logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns an error only if the store cannot list its generations.
    pub async fn activate(&self, host: &dyn Host) -> Result<usize, Error> {
        tracing::info!(generation = %self.generation, "activating");

        let names = self.store.generations().await?;
        let mut removed = 0;
        for name in names.iter().filter(|name| **name != *self.generation.as_str()) {
            tracing::info!(generation = %name, "deleting stale generation");
            match self.store.delete(name).await {
                Ok(true) => removed += 1,
                Ok(false) => {}
                Err(e) => tracing::warn!(generation = %name, error = %e, "failed to delete stale generation"),
            }
        }

        host.claim_clients();
        Ok(removed)
    }

    /// Answer a request with the configured strategy.
    ///
    /// Cache-first always produces a response. Network-first yields `None`
    /// when the network fails and the store has nothing either.
    pub async fn fetch(&self, request: Request) -> Option<Response> {
        match self.strategy {
            Strategy::CacheFirst => Some(self.cache_first(request).await),
            Strategy::NetworkFirst => self.network_first(request).await,
        }
    }

    /// React to a message posted by a page. Only `SKIP_WAITING` is understood.
    pub fn message(&self, payload: &Value, host: &dyn Host) {
        match payload.get("type").and_then(Value::as_str) {
            Some(SKIP_WAITING) => host.skip_waiting(),
            other => tracing::debug!(message_type = ?other, "ignoring message"),
        }
    }

    /// Wait for every detached cache write started so far.
    pub async fn settle(&self) {
        let mut pending = std::mem::take(&mut *self.pending.lock().await);
        while let Some(result) = pending.join_next().await {
            if let Err(e) = result {
                tracing::warn!(error = %e, "cache write task did not complete");
            }
        }
    }

    /// Store a copy of a fresh network response without holding up the caller.
    async fn persist_detached(&self, request: Request, response: Response) {
        let store = Arc::clone(&self.store);
        let generation = self.generation.as_str().to_string();

        let mut pending = self.pending.lock().await;
        while pending.try_join_next().is_some() {}
        pending.spawn(async move {
            if let Err(e) = store.put(&generation, &request, response).await {
                tracing::warn!(url = %request.url, error = %e, "failed to cache response");
            }
        });
    }

    async fn lookup(&self, request: &Request) -> Option<Response> {
        match self.store.lookup(request).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(url = %request.url, error = %e, "cache lookup failed");
                None
            }
        }
    }
}
