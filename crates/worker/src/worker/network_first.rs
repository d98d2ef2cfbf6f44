//! Network first, whatever the store holds second.
//!
//! Unlike cache-first there is no synthesized offline page: when both the
//! network and the store come up empty the caller gets `None`.

use swcache_core::{Request, Response};

use super::OfflineCacheWorker;

impl OfflineCacheWorker {
    pub(super) async fn network_first(&self, request: Request) -> Option<Response> {
        match self.fetcher.fetch(&request).await {
            Ok(response) => {
                if response.is_cacheable() {
                    let copy = response.duplicate();
                    self.persist_detached(request, copy).await;
                }
                Some(response)
            }
            Err(e) => {
                tracing::warn!(url = %request.url, error = %e, "network failed, falling back to cache");
                let cached = self.lookup(&request).await;
                if cached.is_none() {
                    tracing::debug!(url = %request.url, "no cached copy");
                }
                cached
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use swcache_core::{AssetManifest, BlobStore, CacheGeneration, ResponseType, Strategy};

    use super::*;
    use crate::testing::{StubFetcher, TestStore, url};

    const GENERATION: &str = "github-pages-v2";

    fn worker(store: Arc<TestStore>, fetcher: Arc<StubFetcher>) -> OfflineCacheWorker {
        OfflineCacheWorker::new(
            CacheGeneration::new(GENERATION).unwrap(),
            AssetManifest::default(),
            Strategy::NetworkFirst,
            store,
            fetcher,
        )
    }

    async fn seed(store: &TestStore, path: &str, body: &str) {
        let response = Response::new(url(path), 200, ResponseType::Basic, body.to_string());
        store.put(GENERATION, &Request::get(url(path)), response).await.unwrap();
    }

    #[tokio::test]
    async fn test_network_response_wins_over_stored_copy() {
        let store = Arc::new(TestStore::new());
        seed(&store, "/", "stale").await;
        let fetcher = Arc::new(StubFetcher::new().page(&url("/"), "fresh"));
        let worker = worker(store.clone(), fetcher.clone());

        let response = worker.fetch(Request::get(url("/"))).await.unwrap();
        worker.settle().await;

        assert_eq!(response.text(), "fresh");
        assert_eq!(fetcher.calls(), 1);
        let stored = store.lookup_in(GENERATION, &Request::get(url("/"))).await.unwrap().unwrap();
        assert_eq!(stored.text(), "fresh");
    }

    #[tokio::test]
    async fn test_network_response_stored_when_absent() {
        let store = Arc::new(TestStore::new());
        let fetcher = Arc::new(StubFetcher::new().page(&url("/css/styles.css"), "body{}"));
        let worker = worker(store.clone(), fetcher);

        let response = worker.fetch(Request::get(url("/css/styles.css"))).await.unwrap();
        worker.settle().await;

        assert_eq!(response.text(), "body{}");
        assert!(store.lookup(&Request::get(url("/css/styles.css"))).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_non_qualifying_response_returned_without_fallback() {
        let store = Arc::new(TestStore::new());
        seed(&store, "/gone", "cached").await;
        let fetcher = Arc::new(StubFetcher::new().route(&url("/gone"), 404, ResponseType::Basic, "not found"));
        let worker = worker(store.clone(), fetcher);

        let response = worker.fetch(Request::get(url("/gone"))).await.unwrap();
        worker.settle().await;

        assert_eq!(response.status, 404);
        assert_eq!(response.text(), "not found");
        assert_eq!(store.puts(), 1, "only the seed write");
    }

    #[tokio::test]
    async fn test_offline_falls_back_to_store() {
        let store = Arc::new(TestStore::new());
        seed(&store, "/index.html", "cached page").await;
        let fetcher = Arc::new(StubFetcher::new());
        fetcher.set_offline(true);

        let response = worker(store, fetcher).fetch(Request::get(url("/index.html"))).await;

        assert_eq!(response.unwrap().text(), "cached page");
    }

    #[tokio::test]
    async fn test_offline_and_not_stored_is_absent() {
        let store = Arc::new(TestStore::new());
        let fetcher = Arc::new(StubFetcher::new());
        fetcher.set_offline(true);

        let response = worker(store, fetcher).fetch(Request::get(url("/never-seen"))).await;

        assert!(response.is_none());
    }

    #[tokio::test]
    async fn test_failed_lookup_while_offline_is_absent() {
        let store = Arc::new(TestStore::new());
        seed(&store, "/index.html", "cached page").await;
        store.fail_lookups();
        let fetcher = Arc::new(StubFetcher::new());
        fetcher.set_offline(true);

        let response = worker(store, fetcher.clone()).fetch(Request::get(url("/index.html"))).await;

        assert!(response.is_none());
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_response_returned_before_write_completes() {
        let store = Arc::new(TestStore::gated());
        let fetcher = Arc::new(StubFetcher::new().page(&url("/"), "index"));
        let worker = worker(store.clone(), fetcher);

        let response = tokio::time::timeout(Duration::from_secs(5), worker.fetch(Request::get(url("/"))))
            .await
            .expect("fetch must not wait for the cache write");
        assert_eq!(response.unwrap().text(), "index");

        store.release(1);
        worker.settle().await;
        assert_eq!(store.puts(), 1);
    }
}
