//! Cache first, network second, synthesized 503 last.

use swcache_core::{Request, Response};

use super::OfflineCacheWorker;

impl OfflineCacheWorker {
    pub(super) async fn cache_first(&self, request: Request) -> Response {
        if let Some(cached) = self.lookup(&request).await {
            tracing::debug!(url = %request.url, "serving from cache");
            return cached;
        }

        tracing::debug!(url = %request.url, "fetching from network");
        match self.fetcher.fetch(&request).await {
            Ok(response) => {
                if response.is_cacheable() {
                    let copy = response.duplicate();
                    self.persist_detached(request, copy).await;
                }
                response
            }
            Err(e) => {
                tracing::error!(url = %request.url, error = %e, "fetch failed");
                Response::offline()
            }
        }
    }
}
