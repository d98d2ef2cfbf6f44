//! swcache host entry point.
//!
//! Boots one worker against the configured store and origin, runs install
//! and activate, then answers JSON-lines events from stdin on stdout.
//! Logging goes to stderr to keep stdout a clean event stream.

use std::sync::Arc;

use anyhow::Result;
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;

use swcache_client::{FetchConfig, HttpFetcher};
use swcache_core::{AppConfig, BlobStore, CacheDb, MemoryStore, StoreBackend};
use swcache_worker::{OfflineCacheWorker, ServiceHost, protocol};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(
        generation = %config.generation,
        origin = %config.origin,
        strategy = ?config.strategy,
        store = ?config.store,
        "starting swcache"
    );

    let store: Arc<dyn BlobStore> = match config.store {
        StoreBackend::Sqlite => Arc::new(CacheDb::open(&config.db_path).await?),
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
    };
    let fetcher = HttpFetcher::new(FetchConfig {
        origin: config.origin_url()?,
        user_agent: config.user_agent.clone(),
        max_bytes: config.max_bytes,
        timeout: config.timeout(),
    })?;

    let worker = OfflineCacheWorker::new(
        config.cache_generation()?,
        config.manifest()?,
        config.strategy,
        store,
        Arc::new(fetcher),
    );
    let host = ServiceHost::new(worker, false);
    let state = host.install().await?;
    tracing::info!(%state, "worker ready");

    protocol::serve(&host, BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await?;
    tracing::info!("stdin closed, shutting down");

    Ok(())
}
