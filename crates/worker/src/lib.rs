//! Offline cache worker for static sites.
//!
//! The worker pre-caches an asset manifest on install, drops stale
//! generations on activate, and answers fetches cache-first or
//! network-first. [`ServiceHost`] plays the browser's part and drives it
//! through its lifecycle.

pub mod error;
pub mod host;
pub mod lifecycle;
pub mod protocol;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use error::HostError;
pub use host::ServiceHost;
pub use lifecycle::{Host, Lifecycle, WorkerState};
pub use worker::{OfflineCacheWorker, SKIP_WAITING};
