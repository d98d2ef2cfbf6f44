//! The storage seam a worker writes generations into.

use async_trait::async_trait;

use crate::Error;
use crate::http::{Request, Response};

/// Named, versioned request/response storage.
///
/// Generations are listed and searched in creation order. Individual
/// operations are atomic; nothing is coordinated across calls.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Create the generation if it does not exist yet.
    async fn open(&self, generation: &str) -> Result<(), Error>;

    /// Store one entry, replacing any previous entry for the same request.
    async fn put(&self, generation: &str, request: &Request, response: Response) -> Result<(), Error>;

    /// Store several entries as one unit.
    async fn put_all(&self, generation: &str, entries: Vec<(Request, Response)>) -> Result<(), Error>;

    /// Find a stored response in any generation.
    async fn lookup(&self, request: &Request) -> Result<Option<Response>, Error>;

    /// Find a stored response in one generation only.
    async fn lookup_in(&self, generation: &str, request: &Request) -> Result<Option<Response>, Error>;

    /// Names of every known generation.
    async fn generations(&self) -> Result<Vec<String>, Error>;

    /// Drop a generation and all its entries. Returns false if it did not exist.
    async fn delete(&self, generation: &str) -> Result<bool, Error>;

    /// Requests held by one generation.
    async fn keys(&self, generation: &str) -> Result<Vec<Request>, Error>;
}
