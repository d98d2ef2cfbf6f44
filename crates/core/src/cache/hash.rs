//! Request identity keys.

use sha2::{Digest, Sha256};

/// Compute the key under which a request's response is stored.
///
/// Identity is method plus URL. The URL is hashed verbatim; `Request::key`
/// drops the fragment before it gets here.
pub fn compute_cache_key(method: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}
