//! Request identity derivation.
//!
//! Two requests with the same identity are the same cache entry; the last
//! writer wins. The query string participates, the fragment never reaches
//! the engine (URL parsing strips it before requests are handled).

use sha2::{Digest, Sha256};

/// Derive the cache identity for a request from its method and absolute URL.
pub fn request_identity(method: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}
