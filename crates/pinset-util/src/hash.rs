use sha2::{Digest, Sha256};

/// Compute the SHA-256 hash of a byte slice, returning a lowercase hex string.
pub fn sha256_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// Stable file name for caching the response of `url`.
pub fn cache_key(url: &str) -> String {
    format!("{}.json", sha256_bytes(url.as_bytes()))
}
