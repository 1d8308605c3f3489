//! Document identifiers for versioned chunk submissions

use sha1::{Digest, Sha1};

/// First 8 bytes of SHA-1(url), hex encoded (16 characters)
pub fn url_hash(url: &str) -> String {
    let digest = Sha1::digest(url.as_bytes());
    hex::encode(&digest[..8])
}

/// Builds `<scope>_<url hash>_<chunk_id>_<version_ts>`
pub fn make_docid(scope: &str, url: &str, chunk_id: u32, version_ts: i64) -> String {
    format!("{}_{}_{}_{}", scope, url_hash(url), chunk_id, version_ts)
}
