use sha2::{Digest, Sha256};

use crate::models::ProfileOptions;

/// The subset of `ProfileOptions` that changes *what* a report describes,
/// as opposed to how it's produced. Only this set participates in the
/// content fingerprint — fixed deliberately, not derived from the full
/// options struct, so adding an unrelated option field never silently
/// changes cache keys.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheableOptions {
    pub delimiter: String,
    pub skip_empty_lines: bool,
}

impl From<&ProfileOptions> for CacheableOptions {
    fn from(opts: &ProfileOptions) -> Self {
        Self {
            delimiter: opts.delimiter_char().to_string(),
            skip_empty_lines: opts.skip_empty_lines,
        }
    }
}

impl CacheableOptions {
    /// Fixed key order serialization, independent of any derived JSON
    /// ordering, so the fingerprint is stable across serde/map implementations.
    pub fn canonical(&self) -> String {
        format!("delimiter={}&skipEmptyLines={}", self.delimiter, self.skip_empty_lines)
    }
}

/// `SHA256(SHA256(content) || "|" || canonical(options))`, hex-encoded.
pub fn fingerprint(content: &str, options: &CacheableOptions) -> String {
    let content_hash = Sha256::digest(content.as_bytes());
    let mut outer = Sha256::new();
    outer.update(content_hash);
    outer.update(b"|");
    outer.update(options.canonical().as_bytes());
    hex::encode(outer.finalize())
}
