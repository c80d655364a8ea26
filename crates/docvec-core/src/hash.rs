//! Content fingerprints for chunk versioning.
//!
//! A [`ContentHash`] is the SHA-256 of a chunk's *normalized* text, so
//! whitespace-only edits (re-wrapped lines, CRLF vs LF, trailing spaces)
//! keep the same fingerprint across migration runs. Callers that keep the
//! previous run's manifest can compare fingerprints to skip unchanged
//! chunks; this module only guarantees the fingerprints are stable.
//!
//! # Example
//!
//! ```rust
//! use docvec_core::hash::content_hash;
//!
//! let a = content_hash("Hello   world\r\n");
//! let b = content_hash("Hello world");
//! assert_eq!(a, b);
//! assert_eq!(a.as_str().len(), 64);
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 digest of normalized chunk text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Leading 16 hex characters, used for content-addressed vector IDs.
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(16)]
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ContentHash {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Collapse every whitespace run to a single space and strip both ends.
///
/// Line endings are whitespace too, so `\r\n`, `\n` and `\r` all collapse
/// the same way. The ASCII information separators U+001C..=U+001F count as
/// whitespace, keeping fingerprints equal to those of existing manifests.
pub fn normalize_text(text: &str) -> String {
    text.split(is_separator)
        .filter(|piece| !piece.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_separator(c: char) -> bool {
    c.is_whitespace() || ('\u{1c}'..='\u{1f}').contains(&c)
}

/// Fingerprint `text`. Always hashes the normalized form.
pub fn content_hash(text: &str) -> ContentHash {
    let normalized = normalize_text(text);
    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    ContentHash(format!("{:x}", hasher.finalize()))
}
