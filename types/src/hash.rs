//! Transaction signatures and content-derived identifiers.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use serde::{Deserialize, Serialize};
use std::fmt;

type Blake2b256 = Blake2b<U32>;

/// BLAKE2b-256 over length-prefixed parts.
///
/// Length prefixes keep `["ab", "c"]` and `["a", "bc"]` distinct.
pub fn digest_parts(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    for part in parts {
        hasher.update((part.len() as u64).to_le_bytes());
        hasher.update(part);
    }
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

/// Identifier of a submitted transaction.
///
/// Opaque text: ledger-issued signatures are kept verbatim, locally derived
/// ones are hex-encoded content digests.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Signature(String);

impl Signature {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// A signature derived from the content it identifies.
    pub fn digest(parts: &[&[u8]]) -> Self {
        Self(hex::encode(digest_parts(parts)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First eight characters followed by an ellipsis.
    pub fn short(&self) -> String {
        let head: String = self.0.chars().take(8).collect();
        format!("{head}...")
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_deterministic() {
        let a = Signature::digest(&[b"mint", b"42"]);
        let b = Signature::digest(&[b"mint", b"42"]);
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 64);
    }

    #[test]
    fn digest_separates_part_boundaries() {
        assert_ne!(
            Signature::digest(&[b"ab", b"c"]),
            Signature::digest(&[b"a", b"bc"])
        );
    }

    #[test]
    fn short_form() {
        let sig = Signature::new("5xoTQ1XyJDqtRiwN7k3mW3U1x16A9Jni");
        assert_eq!(sig.short(), "5xoTQ1Xy...");
    }
}
