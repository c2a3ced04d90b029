//! Fingerprints for compiled parent indexes
//!
//! Generators cache their output keyed on the fingerprint of the index they
//! rendered, so two compilations of the same datamodel must agree on it.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// SHA256 fingerprint of canonical compiler output
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Compute fingerprint from raw bytes
    pub fn from_bytes(data: &[u8]) -> Self {
        let hash = Sha256::digest(data);
        Self(format!("{:x}", hash))
    }

    /// Fingerprint of a value's compact JSON encoding
    ///
    /// Only meaningful for values whose maps serialize in sorted order.
    pub fn of_json<T: Serialize>(value: &T) -> serde_json::Result<Self> {
        let canonical = serde_json::to_vec(value)?;
        Ok(Self::from_bytes(&canonical))
    }

    /// Get the hex string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_fingerprint_consistency() {
        let a = Fingerprint::from_bytes(b"roots.root.example.com");
        let b = Fingerprint::from_bytes(b"roots.root.example.com");
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 64);
    }

    #[test]
    fn test_fingerprint_ignores_insertion_order() {
        let mut first = BTreeMap::new();
        first.insert("b", 2);
        first.insert("a", 1);
        let mut second = BTreeMap::new();
        second.insert("a", 1);
        second.insert("b", 2);

        assert_eq!(
            Fingerprint::of_json(&first).unwrap(),
            Fingerprint::of_json(&second).unwrap()
        );
    }

    #[test]
    fn test_fingerprint_different_content() {
        assert_ne!(Fingerprint::from_bytes(b"a"), Fingerprint::from_bytes(b"b"));
    }
}
