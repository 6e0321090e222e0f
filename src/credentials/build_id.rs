//! Per-build credential scope tokens

use crate::error::{FinchError, FinchResult};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::fmt;

/// Random bytes per build identifier (256 bits)
const BUILD_ID_BYTES: usize = 32;

/// Opaque, unguessable token scoping a set of credentials to one build.
///
/// `Debug` and `Display` print only a short fingerprint; the token itself is
/// available through [`BuildId::as_str`] for handing to the build engine.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct BuildId(String);

impl BuildId {
    /// Generate a fresh identifier from the OS entropy source
    pub fn generate() -> FinchResult<Self> {
        let mut bytes = [0u8; BUILD_ID_BYTES];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| FinchError::Entropy(e.to_string()))?;
        Ok(Self(hex::encode(bytes)))
    }

    /// Wrap an identifier received from a client
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short fingerprint that is safe to log
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.0.as_bytes());
        hex::encode(&digest[..6])
    }
}

impl fmt::Debug for BuildId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BuildId({})", self.fingerprint())
    }
}

impl fmt::Display for BuildId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.fingerprint())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn generated_ids_are_64_hex_chars() {
        let id = BuildId::generate().unwrap();
        assert_eq!(id.as_str().len(), 64);
        assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn generated_ids_are_unique() {
        let ids: HashSet<BuildId> = (0..1000).map(|_| BuildId::generate().unwrap()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn formatting_hides_token() {
        let id = BuildId::generate().unwrap();
        assert!(!format!("{:?}", id).contains(id.as_str()));
        assert!(!id.to_string().contains(id.as_str()));
        assert_eq!(id.fingerprint().len(), 12);
    }
}
