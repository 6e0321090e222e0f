//! In-memory credential cache keyed by build

use crate::credentials::record::CredentialEntry;
use crate::credentials::BuildId;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// Mapping from build to the credentials supplied for that build.
///
/// Reads and writes share a single mutex. Entries are replaced wholesale,
/// never edited in place.
#[derive(Debug, Default)]
pub struct CredentialCache {
    entries: Mutex<HashMap<BuildId, CredentialEntry>>,
}

impl CredentialCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the entry for a build, returning the previous one if any
    pub fn insert(&self, build_id: BuildId, entry: CredentialEntry) -> Option<CredentialEntry> {
        self.lock().insert(build_id, entry)
    }

    /// Run `f` against the entry for a build while holding the lock
    pub fn with_entry<T>(
        &self,
        build_id: &BuildId,
        f: impl FnOnce(&CredentialEntry) -> T,
    ) -> Option<T> {
        self.lock().get(build_id).map(f)
    }

    /// Remove the entry for a build
    pub fn remove(&self, build_id: &BuildId) -> Option<CredentialEntry> {
        self.lock().remove(build_id)
    }

    /// Number of builds with stored credentials
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // A panic while holding the lock cannot leave a half-written map: every
    // mutation is a single insert or remove.
    fn lock(&self) -> MutexGuard<'_, HashMap<BuildId, CredentialEntry>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
