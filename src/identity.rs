//! Session identity persistence
//!
//! Resolves and persists the active session identifier across process
//! restarts. A single JSON file under the platform data directory holds the
//! identifier. When the file cannot be written (restricted-storage
//! environments) the store degrades to in-memory for the process lifetime;
//! persistence failures are never fatal.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::model::SessionId;

/// On-disk identity record
#[derive(Debug, Serialize, Deserialize)]
struct StoredIdentity {
    session_id: SessionId,
}

/// Durable store for the active session identifier (single key)
#[derive(Debug)]
pub struct IdentityStore {
    path: Option<PathBuf>,
    current: Option<SessionId>,
}

impl IdentityStore {
    /// Create a store backed by the given file
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self {
            path: Some(path),
            current: None,
        }
    }

    /// Create a store with no durable backing
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            path: None,
            current: None,
        }
    }

    /// Default identity file path
    ///
    /// Returns `~/.local/share/wavelink/session.json` (platform equivalent)
    #[must_use]
    pub fn default_path() -> PathBuf {
        directories::BaseDirs::new().map_or_else(
            || PathBuf::from(".local/share/wavelink/session.json"),
            |d| d.data_dir().join("wavelink").join("session.json"),
        )
    }

    /// Resolve the active identifier
    ///
    /// Returns the previously persisted identifier if present, else mints a
    /// fresh one and persists it before returning.
    pub fn resolve(&mut self) -> SessionId {
        if let Some(id) = &self.current {
            return id.clone();
        }

        if let Some(id) = self.read_from_disk() {
            tracing::debug!(session_id = %id, "resumed persisted session identity");
            self.current = Some(id.clone());
            return id;
        }

        let id = SessionId::mint();
        tracing::info!(session_id = %id, "minted new session identity");
        self.persist(&id);
        id
    }

    /// Overwrite the stored identifier
    ///
    /// A write failure degrades the store to in-memory for the rest of the
    /// process lifetime, with a single warning.
    pub fn persist(&mut self, id: &SessionId) {
        self.current = Some(id.clone());

        let Some(path) = &self.path else { return };
        if let Err(e) = write_identity(path, id) {
            tracing::warn!(
                error = %e,
                path = %path.display(),
                "identity persistence unavailable; continuing in-memory"
            );
            self.path = None;
        }
    }

    /// Remove the stored identifier
    pub fn clear(&mut self) {
        self.current = None;

        if let Some(path) = &self.path
            && path.exists()
            && let Err(e) = fs::remove_file(path)
        {
            tracing::warn!(error = %e, "failed to remove persisted identity");
        }
    }

    /// The currently held identifier, if one has been resolved or persisted
    #[must_use]
    pub fn current(&self) -> Option<&SessionId> {
        self.current.as_ref()
    }

    fn read_from_disk(&self) -> Option<SessionId> {
        let path = self.path.as_ref()?;
        let content = fs::read_to_string(path).ok()?;
        let stored: StoredIdentity = serde_json::from_str(&content).ok()?;
        Some(stored.session_id)
    }
}

/// Write the identity record, creating parent directories as needed
fn write_identity(path: &Path, id: &SessionId) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let stored = StoredIdentity {
        session_id: id.clone(),
    };
    let content = serde_json::to_string_pretty(&stored)
        .map_err(|e| std::io::Error::other(e.to_string()))?;
    fs::write(path, content)
}
