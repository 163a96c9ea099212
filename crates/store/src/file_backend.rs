//! File-based store: one JSON document per user.
//!
//! Storage location: `~/.careerswarm/state/<user>.json`. User ids are
//! percent-encoded into file names so that distinct ids never share a file.
//! Writes go to a temporary sibling first and are renamed into place, so a
//! crash mid-write never leaves a truncated document behind.

use async_trait::async_trait;
use careerswarm_core::error::StoreError;
use careerswarm_core::state::SwarmState;
use careerswarm_core::store::SwarmStore;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, error};

/// A directory of per-user JSON documents.
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    /// Create a backend rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        debug!(dir = %dir.display(), "File store initialized");
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the document holding `user_id`'s state.
    pub fn path_for(&self, user_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", encode_user_id(user_id)))
    }
}

/// Keep `[A-Za-z0-9_-]`, percent-encode every other byte.
fn encode_user_id(user_id: &str) -> String {
    let mut out = String::with_capacity(user_id.len());
    for byte in user_id.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}

#[async_trait]
impl SwarmStore for FileBackend {
    fn name(&self) -> &str {
        "file"
    }

    async fn get(&self, user_id: &str) -> Result<Option<SwarmState>, StoreError> {
        let path = self.path_for(user_id);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                error!(user_id, path = %path.display(), error = %e, "Failed to read swarm state");
                return Err(StoreError::Unavailable(format!(
                    "Failed to read {}: {e}",
                    path.display()
                )));
            }
        };

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| StoreError::Corrupted {
                user_id: user_id.to_string(),
                reason: e.to_string(),
            })
    }

    async fn put(&self, user_id: &str, state: &SwarmState) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            StoreError::Unavailable(format!("Failed to create state directory: {e}"))
        })?;

        let content = serde_json::to_string_pretty(state)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let path = self.path_for(user_id);
        let tmp = path.with_extension("json.tmp");
        let write = async {
            tokio::fs::write(&tmp, content.as_bytes()).await?;
            tokio::fs::rename(&tmp, &path).await
        };
        write.await.map_err(|e| {
            error!(user_id, path = %path.display(), error = %e, "Failed to write swarm state");
            StoreError::Unavailable(format!("Failed to write {}: {e}", path.display()))
        })?;

        debug!(user_id, week = state.current_week, "Stored swarm state");
        Ok(())
    }

    async fn delete(&self, user_id: &str) -> Result<bool, StoreError> {
        match tokio::fs::remove_file(self.path_for(user_id)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::Unavailable(format!(
                "Failed to delete state for '{user_id}': {e}"
            ))),
        }
    }
}
