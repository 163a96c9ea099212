//! Store trait: durable persistence of swarm state, keyed by user id.
//!
//! The core assumes nothing about the storage engine beyond last-write-wins
//! semantics per user id.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::state::SwarmState;

/// Implementations: in-memory (for testing), JSON file per user, SQLite.
#[async_trait]
pub trait SwarmStore: Send + Sync {
    /// The backend name (e.g., "file", "sqlite", "in_memory").
    fn name(&self) -> &str;

    /// Load a user's state, or `None` if the user has never run the swarm.
    async fn get(&self, user_id: &str) -> Result<Option<SwarmState>, StoreError>;

    /// Replace a user's state.
    async fn put(&self, user_id: &str, state: &SwarmState) -> Result<(), StoreError>;

    /// Remove a user's state. Returns whether anything was removed.
    async fn delete(&self, user_id: &str) -> Result<bool, StoreError>;
}
