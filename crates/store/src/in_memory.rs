//! In-memory store: useful for testing and ephemeral sessions.

use async_trait::async_trait;
use careerswarm_core::error::StoreError;
use careerswarm_core::state::SwarmState;
use careerswarm_core::store::SwarmStore;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Keeps every user's state in a map. Nothing survives the process.
pub struct InMemoryStore {
    states: Arc<RwLock<HashMap<String, SwarmState>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            states: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn len(&self) -> usize {
        self.states.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.states.read().await.is_empty()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SwarmStore for InMemoryStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn get(&self, user_id: &str) -> Result<Option<SwarmState>, StoreError> {
        Ok(self.states.read().await.get(user_id).cloned())
    }

    async fn put(&self, user_id: &str, state: &SwarmState) -> Result<(), StoreError> {
        self.states
            .write()
            .await
            .insert(user_id.to_string(), state.clone());
        Ok(())
    }

    async fn delete(&self, user_id: &str) -> Result<bool, StoreError> {
        Ok(self.states.write().await.remove(user_id).is_some())
    }
}
