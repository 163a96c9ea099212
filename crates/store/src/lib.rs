//! Swarm state persistence backends for careerswarm.
//!
//! All backends implement `careerswarm_core::SwarmStore` with last-write-wins
//! semantics per user id.

pub mod file_backend;
pub mod in_memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use file_backend::FileBackend;
pub use in_memory::InMemoryStore;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

use careerswarm_config::AppConfig;
use careerswarm_core::error::StoreError;
use careerswarm_core::store::SwarmStore;
use std::sync::Arc;

/// Build the store backend named in the configuration.
pub async fn build_from_config(config: &AppConfig) -> Result<Arc<dyn SwarmStore>, StoreError> {
    let path = config.store_path();
    match config.store.backend.as_str() {
        "memory" => Ok(Arc::new(InMemoryStore::new())),
        "file" => Ok(Arc::new(FileBackend::new(path))),
        #[cfg(feature = "sqlite")]
        "sqlite" => Ok(Arc::new(SqliteStore::open(&path).await?)),
        other => Err(StoreError::Unavailable(format!(
            "store backend '{other}' is not available in this build"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn builds_configured_backend() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();

        config.store.backend = "memory".into();
        assert_eq!(build_from_config(&config).await.unwrap().name(), "in_memory");

        config.store.backend = "file".into();
        config.store.path = Some(dir.path().join("state").display().to_string());
        assert_eq!(build_from_config(&config).await.unwrap().name(), "file");

        config.store.backend = "redis".into();
        assert!(build_from_config(&config).await.is_err());
    }
}
