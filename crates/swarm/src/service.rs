//! SwarmService: binds a coordinator to a store for per-user operations.
//!
//! Runs and toggles for the same user are serialized; different users
//! proceed concurrently.

use careerswarm_core::error::{Error, Result};
use careerswarm_core::profile::UserProfile;
use careerswarm_core::state::SwarmState;
use careerswarm_core::store::SwarmStore;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::coordinator::{SwarmCoordinator, SwarmRun};

pub struct SwarmService {
    coordinator: SwarmCoordinator,
    store: Arc<dyn SwarmStore>,
    user_locks: UserLocks,
}

impl SwarmService {
    pub fn new(coordinator: SwarmCoordinator, store: Arc<dyn SwarmStore>) -> Self {
        Self {
            coordinator,
            store,
            user_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn coordinator(&self) -> &SwarmCoordinator {
        &self.coordinator
    }

    pub fn store(&self) -> &dyn SwarmStore {
        self.store.as_ref()
    }

    /// Current state, or `None` if the user never ran the swarm.
    pub async fn state(&self, user_id: &str) -> Result<Option<SwarmState>> {
        validate_user_id(user_id)?;
        self.load(user_id).await
    }

    /// Advance the user's state by one week and persist it.
    pub async fn run(&self, user_id: &str, profile: &UserProfile) -> Result<SwarmRun> {
        self.run_with_cancel(user_id, profile, &CancellationToken::new())
            .await
    }

    /// Like [`run`](Self::run). A cancelled run writes nothing.
    pub async fn run_with_cancel(
        &self,
        user_id: &str,
        profile: &UserProfile,
        cancel: &CancellationToken,
    ) -> Result<SwarmRun> {
        validate_user_id(user_id)?;
        let _guard = self.lock_user(user_id).await;

        let prior = self.load(user_id).await?;
        let run = self
            .coordinator
            .run_detailed(profile, prior.as_ref(), cancel)
            .await?;

        if cancel.is_cancelled() {
            info!(user_id, "Run cancelled before persisting");
            return Err(careerswarm_core::GenerationError::Cancelled.into());
        }

        self.save(user_id, &run.state).await?;
        info!(user_id, week = run.state.current_week, degraded = run.degraded.len(), "Swarm state updated");
        Ok(run)
    }

    /// Flip one task of the user's current plan and persist the result.
    pub async fn toggle_task(&self, user_id: &str, task_id: &str) -> Result<SwarmState> {
        validate_user_id(user_id)?;
        let _guard = self.lock_user(user_id).await;

        let state = self
            .load(user_id)
            .await?
            .ok_or_else(|| Error::TaskNotFound(task_id.to_string()))?;
        let next = state.toggle_task_status(task_id)?;
        self.save(user_id, &next).await?;
        Ok(next)
    }

    /// Return the user to the uninitialized state. Returns whether a state
    /// existed.
    pub async fn reset(&self, user_id: &str) -> Result<bool> {
        validate_user_id(user_id)?;
        let _guard = self.lock_user(user_id).await;

        let removed = self.store.delete(user_id).await?;
        info!(user_id, removed, "Swarm state reset");
        Ok(removed)
    }

    async fn lock_user(&self, user_id: &str) -> UserGuard<'_> {
        let lock = {
            let mut locks = self.user_locks.lock().unwrap_or_else(|e| e.into_inner());
            locks.entry(user_id.to_string()).or_default().clone()
        };
        let guard = lock.clone().lock_owned().await;
        UserGuard {
            locks: &self.user_locks,
            user_id: user_id.to_string(),
            lock,
            guard: Some(guard),
        }
    }

    /// Number of users with an operation in flight or queued.
    pub fn active_users(&self) -> usize {
        self.user_locks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    async fn load(&self, user_id: &str) -> Result<Option<SwarmState>> {
        self.store.get(user_id).await.map_err(|e| {
            error!(user_id, store = self.store.name(), error = %e, "Failed to load swarm state");
            Error::from(e)
        })
    }

    async fn save(&self, user_id: &str, state: &SwarmState) -> Result<()> {
        self.store.put(user_id, state).await.map_err(|e| {
            error!(user_id, store = self.store.name(), error = %e, "Failed to persist swarm state");
            Error::from(e)
        })
    }
}

type UserLocks = Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>;

/// Holds one user's lock; drops the map entry once nobody else waits on it.
struct UserGuard<'a> {
    locks: &'a UserLocks,
    user_id: String,
    lock: Arc<tokio::sync::Mutex<()>>,
    guard: Option<tokio::sync::OwnedMutexGuard<()>>,
}

impl Drop for UserGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        // The map and this guard hold two references; more means waiters.
        if Arc::strong_count(&self.lock) <= 2 {
            if let Some(entry) = locks.get(&self.user_id) {
                if Arc::ptr_eq(entry, &self.lock) {
                    locks.remove(&self.user_id);
                }
            }
        }
    }
}

fn validate_user_id(user_id: &str) -> Result<()> {
    if user_id.trim().is_empty() {
        return Err(Error::InvalidInput("user id must not be empty".into()));
    }
    Ok(())
}
