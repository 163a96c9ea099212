//! # careerswarm core
//!
//! Domain types, traits, and error definitions for the careerswarm
//! orchestration core. This crate has **no I/O of its own**: it defines the
//! model that the provider, store, and swarm crates implement against.
//!
//! ## Layout
//!
//! - [`provider`]: the external completion endpoint, as a trait
//! - [`state`]: the per-user `SwarmState` aggregate and its pure operations
//! - [`agent`]: the closed catalog of agent roles
//! - [`profile`]: the user profile agents build prompts from
//! - [`store`]: the persistence collaborator, as a trait

pub mod agent;
pub mod error;
pub mod profile;
pub mod provider;
pub mod state;
pub mod store;

// Re-export key types at crate root for ergonomics
pub use agent::{AgentRole, OutputKind, StateField};
pub use error::{Error, GenerationError, Result, StoreError};
pub use profile::UserProfile;
pub use provider::{CompletionProvider, CompletionRequest, GenerationConfig};
pub use state::{
    AgentMessage, Goals, Task, TaskPriority, TaskStatus, SwarmState, UserProgress, WeeklyPlan,
};
pub use store::SwarmStore;
