//! Multi-agent orchestration for careerswarm.
//!
//! - [`registry`]: the agent catalog and pure prompt builders
//! - [`coordinator`]: one swarm run: agents in order, then merge
//! - [`merge`]: plan extraction, fallbacks, and progress deltas
//! - [`service`]: store-backed per-user operations

pub mod coordinator;
pub mod merge;
pub mod registry;
pub mod service;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use coordinator::{SwarmCoordinator, SwarmRun};
pub use registry::{AgentPrompt, AgentRegistry, AgentSpec};
pub use service::SwarmService;
