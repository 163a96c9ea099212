//! The closed catalog of agent roles.
//!
//! Adding or removing a role is a compile-time change: every `match` over
//! [`AgentRole`] in the workspace must be updated.

use serde::{Deserialize, Serialize};

/// What an agent's reply looks like.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputKind {
    /// A JSON document parsed into state (the weekly plan)
    Structured,
    /// Free-form prose, optionally ending in bullet points and a JSON object
    Commentary,
}

/// Top-level `SwarmState` fields an agent may propose changes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateField {
    WeeklyPlans,
    AgentConversation,
    UserProgress,
}

/// A specialized career agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    /// Builds the structured weekly plan
    Planner,
    /// Surfaces job leads and application targets
    Recruiter,
    /// Tracks growth, skills, and readiness
    Coach,
    /// Prepares the user for interviews
    Interviewer,
}

impl AgentRole {
    /// Every role, in the fixed order a swarm run invokes them.
    pub const ALL: [AgentRole; 4] = [
        AgentRole::Planner,
        AgentRole::Recruiter,
        AgentRole::Coach,
        AgentRole::Interviewer,
    ];

    /// Stable identifier used in persisted state and logs.
    pub fn id(self) -> &'static str {
        match self {
            AgentRole::Planner => "planner",
            AgentRole::Recruiter => "recruiter",
            AgentRole::Coach => "coach",
            AgentRole::Interviewer => "interviewer",
        }
    }

    /// Name shown to the user.
    pub fn display_name(self) -> &'static str {
        match self {
            AgentRole::Planner => "Strategy Planner",
            AgentRole::Recruiter => "Job Scout",
            AgentRole::Coach => "Career Coach",
            AgentRole::Interviewer => "Interview Coach",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            AgentRole::Planner => {
                "Turns the user's goals into a concrete week of prioritized tasks"
            }
            AgentRole::Recruiter => {
                "Identifies roles and companies worth applying to this week"
            }
            AgentRole::Coach => "Reviews progress, skill growth, and overall job readiness",
            AgentRole::Interviewer => {
                "Prepares practice questions and interview strategy for target roles"
            }
        }
    }

    pub fn output_kind(self) -> OutputKind {
        match self {
            AgentRole::Planner => OutputKind::Structured,
            AgentRole::Recruiter | AgentRole::Coach | AgentRole::Interviewer => {
                OutputKind::Commentary
            }
        }
    }

    /// The state fields this role's output may change. Every role appends
    /// its message to the conversation.
    pub fn owns(self) -> &'static [StateField] {
        match self {
            AgentRole::Planner => &[StateField::WeeklyPlans, StateField::AgentConversation],
            AgentRole::Recruiter | AgentRole::Interviewer => &[StateField::AgentConversation],
            AgentRole::Coach => &[StateField::UserProgress, StateField::AgentConversation],
        }
    }

    pub fn may_change(self, field: StateField) -> bool {
        self.owns().contains(&field)
    }

    /// Parse a role from its stable identifier (case-insensitive).
    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|role| role.id().eq_ignore_ascii_case(id.trim()))
    }
}

impl std::fmt::Display for AgentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}
