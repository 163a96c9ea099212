//! The per-user swarm state aggregate.
//!
//! `SwarmState` is persisted as one JSON document per user. Field names are
//! camelCase so the stored document matches what the UI layer reads.
//!
//! Lifecycle: `Uninitialized` (`current_week == 0`) → first run → week 1 →
//! run → week 2 → … Only an explicit reset returns to `Uninitialized`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::agent::AgentRole;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Pending,
    Completed,
}

impl TaskStatus {
    pub fn toggled(self) -> Self {
        match self {
            TaskStatus::Pending => TaskStatus::Completed,
            TaskStatus::Completed => TaskStatus::Pending,
        }
    }
}

/// One actionable item in a weekly plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub assigned_agent: AgentRole,
    #[serde(default)]
    pub priority: TaskPriority,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub status: TaskStatus,
}

/// Weekly targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Goals {
    pub applications: u32,
    pub networking: u32,
    pub interview_prep: u32,
    #[serde(default)]
    pub skill_development: Vec<String>,
}

impl Default for Goals {
    fn default() -> Self {
        Self {
            applications: 5,
            networking: 3,
            interview_prep: 2,
            skill_development: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyPlan {
    /// Week number, starting at 1
    pub week: u32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub goals: Goals,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl WeeklyPlan {
    pub fn completed_tasks(&self) -> usize {
        self.tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Completed)
            .count()
    }
}

/// Cumulative progress across all weeks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProgress {
    #[serde(default)]
    pub applications_submitted: u32,
    #[serde(default)]
    pub interviews_completed: u32,
    #[serde(default)]
    pub networking_events: u32,
    #[serde(default)]
    pub skills_learned: Vec<String>,
    /// 0..=100
    #[serde(default)]
    pub readiness_score: u8,
}

/// One agent's contribution to one run. Never mutated after it is appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentMessage {
    pub agent_id: AgentRole,
    pub agent_name: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub action_items: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl AgentMessage {
    pub fn new(agent: AgentRole, message: impl Into<String>) -> Self {
        Self {
            agent_id: agent,
            agent_name: agent.display_name().to_string(),
            message: message.into(),
            timestamp: Utc::now(),
            action_items: Vec::new(),
            data: None,
        }
    }

    pub fn with_action_items(mut self, items: Vec<String>) -> Self {
        self.action_items = items;
        self
    }

    pub fn with_data(mut self, data: Option<serde_json::Value>) -> Self {
        self.data = data;
        self
    }
}

/// Root aggregate, owned by one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwarmState {
    pub current_week: u32,
    /// Most recent first
    #[serde(default)]
    pub weekly_plans: Vec<WeeklyPlan>,
    /// Append-only
    #[serde(default)]
    pub agent_conversation: Vec<AgentMessage>,
    #[serde(default)]
    pub user_progress: UserProgress,
    pub last_updated: DateTime<Utc>,
}

impl SwarmState {
    /// The state of a user who has never run the swarm.
    pub fn initial() -> Self {
        Self {
            current_week: 0,
            weekly_plans: Vec::new(),
            agent_conversation: Vec::new(),
            user_progress: UserProgress::default(),
            last_updated: Utc::now(),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.current_week > 0
    }

    /// The plan for `current_week`, if any run has produced one.
    pub fn current_plan(&self) -> Option<&WeeklyPlan> {
        self.weekly_plans.first()
    }

    /// Flip a task in the most recent plan between pending and completed.
    ///
    /// Calling it twice with the same id restores the original status. The
    /// progress counter tied to the task's agent moves with it and never
    /// drops below zero.
    pub fn toggle_task_status(&self, task_id: &str) -> Result<SwarmState> {
        let mut next = self.clone();
        let plan = next
            .weekly_plans
            .first_mut()
            .ok_or_else(|| Error::TaskNotFound(task_id.to_string()))?;
        let task = plan
            .tasks
            .iter_mut()
            .find(|t| t.id == task_id)
            .ok_or_else(|| Error::TaskNotFound(task_id.to_string()))?;

        task.status = task.status.toggled();
        let completed = task.status == TaskStatus::Completed;
        let agent = task.assigned_agent;

        let progress = &mut next.user_progress;
        let counter = match agent {
            AgentRole::Recruiter => Some(&mut progress.applications_submitted),
            AgentRole::Interviewer => Some(&mut progress.interviews_completed),
            AgentRole::Coach => Some(&mut progress.networking_events),
            AgentRole::Planner => None,
        };
        if let Some(counter) = counter {
            *counter = if completed {
                counter.saturating_add(1)
            } else {
                counter.saturating_sub(1)
            };
        }

        next.last_updated = Utc::now();
        Ok(next)
    }
}
