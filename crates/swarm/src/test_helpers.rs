//! Shared test helpers for coordinator and service tests.

use async_trait::async_trait;
use careerswarm_core::error::GenerationError;
use careerswarm_core::profile::UserProfile;
use careerswarm_core::provider::{CompletionProvider, CompletionRequest};
use careerswarm_providers::client::{ClientSettings, GenerativeClient};
use std::sync::{Arc, Mutex};

use crate::coordinator::SwarmCoordinator;
use crate::registry::AgentRegistry;

pub const PLANNER_REPLY: &str = r#"```json
{
  "summary": "Focus on platform roles at fintechs.",
  "goals": {"applications": 5, "networking": 3, "interviewPrep": 2, "skillDevelopment": ["System design"]},
  "tasks": [
    {"title": "Apply to three platform roles", "assignedAgent": "recruiter", "priority": "high", "dueInDays": 2},
    {"title": "Attend a Rust meetup", "assignedAgent": "coach", "priority": "medium", "dueInDays": 4},
    {"title": "Practice a system design mock", "assignedAgent": "interviewer", "dueInDays": 5}
  ]
}
```"#;

pub const RECRUITER_REPLY: &str = "Focus on platform teams at fintechs.\n\
- Apply to Acme\n\
- Message two hiring managers\n\
{\"jobsFound\": 12, \"applicationsSuggested\": 4}";

pub const COACH_REPLY: &str = "Solid progress this week.\n\
- Finish the distributed systems course\n\
{\"skillsLearned\": [\"rust\", \"System design\"], \"readinessScore\": 62}";

pub const INTERVIEWER_REPLY: &str = "Expect questions on incident response.\n\
1. Walk through an outage you led\n\
2. Design a rate limiter";

/// Answers each prompt by the first rule whose needle it contains.
///
/// Rules added later take precedence. Prompts matching no rule get the
/// default outcome.
pub struct ScriptedProvider {
    rules: Mutex<Vec<(String, Result<String, GenerationError>)>>,
    default: Result<String, GenerationError>,
    calls: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedProvider {
    pub fn new(default: Result<String, GenerationError>) -> Arc<Self> {
        Arc::new(Self {
            rules: Mutex::new(Vec::new()),
            default,
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Every agent succeeds with a well-formed reply.
    pub fn happy_path() -> Arc<Self> {
        Self::new(Ok("No comment.".into()))
            .reply_for("Create the plan", PLANNER_REPLY)
            .reply_for("Suggest where to apply", RECRUITER_REPLY)
            .reply_for("Review this candidate", COACH_REPLY)
            .reply_for("Prepare this candidate", INTERVIEWER_REPLY)
    }

    /// Every call fails with `error`.
    pub fn failing(error: GenerationError) -> Arc<Self> {
        Self::new(Err(error))
    }

    pub fn reply_for(self: Arc<Self>, needle: &str, reply: &str) -> Arc<Self> {
        self.rules
            .lock()
            .unwrap()
            .insert(0, (needle.to_string(), Ok(reply.to_string())));
        self
    }

    pub fn fail_for(self: Arc<Self>, needle: &str, error: GenerationError) -> Arc<Self> {
        self.rules
            .lock()
            .unwrap()
            .insert(0, (needle.to_string(), Err(error)));
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String, GenerationError> {
        let outcome = self
            .rules
            .lock()
            .unwrap()
            .iter()
            .find(|(needle, _)| request.prompt.contains(needle.as_str()))
            .map(|(_, outcome)| outcome.clone())
            .unwrap_or_else(|| self.default.clone());
        self.calls.lock().unwrap().push(request);
        outcome
    }
}

pub fn client(provider: Arc<ScriptedProvider>) -> Arc<GenerativeClient> {
    Arc::new(GenerativeClient::new(provider, ClientSettings::default()))
}

pub fn coordinator(provider: Arc<ScriptedProvider>) -> SwarmCoordinator {
    SwarmCoordinator::new(client(provider), AgentRegistry::new())
}

pub fn profile() -> UserProfile {
    UserProfile {
        name: "Ada".into(),
        current_role: Some("Backend Engineer".into()),
        target_role: Some("Platform Engineer".into()),
        experience_years: 6,
        skills: vec!["Rust".into(), "Kubernetes".into()],
        ..UserProfile::default()
    }
}
