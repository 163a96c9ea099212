//! End-to-end tests for the careerswarm pipeline.
//!
//! These wire the real config loader, generative client, coordinator and
//! persistent stores together; only the completion endpoint is scripted.

use std::path::Path;
use std::sync::{Arc, Mutex};

use careerswarm_config::AppConfig;
use careerswarm_core::error::{Error, GenerationError};
use careerswarm_core::provider::{CompletionProvider, CompletionRequest};
use careerswarm_core::{AgentRole, TaskStatus, UserProfile};
use careerswarm_providers::{ClientSettings, GenerativeClient};
use careerswarm_store::FileBackend;
use careerswarm_swarm::{AgentRegistry, SwarmCoordinator, SwarmService};

// ── Scripted endpoint ────────────────────────────────────────────────────

const PLAN: &str = r#"Here is the plan:
```json
{
  "summary": "Target platform teams.",
  "goals": {"applications": 6, "networking": 2, "interviewPrep": 3, "skillDevelopment": ["Terraform"]},
  "tasks": [
    {"title": "Apply to Acme platform team", "assignedAgent": "recruiter", "priority": "high", "dueInDays": 1},
    {"title": "Mock interview: incident review", "assignedAgent": "interviewer", "dueInDays": 3},
    {"title": "Go to the SRE meetup", "assignedAgent": "coach", "priority": "low", "dueInDays": 5}
  ]
}
```"#;

/// Answers by prompt marker; markers listed in `failing` fail with a 503.
struct ScriptedEndpoint {
    failing: Vec<&'static str>,
    calls: Mutex<usize>,
}

impl ScriptedEndpoint {
    fn new() -> Arc<Self> {
        Self::failing_for(Vec::new())
    }

    fn failing_for(failing: Vec<&'static str>) -> Arc<Self> {
        Arc::new(Self {
            failing,
            calls: Mutex::new(0),
        })
    }

    fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait::async_trait]
impl CompletionProvider for ScriptedEndpoint {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String, GenerationError> {
        *self.calls.lock().unwrap() += 1;
        if self.failing.iter().any(|m| request.prompt.contains(m)) {
            return Err(GenerationError::status(503, "Service Unavailable"));
        }
        let reply = if request.prompt.contains("Create the plan") {
            PLAN
        } else if request.prompt.contains("Suggest where to apply") {
            "Fintech platform teams are hiring.\n- Apply to Acme\n{\"jobsFound\": 9, \"applicationsSuggested\": 3}"
        } else if request.prompt.contains("Review this candidate") {
            "Good momentum.\n* Finish the Terraform course\n{\"skillsLearned\": [\"Terraform\"], \"readinessScore\": 140}"
        } else {
            "Expect a design round.\n1. Practice a rate limiter design"
        };
        Ok(reply.to_string())
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────

fn write_config(dir: &Path, backend: &str, store_path: &Path) -> AppConfig {
    let config_path = dir.join("config.toml");
    std::fs::write(
        &config_path,
        format!(
            r#"
[generation]
model = "test-model"

[retry]
max_attempts = 2
base_delay_ms = 1

[store]
backend = "{backend}"
path = '{}'
"#,
            store_path.display()
        ),
    )
    .unwrap();
    AppConfig::load_from(&config_path).unwrap()
}

async fn service(config: &AppConfig, endpoint: Arc<ScriptedEndpoint>) -> SwarmService {
    let client = Arc::new(GenerativeClient::new(
        endpoint,
        ClientSettings::from_config(config),
    ));
    let store = careerswarm_store::build_from_config(config).await.unwrap();
    SwarmService::new(SwarmCoordinator::new(client, AgentRegistry::new()), store)
}

fn profile() -> UserProfile {
    serde_json::from_str(
        r#"{
            "name": "Grace",
            "currentRole": "Site Reliability Engineer",
            "targetRole": "Platform Engineer",
            "experienceYears": 8,
            "skills": ["Go", "Kubernetes"]
        }"#,
    )
    .unwrap()
}

// ── Tests ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn two_weeks_persist_to_file_store() {
    let dir = tempfile::tempdir().unwrap();
    let state_dir = dir.path().join("state");
    let config = write_config(dir.path(), "file", &state_dir);
    let endpoint = ScriptedEndpoint::new();
    let swarm = service(&config, endpoint.clone()).await;

    let first = swarm.run("grace", &profile()).await.unwrap();
    assert_eq!(first.state.current_week, 1);
    assert!(!first.is_degraded());

    let second = swarm.run("grace", &profile()).await.unwrap();
    assert_eq!(second.state.current_week, 2);
    assert_eq!(second.state.weekly_plans.len(), 2);
    assert_eq!(second.state.weekly_plans[0].week, 2);
    assert_eq!(second.state.agent_conversation.len(), 8);
    assert_eq!(endpoint.calls(), 8);

    let plan = second.state.current_plan().unwrap();
    assert_eq!(plan.goals.applications, 6);
    let ids: Vec<_> = plan.tasks.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, ["week-2-task-1", "week-2-task-2", "week-2-task-3"]);

    let progress = &second.state.user_progress;
    assert_eq!(progress.skills_learned, vec!["Terraform".to_string()]);
    assert_eq!(progress.readiness_score, 100);
    assert_eq!(progress.applications_submitted, 0);

    // A fresh process sees the same document.
    assert!(FileBackend::new(&state_dir).path_for("grace").exists());
    let reopened = service(&config, ScriptedEndpoint::new()).await;
    assert_eq!(reopened.state("grace").await.unwrap(), Some(second.state));
}

#[tokio::test]
async fn toggles_survive_reopening_the_store() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), "file", &dir.path().join("state"));

    let swarm = service(&config, ScriptedEndpoint::new()).await;
    swarm.run("grace", &profile()).await.unwrap();
    swarm.toggle_task("grace", "week-1-task-1").await.unwrap();
    swarm.toggle_task("grace", "week-1-task-2").await.unwrap();

    let reopened = service(&config, ScriptedEndpoint::new()).await;
    let state = reopened.state("grace").await.unwrap().unwrap();
    let plan = state.current_plan().unwrap();
    assert_eq!(plan.tasks[0].status, TaskStatus::Completed);
    assert_eq!(plan.tasks[1].status, TaskStatus::Completed);
    assert_eq!(plan.tasks[2].status, TaskStatus::Pending);
    assert_eq!(state.user_progress.applications_submitted, 1);
    assert_eq!(state.user_progress.interviews_completed, 1);

    let err = reopened.toggle_task("grace", "week-9-task-1").await.unwrap_err();
    assert!(matches!(err, Error::TaskNotFound(_)));
}

#[tokio::test]
async fn failing_agent_degrades_after_retries() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), "file", &dir.path().join("state"));
    let endpoint = ScriptedEndpoint::failing_for(vec!["Suggest where to apply"]);
    let swarm = service(&config, endpoint.clone()).await;

    let run = swarm.run("grace", &profile()).await.unwrap();

    assert_eq!(run.degraded, vec![AgentRole::Recruiter]);
    assert!(!run.fallback_plan);
    // Recruiter was attempted twice, the others once.
    assert_eq!(endpoint.calls(), 5);

    let recruiter = run
        .state
        .agent_conversation
        .iter()
        .find(|m| m.agent_id == AgentRole::Recruiter)
        .unwrap();
    assert!(recruiter.action_items.is_empty());
    assert_eq!(run.state.current_plan().unwrap().tasks.len(), 3);
}

#[tokio::test]
async fn unconfigured_endpoint_aborts_without_writing() {
    let dir = tempfile::tempdir().unwrap();
    let state_dir = dir.path().join("state");
    let config = write_config(dir.path(), "file", &state_dir);
    assert!(!config.has_api_key());

    let client = Arc::new(careerswarm_providers::build_from_config(&config));
    let store = careerswarm_store::build_from_config(&config).await.unwrap();
    let swarm = SwarmService::new(SwarmCoordinator::new(client, AgentRegistry::new()), store);

    let err = swarm.run("grace", &profile()).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Generation(GenerationError::NotConfigured(_))
    ));
    assert!(swarm.state("grace").await.unwrap().is_none());
    assert!(!FileBackend::new(&state_dir).path_for("grace").exists());
}

#[tokio::test]
async fn sqlite_store_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), "sqlite", &dir.path().join("swarm.db"));

    let swarm = service(&config, ScriptedEndpoint::new()).await;
    let run = swarm.run("grace", &profile()).await.unwrap();
    assert_eq!(swarm.store().name(), "sqlite");

    let reopened = service(&config, ScriptedEndpoint::new()).await;
    assert_eq!(reopened.state("grace").await.unwrap(), Some(run.state));

    assert!(reopened.reset("grace").await.unwrap());
    assert!(reopened.state("grace").await.unwrap().is_none());
}
