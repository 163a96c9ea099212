//! SwarmCoordinator: executes one run and produces the next `SwarmState`.
//!
//! # Run
//!
//! ```text
//! prior state ──► build all prompts (pure)
//!                      │
//!                      ▼
//!     Planner ─► Recruiter ─► Coach ─► Interviewer     (sequential)
//!        │           │          │           │
//!        ▼           ▼          ▼           ▼
//!   weekly plan   message   message +    message
//!                           progress Δ
//!                      │
//!                      ▼
//!          merge ──► next state (week + 1)
//! ```
//!
//! An agent whose call fails is replaced by a neutral message and the run
//! continues. Only fatal errors (missing credentials, cancellation) abort
//! the run, and an aborted run produces no state at all.

use careerswarm_core::agent::{AgentRole, OutputKind};
use careerswarm_core::error::{GenerationError, Result};
use careerswarm_core::profile::UserProfile;
use careerswarm_core::state::{AgentMessage, SwarmState, WeeklyPlan};
use careerswarm_providers::client::{GenerationOptions, GenerativeClient};
use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

use crate::merge::{
    PlannerOutput, ProgressDelta, apply_deltas, fallback_plan, parse_action_items,
    plan_from_output, split_trailing_data,
};
use crate::registry::{AgentPrompt, AgentRegistry};

/// Outcome of one run, with the details a caller needs to tell the user
/// about partial degradation.
#[derive(Debug, Clone)]
pub struct SwarmRun {
    pub run_id: Uuid,
    pub state: SwarmState,
    /// Agents whose call failed and were replaced by a neutral message
    pub degraded: Vec<AgentRole>,
    /// Whether the new weekly plan is the deterministic fallback
    pub fallback_plan: bool,
    /// Agent replies served from the client cache
    pub cached_replies: usize,
    pub duration: Duration,
}

impl SwarmRun {
    pub fn is_degraded(&self) -> bool {
        !self.degraded.is_empty() || self.fallback_plan
    }
}

/// Drives the agents of a registry through a generative client.
pub struct SwarmCoordinator {
    client: Arc<GenerativeClient>,
    registry: AgentRegistry,
}

/// What one agent contributed.
struct Contribution {
    message: AgentMessage,
    plan: Option<WeeklyPlan>,
    delta: Option<ProgressDelta>,
    degraded: bool,
    cached: bool,
}

impl SwarmCoordinator {
    pub fn new(client: Arc<GenerativeClient>, registry: AgentRegistry) -> Self {
        Self { client, registry }
    }

    pub fn client(&self) -> &GenerativeClient {
        &self.client
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    /// Run the swarm once. `prior` is `None` for a user's first run.
    pub async fn run(&self, profile: &UserProfile, prior: Option<&SwarmState>) -> Result<SwarmState> {
        self.run_with_cancel(profile, prior, &CancellationToken::new())
            .await
    }

    pub async fn run_with_cancel(
        &self,
        profile: &UserProfile,
        prior: Option<&SwarmState>,
        cancel: &CancellationToken,
    ) -> Result<SwarmState> {
        Ok(self.run_detailed(profile, prior, cancel).await?.state)
    }

    /// Run the swarm and report which agents degraded.
    pub async fn run_detailed(
        &self,
        profile: &UserProfile,
        prior: Option<&SwarmState>,
        cancel: &CancellationToken,
    ) -> Result<SwarmRun> {
        let run_id = Uuid::new_v4();
        let prior = prior.cloned().unwrap_or_else(SwarmState::initial);
        let week = prior.current_week.saturating_add(1);
        let span = info_span!("swarm_run", %run_id, week);

        self.execute(run_id, profile, prior, cancel)
            .instrument(span)
            .await
    }

    async fn execute(
        &self,
        run_id: Uuid,
        profile: &UserProfile,
        prior: SwarmState,
        cancel: &CancellationToken,
    ) -> Result<SwarmRun> {
        let started = tokio::time::Instant::now();
        let week = prior.current_week.saturating_add(1);
        let today = Utc::now().date_naive();

        info!(agents = self.registry.roles().len(), "Swarm run started");

        // Every prompt is built before the first network call.
        let prompts = self.registry.build_prompts(profile, &prior);

        let mut contributions = Vec::with_capacity(prompts.len());
        for prompt in &prompts {
            if cancel.is_cancelled() {
                return Err(GenerationError::Cancelled.into());
            }
            let contribution = self.invoke(prompt, &prior, week, today, cancel).await?;
            contributions.push(contribution);
        }

        let mut next = prior.clone();
        let mut degraded = Vec::new();
        let mut deltas = Vec::new();
        let mut plan = None;
        let mut cached_replies = 0;

        for contribution in contributions {
            if contribution.degraded {
                degraded.push(contribution.message.agent_id);
            }
            if contribution.cached {
                cached_replies += 1;
            }
            if let Some(p) = contribution.plan {
                plan = Some(p);
            }
            deltas.extend(contribution.delta);
            next.agent_conversation.push(contribution.message);
        }

        let fallback = plan.is_none();
        let plan = plan.unwrap_or_else(|| fallback_plan(prior.current_plan(), week, today));
        next.weekly_plans.retain(|p| p.week != week);
        next.weekly_plans.insert(0, plan);

        next.user_progress = apply_deltas(&prior.user_progress, &deltas);
        next.current_week = week;
        next.last_updated = Utc::now();

        let duration = started.elapsed();
        info!(
            tasks = next.weekly_plans[0].tasks.len(),
            degraded = degraded.len(),
            fallback_plan = fallback,
            duration_ms = duration.as_millis() as u64,
            "Swarm run completed"
        );

        Ok(SwarmRun {
            run_id,
            state: next,
            degraded,
            fallback_plan: fallback,
            cached_replies,
            duration,
        })
    }

    /// Call one agent. Non-fatal failures become a neutral contribution.
    async fn invoke(
        &self,
        prompt: &AgentPrompt,
        prior: &SwarmState,
        week: u32,
        today: NaiveDate,
        cancel: &CancellationToken,
    ) -> Result<Contribution> {
        let role = prompt.role;
        let options = GenerationOptions::default()
            .with_temperature(prompt.temperature)
            .with_system_instruction(prompt.system_instruction.clone());

        let outcome = match prompt.output_kind {
            OutputKind::Structured => self
                .client
                .generate_json_with_cancel::<PlannerOutput>(&prompt.prompt, &options, cancel)
                .await
                .map(|r| (self.plan_contribution(role, &r.data, prior, week, today), r.cached)),
            OutputKind::Commentary => self
                .client
                .generate_text_with_cancel(&prompt.prompt, &options, cancel)
                .await
                .map(|r| (commentary_contribution(role, &r.data), r.cached)),
        };

        match outcome {
            Ok((mut contribution, cached)) => {
                contribution.cached = cached;
                Ok(contribution)
            }
            Err(e) if e.is_fatal() => Err(e.into()),
            Err(e) => {
                warn!(agent = %role, error = %e, "Agent degraded");
                Ok(Contribution {
                    message: degraded_message(role),
                    plan: None,
                    delta: None,
                    degraded: true,
                    cached: false,
                })
            }
        }
    }

    fn plan_contribution(
        &self,
        role: AgentRole,
        output: &PlannerOutput,
        prior: &SwarmState,
        week: u32,
        today: NaiveDate,
    ) -> Contribution {
        let goals = crate::merge::prior_goals(prior.current_plan());
        match plan_from_output(output, week, today, &goals) {
            Some(plan) => {
                let summary = output
                    .summary
                    .clone()
                    .filter(|s| !s.trim().is_empty())
                    .unwrap_or_else(|| {
                        format!("Your week {week} plan is ready with {} tasks.", plan.tasks.len())
                    });
                let items = plan.tasks.iter().map(|t| t.title.clone()).collect();
                Contribution {
                    message: AgentMessage::new(role, summary).with_action_items(items),
                    plan: Some(plan),
                    delta: None,
                    degraded: false,
                    cached: false,
                }
            }
            None => {
                warn!(agent = %role, "Plan reply had no goals or tasks, using fallback plan");
                Contribution {
                    message: AgentMessage::new(
                        role,
                        format!(
                            "I couldn't put together a detailed plan for week {week}, so your \
                             goals carry over from last week."
                        ),
                    ),
                    plan: None,
                    delta: None,
                    degraded: true,
                    cached: false,
                }
            }
        }
    }
}

fn commentary_contribution(role: AgentRole, text: &str) -> Contribution {
    let (body, data) = split_trailing_data(text);
    let delta = data
        .as_ref()
        .and_then(|d| ProgressDelta::from_data(role, d));

    Contribution {
        message: AgentMessage::new(role, body.trim())
            .with_action_items(parse_action_items(body))
            .with_data(data),
        plan: None,
        delta,
        degraded: false,
        cached: false,
    }
}

fn degraded_message(role: AgentRole) -> AgentMessage {
    AgentMessage::new(
        role,
        format!(
            "Sorry, the {} couldn't weigh in this week. Their input will be back on the next run.",
            role.display_name()
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use careerswarm_core::error::Error;
    use careerswarm_core::state::{TaskStatus, UserProgress};

    fn prior_at_week(week: u32) -> SwarmState {
        let today = Utc::now().date_naive();
        let mut state = SwarmState::initial();
        state.current_week = week;
        state.weekly_plans = vec![fallback_plan(None, week, today)];
        state.agent_conversation = vec![AgentMessage::new(AgentRole::Coach, "earlier advice")];
        state.user_progress = UserProgress {
            applications_submitted: 3,
            skills_learned: vec!["Rust".into()],
            readiness_score: 35,
            ..UserProgress::default()
        };
        state
    }

    #[tokio::test]
    async fn week_three_advances_to_week_four_with_tasks() {
        let coordinator = coordinator(ScriptedProvider::happy_path());
        let prior = prior_at_week(3);

        let state = coordinator.run(&profile(), Some(&prior)).await.unwrap();

        assert_eq!(state.current_week, 4);
        assert_eq!(state.weekly_plans[0].week, 4);
        assert!(!state.weekly_plans[0].tasks.is_empty());
        assert_eq!(state.weekly_plans[0].goals.applications, 5);
        assert_eq!(state.weekly_plans.len(), 2);
        assert_eq!(state.weekly_plans[1].week, 3);
    }

    #[tokio::test]
    async fn first_run_starts_at_week_one() {
        let coordinator = coordinator(ScriptedProvider::happy_path());
        let state = coordinator.run(&profile(), None).await.unwrap();

        assert_eq!(state.current_week, 1);
        assert_eq!(state.weekly_plans.len(), 1);
        assert_eq!(state.agent_conversation.len(), 4);
        assert!(state.weekly_plans[0].tasks.iter().all(|t| t.status == TaskStatus::Pending));
    }

    #[tokio::test]
    async fn conversation_is_appended_in_agent_order() {
        let coordinator = coordinator(ScriptedProvider::happy_path());
        let prior = prior_at_week(1);

        let state = coordinator.run(&profile(), Some(&prior)).await.unwrap();

        assert_eq!(state.agent_conversation[0], prior.agent_conversation[0]);
        let roles: Vec<AgentRole> = state.agent_conversation[1..]
            .iter()
            .map(|m| m.agent_id)
            .collect();
        assert_eq!(roles, AgentRole::ALL.to_vec());

        let recruiter = &state.agent_conversation[2];
        assert_eq!(recruiter.action_items, vec!["Apply to Acme", "Message two hiring managers"]);
        assert_eq!(recruiter.data.as_ref().unwrap()["jobsFound"], 12);
        assert!(!recruiter.message.contains("jobsFound"));
    }

    #[tokio::test]
    async fn coach_delta_layers_on_prior_progress() {
        let coordinator = coordinator(ScriptedProvider::happy_path());
        let prior = prior_at_week(2);

        let state = coordinator.run(&profile(), Some(&prior)).await.unwrap();
        let progress = &state.user_progress;

        // Recruiter's suggestions never count as submitted applications.
        assert_eq!(progress.applications_submitted, 3);
        assert_eq!(progress.skills_learned, vec!["Rust", "System design"]);
        assert_eq!(progress.readiness_score, 62);
    }

    #[tokio::test(start_paused = true)]
    async fn one_failing_agent_degrades_gracefully() {
        let provider = ScriptedProvider::happy_path()
            .fail_for("Review this candidate", GenerationError::status(503, "down"));
        let coordinator = coordinator(provider.clone());
        let prior = prior_at_week(1);

        let run = coordinator
            .run_detailed(&profile(), Some(&prior), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(run.degraded, vec![AgentRole::Coach]);
        assert!(!run.fallback_plan);
        let state = &run.state;
        assert_eq!(state.current_week, 2);
        assert!(!state.weekly_plans[0].tasks.is_empty());
        assert_eq!(state.agent_conversation.len(), 5);

        let coach = &state.agent_conversation[3];
        assert_eq!(coach.agent_id, AgentRole::Coach);
        assert!(coach.message.contains("couldn't weigh in"));
        assert!(coach.action_items.is_empty());

        // Progress untouched because the only progress owner failed.
        assert_eq!(state.user_progress, prior.user_progress);
        // Coach was retried: 3 attempts + 3 other agents.
        assert_eq!(provider.call_count(), 6);
    }

    #[tokio::test]
    async fn malformed_plan_uses_fallback() {
        let provider = ScriptedProvider::happy_path().reply_for("Create the plan", "Sorry, no JSON today.");
        let coordinator = coordinator(provider);
        let mut prior = prior_at_week(3);
        prior.weekly_plans[0].goals.applications = 9;

        let run = coordinator
            .run_detailed(&profile(), Some(&prior), &CancellationToken::new())
            .await
            .unwrap();

        assert!(run.fallback_plan);
        assert_eq!(run.degraded, vec![AgentRole::Planner]);
        let plan = &run.state.weekly_plans[0];
        assert_eq!(plan.week, 4);
        assert_eq!(plan.goals.applications, 9);
        assert!(plan.tasks.is_empty());
        assert_eq!(run.state.agent_conversation.len(), 5);
    }

    #[tokio::test]
    async fn missing_credentials_are_fatal() {
        let provider = ScriptedProvider::failing(GenerationError::NotConfigured("no key".into()));
        let coordinator = coordinator(provider.clone());

        let err = coordinator.run(&profile(), None).await.unwrap_err();
        assert!(matches!(err, Error::Generation(GenerationError::NotConfigured(_))));
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn cancelled_run_returns_cancelled() {
        let provider = ScriptedProvider::happy_path();
        let coordinator = coordinator(provider.clone());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = coordinator
            .run_with_cancel(&profile(), None, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Generation(GenerationError::Cancelled)));
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn rerunning_same_week_replaces_its_plan() {
        let coordinator = coordinator(ScriptedProvider::happy_path());
        let mut prior = prior_at_week(3);
        // A stale plan already exists for week 4.
        prior.weekly_plans.insert(
            0,
            fallback_plan(None, 4, Utc::now().date_naive()),
        );

        let state = coordinator.run(&profile(), Some(&prior)).await.unwrap();
        let weeks: Vec<u32> = state.weekly_plans.iter().map(|p| p.week).collect();
        assert_eq!(weeks, vec![4, 3]);
    }

    #[tokio::test]
    async fn repeated_prompts_are_served_from_cache() {
        let provider = ScriptedProvider::happy_path();
        let coordinator = coordinator(provider.clone());
        let prior = prior_at_week(1);
        let cancel = CancellationToken::new();

        coordinator.run_detailed(&profile(), Some(&prior), &cancel).await.unwrap();
        let again = coordinator.run_detailed(&profile(), Some(&prior), &cancel).await.unwrap();

        assert_eq!(again.cached_replies, 4);
        assert_eq!(provider.call_count(), 4);
    }
}
