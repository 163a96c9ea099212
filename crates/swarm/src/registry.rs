//! AgentRegistry: maps each [`AgentRole`] to its prompt strategy.
//!
//! Prompt builders are plain functions of `(profile, prior state)`. They do
//! no I/O, so a run can build every prompt before the first network call.

use careerswarm_core::agent::{AgentRole, OutputKind};
use careerswarm_core::profile::UserProfile;
use careerswarm_core::state::SwarmState;
use std::fmt::Write;

/// Signature of a prompt builder.
pub type PromptBuilder = fn(&UserProfile, &SwarmState) -> String;

/// How the coordinator calls one agent.
#[derive(Debug, Clone, Copy)]
pub struct AgentSpec {
    pub role: AgentRole,
    pub system_instruction: &'static str,
    pub temperature: f32,
    pub build_prompt: PromptBuilder,
}

impl AgentSpec {
    pub fn output_kind(&self) -> OutputKind {
        self.role.output_kind()
    }
}

/// A prompt ready to send, built for one agent.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentPrompt {
    pub role: AgentRole,
    pub output_kind: OutputKind,
    pub system_instruction: String,
    pub temperature: f32,
    pub prompt: String,
}

/// The exhaustive dispatch table.
pub fn spec_for(role: AgentRole) -> AgentSpec {
    match role {
        AgentRole::Planner => AgentSpec {
            role,
            system_instruction: "You are a career strategy planner. You turn a job seeker's \
                situation into a concrete, achievable weekly plan. Reply with JSON only.",
            temperature: 0.4,
            build_prompt: planner_prompt,
        },
        AgentRole::Recruiter => AgentSpec {
            role,
            system_instruction: "You are a job scout. You know the hiring market and suggest \
                where a candidate should apply this week.",
            temperature: 0.7,
            build_prompt: recruiter_prompt,
        },
        AgentRole::Coach => AgentSpec {
            role,
            system_instruction: "You are a supportive career coach. You track growth, \
                recommend skills to develop, and assess job-search readiness honestly.",
            temperature: 0.7,
            build_prompt: coach_prompt,
        },
        AgentRole::Interviewer => AgentSpec {
            role,
            system_instruction: "You are an interview coach. You prepare candidates with \
                realistic practice questions and concrete strategy.",
            temperature: 0.7,
            build_prompt: interviewer_prompt,
        },
    }
}

/// The set of agents a swarm run invokes, in invocation order.
#[derive(Debug, Clone)]
pub struct AgentRegistry {
    roles: Vec<AgentRole>,
}

impl AgentRegistry {
    /// All agents, in the fixed run order.
    pub fn new() -> Self {
        Self {
            roles: AgentRole::ALL.to_vec(),
        }
    }

    /// A subset of agents. Order is normalized to the fixed run order and
    /// duplicates are dropped.
    pub fn with_roles(roles: impl IntoIterator<Item = AgentRole>) -> Self {
        let wanted: Vec<AgentRole> = roles.into_iter().collect();
        Self {
            roles: AgentRole::ALL
                .into_iter()
                .filter(|r| wanted.contains(r))
                .collect(),
        }
    }

    pub fn roles(&self) -> &[AgentRole] {
        &self.roles
    }

    pub fn spec(&self, role: AgentRole) -> AgentSpec {
        spec_for(role)
    }

    /// Build every agent's prompt for one run.
    pub fn build_prompts(&self, profile: &UserProfile, prior: &SwarmState) -> Vec<AgentPrompt> {
        self.roles
            .iter()
            .map(|&role| {
                let spec = spec_for(role);
                AgentPrompt {
                    role,
                    output_kind: spec.output_kind(),
                    system_instruction: spec.system_instruction.to_string(),
                    temperature: spec.temperature,
                    prompt: (spec.build_prompt)(profile, prior),
                }
            })
            .collect()
    }
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// --- Prompt builders ---

fn profile_summary(profile: &UserProfile) -> String {
    let mut out = String::new();
    let name: &str = if profile.name.is_empty() {
        "The candidate"
    } else {
        &profile.name
    };
    let _ = writeln!(out, "Candidate: {name}");
    if let Some(role) = &profile.current_role {
        let _ = writeln!(out, "Current role: {role}");
    }
    let _ = writeln!(out, "Target role: {}", profile.goal_role());
    let _ = writeln!(out, "Experience: {} years", profile.experience_years);
    if !profile.skills.is_empty() {
        let _ = writeln!(out, "Skills: {}", profile.skills.join(", "));
    }
    if !profile.industries.is_empty() {
        let _ = writeln!(out, "Industries: {}", profile.industries.join(", "));
    }
    if let Some(location) = &profile.location {
        let _ = writeln!(out, "Location: {location}");
    }
    if let Some(summary) = &profile.resume_summary {
        let _ = writeln!(out, "Resume summary: {summary}");
    }
    out
}

fn progress_summary(prior: &SwarmState) -> String {
    let progress = &prior.user_progress;
    let mut out = format!(
        "Progress so far: {} applications submitted, {} interviews completed, \
         {} networking events, readiness {}/100.\n",
        progress.applications_submitted,
        progress.interviews_completed,
        progress.networking_events,
        progress.readiness_score,
    );
    if !progress.skills_learned.is_empty() {
        let _ = writeln!(out, "Skills learned: {}", progress.skills_learned.join(", "));
    }
    match prior.current_plan() {
        Some(plan) => {
            let _ = writeln!(
                out,
                "Last week (week {}): {} of {} tasks completed.",
                plan.week,
                plan.completed_tasks(),
                plan.tasks.len()
            );
        }
        None => out.push_str("This is the first week of the job search.\n"),
    }
    out
}

const BULLET_INSTRUCTION: &str =
    "End your reply with 2-4 concrete action items, one per line, each starting with \"- \".";

fn planner_prompt(profile: &UserProfile, prior: &SwarmState) -> String {
    let week = prior.current_week.saturating_add(1);
    let mut prompt = format!(
        "Create the plan for week {week} of this job search.\n\n{}\n{}",
        profile_summary(profile),
        progress_summary(prior)
    );

    if let Some(plan) = prior.current_plan() {
        let _ = writeln!(
            prompt,
            "Previous goals: {} applications, {} networking, {} interview prep.",
            plan.goals.applications, plan.goals.networking, plan.goals.interview_prep
        );
        let unfinished: Vec<&str> = plan
            .tasks
            .iter()
            .filter(|t| t.status == careerswarm_core::state::TaskStatus::Pending)
            .map(|t| t.title.as_str())
            .collect();
        if !unfinished.is_empty() {
            let _ = writeln!(prompt, "Unfinished last week: {}", unfinished.join("; "));
        }
    }

    prompt.push_str(
        "\nRespond with a JSON object of this shape:\n\
         {\n\
           \"summary\": \"one sentence describing the focus of the week\",\n\
           \"goals\": {\"applications\": 5, \"networking\": 3, \"interviewPrep\": 2, \
         \"skillDevelopment\": [\"skill\"]},\n\
           \"tasks\": [{\"title\": \"...\", \"description\": \"...\", \
         \"assignedAgent\": \"recruiter|coach|interviewer|planner\", \
         \"priority\": \"low|medium|high\", \"dueInDays\": 0}]\n\
         }\n\
         Include 4 to 8 tasks. dueInDays is 0-6, counted from the start of the week.",
    );
    prompt
}

fn recruiter_prompt(profile: &UserProfile, prior: &SwarmState) -> String {
    format!(
        "Suggest where to apply this week.\n\n{}\n{}\n\
         Name the kinds of companies and roles to target and how many applications \
         are realistic.\n{BULLET_INSTRUCTION}\n\
         Finish with one line of JSON: {{\"jobsFound\": <number>, \"applicationsSuggested\": <number>}}",
        profile_summary(profile),
        progress_summary(prior)
    )
}

fn coach_prompt(profile: &UserProfile, prior: &SwarmState) -> String {
    format!(
        "Review this candidate's growth and readiness for week {}.\n\n{}\n{}\n\
         Recommend which skills to focus on next and assess how ready they are to \
         interview for {}.\n{BULLET_INSTRUCTION}\n\
         Finish with one line of JSON: {{\"skillsLearned\": [<skills the candidate has \
         demonstrably picked up>], \"readinessScore\": <0-100>}}",
        prior.current_week.saturating_add(1),
        profile_summary(profile),
        progress_summary(prior),
        profile.goal_role()
    )
}

fn interviewer_prompt(profile: &UserProfile, prior: &SwarmState) -> String {
    format!(
        "Prepare this candidate for interviews as {}.\n\n{}\n{}\n\
         Give three likely interview questions with a short note on what a strong \
         answer covers.\n{BULLET_INSTRUCTION}",
        profile.goal_role(),
        profile_summary(profile),
        progress_summary(prior)
    )
}
