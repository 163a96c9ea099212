//! Turning agent replies into state.
//!
//! Everything here is pure: the coordinator feeds in replies and the prior
//! snapshot and gets back plans, messages and progress.

use careerswarm_core::agent::{AgentRole, StateField};
use careerswarm_core::state::{Goals, Task, TaskPriority, TaskStatus, UserProgress, WeeklyPlan};
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Days a weekly plan spans after its start date.
const PLAN_SPAN_DAYS: u64 = 6;

/// The Planner's JSON reply. Every field is optional; gaps are filled from
/// the prior plan's goals.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannerOutput {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub goals: Option<PlannerGoals>,
    /// Entries that fail to parse are dropped one by one.
    #[serde(default, deserialize_with = "lenient_tasks")]
    pub tasks: Vec<PlannerTask>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannerGoals {
    #[serde(default)]
    pub applications: Option<u32>,
    #[serde(default)]
    pub networking: Option<u32>,
    #[serde(default)]
    pub interview_prep: Option<u32>,
    #[serde(default)]
    pub skill_development: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannerTask {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub assigned_agent: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default, deserialize_with = "lenient_days")]
    pub due_in_days: Option<u64>,
    #[serde(default, deserialize_with = "lenient_date")]
    pub due_date: Option<NaiveDate>,
}

fn lenient_tasks<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<PlannerTask>, D::Error> {
    let tasks = match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    };
    Ok(tasks)
}

/// Whole or fractional day counts, as numbers or strings.
fn lenient_days<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    let days = match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().and_then(days_from_f64)),
        Value::String(s) => s.trim().parse::<f64>().ok().and_then(days_from_f64),
        _ => None,
    };
    Ok(days)
}

fn days_from_f64(days: f64) -> Option<u64> {
    days.is_finite().then(|| days.max(0.0).round() as u64)
}

/// `YYYY-MM-DD`, or the date part of a full timestamp.
fn lenient_date<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<NaiveDate>, D::Error> {
    let date = match Value::deserialize(deserializer)? {
        Value::String(s) => {
            let s = s.trim();
            s.parse::<NaiveDate>()
                .ok()
                .or_else(|| s.get(..10).and_then(|d| d.parse().ok()))
        }
        _ => None,
    };
    Ok(date)
}

/// Date range of a plan starting on `start`.
pub fn plan_window(start: NaiveDate) -> (NaiveDate, NaiveDate) {
    let end = start.checked_add_days(Days::new(PLAN_SPAN_DAYS)).unwrap_or(start);
    (start, end)
}

/// Goals to carry into a new week when the Planner gives none.
pub fn prior_goals(prior_plan: Option<&WeeklyPlan>) -> Goals {
    prior_plan.map(|p| p.goals.clone()).unwrap_or_default()
}

/// Build the plan for `week` from the Planner's reply.
///
/// Returns `None` when the reply carries neither goals nor a usable task,
/// so the caller falls back instead of storing a no-op plan.
pub fn plan_from_output(
    output: &PlannerOutput,
    week: u32,
    start: NaiveDate,
    fallback_goals: &Goals,
) -> Option<WeeklyPlan> {
    let (start_date, end_date) = plan_window(start);

    let tasks: Vec<Task> = output
        .tasks
        .iter()
        .filter(|t| !t.title.trim().is_empty())
        .enumerate()
        .map(|(i, t)| Task {
            id: format!("week-{week}-task-{}", i + 1),
            title: t.title.trim().to_string(),
            description: t.description.trim().to_string(),
            assigned_agent: t
                .assigned_agent
                .as_deref()
                .and_then(AgentRole::from_id)
                .unwrap_or(AgentRole::Planner),
            priority: parse_priority(t.priority.as_deref()),
            due_date: due_date(t, start_date, end_date),
            status: TaskStatus::Pending,
        })
        .collect();

    if output.goals.is_none() && tasks.is_empty() {
        return None;
    }

    let goals = match &output.goals {
        Some(g) => Goals {
            applications: g.applications.unwrap_or(fallback_goals.applications),
            networking: g.networking.unwrap_or(fallback_goals.networking),
            interview_prep: g.interview_prep.unwrap_or(fallback_goals.interview_prep),
            skill_development: g
                .skill_development
                .clone()
                .unwrap_or_else(|| fallback_goals.skill_development.clone()),
        },
        None => fallback_goals.clone(),
    };

    Some(WeeklyPlan {
        week,
        start_date,
        end_date,
        goals,
        tasks,
    })
}

/// The deterministic plan used when the Planner fails: prior goals, the
/// new date range, no tasks.
pub fn fallback_plan(prior_plan: Option<&WeeklyPlan>, week: u32, start: NaiveDate) -> WeeklyPlan {
    let (start_date, end_date) = plan_window(start);
    WeeklyPlan {
        week,
        start_date,
        end_date,
        goals: prior_goals(prior_plan),
        tasks: Vec::new(),
    }
}

fn parse_priority(raw: Option<&str>) -> TaskPriority {
    match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
        Some("high") | Some("urgent") => TaskPriority::High,
        Some("low") => TaskPriority::Low,
        _ => TaskPriority::Medium,
    }
}

fn due_date(task: &PlannerTask, start: NaiveDate, end: NaiveDate) -> NaiveDate {
    if let Some(date) = task.due_date {
        return date.clamp(start, end);
    }
    match task.due_in_days {
        Some(days) => start
            .checked_add_days(Days::new(days.min(PLAN_SPAN_DAYS)))
            .unwrap_or(end),
        None => end,
    }
}

/// Split a commentary reply into its prose and an optional trailing JSON
/// object (bare or fenced).
pub fn split_trailing_data(text: &str) -> (&str, Option<Value>) {
    let trimmed = text.trim_end();

    if let Some(without_close) = trimmed.strip_suffix("```") {
        if let Some(open) = without_close.rfind("```") {
            let inner = &without_close[open + 3..];
            let inner = inner.strip_prefix("json").unwrap_or(inner);
            if let Some(value) = parse_object(inner) {
                return (trimmed[..open].trim_end(), Some(value));
            }
        }
    }

    if trimmed.ends_with('}') {
        let starts: Vec<usize> = trimmed.match_indices('{').map(|(i, _)| i).collect();
        for &start in starts.iter().rev() {
            if let Some(value) = parse_object(&trimmed[start..]) {
                return (trimmed[..start].trim_end(), Some(value));
            }
        }
    }

    (trimmed, None)
}

fn parse_object(text: &str) -> Option<Value> {
    match serde_json::from_str::<Value>(text.trim()) {
        Ok(Value::Object(map)) if !map.is_empty() => Some(Value::Object(map)),
        _ => None,
    }
}

/// Bullet lines (`-`, `*`, `•`, `1.` or `1)`) of a reply, markers removed.
pub fn parse_action_items(text: &str) -> Vec<String> {
    text.lines()
        .filter_map(|line| {
            let line = line.trim();
            let rest = line
                .strip_prefix("- ")
                .or_else(|| line.strip_prefix("* "))
                .or_else(|| line.strip_prefix("• "))
                .or_else(|| strip_numbered(line))?;
            let item = rest.trim().trim_matches('*').trim();
            (!item.is_empty()).then(|| item.to_string())
        })
        .collect()
}

fn strip_numbered(line: &str) -> Option<&str> {
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 {
        return None;
    }
    let rest = &line[digits..];
    rest.strip_prefix(". ").or_else(|| rest.strip_prefix(") "))
}

/// Changes to `UserProgress` asserted by one agent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressDelta {
    pub skills_learned: Vec<String>,
    pub readiness_score: Option<i64>,
}

impl ProgressDelta {
    /// Read a delta from an agent's trailing data. Agents that do not own
    /// `UserProgress` never produce one.
    pub fn from_data(role: AgentRole, data: &Value) -> Option<ProgressDelta> {
        if !role.may_change(StateField::UserProgress) {
            return None;
        }

        let skills_learned = data
            .get("skillsLearned")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        let readiness_score = data
            .get("readinessScore")
            .and_then(Value::as_f64)
            .map(|n| n.round() as i64);

        let delta = ProgressDelta {
            skills_learned,
            readiness_score,
        };
        (delta != ProgressDelta::default()).then_some(delta)
    }
}

/// Layer agent deltas on the prior progress snapshot.
///
/// Counters are left exactly as the prior snapshot has them, since only task
/// toggling moves them. Skills are unioned in order, ignoring case. Readiness
/// takes the last asserted value, clamped to 0..=100.
pub fn apply_deltas(prior: &UserProgress, deltas: &[ProgressDelta]) -> UserProgress {
    let mut next = prior.clone();

    for delta in deltas {
        for skill in &delta.skills_learned {
            let known = next
                .skills_learned
                .iter()
                .any(|s| s.eq_ignore_ascii_case(skill));
            if !known {
                next.skills_learned.push(skill.clone());
            }
        }
        if let Some(score) = delta.readiness_score {
            next.readiness_score = score.clamp(0, 100) as u8;
        }
    }

    next
}
