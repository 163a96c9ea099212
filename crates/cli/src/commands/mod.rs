pub mod doctor;
pub mod generate;
pub mod onboard;
pub mod reset;
pub mod run;
pub mod serve;
pub mod show;
pub mod toggle;

use careerswarm_config::AppConfig;
use careerswarm_core::SwarmState;
use careerswarm_swarm::{AgentRegistry, SwarmCoordinator, SwarmService};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub type CliResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

/// Where the config file lives: the `--config` override or the default.
pub fn config_file(path: Option<&Path>) -> PathBuf {
    path.map(Path::to_path_buf)
        .unwrap_or_else(|| AppConfig::config_dir().join("config.toml"))
}

/// Load the config from the override path, or the default location.
pub fn load_config(path: Option<&Path>) -> CliResult<AppConfig> {
    let config = match path {
        Some(path) => {
            let mut config = AppConfig::load_from(path)?;
            config.apply_env(|key| std::env::var(key).ok());
            config.validate()?;
            config
        }
        None => AppConfig::load()?,
    };
    Ok(config)
}

/// Wire client, store, and coordinator into a service.
pub async fn build_service(config: &AppConfig) -> CliResult<SwarmService> {
    let client = Arc::new(careerswarm_providers::build_from_config(config));
    let store = careerswarm_store::build_from_config(config).await?;
    let coordinator = SwarmCoordinator::new(client, AgentRegistry::new());
    Ok(SwarmService::new(coordinator, store))
}

/// Human-readable view of the current week.
pub fn print_state(state: &SwarmState) {
    println!("📅 Week {}", state.current_week);

    if let Some(plan) = state.current_plan() {
        println!(
            "   {} → {}",
            plan.start_date.format("%b %d"),
            plan.end_date.format("%b %d")
        );
        let goals = &plan.goals;
        println!(
            "   Goals: {} applications, {} networking, {} interview prep",
            goals.applications, goals.networking, goals.interview_prep
        );
        if !goals.skill_development.is_empty() {
            println!("   Skills: {}", goals.skill_development.join(", "));
        }
        println!();
        if plan.tasks.is_empty() {
            println!("   No tasks this week.");
        }
        for task in &plan.tasks {
            let mark = match task.status {
                careerswarm_core::TaskStatus::Completed => "✅",
                careerswarm_core::TaskStatus::Pending => "⬜",
            };
            println!(
                "   {mark} [{}] {} ({}, due {})",
                task.id,
                task.title,
                task.assigned_agent.display_name(),
                task.due_date
            );
        }
    }

    let progress = &state.user_progress;
    println!();
    println!("📈 Progress");
    println!("   Applications submitted: {}", progress.applications_submitted);
    println!("   Interviews completed:   {}", progress.interviews_completed);
    println!("   Networking events:      {}", progress.networking_events);
    println!("   Readiness score:        {}/100", progress.readiness_score);
    if !progress.skills_learned.is_empty() {
        println!("   Skills learned:         {}", progress.skills_learned.join(", "));
    }
}
