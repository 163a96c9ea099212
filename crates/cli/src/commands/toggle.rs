//! `careerswarm toggle`: flip one task of the current plan.

use careerswarm_core::TaskStatus;
use std::path::Path;

use super::{CliResult, build_service, load_config};

pub async fn run(config_override: Option<&Path>, user: &str, task_id: &str) -> CliResult {
    let config = load_config(config_override)?;
    let service = build_service(&config).await?;

    let state = service.toggle_task(user, task_id).await?;
    let task = state
        .current_plan()
        .and_then(|plan| plan.tasks.iter().find(|t| t.id == task_id))
        .ok_or_else(|| format!("Task {task_id} vanished after toggling"))?;

    match task.status {
        TaskStatus::Completed => println!("✅ {} marked completed", task.title),
        TaskStatus::Pending => println!("⬜ {} marked pending", task.title),
    }

    Ok(())
}
