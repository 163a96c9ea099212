//! `careerswarm run`: advance one user's swarm by a week.

use careerswarm_core::UserProfile;
use std::path::Path;
use tokio_util::sync::CancellationToken;

use super::{CliResult, build_service, load_config, print_state};

pub async fn run(config_override: Option<&Path>, user: &str, profile_path: &Path) -> CliResult {
    let config = load_config(config_override)?;
    let raw = std::fs::read_to_string(profile_path)
        .map_err(|e| format!("Failed to read profile {}: {e}", profile_path.display()))?;
    let profile: UserProfile = serde_json::from_str(&raw)
        .map_err(|e| format!("Invalid profile {}: {e}", profile_path.display()))?;

    let service = build_service(&config).await?;

    // Ctrl-C cancels the run; nothing is persisted.
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_signal.cancel();
        }
    });

    println!("🐝 Running the swarm for {} ({})...\n", profile.name, profile.goal_role());
    let run = service.run_with_cancel(user, &profile, &cancel).await?;

    for message in run.state.agent_conversation.iter().rev().take(4).rev() {
        let headline = message.message.lines().next().unwrap_or_default();
        println!("💬 {}: {headline}", message.agent_name);
    }
    println!();
    print_state(&run.state);

    if run.fallback_plan {
        println!("\n⚠️  The planner's reply could not be used; this week's plan has no tasks.");
    }
    for role in &run.degraded {
        println!("⚠️  {} was unavailable this run", role.display_name());
    }
    println!(
        "\n⏱  Finished in {:.1}s ({} cached replies)",
        run.duration.as_secs_f64(),
        run.cached_replies
    );

    Ok(())
}
