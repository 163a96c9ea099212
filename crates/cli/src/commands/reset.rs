//! `careerswarm reset`: forget a user's swarm state.

use std::path::Path;

use super::{CliResult, build_service, load_config};

pub async fn run(config_override: Option<&Path>, user: &str) -> CliResult {
    let config = load_config(config_override)?;
    let service = build_service(&config).await?;

    if service.reset(user).await? {
        println!("🗑  Swarm state for '{user}' removed. The next run starts at week 1.");
    } else {
        println!("No swarm state for '{user}'; nothing to reset.");
    }

    Ok(())
}
