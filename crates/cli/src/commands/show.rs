//! `careerswarm show`: print a user's swarm state.

use std::path::Path;

use super::{CliResult, build_service, load_config, print_state};

pub async fn run(config_override: Option<&Path>, user: &str, json: bool) -> CliResult {
    let config = load_config(config_override)?;
    let service = build_service(&config).await?;

    match service.state(user).await? {
        Some(state) if json => println!("{}", serde_json::to_string_pretty(&state)?),
        Some(state) => print_state(&state),
        None => println!("No swarm state for '{user}'. Run `careerswarm run` first."),
    }

    Ok(())
}
