//! `careerswarm serve`: start the HTTP API server.

use std::path::Path;

use super::{CliResult, load_config};

pub async fn run(config_override: Option<&Path>, port_override: Option<u16>) -> CliResult {
    let mut config = load_config(config_override)?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("🐝 careerswarm gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Store:     {}", config.store.backend);

    careerswarm_gateway::start(config).await?;

    Ok(())
}
