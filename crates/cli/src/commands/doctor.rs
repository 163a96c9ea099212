//! `careerswarm doctor`: diagnose configuration and connectivity.

use std::path::Path;

use super::{CliResult, config_file, load_config};

pub async fn run(config_override: Option<&Path>) -> CliResult {
    println!("🩺 careerswarm doctor: System Diagnostics");
    println!("=========================================\n");

    let mut issues = 0;

    let config_path = config_file(config_override);
    if !config_path.exists() {
        println!("  ⚠️  No config file at {}, using defaults", config_path.display());
        println!("      Run `careerswarm onboard` to create one");
        issues += 1;
    }

    let config = match load_config(config_override) {
        Ok(config) => {
            println!("  ✅ Config valid");
            config
        }
        Err(e) => {
            println!("  ❌ Config invalid: {e}");
            println!("\n  ⚠️  Fix the config and re-run doctor.");
            return Ok(());
        }
    };

    println!("     Model:      {}", config.generation.model);
    println!(
        "     Rate limit: {} requests / {}s",
        config.rate_limit.max_requests, config.rate_limit.window_secs
    );
    println!(
        "     Retries:    {} attempts, {}ms base delay",
        config.retry.max_attempts, config.retry.base_delay_ms
    );

    match careerswarm_store::build_from_config(&config).await {
        Ok(store) => println!(
            "  ✅ Store '{}' ready at {}",
            store.name(),
            config.store_path().display()
        ),
        Err(e) => {
            println!("  ❌ Store unavailable: {e}");
            issues += 1;
        }
    }

    if config.has_api_key() {
        println!("  ✅ API key configured");
        let provider = careerswarm_providers::build_provider(&config);
        match provider.health_check().await {
            Ok(true) => println!("  ✅ Endpoint reachable: {}", config.api_url),
            Ok(false) => {
                println!("  ⚠️  Endpoint answered but reported unhealthy: {}", config.api_url);
                issues += 1;
            }
            Err(e) => {
                println!("  ❌ Endpoint check failed: {e}");
                issues += 1;
            }
        }
    } else {
        println!("  ⚠️  No API key configured; set api_key in config.toml or GEMINI_API_KEY");
        issues += 1;
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
