//! `careerswarm onboard`: first-time setup.

use careerswarm_config::AppConfig;
use std::path::Path;

use super::{CliResult, config_file};

pub async fn run(config_override: Option<&Path>) -> CliResult {
    let config_path = config_file(config_override);

    println!("🐝 careerswarm: First-Time Setup");
    println!("================================\n");

    let config_dir = config_path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty());
    if let Some(dir) = config_dir {
        if !dir.exists() {
            std::fs::create_dir_all(dir)?;
            println!("✅ Created config directory: {}", dir.display());
        }
    }

    if config_path.exists() {
        println!("⚠️  Config already exists at: {}", config_path.display());
        println!("   Edit it manually or delete and re-run onboard.\n");
        return Ok(());
    }

    std::fs::write(&config_path, AppConfig::default_toml())?;
    println!("✅ Created config.toml at: {}", config_path.display());
    println!("\n📝 Next steps:");
    println!("   1. Add api_key to {} (or set GEMINI_API_KEY)", config_path.display());
    println!("   2. Write your profile to profile.json");
    println!("   3. Run: careerswarm run --user me --profile profile.json\n");

    Ok(())
}
