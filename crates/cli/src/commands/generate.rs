//! `careerswarm generate`: one prompt through the generative client.

use careerswarm_providers::GenerationOptions;
use std::io::Write;
use std::path::Path;
use tokio_stream::StreamExt;

use super::{CliResult, load_config};

pub async fn run(
    config_override: Option<&Path>,
    prompt: &str,
    json: bool,
    stream: bool,
    model: Option<String>,
) -> CliResult {
    let config = load_config(config_override)?;
    let client = careerswarm_providers::build_from_config(&config);

    let mut options = GenerationOptions::default();
    if let Some(model) = model {
        options = options.with_model(model);
    }

    if stream {
        let mut chunks = client.generate_stream(prompt, &options).await?;
        let mut stdout = std::io::stdout();
        while let Some(chunk) = chunks.next().await {
            write!(stdout, "{}", chunk?)?;
            stdout.flush()?;
        }
        writeln!(stdout)?;
        return Ok(());
    }

    if json {
        let result = client
            .generate_json::<serde_json::Value>(prompt, &options)
            .await?;
        println!("{}", serde_json::to_string_pretty(&result.data)?);
        tracing::debug!(
            cached = result.cached,
            elapsed_ms = result.duration.as_millis() as u64,
            "Generated JSON"
        );
    } else {
        let result = client.generate_text(prompt, &options).await?;
        println!("{}", result.data);
        tracing::debug!(
            cached = result.cached,
            elapsed_ms = result.duration.as_millis() as u64,
            "Generated text"
        );
    }

    Ok(())
}
