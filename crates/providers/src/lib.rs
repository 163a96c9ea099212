//! Completion providers and the resilient generative client for careerswarm.
//!
//! Providers implement `careerswarm_core::CompletionProvider`; the
//! [`GenerativeClient`] wraps one with caching, rate limiting and retries.

pub mod client;
pub mod gemini;

pub use client::{
    ClientSettings, ClientStats, GenerationOptions, GenerationRequest, GenerationResult,
    GenerativeClient, TextStream,
};
pub use gemini::GeminiProvider;

use careerswarm_config::AppConfig;
use careerswarm_core::provider::CompletionProvider;
use std::sync::Arc;
use std::time::Duration;

/// Build the configured completion provider.
///
/// A missing API key still yields a provider; its calls fail with
/// `NotConfigured`.
pub fn build_provider(config: &AppConfig) -> Arc<dyn CompletionProvider> {
    let api_key = config.api_key.clone().unwrap_or_default();
    if api_key.is_empty() {
        tracing::warn!("No API key configured; generation calls will fail");
    }

    Arc::new(GeminiProvider::new(
        &config.api_url,
        api_key,
        Duration::from_secs(config.generation.request_timeout_secs),
    ))
}

/// Build a client over the configured provider.
pub fn build_from_config(config: &AppConfig) -> GenerativeClient {
    GenerativeClient::new(build_provider(config), ClientSettings::from_config(config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use careerswarm_core::error::GenerationError;

    #[tokio::test]
    async fn unconfigured_client_fails_fatally() {
        let client = build_from_config(&AppConfig::default());
        assert_eq!(client.provider_name(), "gemini");

        let err = client
            .generate_text("hello", &GenerationOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::NotConfigured(_)));
        assert!(err.is_fatal());
        assert_eq!(client.stats().network_calls, 1);
    }
}
