//! Provider trait: the abstraction over the generative completion endpoint.
//!
//! A provider turns one prompt plus sampling parameters into text, either as
//! a complete response or as a stream of chunks. It knows nothing about
//! caching, rate limiting, or retries; those live in the client that wraps it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::GenerationError;

/// Sampling parameters sent with every completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    /// Temperature (0.0 = deterministic, 2.0 = very creative)
    pub temperature: f32,

    /// Top-k sampling cutoff
    pub top_k: u32,

    /// Nucleus sampling cutoff
    pub top_p: f32,

    /// Maximum tokens to generate
    pub max_output_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_k: 40,
            top_p: 0.95,
            max_output_tokens: 2048,
        }
    }
}

/// A single request to the completion endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRequest {
    /// The model to use (e.g., "gemini-2.0-flash")
    pub model: String,

    /// The user prompt
    pub prompt: String,

    /// Optional system instruction
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<String>,

    /// Sampling parameters
    pub config: GenerationConfig,
}

/// Receiving half of a streamed completion.
pub type ChunkReceiver = tokio::sync::mpsc::Receiver<Result<String, GenerationError>>;

/// The core provider trait.
///
/// The client calls `complete()` or `stream()` without knowing which backend
/// is in use: tests substitute scripted implementations.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// A human-readable name for this provider (e.g., "gemini").
    fn name(&self) -> &str;

    /// Send a request and get the complete response text.
    async fn complete(&self, request: CompletionRequest) -> Result<String, GenerationError>;

    /// Send a request and get a stream of text chunks.
    ///
    /// Default implementation calls `complete()` and delivers the result as a
    /// single chunk.
    async fn stream(&self, request: CompletionRequest) -> Result<ChunkReceiver, GenerationError> {
        let text = self.complete(request).await?;
        let (tx, rx) = tokio::sync::mpsc::channel(1);
        let _ = tx.send(Ok(text)).await;
        Ok(rx)
    }

    /// Health check: can we reach the endpoint?
    async fn health_check(&self) -> Result<bool, GenerationError> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoProvider;

    #[async_trait]
    impl CompletionProvider for EchoProvider {
        fn name(&self) -> &str {
            "echo"
        }

        async fn complete(&self, request: CompletionRequest) -> Result<String, GenerationError> {
            Ok(request.prompt)
        }
    }

    #[test]
    fn generation_config_defaults() {
        let config = GenerationConfig::default();
        assert!((config.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(config.top_k, 40);
        assert_eq!(config.max_output_tokens, 2048);
    }

    #[test]
    fn completion_request_serializes_camel_case() {
        let req = CompletionRequest {
            model: "gemini-2.0-flash".into(),
            prompt: "hello".into(),
            system_instruction: None,
            config: GenerationConfig::default(),
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("maxOutputTokens"));
        assert!(json.contains("topK"));
        assert!(!json.contains("systemInstruction"));
    }

    #[tokio::test]
    async fn default_stream_yields_single_chunk() {
        let req = CompletionRequest {
            model: "m".into(),
            prompt: "one chunk".into(),
            system_instruction: None,
            config: GenerationConfig::default(),
        };
        let mut rx = EchoProvider.stream(req).await.unwrap();
        assert_eq!(rx.recv().await.unwrap().unwrap(), "one chunk");
        assert!(rx.recv().await.is_none());
    }
}
