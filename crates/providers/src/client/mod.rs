//! GenerativeClient: the resilient entry point for turning a prompt into
//! text or structured JSON.
//!
//! Wraps a [`CompletionProvider`] with:
//! - a TTL response cache keyed by model, full-prompt hash and options
//! - a fixed-window rate limiter checked before every network call
//! - retry with exponential backoff for server-class failures
//! - JSON payload extraction for structured responses
//! - token streaming (never cached, never retried)
//!
//! Each client owns its cache and limiter, so independent clients never
//! interfere with each other.

pub mod cache;
pub mod json;
pub mod rate_limit;
pub mod retry;

use careerswarm_config::AppConfig;
use careerswarm_core::error::GenerationError;
use careerswarm_core::provider::{CompletionProvider, CompletionRequest, GenerationConfig};
use serde::Serialize;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::time::{Duration, Instant};
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub use cache::{CacheEntry, ResponseCache};
pub use json::{extract_json_payload, parse_json_payload};
pub use rate_limit::RateLimiter;
pub use retry::{RetryPolicy, should_retry};

/// Stream of text chunks returned by [`GenerativeClient::generate_stream`].
pub type TextStream = ReceiverStream<Result<String, GenerationError>>;

/// Tunables for a [`GenerativeClient`].
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub model: String,
    /// Sampling defaults applied when a call does not override them
    pub defaults: GenerationConfig,
    /// Token budget for `generate_json` when the caller sets none
    pub json_max_output_tokens: u32,
    pub cache_ttl: Duration,
    pub sweep_probability: f64,
    pub max_requests: u32,
    pub rate_window: Duration,
    pub retry: RetryPolicy,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            model: "gemini-2.0-flash".into(),
            defaults: GenerationConfig::default(),
            json_max_output_tokens: 8192,
            cache_ttl: Duration::from_secs(600),
            sweep_probability: 0.1,
            max_requests: 60,
            rate_window: Duration::from_secs(60),
            retry: RetryPolicy::default(),
        }
    }
}

impl ClientSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        let generation = &config.generation;
        Self {
            model: generation.model.clone(),
            defaults: GenerationConfig {
                temperature: generation.temperature,
                top_k: generation.top_k,
                top_p: generation.top_p,
                max_output_tokens: generation.max_output_tokens,
            },
            json_max_output_tokens: generation.json_max_output_tokens,
            cache_ttl: Duration::from_secs(config.cache.ttl_secs),
            sweep_probability: config.cache.sweep_probability,
            max_requests: config.rate_limit.max_requests,
            rate_window: Duration::from_secs(config.rate_limit.window_secs),
            retry: RetryPolicy::from(&config.retry),
        }
    }
}

/// Per-call overrides. Anything left `None` falls back to the client defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationOptions {
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub top_k: Option<u32>,
    pub top_p: Option<f32>,
    pub max_output_tokens: Option<u32>,
    pub system_instruction: Option<String>,
    pub use_cache: bool,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            model: None,
            temperature: None,
            top_k: None,
            top_p: None,
            max_output_tokens: None,
            system_instruction: None,
            use_cache: true,
        }
    }
}

impl GenerationOptions {
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_output_tokens(mut self, tokens: u32) -> Self {
        self.max_output_tokens = Some(tokens);
        self
    }

    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    pub fn without_cache(mut self) -> Self {
        self.use_cache = false;
        self
    }
}

/// A fully resolved request. Built per call, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub prompt: String,
    pub model: String,
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub max_output_tokens: u32,
    pub use_cache: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<String>,
}

/// The option part of a cache key.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct KeyOptions<'a> {
    temperature: f32,
    top_k: u32,
    top_p: f32,
    max_output_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<&'a str>,
}

impl GenerationRequest {
    /// Deterministic key: model, SHA-256 of the full prompt, serialized options.
    pub fn cache_key(&self) -> String {
        let prompt_hash = hex::encode(Sha256::digest(self.prompt.as_bytes()));
        let options = serde_json::to_string(&KeyOptions {
            temperature: self.temperature,
            top_k: self.top_k,
            top_p: self.top_p,
            max_output_tokens: self.max_output_tokens,
            system_instruction: self.system_instruction.as_deref(),
        })
        .unwrap_or_default();
        format!("{}:{}:{}", self.model, prompt_hash, options)
    }

    pub fn to_completion(&self) -> CompletionRequest {
        CompletionRequest {
            model: self.model.clone(),
            prompt: self.prompt.clone(),
            system_instruction: self.system_instruction.clone(),
            config: GenerationConfig {
                temperature: self.temperature,
                top_k: self.top_k,
                top_p: self.top_p,
                max_output_tokens: self.max_output_tokens,
            },
        }
    }
}

/// Outcome of a generate call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationResult<T> {
    pub data: T,
    /// `true` when served from the cache without a network call
    pub cached: bool,
    pub duration: Duration,
}

/// Snapshot of client counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientStats {
    pub network_calls: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub retries: u64,
    pub rate_limited: u64,
    pub cache_size: usize,
}

#[derive(Default)]
struct Counters {
    network_calls: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    retries: AtomicU64,
    rate_limited: AtomicU64,
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

/// Resilient client over a completion provider.
pub struct GenerativeClient {
    provider: Arc<dyn CompletionProvider>,
    settings: ClientSettings,
    cache: ResponseCache<String>,
    limiter: RateLimiter,
    counters: Counters,
}

impl GenerativeClient {
    pub fn new(provider: Arc<dyn CompletionProvider>, settings: ClientSettings) -> Self {
        Self {
            cache: ResponseCache::new(settings.cache_ttl),
            limiter: RateLimiter::new(settings.max_requests, settings.rate_window),
            provider,
            settings,
            counters: Counters::default(),
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    /// Resolve per-call options against the client defaults.
    pub fn request(&self, prompt: &str, options: &GenerationOptions) -> GenerationRequest {
        let defaults = &self.settings.defaults;
        GenerationRequest {
            prompt: prompt.to_string(),
            model: options
                .model
                .clone()
                .unwrap_or_else(|| self.settings.model.clone()),
            temperature: options.temperature.unwrap_or(defaults.temperature),
            top_k: options.top_k.unwrap_or(defaults.top_k),
            top_p: options.top_p.unwrap_or(defaults.top_p),
            max_output_tokens: options.max_output_tokens.unwrap_or(defaults.max_output_tokens),
            use_cache: options.use_cache,
            system_instruction: options.system_instruction.clone(),
        }
    }

    pub async fn generate_text(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<GenerationResult<String>, GenerationError> {
        self.generate_text_with_cancel(prompt, options, &CancellationToken::new())
            .await
    }

    /// Like [`generate_text`](Self::generate_text), but aborts with
    /// `Cancelled` as soon as `cancel` fires, including mid-call and mid-backoff.
    pub async fn generate_text_with_cancel(
        &self,
        prompt: &str,
        options: &GenerationOptions,
        cancel: &CancellationToken,
    ) -> Result<GenerationResult<String>, GenerationError> {
        let request = self.request(prompt, options);
        self.execute(&request, cancel).await
    }

    pub async fn generate_json<T: DeserializeOwned>(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<GenerationResult<T>, GenerationError> {
        self.generate_json_with_cancel(prompt, options, &CancellationToken::new())
            .await
    }

    /// Generate and parse a JSON payload.
    ///
    /// Uses the larger JSON token budget unless the caller sets one. A cached
    /// response that fails to parse is evicted so the next call refetches.
    pub async fn generate_json_with_cancel<T: DeserializeOwned>(
        &self,
        prompt: &str,
        options: &GenerationOptions,
        cancel: &CancellationToken,
    ) -> Result<GenerationResult<T>, GenerationError> {
        let mut request = self.request(prompt, options);
        if options.max_output_tokens.is_none() {
            request.max_output_tokens = self.settings.json_max_output_tokens;
        }

        let result = self.execute(&request, cancel).await?;
        match parse_json_payload::<T>(&result.data) {
            Ok(data) => Ok(GenerationResult {
                data,
                cached: result.cached,
                duration: result.duration,
            }),
            Err(e) => {
                if request.use_cache {
                    self.cache.remove(&request.cache_key());
                }
                warn!(model = %request.model, error = %e, "Discarding unparseable JSON response");
                Err(e)
            }
        }
    }

    /// Stream text chunks as they arrive. Streaming bypasses the cache and
    /// the retry policy but still counts against the rate limit.
    pub async fn generate_stream(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<TextStream, GenerationError> {
        let request = self.request(prompt, options);
        self.acquire_slot()?;
        bump(&self.counters.network_calls);
        debug!(model = %request.model, "Opening completion stream");

        let receiver = self.provider.stream(request.to_completion()).await?;
        Ok(ReceiverStream::new(receiver))
    }

    pub fn stats(&self) -> ClientStats {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        ClientStats {
            network_calls: load(&self.counters.network_calls),
            cache_hits: load(&self.counters.cache_hits),
            cache_misses: load(&self.counters.cache_misses),
            retries: load(&self.counters.retries),
            rate_limited: load(&self.counters.rate_limited),
            cache_size: self.cache.len(),
        }
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    async fn execute(
        &self,
        request: &GenerationRequest,
        cancel: &CancellationToken,
    ) -> Result<GenerationResult<String>, GenerationError> {
        let started = Instant::now();
        self.maybe_sweep();

        let key = request.use_cache.then(|| request.cache_key());
        if let Some(key) = &key {
            if let Some(data) = self.cache.get(key) {
                bump(&self.counters.cache_hits);
                debug!(model = %request.model, "Cache hit");
                return Ok(GenerationResult {
                    data,
                    cached: true,
                    duration: started.elapsed(),
                });
            }
            bump(&self.counters.cache_misses);
            debug!(model = %request.model, "Cache miss");
        }

        let data = self.complete_with_retry(request, cancel).await?;
        if let Some(key) = key {
            self.cache.insert(key, data.clone());
        }

        Ok(GenerationResult {
            data,
            cached: false,
            duration: started.elapsed(),
        })
    }

    async fn complete_with_retry(
        &self,
        request: &GenerationRequest,
        cancel: &CancellationToken,
    ) -> Result<String, GenerationError> {
        let policy = self.settings.retry;
        let mut attempt = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(GenerationError::Cancelled);
            }
            self.acquire_slot()?;
            bump(&self.counters.network_calls);

            let outcome = tokio::select! {
                _ = cancel.cancelled() => return Err(GenerationError::Cancelled),
                result = self.provider.complete(request.to_completion()) => result,
            };

            let error = match outcome {
                Ok(text) if text.trim().is_empty() => GenerationError::EmptyResponse,
                Ok(text) => return Ok(text),
                Err(e) => e,
            };

            if !policy.should_retry(&error, attempt) {
                return Err(error);
            }

            let delay = policy.delay_for(attempt);
            bump(&self.counters.retries);
            warn!(
                model = %request.model,
                attempt = attempt + 1,
                max_attempts = policy.max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Completion failed, retrying"
            );

            tokio::select! {
                _ = cancel.cancelled() => return Err(GenerationError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
            attempt += 1;
        }
    }

    fn acquire_slot(&self) -> Result<(), GenerationError> {
        self.limiter.try_acquire().inspect_err(|e| {
            bump(&self.counters.rate_limited);
            warn!(
                used = self.limiter.used(),
                limit = self.limiter.max_requests(),
                error = %e,
                "Outbound request rejected"
            );
        })
    }

    fn maybe_sweep(&self) {
        if self.settings.sweep_probability > 0.0
            && rand::random::<f64>() < self.settings.sweep_probability
        {
            let removed = self.cache.sweep();
            if removed > 0 {
                debug!(removed, "Swept stale cache entries");
            }
        }
    }
}
