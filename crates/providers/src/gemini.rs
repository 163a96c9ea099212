//! Gemini-style `generateContent` provider.
//!
//! Supports:
//! - Complete responses via `models/{model}:generateContent`
//! - Streaming responses via `models/{model}:streamGenerateContent?alt=sse`
//! - Health checks via `models`
//!
//! Status mapping: 401/403 mean the credentials are wrong and surface as
//! `NotConfigured` (fatal for a swarm run); every other non-200 status is a
//! `Network` error carrying the status, which the retry policy classifies.

use async_trait::async_trait;
use careerswarm_core::error::GenerationError;
use careerswarm_core::provider::{ChunkReceiver, CompletionProvider, CompletionRequest, GenerationConfig};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, trace, warn};

/// A provider speaking the Gemini REST dialect.
pub struct GeminiProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl GeminiProvider {
    /// Create a new provider. An empty `api_key` yields a provider whose
    /// calls fail with `NotConfigured` without touching the network.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();

        Self {
            name: "gemini".into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        }
    }

    fn ensure_configured(&self) -> Result<(), GenerationError> {
        if self.api_key.trim().is_empty() {
            return Err(GenerationError::NotConfigured(
                "no API key set; export CAREERSWARM_API_KEY or GEMINI_API_KEY".into(),
            ));
        }
        Ok(())
    }

    fn endpoint(&self, model: &str, method: &str) -> String {
        format!("{}/models/{}:{}", self.base_url, model, method)
    }

    /// Convert our request to the wire format.
    fn to_api_request(request: &CompletionRequest) -> ApiRequest<'_> {
        ApiRequest {
            contents: vec![ApiContent {
                role: Some("user"),
                parts: vec![ApiPart {
                    text: &request.prompt,
                }],
            }],
            generation_config: &request.config,
            system_instruction: request.system_instruction.as_deref().map(|text| ApiContent {
                role: None,
                parts: vec![ApiPart { text }],
            }),
        }
    }

    async fn post(
        &self,
        url: &str,
        request: &CompletionRequest,
    ) -> Result<reqwest::Response, GenerationError> {
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&Self::to_api_request(request))
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status().as_u16();
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Generative endpoint returned error");
            return Err(map_status(status, error_body));
        }

        Ok(response)
    }
}

#[async_trait]
impl CompletionProvider for GeminiProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String, GenerationError> {
        self.ensure_configured()?;
        let url = self.endpoint(&request.model, "generateContent");

        debug!(provider = %self.name, model = %request.model, "Sending completion request");

        let response = self.post(&url, &request).await?;
        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::transport(format!("Failed to parse response: {e}")))?;

        let text = api_response.text();
        if text.trim().is_empty() {
            return Err(GenerationError::EmptyResponse);
        }
        Ok(text)
    }

    async fn stream(&self, request: CompletionRequest) -> Result<ChunkReceiver, GenerationError> {
        self.ensure_configured()?;
        let url = format!(
            "{}?alt=sse",
            self.endpoint(&request.model, "streamGenerateContent")
        );

        debug!(provider = %self.name, model = %request.model, "Sending streaming request");

        let response = self.post(&url, &request).await?;
        let (tx, rx) = tokio::sync::mpsc::channel(64);

        // Spawn task to read the SSE byte stream and forward text chunks
        tokio::spawn(async move {
            let mut byte_stream = response.bytes_stream();
            let mut decoder = SseDecoder::default();

            while let Some(chunk_result) = byte_stream.next().await {
                let bytes = match chunk_result {
                    Ok(b) => b,
                    Err(e) => {
                        let _ = tx.send(Err(map_transport_error(e))).await;
                        return;
                    }
                };

                for data in decoder.push(&bytes) {
                    match serde_json::from_str::<ApiResponse>(&data) {
                        Ok(event) => {
                            let text = event.text();
                            if !text.is_empty() && tx.send(Ok(text)).await.is_err() {
                                // Receiver dropped; stop reading.
                                return;
                            }
                        }
                        Err(e) => trace!(error = %e, "Skipping unparseable stream event"),
                    }
                }
            }
        });

        Ok(rx)
    }

    async fn health_check(&self) -> Result<bool, GenerationError> {
        self.ensure_configured()?;
        let url = format!("{}/models", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await
            .map_err(map_transport_error)?;

        Ok(response.status().is_success())
    }
}

fn map_transport_error(e: reqwest::Error) -> GenerationError {
    if e.is_timeout() {
        GenerationError::Timeout(e.to_string())
    } else {
        GenerationError::transport(e.to_string())
    }
}

fn map_status(status: u16, body: String) -> GenerationError {
    match status {
        401 | 403 => GenerationError::NotConfigured(format!(
            "credentials rejected by the endpoint (status {status})"
        )),
        _ => GenerationError::status(status, body),
    }
}

/// Splits an SSE byte stream into `data:` payloads.
///
/// Bytes are buffered until a full line arrives, so a multi-byte character
/// split across network chunks decodes intact.
#[derive(Default)]
struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    /// Feed more bytes; returns the payloads of every complete `data:` line.
    fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);
        let mut payloads = Vec::new();

        while let Some(line_end) = self.buffer.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=line_end).collect();
            let line = String::from_utf8_lossy(&raw[..line_end]);
            let line = line.trim_end_matches('\r');

            // Skip empty lines and SSE comments
            if line.is_empty() || line.starts_with(':') {
                continue;
            }

            if let Some(data) = line.strip_prefix("data:") {
                let data = data.trim();
                if !data.is_empty() && data != "[DONE]" {
                    payloads.push(data.to_string());
                }
            }
        }

        payloads
    }
}

// --- Wire types ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiRequest<'a> {
    contents: Vec<ApiContent<'a>>,
    generation_config: &'a GenerationConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<ApiContent<'a>>,
}

#[derive(Serialize)]
struct ApiContent<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<ApiPart<'a>>,
}

#[derive(Serialize)]
struct ApiPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct ApiResponse {
    #[serde(default)]
    candidates: Vec<ApiCandidate>,
}

#[derive(Deserialize)]
struct ApiCandidate {
    #[serde(default)]
    content: Option<ApiResponseContent>,
}

#[derive(Deserialize)]
struct ApiResponseContent {
    #[serde(default)]
    parts: Vec<ApiResponsePart>,
}

#[derive(Deserialize)]
struct ApiResponsePart {
    #[serde(default)]
    text: Option<String>,
}

impl ApiResponse {
    /// Concatenated text of the first candidate.
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(system: Option<&str>) -> CompletionRequest {
        CompletionRequest {
            model: "gemini-2.0-flash".into(),
            prompt: "Plan my week".into(),
            system_instruction: system.map(String::from),
            config: GenerationConfig::default(),
        }
    }

    #[test]
    fn request_body_shape() {
        let req = request(Some("You are a planner"));
        let body = serde_json::to_value(GeminiProvider::to_api_request(&req)).unwrap();

        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "Plan my week");
        assert_eq!(body["generationConfig"]["topK"], 40);
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 2048);
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "You are a planner");
        assert!(body["systemInstruction"].get("role").is_none());
    }

    #[test]
    fn request_body_omits_missing_system_instruction() {
        let req = request(None);
        let body = serde_json::to_value(GeminiProvider::to_api_request(&req)).unwrap();
        assert!(body.get("systemInstruction").is_none());
    }

    #[test]
    fn response_text_joins_parts_of_first_candidate() {
        let resp: ApiResponse = serde_json::from_str(
            r#"{"candidates":[
                {"content":{"parts":[{"text":"Hello, "},{"text":"world"}],"role":"model"}},
                {"content":{"parts":[{"text":"ignored"}]}}
            ]}"#,
        )
        .unwrap();
        assert_eq!(resp.text(), "Hello, world");

        let blocked: ApiResponse =
            serde_json::from_str(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#).unwrap();
        assert_eq!(blocked.text(), "");
    }

    #[test]
    fn status_mapping() {
        assert!(matches!(map_status(401, String::new()), GenerationError::NotConfigured(_)));
        assert!(matches!(map_status(403, String::new()), GenerationError::NotConfigured(_)));

        let err = map_status(400, "bad".into());
        assert!(err.is_client_error());

        let err = map_status(503, "overloaded".into());
        assert!(!err.is_client_error());
        assert_eq!(err, GenerationError::status(503, "overloaded"));
    }

    #[test]
    fn sse_decoder_handles_split_lines() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push(b"data: {\"a\"").is_empty());
        let payloads = decoder.push(b":1}\r\n\n: keep-alive\ndata: {\"b\":2}\n");
        assert_eq!(payloads, vec!["{\"a\":1}".to_string(), "{\"b\":2}".to_string()]);
    }

    #[test]
    fn sse_decoder_keeps_multibyte_chars_split_across_chunks() {
        let event = "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"• Apply\"}]}}]}\n";
        let bytes = event.as_bytes();
        let bullet = event.find('•').unwrap();

        let mut decoder = SseDecoder::default();
        assert!(decoder.push(&bytes[..bullet + 1]).is_empty());
        let payloads = decoder.push(&bytes[bullet + 1..]);

        assert_eq!(payloads.len(), 1);
        let response: ApiResponse = serde_json::from_str(&payloads[0]).unwrap();
        assert_eq!(response.text(), "• Apply");
    }

    #[tokio::test]
    async fn missing_key_is_not_configured() {
        let provider = GeminiProvider::new("http://127.0.0.1:9", "", Duration::from_secs(1));
        let err = provider.complete(request(None)).await.unwrap_err();
        assert!(matches!(err, GenerationError::NotConfigured(_)));
        assert!(err.is_fatal());

        let err = provider.stream(request(None)).await.unwrap_err();
        assert!(matches!(err, GenerationError::NotConfigured(_)));
    }

    #[test]
    fn endpoint_urls() {
        let provider = GeminiProvider::new(
            "https://generativelanguage.googleapis.com/v1beta/",
            "k",
            Duration::from_secs(1),
        );
        assert_eq!(
            provider.endpoint("gemini-2.0-flash", "generateContent"),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }
}
