//! Extracting a JSON payload from model output.
//!
//! Models often wrap JSON in Markdown fences or surround it with prose.
//! Precedence: fenced block, then bare JSON, then the outermost `{...}` span.

use careerswarm_core::error::GenerationError;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Locate the JSON payload inside `text`, if there is one.
pub fn extract_json_payload(text: &str) -> Option<&str> {
    if let Some(body) = fenced_block(text) {
        return Some(body);
    }

    let trimmed = text.trim();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return Some(trimmed);
    }

    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    (end > start).then(|| &trimmed[start..=end])
}

/// Parse the payload of `text` into `T`.
///
/// Fails with `InvalidJson` when no payload is found, when it does not
/// parse, when it is `null` or an empty object, or when it does not match `T`.
pub fn parse_json_payload<T: DeserializeOwned>(text: &str) -> Result<T, GenerationError> {
    let payload = extract_json_payload(text)
        .ok_or_else(|| GenerationError::InvalidJson("no JSON payload in response".into()))?;

    let value: Value = serde_json::from_str(payload)
        .map_err(|e| GenerationError::InvalidJson(format!("{e}: {}", preview(payload))))?;

    match &value {
        Value::Null => return Err(GenerationError::InvalidJson("payload is null".into())),
        Value::Object(map) if map.is_empty() => {
            return Err(GenerationError::InvalidJson("payload is an empty object".into()));
        }
        _ => {}
    }

    serde_json::from_value(value).map_err(|e| GenerationError::InvalidJson(e.to_string()))
}

/// Contents of the first Markdown code fence. A missing closing fence is
/// tolerated so truncated responses still parse as far as they go.
fn fenced_block(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let after = &text[start + 3..];

    let body = match after.find('\n') {
        Some(nl) if is_language_tag(&after[..nl]) => &after[nl + 1..],
        _ => after,
    };
    let body = match body.find("```") {
        Some(end) => &body[..end],
        None => body,
    };

    let body = body.trim();
    (!body.is_empty()).then_some(body)
}

fn is_language_tag(line: &str) -> bool {
    line.trim()
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn preview(payload: &str) -> String {
    let mut end = payload.len().min(80);
    while !payload.is_char_boundary(end) {
        end -= 1;
    }
    payload[..end].to_string()
}
