//! Reasoning-trace handling and lenient JSON extraction for model output.

use crate::types::{AppError, Result};
use regex::Regex;
use serde::de::DeserializeOwned;
use std::sync::LazyLock;

pub const REASONING_OPEN: &str = "<think>";
pub const REASONING_CLOSE: &str = "</think>";

static FENCED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:json|JSON)?\s*(.*?)\s*```").expect("fenced block pattern is valid")
});

/// Text after the last closing reasoning delimiter, or `None` when the model
/// produced no reasoning trace.
pub fn payload_after_reasoning(text: &str) -> Option<&str> {
    text.rfind(REASONING_CLOSE)
        .map(|end| text[end + REASONING_CLOSE.len()..].trim())
}

/// Structured-stage payload extraction.
///
/// With `require_trace` a missing `</think>` is a parse failure for the
/// caller; otherwise reasoning blocks are stripped leniently.
pub fn structured_payload(text: &str, require_trace: bool) -> Option<String> {
    if require_trace {
        payload_after_reasoning(text).map(str::to_string)
    } else {
        Some(strip_reasoning(text))
    }
}

/// Remove every `<think>...</think>` block, plus anything before a stray
/// closing delimiter.
pub fn strip_reasoning(text: &str) -> String {
    let mut out = text.to_string();

    while let Some(start) = out.find(REASONING_OPEN) {
        match out[start..].find(REASONING_CLOSE) {
            Some(rel) => out.replace_range(start..start + rel + REASONING_CLOSE.len(), ""),
            None => break,
        }
    }

    if let Some(end) = out.rfind(REASONING_CLOSE) {
        out.drain(..end + REASONING_CLOSE.len());
    }

    out.trim().to_string()
}

/// Parse JSON that may be wrapped in a markdown fence or surrounded by prose.
pub fn parse_json_markdown<T: DeserializeOwned>(text: &str) -> Result<T> {
    let trimmed = text.trim();
    let body = FENCED_BLOCK
        .captures(trimmed)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(trimmed);

    match serde_json::from_str(body) {
        Ok(value) => Ok(value),
        Err(first) => {
            let start = body.find(|c| c == '{' || c == '[');
            let end = body.rfind(|c| c == '}' || c == ']');
            match (start, end) {
                (Some(s), Some(e)) if e > s => serde_json::from_str(&body[s..=e])
                    .map_err(|e| AppError::Parse(format!("invalid JSON payload: {}", e))),
                _ => Err(AppError::Parse(format!("no JSON in payload: {}", first))),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Score {
        score: String,
    }

    #[test]
    fn test_payload_after_reasoning() {
        let text = "<think>weighing it up</think>\n{\"score\": \"no\"}";
        assert_eq!(payload_after_reasoning(text), Some("{\"score\": \"no\"}"));
        assert_eq!(payload_after_reasoning("{\"score\": \"no\"}"), None);
    }

    #[test]
    fn test_payload_uses_last_delimiter() {
        let text = "<think>a</think>noise<think>b</think> final";
        assert_eq!(payload_after_reasoning(text), Some("final"));
    }

    #[test]
    fn test_structured_payload_lenient_mode() {
        assert_eq!(structured_payload("plain", false).as_deref(), Some("plain"));
        assert_eq!(structured_payload("plain", true), None);
    }

    #[test]
    fn test_strip_reasoning() {
        assert_eq!(
            strip_reasoning("<think>x</think>Intro text <think>y</think>more"),
            "Intro text more"
        );
        assert_eq!(strip_reasoning("half a trace</think>\nBody"), "Body");
        assert_eq!(strip_reasoning("no trace here"), "no trace here");
        assert_eq!(strip_reasoning("<think>unterminated"), "<think>unterminated");
    }

    #[test]
    fn test_parse_fenced_json() {
        let text = "```json\n{\"score\": \"yes\"}\n```";
        let parsed: Score = parse_json_markdown(text).unwrap();
        assert_eq!(parsed.score, "yes");
    }

    #[test]
    fn test_parse_json_with_surrounding_prose() {
        let text = "Here you go: [{\"score\": \"no\"}] hope that helps";
        let parsed: Vec<Score> = parse_json_markdown(text).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].score, "no");
    }

    #[test]
    fn test_parse_json_failure() {
        let result: Result<Score> = parse_json_markdown("no json at all");
        assert!(matches!(result, Err(AppError::Parse(_))));
    }
}
