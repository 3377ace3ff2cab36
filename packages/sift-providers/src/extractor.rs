use std::time::Duration;

use regex::Regex;
use reqwest::{Client, header::HeaderMap};
use serde_json::Value;

use crate::{Error, Result};
use sift_config::LlmProviderConfig;
use sift_domain::{EntityLabel, text};

/// Longest input text, in characters, embedded into a single extraction prompt.
pub const MAX_PROMPT_TEXT_CHARS: usize = 8_000;

const CODE_FENCE_PATTERN: &str = r"(?s)^\s*```[A-Za-z]*\s*(.*?)\s*```\s*$";

/// HTTP client for an OpenAI-compatible chat completions endpoint, built once per provider
/// config and reused across calls.
#[derive(Clone, Debug)]
pub struct LlmClient {
	client: Client,
	url: String,
	headers: HeaderMap,
	model: String,
	temperature: f32,
}
impl LlmClient {
	pub fn new(cfg: &LlmProviderConfig) -> Result<Self> {
		let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
		let headers = crate::auth_headers(&cfg.api_key, &cfg.default_headers)?;

		Ok(Self {
			client,
			url: format!("{}{}", cfg.api_base, cfg.path),
			headers,
			model: cfg.model.clone(),
			temperature: cfg.temperature,
		})
	}

	/// Sends one completion request and returns the JSON object the model produced.
	///
	/// There is no retry loop here; callers decide whether a failed call is worth repeating.
	pub async fn extract(&self, messages: &[Value]) -> Result<Value> {
		let body = serde_json::json!({
			"model": self.model,
			"temperature": self.temperature,
			"messages": messages,
			"response_format": { "type": "json_object" },
		});
		let res = self.client.post(&self.url).headers(self.headers.clone()).json(&body).send().await?;
		let json: Value = res.error_for_status()?.json().await?;

		parse_extractor_json(json)
	}
}

pub fn build_messages(text: &str) -> Vec<Value> {
	let schema = response_schema();
	let schema_text = serde_json::to_string_pretty(&schema).unwrap_or_else(|_| schema.to_string());
	let system_prompt = format!(
		"You are a metadata extraction engine for a document retrieval system. \
Output must be valid JSON only and must match the provided schema. \
Entity labels must be one of {labels}. \
Sentiment must be one of positive, negative, neutral, mixed. \
Scores, confidences and probabilities are numbers between 0 and 1. \
Dates use ISO 8601. Omit anything you cannot extract instead of guessing. \
Do not add explanations or extra fields.",
		labels = entity_labels(", "),
	);
	let user_prompt = format!(
		"Return JSON matching this exact schema:\n{schema_text}\nText:\n{text}",
		text = text::truncate_chars(text, MAX_PROMPT_TEXT_CHARS),
	);

	vec![
		serde_json::json!({ "role": "system", "content": system_prompt }),
		serde_json::json!({ "role": "user", "content": user_prompt }),
	]
}

/// Pulls the extracted JSON object out of a chat completion, or accepts a bare object from
/// endpoints that answer with the payload directly.
pub fn parse_extractor_json(json: Value) -> Result<Value> {
	let Some(choices) = json.get("choices") else {
		return if json.is_object() {
			Ok(json)
		} else {
			Err(invalid_response("Extractor response is not a JSON object."))
		};
	};
	let content = choices
		.pointer("/0/message/content")
		.and_then(Value::as_str)
		.ok_or_else(|| invalid_response("Extractor response is missing JSON content."))?;
	let parsed: Value = serde_json::from_str(strip_code_fence(content))
		.map_err(|_| invalid_response("Extractor content is not valid JSON."))?;

	if parsed.is_object() {
		Ok(parsed)
	} else {
		Err(invalid_response("Extractor content is not a JSON object."))
	}
}

fn invalid_response(message: &str) -> Error {
	Error::InvalidResponse { message: message.to_string() }
}

fn entity_labels(separator: &str) -> String {
	EntityLabel::ALL.iter().map(|label| label.as_str()).collect::<Vec<_>>().join(separator)
}

fn strip_code_fence(content: &str) -> &str {
	Regex::new(CODE_FENCE_PATTERN)
		.ok()
		.and_then(|re| re.captures(content))
		.and_then(|caps| caps.get(1))
		.map(|inner| inner.as_str())
		.unwrap_or(content)
}

fn response_schema() -> Value {
	serde_json::json!({
		"keywords": [{ "term": "string", "score": 0.0, "frequency": 1, "context": "string|null" }],
		"entities": [{
			"text": "string",
			"label": entity_labels("|"),
			"confidence": 0.0,
			"start_pos": "integer|null",
			"end_pos": "integer|null"
		}],
		"dates": [{
			"date": "ISO 8601 date",
			"text": "string",
			"confidence": 0.0,
			"date_type": "string",
			"format": "string|null"
		}],
		"topics": [{ "topic_id": "string", "topic_words": ["string"], "probability": 0.0 }],
		"sentiment": {
			"sentiment": "positive|negative|neutral|mixed",
			"confidence": 0.0,
			"scores": { "positive": 0.0, "negative": 0.0, "neutral": 0.0 }
		},
		"summary": "string",
		"key_phrases": ["string"],
		"language": "ISO 639 code",
		"readability_score": 0.0,
		"information_density": 0.0
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_choice_content_json() {
		let json = serde_json::json!({
			"choices": [
				{ "message": { "content": "{\"keywords\": []}" } }
			]
		});
		let parsed = parse_extractor_json(json).expect("Failed to parse extractor JSON.");

		assert!(parsed.get("keywords").is_some());
	}

	#[test]
	fn strips_markdown_code_fence() {
		let json = serde_json::json!({
			"choices": [
				{ "message": { "content": "```json\n{\"summary\": \"ok\"}\n```" } }
			]
		});
		let parsed = parse_extractor_json(json).expect("Failed to parse extractor JSON.");

		assert_eq!(parsed["summary"], "ok");
	}

	#[test]
	fn rejects_non_json_content() {
		let json = serde_json::json!({
			"choices": [{ "message": { "content": "Sorry, I cannot help with that." } }]
		});
		let err = parse_extractor_json(json).expect_err("Expected an invalid response error.");

		assert!(matches!(err, Error::InvalidResponse { .. }));
	}

	#[test]
	fn rejects_array_content() {
		let json = serde_json::json!({
			"choices": [{ "message": { "content": "[1, 2]" } }]
		});

		assert!(parse_extractor_json(json).is_err());
	}

	#[test]
	fn missing_choice_content_is_rejected() {
		let json = serde_json::json!({ "choices": [] });
		let err = parse_extractor_json(json).expect_err("Expected an invalid response error.");

		assert!(matches!(err, Error::InvalidResponse { .. }));
	}

	#[test]
	fn accepts_bare_object_response() {
		let json = serde_json::json!({ "summary": "direct" });
		let parsed = parse_extractor_json(json).expect("Failed to parse extractor JSON.");

		assert_eq!(parsed["summary"], "direct");
	}

	#[test]
	fn prompt_embeds_text_and_schema() {
		let messages = build_messages("Quarterly revenue grew 12%.");
		let user = messages[1]["content"].as_str().expect("user content");

		assert_eq!(messages[0]["role"], "system");
		assert!(user.contains("Quarterly revenue grew 12%."));
		assert!(user.contains("information_density"));
		assert!(user.contains("person|organization|location"));
		assert!(messages[0]["content"].as_str().is_some_and(|system| system.contains("event, misc")));
	}

	#[test]
	fn prompt_truncates_long_text() {
		let long = "a".repeat(MAX_PROMPT_TEXT_CHARS + 50);
		let messages = build_messages(&long);
		let user = messages[1]["content"].as_str().expect("user content");

		assert!(!user.contains(&long));
		assert!(user.contains(&"a".repeat(MAX_PROMPT_TEXT_CHARS)));
	}
}
