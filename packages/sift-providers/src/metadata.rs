//! Field-by-field decoding of extractor output into [`ChunkMetadata`].
//!
//! Every field is decoded on its own. A field that is missing or has the wrong shape is treated
//! as not extracted; it never invalidates the rest of the record. Items inside list fields are
//! likewise dropped one at a time.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use time::{
	Date, Month, OffsetDateTime, PrimitiveDateTime, format_description::well_known::Rfc3339,
	macros::format_description,
};

use sift_domain::{
	ChunkMetadata, EntityLabel, ExtractedDate, ExtractedEntity, ExtractedKeyword, SentimentInfo,
	SentimentLabel, TopicInfo,
};

/// Confidence assumed for an extracted item that arrives without one.
pub const DEFAULT_CONFIDENCE: f32 = 0.5;

pub fn decode_metadata(value: &Value, chunk_id: &str, text: &str) -> ChunkMetadata {
	let mut metadata = ChunkMetadata::empty(chunk_id, text);
	let Some(object) = value.as_object() else { return metadata };

	metadata.keywords = decode_list(object, &["keywords"], decode_keyword);
	metadata.entities = decode_list(object, &["entities"], decode_entity);
	metadata.dates = decode_list(object, &["dates"], decode_date);
	metadata.topics = decode_list(object, &["topics"], decode_topic);
	metadata.sentiment = object.get("sentiment").and_then(decode_sentiment);
	metadata.summary = string_field(object, &["summary"]);
	metadata.key_phrases = decode_list(object, &["key_phrases", "keyphrases"], |item| {
		item.as_str().map(str::trim).filter(|phrase| !phrase.is_empty()).map(str::to_string)
	});
	metadata.language = string_field(object, &["language", "lang"]).or_else(|| detect_language(text));
	metadata.readability_score = unit_field(object, &["readability_score", "readability"]);
	metadata.information_density = unit_field(object, &["information_density", "density"]);

	metadata
}

/// Language of `text` as an ISO 639-3 code, when detection is reliable.
pub fn detect_language(text: &str) -> Option<String> {
	let info = whatlang::detect(text)?;

	info.is_reliable().then(|| info.lang().code().to_string())
}

pub fn parse_date(raw: &str) -> Option<OffsetDateTime> {
	let raw = raw.trim();

	if let Ok(value) = OffsetDateTime::parse(raw, &Rfc3339) {
		return Some(value);
	}
	if let Ok(value) =
		PrimitiveDateTime::parse(raw, format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"))
	{
		return Some(value.assume_utc());
	}
	if let Ok(value) = Date::parse(raw, format_description!("[year]-[month]-[day]")) {
		return Some(value.midnight().assume_utc());
	}

	let mut parts = raw.splitn(2, '-');
	let year_raw = parts.next()?;

	if year_raw.len() != 4 || !year_raw.bytes().all(|b| b.is_ascii_digit()) {
		return None;
	}

	let year: i32 = year_raw.parse().ok()?;
	let month = match parts.next() {
		Some(month_raw) => Month::try_from(month_raw.parse::<u8>().ok()?).ok()?,
		None => Month::January,
	};

	Date::from_calendar_date(year, month, 1).ok().map(|date| date.midnight().assume_utc())
}

fn decode_list<T>(
	object: &Map<String, Value>,
	keys: &[&str],
	decode: impl Fn(&Value) -> Option<T>,
) -> Vec<T> {
	let Some(items) = keys.iter().find_map(|key| object.get(*key)).and_then(Value::as_array) else {
		return Vec::new();
	};

	items.iter().filter_map(decode).collect()
}

fn decode_keyword(item: &Value) -> Option<ExtractedKeyword> {
	if let Some(term) = item.as_str() {
		let term = term.trim();

		return (!term.is_empty()).then(|| ExtractedKeyword {
			term: term.to_string(),
			score: DEFAULT_CONFIDENCE,
			frequency: 1,
			context: None,
		});
	}

	let object = item.as_object()?;
	let term = string_field(object, &["term", "keyword", "text"])?;
	let frequency = number_field(object, &["frequency", "count"])
		.filter(|value| *value >= 1.0)
		.map(|value| value.min(u32::MAX as f64) as u32)
		.unwrap_or(1);

	Some(ExtractedKeyword {
		term,
		score: unit_field(object, &["score", "relevance", "confidence"])
			.unwrap_or(DEFAULT_CONFIDENCE),
		frequency,
		context: string_field(object, &["context"]),
	})
}

fn decode_entity(item: &Value) -> Option<ExtractedEntity> {
	let object = item.as_object()?;
	let text = string_field(object, &["text", "name"])?;
	let label = string_field(object, &["label", "type", "entity_type"])
		.and_then(|raw| EntityLabel::parse(&raw))?;
	let start_pos = position_field(object, &["start_pos", "start"]);
	let end_pos = position_field(object, &["end_pos", "end"]);
	let (start_pos, end_pos) = match (start_pos, end_pos) {
		(Some(start), Some(end)) if end <= start => (None, None),
		positions => positions,
	};

	Some(ExtractedEntity {
		text,
		label,
		confidence: unit_field(object, &["confidence", "score"]).unwrap_or(DEFAULT_CONFIDENCE),
		start_pos,
		end_pos,
	})
}

fn decode_date(item: &Value) -> Option<ExtractedDate> {
	let object = item.as_object()?;
	let raw = string_field(object, &["date", "value", "normalized"])?;
	let date = parse_date(&raw)?;

	Some(ExtractedDate {
		date,
		text: string_field(object, &["text"]).unwrap_or(raw),
		confidence: unit_field(object, &["confidence", "score"]).unwrap_or(DEFAULT_CONFIDENCE),
		date_type: string_field(object, &["date_type", "type"])
			.unwrap_or_else(|| "mentioned".to_string()),
		format: string_field(object, &["format"]),
	})
}

fn decode_topic(item: &Value) -> Option<TopicInfo> {
	let object = item.as_object()?;
	let topic_words: Vec<String> =
		match ["topic_words", "words", "keywords"].iter().find_map(|key| object.get(*key)) {
			Some(Value::Array(words)) => words
				.iter()
				.filter_map(Value::as_str)
				.map(str::trim)
				.filter(|word| !word.is_empty())
				.map(str::to_string)
				.collect(),
			Some(Value::String(words)) => words
				.split(',')
				.map(str::trim)
				.filter(|word| !word.is_empty())
				.map(str::to_string)
				.collect(),
			_ => Vec::new(),
		};
	let topic_id = string_field(object, &["topic_id", "id", "name", "label"]).or_else(|| {
		(!topic_words.is_empty()).then(|| topic_words.join("_").to_lowercase())
	})?;

	Some(TopicInfo {
		topic_id,
		topic_words,
		probability: unit_field(object, &["probability", "score", "confidence"])
			.unwrap_or(DEFAULT_CONFIDENCE),
	})
}

fn decode_sentiment(item: &Value) -> Option<SentimentInfo> {
	if let Some(raw) = item.as_str() {
		return SentimentLabel::parse(raw).map(|sentiment| SentimentInfo {
			sentiment,
			confidence: DEFAULT_CONFIDENCE,
			scores: BTreeMap::new(),
		});
	}

	let object = item.as_object()?;
	let sentiment = string_field(object, &["sentiment", "label", "polarity"])
		.and_then(|raw| SentimentLabel::parse(&raw))?;
	let mut scores = BTreeMap::new();

	if let Some(raw_scores) = object.get("scores").and_then(Value::as_object) {
		for (label, value) in raw_scores {
			if let Some(score) = as_unit(value) {
				scores.insert(label.to_lowercase(), score);
			}
		}
	}

	Some(SentimentInfo {
		sentiment,
		confidence: unit_field(object, &["confidence", "score"]).unwrap_or(DEFAULT_CONFIDENCE),
		scores,
	})
}

fn string_field(object: &Map<String, Value>, keys: &[&str]) -> Option<String> {
	keys.iter()
		.filter_map(|key| object.get(*key))
		.filter_map(Value::as_str)
		.map(str::trim)
		.find(|value| !value.is_empty())
		.map(str::to_string)
}

fn number_field(object: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
	keys.iter().filter_map(|key| object.get(*key)).find_map(as_number)
}

fn unit_field(object: &Map<String, Value>, keys: &[&str]) -> Option<f32> {
	keys.iter().filter_map(|key| object.get(*key)).find_map(as_unit)
}

fn position_field(object: &Map<String, Value>, keys: &[&str]) -> Option<usize> {
	number_field(object, keys).filter(|value| *value >= 0.0).map(|value| value as usize)
}

fn as_number(value: &Value) -> Option<f64> {
	let number = match value {
		Value::Number(number) => number.as_f64()?,
		Value::String(raw) => raw.trim().parse::<f64>().ok()?,
		_ => return None,
	};

	number.is_finite().then_some(number)
}

fn as_unit(value: &Value) -> Option<f32> {
	as_number(value).map(|number| number.clamp(0.0, 1.0) as f32)
}
