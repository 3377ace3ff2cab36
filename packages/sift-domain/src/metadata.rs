use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExtractedKeyword {
	pub term: String,
	pub score: f32,
	pub frequency: u32,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub context: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityLabel {
	Person,
	Organization,
	Location,
	Date,
	Money,
	Percent,
	Product,
	Event,
	Misc,
}
impl EntityLabel {
	pub const ALL: [Self; 9] = [
		Self::Person,
		Self::Organization,
		Self::Location,
		Self::Date,
		Self::Money,
		Self::Percent,
		Self::Product,
		Self::Event,
		Self::Misc,
	];

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Person => "person",
			Self::Organization => "organization",
			Self::Location => "location",
			Self::Date => "date",
			Self::Money => "money",
			Self::Percent => "percent",
			Self::Product => "product",
			Self::Event => "event",
			Self::Misc => "misc",
		}
	}

	/// Parses a label case-insensitively, accepting the short forms common NER taggers emit.
	pub fn parse(raw: &str) -> Option<Self> {
		let label = match raw.trim().to_ascii_lowercase().as_str() {
			"person" | "per" | "people" => Self::Person,
			"organization" | "organisation" | "org" | "company" => Self::Organization,
			"location" | "loc" | "gpe" | "place" | "fac" | "facility" => Self::Location,
			"date" | "time" => Self::Date,
			"money" | "currency" => Self::Money,
			"percent" | "percentage" => Self::Percent,
			"product" | "work_of_art" => Self::Product,
			"event" => Self::Event,
			"misc" | "miscellaneous" | "norp" | "law" | "language" | "other" => Self::Misc,
			_ => return None,
		};

		Some(label)
	}
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExtractedEntity {
	pub text: String,
	pub label: EntityLabel,
	pub confidence: f32,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub start_pos: Option<usize>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub end_pos: Option<usize>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExtractedDate {
	#[serde(with = "crate::time_serde")]
	pub date: OffsetDateTime,
	pub text: String,
	pub confidence: f32,
	pub date_type: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub format: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TopicInfo {
	pub topic_id: String,
	pub topic_words: Vec<String>,
	pub probability: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentLabel {
	Positive,
	Negative,
	Neutral,
	Mixed,
}
impl SentimentLabel {
	pub fn parse(raw: &str) -> Option<Self> {
		match raw.trim().to_ascii_lowercase().as_str() {
			"positive" | "pos" => Some(Self::Positive),
			"negative" | "neg" => Some(Self::Negative),
			"neutral" => Some(Self::Neutral),
			"mixed" => Some(Self::Mixed),
			_ => None,
		}
	}
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SentimentInfo {
	pub sentiment: SentimentLabel,
	pub confidence: f32,
	#[serde(default)]
	pub scores: BTreeMap<String, f32>,
}

/// Structured signals extracted from one chunk or query.
///
/// Built once by the extraction pipeline and never mutated afterwards. `end_pos > start_pos`
/// holds for every chunk with non-empty text.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
	pub chunk_id: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub document_id: Option<String>,
	#[serde(default)]
	pub chunk_index: u32,
	pub text_length: usize,
	pub start_pos: usize,
	pub end_pos: usize,
	#[serde(default)]
	pub keywords: Vec<ExtractedKeyword>,
	#[serde(default)]
	pub entities: Vec<ExtractedEntity>,
	#[serde(default)]
	pub dates: Vec<ExtractedDate>,
	#[serde(default)]
	pub topics: Vec<TopicInfo>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub sentiment: Option<SentimentInfo>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub language: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub summary: Option<String>,
	#[serde(default)]
	pub key_phrases: Vec<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub readability_score: Option<f32>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub information_density: Option<f32>,
	#[serde(with = "crate::time_serde")]
	pub extraction_timestamp: OffsetDateTime,
	/// Wall-clock extraction time in milliseconds.
	#[serde(default)]
	pub processing_time_ms: f64,
}
impl ChunkMetadata {
	/// Metadata carrying no signals, used when extraction is skipped or fails.
	pub fn empty(chunk_id: impl Into<String>, text: &str) -> Self {
		let text_length = text.chars().count();

		Self {
			chunk_id: chunk_id.into(),
			document_id: None,
			chunk_index: 0,
			text_length,
			start_pos: 0,
			end_pos: text_length,
			keywords: Vec::new(),
			entities: Vec::new(),
			dates: Vec::new(),
			topics: Vec::new(),
			sentiment: None,
			language: None,
			summary: None,
			key_phrases: Vec::new(),
			readability_score: None,
			information_density: None,
			extraction_timestamp: OffsetDateTime::now_utc(),
			processing_time_ms: 0.0,
		}
	}

	/// Points shared metadata at another chunk, recomputing the span from that chunk's own text.
	pub fn rebind(&mut self, chunk_id: impl Into<String>, text: &str) {
		self.chunk_id = chunk_id.into();
		self.text_length = text.chars().count();
		self.end_pos = self.start_pos + self.text_length;
	}

	/// True when at least one quality signal was extracted.
	pub fn has_quality_signals(&self) -> bool {
		self.readability_score.is_some()
			|| self.information_density.is_some()
			|| self.summary.as_deref().is_some_and(|summary| !summary.trim().is_empty())
			|| !self.keywords.is_empty()
			|| !self.entities.is_empty()
	}

	/// Keywords keyed by case-folded term; a later duplicate replaces an earlier one.
	pub fn keyword_map(&self) -> HashMap<String, &ExtractedKeyword> {
		let mut out = HashMap::with_capacity(self.keywords.len());

		for keyword in &self.keywords {
			let term = keyword.term.trim().to_lowercase();

			if term.is_empty() {
				continue;
			}

			out.insert(term, keyword);
		}

		out
	}

	/// Entities keyed by case-folded text; a later duplicate replaces an earlier one.
	pub fn entity_map(&self) -> HashMap<String, &ExtractedEntity> {
		let mut out = HashMap::with_capacity(self.entities.len());

		for entity in &self.entities {
			let text = entity.text.trim().to_lowercase();

			if text.is_empty() {
				continue;
			}

			out.insert(text, entity);
		}

		out
	}

	/// Mean confidence across keywords (their score) and entities.
	pub fn mean_confidence(&self) -> Option<f32> {
		let count = self.keywords.len() + self.entities.len();

		if count == 0 {
			return None;
		}

		let total: f32 = self.keywords.iter().map(|keyword| keyword.score).sum::<f32>()
			+ self.entities.iter().map(|entity| entity.confidence).sum::<f32>();

		Some(total / count as f32)
	}

	pub fn most_recent_date(&self) -> Option<OffsetDateTime> {
		self.dates.iter().map(|date| date.date).max()
	}
}
