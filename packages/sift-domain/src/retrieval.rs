use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::metadata::ChunkMetadata;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreComponent {
	Semantic,
	Keyword,
	Entity,
	Topic,
	Temporal,
	Quality,
}
impl ScoreComponent {
	pub const ALL: [Self; 6] =
		[Self::Semantic, Self::Keyword, Self::Entity, Self::Topic, Self::Temporal, Self::Quality];

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Semantic => "semantic",
			Self::Keyword => "keyword",
			Self::Entity => "entity",
			Self::Topic => "topic",
			Self::Temporal => "temporal",
			Self::Quality => "quality",
		}
	}
}

/// One candidate chunk flowing through a rerank call.
///
/// `final_score` stays `None` until the chunk has been scored; unscored results must not be
/// compared by score.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetrievalResult {
	pub chunk_id: String,
	pub content: String,
	/// Upstream similarity score, already normalized to 0.0-1.0.
	pub base_score: f32,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub document_id: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub metadata: Option<ChunkMetadata>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub query_metadata: Option<ChunkMetadata>,
	#[serde(default)]
	pub final_score: Option<f32>,
	/// Weighted contribution of each component to `final_score`.
	#[serde(default)]
	pub score_breakdown: BTreeMap<ScoreComponent, f32>,
	#[serde(default)]
	pub explanation: Option<String>,
}
impl RetrievalResult {
	pub fn new(chunk_id: impl Into<String>, content: impl Into<String>, base_score: f32) -> Self {
		Self {
			chunk_id: chunk_id.into(),
			content: content.into(),
			base_score,
			document_id: None,
			metadata: None,
			query_metadata: None,
			final_score: None,
			score_breakdown: BTreeMap::new(),
			explanation: None,
		}
	}

	pub fn with_metadata(mut self, metadata: ChunkMetadata) -> Self {
		self.metadata = Some(metadata);

		self
	}

	pub fn is_scored(&self) -> bool {
		self.final_score.is_some()
	}
}
