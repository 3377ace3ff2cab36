use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub providers: Providers,
	#[serde(default)]
	pub reranker: RerankerConfig,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	#[serde(default = "default_log_level")]
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub llm_extractor: LlmProviderConfig,
}

#[derive(Clone, Debug, Deserialize)]
pub struct LlmProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub temperature: f32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

/// Scoring, matching and extraction settings for one reranker instance.
///
/// Weights need not sum to 1.0, but scores are only comparable across runs that share the same
/// weights.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct RerankerConfig {
	pub weights: RerankWeights,
	pub keyword: KeywordMatching,
	pub entity: EntityMatching,
	pub topic: TopicMatching,
	pub temporal: TemporalScoring,
	pub quality: QualityScoring,
	pub diversity: DiversityFiltering,
	pub extraction: ExtractionSettings,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct RerankWeights {
	pub semantic: f32,
	pub keyword: f32,
	pub entity: f32,
	pub topic: f32,
	pub temporal: f32,
	pub quality: f32,
}
impl RerankWeights {
	pub fn entries(&self) -> [(&'static str, f32); 6] {
		[
			("semantic", self.semantic),
			("keyword", self.keyword),
			("entity", self.entity),
			("topic", self.topic),
			("temporal", self.temporal),
			("quality", self.quality),
		]
	}
}
impl Default for RerankWeights {
	fn default() -> Self {
		Self { semantic: 0.4, keyword: 0.3, entity: 0.2, topic: 0.0, temporal: 0.1, quality: 0.0 }
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct KeywordMatching {
	pub exact_match_bonus: f32,
	pub semantic_match_bonus: f32,
	pub frequency_factor: f32,
	/// Character Jaccard similarity a non-exact keyword pair must exceed to count as a match.
	pub similarity_threshold: f32,
}
impl Default for KeywordMatching {
	fn default() -> Self {
		Self {
			exact_match_bonus: 1.0,
			semantic_match_bonus: 0.5,
			frequency_factor: 0.1,
			similarity_threshold: 0.7,
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct EntityMatching {
	pub exact_match_bonus: f32,
	pub type_weights: EntityTypeWeights,
}
impl Default for EntityMatching {
	fn default() -> Self {
		Self { exact_match_bonus: 1.0, type_weights: EntityTypeWeights::default() }
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct EntityTypeWeights {
	pub person: f32,
	pub organization: f32,
	pub location: f32,
	pub date: f32,
	pub money: f32,
	pub percent: f32,
	pub product: f32,
	pub event: f32,
	pub misc: f32,
}
impl EntityTypeWeights {
	pub fn entries(&self) -> [(&'static str, f32); 9] {
		[
			("person", self.person),
			("organization", self.organization),
			("location", self.location),
			("date", self.date),
			("money", self.money),
			("percent", self.percent),
			("product", self.product),
			("event", self.event),
			("misc", self.misc),
		]
	}
}
impl Default for EntityTypeWeights {
	fn default() -> Self {
		Self {
			person: 1.0,
			organization: 1.0,
			location: 0.8,
			date: 0.6,
			money: 0.7,
			percent: 0.6,
			product: 0.9,
			event: 0.8,
			misc: 0.5,
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct TopicMatching {
	pub overlap_bonus: f32,
	pub similarity_threshold: f32,
}
impl Default for TopicMatching {
	fn default() -> Self {
		Self { overlap_bonus: 1.0, similarity_threshold: 0.3 }
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct TemporalScoring {
	pub boost_recent: f32,
	pub penalty_old: f32,
	pub recency_decay_days: f32,
}
impl Default for TemporalScoring {
	fn default() -> Self {
		Self { boost_recent: 0.3, penalty_old: 0.3, recency_decay_days: 90.0 }
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct QualityScoring {
	pub readability_weight: f32,
	pub information_density_weight: f32,
	pub summary_quality_weight: f32,
	pub min_confidence_threshold: f32,
}
impl Default for QualityScoring {
	fn default() -> Self {
		Self {
			readability_weight: 0.3,
			information_density_weight: 0.3,
			summary_quality_weight: 0.2,
			min_confidence_threshold: 0.5,
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct DiversityFiltering {
	pub enabled: bool,
	/// The filter only runs when the candidate count exceeds this value.
	pub min_candidates: u32,
	/// Results accepted unconditionally from the top of the ranking.
	pub min_results: u32,
	pub max_results: u32,
	pub max_topic_overlap: f32,
	pub max_entity_overlap: f32,
	pub entities_per_result: u32,
}
impl Default for DiversityFiltering {
	fn default() -> Self {
		Self {
			enabled: true,
			min_candidates: 5,
			min_results: 3,
			max_results: 10,
			max_topic_overlap: 0.7,
			max_entity_overlap: 0.5,
			entities_per_result: 3,
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ExtractionSettings {
	pub max_concurrent_extractions: u32,
	pub enable_caching: bool,
	pub timeout_ms: u64,
	/// Derive query keywords from the raw query text when no query metadata is available.
	pub query_term_fallback: bool,
	pub max_query_terms: u32,
}
impl Default for ExtractionSettings {
	fn default() -> Self {
		Self {
			max_concurrent_extractions: 5,
			enable_caching: true,
			timeout_ms: 30_000,
			query_term_fallback: false,
			max_query_terms: 16,
		}
	}
}

fn default_log_level() -> String {
	"info".to_string()
}
