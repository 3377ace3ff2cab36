//! Per-candidate scoring signals. Every raw component lies in 0.0-1.0 given a base score in that
//! range.

use std::collections::{BTreeMap, HashSet};

use time::OffsetDateTime;

use sift_config::{
	EntityMatching, EntityTypeWeights, KeywordMatching, QualityScoring, RerankerConfig,
	TemporalScoring, TopicMatching,
};
use sift_domain::{ChunkMetadata, EntityLabel, RetrievalResult, ScoreComponent, text};

/// Score used when a signal has nothing to compare.
pub const NEUTRAL_SCORE: f32 = 0.5;

const SUMMARY_TARGET_CHARS: f32 = 200.0;
const CONFIDENCE_BONUS_FACTOR: f32 = 0.3;
const RECENT_WINDOW_DAYS: i64 = 30;
const AGING_WINDOW_DAYS: i64 = 365;
const OLD_CONTENT_FLOOR: f32 = 0.1;

/// Raw (unweighted) component scores for one candidate.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ComponentScores {
	pub semantic: f32,
	pub keyword: f32,
	pub entity: f32,
	pub topic: f32,
	pub temporal: f32,
	pub quality: f32,
}
impl ComponentScores {
	pub fn get(&self, component: ScoreComponent) -> f32 {
		match component {
			ScoreComponent::Semantic => self.semantic,
			ScoreComponent::Keyword => self.keyword,
			ScoreComponent::Entity => self.entity,
			ScoreComponent::Topic => self.topic,
			ScoreComponent::Temporal => self.temporal,
			ScoreComponent::Quality => self.quality,
		}
	}
}

/// Applies the configured weights to raw component scores, with one reference time for every
/// candidate it scores.
pub struct SignalScorer<'a> {
	cfg: &'a RerankerConfig,
	now: OffsetDateTime,
}
impl<'a> SignalScorer<'a> {
	pub fn new(cfg: &'a RerankerConfig, now: OffsetDateTime) -> Self {
		Self { cfg, now }
	}

	pub fn component_scores(
		&self,
		query: Option<&ChunkMetadata>,
		result: &RetrievalResult,
	) -> ComponentScores {
		let chunk = result.metadata.as_ref();
		let (keyword, entity, topic) = match (query, chunk) {
			(Some(query), Some(chunk)) => (
				keyword_score(&self.cfg.keyword, query, chunk),
				entity_score(&self.cfg.entity, query, chunk),
				topic_score(&self.cfg.topic, query, chunk),
			),
			_ => (0.0, 0.0, 0.0),
		};

		ComponentScores {
			semantic: result.base_score,
			keyword,
			entity,
			topic,
			temporal: chunk
				.map(|chunk| temporal_score(&self.cfg.temporal, chunk, self.now))
				.unwrap_or(NEUTRAL_SCORE),
			quality: quality_score(&self.cfg.quality, chunk),
		}
	}

	/// Weighted contribution of each component, keyed by component.
	pub fn weighted(&self, scores: &ComponentScores) -> BTreeMap<ScoreComponent, f32> {
		ScoreComponent::ALL
			.iter()
			.map(|component| (*component, scores.get(*component) * self.weight(*component)))
			.collect()
	}

	pub fn weight(&self, component: ScoreComponent) -> f32 {
		let weights = &self.cfg.weights;

		match component {
			ScoreComponent::Semantic => weights.semantic,
			ScoreComponent::Keyword => weights.keyword,
			ScoreComponent::Entity => weights.entity,
			ScoreComponent::Topic => weights.topic,
			ScoreComponent::Temporal => weights.temporal,
			ScoreComponent::Quality => weights.quality,
		}
	}
}

pub fn keyword_score(cfg: &KeywordMatching, query: &ChunkMetadata, chunk: &ChunkMetadata) -> f32 {
	let chunk_keywords = chunk.keyword_map();
	let query_terms: Vec<String> = query
		.keywords
		.iter()
		.map(|keyword| keyword.term.trim().to_lowercase())
		.filter(|term| !term.is_empty())
		.collect();

	if query_terms.is_empty() || chunk_keywords.is_empty() {
		return 0.0;
	}

	let mut total = 0.0_f32;
	let mut matched = 0_usize;

	for term in &query_terms {
		if let Some(hit) = chunk_keywords.get(term) {
			total += hit.score * cfg.exact_match_bonus
				+ (hit.frequency as f32 / 10.0) * cfg.frequency_factor;
			matched += 1;

			continue;
		}

		let related = chunk_keywords
			.iter()
			.filter(|(chunk_term, _)| is_related_term(term, chunk_term, cfg.similarity_threshold))
			.map(|(_, keyword)| keyword.score)
			.fold(None, |best: Option<f32>, score| Some(best.map_or(score, |best| best.max(score))));

		if let Some(score) = related {
			total += score * cfg.semantic_match_bonus;
			matched += 1;
		}
	}

	let count = query_terms.len() as f32;
	let matched_ratio = matched as f32 / count;

	clamp_unit(total / count * (1.0 + matched_ratio))
}

pub fn entity_score(cfg: &EntityMatching, query: &ChunkMetadata, chunk: &ChunkMetadata) -> f32 {
	let chunk_entities = chunk.entity_map();
	let query_texts: Vec<String> = query
		.entities
		.iter()
		.map(|entity| entity.text.trim().to_lowercase())
		.filter(|text| !text.is_empty())
		.collect();

	if query_texts.is_empty() || chunk_entities.is_empty() {
		return 0.0;
	}

	let total: f32 = query_texts
		.iter()
		.filter_map(|text| chunk_entities.get(text))
		.map(|hit| {
			hit.confidence * entity_type_weight(&cfg.type_weights, hit.label) * cfg.exact_match_bonus
		})
		.sum();

	clamp_unit(total / query_texts.len() as f32)
}

pub fn entity_type_weight(weights: &EntityTypeWeights, label: EntityLabel) -> f32 {
	match label {
		EntityLabel::Person => weights.person,
		EntityLabel::Organization => weights.organization,
		EntityLabel::Location => weights.location,
		EntityLabel::Date => weights.date,
		EntityLabel::Money => weights.money,
		EntityLabel::Percent => weights.percent,
		EntityLabel::Product => weights.product,
		EntityLabel::Event => weights.event,
		EntityLabel::Misc => weights.misc,
	}
}

pub fn topic_score(cfg: &TopicMatching, query: &ChunkMetadata, chunk: &ChunkMetadata) -> f32 {
	if query.topics.is_empty() || chunk.topics.is_empty() {
		return 0.0;
	}

	let query_ids: HashSet<&str> = query.topics.iter().map(|topic| topic.topic_id.as_str()).collect();
	let chunk_ids: HashSet<&str> = chunk.topics.iter().map(|topic| topic.topic_id.as_str()).collect();
	let shared = query_ids.intersection(&chunk_ids).count();

	if shared > 0 {
		return clamp_unit(shared as f32 / query_ids.len() as f32 * cfg.overlap_bonus);
	}

	let mut best = 0.0_f32;

	for query_topic in &query.topics {
		for chunk_topic in &chunk.topics {
			let ratio = text::word_overlap(&query_topic.topic_words, &chunk_topic.topic_words);

			if ratio > cfg.similarity_threshold {
				best = best.max(ratio * query_topic.probability * chunk_topic.probability);
			}
		}
	}

	clamp_unit(best)
}

/// Recency of the most recent date in `chunk` relative to `now`. Future dates count as recent.
pub fn temporal_score(cfg: &TemporalScoring, chunk: &ChunkMetadata, now: OffsetDateTime) -> f32 {
	let Some(latest) = chunk.most_recent_date() else { return NEUTRAL_SCORE };
	let days_diff = (now - latest).whole_days();

	if days_diff < RECENT_WINDOW_DAYS {
		(NEUTRAL_SCORE + cfg.boost_recent).min(1.0)
	} else if days_diff < AGING_WINDOW_DAYS {
		let decay = (-(days_diff as f32) / cfg.recency_decay_days).exp();

		clamp_unit(NEUTRAL_SCORE + decay * cfg.boost_recent * 0.5)
	} else {
		(NEUTRAL_SCORE - cfg.penalty_old).max(OLD_CONTENT_FLOOR)
	}
}

/// Quality proxy from extracted readability, density, summary and confidence signals.
///
/// Metadata without any quality signal (including fallback metadata) scores neutral.
pub fn quality_score(cfg: &QualityScoring, metadata: Option<&ChunkMetadata>) -> f32 {
	let Some(metadata) = metadata.filter(|metadata| metadata.has_quality_signals()) else {
		return NEUTRAL_SCORE;
	};
	let mut score = 0.0_f32;

	if let Some(readability) = metadata.readability_score {
		score += readability * cfg.readability_weight;
	}
	if let Some(density) = metadata.information_density {
		score += density * cfg.information_density_weight;
	}
	if let Some(summary) = metadata.summary.as_deref() {
		let summary_quality =
			(text::grapheme_len(summary.trim()) as f32 / SUMMARY_TARGET_CHARS).min(1.0);

		score += summary_quality * cfg.summary_quality_weight;
	}
	if let Some(mean) =
		metadata.mean_confidence().filter(|mean| *mean > cfg.min_confidence_threshold)
	{
		score += mean * CONFIDENCE_BONUS_FACTOR;
	}

	clamp_unit(score)
}

fn is_related_term(query_term: &str, chunk_term: &str, threshold: f32) -> bool {
	query_term.contains(chunk_term)
		|| chunk_term.contains(query_term)
		|| text::char_jaccard(query_term, chunk_term) > threshold
}

fn clamp_unit(value: f32) -> f32 {
	if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) }
}
