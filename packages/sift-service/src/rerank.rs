mod diversity;
mod explain;
mod signals;

pub use diversity::{DiversitySelection, select_diverse_results};
pub use explain::{STANDARD_EXPLANATION, build_explanation};
pub use signals::{
	ComponentScores, NEUTRAL_SCORE, SignalScorer, entity_score, entity_type_weight, keyword_score,
	quality_score, temporal_score, topic_score,
};

use std::{
	cmp::Ordering,
	collections::{HashMap, HashSet},
	time::Duration,
};

use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
	SiftService,
	cache::FingerprintKind,
	extraction::{BoundedExtractor, ExtractionOutcome, OutcomeSource},
};
use sift_domain::{ChunkMetadata, ExtractedKeyword, RetrievalResult, text};

/// Chunk id carried by query metadata.
pub const QUERY_METADATA_ID: &str = "query";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryMetadataSource {
	#[default]
	None,
	Cache,
	Extracted,
	TermFallback,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct RerankStats {
	pub rerank_id: Uuid,
	/// Well-formed candidates that entered scoring.
	pub candidates: usize,
	pub malformed_dropped: usize,
	pub extracted: usize,
	pub cache_hits: usize,
	pub failures: usize,
	pub kept: usize,
	pub diversity_dropped: Vec<String>,
	pub query_metadata: QueryMetadataSource,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct RerankReport {
	pub results: Vec<RetrievalResult>,
	pub stats: RerankStats,
}

impl SiftService {
	/// Reranks `candidates` for `query` and returns the kept results, best first.
	///
	/// Never fails: extraction problems degrade to neutral metadata and malformed candidates are
	/// dropped.
	pub async fn rerank(
		&self,
		query: &str,
		candidates: Vec<RetrievalResult>,
		extract_query_metadata: bool,
	) -> Vec<RetrievalResult> {
		self.rerank_with_report(query, candidates, extract_query_metadata, OffsetDateTime::now_utc())
			.await
			.results
	}

	/// Same as [`Self::rerank`], scored against `now` and returning per-call statistics.
	pub async fn rerank_with_report(
		&self,
		query: &str,
		candidates: Vec<RetrievalResult>,
		extract_query_metadata: bool,
		now: OffsetDateTime,
	) -> RerankReport {
		let mut stats = RerankStats { rerank_id: Uuid::new_v4(), ..RerankStats::default() };
		let received = candidates.len();
		let mut candidates = sanitize_candidates(candidates);

		stats.malformed_dropped = received - candidates.len();
		stats.candidates = candidates.len();

		if candidates.is_empty() {
			tracing::info!(
				rerank_id = %stats.rerank_id,
				malformed_dropped = stats.malformed_dropped,
				"Rerank skipped. No well-formed candidates."
			);

			return RerankReport { results: Vec::new(), stats };
		}

		let extractor = self.bounded_extractor();
		let query_metadata =
			self.resolve_query_metadata(&extractor, query, extract_query_metadata, &mut stats).await;

		attach_chunk_metadata(&extractor, &mut candidates, &mut stats).await;

		let scorer = SignalScorer::new(&self.cfg, now);

		for candidate in &mut candidates {
			score_candidate(&scorer, query_metadata.as_ref(), candidate);
		}

		// Stable sort: equal scores keep their input order.
		candidates.sort_by(|a, b| {
			cmp_f32_desc(
				a.final_score.unwrap_or(f32::NEG_INFINITY),
				b.final_score.unwrap_or(f32::NEG_INFINITY),
			)
		});

		let selection = select_diverse_results(candidates, &self.cfg.diversity);

		stats.kept = selection.kept.len();
		stats.diversity_dropped = selection.dropped;

		tracing::info!(
			rerank_id = %stats.rerank_id,
			candidates = stats.candidates,
			extracted = stats.extracted,
			cache_hits = stats.cache_hits,
			failures = stats.failures,
			kept = stats.kept,
			dropped = stats.diversity_dropped.len(),
			"Rerank completed."
		);

		RerankReport { results: selection.kept, stats }
	}

	fn bounded_extractor(&self) -> BoundedExtractor<'_> {
		let extraction = &self.cfg.extraction;

		BoundedExtractor::new(
			self.extractor.as_ref(),
			extraction.enable_caching.then_some(self.cache.as_ref()),
			extraction.max_concurrent_extractions as usize,
			Duration::from_millis(extraction.timeout_ms),
		)
	}

	async fn resolve_query_metadata(
		&self,
		extractor: &BoundedExtractor<'_>,
		query: &str,
		extract_query_metadata: bool,
		stats: &mut RerankStats,
	) -> Option<ChunkMetadata> {
		if extract_query_metadata && !query.trim().is_empty() {
			let outcome = extractor.extract_one(FingerprintKind::Query, QUERY_METADATA_ID, query).await;

			match outcome.source {
				OutcomeSource::Cache => {
					stats.query_metadata = QueryMetadataSource::Cache;

					return Some(outcome.metadata);
				},
				OutcomeSource::Extracted => {
					stats.query_metadata = QueryMetadataSource::Extracted;

					return Some(outcome.metadata);
				},
				OutcomeSource::Fallback(_) => stats.failures += 1,
			}
		}

		// Reached only when query metadata was not requested or its extraction failed.
		let settings = &self.cfg.extraction;

		if !settings.query_term_fallback {
			return None;
		}

		let mut metadata = ChunkMetadata::empty(QUERY_METADATA_ID, query);

		metadata.keywords = text::tokenize_terms(query, settings.max_query_terms as usize)
			.into_iter()
			.map(|term| ExtractedKeyword { term, score: 1.0, frequency: 1, context: None })
			.collect();

		if metadata.keywords.is_empty() {
			return None;
		}

		stats.query_metadata = QueryMetadataSource::TermFallback;

		Some(metadata)
	}
}

/// Drops candidates with an empty id, a non-finite base score, or an id seen earlier in the list,
/// and clears any score state carried in from a previous call.
pub fn sanitize_candidates(candidates: Vec<RetrievalResult>) -> Vec<RetrievalResult> {
	let mut seen = HashSet::new();
	let mut out = Vec::with_capacity(candidates.len());

	for mut candidate in candidates {
		let reason = if candidate.chunk_id.trim().is_empty() {
			Some("empty_chunk_id")
		} else if !candidate.base_score.is_finite() {
			Some("non_finite_base_score")
		} else if !seen.insert(candidate.chunk_id.clone()) {
			Some("duplicate_chunk_id")
		} else {
			None
		};

		if let Some(reason) = reason {
			tracing::warn!(chunk_id = %candidate.chunk_id, reason, "Dropping malformed candidate.");

			continue;
		}

		candidate.final_score = None;
		candidate.score_breakdown.clear();
		candidate.explanation = None;

		out.push(candidate);
	}

	out
}

pub fn cmp_f32_desc(a: f32, b: f32) -> Ordering {
	match (a.is_nan(), b.is_nan()) {
		(true, true) => Ordering::Equal,
		(true, false) => Ordering::Greater,
		(false, true) => Ordering::Less,
		(false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
	}
}

async fn attach_chunk_metadata(
	extractor: &BoundedExtractor<'_>,
	candidates: &mut [RetrievalResult],
	stats: &mut RerankStats,
) {
	let pending: Vec<(String, String)> = candidates
		.iter()
		.filter(|candidate| candidate.metadata.is_none())
		.map(|candidate| (candidate.chunk_id.clone(), candidate.content.clone()))
		.collect();

	if pending.is_empty() {
		return;
	}

	let mut by_id: HashMap<String, ExtractionOutcome> = extractor
		.extract_all(FingerprintKind::Chunk, pending)
		.await
		.into_iter()
		.map(|outcome| (outcome.id.clone(), outcome))
		.collect();

	for candidate in candidates.iter_mut().filter(|candidate| candidate.metadata.is_none()) {
		let Some(outcome) = by_id.remove(&candidate.chunk_id) else { continue };

		match outcome.source {
			OutcomeSource::Cache => stats.cache_hits += 1,
			OutcomeSource::Extracted => stats.extracted += 1,
			OutcomeSource::Fallback(_) => stats.failures += 1,
		}

		let mut metadata = outcome.metadata;

		metadata.document_id = candidate.document_id.clone();
		candidate.metadata = Some(metadata);
	}
}

fn score_candidate(
	scorer: &SignalScorer<'_>,
	query: Option<&ChunkMetadata>,
	candidate: &mut RetrievalResult,
) {
	let scores = scorer.component_scores(query, candidate);
	let breakdown = scorer.weighted(&scores);
	let final_score: f32 = breakdown.values().sum();

	candidate.explanation = Some(build_explanation(&breakdown, &scores));
	candidate.final_score = Some(final_score);
	candidate.score_breakdown = breakdown;
	candidate.query_metadata = query.cloned();
}
