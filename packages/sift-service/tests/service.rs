use std::{collections::HashMap, sync::Arc, time::Duration};

use time::{OffsetDateTime, macros::datetime};

use sift_config::RerankerConfig;
use sift_domain::{EntityLabel, RetrievalResult, ScoreComponent};
use sift_service::{
	Error, ExtractionCache, ExtractionError, QueryMetadataSource, RerankReport, SiftService,
	rerank::STANDARD_EXPLANATION,
};
use sift_testkit::{
	ScriptedExtractor, candidate, date_days_ago, entity, keyword, metadata_for, topic,
};

const NOW: OffsetDateTime = datetime!(2025-06-01 12:00 UTC);

fn build_service(cfg: RerankerConfig, extractor: Arc<ScriptedExtractor>) -> SiftService {
	SiftService::new(cfg, extractor, Arc::new(ExtractionCache::new()))
		.expect("Failed to build service.")
}

async fn rerank(
	service: &SiftService,
	query: &str,
	candidates: Vec<RetrievalResult>,
	extract_query_metadata: bool,
) -> RerankReport {
	service.rerank_with_report(query, candidates, extract_query_metadata, NOW).await
}

fn raw_component(result: &RetrievalResult, cfg: &RerankerConfig, component: ScoreComponent) -> f32 {
	let weight = match component {
		ScoreComponent::Semantic => cfg.weights.semantic,
		ScoreComponent::Keyword => cfg.weights.keyword,
		ScoreComponent::Entity => cfg.weights.entity,
		ScoreComponent::Topic => cfg.weights.topic,
		ScoreComponent::Temporal => cfg.weights.temporal,
		ScoreComponent::Quality => cfg.weights.quality,
	};

	result.score_breakdown[&component] / weight
}

/// Default config with the opt-in topic and quality signals switched on.
fn all_signals_config() -> RerankerConfig {
	let mut cfg = RerankerConfig::default();

	cfg.weights.topic = 0.1;
	cfg.weights.quality = 0.05;

	cfg
}

/// Eight pre-extracted candidates with distinct base scores and distinct topics.
fn varied_candidates() -> Vec<RetrievalResult> {
	(0..8)
		.map(|idx| {
			let id = format!("c{idx}");
			let content = format!("chunk {idx} about rust async runtimes");
			let mut metadata = metadata_for(&id, &content);

			metadata.topics = vec![topic(&format!("t{idx}"), &["rust"], 0.6)];
			metadata.dates = vec![date_days_ago(NOW, 40 * idx as i64)];

			if idx % 2 == 0 {
				metadata.keywords = vec![keyword("rust", 0.9, 3), keyword("runtime", 0.6, 1)];
			}
			if idx % 3 == 0 {
				metadata.readability_score = Some(0.8);
				metadata.summary = Some("A walkthrough of executor internals.".to_string());
			}

			candidate(&id, &content, 0.9 - idx as f32 * 0.07).with_metadata(metadata)
		})
		.collect()
}

fn score_map(report: &RerankReport) -> HashMap<String, f32> {
	report
		.results
		.iter()
		.map(|result| (result.chunk_id.clone(), result.final_score.expect("Result is unscored.")))
		.collect()
}

#[tokio::test]
async fn machine_learning_query_matches_all_keywords() {
	let cfg = RerankerConfig::default();
	let mut query_metadata = metadata_for("query", "machine learning algorithms");

	query_metadata.keywords = vec![
		keyword("machine", 1.0, 1),
		keyword("learning", 1.0, 1),
		keyword("algorithms", 1.0, 1),
	];

	let mut metadata = metadata_for("ml-1", "Machine learning algorithms");

	metadata.keywords = vec![
		keyword("machine", 0.9, 2),
		keyword("learning", 0.8, 2),
		keyword("algorithms", 0.7, 1),
	];

	let extractor = Arc::new(
		ScriptedExtractor::new().with_metadata("machine learning algorithms", query_metadata),
	);
	let service = build_service(cfg.clone(), extractor.clone());
	let report = rerank(
		&service,
		"machine learning algorithms",
		vec![candidate("ml-1", "Machine learning algorithms", 0.8).with_metadata(metadata)],
		true,
	)
	.await;
	let result = &report.results[0];
	let final_score = result.final_score.expect("Result is unscored.");

	assert!(raw_component(result, &cfg, ScoreComponent::Keyword) > 0.9);
	assert_eq!(result.score_breakdown[&ScoreComponent::Entity], 0.0);
	assert!((raw_component(result, &cfg, ScoreComponent::Temporal) - 0.5).abs() < 1e-5);
	assert!(final_score > 0.8 * 0.4);
	assert!((final_score - 0.67).abs() < 1e-5);
	assert_eq!(report.stats.query_metadata, QueryMetadataSource::Extracted);
	assert_eq!(extractor.called_ids(), vec!["query"]);
}

#[tokio::test]
async fn unrequested_query_metadata_gives_no_keyword_signal() {
	let mut metadata = metadata_for("c1", "Rust ownership explained.");

	metadata.keywords = vec![keyword("rust", 0.9, 2)];

	let extractor = Arc::new(ScriptedExtractor::new());
	let service = build_service(RerankerConfig::default(), extractor.clone());
	let report = rerank(
		&service,
		"rust ownership",
		vec![candidate("c1", "Rust ownership explained.", 0.5).with_metadata(metadata)],
		false,
	)
	.await;
	let result = &report.results[0];

	assert_eq!(result.score_breakdown[&ScoreComponent::Keyword], 0.0);
	assert!(result.query_metadata.is_none());
	assert_eq!(report.stats.query_metadata, QueryMetadataSource::None);
	assert_eq!(extractor.calls(), 0);
}

#[tokio::test]
async fn extracted_query_without_keywords_is_not_padded_with_terms() {
	let mut cfg = RerankerConfig::default();

	cfg.extraction.query_term_fallback = true;

	let mut metadata = metadata_for("c1", "Rust ownership explained.");

	metadata.keywords = vec![keyword("rust", 0.9, 2)];

	let extractor = Arc::new(ScriptedExtractor::new());
	let service = build_service(cfg, extractor.clone());
	let report = rerank(
		&service,
		"rust ownership",
		vec![candidate("c1", "Rust ownership explained.", 0.5).with_metadata(metadata)],
		true,
	)
	.await;
	let query = report.results[0].query_metadata.as_ref().expect("Missing query metadata.");

	assert!(query.keywords.is_empty());
	assert_eq!(report.stats.query_metadata, QueryMetadataSource::Extracted);
	assert_eq!(report.results[0].score_breakdown[&ScoreComponent::Keyword], 0.0);
}

#[tokio::test]
async fn chunk_without_metadata_scores_neutral() {
	let cfg = all_signals_config();
	let extractor = Arc::new(ScriptedExtractor::new());
	let service = build_service(cfg.clone(), extractor.clone());
	let report =
		rerank(&service, "vector databases", vec![candidate("c1", "Plain text.", 0.6)], false).await;
	let result = &report.results[0];

	assert_eq!(extractor.calls(), 1);
	assert_eq!(result.score_breakdown[&ScoreComponent::Keyword], 0.0);
	assert_eq!(result.score_breakdown[&ScoreComponent::Entity], 0.0);
	assert_eq!(result.score_breakdown[&ScoreComponent::Topic], 0.0);
	assert!((raw_component(result, &cfg, ScoreComponent::Temporal) - 0.5).abs() < 1e-5);
	assert!((raw_component(result, &cfg, ScoreComponent::Quality) - 0.5).abs() < 1e-5);
	assert_eq!(result.explanation.as_deref(), Some(STANDARD_EXPLANATION));
}

#[tokio::test]
async fn repeated_text_is_extracted_once() {
	let mut metadata = metadata_for("c1", "Tokio schedules tasks.");

	metadata.keywords = vec![keyword("tokio", 0.9, 1)];

	let extractor =
		Arc::new(ScriptedExtractor::new().with_metadata("Tokio schedules tasks.", metadata));
	let service = build_service(RerankerConfig::default(), extractor.clone());
	let first =
		rerank(&service, "tokio", vec![candidate("c1", "Tokio schedules tasks.", 0.5)], false).await;
	let second =
		rerank(&service, "tokio", vec![candidate("c9", "Tokio   schedules tasks.", 0.5)], false)
			.await;

	assert_eq!(extractor.calls(), 1);
	assert_eq!(first.stats.extracted, 1);
	assert_eq!(second.stats.cache_hits, 1);
	assert_eq!(service.cache.len(), 1);

	let cached = second.results[0].metadata.as_ref().expect("Missing metadata.");

	assert_eq!(cached.chunk_id, "c9");
	assert_eq!(cached.keywords[0].term, "tokio");
	assert_eq!(cached.text_length, "Tokio   schedules tasks.".chars().count());
	assert_eq!(cached.end_pos, cached.text_length);
}

#[tokio::test]
async fn disabled_cache_is_never_touched() {
	let mut cfg = RerankerConfig::default();

	cfg.extraction.enable_caching = false;

	let extractor = Arc::new(ScriptedExtractor::new());
	let service = build_service(cfg, extractor.clone());

	for _ in 0..2 {
		rerank(&service, "q", vec![candidate("c1", "Same text.", 0.5)], false).await;
	}

	assert_eq!(extractor.calls(), 2);
	assert!(service.cache.is_empty());
	assert_eq!(service.cache.stats().hits + service.cache.stats().misses, 0);
}

#[tokio::test]
async fn identical_texts_in_one_call_share_an_extraction() {
	let extractor = Arc::new(ScriptedExtractor::new());
	let service = build_service(RerankerConfig::default(), extractor.clone());
	let report = rerank(
		&service,
		"q",
		vec![candidate("a", "Shared passage.", 0.7), candidate("b", "  Shared   passage. ", 0.6)],
		false,
	)
	.await;

	assert_eq!(extractor.calls(), 1);

	for result in &report.results {
		let metadata = result.metadata.as_ref().expect("Missing metadata.");

		assert_eq!(metadata.chunk_id, result.chunk_id);
		assert_eq!(metadata.text_length, result.content.chars().count());
	}
}

#[tokio::test]
async fn reranking_is_deterministic_and_order_independent() {
	let service = build_service(RerankerConfig::default(), Arc::new(ScriptedExtractor::new()));
	let forward = rerank(&service, "rust runtime", varied_candidates(), false).await;
	let again = rerank(&service, "rust runtime", varied_candidates(), false).await;
	let mut reversed_input = varied_candidates();

	reversed_input.reverse();

	let reversed = rerank(&service, "rust runtime", reversed_input, false).await;
	let order = |report: &RerankReport| -> Vec<String> {
		report.results.iter().map(|result| result.chunk_id.clone()).collect()
	};

	assert_eq!(order(&forward), order(&again));
	assert_eq!(score_map(&forward), score_map(&again));
	assert_eq!(score_map(&forward), score_map(&reversed));
	assert_eq!(order(&forward), order(&reversed));
}

#[tokio::test]
async fn equal_scores_keep_input_order() {
	let candidates: Vec<RetrievalResult> = ["z", "a", "m"]
		.into_iter()
		.map(|id| {
			candidate(id, "Identical passage.", 0.5)
				.with_metadata(metadata_for(id, "Identical passage."))
		})
		.collect();
	let service = build_service(RerankerConfig::default(), Arc::new(ScriptedExtractor::new()));
	let report = rerank(&service, "passage", candidates, false).await;
	let order: Vec<&str> = report.results.iter().map(|result| result.chunk_id.as_str()).collect();
	let scores: Vec<f32> =
		report.results.iter().map(|result| result.final_score.unwrap_or_default()).collect();

	assert_eq!(order, vec!["z", "a", "m"]);
	assert!(scores.windows(2).all(|pair| pair[0] == pair[1]));
}

#[tokio::test]
async fn component_scores_stay_in_unit_range() {
	let cfg = all_signals_config();
	let service = build_service(cfg.clone(), Arc::new(ScriptedExtractor::new()));
	let report = rerank(&service, "rust runtime", varied_candidates(), false).await;

	assert!(!report.results.is_empty());

	for result in &report.results {
		for component in ScoreComponent::ALL {
			let raw = raw_component(result, &cfg, component);

			assert!((0.0..=1.0).contains(&raw), "{} out of range: {raw}", component.as_str());
		}
	}

	let scores: Vec<f32> =
		report.results.iter().map(|result| result.final_score.unwrap_or_default()).collect();

	assert!(scores.windows(2).all(|pair| pair[0] >= pair[1]));
}

#[tokio::test]
async fn diversity_floor_keeps_top_results() {
	let candidates: Vec<RetrievalResult> = (0..7)
		.map(|idx| {
			let id = format!("c{idx}");
			let mut metadata = metadata_for(&id, "Near duplicate.");

			metadata.topics = vec![topic("ml", &["machine", "learning"], 0.8)];
			metadata.entities = vec![entity("OpenAI", EntityLabel::Organization, 0.9)];

			candidate(&id, "Near duplicate.", 0.9 - idx as f32 * 0.05).with_metadata(metadata)
		})
		.collect();
	let service = build_service(RerankerConfig::default(), Arc::new(ScriptedExtractor::new()));
	let report = rerank(&service, "machine learning", candidates, false).await;
	let kept: Vec<&str> = report.results.iter().map(|result| result.chunk_id.as_str()).collect();

	assert_eq!(kept, vec!["c0", "c1", "c2"]);
	assert_eq!(report.stats.kept, 3);
	assert_eq!(report.stats.diversity_dropped, vec!["c3", "c4", "c5", "c6"]);
}

#[tokio::test]
async fn extraction_respects_concurrency_ceiling() {
	let mut cfg = RerankerConfig::default();

	cfg.extraction.max_concurrent_extractions = 2;

	let extractor = Arc::new(ScriptedExtractor::new().with_delay(Duration::from_millis(20)));
	let service = build_service(cfg, extractor.clone());
	let candidates: Vec<RetrievalResult> = (0..8)
		.map(|idx| candidate(&format!("c{idx}"), &format!("Distinct passage {idx}."), 0.5))
		.collect();
	let report = rerank(&service, "passage", candidates, false).await;

	assert_eq!(extractor.calls(), 8);
	assert_eq!(extractor.max_in_flight(), 2);
	assert_eq!(report.stats.extracted, 8);
}

#[tokio::test]
async fn failed_extraction_falls_back_without_caching() {
	let extractor = Arc::new(
		ScriptedExtractor::new()
			.with_failure("Broken passage.", ExtractionError::malformed("Not JSON.")),
	);
	let service = build_service(RerankerConfig::default(), extractor.clone());
	let candidates =
		vec![candidate("bad", "Broken passage.", 0.9), candidate("good", "Fine passage.", 0.4)];
	let report = rerank(&service, "passage", candidates.clone(), false).await;

	assert_eq!(report.results.len(), 2);
	assert_eq!(report.stats.failures, 1);
	assert_eq!(report.stats.extracted, 1);

	let bad = report
		.results
		.iter()
		.find(|result| result.chunk_id == "bad")
		.expect("Failed candidate was dropped.");
	let metadata = bad.metadata.as_ref().expect("Missing fallback metadata.");

	assert!(metadata.keywords.is_empty());
	assert!(bad.is_scored());

	rerank(&service, "passage", candidates, false).await;

	assert_eq!(extractor.calls(), 3);
	assert_eq!(service.cache.len(), 1);
}

#[tokio::test]
async fn slow_extraction_times_out_as_failure() {
	let mut cfg = RerankerConfig::default();

	cfg.extraction.timeout_ms = 20;

	let extractor = Arc::new(ScriptedExtractor::new().with_delay(Duration::from_millis(500)));
	let service = build_service(cfg, extractor.clone());
	let candidates = vec![candidate("a", "Slow one.", 0.5), candidate("b", "Slow two.", 0.6)];
	let report = rerank(&service, "slow", candidates, false).await;

	assert_eq!(report.results.len(), 2);
	assert_eq!(report.stats.failures, 2);
	assert!(service.cache.is_empty());
	assert_eq!(report.results[0].chunk_id, "b");
}

#[tokio::test]
async fn cancelled_rerank_leaves_cache_consistent() {
	let extractor = Arc::new(ScriptedExtractor::new().with_delay(Duration::from_millis(200)));
	let service = build_service(RerankerConfig::default(), extractor.clone());
	let candidates: Vec<RetrievalResult> = (0..3)
		.map(|idx| candidate(&format!("c{idx}"), &format!("Passage {idx}."), 0.5))
		.collect();
	let cancelled = tokio::time::timeout(
		Duration::from_millis(30),
		service.rerank("passage", candidates.clone(), false),
	)
	.await;

	assert!(cancelled.is_err());
	assert!(service.cache.is_empty());
	assert_eq!(extractor.in_flight(), 0);

	let results = service.rerank("passage", candidates, false).await;

	assert_eq!(results.len(), 3);
	assert_eq!(service.cache.len(), 3);
}

#[tokio::test]
async fn query_metadata_is_extracted_once_and_cached() {
	let mut query_metadata = metadata_for("query", "Who founded OpenAI?");

	query_metadata.entities = vec![entity("OpenAI", EntityLabel::Organization, 0.9)];

	let mut chunk_metadata = metadata_for("c1", "OpenAI was founded in 2015.");

	chunk_metadata.entities = vec![entity("openai", EntityLabel::Organization, 0.8)];

	let extractor =
		Arc::new(ScriptedExtractor::new().with_metadata("Who founded OpenAI?", query_metadata));
	let cfg = RerankerConfig::default();
	let service = build_service(cfg.clone(), extractor.clone());
	let candidates = vec![
		candidate("c1", "OpenAI was founded in 2015.", 0.5).with_metadata(chunk_metadata),
	];
	let first = rerank(&service, "Who founded OpenAI?", candidates.clone(), true).await;
	let second = rerank(&service, "Who founded OpenAI?", candidates, true).await;

	assert_eq!(first.stats.query_metadata, QueryMetadataSource::Extracted);
	assert_eq!(second.stats.query_metadata, QueryMetadataSource::Cache);
	assert_eq!(extractor.called_ids(), vec!["query"]);
	assert!((raw_component(&first.results[0], &cfg, ScoreComponent::Entity) - 0.8).abs() < 1e-5);
	assert!(first.results[0].query_metadata.is_some());
}

#[tokio::test]
async fn failed_query_extraction_uses_query_terms() {
	let extractor = Arc::new(
		ScriptedExtractor::new()
			.with_failure("rust ownership", ExtractionError::transport("Connection reset.")),
	);
	let mut cfg = RerankerConfig::default();

	cfg.extraction.query_term_fallback = true;

	let service = build_service(cfg, extractor.clone());
	let mut metadata = metadata_for("c1", "Ownership in Rust.");

	metadata.keywords = vec![keyword("ownership", 0.8, 2)];

	let report = rerank(
		&service,
		"rust ownership",
		vec![candidate("c1", "Ownership in Rust.", 0.5).with_metadata(metadata)],
		true,
	)
	.await;
	let query = report.results[0].query_metadata.as_ref().expect("Missing query metadata.");
	let terms: Vec<&str> = query.keywords.iter().map(|keyword| keyword.term.as_str()).collect();

	assert_eq!(report.stats.failures, 1);
	assert_eq!(report.stats.query_metadata, QueryMetadataSource::TermFallback);
	assert_eq!(terms, vec!["rust", "ownership"]);
	assert!(report.results[0].score_breakdown[&ScoreComponent::Keyword] > 0.0);
}

#[tokio::test]
async fn malformed_candidates_are_dropped() {
	let extractor = Arc::new(ScriptedExtractor::new());
	let service = build_service(RerankerConfig::default(), extractor.clone());
	let empty = rerank(&service, "q", Vec::new(), false).await;
	let malformed = rerank(
		&service,
		"q",
		vec![candidate("", "No id.", 0.5), candidate("x", "Infinite.", f32::INFINITY)],
		false,
	)
	.await;

	assert!(empty.results.is_empty());
	assert!(malformed.results.is_empty());
	assert_eq!(malformed.stats.malformed_dropped, 2);
	assert_eq!(extractor.calls(), 0);
}

#[tokio::test]
async fn report_serializes_snake_case_breakdown() {
	let service = build_service(RerankerConfig::default(), Arc::new(ScriptedExtractor::new()));
	let report = rerank(&service, "rust", vec![candidate("c1", "Rust.", 0.5)], false).await;
	let json = serde_json::to_value(&report).expect("Failed to serialize report.");

	assert!(json["results"][0]["score_breakdown"]["semantic"].is_number());
	assert_eq!(json["stats"]["query_metadata"], "none");
}

#[test]
fn invalid_config_is_rejected_at_construction() {
	let mut cfg = RerankerConfig::default();

	cfg.weights.semantic = 0.0;
	cfg.weights.keyword = 0.0;
	cfg.weights.entity = 0.0;
	cfg.weights.topic = 0.0;
	cfg.weights.temporal = 0.0;
	cfg.weights.quality = 0.0;

	let err = SiftService::new(
		cfg,
		Arc::new(ScriptedExtractor::new()),
		Arc::new(ExtractionCache::new()),
	)
	.err()
	.expect("Expected configuration error.");

	assert!(matches!(err, Error::Configuration { .. }));
}
