use std::collections::HashSet;

use sift_config::DiversityFiltering;
use sift_domain::RetrievalResult;

#[derive(Debug, Default)]
pub struct DiversitySelection {
	pub kept: Vec<RetrievalResult>,
	/// Ids of rejected candidates, in score order.
	pub dropped: Vec<String>,
}

/// Greedy topic and entity de-duplication over a score-sorted list.
///
/// Lists no longer than `min_candidates` pass through untouched. Otherwise the first
/// `min_results` candidates are always kept, later ones only while their overlap with what was
/// already kept stays under both limits, and selection stops at `max_results`. Kept candidates
/// keep their relative order.
pub fn select_diverse_results(
	candidates: Vec<RetrievalResult>,
	cfg: &DiversityFiltering,
) -> DiversitySelection {
	if !cfg.enabled || candidates.len() <= cfg.min_candidates as usize {
		return DiversitySelection { kept: candidates, dropped: Vec::new() };
	}

	let max_results = cfg.max_results as usize;
	let min_results = cfg.min_results as usize;
	let mut used_topics: HashSet<String> = HashSet::new();
	let mut used_entities: HashSet<String> = HashSet::new();
	let mut selection = DiversitySelection::default();

	for candidate in candidates {
		if selection.kept.len() >= max_results {
			selection.dropped.push(candidate.chunk_id);

			continue;
		}

		let topics = topic_ids(&candidate);
		let entities = leading_entities(&candidate, cfg.entities_per_result as usize);
		let topic_overlap = overlap_ratio(&topics, &used_topics);
		let entity_overlap = overlap_ratio(&entities, &used_entities);
		let accept = selection.kept.len() < min_results
			|| (topic_overlap < cfg.max_topic_overlap && entity_overlap < cfg.max_entity_overlap);

		if !accept {
			tracing::debug!(
				chunk_id = %candidate.chunk_id,
				topic_overlap,
				entity_overlap,
				"Candidate rejected by diversity filter."
			);
			selection.dropped.push(candidate.chunk_id);

			continue;
		}

		used_topics.extend(topics);
		used_entities.extend(entities);
		selection.kept.push(candidate);
	}

	selection
}

fn topic_ids(candidate: &RetrievalResult) -> HashSet<String> {
	candidate
		.metadata
		.iter()
		.flat_map(|metadata| metadata.topics.iter())
		.map(|topic| topic.topic_id.clone())
		.collect()
}

fn leading_entities(candidate: &RetrievalResult, limit: usize) -> HashSet<String> {
	candidate
		.metadata
		.iter()
		.flat_map(|metadata| metadata.entities.iter().take(limit))
		.map(|entity| entity.text.trim().to_lowercase())
		.filter(|text| !text.is_empty())
		.collect()
}

fn overlap_ratio(current: &HashSet<String>, used: &HashSet<String>) -> f32 {
	current.intersection(used).count() as f32 / current.len().max(1) as f32
}
