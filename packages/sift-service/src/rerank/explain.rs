use std::collections::BTreeMap;

use crate::rerank::{cmp_f32_desc, signals::ComponentScores};
use sift_domain::ScoreComponent;

pub const STANDARD_EXPLANATION: &str = "standard relevance scoring";

const SEMANTIC_FLOOR: f32 = 0.3;
const MATCH_FLOOR: f32 = 0.1;
const RECENT_THRESHOLD: f32 = 0.6;
const OLDER_THRESHOLD: f32 = 0.3;
const HIGH_QUALITY_THRESHOLD: f32 = 0.7;

/// Joins one clause per significant component, strongest weighted contribution first.
///
/// Match clauses compare the weighted value against their floor; temporal and quality clauses
/// compare the raw component so they read the same under any weight.
pub fn build_explanation(
	breakdown: &BTreeMap<ScoreComponent, f32>,
	scores: &ComponentScores,
) -> String {
	let mut ordered: Vec<(ScoreComponent, f32)> =
		breakdown.iter().map(|(component, value)| (*component, *value)).collect();

	ordered.sort_by(|a, b| cmp_f32_desc(a.1, b.1).then_with(|| a.0.cmp(&b.0)));

	let clauses: Vec<String> = ordered
		.into_iter()
		.filter_map(|(component, weighted)| clause(component, weighted, scores.get(component)))
		.collect();

	if clauses.is_empty() {
		return STANDARD_EXPLANATION.to_string();
	}

	clauses.join("; ")
}

fn clause(component: ScoreComponent, weighted: f32, raw: f32) -> Option<String> {
	match component {
		ScoreComponent::Semantic => (weighted > SEMANTIC_FLOOR)
			.then(|| format!("strong semantic similarity ({raw:.2})")),
		ScoreComponent::Keyword =>
			(weighted > MATCH_FLOOR).then(|| format!("keyword match ({raw:.2})")),
		ScoreComponent::Entity =>
			(weighted > MATCH_FLOOR).then(|| format!("entity match ({raw:.2})")),
		ScoreComponent::Topic =>
			(weighted > MATCH_FLOOR).then(|| format!("topic relevance ({raw:.2})")),
		ScoreComponent::Temporal if weighted > 0.0 && raw > RECENT_THRESHOLD =>
			Some("recent content".to_string()),
		ScoreComponent::Temporal if weighted > 0.0 && raw < OLDER_THRESHOLD =>
			Some("older content".to_string()),
		ScoreComponent::Temporal => None,
		ScoreComponent::Quality => (weighted > 0.0 && raw > HIGH_QUALITY_THRESHOLD)
			.then(|| "high-quality content".to_string()),
	}
}
