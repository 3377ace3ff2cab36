mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, DiversityFiltering, EntityMatching, EntityTypeWeights, ExtractionSettings,
	KeywordMatching, LlmProviderConfig, Providers, QualityScoring, RerankWeights, RerankerConfig,
	Service, TemporalScoring, TopicMatching,
};

use std::{fs, path::Path};

/// Reads, normalizes and validates the TOML config at `path`.
pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|source| Error::ReadConfig { path: path.to_path_buf(), source })?;

	parse(&raw, path)
}

fn parse(raw: &str, path: &Path) -> Result<Config> {
	let mut cfg = toml::from_str::<Config>(raw)
		.map_err(|source| Error::ParseConfig { path: path.to_path_buf(), source })?;

	normalize(&mut cfg);
	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	let provider = &cfg.providers.llm_extractor;

	for (label, value) in [
		("providers.llm_extractor.provider_id", &provider.provider_id),
		("providers.llm_extractor.api_base", &provider.api_base),
		("providers.llm_extractor.api_key", &provider.api_key),
		("providers.llm_extractor.model", &provider.model),
	] {
		if value.trim().is_empty() {
			return Err(Error::Validation { message: format!("{label} must be non-empty.") });
		}
	}

	if provider.timeout_ms == 0 {
		return Err(Error::Validation {
			message: "providers.llm_extractor.timeout_ms must be greater than zero.".to_string(),
		});
	}
	if !provider.temperature.is_finite() || provider.temperature < 0.0 {
		return Err(Error::Validation {
			message: "providers.llm_extractor.temperature must be a finite number zero or greater."
				.to_string(),
		});
	}

	for (key, value) in &provider.default_headers {
		if !value.is_string() {
			return Err(Error::Validation {
				message: format!("providers.llm_extractor.default_headers.{key} must be a string."),
			});
		}
	}

	validate_reranker(&cfg.reranker)
}

/// Checks every reranker setting; a reranker must never be constructed from a config that fails
/// here.
pub fn validate_reranker(cfg: &RerankerConfig) -> Result<()> {
	for (name, weight) in cfg.weights.entries() {
		ensure_non_negative(&format!("reranker.weights.{name}"), weight)?;
	}

	if cfg.weights.entries().iter().all(|(_, weight)| *weight == 0.0) {
		return Err(Error::Validation {
			message: "reranker.weights must contain at least one weight greater than zero."
				.to_string(),
		});
	}

	ensure_non_negative("reranker.keyword.exact_match_bonus", cfg.keyword.exact_match_bonus)?;
	ensure_non_negative("reranker.keyword.semantic_match_bonus", cfg.keyword.semantic_match_bonus)?;
	ensure_non_negative("reranker.keyword.frequency_factor", cfg.keyword.frequency_factor)?;
	ensure_unit_range("reranker.keyword.similarity_threshold", cfg.keyword.similarity_threshold)?;
	ensure_non_negative("reranker.entity.exact_match_bonus", cfg.entity.exact_match_bonus)?;

	for (label, weight) in cfg.entity.type_weights.entries() {
		ensure_non_negative(&format!("reranker.entity.type_weights.{label}"), weight)?;
	}

	ensure_non_negative("reranker.topic.overlap_bonus", cfg.topic.overlap_bonus)?;
	ensure_unit_range("reranker.topic.similarity_threshold", cfg.topic.similarity_threshold)?;
	ensure_unit_range("reranker.temporal.boost_recent", cfg.temporal.boost_recent)?;
	ensure_unit_range("reranker.temporal.penalty_old", cfg.temporal.penalty_old)?;

	if !cfg.temporal.recency_decay_days.is_finite() || cfg.temporal.recency_decay_days <= 0.0 {
		return Err(Error::Validation {
			message: "reranker.temporal.recency_decay_days must be a finite number greater than zero."
				.to_string(),
		});
	}

	for (label, value) in [
		("reranker.quality.readability_weight", cfg.quality.readability_weight),
		("reranker.quality.information_density_weight", cfg.quality.information_density_weight),
		("reranker.quality.summary_quality_weight", cfg.quality.summary_quality_weight),
		("reranker.quality.min_confidence_threshold", cfg.quality.min_confidence_threshold),
		("reranker.diversity.max_topic_overlap", cfg.diversity.max_topic_overlap),
		("reranker.diversity.max_entity_overlap", cfg.diversity.max_entity_overlap),
	] {
		ensure_unit_range(label, value)?;
	}

	if cfg.diversity.max_results == 0 {
		return Err(Error::Validation {
			message: "reranker.diversity.max_results must be greater than zero.".to_string(),
		});
	}
	if cfg.diversity.min_results > cfg.diversity.max_results {
		return Err(Error::Validation {
			message: "reranker.diversity.min_results must not exceed reranker.diversity.max_results."
				.to_string(),
		});
	}
	if cfg.extraction.max_concurrent_extractions == 0 {
		return Err(Error::Validation {
			message: "reranker.extraction.max_concurrent_extractions must be greater than zero."
				.to_string(),
		});
	}
	if cfg.extraction.timeout_ms == 0 {
		return Err(Error::Validation {
			message: "reranker.extraction.timeout_ms must be greater than zero.".to_string(),
		});
	}
	if cfg.extraction.query_term_fallback && cfg.extraction.max_query_terms == 0 {
		return Err(Error::Validation {
			message: "reranker.extraction.max_query_terms must be greater than zero when query_term_fallback is enabled."
				.to_string(),
		});
	}

	Ok(())
}

fn ensure_non_negative(label: &str, value: f32) -> Result<()> {
	if !value.is_finite() {
		return Err(Error::Validation { message: format!("{label} must be a finite number.") });
	}
	if value < 0.0 {
		return Err(Error::Validation { message: format!("{label} must be zero or greater.") });
	}

	Ok(())
}

fn ensure_unit_range(label: &str, value: f32) -> Result<()> {
	if !value.is_finite() {
		return Err(Error::Validation { message: format!("{label} must be a finite number.") });
	}
	if !(0.0..=1.0).contains(&value) {
		return Err(Error::Validation {
			message: format!("{label} must be in the range 0.0-1.0."),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg.service.log_level.trim().is_empty() {
		cfg.service.log_level = "info".to_string();
	}

	cfg.providers.llm_extractor.api_base =
		cfg.providers.llm_extractor.api_base.trim_end_matches('/').to_string();
}
