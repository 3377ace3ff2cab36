use std::{fs, path::Path, sync::Arc};

use clap::Parser;
use color_eyre::eyre::WrapErr;
use serde::Deserialize;
use time::OffsetDateTime;
use tracing_subscriber::EnvFilter;

use sift_domain::RetrievalResult;
use sift_service::{ExtractionCache, LlmMetadataExtractor, SiftService};

#[derive(Debug, Parser)]
#[command(
	version = sift_cli::VERSION,
	rename_all = "kebab",
	styles = sift_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: std::path::PathBuf,
	/// JSON file holding `query`, `candidates` and an optional `extract_query_metadata` flag.
	#[arg(long, short = 'r', value_name = "FILE")]
	pub request: std::path::PathBuf,
	/// Print per-call statistics alongside the results.
	#[arg(long)]
	pub stats: bool,
}

#[derive(Debug, Deserialize)]
pub struct RerankRequest {
	pub query: String,
	#[serde(default)]
	pub candidates: Vec<RetrievalResult>,
	#[serde(default)]
	pub extract_query_metadata: bool,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = sift_config::load(&args.config)?;
	let filter = EnvFilter::new(config.service.log_level.clone());

	tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

	let request = read_request(&args.request)?;

	tracing::info!(
		candidates = request.candidates.len(),
		extract_query_metadata = request.extract_query_metadata,
		"Loaded rerank request."
	);

	let extractor = LlmMetadataExtractor::new(config.providers.llm_extractor.clone())?;
	let service =
		SiftService::new(config.reranker, Arc::new(extractor), Arc::new(ExtractionCache::new()))?;
	let report = service
		.rerank_with_report(
			&request.query,
			request.candidates,
			request.extract_query_metadata,
			OffsetDateTime::now_utc(),
		)
		.await;
	let output = if args.stats {
		serde_json::to_string_pretty(&report)?
	} else {
		serde_json::to_string_pretty(&report.results)?
	};

	println!("{output}");

	Ok(())
}

pub fn read_request(path: &Path) -> color_eyre::Result<RerankRequest> {
	let raw = fs::read_to_string(path)
		.wrap_err_with(|| format!("Failed to read rerank request {}.", path.display()))?;

	parse_request(&raw)
		.wrap_err_with(|| format!("Failed to parse rerank request {}.", path.display()))
}

pub fn parse_request(raw: &str) -> serde_json::Result<RerankRequest> {
	serde_json::from_str(raw)
}
