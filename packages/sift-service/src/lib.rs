pub mod cache;
pub mod extraction;
pub mod rerank;

mod error;

pub use cache::{CacheStats, ExtractionCache, Fingerprint, FingerprintKind};
pub use error::{Error, ExtractionError, ExtractionErrorKind, Result};
pub use extraction::{BoundedExtractor, ExtractionOutcome, OutcomeSource};
pub use rerank::{QueryMetadataSource, RerankReport, RerankStats};

use std::{future::Future, pin::Pin, sync::Arc};

use sift_config::{LlmProviderConfig, RerankerConfig};
use sift_domain::ChunkMetadata;
use sift_providers::{
	extractor::{self, LlmClient},
	metadata,
};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Turns one text into structured metadata.
///
/// Implementations report failure through [`ExtractionError`]; they do not retry. `id` is the
/// chunk id (or [`rerank::QUERY_METADATA_ID`]) the metadata will be attached to.
pub trait MetadataExtractor
where
	Self: Send + Sync,
{
	fn extract<'a>(
		&'a self,
		text: &'a str,
		id: &'a str,
	) -> BoxFuture<'a, std::result::Result<ChunkMetadata, ExtractionError>>;
}

/// [`MetadataExtractor`] backed by an OpenAI-compatible chat completions endpoint.
pub struct LlmMetadataExtractor {
	cfg: LlmProviderConfig,
	client: LlmClient,
}
impl LlmMetadataExtractor {
	pub fn new(cfg: LlmProviderConfig) -> Result<Self> {
		let client =
			LlmClient::new(&cfg).map_err(|err| Error::Provider { message: err.to_string() })?;

		Ok(Self { cfg, client })
	}
}
impl MetadataExtractor for LlmMetadataExtractor {
	fn extract<'a>(
		&'a self,
		text: &'a str,
		id: &'a str,
	) -> BoxFuture<'a, std::result::Result<ChunkMetadata, ExtractionError>> {
		Box::pin(async move {
			tracing::debug!(
				provider_id = %self.cfg.provider_id,
				model = %self.cfg.model,
				chunk_id = id,
				"Requesting metadata extraction."
			);

			let messages = extractor::build_messages(text);
			let raw = self.client.extract(&messages).await?;

			Ok(metadata::decode_metadata(&raw, id, text))
		})
	}
}

/// Reranking entry point. Holds the validated config, the extractor and the shared cache.
///
/// Every call shares the cache; nothing else carries over between calls.
pub struct SiftService {
	pub cfg: RerankerConfig,
	pub extractor: Arc<dyn MetadataExtractor>,
	pub cache: Arc<ExtractionCache>,
}
impl SiftService {
	/// Fails with [`Error::Configuration`] when `cfg` does not validate.
	pub fn new(
		cfg: RerankerConfig,
		extractor: Arc<dyn MetadataExtractor>,
		cache: Arc<ExtractionCache>,
	) -> Result<Self> {
		sift_config::validate_reranker(&cfg)?;

		Ok(Self { cfg, extractor, cache })
	}
}
