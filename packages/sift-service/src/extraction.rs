//! Cache-aware extraction with a concurrency ceiling and a per-call deadline.

use std::{
	collections::HashMap,
	time::{Duration, Instant},
};

use futures::{StreamExt, stream};

use crate::{
	ExtractionError, ExtractionErrorKind, MetadataExtractor,
	cache::{ExtractionCache, Fingerprint, FingerprintKind},
};
use sift_domain::ChunkMetadata;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutcomeSource {
	Cache,
	Extracted,
	/// Extraction failed with the given kind and the empty metadata was substituted.
	Fallback(ExtractionErrorKind),
}

#[derive(Clone, Debug)]
pub struct ExtractionOutcome {
	pub id: String,
	pub metadata: ChunkMetadata,
	pub source: OutcomeSource,
}

struct PendingText {
	fingerprint: Fingerprint,
	text: String,
	/// Every `(id, text)` pair that normalized to `fingerprint`; the first one is extracted.
	requests: Vec<(String, String)>,
}

/// Runs a batch of extractions through one [`MetadataExtractor`].
///
/// At most `max_concurrent` external calls are in flight at once. Texts that normalize to the
/// same fingerprint within one batch share a single call. Dropping the returned future cancels
/// outstanding calls; results are only written to the cache after a call completes.
pub struct BoundedExtractor<'a> {
	extractor: &'a dyn MetadataExtractor,
	cache: Option<&'a ExtractionCache>,
	max_concurrent: usize,
	timeout: Duration,
}
impl<'a> BoundedExtractor<'a> {
	pub fn new(
		extractor: &'a dyn MetadataExtractor,
		cache: Option<&'a ExtractionCache>,
		max_concurrent: usize,
		timeout: Duration,
	) -> Self {
		Self { extractor, cache, max_concurrent: max_concurrent.max(1), timeout }
	}

	/// Extracts metadata for every `(id, text)` pair.
	///
	/// Outcomes come back in first-seen order of their text and one outcome exists per input id.
	/// Shared or cached metadata is rebound to each id and its own text length.
	/// Failures never escape: a failed item carries empty metadata and a
	/// [`OutcomeSource::Fallback`] source.
	pub async fn extract_all(
		&self,
		kind: FingerprintKind,
		items: Vec<(String, String)>,
	) -> Vec<ExtractionOutcome> {
		let mut pending: Vec<PendingText> = Vec::new();
		let mut slots: HashMap<Fingerprint, usize> = HashMap::new();

		for (id, text) in items {
			let fingerprint = Fingerprint::new(kind, &text);

			match slots.get(&fingerprint) {
				Some(&slot) => pending[slot].requests.push((id, text)),
				None => {
					slots.insert(fingerprint, pending.len());
					pending.push(PendingText {
						fingerprint,
						text: text.clone(),
						requests: vec![(id, text)],
					});
				},
			}
		}

		let mut resolved: Vec<(usize, PendingText, ChunkMetadata, OutcomeSource)> =
			stream::iter(pending.into_iter().enumerate())
				.map(|(slot, item)| async move {
					let (metadata, source) = self.resolve(kind, &item).await;

					(slot, item, metadata, source)
				})
				.buffer_unordered(self.max_concurrent)
				.collect()
				.await;

		resolved.sort_by_key(|(slot, ..)| *slot);

		let mut out = Vec::new();

		for (_, item, metadata, source) in resolved {
			for (id, text) in item.requests {
				let mut metadata = metadata.clone();

				metadata.rebind(id.as_str(), &text);

				out.push(ExtractionOutcome { id, metadata, source });
			}
		}

		out
	}

	/// Extracts a single text; see [`Self::extract_all`].
	pub async fn extract_one(&self, kind: FingerprintKind, id: &str, text: &str) -> ExtractionOutcome {
		let item = PendingText {
			fingerprint: Fingerprint::new(kind, text),
			text: text.to_string(),
			requests: vec![(id.to_string(), text.to_string())],
		};
		let (mut metadata, source) = self.resolve(kind, &item).await;

		metadata.rebind(id, text);

		ExtractionOutcome { id: id.to_string(), metadata, source }
	}

	async fn resolve(&self, kind: FingerprintKind, item: &PendingText) -> (ChunkMetadata, OutcomeSource) {
		let id = item.requests.first().map(|(id, _)| id.as_str()).unwrap_or_default();

		if let Some(cache) = self.cache {
			if let Some(hit) = cache.get(&item.fingerprint) {
				tracing::debug!(
					cache_kind = kind.as_str(),
					fingerprint_prefix = %item.fingerprint.prefix(),
					"Extraction cache hit."
				);

				return (ChunkMetadata::clone(&hit), OutcomeSource::Cache);
			}

			tracing::debug!(
				cache_kind = kind.as_str(),
				fingerprint_prefix = %item.fingerprint.prefix(),
				"Extraction cache miss."
			);
		}

		match self.call(&item.text, id).await {
			Ok(metadata) => {
				if let Some(cache) = self.cache {
					cache.put(item.fingerprint, metadata.clone());
				}

				(metadata, OutcomeSource::Extracted)
			},
			Err(err) => {
				tracing::warn!(
					chunk_id = id,
					error_kind = err.kind.as_str(),
					error = %err,
					"Metadata extraction failed. Using empty metadata."
				);

				(ChunkMetadata::empty(id, &item.text), OutcomeSource::Fallback(err.kind))
			},
		}
	}

	async fn call(&self, text: &str, id: &str) -> Result<ChunkMetadata, ExtractionError> {
		let started = Instant::now();
		let mut metadata = match tokio::time::timeout(self.timeout, self.extractor.extract(text, id)).await
		{
			Ok(result) => result?,
			Err(_) => {
				return Err(ExtractionError::transport(format!(
					"Extraction timed out after {} ms.",
					self.timeout.as_millis()
				)));
			},
		};

		metadata.processing_time_ms = started.elapsed().as_secs_f64() * 1_000.0;

		Ok(metadata)
	}
}
