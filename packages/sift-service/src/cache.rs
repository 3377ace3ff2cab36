use std::sync::{
	Arc,
	atomic::{AtomicU64, Ordering},
};

use dashmap::DashMap;

use sift_domain::{ChunkMetadata, text};

const FINGERPRINT_PREFIX_LEN: usize = 12;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FingerprintKind {
	Query,
	Chunk,
}
impl FingerprintKind {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Query => "query",
			Self::Chunk => "chunk",
		}
	}
}

/// Content hash of normalized text, namespaced by what the text is.
///
/// Query and chunk text never share an entry even when the strings are equal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 32]);
impl Fingerprint {
	pub fn new(kind: FingerprintKind, raw: &str) -> Self {
		let normalized = text::normalize_text(raw);
		let mut hasher = blake3::Hasher::new();

		hasher.update(kind.as_str().as_bytes());
		hasher.update(&[0]);
		hasher.update(normalized.as_bytes());

		Self(*hasher.finalize().as_bytes())
	}

	pub fn to_hex(&self) -> String {
		blake3::Hash::from(self.0).to_hex().to_string()
	}

	/// Short hex prefix for log fields.
	pub fn prefix(&self) -> String {
		let mut hex = self.to_hex();

		hex.truncate(FINGERPRINT_PREFIX_LEN);

		hex
	}
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
	pub entries: usize,
	pub hits: u64,
	pub misses: u64,
}

/// Process-wide extraction results, shared by every rerank call of one service.
///
/// Concurrent writers to the same fingerprint resolve last-write-wins. Entries are immutable once
/// stored and handed out behind `Arc`. Nothing is ever evicted; entries live as long as the cache.
#[derive(Debug, Default)]
pub struct ExtractionCache {
	entries: DashMap<Fingerprint, Arc<ChunkMetadata>>,
	hits: AtomicU64,
	misses: AtomicU64,
}
impl ExtractionCache {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn get(&self, fingerprint: &Fingerprint) -> Option<Arc<ChunkMetadata>> {
		let found = self.entries.get(fingerprint).map(|entry| Arc::clone(entry.value()));

		if found.is_some() {
			self.hits.fetch_add(1, Ordering::Relaxed);
		} else {
			self.misses.fetch_add(1, Ordering::Relaxed);
		}

		found
	}

	pub fn put(&self, fingerprint: Fingerprint, metadata: ChunkMetadata) -> Arc<ChunkMetadata> {
		let metadata = Arc::new(metadata);

		self.entries.insert(fingerprint, Arc::clone(&metadata));

		metadata
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn stats(&self) -> CacheStats {
		CacheStats {
			entries: self.entries.len(),
			hits: self.hits.load(Ordering::Relaxed),
			misses: self.misses.load(Ordering::Relaxed),
		}
	}
}
