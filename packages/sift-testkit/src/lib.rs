//! Test doubles and fixture builders for exercising the reranker without a network.

use std::{
	collections::HashMap,
	sync::{
		Mutex,
		atomic::{AtomicUsize, Ordering},
	},
	time::Duration,
};

use time::OffsetDateTime;

use sift_domain::{
	ChunkMetadata, EntityLabel, ExtractedDate, ExtractedEntity, ExtractedKeyword, RetrievalResult,
	TopicInfo,
};
use sift_service::{BoxFuture, ExtractionError, MetadataExtractor};

enum Scripted {
	Metadata(ChunkMetadata),
	Failure(ExtractionError),
}

/// [`MetadataExtractor`] answering from a per-text script.
///
/// Unscripted texts yield empty metadata. Every call is counted, and the highest number of calls
/// in flight at once is tracked so tests can assert the concurrency ceiling.
#[derive(Default)]
pub struct ScriptedExtractor {
	script: HashMap<String, Scripted>,
	delay: Option<Duration>,
	calls: AtomicUsize,
	in_flight: AtomicUsize,
	max_in_flight: AtomicUsize,
	called_ids: Mutex<Vec<String>>,
}
impl ScriptedExtractor {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_metadata(mut self, text: &str, metadata: ChunkMetadata) -> Self {
		self.script.insert(script_key(text), Scripted::Metadata(metadata));

		self
	}

	pub fn with_failure(mut self, text: &str, err: ExtractionError) -> Self {
		self.script.insert(script_key(text), Scripted::Failure(err));

		self
	}

	/// Every call sleeps for `delay` before answering.
	pub fn with_delay(mut self, delay: Duration) -> Self {
		self.delay = Some(delay);

		self
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}

	pub fn max_in_flight(&self) -> usize {
		self.max_in_flight.load(Ordering::SeqCst)
	}

	pub fn in_flight(&self) -> usize {
		self.in_flight.load(Ordering::SeqCst)
	}

	pub fn called_ids(&self) -> Vec<String> {
		self.called_ids.lock().unwrap_or_else(|err| err.into_inner()).clone()
	}

	fn answer(&self, text: &str, id: &str) -> Result<ChunkMetadata, ExtractionError> {
		match self.script.get(&script_key(text)) {
			Some(Scripted::Metadata(metadata)) => {
				let mut metadata = metadata.clone();

				metadata.chunk_id = id.to_string();

				Ok(metadata)
			},
			Some(Scripted::Failure(err)) => Err(err.clone()),
			None => Ok(ChunkMetadata::empty(id, text)),
		}
	}
}
impl MetadataExtractor for ScriptedExtractor {
	fn extract<'a>(
		&'a self,
		text: &'a str,
		id: &'a str,
	) -> BoxFuture<'a, Result<ChunkMetadata, ExtractionError>> {
		Box::pin(async move {
			self.calls.fetch_add(1, Ordering::SeqCst);
			self.called_ids.lock().unwrap_or_else(|err| err.into_inner()).push(id.to_string());

			let _guard = InFlightGuard::enter(&self.in_flight, &self.max_in_flight);

			if let Some(delay) = self.delay {
				tokio::time::sleep(delay).await;
			}

			self.answer(text, id)
		})
	}
}

/// Decrements the in-flight counter on drop, including when the call is cancelled.
struct InFlightGuard<'a> {
	in_flight: &'a AtomicUsize,
}
impl<'a> InFlightGuard<'a> {
	fn enter(in_flight: &'a AtomicUsize, max_in_flight: &AtomicUsize) -> Self {
		let current = in_flight.fetch_add(1, Ordering::SeqCst) + 1;

		max_in_flight.fetch_max(current, Ordering::SeqCst);

		Self { in_flight }
	}
}
impl Drop for InFlightGuard<'_> {
	fn drop(&mut self) {
		self.in_flight.fetch_sub(1, Ordering::SeqCst);
	}
}

pub fn keyword(term: &str, score: f32, frequency: u32) -> ExtractedKeyword {
	ExtractedKeyword { term: term.to_string(), score, frequency, context: None }
}

pub fn entity(text: &str, label: EntityLabel, confidence: f32) -> ExtractedEntity {
	ExtractedEntity { text: text.to_string(), label, confidence, start_pos: None, end_pos: None }
}

pub fn topic(topic_id: &str, words: &[&str], probability: f32) -> TopicInfo {
	TopicInfo {
		topic_id: topic_id.to_string(),
		topic_words: words.iter().map(|word| word.to_string()).collect(),
		probability,
	}
}

pub fn date_days_ago(now: OffsetDateTime, days: i64) -> ExtractedDate {
	ExtractedDate {
		date: now - time::Duration::days(days),
		text: format!("{days} days ago"),
		confidence: 0.9,
		date_type: "publication".to_string(),
		format: None,
	}
}

pub fn candidate(chunk_id: &str, content: &str, base_score: f32) -> RetrievalResult {
	RetrievalResult::new(chunk_id, content, base_score)
}

/// Empty metadata for `chunk_id`, ready for tests to fill in.
pub fn metadata_for(chunk_id: &str, text: &str) -> ChunkMetadata {
	ChunkMetadata::empty(chunk_id, text)
}

fn script_key(text: &str) -> String {
	text.trim().to_string()
}
