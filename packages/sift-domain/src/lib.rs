pub mod metadata;
pub mod retrieval;
pub mod text;
pub mod time_serde;

pub use metadata::{
	ChunkMetadata, EntityLabel, ExtractedDate, ExtractedEntity, ExtractedKeyword, SentimentInfo,
	SentimentLabel, TopicInfo,
};
pub use retrieval::{RetrievalResult, ScoreComponent};
