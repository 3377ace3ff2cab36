pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Extractor HTTP call failed: {0}")]
	Reqwest(#[from] reqwest::Error),
	#[error("Extractor payload is not valid JSON: {0}")]
	SerdeJson(#[from] serde_json::Error),
	#[error("Invalid header name: {0}")]
	InvalidHeaderName(#[from] reqwest::header::InvalidHeaderName),
	#[error("Invalid header value: {0}")]
	InvalidHeaderValue(#[from] reqwest::header::InvalidHeaderValue),
	#[error("Invalid extractor config: {message}")]
	InvalidConfig { message: String },
	#[error("Invalid extractor response: {message}")]
	InvalidResponse { message: String },
}
