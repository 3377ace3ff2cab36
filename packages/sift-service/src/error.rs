pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Configuration error: {message}")]
	Configuration { message: String },
	#[error("Provider error: {message}")]
	Provider { message: String },
}
impl From<sift_config::Error> for Error {
	fn from(err: sift_config::Error) -> Self {
		Self::Configuration { message: err.to_string() }
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExtractionErrorKind {
	/// The service answered, but not with a usable JSON object.
	MalformedResponse,
	/// The call never produced a response: connection, status, or timeout failure.
	Transport,
}
impl ExtractionErrorKind {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::MalformedResponse => "malformed_response",
			Self::Transport => "transport",
		}
	}
}

#[derive(Clone, Debug, thiserror::Error)]
#[error("Extraction failed ({}): {message}", kind.as_str())]
pub struct ExtractionError {
	pub kind: ExtractionErrorKind,
	pub message: String,
}
impl ExtractionError {
	pub fn malformed(message: impl Into<String>) -> Self {
		Self { kind: ExtractionErrorKind::MalformedResponse, message: message.into() }
	}

	pub fn transport(message: impl Into<String>) -> Self {
		Self { kind: ExtractionErrorKind::Transport, message: message.into() }
	}
}
impl From<sift_providers::Error> for ExtractionError {
	fn from(err: sift_providers::Error) -> Self {
		match err {
			sift_providers::Error::Reqwest(inner) if inner.is_decode() =>
				Self::malformed(inner.to_string()),
			sift_providers::Error::SerdeJson(inner) => Self::malformed(inner.to_string()),
			sift_providers::Error::InvalidResponse { message } => Self::malformed(message),
			other => Self::transport(other.to_string()),
		}
	}
}
