pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Failed to read sift config {}.", path.display())]
	ReadConfig { path: std::path::PathBuf, source: std::io::Error },
	#[error("Failed to parse sift config {}: {source}", path.display())]
	ParseConfig { path: std::path::PathBuf, source: toml::de::Error },
	#[error("{message}")]
	Validation { message: String },
}
