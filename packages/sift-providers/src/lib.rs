pub mod extractor;
pub mod metadata;

mod error;

pub use error::{Error, Result};

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName};
use serde_json::{Map, Value};

/// Bearer authorization plus the configured extra headers, sent with every extraction call.
pub fn auth_headers(api_key: &str, default_headers: &Map<String, Value>) -> Result<HeaderMap> {
	let mut headers = HeaderMap::with_capacity(default_headers.len() + 1);
	let bearer = format!("Bearer {}", api_key.trim());

	headers.insert(AUTHORIZATION, bearer.parse()?);

	for (name, value) in default_headers {
		let value = value.as_str().ok_or_else(|| Error::InvalidConfig {
			message: format!("Default header {name} must have a string value."),
		})?;

		headers.insert(HeaderName::from_bytes(name.trim().as_bytes())?, value.parse()?);
	}

	Ok(headers)
}
