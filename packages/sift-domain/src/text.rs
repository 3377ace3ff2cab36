use std::collections::HashSet;

use unicode_normalization::UnicodeNormalization;
use unicode_segmentation::UnicodeSegmentation;

/// NFKC-normalizes `text`, collapses whitespace runs to one space and trims the ends.
pub fn normalize_text(text: &str) -> String {
	let composed: String = text.nfkc().collect();
	let mut out = String::with_capacity(composed.len());

	for word in composed.split_whitespace() {
		if !out.is_empty() {
			out.push(' ');
		}

		out.push_str(word);
	}

	out
}

/// Lower-cased ASCII alphanumeric terms of at least two characters, deduplicated in first-seen
/// order.
pub fn tokenize_terms(text: &str, max_terms: usize) -> Vec<String> {
	let mut normalized = String::with_capacity(text.len());

	for ch in text.chars() {
		if ch.is_ascii_alphanumeric() {
			normalized.push(ch.to_ascii_lowercase());
		} else {
			normalized.push(' ');
		}
	}

	let mut out = Vec::new();
	let mut seen = HashSet::new();

	for token in normalized.split_whitespace() {
		if out.len() >= max_terms {
			break;
		}
		if token.len() < 2 {
			continue;
		}
		if seen.insert(token) {
			out.push(token.to_string());
		}
	}

	out
}

/// Jaccard similarity of the grapheme sets of two strings.
pub fn char_jaccard(lhs: &str, rhs: &str) -> f32 {
	let lhs: HashSet<&str> = lhs.graphemes(true).collect();
	let rhs: HashSet<&str> = rhs.graphemes(true).collect();

	if lhs.is_empty() && rhs.is_empty() {
		return 0.0;
	}

	let intersection = lhs.intersection(&rhs).count();
	let union = lhs.union(&rhs).count();

	intersection as f32 / union as f32
}

/// Jaccard similarity of two case-folded word lists.
pub fn word_overlap(lhs: &[String], rhs: &[String]) -> f32 {
	let lhs: HashSet<String> =
		lhs.iter().map(|word| word.trim().to_lowercase()).filter(|word| !word.is_empty()).collect();
	let rhs: HashSet<String> =
		rhs.iter().map(|word| word.trim().to_lowercase()).filter(|word| !word.is_empty()).collect();

	if lhs.is_empty() || rhs.is_empty() {
		return 0.0;
	}

	let intersection = lhs.intersection(&rhs).count();
	let union = lhs.union(&rhs).count();

	intersection as f32 / union as f32
}

pub fn grapheme_len(text: &str) -> usize {
	text.graphemes(true).count()
}

/// Truncates to at most `max_chars` characters without splitting a code point.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
	match text.char_indices().nth(max_chars) {
		Some((idx, _)) => &text[..idx],
		None => text,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn normalize_collapses_whitespace_and_compatibility_forms() {
		assert_eq!(normalize_text("  ﬁne \n\t tuning  "), "fine tuning");
	}

	#[test]
	fn tokenize_dedupes_and_respects_limit() {
		assert_eq!(tokenize_terms("Rust, rust & a Go!", 8), vec!["rust", "go"]);
		assert_eq!(tokenize_terms("one two three", 2), vec!["one", "two"]);
	}

	#[test]
	fn jaccard_of_identical_strings_is_one() {
		assert_eq!(char_jaccard("learn", "learn"), 1.0);
		assert_eq!(char_jaccard("", ""), 0.0);
		assert!(char_jaccard("learning", "learner") > 0.7);
	}

	#[test]
	fn word_overlap_ignores_case() {
		let lhs = vec!["Neural".to_string(), "network".to_string()];
		let rhs = vec!["neural".to_string(), "networks".to_string()];

		assert_eq!(word_overlap(&lhs, &rhs), 1.0 / 3.0);
	}

	#[test]
	fn truncate_respects_char_boundaries() {
		assert_eq!(truncate_chars("héllo", 2), "hé");
		assert_eq!(truncate_chars("hi", 10), "hi");
	}
}
