use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Text identity of the sentinel "not found" token.
///
/// The sentinel seeds empty windows and absorbs transitions out of
/// tokens that have no recorded successors.
pub const NOT_FOUND_TEXT: &str = "/dev/erg";

/// Minimum successor-table width of the sentinel token, so that early
/// ingestion never indexes past its tables whatever the model order is.
const SENTINEL_TABLE_WIDTH: usize = 256;

/// The fixed set of recognized punctuation marks.
pub const PUNCTUATION_MARKS: [&str; 5] = [",", ".", "!", "?", ";"];

/// Marks that terminate a sentence for paragraph and sentence-length
/// bookkeeping.
pub const SENTENCE_ENDS: [&str; 4] = [".", "!", "?", "..."];

/// Returns true if `text` is one of the fixed punctuation marks.
pub fn is_punctuation_mark(text: &str) -> bool {
	PUNCTUATION_MARKS.contains(&text)
}

/// Returns true if `text` terminates a sentence (`.`, `!`, `?` or `...`).
pub fn is_sentence_end(text: &str) -> bool {
	SENTENCE_ENDS.contains(&text)
}

/// Structural test distinguishing a markup tag from an ordinary token.
pub fn is_tag_shaped(text: &str) -> bool {
	text.len() > 1 && text.starts_with('<') && text.ends_with('>')
}

/// Kind-specific payload of a token.
///
/// The ingestion and generation logic dispatches on the variant, so the
/// word / punctuation / tag distinction is a tagged enum rather than a
/// type hierarchy.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum TokenKind {
	/// An ordinary word.
	Word,
	/// One of the fixed punctuation marks. `sentence_lengths` records,
	/// for each sentence that ended with this mark, how many words the
	/// sentence contained.
	Punctuation { sentence_lengths: Vec<usize> },
	/// A markup tag. `params` records the attribute strings observed
	/// between the tag delimiters, one entry per occurrence.
	Tag { params: Vec<String> },
}

/// A unique word, punctuation mark or markup tag and its statistics.
///
/// # Responsibilities
/// - Accumulate successor occurrences at every lookback distance
/// - Track how many times the token itself was ingested
/// - Carry kind-specific history (sentence lengths, tag parameters)
///
/// # Invariants
/// - `text` is normalized (lower-cased) and unique within a corpus
/// - `successors.len()` equals the configured model order (the sentinel
///   keeps a wider table so it can be indexed at any distance)
/// - Every recorded successor count is >= 1
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Token {
	/// Normalized text, the unique key within a corpus.
	text: String,

	/// Number of times this token was ingested.
	occurrences: usize,

	/// One successor map per lookback distance. `successors[0]` counts
	/// tokens observed immediately after this one, `successors[d]`
	/// tokens observed `d + 1` positions after it.
	successors: Vec<HashMap<String, usize>>,

	/// Kind-specific payload.
	kind: TokenKind,
}

impl Token {
	/// Creates a new token with empty successor tables for the given
	/// model order. The occurrence count starts at zero and is bumped
	/// by the corpus when the token is folded.
	pub fn new(text: &str, order: usize, kind: TokenKind) -> Self {
		Self {
			text: text.to_owned(),
			occurrences: 0,
			successors: vec![HashMap::new(); order],
			kind,
		}
	}

	/// Creates the sentinel not-found token.
	///
	/// Its tables are at least `SENTINEL_TABLE_WIDTH` wide so a freshly
	/// seeded window can be indexed at any distance.
	pub fn not_found(order: usize) -> Self {
		Self::new(NOT_FOUND_TEXT, order.max(SENTINEL_TABLE_WIDTH), TokenKind::Word)
	}

	pub fn text(&self) -> &str {
		&self.text
	}

	pub fn occurrences(&self) -> usize {
		self.occurrences
	}

	pub fn kind(&self) -> &TokenKind {
		&self.kind
	}

	pub fn is_punctuation(&self) -> bool {
		matches!(self.kind, TokenKind::Punctuation { .. })
	}

	pub fn is_not_found(&self) -> bool {
		self.text == NOT_FOUND_TEXT
	}

	/// Records an occurrence of this token being ingested.
	pub fn increase_occurrences(&mut self) {
		self.occurrences += 1;
	}

	/// Records that `next` was observed `distance + 1` positions after
	/// this token.
	///
	/// - If the transition already exists, its count is increased.
	/// - Otherwise a new entry is created with a count of 1.
	pub fn add_successor(&mut self, next: &str, distance: usize) {
		if let Some(table) = self.successors.get_mut(distance) {
			*table.entry(next.to_owned()).or_insert(0) += 1;
		}
	}

	/// Returns the successor map for a lookback distance, or `None` if
	/// the distance exceeds the current table width.
	pub fn successors_at(&self, distance: usize) -> Option<&HashMap<String, usize>> {
		self.successors.get(distance)
	}

	/// Discards all successor tables and reallocates them for a new
	/// model order. Counts are lost, not migrated.
	pub fn resize_tables(&mut self, order: usize) {
		let width = if self.is_not_found() { order.max(SENTINEL_TABLE_WIDTH) } else { order };
		self.successors = vec![HashMap::new(); width];
	}

	/// Records the word count of a sentence that ended with this mark.
	///
	/// No-op for non-punctuation tokens.
	pub fn record_sentence_length(&mut self, length: usize) {
		if let TokenKind::Punctuation { sentence_lengths } = &mut self.kind {
			sentence_lengths.push(length);
		}
	}

	/// Returns the recorded sentence-length history of a punctuation
	/// mark, or `None` for other kinds.
	pub fn sentence_lengths(&self) -> Option<&[usize]> {
		match &self.kind {
			TokenKind::Punctuation { sentence_lengths } => Some(sentence_lengths),
			_ => None,
		}
	}

	/// Mean word count of the sentences that ended with this mark.
	///
	/// # Errors
	/// Returns an error if the token is not punctuation or if no
	/// sentence has been recorded yet (no data, rather than a division
	/// by zero).
	pub fn average_sentence_length(&self) -> Result<usize, String> {
		match &self.kind {
			TokenKind::Punctuation { sentence_lengths } => {
				if sentence_lengths.is_empty() {
					return Err(format!("No sentence data recorded for '{}'", self.text));
				}
				Ok(sentence_lengths.iter().sum::<usize>() / sentence_lengths.len())
			}
			_ => Err(format!("'{}' is not a punctuation mark", self.text)),
		}
	}

	/// Records an attribute string observed inside this tag.
	///
	/// No-op for non-tag tokens.
	pub fn record_params(&mut self, params: &str) {
		if let TokenKind::Tag { params: recorded } = &mut self.kind {
			recorded.push(params.to_owned());
		}
	}
}
