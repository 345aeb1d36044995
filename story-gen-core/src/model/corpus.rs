use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::story_input::InputFormat;
use super::token::{self, NOT_FOUND_TEXT, Token, TokenKind};

/// Sliding window of the last `order` ingested tokens, most recent
/// first, plus the running word counter used for sentence-length
/// bookkeeping. Guarded by a single mutex so concurrent folds are
/// serialized.
#[derive(Debug)]
struct WindowState {
	last: Vec<String>,
	words_since_break: usize,
}

/// Serialized form of a corpus: the model order followed by the token
/// records in insertion order. The order is decoded first, before any
/// token, since token structure depends on it.
#[derive(Serialize, Deserialize)]
struct CorpusArchive {
	order: usize,
	tokens: Vec<Token>,
}

/// The dictionary: owns the token set, the ingestion window and the
/// logic that folds newly observed tokens into the statistics.
///
/// # Responsibilities
/// - Atomic get-or-create of tokens keyed by normalized text
/// - Folding each observed token into all `order` transition tables
/// - Sentence-length bookkeeping for punctuation marks
/// - Order reconfiguration and postcard persistence
///
/// # Invariants
/// - `active_order <= order` at all times
/// - `successors[d]` of any token only holds entries observed `d + 1`
///   positions after it since the last order change
/// - The sentinel token lives in the token set but never in the
///   registry, so uniform sampling can not pick it
#[derive(Debug)]
pub struct Corpus {
	/// Number of lookback positions tracked during ingestion.
	order: usize,

	/// Number of lookback positions used during generation. Can only
	/// be lowered below `order`, never raised.
	active_order: usize,

	/// Input classification mode (markup enables tag tokens).
	format: InputFormat,

	/// Token set keyed by normalized text. Shard locking serializes
	/// concurrent mutation of a single token.
	tokens: DashMap<String, Token>,

	/// Insertion-ordered token texts, for index-based uniform sampling.
	registry: Mutex<Vec<String>>,

	/// Ingestion window and sentence counter.
	window: Mutex<WindowState>,

	/// Total number of folded tokens, used to measure source yield.
	folded: AtomicUsize,
}

impl Corpus {
	/// Creates an empty corpus of the given model order.
	///
	/// # Errors
	/// Returns an error if `order` is zero.
	pub fn new(order: usize, format: InputFormat) -> Result<Self, String> {
		if order < 1 {
			return Err("Model order must be >= 1".to_owned());
		}

		let tokens = DashMap::new();
		tokens.insert(NOT_FOUND_TEXT.to_owned(), Token::not_found(order));

		Ok(Self {
			order,
			active_order: order,
			format,
			tokens,
			registry: Mutex::new(Vec::new()),
			window: Mutex::new(WindowState {
				last: vec![NOT_FOUND_TEXT.to_owned(); order],
				words_since_break: 0,
			}),
			folded: AtomicUsize::new(0),
		})
	}

	/// Model order used during ingestion.
	pub fn order(&self) -> usize {
		self.order
	}

	/// Model order used during generation.
	pub fn active_order(&self) -> usize {
		self.active_order
	}

	/// Input classification mode of this corpus.
	pub fn format(&self) -> InputFormat {
		self.format
	}

	/// Number of distinct tokens (the sentinel excluded).
	pub fn len(&self) -> usize {
		self.registry.lock().expect("registry lock poisoned").len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Total number of tokens folded into this corpus.
	pub fn folded_count(&self) -> usize {
		self.folded.load(Ordering::Relaxed)
	}

	/// Splits a raw markup tag into its canonical key (`<name>`) and
	/// the attribute string between the delimiters.
	fn tag_parts(raw: &str) -> Option<(String, String)> {
		if !token::is_tag_shaped(raw) {
			return None;
		}
		let inner = &raw[1..raw.len() - 1];
		let mut parts = inner.split_whitespace();
		let name = parts.next()?;
		let params = parts.collect::<Vec<_>>().join(" ");
		Some((format!("<{}>", name), params))
	}

	/// Canonical token key for a raw text, plus the attribute string
	/// when the text is a markup tag and the corpus is in markup mode.
	fn canonical(&self, raw: &str) -> (String, Option<String>) {
		if self.format == InputFormat::Markup {
			if let Some((key, params)) = Self::tag_parts(raw) {
				return (key, Some(params));
			}
		}
		(raw.to_owned(), None)
	}

	/// Creates and registers a token under `key` if none exists yet.
	///
	/// Classification happens here: punctuation marks become
	/// punctuation tokens, tag-shaped texts become tag tokens in markup
	/// mode, everything else is a plain word. The create-then-insert is
	/// atomic, so two concurrent calls for the same text never produce
	/// duplicate tokens.
	fn ensure_token(&self, key: &str, is_tag: bool) {
		match self.tokens.entry(key.to_owned()) {
			Entry::Occupied(_) => {}
			Entry::Vacant(vacant) => {
				let kind = if token::is_punctuation_mark(key) {
					TokenKind::Punctuation { sentence_lengths: Vec::new() }
				} else if is_tag {
					TokenKind::Tag { params: Vec::new() }
				} else {
					TokenKind::Word
				};
				vacant.insert(Token::new(key, self.order, kind));
				self.registry
					.lock()
					.expect("registry lock poisoned")
					.push(key.to_owned());
			}
		}
	}

	/// Returns the canonical key for `raw`, creating and registering a
	/// new token if none exists yet.
	pub fn lookup(&self, raw: &str) -> String {
		let (key, params) = self.canonical(raw);
		self.ensure_token(&key, params.is_some());
		key
	}

	/// Folds one observed token into the model.
	///
	/// 1. Resolves `raw` to a token, creating it if new.
	/// 2. Credits the new token to `successors[d]` of every window
	///    slot, so a mark's influence reaches up to `order` predecessors.
	/// 3. Shifts the window, most recent first.
	/// 4. Bumps the occurrence count and, for punctuation, records the
	///    word count of the sentence that just ended.
	///
	/// Safe to call from several ingestion workers at once: the window
	/// mutex serializes the statistics update.
	pub fn fold(&self, raw: &str) {
		let (key, params) = self.canonical(raw);
		self.ensure_token(&key, params.is_some());

		let mut window = self.window.lock().expect("window lock poisoned");

		for distance in (0..self.order).rev() {
			let predecessor = window.last[distance].clone();
			// Window slots still holding the sentinel are not real
			// observations; the sentinel stays successor-free so dead
			// ends during generation keep falling back to it.
			if predecessor == NOT_FOUND_TEXT {
				continue;
			}
			if let Some(mut token) = self.tokens.get_mut(&predecessor) {
				token.add_successor(&key, distance);
			}
		}

		window.last.rotate_right(1);
		window.last[0] = key.clone();

		let mut is_punctuation = false;
		if let Some(mut token) = self.tokens.get_mut(&key) {
			token.increase_occurrences();
			is_punctuation = token.is_punctuation();
			if is_punctuation {
				let length = window.words_since_break;
				token.record_sentence_length(length);
			}
			if let Some(params) = &params {
				if !params.is_empty() {
					token.record_params(params);
				}
			}
		}

		if is_punctuation {
			window.words_since_break = 0;
		} else {
			window.words_since_break += 1;
		}

		self.folded.fetch_add(1, Ordering::Relaxed);
	}

	/// Token text at a registry index, for index-based uniform sampling.
	pub fn token_at(&self, index: usize) -> Option<String> {
		self.registry
			.lock()
			.expect("registry lock poisoned")
			.get(index)
			.cloned()
	}

	/// Draws a token uniformly at random from the whole corpus.
	///
	/// Returns `None` on an empty corpus.
	pub fn random_token(&self) -> Option<String> {
		let size = self.len();
		if size == 0 {
			return None;
		}
		self.token_at(rand::rng().random_range(0..size))
	}

	pub fn contains(&self, text: &str) -> bool {
		self.tokens.contains_key(text)
	}

	/// Occurrence count of a token, zero if unknown.
	pub fn occurrences(&self, text: &str) -> usize {
		self.tokens.get(text).map(|t| t.occurrences()).unwrap_or(0)
	}

	/// Snapshot of a token's successor map at a lookback distance.
	///
	/// Returns an empty map for unknown tokens or distances, so the
	/// generator can treat every slot uniformly.
	pub fn successor_counts(&self, text: &str, distance: usize) -> HashMap<String, usize> {
		self.tokens
			.get(text)
			.and_then(|t| t.successors_at(distance).cloned())
			.unwrap_or_default()
	}

	/// Sentence-length history of a punctuation mark.
	pub fn sentence_lengths(&self, text: &str) -> Option<Vec<usize>> {
		self.tokens
			.get(text)
			.and_then(|t| t.sentence_lengths().map(<[usize]>::to_vec))
	}

	/// Mean sentence length recorded for a punctuation mark.
	///
	/// # Errors
	/// Returns an error for unknown tokens, non-punctuation tokens and
	/// marks with no recorded history.
	pub fn average_sentence_length(&self, text: &str) -> Result<usize, String> {
		match self.tokens.get(text) {
			Some(token) => token.average_sentence_length(),
			None => Err(format!("Unknown token '{}'", text)),
		}
	}

	/// Attribute strings recorded for a markup tag.
	pub fn tag_params(&self, text: &str) -> Option<Vec<String>> {
		self.tokens.get(text).and_then(|t| match t.kind() {
			TokenKind::Tag { params } => Some(params.clone()),
			_ => None,
		})
	}

	/// Reseeds the ingestion window with sentinels and resets the
	/// sentence counter, so the next ingestion run starts from a clean
	/// slate instead of chaining onto the previous source's tail.
	pub fn regenerate_window(&self) {
		self.reseed_window();
	}

	/// Reseeds the window with sentinels and resets the sentence
	/// counter.
	fn reseed_window(&self) {
		let mut window = self.window.lock().expect("window lock poisoned");
		window.last = vec![NOT_FOUND_TEXT.to_owned(); self.order];
		window.words_since_break = 0;
	}

	/// Reconfigures the model order before ingestion.
	///
	/// Every token's successor tables are discarded and reallocated
	/// (counts are lost, not migrated) and the window is reseeded.
	///
	/// # Errors
	/// Returns an error if `order` is zero.
	pub fn set_order(&mut self, order: usize) -> Result<(), String> {
		if order < 1 {
			return Err("Model order must be >= 1".to_owned());
		}

		self.order = order;
		self.active_order = order;

		for mut entry in self.tokens.iter_mut() {
			entry.resize_tables(order);
		}

		self.reseed_window();
		Ok(())
	}

	/// Lowers the order used during generation.
	///
	/// A request to raise the order above what was ingested, or an
	/// order of zero, is silently ignored so already-recorded
	/// transition data stays valid. Downgrading only reseeds the
	/// window; recorded tables at higher distances are kept, unused.
	pub fn limit_order(&mut self, order: usize) {
		if order == 0 || order > self.order {
			return;
		}
		self.active_order = order;
		self.reseed_window();
	}

	/// Persists the corpus with postcard: the order first, then every
	/// token record in insertion order. The sentinel is not persisted;
	/// it is rebuilt on load.
	pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
		let archive = {
			let registry = self.registry.lock().expect("registry lock poisoned");
			let mut tokens = Vec::with_capacity(registry.len());
			for text in registry.iter() {
				if let Some(token) = self.tokens.get(text) {
					tokens.push(token.clone());
				}
			}
			CorpusArchive { order: self.order, tokens }
		};

		let bytes = postcard::to_stdvec(&archive)?;
		std::fs::write(path, bytes)?;
		Ok(())
	}

	/// Loads a corpus persisted by [`Corpus::save`].
	///
	/// The order is reconstructed before any token is deserialized.
	/// The window starts reseeded with sentinels.
	pub fn load<P: AsRef<Path>>(
		path: P,
		format: InputFormat,
	) -> Result<Self, Box<dyn std::error::Error>> {
		let bytes = std::fs::read(path)?;
		let archive: CorpusArchive = postcard::from_bytes(&bytes)?;

		let corpus = Self::new(archive.order, format)?;
		{
			let mut registry = corpus.registry.lock().expect("registry lock poisoned");
			for token in archive.tokens {
				registry.push(token.text().to_owned());
				corpus.tokens.insert(token.text().to_owned(), token);
			}
		}
		Ok(corpus)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn fold_all(corpus: &Corpus, tokens: &[&str]) {
		for token in tokens {
			corpus.fold(token);
		}
	}

	const CAT_DOG: [&str; 8] = ["the", "cat", "sat", ".", "the", "dog", "ran", "."];

	#[test]
	fn order_one_scenario() {
		let corpus = Corpus::new(1, InputFormat::Plaintext).unwrap();
		fold_all(&corpus, &CAT_DOG);

		let after_the = corpus.successor_counts("the", 0);
		assert_eq!(after_the.get("cat"), Some(&1));
		assert_eq!(after_the.get("dog"), Some(&1));
		assert_eq!(after_the.len(), 2);

		assert_eq!(corpus.sentence_lengths("."), Some(vec![3, 3]));
		assert_eq!(corpus.average_sentence_length("."), Ok(3));
		assert_eq!(corpus.occurrences("the"), 2);
		assert_eq!(corpus.folded_count(), 8);
	}

	#[test]
	fn distance_zero_mass_matches_observations() {
		let corpus = Corpus::new(2, InputFormat::Plaintext).unwrap();
		fold_all(&corpus, &CAT_DOG);

		// "the" is followed by something twice, "." only once (nothing
		// comes after the final mark).
		let mass = |text: &str| corpus.successor_counts(text, 0).values().sum::<usize>();
		assert_eq!(mass("the"), 2);
		assert_eq!(mass("cat"), 1);
		assert_eq!(mass("."), 1);
	}

	#[test]
	fn punctuation_reaches_deeper_predecessors() {
		let corpus = Corpus::new(3, InputFormat::Plaintext).unwrap();
		fold_all(&corpus, &["the", "cat", "sat", "."]);

		// "." lands at distance 0 of "sat", 1 of "cat" and 2 of "the".
		assert_eq!(corpus.successor_counts("sat", 0).get("."), Some(&1));
		assert_eq!(corpus.successor_counts("cat", 1).get("."), Some(&1));
		assert_eq!(corpus.successor_counts("the", 2).get("."), Some(&1));
		assert!(corpus.successor_counts("the", 0).get(".").is_none());
	}

	#[test]
	fn double_ingestion_doubles_every_count() {
		let once = Corpus::new(2, InputFormat::Plaintext).unwrap();
		let twice = Corpus::new(2, InputFormat::Plaintext).unwrap();
		fold_all(&once, &CAT_DOG);
		fold_all(&twice, &CAT_DOG);
		// A clean window between passes keeps the second pass from
		// chaining the trailing "." onto the leading "the".
		twice.regenerate_window();
		fold_all(&twice, &CAT_DOG);

		for text in CAT_DOG {
			assert_eq!(twice.occurrences(text), 2 * once.occurrences(text));
			for distance in 0..2 {
				let single = once.successor_counts(text, distance);
				let double = twice.successor_counts(text, distance);
				assert_eq!(single.len(), double.len());
				for (successor, count) in &single {
					assert_eq!(double.get(successor), Some(&(2 * count)));
				}
			}
		}
	}

	#[test]
	fn set_order_discards_counts() {
		let mut corpus = Corpus::new(2, InputFormat::Plaintext).unwrap();
		fold_all(&corpus, &CAT_DOG);
		corpus.set_order(3).unwrap();

		assert!(corpus.successor_counts("the", 0).is_empty());
		assert_eq!(corpus.order(), 3);
		assert_eq!(corpus.active_order(), 3);
		// Tokens themselves survive the reconfiguration.
		assert!(corpus.contains("the"));
	}

	#[test]
	fn limit_order_never_raises() {
		let mut corpus = Corpus::new(3, InputFormat::Plaintext).unwrap();
		fold_all(&corpus, &CAT_DOG);

		corpus.limit_order(5);
		assert_eq!(corpus.active_order(), 3);

		corpus.limit_order(0);
		assert_eq!(corpus.active_order(), 3);

		corpus.limit_order(2);
		assert_eq!(corpus.active_order(), 2);
		// Recorded higher-distance tables are kept, just unused.
		assert_eq!(corpus.successor_counts("the", 2).len(), 1);
	}

	#[test]
	fn zero_order_rejected() {
		assert!(Corpus::new(0, InputFormat::Plaintext).is_err());
		let mut corpus = Corpus::new(1, InputFormat::Plaintext).unwrap();
		assert!(corpus.set_order(0).is_err());
	}

	#[test]
	fn markup_tags_are_merged_under_their_name() {
		let corpus = Corpus::new(1, InputFormat::Markup).unwrap();
		corpus.fold("<a href=\"x\">");
		corpus.fold("<a href=\"y\">");
		corpus.fold("</a>");

		assert_eq!(corpus.occurrences("<a>"), 2);
		assert_eq!(
			corpus.tag_params("<a>"),
			Some(vec!["href=\"x\"".to_owned(), "href=\"y\"".to_owned()])
		);
		assert_eq!(corpus.occurrences("</a>"), 1);
	}

	#[test]
	fn plaintext_mode_keeps_tags_as_words() {
		let corpus = Corpus::new(1, InputFormat::Plaintext).unwrap();
		corpus.fold("<a href=\"x\">");
		assert_eq!(corpus.occurrences("<a href=\"x\">"), 1);
		assert!(corpus.tag_params("<a href=\"x\">").is_none());
	}

	#[test]
	fn sentinel_is_hidden_from_sampling() {
		let corpus = Corpus::new(1, InputFormat::Plaintext).unwrap();
		assert!(corpus.random_token().is_none());
		corpus.fold("only");
		assert_eq!(corpus.random_token(), Some("only".to_owned()));
		assert_eq!(corpus.len(), 1);
	}
}
