use rand::Rng;

use super::corpus::Corpus;
use super::formatter;
use super::token::{self, NOT_FOUND_TEXT};

/// Samples the weighted random walk over a corpus and assembles the
/// sampled tokens into paragraphs.
///
/// # Responsibilities
/// - Seed the generation window with uniformly drawn tokens
/// - Blend successor evidence across all active lookback distances
/// - Apply capitalization and paragraph-splitting policy
///
/// # Invariants
/// - The window always holds `corpus.active_order()` token texts,
///   most recent first
/// - Generation is single-threaded: every step depends on the window
///   mutated by the previous one
pub struct StoryWriter<'a> {
	corpus: &'a Corpus,
	target_sentences_per_paragraph: usize,
	ignore_punctuation: bool,
	window: Vec<String>,
}

impl<'a> StoryWriter<'a> {
	pub fn new(corpus: &'a Corpus) -> Self {
		Self {
			corpus,
			target_sentences_per_paragraph: 10,
			ignore_punctuation: false,
			window: Vec::new(),
		}
	}

	/// Number of sentence-ending marks after which the current
	/// paragraph is closed.
	///
	/// # Errors
	/// Returns an error if `target` is zero.
	pub fn set_target_sentences_per_paragraph(&mut self, target: usize) -> Result<(), String> {
		if target < 1 {
			return Err("Target sentences per paragraph must be >= 1".to_owned());
		}
		self.target_sentences_per_paragraph = target;
		Ok(())
	}

	/// When enabled, sentence-ending marks take part in the
	/// higher-order reinforcement, which lets them cluster together.
	pub fn set_ignore_punctuation(&mut self, ignore: bool) {
		self.ignore_punctuation = ignore;
	}

	/// Seeds every window slot independently with a uniformly drawn
	/// token, deliberately decorrelating the initial lookback slots.
	/// An empty corpus seeds with sentinels.
	pub fn seed(&mut self) {
		self.window = (0..self.corpus.active_order())
			.map(|_| {
				self.corpus
					.random_token()
					.unwrap_or_else(|| NOT_FOUND_TEXT.to_owned())
			})
			.collect();
	}

	/// Samples the next token of the walk.
	///
	/// The candidate multiset starts from the distance-0 successors of
	/// the most recent token, one copy per recorded count. Every deeper
	/// lookback slot then reinforces, never introduces, candidates it
	/// also recorded, so higher-order evidence boosts the draw without
	/// widening it. Sentence-ending candidates are not reinforced
	/// unless punctuation-ignoring is on.
	///
	/// An empty candidate list falls back to the sentinel token, which
	/// keeps being returned until the window shifts it out.
	pub fn next(&mut self) -> String {
		let immediate = self.corpus.successor_counts(&self.window[0], 0);

		let mut word_list: Vec<&String> = Vec::new();
		for (candidate, count) in &immediate {
			for _ in 0..*count {
				word_list.push(candidate);
			}
		}

		for distance in 1..self.corpus.active_order() {
			let table = self.corpus.successor_counts(&self.window[distance], distance);
			if table.is_empty() {
				continue;
			}
			let mut reinforced: Vec<&String> = Vec::new();
			for candidate in immediate.keys() {
				if !self.ignore_punctuation && token::is_sentence_end(candidate) {
					continue;
				}
				if let Some(boost) = table.get(candidate) {
					for _ in 0..*boost {
						reinforced.push(candidate);
					}
				}
			}
			word_list.append(&mut reinforced);
		}

		let chosen = if word_list.is_empty() {
			NOT_FOUND_TEXT.to_owned()
		} else {
			word_list[rand::rng().random_range(0..word_list.len())].clone()
		};

		self.window.rotate_right(1);
		self.window[0] = chosen.clone();
		chosen
	}

	/// Emits tokens until `word_count` words have been produced and
	/// splits them into paragraphs.
	///
	/// Output rules:
	/// - A token is capitalized when the token two positions back was a
	///   sentence-ending mark.
	/// - Punctuation never advances the word counter.
	/// - A paragraph closes once the sentence counter reaches the
	///   target; the very first closed paragraph is warm-up and is
	///   dropped, the final partial paragraph is always kept.
	pub fn generate_story(&mut self, word_count: usize) -> Vec<String> {
		self.seed();

		let mut paragraphs: Vec<String> = Vec::new();
		let mut paragraph: Vec<String> = Vec::new();
		let mut sentence_count = 0;
		let mut words = 0;
		let mut warmup_discarded = false;
		let mut previous = NOT_FOUND_TEXT.to_owned();
		let mut before_previous = NOT_FOUND_TEXT.to_owned();

		while words < word_count {
			let text = self.next();

			if token::is_sentence_end(&before_previous) {
				paragraph.push(formatter::capitalize(&text));
			} else {
				paragraph.push(text.clone());
			}

			if !token::is_punctuation_mark(&text) {
				words += 1;
			}

			if token::is_sentence_end(&text) {
				sentence_count += 1;
				if sentence_count >= self.target_sentences_per_paragraph {
					if warmup_discarded {
						paragraphs.push(paragraph.join(" "));
					} else {
						warmup_discarded = true;
					}
					paragraph.clear();
					sentence_count = 0;
				}
			}

			before_previous = previous;
			previous = text;
		}

		if !paragraph.is_empty() {
			paragraphs.push(paragraph.join(" "));
		}

		paragraphs
	}
}
