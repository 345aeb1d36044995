use std::path::{Path, PathBuf};
use std::thread;

use crate::io;

use super::corpus::Corpus;
use super::story_input::{InputFormat, Source};

/// Inserts a separating space before each punctuation character the
/// tokenizer treats as its own token, and turns tabs into spaces.
///
/// Quotes and parentheses are isolated on both sides; the marks that
/// carry model statistics (`. , ? ! ;`) only need a space before them.
fn split_punctuation(line: &str) -> String {
	let mut out = String::with_capacity(line.len() * 2);
	for c in line.chars() {
		match c {
			'.' | ',' | '?' | '!' | ';' => {
				out.push(' ');
				out.push(c);
			}
			'"' | '(' | ')' => {
				out.push(' ');
				out.push(c);
				out.push(' ');
			}
			'\t' => out.push(' '),
			_ => out.push(c),
		}
	}
	out
}

/// Re-merges markup tags that the whitespace split broke apart.
///
/// A token opening with `<` but not closing with `>` buffers following
/// tokens until one closes the tag; the buffered run becomes a single
/// tag token. An unterminated tag is left unmerged, so the orphan
/// fragments are ingested as ordinary tokens.
fn merge_tags(tokens: Vec<String>) -> Vec<String> {
	let mut merged = Vec::with_capacity(tokens.len());
	let mut pending: Vec<String> = Vec::new();

	for token in tokens {
		if pending.is_empty() {
			if token.starts_with('<') && !token.ends_with('>') {
				pending.push(token);
			} else {
				merged.push(token);
			}
		} else {
			let closes = token.ends_with('>');
			pending.push(token);
			if closes {
				merged.push(pending.join(" "));
				pending.clear();
			}
		}
	}

	merged.append(&mut pending);
	merged
}

/// Splits a raw input line into the normalized (lower-cased) token
/// stream that gets folded into a corpus.
pub fn tokenize_line(line: &str, format: InputFormat) -> Vec<String> {
	let spaced = split_punctuation(line);
	let tokens: Vec<String> = spaced
		.split_whitespace()
		.map(str::to_lowercase)
		.collect();

	match format {
		InputFormat::Markup => merge_tags(tokens),
		InputFormat::Plaintext => tokens,
	}
}

/// Reads one source file and folds its token stream into a corpus.
///
/// With a token budget set, the source is re-read cyclically until the
/// budget is met, which is how weighted ingestion truncates or extends
/// a source's contribution.
pub struct SourceReader<'a> {
	corpus: &'a Corpus,
	path: PathBuf,
	limit: Option<usize>,
}

impl<'a> SourceReader<'a> {
	/// Reader that ingests the whole source once.
	pub fn new<P: AsRef<Path>>(corpus: &'a Corpus, path: P) -> Self {
		Self { corpus, path: path.as_ref().to_path_buf(), limit: None }
	}

	/// Reader that stops after contributing `limit` tokens, re-reading
	/// the source from the start as often as needed.
	pub fn with_limit<P: AsRef<Path>>(corpus: &'a Corpus, path: P, limit: usize) -> Self {
		Self { corpus, path: path.as_ref().to_path_buf(), limit: Some(limit) }
	}

	/// Runs the reader to completion and returns the number of tokens
	/// folded.
	///
	/// # Errors
	/// Returns an error if the source file can not be read. The error
	/// names the source, so batch callers can report it while other
	/// sources continue.
	pub fn run(&self) -> Result<usize, String> {
		let lines = io::read_file(&self.path)
			.map_err(|e| format!("Unable to read '{}': {}", self.path.display(), e))?;
		let format = self.corpus.format();

		let mut folded = 0;
		loop {
			let before = folded;

			for line in &lines {
				if line.is_empty() {
					continue;
				}
				for token in tokenize_line(line, format) {
					self.corpus.fold(&token);
					folded += 1;
					if let Some(limit) = self.limit {
						if folded >= limit {
							return Ok(folded);
						}
					}
				}
			}

			match self.limit {
				None => return Ok(folded),
				// A full pass yielded nothing, the budget can never be
				// met. Stop instead of spinning.
				Some(_) if folded == before => return Ok(folded),
				Some(_) => {}
			}
		}
	}
}

/// Ingests every source into the shared corpus.
///
/// Three modes, matching the scheduling model:
/// - `weighted`: strictly sequential. Each source is first measured
///   against a scratch corpus, then re-ingested truncated to
///   `largest_words * weight / largest_weight` tokens so its influence
///   is proportional to its declared weight. Sources with zero
///   measured yield are skipped.
/// - `threads > 1`: sources are dispatched to a bounded pool in
///   batches of `threads`, one worker per source; every batch is
///   joined before the next starts.
/// - otherwise: sequential full ingestion.
///
/// # Errors
/// A failing source never aborts its siblings; all per-source failures
/// are collected and reported together.
pub fn read_sources(
	corpus: &Corpus,
	sources: &[Source],
	threads: usize,
	weighted: bool,
) -> Result<(), String> {
	let mut failures: Vec<String> = Vec::new();

	if weighted {
		read_weighted(corpus, sources, &mut failures);
	} else if threads > 1 {
		for batch in sources.chunks(threads) {
			thread::scope(|scope| {
				let handles: Vec<_> = batch
					.iter()
					.map(|source| scope.spawn(move || SourceReader::new(corpus, &source.path).run()))
					.collect();
				for handle in handles {
					match handle.join() {
						Ok(Ok(_)) => {}
						Ok(Err(e)) => failures.push(e),
						Err(_) => failures.push("Ingestion worker panicked".to_owned()),
					}
				}
			});
		}
	} else {
		for source in sources {
			if let Err(e) = SourceReader::new(corpus, &source.path).run() {
				failures.push(e);
			}
		}
	}

	if failures.is_empty() {
		Ok(())
	} else {
		Err(failures.join("; "))
	}
}

/// Weighted sequential ingestion: measure every source's natural yield
/// against a scratch corpus, take the largest yield and its weight as
/// the baseline, then re-ingest each source truncated proportionally.
fn read_weighted(corpus: &Corpus, sources: &[Source], failures: &mut Vec<String>) {
	let mut yields = vec![0usize; sources.len()];

	for (index, source) in sources.iter().enumerate() {
		let scratch = match Corpus::new(corpus.order(), corpus.format()) {
			Ok(scratch) => scratch,
			Err(e) => {
				failures.push(e);
				continue;
			}
		};
		match SourceReader::new(&scratch, &source.path).run() {
			Ok(count) => yields[index] = count,
			Err(e) => failures.push(e),
		}
	}

	let mut largest_words = 0;
	let mut largest_weight = 0;
	for (index, source) in sources.iter().enumerate() {
		if yields[index] > largest_words {
			largest_words = yields[index];
			largest_weight = source.weight;
		}
	}
	if largest_words == 0 || largest_weight == 0 {
		return;
	}

	for (index, source) in sources.iter().enumerate() {
		// A zero-yield source could cycle forever against a positive
		// budget; it is skipped instead.
		if yields[index] == 0 {
			continue;
		}
		let budget = largest_words * source.weight / largest_weight;
		if budget == 0 {
			continue;
		}
		if let Err(e) = SourceReader::with_limit(corpus, &source.path, budget).run() {
			failures.push(e);
		}
	}
}

#[cfg(test)]
mod tests {
	use std::io::Write;

	use super::*;

	fn write_source(dir: &tempfile::TempDir, name: &str, contents: &str) -> PathBuf {
		let path = dir.path().join(name);
		let mut file = std::fs::File::create(&path).unwrap();
		file.write_all(contents.as_bytes()).unwrap();
		path
	}

	#[test]
	fn tokenizes_and_normalizes() {
		let tokens = tokenize_line("The cat sat. The dog ran.", InputFormat::Plaintext);
		assert_eq!(tokens, ["the", "cat", "sat", ".", "the", "dog", "ran", "."]);
	}

	#[test]
	fn collapses_whitespace_and_isolates_quotes() {
		let tokens = tokenize_line("\"Hello,\tworld\"  (really)", InputFormat::Plaintext);
		assert_eq!(tokens, ["\"", "hello", ",", "world", "\"", "(", "really", ")"]);
	}

	#[test]
	fn merges_split_tags_in_markup_mode() {
		let tokens = tokenize_line("before <a href=x> after", InputFormat::Markup);
		assert_eq!(tokens, ["before", "<a href=x>", "after"]);
	}

	#[test]
	fn unterminated_tag_stays_fragments() {
		let tokens = tokenize_line("before <a broken after", InputFormat::Markup);
		assert_eq!(tokens, ["before", "<a", "broken", "after"]);
	}

	#[test]
	fn plaintext_mode_never_merges_tags() {
		let tokens = tokenize_line("<a href=x>", InputFormat::Plaintext);
		assert_eq!(tokens, ["<a", "href=x>"]);
	}

	#[test]
	fn reader_counts_folded_tokens() {
		let dir = tempfile::tempdir().unwrap();
		let path = write_source(&dir, "cats.txt", "The cat sat. The dog ran.\n");
		let corpus = Corpus::new(1, InputFormat::Plaintext).unwrap();

		let folded = SourceReader::new(&corpus, &path).run().unwrap();
		assert_eq!(folded, 8);
		assert_eq!(corpus.folded_count(), 8);
	}

	#[test]
	fn limited_reader_cycles_until_budget_met() {
		let dir = tempfile::tempdir().unwrap();
		let path = write_source(&dir, "short.txt", "one two three\n");
		let corpus = Corpus::new(1, InputFormat::Plaintext).unwrap();

		let folded = SourceReader::with_limit(&corpus, &path, 8).run().unwrap();
		assert_eq!(folded, 8);
		// 8 tokens over a 3-token source: three occurrences of "one",
		// three of "two", two of "three".
		assert_eq!(corpus.occurrences("one"), 3);
		assert_eq!(corpus.occurrences("three"), 2);
	}

	#[test]
	fn limited_reader_bails_on_empty_source() {
		let dir = tempfile::tempdir().unwrap();
		let path = write_source(&dir, "empty.txt", "\n\n");
		let corpus = Corpus::new(1, InputFormat::Plaintext).unwrap();

		let folded = SourceReader::with_limit(&corpus, &path, 10).run().unwrap();
		assert_eq!(folded, 0);
	}

	#[test]
	fn missing_source_reports_but_spares_siblings() {
		let dir = tempfile::tempdir().unwrap();
		let good = write_source(&dir, "good.txt", "alpha beta\n");
		let sources = [
			Source::new(dir.path().join("missing.txt")),
			Source::new(&good),
		];
		let corpus = Corpus::new(1, InputFormat::Plaintext).unwrap();

		let result = read_sources(&corpus, &sources, 1, false);
		assert!(result.is_err());
		assert_eq!(corpus.occurrences("alpha"), 1);
	}

	#[test]
	fn batched_workers_share_one_corpus() {
		let dir = tempfile::tempdir().unwrap();
		let sources: Vec<Source> = (0..5)
			.map(|i| Source::new(write_source(&dir, &format!("s{}.txt", i), "alpha beta gamma\n")))
			.collect();
		let corpus = Corpus::new(2, InputFormat::Plaintext).unwrap();

		read_sources(&corpus, &sources, 2, false).unwrap();
		assert_eq!(corpus.folded_count(), 15);
		assert_eq!(corpus.occurrences("alpha"), 5);
	}

	#[test]
	fn weighted_ingestion_follows_declared_weights() {
		let dir = tempfile::tempdir().unwrap();
		// Raw sizes are deliberately inverted relative to the weights.
		let small = write_source(&dir, "small.txt", "aaa aaa aaa\n");
		let large = write_source(&dir, "large.txt", &"bbb ".repeat(12));
		let sources = [
			Source::with_weight(&large, 1),
			Source::with_weight(&small, 2),
		];
		let corpus = Corpus::new(1, InputFormat::Plaintext).unwrap();

		read_sources(&corpus, &sources, 1, true).unwrap();

		// Baseline: the large source (12 tokens, weight 1). Budgets:
		// large 12 * 1 / 1 = 12, small 12 * 2 / 1 = 24.
		assert_eq!(corpus.occurrences("bbb"), 12);
		assert_eq!(corpus.occurrences("aaa"), 24);
	}

	#[test]
	fn weighted_ingestion_skips_zero_yield_sources() {
		let dir = tempfile::tempdir().unwrap();
		let empty = write_source(&dir, "empty.txt", "\n");
		let full = write_source(&dir, "full.txt", "aaa bbb ccc\n");
		let sources = [Source::with_weight(&empty, 3), Source::new(&full)];
		let corpus = Corpus::new(1, InputFormat::Plaintext).unwrap();

		read_sources(&corpus, &sources, 1, true).unwrap();
		assert_eq!(corpus.folded_count(), 3);
	}
}
