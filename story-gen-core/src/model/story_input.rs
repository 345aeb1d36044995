use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Classification mode of ingested text.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputFormat {
	Plaintext,
	Markup,
}

/// Encoding of the generated story.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
	Plaintext,
	Html,
}

/// One ingestion source: a text file and its proportional weight.
#[derive(Clone, Debug)]
pub struct Source {
	pub path: PathBuf,
	pub weight: usize,
}

impl Source {
	/// Source with the default weight of 1.
	pub fn new<P: AsRef<Path>>(path: P) -> Self {
		Self::with_weight(path, 1)
	}

	pub fn with_weight<P: AsRef<Path>>(path: P, weight: usize) -> Self {
		Self { path: path.as_ref().to_path_buf(), weight }
	}
}

/// Configuration surface consumed by the pipeline.
///
/// `StoryInput` carries both the ingestion parameters (sources,
/// accuracy, threading, weighting) and the generation parameters
/// (word count, formats, paragraph policy). Parsing the values is the
/// caller's business; validation of the constrained ones happens in
/// the setters.
///
/// # Invariants
/// - `accuracy`, `threads` and `target_sentences_per_paragraph` are
///   always >= 1
/// - `write_accuracy` of 0 means "keep the ingestion accuracy"
pub struct StoryInput {
	/// Sources to ingest, in declaration order.
	pub sources: Vec<Source>,

	/// Classification mode of the sources.
	pub input_format: InputFormat,

	/// Encoding of the generated story.
	pub output_format: OutputFormat,

	/// Let sentence-ending marks take part in higher-order
	/// reinforcement during generation.
	pub ignore_punctuation: bool,

	/// Equalize each source's influence proportional to its weight
	/// (forces sequential ingestion).
	pub weighted: bool,

	/// Target number of generated words.
	pub word_count: usize,

	/// Model order ("accuracy") used during ingestion.
	accuracy: usize,

	/// Optional lower order used during generation, 0 to keep the
	/// ingestion accuracy.
	write_accuracy: usize,

	/// Worker pool size for non-weighted ingestion.
	threads: usize,

	/// Sentences per generated paragraph.
	target_sentences_per_paragraph: usize,
}

impl StoryInput {
	pub fn new() -> Self {
		Self {
			sources: Vec::new(),
			input_format: InputFormat::Plaintext,
			output_format: OutputFormat::Plaintext,
			ignore_punctuation: false,
			weighted: false,
			word_count: 100,
			accuracy: 1,
			write_accuracy: 0,
			threads: num_cpus::get(),
			target_sentences_per_paragraph: 10,
		}
	}

	/// Appends a source with the default weight.
	pub fn add_source<P: AsRef<Path>>(&mut self, path: P) {
		self.sources.push(Source::new(path));
	}

	/// Appends a source with a positive weight.
	///
	/// # Errors
	/// Returns an error if `weight` is zero.
	pub fn add_weighted_source<P: AsRef<Path>>(&mut self, path: P, weight: usize) -> Result<(), String> {
		if weight < 1 {
			return Err("Source weight must be >= 1".to_owned());
		}
		self.sources.push(Source::with_weight(path, weight));
		Ok(())
	}

	pub fn accuracy(&self) -> usize {
		self.accuracy
	}

	/// Sets the model order used during ingestion.
	///
	/// # Errors
	/// Returns an error if `accuracy` is zero.
	pub fn set_accuracy(&mut self, accuracy: usize) -> Result<(), String> {
		if accuracy < 1 {
			return Err("Accuracy must be >= 1".to_owned());
		}
		self.accuracy = accuracy;
		Ok(())
	}

	pub fn write_accuracy(&self) -> usize {
		self.write_accuracy
	}

	/// Sets the generation-time accuracy override. Zero keeps the
	/// ingestion accuracy; a value above it is ignored later by the
	/// corpus, not rejected here.
	pub fn set_write_accuracy(&mut self, write_accuracy: usize) {
		self.write_accuracy = write_accuracy;
	}

	pub fn threads(&self) -> usize {
		self.threads
	}

	/// Sets the ingestion worker count.
	///
	/// # Errors
	/// Returns an error if `threads` is zero.
	pub fn set_threads(&mut self, threads: usize) -> Result<(), String> {
		if threads < 1 {
			return Err("Thread count must be >= 1".to_owned());
		}
		self.threads = threads;
		Ok(())
	}

	pub fn target_sentences_per_paragraph(&self) -> usize {
		self.target_sentences_per_paragraph
	}

	/// Sets the paragraph-splitting target.
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
}

impl Default for StoryInput {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults_are_valid() {
		let input = StoryInput::new();
		assert_eq!(input.accuracy(), 1);
		assert_eq!(input.write_accuracy(), 0);
		assert!(input.threads() >= 1);
		assert_eq!(input.target_sentences_per_paragraph(), 10);
		assert_eq!(input.word_count, 100);
	}

	#[test]
	fn setters_reject_zero() {
		let mut input = StoryInput::new();
		assert!(input.set_accuracy(0).is_err());
		assert!(input.set_threads(0).is_err());
		assert!(input.set_target_sentences_per_paragraph(0).is_err());
		assert!(input.add_weighted_source("x.txt", 0).is_err());
	}

	#[test]
	fn sources_keep_declaration_order() {
		let mut input = StoryInput::new();
		input.add_source("a.txt");
		input.add_weighted_source("b.txt", 3).unwrap();
		assert_eq!(input.sources.len(), 2);
		assert_eq!(input.sources[1].weight, 3);
	}
}
