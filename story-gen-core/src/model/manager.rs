use std::path::Path;

use super::corpus::Corpus;
use super::formatter;
use super::reader;
use super::story_input::StoryInput;
use super::writer::StoryWriter;

/// Builds a corpus from the configured sources.
///
/// # Errors
/// Returns an error if the configuration is invalid or if any source
/// fails to ingest (the remaining sources are still ingested).
pub fn build_corpus(input: &StoryInput) -> Result<Corpus, Box<dyn std::error::Error>> {
	let corpus = Corpus::new(input.accuracy(), input.input_format)?;
	reader::read_sources(&corpus, &input.sources, input.threads(), input.weighted)?;
	Ok(corpus)
}

/// Generates and formats a story from an already-built corpus.
///
/// Applies the generation-time accuracy override first; a request to
/// raise the accuracy above what was ingested is silently ignored.
pub fn compose_from(
	corpus: &mut Corpus,
	input: &StoryInput,
) -> Result<String, Box<dyn std::error::Error>> {
	if input.write_accuracy() != 0 {
		corpus.limit_order(input.write_accuracy());
	}

	let mut writer = StoryWriter::new(corpus);
	writer.set_target_sentences_per_paragraph(input.target_sentences_per_paragraph())?;
	writer.set_ignore_punctuation(input.ignore_punctuation);

	let paragraphs = writer.generate_story(input.word_count);
	Ok(formatter::assemble_story(&paragraphs, input.output_format))
}

/// Runs the whole pipeline: ingest every source, then generate and
/// format a story.
pub fn compose_story(input: &StoryInput) -> Result<String, Box<dyn std::error::Error>> {
	let mut corpus = build_corpus(input)?;
	compose_from(&mut corpus, input)
}

/// Persists a corpus to a dictionary file.
pub fn save_corpus<P: AsRef<Path>>(
	corpus: &Corpus,
	path: P,
) -> Result<(), Box<dyn std::error::Error>> {
	corpus.save(path)
}

/// Loads a previously persisted corpus, classifying future ingestion
/// with the given input format.
pub fn load_corpus<P: AsRef<Path>>(
	path: P,
	input: &StoryInput,
) -> Result<Corpus, Box<dyn std::error::Error>> {
	Corpus::load(path, input.input_format)
}
