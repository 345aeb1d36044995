//! Top-level module for the story generation system.
//!
//! This crate provides a variable-order Markov story generator,
//! including:
//! - Word, punctuation and tag statistics (`Token`)
//! - The shared dictionary and its transition tables (`Corpus`)
//! - The tokenizing ingestion pipeline (`reader`)
//! - The sampling story writer (`StoryWriter`)
//! - Punctuation spacing and output encoding (`formatter`)
//! - The external configuration surface (`StoryInput`)

/// Token statistics: successor tables per lookback distance, sentence
/// lengths for punctuation marks, parameters for markup tags.
pub mod token;

/// The dictionary: token set, ingestion window, fold logic, order
/// reconfiguration and persistence.
pub mod corpus;

/// Ingestion pipeline: tokenization, per-source readers, batched
/// parallel ingestion and weighted multi-source ingestion.
pub mod reader;

/// Story generation: the weighted random walk across the transition
/// tables and the paragraph assembly policy.
pub mod writer;

/// Output formatting: capitalization, punctuation re-spacing,
/// plaintext and HTML encodings.
pub mod formatter;

/// Configuration surface consumed by the pipeline.
///
/// Stores the source list, model accuracy, output targets and worker
/// settings; parsed externally, validated here.
pub mod story_input;

/// High-level orchestration: config in, formatted story out, plus
/// dictionary save and load.
pub mod manager;
