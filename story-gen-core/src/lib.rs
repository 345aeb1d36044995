//! Markov story generation library.
//!
//! This crate builds a statistical language model from plaintext or
//! simple markup sources and samples it to produce pseudo-random
//! stories, including:
//! - Variable-order transition tables over words and punctuation
//! - Parallel and weighted multi-source ingestion
//! - Multi-order blended sampling with paragraph segmentation
//! - Internal utilities for I/O
//!
//! Only the high-level API is exposed publicly. Low-level components
//! are kept internal to ensure consistency and prevent misuse.

/// Core model, ingestion pipeline and story generation logic.
pub mod model;

/// I/O utilities (file loading).
///
/// Not exposed
pub(crate) mod io;
