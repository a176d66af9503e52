//! Overlapping document chunker for embedding pipelines.
//!
//! Wiki documents are usually far larger than what an embedding model accepts
//! in one pass. This crate splits a document's full text into an ordered
//! sequence of chunks bounded by a maximum size, preferring natural break
//! points (paragraph, then heading, then sentence, then line, then word) so
//! each chunk stays coherent, and repeating a configurable tail of each chunk
//! at the start of the next so context survives the cut.
//!
//! The chunker is pure: no I/O, no shared state, identical inputs always
//! produce identical outputs.

/// Module for the chunking algorithm and its configuration
pub mod chunk;

pub use chunk::{ChunkError, Chunker};
