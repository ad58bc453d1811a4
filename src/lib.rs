//! stavelib — reconstructs musical-notation structure from a page's
//! low-level drawing-instruction stream.
//!
//! The pipeline has no prior knowledge of where staves, bars, or glyphs
//! are: it groups raw drawing operators into items, classifies stroked
//! lines and text glyphs, clusters staff lines into staves, pairs staves
//! into systems and piano braces, and converts ordered glyph placements
//! into pitches, durations, and measures.
//!
//! # Example
//! ```no_run
//! use stavelib::reconstruct_stream;
//!
//! let content = std::fs::read_to_string("page_content.txt").unwrap();
//! let score = reconstruct_stream(&content).unwrap();
//! println!("Parts: {}", score.parts.len());
//! println!("Measures: {}", score.measure_count());
//! ```

pub mod combine;
pub mod geometry;
pub mod glyphs;
pub mod model;
pub mod reconstruct;
pub mod stave;
pub mod tokens;
pub mod voice;

pub use combine::combine_page;
pub use model::*;
pub use reconstruct::{reconstruct_items, PageStructure, Reconstructor};
pub use tokens::{group_items, overlay_stream, tokenize, Command, Item};

/// Reconstruct a score from already-decoded content-stream text.
///
/// Convenience wrapper for input that has not yet been tokenized; the
/// container document itself must be decoded by an external tokenizer.
pub fn reconstruct_stream(content: &str) -> Result<Score, String> {
    let tokens = tokenize(content);
    reconstruct_tokens(&tokens)
}

/// Reconstruct a score from an external tokenizer's token stream.
pub fn reconstruct_tokens<S: AsRef<str>>(tokens: &[S]) -> Result<Score, String> {
    let mut items = group_items(tokens.iter().map(|t| t.as_ref()));
    let page = reconstruct_items(&mut items)?;
    Ok(combine_page(page))
}

/// Reconstruct a score and also return the annotated overlay stream for
/// the external document writer (classified items colored by kind).
pub fn reconstruct_with_overlay(content: &str) -> Result<(Score, String), String> {
    let mut items = group_items(tokenize(content));
    let page = reconstruct_items(&mut items)?;
    let overlay = overlay_stream(&items);
    Ok((combine_page(page), overlay))
}

/// Convert a reconstructed score to a JSON string.
/// Useful for handing the intermediate representation to a notation-model
/// adapter across a process or FFI boundary.
pub fn score_to_json(score: &Score) -> Result<String, String> {
    serde_json::to_string_pretty(score).map_err(|e| format!("JSON serialization error: {e}"))
}
