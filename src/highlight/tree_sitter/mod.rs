//! Tree-sitter highlight provider
//!
//! A document is parsed by a primary language layer covering all of it, plus
//! one layer per injected language covering the ranges the injections query
//! assigns to it.

mod client;
mod layer;

pub use client::TreeSitterClient;
pub use layer::LanguageLayer;

use crate::error::{Error, Result};
use std::time::{Duration, Instant};
use tree_sitter::{Language, ParseOptions, ParseState, Parser, Point, Tree};

/// Grammar and queries for one language
pub struct LanguageConfig {
    pub name: &'static str,
    pub language: Language,
    pub highlights_query: &'static str,
    pub injections_query: &'static str,
}

impl LanguageConfig {
    pub fn rust() -> Self {
        Self {
            name: "rust",
            language: tree_sitter_rust::LANGUAGE.into(),
            highlights_query: tree_sitter_rust::HIGHLIGHTS_QUERY,
            injections_query: tree_sitter_rust::INJECTIONS_QUERY,
        }
    }

    /// Look up a language by name or file extension
    pub fn for_name(name: &str) -> Result<Self> {
        match name {
            "rust" | "rs" => Ok(Self::rust()),
            _ => Err(Error::UnknownLanguage(name.to_string())),
        }
    }
}

/// Row and byte column of `offset`
pub fn point_at(text: &[u8], offset: usize) -> Point {
    let before = &text[..offset.min(text.len())];
    let row = bytecount::count(before, b'\n');
    let line_start = memchr::memrchr(b'\n', before).map_or(0, |idx| idx + 1);
    Point::new(row, before.len() - line_start)
}

/// Parse `text`, giving up after `timeout`
///
/// Returns None when the time budget ran out. The parser must be reset
/// before it is used on different text.
fn parse_text(parser: &mut Parser, text: &str, old_tree: Option<&Tree>, timeout: Option<Duration>) -> Option<Tree> {
    let bytes = text.as_bytes();
    let mut read = |offset: usize, _: Point| bytes.get(offset..).unwrap_or_default();

    match timeout {
        None => parser.parse_with_options(&mut read, old_tree, None),
        Some(timeout) => {
            let started = Instant::now();
            let mut progress = |_: &ParseState| started.elapsed() > timeout;
            let options = ParseOptions::new().progress_callback(&mut progress);
            parser.parse_with_options(&mut read, old_tree, Some(options))
        }
    }
}
