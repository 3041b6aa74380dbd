use super::{point_at, LanguageConfig, LanguageLayer};
use crate::buffer::TextBuffer;
use crate::config::EditorConfig;
use crate::error::{Error, Result};
use crate::highlight::{HighlightCallback, HighlightProvider, HighlightRange, IndexSet, InvalidationCallback};
use ahash::AHashMap;
use std::borrow::Cow;
use std::ops::Range;
use std::time::Duration;
use tree_sitter::{InputEdit, Point};

/// Pre-edit positions captured while the old text is still readable
#[derive(Debug, Clone)]
struct PendingEdit {
    range: Range<usize>,
    start_position: Point,
    old_end_position: Point,
}

/// Highlight provider backed by tree-sitter
///
/// Parsing and queries run synchronously on the calling thread, so every
/// callback fires before the provider method returns.
pub struct TreeSitterClient {
    /// The primary layer first, then one layer per injected language
    layers: Vec<LanguageLayer>,
    parser_timeout: Option<Duration>,
    match_limit: u32,
    pending_edit: Option<PendingEdit>,
}

impl TreeSitterClient {
    pub fn new(config: &EditorConfig) -> Self {
        let timeout = config.parser_timeout();
        Self {
            layers: Vec::new(),
            parser_timeout: (!timeout.is_zero()).then_some(timeout),
            match_limit: config.tree_sitter_match_limit,
            pending_edit: None,
        }
    }

    pub fn layers(&self) -> &[LanguageLayer] {
        &self.layers
    }

    pub fn primary_layer(&self) -> Option<&LanguageLayer> {
        self.layers.first()
    }

    pub fn set_parser_timeout(&mut self, timeout: Option<Duration>) {
        self.parser_timeout = timeout;
    }

    /// Highlights for `range`: injected layers first, the primary layer for the rest
    pub fn highlights_for_range(&self, text: &[u8], range: Range<usize>) -> Vec<HighlightRange> {
        let mut highlights = Vec::new();
        let mut uncovered = IndexSet::from_range(range.clone());

        for layer in self.layers.iter().skip(1) {
            for layer_range in layer.ranges() {
                let intersection = range.start.max(layer_range.start)..range.end.min(layer_range.end);
                if intersection.is_empty() {
                    continue;
                }
                highlights.extend(layer.query_highlights(text, intersection.clone(), self.match_limit));
                uncovered.remove(intersection);
            }
        }

        if let Some(primary) = self.layers.first() {
            for range in uncovered.ranges() {
                highlights.extend(primary.query_highlights(text, range.clone(), self.match_limit));
            }
        }
        highlights
    }

    fn edit(&mut self, text: &str, range: Range<usize>, delta: isize) -> Result<IndexSet> {
        let new_end = (range.end as isize + delta).max(range.start as isize) as usize;
        let edit = match self.pending_edit.take() {
            Some(pending) if pending.range == range => InputEdit {
                start_byte: range.start,
                old_end_byte: range.end,
                new_end_byte: new_end,
                start_position: pending.start_position,
                old_end_position: pending.old_end_position,
                new_end_position: point_at(text.as_bytes(), new_end),
            },
            _ => {
                tracing::debug!(?range, "edit without pre-edit positions, reparsing everything");
                return self.reparse_all(text);
            }
        };

        let mut changed = IndexSet::new();
        let mut timed_out = false;
        for layer in &mut self.layers {
            let touched = layer.shift_ranges(&range, delta);
            layer.edit_tree(&edit);
            if layer.is_injected() && (!touched || layer.ranges().is_empty()) {
                continue;
            }
            match layer.reparse(text, self.parser_timeout) {
                Ok(ranges) => ranges.into_iter().for_each(|range| changed.insert(range)),
                Err(Error::ParserTimeout) => timed_out = true,
                Err(err) => return Err(err),
            }
        }
        self.layers
            .retain(|layer| !layer.is_injected() || !layer.ranges().is_empty());

        if timed_out {
            return Err(Error::ParserTimeout);
        }
        Ok(changed.union(&self.update_injections(text)))
    }

    fn reparse_all(&mut self, text: &str) -> Result<IndexSet> {
        let mut changed = IndexSet::new();
        if let Some(primary) = self.layers.first_mut() {
            primary.set_ranges(vec![0..text.len()]);
            changed.insert(primary.parse(text, None)?);
        }
        self.layers.truncate(1);
        Ok(changed.union(&self.update_injections(text)))
    }

    /// Sync injected layers with the primary layer's injections; returns the ranges they moved over
    fn update_injections(&mut self, text: &str) -> IndexSet {
        let Some(primary) = self.layers.first() else {
            return IndexSet::new();
        };
        let mut found: AHashMap<String, IndexSet> = AHashMap::new();
        for (language, range) in primary.injections(text.as_bytes()) {
            found.entry(language).or_default().insert(range);
        }

        let mut changed = IndexSet::new();
        let mut index = 1;
        while index < self.layers.len() {
            if found.contains_key(self.layers[index].name) {
                index += 1;
            } else {
                let layer = self.layers.remove(index);
                tracing::trace!(layer = layer.name, "injected layer removed");
                layer.ranges().iter().for_each(|range| changed.insert(range.clone()));
            }
        }

        for (language, ranges) in found {
            let ranges = ranges.ranges().to_vec();
            if let Some(layer) = self.layers.iter_mut().skip(1).find(|layer| layer.name == language) {
                if layer.ranges() == ranges.as_slice() {
                    continue;
                }
                layer.ranges().iter().for_each(|range| changed.insert(range.clone()));
                ranges.iter().for_each(|range| changed.insert(range.clone()));
                layer.set_ranges(ranges);
                if let Err(err) = layer.parse(text, self.parser_timeout) {
                    tracing::warn!(layer = layer.name, %err, "injected layer failed to parse");
                }
                continue;
            }

            let config = match LanguageConfig::for_name(&language) {
                Ok(config) => config,
                Err(err) => {
                    tracing::trace!(%err, "skipping injection");
                    continue;
                }
            };
            let layer = LanguageLayer::injected(&config, ranges.clone()).and_then(|mut layer| {
                layer.parse(text, self.parser_timeout)?;
                Ok(layer)
            });
            match layer {
                Ok(layer) => {
                    tracing::trace!(layer = layer.name, ranges = ranges.len(), "injected layer added");
                    ranges.into_iter().for_each(|range| changed.insert(range));
                    self.layers.push(layer);
                }
                Err(err) => tracing::warn!(%language, %err, "injected layer failed to parse"),
            }
        }
        changed
    }
}

fn document_text(buffer: &dyn TextBuffer) -> Option<Cow<'_, str>> {
    buffer.substring(0..buffer.len())
}

impl HighlightProvider for TreeSitterClient {
    fn set_up(&mut self, buffer: &dyn TextBuffer, language: &str) -> Result<()> {
        self.layers.clear();
        self.pending_edit = None;

        let config = LanguageConfig::for_name(language)?;
        let text = document_text(buffer).unwrap_or_default();
        let mut primary = LanguageLayer::primary(&config, text.len())?;
        primary.parse(&text, None)?;
        self.layers.push(primary);
        self.update_injections(&text);

        tracing::debug!(language, layers = self.layers.len(), "tree-sitter client ready");
        Ok(())
    }

    fn will_apply_edit(&mut self, buffer: &dyn TextBuffer, range: &Range<usize>) {
        let Some(text) = document_text(buffer) else {
            return;
        };
        self.pending_edit = Some(PendingEdit {
            range: range.clone(),
            start_position: point_at(text.as_bytes(), range.start),
            old_end_position: point_at(text.as_bytes(), range.end),
        });
    }

    fn apply_edit(
        &mut self,
        buffer: &dyn TextBuffer,
        range: Range<usize>,
        delta: isize,
        completion: InvalidationCallback,
    ) {
        if self.layers.is_empty() {
            completion(Ok(IndexSet::new()));
            return;
        }
        let result = match document_text(buffer) {
            Some(text) => self.edit(&text, range, delta),
            None => Ok(IndexSet::new()),
        };
        completion(result);
    }

    fn query_highlights_for(
        &mut self,
        buffer: &dyn TextBuffer,
        range: Range<usize>,
        completion: HighlightCallback,
    ) {
        let highlights = match document_text(buffer) {
            Some(text) => self.highlights_for_range(text.as_bytes(), range),
            None => Vec::new(),
        };
        completion(Ok(highlights));
    }
}

impl std::fmt::Debug for TreeSitterClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeSitterClient")
            .field("layers", &self.layers)
            .field("parser_timeout", &self.parser_timeout)
            .field("match_limit", &self.match_limit)
            .finish()
    }
}
