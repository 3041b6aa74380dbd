use super::{parse_text, point_at, LanguageConfig};
use crate::error::{Error, Result};
use crate::highlight::{CaptureName, HighlightRange};
use std::ops::Range;
use std::time::Duration;
use tree_sitter::{InputEdit, Parser, Query, QueryCursor, StreamingIterator, Tree};

/// One language's parser state over a set of document ranges
pub struct LanguageLayer {
    pub name: &'static str,
    parser: Parser,
    tree: Option<Tree>,
    highlights: Query,
    injections: Option<Query>,
    /// Sorted and disjoint
    ranges: Vec<Range<usize>>,
    /// Parsed with included ranges instead of the whole document
    injected: bool,
}

impl LanguageLayer {
    /// A layer parsing the whole document
    pub fn primary(config: &LanguageConfig, document_length: usize) -> Result<Self> {
        Self::new(config, vec![0..document_length], false)
    }

    /// A layer parsing only `ranges`
    pub fn injected(config: &LanguageConfig, ranges: Vec<Range<usize>>) -> Result<Self> {
        Self::new(config, ranges, true)
    }

    fn new(config: &LanguageConfig, ranges: Vec<Range<usize>>, injected: bool) -> Result<Self> {
        let mut parser = Parser::new();
        parser.set_language(&config.language)?;
        let highlights = Query::new(&config.language, config.highlights_query)?;
        let injections = if config.injections_query.is_empty() {
            None
        } else {
            Some(Query::new(&config.language, config.injections_query)?)
        };
        Ok(Self {
            name: config.name,
            parser,
            tree: None,
            highlights,
            injections,
            ranges,
            injected,
        })
    }

    pub fn ranges(&self) -> &[Range<usize>] {
        &self.ranges
    }

    pub fn tree(&self) -> Option<&Tree> {
        self.tree.as_ref()
    }

    pub fn is_injected(&self) -> bool {
        self.injected
    }

    /// Replace the ranges and drop the tree; the next parse starts over
    pub fn set_ranges(&mut self, ranges: Vec<Range<usize>>) {
        self.ranges = ranges;
        self.tree = None;
    }

    /// Shift the layer's ranges across an edit of `pre_range` by `delta`
    ///
    /// A range holding the edit grows or shrinks with it, a range partly
    /// covered is clipped, and a range swallowed whole is dropped. Returns
    /// whether the edit touched any range.
    pub fn shift_ranges(&mut self, pre_range: &Range<usize>, delta: isize) -> bool {
        let shift = |offset: usize| (offset as isize + delta).max(0) as usize;
        let new_end = shift(pre_range.end).max(pre_range.start);
        let mut touched = false;

        let ranges = std::mem::take(&mut self.ranges);
        for range in ranges {
            let shifted = if range.end < pre_range.start {
                range
            } else if range.start > pre_range.end {
                shift(range.start)..shift(range.end)
            } else {
                touched = true;
                if range.start <= pre_range.start && pre_range.end <= range.end {
                    range.start..shift(range.end)
                } else if pre_range.start <= range.start && range.end <= pre_range.end {
                    continue;
                } else if range.start < pre_range.start {
                    range.start..pre_range.start
                } else {
                    new_end..shift(range.end)
                }
            };
            if !shifted.is_empty() || !self.injected {
                self.ranges.push(shifted);
            }
        }
        touched
    }

    /// Move the tree's nodes across an edit without reparsing
    pub fn edit_tree(&mut self, edit: &InputEdit) {
        if let Some(tree) = self.tree.as_mut() {
            tree.edit(edit);
        }
    }

    /// Parse from scratch; returns the byte range of the new tree
    pub fn parse(&mut self, text: &str, timeout: Option<Duration>) -> Result<Range<usize>> {
        self.tree = None;
        self.set_included_ranges(text)?;
        let Some(tree) = parse_text(&mut self.parser, text, None, timeout) else {
            self.parser.reset();
            return Err(Error::ParserTimeout);
        };
        let root = tree.root_node().byte_range();
        self.tree = Some(tree);
        Ok(root)
    }

    /// Reparse an edited tree and report the byte ranges whose syntax changed
    ///
    /// On timeout the edited tree is kept, so a later reparse resumes from
    /// the same state.
    pub fn reparse(&mut self, text: &str, timeout: Option<Duration>) -> Result<Vec<Range<usize>>> {
        if self.tree.is_none() {
            return self.parse(text, timeout).map(|root| vec![root]);
        }
        self.set_included_ranges(text)?;

        let old_tree = self.tree.as_ref();
        let Some(new_tree) = parse_text(&mut self.parser, text, old_tree, timeout) else {
            self.parser.reset();
            tracing::debug!(layer = self.name, ?timeout, "parse timed out");
            return Err(Error::ParserTimeout);
        };
        let changed = old_tree
            .map(|old| {
                old.changed_ranges(&new_tree)
                    .map(|range| range.start_byte..range.end_byte)
                    .collect()
            })
            .unwrap_or_default();
        self.tree = Some(new_tree);
        Ok(changed)
    }

    fn set_included_ranges(&mut self, text: &str) -> Result<()> {
        if !self.injected {
            return Ok(());
        }
        let bytes = text.as_bytes();
        let included: Vec<tree_sitter::Range> = self
            .ranges
            .iter()
            .map(|range| tree_sitter::Range {
                start_byte: range.start,
                end_byte: range.end,
                start_point: point_at(bytes, range.start),
                end_point: point_at(bytes, range.end),
            })
            .collect();
        self.parser
            .set_included_ranges(&included)
            .map_err(|err| Error::IncludedRanges(err.0))
    }

    /// Highlights captured inside `range`, clipped to it
    pub fn query_highlights(&self, text: &[u8], range: Range<usize>, match_limit: u32) -> Vec<HighlightRange> {
        let Some(tree) = &self.tree else {
            return Vec::new();
        };

        let mut cursor = QueryCursor::new();
        cursor.set_byte_range(range.clone());
        cursor.set_match_limit(match_limit);

        let capture_names = self.highlights.capture_names();
        let mut highlights = Vec::new();
        let mut matches = cursor.matches(&self.highlights, tree.root_node(), text);
        while let Some(match_) = matches.next() {
            for capture in match_.captures {
                // The cursor range is only a hint; clip again
                let node = capture.node.byte_range();
                let clipped = node.start.max(range.start)..node.end.min(range.end);
                if clipped.is_empty() {
                    continue;
                }
                let name = capture_names.get(capture.index as usize).copied().unwrap_or_default();
                if let Some(capture) = CaptureName::from_capture(name) {
                    highlights.push(HighlightRange::new(clipped, capture));
                }
            }
        }
        highlights
    }

    /// (language, content range) pairs found by the injections query
    pub fn injections(&self, text: &[u8]) -> Vec<(String, Range<usize>)> {
        let (Some(tree), Some(query)) = (&self.tree, &self.injections) else {
            return Vec::new();
        };
        let content_index = query.capture_index_for_name("injection.content");
        let language_index = query.capture_index_for_name("injection.language");

        let mut injections = Vec::new();
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(query, tree.root_node(), text);
        while let Some(match_) = matches.next() {
            let mut language = query
                .property_settings(match_.pattern_index)
                .iter()
                .find(|property| &*property.key == "injection.language")
                .and_then(|property| property.value.as_deref())
                .map(str::to_owned);
            let mut content = None;

            for capture in match_.captures {
                if Some(capture.index) == language_index {
                    language = capture.node.utf8_text(text).ok().map(str::to_owned);
                } else if Some(capture.index) == content_index {
                    content = Some(capture.node.byte_range());
                }
            }

            if let (Some(language), Some(content)) = (language, content) {
                if !content.is_empty() {
                    injections.push((language, content));
                }
            }
        }
        injections
    }
}

impl std::fmt::Debug for LanguageLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LanguageLayer")
            .field("name", &self.name)
            .field("ranges", &self.ranges)
            .field("injected", &self.injected)
            .field("has_tree", &self.tree.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer(ranges: Vec<Range<usize>>) -> LanguageLayer {
        LanguageLayer::injected(&LanguageConfig::rust(), ranges).unwrap()
    }

    #[test]
    fn test_edit_inside_range_grows_it() {
        let mut layer = layer(vec![10..20, 30..40]);
        assert!(layer.shift_ranges(&(12..12), 3));
        assert_eq!(layer.ranges(), &[10..23, 33..43]);
    }

    #[test]
    fn test_edit_before_ranges_only_shifts() {
        let mut layer = layer(vec![10..20]);
        assert!(!layer.shift_ranges(&(0..5), -5));
        assert_eq!(layer.ranges(), &[5..15]);
    }

    #[test]
    fn test_swallowed_range_is_dropped() {
        let mut layer = layer(vec![10..20, 30..40]);
        assert!(layer.shift_ranges(&(5..25), -20));
        assert_eq!(layer.ranges(), &[10..20]);
    }

    #[test]
    fn test_partial_overlap_clips() {
        let mut layer = layer(vec![10..20]);
        // Delete 15..25: the tail of the range goes
        assert!(layer.shift_ranges(&(15..25), -10));
        assert_eq!(layer.ranges(), &[10..15]);

        let mut layer = self::layer(vec![10..20]);
        // Delete 5..15: the head of the range goes
        assert!(layer.shift_ranges(&(5..15), -10));
        assert_eq!(layer.ranges(), &[5..10]);
    }

    #[test]
    fn test_primary_layer_highlights() {
        let text = "fn main() { let x = 1; }";
        let mut layer = LanguageLayer::primary(&LanguageConfig::rust(), text.len()).unwrap();
        layer.parse(text, None).unwrap();

        let highlights = layer.query_highlights(text.as_bytes(), 0..text.len(), 256);
        assert!(highlights
            .iter()
            .any(|h| h.range == (0..2) && h.capture == Some(CaptureName::Keyword)));
        assert!(highlights.iter().all(|h| h.range.end <= text.len()));
    }

    #[test]
    fn test_query_is_clipped_to_range() {
        let text = "// a comment that is long\nfn f() {}";
        let mut layer = LanguageLayer::primary(&LanguageConfig::rust(), text.len()).unwrap();
        layer.parse(text, None).unwrap();

        let highlights = layer.query_highlights(text.as_bytes(), 5..10, 256);
        assert!(!highlights.is_empty());
        assert!(highlights.iter().all(|h| h.range.start >= 5 && h.range.end <= 10));
    }
}
