//! The host-owned text store the core reads from and edits through
//!
//! Offsets are UTF-8 byte offsets. Queries that fall outside the buffer or
//! split a character return `None`.

use std::borrow::Cow;
use std::ops::Range;

/// Display attributes the highlighter stamps onto text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct TextAttributes {
    /// RGBA foreground color
    pub foreground: u32,
    pub bold: bool,
    pub italic: bool,
}

impl TextAttributes {
    pub const fn color(foreground: u32) -> Self {
        Self {
            foreground,
            bold: false,
            italic: false,
        }
    }
}

/// Mutable text store collaborator
pub trait TextBuffer {
    /// Length in bytes
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Text in `range`, or `None` if the range is out of bounds
    fn substring(&self, range: Range<usize>) -> Option<Cow<'_, str>>;

    /// Replace `range` with `text`
    fn replace_characters(&mut self, range: Range<usize>, text: &str);

    /// Attributes-only edit, the length does not change
    fn set_attributes(&mut self, range: Range<usize>, attributes: TextAttributes);

    /// False while the buffer is mid-edit and must not be read
    fn is_available(&self) -> bool {
        true
    }
}

/// A run of styled text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleSpan {
    pub range: Range<usize>,
    pub attributes: TextAttributes,
}

/// In-memory buffer with attribute spans
///
/// Spans are kept sorted and disjoint; unstyled bytes render with the
/// default attributes.
#[derive(Debug, Clone, Default)]
pub struct TextStorage {
    text: String,
    spans: Vec<StyleSpan>,
    default_attributes: TextAttributes,
    editing: bool,
}

impl TextStorage {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn spans(&self) -> &[StyleSpan] {
        &self.spans
    }

    pub fn default_attributes(&self) -> TextAttributes {
        self.default_attributes
    }

    pub fn set_default_attributes(&mut self, attributes: TextAttributes) {
        self.default_attributes = attributes;
    }

    /// Attributes applied at `offset`
    pub fn attributes_at(&self, offset: usize) -> Option<TextAttributes> {
        if offset >= self.text.len() {
            return None;
        }
        let idx = self.spans.partition_point(|span| span.range.end <= offset);
        Some(match self.spans.get(idx) {
            Some(span) if span.range.start <= offset => span.attributes,
            _ => self.default_attributes,
        })
    }

    /// Styled runs covering `range`, gaps filled with the default attributes
    pub fn runs(&self, range: Range<usize>) -> Vec<StyleSpan> {
        let range = range.start.min(self.text.len())..range.end.min(self.text.len());
        let mut runs = Vec::new();
        let mut cursor = range.start;
        let first = self.spans.partition_point(|span| span.range.end <= range.start);

        for span in &self.spans[first..] {
            if span.range.start >= range.end {
                break;
            }
            let start = span.range.start.max(range.start);
            if start > cursor {
                runs.push(StyleSpan {
                    range: cursor..start,
                    attributes: self.default_attributes,
                });
            }
            let end = span.range.end.min(range.end);
            runs.push(StyleSpan {
                range: start..end,
                attributes: span.attributes,
            });
            cursor = end;
        }

        if cursor < range.end {
            runs.push(StyleSpan {
                range: cursor..range.end,
                attributes: self.default_attributes,
            });
        }
        runs
    }

    /// Mark the storage as mid-edit; `is_available` reports false until `end_editing`
    pub fn begin_editing(&mut self) {
        self.editing = true;
    }

    pub fn end_editing(&mut self) {
        self.editing = false;
    }

    fn remove_spans_in(&mut self, range: &Range<usize>) {
        let mut kept = Vec::with_capacity(self.spans.len() + 1);
        for span in self.spans.drain(..) {
            if span.range.end <= range.start || span.range.start >= range.end {
                kept.push(span);
                continue;
            }
            if span.range.start < range.start {
                kept.push(StyleSpan {
                    range: span.range.start..range.start,
                    attributes: span.attributes,
                });
            }
            if span.range.end > range.end {
                kept.push(StyleSpan {
                    range: range.end..span.range.end,
                    attributes: span.attributes,
                });
            }
        }
        self.spans = kept;
    }
}

impl TextBuffer for TextStorage {
    fn len(&self) -> usize {
        self.text.len()
    }

    fn substring(&self, range: Range<usize>) -> Option<Cow<'_, str>> {
        self.text.get(range).map(Cow::Borrowed)
    }

    fn replace_characters(&mut self, range: Range<usize>, text: &str) {
        debug_assert!(
            self.text.get(range.clone()).is_some(),
            "replacement range {range:?} outside buffer of {} bytes",
            self.text.len()
        );
        if self.text.get(range.clone()).is_none() {
            tracing::warn!(?range, len = self.text.len(), "ignoring out of range replacement");
            return;
        }

        self.text.replace_range(range.clone(), text);

        let deleted = range.len();
        let inserted = text.len();
        let map_start = |p: usize| {
            if p < range.start {
                p
            } else if p >= range.end {
                p - deleted + inserted
            } else {
                range.start + inserted
            }
        };
        let map_end = |p: usize| {
            if p <= range.start {
                p
            } else if p >= range.end {
                p - deleted + inserted
            } else {
                range.start
            }
        };

        self.spans = self
            .spans
            .drain(..)
            .filter_map(|span| {
                let start = map_start(span.range.start);
                let end = map_end(span.range.end);
                (start < end).then_some(StyleSpan {
                    range: start..end,
                    attributes: span.attributes,
                })
            })
            .collect();
    }

    fn set_attributes(&mut self, range: Range<usize>, attributes: TextAttributes) {
        let range = range.start.min(self.text.len())..range.end.min(self.text.len());
        if range.is_empty() {
            return;
        }
        self.remove_spans_in(&range);
        if attributes != self.default_attributes {
            let idx = self.spans.partition_point(|span| span.range.start < range.start);
            self.spans.insert(idx, StyleSpan { range, attributes });
        }
    }

    fn is_available(&self) -> bool {
        !self.editing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: TextAttributes = TextAttributes::color(0xFF0000FF);
    const BLUE: TextAttributes = TextAttributes::color(0x0000FFFF);

    #[test]
    fn test_substring_bounds() {
        let storage = TextStorage::new("héllo");
        assert_eq!(storage.substring(0..1).as_deref(), Some("h"));
        // Splits the two-byte é
        assert!(storage.substring(0..2).is_none());
        assert!(storage.substring(0..10).is_none());
        assert_eq!(storage.len(), 6);
    }

    #[test]
    fn test_set_attributes_splits_spans() {
        let mut storage = TextStorage::new("fn main() {}");
        storage.set_attributes(0..12, RED);
        storage.set_attributes(3..7, BLUE);

        assert_eq!(
            storage.spans(),
            &[
                StyleSpan { range: 0..3, attributes: RED },
                StyleSpan { range: 3..7, attributes: BLUE },
                StyleSpan { range: 7..12, attributes: RED },
            ]
        );
        assert_eq!(storage.attributes_at(4), Some(BLUE));
        assert_eq!(storage.attributes_at(12), None);
    }

    #[test]
    fn test_default_attributes_clear_spans() {
        let mut storage = TextStorage::new("let x = 1;");
        storage.set_attributes(0..3, RED);
        storage.set_attributes(0..10, TextAttributes::default());
        assert!(storage.spans().is_empty());
    }

    #[test]
    fn test_spans_shift_with_edits() {
        let mut storage = TextStorage::new("abc def ghi");
        storage.set_attributes(4..7, RED);
        storage.set_attributes(8..11, BLUE);

        storage.replace_characters(0..0, "xx");
        assert_eq!(storage.as_str(), "xxabc def ghi");
        assert_eq!(storage.spans()[0].range, 6..9);
        assert_eq!(storage.spans()[1].range, 10..13);

        // Deleting a styled word drops its span entirely
        storage.replace_characters(6..10, "");
        assert_eq!(storage.as_str(), "xxabc ghi");
        assert_eq!(storage.spans().len(), 1);
        assert_eq!(storage.spans()[0].range, 6..9);
    }

    #[test]
    fn test_runs_fill_gaps() {
        let mut storage = TextStorage::new("abcdef");
        storage.set_attributes(2..4, RED);
        let runs = storage.runs(1..6);
        assert_eq!(runs.len(), 3);
        assert_eq!(runs[0].range, 1..2);
        assert_eq!(runs[1], StyleSpan { range: 2..4, attributes: RED });
        assert_eq!(runs[2].range, 4..6);
    }

    #[test]
    fn test_editing_state_controls_availability() {
        let mut storage = TextStorage::new("");
        assert!(storage.is_available());
        storage.begin_editing();
        assert!(!storage.is_available());
        storage.end_editing();
        assert!(storage.is_available());
    }
}
