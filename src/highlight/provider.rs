//! The seam between the highlighter and whatever produces highlights

use super::capture::CaptureName;
use super::index_set::IndexSet;
use crate::buffer::TextBuffer;
use crate::error::Result;
use std::ops::Range;

/// A range and the category it was captured as
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightRange {
    pub range: Range<usize>,
    pub capture: Option<CaptureName>,
}

impl HighlightRange {
    pub fn new(range: Range<usize>, capture: CaptureName) -> Self {
        Self {
            range,
            capture: Some(capture),
        }
    }
}

/// Delivers highlights for a requested range; may be called from any thread
pub type HighlightCallback = Box<dyn FnOnce(Result<Vec<HighlightRange>>) + Send>;

/// Delivers the offsets an edit invalidated; may be called from any thread
pub type InvalidationCallback = Box<dyn FnOnce(Result<IndexSet>) + Send>;

/// Source of highlight information for a buffer
///
/// Callbacks may run synchronously or later from another thread. The
/// highlighter applies whatever they deliver on its own thread.
pub trait HighlightProvider {
    /// Prepare for `buffer` in `language`, discarding any previous state
    fn set_up(&mut self, buffer: &dyn TextBuffer, language: &str) -> Result<()>;

    /// Called before `range` of `buffer` is replaced, while the old text is still readable
    fn will_apply_edit(&mut self, _buffer: &dyn TextBuffer, _range: &Range<usize>) {}

    /// `range` (pre-edit coordinates) was replaced, changing the length by `delta`
    fn apply_edit(
        &mut self,
        buffer: &dyn TextBuffer,
        range: Range<usize>,
        delta: isize,
        completion: InvalidationCallback,
    );

    fn query_highlights_for(
        &mut self,
        buffer: &dyn TextBuffer,
        range: Range<usize>,
        completion: HighlightCallback,
    );
}
