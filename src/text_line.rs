//! Payload stored for every line in the layout manager's line index

use crate::typesetter::{DisplayData, LineBreakStrategy, TextMeasurer, Typesetter};
use std::sync::atomic::{AtomicU64, Ordering};

/// Stable identity of a line, independent of its position in the index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextLineId(u64);

impl TextLineId {
    fn next() -> Self {
        static NEXT_LINE_ID: AtomicU64 = AtomicU64::new(1);
        Self(NEXT_LINE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// A logical line: its typeset fragments and the width they were measured for
#[derive(Debug)]
pub struct TextLine {
    pub id: TextLineId,
    pub typesetter: Typesetter,
    /// Wrap width of the last layout, None if never laid out
    max_width: Option<f32>,
    needs_layout: bool,
}

impl Default for TextLine {
    fn default() -> Self {
        Self {
            id: TextLineId::next(),
            typesetter: Typesetter::default(),
            max_width: None,
            needs_layout: true,
        }
    }
}

impl TextLine {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if the line must be typeset again for `max_width`
    pub fn needs_layout(&self, max_width: f32) -> bool {
        self.needs_layout || self.max_width != Some(max_width)
    }

    pub fn set_needs_layout(&mut self) {
        self.needs_layout = true;
    }

    /// Typeset `text` (the full line including its terminator)
    pub fn prepare_for_display(
        &mut self,
        display: DisplayData,
        text: &str,
        strategy: LineBreakStrategy,
        measurer: &dyn TextMeasurer,
    ) {
        self.max_width = Some(display.max_width);
        self.typesetter.typeset(text, display, strategy, measurer);
        self.needs_layout = false;
    }
}
