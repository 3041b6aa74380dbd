//! Breaks a single line of text into visual fragments
//!
//! Typesetting is a pure function of the line text, the wrap width and the
//! measurer. Fragments are stored in their own `LineIndex` so offset → fragment
//! and y → fragment lookups inside a wrapped line stay logarithmic.

use crate::coordinates::TextMetrics;
use crate::line_index::LineIndex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Measures glyph advances; the opaque font service
pub trait TextMeasurer: Send + Sync {
    /// Advance of `ch` when drawn starting at horizontal position `x`
    fn advance(&self, ch: char, x: f32) -> f32;

    /// Height of one unwrapped line before the line height multiplier
    fn natural_line_height(&self) -> f32;
}

impl TextMeasurer for TextMetrics {
    fn advance(&self, ch: char, x: f32) -> f32 {
        match ch {
            '\n' | '\r' => 0.0,
            '\t' => {
                let tab = self.tab_width();
                if tab <= 0.0 {
                    return 0.0;
                }
                // Advance to the next tab stop
                ((x / tab).floor() + 1.0) * tab - x
            }
            _ => self.space_width,
        }
    }

    fn natural_line_height(&self) -> f32 {
        TextMetrics::natural_line_height(self)
    }
}

/// Where wrapped lines may break
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LineBreakStrategy {
    /// Break after whitespace, falling back to characters for long words
    #[default]
    Word,
    /// Break at any character
    Character,
}

/// Stable identity of a fragment, used to key reusable fragment views
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FragmentId(u64);

impl FragmentId {
    fn next() -> Self {
        static NEXT_FRAGMENT_ID: AtomicU64 = AtomicU64::new(1);
        Self(NEXT_FRAGMENT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// One visual row of a line
#[derive(Debug, Clone, PartialEq)]
pub struct LineFragment {
    pub id: FragmentId,
    pub width: f32,
    /// Height before the line height multiplier
    pub height: f32,
    pub scaled_height: f32,
}

impl Default for LineFragment {
    fn default() -> Self {
        Self {
            id: FragmentId::next(),
            width: 0.0,
            height: 0.0,
            scaled_height: 0.0,
        }
    }
}

/// Layout inputs for one line
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayData {
    pub max_width: f32,
    pub line_height_multiplier: f32,
    pub estimated_line_height: f32,
}

#[derive(Debug, Default)]
pub struct Typesetter {
    pub line_fragments: LineIndex<LineFragment>,
}

impl Typesetter {
    /// Rebuild the fragments for `text`
    ///
    /// Fragment lengths are byte lengths relative to the line start and
    /// always sum to `text.len()`.
    pub fn typeset(
        &mut self,
        text: &str,
        display: DisplayData,
        strategy: LineBreakStrategy,
        measurer: &dyn TextMeasurer,
    ) {
        let natural = measurer.natural_line_height();
        let scaled = natural * display.line_height_multiplier;
        let make_fragment = |width: f32, length: usize| {
            let fragment = LineFragment {
                id: FragmentId::next(),
                width,
                height: natural,
                scaled_height: scaled,
            };
            (fragment, length, scaled)
        };

        let mut fragments = Vec::new();
        let mut start = 0;
        let mut x = 0.0f32;
        // Last position after whitespace where a word break may happen
        let mut break_at: Option<usize> = None;

        for (i, ch) in text.char_indices() {
            let advance = measurer.advance(ch, x);
            if i > start && x + advance > display.max_width && advance > 0.0 {
                let split = match (strategy, break_at) {
                    (LineBreakStrategy::Word, Some(b)) if b > start => b,
                    _ => i,
                };
                let width = measure(&text[start..split], measurer);
                fragments.push(make_fragment(width, split - start));
                start = split;
                break_at = None;
                x = measure(&text[start..i], measurer);
            }

            x += measurer.advance(ch, x);
            if ch == ' ' || ch == '\t' {
                break_at = Some(i + ch.len_utf8());
            }
        }

        let width = measure(&text[start..], measurer);
        fragments.push(make_fragment(width, text.len() - start));

        self.line_fragments.build(fragments);
    }

    pub fn fragment_count(&self) -> usize {
        self.line_fragments.count()
    }

    /// Combined height of every fragment
    pub fn height(&self) -> f32 {
        self.line_fragments.height()
    }

    /// Widest fragment
    pub fn width(&self) -> f32 {
        self.line_fragments
            .iter()
            .map(|fragment| fragment.data.width)
            .fold(0.0, f32::max)
    }
}

/// Width of `text` starting at x = 0
pub fn measure(text: &str, measurer: &dyn TextMeasurer) -> f32 {
    text.chars()
        .fold(0.0, |x, ch| x + measurer.advance(ch, x))
}

/// Byte offset in `text` closest to horizontal position `x`
pub fn offset_at_x(text: &str, x: f32, measurer: &dyn TextMeasurer) -> usize {
    let mut current = 0.0;
    for (i, ch) in text.char_indices() {
        if ch == '\n' || ch == '\r' {
            return i;
        }
        let advance = measurer.advance(ch, current);
        if x < current + advance / 2.0 {
            return i;
        }
        current += advance;
    }
    text.len()
}
