//! Cursors and selected ranges
//!
//! A selection is a byte range; an empty range is a cursor. The manager keeps
//! the set de-duplicated and inside `[0, document length]`, remaps it after
//! edits, and produces the rects a host needs to draw it.

mod cursor_timer;
mod fill_rects;
mod movement;

pub use cursor_timer::CursorTimer;
pub use movement::{destination_offset, CharacterClass, Destination, Direction};

use crate::buffer::TextBuffer;
use crate::coordinates::LayoutRect;
use crate::layout::LayoutManager;
use crate::text_line::TextLineId;
use ahash::AHashSet;
use std::ops::Range;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub range: Range<usize>,
    /// Horizontal position vertical moves try to return to
    pub suggested_x: Option<f32>,
    /// The fixed end when extending with a modified move
    pub pivot: Option<usize>,
    /// Area covered when last drawn
    pub bounding_rect: LayoutRect,
}

impl Selection {
    pub fn new(range: Range<usize>) -> Self {
        Self {
            range,
            suggested_x: None,
            pivot: None,
            bounding_rect: LayoutRect::default(),
        }
    }

    pub fn cursor(offset: usize) -> Self {
        Self::new(offset..offset)
    }

    pub fn is_cursor(&self) -> bool {
        self.range.is_empty()
    }
}

/// Where a selection ends up after `edit` was replaced by `replacement_length` bytes
///
/// Selections collapse to cursors. A selection touching or overlapping the
/// edit lands at the end of the inserted text, one after it shifts by the
/// length delta, one before it stays at its start.
pub fn remap_offset(selection: &Range<usize>, edit: &Range<usize>, replacement_length: usize) -> isize {
    let overlaps = selection.start < edit.end && edit.start < selection.end;
    let cursor_inside = selection.is_empty() && selection.start >= edit.start && selection.start <= edit.end;

    if overlaps || *selection == *edit || cursor_inside {
        (edit.start + replacement_length) as isize
    } else if selection.start >= edit.end {
        selection.start as isize + replacement_length as isize - edit.len() as isize
    } else {
        selection.start as isize
    }
}

#[derive(Debug)]
pub struct SelectionManager {
    selections: Vec<Selection>,
    pub highlight_selected_line: bool,
    cursor_timer: CursorTimer,
    /// Bumped whenever the selection set changes
    change_count: u64,
}

impl SelectionManager {
    pub fn new(highlight_selected_line: bool, blink_interval: Duration) -> Self {
        Self {
            selections: Vec::new(),
            highlight_selected_line,
            cursor_timer: CursorTimer::new(blink_interval),
            change_count: 0,
        }
    }

    pub fn selections(&self) -> &[Selection] {
        &self.selections
    }

    pub fn selected_ranges(&self) -> Vec<Range<usize>> {
        self.selections.iter().map(|s| s.range.clone()).collect()
    }

    pub fn change_count(&self) -> u64 {
        self.change_count
    }

    pub fn cursor_timer(&self) -> &CursorTimer {
        &self.cursor_timer
    }

    pub fn cursor_timer_mut(&mut self) -> &mut CursorTimer {
        &mut self.cursor_timer
    }

    /// Replace the selection set with a single range
    pub fn set_selected_range(&mut self, range: Range<usize>, layout: &LayoutManager, buffer: &dyn TextBuffer) {
        self.set_selected_ranges(std::iter::once(range), layout, buffer);
    }

    /// Replace the selection set, dropping duplicates and out-of-range entries
    pub fn set_selected_ranges(
        &mut self,
        ranges: impl IntoIterator<Item = Range<usize>>,
        layout: &LayoutManager,
        buffer: &dyn TextBuffer,
    ) {
        let length = buffer.len();
        let mut selections: Vec<Selection> = Vec::new();
        for range in ranges {
            if range.start > range.end || range.end > length {
                tracing::debug!(?range, length, "dropping out of range selection");
                continue;
            }
            if selections.iter().any(|s| s.range == range) {
                continue;
            }
            let mut selection = Selection::new(range);
            selection.suggested_x = layout.rect_for_offset(selection.range.start, buffer).map(|r| r.min_x());
            selections.push(selection);
        }
        self.selections = selections;
        self.did_change();
    }

    /// Add a range, merging it into any selection it touches or overlaps
    pub fn add_selected_range(&mut self, range: Range<usize>, layout: &LayoutManager, buffer: &dyn TextBuffer) {
        if range.start > range.end || range.end > buffer.len() {
            return;
        }
        if self.selections.iter().any(|s| s.range == range) {
            return;
        }

        let touches = |existing: &Range<usize>| existing.start <= range.end && range.start <= existing.end;
        let mut merged = range.clone();
        self.selections.retain(|selection| {
            if touches(&selection.range) {
                merged = merged.start.min(selection.range.start)..merged.end.max(selection.range.end);
                false
            } else {
                true
            }
        });

        let mut selection = Selection::new(merged);
        selection.suggested_x = layout.rect_for_offset(selection.range.start, buffer).map(|r| r.min_x());
        self.selections.push(selection);
        self.selections.sort_by_key(|s| (s.range.start, s.range.end));
        self.did_change();
    }

    /// Remap every selection after `range` was replaced by `replacement_length` bytes
    ///
    /// `document_length` is the length after the edit.
    pub fn did_replace_characters(&mut self, range: Range<usize>, replacement_length: usize, document_length: usize) {
        for selection in &mut self.selections {
            let offset = remap_offset(&selection.range, &range, replacement_length)
                .clamp(0, document_length as isize) as usize;
            selection.range = offset..offset;
            selection.pivot = None;
        }
        self.dedupe();
        self.did_change();
    }

    /// Move or extend every selection
    pub fn move_selections(
        &mut self,
        direction: Direction,
        destination: Destination,
        modify_selection: bool,
        layout: &LayoutManager,
        buffer: &dyn TextBuffer,
    ) {
        for selection in &mut self.selections {
            movement::move_selection(selection, direction, destination, modify_selection, layout, buffer);
        }
        self.dedupe();
        self.did_change();
    }

    /// Stop blinking and hide every cursor
    pub fn remove_cursors(&mut self) {
        self.cursor_timer.stop_timer();
    }

    /// Caret rects for every cursor
    pub fn cursor_rects(&self, layout: &LayoutManager, buffer: &dyn TextBuffer) -> Vec<LayoutRect> {
        self.selections
            .iter()
            .filter(|s| s.is_cursor())
            .filter_map(|s| layout.rect_for_offset(s.range.start, buffer))
            .map(|rect| LayoutRect::new(rect.x, rect.y, rect.width, layout.estimate_line_height()))
            .collect()
    }

    /// Full-width rects behind each line holding a cursor, once per line
    pub fn highlighted_line_rects(&self, bounds: LayoutRect, layout: &LayoutManager) -> Vec<LayoutRect> {
        if !self.highlight_selected_line {
            return Vec::new();
        }
        let mut highlighted: AHashSet<TextLineId> = AHashSet::new();
        let mut rects = Vec::new();
        for selection in self.selections.iter().filter(|s| s.is_cursor()) {
            let Some(line) = layout.text_line_for_offset(selection.range.start) else {
                continue;
            };
            if !highlighted.insert(line.data.id) {
                continue;
            }
            let rect = LayoutRect::new(bounds.min_x(), line.y_pos, bounds.width, line.height);
            if rect.intersects(&bounds) {
                rects.push(rect);
            }
        }
        rects
    }

    /// Fill rects for every ranged selection, updating their bounding rects
    pub fn selection_rects(
        &mut self,
        bounds: LayoutRect,
        layout: &LayoutManager,
        buffer: &dyn TextBuffer,
    ) -> Vec<LayoutRect> {
        let mut all = Vec::new();
        for selection in self.selections.iter_mut().filter(|s| !s.is_cursor()) {
            let rects = fill_rects::fill_rects(bounds, &selection.range, layout, buffer);
            if let Some(first) = rects.first() {
                selection.bounding_rect = rects.iter().skip(1).fold(*first, |acc, r| acc.union(r));
            }
            all.extend(rects);
        }
        all
    }

    /// Bounding rects of every selection, cursors included
    pub fn selection_bounding_rects(&self, layout: &LayoutManager, buffer: &dyn TextBuffer) -> Vec<LayoutRect> {
        self.selections
            .iter()
            .filter_map(|selection| {
                if selection.is_cursor() {
                    layout.rect_for_offset(selection.range.start, buffer)
                } else {
                    Some(selection.bounding_rect)
                }
            })
            .collect()
    }

    fn dedupe(&mut self) {
        let mut seen: AHashSet<Range<usize>> = AHashSet::new();
        self.selections.retain(|s| seen.insert(s.range.clone()));
    }

    fn did_change(&mut self) {
        self.change_count += 1;
        self.cursor_timer.reset_timer();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remap_after_edit_shifts() {
        // "abc|def" with "X" inserted at 1
        assert_eq!(remap_offset(&(3..3), &(1..1), 1), 4);
        // Selection after a deletion
        assert_eq!(remap_offset(&(5..7), &(1..3), 0), 3);
    }

    #[test]
    fn test_remap_intersecting_lands_at_edit_end() {
        assert_eq!(remap_offset(&(2..6), &(4..8), 3), 7);
        assert_eq!(remap_offset(&(4..8), &(4..8), 0), 4);
        // Cursor touching the end of the edit
        assert_eq!(remap_offset(&(8..8), &(4..8), 1), 5);
    }

    #[test]
    fn test_remap_before_edit_collapses_to_start() {
        assert_eq!(remap_offset(&(0..2), &(4..8), 10), 0);
        assert_eq!(remap_offset(&(1..4), &(4..8), 10), 1);
    }
}
