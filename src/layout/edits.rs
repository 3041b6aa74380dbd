//! Keeping the line index in step with buffer edits
//!
//! Called before the buffer is mutated, so every offset here is in the
//! pre-edit coordinate space.

use super::LayoutManager;
use crate::text_line::TextLine;
use std::ops::Range;

impl LayoutManager {
    /// Update line boundaries for replacing `range` with `text`
    pub fn will_replace_characters(&mut self, range: Range<usize>, text: &str) {
        debug_assert!(
            range.start <= range.end && range.end <= self.line_index.length(),
            "edit range {range:?} outside document of length {}",
            self.line_index.length()
        );

        let lines: Vec<(Range<usize>, usize)> = self
            .line_index
            .lines_in_range(range.clone())
            .map(|line| (line.range, line.index))
            .collect();

        // In reverse so earlier lines keep their offsets
        for (line_range, index) in lines.into_iter().rev() {
            let intersection = range.start.max(line_range.start)..range.end.min(line_range.end);
            if intersection.is_empty() {
                continue;
            }

            if intersection == line_range && line_range.end != self.line_index.length() {
                self.line_index.delete(line_range.start);
            } else if intersection.end == line_range.end {
                // The terminator is gone, so the next line joins this one
                let next = self
                    .line_index
                    .line_at_index(index + 1)
                    .map(|next| next.range);
                match next {
                    Some(next) => {
                        self.line_index.delete(next.start);
                        let delta = next.len() as isize - intersection.len() as isize;
                        if delta != 0 {
                            self.line_index.update(line_range.start, delta, 0.0);
                        }
                    }
                    None => self.line_index.update(line_range.start, -(intersection.len() as isize), 0.0),
                }
                self.mark_line_dirty(line_range.start);
            } else {
                self.line_index.update(line_range.start, -(intersection.len() as isize), 0.0);
                self.mark_line_dirty(line_range.start);
            }
        }

        if !text.is_empty() {
            let mut index = 0;
            for newline in memchr::memchr_iter(b'\n', text.as_bytes()) {
                self.apply_line_insert(&text[index..=newline], range.start + index);
                index = newline + 1;
            }
            if index < text.len() {
                self.apply_line_insert(&text[index..], range.start + index);
            }
        }

        self.needs_layout = true;
    }

    /// Insert `inserted` at `location`, splitting the line there if it ends in `\n`
    fn apply_line_insert(&mut self, inserted: &str, location: usize) {
        let length = inserted.len();
        if inserted.ends_with('\n') {
            if location == self.line_index.length() {
                // Nothing to split: grow the last line and open an empty one after it
                self.line_index.update(location, length as isize, 0.0);
                self.mark_line_dirty(location);
                self.line_index.insert(
                    TextLine::new(),
                    location + length,
                    0,
                    self.estimate_line_height(),
                );
            } else {
                let Some(line) = self.line_index.line_at_offset(location) else {
                    tracing::warn!(location, "no line to split");
                    return;
                };
                let split_length = line.range.end - location;
                let line_delta = length as isize - split_length as isize;
                if line_delta != 0 {
                    self.line_index.update(location, line_delta, 0.0);
                }
                self.mark_line_dirty(location);
                self.line_index.insert(
                    TextLine::new(),
                    location + length,
                    split_length,
                    self.estimate_line_height(),
                );
            }
        } else {
            self.line_index.update(location, length as isize, 0.0);
            self.mark_line_dirty(location);
        }
    }

    fn mark_line_dirty(&mut self, offset: usize) {
        if let Some(id) = self.line_index.line_at_offset(offset).map(|line| line.id) {
            self.line_index.data_mut(id).set_needs_layout();
        }
    }
}
