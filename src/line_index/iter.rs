//! Forward-only line iterators
//!
//! Each step is an O(log n) index lookup, so iteration tolerates zero-length
//! lines. An iterator is single pass; create a new one to restart.

use super::{LineIndex, LinePosition};
use std::ops::Range;

#[derive(Debug, Clone, Copy)]
enum Bound {
    All,
    /// Stop once a yielded line reaches this offset
    Offset(usize),
    /// Stop once a yielded line reaches this y position
    Y(f32),
}

#[derive(Debug, Clone, Copy)]
enum Start {
    Index(usize),
    Offset(usize),
    Y(f32),
}

pub struct LineIter<'a, T> {
    index: &'a LineIndex<T>,
    start: Start,
    bound: Bound,
    /// Index, end offset and bottom edge of the previous line
    last: Option<(usize, usize, f32)>,
    done: bool,
}

impl<'a, T> LineIter<'a, T> {
    pub(super) fn all(index: &'a LineIndex<T>) -> Self {
        Self {
            index,
            start: Start::Index(0),
            bound: Bound::All,
            last: None,
            done: false,
        }
    }

    pub(super) fn in_range(index: &'a LineIndex<T>, range: Range<usize>) -> Self {
        Self {
            index,
            start: Start::Offset(range.start),
            bound: Bound::Offset(range.end),
            last: None,
            done: false,
        }
    }

    pub(super) fn starting_at(index: &'a LineIndex<T>, min_y: f32, max_y: f32) -> Self {
        Self {
            index,
            start: Start::Y(min_y),
            bound: Bound::Y(max_y),
            last: None,
            done: false,
        }
    }
}

impl<'a, T> Iterator for LineIter<'a, T> {
    type Item = LinePosition<&'a T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let next = match self.last {
            Some((index, end, bottom)) => {
                let exhausted = match self.bound {
                    Bound::All => false,
                    Bound::Offset(max) => end >= max,
                    Bound::Y(max) => bottom >= max,
                };
                if exhausted {
                    None
                } else {
                    self.index.line_at_index(index + 1)
                }
            }
            None => match self.start {
                Start::Index(i) => self.index.line_at_index(i),
                Start::Offset(offset) => self.index.line_at_offset(offset),
                Start::Y(y) => self.index.line_at_position(y),
            },
        };

        match &next {
            Some(position) => {
                self.last = Some((position.index, position.range.end, position.max_y()));
            }
            None => self.done = true,
        }
        next
    }
}
