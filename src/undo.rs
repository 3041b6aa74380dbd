//! Grouped undo and redo of text mutations
//!
//! Mutations are recorded with their inverse, captured before the edit is
//! applied. Consecutive typing is folded into one group; see
//! [`UndoManager::should_continue_group`] for where groups break.

use crate::buffer::TextBuffer;
use crate::line_ending::LineEnding;
use std::collections::VecDeque;
use std::ops::Range;

/// Grouping heuristics only compare texts shorter than this
const GROUPING_TEXT_LIMIT: usize = 1024;

/// Replace `range` with `text`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextMutation {
    pub range: Range<usize>,
    pub text: String,
}

impl TextMutation {
    pub fn new(range: Range<usize>, text: impl Into<String>) -> Self {
        Self {
            range,
            text: text.into(),
        }
    }

    pub fn insert(offset: usize, text: impl Into<String>) -> Self {
        Self::new(offset..offset, text)
    }

    pub fn delete(range: Range<usize>) -> Self {
        Self::new(range, String::new())
    }

    /// Replacing or removing existing text, as opposed to a pure insertion
    pub fn is_delete(&self) -> bool {
        !self.range.is_empty()
    }

    pub fn is_noop(&self) -> bool {
        self.range.is_empty() && self.text.is_empty()
    }

    /// Change in document length
    pub fn delta(&self) -> isize {
        self.text.len() as isize - self.range.len() as isize
    }

    /// The mutation undoing this one, read from the buffer before this one is applied
    pub fn inverse(&self, buffer: &dyn TextBuffer) -> Option<TextMutation> {
        let replaced = buffer.substring(self.range.clone())?;
        Some(TextMutation::new(
            self.range.start..self.range.start + self.text.len(),
            replaced.into_owned(),
        ))
    }
}

/// A recorded mutation and the mutation that reverses it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndoEntry {
    pub mutation: TextMutation,
    pub inverse: TextMutation,
}

/// Mutations undone and redone as one step
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UndoGroup {
    pub entries: Vec<UndoEntry>,
}

impl UndoGroup {
    /// Inverses in reverse order
    pub fn undo_mutations(&self) -> impl Iterator<Item = &TextMutation> {
        self.entries.iter().rev().map(|entry| &entry.inverse)
    }

    /// Original mutations in order
    pub fn redo_mutations(&self) -> impl Iterator<Item = &TextMutation> {
        self.entries.iter().map(|entry| &entry.mutation)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UndoState {
    #[default]
    Idle,
    Undoing,
    Redoing,
}

#[derive(Debug, Default)]
pub struct UndoManager {
    undo_stack: VecDeque<UndoGroup>,
    redo_stack: Vec<UndoGroup>,
    state: UndoState,
    is_grouping: bool,
    is_disabled: bool,
    /// Oldest groups are dropped past this many
    undo_limit: Option<usize>,
}

impl UndoManager {
    pub fn new(undo_limit: Option<usize>) -> Self {
        Self {
            undo_limit,
            ..Self::default()
        }
    }

    pub fn state(&self) -> UndoState {
        self.state
    }

    pub fn is_undoing(&self) -> bool {
        self.state == UndoState::Undoing
    }

    pub fn is_redoing(&self) -> bool {
        self.state == UndoState::Redoing
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn is_grouping(&self) -> bool {
        self.is_grouping
    }

    pub fn is_disabled(&self) -> bool {
        self.is_disabled
    }

    pub fn undo_group_count(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_group_count(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn clear_stack(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    /// Capture the inverse of `mutation`; call before the buffer changes
    ///
    /// Returns None when recording is suppressed: while replaying, while
    /// disabled, or for a mutation that changes nothing.
    pub fn prepare(&self, mutation: &TextMutation, buffer: &dyn TextBuffer) -> Option<UndoEntry> {
        if self.state != UndoState::Idle || self.is_disabled || mutation.is_noop() {
            return None;
        }
        let Some(inverse) = mutation.inverse(buffer) else {
            tracing::warn!(range = ?mutation.range, "mutation outside buffer not recorded");
            return None;
        };
        Some(UndoEntry {
            mutation: mutation.clone(),
            inverse,
        })
    }

    /// Record a prepared entry, appending to the open group or starting one
    pub fn register(&mut self, entry: UndoEntry) {
        let continues = match self.undo_stack.back().and_then(|group| group.entries.last()) {
            Some(last) => self.is_grouping || Self::should_continue_group(&entry, last),
            None => false,
        };

        match self.undo_stack.back_mut().filter(|_| continues) {
            Some(group) => group.entries.push(entry),
            None => self.push_group(UndoGroup {
                entries: vec![entry],
            }),
        }
        self.redo_stack.clear();
    }

    /// Record an entry into the newest group regardless of grouping rules
    pub fn append_to_last_group(&mut self, entry: UndoEntry) {
        match self.undo_stack.back_mut() {
            Some(group) => group.entries.push(entry),
            None => self.push_group(UndoGroup {
                entries: vec![entry],
            }),
        }
        self.redo_stack.clear();
    }

    fn push_group(&mut self, group: UndoGroup) {
        self.undo_stack.push_back(group);
        if let Some(limit) = self.undo_limit {
            while self.undo_stack.len() > limit {
                self.undo_stack.pop_front();
            }
        }
    }

    /// Prepare and record in one step; call before the buffer changes
    pub fn register_mutation(&mut self, mutation: &TextMutation, buffer: &dyn TextBuffer) {
        if let Some(entry) = self.prepare(mutation, buffer) {
            self.register(entry);
        }
    }

    /// Whether `entry` belongs in the same group as `last`
    ///
    /// Groups break when:
    /// - one mutation inserts and the other deletes
    /// - a deletion is not directly before the previous one, or the previous
    ///   deletion removed a line terminator
    /// - an insertion does not continue where the previous one ended, or
    ///   inserts a line terminator
    /// - non-whitespace typing is followed by whitespace (but not the reverse)
    pub fn should_continue_group(entry: &UndoEntry, last: &UndoEntry) -> bool {
        let (new, previous) = (&entry.mutation, &last.mutation);
        if new.is_delete() != previous.is_delete() {
            return false;
        }

        if new.text.is_empty() {
            return previous.range.start == new.range.end && LineEnding::from_line(&last.inverse.text).is_none();
        }

        if previous.text.len() < GROUPING_TEXT_LIMIT
            && new.text.len() < GROUPING_TEXT_LIMIT
            && !previous.text.trim().is_empty()
            && new.text.trim_matches(|c: char| c.is_whitespace() && c != '\n' && c != '\r').is_empty()
        {
            return false;
        }

        previous.range.start + previous.text.len() == new.range.start && LineEnding::from_line(&new.text).is_none()
    }

    /// Force every mutation until `end_grouping` into one group
    pub fn begin_grouping(&mut self) {
        if self.is_grouping {
            debug_assert!(false, "begin_grouping called while already grouping");
            tracing::warn!("nested begin_grouping ignored");
            return;
        }
        self.is_grouping = true;
    }

    pub fn end_grouping(&mut self) {
        if !self.is_grouping {
            debug_assert!(false, "end_grouping called without begin_grouping");
            tracing::warn!("unbalanced end_grouping ignored");
            return;
        }
        self.is_grouping = false;
    }

    /// Ignore incoming mutations until `enable`; not nestable
    pub fn disable(&mut self) {
        debug_assert!(!self.is_disabled, "disable called while already disabled");
        self.is_disabled = true;
    }

    pub fn enable(&mut self) {
        self.is_disabled = false;
    }

    /// Pop the group to undo and enter the undoing state
    ///
    /// The caller replays [`UndoGroup::undo_mutations`] as ordinary edits and
    /// then hands the group back with [`UndoManager::finish`].
    pub fn begin_undo(&mut self) -> Option<UndoGroup> {
        if self.is_disabled || self.state != UndoState::Idle {
            return None;
        }
        let group = self.undo_stack.pop_back()?;
        self.state = UndoState::Undoing;
        Some(group)
    }

    /// Pop the group to redo and enter the redoing state
    pub fn begin_redo(&mut self) -> Option<UndoGroup> {
        if self.is_disabled || self.state != UndoState::Idle {
            return None;
        }
        let group = self.redo_stack.pop()?;
        self.state = UndoState::Redoing;
        Some(group)
    }

    /// Move a replayed group onto the opposite stack and return to idle
    pub fn finish(&mut self, group: UndoGroup) {
        match self.state {
            UndoState::Undoing => self.redo_stack.push(group),
            UndoState::Redoing => self.push_group(group),
            UndoState::Idle => {
                debug_assert!(false, "finish called while idle");
                tracing::warn!("undo group finished while idle, dropped");
            }
        }
        self.state = UndoState::Idle;
    }
}
