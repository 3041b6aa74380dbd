//! Incremental syntax highlighting
//!
//! The highlighter tracks which offsets are highlighted (`valid`), which have
//! a request in flight (`pending`) and which are on screen (`visible`). Only
//! visible, invalid, non-pending offsets are requested, in chunks of at most
//! `highlight_chunk_size` bytes.
//!
//! Providers answer through callbacks that may fire on any thread. Every
//! callback posts a message onto a channel that `process_pending` drains on
//! the thread owning the buffer, so attributes are only ever written there.
//! Each edit bumps a generation counter; highlight results requested before
//! an edit are dropped instead of being applied at shifted offsets.

mod capture;
mod index_set;
mod provider;
mod theme;
pub mod tree_sitter;

pub use capture::CaptureName;
pub use index_set::IndexSet;
pub use provider::{HighlightCallback, HighlightProvider, HighlightRange, InvalidationCallback};
pub use theme::Theme;

use crate::buffer::TextBuffer;
use crate::config::EditorConfig;
use crate::error::{Error, Result};
use crate::layout::LayoutManager;
use crossbeam::channel::{self, Receiver, Sender};
use std::collections::VecDeque;
use std::ops::Range;

/// Edits remembered for re-basing late invalidation results
const EDIT_LOG_LIMIT: usize = 256;

enum HighlightMessage {
    Highlights {
        generation: u64,
        range: Range<usize>,
        result: Result<Vec<HighlightRange>>,
    },
    Invalidate {
        generation: u64,
        edited: Range<usize>,
        result: Result<IndexSet>,
    },
}

impl HighlightMessage {
    fn generation(&self) -> u64 {
        match self {
            Self::Highlights { generation, .. } | Self::Invalidate { generation, .. } => *generation,
        }
    }
}

#[derive(Debug, Clone)]
struct LoggedEdit {
    generation: u64,
    pre_range: Range<usize>,
    delta: isize,
}

pub struct Highlighter {
    valid: IndexSet,
    pending: IndexSet,
    visible: IndexSet,

    provider: Option<Box<dyn HighlightProvider>>,
    theme: Theme,
    language: String,
    chunk_size: usize,

    generation: u64,
    /// Messages older than this belong to a discarded provider or language
    discarded_before: u64,
    edit_log: VecDeque<LoggedEdit>,
    in_flight: usize,
    sender: Sender<HighlightMessage>,
    receiver: Receiver<HighlightMessage>,
}

impl Highlighter {
    pub fn new(config: &EditorConfig, theme: Theme, language: impl Into<String>) -> Self {
        let (sender, receiver) = channel::unbounded();
        Self {
            valid: IndexSet::new(),
            pending: IndexSet::new(),
            visible: IndexSet::new(),
            provider: None,
            theme,
            language: language.into(),
            chunk_size: config.highlight_chunk_size.max(1),
            generation: 0,
            discarded_before: 0,
            edit_log: VecDeque::new(),
            in_flight: 0,
            sender,
            receiver,
        }
    }

    pub fn valid_set(&self) -> &IndexSet {
        &self.valid
    }

    pub fn pending_set(&self) -> &IndexSet {
        &self.pending
    }

    pub fn visible_set(&self) -> &IndexSet {
        &self.visible
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    /// True while a provider callback has not been processed yet
    pub fn has_outstanding_requests(&self) -> bool {
        self.in_flight > 0
    }

    /// Install a provider and re-highlight everything visible
    pub fn set_highlight_provider(
        &mut self,
        mut provider: Box<dyn HighlightProvider>,
        buffer: &dyn TextBuffer,
        layout: &LayoutManager,
    ) {
        if let Err(err) = provider.set_up(buffer, &self.language) {
            tracing::warn!(language = %self.language, %err, "highlight provider set-up failed");
        }
        self.provider = Some(provider);
        self.discard_requests();
        self.invalidate_all(buffer, layout);
    }

    /// Switch language, clearing every highlight before re-highlighting
    pub fn set_language(
        &mut self,
        language: impl Into<String>,
        buffer: &mut dyn TextBuffer,
        layout: &mut LayoutManager,
    ) {
        self.language = language.into();
        tracing::debug!(language = %self.language, "highlighter language changed");

        let plain = self.theme.attributes_for(None);
        buffer.set_attributes(0..buffer.len(), plain);
        if let Some(rect) = layout.host().and_then(|host| host.visible_rect()) {
            layout.invalidate_layout_for_rect(rect);
        }

        self.valid.clear();
        self.discard_requests();
        if let Some(provider) = self.provider.as_mut() {
            if let Err(err) = provider.set_up(&*buffer, &self.language) {
                tracing::warn!(language = %self.language, %err, "highlight provider set-up failed");
            }
        }
        self.invalidate_all(&*buffer, layout);
    }

    /// Replace the theme and re-highlight everything visible
    pub fn set_theme(&mut self, theme: Theme, buffer: &dyn TextBuffer, layout: &LayoutManager) {
        self.theme = theme;
        self.invalidate_all(buffer, layout);
    }

    /// Invalidate the whole document
    pub fn invalidate_all(&mut self, buffer: &dyn TextBuffer, layout: &LayoutManager) {
        self.update_visible_set(layout);
        self.invalidate(0..buffer.len(), buffer);
    }

    /// Highlight text that scrolled into view
    pub fn visible_text_changed(&mut self, buffer: &dyn TextBuffer, layout: &LayoutManager) {
        self.update_visible_set(layout);
        let newly_invalid = self.visible.subtract(&self.valid);
        for range in newly_invalid.ranges().to_vec() {
            self.invalidate(range, buffer);
        }
    }

    /// Called before `range` is replaced, while the old text is still readable
    pub fn will_edit(&mut self, buffer: &dyn TextBuffer, range: &Range<usize>) {
        if let Some(provider) = self.provider.as_mut() {
            provider.will_apply_edit(buffer, range);
        }
    }

    /// `edited` (post-edit coordinates) replaced text, changing the length by `delta`
    pub fn did_edit(
        &mut self,
        buffer: &dyn TextBuffer,
        layout: &LayoutManager,
        edited: Range<usize>,
        delta: isize,
    ) {
        let pre_end = (edited.end as isize - delta).max(edited.start as isize) as usize;
        let pre_range = edited.start..pre_end;

        self.generation += 1;
        self.valid.apply_edit(&pre_range, delta);
        self.visible.apply_edit(&pre_range, delta);
        self.pending.clear();
        self.edit_log.push_back(LoggedEdit {
            generation: self.generation,
            pre_range: pre_range.clone(),
            delta,
        });
        if self.edit_log.len() > EDIT_LOG_LIMIT {
            self.edit_log.pop_front();
        }

        if delta > 0 {
            self.visible.insert(edited.clone());
        }
        self.update_visible_set(layout);

        let Some(provider) = self.provider.as_mut() else {
            return;
        };
        let sender = self.sender.clone();
        let generation = self.generation;
        self.in_flight += 1;
        provider.apply_edit(
            buffer,
            pre_range,
            delta,
            Box::new(move |result| {
                let _ = sender.send(HighlightMessage::Invalidate {
                    generation,
                    edited,
                    result,
                });
            }),
        );
    }

    /// Apply every provider result delivered so far; returns how many were handled
    pub fn process_pending(&mut self, buffer: &mut dyn TextBuffer, layout: &mut LayoutManager) -> usize {
        let mut processed = 0;
        while let Ok(message) = self.receiver.try_recv() {
            processed += 1;
            if message.generation() < self.discarded_before {
                continue;
            }
            self.in_flight = self.in_flight.saturating_sub(1);
            match message {
                HighlightMessage::Highlights {
                    generation,
                    range,
                    result,
                } => self.apply_highlight_result(generation, range, result, buffer, layout),
                HighlightMessage::Invalidate {
                    generation,
                    edited,
                    result,
                } => self.apply_invalidation(generation, edited, result, &*buffer),
            }
        }
        if self.in_flight == 0 {
            self.edit_log.clear();
        }
        processed
    }

    /// Next range to request: `(all - valid) & visible - pending`, first run, chunked
    pub fn next_range(&self, document_length: usize) -> Option<Range<usize>> {
        let range = IndexSet::from_range(0..document_length)
            .subtract(&self.valid)
            .intersection(&self.visible)
            .subtract(&self.pending)
            .first_range()?;
        Some(range.start..range.end.min(range.start + self.chunk_size))
    }

    fn update_visible_set(&mut self, layout: &LayoutManager) {
        if let Some(range) = layout.visible_text_range() {
            self.visible = IndexSet::from_range(range);
        }
    }

    /// Forget every request made so far; their messages will be ignored
    fn discard_requests(&mut self) {
        self.generation += 1;
        self.discarded_before = self.generation;
        self.pending.clear();
        self.in_flight = 0;
        self.edit_log.clear();
    }

    fn invalidate(&mut self, range: Range<usize>, buffer: &dyn TextBuffer) {
        if range.is_empty() {
            return;
        }
        self.valid.remove(range);
        self.highlight_invalid_ranges(buffer);
    }

    fn highlight_invalid_ranges(&mut self, buffer: &dyn TextBuffer) {
        if self.provider.is_none() {
            return;
        }
        let mut ranges = Vec::new();
        while let Some(range) = self.next_range(buffer.len()) {
            self.pending.insert(range.clone());
            ranges.push(range);
        }
        if ranges.is_empty() {
            return;
        }
        tracing::trace!(?ranges, generation = self.generation, "requesting highlights");

        let Some(provider) = self.provider.as_mut() else {
            return;
        };
        for range in ranges {
            let sender = self.sender.clone();
            let generation = self.generation;
            self.in_flight += 1;
            provider.query_highlights_for(
                buffer,
                range.clone(),
                Box::new(move |result| {
                    let _ = sender.send(HighlightMessage::Highlights {
                        generation,
                        range,
                        result,
                    });
                }),
            );
        }
    }

    fn apply_highlight_result(
        &mut self,
        generation: u64,
        range: Range<usize>,
        result: Result<Vec<HighlightRange>>,
        buffer: &mut dyn TextBuffer,
        layout: &mut LayoutManager,
    ) {
        if generation != self.generation {
            tracing::trace!(?range, generation, current = self.generation, "dropping stale highlights");
            return;
        }
        self.pending.remove(range.clone());
        if !self.visible.intersects(&range) {
            return;
        }

        let highlights = result.unwrap_or_else(|err| {
            tracing::warn!(?range, %err, "highlight query failed");
            Vec::new()
        });
        self.valid.insert(range.clone());

        let length = buffer.len();
        layout.begin_transaction();

        let mut ignored = IndexSet::from_range(range.clone());
        for highlight in &highlights {
            let clipped = highlight.range.start.max(range.start)..highlight.range.end.min(range.end).min(length);
            if clipped.is_empty() {
                continue;
            }
            buffer.set_attributes(clipped.clone(), self.theme.attributes_for(highlight.capture));
            ignored.remove(clipped);
        }

        // Reset anything left over so removed captures do not keep stale colors
        let plain = self.theme.attributes_for(None);
        for ignored_range in ignored.ranges() {
            let ignored_range = ignored_range.start..ignored_range.end.min(length);
            if !ignored_range.is_empty() {
                buffer.set_attributes(ignored_range, plain);
            }
        }

        layout.attributes_changed(range);
        layout.end_transaction(&*buffer, false);
    }

    fn apply_invalidation(
        &mut self,
        generation: u64,
        edited: Range<usize>,
        result: Result<IndexSet>,
        buffer: &dyn TextBuffer,
    ) {
        let mut invalid = match result {
            Ok(set) => set,
            Err(Error::ParserTimeout) => {
                tracing::warn!(?edited, "parser timed out, re-highlighting the edited range only");
                IndexSet::new()
            }
            Err(err) => {
                tracing::warn!(?edited, %err, "edit could not be applied by the highlight provider");
                IndexSet::new()
            }
        };
        invalid.insert(edited);

        if generation != self.generation {
            let history_lost = self
                .edit_log
                .front()
                .map_or(true, |edit| edit.generation > generation + 1);
            if history_lost {
                self.invalidate(0..buffer.len(), buffer);
                return;
            }
            for edit in self.edit_log.iter().filter(|edit| edit.generation > generation) {
                invalid.apply_edit(&edit.pre_range, edit.delta);
            }
        }

        let length = buffer.len();
        for range in invalid.ranges().to_vec() {
            let range = range.start.min(length)..range.end.min(length);
            if !range.is_empty() {
                self.valid.remove(range);
            }
        }
        // Requests dropped by the edit are re-issued even when nothing was invalidated
        self.highlight_invalid_ranges(buffer);
    }
}

impl std::fmt::Debug for Highlighter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Highlighter")
            .field("language", &self.language)
            .field("valid", &self.valid)
            .field("pending", &self.pending)
            .field("visible", &self.visible)
            .field("generation", &self.generation)
            .field("in_flight", &self.in_flight)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn highlighter(chunk_size: usize) -> Highlighter {
        let config = EditorConfig {
            highlight_chunk_size: chunk_size,
            ..EditorConfig::default()
        };
        Highlighter::new(&config, Theme::one_dark(), "rust")
    }

    #[test]
    fn test_next_range_is_chunked() {
        let mut highlighter = highlighter(10);
        highlighter.visible = IndexSet::from_range(0..25);
        assert_eq!(highlighter.next_range(100), Some(0..10));

        highlighter.pending.insert(0..10);
        assert_eq!(highlighter.next_range(100), Some(10..20));

        highlighter.valid.insert(10..20);
        assert_eq!(highlighter.next_range(100), Some(20..25));
    }

    #[test]
    fn test_next_range_skips_invisible_text() {
        let mut highlighter = highlighter(1024);
        highlighter.visible = IndexSet::from_range(50..80);
        highlighter.valid.insert(50..60);
        assert_eq!(highlighter.next_range(200), Some(60..80));
        // Visible text past the end of the document is ignored
        assert_eq!(highlighter.next_range(70), Some(60..70));
    }

    #[test]
    fn test_nothing_requested_without_visible_text() {
        let highlighter = highlighter(1024);
        assert_eq!(highlighter.next_range(500), None);
    }
}
