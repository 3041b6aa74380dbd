//! The text view: one buffer and every component that tracks it
//!
//! All edits go through [`TextView::replace_characters`] (undo and redo
//! replay through it too), which keeps every component's offsets in step:
//!
//! 1. the highlighter snapshots parser positions from the old text
//! 2. the layout manager updates line boundaries
//! 3. the undo manager captures the inverse from the old text
//! 4. the buffer changes
//! 5. selections are remapped
//! 6. the undo entry is registered
//! 7. the highlighter invalidates what the edit changed
//!
//! Highlight results are then applied and one layout pass runs.

use crate::buffer::{TextBuffer, TextStorage};
use crate::config::EditorConfig;
use crate::coordinates::{LayoutRect, SharedViewport, TextMetrics};
use crate::error::Result;
use crate::highlight::tree_sitter::TreeSitterClient;
use crate::highlight::{HighlightProvider, Highlighter, Theme};
use crate::layout::LayoutManager;
use crate::selection::{self, Destination, Direction, SelectionManager};
use crate::typesetter::TextMeasurer;
use crate::undo::{TextMutation, UndoEntry, UndoGroup, UndoManager};
use std::ops::Range;
use std::path::Path;
use std::sync::Arc;

pub struct TextView {
    storage: TextStorage,
    layout: LayoutManager,
    selection: SelectionManager,
    undo: UndoManager,
    highlighter: Highlighter,
    viewport: SharedViewport,
    config: EditorConfig,
    editable: bool,
}

impl TextView {
    pub fn new(text: impl Into<String>, language: &str, config: EditorConfig, viewport: SharedViewport) -> Self {
        let theme = Theme::default();
        let mut storage = TextStorage::new(text);
        storage.set_default_attributes(theme.text);

        let measurer: Arc<dyn TextMeasurer> =
            Arc::new(TextMetrics::new(config.font_size).with_tab_stops(config.tab_width));
        let mut layout = LayoutManager::new(&storage, &config, measurer, Some(Box::new(viewport.clone())));
        layout.layout_lines(&storage);

        let mut selection = SelectionManager::new(config.highlight_selected_line, config.cursor_blink_interval());
        selection.set_selected_range(0..0, &layout, &storage);

        Self {
            undo: UndoManager::new(config.undo_limit()),
            highlighter: Highlighter::new(&config, theme, language),
            storage,
            layout,
            selection,
            viewport,
            config,
            editable: true,
        }
    }

    /// Open `text` with the configuration at `config_path` and tree-sitter highlighting
    pub fn open(text: impl Into<String>, language: &str, config_path: &Path, viewport: SharedViewport) -> Result<Self> {
        let config = EditorConfig::load(config_path)?;
        Ok(Self::new(text, language, config, viewport).with_tree_sitter())
    }

    /// Highlight with tree-sitter using the view's language
    pub fn with_tree_sitter(mut self) -> Self {
        let client = TreeSitterClient::new(&self.config);
        self.set_highlight_provider(Box::new(client));
        self
    }

    pub fn text(&self) -> &str {
        self.storage.as_str()
    }

    pub fn storage(&self) -> &TextStorage {
        &self.storage
    }

    pub fn layout(&self) -> &LayoutManager {
        &self.layout
    }

    pub fn selection(&self) -> &SelectionManager {
        &self.selection
    }

    pub fn undo_manager(&self) -> &UndoManager {
        &self.undo
    }

    pub fn undo_manager_mut(&mut self) -> &mut UndoManager {
        &mut self.undo
    }

    pub fn highlighter(&self) -> &Highlighter {
        &self.highlighter
    }

    pub fn viewport(&self) -> &SharedViewport {
        &self.viewport
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn is_editable(&self) -> bool {
        self.editable
    }

    pub fn selected_ranges(&self) -> Vec<Range<usize>> {
        self.selection.selected_ranges()
    }

    // === Highlighting ===

    pub fn set_highlight_provider(&mut self, provider: Box<dyn HighlightProvider>) {
        self.highlighter.set_highlight_provider(provider, &self.storage, &self.layout);
        self.highlighter.process_pending(&mut self.storage, &mut self.layout);
    }

    pub fn set_language(&mut self, language: &str) {
        self.highlighter.set_language(language, &mut self.storage, &mut self.layout);
        self.highlighter.process_pending(&mut self.storage, &mut self.layout);
        self.layout.layout_lines(&self.storage);
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.storage.set_default_attributes(theme.text);
        self.highlighter.set_theme(theme, &self.storage, &self.layout);
        self.highlighter.process_pending(&mut self.storage, &mut self.layout);
    }

    // === Selection ===

    pub fn set_selected_ranges(&mut self, ranges: impl IntoIterator<Item = Range<usize>>) {
        self.selection.set_selected_ranges(ranges, &self.layout, &self.storage);
    }

    pub fn add_selected_range(&mut self, range: Range<usize>) {
        self.selection.add_selected_range(range, &self.layout, &self.storage);
    }

    /// Move or extend every selection, scrolling the first one into view
    pub fn move_selections(&mut self, direction: Direction, destination: Destination, modify_selection: bool) {
        self.selection
            .move_selections(direction, destination, modify_selection, &self.layout, &self.storage);
        self.scroll_to_first_selection();
    }

    fn scroll_to_first_selection(&mut self) {
        let Some(offset) = self.selection.selections().first().map(|s| s.range.start) else {
            return;
        };
        let Some(rect) = self.layout.rect_for_offset(offset, &self.storage) else {
            return;
        };
        let rect = LayoutRect::new(rect.x, rect.y, rect.width, self.layout.estimate_line_height());
        let scrolled = {
            let mut viewport = self.viewport.lock();
            let before = viewport.scroll;
            viewport.ensure_visible(rect);
            viewport.scroll != before
        };
        if scrolled {
            self.visible_rect_did_change();
        }
    }

    // === Viewport ===

    /// Scroll and resize the visible area
    pub fn set_visible_rect(&mut self, rect: LayoutRect) {
        {
            let mut viewport = self.viewport.lock();
            viewport.scroll = rect.origin();
            viewport.resize(rect.width, rect.height);
            viewport.attached = true;
        }
        self.visible_rect_did_change();
    }

    fn visible_rect_did_change(&mut self) {
        self.layout.layout_lines(&self.storage);
        self.highlighter.visible_text_changed(&self.storage, &self.layout);
        self.highlighter.process_pending(&mut self.storage, &mut self.layout);
    }

    pub fn set_editable(&mut self, editable: bool) {
        self.editable = editable;
        self.selection.cursor_timer_mut().set_editable(editable);
    }

    pub fn set_focused(&mut self, focused: bool) {
        self.selection.cursor_timer_mut().set_focused(focused);
    }

    /// Apply delivered highlight results and advance the cursor blink
    ///
    /// Returns whether anything changed that needs drawing.
    pub fn tick(&mut self) -> bool {
        let applied = self.highlighter.process_pending(&mut self.storage, &mut self.layout);
        let blinks = self.selection.cursor_timer_mut().poll();
        applied > 0 || blinks > 0
    }

    // === Editing ===

    /// Replace each range with `text` as one undoable step
    ///
    /// Ranges are applied back to front so earlier offsets stay valid.
    /// Overlapping ranges are merged first.
    pub fn replace_characters(&mut self, ranges: &[Range<usize>], text: &str) {
        if !self.editable {
            return;
        }
        let ranges = merge_ranges(ranges);
        let mutations: Vec<TextMutation> = ranges
            .into_iter()
            .rev()
            .map(|range| TextMutation::new(range, text))
            .collect();
        self.apply_mutations(&mutations, true);
    }

    /// Type `text` at every selection
    pub fn insert_text(&mut self, text: &str) {
        let ranges = self.selection.selected_ranges();
        self.replace_characters(&ranges, text);
    }

    /// Delete each selection, or from each cursor back to `destination`
    pub fn delete_backward(&mut self, destination: Destination) {
        self.delete(Direction::Backward, destination);
    }

    /// Delete each selection, or from each cursor forward to `destination`
    pub fn delete_forward(&mut self, destination: Destination) {
        self.delete(Direction::Forward, destination);
    }

    fn delete(&mut self, direction: Direction, destination: Destination) {
        let ranges: Vec<Range<usize>> = self
            .selection
            .selections()
            .iter()
            .filter_map(|selection| {
                if !selection.is_cursor() {
                    return Some(selection.range.clone());
                }
                let offset = selection.range.start;
                let target =
                    selection::destination_offset(offset, direction, destination, None, &self.layout, &self.storage)?;
                Some(offset.min(target)..offset.max(target))
            })
            .collect();
        if ranges.is_empty() {
            return;
        }
        self.replace_characters(&ranges, "");
    }

    /// Replace the whole document, dropping undo history and highlights
    pub fn set_text(&mut self, text: impl Into<String>) {
        let default_attributes = self.storage.default_attributes();
        self.storage = TextStorage::new(text);
        self.storage.set_default_attributes(default_attributes);

        self.undo.clear_stack();
        self.layout.reset(&self.storage);
        self.layout.layout_lines(&self.storage);
        self.selection.set_selected_range(0..0, &self.layout, &self.storage);

        let language = self.highlighter.language().to_string();
        self.set_language(&language);
    }

    /// Undo the most recent group; returns false if there was nothing to undo
    pub fn undo(&mut self) -> bool {
        let Some(group) = self.undo.begin_undo() else {
            return false;
        };
        let mutations: Vec<TextMutation> = group.undo_mutations().cloned().collect();
        self.replay(group, &mutations);
        true
    }

    /// Redo the most recently undone group; returns false if there was nothing to redo
    pub fn redo(&mut self) -> bool {
        let Some(group) = self.undo.begin_redo() else {
            return false;
        };
        let mutations: Vec<TextMutation> = group.redo_mutations().cloned().collect();
        self.replay(group, &mutations);
        true
    }

    fn replay(&mut self, group: UndoGroup, mutations: &[TextMutation]) {
        self.apply_mutations(mutations, false);
        self.undo.finish(group);
    }

    /// Run `mutations` in order inside one layout transaction
    fn apply_mutations(&mut self, mutations: &[TextMutation], record: bool) {
        if mutations.is_empty() {
            return;
        }
        self.layout.begin_transaction();
        self.storage.begin_editing();

        let mut recorded = 0usize;
        for mutation in mutations {
            if let Some(entry) = self.apply_edit(mutation, record) {
                // One keystroke at several cursors is one undo step
                if recorded == 0 {
                    self.undo.register(entry);
                } else {
                    self.undo.append_to_last_group(entry);
                }
                recorded += 1;
            }
        }

        self.storage.end_editing();
        self.highlighter.process_pending(&mut self.storage, &mut self.layout);
        self.layout.end_transaction(&self.storage, false);
    }

    /// Apply one mutation through every component; returns its undo entry
    fn apply_edit(&mut self, mutation: &TextMutation, record: bool) -> Option<UndoEntry> {
        let range = mutation.range.clone();
        if self.storage.substring(range.clone()).is_none() {
            debug_assert!(false, "edit range {range:?} outside buffer or inside a character");
            tracing::warn!(?range, len = self.storage.len(), "ignoring invalid edit");
            return None;
        }
        if mutation.is_noop() {
            return None;
        }

        self.highlighter.will_edit(&self.storage, &range);
        self.layout.will_replace_characters(range.clone(), &mutation.text);
        let entry = record.then(|| self.undo.prepare(mutation, &self.storage)).flatten();

        self.storage.replace_characters(range.clone(), &mutation.text);
        self.selection
            .did_replace_characters(range.clone(), mutation.text.len(), self.storage.len());

        let edited = range.start..range.start + mutation.text.len();
        self.highlighter
            .did_edit(&self.storage, &self.layout, edited, mutation.delta());
        entry
    }
}

impl std::fmt::Debug for TextView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextView")
            .field("len", &self.storage.len())
            .field("selections", &self.selection.selected_ranges())
            .field("layout", &self.layout)
            .field("highlighter", &self.highlighter)
            .finish()
    }
}

/// Sort ranges and merge any that overlap
fn merge_ranges(ranges: &[Range<usize>]) -> Vec<Range<usize>> {
    let mut sorted = ranges.to_vec();
    sorted.sort_by_key(|range| (range.start, range.end));

    let mut merged: Vec<Range<usize>> = Vec::with_capacity(sorted.len());
    for range in sorted {
        match merged.last_mut() {
            Some(last) if range.start < last.end || *last == range => last.end = last.end.max(range.end),
            _ => merged.push(range),
        }
    }
    merged
}
