//! Incremental layout of visible lines
//!
//! The layout manager owns the line index. Only lines inside the visible rect
//! (plus `vertical_layout_padding` above and below) are typeset; every other
//! line keeps an estimated height until it scrolls into view.

mod edits;
mod reuse;

pub use reuse::ViewReuseQueue;

use crate::buffer::TextBuffer;
use crate::config::EditorConfig;
use crate::coordinates::{HorizontalEdgeInsets, LayoutPos, LayoutRect, LayoutSize};
use crate::line_ending::LineEnding;
use crate::line_index::{LineIndex, LinePosition, NodeId};
use crate::text_line::{TextLine, TextLineId};
use crate::typesetter::{self, DisplayData, FragmentId, LineBreakStrategy, TextMeasurer};
use ahash::AHashSet;
use std::ops::Range;
use std::sync::Arc;

/// Width a caret rect is reported with
pub const CARET_WIDTH: f32 = 1.0;

/// Callbacks into the view that displays laid out text
pub trait LayoutHost {
    /// Visible region in layout space, None while detached from a window
    fn visible_rect(&self) -> Option<LayoutRect>;

    fn viewport_size(&self) -> LayoutSize;

    fn height_did_update(&mut self, new_height: f32);

    fn max_width_did_change(&mut self, new_width: f32);

    /// Scroll by `delta` so content above the viewport does not appear to jump
    fn y_adjustment(&mut self, delta: f32);

    /// Redraw `rect`, or everything when None
    fn set_needs_display(&mut self, _rect: Option<LayoutRect>) {}
}

/// A positioned line fragment ready for drawing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FragmentView {
    pub fragment_id: Option<FragmentId>,
    /// Document byte range drawn by this view
    pub range: Range<usize>,
    pub origin: LayoutPos,
    pub width: f32,
    pub height: f32,
}

pub struct LayoutManager {
    line_index: LineIndex<TextLine>,
    host: Option<Box<dyn LayoutHost>>,
    measurer: Arc<dyn TextMeasurer>,

    line_height_multiplier: f32,
    wrap_lines: bool,
    edge_insets: HorizontalEdgeInsets,
    line_break_strategy: LineBreakStrategy,
    vertical_layout_padding: f32,
    detected_line_ending: LineEnding,

    view_reuse_queue: ViewReuseQueue<FragmentId, FragmentView>,
    visible_line_ids: AHashSet<TextLineId>,
    /// Forces every visible line to be typeset on the next pass
    needs_layout: bool,
    transaction_counter: usize,
    /// Widest line seen so far; only grows until `reset`
    max_line_width: f32,
    reported_height: Option<f32>,
    layout_passes: u64,
}

impl LayoutManager {
    pub fn new(
        buffer: &dyn TextBuffer,
        config: &EditorConfig,
        measurer: Arc<dyn TextMeasurer>,
        host: Option<Box<dyn LayoutHost>>,
    ) -> Self {
        let mut manager = Self {
            line_index: LineIndex::new(),
            host,
            measurer,
            line_height_multiplier: config.line_height_multiplier,
            wrap_lines: config.wrap_lines,
            edge_insets: config.edge_insets,
            line_break_strategy: config.line_break_strategy,
            vertical_layout_padding: config.vertical_layout_padding,
            detected_line_ending: LineEnding::default(),
            view_reuse_queue: ViewReuseQueue::default(),
            visible_line_ids: AHashSet::new(),
            needs_layout: false,
            transaction_counter: 0,
            max_line_width: 0.0,
            reported_height: None,
            layout_passes: 0,
        };
        manager.prepare_text_lines(buffer);
        manager
    }

    /// Build the line index from the buffer if it is empty
    fn prepare_text_lines(&mut self, buffer: &dyn TextBuffer) {
        if !self.line_index.is_empty() {
            return;
        }
        let start = std::time::Instant::now();
        self.line_index = LineIndex::build_from_buffer(buffer, self.estimate_line_height());
        self.detected_line_ending = LineEnding::detect(&self.line_index, buffer);
        tracing::debug!(
            lines = self.line_index.count(),
            elapsed_us = start.elapsed().as_micros() as u64,
            line_ending = ?self.detected_line_ending,
            "prepared text lines"
        );
    }

    /// Drop all layout state and rebuild from `buffer`
    pub fn reset(&mut self, buffer: &dyn TextBuffer) {
        self.line_index.remove_all();
        self.visible_line_ids.clear();
        self.view_reuse_queue.clear();
        self.max_line_width = 0.0;
        self.reported_height = None;
        self.prepare_text_lines(buffer);
        self.set_needs_layout();
    }

    pub fn set_host(&mut self, host: Option<Box<dyn LayoutHost>>) {
        self.host = host;
        self.set_needs_layout();
    }

    pub fn host(&self) -> Option<&dyn LayoutHost> {
        self.host.as_deref()
    }

    pub fn measurer(&self) -> &dyn TextMeasurer {
        self.measurer.as_ref()
    }

    pub fn line_index(&self) -> &LineIndex<TextLine> {
        &self.line_index
    }

    pub fn line_count(&self) -> usize {
        self.line_index.count()
    }

    pub fn detected_line_ending(&self) -> LineEnding {
        self.detected_line_ending
    }

    /// Layout passes performed so far
    pub fn layout_pass_count(&self) -> u64 {
        self.layout_passes
    }

    // === Settings ===

    pub fn line_height_multiplier(&self) -> f32 {
        self.line_height_multiplier
    }

    pub fn set_line_height_multiplier(&mut self, multiplier: f32) {
        self.line_height_multiplier = multiplier;
        self.set_needs_layout();
    }

    pub fn wrap_lines(&self) -> bool {
        self.wrap_lines
    }

    pub fn set_wrap_lines(&mut self, wrap_lines: bool) {
        self.wrap_lines = wrap_lines;
        self.set_needs_layout();
    }

    pub fn edge_insets(&self) -> HorizontalEdgeInsets {
        self.edge_insets
    }

    pub fn set_edge_insets(&mut self, edge_insets: HorizontalEdgeInsets) {
        self.edge_insets = edge_insets;
        let width = self.max_line_width + edge_insets.horizontal();
        if let Some(host) = self.host.as_mut() {
            host.max_width_did_change(width);
        }
        self.set_needs_layout();
    }

    pub fn line_break_strategy(&self) -> LineBreakStrategy {
        self.line_break_strategy
    }

    pub fn set_line_break_strategy(&mut self, strategy: LineBreakStrategy) {
        self.line_break_strategy = strategy;
        self.set_needs_layout();
    }

    pub fn vertical_layout_padding(&self) -> f32 {
        self.vertical_layout_padding
    }

    pub fn set_vertical_layout_padding(&mut self, padding: f32) {
        self.vertical_layout_padding = padding;
        self.set_needs_layout();
    }

    /// Line height for the current font, including the multiplier
    pub fn estimate_line_height(&self) -> f32 {
        self.measurer.natural_line_height() * self.line_height_multiplier
    }

    /// Width lines wrap at, unbounded when wrapping is off
    pub fn max_line_layout_width(&self) -> f32 {
        match (&self.host, self.wrap_lines) {
            (Some(host), true) => host.viewport_size().width - self.edge_insets.horizontal(),
            _ => f32::MAX,
        }
    }

    // === Transactions ===

    pub fn is_in_transaction(&self) -> bool {
        self.transaction_counter > 0
    }

    /// Suppress layout until the matching `end_transaction`
    pub fn begin_transaction(&mut self) {
        self.transaction_counter += 1;
    }

    /// Close a transaction, laying out once the outermost one ends
    pub fn end_transaction(&mut self, buffer: &dyn TextBuffer, force_layout: bool) {
        if self.transaction_counter == 0 {
            debug_assert!(false, "end_transaction called without a matching begin");
            tracing::warn!("unbalanced end_transaction ignored");
            return;
        }
        self.transaction_counter -= 1;
        if self.transaction_counter == 0 {
            if force_layout {
                self.set_needs_layout();
            }
            self.layout_lines(buffer);
        }
    }

    // === Invalidation ===

    /// Force a full relayout of visible lines on the next pass
    pub fn set_needs_layout(&mut self) {
        self.needs_layout = true;
        if let Some(host) = self.host.as_mut() {
            host.set_needs_display(None);
        }
    }

    /// Mark every line intersecting `range` for relayout
    pub fn invalidate_layout_for_range(&mut self, range: Range<usize>) {
        let lines: Vec<(NodeId, f32, f32)> = self
            .line_index
            .lines_in_range(range)
            .map(|line| (line.id, line.y_pos, line.height))
            .collect();
        self.invalidate_lines(&lines);
    }

    /// Mark every line intersecting `rect` for relayout
    pub fn invalidate_layout_for_rect(&mut self, rect: LayoutRect) {
        let lines: Vec<(NodeId, f32, f32)> = self
            .line_index
            .lines_starting_at(rect.min_y(), rect.max_y())
            .map(|line| (line.id, line.y_pos, line.height))
            .collect();
        self.invalidate_lines(&lines);
    }

    fn invalidate_lines(&mut self, lines: &[(NodeId, f32, f32)]) {
        let mut dirty: Option<LayoutRect> = None;
        for &(id, y_pos, height) in lines {
            self.line_index.data_mut(id).set_needs_layout();
            let rect = LayoutRect::new(0.0, y_pos, f32::MAX, height);
            dirty = Some(dirty.map_or(rect, |d| d.union(&rect)));
        }
        if let (Some(host), Some(rect)) = (self.host.as_mut(), dirty) {
            host.set_needs_display(Some(rect));
        }
    }

    /// An attributes-only edit: the text and line structure are unchanged
    pub fn attributes_changed(&mut self, range: Range<usize>) {
        self.invalidate_layout_for_range(range);
    }

    // === Queries ===

    pub fn text_line_for_offset(&self, offset: usize) -> Option<LinePosition<&TextLine>> {
        self.line_index.line_at_offset(offset)
    }

    pub fn text_line_for_position(&self, y: f32) -> Option<LinePosition<&TextLine>> {
        self.line_index.line_at_position(y)
    }

    pub fn text_line_for_index(&self, index: usize) -> Option<LinePosition<&TextLine>> {
        self.line_index.line_at_index(index)
    }

    /// Scrollable content size
    pub fn content_size(&self) -> LayoutSize {
        LayoutSize::new(
            self.max_line_width + self.edge_insets.horizontal(),
            self.line_index.height(),
        )
    }

    /// Byte range of the lines inside the host's visible rect
    pub fn visible_text_range(&self) -> Option<Range<usize>> {
        let rect = self.host.as_ref()?.visible_rect()?;
        let first = self.line_index.line_at_position(rect.min_y())?;
        let last = self.line_index.line_at_position(rect.max_y())?;
        Some(first.range.start..last.range.end)
    }

    /// Byte offset nearest to `point`, in layout space
    pub fn text_offset_at_point(&self, point: LayoutPos, buffer: &dyn TextBuffer) -> Option<usize> {
        if point.y > self.line_index.height() {
            return None;
        }
        let line = self.line_index.line_at_position(point.y)?;
        let (fragment_range, _) = self.fragment_at_y(&line, point.y - line.y_pos);
        let start = line.range.start + fragment_range.start;
        let end = line.range.start + fragment_range.end;
        let text = buffer.substring(start..end)?;
        let x = point.x - self.edge_insets.left;
        Some(start + typesetter::offset_at_x(&text, x, self.measurer.as_ref()))
    }

    /// Caret rect for `offset`, in layout space
    pub fn rect_for_offset(&self, offset: usize, buffer: &dyn TextBuffer) -> Option<LayoutRect> {
        let line = self.line_index.line_at_offset(offset)?;
        let relative = offset - line.range.start;
        let fragments = &line.data.typesetter.line_fragments;
        let (fragment_start, fragment_y, height) = match fragments.line_at_offset(relative) {
            Some(fragment) => (fragment.range.start, fragment.y_pos, fragment.height),
            None => (0, 0.0, line.height),
        };
        let prefix = buffer.substring(line.range.start + fragment_start..offset)?;
        let x = self.edge_insets.left + typesetter::measure(&prefix, self.measurer.as_ref());
        Some(LayoutRect::new(x, line.y_pos + fragment_y, CARET_WIDTH, height))
    }

    /// Line-relative byte range and top of the fragment at `y` within `line`
    ///
    /// A line that has never been typeset is treated as one fragment.
    pub fn fragment_at_y(&self, line: &LinePosition<&TextLine>, y: f32) -> (Range<usize>, f32) {
        match line.data.typesetter.line_fragments.line_at_position(y) {
            Some(fragment) => (fragment.range, fragment.y_pos),
            None => (0..line.range.len(), 0.0),
        }
    }

    /// Views laid out by the last pass
    pub fn fragment_views(&self) -> impl Iterator<Item = &FragmentView> {
        self.view_reuse_queue.used_views.values()
    }

    // === Layout ===

    /// Typeset every line in the padded visible rect that needs it
    pub fn layout_lines(&mut self, buffer: &dyn TextBuffer) {
        let Some(visible_rect) = self.host.as_ref().and_then(|host| host.visible_rect()) else {
            return;
        };
        if self.is_in_transaction() || !buffer.is_available() {
            return;
        }

        let min_y = (visible_rect.min_y() - self.vertical_layout_padding).max(0.0);
        let max_y = (visible_rect.max_y() + self.vertical_layout_padding).max(0.0);
        let max_width = self.max_line_layout_width();
        let original_height = self.line_index.height();
        let mut used_fragment_ids = AHashSet::new();
        let mut force_layout = self.needs_layout;
        let mut new_visible_lines = AHashSet::new();
        let mut y_content_adjustment = 0.0;
        let mut max_found_line_width = self.max_line_width;
        let mut dirty: Option<LayoutRect> = None;
        let mut laid_out = 0usize;

        let mut next = self.line_index.line_at_position(min_y).map(|line| line.index);
        while let Some(index) = next {
            // Heights change during the pass, so look each line up fresh
            let Some(position) = self.line_index.line_at_index(index) else {
                break;
            };
            if position.y_pos >= max_y {
                break;
            }
            let (id, line_id) = (position.id, position.data.id);
            let (range, y_pos, height) = (position.range.clone(), position.y_pos, position.height);

            if force_layout
                || position.data.needs_layout(max_width)
                || !self.visible_line_ids.contains(&line_id)
            {
                let size = self.layout_line(id, range.clone(), y_pos, max_width, buffer, &mut used_fragment_ids);
                laid_out += 1;
                if size.height != height {
                    self.line_index.update(range.start, 0, size.height - height);
                    // Every later line moved
                    force_layout = true;
                    if y_pos < min_y {
                        y_content_adjustment += size.height - height;
                    }
                }
                max_found_line_width = max_found_line_width.max(size.width);
                let rect = LayoutRect::new(0.0, y_pos, f32::MAX, size.height);
                dirty = Some(dirty.map_or(rect, |d| d.union(&rect)));
            } else {
                used_fragment_ids.extend(position.data.typesetter.line_fragments.iter().map(|f| f.data.id));
            }
            new_visible_lines.insert(line_id);
            next = Some(index + 1);
        }

        self.view_reuse_queue.enqueue_views_not_in(&used_fragment_ids);
        self.visible_line_ids = new_visible_lines;
        self.needs_layout = false;
        self.layout_passes += 1;

        let height = self.line_index.height();
        let height_changed = original_height != height || self.reported_height != Some(height);
        let width_changed = max_found_line_width > self.max_line_width;
        if width_changed {
            self.max_line_width = max_found_line_width;
        }
        let content_width = self.max_line_width + self.edge_insets.horizontal();

        tracing::trace!(
            laid_out,
            visible = self.visible_line_ids.len(),
            min_y,
            max_y,
            height,
            "layout pass"
        );

        let Some(host) = self.host.as_mut() else {
            return;
        };
        if height_changed {
            self.reported_height = Some(height);
            host.height_did_update(height);
        }
        if width_changed {
            host.max_width_did_change(content_width);
        }
        if y_content_adjustment != 0.0 {
            host.y_adjustment(y_content_adjustment);
        }
        if dirty.is_some() {
            host.set_needs_display(dirty);
        }
    }

    /// Typeset one line and position its fragment views; returns its size
    fn layout_line(
        &mut self,
        id: NodeId,
        range: Range<usize>,
        y_pos: f32,
        max_width: f32,
        buffer: &dyn TextBuffer,
        used_fragment_ids: &mut AHashSet<FragmentId>,
    ) -> LayoutSize {
        let estimated_line_height = self.estimate_line_height();
        let display = DisplayData {
            max_width,
            line_height_multiplier: self.line_height_multiplier,
            estimated_line_height,
        };
        let text = buffer.substring(range.clone()).unwrap_or_default();

        let line = self.line_index.data_mut(id);
        line.prepare_for_display(display, &text, self.line_break_strategy, self.measurer.as_ref());

        if range.is_empty() {
            return LayoutSize::new(0.0, estimated_line_height);
        }

        let mut size = LayoutSize::default();
        for fragment in line.typesetter.line_fragments.iter() {
            let view = self.view_reuse_queue.get_or_create_view(fragment.data.id);
            *view = FragmentView {
                fragment_id: Some(fragment.data.id),
                range: range.start + fragment.range.start..range.start + fragment.range.end,
                origin: LayoutPos::new(self.edge_insets.left, y_pos + fragment.y_pos),
                width: fragment.data.width,
                height: fragment.data.scaled_height,
            };
            size.width = size.width.max(fragment.data.width);
            size.height += fragment.data.scaled_height;
            used_fragment_ids.insert(fragment.data.id);
        }
        size
    }
}

impl std::fmt::Debug for LayoutManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayoutManager")
            .field("line_index", &self.line_index)
            .field("transaction_counter", &self.transaction_counter)
            .field("max_line_width", &self.max_line_width)
            .field("visible_lines", &self.visible_line_ids.len())
            .finish()
    }
}
