//! Layout-space geometry and the viewport the layout manager reports to
//!
//! Two coordinate spaces matter to the text core:
//! 1. Document space: byte offsets into the buffer
//! 2. Layout space: logical pixels, pre-scroll (where lines and fragments live)
//!
//! The host converts layout space to whatever it renders in.

use crate::layout::LayoutHost;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// === Layout Space (pre-scroll) ===

/// Position in layout space - where things are before scrolling
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LayoutPos {
    pub x: f32,
    pub y: f32,
}

impl LayoutPos {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Size in layout space
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LayoutSize {
    pub width: f32,
    pub height: f32,
}

impl LayoutSize {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Rectangle in layout space
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LayoutRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl LayoutRect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn min_x(&self) -> f32 {
        self.x
    }

    pub fn max_x(&self) -> f32 {
        self.x + self.width
    }

    pub fn min_y(&self) -> f32 {
        self.y
    }

    pub fn max_y(&self) -> f32 {
        self.y + self.height
    }

    pub fn origin(&self) -> LayoutPos {
        LayoutPos::new(self.x, self.y)
    }

    pub fn contains(&self, pos: LayoutPos) -> bool {
        pos.x >= self.x
            && pos.x <= self.x + self.width
            && pos.y >= self.y
            && pos.y <= self.y + self.height
    }

    pub fn intersects(&self, other: &LayoutRect) -> bool {
        self.min_x() < other.max_x()
            && other.min_x() < self.max_x()
            && self.min_y() < other.max_y()
            && other.min_y() < self.max_y()
    }

    /// Smallest rect containing both
    pub fn union(&self, other: &LayoutRect) -> LayoutRect {
        let x = self.min_x().min(other.min_x());
        let y = self.min_y().min(other.min_y());
        LayoutRect {
            x,
            y,
            width: self.max_x().max(other.max_x()) - x,
            height: self.max_y().max(other.max_y()) - y,
        }
    }
}

/// Horizontal padding applied around laid out text
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct HorizontalEdgeInsets {
    pub left: f32,
    pub right: f32,
}

impl HorizontalEdgeInsets {
    pub fn new(left: f32, right: f32) -> Self {
        Self { left, right }
    }

    pub fn horizontal(&self) -> f32 {
        self.left + self.right
    }
}

// === Text Metrics (single source of truth) ===

/// All text measurement configuration in one place
#[derive(Debug, Clone, PartialEq)]
pub struct TextMetrics {
    /// Base font size in logical pixels
    pub font_size: f32,
    /// Average glyph advance in logical pixels (monospace)
    pub space_width: f32,
    /// Number of spaces per tab
    pub tab_stops: u32,
}

impl TextMetrics {
    pub fn new(font_size: f32) -> Self {
        Self {
            font_size,
            space_width: font_size * 0.6, // Approximate for monospace
            tab_stops: 4,
        }
    }

    pub fn with_tab_stops(mut self, tab_stops: u32) -> Self {
        self.tab_stops = tab_stops.max(1);
        self
    }

    /// Get tab width in logical pixels
    pub fn tab_width(&self) -> f32 {
        self.space_width * self.tab_stops as f32
    }

    /// Line height before any multiplier (ascent + descent)
    pub fn natural_line_height(&self) -> f32 {
        self.font_size
    }
}

// === Viewport ===

/// Scroll state and canvas size of the host view
#[derive(Debug, Clone, Default)]
pub struct Viewport {
    /// Current scroll position in layout space
    pub scroll: LayoutPos,
    /// Logical size of the visible area
    pub logical_size: LayoutSize,
    /// Size of the scrollable content, as last reported by layout
    pub content_size: LayoutSize,
    /// False until the host attaches the view to a window
    pub attached: bool,
    /// Region that must be redrawn, accumulated until the host takes it
    pub needs_display: Option<LayoutRect>,
}

/// Viewport handle shared between the host and the layout manager
pub type SharedViewport = Arc<Mutex<Viewport>>;

impl Viewport {
    pub fn new(logical_width: f32, logical_height: f32) -> Self {
        Self {
            logical_size: LayoutSize::new(logical_width, logical_height),
            attached: true,
            ..Self::default()
        }
    }

    pub fn shared(self) -> SharedViewport {
        Arc::new(Mutex::new(self))
    }

    /// Update viewport on window resize
    pub fn resize(&mut self, logical_width: f32, logical_height: f32) {
        self.logical_size = LayoutSize::new(logical_width, logical_height);
    }

    /// The visible rectangle in layout space
    pub fn visible_rect(&self) -> LayoutRect {
        LayoutRect::new(
            self.scroll.x,
            self.scroll.y,
            self.logical_size.width,
            self.logical_size.height,
        )
    }

    /// Scroll vertically, clamped to the content
    pub fn scroll_to_y(&mut self, y: f32) {
        let max_y = (self.content_size.height - self.logical_size.height).max(0.0);
        self.scroll.y = y.clamp(0.0, max_y);
    }

    /// Scroll to make a layout rect visible
    pub fn ensure_visible(&mut self, rect: LayoutRect) {
        if rect.min_x() < self.scroll.x {
            self.scroll.x = rect.min_x();
        } else if rect.max_x() > self.scroll.x + self.logical_size.width {
            self.scroll.x = rect.max_x() - self.logical_size.width;
        }

        if rect.min_y() < self.scroll.y {
            self.scroll.y = rect.min_y();
        } else if rect.max_y() > self.scroll.y + self.logical_size.height {
            self.scroll.y = rect.max_y() - self.logical_size.height;
        }
    }

    /// Take the accumulated redraw region
    pub fn take_needs_display(&mut self) -> Option<LayoutRect> {
        self.needs_display.take()
    }
}

impl LayoutHost for SharedViewport {
    fn visible_rect(&self) -> Option<LayoutRect> {
        let viewport = self.lock();
        viewport.attached.then(|| viewport.visible_rect())
    }

    fn viewport_size(&self) -> LayoutSize {
        self.lock().logical_size
    }

    fn height_did_update(&mut self, new_height: f32) {
        self.lock().content_size.height = new_height;
    }

    fn max_width_did_change(&mut self, new_width: f32) {
        self.lock().content_size.width = new_width;
    }

    fn y_adjustment(&mut self, delta: f32) {
        self.lock().scroll.y += delta;
    }

    fn set_needs_display(&mut self, rect: Option<LayoutRect>) {
        let mut viewport = self.lock();
        let rect = rect.unwrap_or_else(|| viewport.visible_rect());
        viewport.needs_display = Some(match viewport.needs_display {
            Some(existing) => existing.union(&rect),
            None => rect,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visible_rect_follows_scroll() {
        let mut viewport = Viewport::new(800.0, 600.0);
        viewport.content_size = LayoutSize::new(800.0, 5000.0);
        viewport.scroll_to_y(200.0);

        assert_eq!(viewport.visible_rect(), LayoutRect::new(0.0, 200.0, 800.0, 600.0));

        // Clamped to the end of the content
        viewport.scroll_to_y(10_000.0);
        assert_eq!(viewport.scroll.y, 4400.0);
    }

    #[test]
    fn test_ensure_visible() {
        let mut viewport = Viewport::new(800.0, 600.0);
        viewport.ensure_visible(LayoutRect::new(10.0, 700.0, 2.0, 20.0));
        assert_eq!(viewport.scroll.y, 120.0);

        viewport.ensure_visible(LayoutRect::new(10.0, 50.0, 2.0, 20.0));
        assert_eq!(viewport.scroll.y, 50.0);
    }

    #[test]
    fn test_shared_viewport_as_host() {
        let mut shared = Viewport::new(800.0, 600.0).shared();

        shared.height_did_update(1234.0);
        shared.y_adjustment(10.0);
        shared.set_needs_display(Some(LayoutRect::new(0.0, 0.0, 10.0, 10.0)));
        shared.set_needs_display(Some(LayoutRect::new(0.0, 20.0, 10.0, 10.0)));

        let mut viewport = shared.lock();
        assert_eq!(viewport.content_size.height, 1234.0);
        assert_eq!(viewport.scroll.y, 10.0);
        assert_eq!(
            viewport.take_needs_display(),
            Some(LayoutRect::new(0.0, 0.0, 10.0, 30.0))
        );
    }

    #[test]
    fn test_detached_viewport_has_no_visible_rect() {
        let mut viewport = Viewport::new(800.0, 600.0);
        viewport.attached = false;
        assert_eq!(viewport.shared().visible_rect(), None);
    }

    #[test]
    fn test_rect_intersection() {
        let a = LayoutRect::new(0.0, 0.0, 10.0, 10.0);
        assert!(a.intersects(&LayoutRect::new(5.0, 5.0, 10.0, 10.0)));
        assert!(!a.intersects(&LayoutRect::new(10.0, 0.0, 10.0, 10.0)));
        assert!(a.contains(LayoutPos::new(10.0, 10.0)));
    }
}
