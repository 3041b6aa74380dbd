//! Balanced line index mapping byte offsets and y positions to lines
//!
//! A red-black tree stored in an arena. Each node is one line carrying its
//! byte length, its cached pixel height and a payload `T`. Nodes cache the
//! summary of their left subtree, which makes these O(log n):
//! - offset → line
//! - y position → line
//! - line index → line
//! - insert / delete / update of a single line

mod iter;
mod node;

use crate::buffer::TextBuffer;
use node::{Color, MetaFixup, Node};
use std::ops::Range;

pub use iter::LineIter;

/// Arena handle for a line node
///
/// Handles stay valid until the next `delete` or `remove_all`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// A line and where it sits in the document
#[derive(Debug, Clone, PartialEq)]
pub struct LinePosition<D> {
    pub id: NodeId,
    pub data: D,
    /// Byte range of the line, including its terminator
    pub range: Range<usize>,
    /// Top edge of the line
    pub y_pos: f32,
    pub height: f32,
    /// Zero-based line number
    pub index: usize,
}

impl<D> LinePosition<D> {
    pub fn max_y(&self) -> f32 {
        self.y_pos + self.height
    }
}

/// Running summary while descending from the root
#[derive(Clone, Copy)]
struct Cursor {
    id: NodeId,
    offset: usize,
    y: f32,
    index: usize,
}

pub struct LineIndex<T> {
    nodes: Vec<Node<T>>,
    root: Option<NodeId>,
    length: usize,
    height: f32,
}

impl<T> Default for LineIndex<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for LineIndex<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineIndex")
            .field("count", &self.count())
            .field("length", &self.length)
            .field("height", &self.height)
            .finish()
    }
}

impl<T> LineIndex<T> {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            root: None,
            length: 0,
            height: 0.0,
        }
    }

    /// Total byte length of every line
    pub fn length(&self) -> usize {
        self.length
    }

    /// Total height of every line
    pub fn height(&self) -> f32 {
        self.height
    }

    /// Number of lines
    pub fn count(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn data(&self, id: NodeId) -> &T {
        &self.node(id).data
    }

    pub fn data_mut(&mut self, id: NodeId) -> &mut T {
        &mut self.node_mut(id).data
    }

    /// Insert a line starting at `offset`
    ///
    /// A line already starting at `offset` ends up after the new one.
    pub fn insert(&mut self, data: T, offset: usize, length: usize, height: f32) {
        debug_assert!(
            offset <= self.length,
            "insert offset {offset} beyond length {}",
            self.length
        );

        self.length += length;
        self.height += height;

        let Some(root) = self.root else {
            let id = self.alloc(Node::new(data, length, height, Color::Black));
            self.root = Some(id);
            return;
        };

        let inserted = self.alloc(Node::new(data, length, height, Color::Red));
        let mut current = root;
        let mut current_offset = self.node(root).left_subtree_offset;
        loop {
            let node = self.node(current);
            if current_offset >= offset {
                match node.left {
                    Some(left) => {
                        current_offset = current_offset - node.left_subtree_offset
                            + self.node(left).left_subtree_offset;
                        current = left;
                    }
                    None => {
                        self.node_mut(current).left = Some(inserted);
                        break;
                    }
                }
            } else {
                match node.right {
                    Some(right) => {
                        current_offset += node.length + self.node(right).left_subtree_offset;
                        current = right;
                    }
                    None => {
                        self.node_mut(current).right = Some(inserted);
                        break;
                    }
                }
            }
        }
        self.node_mut(inserted).parent = Some(current);

        self.meta_fixup(inserted, length as isize, height, MetaFixup::Inserted);
        self.insert_fixup(inserted);
    }

    /// Adjust the length and height of the line containing `offset`
    ///
    /// An offset equal to the document length updates the last line.
    pub fn update(&mut self, offset: usize, delta: isize, delta_height: f32) {
        debug_assert!(
            offset <= self.length,
            "update offset {offset} beyond length {}",
            self.length
        );
        let target = if offset == self.length {
            self.last_cursor()
        } else {
            self.search_offset(offset)
        };
        let Some(cursor) = target else {
            tracing::warn!(offset, length = self.length, "no line to update");
            return;
        };

        let node = self.node_mut(cursor.id);
        debug_assert!(
            delta >= -(node.length as isize),
            "update would shrink a {} byte line by {}",
            node.length,
            -delta
        );
        let delta = delta.max(-(node.length as isize));
        let delta_height = delta_height.max(-node.height);
        node.length = node.length.saturating_add_signed(delta);
        node.height += delta_height;
        self.meta_fixup(cursor.id, delta, delta_height, MetaFixup::None);

        self.length = self.length.saturating_add_signed(delta);
        self.height += delta_height;
    }

    /// Remove the line containing `offset`, returning its payload
    pub fn delete(&mut self, offset: usize) -> Option<T> {
        debug_assert!(
            offset <= self.length,
            "delete offset {offset} beyond length {}",
            self.length
        );
        let cursor = self
            .search_offset(offset)
            .or_else(|| (offset == self.length).then(|| self.last_cursor()).flatten())?;

        if self.count() == 1 {
            let node = self.nodes.pop()?;
            self.remove_all();
            return Some(node.data);
        }

        let (length, height) = {
            let node = self.node(cursor.id);
            (node.length, node.height)
        };
        self.length -= length;
        self.height -= height;
        Some(self.delete_node(cursor.id).data)
    }

    pub fn remove_all(&mut self) {
        self.nodes.clear();
        self.root = None;
        self.length = 0;
        self.height = 0.0;
    }

    /// The line containing `offset`
    ///
    /// `offset == length` resolves to the last line so the end of the
    /// document is addressable.
    pub fn line_at_offset(&self, offset: usize) -> Option<LinePosition<&T>> {
        if offset > self.length {
            return None;
        }
        self.search_offset(offset)
            .or_else(|| (offset == self.length).then(|| self.last_cursor()).flatten())
            .map(|cursor| self.position(cursor))
    }

    /// The line whose vertical span contains `y`, clamped to the first and last lines
    pub fn line_at_position(&self, y: f32) -> Option<LinePosition<&T>> {
        if y >= self.height {
            return self.last();
        }
        if y < 0.0 {
            return self.first();
        }

        let mut current = self.root.map(|root| self.root_cursor(root));
        while let Some(cursor) = current {
            let node = self.node(cursor.id);
            if y >= cursor.y && y < cursor.y + node.height {
                return Some(self.position(cursor));
            } else if cursor.y > y {
                current = self.descend_left(cursor);
            } else {
                current = self.descend_right(cursor);
            }
        }
        None
    }

    /// The line with zero-based number `index`
    pub fn line_at_index(&self, index: usize) -> Option<LinePosition<&T>> {
        if index >= self.count() {
            return None;
        }

        let mut current = self.root.map(|root| self.root_cursor(root));
        while let Some(cursor) = current {
            if index == cursor.index {
                return Some(self.position(cursor));
            } else if index < cursor.index {
                current = self.descend_left(cursor);
            } else {
                current = self.descend_right(cursor);
            }
        }
        None
    }

    pub fn first(&self) -> Option<LinePosition<&T>> {
        self.line_at_index(0)
    }

    pub fn last(&self) -> Option<LinePosition<&T>> {
        self.last_cursor().map(|cursor| self.position(cursor))
    }

    /// Every line, in document order
    pub fn iter(&self) -> LineIter<'_, T> {
        LineIter::all(self)
    }

    /// Lines intersecting `range`, starting with the line holding `range.start`
    pub fn lines_in_range(&self, range: Range<usize>) -> LineIter<'_, T> {
        LineIter::in_range(self, range)
    }

    /// Lines from the one at `min_y` until a line reaches `max_y`
    pub fn lines_starting_at(&self, min_y: f32, max_y: f32) -> LineIter<'_, T> {
        LineIter::starting_at(self, min_y, max_y)
    }

    /// Replace the contents with `lines`, building a balanced tree directly
    ///
    /// Each item is `(data, length, height)` in document order.
    pub fn build(&mut self, lines: impl IntoIterator<Item = (T, usize, f32)>) {
        self.remove_all();
        let mut items: Vec<Option<(T, usize, f32)>> = lines.into_iter().map(Some).collect();
        if items.is_empty() {
            return;
        }
        self.nodes.reserve(items.len());

        // Levels above the deepest one are full, so coloring only the
        // deepest level red keeps every path's black count equal.
        let red_depth = (usize::BITS - 1 - (items.len() + 1).leading_zeros()) as usize;
        let count = items.len();
        let (root, length, height, _) = self.build_range(&mut items, 0, count, None, 0, red_depth);
        self.root = root;
        self.length = length;
        self.height = height;
    }

    fn build_range(
        &mut self,
        items: &mut [Option<(T, usize, f32)>],
        left: usize,
        right: usize,
        parent: Option<NodeId>,
        depth: usize,
        red_depth: usize,
    ) -> (Option<NodeId>, usize, f32, usize) {
        if left >= right {
            return (None, 0, 0.0, 0);
        }
        let mid = left + (right - left) / 2;
        let Some((data, length, height)) = items[mid].take() else {
            return (None, 0, 0.0, 0);
        };

        let color = if depth == red_depth {
            Color::Red
        } else {
            Color::Black
        };
        let id = self.alloc(Node::new(data, length, height, color));
        self.node_mut(id).parent = parent;

        let (left_id, left_length, left_height, left_count) =
            self.build_range(items, left, mid, Some(id), depth + 1, red_depth);
        let (right_id, right_length, right_height, right_count) =
            self.build_range(items, mid + 1, right, Some(id), depth + 1, red_depth);

        let node = self.node_mut(id);
        node.left = left_id;
        node.right = right_id;
        node.left_subtree_offset = left_length;
        node.left_subtree_height = left_height;
        node.left_subtree_count = left_count;

        (
            Some(id),
            left_length + length + right_length,
            left_height + height + right_height,
            left_count + 1 + right_count,
        )
    }

    fn root_cursor(&self, root: NodeId) -> Cursor {
        let node = self.node(root);
        Cursor {
            id: root,
            offset: node.left_subtree_offset,
            y: node.left_subtree_height,
            index: node.left_subtree_count,
        }
    }

    fn descend_left(&self, cursor: Cursor) -> Option<Cursor> {
        let node = self.node(cursor.id);
        let left = node.left?;
        let child = self.node(left);
        Some(Cursor {
            id: left,
            offset: cursor.offset - node.left_subtree_offset + child.left_subtree_offset,
            y: cursor.y - node.left_subtree_height + child.left_subtree_height,
            index: cursor.index - node.left_subtree_count + child.left_subtree_count,
        })
    }

    fn descend_right(&self, cursor: Cursor) -> Option<Cursor> {
        let node = self.node(cursor.id);
        let right = node.right?;
        let child = self.node(right);
        Some(Cursor {
            id: right,
            offset: cursor.offset + node.length + child.left_subtree_offset,
            y: cursor.y + node.height + child.left_subtree_height,
            index: cursor.index + 1 + child.left_subtree_count,
        })
    }

    fn search_offset(&self, offset: usize) -> Option<Cursor> {
        let mut current = self.root.map(|root| self.root_cursor(root));
        while let Some(cursor) = current {
            let node = self.node(cursor.id);
            if offset == cursor.offset
                || (offset > cursor.offset && offset < cursor.offset + node.length)
            {
                return Some(cursor);
            } else if cursor.offset > offset {
                current = self.descend_left(cursor);
            } else {
                current = self.descend_right(cursor);
            }
        }
        None
    }

    fn last_cursor(&self) -> Option<Cursor> {
        let mut cursor = self.root_cursor(self.root?);
        while let Some(next) = self.descend_right(cursor) {
            cursor = next;
        }
        Some(cursor)
    }

    fn position(&self, cursor: Cursor) -> LinePosition<&T> {
        let node = self.node(cursor.id);
        LinePosition {
            id: cursor.id,
            data: &node.data,
            range: cursor.offset..cursor.offset + node.length,
            y_pos: cursor.y,
            height: node.height,
            index: cursor.index,
        }
    }
}

impl<T: Default> LineIndex<T> {
    /// Split the buffer on `\n` and bulk-build one line per terminator
    ///
    /// A buffer ending in a terminator (or empty) gets a trailing empty line.
    pub fn build_from_buffer(buffer: &dyn TextBuffer, estimated_line_height: f32) -> Self {
        let mut index = Self::new();
        let Some(text) = buffer.substring(0..buffer.len()) else {
            return index;
        };

        let bytes = text.as_bytes();
        let mut lines = Vec::with_capacity(bytecount::count(bytes, b'\n') + 1);
        let mut start = 0;
        for newline in memchr::memchr_iter(b'\n', bytes) {
            lines.push((T::default(), newline + 1 - start, estimated_line_height));
            start = newline + 1;
        }
        lines.push((T::default(), bytes.len() - start, estimated_line_height));

        index.build(lines);
        tracing::debug!(lines = index.count(), bytes = index.length(), "built line index");
        index
    }
}
