//! Arena node storage plus the red-black balancing operations
//!
//! Every node caches the total length, height and node count of its left
//! subtree. Rotations and deletes keep those caches exact so descents can
//! translate offsets, y positions and indices in O(log n).

use super::{LineIndex, NodeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Color {
    Red,
    Black,
}

#[derive(Debug, Clone)]
pub(super) struct Node<T> {
    pub length: usize,
    pub height: f32,
    pub data: T,

    pub left_subtree_offset: usize,
    pub left_subtree_height: f32,
    pub left_subtree_count: usize,

    pub left: Option<NodeId>,
    pub right: Option<NodeId>,
    pub parent: Option<NodeId>,
    pub color: Color,
}

impl<T> Node<T> {
    pub fn new(data: T, length: usize, height: f32, color: Color) -> Self {
        Self {
            length,
            height,
            data,
            left_subtree_offset: 0,
            left_subtree_height: 0.0,
            left_subtree_count: 0,
            left: None,
            right: None,
            parent: None,
            color,
        }
    }
}

/// How a summary change affects the ancestors' left-subtree counts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum MetaFixup {
    None,
    Inserted,
    Deleted,
}

impl<T> LineIndex<T> {
    pub(super) fn node(&self, id: NodeId) -> &Node<T> {
        &self.nodes[id.0]
    }

    pub(super) fn node_mut(&mut self, id: NodeId) -> &mut Node<T> {
        &mut self.nodes[id.0]
    }

    pub(super) fn alloc(&mut self, node: Node<T>) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    fn color_of(&self, id: Option<NodeId>) -> Color {
        id.map_or(Color::Black, |id| self.node(id).color)
    }

    fn set_color(&mut self, id: Option<NodeId>, color: Color) {
        if let Some(id) = id {
            self.node_mut(id).color = color;
        }
    }

    /// Propagate a length/height change from `start` to every ancestor that
    /// holds it in its left subtree.
    pub(super) fn meta_fixup(
        &mut self,
        start: NodeId,
        delta: isize,
        delta_height: f32,
        action: MetaFixup,
    ) {
        let mut current = start;
        while let Some(parent) = self.node(current).parent {
            if self.node(parent).left == Some(current) {
                let node = self.node_mut(parent);
                node.left_subtree_offset = node.left_subtree_offset.saturating_add_signed(delta);
                node.left_subtree_height += delta_height;
                match action {
                    MetaFixup::Inserted => node.left_subtree_count += 1,
                    MetaFixup::Deleted => node.left_subtree_count -= 1,
                    MetaFixup::None => {}
                }
            }
            current = parent;
        }
    }

    /// Replace the parent's link to `old` with `new`
    fn replace_child(&mut self, parent: Option<NodeId>, old: NodeId, new: Option<NodeId>) {
        match parent {
            None => self.root = new,
            Some(p) => {
                let node = self.node_mut(p);
                if node.left == Some(old) {
                    node.left = new;
                } else {
                    node.right = new;
                }
            }
        }
    }

    fn rotate_left(&mut self, x: NodeId) {
        let Some(y) = self.node(x).right else {
            return;
        };

        let y_left = self.node(y).left;
        self.node_mut(x).right = y_left;
        if let Some(b) = y_left {
            self.node_mut(b).parent = Some(x);
        }

        let x_parent = self.node(x).parent;
        self.node_mut(y).parent = x_parent;
        self.replace_child(x_parent, x, Some(y));

        self.node_mut(y).left = Some(x);
        self.node_mut(x).parent = Some(y);

        // x and its left subtree move under y's left side
        let (length, height, count) = {
            let node = self.node(x);
            (
                node.length + node.left_subtree_offset,
                node.height + node.left_subtree_height,
                1 + node.left_subtree_count,
            )
        };
        let node = self.node_mut(y);
        node.left_subtree_offset += length;
        node.left_subtree_height += height;
        node.left_subtree_count += count;
    }

    fn rotate_right(&mut self, x: NodeId) {
        let Some(y) = self.node(x).left else {
            return;
        };

        let y_right = self.node(y).right;
        self.node_mut(x).left = y_right;
        if let Some(b) = y_right {
            self.node_mut(b).parent = Some(x);
        }

        let x_parent = self.node(x).parent;
        self.node_mut(y).parent = x_parent;
        self.replace_child(x_parent, x, Some(y));

        self.node_mut(y).right = Some(x);
        self.node_mut(x).parent = Some(y);

        // y and its left subtree leave x's left side
        let (length, height, count) = {
            let node = self.node(y);
            (
                node.length + node.left_subtree_offset,
                node.height + node.left_subtree_height,
                1 + node.left_subtree_count,
            )
        };
        let node = self.node_mut(x);
        node.left_subtree_offset -= length;
        node.left_subtree_height -= height;
        node.left_subtree_count -= count;
    }

    pub(super) fn insert_fixup(&mut self, inserted: NodeId) {
        let mut z = inserted;
        while let Some(parent) = self.node(z).parent {
            if self.node(parent).color != Color::Red {
                break;
            }
            let Some(grandparent) = self.node(parent).parent else {
                break;
            };

            if self.node(grandparent).left == Some(parent) {
                let uncle = self.node(grandparent).right;
                if self.color_of(uncle) == Color::Red {
                    self.node_mut(parent).color = Color::Black;
                    self.set_color(uncle, Color::Black);
                    self.node_mut(grandparent).color = Color::Red;
                    z = grandparent;
                    continue;
                }
                if self.node(parent).right == Some(z) {
                    z = parent;
                    self.rotate_left(z);
                }
                let Some(parent) = self.node(z).parent else {
                    break;
                };
                let Some(grandparent) = self.node(parent).parent else {
                    break;
                };
                self.node_mut(parent).color = Color::Black;
                self.node_mut(grandparent).color = Color::Red;
                self.rotate_right(grandparent);
            } else {
                let uncle = self.node(grandparent).left;
                if self.color_of(uncle) == Color::Red {
                    self.node_mut(parent).color = Color::Black;
                    self.set_color(uncle, Color::Black);
                    self.node_mut(grandparent).color = Color::Red;
                    z = grandparent;
                    continue;
                }
                if self.node(parent).left == Some(z) {
                    z = parent;
                    self.rotate_right(z);
                }
                let Some(parent) = self.node(z).parent else {
                    break;
                };
                let Some(grandparent) = self.node(parent).parent else {
                    break;
                };
                self.node_mut(parent).color = Color::Black;
                self.node_mut(grandparent).color = Color::Red;
                self.rotate_left(grandparent);
            }
        }
        self.set_color(self.root, Color::Black);
    }

    fn transplant(&mut self, u: NodeId, v: Option<NodeId>) {
        let parent = self.node(u).parent;
        self.replace_child(parent, u, v);
        if let Some(v) = v {
            self.node_mut(v).parent = parent;
        }
    }

    fn minimum(&self, mut id: NodeId) -> NodeId {
        while let Some(left) = self.node(id).left {
            id = left;
        }
        id
    }

    /// Unlink `z`, rebalance, and release its arena slot
    pub(super) fn delete_node(&mut self, z: NodeId) -> Node<T> {
        let (length, height) = {
            let node = self.node(z);
            (node.length as isize, node.height)
        };
        self.meta_fixup(z, -length, -height, MetaFixup::Deleted);

        let z_left = self.node(z).left;
        let z_right = self.node(z).right;
        let z_parent = self.node(z).parent;

        let (x, x_parent, removed_color) = match (z_left, z_right) {
            (None, child) | (child, None) => {
                let color = self.node(z).color;
                self.transplant(z, child);
                (child, z_parent, color)
            }
            (Some(zl), Some(zr)) => {
                let y = self.minimum(zr);

                // y leaves its slot; drop it from ancestors between y and z
                let (y_length, y_height) = {
                    let node = self.node(y);
                    (node.length, node.height)
                };
                let mut current = y;
                while let Some(parent) = self.node(current).parent {
                    if parent == z {
                        break;
                    }
                    if self.node(parent).left == Some(current) {
                        let node = self.node_mut(parent);
                        node.left_subtree_offset -= y_length;
                        node.left_subtree_height -= y_height;
                        node.left_subtree_count -= 1;
                    }
                    current = parent;
                }

                let color = self.node(y).color;
                let x = self.node(y).right;
                let x_parent = if self.node(y).parent == Some(z) {
                    Some(y)
                } else {
                    let y_parent = self.node(y).parent;
                    self.transplant(y, x);
                    self.node_mut(y).right = Some(zr);
                    self.node_mut(zr).parent = Some(y);
                    y_parent
                };

                self.transplant(z, Some(y));
                self.node_mut(y).left = Some(zl);
                self.node_mut(zl).parent = Some(y);

                let (z_color, offset, subtree_height, count) = {
                    let node = self.node(z);
                    (
                        node.color,
                        node.left_subtree_offset,
                        node.left_subtree_height,
                        node.left_subtree_count,
                    )
                };
                let node = self.node_mut(y);
                node.color = z_color;
                node.left_subtree_offset = offset;
                node.left_subtree_height = subtree_height;
                node.left_subtree_count = count;

                (x, x_parent, color)
            }
        };

        if removed_color == Color::Black {
            self.delete_fixup(x, x_parent);
        }

        self.free_node(z)
    }

    fn delete_fixup(&mut self, x: Option<NodeId>, x_parent: Option<NodeId>) {
        let mut x = x;
        let mut parent = x_parent;

        while x != self.root && self.color_of(x) == Color::Black {
            let Some(p) = parent else {
                break;
            };

            if self.node(p).left == x {
                let Some(mut w) = self.node(p).right else {
                    break;
                };
                if self.node(w).color == Color::Red {
                    self.node_mut(w).color = Color::Black;
                    self.node_mut(p).color = Color::Red;
                    self.rotate_left(p);
                    match self.node(p).right {
                        Some(sibling) => w = sibling,
                        None => break,
                    }
                }
                if self.color_of(self.node(w).left) == Color::Black
                    && self.color_of(self.node(w).right) == Color::Black
                {
                    self.node_mut(w).color = Color::Red;
                    x = Some(p);
                    parent = self.node(p).parent;
                } else {
                    if self.color_of(self.node(w).right) == Color::Black {
                        self.set_color(self.node(w).left, Color::Black);
                        self.node_mut(w).color = Color::Red;
                        self.rotate_right(w);
                        match self.node(p).right {
                            Some(sibling) => w = sibling,
                            None => break,
                        }
                    }
                    self.node_mut(w).color = self.node(p).color;
                    self.node_mut(p).color = Color::Black;
                    self.set_color(self.node(w).right, Color::Black);
                    self.rotate_left(p);
                    x = self.root;
                    break;
                }
            } else {
                let Some(mut w) = self.node(p).left else {
                    break;
                };
                if self.node(w).color == Color::Red {
                    self.node_mut(w).color = Color::Black;
                    self.node_mut(p).color = Color::Red;
                    self.rotate_right(p);
                    match self.node(p).left {
                        Some(sibling) => w = sibling,
                        None => break,
                    }
                }
                if self.color_of(self.node(w).left) == Color::Black
                    && self.color_of(self.node(w).right) == Color::Black
                {
                    self.node_mut(w).color = Color::Red;
                    x = Some(p);
                    parent = self.node(p).parent;
                } else {
                    if self.color_of(self.node(w).left) == Color::Black {
                        self.set_color(self.node(w).right, Color::Black);
                        self.node_mut(w).color = Color::Red;
                        self.rotate_left(w);
                        match self.node(p).left {
                            Some(sibling) => w = sibling,
                            None => break,
                        }
                    }
                    self.node_mut(w).color = self.node(p).color;
                    self.node_mut(p).color = Color::Black;
                    self.set_color(self.node(w).left, Color::Black);
                    self.rotate_right(p);
                    x = self.root;
                    break;
                }
            }
        }

        self.set_color(x, Color::Black);
    }

    /// Remove an unlinked node from the arena, moving the last slot into its place
    fn free_node(&mut self, id: NodeId) -> Node<T> {
        let last = NodeId(self.nodes.len() - 1);
        let removed = self.nodes.swap_remove(id.0);
        if id == last {
            return removed;
        }

        // The node that lived at `last` now lives at `id`
        let (parent, left, right) = {
            let node = self.node(id);
            (node.parent, node.left, node.right)
        };
        match parent {
            None => {
                if self.root == Some(last) {
                    self.root = Some(id);
                }
            }
            Some(p) => {
                let node = self.node_mut(p);
                if node.left == Some(last) {
                    node.left = Some(id);
                } else if node.right == Some(last) {
                    node.right = Some(id);
                }
            }
        }
        if let Some(left) = left {
            self.node_mut(left).parent = Some(id);
        }
        if let Some(right) = right {
            self.node_mut(right).parent = Some(id);
        }
        removed
    }
}
