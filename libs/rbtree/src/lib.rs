//! # An arena-backed, augmentable red-black tree.
//!
//! A *red-black tree* is a self-balancing binary search tree that keeps its
//! height within `2 log2(n)` by constraining node colors: the root is black,
//! a red node never has a red child, and every root-to-leaf path crosses the
//! same number of black nodes. All operations complete in logarithmic time.
//!
//! Unlike intrusive designs, nodes here live in an index-addressed arena (a
//! dense vector of slots plus a free list) and refer to each other through
//! [`NodeId`]s. "No child" and "no parent" are absent indices rather than
//! null pointers, which keeps all of the rotation and fixup machinery in
//! safe code.
//!
//! ## Augmentation
//!
//! Entries implement [`Entry`], which supplies the ordering key and a
//! per-subtree *aggregate* ([`Entry::aggregate`]). The tree caches one
//! aggregate per node and recomputes it bottom-up at every structural
//! mutation: along the attachment path on insert, at both pivots of every
//! rotation, and from the splice point upward on removal. Consumers can
//! therefore prune searches on the cached value without ever observing a
//! stale aggregate. A typical use is range allocation, where the aggregate
//! is the largest free gap in a subtree.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

#[cfg(feature = "dot")]
mod dot;
mod iter;
mod node;

use alloc::vec::Vec;
use core::borrow::Borrow;
use core::cmp::Ordering;
use core::fmt;
use core::mem;

#[cfg(feature = "dot")]
pub use dot::Dot;
pub use iter::Iter;
pub use node::NodeId;
use node::{Color, Node, Side, Slot};

/// Trait implemented by types stored in an [`RbTree`].
///
/// Entries must form a total order over [`Entry::Key`], and supply the
/// subtree aggregate the tree maintains on their behalf. Entries that need
/// no augmentation can use `()` as the aggregate.
pub trait Entry {
    /// The type by which entries are ordered within the tree.
    ///
    /// Keys must be unique; inserting a duplicate key panics.
    type Key: Ord;

    /// Cached per-subtree summary, recomputed by the tree whenever the
    /// subtree under a node changes.
    type Aggregate: Copy + PartialEq + fmt::Debug;

    /// Returns the key identifying this entry.
    fn key(&self) -> &Self::Key;

    /// Computes this node's aggregate from its own payload and the cached
    /// aggregates of its children (absent children pass `None`).
    fn aggregate(
        &self,
        left: Option<Self::Aggregate>,
        right: Option<Self::Aggregate>,
    ) -> Self::Aggregate;
}

/// An arena-backed red-black tree. See the [crate docs](crate) for details.
pub struct RbTree<T: Entry> {
    slots: Vec<Slot<T>>,
    free_head: Option<NodeId>,
    root: Option<NodeId>,
    len: usize,
}

impl<T: Entry> Default for RbTree<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entry> RbTree<T> {
    /// Creates a new, empty tree.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_head: None,
            root: None,
            len: 0,
        }
    }

    /// Returns the number of entries in the tree.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the tree contains no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        debug_assert_eq!(self.root.is_none(), self.len == 0);
        self.len == 0
    }

    /// Returns the id of the root node, if any.
    #[must_use]
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Returns the id of `id`'s left child.
    ///
    /// # Panics
    ///
    /// Panics if `id` is stale.
    #[must_use]
    pub fn left(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).left
    }

    /// Returns the id of `id`'s right child.
    ///
    /// # Panics
    ///
    /// Panics if `id` is stale.
    #[must_use]
    pub fn right(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).right
    }

    /// Returns the id of `id`'s parent.
    ///
    /// # Panics
    ///
    /// Panics if `id` is stale.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    /// Returns the cached aggregate over `id`'s subtree.
    ///
    /// # Panics
    ///
    /// Panics if `id` is stale.
    #[must_use]
    pub fn aggregate(&self, id: NodeId) -> T::Aggregate {
        self.node(id).aggregate
    }

    /// Returns a reference to the entry stored at `id`, or `None` if the id
    /// is stale.
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&T> {
        match self.slots.get(id.index())? {
            Slot::Occupied(node) => Some(&node.entry),
            Slot::Vacant { .. } => None,
        }
    }

    /// Returns a mutable reference to the entry stored at `id`, or `None` if
    /// the id is stale.
    ///
    /// The caller must not change the entry's ordering relative to its
    /// neighbors, and must call [`RbTree::propagate`] afterwards if the
    /// mutation changed the entry's aggregate inputs.
    #[must_use]
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut T> {
        match self.slots.get_mut(id.index())? {
            Slot::Occupied(node) => Some(&mut node.entry),
            Slot::Vacant { .. } => None,
        }
    }

    /// Recomputes the cached aggregates from `id` up to the root.
    ///
    /// Call this after mutating an entry through [`RbTree::get_mut`] in a
    /// way that changes its aggregate inputs.
    ///
    /// # Panics
    ///
    /// Panics if `id` is stale.
    pub fn propagate(&mut self, id: NodeId) {
        let mut curr = Some(id);
        while let Some(c) = curr {
            self.update_aggregate(c);
            curr = self.node(c).parent;
        }
    }

    /// Returns the id of the entry with the given key, if present.
    pub fn find<Q>(&self, key: &Q) -> Option<NodeId>
    where
        T::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        match self.search_by(|entry| key.cmp(entry.key().borrow()))? {
            (id, Ordering::Equal) => Some(id),
            _ => None,
        }
    }

    /// Walks the tree with a three-way comparator describing where the
    /// needle sits relative to an entry (`Less` descends left, `Greater`
    /// descends right).
    ///
    /// Returns the node the walk stopped at together with the result of the
    /// final comparison: on `Ordering::Equal` an exact match, otherwise the
    /// node the needle would attach under and the side the miss landed on.
    /// Returns `None` only on an empty tree.
    pub fn search_by<F>(&self, mut cmp: F) -> Option<(NodeId, Ordering)>
    where
        F: FnMut(&T) -> Ordering,
    {
        let mut curr = self.root?;
        loop {
            let ord = cmp(&self.node(curr).entry);
            let next = match ord {
                Ordering::Equal => return Some((curr, ord)),
                Ordering::Less => self.node(curr).left,
                Ordering::Greater => self.node(curr).right,
            };
            match next {
                Some(child) => curr = child,
                None => return Some((curr, ord)),
            }
        }
    }

    /// Returns the id of the first entry in key order.
    #[must_use]
    pub fn first(&self) -> Option<NodeId> {
        self.root.map(|root| self.minimum(root))
    }

    /// Returns the id of the last entry in key order.
    #[must_use]
    pub fn last(&self) -> Option<NodeId> {
        self.root.map(|root| self.maximum(root))
    }

    /// Returns the id of `id`'s in-order successor.
    ///
    /// # Panics
    ///
    /// Panics if `id` is stale.
    #[must_use]
    pub fn next(&self, id: NodeId) -> Option<NodeId> {
        // A non-empty right subtree holds the successor at its minimum;
        // otherwise climb until we leave a left subtree.
        if let Some(right) = self.node(id).right {
            return Some(self.minimum(right));
        }
        let mut curr = id;
        while let Some(parent) = self.node(curr).parent {
            if self.node(parent).left == Some(curr) {
                return Some(parent);
            }
            curr = parent;
        }
        None
    }

    /// Returns the id of `id`'s in-order predecessor.
    ///
    /// # Panics
    ///
    /// Panics if `id` is stale.
    #[must_use]
    pub fn prev(&self, id: NodeId) -> Option<NodeId> {
        if let Some(left) = self.node(id).left {
            return Some(self.maximum(left));
        }
        let mut curr = id;
        while let Some(parent) = self.node(curr).parent {
            if self.node(parent).right == Some(curr) {
                return Some(parent);
            }
            curr = parent;
        }
        None
    }

    /// Gets an iterator over the entries in the tree, in key order.
    #[must_use]
    pub fn iter(&self) -> Iter<'_, T> {
        Iter::new(self)
    }

    /// Inserts a new entry, returning its id.
    ///
    /// # Panics
    ///
    /// Panics if an entry with the same key is already present.
    pub fn insert(&mut self, entry: T) -> NodeId {
        let id = self.allocate(entry);

        if let Some(mut curr) = self.root {
            let side = loop {
                let ord = self.node(id).entry.key().cmp(self.node(curr).entry.key());
                let side = match ord {
                    Ordering::Equal => panic!("key already present in the tree"),
                    Ordering::Less => Side::Left,
                    Ordering::Greater => Side::Right,
                };
                match self.node(curr).child(side) {
                    Some(child) => curr = child,
                    None => break side,
                }
            };

            self.node_mut(id).parent = Some(curr);
            self.node_mut(curr).set_child(side, Some(id));
            self.propagate(id);
            self.fix_after_insert(id);
        } else {
            self.node_mut(id).color = Color::Black;
            self.root = Some(id);
        }

        self.len += 1;
        id
    }

    /// Removes the entry at `id` from the tree and returns it.
    ///
    /// The id is invalidated; its slot may be reused by later insertions.
    ///
    /// # Panics
    ///
    /// Panics if `id` is stale, or if the tree is found to be structurally
    /// corrupted while rebalancing.
    pub fn remove(&mut self, z: NodeId) -> T {
        let (z_left, z_right) = {
            let node = self.node(z);
            (node.left, node.right)
        };

        // Track the color of the physically removed position, the node that
        // took its place and that node's parent. `x` may be absent.
        let removed_color;
        let x;
        let x_parent;

        match (z_left, z_right) {
            (None, child) | (child, None) => {
                removed_color = self.node(z).color;
                x = child;
                x_parent = self.node(z).parent;
                self.transplant(z, child);
            }
            (Some(left), Some(right)) => {
                // Binary node: splice the in-order successor into z's place.
                let y = self.minimum(right);
                removed_color = self.node(y).color;
                x = self.node(y).right;
                if self.node(y).parent == Some(z) {
                    x_parent = Some(y);
                } else {
                    x_parent = self.node(y).parent;
                    self.transplant(y, x);
                    self.node_mut(y).right = Some(right);
                    self.node_mut(right).parent = Some(y);
                }
                self.transplant(z, Some(y));
                self.node_mut(y).left = Some(left);
                self.node_mut(left).parent = Some(y);
                let z_color = self.node(z).color;
                self.node_mut(y).color = z_color;
            }
        }

        // Subtree composition changed from the splice point upward.
        if let Some(parent) = x_parent {
            self.propagate(parent);
        }

        if removed_color == Color::Black {
            self.fix_after_remove(x, x_parent);
        }

        self.len -= 1;
        self.release(z)
    }

    /// Removes all entries from the tree.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.free_head = None;
        self.root = None;
        self.len = 0;
    }

    /// Asserts as many of the tree's invariants as possible: link sanity,
    /// key ordering, the red-black rules and aggregate consistency (cached
    /// aggregates are rebuilt from scratch and compared).
    ///
    /// # Panics
    ///
    /// Panics if any invariant is violated.
    #[track_caller]
    pub fn assert_valid(&self) {
        let Some(root) = self.root else {
            assert_eq!(self.len, 0, "empty tree with non-zero length");
            return;
        };
        assert_eq!(self.node(root).parent, None, "root must not have a parent");
        assert_eq!(self.node(root).color, Color::Black, "root must be black");
        let (_, count, _) = self.check_subtree(root, None, None);
        assert_eq!(count, self.len, "node count does not match tree length");
    }

    fn check_subtree(
        &self,
        id: NodeId,
        min: Option<&T::Key>,
        max: Option<&T::Key>,
    ) -> (usize, usize, T::Aggregate) {
        let node = self.node(id);
        let key = node.entry.key();

        if let Some(min) = min {
            assert!(key > min, "ordering violation: node not greater than its lower bound");
        }
        if let Some(max) = max {
            assert!(key < max, "ordering violation: node not less than its upper bound");
        }
        if node.color == Color::Red {
            assert!(
                !self.is_red(node.left) && !self.is_red(node.right),
                "red node with a red child"
            );
        }

        let (left_height, left_count, left_agg) = match node.left {
            Some(left) => {
                assert_eq!(self.node(left).parent, Some(id), "broken parent link");
                let (h, c, a) = self.check_subtree(left, min, Some(key));
                let h = h + usize::from(self.node(left).color == Color::Black);
                (h, c, Some(a))
            }
            None => (0, 0, None),
        };
        let (right_height, right_count, right_agg) = match node.right {
            Some(right) => {
                assert_eq!(self.node(right).parent, Some(id), "broken parent link");
                let (h, c, a) = self.check_subtree(right, Some(key), max);
                let h = h + usize::from(self.node(right).color == Color::Black);
                (h, c, Some(a))
            }
            None => (0, 0, None),
        };

        assert_eq!(
            left_height, right_height,
            "black-height mismatch between subtrees"
        );

        let rebuilt = node.entry.aggregate(left_agg, right_agg);
        assert_eq!(node.aggregate, rebuilt, "stale cached aggregate");

        (left_height, left_count + right_count + 1, rebuilt)
    }

    /// Returns a graphviz rendering of the tree for debugging.
    #[cfg(feature = "dot")]
    #[must_use]
    pub fn dot(&self) -> Dot<'_, T> {
        Dot { tree: self }
    }

    // === arena management ===

    fn allocate(&mut self, entry: T) -> NodeId {
        let aggregate = entry.aggregate(None, None);
        let node = Node {
            entry,
            aggregate,
            color: Color::Red,
            parent: None,
            left: None,
            right: None,
        };

        if let Some(id) = self.free_head {
            let slot = mem::replace(&mut self.slots[id.index()], Slot::Occupied(node));
            let Slot::Vacant { next_free } = slot else {
                panic!("free list points at an occupied slot");
            };
            self.free_head = next_free;
            id
        } else {
            let id = NodeId::new(self.slots.len());
            self.slots.push(Slot::Occupied(node));
            id
        }
    }

    fn release(&mut self, id: NodeId) -> T {
        let slot = mem::replace(
            &mut self.slots[id.index()],
            Slot::Vacant {
                next_free: self.free_head,
            },
        );
        self.free_head = Some(id);
        let Slot::Occupied(node) = slot else {
            panic!("released a vacant slot");
        };
        node.entry
    }

    fn node(&self, id: NodeId) -> &Node<T> {
        match &self.slots[id.index()] {
            Slot::Occupied(node) => node,
            Slot::Vacant { .. } => panic!("stale node id"),
        }
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node<T> {
        match &mut self.slots[id.index()] {
            Slot::Occupied(node) => node,
            Slot::Vacant { .. } => panic!("stale node id"),
        }
    }

    fn is_red(&self, link: Option<NodeId>) -> bool {
        link.is_some_and(|id| self.node(id).color == Color::Red)
    }

    fn set_color(&mut self, id: NodeId, color: Color) {
        self.node_mut(id).color = color;
    }

    fn minimum(&self, mut curr: NodeId) -> NodeId {
        while let Some(left) = self.node(curr).left {
            curr = left;
        }
        curr
    }

    fn maximum(&self, mut curr: NodeId) -> NodeId {
        while let Some(right) = self.node(curr).right {
            curr = right;
        }
        curr
    }

    fn update_aggregate(&mut self, id: NodeId) {
        let node = self.node(id);
        let left_agg = node.left.map(|left| self.node(left).aggregate);
        let right_agg = node.right.map(|right| self.node(right).aggregate);
        let aggregate = self.node(id).entry.aggregate(left_agg, right_agg);
        self.node_mut(id).aggregate = aggregate;
    }

    // === restructuring ===

    /// Rotates the subtree at `x` towards `side`, pulling x's opposite-side
    /// child into x's place. The in-order sequence is preserved.
    fn rotate(&mut self, x: NodeId, side: Side) {
        let y = self
            .node(x)
            .child(side.opposite())
            .expect("rotation around a node without the required child; tree is corrupted");

        // Standard six-pointer restructure: y takes x's place, x becomes
        // y's `side` child and y's `side` subtree moves under x.
        let y_inner = self.node(y).child(side);
        self.node_mut(x).set_child(side.opposite(), y_inner);
        if let Some(inner) = y_inner {
            self.node_mut(inner).parent = Some(x);
        }

        let parent = self.node(x).parent;
        self.node_mut(y).parent = parent;
        match parent {
            None => self.root = Some(y),
            Some(parent) => {
                if self.node(parent).left == Some(x) {
                    self.node_mut(parent).left = Some(y);
                } else {
                    self.node_mut(parent).right = Some(y);
                }
            }
        }

        self.node_mut(y).set_child(side, Some(x));
        self.node_mut(x).parent = Some(y);

        // Subtree membership changed for exactly these two nodes; ancestors
        // see the same node set and keep their cached aggregates.
        self.update_aggregate(x);
        self.update_aggregate(y);
    }

    /// Replaces the subtree rooted at `u` with the subtree rooted at `v` in
    /// u's parent. Does not touch v's children.
    fn transplant(&mut self, u: NodeId, v: Option<NodeId>) {
        let parent = self.node(u).parent;
        match parent {
            None => self.root = v,
            Some(parent) => {
                if self.node(parent).left == Some(u) {
                    self.node_mut(parent).left = v;
                } else {
                    self.node_mut(parent).right = v;
                }
            }
        }
        if let Some(v) = v {
            self.node_mut(v).parent = parent;
        }
    }

    fn fix_after_insert(&mut self, mut z: NodeId) {
        while let Some(parent) = self.node(z).parent
            && self.node(parent).color == Color::Red
        {
            // A red parent is never the root, so the grandparent exists.
            let grandparent = self
                .node(parent)
                .parent
                .expect("red node at the root; tree is corrupted");
            let side = if self.node(grandparent).left == Some(parent) {
                Side::Left
            } else {
                Side::Right
            };
            let uncle = self.node(grandparent).child(side.opposite());

            if self.is_red(uncle) {
                // Case I: red uncle; recolor and continue from the grandparent.
                self.set_color(parent, Color::Black);
                self.set_color(uncle.expect("red link must be present"), Color::Black);
                self.set_color(grandparent, Color::Red);
                z = grandparent;
                continue;
            }

            let mut parent = parent;
            if self.node(parent).child(side.opposite()) == Some(z) {
                // Case II: z is the inner grandchild; rotate it outward.
                z = parent;
                self.rotate(z, side);
                parent = self
                    .node(z)
                    .parent
                    .expect("rotation must leave the pivot a parent");
            }

            // Case III: outer grandchild; recolor and rotate the grandparent.
            self.set_color(parent, Color::Black);
            self.set_color(grandparent, Color::Red);
            self.rotate(grandparent, side.opposite());
        }

        let root = self.root.expect("fixup ran on an empty tree");
        self.set_color(root, Color::Black);
    }

    fn fix_after_remove(&mut self, mut x: Option<NodeId>, mut parent: Option<NodeId>) {
        // `x` carries an extra unit of blackness; move it up the tree until
        // it can be absorbed by a red node or the root.
        while let Some(p) = parent
            && !self.is_red(x)
        {
            let side = if self.node(p).left == x {
                Side::Left
            } else {
                Side::Right
            };
            let mut w = self
                .node(p)
                .child(side.opposite())
                .expect("doubly-black node without a sibling; tree is corrupted");

            if self.is_red(Some(w)) {
                // Case I: red sibling; rotate it above the parent.
                self.set_color(w, Color::Black);
                self.set_color(p, Color::Red);
                self.rotate(p, side);
                w = self
                    .node(p)
                    .child(side.opposite())
                    .expect("red sibling had no child towards the removal; tree is corrupted");
            }

            let both_nephews_black = {
                let sibling = self.node(w);
                !self.is_red(sibling.left) && !self.is_red(sibling.right)
            };

            if both_nephews_black {
                // Case II: recolor the sibling and move the problem up.
                self.set_color(w, Color::Red);
                x = Some(p);
                parent = self.node(p).parent;
            } else {
                if !self.is_red(self.node(w).child(side.opposite())) {
                    // Case III: red inner nephew; rotate it above the sibling.
                    let inner = self
                        .node(w)
                        .child(side)
                        .expect("inner nephew must be present and red; tree is corrupted");
                    self.set_color(inner, Color::Black);
                    self.set_color(w, Color::Red);
                    self.rotate(w, side.opposite());
                    w = self
                        .node(p)
                        .child(side.opposite())
                        .expect("rotation removed the sibling; tree is corrupted");
                }

                // Case IV: red outer nephew; one rotation restores the
                // black height and terminates the loop.
                let parent_color = self.node(p).color;
                self.set_color(w, parent_color);
                self.set_color(p, Color::Black);
                let outer = self
                    .node(w)
                    .child(side.opposite())
                    .expect("outer nephew must be present and red; tree is corrupted");
                self.set_color(outer, Color::Black);
                self.rotate(p, side);
                x = self.root;
                parent = None;
            }
        }

        if let Some(x) = x {
            self.set_color(x, Color::Black);
        }
    }
}

impl<T: Entry + fmt::Debug> fmt::Debug for RbTree<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}
