use crate::{Entry, NodeId, RbTree};

/// A double-ended iterator over the entries of an [`RbTree`], in key order.
pub struct Iter<'a, T: Entry> {
    tree: &'a RbTree<T>,
    head: Option<NodeId>,
    tail: Option<NodeId>,
}

impl<'a, T: Entry> Iter<'a, T> {
    pub(crate) fn new(tree: &'a RbTree<T>) -> Self {
        Self {
            tree,
            head: tree.first(),
            tail: tree.last(),
        }
    }
}

impl<'a, T: Entry> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.head?;
        if self.head == self.tail {
            self.head = None;
            self.tail = None;
        } else {
            self.head = self.tree.next(id);
        }
        self.tree.get(id)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.head.is_none() {
            (0, Some(0))
        } else {
            (1, Some(self.tree.len()))
        }
    }
}

impl<T: Entry> DoubleEndedIterator for Iter<'_, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        let id = self.tail?;
        if self.head == self.tail {
            self.head = None;
            self.tail = None;
        } else {
            self.tail = self.tree.prev(id);
        }
        self.tree.get(id)
    }
}

impl<'a, T: Entry> IntoIterator for &'a RbTree<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
