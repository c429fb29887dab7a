use core::fmt;

use crate::node::{Color, Side};
use crate::{Entry, NodeId, RbTree};

/// Graphviz rendering of an [`RbTree`], produced by [`RbTree::dot`].
pub struct Dot<'a, T: Entry> {
    pub(crate) tree: &'a RbTree<T>,
}

impl<T: Entry + fmt::Debug> Dot<'_, T> {
    fn node_fmt(&self, f: &mut fmt::Formatter<'_>, id: NodeId) -> fmt::Result {
        let node = self.tree.node(id);
        let color = match node.color {
            Color::Red => "red",
            Color::Black => "black",
        };

        f.write_fmt(format_args!(
            r#"{index} [label="{entry:?} ({agg:?})" color="{color}"];"#,
            index = id.index(),
            entry = node.entry,
            agg = node.aggregate,
        ))?;

        let mut print_side = |side: Side| -> fmt::Result {
            if let Some(child) = node.child(side) {
                f.write_fmt(format_args!(
                    r#"{} -> {} [label="{side}"];"#,
                    id.index(),
                    child.index(),
                ))?;
                self.node_fmt(f, child)?;
            }
            Ok(())
        };
        print_side(Side::Left)?;
        print_side(Side::Right)
    }
}

impl<T: Entry + fmt::Debug> fmt::Display for Dot<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("digraph {")?;
        if let Some(root) = self.tree.root {
            self.node_fmt(f, root)?;
        }
        f.write_str("}")
    }
}
