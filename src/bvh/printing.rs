use std::fmt::{self, Display, Write};

use super::{Bvh, NodeIdx, NodeKind};
use crate::util::Stats;

/// Shape summary of a hierarchy.
#[derive(Clone, Debug, PartialEq)]
pub struct TreeStatistics {
    pub nodes: usize,
    pub internal_nodes: usize,
    pub leaves: usize,
    pub primitives: usize,
    /// Depth of leaves, root has depth 1
    pub depth: Stats,
    /// Number of primitives per leaf
    pub leaf_size: Stats,
}

impl Display for TreeStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Nodes: {} ({} internal, {} leaves)",
            self.nodes, self.internal_nodes, self.leaves
        )?;
        writeln!(f, "Primitives: {}", self.primitives)?;
        writeln!(f, "Leaf depth: {}", self.depth)?;
        write!(f, "Leaf size: {}", self.leaf_size)
    }
}

impl Bvh<'_> {
    pub fn statistics(&self) -> TreeStatistics {
        let leaves: Vec<(usize, usize)> = self
            .depth_first()
            .filter_map(|(_, node_depth, kind)| match kind {
                NodeKind::Leaf { primitives } => Some((node_depth, primitives.len())),
                NodeKind::Inner { .. } => None,
            })
            .collect();
        let depth: Stats = leaves.iter().map(|&(depth, _)| depth).collect();
        let leaf_size: Stats = leaves.iter().map(|&(_, size)| size).collect();

        TreeStatistics {
            nodes: self.nodes.len(),
            internal_nodes: self.nodes.len() - leaf_size.count,
            leaves: leaf_size.count,
            primitives: self.primitives.len(),
            depth,
            leaf_size,
        }
    }

    pub fn print_tree(&self) {
        let mut output = String::new();
        // Writing to a String can't fail
        let _ = self.write_tree(&mut output);
        print!("{output}");
    }

    /// Writes one line per node, indented by depth, children right below their parent.
    pub fn write_tree(&self, out: &mut impl Write) -> fmt::Result {
        for (index, depth, kind) in self.depth_first() {
            let node = &self.nodes[index];
            write!(
                out,
                "{}- {}{}: {:?}-{:?}",
                "  ".repeat(depth - 1),
                if node.is_leaf() { "L" } else { "I" },
                index.index(),
                node.bbox.min.coords.as_slice(),
                node.bbox.max.coords.as_slice(),
            )?;
            if let NodeKind::Leaf { primitives } = kind {
                write!(out, " {:?}", &self.primitives[primitives])?;
            }
            writeln!(out)?;
        }
        Ok(())
    }

    /// Pre-order walk over the tree, yields node index, depth and decoded node.
    /// Uses an explicit stack, degenerate meshes can produce very deep trees.
    fn depth_first(&self) -> impl Iterator<Item = (NodeIdx, usize, NodeKind)> + '_ {
        let mut stack = vec![(NodeIdx::root(), 1)];
        std::iter::from_fn(move || {
            let (index, depth) = stack.pop()?;
            let kind = self.nodes[index].kind();
            if let NodeKind::Inner { first_child, .. } = kind {
                stack.push((first_child + 1, depth + 1));
                stack.push((first_child, depth + 1));
            }
            Some((index, depth, kind))
        })
    }
}
