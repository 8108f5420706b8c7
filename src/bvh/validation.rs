use index_vec::IndexVec;
use thiserror::Error;

use super::{Bvh, NodeIdx, NodeKind};

/// Structural problem found in a hierarchy.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("hierarchy has no nodes")]
    NoNodes,

    #[error("{nodes} nodes for {primitives} primitives, at most {limit} are possible")]
    TooManyNodes {
        nodes: usize,
        primitives: usize,
        limit: usize,
    },

    #[error("node {node} has children at {first_child}, outside of the node array")]
    ChildOutOfRange { node: usize, first_child: usize },

    #[error("node {node} has children at {first_child}, which is not after the node itself")]
    ChildBeforeParent { node: usize, first_child: usize },

    #[error("node {0} is reachable from more than one parent")]
    NodeSharedBetweenParents(usize),

    #[error("node {0} is not reachable from the root")]
    UnreachableNode(usize),

    #[error("node {node} has invalid split axis {axis}")]
    InvalidAxis { node: usize, axis: u8 },

    #[error("leaf {node} has {count} primitives, the limit is {max_primitive}")]
    LeafTooLarge {
        node: usize,
        count: usize,
        max_primitive: u8,
    },

    #[error("leaf {node} references primitives {begin}..{end}, but there are only {len}")]
    LeafOutOfRange {
        node: usize,
        begin: usize,
        end: usize,
        len: usize,
    },

    #[error("bounding box of node {parent} doesn't contain its child {child}")]
    ChildNotContained { parent: usize, child: usize },

    #[error("bounding box of leaf {node} doesn't contain primitive {primitive}")]
    PrimitiveNotContained { node: usize, primitive: u32 },

    #[error("primitive list is not a permutation of 0..{0}")]
    NotAPermutation(usize),

    #[error("primitive {0} is not covered by exactly one leaf")]
    PrimitiveCoverage(u32),
}

impl Bvh<'_> {
    /// Checks the structural invariants of the hierarchy.
    ///
    /// Every node has to be reachable from the root exactly once, leaves must own
    /// disjoint ranges that together cover the whole primitive list, the primitive list
    /// must be a permutation of all triangles and all bounding boxes must contain
    /// their contents exactly (no tolerance).
    pub fn validate(&self) -> Result<(), ValidationError> {
        let node_count = self.nodes.len();
        let primitive_count = self.primitives.len();

        if node_count == 0 {
            return Err(ValidationError::NoNodes);
        }
        let limit = 2 * primitive_count + 1;
        if node_count > limit {
            return Err(ValidationError::TooManyNodes {
                nodes: node_count,
                primitives: primitive_count,
                limit,
            });
        }

        self.validate_permutation()?;

        let mut reached: IndexVec<NodeIdx, bool> = index_vec::index_vec![false; node_count];
        let mut covered = vec![false; primitive_count];
        reached[NodeIdx::root()] = true;

        for (index, node) in self.nodes.iter_enumerated() {
            if !reached[index] {
                // Children always come after parents, so by now every reachable node was seen
                return Err(ValidationError::UnreachableNode(index.index()));
            }

            match node.kind() {
                NodeKind::Inner { first_child, axis } => {
                    if axis >= 3 {
                        return Err(ValidationError::InvalidAxis {
                            node: index.index(),
                            axis: node.axis,
                        });
                    }
                    if first_child.index() + 1 >= node_count {
                        return Err(ValidationError::ChildOutOfRange {
                            node: index.index(),
                            first_child: first_child.index(),
                        });
                    }
                    if first_child <= index {
                        return Err(ValidationError::ChildBeforeParent {
                            node: index.index(),
                            first_child: first_child.index(),
                        });
                    }

                    for child in [first_child, first_child + 1] {
                        if reached[child] {
                            return Err(ValidationError::NodeSharedBetweenParents(child.index()));
                        }
                        reached[child] = true;

                        if !node.bbox.contains(&self.nodes[child].bbox) {
                            return Err(ValidationError::ChildNotContained {
                                parent: index.index(),
                                child: child.index(),
                            });
                        }
                    }
                }
                NodeKind::Leaf { primitives } => {
                    if primitives.len() > self.max_primitive as usize {
                        return Err(ValidationError::LeafTooLarge {
                            node: index.index(),
                            count: primitives.len(),
                            max_primitive: self.max_primitive,
                        });
                    }
                    if primitives.end > primitive_count {
                        return Err(ValidationError::LeafOutOfRange {
                            node: index.index(),
                            begin: primitives.start,
                            end: primitives.end,
                            len: primitive_count,
                        });
                    }

                    for position in primitives {
                        let primitive = self.primitives[position];
                        if std::mem::replace(&mut covered[position], true) {
                            return Err(ValidationError::PrimitiveCoverage(primitive));
                        }
                        if !node.bbox.contains(&self.triangle(primitive).bounding_box()) {
                            return Err(ValidationError::PrimitiveNotContained {
                                node: index.index(),
                                primitive,
                            });
                        }
                    }
                }
            }
        }

        if let Some(position) = covered.iter().position(|&c| !c) {
            return Err(ValidationError::PrimitiveCoverage(self.primitives[position]));
        }

        Ok(())
    }

    fn validate_permutation(&self) -> Result<(), ValidationError> {
        let count = self.indices.len();
        let mut seen = vec![false; count];

        let is_permutation = self.primitives.len() == count
            && self.primitives.iter().all(|&p| {
                seen.get_mut(p as usize)
                    .is_some_and(|seen| !std::mem::replace(seen, true))
            });

        if is_permutation {
            Ok(())
        } else {
            Err(ValidationError::NotAPermutation(count))
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        bvh::BvhNode,
        geometry::{Aabb, WorldPoint},
        mesh::Mesh,
    };

    use assert2::{assert, let_assert};

    fn octahedron_bvh(mesh: &Mesh) -> Bvh<'_> {
        let_assert!(Ok(bvh) = Bvh::create(&mesh.vertices, &mesh.indices, 2));
        bvh
    }

    #[test]
    fn built_hierarchy_is_valid() {
        let mesh = Mesh::octahedron();
        assert!(octahedron_bvh(&mesh).validate() == Ok(()));
    }

    #[test]
    fn duplicate_primitive() {
        let mesh = Mesh::octahedron();
        let mut bvh = octahedron_bvh(&mesh);
        bvh.primitives[1] = bvh.primitives[0];
        assert!(bvh.validate() == Err(ValidationError::NotAPermutation(8)));
    }

    #[test]
    fn primitive_out_of_range() {
        let mesh = Mesh::octahedron();
        let mut bvh = octahedron_bvh(&mesh);
        bvh.primitives[3] = 8;
        assert!(bvh.validate() == Err(ValidationError::NotAPermutation(8)));
    }

    #[test]
    fn shrunk_bounding_box() {
        let mesh = Mesh::octahedron();
        let mut bvh = octahedron_bvh(&mesh);
        let last = NodeIdx::from_usize(bvh.nodes.len() - 1);
        bvh.nodes[last].bbox.max.x -= 0.5;

        let_assert!(
            Err(ValidationError::ChildNotContained { .. } | ValidationError::PrimitiveNotContained { .. }) =
                bvh.validate()
        );
    }

    #[test]
    fn shrunk_root_box() {
        let mesh = Mesh::octahedron();
        let mut bvh = octahedron_bvh(&mesh);
        bvh.nodes[NodeIdx::root()].bbox = Aabb::from_point(WorldPoint::origin());

        let_assert!(Err(ValidationError::ChildNotContained { parent: 0, .. }) = bvh.validate());
    }

    #[test]
    fn oversized_leaf() {
        let mesh = Mesh::octahedron();
        let mut bvh = octahedron_bvh(&mesh);
        bvh.max_primitive = 1;
        let_assert!(Err(ValidationError::LeafTooLarge { max_primitive: 1, .. }) = bvh.validate());
    }

    #[test]
    fn cycle_to_root() {
        let mesh = Mesh::octahedron();
        let mut bvh = octahedron_bvh(&mesh);
        let bbox = bvh.nodes[NodeIdx::from_raw(1)].bbox;
        bvh.nodes[NodeIdx::from_raw(1)] = BvhNode::new_inner(bbox, NodeIdx::root(), 0);

        let_assert!(Err(ValidationError::ChildBeforeParent { node: 1, first_child: 0 }) = bvh.validate());
    }

    #[test]
    fn children_out_of_range() {
        let mesh = Mesh::octahedron();
        let mut bvh = octahedron_bvh(&mesh);
        let bbox = bvh.root().bbox;
        let count = bvh.nodes.len() as u32;
        bvh.nodes[NodeIdx::root()] = BvhNode::new_inner(bbox, NodeIdx::from_raw(count - 1), 0);

        let_assert!(Err(ValidationError::ChildOutOfRange { node: 0, .. }) = bvh.validate());
    }

    #[test]
    fn orphaned_subtree() {
        let mesh = Mesh::octahedron();
        let mut bvh = octahedron_bvh(&mesh);
        // Root points at its grandchildren, nodes 1 and 2 become unreachable
        let bbox = bvh.root().bbox;
        bvh.nodes[NodeIdx::root()] = BvhNode::new_inner(bbox, NodeIdx::from_raw(3), 0);

        let_assert!(Err(ValidationError::UnreachableNode(1)) = bvh.validate());
    }

    #[test]
    fn overlapping_leaves() {
        let mesh = Mesh::octahedron();
        let mut bvh = octahedron_bvh(&mesh);
        let last = NodeIdx::from_usize(bvh.nodes.len() - 1);
        let bbox = bvh.nodes[last].bbox;
        // Same range as some other leaf, one range stays uncovered
        bvh.nodes[last] = BvhNode::new_leaf(bbox, 0, 2);

        let_assert!(
            Err(ValidationError::PrimitiveCoverage(_) | ValidationError::PrimitiveNotContained { .. }) =
                bvh.validate()
        );
    }
}
