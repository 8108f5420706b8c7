mod building;
pub mod export;
mod printing;
mod ray_bvh_intersection;
mod validation;

use std::ops::Range;

use bytemuck::{Pod, Zeroable};
use index_vec::IndexVec;

use crate::geometry::{Aabb, FloatType, Triangle, WorldPoint};

pub use building::BuildError;
pub use printing::TreeStatistics;
pub use ray_bvh_intersection::StackCache;
pub use validation::ValidationError;

/// Leaf size used when the caller doesn't care.
pub const DEFAULT_MAX_PRIMITIVE: u8 = 2;

/// Binary tree of bounding boxes over an indexed triangle mesh.
///
/// The hierarchy borrows the vertex and index buffers it was built from and never
/// copies geometry, the buffers must outlive it.
/// Triangles (primitives) are referred to by their position in the index buffer.
#[derive(Clone, Debug)]
pub struct Bvh<'a> {
    vertices: &'a [WorldPoint],
    indices: &'a [[u32; 3]],

    /// Permutation of triangle indices, each leaf owns a contiguous range of it.
    primitives: Vec<u32>,
    /// Root is at index 0, siblings are always stored next to each other.
    nodes: IndexVec<NodeIdx, BvhNode>,

    max_primitive: u8,
}

/// Fixed size (32 bytes) node of the hierarchy.
///
/// `num_primitives == 0` marks an inner node whose children are stored at
/// `begin` and `begin + 1` in the node array, otherwise the node is a leaf
/// owning `primitives[begin..begin + num_primitives]`.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct BvhNode {
    /// Exact bounds of everything in the subtree.
    pub bbox: Aabb,
    pub begin: u32,
    pub num_primitives: u8,
    /// Split axis used to create the children (0: x, 1: y, 2: z), unused in leaves.
    pub axis: u8,
    padding: [u8; 2],
}

const _: () = assert!(std::mem::size_of::<BvhNode>() == 32);
const _: () = assert!(std::mem::align_of::<BvhNode>() == 4);
const _: () = assert!(std::mem::offset_of!(BvhNode, begin) == 24);
const _: () = assert!(std::mem::offset_of!(BvhNode, num_primitives) == 28);
const _: () = assert!(std::mem::offset_of!(BvhNode, axis) == 29);

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Inner { first_child: NodeIdx, axis: usize },
    Leaf { primitives: Range<usize> },
}

impl BvhNode {
    /// Create a new leaf node, panics if count is out of range
    pub fn new_leaf(bbox: Aabb, begin: usize, count: usize) -> Self {
        assert!(count >= 1);
        assert!(count <= u8::MAX as usize);
        assert!(begin <= u32::MAX as usize);
        BvhNode {
            bbox,
            begin: begin as u32,
            num_primitives: count as u8,
            axis: 0,
            padding: [0; 2],
        }
    }

    /// Create a new inner node, panics if axis is out of range
    pub fn new_inner(bbox: Aabb, first_child: NodeIdx, axis: usize) -> Self {
        assert!(axis < 3);
        BvhNode {
            bbox,
            begin: first_child.raw(),
            num_primitives: 0,
            axis: axis as u8,
            padding: [0; 2],
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.num_primitives > 0
    }

    pub fn kind(&self) -> NodeKind {
        if self.is_leaf() {
            let begin = self.begin as usize;
            NodeKind::Leaf {
                primitives: begin..begin + self.num_primitives as usize,
            }
        } else {
            NodeKind::Inner {
                first_child: NodeIdx::from_raw(self.begin),
                axis: self.axis as usize,
            }
        }
    }
}

index_vec::define_index_type! {
    pub struct NodeIdx = u32;
    IMPL_RAW_CONVERSIONS = true;
}

impl NodeIdx {
    pub fn root() -> NodeIdx {
        NodeIdx::from_raw(0)
    }
}

/// Which intersection a query is interested in.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum HitMode {
    /// The globally nearest intersection along the ray.
    #[default]
    Closest,
    /// Any intersection within range, traversal stops at the first one found.
    Any,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Hit {
    /// Distance along the ray, in multiples of the ray direction length.
    pub t: FloatType,
    /// Index of the triangle in the index buffer.
    pub primitive: u32,
}

impl<'a> Bvh<'a> {
    pub fn vertices(&self) -> &'a [WorldPoint] {
        self.vertices
    }

    pub fn indices(&self) -> &'a [[u32; 3]] {
        self.indices
    }

    /// Triangle indices, reordered so that each leaf owns a contiguous range.
    pub fn primitives(&self) -> &[u32] {
        &self.primitives
    }

    pub fn nodes(&self) -> &IndexVec<NodeIdx, BvhNode> {
        &self.nodes
    }

    pub fn root(&self) -> &BvhNode {
        &self.nodes[NodeIdx::root()]
    }

    pub fn max_primitive(&self) -> u8 {
        self.max_primitive
    }

    pub fn bounding_box(&self) -> Aabb {
        self.root().bbox
    }

    /// Re-derives triangle `primitive` from the borrowed mesh buffers.
    pub fn triangle(&self, primitive: u32) -> Triangle<WorldPoint> {
        Triangle::from_mesh(self.vertices, self.indices, primitive)
    }

    /// Node array in its in-memory representation, usable for direct upload.
    /// The byte order is native, see the `export` module for a portable format.
    pub fn node_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.nodes.as_raw_slice())
    }
}
