use std::collections::VecDeque;
use std::ops::Range;

use bytemuck::Zeroable as _;
use index_vec::IndexVec;
use thiserror::Error;
use tracing::debug;

use crate::geometry::{Aabb, SPLIT_EPSILON, Triangle, WorldPoint};

use super::{Bvh, BvhNode, NodeIdx};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("max_primitive must be at least 1, got {0}")]
    InvalidMaxPrimitive(u8),

    #[error("mesh has no triangles")]
    EmptyMesh,

    #[error("mesh has {0} triangles, node indices would not fit 32 bits")]
    TooManyTriangles(usize),

    #[error("triangle {triangle} references vertex {index}, but there are only {vertex_count} vertices")]
    VertexIndexOutOfRange {
        triangle: usize,
        index: u32,
        vertex_count: usize,
    },
}

/// Node slot that was allocated but not filled in yet, together with everything
/// needed to turn it into a leaf or to split it further.
struct PendingNode {
    node: NodeIdx,
    bbox: Aabb,
    primitives: Range<usize>,
}

/// Result of partitioning a range of primitives in two.
struct Split {
    axis: usize,
    /// Split position relative to the start of the partitioned slice
    middle: usize,
    front_bbox: Aabb,
    back_bbox: Aabb,
}

impl<'a> Bvh<'a> {
    /// Builds the hierarchy over an indexed triangle mesh.
    ///
    /// Nodes are split top down, breadth first, until no leaf has more than
    /// `max_primitive` triangles. Each split uses the middle of the longest axis of
    /// the triangle centroids' bounding box.
    /// The result is deterministic for a given input.
    #[tracing::instrument(skip_all, fields(triangles = indices.len(), max_primitive = max_primitive))]
    pub fn create(
        vertices: &'a [WorldPoint],
        indices: &'a [[u32; 3]],
        max_primitive: u8,
    ) -> Result<Bvh<'a>, BuildError> {
        check_input(vertices, indices, max_primitive)?;

        let triangle_count = indices.len();
        let triangles: Vec<Triangle<WorldPoint>> = (0..triangle_count as u32)
            .map(|i| Triangle::from_mesh(vertices, indices, i))
            .collect();
        let centroids: Vec<WorldPoint> = triangles.iter().map(Triangle::centroid).collect();
        let boxes: Vec<Aabb> = triangles.iter().map(Triangle::bounding_box).collect();

        let mut primitives: Vec<u32> = (0..triangle_count as u32).collect();
        let mut nodes: IndexVec<NodeIdx, BvhNode> =
            IndexVec::with_capacity(2 * triangle_count + 1);

        let mut queue = VecDeque::new();
        queue.push_back(PendingNode {
            node: nodes.push(BvhNode::zeroed()),
            bbox: joint_bounding_box(&primitives, &boxes),
            primitives: 0..triangle_count,
        });

        while let Some(pending) = queue.pop_front() {
            let range = pending.primitives;

            if range.len() <= max_primitive as usize {
                nodes[pending.node] = BvhNode::new_leaf(pending.bbox, range.start, range.len());
                continue;
            }

            let split = split_primitives(&mut primitives[range.clone()], &centroids, &boxes);
            let middle = range.start + split.middle;

            // Children are allocated in the order they are discovered
            let first_child = nodes.push(BvhNode::zeroed());
            let second_child = nodes.push(BvhNode::zeroed());

            queue.push_back(PendingNode {
                node: first_child,
                bbox: split.front_bbox,
                primitives: range.start..middle,
            });
            queue.push_back(PendingNode {
                node: second_child,
                bbox: split.back_bbox,
                primitives: middle..range.end,
            });

            nodes[pending.node] = BvhNode::new_inner(pending.bbox, first_child, split.axis);
        }

        nodes.raw.shrink_to_fit();

        debug!(
            nodes = nodes.len(),
            leaves = nodes.iter().filter(|node| node.is_leaf()).count(),
            degenerate = triangles.iter().filter(|t| t.area() == 0.0).count(),
            "hierarchy built"
        );

        Ok(Bvh {
            vertices,
            indices,
            primitives,
            nodes,
            max_primitive,
        })
    }
}

fn check_input(
    vertices: &[WorldPoint],
    indices: &[[u32; 3]],
    max_primitive: u8,
) -> Result<(), BuildError> {
    if max_primitive < 1 {
        return Err(BuildError::InvalidMaxPrimitive(max_primitive));
    }
    if indices.is_empty() {
        return Err(BuildError::EmptyMesh);
    }
    // Node count can reach 2 * triangles + 1, all of them must be addressable by u32
    if indices.len() > (u32::MAX as usize - 1) / 2 {
        return Err(BuildError::TooManyTriangles(indices.len()));
    }
    for (triangle, corners) in indices.iter().enumerate() {
        if let Some(&index) = corners.iter().find(|&&i| i as usize >= vertices.len()) {
            return Err(BuildError::VertexIndexOutOfRange {
                triangle,
                index,
                vertex_count: vertices.len(),
            });
        }
    }
    Ok(())
}

/// Bounding box of the geometry of all listed primitives.
fn joint_bounding_box(primitives: &[u32], boxes: &[Aabb]) -> Aabb {
    primitives
        .iter()
        .fold(Aabb::empty(), |acc, &p| acc.union(&boxes[p as usize]))
}

/// Reorders the primitives in place so that the ones in front of the split plane come first.
///
/// Chooses the longest axis of the bounding box of the primitive centroids and splits at
/// its middle. If the centroids are (nearly) coincident along that axis, or the plane
/// doesn't separate anything, falls back to cutting the list in half.
/// The input must have at least two primitives, both sides of the result are non-empty.
fn split_primitives(primitives: &mut [u32], centroids: &[WorldPoint], boxes: &[Aabb]) -> Split {
    assert2::debug_assert!(primitives.len() >= 2);

    let centroid_bbox = primitives.iter().fold(Aabb::empty(), |acc, &p| {
        acc.union(&Aabb::from_point(centroids[p as usize]))
    });
    let axis = centroid_bbox.largest_axis();
    let extent = centroid_bbox.max[axis] - centroid_bbox.min[axis];

    if extent.abs() < SPLIT_EPSILON {
        return split_by_count(primitives, axis, boxes);
    }

    let boundary = (centroid_bbox.max[axis] + centroid_bbox.min[axis]) / 2.0;

    let mut front_bbox = Aabb::empty();
    let mut back_bbox = Aabb::empty();
    let mut begin = 0;
    let mut end = primitives.len();
    while begin < end {
        let primitive = primitives[begin] as usize;
        if centroids[primitive][axis] < boundary {
            front_bbox.grow(&boxes[primitive]);
            begin += 1;
        } else {
            back_bbox.grow(&boxes[primitive]);
            end -= 1;
            primitives.swap(begin, end);
        }
    }

    if end == 0 || end == primitives.len() {
        // Rounding of the boundary can leave one side empty for large coordinates
        return split_by_count(primitives, axis, boxes);
    }

    Split {
        axis,
        middle: end,
        front_bbox,
        back_bbox,
    }
}

fn split_by_count(primitives: &[u32], axis: usize, boxes: &[Aabb]) -> Split {
    let middle = primitives.len() / 2;
    Split {
        axis,
        middle,
        front_bbox: joint_bounding_box(&primitives[..middle], boxes),
        back_bbox: joint_bounding_box(&primitives[middle..], boxes),
    }
}
