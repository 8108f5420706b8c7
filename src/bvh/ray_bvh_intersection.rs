use assert2::debug_assert;

use super::{Bvh, Hit, HitMode, NodeIdx, NodeKind};
use crate::geometry::{FloatType, Ray};

/// Traversal stack that can be kept around between queries to avoid reallocating it.
#[derive(Clone, Debug, Default)]
#[repr(transparent)]
pub struct StackCache {
    stack: Vec<NodeIdx>,
}

impl StackCache {
    pub fn new() -> StackCache {
        StackCache::default()
    }
}

impl Bvh<'_> {
    /// Intersects the ray with the mesh, considering only hits with distance in (0, t_max).
    ///
    /// In `HitMode::Closest` the nearest hit is returned. In `HitMode::Any` traversal stops
    /// at the first hit found, which one that is depends on traversal order.
    /// Distances are in multiples of the ray direction length.
    pub fn intersect(&self, ray: &Ray, t_max: FloatType, mode: HitMode) -> Option<Hit> {
        self.intersect_with_stack(ray, t_max, mode, &mut StackCache::new())
    }

    /// Returns true if anything blocks the ray before `t_max`.
    pub fn occluded(&self, ray: &Ray, t_max: FloatType) -> bool {
        self.intersect(ray, t_max, HitMode::Any).is_some()
    }

    /// Same as `intersect`, reusing the stack allocation between calls.
    pub fn intersect_with_stack(
        &self,
        ray: &Ray,
        t_max: FloatType,
        mode: HitMode,
        stack: &mut StackCache,
    ) -> Option<Hit> {
        debug_assert!(stack.stack.is_empty());
        stack.stack.push(NodeIdx::root());

        let mut best: Option<Hit> = None;
        let mut best_t = t_max;

        while let Some(index) = stack.stack.pop() {
            let node = &self.nodes[index];

            // Subtrees that can't be reached before the best hit so far are skipped
            if node.bbox.intersect(ray, best_t).is_none() {
                continue;
            }

            match node.kind() {
                NodeKind::Inner { first_child, .. } => {
                    stack.stack.push(first_child + 1);
                    stack.stack.push(first_child);
                }
                NodeKind::Leaf { primitives } => {
                    for &primitive in &self.primitives[primitives] {
                        let Some(t) = self.triangle(primitive).intersect(ray, best_t) else {
                            continue;
                        };

                        best_t = t;
                        best = Some(Hit { t, primitive });

                        if mode == HitMode::Any {
                            stack.stack.clear();
                            return best;
                        }
                    }
                }
            }
        }

        best
    }
}
