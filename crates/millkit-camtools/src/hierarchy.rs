//! Hierarchy Builder
//!
//! Adds parent/child relations to a [`ChunkArena`]. A parent is only cut
//! after all of its children, so relations encode "cut this first":
//! inner islands before their surrounding contour, the shallow layer before
//! the one below it, the previous pass before the next one.

use cavalier_contours::core::math::Vector2;
use cavalier_contours::polyline::PlineSource;
use millkit_core::OperationContext;
use tracing::debug;

use crate::chunk::{ChunkArena, ChunkId};

/// XY distance under which two chunks are chained by proximity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProximityCutoff(pub f64);

impl ProximityCutoff {
    /// Explicit `proximity_cutoff` when set, otherwise twice the step-over
    /// (doubled again for step-back strategies).
    pub fn from_context(ctx: &OperationContext) -> Self {
        if ctx.proximity_cutoff > 0.0 {
            return Self(ctx.proximity_cutoff);
        }
        let mut cutoff = 2.0 * ctx.step_over;
        if ctx.movement.parallel_step_back {
            cutoff *= 2.0;
        }
        Self(cutoff)
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

/// Relates every chunk to the smallest closed chunk of the same layer whose
/// polygon contains its first point. Returns the number of relations added.
pub fn containment(arena: &mut ChunkArena, ids: &[ChunkId]) -> usize {
    let mut pairs: Vec<(ChunkId, ChunkId)> = Vec::new();

    for &child in ids {
        let inner = arena.get(child);
        let Some(start) = inner.first() else {
            continue;
        };
        let probe = Vector2::new(start.x(), start.y());
        let own_area = inner.polygon_area();

        let container = ids
            .iter()
            .copied()
            .filter(|&id| id != child)
            .filter_map(|id| {
                let outer = arena.get(id);
                if outer.layer() != inner.layer() {
                    return None;
                }
                let polygon = outer.polygon()?;
                let area = polygon.area().abs();
                let encloses = area > own_area && polygon.winding_number(probe) != 0;
                encloses.then_some((area, id))
            })
            .min_by(|a, b| a.0.total_cmp(&b.0));

        if let Some((_, parent)) = container {
            pairs.push((parent, child));
        }
    }

    let added = pairs
        .into_iter()
        .filter(|&(parent, child)| arena.add_relation(parent, child))
        .count();
    debug!("Containment hierarchy: {} relations over {} chunks", added, ids.len());
    added
}

/// Makes every chunk in `parents` a parent of each chunk in `children` that
/// comes within `cutoff` in XY. Returns the number of relations added.
pub fn proximity(arena: &mut ChunkArena, parents: &[ChunkId], children: &[ChunkId], cutoff: f64) -> usize {
    let mut added = 0;
    for &parent in parents {
        for &child in children {
            if parent == child {
                continue;
            }
            let near = arena.get(parent).xy_distance_within(arena.get(child), cutoff);
            if near && arena.add_relation(parent, child) {
                added += 1;
            }
        }
    }
    added
}

/// Chains consecutive layers (given top first): chunks of a deeper layer wait
/// for the nearby chunks of the layer above.
pub fn layer_proximity(arena: &mut ChunkArena, layers: &[Vec<ChunkId>], cutoff: f64) -> usize {
    let added: usize = layers
        .windows(2)
        .map(|pair| proximity(arena, &pair[1], &pair[0], cutoff))
        .sum();
    debug!(
        "Layer proximity: {} relations across {} layers (cutoff {})",
        added,
        layers.len(),
        cutoff
    );
    added
}
