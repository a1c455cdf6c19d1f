//! Chunk Optimizer
//!
//! Reduces the point count of sampled chunks and straightens near-vertical
//! moves.
//!
//! Two passes run on each chunk:
//!
//! 1. **Vertical protection**: a segment steeper than the limit angle
//!    (measured from vertical) that is not exactly vertical gets its higher
//!    endpoint moved over the lower one, turning it into a plunge. When that
//!    would tilt the neighbouring segment into a steep one, a corner point is
//!    inserted instead.
//! 2. **Collinearity reduction**: points closer than the tolerance to the
//!    segment joining their kept predecessor and their successor are
//!    dropped, until a pass drops nothing.
//!
//! Running the optimizer on its own output changes nothing.

use millkit_core::{OperationContext, ProgressReporter, Stage, ToolpathResult};
use nalgebra::Point3;
use tracing::{debug, info};

use crate::chunk::{Chunk, ChunkPoint};

/// Chunk simplification settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChunkOptimizer {
    tolerance: f64,
    /// Vertical protection limit in radians
    protect: Option<f64>,
}

impl ChunkOptimizer {
    pub fn new(tolerance: f64, protect: Option<f64>) -> Self {
        Self {
            tolerance: tolerance.max(0.0),
            protect,
        }
    }

    pub fn from_context(ctx: &OperationContext) -> Self {
        Self::new(ctx.optimize_tolerance, ctx.protect_vertical_radians())
    }

    /// True for a segment that is steeper than the limit but not vertical.
    fn is_steep(&self, a: &ChunkPoint, b: &ChunkPoint) -> bool {
        let Some(limit) = self.protect else {
            return false;
        };
        let run = (b.x() - a.x()).hypot(b.y() - a.y());
        let rise = (b.z() - a.z()).abs();
        if run == 0.0 {
            return false;
        }
        run.atan2(rise) < limit
    }

    /// Snaps steep segments to vertical.
    pub fn protect_vertical(&self, points: &[ChunkPoint], closed: bool) -> Vec<ChunkPoint> {
        let mut out = points.to_vec();
        if self.protect.is_none() || out.len() < 3 {
            return out;
        }

        let mut i = 0;
        while i + 1 < out.len() {
            if !self.is_steep(&out[i], &out[i + 1]) {
                i += 1;
                continue;
            }
            let (high, low) = if out[i].z() > out[i + 1].z() {
                (i, i + 1)
            } else {
                (i + 1, i)
            };
            let mut snapped = out[high];
            snapped.position.x = out[low].x();
            snapped.position.y = out[low].y();

            let neighbour = if high == i {
                i.checked_sub(1)
            } else {
                (high + 1 < out.len()).then_some(high + 1)
            };
            let endpoint = high == 0 || high == out.len() - 1;
            let tilts = neighbour.is_some_and(|n| self.is_steep(&snapped, &out[n]));

            if tilts || (closed && endpoint) {
                let mut corner = out[low];
                corner.position.z = out[high].z();
                corner.axis = None;
                out.insert(i + 1, corner);
                i += 2;
            } else {
                out[high] = snapped;
                i += 1;
            }
        }
        out
    }

    /// One greedy collinearity pass. Returns the kept points and whether any
    /// point was dropped.
    fn reduce_once(&self, points: &[ChunkPoint]) -> (Vec<ChunkPoint>, bool) {
        let mut kept: Vec<ChunkPoint> = Vec::with_capacity(points.len());
        let mut dropped = false;
        kept.push(points[0]);
        for k in 1..points.len() - 1 {
            let prev = kept[kept.len() - 1];
            let next = points[k + 1];
            let deviation = point_segment_distance_3d(&points[k].position, &prev.position, &next.position);
            if deviation < self.tolerance && !self.is_steep(&prev, &next) {
                dropped = true;
            } else {
                kept.push(points[k]);
            }
        }
        kept.push(points[points.len() - 1]);
        (kept, dropped)
    }

    /// Optimizes a point list. Lists of at most two points are returned as is.
    pub fn optimize_points(&self, points: &[ChunkPoint], closed: bool) -> Vec<ChunkPoint> {
        if points.len() <= 2 {
            return points.to_vec();
        }
        let mut current = self.protect_vertical(points, closed);
        loop {
            let (next, dropped) = self.reduce_once(&current);
            current = next;
            if !dropped || current.len() <= 2 {
                break;
            }
        }
        current
    }

    pub fn optimize_chunk(&self, chunk: &mut Chunk) {
        if chunk.len() <= 2 {
            return;
        }
        let before = chunk.len();
        let points = self.optimize_points(chunk.points(), chunk.is_closed());
        chunk.set_points(points);
        debug!("Optimized chunk from {} to {} points", before, chunk.len());
    }

    pub fn optimize_all(&self, chunks: &mut [Chunk], reporter: &ProgressReporter) -> ToolpathResult<()> {
        let before: usize = chunks.iter().map(Chunk::len).sum();
        let total = chunks.len();
        for (index, chunk) in chunks.iter_mut().enumerate() {
            reporter.tick(Stage::Optimizing, index, total)?;
            self.optimize_chunk(chunk);
        }
        reporter.tick(Stage::Optimizing, total, total)?;
        let after: usize = chunks.iter().map(Chunk::len).sum();
        info!("Optimized {} chunks: {} -> {} points", total, before, after);
        Ok(())
    }
}

/// Distance from `p` to the 3D segment `a..b`. Clamped to the segment rather
/// than the infinite line, so a point that doubles back along the line is kept.
fn point_segment_distance_3d(p: &Point3<f64>, a: &Point3<f64>, b: &Point3<f64>) -> f64 {
    let ab = b - a;
    let len_sq = ab.norm_squared();
    if len_sq <= f64::EPSILON {
        return (p - a).norm();
    }
    let t = ((p - a).dot(&ab) / len_sq).clamp(0.0, 1.0);
    (p - (a + ab * t)).norm()
}

/// Optimizes a point list with an explicit tolerance and protection limit
/// (radians).
pub fn optimize_points(points: &[ChunkPoint], tolerance: f64, protect: Option<f64>) -> Vec<ChunkPoint> {
    ChunkOptimizer::new(tolerance, protect).optimize_points(points, false)
}

/// Optimizes one chunk in place with the context's settings.
pub fn optimize_chunk(chunk: &mut Chunk, ctx: &OperationContext) {
    ChunkOptimizer::from_context(ctx).optimize_chunk(chunk);
}
