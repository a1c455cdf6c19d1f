//! Chunk Connector
//!
//! Joins consecutive chunks whose ends are close enough that the cutter can
//! travel between them at depth instead of retracting. The bridge between
//! two chunks is re-sampled against the surface so it never gouges, and is
//! refused when it would leave the ambient region.

use millkit_core::OperationContext;
use tracing::debug;

use crate::chunk::{Chunk, ChunkPoint};
use crate::height_field::SurfaceQuery;
use crate::region::Region;

/// Largest end-to-start XY distance (exclusive) that is bridged.
pub fn merge_threshold(ctx: &OperationContext) -> f64 {
    if ctx.movement.merge_distance > 0.0 {
        return ctx.movement.merge_distance;
    }
    let mut threshold = 3.0 * ctx.step_over;
    if ctx.movement.parallel_step_back {
        threshold *= 2.0;
    }
    threshold
}

/// Points strictly between `from` and `to`, spaced at most `step` apart, each
/// lifted to the surface and the floor where the straight line would dig in.
pub fn bridge_points(
    from: &ChunkPoint,
    to: &ChunkPoint,
    surface: &dyn SurfaceQuery,
    floor: f64,
    step: f64,
) -> Vec<ChunkPoint> {
    let span = from.xy_distance(&to.position);
    if !(step > 0.0) || span <= step {
        return Vec::new();
    }
    let pieces = (span / step).ceil() as usize;
    (1..pieces)
        .map(|k| {
            let t = k as f64 / pieces as f64;
            let p = from.position + (to.position - from.position) * t;
            let z = p.z.max(surface.surface_z(p.x, p.y)).max(floor);
            ChunkPoint::new(p.x, p.y, z)
        })
        .collect()
}

/// True when the bridge from `from` to `to` stays inside `ambient`.
fn bridge_inside(ambient: &Region, from: &ChunkPoint, to: &ChunkPoint, bridge: &[ChunkPoint]) -> bool {
    let mid = from.position + (to.position - from.position) * 0.5;
    ambient.contains(mid.x, mid.y) && bridge.iter().all(|p| ambient.contains(p.x(), p.y()))
}

/// Merges consecutive chunks closer than [`merge_threshold`]. Identity when
/// the operation does not stay low. With `ambient`, a gap whose bridge
/// would leave the region is kept open.
pub fn connect_low(
    chunks: Vec<Chunk>,
    surface: &dyn SurfaceQuery,
    ambient: Option<&Region>,
    ctx: &OperationContext,
) -> Vec<Chunk> {
    if !ctx.movement.stay_low || chunks.len() < 2 {
        return chunks;
    }
    let threshold = merge_threshold(ctx);
    let before = chunks.len();

    let mut out: Vec<Chunk> = Vec::with_capacity(chunks.len());
    for chunk in chunks {
        let bridge = match (out.last().and_then(|c| c.last()), chunk.first()) {
            (Some(end), Some(start)) if end.xy_distance(&start.position) < threshold => {
                let bridge = bridge_points(end, start, surface, ctx.end_z, ctx.step_along);
                match ambient {
                    Some(region) if !bridge_inside(region, end, start, &bridge) => {
                        debug!("Bridge from {:?} leaves the ambient region", end.position);
                        None
                    }
                    _ => Some(bridge),
                }
            }
            _ => None,
        };
        match (bridge, out.last_mut()) {
            (Some(bridge), Some(acc)) => {
                acc.extend(bridge);
                acc.extend(chunk.into_points());
                acc.parents.clear();
                acc.children.clear();
            }
            _ => out.push(chunk),
        }
    }

    debug!(
        "Low connections merged {} chunks into {} (threshold {})",
        before,
        out.len(),
        threshold
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::height_field::ExactSurface;
    use nalgebra::Point2;

    fn line(points: &[(f64, f64, f64)]) -> Chunk {
        Chunk::new(points.iter().map(|&(x, y, z)| ChunkPoint::new(x, y, z)).collect())
    }

    fn ctx() -> OperationContext {
        OperationContext::new()
            .with_step_over(1.0)
            .with_step_along(0.25)
            .with_depth_range(0.0, -5.0)
    }

    #[test]
    fn test_threshold() {
        assert_eq!(merge_threshold(&ctx()), 3.0);
        assert_eq!(merge_threshold(&ctx().with_merge_distance(0.7)), 0.7);
        let mut step_back = ctx();
        step_back.movement.parallel_step_back = true;
        assert_eq!(merge_threshold(&step_back), 6.0);
    }

    #[test]
    fn test_threshold_is_strict() {
        let surface = ExactSurface(|_x: f64, _y: f64| Some(-1.0));
        let ctx = ctx().with_merge_distance(1.0);
        let at_threshold = vec![
            line(&[(0.0, 0.0, -1.0), (5.0, 0.0, -1.0)]),
            line(&[(6.0, 0.0, -1.0), (9.0, 0.0, -1.0)]),
        ];
        assert_eq!(connect_low(at_threshold, &surface, None, &ctx).len(), 2);

        let inside = vec![
            line(&[(0.0, 0.0, -1.0), (5.0, 0.0, -1.0)]),
            line(&[(5.999, 0.0, -1.0), (9.0, 0.0, -1.0)]),
        ];
        let merged = connect_low(inside, &surface, None, &ctx);
        assert_eq!(merged.len(), 1);
        assert!(!merged[0].is_closed());
        assert_eq!(merged[0].last().unwrap().x(), 9.0);
    }

    #[test]
    fn test_bridge_follows_surface() {
        // A ridge at x in [1, 2] stands above both chunk ends.
        let surface = ExactSurface(|x: f64, _y: f64| Some(if (1.0..=2.0).contains(&x) { 0.5 } else { -1.0 }));
        let chunks = vec![
            line(&[(-1.0, 0.0, -1.0), (0.0, 0.0, -1.0)]),
            line(&[(3.0, 0.0, -1.0), (4.0, 0.0, -1.0)]),
        ];
        let merged = connect_low(chunks, &surface, None, &ctx().with_merge_distance(5.0));
        assert_eq!(merged.len(), 1);
        let points = merged[0].points();
        // 2 + 11 bridge points + 2
        assert_eq!(points.len(), 15);
        for p in &points[2..13] {
            assert!(p.z() >= surface.surface_z(p.x(), p.y()));
        }
        assert!(points.iter().any(|p| p.z() == 0.5));
    }

    #[test]
    fn test_bridge_respects_floor() {
        let surface = ExactSurface(|_x: f64, _y: f64| None);
        let bridge = bridge_points(
            &ChunkPoint::new(0.0, 0.0, -10.0),
            &ChunkPoint::new(1.0, 0.0, -10.0),
            &surface,
            -5.0,
            0.25,
        );
        assert_eq!(bridge.len(), 3);
        assert!(bridge.iter().all(|p| p.z() == -5.0));
    }

    #[test]
    fn test_bridge_refused_across_ambient_hole() {
        let surface = ExactSurface(|_x: f64, _y: f64| Some(-1.0));
        let ambient = Region::rectangle(Point2::new(-1.0, -1.0), Point2::new(10.0, 1.0))
            .unwrap()
            .with_hole(&[(4.9, -0.5), (5.1, -0.5), (5.1, 0.5), (4.9, 0.5)])
            .unwrap();
        let pair = || {
            vec![
                line(&[(0.0, 0.0, -1.0), (4.8, 0.0, -1.0)]),
                line(&[(5.2, 0.0, -1.0), (9.0, 0.0, -1.0)]),
            ]
        };
        assert_eq!(connect_low(pair(), &surface, Some(&ambient), &ctx()).len(), 2);
        assert_eq!(connect_low(pair(), &surface, None, &ctx()).len(), 1);

        let open = Region::rectangle(Point2::new(-1.0, -1.0), Point2::new(10.0, 1.0)).unwrap();
        assert_eq!(connect_low(pair(), &surface, Some(&open), &ctx()).len(), 1);
    }

    #[test]
    fn test_disabled_when_not_staying_low() {
        let surface = ExactSurface(|_x: f64, _y: f64| Some(0.0));
        let chunks = vec![
            line(&[(0.0, 0.0, 0.0), (1.0, 0.0, 0.0)]),
            line(&[(1.0, 0.0, 0.0), (2.0, 0.0, 0.0)]),
        ];
        assert_eq!(connect_low(chunks, &surface, None, &ctx().with_stay_low(false)).len(), 2);
    }
}
