//! Ambient and silhouette regions.
//!
//! A [`Region`] is a set of closed outer rings with holes, supplied by the
//! geometry provider and used read-only as a mask while sampling.

use cavalier_contours::core::math::Vector2;
use cavalier_contours::polyline::{PlineSource, PlineSourceMut, PlineVertex, Polyline};
use millkit_core::{ToolpathError, ToolpathResult};
use nalgebra::Point2;

/// XY region: inside an outer ring and outside every hole.
#[derive(Debug, Clone)]
pub struct Region {
    pos: Vec<Polyline<f64>>,
    neg: Vec<Polyline<f64>>,
}

impl Region {
    /// Builds a region from outer rings and holes given as XY coordinates.
    pub fn from_rings(outer: &[Vec<(f64, f64)>], holes: &[Vec<(f64, f64)>]) -> ToolpathResult<Self> {
        if outer.is_empty() {
            return Err(ToolpathError::geometry("region has no outer ring"));
        }
        Ok(Self {
            pos: outer.iter().map(|r| ring(r)).collect::<ToolpathResult<_>>()?,
            neg: holes.iter().map(|r| ring(r)).collect::<ToolpathResult<_>>()?,
        })
    }

    /// Axis-aligned rectangle.
    pub fn rectangle(min: Point2<f64>, max: Point2<f64>) -> ToolpathResult<Self> {
        Self::from_rings(
            &[vec![
                (min.x, min.y),
                (max.x, min.y),
                (max.x, max.y),
                (min.x, max.y),
            ]],
            &[],
        )
    }

    /// Adds a hole.
    pub fn with_hole(mut self, hole: &[(f64, f64)]) -> ToolpathResult<Self> {
        self.neg.push(ring(hole)?);
        Ok(self)
    }

    pub fn outer_rings(&self) -> &[Polyline<f64>] {
        &self.pos
    }

    pub fn holes(&self) -> &[Polyline<f64>] {
        &self.neg
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        let p = Vector2::new(x, y);
        self.pos.iter().any(|r| r.winding_number(p) != 0)
            && !self.neg.iter().any(|r| r.winding_number(p) != 0)
    }

    /// XY bounds of the outer rings.
    pub fn bounds(&self) -> Option<(Point2<f64>, Point2<f64>)> {
        self.pos
            .iter()
            .filter_map(|r| r.extents())
            .map(|e| (Point2::new(e.min_x, e.min_y), Point2::new(e.max_x, e.max_y)))
            .reduce(|(lo, hi), (a, b)| {
                (
                    Point2::new(lo.x.min(a.x), lo.y.min(a.y)),
                    Point2::new(hi.x.max(b.x), hi.y.max(b.y)),
                )
            })
    }
}

fn ring(coords: &[(f64, f64)]) -> ToolpathResult<Polyline<f64>> {
    let mut points: Vec<(f64, f64)> = Vec::with_capacity(coords.len());
    for &(x, y) in coords {
        if !(x.is_finite() && y.is_finite()) {
            return Err(ToolpathError::geometry("region ring has a non-finite vertex"));
        }
        if points.last() != Some(&(x, y)) {
            points.push((x, y));
        }
    }
    if points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    if points.len() < 3 {
        return Err(ToolpathError::geometry(format!(
            "region ring needs at least 3 distinct vertices, got {}",
            points.len()
        )));
    }
    if self_intersects(&points) {
        return Err(ToolpathError::geometry("region ring intersects itself"));
    }

    let mut pline = Polyline::new();
    for &(x, y) in &points {
        pline.add_vertex(PlineVertex::new(x, y, 0.0));
    }
    pline.set_is_closed(true);
    if pline.area().abs() <= f64::EPSILON {
        return Err(ToolpathError::geometry("region ring has zero area"));
    }
    Ok(pline)
}

fn orient(a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> f64 {
    (b.0 - a.0) * (c.1 - a.1) - (b.1 - a.1) * (c.0 - a.0)
}

fn proper_cross(a: (f64, f64), b: (f64, f64), c: (f64, f64), d: (f64, f64)) -> bool {
    let d1 = orient(c, d, a);
    let d2 = orient(c, d, b);
    let d3 = orient(a, b, c);
    let d4 = orient(a, b, d);
    d1 * d2 < 0.0 && d3 * d4 < 0.0
}

fn self_intersects(points: &[(f64, f64)]) -> bool {
    let n = points.len();
    for i in 0..n {
        let (a, b) = (points[i], points[(i + 1) % n]);
        for j in (i + 2)..n {
            if i == 0 && j == n - 1 {
                continue;
            }
            let (c, d) = (points[j], points[(j + 1) % n]);
            if proper_cross(a, b, c, d) {
                return true;
            }
        }
    }
    false
}
