//! Cutter Profile Generator
//!
//! Samples a cutter's lower envelope into a small square kernel used by the
//! offset simulator. Each cell holds the Z offset of the envelope relative to
//! the cutter tip (`0` at the tip, negative further out) or [`NO_SURFACE`]
//! outside the footprint.
//!
//! The side of the kernel is the smallest odd cell count whose center cell
//! reaches the footprint edge, so the cutter axis always sits on a cell.

use millkit_core::{CutterDescriptor, CutterKind, ToolpathError, ToolpathResult, Warnings};
use nalgebra::{Point3, Vector3};
use tracing::debug;

use crate::height_field::{is_surface, NO_SURFACE};

/// Radial samples used when growing a cross section by the skin margin.
const SKIN_SAMPLES: usize = 16;

/// Sampled cutter kernel.
#[derive(Debug, Clone, PartialEq)]
pub struct CutterProfile {
    side: usize,
    pixel_size: f64,
    values: Vec<f64>,
}

impl CutterProfile {
    /// Kernel side length in cells (always odd).
    pub fn side(&self) -> usize {
        self.side
    }

    /// Index of the center cell along either axis.
    pub fn center(&self) -> usize {
        self.side / 2
    }

    pub fn pixel_size(&self) -> f64 {
        self.pixel_size
    }

    /// Value at kernel cell `(a, b)`.
    pub fn get(&self, a: usize, b: usize) -> f64 {
        self.values[b * self.side + a]
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Valid cells as `(dx, dy, value)` relative to the center.
    pub fn offsets(&self) -> Vec<(isize, isize, f64)> {
        let c = self.center() as isize;
        let mut out = Vec::new();
        for b in 0..self.side {
            for a in 0..self.side {
                let v = self.get(a, b);
                if is_surface(v) {
                    out.push((a as isize - c, b as isize - c, v));
                }
            }
        }
        out
    }

    /// Number of cells inside the footprint.
    pub fn footprint_cells(&self) -> usize {
        self.values.iter().filter(|v| is_surface(**v)).count()
    }
}

/// An arbitrary cutter solid that can be probed with vertical rays.
///
/// Coordinates are relative to the cutter axis.
pub trait ProfileSolid {
    /// Lowest Z at which a ray cast straight down at `(x, y)` hits the solid.
    fn deepest_hit(&self, x: f64, y: f64) -> Option<f64>;
}

/// Triangle mesh probed with Moller-Trumbore ray intersection.
#[derive(Debug, Clone)]
pub struct TriangleMesh {
    vertices: Vec<Point3<f64>>,
    triangles: Vec<[usize; 3]>,
    top: f64,
}

impl TriangleMesh {
    pub fn new(vertices: Vec<Point3<f64>>, triangles: Vec<[usize; 3]>) -> ToolpathResult<Self> {
        if vertices.is_empty() || triangles.is_empty() {
            return Err(ToolpathError::geometry("profile mesh is empty"));
        }
        if let Some(bad) = triangles.iter().flatten().find(|&&i| i >= vertices.len()) {
            return Err(ToolpathError::geometry(format!(
                "profile mesh references vertex {} of {}",
                bad,
                vertices.len()
            )));
        }
        let top = vertices.iter().map(|v| v.z).fold(f64::NEG_INFINITY, f64::max);
        Ok(Self {
            vertices,
            triangles,
            top,
        })
    }

    fn intersect_down(&self, origin: &Point3<f64>, tri: &[usize; 3]) -> Option<f64> {
        const EPS: f64 = 1e-12;
        let dir = Vector3::new(0.0, 0.0, -1.0);
        let v0 = self.vertices[tri[0]];
        let e1 = self.vertices[tri[1]] - v0;
        let e2 = self.vertices[tri[2]] - v0;
        let h = dir.cross(&e2);
        let a = e1.dot(&h);
        if a.abs() < EPS {
            return None;
        }
        let f = 1.0 / a;
        let s = *origin - v0;
        let u = f * s.dot(&h);
        if !(0.0..=1.0).contains(&u) {
            return None;
        }
        let q = s.cross(&e1);
        let v = f * dir.dot(&q);
        if v < 0.0 || u + v > 1.0 {
            return None;
        }
        let t = f * e2.dot(&q);
        (t > EPS).then(|| origin.z - t)
    }
}

impl ProfileSolid for TriangleMesh {
    fn deepest_hit(&self, x: f64, y: f64) -> Option<f64> {
        let origin = Point3::new(x, y, self.top + 1.0);
        self.triangles
            .iter()
            .filter_map(|tri| self.intersect_down(&origin, tri))
            .reduce(f64::min)
    }
}

/// Height of the lower envelope above the tip at radial distance `rho`.
fn envelope(kind: &CutterKind, radius: f64, rho: f64) -> f64 {
    match *kind {
        CutterKind::Flat | CutterKind::Custom => 0.0,
        CutterKind::Ball => radius - (radius * radius - rho * rho).max(0.0).sqrt(),
        CutterKind::VBit { tip_angle } => rho / half_angle_tan(tip_angle),
        CutterKind::ConeFlat {
            tip_angle,
            flat_radius,
        } => {
            if rho <= flat_radius {
                0.0
            } else {
                (rho - flat_radius) / half_angle_tan(tip_angle)
            }
        }
        CutterKind::ConeBall {
            tip_angle,
            ball_radius,
        } => {
            let half = (tip_angle / 2.0).to_radians();
            let tangent = ball_radius * half.cos();
            let ball = |r: f64| ball_radius - (ball_radius * ball_radius - r * r).max(0.0).sqrt();
            if rho <= tangent {
                ball(rho)
            } else {
                ball(tangent) + (rho - tangent) / half.tan()
            }
        }
    }
}

fn half_angle_tan(tip_angle: f64) -> f64 {
    (tip_angle / 2.0).to_radians().tan()
}

/// Envelope of the cutter grown by `skin` in every direction, relative to the
/// original tip. Negative near the axis: the grown tip sits `skin` lower.
fn skinned_envelope(kind: &CutterKind, radius: f64, skin: f64, rho: f64) -> f64 {
    let lo = (rho - skin).max(0.0);
    let hi = (rho + skin).min(radius);
    if lo > hi {
        return f64::INFINITY;
    }
    (0..=SKIN_SAMPLES)
        .map(|k| lo + (hi - lo) * k as f64 / SKIN_SAMPLES as f64)
        .map(|r0| {
            let dr = rho - r0;
            envelope(kind, radius, r0) - (skin * skin - dr * dr).max(0.0).sqrt()
        })
        .fold(f64::INFINITY, f64::min)
}

/// Builds the kernel for `cutter` at `pixel_size`.
///
/// `source` is only consulted for [`CutterKind::Custom`]. A custom cutter
/// without a usable source falls back to a flat footprint and records a
/// warning.
pub fn generate_profile(
    cutter: &CutterDescriptor,
    pixel_size: f64,
    source: Option<&dyn ProfileSolid>,
    warnings: &mut Warnings,
) -> ToolpathResult<CutterProfile> {
    cutter.validate()?;
    if !(pixel_size.is_finite() && pixel_size > 0.0) {
        return Err(ToolpathError::geometry(format!(
            "pixel size must be positive, got {pixel_size}"
        )));
    }

    let radius = cutter.radius();
    let reach = radius + cutter.skin;
    let half_cells = ((reach / pixel_size) - 1e-9).ceil().max(0.0) as usize;
    let side = 2 * half_cells + 1;
    let c = half_cells as f64;
    let edge = reach + pixel_size * 1e-9;

    let mut values = vec![NO_SURFACE; side * side];
    let mut kind = cutter.kind;

    if kind == CutterKind::Custom {
        match source.and_then(|s| sample_custom(s, side, pixel_size)) {
            Some(custom) => {
                debug!("Custom cutter profile {}x{} sampled", side, side);
                return Ok(CutterProfile {
                    side,
                    pixel_size,
                    values: custom,
                });
            }
            None => {
                warnings.push(format!(
                    "Custom cutter of diameter {} has no profile source; using a flat profile",
                    cutter.diameter
                ));
                kind = CutterKind::Flat;
            }
        }
    }

    for b in 0..side {
        for a in 0..side {
            let dx = (a as f64 - c) * pixel_size;
            let dy = (b as f64 - c) * pixel_size;
            let rho = dx.hypot(dy);
            if rho > edge {
                continue;
            }
            let rise = if cutter.skin > 0.0 {
                skinned_envelope(&kind, radius, cutter.skin, rho)
            } else {
                envelope(&kind, radius, rho.min(radius))
            };
            if rise.is_finite() {
                values[b * side + a] = -rise;
            }
        }
    }

    debug!(
        "Cutter profile for {} (d={}, skin={}): {}x{} cells",
        cutter.kind, cutter.diameter, cutter.skin, side, side
    );
    Ok(CutterProfile {
        side,
        pixel_size,
        values,
    })
}

/// Casts one ray per cell and normalizes so the highest value is 0.
fn sample_custom(source: &dyn ProfileSolid, side: usize, pixel_size: f64) -> Option<Vec<f64>> {
    let c = (side / 2) as f64;
    let hits: Vec<Option<f64>> = (0..side * side)
        .map(|idx| {
            let a = (idx % side) as f64;
            let b = (idx / side) as f64;
            source.deepest_hit((a - c) * pixel_size, (b - c) * pixel_size)
        })
        .collect();
    let lowest = hits.iter().flatten().copied().reduce(f64::min)?;
    Some(
        hits.into_iter()
            .map(|hit| hit.map_or(NO_SURFACE, |z| lowest - z))
            .collect(),
    )
}
