//! Offset Simulator
//!
//! Dilates a height field with a cutter profile: every output cell receives
//! the highest Z at which the cutter tip may sit there without the envelope
//! dipping below the surface,
//! `offset[i, j] = max over (dx, dy) of surface[i + dx, j + dy] + profile[dx, dy]`.
//!
//! Cells closer to the grid border than the kernel reach are left at
//! [`NO_SURFACE`], which samplers would read as "nothing to hit".
//! [`simulate_padded_offset`] grows the grid by the reach first so every
//! cell of the input grid gets a real value. Output rows are independent and
//! computed with rayon.

use std::borrow::Cow;

use millkit_core::{ProgressReporter, Stage, ToolpathError, ToolpathResult};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::cutter_profile::CutterProfile;
use crate::height_field::{is_surface, HeightField, NO_SURFACE};

/// A height field holding maximum safe cutter-tip heights.
pub type OffsetImage = HeightField;

/// Reflects every surface cell about the lowest surface Z (`z' = 2 * min - z`).
pub fn reflect_about_min(surface: &HeightField) -> HeightField {
    let Some(min) = surface.min_z() else {
        return surface.clone();
    };
    let heights = surface
        .heights()
        .iter()
        .map(|&z| if is_surface(z) { 2.0 * min - z } else { z })
        .collect();
    HeightField::from_parts(*surface.grid(), heights)
}

/// Computes the offset image of `surface` for `profile`.
///
/// With `inverse` the surface is reflected about its minimum Z first, which
/// turns a male part into the matching female cavity.
pub fn simulate_offset(
    surface: &HeightField,
    profile: &CutterProfile,
    inverse: bool,
    reporter: &ProgressReporter,
) -> ToolpathResult<OffsetImage> {
    let grid = *surface.grid();
    let pixel = grid.pixel_size;
    if (profile.pixel_size() - pixel).abs() > pixel * 1e-9 {
        return Err(ToolpathError::geometry(format!(
            "cutter profile sampled at {} but height field uses {}",
            profile.pixel_size(),
            pixel
        )));
    }

    let source: Cow<'_, HeightField> = if inverse {
        Cow::Owned(reflect_about_min(surface))
    } else {
        Cow::Borrowed(surface)
    };

    let (w, h) = (grid.width, grid.height);
    let reach = profile.center();
    let mut out = vec![NO_SURFACE; w * h];

    if w <= 2 * reach || h <= 2 * reach {
        debug!(
            "Grid {}x{} smaller than cutter kernel {}; no valid offset cells",
            w,
            h,
            profile.side()
        );
        reporter.tick(Stage::Offset, 1, 1)?;
        return Ok(HeightField::from_parts(grid, out));
    }

    let offsets = profile.offsets();
    info!(
        "Offset simulation: {}x{} cells, {} kernel cells, inverse={}",
        w,
        h,
        offsets.len(),
        inverse
    );

    let src = source.heights();
    let rows_per_band = h.div_ceil(100).max(1);
    for (band_index, band) in out.chunks_mut(rows_per_band * w).enumerate() {
        let first_row = band_index * rows_per_band;
        reporter.tick(Stage::Offset, first_row, h)?;
        band.par_chunks_mut(w).enumerate().for_each(|(r, row)| {
            dilate_row(src, w, h, first_row + r, reach, &offsets, row);
        });
    }
    reporter.tick(Stage::Offset, h, h)?;

    Ok(HeightField::from_parts(grid, out))
}

/// Offset image over the input grid grown by the kernel reach plus one cell
/// on every side.
///
/// Every input cell and its neighbours are evaluated, so bilinear samples
/// anywhere on the input grid are real values. The surface outside the input
/// grid counts as empty.
pub fn simulate_padded_offset(
    surface: &HeightField,
    profile: &CutterProfile,
    inverse: bool,
    reporter: &ProgressReporter,
) -> ToolpathResult<OffsetImage> {
    let padded = surface.padded(profile.center() + 1);
    simulate_offset(&padded, profile, inverse, reporter)
}

fn dilate_row(
    src: &[f64],
    w: usize,
    h: usize,
    j: usize,
    reach: usize,
    offsets: &[(isize, isize, f64)],
    row: &mut [f64],
) {
    if j < reach || j + reach >= h {
        return;
    }
    for &(dx, dy, value) in offsets {
        let src_row = (j as isize + dy) as usize * w;
        for (i, cell) in row.iter_mut().enumerate().take(w - reach).skip(reach) {
            let z = src[src_row + (i as isize + dx) as usize];
            if is_surface(z) {
                let candidate = z + value;
                if candidate > *cell {
                    *cell = candidate;
                }
            }
        }
    }
}

/// Identity of a computed offset image.
#[derive(Debug, Clone, PartialEq)]
struct OffsetKey {
    surface_generation: u64,
    profile: CutterProfile,
    inverse: bool,
    padded: bool,
}

/// Holds the offset image of the last surface/cutter combination so repeated
/// sampling calls reuse it. A different surface generation, profile or
/// inverse flag recomputes it.
#[derive(Debug, Default)]
pub struct OffsetCache {
    entry: Option<(OffsetKey, OffsetImage)>,
}

impl OffsetCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_compute(
        &mut self,
        surface: &HeightField,
        profile: &CutterProfile,
        inverse: bool,
        reporter: &ProgressReporter,
    ) -> ToolpathResult<&OffsetImage> {
        self.fetch(surface, profile, inverse, false, reporter)
    }

    /// Like [`OffsetCache::get_or_compute`] with [`simulate_padded_offset`].
    pub fn get_or_compute_padded(
        &mut self,
        surface: &HeightField,
        profile: &CutterProfile,
        inverse: bool,
        reporter: &ProgressReporter,
    ) -> ToolpathResult<&OffsetImage> {
        self.fetch(surface, profile, inverse, true, reporter)
    }

    fn fetch(
        &mut self,
        surface: &HeightField,
        profile: &CutterProfile,
        inverse: bool,
        padded: bool,
        reporter: &ProgressReporter,
    ) -> ToolpathResult<&OffsetImage> {
        let key = OffsetKey {
            surface_generation: surface.generation(),
            profile: profile.clone(),
            inverse,
            padded,
        };
        let stale = !matches!(&self.entry, Some((cached, _)) if *cached == key);
        if stale {
            let image = if padded {
                simulate_padded_offset(surface, profile, inverse, reporter)?
            } else {
                simulate_offset(surface, profile, inverse, reporter)?
            };
            self.entry = Some((key, image));
        } else {
            debug!("Reusing cached offset image");
        }
        match &self.entry {
            Some((_, image)) => Ok(image),
            None => Err(ToolpathError::geometry("offset cache is empty")),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entry.is_none()
    }

    pub fn invalidate(&mut self) {
        self.entry = None;
    }
}
