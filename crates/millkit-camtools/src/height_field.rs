//! Height Field Module
//!
//! A height field is a 2D grid of top-surface elevations over the working
//! rectangle. Cell `(i, j)` covers the world point
//! `(min.x + i * pixel_size, min.y + j * pixel_size)`; cells the surface never
//! reaches hold [`NO_SURFACE`].
//!
//! Height fields are immutable. Every field gets a process-unique generation
//! id so caches keyed on it are invalidated by building a new field.

use std::sync::atomic::{AtomicU64, Ordering};

use image::{ImageBuffer, Luma};
use millkit_core::{ToolpathError, ToolpathResult, Warnings};
use nalgebra::Point2;
use tracing::debug;

/// Sentinel for unset or unreachable cells.
pub const NO_SURFACE: f64 = -1.0e10;

/// Returns true when `z` is a real elevation rather than [`NO_SURFACE`].
#[inline]
pub fn is_surface(z: f64) -> bool {
    z > NO_SURFACE * 0.5
}

static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

fn next_generation() -> u64 {
    NEXT_GENERATION.fetch_add(1, Ordering::Relaxed)
}

fn cells_along(extent: f64, pixel_size: f64) -> usize {
    ((extent / pixel_size) - 1e-9).ceil().max(0.0) as usize + 1
}

/// Grid geometry shared by height fields and offset images.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridSpec {
    /// World position of cell (0, 0)
    pub min: Point2<f64>,
    /// Cell size in world units
    pub pixel_size: f64,
    /// Cells along X
    pub width: usize,
    /// Cells along Y
    pub height: usize,
}

impl GridSpec {
    /// Grid covering the rectangle `min..=max`.
    pub fn new(min: Point2<f64>, max: Point2<f64>, pixel_size: f64) -> ToolpathResult<Self> {
        if !(pixel_size.is_finite() && pixel_size > 0.0) {
            return Err(ToolpathError::geometry(format!(
                "pixel size must be positive, got {pixel_size}"
            )));
        }
        let extent = max - min;
        if !(extent.x.is_finite() && extent.y.is_finite()) || extent.x < 0.0 || extent.y < 0.0 {
            return Err(ToolpathError::geometry(format!(
                "empty working rectangle ({}, {})..({}, {})",
                min.x, min.y, max.x, max.y
            )));
        }
        Ok(Self {
            min,
            pixel_size,
            width: cells_along(extent.x, pixel_size),
            height: cells_along(extent.y, pixel_size),
        })
    }

    /// Like [`GridSpec::new`], but grows the pixel size until the grid fits
    /// into `max_megapixels`, recording a warning when it had to.
    pub fn within_budget(
        min: Point2<f64>,
        max: Point2<f64>,
        pixel_size: f64,
        max_megapixels: f64,
        warnings: &mut Warnings,
    ) -> ToolpathResult<Self> {
        let mut grid = Self::new(min, max, pixel_size)?;
        let budget = (max_megapixels * 1.0e6).max(1.0);
        let requested = grid.cell_count() as f64;
        if requested <= budget {
            return Ok(grid);
        }

        let mut size = pixel_size * (requested / budget).sqrt();
        grid = Self::new(min, max, size)?;
        while grid.cell_count() as f64 > budget {
            size *= 1.01;
            grid = Self::new(min, max, size)?;
        }
        warnings.push(format!(
            "Height field of {:.2} megapixels exceeds the {:.2} megapixel budget; \
             pixel size raised from {} to {}",
            requested / 1.0e6,
            max_megapixels,
            pixel_size,
            size
        ));
        Ok(grid)
    }

    pub fn cell_count(&self) -> usize {
        self.width * self.height
    }

    /// Same grid grown by `cells` on every side.
    pub fn expanded(&self, cells: usize) -> Self {
        let margin = cells as f64 * self.pixel_size;
        Self {
            min: Point2::new(self.min.x - margin, self.min.y - margin),
            pixel_size: self.pixel_size,
            width: self.width + 2 * cells,
            height: self.height + 2 * cells,
        }
    }

    /// World position of the far corner cell.
    pub fn max(&self) -> Point2<f64> {
        self.cell_to_world(self.width - 1, self.height - 1)
    }

    pub fn cell_to_world(&self, i: usize, j: usize) -> Point2<f64> {
        Point2::new(
            self.min.x + i as f64 * self.pixel_size,
            self.min.y + j as f64 * self.pixel_size,
        )
    }

    /// Fractional cell coordinates of a world point.
    pub fn world_to_cell(&self, x: f64, y: f64) -> (f64, f64) {
        (
            (x - self.min.x) / self.pixel_size,
            (y - self.min.y) / self.pixel_size,
        )
    }

    #[inline]
    pub(crate) fn index(&self, i: usize, j: usize) -> usize {
        j * self.width + i
    }
}

/// Anything that can answer "how high is the surface at (x, y)".
///
/// Implementations return [`NO_SURFACE`] where nothing is known.
pub trait SurfaceQuery {
    fn surface_z(&self, x: f64, y: f64) -> f64;
}

/// Exact collision query backed by a closure.
pub struct ExactSurface<F>(pub F);

impl<F> SurfaceQuery for ExactSurface<F>
where
    F: Fn(f64, f64) -> Option<f64>,
{
    fn surface_z(&self, x: f64, y: f64) -> f64 {
        (self.0)(x, y).filter(|z| z.is_finite()).unwrap_or(NO_SURFACE)
    }
}

/// 2D array of elevations over a [`GridSpec`] (row-major: `j * width + i`).
#[derive(Debug, Clone)]
pub struct HeightField {
    grid: GridSpec,
    heights: Vec<f64>,
    generation: u64,
}

impl PartialEq for HeightField {
    fn eq(&self, other: &Self) -> bool {
        self.grid == other.grid && self.heights == other.heights
    }
}

impl HeightField {
    pub(crate) fn from_parts(grid: GridSpec, heights: Vec<f64>) -> Self {
        debug_assert_eq!(heights.len(), grid.cell_count());
        Self {
            grid,
            heights,
            generation: next_generation(),
        }
    }

    /// Field with every cell at `z`.
    pub fn filled(grid: GridSpec, z: f64) -> Self {
        Self::from_parts(grid, vec![z; grid.cell_count()])
    }

    /// Flat surface at height `z`.
    pub fn flat(grid: GridSpec, z: f64) -> Self {
        Self::filled(grid, z)
    }

    /// Field where no cell has a surface.
    pub fn empty(grid: GridSpec) -> Self {
        Self::filled(grid, NO_SURFACE)
    }

    /// Builds a field from an orthographic depth buffer, one sample per cell,
    /// row 0 at the minimum Y. Non-finite samples become [`NO_SURFACE`].
    pub fn from_depth_buffer(grid: GridSpec, samples: Vec<f64>) -> ToolpathResult<Self> {
        if samples.len() != grid.cell_count() {
            return Err(ToolpathError::geometry(format!(
                "depth buffer has {} samples, grid {}x{} needs {}",
                samples.len(),
                grid.width,
                grid.height,
                grid.cell_count()
            )));
        }
        let heights = samples
            .into_iter()
            .map(|z| if z.is_finite() { z } else { NO_SURFACE })
            .collect();
        Ok(Self::from_parts(grid, heights))
    }

    /// Builds a field from a rendered depth image. Image row 0 is the top
    /// (maximum Y) row of the grid.
    pub fn from_depth_image(
        grid: GridSpec,
        image: &ImageBuffer<Luma<f32>, Vec<f32>>,
    ) -> ToolpathResult<Self> {
        let (w, h) = image.dimensions();
        if w as usize != grid.width || h as usize != grid.height {
            return Err(ToolpathError::Image(format!(
                "depth image is {}x{}, grid is {}x{}",
                w, h, grid.width, grid.height
            )));
        }
        let mut heights = Vec::with_capacity(grid.cell_count());
        for j in 0..grid.height {
            let row = (grid.height - 1 - j) as u32;
            for i in 0..grid.width {
                let z = image.get_pixel(i as u32, row)[0] as f64;
                heights.push(if z.is_finite() { z } else { NO_SURFACE });
            }
        }
        Ok(Self::from_parts(grid, heights))
    }

    /// Builds a field by querying `sample` at every cell position; `None`
    /// marks an unreachable cell.
    pub fn from_sampler<F>(grid: GridSpec, mut sample: F) -> Self
    where
        F: FnMut(f64, f64) -> Option<f64>,
    {
        let mut heights = Vec::with_capacity(grid.cell_count());
        for j in 0..grid.height {
            for i in 0..grid.width {
                let p = grid.cell_to_world(i, j);
                let z = sample(p.x, p.y).filter(|z| z.is_finite());
                heights.push(z.unwrap_or(NO_SURFACE));
            }
        }
        debug!(
            "Sampled height field {}x{} at pixel size {}",
            grid.width, grid.height, grid.pixel_size
        );
        Self::from_parts(grid, heights)
    }

    /// Copy surrounded by `cells` rings of [`NO_SURFACE`], so a kernel of
    /// that reach fits over every original cell.
    pub fn padded(&self, cells: usize) -> Self {
        if cells == 0 {
            return self.clone();
        }
        let grid = self.grid.expanded(cells);
        let mut heights = vec![NO_SURFACE; grid.cell_count()];
        for (j, row) in self.heights.chunks(self.grid.width).enumerate() {
            let start = grid.index(cells, j + cells);
            heights[start..start + row.len()].copy_from_slice(row);
        }
        Self::from_parts(grid, heights)
    }

    pub fn grid(&self) -> &GridSpec {
        &self.grid
    }

    pub fn width(&self) -> usize {
        self.grid.width
    }

    pub fn height(&self) -> usize {
        self.grid.height
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn heights(&self) -> &[f64] {
        &self.heights
    }

    /// Height at cell coordinates. Panics when out of range.
    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.heights[self.grid.index(i, j)]
    }

    /// Height at cell coordinates, `None` when out of range.
    pub fn get_checked(&self, i: usize, j: usize) -> Option<f64> {
        if i >= self.grid.width || j >= self.grid.height {
            return None;
        }
        Some(self.get(i, j))
    }

    /// Bilinear interpolation of the four cells around `(x, y)`.
    ///
    /// Returns [`NO_SURFACE`] outside the grid or when any neighbour has no
    /// surface.
    pub fn sample_bilinear(&self, x: f64, y: f64) -> f64 {
        let (fx, fy) = self.grid.world_to_cell(x, y);
        let Some((i0, i1, tx)) = axis_neighbours(fx, self.grid.width) else {
            return NO_SURFACE;
        };
        let Some((j0, j1, ty)) = axis_neighbours(fy, self.grid.height) else {
            return NO_SURFACE;
        };

        let z00 = self.get(i0, j0);
        let z10 = self.get(i1, j0);
        let z01 = self.get(i0, j1);
        let z11 = self.get(i1, j1);
        if !(is_surface(z00) && is_surface(z10) && is_surface(z01) && is_surface(z11)) {
            return NO_SURFACE;
        }

        let bottom = z00 + (z10 - z00) * tx;
        let top = z01 + (z11 - z01) * tx;
        bottom + (top - bottom) * ty
    }

    /// Lowest real elevation, if any cell has one.
    pub fn min_z(&self) -> Option<f64> {
        self.heights
            .iter()
            .copied()
            .filter(|z| is_surface(*z))
            .reduce(f64::min)
    }

    /// Highest real elevation, if any cell has one.
    pub fn max_z(&self) -> Option<f64> {
        self.heights
            .iter()
            .copied()
            .filter(|z| is_surface(*z))
            .reduce(f64::max)
    }

    /// Number of cells holding a real elevation.
    pub fn surface_cells(&self) -> usize {
        self.heights.iter().filter(|z| is_surface(**z)).count()
    }

    /// Normalized 16-bit grayscale preview, top row = maximum Y. Cells without
    /// a surface are black.
    pub fn to_luma16(&self) -> ImageBuffer<Luma<u16>, Vec<u16>> {
        let (lo, hi) = match (self.min_z(), self.max_z()) {
            (Some(lo), Some(hi)) => (lo, hi),
            _ => (0.0, 0.0),
        };
        let range = hi - lo;
        let height = self.grid.height;
        ImageBuffer::from_fn(self.grid.width as u32, height as u32, |x, y| {
            let j = height - 1 - y as usize;
            let z = self.get(x as usize, j);
            let value = if !is_surface(z) {
                0
            } else if range <= f64::EPSILON {
                u16::MAX
            } else {
                (((z - lo) / range) * u16::MAX as f64).round() as u16
            };
            Luma([value])
        })
    }
}

impl SurfaceQuery for HeightField {
    fn surface_z(&self, x: f64, y: f64) -> f64 {
        self.sample_bilinear(x, y)
    }
}

/// Lower/upper neighbour indices and blend factor along one axis.
fn axis_neighbours(f: f64, count: usize) -> Option<(usize, usize, f64)> {
    const EDGE: f64 = 1e-6;
    let last = (count - 1) as f64;
    if !f.is_finite() || f < -EDGE || f > last + EDGE {
        return None;
    }
    let f = f.clamp(0.0, last);
    if count == 1 {
        return Some((0, 0, 0.0));
    }
    let lower = (f.floor() as usize).min(count - 2);
    Some((lower, lower + 1, f - lower as f64))
}
