//! Toolpath pipeline
//!
//! Runs one operation end to end: cutter profile, offset image, depth layers,
//! sampling, hierarchy, sorting, low connections and optimization. A failed
//! or cancelled run returns an error and no chunks.
//!
//! The offset image is computed over the surface grid padded by the cutter
//! reach, so pattern points near the grid edge see the real surface. Layers
//! are cut top-down whatever the hierarchy mode.

use millkit_core::{HierarchyMode, OperationContext, ProgressReporter, ToolpathResult, Warnings};
use nalgebra::{Point2, Point3};
use tracing::info;

use crate::chunk::Chunk;
use crate::connector::connect_low;
use crate::cutter_profile::{generate_profile, ProfileSolid};
use crate::height_field::{GridSpec, HeightField};
use crate::hierarchy::{containment, layer_proximity, ProximityCutoff};
use crate::layers::decompose;
use crate::offset::OffsetCache;
use crate::optimizer::ChunkOptimizer;
use crate::path_output::{materialize, PathMove};
use crate::region::Region;
use crate::sampler::ChunkSampler;
use crate::sorter::ChunkSorter;

/// Result of a successful run.
#[derive(Debug, Default)]
pub struct ToolpathOutput {
    /// Chunks in cutting order
    pub chunks: Vec<Chunk>,
    pub warnings: Warnings,
}

impl ToolpathOutput {
    pub fn point_count(&self) -> usize {
        self.chunks.iter().map(Chunk::len).sum()
    }

    /// Move list for the ordered chunks.
    pub fn moves(&self, ctx: &OperationContext) -> Vec<PathMove> {
        materialize(&self.chunks, ctx)
    }
}

/// Toolpath engine for one operation context. Keeps the offset image of the
/// last run so repeated runs over the same surface skip the dilation.
#[derive(Debug)]
pub struct ToolpathPipeline {
    ctx: OperationContext,
    cache: OffsetCache,
    pending: Warnings,
}

impl ToolpathPipeline {
    pub fn new(ctx: OperationContext) -> ToolpathResult<Self> {
        ctx.validate()?;
        Ok(Self {
            ctx,
            cache: OffsetCache::new(),
            pending: Warnings::new(),
        })
    }

    pub fn context(&self) -> &OperationContext {
        &self.ctx
    }

    /// Grid for the world rectangle `min..max` at the context's pixel size,
    /// coarsened to the megapixel budget. A coarsening warning is reported
    /// with the next run.
    pub fn plan_grid(&mut self, min: Point2<f64>, max: Point2<f64>) -> ToolpathResult<GridSpec> {
        GridSpec::within_budget(
            min,
            max,
            self.ctx.pixel_size,
            self.ctx.max_megapixels,
            &mut self.pending,
        )
    }

    /// Computes the toolpath for `pattern` over `surface`.
    ///
    /// `ambient` masks where the cutter may travel; `profile_source` is used
    /// for custom cutters.
    pub fn run(
        &mut self,
        surface: &HeightField,
        pattern: &[Chunk],
        ambient: Option<&Region>,
        profile_source: Option<&dyn ProfileSolid>,
        reporter: &ProgressReporter,
    ) -> ToolpathResult<ToolpathOutput> {
        let ctx = &self.ctx;
        let mut warnings = std::mem::take(&mut self.pending);
        info!(
            "Toolpath run: {} pattern chunks, cutter {}, surface {}x{}",
            pattern.len(),
            ctx.cutter.kind,
            surface.width(),
            surface.height()
        );

        let profile = generate_profile(&ctx.cutter, surface.grid().pixel_size, profile_source, &mut warnings)?;
        let offset = self
            .cache
            .get_or_compute_padded(surface, &profile, ctx.inverse, reporter)?;
        let layers = decompose(ctx.start_z, ctx.end_z, ctx.step_down, ctx.use_layers)?;

        let refined: Vec<Chunk> = pattern
            .iter()
            .map(|chunk| {
                let mut chunk = chunk.clone();
                chunk.refine(ctx.step_along);
                chunk
            })
            .collect();

        let cutoff = ProximityCutoff::from_context(ctx).value();
        let mut sampler = ChunkSampler::new(offset, &layers, ctx.end_z);
        if let Some(region) = ambient {
            sampler = sampler.with_ambient(region);
        }
        if ctx.hierarchy == HierarchyMode::Proximity {
            sampler = sampler.with_proximity(cutoff);
        }
        let mut sampled = sampler.sample(&refined, reporter)?;

        if ctx.hierarchy == HierarchyMode::Containment {
            let ids = sampled.ordered_ids();
            containment(&mut sampled.arena, &ids);
        }
        // Deeper layers always wait for the layer above.
        layer_proximity(&mut sampled.arena, &sampled.layers, cutoff);

        let mut chunks = if ctx.sort {
            let start = Point3::new(0.0, 0.0, ctx.free_height);
            ChunkSorter::from_context(ctx).sort(sampled.arena, start, &mut warnings, reporter)?
        } else {
            let ids = sampled.ordered_ids();
            sampled.arena.into_ordered(&ids)
        };

        chunks = connect_low(chunks, offset, ambient, ctx);

        if ctx.optimize {
            ChunkOptimizer::from_context(ctx).optimize_all(&mut chunks, reporter)?;
        }

        let output = ToolpathOutput { chunks, warnings };
        info!(
            "Toolpath done: {} chunks, {} points, {} warnings",
            output.chunks.len(),
            output.point_count(),
            output.warnings.len()
        );
        Ok(output)
    }
}
