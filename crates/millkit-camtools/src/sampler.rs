//! Chunk Sampler
//!
//! Walks 2D pattern chunks over a surface and turns them into 3D chunks per
//! depth layer. A sample above a layer's top ends that layer's current
//! chunk, a sample below its bottom is cut at the bottom. Where a path
//! crosses a layer boundary between two samples, the crossing point is
//! interpolated on the 3D segment and shared by both layers.

use millkit_core::{ProgressReporter, Stage, ToolpathResult};
use tracing::{debug, info};

use crate::chunk::{Chunk, ChunkArena, ChunkId, ChunkPoint};
use crate::height_field::SurfaceQuery;
use crate::layers::Layer;
use crate::region::Region;

const Z_EPSILON: f64 = 1e-9;

/// Sampled chunks and, per layer (top first), the ids they were produced in.
#[derive(Debug, Default)]
pub struct SampledChunks {
    pub arena: ChunkArena,
    pub layers: Vec<Vec<ChunkId>>,
}

impl SampledChunks {
    /// Every chunk id, top layer first.
    pub fn ordered_ids(&self) -> Vec<ChunkId> {
        self.layers.iter().flatten().copied().collect()
    }

    pub fn chunk_count(&self) -> usize {
        self.arena.len()
    }
}

/// Point where segment `a..b` crosses height `z`.
fn crossing(a: &ChunkPoint, b: &ChunkPoint, z: f64) -> ChunkPoint {
    let dz = b.z() - a.z();
    let t = if dz.abs() <= f64::EPSILON {
        0.0
    } else {
        ((z - a.z()) / dz).clamp(0.0, 1.0)
    };
    let mut p = ChunkPoint::from(a.position + (b.position - a.position) * t);
    p.position.z = z;
    p
}

/// Samples pattern chunks against a surface.
pub struct ChunkSampler<'a, S: SurfaceQuery + ?Sized> {
    surface: &'a S,
    layers: &'a [Layer],
    floor: f64,
    ambient: Option<&'a Region>,
    proximity: Option<f64>,
}

impl<'a, S: SurfaceQuery + ?Sized> ChunkSampler<'a, S> {
    /// Sampler clamping every sample to at least `floor`.
    pub fn new(surface: &'a S, layers: &'a [Layer], floor: f64) -> Self {
        Self {
            surface,
            layers,
            floor,
            ambient: None,
            proximity: None,
        }
    }

    /// Points outside `region` lift the cutter.
    pub fn with_ambient(mut self, region: &'a Region) -> Self {
        self.ambient = Some(region);
        self
    }

    /// Chain each pattern's chunks to the previous pattern's chunks of the
    /// same layer when they come within `cutoff`.
    pub fn with_proximity(mut self, cutoff: f64) -> Self {
        self.proximity = Some(cutoff);
        self
    }

    pub fn sample(&self, pattern: &[Chunk], reporter: &ProgressReporter) -> ToolpathResult<SampledChunks> {
        info!(
            "Sampling {} pattern chunks over {} layers",
            pattern.len(),
            self.layers.len()
        );
        let mut out = SampledChunks {
            arena: ChunkArena::new(),
            layers: vec![Vec::new(); self.layers.len()],
        };
        let mut last_run: Vec<Vec<ChunkId>> = vec![Vec::new(); self.layers.len()];

        for (index, source) in pattern.iter().enumerate() {
            reporter.tick(Stage::Sampling, index, pattern.len())?;
            let this_run = self.sample_one(source, &mut out);

            if let Some(cutoff) = self.proximity {
                for (current, previous) in this_run.iter().zip(&last_run) {
                    for &parent in current {
                        for &child in previous {
                            let near = out
                                .arena
                                .get(parent)
                                .xy_distance_within(out.arena.get(child), cutoff);
                            if near {
                                out.arena.add_relation(parent, child);
                            }
                        }
                    }
                }
            }
            last_run = this_run;
        }
        reporter.tick(Stage::Sampling, pattern.len(), pattern.len())?;

        debug!(
            "Sampling produced {} chunks with {} relations",
            out.arena.len(),
            out.arena.relation_count()
        );
        Ok(out)
    }

    /// Samples one pattern chunk, returning the ids produced per layer.
    fn sample_one(&self, source: &Chunk, out: &mut SampledChunks) -> Vec<Vec<ChunkId>> {
        let mut run: Vec<Vec<ChunkId>> = vec![Vec::new(); self.layers.len()];
        let mut active: Vec<Vec<ChunkPoint>> = vec![Vec::new(); self.layers.len()];
        let mut previous: Option<ChunkPoint> = None;

        for point in source.points() {
            if let Some(region) = self.ambient {
                if !region.contains(point.x(), point.y()) {
                    for li in 0..self.layers.len() {
                        self.flush(li, &mut active[li], &mut run[li], out);
                    }
                    previous = None;
                    continue;
                }
            }

            let z = self.surface.surface_z(point.x(), point.y()).max(self.floor);
            let sample = point.at_z(z);
            for (li, layer) in self.layers.iter().enumerate() {
                if self.advance(layer, previous.as_ref(), &sample, &mut active[li]) {
                    self.flush(li, &mut active[li], &mut run[li], out);
                }
            }
            previous = Some(sample);
        }
        for li in 0..self.layers.len() {
            self.flush(li, &mut active[li], &mut run[li], out);
        }

        if source.is_closed() {
            for ids in &run {
                if let [only] = ids.as_slice() {
                    let chunk = out.arena.get_mut(*only);
                    let ring = chunk.len() >= 4
                        && chunk.first().map(|p| p.position) == chunk.last().map(|p| p.position);
                    if ring {
                        chunk.set_closed(true);
                    }
                }
            }
        }
        run
    }

    /// Feeds one sample into a layer's active chunk. Returns true when the
    /// chunk has to be flushed afterwards.
    fn advance(
        &self,
        layer: &Layer,
        previous: Option<&ChunkPoint>,
        sample: &ChunkPoint,
        active: &mut Vec<ChunkPoint>,
    ) -> bool {
        let top = layer.start_z;
        let bottom = layer.end_z;
        let above = |p: &ChunkPoint| p.z() > top + Z_EPSILON;
        let below = |p: &ChunkPoint| p.z() < bottom - Z_EPSILON;
        let clamped = sample.at_z(sample.z().max(bottom));

        let Some(prev) = previous else {
            if above(sample) {
                return false;
            }
            active.push(clamped);
            return false;
        };

        match (above(prev), above(sample)) {
            (true, true) => false,
            (true, false) => {
                if sample.z() < top - Z_EPSILON {
                    active.push(crossing(prev, sample, top));
                }
                if below(sample) {
                    active.push(crossing(prev, sample, bottom));
                }
                active.push(clamped);
                false
            }
            (false, true) => {
                if below(prev) {
                    active.push(crossing(prev, sample, bottom));
                }
                if prev.z() < top - Z_EPSILON {
                    active.push(crossing(prev, sample, top));
                }
                true
            }
            (false, false) => {
                let crosses_bottom = (below(prev) && sample.z() > bottom + Z_EPSILON)
                    || (below(sample) && prev.z() > bottom + Z_EPSILON);
                if crosses_bottom {
                    active.push(crossing(prev, sample, bottom));
                }
                active.push(clamped);
                false
            }
        }
    }

    fn flush(
        &self,
        layer_index: usize,
        active: &mut Vec<ChunkPoint>,
        run: &mut Vec<ChunkId>,
        out: &mut SampledChunks,
    ) {
        if active.is_empty() {
            return;
        }
        let mut chunk = Chunk::new(std::mem::take(active));
        chunk.set_layer(self.layers[layer_index]);
        let id = out.arena.push(chunk);
        run.push(id);
        out.layers[layer_index].push(id);
    }
}
