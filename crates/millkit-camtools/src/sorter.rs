//! Chunk Sorter
//!
//! Sequences the chunks of an arena so every chunk comes after all of its
//! children while keeping travel between chunks short.
//!
//! The sorter has two states. Without a previous chunk (or when the previous
//! chunk has no parents) it takes the nearest eligible chunk anywhere. After
//! a chunk with parents it first looks inside each parent's subtree for the
//! nearest eligible chunk, so siblings are finished before the sorter wanders
//! off. A chunk is eligible once it is unsorted and all its children are
//! sorted.

use millkit_core::{
    OperationContext, ProgressReporter, Stage, StarvationPolicy, ToolpathError, ToolpathResult, Warnings,
};
use nalgebra::Point3;
use tracing::{debug, info};

use crate::chunk::{Chunk, ChunkArena, ChunkId, Entry};

/// Orders chunks of a [`ChunkArena`].
#[derive(Debug, Clone, Copy)]
pub struct ChunkSorter {
    reversible: bool,
    starvation: StarvationPolicy,
}

impl ChunkSorter {
    pub fn new(reversible: bool, starvation: StarvationPolicy) -> Self {
        Self {
            reversible,
            starvation,
        }
    }

    pub fn from_context(ctx: &OperationContext) -> Self {
        Self::new(ctx.movement.kind.allows_reversal(), ctx.starvation)
    }

    fn is_eligible(arena: &ChunkArena, id: ChunkId) -> bool {
        let chunk = arena.get(id);
        !chunk.is_sorted() && chunk.children().iter().all(|&c| arena.get(c).is_sorted())
    }

    fn nearest<I>(&self, arena: &ChunkArena, candidates: I, pos: &Point3<f64>) -> Option<(f64, ChunkId, Entry)>
    where
        I: IntoIterator<Item = ChunkId>,
    {
        candidates
            .into_iter()
            .filter(|&id| Self::is_eligible(arena, id))
            .map(|id| {
                let (distance, entry) = arena.get(id).best_entry(pos, self.reversible);
                (distance, id, entry)
            })
            .min_by(|a, b| a.0.total_cmp(&b.0))
    }

    /// Nearest eligible chunk in the subtrees of `last`'s parents.
    fn sibling(&self, arena: &ChunkArena, last: ChunkId, pos: &Point3<f64>) -> Option<(f64, ChunkId, Entry)> {
        arena
            .get(last)
            .parents()
            .iter()
            .filter_map(|&parent| {
                let subtree = arena.descendants(parent).into_iter().chain(std::iter::once(parent));
                self.nearest(arena, subtree, pos)
            })
            .min_by(|a, b| a.0.total_cmp(&b.0))
    }

    /// Sequences every unsorted chunk, starting from `start`.
    ///
    /// Each accepted chunk is entered at its best entry (rotated or
    /// reversed as allowed) and flagged sorted exactly once; chunks already
    /// flagged are left untouched and not returned.
    pub fn order(
        &self,
        arena: &mut ChunkArena,
        start: Point3<f64>,
        warnings: &mut Warnings,
        reporter: &ProgressReporter,
    ) -> ToolpathResult<Vec<ChunkId>> {
        let total = arena.iter().filter(|(_, c)| !c.is_sorted()).count();
        info!("Sorting {} chunks ({} relations)", total, arena.relation_count());

        let mut order: Vec<ChunkId> = Vec::with_capacity(total);
        let mut pos = start;
        let mut last: Option<ChunkId> = None;

        while order.len() < total {
            reporter.tick(Stage::Sorting, order.len(), total)?;

            let next = last
                .and_then(|l| self.sibling(arena, l, &pos))
                .or_else(|| self.nearest(arena, arena.ids(), &pos));

            let Some((distance, id, entry)) = next else {
                let remaining: Vec<ChunkId> = arena.ids().filter(|&id| !arena.get(id).is_sorted()).collect();
                match self.starvation {
                    StarvationPolicy::Fail => {
                        return Err(ToolpathError::SorterStarvation {
                            remaining: remaining.len(),
                        })
                    }
                    StarvationPolicy::AppendUnsorted => {
                        warnings.push(format!(
                            "No chunk could be sequenced safely; appending {} chunks unsorted",
                            remaining.len()
                        ));
                        for id in remaining {
                            arena.get_mut(id).sorted = true;
                            order.push(id);
                        }
                        break;
                    }
                }
            };

            let chunk = arena.get_mut(id);
            chunk.apply_entry(entry);
            chunk.sorted = true;
            if let Some(end) = chunk.last() {
                pos = end.position;
            }
            debug!("Sorted chunk {} at travel distance {:.3}", id, distance);
            order.push(id);
            last = Some(id);
        }
        reporter.tick(Stage::Sorting, total, total)?;
        Ok(order)
    }

    /// Consumes the arena and returns its chunks in cutting order, relations
    /// dropped. Chunks that were already sorted come first, in arena order.
    pub fn sort(
        &self,
        mut arena: ChunkArena,
        start: Point3<f64>,
        warnings: &mut Warnings,
        reporter: &ProgressReporter,
    ) -> ToolpathResult<Vec<Chunk>> {
        let mut ids: Vec<ChunkId> = arena.ids().filter(|&id| arena.get(id).is_sorted()).collect();
        ids.extend(self.order(&mut arena, start, warnings, reporter)?);
        Ok(arena.into_ordered(&ids))
    }
}

/// Sorts with the context's movement type and starvation policy.
pub fn sort_chunks(
    arena: ChunkArena,
    start: Point3<f64>,
    ctx: &OperationContext,
    warnings: &mut Warnings,
    reporter: &ProgressReporter,
) -> ToolpathResult<Vec<Chunk>> {
    ChunkSorter::from_context(ctx).sort(arena, start, warnings, reporter)
}
