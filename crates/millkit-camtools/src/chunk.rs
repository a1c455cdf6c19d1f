//! Chunk data model.
//!
//! A [`Chunk`] is an ordered run of cutter positions cut without lifting.
//! Chunks live in a [`ChunkArena`] while relations between them are built and
//! resolved; relations are integer [`ChunkId`]s stored in both directions.
//!
//! Closed chunks store their closing point explicitly (first == last).

use std::cell::OnceCell;

use cavalier_contours::polyline::{PlineSource, PlineSourceMut, PlineVertex, Polyline};
use nalgebra::{Point2, Point3, Vector3};
use tracing::debug;

use crate::layers::Layer;

/// Per-point data for 4/5-axis motion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisMotion {
    /// Where the retract for this point starts
    pub start: Point3<f64>,
    /// Where the retract for this point ends
    pub end: Point3<f64>,
    /// Rotary axis angles (A, B, C) in radians
    pub rotation: Vector3<f64>,
}

/// A single cutter position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChunkPoint {
    pub position: Point3<f64>,
    pub axis: Option<AxisMotion>,
}

impl ChunkPoint {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            position: Point3::new(x, y, z),
            axis: None,
        }
    }

    pub fn with_axis(mut self, axis: AxisMotion) -> Self {
        self.axis = Some(axis);
        self
    }

    pub fn x(&self) -> f64 {
        self.position.x
    }

    pub fn y(&self) -> f64 {
        self.position.y
    }

    pub fn z(&self) -> f64 {
        self.position.z
    }

    pub fn xy(&self) -> Point2<f64> {
        self.position.xy()
    }

    /// Same point at a different height.
    pub fn at_z(&self, z: f64) -> Self {
        let mut p = *self;
        p.position.z = z;
        p
    }

    pub fn xy_distance(&self, other: &Point3<f64>) -> f64 {
        (self.position.x - other.x).hypot(self.position.y - other.y)
    }
}

impl From<Point3<f64>> for ChunkPoint {
    fn from(position: Point3<f64>) -> Self {
        Self {
            position,
            axis: None,
        }
    }
}

/// Index of a chunk inside a [`ChunkArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkId(pub usize);

impl std::fmt::Display for ChunkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where the tool should enter a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entry {
    /// At the first point
    Start,
    /// At the last point (chunk is reversed)
    End,
    /// At a vertex of a closed chunk (chunk is rotated)
    Vertex(usize),
}

/// Ordered cutter positions plus hierarchy metadata.
#[derive(Debug, Clone, Default)]
pub struct Chunk {
    points: Vec<ChunkPoint>,
    closed: bool,
    pub(crate) parents: Vec<ChunkId>,
    pub(crate) children: Vec<ChunkId>,
    pub(crate) sorted: bool,
    layer: Option<Layer>,
    polygon: OnceCell<Option<Polyline<f64>>>,
}

impl Chunk {
    /// Open chunk.
    pub fn new(points: Vec<ChunkPoint>) -> Self {
        Self {
            points,
            ..Self::default()
        }
    }

    /// Closed chunk; the closing point is appended if missing.
    pub fn closed(mut points: Vec<ChunkPoint>) -> Self {
        let open_ended = match (points.first(), points.last()) {
            (Some(first), Some(last)) => points.len() == 1 || first.position != last.position,
            _ => false,
        };
        if open_ended {
            points.push(points[0]);
        }
        Self {
            points,
            closed: true,
            ..Self::default()
        }
    }

    /// Open chunk from XY coordinates at Z = 0, as produced by pattern generators.
    pub fn from_xy(coords: &[(f64, f64)]) -> Self {
        Self::new(coords.iter().map(|&(x, y)| ChunkPoint::new(x, y, 0.0)).collect())
    }

    /// Closed chunk from XY coordinates at Z = 0.
    pub fn closed_from_xy(coords: &[(f64, f64)]) -> Self {
        Self::closed(coords.iter().map(|&(x, y)| ChunkPoint::new(x, y, 0.0)).collect())
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[ChunkPoint] {
        &self.points
    }

    pub fn first(&self) -> Option<&ChunkPoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&ChunkPoint> {
        self.points.last()
    }

    pub fn parents(&self) -> &[ChunkId] {
        &self.parents
    }

    pub fn children(&self) -> &[ChunkId] {
        &self.children
    }

    pub fn is_sorted(&self) -> bool {
        self.sorted
    }

    pub fn layer(&self) -> Option<Layer> {
        self.layer
    }

    pub fn set_layer(&mut self, layer: Layer) {
        self.layer = Some(layer);
    }

    pub(crate) fn set_closed(&mut self, closed: bool) {
        self.closed = closed;
        self.polygon = OnceCell::new();
    }

    pub fn push(&mut self, point: ChunkPoint) {
        self.points.push(point);
        self.polygon = OnceCell::new();
    }

    /// Appends points; the chunk becomes open.
    pub fn extend<I: IntoIterator<Item = ChunkPoint>>(&mut self, points: I) {
        self.points.extend(points);
        self.set_closed(false);
    }

    /// Replaces the point list, keeping metadata.
    pub fn set_points(&mut self, points: Vec<ChunkPoint>) {
        self.points = points;
        self.polygon = OnceCell::new();
    }

    pub fn into_points(self) -> Vec<ChunkPoint> {
        self.points
    }

    pub fn reverse(&mut self) {
        self.points.reverse();
        self.polygon = OnceCell::new();
    }

    /// Makes vertex `index` the start of a closed chunk.
    pub fn rotate_to(&mut self, index: usize) {
        if !self.closed || self.points.len() < 3 || index == 0 {
            return;
        }
        self.points.pop();
        let index = index % self.points.len();
        self.points.rotate_left(index);
        let first = self.points[0];
        self.points.push(first);
        self.polygon = OnceCell::new();
    }

    /// 3D path length.
    pub fn length(&self) -> f64 {
        self.points
            .windows(2)
            .map(|w| (w[1].position - w[0].position).norm())
            .sum()
    }

    /// Sets every point to height `z`.
    pub fn set_z(&mut self, z: f64) {
        for p in &mut self.points {
            p.position.z = z;
        }
    }

    /// Raises every point below `floor` to `floor`.
    pub fn clip_z(&mut self, floor: f64) {
        for p in &mut self.points {
            if p.position.z < floor {
                p.position.z = floor;
            }
        }
    }

    /// Subdivides segments longer than `max_segment` into equal pieces.
    pub fn refine(&mut self, max_segment: f64) {
        if !(max_segment > 0.0) || self.points.len() < 2 {
            return;
        }
        let mut refined = Vec::with_capacity(self.points.len());
        refined.push(self.points[0]);
        for w in self.points.windows(2) {
            let (a, b) = (w[0].position, w[1].position);
            let pieces = ((b - a).norm() / max_segment).ceil() as usize;
            for k in 1..pieces {
                let t = k as f64 / pieces as f64;
                refined.push(ChunkPoint::from(a + (b - a) * t));
            }
            refined.push(w[1]);
        }
        debug!("Refined chunk from {} to {} points", self.points.len(), refined.len());
        self.points = refined;
        self.polygon = OnceCell::new();
    }

    /// Best entry for a tool at `pos` and its XY distance.
    ///
    /// Closed chunks may be entered at any vertex; open chunks at their end
    /// too when `reversible`.
    pub fn best_entry(&self, pos: &Point3<f64>, reversible: bool) -> (f64, Entry) {
        let Some(first) = self.points.first() else {
            return (f64::INFINITY, Entry::Start);
        };
        if self.closed {
            let vertices = self.points.len().saturating_sub(1).max(1);
            return self.points[..vertices]
                .iter()
                .enumerate()
                .map(|(i, p)| (p.xy_distance(pos), Entry::Vertex(i)))
                .fold((f64::INFINITY, Entry::Start), |best, cur| {
                    if cur.0 < best.0 {
                        cur
                    } else {
                        best
                    }
                });
        }
        let start = first.xy_distance(pos);
        if reversible {
            if let Some(last) = self.points.last() {
                let end = last.xy_distance(pos);
                if end < start {
                    return (end, Entry::End);
                }
            }
        }
        (start, Entry::Start)
    }

    /// Reorders the points so the chunk starts at `entry`.
    pub fn apply_entry(&mut self, entry: Entry) {
        match entry {
            Entry::Start => {}
            Entry::End => self.reverse(),
            Entry::Vertex(i) => self.rotate_to(i),
        }
    }

    /// Axis-aligned XY bounds `(min, max)`.
    pub fn xy_bounds(&self) -> Option<(Point2<f64>, Point2<f64>)> {
        let first = self.points.first()?.xy();
        Some(self.points.iter().fold((first, first), |(lo, hi), p| {
            (
                Point2::new(lo.x.min(p.x()), lo.y.min(p.y())),
                Point2::new(hi.x.max(p.x()), hi.y.max(p.y())),
            )
        }))
    }

    /// True when some part of the two polylines comes within `cutoff` in XY.
    pub fn xy_distance_within(&self, other: &Chunk, cutoff: f64) -> bool {
        let (Some((a_lo, a_hi)), Some((b_lo, b_hi))) = (self.xy_bounds(), other.xy_bounds()) else {
            return false;
        };
        if a_lo.x - cutoff > b_hi.x
            || b_lo.x - cutoff > a_hi.x
            || a_lo.y - cutoff > b_hi.y
            || b_lo.y - cutoff > a_hi.y
        {
            return false;
        }
        let a = segments(&self.points);
        let b = segments(&other.points);
        a.iter().any(|&(p0, p1)| {
            b.iter()
                .any(|&(q0, q1)| segment_distance(p0, p1, q0, q1) <= cutoff)
        })
    }

    /// Closed XY polygon of a closed chunk, computed once.
    pub fn polygon(&self) -> Option<&Polyline<f64>> {
        self.polygon
            .get_or_init(|| {
                if !self.closed || self.points.len() < 4 {
                    return None;
                }
                let mut pline = Polyline::new();
                for p in &self.points[..self.points.len() - 1] {
                    pline.add_vertex(PlineVertex::new(p.x(), p.y(), 0.0));
                }
                pline.set_is_closed(true);
                Some(pline)
            })
            .as_ref()
    }

    /// Absolute XY area of the closed polygon, 0 when open.
    pub fn polygon_area(&self) -> f64 {
        self.polygon().map_or(0.0, |p| p.area().abs())
    }
}

fn segments(points: &[ChunkPoint]) -> Vec<(Point2<f64>, Point2<f64>)> {
    match points {
        [] => Vec::new(),
        [only] => vec![(only.xy(), only.xy())],
        _ => points.windows(2).map(|w| (w[0].xy(), w[1].xy())).collect(),
    }
}

/// XY distance from `p` to segment `a..b`.
pub fn point_segment_distance(p: Point2<f64>, a: Point2<f64>, b: Point2<f64>) -> f64 {
    let ab = b - a;
    let len_sq = ab.norm_squared();
    if len_sq <= f64::EPSILON {
        return (p - a).norm();
    }
    let t = ((p - a).dot(&ab) / len_sq).clamp(0.0, 1.0);
    (p - (a + ab * t)).norm()
}

fn cross(o: Point2<f64>, a: Point2<f64>, b: Point2<f64>) -> f64 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

fn segment_distance(p0: Point2<f64>, p1: Point2<f64>, q0: Point2<f64>, q1: Point2<f64>) -> f64 {
    let d1 = cross(q0, q1, p0);
    let d2 = cross(q0, q1, p1);
    let d3 = cross(p0, p1, q0);
    let d4 = cross(p0, p1, q1);
    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return 0.0;
    }
    point_segment_distance(p0, q0, q1)
        .min(point_segment_distance(p1, q0, q1))
        .min(point_segment_distance(q0, p0, p1))
        .min(point_segment_distance(q1, p0, p1))
}

/// Arena owning chunks while their relations are built and resolved.
#[derive(Debug, Clone, Default)]
pub struct ChunkArena {
    chunks: Vec<Chunk>,
}

impl ChunkArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_chunks(chunks: Vec<Chunk>) -> Self {
        let mut arena = Self::new();
        for chunk in chunks {
            arena.push(chunk);
        }
        arena
    }

    /// Adds a chunk; any relations it carried are discarded.
    pub fn push(&mut self, mut chunk: Chunk) -> ChunkId {
        chunk.parents.clear();
        chunk.children.clear();
        self.chunks.push(chunk);
        ChunkId(self.chunks.len() - 1)
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn get(&self, id: ChunkId) -> &Chunk {
        &self.chunks[id.0]
    }

    pub fn get_mut(&mut self, id: ChunkId) -> &mut Chunk {
        &mut self.chunks[id.0]
    }

    pub fn ids(&self) -> impl Iterator<Item = ChunkId> {
        (0..self.chunks.len()).map(ChunkId)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ChunkId, &Chunk)> {
        self.chunks.iter().enumerate().map(|(i, c)| (ChunkId(i), c))
    }

    /// Makes `parent` wait for `child`. Returns false when the edge is a
    /// self-edge, already present, or would close a cycle.
    pub fn add_relation(&mut self, parent: ChunkId, child: ChunkId) -> bool {
        if parent == child || self.chunks[parent.0].children.contains(&child) {
            return false;
        }
        if self.is_descendant(child, parent) {
            debug!("Rejected relation {} -> {}: would create a cycle", parent, child);
            return false;
        }
        self.chunks[parent.0].children.push(child);
        self.chunks[child.0].parents.push(parent);
        true
    }

    pub fn remove_relation(&mut self, parent: ChunkId, child: ChunkId) {
        self.chunks[parent.0].children.retain(|&c| c != child);
        self.chunks[child.0].parents.retain(|&p| p != parent);
    }

    /// True when `candidate` is reachable from `root` through children.
    pub fn is_descendant(&self, root: ChunkId, candidate: ChunkId) -> bool {
        let mut stack = vec![root];
        let mut seen = vec![false; self.chunks.len()];
        while let Some(id) = stack.pop() {
            if id == candidate {
                return true;
            }
            if std::mem::replace(&mut seen[id.0], true) {
                continue;
            }
            stack.extend(self.chunks[id.0].children.iter().copied());
        }
        false
    }

    /// Every chunk reachable from `root` through children, `root` excluded.
    pub fn descendants(&self, root: ChunkId) -> Vec<ChunkId> {
        let mut out = Vec::new();
        let mut seen = vec![false; self.chunks.len()];
        seen[root.0] = true;
        let mut stack: Vec<ChunkId> = self.chunks[root.0].children.clone();
        while let Some(id) = stack.pop() {
            if std::mem::replace(&mut seen[id.0], true) {
                continue;
            }
            out.push(id);
            stack.extend(self.chunks[id.0].children.iter().copied());
        }
        out
    }

    /// Number of relation edges.
    pub fn relation_count(&self) -> usize {
        self.chunks.iter().map(|c| c.children.len()).sum()
    }

    pub fn into_chunks(self) -> Vec<Chunk> {
        self.chunks
    }

    /// Takes the chunks listed in `order`, in that order, with relations
    /// cleared. Ids missing from `order` are dropped.
    pub fn into_ordered(self, order: &[ChunkId]) -> Vec<Chunk> {
        let mut slots: Vec<Option<Chunk>> = self.chunks.into_iter().map(Some).collect();
        order
            .iter()
            .filter_map(|id| slots.get_mut(id.0).and_then(Option::take))
            .map(|mut chunk| {
                chunk.parents.clear();
                chunk.children.clear();
                chunk
            })
            .collect()
    }
}
