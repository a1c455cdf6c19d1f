//! Path Output
//!
//! Flattens an ordered chunk list into the move list a G-code emitter
//! consumes: feed moves along each chunk, rapid moves at the free height
//! between chunks.

use millkit_core::OperationContext;
use nalgebra::Point3;
use serde::{Deserialize, Serialize};

use crate::chunk::{AxisMotion, Chunk};

/// How the machine travels to a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveKind {
    /// Positioning at maximum speed, never in material
    Rapid,
    /// Cutting at feed rate
    Feed,
}

/// One machine move.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathMove {
    pub kind: MoveKind,
    pub target: Point3<f64>,
    /// Rotary axis angles for 4/5-axis targets
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<nalgebra::Vector3<f64>>,
}

impl PathMove {
    pub fn rapid(target: Point3<f64>) -> Self {
        Self {
            kind: MoveKind::Rapid,
            target,
            rotation: None,
        }
    }

    pub fn feed(target: Point3<f64>) -> Self {
        Self {
            kind: MoveKind::Feed,
            target,
            rotation: None,
        }
    }

    fn with_axis(mut self, axis: Option<AxisMotion>) -> Self {
        self.rotation = axis.map(|a| a.rotation);
        self
    }
}

/// Builds the move list for `chunks` in order.
///
/// Each chunk is approached at `ctx.free_height`, plunged into at feed rate
/// and left with a rapid retract back to `ctx.free_height`.
pub fn materialize(chunks: &[Chunk], ctx: &OperationContext) -> Vec<PathMove> {
    let safe = ctx.free_height;
    let mut moves: Vec<PathMove> = Vec::new();

    for chunk in chunks.iter().filter(|c| !c.is_empty()) {
        let points = chunk.points();
        let entry = points[0].position;
        moves.push(PathMove::rapid(Point3::new(entry.x, entry.y, safe)));
        moves.extend(points.iter().map(|p| PathMove::feed(p.position).with_axis(p.axis)));

        let exit = points[points.len() - 1].position;
        moves.push(PathMove::rapid(Point3::new(exit.x, exit.y, safe)));
    }
    moves
}

/// Total feed and rapid travel of a move list, starting from the first target.
pub fn travel_lengths(moves: &[PathMove]) -> (f64, f64) {
    moves.windows(2).fold((0.0, 0.0), |(feed, rapid), w| {
        let length = (w[1].target - w[0].target).norm();
        match w[1].kind {
            MoveKind::Feed => (feed + length, rapid),
            MoveKind::Rapid => (feed, rapid + length),
        }
    })
}
