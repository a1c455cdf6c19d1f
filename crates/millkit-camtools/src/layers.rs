//! Depth layer decomposition.
//!
//! Splits an operation's depth range into bands cut one after another, from
//! the top down. Consecutive layers share their boundary value exactly.

use millkit_core::{ParameterError, ToolpathResult};
use tracing::debug;

/// Tolerance below which two depths are considered the same.
const DEPTH_EPSILON: f64 = 1e-9;

/// A depth band with `start_z >= end_z`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Layer {
    /// Top of the band
    pub start_z: f64,
    /// Bottom of the band
    pub end_z: f64,
}

impl Layer {
    pub fn new(start_z: f64, end_z: f64) -> Self {
        debug_assert!(
            start_z >= end_z,
            "layer start {start_z} must not be below its end {end_z}"
        );
        Self { start_z, end_z }
    }

    /// True when `z` lies inside `[end_z, start_z]` (with a small tolerance).
    pub fn contains(&self, z: f64) -> bool {
        z <= self.start_z + DEPTH_EPSILON && z >= self.end_z - DEPTH_EPSILON
    }

    pub fn thickness(&self) -> f64 {
        self.start_z - self.end_z
    }
}

/// Decomposes `[end, start]` into layers of at most `stepdown`.
///
/// `n = ceil((start - end) / stepdown)` layers are produced; the last one ends
/// exactly at `end` and zero-height layers are collapsed. With `use_layers`
/// off the whole range is a single layer.
pub fn decompose(start: f64, end: f64, stepdown: f64, use_layers: bool) -> ToolpathResult<Vec<Layer>> {
    if !(start.is_finite() && end.is_finite()) {
        return Err(ParameterError::invalid("depth range", "must be finite").into());
    }
    if start < end {
        return Err(ParameterError::invalid(
            "depth range",
            format!("start ({start}) must not be below end ({end})"),
        )
        .into());
    }
    if !use_layers || start - end <= DEPTH_EPSILON {
        return Ok(vec![Layer::new(start, end)]);
    }
    if !(stepdown.is_finite() && stepdown > 0.0) {
        return Err(ParameterError::invalid(
            "step_down",
            format!("must be positive, got {stepdown}"),
        )
        .into());
    }

    let count = ((start - end) / stepdown).ceil().max(1.0) as usize;
    let mut layers: Vec<Layer> = Vec::with_capacity(count);
    let mut top = start;
    for i in 0..count {
        let mut bottom = (start - (i + 1) as f64 * stepdown).max(end);
        if bottom - end <= DEPTH_EPSILON {
            bottom = end;
        }
        if top - bottom > DEPTH_EPSILON {
            layers.push(Layer::new(top, bottom));
        } else if let Some(last) = layers.last_mut() {
            last.end_z = bottom;
        }
        top = bottom;
        if bottom == end {
            break;
        }
    }

    debug!(
        "Decomposed depth {}..{} (step {}) into {} layers",
        start,
        end,
        stepdown,
        layers.len()
    );
    Ok(layers)
}
