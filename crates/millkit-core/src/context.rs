//! Operation configuration.
//!
//! [`OperationContext`] carries every parameter a toolpath operation needs. It
//! is built once, validated, and passed by reference through every stage;
//! nothing in the engine mutates it.
//!
//! All lengths are in world units (millimetres by convention), angles in
//! degrees.

use serde::{Deserialize, Serialize};

use crate::cutter::CutterDescriptor;
use crate::error::{ParameterError, ToolpathResult};

/// How consecutive passes are directed relative to the cutter rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementType {
    /// Material fed against the cutter rotation
    Conventional,
    /// Material fed with the cutter rotation
    #[default]
    Climb,
    /// Alternate directions; open chunks may be reversed freely
    Meander,
}

impl MovementType {
    /// Open chunks may be cut in either direction.
    pub fn allows_reversal(&self) -> bool {
        matches!(self, MovementType::Meander)
    }
}

impl std::fmt::Display for MovementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Conventional => write!(f, "conventional"),
            Self::Climb => write!(f, "climb"),
            Self::Meander => write!(f, "meander"),
        }
    }
}

/// Relation strategy used to order dependent chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HierarchyMode {
    /// No relations; order only by travel distance
    #[default]
    None,
    /// Closed chunks inside another closed chunk are cut first
    Containment,
    /// Neighbouring passes and layers are chained by XY distance
    Proximity,
}

impl std::fmt::Display for HierarchyMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Containment => write!(f, "containment"),
            Self::Proximity => write!(f, "proximity"),
        }
    }
}

/// What the sorter does when no chunk is eligible for sequencing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StarvationPolicy {
    /// Abort the operation with an error
    #[default]
    Fail,
    /// Append the remaining chunks unsorted and record a warning
    AppendUnsorted,
}

/// Movement settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementSettings {
    /// Pass direction
    pub kind: MovementType,
    /// Connect nearby chunks without retracting
    pub stay_low: bool,
    /// Explicit merge distance for low connections; 0 derives it from step-over
    pub merge_distance: f64,
    /// Passes step back over the previous one
    pub parallel_step_back: bool,
    /// Force near-vertical moves to be exactly vertical
    pub protect_vertical: bool,
    /// Angle from vertical under which a move counts as near-vertical (degrees)
    pub protect_vertical_limit: f64,
}

impl Default for MovementSettings {
    fn default() -> Self {
        Self {
            kind: MovementType::default(),
            stay_low: true,
            merge_distance: 0.0,
            parallel_step_back: false,
            protect_vertical: true,
            protect_vertical_limit: 4.0,
        }
    }
}

/// Immutable parameters of one toolpath operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperationContext {
    /// Cutter geometry
    pub cutter: CutterDescriptor,
    /// Movement settings
    pub movement: MovementSettings,
    /// Lateral distance between adjacent passes
    pub step_over: f64,
    /// Distance between samples along a path
    pub step_along: f64,
    /// Depth of one layer
    pub step_down: f64,
    /// Split the depth range into layers
    pub use_layers: bool,
    /// Top of the operation (start depth)
    pub start_z: f64,
    /// Bottom of the operation (end depth, also the sampling floor)
    pub end_z: f64,
    /// Height-field cell size
    pub pixel_size: f64,
    /// Maximum height-field size in megapixels before resolution is reduced
    pub max_megapixels: f64,
    /// Reduce collinear points after sampling
    pub optimize: bool,
    /// Collinearity tolerance for point reduction
    pub optimize_tolerance: f64,
    /// Mill the inverse (female) of the surface
    pub inverse: bool,
    /// Sort chunks for minimal travel
    pub sort: bool,
    /// Chunk relation strategy
    pub hierarchy: HierarchyMode,
    /// Explicit proximity cutoff; 0 derives it from step-over
    pub proximity_cutoff: f64,
    /// Behaviour when sorting stalls
    pub starvation: StarvationPolicy,
    /// Height for rapid moves between chunks
    pub free_height: f64,
}

impl Default for OperationContext {
    fn default() -> Self {
        Self {
            cutter: CutterDescriptor::default(),
            movement: MovementSettings::default(),
            step_over: 1.0,
            step_along: 0.2,
            step_down: 2.0,
            use_layers: true,
            start_z: 0.0,
            end_z: -5.0,
            pixel_size: 0.1,
            max_megapixels: 16.0,
            optimize: true,
            optimize_tolerance: 0.001,
            inverse: false,
            sort: true,
            hierarchy: HierarchyMode::default(),
            proximity_cutoff: 0.0,
            starvation: StarvationPolicy::default(),
            free_height: 5.0,
        }
    }
}

impl OperationContext {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cutter(mut self, cutter: CutterDescriptor) -> Self {
        self.cutter = cutter;
        self
    }

    pub fn with_movement(mut self, movement: MovementSettings) -> Self {
        self.movement = movement;
        self
    }

    pub fn with_movement_type(mut self, kind: MovementType) -> Self {
        self.movement.kind = kind;
        self
    }

    pub fn with_stay_low(mut self, stay_low: bool) -> Self {
        self.movement.stay_low = stay_low;
        self
    }

    pub fn with_merge_distance(mut self, distance: f64) -> Self {
        self.movement.merge_distance = distance;
        self
    }

    /// Enables or disables vertical protection with the given limit in degrees.
    pub fn with_protect_vertical(mut self, enabled: bool, limit_degrees: f64) -> Self {
        self.movement.protect_vertical = enabled;
        self.movement.protect_vertical_limit = limit_degrees;
        self
    }

    pub fn with_step_over(mut self, step_over: f64) -> Self {
        self.step_over = step_over;
        self
    }

    pub fn with_step_along(mut self, step_along: f64) -> Self {
        self.step_along = step_along;
        self
    }

    /// Sets the step-down and enables layering.
    pub fn with_step_down(mut self, step_down: f64) -> Self {
        self.step_down = step_down;
        self.use_layers = true;
        self
    }

    pub fn with_layers(mut self, use_layers: bool) -> Self {
        self.use_layers = use_layers;
        self
    }

    /// Sets the depth range (top, bottom).
    pub fn with_depth_range(mut self, start_z: f64, end_z: f64) -> Self {
        self.start_z = start_z;
        self.end_z = end_z;
        self
    }

    pub fn with_pixel_size(mut self, pixel_size: f64) -> Self {
        self.pixel_size = pixel_size;
        self
    }

    pub fn with_max_megapixels(mut self, megapixels: f64) -> Self {
        self.max_megapixels = megapixels;
        self
    }

    pub fn with_optimize(mut self, enabled: bool, tolerance: f64) -> Self {
        self.optimize = enabled;
        self.optimize_tolerance = tolerance;
        self
    }

    pub fn with_inverse(mut self, inverse: bool) -> Self {
        self.inverse = inverse;
        self
    }

    pub fn with_sort(mut self, sort: bool) -> Self {
        self.sort = sort;
        self
    }

    pub fn with_hierarchy(mut self, hierarchy: HierarchyMode) -> Self {
        self.hierarchy = hierarchy;
        self
    }

    pub fn with_starvation(mut self, policy: StarvationPolicy) -> Self {
        self.starvation = policy;
        self
    }

    pub fn with_free_height(mut self, free_height: f64) -> Self {
        self.free_height = free_height;
        self
    }

    /// Vertical protection limit in radians, if protection is enabled.
    pub fn protect_vertical_radians(&self) -> Option<f64> {
        self.movement
            .protect_vertical
            .then(|| self.movement.protect_vertical_limit.to_radians())
    }

    /// Validates every parameter.
    pub fn validate(&self) -> ToolpathResult<()> {
        self.cutter.validate()?;
        positive("step_over", self.step_over)?;
        positive("step_along", self.step_along)?;
        positive("pixel_size", self.pixel_size)?;
        positive("max_megapixels", self.max_megapixels)?;
        if self.use_layers {
            positive("step_down", self.step_down)?;
        }
        if !(self.start_z.is_finite() && self.end_z.is_finite()) {
            return Err(ParameterError::invalid("depth range", "must be finite").into());
        }
        if self.start_z < self.end_z {
            return Err(ParameterError::invalid(
                "depth range",
                format!(
                    "start_z ({}) must not be below end_z ({})",
                    self.start_z, self.end_z
                ),
            )
            .into());
        }
        ParameterError::check_range(
            "movement.protect_vertical_limit",
            self.movement.protect_vertical_limit,
            0.0,
            90.0,
        )?;
        non_negative("movement.merge_distance", self.movement.merge_distance)?;
        non_negative("optimize_tolerance", self.optimize_tolerance)?;
        non_negative("proximity_cutoff", self.proximity_cutoff)?;
        if !self.free_height.is_finite() {
            return Err(ParameterError::invalid("free_height", "must be finite").into());
        }
        Ok(())
    }

    /// Serializes the context to pretty JSON.
    pub fn to_json(&self) -> ToolpathResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parses and validates a context from JSON. Missing fields take defaults.
    pub fn from_json(json: &str) -> ToolpathResult<Self> {
        let ctx: Self = serde_json::from_str(json)?;
        ctx.validate()?;
        Ok(ctx)
    }
}

fn positive(name: &str, value: f64) -> Result<(), ParameterError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ParameterError::invalid(
            name,
            format!("must be positive, got {value}"),
        ))
    }
}

fn non_negative(name: &str, value: f64) -> Result<(), ParameterError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ParameterError::invalid(
            name,
            format!("must be zero or positive, got {value}"),
        ))
    }
}
