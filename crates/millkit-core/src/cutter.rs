//! Cutter descriptors.
//!
//! A [`CutterDescriptor`] names the cutter geometry an operation is computed
//! for. The engine turns it into a sampled height kernel; this crate only
//! describes and validates it.

use serde::{Deserialize, Serialize};

use crate::error::ParameterError;

/// Cutter geometry variants.
///
/// Angles are full included tip angles in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CutterKind {
    /// Flat end mill
    Flat,
    /// Ball end mill / ball nose
    Ball,
    /// V-bit engraving tool
    VBit { tip_angle: f64 },
    /// Tapered cutter with a ball tip tangent to the cone
    ConeBall { tip_angle: f64, ball_radius: f64 },
    /// Tapered cutter with a flat tip
    ConeFlat { tip_angle: f64, flat_radius: f64 },
    /// Arbitrary shape sampled from a profile solid
    Custom,
}

impl CutterKind {
    /// Get all cutter kind names
    pub fn names() -> &'static [&'static str] {
        &["flat", "ball", "v_bit", "cone_ball", "cone_flat", "custom"]
    }

    /// Tip angle for conical cutters.
    pub fn tip_angle(&self) -> Option<f64> {
        match self {
            CutterKind::VBit { tip_angle }
            | CutterKind::ConeBall { tip_angle, .. }
            | CutterKind::ConeFlat { tip_angle, .. } => Some(*tip_angle),
            CutterKind::Flat | CutterKind::Ball | CutterKind::Custom => None,
        }
    }
}

impl std::fmt::Display for CutterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CutterKind::Flat => write!(f, "Flat End Mill"),
            CutterKind::Ball => write!(f, "Ball End Mill"),
            CutterKind::VBit { tip_angle } => write!(f, "V-Bit {tip_angle}°"),
            CutterKind::ConeBall { tip_angle, .. } => write!(f, "Cone {tip_angle}° Ball Tip"),
            CutterKind::ConeFlat { tip_angle, .. } => write!(f, "Cone {tip_angle}° Flat Tip"),
            CutterKind::Custom => write!(f, "Custom"),
        }
    }
}

/// Cutter used by one operation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CutterDescriptor {
    /// Geometry variant
    pub kind: CutterKind,
    /// Diameter at the widest cutting point (world units)
    pub diameter: f64,
    /// Material left on the surface (world units)
    #[serde(default)]
    pub skin: f64,
}

impl Default for CutterDescriptor {
    fn default() -> Self {
        Self::flat(3.0)
    }
}

impl CutterDescriptor {
    pub fn new(kind: CutterKind, diameter: f64) -> Self {
        Self {
            kind,
            diameter,
            skin: 0.0,
        }
    }

    pub fn flat(diameter: f64) -> Self {
        Self::new(CutterKind::Flat, diameter)
    }

    pub fn ball(diameter: f64) -> Self {
        Self::new(CutterKind::Ball, diameter)
    }

    pub fn v_bit(diameter: f64, tip_angle: f64) -> Self {
        Self::new(CutterKind::VBit { tip_angle }, diameter)
    }

    pub fn with_skin(mut self, skin: f64) -> Self {
        self.skin = skin;
        self
    }

    pub fn radius(&self) -> f64 {
        self.diameter / 2.0
    }

    /// Validate cutter parameters
    pub fn validate(&self) -> Result<(), ParameterError> {
        if !(self.diameter.is_finite() && self.diameter > 0.0) {
            return Err(ParameterError::invalid(
                "cutter.diameter",
                format!("must be positive, got {}", self.diameter),
            ));
        }
        if !(self.skin.is_finite() && self.skin >= 0.0) {
            return Err(ParameterError::invalid(
                "cutter.skin",
                format!("must be zero or positive, got {}", self.skin),
            ));
        }
        if let Some(angle) = self.kind.tip_angle() {
            if !(angle > 0.0 && angle < 180.0) {
                return Err(ParameterError::OutOfRange {
                    name: "cutter.tip_angle".to_string(),
                    value: angle,
                    min: 0.0,
                    max: 180.0,
                });
            }
        }
        match self.kind {
            CutterKind::ConeBall { ball_radius, .. } => {
                ParameterError::check_range("cutter.ball_radius", ball_radius, 0.0, self.radius())
            }
            CutterKind::ConeFlat { flat_radius, .. } => {
                ParameterError::check_range("cutter.flat_radius", flat_radius, 0.0, self.radius())
            }
            _ => Ok(()),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}
