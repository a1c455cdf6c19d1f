//! # millkit core
//!
//! Core types shared by the millkit toolpath engine:
//! error handling, the per-operation warnings log, the immutable
//! [`OperationContext`], cutter descriptors and progress reporting.

pub mod context;
pub mod cutter;
pub mod error;
pub mod progress;
pub mod warnings;

pub use context::{HierarchyMode, MovementSettings, MovementType, OperationContext, StarvationPolicy};
pub use cutter::{CutterDescriptor, CutterKind};
pub use error::{ParameterError, ToolpathError, ToolpathResult};
pub use progress::{CancelToken, ProgressCallback, ProgressReporter, Stage};
pub use warnings::Warnings;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
