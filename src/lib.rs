//! # millkit
//!
//! Toolpath sampling and sequencing engine for CNC milling.
//!
//! Given a surface height field, a cutter and 2D path patterns, millkit
//! computes where the cutter may safely touch the stock, in which order the
//! resulting regions must be cut, and how to connect and simplify the motion
//! before it is handed to a G-code emitter.
//!
//! ## Architecture
//!
//! The workspace is split into two crates:
//!
//! 1. **millkit-core** - Errors, warnings log, operation context, cutter
//!    descriptors, progress and cancellation
//! 2. **millkit-camtools** - Height field, cutter profile, offset simulator,
//!    layers, chunks, sampler, hierarchy, connector, sorter, optimizer
//!
//! ## Example
//!
//! ```no_run
//! use millkit::{Chunk, GridSpec, HeightField, OperationContext, ProgressReporter, ToolpathPipeline};
//! use nalgebra::Point2;
//!
//! # fn main() -> anyhow::Result<()> {
//! millkit::init_logging()?;
//! let ctx = OperationContext::new().with_depth_range(0.0, -2.0);
//! let mut pipeline = ToolpathPipeline::new(ctx)?;
//! let grid = pipeline.plan_grid(Point2::new(0.0, 0.0), Point2::new(50.0, 50.0))?;
//! let surface = HeightField::from_sampler(grid, |x, y| Some(-0.01 * (x * y).sqrt()));
//! let pattern = vec![Chunk::from_xy(&[(5.0, 25.0), (45.0, 25.0)])];
//! let output = pipeline.run(&surface, &pattern, None, None, &ProgressReporter::silent())?;
//! println!("{} chunks", output.chunks.len());
//! # Ok(())
//! # }
//! ```

pub use millkit_camtools as camtools;

pub use millkit_core::{
    CancelToken, CutterDescriptor, CutterKind, HierarchyMode, MovementSettings, MovementType,
    OperationContext, ParameterError, ProgressCallback, ProgressReporter, Stage, StarvationPolicy,
    ToolpathError, ToolpathResult, Warnings,
};

pub use millkit_camtools::{
    decompose, generate_profile, materialize, simulate_offset, simulate_padded_offset, Chunk, ChunkArena, ChunkId,
    ChunkPoint, CutterProfile, ExactSurface, GridSpec, HeightField, Layer, MoveKind, OffsetCache,
    PathMove, ProfileSolid, Region, SurfaceQuery, ToolpathOutput, ToolpathPipeline, TriangleMesh,
    NO_SURFACE,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize logging with the default configuration
///
/// Sets up human readable logging to stdout with:
/// - RUST_LOG environment variable support (INFO by default)
/// - Targets, levels and line numbers
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;
    Ok(())
}

/// Initialize structured JSON logging, one event per line on stdout.
pub fn init_json_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());
    let fmt_layer = fmt::layer()
        .json()
        .with_writer(std::io::stdout)
        .with_current_span(true)
        .with_target(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;
    Ok(())
}
