//! # millkit CAM tools
//!
//! The toolpath sampling and sequencing engine. Given a surface height field,
//! a cutter and 2D pattern chunks, it computes where the cutter tip may go,
//! splits the cut into depth layers, orders the resulting chunks so nested
//! and deeper regions are cut in a safe order, and simplifies the motion.
//!
//! ## Stages
//!
//! - **Cutter Profile**: per-pixel envelope of the cutter below its tip
//! - **Offset Simulator**: dilates the height field with the cutter profile
//! - **Layer Decomposer**: splits the depth range into step-down layers
//! - **Chunk Sampler**: lifts 2D pattern chunks onto the offset image
//! - **Hierarchy Builder**: containment and proximity relations
//! - **Chunk Connector**: joins nearby chunks without retracting
//! - **Chunk Sorter**: children-before-parents sequencing
//! - **Chunk Optimizer**: collinear point removal and vertical protection
//! - **Path Output**: rapid/feed move list for G-code emitters
//!
//! [`ToolpathPipeline`] runs all of them for one operation.

pub mod chunk;
pub mod connector;
pub mod cutter_profile;
pub mod height_field;
pub mod hierarchy;
pub mod layers;
pub mod offset;
pub mod optimizer;
pub mod path_output;
pub mod pipeline;
pub mod region;
pub mod sampler;
pub mod sorter;

// Re-export commonly used items
pub use chunk::{point_segment_distance, AxisMotion, Chunk, ChunkArena, ChunkId, ChunkPoint, Entry};
pub use connector::{bridge_points, connect_low, merge_threshold};
pub use cutter_profile::{generate_profile, CutterProfile, ProfileSolid, TriangleMesh};
pub use height_field::{is_surface, ExactSurface, GridSpec, HeightField, SurfaceQuery, NO_SURFACE};
pub use hierarchy::{containment, layer_proximity, proximity, ProximityCutoff};
pub use layers::{decompose, Layer};
pub use offset::{reflect_about_min, simulate_offset, simulate_padded_offset, OffsetCache, OffsetImage};
pub use optimizer::{optimize_chunk, optimize_points, ChunkOptimizer};
pub use path_output::{materialize, travel_lengths, MoveKind, PathMove};
pub use pipeline::{ToolpathOutput, ToolpathPipeline};
pub use region::Region;
pub use sampler::{ChunkSampler, SampledChunks};
pub use sorter::{sort_chunks, ChunkSorter};
