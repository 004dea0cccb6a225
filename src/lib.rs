//! NakshaSLAM - Pose correction and occupancy grid synthesis around an
//! external grid-SLAM particle filter.
//!
//! The crate wraps an opaque particle-filter engine (the `GridSlamEngine`
//! trait) and turns its output into two things: a running map→odom
//! correction transform, and a periodically regenerated 2D occupancy grid
//! built by rasterizing the best particle's trajectory tree.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                   threads/                          │  ← Periodic broadcast
//! │              (transform publisher)                  │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                   pipeline/                         │  ← Orchestration
//! │   (throttle, calibrate, resolve, adapt, correct)    │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌──────────────────────────┬──────────────────────────┐
//! │       sensors/           │    localization/         │  ← Per-scan logic
//! │ (calibration, adapter)   │  (corrector, entropy)    │
//! ├──────────────────────────┴──────────────────────────┤
//! │                   mapping/                          │  ← Grid synthesis
//! │    (working grid, rasterizer, synthesizer)          │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌──────────────┬───────────────────┬──────────────────┐
//! │    core/     │       tf/         │     engine/      │  ← Foundation
//! │ (types,math) │ (frame lookups)   │ (engine contract)│
//! └──────────────┴───────────────────┴──────────────────┘
//! ```
//!
//! # Data flow
//!
//! Scan arrival → throttle → one-time laser geometry calibration →
//! odometry-frame pose resolution → range adaptation → engine
//! `process_scan` → correction update, and (first scan or interval
//! elapsed) trajectory-tree rasterization into the published grid.
//!
//! The transform broadcast thread runs on its own schedule and only ever
//! touches the correction lock, never the map lock.

// Layer 1: Foundation (no internal deps)
pub mod core;

// Layer 2: Frame transforms and engine contract (depends on core)
pub mod engine;
pub mod tf;

// Layer 3: Grid synthesis and sensor geometry (depends on core, tf, engine)
pub mod mapping;
pub mod sensors;

// Layer 4: Shared session state and output channels (depends on mapping)
pub mod state;

// Layer 5: Correction and confidence (depends on state)
pub mod localization;

// Layer 6: Orchestration (depends on all layers)
pub mod pipeline;
pub mod threads;

// Configuration surface
pub mod config;

// Convenience re-exports (flat namespace for common use)

pub use self::core::math;
pub use self::core::types::{LaserScan, Pose2D, Timestamped};

pub use config::{EngineTuning, FrameConfig, MapBounds, SlamConfig};

pub use tf::{StampedTransform, StaticTransformSource, TransformError, TransformSource};

pub use engine::{
    EngineParticle, EngineSetup, GridSlamEngine, NodeId, RangeReading, TrajectoryNode,
    TrajectoryTree,
};

pub use sensors::adapter::{adapt_ranges, AdaptError};
pub use sensors::calibration::{calibrate, CalibrationError, LaserGeometry, MountOrientation};

pub use localization::corrector::Corrector;
pub use localization::entropy::compute_entropy;

pub use mapping::rasterizer::{BeamRasterizer, ScanRasterizer};
pub use mapping::synthesizer::{MapSynthesizer, OCCUPIED, FREE, UNKNOWN};
pub use mapping::working_grid::WorkingGrid;
pub use mapping::{GridSnapshot, MapMetadata};

pub use state::{create_session, SessionShared, SessionSharedHandle, SlamOutputs};

pub use pipeline::{DropReason, ScanOutcome, ScanPipeline, RESOLVER_TIMEOUT};

pub use threads::TransformThread;
