//! Core data types shared across the pipeline.

mod pose;
mod scan;
mod timestamped;

pub use pose::Pose2D;
pub use scan::LaserScan;
pub use timestamped::Timestamped;
