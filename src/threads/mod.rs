//! Long-running session threads.

mod transform_thread;

pub use transform_thread::TransformThread;
