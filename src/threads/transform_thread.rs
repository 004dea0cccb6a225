//! Transform broadcast thread.
//!
//! Re-broadcasts the latest map→odom correction at a fixed period so
//! downstream consumers always see a fresh transform, even between
//! accepted scans. Stamps are set slightly in the future; consumers
//! interpolating against the latest broadcast then never extrapolate
//! past it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crossbeam_channel::Sender;

use crate::config::FrameConfig;
use crate::state::SessionSharedHandle;
use crate::tf::StampedTransform;

/// Broadcast thread handle.
pub struct TransformThread {
    handle: JoinHandle<()>,
}

impl TransformThread {
    /// Spawn the broadcast thread.
    ///
    /// Returns `None` if `period` is zero: broadcasting is disabled and
    /// no thread is started. Stop by clearing `running` and calling
    /// [`join`](Self::join).
    pub fn spawn(
        shared: SessionSharedHandle,
        frames: FrameConfig,
        period: Duration,
        delay: Duration,
        sink: Sender<StampedTransform>,
        running: Arc<AtomicBool>,
    ) -> Option<Self> {
        if period.is_zero() {
            log::info!("transform broadcast disabled (period is zero)");
            return None;
        }

        let handle = thread::Builder::new()
            .name("tf-broadcast".into())
            .spawn(move || {
                run_broadcast_loop(shared, frames, period, delay, sink, running);
            })
            .expect("Failed to spawn transform broadcast thread");

        Some(Self { handle })
    }

    /// Wait for the thread to finish.
    pub fn join(self) -> thread::Result<()> {
        self.handle.join()
    }
}

fn run_broadcast_loop(
    shared: SessionSharedHandle,
    frames: FrameConfig,
    period: Duration,
    delay: Duration,
    sink: Sender<StampedTransform>,
    running: Arc<AtomicBool>,
) {
    log::info!(
        "transform broadcast thread starting ({} -> {}, period {:?})",
        frames.map_frame,
        frames.odom_frame,
        period
    );

    let delay_us = delay.as_micros() as u64;
    while running.load(Ordering::Relaxed) {
        let correction = shared.correction();
        let stamped = StampedTransform {
            parent_frame: frames.map_frame.clone(),
            child_frame: frames.odom_frame.clone(),
            transform: correction,
            stamp_us: now_us() + delay_us,
        };
        if sink.send(stamped).is_err() {
            // Receiver gone; nothing left to broadcast to.
            break;
        }
        thread::sleep(period);
    }

    log::info!("transform broadcast thread shutting down");
}

/// Current wall-clock time in microseconds.
fn now_us() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}
