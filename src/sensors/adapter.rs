//! Adapts raw scans into the range array the engine expects.
//!
//! Two transformations: beam order is reversed when the calibrated
//! geometry marked the raw increment negative, and any sample below
//! `range_min` is replaced with `range_max`. Short readings are sensor
//! noise, and the engine treats a max-range sample as "no return" rather
//! than "no obstacle".

use thiserror::Error;

use crate::core::types::LaserScan;
use crate::sensors::calibration::LaserGeometry;

/// Scan shape mismatch against the calibrated geometry.
///
/// Signals sensor reconfiguration mid-session; the scan is dropped and
/// not retried.
#[derive(Error, Debug)]
pub enum AdaptError {
    #[error("scan has {got} beams but calibration expects {expected}")]
    BeamCountMismatch { expected: usize, got: usize },
}

/// Build the adapted range array for one scan.
pub fn adapt_ranges(scan: &LaserScan, geometry: &LaserGeometry) -> Result<Vec<f32>, AdaptError> {
    if scan.beam_count() != geometry.beam_count {
        return Err(AdaptError::BeamCountMismatch {
            expected: geometry.beam_count,
            got: scan.beam_count(),
        });
    }

    let n = scan.ranges.len();
    let pick = |i: usize| {
        if geometry.reverse_ranges {
            scan.ranges[n - 1 - i]
        } else {
            scan.ranges[i]
        }
    };

    let adapted = (0..n)
        .map(|i| {
            let r = pick(i);
            // The engine won't filter short readings itself.
            if r < scan.range_min {
                scan.range_max
            } else {
                r
            }
        })
        .collect();

    Ok(adapted)
}
