//! Map→odom correction transform.
//!
//! After every engine-accepted scan, the corrector reconciles raw
//! odometry with the filter's best estimate. The resulting rigid
//! transform maps odometry-frame coordinates into the map frame:
//! composing it with live odometry reproduces the corrected pose.

use crate::core::types::Pose2D;
use crate::state::SessionSharedHandle;

/// Pure correction computation: `estimate ∘ odometry⁻¹`.
///
/// Equivalent to `inverse(T(odometry) * inverse(T(estimate)))` in
/// transform algebra.
#[inline]
pub fn correction_from(estimate: &Pose2D, odometry: &Pose2D) -> Pose2D {
    estimate.compose(&odometry.inverse())
}

/// Writes corrections into the shared session under the correction lock.
///
/// Stateless beyond the lock; every update is a pure function of the two
/// pose inputs. Writes are atomic with respect to the broadcast thread's
/// reads.
pub struct Corrector {
    shared: SessionSharedHandle,
}

impl Corrector {
    pub fn new(shared: SessionSharedHandle) -> Self {
        Self { shared }
    }

    /// Recompute and publish the correction for one scan.
    pub fn update(&self, estimate: &Pose2D, odometry: &Pose2D) {
        self.shared
            .set_correction(correction_from(estimate, odometry));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::create_session;
    use approx::assert_relative_eq;

    #[test]
    fn test_correction_recovers_estimate_from_odometry() {
        let odometry = Pose2D::new(2.0, 1.0, 0.4);
        let estimate = Pose2D::new(2.5, 0.8, 0.5);

        let correction = correction_from(&estimate, &odometry);
        let recovered = correction.compose(&odometry);

        assert_relative_eq!(recovered.x, estimate.x, epsilon = 1e-5);
        assert_relative_eq!(recovered.y, estimate.y, epsilon = 1e-5);
        assert_relative_eq!(recovered.theta, estimate.theta, epsilon = 1e-5);
    }

    #[test]
    fn test_identity_when_odometry_matches_estimate() {
        let pose = Pose2D::new(3.0, -1.0, 1.2);
        let correction = correction_from(&pose, &pose);

        assert_relative_eq!(correction.x, 0.0, epsilon = 1e-5);
        assert_relative_eq!(correction.y, 0.0, epsilon = 1e-5);
        assert_relative_eq!(correction.theta, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn test_update_writes_shared_state() {
        let shared = create_session();
        let corrector = Corrector::new(shared.clone());

        let odometry = Pose2D::new(1.0, 0.0, 0.0);
        let estimate = Pose2D::new(1.0, 0.5, 0.0);
        corrector.update(&estimate, &odometry);

        let correction = shared.correction();
        assert_relative_eq!(correction.y, 0.5, epsilon = 1e-5);
    }
}
