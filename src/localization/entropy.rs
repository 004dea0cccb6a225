//! Shannon entropy over normalized particle weights.
//!
//! A localization-confidence signal: high entropy means the filter is
//! spread over many hypotheses, zero entropy means a single particle
//! dominates.

use crate::engine::EngineParticle;

/// Compute `-Σ (w_i/W) · log(w_i/W)` over the particle set.
///
/// Terms with zero normalized weight are skipped. Returns 0.0 for an
/// empty set or zero total weight.
pub fn compute_entropy(particles: &[EngineParticle]) -> f64 {
    let weight_total: f64 = particles.iter().map(|p| p.weight).sum();
    if weight_total <= 0.0 {
        return 0.0;
    }

    let mut entropy = 0.0;
    for particle in particles {
        let w = particle.weight / weight_total;
        if w > 0.0 {
            entropy += w * w.ln();
        }
    }
    -entropy
}
