//! Localization correction and confidence estimation.

pub mod corrector;
pub mod entropy;
