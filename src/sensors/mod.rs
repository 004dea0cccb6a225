//! Sensor geometry calibration and scan adaptation.

pub mod adapter;
pub mod calibration;
