//! State-estimation core of a small flight controller: fuses raw
//! accelerometer/gyroscope/magnetometer and barometric-pressure samples,
//! delivered asynchronously by interrupt-context drivers and a sampling
//! task, into thread-safe orientation and altitude estimates for the
//! periodic control loop.

// only use std when feature = "std" is enabled or during testing
#![cfg_attr(not(any(test, feature = "std")), no_std)]

mod fmt;

mod altitude;
mod fusion;
mod marg;
mod orientation;
mod pressure;
mod sample;
mod synced;

pub use altitude::{AltitudeConfig, AltitudeEstimator, barometric_altitude_m};
pub use fusion::{DEFAULT_BETA, FusionAlgorithm, FusionInput, FusionVariant};
pub use marg::MargAggregate;
pub use orientation::{EulerAngle, GyroUnit, OrientationEstimator, Quaternion, RotationMatrix};
pub use pressure::PressureValue;
pub use sample::{MargSample, RawValue, RawVector};
pub use synced::SyncedValue;

#[cfg(test)]
mod tests;
