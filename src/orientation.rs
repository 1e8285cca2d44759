use core::f32::consts::FRAC_PI_2;
use core::ops::{AddAssign, Mul, SubAssign};

use embassy_sync::blocking_mutex::raw::RawMutex;
use nalgebra::Matrix3;
use serde::{Deserialize, Serialize};

use crate::fusion::{FusionAlgorithm, FusionInput};
use crate::sample::MargSample;
use crate::synced::SyncedValue;

/// Remaps a physically-mounted sensor's axes into the vehicle's right-handed
/// body frame. Fixed for the estimator's lifetime.
pub type RotationMatrix = Matrix3<f32>;

/// Orientation relative to the reference frame, unit norm after every
/// fusion step.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Quaternion {
    pub w: f32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Quaternion {
    pub const IDENTITY: Self = Self {
        w: 1.0,
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn norm(&self) -> f32 {
        libm::sqrtf(self.w * self.w + self.x * self.x + self.y * self.y + self.z * self.z)
    }

    pub fn normalize(&mut self) {
        let recip = 1.0 / self.norm();
        self.w *= recip;
        self.x *= recip;
        self.y *= recip;
        self.z *= recip;
    }

    /// Returns the unit-norm version of this quaternion, or `None` for the
    /// zero quaternion.
    pub fn normalized(&self) -> Option<Self> {
        let norm = self.norm();
        if norm == 0.0 {
            return None;
        }
        Some(*self * (1.0 / norm))
    }

    /// Converts to Euler angles. Pitch is clamped to +/- pi/2 where the asin
    /// argument leaves its domain, so the result is always finite.
    pub fn to_euler(&self) -> EulerAngle {
        let roll = libm::atan2f(
            2.0 * (self.w * self.x + self.y * self.z),
            1.0 - 2.0 * (self.x * self.x + self.y * self.y),
        );

        let sin_pitch = 2.0 * (self.w * self.y - self.z * self.x);
        let pitch = if sin_pitch.abs() < 1.0 {
            libm::asinf(sin_pitch)
        } else {
            libm::copysignf(FRAC_PI_2, sin_pitch)
        };

        let yaw = libm::atan2f(
            2.0 * (self.w * self.z + self.x * self.y),
            1.0 - 2.0 * (self.y * self.y + self.z * self.z),
        );

        EulerAngle { roll, pitch, yaw }
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul<f32> for Quaternion {
    type Output = Quaternion;

    fn mul(self, rhs: f32) -> Quaternion {
        Quaternion {
            w: self.w * rhs,
            x: self.x * rhs,
            y: self.y * rhs,
            z: self.z * rhs,
        }
    }
}

impl AddAssign for Quaternion {
    fn add_assign(&mut self, rhs: Self) {
        self.w += rhs.w;
        self.x += rhs.x;
        self.y += rhs.y;
        self.z += rhs.z;
    }
}

impl SubAssign for Quaternion {
    fn sub_assign(&mut self, rhs: Self) {
        self.w -= rhs.w;
        self.x -= rhs.x;
        self.y -= rhs.y;
        self.z -= rhs.z;
    }
}

/// Roll, pitch, yaw in radians; derived on demand from the quaternion.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct EulerAngle {
    pub roll: f32,
    pub pitch: f32,
    pub yaw: f32,
}

impl EulerAngle {
    pub fn to_degrees(self) -> Self {
        Self {
            roll: self.roll.to_degrees(),
            pitch: self.pitch.to_degrees(),
            yaw: self.yaw.to_degrees(),
        }
    }
}

/// Unit the gyroscope driver delivers angular rate in. Fusion wants rad/s;
/// the conversion happens once, in the estimator, before the fusion step.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GyroUnit {
    RadiansPerSecond,
    DegreesPerSecond,
}

/// Owns the running attitude quaternion and drives the configured fusion
/// algorithm from raw MARG snapshots.
pub struct OrientationEstimator<M: RawMutex> {
    quat: SyncedValue<M, Quaternion>,
    fusion: FusionAlgorithm,
    remap: RotationMatrix,
    gyro_unit: GyroUnit,
}

impl<M: RawMutex> OrientationEstimator<M> {
    pub fn new(fusion: FusionAlgorithm, remap: RotationMatrix, gyro_unit: GyroUnit) -> Self {
        Self {
            quat: SyncedValue::new(Quaternion::IDENTITY),
            fusion,
            remap,
            gyro_unit,
        }
    }

    /// Advances the attitude estimate by one tick of `dt_ms` milliseconds
    /// using a raw MARG snapshot. The caller owns timing; `dt_ms` is trusted.
    pub fn update(&self, marg: &MargSample, dt_ms: u32) {
        let gyro = self.remap * marg.gyro_f32();
        let input = FusionInput {
            accel: self.remap * marg.accel_f32(),
            gyro_rad_s: match self.gyro_unit {
                GyroUnit::RadiansPerSecond => gyro,
                GyroUnit::DegreesPerSecond => gyro.map(|v| v.to_radians()),
            },
            magn: self.remap * marg.magn_f32(),
        };

        self.quat
            .with_write(|quat| self.fusion.update(&input, quat, dt_ms));
    }

    pub fn quaternion(&self) -> Quaternion {
        self.quat.read()
    }

    pub fn euler_angle(&self) -> EulerAngle {
        self.quat.read().to_euler()
    }
}
