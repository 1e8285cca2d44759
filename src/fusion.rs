//! Madgwick gradient-descent orientation fusion.
//!
//! Two variants: six-axis (accelerometer + gyroscope) and nine-axis
//! (accelerometer + gyroscope + magnetometer). Both integrate the gyro rate
//! into the quaternion and pull the estimate toward the measured gravity
//! (and, for nine-axis, magnetic field) direction with a fixed-gain
//! gradient step.

use nalgebra::Vector3;

use crate::orientation::Quaternion;

/// Fusion gain, trades convergence speed against gyro-noise rejection.
pub const DEFAULT_BETA: f32 = 0.041;

/// Capability set of the fusion step, fixed at construction.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FusionVariant {
    /// Accelerometer + gyroscope only. Yaw is unobservable and will drift
    /// with the gyro.
    SixAxis,
    /// Accelerometer + gyroscope + magnetometer.
    NineAxis,
}

/// One MARG sample prepared for fusion: remapped into the body frame, gyro
/// in rad/s. Accel and magn only contribute their direction and may be in
/// any consistent unit.
#[derive(Debug, Clone, Copy)]
pub struct FusionInput {
    pub accel: Vector3<f32>,
    pub gyro_rad_s: Vector3<f32>,
    pub magn: Vector3<f32>,
}

/// Stateless fusion step; all estimator state lives in the quaternion it
/// mutates.
#[derive(Debug, Clone, Copy)]
pub struct FusionAlgorithm {
    variant: FusionVariant,
    beta: f32,
}

impl FusionAlgorithm {
    pub fn new(variant: FusionVariant) -> Self {
        Self::with_beta(variant, DEFAULT_BETA)
    }

    pub fn with_beta(variant: FusionVariant, beta: f32) -> Self {
        Self { variant, beta }
    }

    pub fn variant(&self) -> FusionVariant {
        self.variant
    }

    /// Advances `quat` by one fusion step of `dt_ms` milliseconds.
    ///
    /// A zero-magnitude accel (or, for nine-axis, magn) vector aborts the
    /// step and leaves the quaternion untouched: a dropped update is
    /// preferred over propagating NaNs from a degenerate sample. `dt_ms`
    /// of zero integrates nothing and only re-normalizes.
    pub fn update(&self, input: &FusionInput, quat: &mut Quaternion, dt_ms: u32) {
        match self.variant {
            FusionVariant::SixAxis => self.update_six_axis(input, quat, dt_ms),
            FusionVariant::NineAxis => self.update_nine_axis(input, quat, dt_ms),
        }
    }

    fn update_six_axis(&self, input: &FusionInput, quat: &mut Quaternion, dt_ms: u32) {
        let mut q_dot = gyro_derivative(quat, &input.gyro_rad_s);

        let mut accel = input.accel;
        if !try_normalize(&mut accel) {
            log_trace!("zero-magnitude accel sample, skipping fusion step");
            return;
        }

        let (w, x, y, z) = (quat.w, quat.x, quat.y, quat.z);
        let qw_2 = 2.0 * w;
        let qx_2 = 2.0 * x;
        let qy_2 = 2.0 * y;
        let qz_2 = 2.0 * z;
        let qw_4 = 4.0 * w;
        let qx_4 = 4.0 * x;
        let qy_4 = 4.0 * y;
        let qx_8 = 8.0 * x;
        let qy_8 = 8.0 * y;
        let qw_qw = w * w;
        let qx_qx = x * x;
        let qy_qy = y * y;
        let qz_qz = z * z;

        // closed-form gradient of the gravity-alignment objective
        let step = Quaternion {
            w: qw_4 * qy_qy + qy_2 * accel.x + qw_4 * qx_qx - qx_2 * accel.y,
            x: qx_4 * qz_qz - qz_2 * accel.x + 4.0 * qw_qw * x - qw_2 * accel.y - qx_4
                + qx_8 * qx_qx
                + qx_8 * qy_qy
                + qx_4 * accel.z,
            y: 4.0 * qw_qw * y + qw_2 * accel.x + qy_4 * qz_qz - qz_2 * accel.y - qy_4
                + qy_8 * qx_qx
                + qy_8 * qy_qy
                + qy_4 * accel.z,
            z: 4.0 * qx_qx * z - qx_2 * accel.x + 4.0 * qy_qy * z - qy_2 * accel.y,
        };

        self.apply_feedback(&mut q_dot, step);
        integrate(quat, &q_dot, dt_ms);
    }

    fn update_nine_axis(&self, input: &FusionInput, quat: &mut Quaternion, dt_ms: u32) {
        let mut q_dot = gyro_derivative(quat, &input.gyro_rad_s);

        let mut accel = input.accel;
        if !try_normalize(&mut accel) {
            log_trace!("zero-magnitude accel sample, skipping fusion step");
            return;
        }
        let mut magn = input.magn;
        if !try_normalize(&mut magn) {
            log_trace!("zero-magnitude magn sample, skipping fusion step");
            return;
        }

        let (w, x, y, z) = (quat.w, quat.x, quat.y, quat.z);
        let qw_2 = 2.0 * w;
        let qx_2 = 2.0 * x;
        let qy_2 = 2.0 * y;
        let qz_2 = 2.0 * z;
        let qw_qw = w * w;
        let qw_qx = w * x;
        let qw_qy = w * y;
        let qw_qz = w * z;
        let qx_qx = x * x;
        let qx_qy = x * y;
        let qx_qz = x * z;
        let qy_qy = y * y;
        let qy_qz = y * z;
        let qz_qz = z * z;

        // reference direction of Earth's magnetic field in the estimate's
        // frame: horizontal component bx (by construction >= 0) and
        // vertical component bz
        let hx = magn.x * qw_qw - qw_2 * magn.y * z + qw_2 * magn.z * y + magn.x * qx_qx
            + qx_2 * magn.y * y
            + qx_2 * magn.z * z
            - magn.x * qy_qy
            - magn.x * qz_qz;
        let hy = qw_2 * magn.x * z + magn.y * qw_qw - qw_2 * magn.z * x + qx_2 * magn.x * y
            - magn.y * qx_qx
            + magn.y * qy_qy
            + qy_2 * magn.z * z
            - magn.y * qz_qz;
        let bx_2 = libm::sqrtf(hx * hx + hy * hy);
        let bz_2 = -qw_2 * magn.x * y + qw_2 * magn.y * x + magn.z * qw_qw + qx_2 * magn.x * z
            - magn.z * qx_qx
            + qy_2 * magn.y * z
            - magn.z * qy_qy
            + magn.z * qz_qz;
        let bx_4 = 2.0 * bx_2;
        let bz_4 = 2.0 * bz_2;

        // objective-function residuals, gravity and magnetic field
        let f_ax = 2.0 * qx_qz - 2.0 * qw_qy - accel.x;
        let f_ay = 2.0 * qw_qx + 2.0 * qy_qz - accel.y;
        let f_az = 1.0 - 2.0 * qx_qx - 2.0 * qy_qy - accel.z;
        let f_mx = bx_2 * (0.5 - qy_qy - qz_qz) + bz_2 * (qx_qz - qw_qy) - magn.x;
        let f_my = bx_2 * (qx_qy - qw_qz) + bz_2 * (qw_qx + qy_qz) - magn.y;
        let f_mz = bx_2 * (qw_qy + qx_qz) + bz_2 * (0.5 - qx_qx - qy_qy) - magn.z;

        let step = Quaternion {
            w: -qy_2 * f_ax + qx_2 * f_ay - bz_2 * y * f_mx
                + (-bx_2 * z + bz_2 * x) * f_my
                + bx_2 * y * f_mz,
            x: qz_2 * f_ax + qw_2 * f_ay - 4.0 * x * f_az
                + bz_2 * z * f_mx
                + (bx_2 * y + bz_2 * w) * f_my
                + (bx_2 * z - bz_4 * x) * f_mz,
            y: -qw_2 * f_ax + qz_2 * f_ay - 4.0 * y * f_az
                + (-bx_4 * y - bz_2 * w) * f_mx
                + (bx_2 * x + bz_2 * z) * f_my
                + (bx_2 * w - bz_4 * y) * f_mz,
            z: qx_2 * f_ax + qy_2 * f_ay
                + (-bx_4 * z + bz_2 * x) * f_mx
                + (-bx_2 * w + bz_2 * y) * f_my
                + bx_2 * x * f_mz,
        };

        self.apply_feedback(&mut q_dot, step);
        integrate(quat, &q_dot, dt_ms);
    }

    fn apply_feedback(&self, q_dot: &mut Quaternion, step: Quaternion) {
        match step.normalized() {
            Some(step) => *q_dot -= step * self.beta,
            // zero gradient: the estimate already satisfies the alignment
            // objectives, integrate the gyro rate alone
            None => log_trace!("zero-magnitude gradient step, skipping corrective feedback"),
        }
    }
}

/// Rate of change of the quaternion from the gyro rate: q_dot = 1/2 q (x) [0, gyro].
fn gyro_derivative(quat: &Quaternion, gyro: &Vector3<f32>) -> Quaternion {
    Quaternion {
        w: -quat.x * gyro.x - quat.y * gyro.y - quat.z * gyro.z,
        x: quat.w * gyro.x + quat.y * gyro.z - quat.z * gyro.y,
        y: quat.w * gyro.y - quat.x * gyro.z + quat.z * gyro.x,
        z: quat.w * gyro.z + quat.x * gyro.y - quat.y * gyro.x,
    } * 0.5
}

fn integrate(quat: &mut Quaternion, q_dot: &Quaternion, dt_ms: u32) {
    *quat += *q_dot * (dt_ms as f32 * 0.001);
    // downstream consumers rely on unit norm
    quat.normalize();
}

fn try_normalize(vec: &mut Vector3<f32>) -> bool {
    let length = vec.magnitude();
    if length == 0.0 {
        return false;
    }
    *vec *= 1.0 / length;
    true
}
