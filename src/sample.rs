use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Fixed-point reading as delivered by the sensor drivers: an integer part
/// plus signed millionths.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawValue {
    pub integer: i32,
    pub micros: i32,
}

impl RawValue {
    pub fn to_f32(self) -> f32 {
        self.integer as f32 + self.micros as f32 * 1e-6
    }

    pub fn from_f32(value: f32) -> Self {
        let integer = libm::floorf(value);
        Self {
            integer: integer as i32,
            micros: ((value - integer) * 1e6) as i32,
        }
    }
}

/// One three-axis channel in sensor-native units.
pub type RawVector = [RawValue; 3];

fn to_vector3(raw: &RawVector) -> Vector3<f32> {
    Vector3::new(raw[0].to_f32(), raw[1].to_f32(), raw[2].to_f32())
}

/// Complete MARG snapshot: accelerometer, gyroscope and magnetometer triads
/// in sensor-native units.
///
/// The accel/magn pair and the gyro come from two different physical sensors
/// with no hardware synchronization, so the two field groups may reflect
/// slightly different real-world instants. Each group is always internally
/// consistent (see [`MargAggregate`](crate::MargAggregate)).
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MargSample {
    pub accel: RawVector,
    pub gyro: RawVector,
    pub magn: RawVector,
}

impl MargSample {
    pub fn accel_f32(&self) -> Vector3<f32> {
        to_vector3(&self.accel)
    }

    pub fn gyro_f32(&self) -> Vector3<f32> {
        to_vector3(&self.gyro)
    }

    pub fn magn_f32(&self) -> Vector3<f32> {
        to_vector3(&self.magn)
    }
}
