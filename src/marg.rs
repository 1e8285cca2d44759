use embassy_sync::blocking_mutex::raw::RawMutex;

use crate::sample::{MargSample, RawVector};
use crate::synced::SyncedValue;

/// Latest MARG triad, written independently by the two sensor data-ready
/// handlers and read as one consistent snapshot by the control loop.
///
/// Both producers and all readers go through the same [`SyncedValue`], so a
/// snapshot can never interleave with an in-progress write. If a producer's
/// sample fetch fails it simply skips its store for that event and the
/// previous values persist; reporting the failure is the driver's job.
pub struct MargAggregate<M: RawMutex> {
    data: SyncedValue<M, MargSample>,
}

impl<M: RawMutex> MargAggregate<M> {
    pub fn new() -> Self {
        Self {
            data: SyncedValue::default(),
        }
    }

    /// Stores a new accelerometer + magnetometer pair. Called from the
    /// accel/magn chip's data-ready handler; both channels come from the
    /// same fetch, so they are written in a single exclusive section.
    pub fn store_accel_magn(&self, accel: RawVector, magn: RawVector) {
        self.data.with_write(|sample| {
            sample.accel = accel;
            sample.magn = magn;
        });
    }

    /// Stores a new gyroscope triad. Called from the gyro chip's data-ready
    /// handler.
    pub fn store_gyro(&self, gyro: RawVector) {
        self.data.with_write(|sample| {
            sample.gyro = gyro;
        });
    }

    /// Returns a full copy of the latest sample.
    pub fn snapshot(&self) -> MargSample {
        self.data.read()
    }
}

impl<M: RawMutex> Default for MargAggregate<M> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;

    use super::*;
    use crate::sample::RawValue;

    fn raw(v: i32) -> RawVector {
        [RawValue {
            integer: v,
            micros: 0,
        }; 3]
    }

    #[test]
    fn starts_zeroed() {
        let aggregate = MargAggregate::<NoopRawMutex>::new();
        assert_eq!(aggregate.snapshot(), MargSample::default());
    }

    #[test]
    fn producers_update_their_own_field_groups() {
        let aggregate = MargAggregate::<NoopRawMutex>::new();

        aggregate.store_accel_magn(raw(1), raw(2));
        aggregate.store_gyro(raw(3));

        let snapshot = aggregate.snapshot();
        assert_eq!(snapshot.accel, raw(1));
        assert_eq!(snapshot.magn, raw(2));
        assert_eq!(snapshot.gyro, raw(3));

        // a gyro-only update leaves the accel/magn group untouched
        aggregate.store_gyro(raw(4));
        let snapshot = aggregate.snapshot();
        assert_eq!(snapshot.accel, raw(1));
        assert_eq!(snapshot.gyro, raw(4));
    }
}
