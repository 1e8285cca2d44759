use embassy_sync::blocking_mutex::raw::RawMutex;

use crate::sample::RawValue;
use crate::synced::SyncedValue;

/// Latest raw barometric-pressure sample in sensor-native units (kPa).
///
/// Written by the continuous sampling task, one store per successful fetch.
/// The task's own blocking (conversion wait, bus transaction) happens before
/// the store, never while the lock is held.
pub struct PressureValue<M: RawMutex> {
    value: SyncedValue<M, RawValue>,
}

impl<M: RawMutex> PressureValue<M> {
    pub fn new() -> Self {
        Self {
            value: SyncedValue::default(),
        }
    }

    pub fn store(&self, pressure: RawValue) {
        self.value.with_write(|v| *v = pressure);
    }

    pub fn read(&self) -> RawValue {
        self.value.read()
    }
}

impl<M: RawMutex> Default for PressureValue<M> {
    fn default() -> Self {
        Self::new()
    }
}
