use embassy_sync::blocking_mutex::raw::RawMutex;

use crate::sample::RawValue;
use crate::synced::SyncedValue;

/// Converts a raw pressure reading (kPa) to altitude in meters above the
/// sea-level reference via the barometric formula.
pub fn barometric_altitude_m(pressure_kpa: f32, sea_level_pressure_kpa: f32) -> f32 {
    44330.0 * (1.0 - libm::powf(pressure_kpa / sea_level_pressure_kpa, 0.190_294_9))
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy)]
pub struct AltitudeConfig {
    /// Exponential-smoothing ratio: weight of the newest sample. Low values
    /// prioritize noise rejection over responsiveness.
    pub smoothing_ratio: f32,
    /// Reference pressure the altitude is measured against.
    pub sea_level_pressure_kpa: f32,
}

impl Default for AltitudeConfig {
    fn default() -> Self {
        Self {
            smoothing_ratio: 0.03,
            sea_level_pressure_kpa: 101.325,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct AltitudeState {
    altitude_m: f32,
    first_update: bool,
}

/// Exponentially-smoothed altitude from raw barometric-pressure samples.
///
/// The first sample seeds the filter directly (there is no history to smooth
/// against); later samples are blended in with the configured ratio.
pub struct AltitudeEstimator<M: RawMutex> {
    state: SyncedValue<M, AltitudeState>,
    config: AltitudeConfig,
}

impl<M: RawMutex> AltitudeEstimator<M> {
    pub fn new(config: AltitudeConfig) -> Self {
        Self {
            state: SyncedValue::new(AltitudeState {
                altitude_m: 0.0,
                first_update: true,
            }),
            config,
        }
    }

    pub fn update(&self, pressure: RawValue) {
        let new_altitude =
            barometric_altitude_m(pressure.to_f32(), self.config.sea_level_pressure_kpa);
        let alpha = self.config.smoothing_ratio;

        self.state.with_write(|state| {
            if state.first_update {
                log_debug!("seeding altitude filter at {} m", new_altitude);
                state.altitude_m = new_altitude;
                state.first_update = false;
            } else {
                state.altitude_m = new_altitude * alpha + state.altitude_m * (1.0 - alpha);
            }
        });
    }

    /// Current smoothed altitude in meters.
    pub fn altitude_m(&self) -> f32 {
        self.state.read().altitude_m
    }
}

impl<M: RawMutex> Default for AltitudeEstimator<M> {
    fn default() -> Self {
        Self::new(AltitudeConfig::default())
    }
}
