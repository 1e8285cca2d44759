//! Cross-component scenarios, standing in for the firmware's control loop
//! and interrupt-context producers.

use approx::assert_relative_eq;
use embassy_sync::blocking_mutex::raw::{CriticalSectionRawMutex, NoopRawMutex};
#[cfg(feature = "log")]
use log::LevelFilter;

use crate::{
    AltitudeConfig, AltitudeEstimator, FusionAlgorithm, FusionVariant, GyroUnit, MargAggregate,
    MargSample, OrientationEstimator, PressureValue, RawValue, RawVector, RotationMatrix,
    barometric_altitude_m,
};

pub fn init_logger() {
    #[cfg(feature = "log")]
    let _ = env_logger::builder()
        .filter_level(LevelFilter::Warn)
        .filter(Some("flight_estimation_core"), LevelFilter::Trace)
        .is_test(true)
        .try_init();
}

fn raw_vector(x: f32, y: f32, z: f32) -> RawVector {
    [
        RawValue::from_f32(x),
        RawValue::from_f32(y),
        RawValue::from_f32(z),
    ]
}

#[test]
fn gravity_aligned_six_axis_stays_at_identity() {
    init_logger();

    let estimator = OrientationEstimator::<NoopRawMutex>::new(
        FusionAlgorithm::new(FusionVariant::SixAxis),
        RotationMatrix::identity(),
        GyroUnit::RadiansPerSecond,
    );

    let marg = MargSample {
        accel: raw_vector(0.0, 0.0, 9.81),
        ..Default::default()
    };
    for _ in 0..100 {
        estimator.update(&marg, 10);
        assert_relative_eq!(estimator.quaternion().norm(), 1.0, epsilon = 1e-5);
    }

    let quat = estimator.quaternion();
    assert_relative_eq!(quat.w, 1.0, epsilon = 1e-4);
    assert_relative_eq!(quat.x, 0.0, epsilon = 1e-4);
    assert_relative_eq!(quat.y, 0.0, epsilon = 1e-4);
    assert_relative_eq!(quat.z, 0.0, epsilon = 1e-4);
}

#[test]
fn gyro_rate_integrates_into_yaw() {
    init_logger();

    let estimator = OrientationEstimator::<NoopRawMutex>::new(
        FusionAlgorithm::new(FusionVariant::SixAxis),
        RotationMatrix::identity(),
        GyroUnit::RadiansPerSecond,
    );

    // level, rotating about z at 0.1 rad/s for one second of 10 ms ticks
    let marg = MargSample {
        accel: raw_vector(0.0, 0.0, 1.0),
        gyro: raw_vector(0.0, 0.0, 0.1),
        ..Default::default()
    };
    for _ in 0..100 {
        estimator.update(&marg, 10);
    }

    let euler = estimator.euler_angle();
    assert_relative_eq!(euler.yaw, 0.1, epsilon = 1e-3);
    assert_relative_eq!(euler.roll, 0.0, epsilon = 1e-3);
    assert_relative_eq!(euler.pitch, 0.0, epsilon = 1e-3);
}

/// One control-loop tick: snapshot the shared sensor state, drive both
/// estimators, read back for telemetry.
#[test]
fn control_loop_round_trip() {
    init_logger();

    let marg = MargAggregate::<NoopRawMutex>::new();
    let pressure = PressureValue::<NoopRawMutex>::new();
    let orientation = OrientationEstimator::<NoopRawMutex>::new(
        FusionAlgorithm::new(FusionVariant::NineAxis),
        RotationMatrix::identity(),
        GyroUnit::RadiansPerSecond,
    );
    let altitude = AltitudeEstimator::<NoopRawMutex>::new(AltitudeConfig::default());

    // producers deliver their first samples
    marg.store_accel_magn(raw_vector(0.0, 0.0, 1.0), raw_vector(0.4, 0.0, 0.3));
    marg.store_gyro(raw_vector(0.0, 0.0, 0.0));
    pressure.store(RawValue::from_f32(95.0));

    for _ in 0..100 {
        let snapshot = marg.snapshot();
        orientation.update(&snapshot, 10);
        altitude.update(pressure.read());
    }

    assert_relative_eq!(orientation.quaternion().norm(), 1.0, epsilon = 1e-5);
    assert_relative_eq!(
        altitude.altitude_m(),
        barometric_altitude_m(95.0, 101.325),
        epsilon = 0.5
    );
}

/// Atomicity of the MARG snapshot under preemption: with one thread
/// writing coherent accel/magn groups, one writing coherent gyro groups and
/// one reading, no snapshot may ever mix values from two different writes
/// of the same group.
#[test]
fn concurrent_snapshots_are_never_torn() {
    const ITERATIONS: i32 = 20_000;

    let aggregate = MargAggregate::<CriticalSectionRawMutex>::new();

    std::thread::scope(|scope| {
        let agg = &aggregate;

        scope.spawn(move || {
            for i in 0..ITERATIONS {
                let v = RawValue {
                    integer: i,
                    micros: i,
                };
                agg.store_accel_magn([v; 3], [v; 3]);
            }
        });

        scope.spawn(move || {
            for i in 0..ITERATIONS {
                let v = RawValue {
                    integer: -i,
                    micros: i,
                };
                agg.store_gyro([v; 3]);
            }
        });

        scope.spawn(move || {
            for _ in 0..ITERATIONS {
                let snapshot = agg.snapshot();

                // each field group must be exactly one completed write
                assert_eq!(snapshot.accel[0], snapshot.accel[1]);
                assert_eq!(snapshot.accel[1], snapshot.accel[2]);
                assert_eq!(snapshot.accel, snapshot.magn);
                assert_eq!(snapshot.accel[0].integer, snapshot.accel[0].micros);

                assert_eq!(snapshot.gyro[0], snapshot.gyro[1]);
                assert_eq!(snapshot.gyro[1], snapshot.gyro[2]);
                assert_eq!(snapshot.gyro[0].integer, -snapshot.gyro[0].micros);
            }
        });
    });
}
