use emc2101::*;
use embedded_hal::i2c::{ErrorKind, I2c};

mod common;

// Needs an EMC2101 on /dev/i2c-1 with a diode and a 4-pin fan attached.
#[test]
#[ignore]
fn test_sample() {
    let hal = common::setup();
    #[allow(unused_mut)]
    let mut emc = Emc2101::open(hal, DEFAULT_ADDRESS).unwrap();

    #[cfg(any(target_os = "linux", target_os = "android"))]
    sample(emc);
    #[cfg(not(any(target_os = "linux", target_os = "android")))]
    unimplemented(emc);
}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn sample<T>(mut emc: Emc2101<T>) where T: I2c {
    // init() leaves the fan at 100%, so it should be turning.
    assert!(emc.fan_rpm().unwrap_or(0) > 0);
    // This test only works if you're in a room with temperature > 0C!
    assert!(emc.internal_temperature().unwrap_or(0) > 0);
    assert!(emc.external_temperature().map(f32::from).unwrap_or(0.0) > 0.0);
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
fn unimplemented<T>(_emc: Emc2101<T>) where T: I2c {

}

#[test]
fn test_open_without_bus() {
    let res = Emc2101::open(common::UnimplementedHal, DEFAULT_ADDRESS);

    assert!(matches!(res, Err(Error::Bus(ErrorKind::Other))));
}
