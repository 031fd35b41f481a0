use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, Operation};

pub struct UnimplementedHal;

impl ErrorType for UnimplementedHal {
    type Error = ErrorKind;
}

impl I2c for UnimplementedHal {
    fn transaction(
        &mut self,
        _address: u8,
        _operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        Err(ErrorKind::Other)
    }
}

cfg_if::cfg_if! {
    if #[cfg(any(target_os = "linux", target_os = "android"))] {
        use linux_embedded_hal::I2cdev;
        pub type HalImpl = I2cdev;
    } else {
        pub type HalImpl = UnimplementedHal;
    }
}

#[allow(dead_code)]
pub fn setup() -> HalImpl {
    cfg_if::cfg_if! {
        if #[cfg(any(target_os = "linux", target_os = "android"))] {
            I2cdev::new("/dev/i2c-1").expect("no I2C bus at /dev/i2c-1")
        } else {
            UnimplementedHal {}
        }
    }
}
