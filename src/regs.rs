use modular_bitfield::prelude::*;

pub(crate) const INTERNAL_TEMP: u8 = 0x00;
pub(crate) const EXTERNAL_TEMP_MSB: u8 = 0x01;
pub(crate) const STATUS: u8 = 0x02;
pub(crate) const CONFIG: u8 = 0x03;
pub(crate) const DATA_RATE: u8 = 0x04;
pub(crate) const TEMP_FORCE: u8 = 0x0C;
pub(crate) const EXTERNAL_TEMP_LSB: u8 = 0x10;
pub(crate) const TACH_LSB: u8 = 0x46;
pub(crate) const TACH_MSB: u8 = 0x47;
pub(crate) const TACH_LIMIT_LSB: u8 = 0x48;
pub(crate) const TACH_LIMIT_MSB: u8 = 0x49;
pub(crate) const FAN_CONFIG: u8 = 0x4A;
pub(crate) const FAN_SPINUP: u8 = 0x4B;
pub(crate) const FAN_SETTING: u8 = 0x4C;
pub(crate) const PWM_FREQ: u8 = 0x4D;
pub(crate) const PWM_DIV: u8 = 0x4E;
pub(crate) const LUT_HYSTERESIS: u8 = 0x4F;
/// Threshold register of LUT entry 0. Entry `n` lives at `LUT_START + 2n`, its duty one above.
pub(crate) const LUT_START: u8 = 0x50;
pub(crate) const PRODUCT_ID: u8 = 0xFD;
pub(crate) const MANUFACTURER_ID: u8 = 0xFE;
pub(crate) const REVISION: u8 = 0xFF;

/** An 8-bit EMC2101 register whose contents are a set of packed fields.

The driver reads these with a single register read, and updates individual fields with a
read-modify-write of the whole byte. */
pub trait Register: private::Sealed + Copy {
    /// Register address on the device.
    const ADDR: u8;

    fn from_byte(byte: u8) -> Self;
    fn to_byte(self) -> u8;
}

macro_rules! impl_register {
    ( $type:ident, $addr:expr ) => {
        impl Register for $type {
            const ADDR: u8 = $addr;

            fn from_byte(byte: u8) -> Self {
                $type::from_bytes([byte])
            }

            fn to_byte(self) -> u8 {
                self.into_bytes()[0]
            }
        }
    };
}

/// Configuration Register (0x03).
#[bitfield]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Assert ALERT only after consecutive out-of-limit conversions.
    pub queue: bool,
    pub tcrit_override: bool,
    /** Use the ALERT/TACH pin as a tachometer input rather than as an interrupt output. */
    pub tach_input: bool,
    pub smbus_timeout_disable: bool,
    /// Drive the fan with a DC voltage instead of PWM.
    pub dac_output: bool,
    pub fan_standby: bool,
    pub standby: bool,
    pub alert_mask: bool,
}

/// Fan Configuration Register (0x4A).
#[bitfield]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FanConfig {
    pub tach_mode: B2,
    /// Derive the PWM frequency from the divisor register instead of `clock_select`.
    pub clock_override: bool,
    /// `true` selects the 1.4 kHz base clock, `false` the 360 kHz one.
    pub clock_select: bool,
    /// Invert the fan drive: 100% duty drives the fan at its lowest setting.
    pub polarity: bool,
    /** The hardware's PROG bit. While set, the LUT is ignored, the Fan Setting register drives
    the fan, and the LUT may be written. */
    pub lut_disabled: bool,
    /// Look up the forced temperature instead of the external diode in the LUT.
    pub force: bool,
    #[skip]
    __: B1,
}

/// Duty cycle applied to the fan while spinning up.
#[derive(BitfieldSpecifier, Debug, Clone, Copy, PartialEq, Eq)]
#[bits = 2]
pub enum SpinUpDrive {
    Disabled,
    Percent50,
    Percent75,
    Percent100,
}

/// How long the spin-up drive is held.
#[derive(BitfieldSpecifier, Debug, Clone, Copy, PartialEq, Eq)]
#[bits = 3]
pub enum SpinUpTime {
    Bypass,
    Ms50,
    Ms100,
    Ms200,
    Ms400,
    Ms800,
    Ms1600,
    Ms3200,
}

/// Fan Spin-up Register (0x4B).
#[bitfield]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FanSpinUp {
    pub time: SpinUpTime,
    pub drive: SpinUpDrive,
    /// Drive at 100% until the tach reading exceeds the minimum RPM, ignoring `drive`/`time`.
    pub fast: bool,
    #[skip]
    __: B2,
}

/// Temperature conversion rate.
#[derive(BitfieldSpecifier, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[bits = 4]
pub enum DataRate {
    Hz1_16,
    Hz1_8,
    Hz1_4,
    Hz1_2,
    Hz1,
    Hz2,
    Hz4,
    Hz8,
    Hz16,
    Hz32,
}

/// Conversion Rate Register (0x04).
#[bitfield]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataRateReg {
    pub rate: DataRate,
    #[skip]
    __: B4,
}

/// Status Register (0x02). Read-only; reading clears the latched bits on the device.
#[bitfield]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status {
    /// Tach count exceeded the limit (fan below minimum RPM).
    pub tach: bool,
    pub tcrit: bool,
    /// External diode open or shorted.
    pub fault: bool,
    pub ext_low: bool,
    pub ext_high: bool,
    pub eeprom_error: bool,
    pub int_high: bool,
    /// A conversion is in progress.
    pub busy: bool,
}

impl_register!(Config, CONFIG);
impl_register!(FanConfig, FAN_CONFIG);
impl_register!(FanSpinUp, FAN_SPINUP);
impl_register!(DataRateReg, DATA_RATE);
impl_register!(Status, STATUS);

mod private {
    pub trait Sealed {}

    // Implement for those same types, but no others.
    impl Sealed for super::Config {}
    impl Sealed for super::FanConfig {}
    impl Sealed for super::FanSpinUp {}
    impl Sealed for super::DataRateReg {}
    impl Sealed for super::Status {}
}
