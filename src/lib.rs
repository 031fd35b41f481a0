/*! `emc2101` is an [`embedded_hal`](https://github.com/rust-embedded/embedded-hal) crate for
accessing [Microchip EMC2101](https://www.microchip.com/en-us/product/emc2101) temperature
monitors and fan controllers over an I2C bus.

The EMC2101 measures its own die temperature and an external diode, reads a fan tachometer, and
drives a fan with either PWM or a DC voltage. Fan drive comes either from the Fan Setting
register (a manual duty cycle) or from an 8-entry look-up table (LUT) mapping temperature
thresholds to duty cycles.

Registers are grouped as follows:

* Packed configuration registers, exposed as [`modular_bitfield`] structs ([`Config`],
  [`FanConfig`], [`FanSpinUp`], [`DataRateReg`], [`Status`]) and through one getter/setter
  pair per field on [`Emc2101`].
* Whole-byte settings (PWM frequency and divisor, LUT hysteresis, forced temperature).
* Measurements: internal and external temperature, tach count/RPM.

Nothing is cached: every getter reads the device and every setter of a packed field does a
read-modify-write. The driver owns the bus, so all access goes through `&mut self`. Sharing the
device between several controllers or threads must be arranged by the caller. */
#![no_std]
#![doc(html_root_url = "https://docs.rs/emc2101/0.1.0-alpha.1")]

use core::convert::TryFrom;
use core::fmt;
use core::result::Result;

use embedded_hal::i2c::I2c;
use log::{debug, trace, warn};

mod fan;
mod lut;
mod regs;
mod temp;

pub use fan::{duty_from_percent, percent_from_duty, rpm_from_tach, tach_from_rpm};
pub use fan::{FAN_RPM_NUMERATOR, MAX_DUTY};
pub use lut::{Lut, LutEntry, LutError, LUT_ENTRIES, MAX_LUT_TEMP};
pub use regs::{
    Config, DataRate, DataRateReg, FanConfig, FanSpinUp, Register, SpinUpDrive, SpinUpTime,
    Status,
};
pub use temp::Temperature;

use regs::*;

/// Default EMC2101 bus address.
pub const DEFAULT_ADDRESS: u8 = 0x4C;

/// Product ID register contents for each supported part.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ProductId {
    Emc2101 = 0x16,
    Emc2101R = 0x28,
}

impl TryFrom<u8> for ProductId {
    type Error = u8;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        match id {
            0x16 => Ok(ProductId::Emc2101),
            0x28 => Ok(ProductId::Emc2101R),
            other => Err(other),
        }
    }
}

/** A struct for describing how to read and write an EMC2101's registers via an
[`embedded_hal`] I2C implementation. */
pub struct Emc2101<T> {
    ctx: T,
    address: u8,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
/// Enum for describing possible error conditions when reading/writing an EMC2101.
pub enum Error<E> {
    /** A register read or write via `embedded_hal` failed. Contains the error propagated from
    the [`embedded_hal`] implementation. */
    Bus(E),
    /// The Product ID register held neither known EMC2101 ID.
    WrongChipId(u8),
    /// LUT index above 7.
    LutIndexOutOfRange,
    /// LUT temperature threshold above [`MAX_LUT_TEMP`].
    LutThresholdOutOfRange,
    /// LUT thresholds must increase with the index.
    LutNotIncreasing,
    /// Duty cycle percentage above 100.
    DutyCycleOutOfRange,
    /** Minimum RPM of 0, or too low to be represented as a tach count (below 83 RPM). */
    MinRpmOutOfRange,
    /// A register field held a reserved bit pattern.
    InvalidRegisterValue,
}

impl<E> From<LutError> for Error<E> {
    fn from(err: LutError) -> Self {
        match err {
            LutError::ThresholdOutOfRange => Error::LutThresholdOutOfRange,
            LutError::DutyOutOfRange => Error::DutyCycleOutOfRange,
            LutError::TooManyEntries => Error::LutIndexOutOfRange,
            LutError::ThresholdsNotIncreasing => Error::LutNotIncreasing,
        }
    }
}

impl<E> fmt::Display for Error<E>
where
    E: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Bus(e) => write!(f, "i2c bus error: {:?}", e),
            Error::WrongChipId(id) => write!(f, "wrong chip id {:#04x}", id),
            Error::LutIndexOutOfRange => write!(f, "LUT index must be between 0 and 7"),
            Error::LutThresholdOutOfRange => {
                write!(f, "LUT threshold must be at most {} C", MAX_LUT_TEMP)
            }
            Error::LutNotIncreasing => write!(f, "LUT thresholds must be strictly increasing"),
            Error::DutyCycleOutOfRange => write!(f, "duty cycle must be between 0 and 100%"),
            Error::MinRpmOutOfRange => write!(f, "minimum RPM must be at least 83"),
            Error::InvalidRegisterValue => write!(f, "register holds a reserved value"),
        }
    }
}

type DevResult<T, E> = Result<T, Error<E>>;

impl<T> Emc2101<T>
where
    T: I2c,
{
    /// Bind to the device at `address` without touching the bus.
    pub fn new(ctx: T, address: u8) -> Self {
        Emc2101 { ctx, address }
    }

    /** Bind to the device at `address`, check its Product ID, and put it in a known state (see
    [`Emc2101::init`]). On failure the bus is dropped; use [`Emc2101::new`] and
    [`Emc2101::init`] to keep it. */
    pub fn open(ctx: T, address: u8) -> DevResult<Self, T::Error> {
        let mut emc = Emc2101::new(ctx, address);
        emc.init()?;
        Ok(emc)
    }

    /** Identify the chip, then configure it for manual PWM control: tach input on,
    non-inverted output, PWM frequency 0x1F with the 1.4 kHz clock, LUT off, 100% duty, forced
    temperature off, and the fastest conversion rate. */
    pub fn init(&mut self) -> DevResult<ProductId, T::Error> {
        let product = self.probe()?;

        self.set_tach_input_enabled(true)?;
        self.set_fan_output_inverted(false)?;
        self.set_pwm_frequency(0x1F)?;
        self.configure_pwm_clock(true, false)?;
        self.set_dac_output_enabled(false)?;
        self.set_lut_enabled(false)?;
        self.set_duty_cycle(100)?;
        self.set_forced_temperature_enabled(false)?;
        self.set_data_rate(DataRate::Hz32)?;

        Ok(product)
    }

    /// Read the Product ID register and check that it belongs to an EMC2101.
    pub fn probe(&mut self) -> DevResult<ProductId, T::Error> {
        let id = self.read_reg(PRODUCT_ID)?;

        match ProductId::try_from(id) {
            Ok(product) => {
                debug!("found {:?} at {:#04x}", product, self.address);
                Ok(product)
            }
            Err(id) => {
                warn!("wrong chip id {:#04x} at {:#04x}", id, self.address);
                Err(Error::WrongChipId(id))
            }
        }
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn manufacturer_id(&mut self) -> DevResult<u8, T::Error> {
        self.read_reg(MANUFACTURER_ID)
    }

    pub fn revision(&mut self) -> DevResult<u8, T::Error> {
        self.read_reg(REVISION)
    }

    /// Release the bus. The device keeps its configuration.
    pub fn free(self) -> T {
        self.ctx
    }

    // Packed registers

    pub fn config(&mut self) -> DevResult<Config, T::Error> {
        self.read_register()
    }

    pub fn set_config(&mut self, config: Config) -> DevResult<(), T::Error> {
        self.write_register(config)
    }

    pub fn fan_config(&mut self) -> DevResult<FanConfig, T::Error> {
        self.read_register()
    }

    pub fn set_fan_config(&mut self, fan_config: FanConfig) -> DevResult<(), T::Error> {
        self.write_register(fan_config)
    }

    /// Read the Status register. This clears the device's latched status bits.
    pub fn status(&mut self) -> DevResult<Status, T::Error> {
        self.read_register()
    }

    pub fn tach_input_enabled(&mut self) -> DevResult<bool, T::Error> {
        Ok(self.config()?.tach_input())
    }

    /** Use the ALERT/TACH pin to read a 4-pin fan's tach signal (`true`), or as an interrupt
    output (`false`). */
    pub fn set_tach_input_enabled(&mut self, enable: bool) -> DevResult<(), T::Error> {
        self.modify(|c: &mut Config| c.set_tach_input(enable))
    }

    pub fn dac_output_enabled(&mut self) -> DevResult<bool, T::Error> {
        Ok(self.config()?.dac_output())
    }

    /// Drive the fan with a DC voltage (`true`) instead of PWM (`false`).
    pub fn set_dac_output_enabled(&mut self, enable: bool) -> DevResult<(), T::Error> {
        self.modify(|c: &mut Config| c.set_dac_output(enable))
    }

    pub fn fan_output_inverted(&mut self) -> DevResult<bool, T::Error> {
        Ok(self.fan_config()?.polarity())
    }

    /** Invert the fan drive, so that a duty cycle of 100% drives the fan at its lowest
    setting and 0% at its highest. */
    pub fn set_fan_output_inverted(&mut self, invert: bool) -> DevResult<(), T::Error> {
        self.modify(|f: &mut FanConfig| f.set_polarity(invert))
    }

    /// Returns `(clock_select, clock_override)`. See [`Emc2101::configure_pwm_clock`].
    pub fn pwm_clock(&mut self) -> DevResult<(bool, bool), T::Error> {
        let fan = self.fan_config()?;
        Ok((fan.clock_select(), fan.clock_override()))
    }

    /** Select the PWM base clock: 1.4 kHz when `clock_select` is set, 360 kHz otherwise. With
    `clock_override` the base clock is ignored and the PWM divisor sets the frequency. */
    pub fn configure_pwm_clock(
        &mut self,
        clock_select: bool,
        clock_override: bool,
    ) -> DevResult<(), T::Error> {
        self.modify(|f: &mut FanConfig| {
            f.set_clock_select(clock_select);
            f.set_clock_override(clock_override);
        })
    }

    pub fn forced_temperature_enabled(&mut self) -> DevResult<bool, T::Error> {
        Ok(self.fan_config()?.force())
    }

    /** Make the LUT look up the temperature set with [`Emc2101::set_forced_temperature`]
    instead of the external diode. */
    pub fn set_forced_temperature_enabled(&mut self, enable: bool) -> DevResult<(), T::Error> {
        self.modify(|f: &mut FanConfig| f.set_force(enable))
    }

    pub fn forced_temperature(&mut self) -> DevResult<i8, T::Error> {
        Ok(self.read_reg(TEMP_FORCE)? as i8)
    }

    pub fn set_forced_temperature(&mut self, temp: i8) -> DevResult<(), T::Error> {
        self.write_reg(TEMP_FORCE, temp as u8)
    }

    pub fn data_rate(&mut self) -> DevResult<DataRate, T::Error> {
        let reg: DataRateReg = self.read_register()?;
        reg.rate_or_err().map_err(|_| Error::InvalidRegisterValue)
    }

    pub fn set_data_rate(&mut self, rate: DataRate) -> DevResult<(), T::Error> {
        self.modify(|r: &mut DataRateReg| r.set_rate(rate))
    }

    pub fn pwm_frequency(&mut self) -> DevResult<u8, T::Error> {
        self.read_reg(PWM_FREQ)
    }

    /// Final PWM frequency and effective resolution. No effect with DAC output.
    pub fn set_pwm_frequency(&mut self, freq: u8) -> DevResult<(), T::Error> {
        self.write_reg(PWM_FREQ, freq)
    }

    pub fn pwm_divisor(&mut self) -> DevResult<u8, T::Error> {
        self.read_reg(PWM_DIV)
    }

    /// Divisor used instead of the base clock while the clock override is set.
    pub fn set_pwm_divisor(&mut self, divisor: u8) -> DevResult<(), T::Error> {
        self.write_reg(PWM_DIV, divisor)
    }

    pub fn lut_hysteresis(&mut self) -> DevResult<u8, T::Error> {
        self.read_reg(LUT_HYSTERESIS)
    }

    /** Degrees C the temperature must fall below an entry's threshold before the LUT steps
    down to the previous entry. */
    pub fn set_lut_hysteresis(&mut self, hysteresis: u8) -> DevResult<(), T::Error> {
        self.write_reg(LUT_HYSTERESIS, hysteresis)
    }

    pub fn fan_spinup(&mut self) -> DevResult<FanSpinUp, T::Error> {
        self.read_register()
    }

    /// Drive level and duration used when starting the fan from a stop.
    pub fn configure_fan_spinup(
        &mut self,
        drive: SpinUpDrive,
        time: SpinUpTime,
    ) -> DevResult<(), T::Error> {
        self.modify(|s: &mut FanSpinUp| {
            s.set_drive(drive);
            s.set_time(time);
        })
    }

    pub fn tach_spinup_enabled(&mut self) -> DevResult<bool, T::Error> {
        Ok(self.fan_spinup()?.fast())
    }

    /** Spin up at 100% until the fan passes the minimum RPM, ignoring the drive and time set
    with [`Emc2101::configure_fan_spinup`]. */
    pub fn set_tach_spinup_enabled(&mut self, enable: bool) -> DevResult<(), T::Error> {
        self.modify(|s: &mut FanSpinUp| s.set_fast(enable))
    }

    // Duty cycle and LUT

    pub fn lut_enabled(&mut self) -> DevResult<bool, T::Error> {
        Ok(!self.fan_config()?.lut_disabled())
    }

    /** Let the LUT drive the fan from the measured (or forced) temperature. When disabled the
    fan runs at the duty cycle from [`Emc2101::set_duty_cycle`]. */
    pub fn set_lut_enabled(&mut self, enable: bool) -> DevResult<(), T::Error> {
        self.modify(|f: &mut FanConfig| f.set_lut_disabled(!enable))
    }

    /// Manual duty cycle in percent, truncated.
    pub fn duty_cycle(&mut self) -> DevResult<u8, T::Error> {
        Ok(percent_from_duty(self.read_reg(FAN_SETTING)?))
    }

    /** Set the manual duty cycle, `0..=100`%. Scaled onto `0..=MAX_DUTY`, truncating. The LUT
    is disabled for the write and restored afterwards. */
    pub fn set_duty_cycle(&mut self, percent: u8) -> DevResult<(), T::Error> {
        let duty = duty_from_percent(percent).ok_or(Error::DutyCycleOutOfRange)?;

        self.while_lut_disabled(|emc| emc.write_reg(FAN_SETTING, duty))
    }

    /** Set LUT entry `index` (`0..=7`): above `threshold` C (`0..=127`) drive the fan at
    `duty_percent`. Thresholds must increase with the index for the LUT to work; see
    [`Emc2101::program_lut`] to write a checked table. The LUT is disabled for the write and
    restored afterwards. */
    pub fn set_lut(
        &mut self,
        index: u8,
        threshold: u8,
        duty_percent: u8,
    ) -> DevResult<(), T::Error> {
        if usize::from(index) >= LUT_ENTRIES {
            return Err(Error::LutIndexOutOfRange);
        }

        let entry = LutEntry::try_from((threshold, duty_percent))?;

        self.while_lut_disabled(|emc| emc.write_lut_entry(index, entry))
    }

    pub fn lut_entry(&mut self, index: u8) -> DevResult<LutEntry, T::Error> {
        if usize::from(index) >= LUT_ENTRIES {
            return Err(Error::LutIndexOutOfRange);
        }

        let addr = LUT_START + 2 * index;
        let threshold = self.read_reg(addr)?;
        let duty = self.read_reg(addr + 1)?;

        Ok(LutEntry::from_raw(threshold, duty))
    }

    /** Write every entry of `lut`, starting at index 0, with the LUT disabled once around all
    writes. Entries past the end of `lut` are left as they are. */
    pub fn program_lut(&mut self, lut: &Lut) -> DevResult<(), T::Error> {
        self.while_lut_disabled(|emc| {
            for (index, entry) in (0u8..).zip(lut.entries()) {
                emc.write_lut_entry(index, *entry)?;
            }

            Ok(())
        })
    }

    // Measurements

    /// External diode temperature, in 0.125 C steps.
    pub fn external_temperature(&mut self) -> DevResult<Temperature, T::Error> {
        // High byte first; the device latches the low byte when the high byte is read.
        let msb = self.read_reg(EXTERNAL_TEMP_MSB)?;
        let lsb = self.read_reg(EXTERNAL_TEMP_LSB)?;
        trace!("external temp raw {:#04x} {:#04x}", msb, lsb);

        Ok(Temperature::from_registers(msb, lsb))
    }

    /// Die temperature in whole degrees C.
    pub fn internal_temperature(&mut self) -> DevResult<i8, T::Error> {
        Ok(self.read_reg(INTERNAL_TEMP)? as i8)
    }

    /// Raw tach count; `0xFFFF` when the fan is stalled or not connected.
    pub fn tach_count(&mut self) -> DevResult<u16, T::Error> {
        // Low byte first; the device latches the high byte when the low byte is read.
        let lsb = self.read_reg(TACH_LSB)?;
        let msb = self.read_reg(TACH_MSB)?;
        trace!("tach raw {:#04x} {:#04x}", msb, lsb);

        Ok(u16::from_be_bytes([msb, lsb]))
    }

    /// Fan speed, 0 if there is no tach signal.
    pub fn fan_rpm(&mut self) -> DevResult<u32, T::Error> {
        Ok(rpm_from_tach(self.tach_count()?))
    }

    /// Speed below which the fan is flagged as stalled, 0 if no limit is set.
    pub fn fan_min_rpm(&mut self) -> DevResult<u32, T::Error> {
        let msb = self.read_reg(TACH_LIMIT_MSB)?;
        let lsb = self.read_reg(TACH_LIMIT_LSB)?;

        Ok(rpm_from_tach(u16::from_be_bytes([msb, lsb])))
    }

    /// Set the stall threshold. `min_rpm` must be at least 83.
    pub fn set_fan_min_rpm(&mut self, min_rpm: u16) -> DevResult<(), T::Error> {
        let [msb, lsb] = tach_from_rpm(min_rpm)
            .ok_or(Error::MinRpmOutOfRange)?
            .to_be_bytes();

        self.write_reg(TACH_LIMIT_LSB, lsb)?;
        self.write_reg(TACH_LIMIT_MSB, msb)
    }

    /** Run `f` with the LUT disabled, then put the LUT back the way it was. The LUT is restored
    whether or not `f` succeeds; if both fail, `f`'s error is returned. */
    fn while_lut_disabled<U, F>(&mut self, f: F) -> DevResult<U, T::Error>
    where
        F: FnOnce(&mut Self) -> DevResult<U, T::Error>,
    {
        let fan: FanConfig = self.read_register()?;

        if fan.lut_disabled() {
            return f(self);
        }

        self.write_register(fan.with_lut_disabled(true))?;
        let res = f(self);
        let restored = self.set_lut_enabled(true);

        let val = res?;
        restored?;
        Ok(val)
    }

    // Assumes the LUT is already disabled.
    fn write_lut_entry(&mut self, index: u8, entry: LutEntry) -> DevResult<(), T::Error> {
        let addr = LUT_START + 2 * index;

        self.write_reg(addr, entry.threshold())?;
        self.write_reg(addr + 1, entry.raw_duty())
    }

    fn read_register<R: Register>(&mut self) -> DevResult<R, T::Error> {
        Ok(R::from_byte(self.read_reg(R::ADDR)?))
    }

    fn write_register<R: Register>(&mut self, reg: R) -> DevResult<(), T::Error> {
        self.write_reg(R::ADDR, reg.to_byte())
    }

    fn modify<R, F>(&mut self, f: F) -> DevResult<(), T::Error>
    where
        R: Register,
        F: FnOnce(&mut R),
    {
        let mut reg: R = self.read_register()?;
        f(&mut reg);
        self.write_register(reg)
    }

    // The EMC2101 does not auto-increment, so every register is its own transaction.
    fn read_reg(&mut self, reg: u8) -> DevResult<u8, T::Error> {
        let mut buf = [0u8; 1];

        self.ctx
            .write_read(self.address, &[reg], &mut buf)
            .map_err(Error::Bus)?;

        Ok(buf[0])
    }

    fn write_reg(&mut self, reg: u8, val: u8) -> DevResult<(), T::Error> {
        self.ctx.write(self.address, &[reg, val]).map_err(Error::Bus)
    }
}
