use core::fmt;

use fixed::types::I8F8;
use fixed_macro::fixed;

/* Invariant: the low 5 fractional bits are always clear, so every value is an exact multiple
of 0.125 C, matching the 11-bit external diode reading. */

/// A temperature read from the external diode, in degrees Celsius.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Default, Clone, Copy)]
pub struct Temperature(pub(crate) I8F8);

impl Temperature {
    /// Size of one LSB of the external temperature reading.
    pub const RESOLUTION: I8F8 = fixed!(0.125: I8F8);

    /** Combine the External Temperature high and low bytes. The high byte is whole degrees
    (two's complement), bits 7:5 of the low byte are eighths of a degree. */
    pub(crate) fn from_registers(msb: u8, lsb: u8) -> Self {
        Temperature(I8F8::from_bits(i16::from_be_bytes([msb, lsb]) & !0x1F))
    }

    pub fn celsius(self) -> f32 {
        self.0.to_num()
    }
}

impl From<Temperature> for I8F8 {
    fn from(temp: Temperature) -> Self {
        temp.0
    }
}

impl From<Temperature> for f32 {
    fn from(temp: Temperature) -> Self {
        temp.celsius()
    }
}

impl fmt::Display for Temperature {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whole_degrees() {
        let temp = Temperature::from_registers(0x32, 0x00);

        assert_eq!(I8F8::from(temp), fixed!(50: I8F8));
        assert_eq!(temp.celsius(), 50.0);
    }

    #[test]
    fn test_fraction() {
        let temp = Temperature::from_registers(0x19, 0b1010_0000);

        assert_eq!(I8F8::from(temp), fixed!(25.625: I8F8));
    }

    #[test]
    fn test_reserved_bits_ignored() {
        assert_eq!(
            Temperature::from_registers(0x19, 0b0011_1111),
            Temperature::from_registers(0x19, 0b0010_0000)
        );
    }

    #[test]
    fn test_negative() {
        // -0.125 C is all ones in the 11 significant bits.
        assert_eq!(
            I8F8::from(Temperature::from_registers(0xFF, 0xE0)),
            -Temperature::RESOLUTION
        );
        assert_eq!(Temperature::from_registers(0xE7, 0x00).celsius(), -25.0);
    }
}
