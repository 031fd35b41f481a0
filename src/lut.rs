use core::convert::TryFrom;

use crate::fan::{duty_from_percent, percent_from_duty};

/// Number of entries in the temperature to fan speed look-up table.
pub const LUT_ENTRIES: usize = 8;
/// Highest temperature threshold a LUT entry accepts (7 bits).
pub const MAX_LUT_TEMP: u8 = 0x7F;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum LutError {
    ThresholdOutOfRange,
    DutyOutOfRange,
    TooManyEntries,
    ThresholdsNotIncreasing,
}

/// One LUT row: above `threshold` C the fan is driven at `duty`.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct LutEntry {
    threshold: u8,
    duty: u8,
}

impl LutEntry {
    pub(crate) fn from_raw(threshold: u8, duty: u8) -> Self {
        LutEntry { threshold, duty }
    }

    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    /// Duty cycle as written to the device, `0..=MAX_DUTY`.
    pub fn raw_duty(&self) -> u8 {
        self.duty
    }

    pub fn duty_percent(&self) -> u8 {
        percent_from_duty(self.duty)
    }
}

/// Build an entry from `(threshold C, duty %)`.
impl TryFrom<(u8, u8)> for LutEntry {
    type Error = LutError;

    fn try_from(val: (u8, u8)) -> Result<Self, Self::Error> {
        if val.0 > MAX_LUT_TEMP {
            return Err(LutError::ThresholdOutOfRange);
        }

        match duty_from_percent(val.1) {
            Some(duty) => Ok(LutEntry { threshold: val.0, duty }),
            None => Err(LutError::DutyOutOfRange),
        }
    }
}

/** A complete look-up table: at most [`LUT_ENTRIES`] entries with strictly increasing
thresholds, written starting at index 0. */
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Lut {
    entries: [LutEntry; LUT_ENTRIES],
    len: usize,
}

impl Lut {
    pub fn entries(&self) -> &[LutEntry] {
        &self.entries[..self.len]
    }
}

impl TryFrom<&[(u8, u8)]> for Lut {
    type Error = LutError;

    fn try_from(val: &[(u8, u8)]) -> Result<Self, Self::Error> {
        if val.len() > LUT_ENTRIES {
            return Err(LutError::TooManyEntries);
        }

        let mut entries = [LutEntry::from_raw(0, 0); LUT_ENTRIES];

        for (i, pair) in val.iter().enumerate() {
            let entry = LutEntry::try_from(*pair)?;

            if i > 0 && entries[i - 1].threshold >= entry.threshold {
                return Err(LutError::ThresholdsNotIncreasing);
            }

            entries[i] = entry;
        }

        Ok(Lut { entries, len: val.len() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fan::MAX_DUTY;

    #[test]
    fn test_entry_range() {
        assert_eq!(LutEntry::try_from((128, 0)), Err(LutError::ThresholdOutOfRange));
        assert_eq!(LutEntry::try_from((20, 101)), Err(LutError::DutyOutOfRange));

        let entry = LutEntry::try_from((127, 100)).unwrap();
        assert_eq!(entry.threshold(), 127);
        assert_eq!(entry.raw_duty(), MAX_DUTY);
        assert_eq!(entry.duty_percent(), 100);
    }

    #[test]
    fn test_table_order() {
        let ok: &[(u8, u8)] = &[(20, 10), (30, 25), (40, 50)];
        let lut = Lut::try_from(ok).unwrap();
        assert_eq!(lut.entries().len(), 3);
        assert_eq!(lut.entries()[1], LutEntry::from_raw(30, 15));

        let backwards: &[(u8, u8)] = &[(30, 25), (20, 10)];
        assert_eq!(Lut::try_from(backwards), Err(LutError::ThresholdsNotIncreasing));

        let repeated: &[(u8, u8)] = &[(30, 25), (30, 50)];
        assert_eq!(Lut::try_from(repeated), Err(LutError::ThresholdsNotIncreasing));
    }

    #[test]
    fn test_table_size() {
        let empty: &[(u8, u8)] = &[];
        assert!(Lut::try_from(empty).unwrap().entries().is_empty());

        let nine: [(u8, u8); 9] = [(0, 0); 9];
        assert_eq!(Lut::try_from(&nine[..]), Err(LutError::TooManyEntries));
    }
}
