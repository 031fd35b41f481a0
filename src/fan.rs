//! Conversions between fan-facing units and raw register values.

/// Largest raw duty cycle accepted by the Fan Setting register and the LUT (6 bits).
pub const MAX_DUTY: u8 = 0x3F;

/// Tach counts are the time for one revolution; RPM is this divided by the count.
pub const FAN_RPM_NUMERATOR: u32 = 5_400_000;

/// Tach reading when the fan is stalled or no tach signal is connected.
pub(crate) const TACH_NO_SIGNAL: u16 = 0xFFFF;

/// Scale a duty cycle percentage onto `0..=MAX_DUTY`, truncating. `None` above 100%.
pub fn duty_from_percent(percent: u8) -> Option<u8> {
    if percent > 100 {
        return None;
    }

    Some((u16::from(percent) * u16::from(MAX_DUTY) / 100) as u8)
}

/// Inverse of [`duty_from_percent`], truncating. Bits above the 6-bit duty field are ignored.
pub fn percent_from_duty(raw: u8) -> u8 {
    (u16::from(raw & MAX_DUTY) * 100 / u16::from(MAX_DUTY)) as u8
}

/// RPM for a raw tach count. Both 0 and the stall value read as a stopped fan.
pub fn rpm_from_tach(count: u16) -> u32 {
    match count {
        0 | TACH_NO_SIGNAL => 0,
        c => FAN_RPM_NUMERATOR / u32::from(c),
    }
}

/** Tach count for an RPM. `None` for 0 RPM, and for speeds so slow that the count would reach
the stall value (below 83 RPM). */
pub fn tach_from_rpm(rpm: u16) -> Option<u16> {
    if rpm == 0 {
        return None;
    }

    match FAN_RPM_NUMERATOR / u32::from(rpm) {
        c if c >= u32::from(TACH_NO_SIGNAL) => None,
        c => Some(c as u16),
    }
}
