//! Packed binary-coded-decimal conversion.
//!
//! Every time and alarm register of the DS3231 stores its value as two BCD
//! nibbles. The chip never presents a nibble above 9 on its own, so one showing
//! up on the bus is treated as a hardware fault and reported instead of being
//! turned into a wrong number.

/// Errors produced by the BCD codec.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BcdError {
    /// A nibble of the decoded byte is 10 or above
    InvalidDigit(u8),
    /// The value to encode does not fit the allowed range
    OutOfRange(u8),
}

/// Decodes a packed BCD byte into its integer value.
///
/// # Errors
///
/// Returns [`BcdError::InvalidDigit`] if either nibble is 10 or above.
pub fn decode(byte: u8) -> Result<u8, BcdError> {
    let tens = byte >> 4;
    let ones = byte & 0x0F;
    if tens > 9 || ones > 9 {
        return Err(BcdError::InvalidDigit(byte));
    }
    Ok(tens * 10 + ones)
}

/// Encodes a value in `0..=99` as a packed BCD byte.
///
/// # Errors
///
/// Returns [`BcdError::OutOfRange`] for values above 99. Nothing is truncated.
pub fn encode(value: u8) -> Result<u8, BcdError> {
    let (ones, tens) = digits(value, 99)?;
    Ok((tens << 4) | ones)
}

/// Splits `value` into `(ones, tens)` after checking it against `max`.
///
/// The tuple order matches the setters of the register bitfields, which take
/// the ones digit and the tens digit separately.
pub(crate) fn digits(value: u8, max: u8) -> Result<(u8, u8), BcdError> {
    if value > max {
        return Err(BcdError::OutOfRange(value));
    }
    Ok((value % 10, value / 10))
}

/// Joins a `(ones, tens)` digit pair read from a register bitfield.
pub(crate) fn join(ones: u8, tens: u8) -> Result<u8, BcdError> {
    if ones > 9 || tens > 9 {
        return Err(BcdError::InvalidDigit((tens << 4) | (ones & 0x0F)));
    }
    Ok(tens * 10 + ones)
}
