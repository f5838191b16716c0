//! Error types for the OLED display driver.

use core::fmt;

use embedded_hal_async::i2c::ErrorKind;

/// Which construction-time parameter failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InvalidParameter {
    /// Width is zero, not a multiple of 8, or wider than the controller.
    Width,
    /// Height is zero, not a multiple of 8, or taller than the controller.
    Height,
    /// Bus frequency is outside the range accepted for the system clock.
    BusFrequency,
    /// Bus address does not fit in 7 bits.
    Address,
    /// Frame buffer storage is not exactly `width * height / 8` bytes.
    BufferLength,
}

/// Errors that can occur during OLED display operations.
///
/// Bus errors are reduced to their [`ErrorKind`] so the enum stays
/// non-generic and `Copy`, whatever I2C implementation sits underneath.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OledError {
    /// A coordinate lies outside the display.
    OutOfBounds,
    /// Dimensions, bus frequency, address or buffer length rejected at
    /// construction.
    InvalidParameters(InvalidParameter),
    /// The device lock was held when a non-blocking attempt was made.
    Busy,
    /// A command could not be placed in the pending transmission queue.
    QueueFull,
    /// The I2C transaction failed. Nothing is retried.
    Bus(ErrorKind),
}

impl From<InvalidParameter> for OledError {
    fn from(p: InvalidParameter) -> Self {
        OledError::InvalidParameters(p)
    }
}

impl fmt::Display for OledError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            OledError::OutOfBounds => write!(f, "Coordinate out of display bounds"),
            OledError::InvalidParameters(p) => write!(f, "Invalid parameter: {:?}", p),
            OledError::Busy => write!(f, "Display is busy (locked)"),
            OledError::QueueFull => write!(f, "Command queue full"),
            OledError::Bus(kind) => write!(f, "I2C error: {}", kind),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for OledError {
    fn format(&self, f: defmt::Formatter) {
        match self {
            OledError::OutOfBounds => defmt::write!(f, "Out of bounds"),
            OledError::InvalidParameters(p) => defmt::write!(f, "Invalid parameter: {}", p),
            OledError::Busy => defmt::write!(f, "Busy"),
            OledError::QueueFull => defmt::write!(f, "Command queue full"),
            OledError::Bus(kind) => {
                defmt::write!(f, "I2C error: {}", defmt::Debug2Format(kind))
            }
        }
    }
}
