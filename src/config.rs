//! Device and refresh-task configuration.
//!
//! [`OledConfig::validate`] is a `const fn`, so a configuration known at
//! build time can be rejected by the compiler instead of at start-up:
//!
//! ```
//! use mono_oled_rs::OledConfig;
//!
//! const CONFIG: OledConfig = OledConfig {
//!     height: 32,
//!     ..OledConfig::DEFAULT
//! };
//! const _: () = assert!(CONFIG.validate().is_ok());
//! ```

use crate::error::InvalidParameter;
use crate::framebuffer::{buffer_len, PAGE_HEIGHT};

/// Widest panel the controller's column address can reach.
pub const MAX_WIDTH: u16 = 128;

/// Tallest panel the controller's page address can reach.
pub const MAX_HEIGHT: u16 = 64;

/// I2C Fast-mode Plus, the fastest mode SSD1306 modules are driven at.
pub const MAX_BUS_FREQUENCY_HZ: u32 = 1_000_000;

/// Geometry and bus parameters for one display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OledConfig {
    /// Width in pixels. Multiple of 8, at most [`MAX_WIDTH`]. Default: 128.
    pub width: u16,
    /// Height in pixels. Multiple of 8, at most [`MAX_HEIGHT`]. Default: 64.
    pub height: u16,
    /// I2C clock the bus peripheral was configured with. Default: 400 kHz.
    pub bus_frequency_hz: u32,
    /// Core clock feeding the I2C peripheral. Default: 150 MHz (RP2350).
    pub system_clock_hz: u32,
    /// 7-bit I2C address. Default: `0x3C`.
    pub address: u8,
}

impl OledConfig {
    /// 128×64 panel at `0x3C`, 400 kHz bus on a 150 MHz core.
    pub const DEFAULT: Self = Self {
        width: 128,
        height: 64,
        bus_frequency_hz: 400_000,
        system_clock_hz: 150_000_000,
        address: 0x3C,
    };

    /// Lowest bus frequency (exclusive) accepted for this system clock.
    ///
    /// The window is that of a TWI-style bit-rate generator, where
    /// `scl = clk / (16 + 2 * divider * prescaler)` with an 8-bit divider
    /// and a prescaler of at most 64: `clk / (16 + 2 * 255 * 64)` is the
    /// slowest clock it can produce. Peripherals with a different divider
    /// (the RP2350's, say) enforce their own limits when the HAL builds
    /// the bus; here the window only rejects values that cannot be meant.
    pub const fn min_bus_frequency_hz(&self) -> u32 {
        self.system_clock_hz / 32_656 + 1
    }

    /// Highest bus frequency (inclusive) accepted for this system clock:
    /// `clk / 16` (divider 0), capped at [`MAX_BUS_FREQUENCY_HZ`].
    pub const fn max_bus_frequency_hz(&self) -> u32 {
        let divided = self.system_clock_hz / 16;
        if divided < MAX_BUS_FREQUENCY_HZ {
            divided
        } else {
            MAX_BUS_FREQUENCY_HZ
        }
    }

    /// Check every field.
    ///
    /// # Errors
    ///
    /// The first [`InvalidParameter`] found, checked in field order.
    pub const fn validate(&self) -> Result<(), InvalidParameter> {
        if self.width == 0 || self.width % PAGE_HEIGHT != 0 || self.width > MAX_WIDTH {
            return Err(InvalidParameter::Width);
        }
        if self.height == 0 || self.height % PAGE_HEIGHT != 0 || self.height > MAX_HEIGHT {
            return Err(InvalidParameter::Height);
        }
        if self.bus_frequency_hz <= self.min_bus_frequency_hz()
            || self.bus_frequency_hz > self.max_bus_frequency_hz()
        {
            return Err(InvalidParameter::BusFrequency);
        }
        if self.address & 0x80 != 0 {
            return Err(InvalidParameter::Address);
        }
        Ok(())
    }

    /// Bytes of frame buffer storage this configuration needs.
    pub const fn buffer_len(&self) -> usize {
        buffer_len(self.width, self.height)
    }

    /// Number of 8-row pages.
    pub const fn page_count(&self) -> u8 {
        (self.height / PAGE_HEIGHT) as u8
    }
}

impl Default for OledConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

// ── RefreshConfig ────────────────────────────────────────────────────────

/// Configuration for the periodic refresh task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RefreshConfig {
    /// Refresh rate in Hz. Default: 30. A full 128×64 frame takes roughly
    /// 25 ms at 400 kHz, so rates above ~40 Hz saturate the bus.
    pub refresh_frequency_hz: u32,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            refresh_frequency_hz: 30,
        }
    }
}

impl RefreshConfig {
    /// Convert the configured frequency to a timer period in milliseconds.
    ///
    /// Formula: `1000 / refresh_frequency_hz`. A frequency of 0 is treated
    /// as 1 Hz.
    pub fn update_period_ms(&self) -> u64 {
        1000 / self.refresh_frequency_hz.max(1) as u64
    }
}
