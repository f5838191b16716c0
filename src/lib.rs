//! Async driver for SSD1306-class monochrome OLEDs on a two-wire bus.
//!
//! The crate keeps a 1-bit-per-pixel frame buffer in caller-provided
//! storage, draws into it ([`FrameBuffer::put_rectangle`], or any
//! [`embedded_graphics`] primitive), and streams it to the panel page by
//! page through a bounded command queue. A single busy lock guards the
//! frame buffer and the bus, so drawing code in one context and refresh
//! code in another never see a half-drawn frame.
//!
//! # Quick Start
//!
//! ```ignore
//! use mono_oled_rs::{DrawParams, Oled, OledConfig, RefreshConfig};
//! use static_cell::StaticCell;
//!
//! static STORAGE: StaticCell<[u8; OledConfig::DEFAULT.buffer_len()]> = StaticCell::new();
//! static OLED: StaticCell<Oled<'static, MyI2cType>> = StaticCell::new();
//!
//! // In your Embassy main:
//! let storage = STORAGE.init([0; OledConfig::DEFAULT.buffer_len()]);
//! let oled = OLED.init(Oled::new(i2c, storage, OledConfig::default()).unwrap());
//! oled.init_display().await.unwrap();
//!
//! {
//!     let mut frame = oled.lock_async().await;
//!     frame.put_rectangle(0, 0, 127, 63, DrawParams::FILL | DrawParams::BLACK).unwrap();
//! } // lock released here
//!
//! oled.refresh().await.unwrap();
//! ```
//!
//! # Pixel addressing
//!
//! Pixel `(x, y)` is bit `y % 8` of byte `(y / 8) * width + x`, which is
//! the controller's page-addressing layout, so the buffer is sent without
//! conversion.
//!
//! # Crate Features
//!
//! - **`defmt`**: structured logging via [`defmt`](https://docs.rs/defmt).
//! - **`task`**: [`refresh_task`], a periodic refresh loop on
//!   `embassy-time`.

#![cfg_attr(not(test), no_std)]

pub mod command;
pub mod config;
pub mod driver;
pub mod error;
pub mod framebuffer;
pub mod geometry;
pub mod lock;
#[cfg(feature = "task")]
pub mod refresh_task;
pub mod transmit;

#[cfg(test)]
mod mock;

// ── Re-exports for convenience ───────────────────────────────────────────

pub use command::{CommandQueue, COMMAND_QUEUE_LEN};
pub use config::{OledConfig, RefreshConfig, MAX_BUS_FREQUENCY_HZ, MAX_HEIGHT, MAX_WIDTH};
pub use driver::{Oled, OledGuard};
pub use error::{InvalidParameter, OledError};
pub use framebuffer::{buffer_len, locate, FrameBuffer};
pub use geometry::{Color, DrawParams};
pub use lock::{DefaultLock, LockScope, RawLock};
#[cfg(feature = "task")]
pub use refresh_task::{refresh_task, RefreshRequest};
pub use transmit::TxState;
