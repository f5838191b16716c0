//! Test pattern example
//!
//! Standalone hardware check for [`Oled`]: draws a framed border and the
//! words "TEST OK" out of filled rectangles, then blinks a 1 px line under
//! them forever. The line is redrawn under the device lock while
//! [`refresh_task`] pushes frames in the background, so a torn frame would
//! show as a partially drawn line.
//!
//! # Wiring
//!
//! | Signal    | Pico 2 Pin | Notes           |
//! |-----------|------------|-----------------|
//! | I2C0 SDA  | GP20       |                 |
//! | I2C0 SCL  | GP21       |                 |
//! | OLED VCC  | 3V3        |                 |
//! | OLED GND  | GND        |                 |

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp as hal;
use embassy_rp::bind_interrupts;
use embassy_rp::block::ImageDef;
use embassy_rp::i2c::{self, I2c};
use embassy_rp::peripherals::I2C0;
use embassy_time::{Duration, Timer};
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use mono_oled_rs::{
    refresh_task, DrawParams, FrameBuffer, Oled, OledConfig, OledError, RefreshConfig,
    RefreshRequest,
};

/// Tell the Boot ROM about our application.
#[link_section = ".start_block"]
#[used]
pub static IMAGE_DEF: ImageDef = hal::block::ImageDef::secure_exe();

// Wire the I2C0 interrupt to Embassy's handler.
bind_interrupts!(struct Irqs {
    I2C0_IRQ => i2c::InterruptHandler<I2C0>;
});

// ---------------------------------------------------------------------------
// Static storage
// ---------------------------------------------------------------------------

const CONFIG: OledConfig = OledConfig {
    bus_frequency_hz: 200_000,
    ..OledConfig::DEFAULT
};
const _: () = assert!(CONFIG.validate().is_ok());

type OledI2c = I2c<'static, I2C0, i2c::Async>;

static FRAME: StaticCell<[u8; CONFIG.buffer_len()]> = StaticCell::new();
static OLED: StaticCell<Oled<'static, OledI2c>> = StaticCell::new();
static REFRESH: RefreshRequest = RefreshRequest::new();

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

/// Thin wrapper that monomorphises the generic `refresh_task` so it can be
/// spawned as a concrete Embassy task.
#[embassy_executor::task]
async fn oled_task(oled: &'static Oled<'static, OledI2c>) {
    refresh_task(oled, &REFRESH, RefreshConfig::default()).await;
}

// ---------------------------------------------------------------------------
// Drawing
// ---------------------------------------------------------------------------

/// `(x_from, y_from, x_to, y_to, params)`
type Rect = (u16, u16, u16, u16, DrawParams);

const FILL_WHITE: DrawParams = DrawParams::FILL;
const FILL_BLACK: DrawParams =
    DrawParams::from_bits(DrawParams::FILL.bits() | DrawParams::BLACK.bits());

/// Three nested borders.
const FRAME_RECTS: [Rect; 3] = [
    (0, 0, 127, 63, FILL_WHITE),
    (2, 2, 125, 61, FILL_BLACK),
    (4, 4, 123, 57, DrawParams::WHITE),
];

/// "TEST OK", some corners deliberately given in reverse order.
const TEXT_RECTS: [Rect; 19] = [
    // T
    (17, 22, 30, 25, FILL_WHITE),
    (22, 26, 25, 39, FILL_WHITE),
    // E
    (34, 22, 45, 39, FILL_WHITE),
    (38, 26, 45, 28, FILL_BLACK),
    (42, 29, 45, 32, FILL_BLACK),
    (38, 33, 45, 35, FILL_BLACK),
    // S
    (48, 22, 59, 39, FILL_WHITE),
    (52, 26, 59, 28, FILL_BLACK),
    (48, 33, 55, 35, FILL_BLACK),
    // T
    (62, 22, 75, 25, FILL_WHITE),
    (67, 25, 70, 39, FILL_WHITE),
    // O
    (86, 22, 96, 39, FILL_WHITE),
    (89, 25, 93, 36, FILL_BLACK),
    // K
    (99, 22, 102, 39, FILL_WHITE),
    (105, 31, 100, 28, FILL_WHITE),
    (109, 32, 106, 39, FILL_WHITE),
    (104, 30, 107, 33, FILL_WHITE),
    (107, 29, 104, 26, FILL_WHITE),
    (109, 27, 106, 22, FILL_WHITE),
];

fn draw_all(frame: &mut FrameBuffer<'_>, rects: &[Rect]) -> Result<(), OledError> {
    for &(x0, y0, x1, y1, params) in rects {
        frame.put_rectangle(x0, y0, x1, y1, params)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let p = embassy_rp::init(Default::default());
    info!("Test pattern example starting");

    // --- I2C bus (GP20 = SDA, GP21 = SCL), clocked as CONFIG says ---
    let mut i2c_config = i2c::Config::default();
    i2c_config.frequency = CONFIG.bus_frequency_hz;
    let i2c = I2c::new_async(
        p.I2C0,
        p.PIN_21, // SCL
        p.PIN_20, // SDA
        Irqs,
        i2c_config,
    );

    let storage = FRAME.init([0; CONFIG.buffer_len()]);
    let oled: &'static Oled<'static, OledI2c> =
        OLED.init(unwrap!(Oled::new(i2c, storage, CONFIG)));

    unwrap!(oled.init_display().await);

    // Draw the static part and send it as one unit.
    {
        let mut frame = oled.lock_async().await;
        unwrap!(draw_all(&mut frame, &FRAME_RECTS));
        unwrap!(draw_all(&mut frame, &TEXT_RECTS));
        unwrap!(frame.refresh().await);
    }

    unwrap!(spawner.spawn(oled_task(oled)));

    let mut params = DrawParams::BLACK;
    loop {
        // Horizontal line of 1 px width. `lock_async` yields while the
        // refresh task holds the lock across its I2C transfers.
        {
            let mut frame = oled.lock_async().await;
            unwrap!(frame.put_rectangle(10, 47, 117, 47, params));
        }
        REFRESH.signal(());

        params = if params.color().bit() {
            DrawParams::WHITE
        } else {
            DrawParams::BLACK
        };
        Timer::after(Duration::from_millis(500)).await;
    }
}
