//! Periodic / on-demand refresh loop.
//!
//! [`refresh_task`] pushes the frame buffer to the panel at
//! [`RefreshConfig::refresh_frequency_hz`], and immediately whenever another
//! task signals the [`RefreshRequest`].

use embassy_futures::select::select;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Timer};
use embedded_hal_async::i2c::I2c;

use crate::config::RefreshConfig;
use crate::driver::Oled;
use crate::error::OledError;
use crate::lock::RawLock;

/// Signal asking [`refresh_task`] to refresh without waiting for the next
/// period. Signalling several times before the task wakes counts once.
pub type RefreshRequest = Signal<CriticalSectionRawMutex, ()>;

/// Refresh loop.
///
/// This is a regular `async fn`, **not** an Embassy `#[task]`. Wrap it in
/// a thin, concrete task, since Embassy tasks cannot be generic:
///
/// ```ignore
/// static REFRESH: RefreshRequest = RefreshRequest::new();
///
/// #[embassy_executor::task]
/// async fn oled_task(oled: &'static Oled<'static, MyConcreteI2cType>) {
///     refresh_task(oled, &REFRESH, RefreshConfig::default()).await;
/// }
///
/// // Elsewhere, after drawing:
/// REFRESH.signal(());
/// ```
///
/// # Control flow
///
/// 1. Wait for the period to elapse or for `request`, whichever is first.
/// 2. Refresh with [`Oled::try_refresh`]. The lock is never spun on here:
///    if a drawing task holds it (possibly across an `.await` on this same
///    executor) the cycle is skipped and retried one period later.
///
/// # Errors
///
/// Bus failures are logged and the loop continues with the next cycle.
/// The display is not re-initialised.
#[allow(clippy::needless_pass_by_value)] // config is small and consumed
pub async fn refresh_task<I2C, L, const Q: usize>(
    oled: &'static Oled<'static, I2C, L, Q>,
    request: &'static RefreshRequest,
    config: RefreshConfig,
) -> !
where
    I2C: I2c,
    L: RawLock,
{
    let period = Duration::from_millis(config.update_period_ms());

    #[cfg(feature = "defmt")]
    defmt::info!("OLED refresh task running every {} ms", config.update_period_ms());

    loop {
        select(Timer::after(period), request.wait()).await;

        match oled.try_refresh().await {
            Ok(()) => {}
            Err(OledError::Busy) => {
                #[cfg(feature = "defmt")]
                defmt::debug!("OLED busy, refresh skipped");
            }
            Err(_e) => {
                #[cfg(feature = "defmt")]
                defmt::error!("OLED refresh failed: {}", _e);
            }
        }
    }
}
