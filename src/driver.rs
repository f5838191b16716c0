//! Device handle binding a frame buffer, its lock and the bus.
//!
//! [`Oled`] is meant to be shared: place it in a `static` (e.g. with
//! `static_cell`) and hand `&'static Oled` to foreground code, tasks and
//! interrupt handlers alike. Every access to the frame buffer or the bus
//! goes through the device's single [`RawLock`], either via an
//! [`OledGuard`] or implicitly inside [`Oled::refresh`] and friends.

use core::cell::UnsafeCell;
use core::ops::{Deref, DerefMut};

use embedded_hal_async::i2c::I2c;

use crate::command::{Cmd, COMMAND_QUEUE_LEN};
use crate::config::OledConfig;
use crate::error::{InvalidParameter, OledError};
use crate::framebuffer::FrameBuffer;
use crate::lock::{DefaultLock, LockScope, RawLock};
use crate::transmit::{Transmitter, TxState};

/// Everything the lock protects.
struct Shared<'a, I2C, const Q: usize> {
    frame: FrameBuffer<'a>,
    tx: Transmitter<I2C, Q>,
}

/// Monochrome OLED on an I2C bus.
///
/// # Lifecycle
///
/// 1. [`Oled::new()`]: validates the configuration, zeroes the frame
///    buffer. No I2C traffic.
/// 2. [`Oled::init_display()`]: sends the controller power-up sequence.
/// 3. Draw through [`Oled::lock_async()`] from tasks, or
///    [`Oled::lock()`] / [`Oled::with_frame()`] from interrupt handlers.
/// 4. [`Oled::refresh()`]: transfers the frame buffer to the panel.
///
/// # Type parameters
///
/// * `I2C`: any `embedded-hal-async` I2C bus.
/// * `L`: lock backend, [`DefaultLock`] unless named.
/// * `Q`: capacity of the pending transmission queue in bytes, at least 4.
///
/// # Example
///
/// ```no_run
/// use mono_oled_rs::{DrawParams, Oled, OledConfig};
///
/// # async fn example(i2c: impl embedded_hal_async::i2c::I2c) -> Result<(), mono_oled_rs::OledError> {
/// let mut storage = [0u8; OledConfig::DEFAULT.buffer_len()];
/// let oled = Oled::new(i2c, &mut storage, OledConfig::default())?;
/// oled.init_display().await?;
///
/// oled.with_frame(|frame| frame.put_rectangle(0, 0, 127, 63, DrawParams::BLACK))?;
/// oled.refresh().await?;
/// # Ok(())
/// # }
/// ```
pub struct Oled<'a, I2C, L = DefaultLock, const Q: usize = COMMAND_QUEUE_LEN> {
    lock: L,
    config: OledConfig,
    shared: UnsafeCell<Shared<'a, I2C, Q>>,
}

// SAFETY: `shared` is only reached through a held `lock`, which admits one
// holder at a time, so moving `&Oled` between contexts never yields two
// live `&mut Shared`.
unsafe impl<I2C: Send, L: RawLock + Sync, const Q: usize> Sync for Oled<'_, I2C, L, Q> {}

impl<'a, I2C> Oled<'a, I2C>
where
    I2C: I2c,
{
    /// Construct a driver with the default lock backend and queue size.
    ///
    /// `storage` must be exactly [`OledConfig::buffer_len`] bytes and is
    /// zeroed here. No I2C traffic is generated; the bus peripheral is
    /// expected to be clocked at `config.bus_frequency_hz` already.
    ///
    /// # Errors
    ///
    /// [`OledError::InvalidParameters`] naming the first rejected field.
    pub fn new(i2c: I2C, storage: &'a mut [u8], config: OledConfig) -> Result<Self, OledError> {
        Self::new_custom(i2c, storage, config)
    }
}

impl<'a, I2C, L, const Q: usize> Oled<'a, I2C, L, Q>
where
    I2C: I2c,
    L: RawLock,
{
    /// Like [`Oled::new`], for a chosen lock backend and queue capacity.
    ///
    /// ```no_run
    /// # use mono_oled_rs::{lock::CriticalSectionLock, Oled, OledConfig};
    /// # fn example(i2c: impl embedded_hal_async::i2c::I2c, storage: &mut [u8]) {
    /// let oled = Oled::<_, CriticalSectionLock, 17>::new_custom(i2c, storage, OledConfig::default());
    /// # }
    /// ```
    ///
    /// # Errors
    ///
    /// [`OledError::InvalidParameters`] naming the first rejected field.
    pub fn new_custom(
        i2c: I2C,
        storage: &'a mut [u8],
        config: OledConfig,
    ) -> Result<Self, OledError> {
        config.validate()?;
        if storage.len() != config.buffer_len() {
            return Err(InvalidParameter::BufferLength.into());
        }
        storage.fill(0);

        #[cfg(feature = "defmt")]
        defmt::debug!(
            "OLED {}x{} at {=u8:#x}, {} Hz bus",
            config.width,
            config.height,
            config.address,
            config.bus_frequency_hz
        );

        Ok(Self {
            lock: L::INIT,
            config,
            shared: UnsafeCell::new(Shared {
                frame: FrameBuffer::new(storage, config.width, config.height),
                tx: Transmitter::new(i2c, config.address),
            }),
        })
    }
}

impl<'a, I2C, L, const Q: usize> Oled<'a, I2C, L, Q>
where
    L: RawLock,
{
    // ── Locking ──────────────────────────────────────────────────────

    /// Spin until the device lock is held and return a guard over it.
    ///
    /// The guard dereferences to the [`FrameBuffer`] and releases the lock
    /// when dropped. Calling this while the same context already holds a
    /// guard (or from a context that interrupted the holder) never returns.
    /// Neither does calling it from a task while another task on the same
    /// executor holds the lock across an `.await`; use
    /// [`lock_async`](Self::lock_async) there.
    pub fn lock(&self) -> OledGuard<'_, 'a, I2C, L, Q> {
        self.guard(LockScope::acquire(&self.lock))
    }

    /// Wait for the device lock, yielding to the executor between attempts.
    ///
    /// ```no_run
    /// # use mono_oled_rs::{DrawParams, Oled};
    /// # async fn example<I2C: embedded_hal_async::i2c::I2c>(oled: &Oled<'_, I2C>) -> Result<(), mono_oled_rs::OledError> {
    /// let mut frame = oled.lock_async().await;
    /// frame.put_rectangle(10, 47, 117, 47, DrawParams::BLACK)?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn lock_async(&self) -> OledGuard<'_, 'a, I2C, L, Q> {
        self.guard(LockScope::acquire_async(&self.lock).await)
    }

    /// Take the device lock if it is free.
    pub fn try_lock(&self) -> Option<OledGuard<'_, 'a, I2C, L, Q>> {
        LockScope::try_acquire(&self.lock).map(|scope| self.guard(scope))
    }

    fn guard<'o>(&'o self, scope: LockScope<'o, L>) -> OledGuard<'o, 'a, I2C, L, Q> {
        // SAFETY: `scope` holds `self.lock` for as long as the guard lives,
        // and the guard owns `scope`.
        let shared = unsafe { &mut *self.shared.get() };
        OledGuard {
            shared,
            _scope: scope,
        }
    }

    /// Run `f` on the frame buffer with the lock held.
    ///
    /// Spins like [`lock`](Self::lock), so it suits interrupt handlers and
    /// code on another executor than the one refreshing. Tasks sharing an
    /// executor with the refresh should draw through
    /// [`lock_async`](Self::lock_async).
    ///
    /// ```no_run
    /// # use mono_oled_rs::{DrawParams, Oled};
    /// # fn example<I2C: embedded_hal_async::i2c::I2c>(oled: &Oled<'_, I2C>) -> Result<(), mono_oled_rs::OledError> {
    /// oled.with_frame(|frame| {
    ///     frame.put_rectangle(17, 22, 30, 25, DrawParams::FILL)?;
    ///     frame.put_rectangle(22, 26, 25, 39, DrawParams::FILL)
    /// })?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn with_frame<R>(&self, f: impl FnOnce(&mut FrameBuffer<'a>) -> R) -> R {
        let mut guard = self.lock();
        f(&mut *guard)
    }

    /// Direct frame buffer access for an exclusive owner. No locking.
    pub fn frame_mut(&mut self) -> &mut FrameBuffer<'a> {
        &mut self.shared.get_mut().frame
    }

    /// The device lock itself, for hand-rolled `try_acquire` /
    /// `acquire_blocking` / `release` sequences.
    ///
    /// Holding it this way does not give access to the frame buffer; use
    /// [`lock`](Self::lock) for that. Releasing it is `unsafe`, since a
    /// release while a guard is alive would let a second guard in:
    ///
    /// ```compile_fail
    /// # use mono_oled_rs::{Oled, RawLock};
    /// # fn example<I2C: embedded_hal_async::i2c::I2c>(oled: &Oled<'_, I2C>) {
    /// let _guard = oled.lock();
    /// oled.raw_lock().release();
    /// # }
    /// ```
    pub fn raw_lock(&self) -> &L {
        &self.lock
    }

    /// The validated configuration.
    pub fn config(&self) -> &OledConfig {
        &self.config
    }

    /// 7-bit bus address of the controller.
    pub fn address(&self) -> u8 {
        self.config.address
    }
}

impl<'a, I2C, L, const Q: usize> Oled<'a, I2C, L, Q>
where
    I2C: I2c,
    L: RawLock,
{
    // ── Transmission ─────────────────────────────────────────────────

    /// Transfer the frame buffer to the display.
    ///
    /// Waits for the device lock with [`lock_async`](Self::lock_async) and
    /// holds it across the whole transfer, including every `.await`. See
    /// [`OledGuard::refresh`].
    ///
    /// # Errors
    ///
    /// [`OledError::Bus`] on the first failed transaction.
    pub async fn refresh(&self) -> Result<(), OledError> {
        self.lock_async().await.refresh().await
    }

    /// Transfer the frame buffer unless someone holds the lock.
    ///
    /// # Errors
    ///
    /// [`OledError::Busy`] if the lock is held, otherwise as
    /// [`refresh`](Self::refresh).
    pub async fn try_refresh(&self) -> Result<(), OledError> {
        let mut guard = self.try_lock().ok_or(OledError::Busy)?;
        guard.refresh().await
    }

    /// Set panel contrast, 0 (dimmest) to 255.
    ///
    /// # Errors
    ///
    /// [`OledError::Bus`] if the command is not acknowledged.
    pub async fn set_brightness(&self, level: u8) -> Result<(), OledError> {
        self.lock_async().await.set_brightness(level).await
    }

    /// Switch the panel on or put it to sleep.
    ///
    /// # Errors
    ///
    /// [`OledError::Bus`] if the command is not acknowledged.
    pub async fn set_display_on(&self, on: bool) -> Result<(), OledError> {
        self.lock_async().await.set_display_on(on).await
    }

    /// Invert how pixel bits are shown.
    ///
    /// # Errors
    ///
    /// [`OledError::Bus`] if the command is not acknowledged.
    pub async fn set_inverted(&self, inverted: bool) -> Result<(), OledError> {
        self.lock_async().await.set_inverted(inverted).await
    }

    /// Send the controller power-up sequence and switch the panel on.
    ///
    /// # Errors
    ///
    /// [`OledError::Bus`] on the first failed transaction.
    pub async fn init_display(&self) -> Result<(), OledError> {
        let result = self.lock_async().await.init_display().await;
        #[cfg(feature = "defmt")]
        if result.is_ok() {
            defmt::info!("OLED initialised");
        }
        result
    }
}

// ── Guard ────────────────────────────────────────────────────────────────

/// Exclusive access to an [`Oled`] while its lock is held.
///
/// Dereferences to the [`FrameBuffer`], and can transmit without letting
/// go of the lock, so a frame can be drawn and sent as one unit.
pub struct OledGuard<'o, 'a, I2C, L: RawLock, const Q: usize> {
    shared: &'o mut Shared<'a, I2C, Q>,
    _scope: LockScope<'o, L>,
}

impl<'a, I2C, L: RawLock, const Q: usize> OledGuard<'_, 'a, I2C, L, Q> {
    /// Pages fully sent by the current or most recent refresh.
    pub fn current_page(&self) -> u8 {
        self.shared.tx.current_page()
    }

    /// Transmission engine state.
    pub fn tx_state(&self) -> TxState {
        self.shared.tx.state()
    }
}

impl<'a, I2C, L, const Q: usize> OledGuard<'_, 'a, I2C, L, Q>
where
    I2C: I2c,
    L: RawLock,
{
    /// Transfer every page of the frame buffer, page 0 first.
    ///
    /// Each page is one page-address command followed by the page's bytes
    /// in data fragments of at most `Q - 1` bytes. On the first bus error
    /// the rest of the frame is abandoned and
    /// [`current_page`](Self::current_page) is left at the failed page.
    ///
    /// # Errors
    ///
    /// [`OledError::Bus`] with the kind reported by the bus.
    pub async fn refresh(&mut self) -> Result<(), OledError> {
        let Shared { frame, tx } = &mut *self.shared;
        tx.send_frame(frame).await
    }

    /// Set panel contrast.
    ///
    /// # Errors
    ///
    /// [`OledError::Bus`] if the command is not acknowledged.
    pub async fn set_brightness(&mut self, level: u8) -> Result<(), OledError> {
        self.shared.tx.send_commands(&[&[Cmd::SET_CONTRAST, level]]).await
    }

    /// Switch the panel on or put it to sleep. Display RAM is kept.
    ///
    /// # Errors
    ///
    /// [`OledError::Bus`] if the command is not acknowledged.
    pub async fn set_display_on(&mut self, on: bool) -> Result<(), OledError> {
        let cmd = if on { Cmd::DISPLAY_ON } else { Cmd::DISPLAY_OFF };
        self.shared.tx.send_commands(&[&[cmd]]).await
    }

    /// Invert how pixel bits are shown, without touching the frame buffer.
    ///
    /// # Errors
    ///
    /// [`OledError::Bus`] if the command is not acknowledged.
    pub async fn set_inverted(&mut self, inverted: bool) -> Result<(), OledError> {
        let cmd = if inverted {
            Cmd::INVERT_DISPLAY
        } else {
            Cmd::NORMAL_DISPLAY
        };
        self.shared.tx.send_commands(&[&[cmd]]).await
    }

    /// Send the controller power-up sequence.
    ///
    /// # Errors
    ///
    /// [`OledError::Bus`] on the first failed transaction.
    pub async fn init_display(&mut self) -> Result<(), OledError> {
        let height = self.shared.frame.height();
        self.shared.tx.send_init_sequence(height).await
    }
}

impl<'a, I2C, L: RawLock, const Q: usize> Deref for OledGuard<'_, 'a, I2C, L, Q> {
    type Target = FrameBuffer<'a>;

    fn deref(&self) -> &Self::Target {
        &self.shared.frame
    }
}

impl<'a, I2C, L: RawLock, const Q: usize> DerefMut for OledGuard<'_, 'a, I2C, L, Q> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.shared.frame
    }
}
