//! Transmission engine: turns commands and frame buffer pages into I2C
//! transactions.
//!
//! Every byte leaves through the bounded [`CommandQueue`]. A flush drains
//! the queue, oldest byte first, into a single `write` on the bus, so the
//! longest transaction is `Q` bytes (one control byte and `Q - 1` bytes of
//! payload). A refresh therefore sends, per page, one page-address command
//! followed by `ceil(width / (Q - 1))` data fragments.
//!
//! The first bus error ends the operation: the queue is cleared, the state
//! drops back to [`TxState::Idle`] and the error is returned. Bytes already
//! on the wire are not rolled back and nothing is retried.

use embedded_hal_async::i2c::{Error as _, I2c};

use crate::command::{page_address, Arg, Cmd, CommandQueue, Control};
use crate::error::OledError;
use crate::framebuffer::FrameBuffer;

/// Where the transmission engine is in its current operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TxState {
    /// Nothing sent yet, or the last operation failed.
    Idle,
    /// Flushing controller commands.
    SendingCommand,
    /// Streaming one page of display data.
    SendingPage,
    /// The last operation completed.
    Done,
}

/// Bus handle plus transmission bookkeeping for one display.
pub(crate) struct Transmitter<I2C, const Q: usize> {
    i2c: I2C,
    address: u8,
    queue: CommandQueue<Q>,
    current_page: u8,
    state: TxState,
}

impl<I2C, const Q: usize> Transmitter<I2C, Q> {
    pub fn current_page(&self) -> u8 {
        self.current_page
    }

    pub fn state(&self) -> TxState {
        self.state
    }

    #[cfg(test)]
    pub fn i2c_mut(&mut self) -> &mut I2C {
        &mut self.i2c
    }
}

impl<I2C, const Q: usize> Transmitter<I2C, Q>
where
    I2C: I2c,
{
    /// Room for the control byte and the longest fixed command.
    const CAPACITY_OK: () = assert!(Q >= 4, "command queue must hold at least 4 bytes");

    pub fn new(i2c: I2C, address: u8) -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::CAPACITY_OK;
        Self {
            i2c,
            address,
            queue: CommandQueue::new(),
            current_page: 0,
            state: TxState::Idle,
        }
    }

    // ── Operations ───────────────────────────────────────────────────

    /// Send each command in order, batching as many per transaction as
    /// the queue holds.
    pub async fn send_commands(&mut self, commands: &[&[u8]]) -> Result<(), OledError> {
        self.begin();
        let result = self.command_stream(commands).await;
        self.finish(result)
    }

    /// Stream every page of `frame` to display RAM.
    ///
    /// `current_page` counts pages fully sent: after success it equals the
    /// page count, after a failure it is the page that failed.
    pub async fn send_frame(&mut self, frame: &FrameBuffer<'_>) -> Result<(), OledError> {
        self.begin();
        self.current_page = 0;
        let result = self.page_stream(frame).await;
        self.finish(result)
    }

    /// The controller power-up sequence for a `height`-row panel.
    pub async fn send_init_sequence(&mut self, height: u16) -> Result<(), OledError> {
        let multiplex = (height - 1) as u8;
        let com_pins = if height > 32 {
            Arg::COM_PINS_ALTERNATIVE
        } else {
            Arg::COM_PINS_SEQUENTIAL
        };

        self.send_commands(&[
            &[Cmd::DISPLAY_OFF],
            &[Cmd::CLOCK_DIVIDE, Arg::CLOCK_DEFAULT],
            &[Cmd::MULTIPLEX_RATIO, multiplex],
            &[Cmd::DISPLAY_OFFSET, 0x00],
            &[Cmd::START_LINE],
            &[Cmd::CHARGE_PUMP, Arg::CHARGE_PUMP_ON],
            &[Cmd::MEMORY_MODE, Arg::PAGE_ADDRESSING],
            &[Cmd::SEGMENT_REMAP],
            &[Cmd::COM_SCAN_DEC],
            &[Cmd::COM_PINS, com_pins],
            &[Cmd::SET_CONTRAST, Arg::CONTRAST_DEFAULT],
            &[Cmd::PRECHARGE, Arg::PRECHARGE_INTERNAL],
            &[Cmd::VCOM_DESELECT, Arg::VCOM_077],
            &[Cmd::DISPLAY_RAM],
            &[Cmd::NORMAL_DISPLAY],
            &[Cmd::DISPLAY_ON],
        ])
        .await
    }

    // ── Internals ────────────────────────────────────────────────────

    fn begin(&mut self) {
        // A previous operation may have been dropped mid-flight.
        self.queue.clear();
        self.state = TxState::SendingCommand;
    }

    fn finish(&mut self, result: Result<(), OledError>) -> Result<(), OledError> {
        match result {
            Ok(()) => self.state = TxState::Done,
            Err(_e) => {
                self.queue.clear();
                self.state = TxState::Idle;
                #[cfg(feature = "defmt")]
                defmt::warn!("OLED transmission aborted at page {}: {}", self.current_page, _e);
            }
        }
        result
    }

    async fn command_stream(&mut self, commands: &[&[u8]]) -> Result<(), OledError> {
        for command in commands {
            self.queue_command(command).await?;
        }
        self.flush().await
    }

    async fn page_stream(&mut self, frame: &FrameBuffer<'_>) -> Result<(), OledError> {
        for page in 0..frame.page_count() {
            self.state = TxState::SendingCommand;
            self.queue_command(&page_address(page)).await?;
            self.flush().await?;

            self.state = TxState::SendingPage;
            for fragment in frame.page(page).chunks(Q - 1) {
                self.queue.push(&[Control::DATA_STREAM])?;
                self.queue.push(fragment)?;
                self.flush().await?;
            }

            self.current_page = page + 1;
            #[cfg(feature = "defmt")]
            defmt::trace!("OLED page {} sent", page);
        }
        Ok(())
    }

    /// Queue one command behind a command-stream control byte.
    ///
    /// A full queue is flushed once and the push retried. A command that
    /// does not fit even in an empty queue is rejected.
    async fn queue_command(&mut self, command: &[u8]) -> Result<(), OledError> {
        if self.queue.is_empty() {
            self.queue.push(&[Control::COMMAND_STREAM])?;
        }
        if self.queue.push(command).is_ok() {
            return Ok(());
        }
        if self.queue.len() > 1 {
            self.flush().await?;
            self.queue.push(&[Control::COMMAND_STREAM])?;
            if self.queue.push(command).is_ok() {
                return Ok(());
            }
        }
        self.queue.clear();
        Err(OledError::QueueFull)
    }

    /// Write everything queued as one transaction.
    async fn flush(&mut self) -> Result<(), OledError> {
        let mut buf = [0u8; Q];
        let n = self.queue.drain_into(&mut buf);
        if n == 0 {
            return Ok(());
        }
        self.i2c
            .write(self.address, &buf[..n])
            .await
            .map_err(|e| OledError::Bus(e.kind()))
    }
}
