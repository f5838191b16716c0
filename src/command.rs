//! SSD1306 opcodes and the bounded queue staging bytes for the bus.

use heapless::Deque;

use crate::error::OledError;

/// I2C control bytes. Every transaction to the controller starts with one;
/// it selects how the remaining bytes of that transaction are interpreted.
pub struct Control;

impl Control {
    /// The rest of the transaction is a command stream.
    pub const COMMAND_STREAM: u8 = 0x00;
    /// The rest of the transaction is written to display RAM.
    pub const DATA_STREAM: u8 = 0x40;
}

/// Controller command opcodes.
pub struct Cmd;

impl Cmd {
    pub const SET_CONTRAST: u8 = 0x81;
    pub const CHARGE_PUMP: u8 = 0x8D;
    pub const MEMORY_MODE: u8 = 0x20;
    pub const DISPLAY_RAM: u8 = 0xA4;
    pub const DISPLAY_ALL_ON: u8 = 0xA5;
    pub const NORMAL_DISPLAY: u8 = 0xA6;
    pub const INVERT_DISPLAY: u8 = 0xA7;
    pub const MULTIPLEX_RATIO: u8 = 0xA8;
    pub const DISPLAY_OFF: u8 = 0xAE;
    pub const DISPLAY_ON: u8 = 0xAF;
    pub const PAGE_START: u8 = 0xB0;
    pub const COLUMN_LOW: u8 = 0x00;
    pub const COLUMN_HIGH: u8 = 0x10;
    pub const START_LINE: u8 = 0x40;
    pub const SEGMENT_REMAP: u8 = 0xA1;
    pub const COM_SCAN_DEC: u8 = 0xC8;
    pub const DISPLAY_OFFSET: u8 = 0xD3;
    pub const CLOCK_DIVIDE: u8 = 0xD5;
    pub const PRECHARGE: u8 = 0xD9;
    pub const COM_PINS: u8 = 0xDA;
    pub const VCOM_DESELECT: u8 = 0xDB;
}

/// Argument bytes used by the power-up sequence.
pub(crate) struct Arg;

impl Arg {
    pub const CLOCK_DEFAULT: u8 = 0x80;
    pub const CHARGE_PUMP_ON: u8 = 0x14;
    pub const PAGE_ADDRESSING: u8 = 0x02;
    pub const COM_PINS_SEQUENTIAL: u8 = 0x02;
    pub const COM_PINS_ALTERNATIVE: u8 = 0x12;
    pub const CONTRAST_DEFAULT: u8 = 0x7F;
    pub const PRECHARGE_INTERNAL: u8 = 0xF1;
    pub const VCOM_077: u8 = 0x40;
}

/// Command selecting `page` and resetting the column pointer to 0.
pub(crate) const fn page_address(page: u8) -> [u8; 3] {
    [Cmd::PAGE_START | (page & 0x07), Cmd::COLUMN_LOW, Cmd::COLUMN_HIGH]
}

/// Default capacity of the pending transmission queue, in bytes.
///
/// One control byte plus up to 29 bytes of command or display data per
/// bus transaction.
pub const COMMAND_QUEUE_LEN: usize = 30;

/// Bounded FIFO of bytes awaiting transmission.
///
/// # Overflow
///
/// [`push`](Self::push) is all-or-nothing: if the bytes do not fit in the
/// remaining space it returns [`OledError::QueueFull`] and the queue is
/// unchanged. Nothing is ever truncated or reordered.
pub struct CommandQueue<const N: usize> {
    bytes: Deque<u8, N>,
}

impl<const N: usize> CommandQueue<N> {
    /// Create an empty queue.
    pub const fn new() -> Self {
        Self {
            bytes: Deque::new(),
        }
    }

    /// Append `bytes` at the back.
    ///
    /// # Errors
    ///
    /// [`OledError::QueueFull`] if fewer than `bytes.len()` slots are free.
    pub fn push(&mut self, bytes: &[u8]) -> Result<(), OledError> {
        if bytes.len() > self.remaining() {
            return Err(OledError::QueueFull);
        }
        for &b in bytes {
            // Space checked above.
            let _ = self.bytes.push_back(b);
        }
        Ok(())
    }

    /// Move queued bytes, oldest first, into `out`. Returns how many were
    /// moved; bytes that do not fit in `out` stay queued.
    pub fn drain_into(&mut self, out: &mut [u8]) -> usize {
        let mut n = 0;
        while n < out.len() {
            match self.bytes.pop_front() {
                Some(b) => {
                    out[n] = b;
                    n += 1;
                }
                None => break,
            }
        }
        n
    }

    /// Drop everything queued.
    pub fn clear(&mut self) {
        self.bytes.clear();
    }

    /// Number of bytes queued.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// `true` if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Free slots.
    pub fn remaining(&self) -> usize {
        N - self.bytes.len()
    }

    /// Total capacity, `N`.
    pub const fn capacity(&self) -> usize {
        N
    }
}

impl<const N: usize> Default for CommandQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drains_in_fifo_order() {
        let mut q: CommandQueue<8> = CommandQueue::new();
        q.push(&[1, 2, 3]).unwrap();
        q.push(&[4]).unwrap();

        let mut out = [0u8; 8];
        assert_eq!(q.drain_into(&mut out), 4);
        assert_eq!(&out[..4], &[1, 2, 3, 4]);
        assert!(q.is_empty());
    }

    #[test]
    fn overflow_is_rejected_without_change() {
        let mut q: CommandQueue<4> = CommandQueue::new();
        q.push(&[0xAA, 0xBB, 0xCC]).unwrap();

        assert_eq!(q.push(&[1, 2]), Err(OledError::QueueFull));
        assert_eq!(q.len(), 3);
        assert_eq!(q.remaining(), 1);

        let mut out = [0u8; 4];
        assert_eq!(q.drain_into(&mut out), 3);
        assert_eq!(&out[..3], &[0xAA, 0xBB, 0xCC]);
    }

    #[test]
    fn exact_fit_is_accepted() {
        let mut q: CommandQueue<4> = CommandQueue::new();
        q.push(&[1, 2, 3, 4]).unwrap();
        assert_eq!(q.remaining(), 0);
        assert_eq!(q.push(&[]), Ok(()));
        assert_eq!(q.push(&[5]), Err(OledError::QueueFull));
    }

    #[test]
    fn partial_drain_keeps_the_rest() {
        let mut q: CommandQueue<8> = CommandQueue::new();
        q.push(&[1, 2, 3, 4, 5]).unwrap();

        let mut out = [0u8; 2];
        assert_eq!(q.drain_into(&mut out), 2);
        assert_eq!(out, [1, 2]);
        assert_eq!(q.len(), 3);

        // Wraps around the ring without reordering.
        q.push(&[6, 7, 8, 9, 10]).unwrap();
        let mut rest = [0u8; 8];
        assert_eq!(q.drain_into(&mut rest), 8);
        assert_eq!(rest, [3, 4, 5, 6, 7, 8, 9, 10]);
    }

    #[test]
    fn clear_empties_queue() {
        let mut q: CommandQueue<COMMAND_QUEUE_LEN> = CommandQueue::default();
        q.push(&page_address(3)).unwrap();
        q.clear();
        assert!(q.is_empty());
        assert_eq!(q.capacity(), COMMAND_QUEUE_LEN);
    }

    #[test]
    fn page_address_selects_page_and_column_zero() {
        assert_eq!(page_address(0), [0xB0, 0x00, 0x10]);
        assert_eq!(page_address(7), [0xB7, 0x00, 0x10]);
    }
}
