//! Recording I2C bus for host tests.

use embassy_futures::yield_now;
use embedded_hal_async::i2c::{ErrorKind, ErrorType, I2c, Operation, SevenBitAddress};

/// Records every write transaction; optionally fails one of them.
pub(crate) struct MockI2c {
    writes: Vec<(u8, Vec<u8>)>,
    attempts: usize,
    fail_at: Option<(usize, ErrorKind)>,
    yields: bool,
}

impl MockI2c {
    pub fn new() -> Self {
        Self {
            writes: Vec::new(),
            attempts: 0,
            fail_at: None,
            yields: false,
        }
    }

    /// Yield to the executor once per transaction, as a DMA or
    /// interrupt-driven bus does while the transfer is in flight.
    pub fn yielding() -> Self {
        Self {
            yields: true,
            ..Self::new()
        }
    }

    /// Fail the transaction with zero-based index `attempt`.
    pub fn failing_at(attempt: usize, kind: ErrorKind) -> Self {
        Self {
            fail_at: Some((attempt, kind)),
            ..Self::new()
        }
    }

    /// `(address, bytes)` of every successful transaction, in order.
    pub fn writes(&self) -> &[(u8, Vec<u8>)] {
        &self.writes
    }

    /// Transactions attempted, including the failed one.
    pub fn attempts(&self) -> usize {
        self.attempts
    }
}

impl ErrorType for MockI2c {
    type Error = ErrorKind;
}

impl I2c<SevenBitAddress> for MockI2c {
    async fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        if self.yields {
            yield_now().await;
        }

        let attempt = self.attempts;
        self.attempts += 1;

        if let Some((index, kind)) = self.fail_at {
            if index == attempt {
                return Err(kind);
            }
        }

        let mut bytes = Vec::new();
        for op in operations.iter() {
            if let Operation::Write(data) = op {
                bytes.extend_from_slice(data);
            }
        }
        self.writes.push((address, bytes));
        Ok(())
    }
}
