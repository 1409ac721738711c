// src/recorder/interface.rs

use crate::common::frame::LineDirection;
use crate::common::hal_traits::{Sdi12Serial, Sdi12Timer};
use crate::common::timing;
use core::fmt::Debug;
use core::time::Duration;

/// The I/O capability a host supplies to run a data recorder. All
/// blocking happens behind these five methods; the engine itself never
/// sleeps or polls.
pub trait RecorderInterface {
    /// Host I/O error type. Must implement Debug for error reporting.
    type Error: Debug;

    /// Transmits the bytes; returns once they are on the wire.
    fn send(&mut self, bytes: &[u8]) -> Result<(), Self::Error>;

    /// Receives into `buf`, returning as soon as at least one byte has
    /// arrived (more may follow in the same call). Returns `Ok(0)` when
    /// nothing arrived within `timeout_ms`; that is also how a host
    /// cancels a pending receive.
    fn recv(&mut self, buf: &mut [u8], timeout_ms: u32) -> Result<usize, Self::Error>;

    /// Turns the line driver around.
    fn set_direction(&mut self, direction: LineDirection) -> Result<(), Self::Error>;

    /// Holds the line spacing for a break (>= 12 ms).
    fn send_break(&mut self) -> Result<(), Self::Error>;

    /// Idles for at least `ms` milliseconds.
    fn delay_ms(&mut self, ms: u32);
}

/// Adapter implementing [`RecorderInterface`] over non-blocking
/// byte-level serial access plus a timer. This is the bridge for hosts
/// whose UART only offers an `nb`-style API.
#[derive(Debug)]
pub struct SerialLink<S, T> {
    serial: S,
    timer: T,
}

impl<S, T> SerialLink<S, T>
where
    S: Sdi12Serial,
    T: Sdi12Timer,
{
    pub fn new(serial: S, timer: T) -> Self {
        Self { serial, timer }
    }

    pub fn release(self) -> (S, T) {
        (self.serial, self.timer)
    }

    /// Polls a non-blocking operation until it completes or `timeout`
    /// elapses. `Ok(None)` is the timeout case.
    fn poll_until<F, R>(&mut self, timeout: Duration, mut f: F) -> Result<Option<R>, S::Error>
    where
        F: FnMut(&mut S) -> nb::Result<R, S::Error>,
    {
        let deadline = self.timer.now() + timeout;
        loop {
            match f(&mut self.serial) {
                Ok(result) => return Ok(Some(result)),
                Err(nb::Error::WouldBlock) => {
                    if self.timer.now() >= deadline {
                        return Ok(None);
                    }
                    self.timer.delay_us(100);
                }
                Err(nb::Error::Other(e)) => return Err(e),
            }
        }
    }
}

impl<S, T> RecorderInterface for SerialLink<S, T>
where
    S: Sdi12Serial,
    T: Sdi12Timer,
{
    type Error = S::Error;

    fn send(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
        // Budget: the frame's own wire time plus slack.
        let budget =
            Duration::from_millis(timing::wire_time_ms(bytes.len()) as u64) + Duration::from_millis(20);
        for byte in bytes {
            self.poll_until(budget, |serial| serial.write_byte(*byte))?;
        }
        self.poll_until(Duration::from_millis(20), |serial| serial.flush())?;
        Ok(())
    }

    fn recv(&mut self, buf: &mut [u8], timeout_ms: u32) -> Result<usize, Self::Error> {
        let mut got = 0;
        // First byte gets the caller's budget; once the line is live,
        // anything slower than a byte period plus the allowed
        // inter-character gap means the burst is over.
        let first = Duration::from_millis(timeout_ms as u64);
        let idle = timing::BYTE_DURATION
            + Duration::from_millis(timing::INTERCHAR_MAX_MS as u64)
            + Duration::from_millis(2);
        while got < buf.len() {
            let budget = if got == 0 { first } else { idle };
            match self.poll_until(budget, |serial| serial.read_byte())? {
                Some(byte) => {
                    buf[got] = byte;
                    got += 1;
                }
                None => break,
            }
        }
        Ok(got)
    }

    fn set_direction(&mut self, direction: LineDirection) -> Result<(), Self::Error> {
        self.serial.set_direction(direction)
    }

    fn send_break(&mut self) -> Result<(), Self::Error> {
        let budget =
            Duration::from_millis(timing::BREAK_MS as u64) + Duration::from_millis(5);
        self.poll_until(budget, |serial| serial.send_break())?;
        Ok(())
    }

    fn delay_ms(&mut self, ms: u32) {
        self.timer.delay_ms(ms);
    }
}
