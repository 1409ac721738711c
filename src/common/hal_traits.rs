// src/common/hal_traits.rs

use super::frame::{FrameFormat, LineDirection};
use core::fmt::Debug;
use core::ops::{Add, Sub};
use core::time::Duration;

/// A monotonic point in time, as cheap as the host can make it.
pub trait Sdi12Instant:
    Copy + PartialOrd + Add<Duration, Output = Self> + Sub<Self, Output = Duration>
{
}

impl<T> Sdi12Instant for T where
    T: Copy + PartialOrd + Add<Duration, Output = T> + Sub<T, Output = Duration>
{
}

/// Timer/delay operations required around the 1200-baud line.
pub trait Sdi12Timer {
    type Instant: Sdi12Instant;

    /// Delay for at least the specified number of microseconds.
    fn delay_us(&mut self, us: u32);

    /// Delay for at least the specified number of milliseconds.
    fn delay_ms(&mut self, ms: u32);

    /// Current monotonic time, used for receive deadlines.
    fn now(&self) -> Self::Instant;
}

/// Non-blocking byte-level SDI-12 serial access.
///
/// This is the lowest seam the crate offers; hosts that already have a
/// timeout-capable line discipline implement the role capabilities
/// directly instead.
pub trait Sdi12Serial {
    /// Communication error type. Must implement Debug for error reporting.
    type Error: Debug;

    /// Attempts to read a single byte.
    ///
    /// Returns `Err(nb::Error::WouldBlock)` while no byte is available.
    fn read_byte(&mut self) -> nb::Result<u8, Self::Error>;

    /// Attempts to write a single byte.
    ///
    /// Returns `Err(nb::Error::WouldBlock)` while the transmitter is full.
    fn write_byte(&mut self, byte: u8) -> nb::Result<(), Self::Error>;

    /// Attempts to flush the transmitter.
    fn flush(&mut self) -> nb::Result<(), Self::Error>;

    /// Holds the line spacing for a break (>= 12 ms).
    fn send_break(&mut self) -> nb::Result<(), Self::Error>;

    /// Switches between the 7E1 command framing and 8N1 binary framing.
    fn set_config(&mut self, config: FrameFormat) -> Result<(), Self::Error>;

    /// Turns the line driver around.
    fn set_direction(&mut self, direction: LineDirection) -> Result<(), Self::Error>;
}
