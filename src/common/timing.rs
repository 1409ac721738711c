// src/common/timing.rs

use core::time::Duration;

// Nominal protocol times in milliseconds. Tolerances are generally
// +/- 0.40 ms per the standard; implementations checking received
// timings must factor those in themselves.

// === Break / marking (Sec 7.0, 7.1) ===

/// Recorder must hold spacing at least this long for a valid break.
pub const BREAK_MS: u32 = 12;
/// Post-break marking before a sensor looks for an address (>= 8.33 ms).
pub const MARKING_MS: u32 = 9;
/// Marking time after which a break must precede the next command.
pub const MARKING_TIMEOUT_MS: u32 = 87;

// === Command / response (Sec 7.0) ===

/// Maximum time from the command's stop bit to the response start bit.
pub const RESPONSE_TIMEOUT_MS: u32 = 15;
/// Maximum marking between characters of a command or response.
pub const INTERCHAR_MAX_MS: u32 = 2;

// === Sensor wake/sleep, retries (Sec 7.0, 7.2) ===

/// Marking time after which a sensor returns to low-power standby.
pub const STANDBY_MS: u32 = 100;
/// Minimum wait before a recorder issues a retry (16.67 ms rounded up).
pub const RETRY_MIN_MS: u32 = 17;

// === Multi-line and housekeeping ===

/// Maximum gap between lines of a multi-line extended response.
pub const MULTILINE_GAP_MS: u32 = 150;
/// Idle time after an address change before the sensor is addressable
/// again (non-volatile write window).
pub const ADDRESS_CHANGE_DELAY_MS: u32 = 1000;

// === Byte timing at 1200 baud (7E1) ===
// 1 start + 7 data + 1 parity + 1 stop = 10 bits per byte.

/// Nominal duration of a single bit at 1200 baud.
pub const BIT_DURATION: Duration = Duration::from_nanos(833_333);
/// Nominal duration of a single byte (10 bits) at 1200 baud.
pub const BYTE_DURATION: Duration = Duration::from_micros(8333);

/// Worst-case time in milliseconds for `n` bytes on the wire, rounded up.
pub const fn wire_time_ms(n: usize) -> u32 {
    ((n as u32) * 8333).div_ceil(1000) + 1
}
