// src/common/frame.rs

/// Serial frame formats used on the SDI-12 bus.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameFormat {
    /// Standard SDI-12 format: 1200 baud, 7 data bits, even parity, 1 stop bit.
    Sdi12_7e1,
    /// Format for high-volume binary data: 1200 baud, 8 data bits, no parity, 1 stop bit.
    Binary8N1,
}

/// Drive direction of the shared data line.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LineDirection {
    Tx,
    Rx,
}
