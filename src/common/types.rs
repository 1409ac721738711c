// src/common/types.rs

use super::error::Sdi12Error;
use arrayvec::ArrayString;

/// A single measured value together with the number of fractional digits
/// it is reported with. Wire form: sign, up to 7 digits, optional dot;
/// at most 9 characters.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Sdi12Value {
    pub value: f32,
    pub decimals: u8,
}

impl Sdi12Value {
    /// `decimals` is clamped to the 0..=7 range the wire format allows.
    pub fn new(value: f32, decimals: u8) -> Self {
        Self { value, decimals: decimals.min(7) }
    }
}

/// The measurement families of SDI-12 v1.4. The family fixes the width
/// of the count field in the `atttn[nn[n]]` header and the per-page
/// value budget of ASCII data responses.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MeasurementKind {
    Standard,
    Concurrent,
    HighVolumeAscii,
    HighVolumeBinary,
    Verification,
    Continuous,
}

impl MeasurementKind {
    /// Digits in the value-count field of the measurement header.
    pub const fn count_digits(&self) -> usize {
        match self {
            MeasurementKind::Standard | MeasurementKind::Verification => 1,
            MeasurementKind::Concurrent | MeasurementKind::Continuous => 2,
            MeasurementKind::HighVolumeAscii | MeasurementKind::HighVolumeBinary => 3,
        }
    }

    /// Maximum value-payload bytes in one ASCII data page.
    pub const fn page_budget(&self) -> usize {
        match self {
            MeasurementKind::Standard | MeasurementKind::Verification => 35,
            _ => 75,
        }
    }

    /// Saturation limit for the reported value count.
    pub const fn count_limit(&self) -> u16 {
        match self.count_digits() {
            1 => 9,
            2 => 99,
            _ => 999,
        }
    }
}

/// Element types used in high-volume binary data packets (Table 16).
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum BinaryDataType {
    /// Empty packet or invalid `DBn` request index.
    InvalidRequest = 0,
    SignedI8 = 1,
    UnsignedU8 = 2,
    SignedI16 = 3,
    UnsignedU16 = 4,
    SignedI32 = 5,
    UnsignedU32 = 6,
    SignedI64 = 7,
    UnsignedU64 = 8,
    Float32 = 9,
    Float64 = 10,
}

impl BinaryDataType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(BinaryDataType::InvalidRequest),
            1 => Some(BinaryDataType::SignedI8),
            2 => Some(BinaryDataType::UnsignedU8),
            3 => Some(BinaryDataType::SignedI16),
            4 => Some(BinaryDataType::UnsignedU16),
            5 => Some(BinaryDataType::SignedI32),
            6 => Some(BinaryDataType::UnsignedU32),
            7 => Some(BinaryDataType::SignedI64),
            8 => Some(BinaryDataType::UnsignedU64),
            9 => Some(BinaryDataType::Float32),
            10 => Some(BinaryDataType::Float64),
            _ => None,
        }
    }

    /// Size in bytes of one element; 0 for `InvalidRequest`.
    pub fn size_in_bytes(&self) -> usize {
        match self {
            BinaryDataType::InvalidRequest => 0,
            BinaryDataType::SignedI8 | BinaryDataType::UnsignedU8 => 1,
            BinaryDataType::SignedI16 | BinaryDataType::UnsignedU16 => 2,
            BinaryDataType::SignedI32 | BinaryDataType::UnsignedU32 | BinaryDataType::Float32 => 4,
            BinaryDataType::SignedI64 | BinaryDataType::UnsignedU64 | BinaryDataType::Float64 => 8,
        }
    }
}

/// Length of the serial-number field in the identification response.
pub const SERIAL_LEN: usize = 13;

/// Width of a SHEF parameter code.
pub const SHEF_LEN: usize = 3;
/// Width of a parameter's units description.
pub const UNITS_LEN: usize = 20;

/// Fixed-width identification fields. Vendor, model and firmware are
/// space-padded to width at construction; the serial number keeps its
/// natural length (at most 13 characters on the wire).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identification {
    pub vendor: [u8; 8],
    pub model: [u8; 6],
    pub firmware: [u8; 3],
    pub serial: ArrayString<SERIAL_LEN>,
}

impl Identification {
    pub fn new(
        vendor: &str,
        model: &str,
        firmware: &str,
        serial: &str,
    ) -> Result<Self, Sdi12Error<()>> {
        Ok(Self {
            vendor: pad_field(vendor)?,
            model: pad_field(model)?,
            firmware: pad_field(firmware)?,
            serial: ArrayString::from(serial).map_err(|_| Sdi12Error::BufferOverflow {
                needed: serial.len(),
                got: SERIAL_LEN,
            })?,
        })
    }
}

fn pad_field<const N: usize>(s: &str) -> Result<[u8; N], Sdi12Error<()>> {
    if s.len() > N {
        return Err(Sdi12Error::BufferOverflow { needed: s.len(), got: N });
    }
    let mut out = [b' '; N];
    out[..s.len()].copy_from_slice(s.as_bytes());
    Ok(out)
}
