// src/recorder/response.rs
//
// Typed views of sensor responses, parsed from lines that have already
// been received, CRC-checked where applicable, and stripped of
// <CR><LF>.

use crate::common::address::Sdi12Addr;
use crate::common::error::Sdi12Error;
use crate::common::types::{
    BinaryDataType, Identification, MeasurementKind, Sdi12Value, SERIAL_LEN, SHEF_LEN, UNITS_LEN,
};
use arrayvec::ArrayString;
use core::str;
use heapless::Vec;

/// Upper bound on values in one ASCII data response.
pub const MAX_DATA_VALUES: usize = 99;

/// Parsed `atttn[nn[n]]` measurement header.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MeasResponse {
    pub address: Sdi12Addr,
    /// Seconds until the data is ready (0..=999).
    pub ttt_seconds: u16,
    /// Number of values the sensor will return.
    pub count: u16,
}

/// Parsed identification response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentResponse {
    pub address: Sdi12Addr,
    /// Protocol version tag, e.g. `b"14"`.
    pub version: [u8; 2],
    pub ident: Identification,
}

/// Parsed ASCII data response.
#[derive(Debug, Clone, PartialEq)]
pub struct DataResponse {
    pub address: Sdi12Addr,
    pub values: Vec<Sdi12Value, MAX_DATA_VALUES>,
    /// True when the frame carried a CRC and it checked out.
    pub crc_valid: bool,
}

/// Parsed `a,shef,units;` parameter metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamMetaResponse {
    pub address: Sdi12Addr,
    pub shef: ArrayString<SHEF_LEN>,
    pub units: ArrayString<UNITS_LEN>,
}

/// A validated high-volume binary packet; `payload` borrows the
/// recorder's receive buffer.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BinaryPacket<'a> {
    pub address: Sdi12Addr,
    pub data_type: BinaryDataType,
    pub payload: &'a [u8],
    /// Always true on return; the engine rejects mismatches.
    pub crc_valid: bool,
}

fn parse_address(line: &[u8]) -> Result<Sdi12Addr, Sdi12Error<()>> {
    let first = *line.first().ok_or(Sdi12Error::ParseFailed)?;
    Sdi12Addr::new_sensor(first as char)
}

fn parse_digits(digits: &[u8]) -> Result<u16, Sdi12Error<()>> {
    if digits.is_empty() || !digits.iter().all(|b| b.is_ascii_digit()) {
        return Err(Sdi12Error::ParseFailed);
    }
    let text = str::from_utf8(digits).map_err(|_| Sdi12Error::ParseFailed)?;
    text.parse::<u16>().map_err(|_| Sdi12Error::ParseFailed)
}

/// Parses a measurement header. `ttt` is always 3 digits; the count
/// field width follows the measurement kind (1, 2 or 3 digits).
pub fn parse_measurement_header(
    line: &[u8],
    kind: MeasurementKind,
) -> Result<MeasResponse, Sdi12Error<()>> {
    let expected = 1 + 3 + kind.count_digits();
    if line.len() != expected {
        return Err(Sdi12Error::ParseFailed);
    }
    let address = parse_address(line)?;
    let ttt_seconds = parse_digits(&line[1..4])?;
    let count = parse_digits(&line[4..])?;
    Ok(MeasResponse { address, ttt_seconds, count })
}

/// Parses an identification line: address, 2-char version tag, then the
/// fixed 8 + 6 + 3 fields and an optional serial of up to 13 bytes.
pub fn parse_identification(line: &[u8]) -> Result<IdentResponse, Sdi12Error<()>> {
    const FIXED: usize = 2 + 8 + 6 + 3;
    if line.len() < 1 + FIXED {
        return Err(Sdi12Error::ParseFailed);
    }
    let address = parse_address(line)?;
    let body = &line[1..];

    let mut version = [0u8; 2];
    version.copy_from_slice(&body[..2]);

    let text = |range: core::ops::Range<usize>| -> Result<&str, Sdi12Error<()>> {
        str::from_utf8(&body[range]).map_err(|_| Sdi12Error::ParseFailed)
    };
    let vendor = text(2..10)?;
    let model = text(10..16)?;
    let firmware = text(16..19)?;
    let serial_end = body.len().min(FIXED + SERIAL_LEN);
    let serial = text(FIXED..serial_end)?;

    let ident = Identification::new(vendor, model, firmware, serial)
        .map_err(|_| Sdi12Error::ParseFailed)?;
    Ok(IdentResponse { address, version, ident })
}

/// Parses `a,shef,units;` with strict separator positions. The fields
/// are copied up to their declared widths.
pub fn parse_param_meta(line: &[u8]) -> Result<ParamMetaResponse, Sdi12Error<()>> {
    let address = parse_address(line)?;
    let body = line.get(1..).ok_or(Sdi12Error::ParseFailed)?;
    if body.first() != Some(&b',') || body.last() != Some(&b';') {
        return Err(Sdi12Error::ParseFailed);
    }
    let fields = &body[1..body.len() - 1];
    let comma = fields
        .iter()
        .position(|&b| b == b',')
        .ok_or(Sdi12Error::ParseFailed)?;
    let shef_raw = str::from_utf8(&fields[..comma]).map_err(|_| Sdi12Error::ParseFailed)?;
    let units_raw = str::from_utf8(&fields[comma + 1..]).map_err(|_| Sdi12Error::ParseFailed)?;

    let mut shef = ArrayString::new();
    let _ = shef.try_push_str(&shef_raw[..shef_raw.len().min(SHEF_LEN)]);
    let mut units = ArrayString::new();
    let _ = units.try_push_str(&units_raw[..units_raw.len().min(UNITS_LEN)]);

    Ok(ParamMetaResponse { address, shef, units })
}
