// src/sensor/format.rs
//
// Response assembly for the sensor engine. Every function writes a
// complete frame into the caller's buffer and returns its length;
// nothing here touches the bus.

use crate::common::address::Sdi12Addr;
use crate::common::crc::{append_response_crc, calculate_crc16, encode_crc_binary};
use crate::common::error::Sdi12Error;
use crate::common::types::{Identification, MeasurementKind, Sdi12Value};
use crate::common::value::{format_value, write_decimal_padded, MAX_VALUE_LEN};
use crate::sensor::params::Parameter;

fn ensure_fits(needed: usize, got: usize) -> Result<(), Sdi12Error<()>> {
    if needed > got {
        Err(Sdi12Error::BufferOverflow { needed, got })
    } else {
        Ok(())
    }
}

fn terminate(out: &mut [u8], len: usize) -> Result<usize, Sdi12Error<()>> {
    ensure_fits(len + 2, out.len())?;
    out[len] = b'\r';
    out[len + 1] = b'\n';
    Ok(len + 2)
}

/// `a<CR><LF>` — acknowledge, address query reply, service request.
pub fn write_ack(out: &mut [u8], address: Sdi12Addr) -> Result<usize, Sdi12Error<()>> {
    ensure_fits(3, out.len())?;
    out[0] = address.as_byte();
    terminate(out, 1)
}

/// `atttn[nn]<CR><LF>` — measurement header. `ttt` is clamped to 999,
/// the count saturates at the kind's field width.
pub fn write_header(
    out: &mut [u8],
    address: Sdi12Addr,
    ttt: u16,
    count: u16,
    kind: MeasurementKind,
) -> Result<usize, Sdi12Error<()>> {
    let digits = kind.count_digits();
    ensure_fits(1 + 3 + digits + 2, out.len())?;
    out[0] = address.as_byte();
    write_decimal_padded(ttt.min(999) as u32, 3, &mut out[1..4]);
    write_decimal_padded(count.min(kind.count_limit()) as u32, digits, &mut out[4..4 + digits]);
    terminate(out, 4 + digits)
}

/// `a000000<CR><LF>` — the stub reply to a bare `aH!`.
pub fn write_high_volume_stub(out: &mut [u8], address: Sdi12Addr) -> Result<usize, Sdi12Error<()>> {
    ensure_fits(9, out.len())?;
    out[0] = address.as_byte();
    out[1..7].fill(b'0');
    terminate(out, 7)
}

/// `a14<vendor><model><firmware><serial><CR><LF>` — identification.
pub fn write_identification(
    out: &mut [u8],
    address: Sdi12Addr,
    ident: &Identification,
) -> Result<usize, Sdi12Error<()>> {
    let serial = ident.serial.as_bytes();
    let needed = 1 + 2 + 8 + 6 + 3 + serial.len() + 2;
    ensure_fits(needed, out.len())?;
    out[0] = address.as_byte();
    out[1..3].copy_from_slice(b"14");
    out[3..11].copy_from_slice(&ident.vendor);
    out[11..17].copy_from_slice(&ident.model);
    out[17..20].copy_from_slice(&ident.firmware);
    out[20..20 + serial.len()].copy_from_slice(serial);
    terminate(out, 20 + serial.len())
}

/// ASCII data page. Values are laid into pages front to back: a token
/// that would push the current page past `budget` value bytes starts
/// the next page. The page selected by `page` is emitted; pages past
/// the data come out empty. CRC is appended when `with_crc`.
pub fn write_data_page(
    out: &mut [u8],
    address: Sdi12Addr,
    values: &[Sdi12Value],
    page: u16,
    budget: usize,
    with_crc: bool,
) -> Result<usize, Sdi12Error<()>> {
    ensure_fits(3, out.len())?;
    out[0] = address.as_byte();
    let mut len = 1;

    let mut current_page = 0u16;
    let mut page_bytes = 0usize;
    for value in values {
        let mut token = [0u8; MAX_VALUE_LEN];
        let token_len = format_value(value, &mut token)?;
        if page_bytes + token_len > budget {
            current_page += 1;
            page_bytes = 0;
        }
        if current_page > page {
            break;
        }
        if current_page == page {
            ensure_fits(len + token_len + 2, out.len())?;
            out[len..len + token_len].copy_from_slice(&token[..token_len]);
            len += token_len;
        }
        page_bytes += token_len;
    }

    let len = terminate(out, len)?;
    if with_crc {
        append_response_crc(out, len)
    } else {
        Ok(len)
    }
}

/// Assembles the binary high-volume packet around a payload the binary
/// hook already wrote at `out[3..3 + written]` (type byte first).
/// Layout: `address | N lsb | N msb | type | payload | crc lsb | crc msb`,
/// CRC over the first `4 + N` bytes. No terminator.
pub fn write_binary_packet(
    out: &mut [u8],
    address: Sdi12Addr,
    written: usize,
) -> Result<usize, Sdi12Error<()>> {
    debug_assert!(written >= 1);
    let payload_len = written - 1;
    let needed = 4 + payload_len + 2;
    ensure_fits(needed, out.len())?;

    out[0] = address.as_byte();
    let len_bytes = (payload_len as u16).to_le_bytes();
    out[1] = len_bytes[0];
    out[2] = len_bytes[1];
    // out[3..4 + payload_len] is the hook's type byte + payload.
    let crc = calculate_crc16(&out[..4 + payload_len]);
    out[4 + payload_len..needed].copy_from_slice(&encode_crc_binary(crc));
    Ok(needed)
}

/// `a,<shef>,<units>;[crc]<CR><LF>` — parameter metadata. Without a
/// parameter (index out of range) the body is empty.
pub fn write_param_meta(
    out: &mut [u8],
    address: Sdi12Addr,
    param: Option<&Parameter>,
    with_crc: bool,
) -> Result<usize, Sdi12Error<()>> {
    ensure_fits(1, out.len())?;
    out[0] = address.as_byte();
    let mut len = 1;
    if let Some(param) = param {
        let shef = param.shef.as_bytes();
        let units = param.units.as_bytes();
        let needed = len + 1 + shef.len() + 1 + units.len() + 1 + 2;
        ensure_fits(needed, out.len())?;
        out[len] = b',';
        len += 1;
        out[len..len + shef.len()].copy_from_slice(shef);
        len += shef.len();
        out[len] = b',';
        len += 1;
        out[len..len + units.len()].copy_from_slice(units);
        len += units.len();
        out[len] = b';';
        len += 1;
    }
    let len = terminate(out, len)?;
    if with_crc {
        append_response_crc(out, len)
    } else {
        Ok(len)
    }
}
