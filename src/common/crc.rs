// src/common/crc.rs

use super::error::Sdi12Error;
use crc::{Algorithm, Crc};

/// CRC algorithm used on the SDI-12 bus (CRC-16/ARC).
/// Polynomial: 0x8005 (normal form of the reflected 0xA001)
/// Initial value: 0x0000, input/output reflected, no final XOR.
/// Check value: 0xBB3D for "123456789".
pub const SDI12_CRC: Algorithm<u16> = Algorithm {
    poly: 0x8005,
    init: 0x0000,
    refin: true,
    refout: true,
    xorout: 0x0000,
    check: 0xBB3D,
    width: 16,
    residue: 0x0000,
};

const CRC_COMPUTER: Crc<u16> = Crc::<u16>::new(&SDI12_CRC);

/// Calculates the SDI-12 CRC-16 over `data`, starting at the address
/// byte and ending before the CRC itself (or the trailing `<CR><LF>`).
#[inline]
pub fn calculate_crc16(data: &[u8]) -> u16 {
    CRC_COMPUTER.checksum(data)
}

/// Encodes a 16-bit CRC into three printable ASCII characters: each
/// 6-bit group OR'd with 0x40, so every output byte is in `0x40..=0x7F`.
pub fn encode_crc_ascii(crc_value: u16) -> [u8; 3] {
    [
        0x40 | ((crc_value >> 12) & 0x3F) as u8,
        0x40 | ((crc_value >> 6) & 0x3F) as u8,
        0x40 | (crc_value & 0x3F) as u8,
    ]
}

/// Decodes three ASCII-encoded CRC characters back into a 16-bit value.
///
/// # Panics
///
/// Panics if `crc_chars` is not exactly 3 bytes long.
pub fn decode_crc_ascii(crc_chars: &[u8]) -> u16 {
    assert_eq!(crc_chars.len(), 3, "ASCII CRC must be 3 bytes long");
    (u16::from(crc_chars[0] & 0x3F) << 12)
        | (u16::from(crc_chars[1] & 0x3F) << 6)
        | u16::from(crc_chars[2] & 0x3F)
}

/// Appends the 3-character ASCII CRC and `<CR><LF>` to a response held
/// in `buf`.
///
/// The first `len` bytes of `buf` are the response data, optionally
/// already terminated with `<CR><LF>` (the terminator is stripped before
/// the CRC is computed, then re-appended after it). Takes the length
/// explicitly so binary payloads containing zero bytes stay intact.
///
/// Returns the new total length, or `BufferOverflow` if the result would
/// not fit.
pub fn append_response_crc(buf: &mut [u8], len: usize) -> Result<usize, Sdi12Error<()>> {
    let data_len = if len >= 2 && buf[len - 2] == b'\r' && buf[len - 1] == b'\n' {
        len - 2
    } else {
        len
    };

    let needed = data_len + 3 + 2;
    if needed > buf.len() {
        return Err(Sdi12Error::BufferOverflow { needed, got: buf.len() });
    }

    let crc = calculate_crc16(&buf[..data_len]);
    buf[data_len..data_len + 3].copy_from_slice(&encode_crc_ascii(crc));
    buf[data_len + 3] = b'\r';
    buf[data_len + 4] = b'\n';
    Ok(needed)
}

/// Verifies the ASCII CRC of a complete response frame ending in
/// `<CR><LF>`. The 3 bytes before the terminator must match the CRC of
/// everything preceding them (address included). Frames shorter than 6
/// bytes cannot carry a CRC.
pub fn verify_response_crc(frame: &[u8]) -> Result<(), Sdi12Error<()>> {
    if frame.len() < 6 || frame[frame.len() - 2..] != [b'\r', b'\n'] {
        return Err(Sdi12Error::ParseFailed);
    }
    verify_response_crc_ascii(&frame[..frame.len() - 2])
}

/// Verifies a response that ends with the 3 CRC bytes (no `<CR><LF>`).
pub fn verify_response_crc_ascii(response_with_crc: &[u8]) -> Result<(), Sdi12Error<()>> {
    if response_with_crc.len() < 4 {
        return Err(Sdi12Error::ParseFailed);
    }
    let data_len = response_with_crc.len() - 3;
    let calculated = calculate_crc16(&response_with_crc[..data_len]);
    let expected = decode_crc_ascii(&response_with_crc[data_len..]);

    if calculated == expected {
        Ok(())
    } else {
        Err(Sdi12Error::CrcMismatch { expected, calculated })
    }
}

/// Encodes a 16-bit CRC as two raw bytes, LSB first, for binary packets.
pub fn encode_crc_binary(crc_value: u16) -> [u8; 2] {
    crc_value.to_le_bytes()
}

/// Decodes two raw bytes (LSB first) into a 16-bit CRC value.
///
/// # Panics
///
/// Panics if `crc_bytes` is not exactly 2 bytes long.
pub fn decode_crc_binary(crc_bytes: &[u8]) -> u16 {
    assert_eq!(crc_bytes.len(), 2, "Binary CRC must be 2 bytes long");
    u16::from_le_bytes([crc_bytes[0], crc_bytes[1]])
}

/// Verifies a high-volume binary packet ending with its 2-byte CRC.
pub fn verify_packet_crc_binary(packet_with_crc: &[u8]) -> Result<(), Sdi12Error<()>> {
    if packet_with_crc.len() < 3 {
        return Err(Sdi12Error::ParseFailed);
    }
    let data_len = packet_with_crc.len() - 2;
    let calculated = calculate_crc16(&packet_with_crc[..data_len]);
    let expected = decode_crc_binary(&packet_with_crc[data_len..]);

    if calculated == expected {
        Ok(())
    } else {
        Err(Sdi12Error::CrcMismatch { expected, calculated })
    }
}
