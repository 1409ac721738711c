// src/common/command.rs

use super::address::Sdi12Addr;
use super::error::Sdi12Error;
use super::types::MeasurementKind;
use arrayvec::ArrayString;
use core::fmt::Write;
use core::str;

/// Upper bound for a formatted command, sized for extended bodies
/// (`aX` + prefix + arguments + `!`).
pub const MAX_COMMAND_LEN: usize = 48;

// --- Validated index newtypes ---

/// Measurement/continuous group selector `g` (0-9). Group 0 is what the
/// un-indexed commands (`aM!`, `aC!`, `aV!`, `aHA!`, `aHB!`) address.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct GroupIndex(u8);

impl GroupIndex {
    pub fn new(index: u8) -> Result<Self, Sdi12Error<()>> {
        if index <= 9 {
            Ok(Self(index))
        } else {
            Err(Sdi12Error::InvalidCommand)
        }
    }

    pub const fn value(&self) -> u8 {
        self.0
    }
}

/// Data page selector `n` for `aDn!` / `aDBn!` (0-999).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct DataIndex(u16);

impl DataIndex {
    pub fn new(index: u16) -> Result<Self, Sdi12Error<()>> {
        if index <= 999 {
            Ok(Self(index))
        } else {
            Err(Sdi12Error::InvalidCommand)
        }
    }

    pub const fn value(&self) -> u16 {
        self.0
    }
}

/// 1-based parameter selector `nnn` in identify-parameter commands.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct IdentifyParameterIndex(u16);

impl IdentifyParameterIndex {
    pub fn new(index: u16) -> Result<Self, Sdi12Error<()>> {
        if (1..=999).contains(&index) {
            Ok(Self(index))
        } else {
            Err(Sdi12Error::InvalidCommand)
        }
    }

    pub const fn value(&self) -> u16 {
        self.0
    }
}

/// Structured form of the `aI{M,C,V,HA,HB,R}[C][g][_nnn]!` family.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct IdentifyDescriptor {
    pub kind: MeasurementKind,
    pub group: GroupIndex,
    pub crc: bool,
    /// Present for the `_nnn` parameter-metadata sub-case.
    pub param: Option<IdentifyParameterIndex>,
}

// --- Main command enum ---

/// A tokenized SDI-12 command. The lifetime carries only the borrowed
/// body of an extended (`aX...!`) command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command<'a> {
    Acknowledge { address: Sdi12Addr },
    AddressQuery,
    Identify { address: Sdi12Addr },
    Measure { address: Sdi12Addr, crc: bool, group: GroupIndex },
    Concurrent { address: Sdi12Addr, crc: bool, group: GroupIndex },
    Verify { address: Sdi12Addr },
    HighVolume { address: Sdi12Addr, binary: bool, crc: bool },
    HighVolumeStub { address: Sdi12Addr },
    SendData { address: Sdi12Addr, page: DataIndex },
    SendBinaryData { address: Sdi12Addr, page: DataIndex },
    ReadContinuous { address: Sdi12Addr, crc: bool, index: GroupIndex },
    ChangeAddress { address: Sdi12Addr, new_address: Sdi12Addr },
    IdentifyMeasurement { address: Sdi12Addr, desc: IdentifyDescriptor },
    /// Manufacturer-defined command; `body` is everything between `aX`
    /// and the terminator.
    Extended { address: Sdi12Addr, body: &'a str },
}

impl<'a> Command<'a> {
    /// The address the command targets; `None` for the `?!` wildcard.
    pub fn address(&self) -> Option<Sdi12Addr> {
        match self {
            Command::AddressQuery => None,
            Command::Acknowledge { address }
            | Command::Identify { address }
            | Command::Measure { address, .. }
            | Command::Concurrent { address, .. }
            | Command::Verify { address }
            | Command::HighVolume { address, .. }
            | Command::HighVolumeStub { address }
            | Command::SendData { address, .. }
            | Command::SendBinaryData { address, .. }
            | Command::ReadContinuous { address, .. }
            | Command::ChangeAddress { address, .. }
            | Command::IdentifyMeasurement { address, .. }
            | Command::Extended { address, .. } => Some(*address),
        }
    }

    /// Formats the command into its wire form including the `!`.
    pub fn format_into(&self) -> Result<ArrayString<MAX_COMMAND_LEN>, Sdi12Error<()>> {
        let mut buffer = ArrayString::<MAX_COMMAND_LEN>::new();
        self.write_to(&mut buffer).map_err(|_| Sdi12Error::BufferOverflow {
            needed: MAX_COMMAND_LEN + 1,
            got: MAX_COMMAND_LEN,
        })?;
        Ok(buffer)
    }

    fn write_to(&self, buffer: &mut ArrayString<MAX_COMMAND_LEN>) -> core::fmt::Result {
        match self {
            Command::Acknowledge { address } => write!(buffer, "{}!", address),
            Command::AddressQuery => write!(buffer, "?!"),
            Command::Identify { address } => write!(buffer, "{}I!", address),
            Command::Verify { address } => write!(buffer, "{}V!", address),
            Command::HighVolumeStub { address } => write!(buffer, "{}H!", address),
            Command::HighVolume { address, binary, crc } => {
                let ab = if *binary { "HB" } else { "HA" };
                let c = if *crc { "C" } else { "" };
                write!(buffer, "{}{}{}!", address, ab, c)
            }
            Command::Measure { address, crc, group } => {
                write!(buffer, "{}M", address)?;
                if *crc {
                    write!(buffer, "C")?;
                }
                if group.value() != 0 {
                    write!(buffer, "{}", group.value())?;
                }
                write!(buffer, "!")
            }
            Command::Concurrent { address, crc, group } => {
                write!(buffer, "{}C", address)?;
                if *crc {
                    write!(buffer, "C")?;
                }
                if group.value() != 0 {
                    write!(buffer, "{}", group.value())?;
                }
                write!(buffer, "!")
            }
            Command::SendData { address, page } => {
                write!(buffer, "{}D{}!", address, page.value())
            }
            Command::SendBinaryData { address, page } => {
                write!(buffer, "{}DB{}!", address, page.value())
            }
            Command::ReadContinuous { address, crc, index } => {
                let c = if *crc { "C" } else { "" };
                write!(buffer, "{}R{}{}!", address, c, index.value())
            }
            Command::ChangeAddress { address, new_address } => {
                write!(buffer, "{}A{}!", address, new_address)
            }
            Command::IdentifyMeasurement { address, desc } => {
                write!(buffer, "{}I", address)?;
                match desc.kind {
                    MeasurementKind::Standard => write!(buffer, "M")?,
                    MeasurementKind::Concurrent => write!(buffer, "C")?,
                    MeasurementKind::Verification => write!(buffer, "V")?,
                    MeasurementKind::HighVolumeAscii => write!(buffer, "HA")?,
                    MeasurementKind::HighVolumeBinary => write!(buffer, "HB")?,
                    MeasurementKind::Continuous => write!(buffer, "R")?,
                }
                if desc.crc {
                    write!(buffer, "C")?;
                }
                let group_shown = match desc.kind {
                    MeasurementKind::Continuous => true,
                    MeasurementKind::Standard | MeasurementKind::Concurrent => {
                        desc.group.value() != 0
                    }
                    _ => false,
                };
                if group_shown {
                    write!(buffer, "{}", desc.group.value())?;
                }
                if let Some(param) = desc.param {
                    write!(buffer, "_{:03}", param.value())?;
                }
                write!(buffer, "!")
            }
            Command::Extended { address, body } => write!(buffer, "{}X{}!", address, body),
        }
    }
}

// --- Parsing ---

/// Parses a raw command byte sequence into a [`Command`].
///
/// Expects the bytes starting at the address; the terminating `!` may be
/// present or already stripped by the host framing layer. Does not make
/// the addressing decision; that belongs to the sensor engine.
pub fn parse_command(bytes: &[u8]) -> Result<Command<'_>, Sdi12Error<()>> {
    let bytes = match bytes {
        [rest @ .., b'!'] => rest,
        _ => bytes,
    };
    if bytes.is_empty() {
        return Err(Sdi12Error::InvalidCommand);
    }

    let address_char = bytes[0] as char;
    if address_char == '?' {
        return if bytes.len() == 1 {
            Ok(Command::AddressQuery)
        } else {
            Err(Sdi12Error::InvalidCommand)
        };
    }
    let address = Sdi12Addr::new_sensor(address_char)?;

    let body = str::from_utf8(&bytes[1..]).map_err(|_| Sdi12Error::InvalidCommand)?;

    match body {
        "" => Ok(Command::Acknowledge { address }),
        "I" => Ok(Command::Identify { address }),
        "V" => Ok(Command::Verify { address }),
        "H" => Ok(Command::HighVolumeStub { address }),
        "HA" => Ok(Command::HighVolume { address, binary: false, crc: false }),
        "HAC" => Ok(Command::HighVolume { address, binary: false, crc: true }),
        "HB" => Ok(Command::HighVolume { address, binary: true, crc: false }),
        "HBC" => Ok(Command::HighVolume { address, binary: true, crc: true }),

        body if body.starts_with('A') && body.len() == 2 => {
            let new_char = body.as_bytes()[1] as char;
            let new_address = Sdi12Addr::new_sensor(new_char)?;
            Ok(Command::ChangeAddress { address, new_address })
        }

        body if body.starts_with('M') => {
            let (crc, group) = parse_measure_suffix(&body[1..])?;
            Ok(Command::Measure { address, crc, group })
        }
        body if body.starts_with('C') => {
            let (crc, group) = parse_measure_suffix(&body[1..])?;
            Ok(Command::Concurrent { address, crc, group })
        }

        body if body.starts_with("DB") => {
            let page = parse_page_digits(&body[2..])?;
            Ok(Command::SendBinaryData { address, page })
        }
        body if body.starts_with('D') => {
            let page = parse_page_digits(&body[1..])?;
            Ok(Command::SendData { address, page })
        }

        body if body.starts_with('R') => {
            let (crc, rest) = match body.strip_prefix("RC") {
                Some(rest) => (true, rest),
                None => (false, &body[1..]),
            };
            if rest.len() != 1 || !rest.as_bytes()[0].is_ascii_digit() {
                return Err(Sdi12Error::InvalidCommand);
            }
            let index = GroupIndex::new(rest.as_bytes()[0] - b'0')?;
            Ok(Command::ReadContinuous { address, crc, index })
        }

        body if body.starts_with('I') => {
            let desc = parse_identify_body(&body[1..])?;
            Ok(Command::IdentifyMeasurement { address, desc })
        }

        body if body.starts_with('X') && body.len() > 1 => {
            Ok(Command::Extended { address, body: &body[1..] })
        }

        _ => Err(Sdi12Error::InvalidCommand),
    }
}

/// Parses the `[C][g]` tail shared by the M and C command families.
fn parse_measure_suffix(rest: &str) -> Result<(bool, GroupIndex), Sdi12Error<()>> {
    let (crc, rest) = match rest.strip_prefix('C') {
        Some(rest) => (true, rest),
        None => (false, rest),
    };
    let group = match rest.len() {
        0 => GroupIndex::default(),
        1 if rest.as_bytes()[0].is_ascii_digit() => GroupIndex::new(rest.as_bytes()[0] - b'0')?,
        _ => return Err(Sdi12Error::InvalidCommand),
    };
    Ok((crc, group))
}

/// Parses a 1-3 digit page index.
fn parse_page_digits(digits: &str) -> Result<DataIndex, Sdi12Error<()>> {
    if digits.is_empty() || digits.len() > 3 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Sdi12Error::InvalidCommand);
    }
    let value = digits.parse::<u16>().map_err(|_| Sdi12Error::InvalidCommand)?;
    DataIndex::new(value)
}

/// Hand-written recognizer for the identify-measurement family. `rest`
/// is the command body with the leading `I` removed, e.g. `MC3_001`.
fn parse_identify_body(rest: &str) -> Result<IdentifyDescriptor, Sdi12Error<()>> {
    // Split off the optional `_nnn` parameter selector.
    let (main, param) = match rest.split_once('_') {
        Some((main, param_str)) => {
            if param_str.len() != 3 || !param_str.bytes().all(|b| b.is_ascii_digit()) {
                return Err(Sdi12Error::InvalidCommand);
            }
            let value = param_str.parse::<u16>().map_err(|_| Sdi12Error::InvalidCommand)?;
            (main, Some(IdentifyParameterIndex::new(value)?))
        }
        None => (rest, None),
    };

    // Fixed-form kinds first.
    match main {
        "V" => {
            return Ok(IdentifyDescriptor {
                kind: MeasurementKind::Verification,
                group: GroupIndex::default(),
                crc: false,
                param,
            })
        }
        "HA" | "HB" => {
            let kind = if main == "HA" {
                MeasurementKind::HighVolumeAscii
            } else {
                MeasurementKind::HighVolumeBinary
            };
            return Ok(IdentifyDescriptor { kind, group: GroupIndex::default(), crc: false, param });
        }
        _ => {}
    }

    // M / C / R with optional C infix and optional (R: required) group digit.
    let mut chars = main.bytes();
    let kind = match chars.next() {
        Some(b'M') => MeasurementKind::Standard,
        Some(b'C') => MeasurementKind::Concurrent,
        Some(b'R') => MeasurementKind::Continuous,
        _ => return Err(Sdi12Error::InvalidCommand),
    };
    let mut tail = &main[1..];
    let crc = match tail.strip_prefix('C') {
        Some(rest) => {
            tail = rest;
            true
        }
        None => false,
    };
    let group = match (tail.len(), kind) {
        (0, MeasurementKind::Continuous) => return Err(Sdi12Error::InvalidCommand),
        (0, _) => GroupIndex::default(),
        (1, _) if tail.as_bytes()[0].is_ascii_digit() => {
            GroupIndex::new(tail.as_bytes()[0] - b'0')?
        }
        _ => return Err(Sdi12Error::InvalidCommand),
    };
    if kind == MeasurementKind::Continuous && param.is_none() {
        return Err(Sdi12Error::InvalidCommand);
    }
    Ok(IdentifyDescriptor { kind, group, crc, param })
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;

    fn addr(c: char) -> Sdi12Addr {
        Sdi12Addr::new(c).unwrap()
    }

    #[test]
    fn test_parse_basic_commands() {
        assert_eq!(parse_command(b"0!").unwrap(), Command::Acknowledge { address: addr('0') });
        assert_eq!(parse_command(b"1I!").unwrap(), Command::Identify { address: addr('1') });
        assert_eq!(parse_command(b"?!").unwrap(), Command::AddressQuery);
        assert_eq!(
            parse_command(b"2A3!").unwrap(),
            Command::ChangeAddress { address: addr('2'), new_address: addr('3') }
        );
        assert_eq!(parse_command(b"4V!").unwrap(), Command::Verify { address: addr('4') });
        assert_eq!(parse_command(b"7H!").unwrap(), Command::HighVolumeStub { address: addr('7') });
    }

    #[test]
    fn test_parse_terminator_optional() {
        assert_eq!(parse_command(b"0M").unwrap(), parse_command(b"0M!").unwrap());
        assert_eq!(parse_command(b"?").unwrap(), Command::AddressQuery);
    }

    #[test]
    fn test_parse_measurement_commands() {
        assert_eq!(
            parse_command(b"0M!").unwrap(),
            Command::Measure { address: addr('0'), crc: false, group: GroupIndex::new(0).unwrap() }
        );
        assert_eq!(
            parse_command(b"1M1!").unwrap(),
            Command::Measure { address: addr('1'), crc: false, group: GroupIndex::new(1).unwrap() }
        );
        assert_eq!(
            parse_command(b"2M0!").unwrap(),
            Command::Measure { address: addr('2'), crc: false, group: GroupIndex::new(0).unwrap() }
        );
        assert_eq!(
            parse_command(b"3MC!").unwrap(),
            Command::Measure { address: addr('3'), crc: true, group: GroupIndex::new(0).unwrap() }
        );
        assert_eq!(
            parse_command(b"4MC9!").unwrap(),
            Command::Measure { address: addr('4'), crc: true, group: GroupIndex::new(9).unwrap() }
        );
        assert_eq!(
            parse_command(b"6C!").unwrap(),
            Command::Concurrent {
                address: addr('6'),
                crc: false,
                group: GroupIndex::new(0).unwrap()
            }
        );
        assert_eq!(
            parse_command(b"9CC2!").unwrap(),
            Command::Concurrent {
                address: addr('9'),
                crc: true,
                group: GroupIndex::new(2).unwrap()
            }
        );
    }

    #[test]
    fn test_parse_high_volume_commands() {
        assert_eq!(
            parse_command(b"5HA!").unwrap(),
            Command::HighVolume { address: addr('5'), binary: false, crc: false }
        );
        assert_eq!(
            parse_command(b"5HAC!").unwrap(),
            Command::HighVolume { address: addr('5'), binary: false, crc: true }
        );
        assert_eq!(
            parse_command(b"6HB!").unwrap(),
            Command::HighVolume { address: addr('6'), binary: true, crc: false }
        );
        assert_eq!(
            parse_command(b"6HBC!").unwrap(),
            Command::HighVolume { address: addr('6'), binary: true, crc: true }
        );
    }

    #[test]
    fn test_parse_data_commands() {
        assert_eq!(
            parse_command(b"0D0!").unwrap(),
            Command::SendData { address: addr('0'), page: DataIndex::new(0).unwrap() }
        );
        assert_eq!(
            parse_command(b"2D10!").unwrap(),
            Command::SendData { address: addr('2'), page: DataIndex::new(10).unwrap() }
        );
        assert_eq!(
            parse_command(b"3D999!").unwrap(),
            Command::SendData { address: addr('3'), page: DataIndex::new(999).unwrap() }
        );
        assert_eq!(
            parse_command(b"4DB0!").unwrap(),
            Command::SendBinaryData { address: addr('4'), page: DataIndex::new(0).unwrap() }
        );
        assert_eq!(
            parse_command(b"6DB999!").unwrap(),
            Command::SendBinaryData { address: addr('6'), page: DataIndex::new(999).unwrap() }
        );
    }

    #[test]
    fn test_parse_continuous_commands() {
        assert_eq!(
            parse_command(b"0R0!").unwrap(),
            Command::ReadContinuous {
                address: addr('0'),
                crc: false,
                index: GroupIndex::new(0).unwrap()
            }
        );
        assert_eq!(
            parse_command(b"3RC9!").unwrap(),
            Command::ReadContinuous {
                address: addr('3'),
                crc: true,
                index: GroupIndex::new(9).unwrap()
            }
        );
    }

    #[test]
    fn test_parse_identify_measurement() {
        let cmd = parse_command(b"0IM!").unwrap();
        assert_eq!(
            cmd,
            Command::IdentifyMeasurement {
                address: addr('0'),
                desc: IdentifyDescriptor {
                    kind: MeasurementKind::Standard,
                    group: GroupIndex::new(0).unwrap(),
                    crc: false,
                    param: None,
                }
            }
        );
        let cmd = parse_command(b"3IMC9!").unwrap();
        assert_eq!(
            cmd,
            Command::IdentifyMeasurement {
                address: addr('3'),
                desc: IdentifyDescriptor {
                    kind: MeasurementKind::Standard,
                    group: GroupIndex::new(9).unwrap(),
                    crc: true,
                    param: None,
                }
            }
        );
        let cmd = parse_command(b"4IV!").unwrap();
        assert_eq!(
            cmd,
            Command::IdentifyMeasurement {
                address: addr('4'),
                desc: IdentifyDescriptor {
                    kind: MeasurementKind::Verification,
                    group: GroupIndex::new(0).unwrap(),
                    crc: false,
                    param: None,
                }
            }
        );
        let cmd = parse_command(b"7ICC2!").unwrap();
        assert_eq!(
            cmd,
            Command::IdentifyMeasurement {
                address: addr('7'),
                desc: IdentifyDescriptor {
                    kind: MeasurementKind::Concurrent,
                    group: GroupIndex::new(2).unwrap(),
                    crc: true,
                    param: None,
                }
            }
        );
        let cmd = parse_command(b"9IHA!").unwrap();
        assert_eq!(
            cmd,
            Command::IdentifyMeasurement {
                address: addr('9'),
                desc: IdentifyDescriptor {
                    kind: MeasurementKind::HighVolumeAscii,
                    group: GroupIndex::new(0).unwrap(),
                    crc: false,
                    param: None,
                }
            }
        );
    }

    #[test]
    fn test_parse_identify_parameter() {
        let cmd = parse_command(b"0IM_001!").unwrap();
        assert_eq!(
            cmd,
            Command::IdentifyMeasurement {
                address: addr('0'),
                desc: IdentifyDescriptor {
                    kind: MeasurementKind::Standard,
                    group: GroupIndex::new(0).unwrap(),
                    crc: false,
                    param: Some(IdentifyParameterIndex::new(1).unwrap()),
                }
            }
        );
        let cmd = parse_command(b"9IR0_001!").unwrap();
        assert_eq!(
            cmd,
            Command::IdentifyMeasurement {
                address: addr('9'),
                desc: IdentifyDescriptor {
                    kind: MeasurementKind::Continuous,
                    group: GroupIndex::new(0).unwrap(),
                    crc: false,
                    param: Some(IdentifyParameterIndex::new(1).unwrap()),
                }
            }
        );
        let cmd = parse_command(b"bIRC9_100!").unwrap();
        assert_eq!(
            cmd,
            Command::IdentifyMeasurement {
                address: addr('b'),
                desc: IdentifyDescriptor {
                    kind: MeasurementKind::Continuous,
                    group: GroupIndex::new(9).unwrap(),
                    crc: true,
                    param: Some(IdentifyParameterIndex::new(100).unwrap()),
                }
            }
        );
        let cmd = parse_command(b"eIHB_999!").unwrap();
        assert_eq!(
            cmd,
            Command::IdentifyMeasurement {
                address: addr('e'),
                desc: IdentifyDescriptor {
                    kind: MeasurementKind::HighVolumeBinary,
                    group: GroupIndex::new(0).unwrap(),
                    crc: false,
                    param: Some(IdentifyParameterIndex::new(999).unwrap()),
                }
            }
        );
    }

    #[test]
    fn test_parse_extended() {
        assert_eq!(
            parse_command(b"0XABC!").unwrap(),
            Command::Extended { address: addr('0'), body: "ABC" }
        );
        assert_eq!(
            parse_command(b"1XSET,7!").unwrap(),
            Command::Extended { address: addr('1'), body: "SET,7" }
        );
    }

    #[test]
    fn test_parse_invalid() {
        assert!(matches!(parse_command(b""), Err(Sdi12Error::InvalidCommand)));
        assert!(matches!(parse_command(b"!"), Err(Sdi12Error::InvalidCommand)));
        assert!(matches!(parse_command(b"?A!"), Err(Sdi12Error::InvalidCommand)));
        assert!(matches!(parse_command(b"$M!"), Err(Sdi12Error::InvalidAddress('$'))));
        assert!(matches!(parse_command(b"0Q!"), Err(Sdi12Error::InvalidCommand)));
        assert!(matches!(parse_command(b"1MA!"), Err(Sdi12Error::InvalidCommand)));
        assert!(matches!(parse_command(b"2MCC!"), Err(Sdi12Error::InvalidCommand)));
        assert!(matches!(parse_command(b"4D!"), Err(Sdi12Error::InvalidCommand)));
        assert!(matches!(parse_command(b"2D1000!"), Err(Sdi12Error::InvalidCommand)));
        assert!(matches!(parse_command(b"5R!"), Err(Sdi12Error::InvalidCommand)));
        assert!(matches!(parse_command(b"3R10!"), Err(Sdi12Error::InvalidCommand)));
        assert!(matches!(parse_command(b"0A$!"), Err(Sdi12Error::InvalidAddress('$'))));
        assert!(matches!(parse_command(b"0A?!"), Err(Sdi12Error::InvalidAddress('?'))));
        assert!(matches!(parse_command(b"5IR!"), Err(Sdi12Error::InvalidCommand)));
        assert!(matches!(parse_command(b"5IR0!"), Err(Sdi12Error::InvalidCommand)));
        assert!(matches!(parse_command(b"6IM_00!"), Err(Sdi12Error::InvalidCommand)));
        assert!(matches!(parse_command(b"6IM_000!"), Err(Sdi12Error::InvalidCommand)));
        assert!(matches!(parse_command(b"7IM_ABC!"), Err(Sdi12Error::InvalidCommand)));
        assert!(matches!(parse_command(b"0X!"), Err(Sdi12Error::InvalidCommand)));
        assert!(matches!(
            parse_command(&[b'0', 0xE2, 0x82, 0xAC, b'!']),
            Err(Sdi12Error::InvalidCommand)
        ));
    }

    #[test]
    fn test_format_roundtrip() {
        let commands = [
            parse_command(b"0!").unwrap(),
            parse_command(b"?!").unwrap(),
            parse_command(b"1I!").unwrap(),
            parse_command(b"2M!").unwrap(),
            parse_command(b"3MC4!").unwrap(),
            parse_command(b"4CC!").unwrap(),
            parse_command(b"5D42!").unwrap(),
            parse_command(b"6DB999!").unwrap(),
            parse_command(b"7RC3!").unwrap(),
            parse_command(b"8V!").unwrap(),
            parse_command(b"9HA!").unwrap(),
            parse_command(b"aHBC!").unwrap(),
            parse_command(b"bH!").unwrap(),
            parse_command(b"cA5!").unwrap(),
            parse_command(b"dIMC2_005!").unwrap(),
            parse_command(b"eIRC1_010!").unwrap(),
            parse_command(b"fXRESET!").unwrap(),
        ];
        for cmd in &commands {
            let formatted = cmd.format_into().unwrap();
            let reparsed = parse_command(formatted.as_bytes()).unwrap();
            assert_eq!(&reparsed, cmd, "roundtrip of {}", formatted);
        }
    }

    #[test]
    fn test_group_zero_formats_bare() {
        let cmd = Command::Measure {
            address: addr('0'),
            crc: false,
            group: GroupIndex::new(0).unwrap(),
        };
        assert_eq!(cmd.format_into().unwrap().as_str(), "0M!");
    }

    #[test]
    fn test_index_validation() {
        assert!(GroupIndex::new(9).is_ok());
        assert!(GroupIndex::new(10).is_err());
        assert!(DataIndex::new(999).is_ok());
        assert!(DataIndex::new(1000).is_err());
        assert!(IdentifyParameterIndex::new(0).is_err());
        assert!(IdentifyParameterIndex::new(1).is_ok());
        assert!(IdentifyParameterIndex::new(999).is_ok());
        assert!(IdentifyParameterIndex::new(1000).is_err());
    }
}
