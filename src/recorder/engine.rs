// src/recorder/engine.rs

use crate::common::address::Sdi12Addr;
use crate::common::command::{Command, DataIndex, GroupIndex, IdentifyDescriptor, IdentifyParameterIndex};
use crate::common::crc::{calculate_crc16, verify_response_crc_ascii};
use crate::common::error::{widen, Sdi12Error};
use crate::common::frame::LineDirection;
use crate::common::timing;
use crate::common::types::{BinaryDataType, MeasurementKind};
use crate::common::value::parse_values;
use crate::recorder::interface::RecorderInterface;
use crate::recorder::response::{
    parse_identification, parse_measurement_header, parse_param_meta, BinaryPacket, DataResponse,
    IdentResponse, MeasResponse, ParamMetaResponse,
};

/// Receive buffer length: the binary packet maximum of
/// address + 2 length bytes + type + 1000 payload + 2 CRC.
pub const RECV_BUF_LEN: usize = 1006;

/// Largest binary payload a sensor may send.
pub const MAX_BINARY_PAYLOAD: usize = 1000;

/// Continuation budget while a frame is already flowing.
const LINE_CONT_TIMEOUT_MS: u32 = 15;

/// The initiator role: composes commands, drives transactions through
/// the host's [`RecorderInterface`] and parses replies into typed
/// responses. The engine never retries on its own; retry pacing belongs
/// to the caller.
pub struct Recorder<IF: RecorderInterface> {
    interface: IF,
    resp_buf: [u8; RECV_BUF_LEN],
    resp_len: usize,
}

impl<IF: RecorderInterface> Recorder<IF> {
    pub fn new(interface: IF) -> Self {
        Self { interface, resp_buf: [0; RECV_BUF_LEN], resp_len: 0 }
    }

    pub fn release(self) -> IF {
        self.interface
    }

    /// The stored response of the last transaction, `<CR><LF>` trimmed.
    pub fn response(&self) -> &[u8] {
        &self.resp_buf[..self.resp_len]
    }

    /// Wakes the bus: break, then the mandatory post-break marking.
    pub fn send_break(&mut self) -> Result<(), Sdi12Error<IF::Error>> {
        self.interface.send_break()?;
        self.interface.delay_ms(timing::MARKING_MS);
        Ok(())
    }

    /// One command/response exchange. Sends the command, awaits a line
    /// ending in `<LF>`, stores it with the terminator trimmed and
    /// returns its length.
    pub fn transact(
        &mut self,
        command: &Command<'_>,
        timeout_ms: u32,
    ) -> Result<usize, Sdi12Error<IF::Error>> {
        let formatted = command.format_into().map_err(widen)?;
        self.send_command_bytes(formatted.as_bytes())?;
        let raw_len = self.read_line(0, timeout_ms)?;
        self.resp_len = trim_crlf_len(&self.resp_buf[..raw_len]);
        Ok(self.resp_len)
    }

    // --- Address operations ---

    /// `?!` — only usable on a single-sensor bus.
    pub fn query_address(&mut self) -> Result<Sdi12Addr, Sdi12Error<IF::Error>> {
        self.transact(&Command::AddressQuery, timing::RESPONSE_TIMEOUT_MS)?;
        if self.resp_len != 1 {
            return Err(Sdi12Error::ParseFailed);
        }
        Sdi12Addr::new_sensor(self.resp_buf[0] as char).map_err(widen)
    }

    /// `a!` — presence check; a silent bus means "absent", not an error.
    pub fn acknowledge(&mut self, address: Sdi12Addr) -> Result<bool, Sdi12Error<IF::Error>> {
        match self.transact(&Command::Acknowledge { address }, timing::RESPONSE_TIMEOUT_MS) {
            Ok(_) => {
                self.check_address(address)?;
                if self.resp_len != 1 {
                    return Err(Sdi12Error::ParseFailed);
                }
                Ok(true)
            }
            Err(Sdi12Error::Timeout) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// `aAb!` — renames the sensor and waits out its storage window.
    pub fn change_address(
        &mut self,
        address: Sdi12Addr,
        new_address: Sdi12Addr,
    ) -> Result<Sdi12Addr, Sdi12Error<IF::Error>> {
        self.transact(
            &Command::ChangeAddress { address, new_address },
            timing::RESPONSE_TIMEOUT_MS,
        )?;
        if self.resp_len != 1 || self.resp_buf[0] != new_address.as_byte() {
            return Err(Sdi12Error::ParseFailed);
        }
        self.interface.delay_ms(timing::ADDRESS_CHANGE_DELAY_MS);
        Ok(new_address)
    }

    // --- Identification ---

    /// `aI!`
    pub fn identify(&mut self, address: Sdi12Addr) -> Result<IdentResponse, Sdi12Error<IF::Error>> {
        self.transact(&Command::Identify { address }, timing::RESPONSE_TIMEOUT_MS)?;
        self.check_address(address)?;
        parse_identification(self.response()).map_err(widen)
    }

    // --- Measurements ---

    /// Starts a measurement of the given family and parses the
    /// `atttn[nn[n]]` header. `Continuous` has no start command.
    pub fn start_measurement(
        &mut self,
        address: Sdi12Addr,
        kind: MeasurementKind,
        group: GroupIndex,
        crc: bool,
    ) -> Result<MeasResponse, Sdi12Error<IF::Error>> {
        let command = match kind {
            MeasurementKind::Standard => Command::Measure { address, crc, group },
            MeasurementKind::Concurrent => Command::Concurrent { address, crc, group },
            MeasurementKind::Verification => Command::Verify { address },
            MeasurementKind::HighVolumeAscii => {
                Command::HighVolume { address, binary: false, crc }
            }
            MeasurementKind::HighVolumeBinary => {
                Command::HighVolume { address, binary: true, crc }
            }
            MeasurementKind::Continuous => return Err(Sdi12Error::InvalidCommand),
        };
        self.transact(&command, timing::RESPONSE_TIMEOUT_MS)?;
        self.check_address(address)?;
        parse_measurement_header(self.response(), kind).map_err(widen)
    }

    /// `aV!`
    pub fn verify(&mut self, address: Sdi12Addr) -> Result<MeasResponse, Sdi12Error<IF::Error>> {
        self.start_measurement(address, MeasurementKind::Verification, GroupIndex::default(), false)
    }

    /// Blocks until the sensor's service request (`a<CR><LF>`) arrives
    /// or `timeout_ms` runs out.
    pub fn wait_service_request(
        &mut self,
        address: Sdi12Addr,
        timeout_ms: u32,
    ) -> Result<(), Sdi12Error<IF::Error>> {
        let raw_len = self.read_line(0, timeout_ms)?;
        self.resp_len = trim_crlf_len(&self.resp_buf[..raw_len]);
        if self.resp_len == 1 && self.resp_buf[0] == address.as_byte() {
            Ok(())
        } else {
            Err(Sdi12Error::ParseFailed)
        }
    }

    /// `aDn!` — fetches one ASCII data page.
    pub fn get_data(
        &mut self,
        address: Sdi12Addr,
        page: DataIndex,
        crc: bool,
    ) -> Result<DataResponse, Sdi12Error<IF::Error>> {
        self.transact(&Command::SendData { address, page }, timing::RESPONSE_TIMEOUT_MS)?;
        self.data_from_response(address, crc)
    }

    /// `aRn!` / `aRCn!` — continuous read of group `index`.
    pub fn continuous(
        &mut self,
        address: Sdi12Addr,
        index: GroupIndex,
        crc: bool,
    ) -> Result<DataResponse, Sdi12Error<IF::Error>> {
        self.transact(&Command::ReadContinuous { address, crc, index }, timing::RESPONSE_TIMEOUT_MS)?;
        self.data_from_response(address, crc)
    }

    // --- Metadata ---

    /// `aI{M,C,V,HA,HB}[C][g]!` — header-shaped capability metadata.
    pub fn identify_measurement(
        &mut self,
        address: Sdi12Addr,
        kind: MeasurementKind,
        group: GroupIndex,
        crc: bool,
    ) -> Result<MeasResponse, Sdi12Error<IF::Error>> {
        let desc = IdentifyDescriptor { kind, group, crc, param: None };
        self.transact(
            &Command::IdentifyMeasurement { address, desc },
            timing::RESPONSE_TIMEOUT_MS,
        )?;
        self.check_address(address)?;
        parse_measurement_header(self.response(), kind).map_err(widen)
    }

    /// `aI..._nnn!` — SHEF code and units of one parameter.
    pub fn identify_param(
        &mut self,
        address: Sdi12Addr,
        kind: MeasurementKind,
        group: GroupIndex,
        crc: bool,
        param: IdentifyParameterIndex,
    ) -> Result<ParamMetaResponse, Sdi12Error<IF::Error>> {
        let desc = IdentifyDescriptor { kind, group, crc, param: Some(param) };
        self.transact(
            &Command::IdentifyMeasurement { address, desc },
            timing::RESPONSE_TIMEOUT_MS,
        )?;
        self.check_address(address)?;
        let mut end = self.resp_len;
        if crc {
            verify_response_crc_ascii(self.response()).map_err(widen)?;
            end -= 3;
        }
        if end <= 1 {
            // Bare address: the parameter index was out of range.
            return Err(Sdi12Error::NoData);
        }
        parse_param_meta(&self.resp_buf[..end]).map_err(widen)
    }

    // --- Extended commands ---

    /// `aX<body>!` — single-line extended command; returns the payload
    /// after the address.
    pub fn extended(
        &mut self,
        address: Sdi12Addr,
        body: &str,
        timeout_ms: u32,
    ) -> Result<&[u8], Sdi12Error<IF::Error>> {
        self.transact(&Command::Extended { address, body }, timeout_ms)?;
        self.check_address(address)?;
        Ok(&self.resp_buf[1..self.resp_len])
    }

    /// Extended command with a multi-line response: keeps reading lines
    /// while each arrives within `gap_ms` of the previous one
    /// (`timing::MULTILINE_GAP_MS` is the protocol's allowance). Lines
    /// stay `<CR><LF>`-separated in the returned payload; the final
    /// terminator is trimmed.
    pub fn extended_multiline(
        &mut self,
        address: Sdi12Addr,
        body: &str,
        timeout_ms: u32,
        gap_ms: u32,
    ) -> Result<&[u8], Sdi12Error<IF::Error>> {
        let formatted = Command::Extended { address, body }.format_into().map_err(widen)?;
        self.send_command_bytes(formatted.as_bytes())?;

        let mut total = self.read_line(0, timeout_ms)?;
        loop {
            match self.read_line(total, gap_ms) {
                Ok(line_len) => total += line_len,
                Err(Sdi12Error::Timeout) => break,
                Err(e) => return Err(e),
            }
        }
        self.resp_len = trim_crlf_len(&self.resp_buf[..total]);
        self.check_address(address)?;
        Ok(&self.resp_buf[1..self.resp_len])
    }

    // --- High volume ---

    /// High-volume ASCII page: `aDn!` with the CRC that high-volume
    /// data always carries; returns the raw value tail.
    pub fn get_hv_data(
        &mut self,
        address: Sdi12Addr,
        page: DataIndex,
    ) -> Result<&[u8], Sdi12Error<IF::Error>> {
        self.transact(&Command::SendData { address, page }, timing::RESPONSE_TIMEOUT_MS)?;
        self.check_address(address)?;
        verify_response_crc_ascii(self.response()).map_err(widen)?;
        Ok(&self.resp_buf[1..self.resp_len - 3])
    }

    /// `aDBn!` — one binary packet, length-framed and CRC-checked.
    pub fn get_hv_binary(
        &mut self,
        address: Sdi12Addr,
        page: DataIndex,
    ) -> Result<BinaryPacket<'_>, Sdi12Error<IF::Error>> {
        let formatted =
            Command::SendBinaryData { address, page }.format_into().map_err(widen)?;
        self.send_command_bytes(formatted.as_bytes())?;

        // Fixed header: address, length (LE), type.
        self.read_exact(0, 4, timing::RESPONSE_TIMEOUT_MS)?;
        let payload_len = u16::from_le_bytes([self.resp_buf[1], self.resp_buf[2]]) as usize;
        if payload_len > MAX_BINARY_PAYLOAD {
            return Err(Sdi12Error::BufferOverflow {
                needed: 4 + payload_len + 2,
                got: RECV_BUF_LEN,
            });
        }
        self.read_exact(4, payload_len + 2, LINE_CONT_TIMEOUT_MS)?;
        self.resp_len = 4 + payload_len + 2;

        let calculated = calculate_crc16(&self.resp_buf[..4 + payload_len]);
        let expected = u16::from_le_bytes([
            self.resp_buf[4 + payload_len],
            self.resp_buf[4 + payload_len + 1],
        ]);
        if calculated != expected {
            return Err(Sdi12Error::CrcMismatch { expected, calculated });
        }
        if self.resp_buf[0] != address.as_byte() {
            return Err(Sdi12Error::ParseFailed);
        }
        let data_type =
            BinaryDataType::from_u8(self.resp_buf[3]).ok_or(Sdi12Error::ParseFailed)?;

        Ok(BinaryPacket {
            address,
            data_type,
            payload: &self.resp_buf[4..4 + payload_len],
            crc_valid: true,
        })
    }

    // --- Internals ---

    fn send_command_bytes(&mut self, bytes: &[u8]) -> Result<(), Sdi12Error<IF::Error>> {
        self.interface.set_direction(LineDirection::Tx)?;
        let sent = self.interface.send(bytes);
        self.interface.set_direction(LineDirection::Rx)?;
        sent?;
        Ok(())
    }

    /// Reads one line (through `<LF>`) into the buffer at `offset`.
    /// Returns the line length including its terminator.
    fn read_line(&mut self, offset: usize, timeout_ms: u32) -> Result<usize, Sdi12Error<IF::Error>> {
        let mut len = offset;
        let mut budget = timeout_ms;
        loop {
            if len >= RECV_BUF_LEN {
                return Err(Sdi12Error::BufferOverflow { needed: len + 1, got: RECV_BUF_LEN });
            }
            let got = self.interface.recv(&mut self.resp_buf[len..], budget)?;
            if got == 0 {
                return if len > offset {
                    // The line started but never finished.
                    Err(Sdi12Error::ParseFailed)
                } else {
                    Err(Sdi12Error::Timeout)
                };
            }
            let chunk_start = len;
            len += got;
            if let Some(lf) = self.resp_buf[chunk_start..len].iter().position(|&b| b == b'\n') {
                return Ok(chunk_start + lf + 1 - offset);
            }
            budget = LINE_CONT_TIMEOUT_MS;
        }
    }

    /// Reads exactly `count` bytes into the buffer at `offset`.
    fn read_exact(
        &mut self,
        offset: usize,
        count: usize,
        timeout_ms: u32,
    ) -> Result<(), Sdi12Error<IF::Error>> {
        let end = offset + count;
        debug_assert!(end <= RECV_BUF_LEN);
        let mut len = offset;
        let mut budget = timeout_ms;
        while len < end {
            let got = self.interface.recv(&mut self.resp_buf[len..end], budget)?;
            if got == 0 {
                return if len > offset {
                    Err(Sdi12Error::ParseFailed)
                } else {
                    Err(Sdi12Error::Timeout)
                };
            }
            len += got;
            budget = LINE_CONT_TIMEOUT_MS;
        }
        Ok(())
    }

    fn check_address(&self, address: Sdi12Addr) -> Result<(), Sdi12Error<IF::Error>> {
        if self.resp_len >= 1 && self.resp_buf[0] == address.as_byte() {
            Ok(())
        } else {
            Err(Sdi12Error::ParseFailed)
        }
    }

    fn data_from_response(
        &mut self,
        address: Sdi12Addr,
        crc: bool,
    ) -> Result<DataResponse, Sdi12Error<IF::Error>> {
        self.check_address(address)?;
        let mut end = self.resp_len;
        if crc {
            verify_response_crc_ascii(self.response()).map_err(widen)?;
            end -= 3;
            if end <= 1 {
                // An empty CRC'd data response is the abort marker.
                return Err(Sdi12Error::Aborted);
            }
        }
        let values = parse_values(&self.resp_buf[1..end], false);
        Ok(DataResponse { address, values, crc_valid: crc })
    }
}

fn trim_crlf_len(line: &[u8]) -> usize {
    let mut len = line.len();
    if len >= 1 && line[len - 1] == b'\n' {
        len -= 1;
    }
    if len >= 1 && line[len - 1] == b'\r' {
        len -= 1;
    }
    len
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::crc::{append_response_crc, encode_crc_binary};
    use crate::common::types::Sdi12Value;
    use std::collections::VecDeque;

    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    struct MockCommError;

    #[derive(Default)]
    struct MockLink {
        sent: std::vec::Vec<u8>,
        rx: VecDeque<std::vec::Vec<u8>>,
        delays: std::vec::Vec<u32>,
        breaks: usize,
    }

    impl MockLink {
        fn stage(&mut self, chunk: &[u8]) {
            self.rx.push_back(chunk.to_vec());
        }
    }

    impl RecorderInterface for MockLink {
        type Error = MockCommError;

        fn send(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
            self.sent.extend_from_slice(bytes);
            Ok(())
        }

        fn recv(&mut self, buf: &mut [u8], _timeout_ms: u32) -> Result<usize, Self::Error> {
            match self.rx.pop_front() {
                Some(mut chunk) => {
                    let n = chunk.len().min(buf.len());
                    buf[..n].copy_from_slice(&chunk[..n]);
                    if n < chunk.len() {
                        self.rx.push_front(chunk.split_off(n));
                    }
                    Ok(n)
                }
                None => Ok(0),
            }
        }

        fn set_direction(&mut self, _direction: LineDirection) -> Result<(), Self::Error> {
            Ok(())
        }

        fn send_break(&mut self) -> Result<(), Self::Error> {
            self.breaks += 1;
            Ok(())
        }

        fn delay_ms(&mut self, ms: u32) {
            self.delays.push(ms);
        }
    }

    fn addr(c: char) -> Sdi12Addr {
        Sdi12Addr::new(c).unwrap()
    }

    fn recorder_with(lines: &[&[u8]]) -> Recorder<MockLink> {
        let mut link = MockLink::default();
        for line in lines {
            link.stage(line);
        }
        Recorder::new(link)
    }

    #[test]
    fn test_send_break_sequence() {
        let mut recorder = recorder_with(&[]);
        recorder.send_break().unwrap();
        assert_eq!(recorder.interface.breaks, 1);
        assert_eq!(recorder.interface.delays, vec![timing::MARKING_MS]);
    }

    #[test]
    fn test_query_address() {
        let mut recorder = recorder_with(&[b"5\r\n"]);
        assert_eq!(recorder.query_address().unwrap(), addr('5'));
        assert_eq!(recorder.interface.sent, b"?!");
    }

    #[test]
    fn test_acknowledge_present_and_absent() {
        let mut recorder = recorder_with(&[b"3\r\n"]);
        assert!(recorder.acknowledge(addr('3')).unwrap());
        assert_eq!(recorder.interface.sent, b"3!");

        let mut recorder = recorder_with(&[]);
        assert!(!recorder.acknowledge(addr('3')).unwrap());
    }

    #[test]
    fn test_acknowledge_wrong_address_is_error() {
        let mut recorder = recorder_with(&[b"4\r\n"]);
        assert_eq!(recorder.acknowledge(addr('3')), Err(Sdi12Error::ParseFailed));
    }

    #[test]
    fn test_change_address_waits() {
        let mut recorder = recorder_with(&[b"5\r\n"]);
        assert_eq!(recorder.change_address(addr('0'), addr('5')).unwrap(), addr('5'));
        assert_eq!(recorder.interface.sent, b"0A5!");
        assert_eq!(recorder.interface.delays, vec![timing::ADDRESS_CHANGE_DELAY_MS]);
    }

    #[test]
    fn test_identify() {
        let mut recorder = recorder_with(&[b"014TESTCO  MOD001100SN123\r\n"]);
        let parsed = recorder.identify(addr('0')).unwrap();
        assert_eq!(recorder.interface.sent, b"0I!");
        assert_eq!(&parsed.version, b"14");
        assert_eq!(&parsed.ident.vendor, b"TESTCO  ");
        assert_eq!(parsed.ident.serial.as_str(), "SN123");
    }

    #[test]
    fn test_start_measurement_headers() {
        let mut recorder = recorder_with(&[b"00005\r\n"]);
        let meas = recorder
            .start_measurement(addr('0'), MeasurementKind::Standard, GroupIndex::default(), false)
            .unwrap();
        assert_eq!(recorder.interface.sent, b"0M!");
        assert_eq!((meas.ttt_seconds, meas.count), (0, 5));

        let mut recorder = recorder_with(&[b"006015\r\n"]);
        let meas = recorder
            .start_measurement(addr('0'), MeasurementKind::Concurrent, GroupIndex::default(), false)
            .unwrap();
        assert_eq!(recorder.interface.sent, b"0C!");
        assert_eq!((meas.ttt_seconds, meas.count), (60, 15));

        let mut recorder = recorder_with(&[b"0010100\r\n"]);
        let meas = recorder
            .start_measurement(
                addr('0'),
                MeasurementKind::HighVolumeAscii,
                GroupIndex::default(),
                false,
            )
            .unwrap();
        assert_eq!(recorder.interface.sent, b"0HA!");
        assert_eq!((meas.ttt_seconds, meas.count), (10, 100));
    }

    #[test]
    fn test_start_measurement_with_group_and_crc() {
        let mut recorder = recorder_with(&[b"30453\r\n"]);
        let meas = recorder
            .start_measurement(
                addr('3'),
                MeasurementKind::Standard,
                GroupIndex::new(2).unwrap(),
                true,
            )
            .unwrap();
        assert_eq!(recorder.interface.sent, b"3MC2!");
        assert_eq!((meas.ttt_seconds, meas.count), (45, 3));
    }

    #[test]
    fn test_continuous_has_no_start_command() {
        let mut recorder = recorder_with(&[]);
        assert_eq!(
            recorder.start_measurement(
                addr('0'),
                MeasurementKind::Continuous,
                GroupIndex::default(),
                false
            ),
            Err(Sdi12Error::InvalidCommand)
        );
        assert!(recorder.interface.sent.is_empty());
    }

    #[test]
    fn test_wait_service_request() {
        let mut recorder = recorder_with(&[b"0\r\n"]);
        recorder.wait_service_request(addr('0'), 5000).unwrap();

        let mut recorder = recorder_with(&[]);
        assert_eq!(recorder.wait_service_request(addr('0'), 100), Err(Sdi12Error::Timeout));

        let mut recorder = recorder_with(&[b"1\r\n"]);
        assert_eq!(recorder.wait_service_request(addr('0'), 100), Err(Sdi12Error::ParseFailed));
    }

    #[test]
    fn test_get_data_plain() {
        let mut recorder = recorder_with(&[b"0+42+25.50+101.3+65.00-10.5\r\n"]);
        let data = recorder.get_data(addr('0'), DataIndex::new(0).unwrap(), false).unwrap();
        assert_eq!(recorder.interface.sent, b"0D0!");
        assert!(!data.crc_valid);
        assert_eq!(data.values.len(), 5);
        assert_eq!(data.values[0], Sdi12Value { value: 42.0, decimals: 0 });
        assert_eq!(data.values[4], Sdi12Value { value: -10.5, decimals: 1 });
    }

    #[test]
    fn test_get_data_with_crc() {
        let mut recorder = recorder_with(&[b"0+3.14OqZ\r\n"]);
        let data = recorder.get_data(addr('0'), DataIndex::new(0).unwrap(), true).unwrap();
        assert!(data.crc_valid);
        assert_eq!(data.values.len(), 1);
        assert_eq!(data.values[0], Sdi12Value { value: 3.14, decimals: 2 });
    }

    #[test]
    fn test_get_data_bad_crc() {
        let mut recorder = recorder_with(&[b"0+3.14OqX\r\n"]);
        assert!(matches!(
            recorder.get_data(addr('0'), DataIndex::new(0).unwrap(), true),
            Err(Sdi12Error::CrcMismatch { .. })
        ));
    }

    #[test]
    fn test_get_data_empty_crc_is_abort() {
        let mut frame = [0u8; 16];
        frame[0] = b'0';
        let len = append_response_crc(&mut frame, 1).unwrap();
        let mut recorder = recorder_with(&[&frame[..len]]);
        assert_eq!(
            recorder.get_data(addr('0'), DataIndex::new(0).unwrap(), true),
            Err(Sdi12Error::Aborted)
        );
    }

    #[test]
    fn test_continuous_read() {
        let mut recorder = recorder_with(&[b"2+1.5-2.5\r\n"]);
        let data = recorder.continuous(addr('2'), GroupIndex::new(4).unwrap(), false).unwrap();
        assert_eq!(recorder.interface.sent, b"2R4!");
        assert_eq!(data.values.len(), 2);
    }

    #[test]
    fn test_identify_measurement() {
        let mut recorder = recorder_with(&[b"000005\r\n"]);
        let meas = recorder
            .identify_measurement(
                addr('0'),
                MeasurementKind::Concurrent,
                GroupIndex::default(),
                false,
            )
            .unwrap();
        assert_eq!(recorder.interface.sent, b"0IC!");
        assert_eq!((meas.ttt_seconds, meas.count), (0, 5));
    }

    #[test]
    fn test_identify_param() {
        let mut recorder = recorder_with(&[b"0,TA,deg C;\r\n"]);
        let meta = recorder
            .identify_param(
                addr('0'),
                MeasurementKind::Standard,
                GroupIndex::default(),
                false,
                IdentifyParameterIndex::new(1).unwrap(),
            )
            .unwrap();
        assert_eq!(recorder.interface.sent, b"0IM_001!");
        assert_eq!(meta.shef.as_str(), "TA");
        assert_eq!(meta.units.as_str(), "deg C");
    }

    #[test]
    fn test_identify_param_out_of_range() {
        let mut recorder = recorder_with(&[b"0\r\n"]);
        assert_eq!(
            recorder.identify_param(
                addr('0'),
                MeasurementKind::Standard,
                GroupIndex::default(),
                false,
                IdentifyParameterIndex::new(99).unwrap(),
            ),
            Err(Sdi12Error::NoData)
        );
    }

    #[test]
    fn test_extended_single_line() {
        let mut recorder = recorder_with(&[b"0V1.0\r\n"]);
        let payload = recorder.extended(addr('0'), "VER", 1000).unwrap().to_vec();
        assert_eq!(recorder.interface.sent, b"0XVER!");
        assert_eq!(payload, b"V1.0");
    }

    #[test]
    fn test_extended_multiline_gap() {
        let mut recorder = recorder_with(&[b"0LINE1\r\n", b"LINE2\r\n", b"LINE3\r\n"]);
        let payload = recorder.extended_multiline(addr('0'), "DUMP", 1000, 150).unwrap().to_vec();
        assert_eq!(payload, b"LINE1\r\nLINE2\r\nLINE3");
    }

    #[test]
    fn test_get_hv_data_strips_crc() {
        let mut frame = [0u8; 96];
        frame[..7].copy_from_slice(b"0+1+2+3");
        let len = append_response_crc(&mut frame, 7).unwrap();
        let mut recorder = recorder_with(&[&frame[..len]]);
        let tail = recorder.get_hv_data(addr('0'), DataIndex::new(12).unwrap()).unwrap().to_vec();
        assert_eq!(recorder.interface.sent, b"0D12!");
        assert_eq!(tail, b"+1+2+3");
    }

    fn binary_packet(address: u8, data_type: u8, payload: &[u8]) -> std::vec::Vec<u8> {
        let mut packet = vec![address];
        packet.extend_from_slice(&(payload.len() as u16).to_le_bytes());
        packet.push(data_type);
        packet.extend_from_slice(payload);
        let crc = calculate_crc16(&packet);
        packet.extend_from_slice(&encode_crc_binary(crc));
        packet
    }

    #[test]
    fn test_get_hv_binary() {
        let packet = binary_packet(b'1', 3, &[0xFF, 0xFF, 0x01, 0x00]);
        // Split delivery across chunks exercises the framing loop.
        let mut link = MockLink::default();
        link.stage(&packet[..3]);
        link.stage(&packet[3..]);
        let mut recorder = Recorder::new(link);

        let parsed = recorder.get_hv_binary(addr('1'), DataIndex::new(0).unwrap()).unwrap();
        assert_eq!(parsed.data_type, BinaryDataType::SignedI16);
        assert_eq!(parsed.payload, &[0xFF, 0xFF, 0x01, 0x00]);
        assert!(parsed.crc_valid);
        assert_eq!(recorder.interface.sent, b"1DB0!");
    }

    #[test]
    fn test_get_hv_binary_empty_packet() {
        let packet = binary_packet(b'1', 0, &[]);
        let mut recorder = recorder_with(&[&packet]);
        let parsed = recorder.get_hv_binary(addr('1'), DataIndex::new(7).unwrap()).unwrap();
        assert_eq!(parsed.data_type, BinaryDataType::InvalidRequest);
        assert!(parsed.payload.is_empty());
    }

    #[test]
    fn test_get_hv_binary_bad_crc() {
        let mut packet = binary_packet(b'1', 3, &[0xFF, 0xFF, 0x01, 0x00]);
        let last = packet.len() - 1;
        packet[last] ^= 0xFF;
        let mut recorder = recorder_with(&[&packet]);
        assert!(matches!(
            recorder.get_hv_binary(addr('1'), DataIndex::new(0).unwrap()),
            Err(Sdi12Error::CrcMismatch { .. })
        ));
    }

    #[test]
    fn test_get_hv_binary_oversize() {
        let mut header = vec![b'1'];
        header.extend_from_slice(&1001u16.to_le_bytes());
        header.push(9);
        let mut recorder = recorder_with(&[&header]);
        assert!(matches!(
            recorder.get_hv_binary(addr('1'), DataIndex::new(0).unwrap()),
            Err(Sdi12Error::BufferOverflow { .. })
        ));
    }

    #[test]
    fn test_transact_timeout_and_partial() {
        let mut recorder = recorder_with(&[]);
        let cmd = Command::Acknowledge { address: addr('0') };
        assert_eq!(recorder.transact(&cmd, 15), Err(Sdi12Error::Timeout));

        // A line that starts but never terminates.
        let mut recorder = recorder_with(&[b"0+1.2"]);
        assert_eq!(recorder.transact(&cmd, 15), Err(Sdi12Error::ParseFailed));
    }

    #[test]
    fn test_response_accessor_keeps_last_line() {
        let mut recorder = recorder_with(&[b"7\r\n"]);
        recorder.transact(&Command::Acknowledge { address: addr('7') }, 15).unwrap();
        assert_eq!(recorder.response(), b"7");
    }
}
