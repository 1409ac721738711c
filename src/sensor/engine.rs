// src/sensor/engine.rs

use crate::common::address::Sdi12Addr;
use crate::common::command::{parse_command, Command, IdentifyDescriptor};
use crate::common::error::{widen, Sdi12Error};
use crate::common::frame::LineDirection;
use crate::common::types::{Identification, MeasurementKind, Sdi12Value};
use crate::sensor::format;
use crate::sensor::interface::SensorInterface;
use crate::sensor::params::{Parameter, XcmdEntry, XcmdHandler, MAX_PARAMS, MAX_XCMDS};
use heapless::Vec;

/// Sensor response buffer length. The longest ASCII frame is
/// 1 + 75 + 3 + 2 = 81 bytes; the rest is headroom for binary pages.
pub const RESPONSE_BUF_LEN: usize = 256;

/// Sensor protocol state.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorState {
    /// Low power; only a break wakes the sensor.
    Standby,
    Ready,
    Measuring,
    MeasuringConcurrent,
    DataReady,
}

/// The measurement a sensor has been asked for, until its data pages
/// have been superseded.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
struct PendingMeasurement {
    kind: MeasurementKind,
    group: u8,
    crc: bool,
}

/// The responder role: applies the command grammar, steps the
/// measurement state machine and emits response frames through the
/// host's [`SensorInterface`].
pub struct SensorEngine<IF: SensorInterface> {
    interface: IF,
    address: Sdi12Addr,
    ident: Identification,
    params: Vec<Parameter, MAX_PARAMS>,
    xcmds: Vec<XcmdEntry, MAX_XCMDS>,
    state: SensorState,
    pending: Option<PendingMeasurement>,
    cache: Vec<Sdi12Value, MAX_PARAMS>,
    data_available: bool,
    resp_buf: [u8; RESPONSE_BUF_LEN],
}

impl<IF: SensorInterface> SensorEngine<IF> {
    /// Creates a sensor context. The persisted address (if the host has
    /// one and it is valid) wins over `default_address`.
    pub fn new(
        mut interface: IF,
        default_address: char,
        ident: Identification,
    ) -> Result<Self, Sdi12Error<IF::Error>> {
        let mut address = Sdi12Addr::new_sensor(default_address).map_err(widen)?;
        if let Some(saved) = interface.load_address() {
            if let Ok(saved) = Sdi12Addr::new_sensor(saved) {
                address = saved;
            }
        }
        Ok(Self {
            interface,
            address,
            ident,
            params: Vec::new(),
            xcmds: Vec::new(),
            state: SensorState::Ready,
            pending: None,
            cache: Vec::new(),
            data_available: false,
            resp_buf: [0; RESPONSE_BUF_LEN],
        })
    }

    pub fn address(&self) -> Sdi12Addr {
        self.address
    }

    pub fn state(&self) -> SensorState {
        self.state
    }

    pub fn data_available(&self) -> bool {
        self.data_available
    }

    /// Registers a measurement parameter; the returned index is what
    /// the read hook will be called with.
    pub fn register_param(&mut self, param: Parameter) -> Result<usize, Sdi12Error<IF::Error>> {
        self.params.push(param).map_err(|_| Sdi12Error::ParamLimit)?;
        Ok(self.params.len() - 1)
    }

    /// Registers an extended-command handler. Earlier registrations win
    /// on overlapping prefixes.
    pub fn register_xcmd(
        &mut self,
        prefix: &str,
        handler: XcmdHandler,
    ) -> Result<(), Sdi12Error<IF::Error>> {
        let entry = XcmdEntry::new(prefix, handler).map_err(widen)?;
        self.xcmds.push(entry).map_err(|_| Sdi12Error::ParamLimit)
    }

    /// Handles one complete command frame from the bus.
    ///
    /// Emits exactly one response for commands addressed here (wildcard
    /// included) and nothing at all otherwise — unaddressed traffic
    /// returns `NotAddressed`, malformed addressed traffic
    /// `InvalidCommand`, both with zero bytes on the wire.
    pub fn process(&mut self, raw: &[u8]) -> Result<(), Sdi12Error<IF::Error>> {
        if raw.is_empty() {
            return Err(Sdi12Error::InvalidCommand);
        }
        if raw[0] != b'?' && raw[0] != self.address.as_byte() {
            // Universal silence; a concurrent measurement in flight is
            // left untouched.
            return Err(Sdi12Error::NotAddressed);
        }
        if self.state == SensorState::Standby {
            return Err(Sdi12Error::NotAddressed);
        }

        let cmd = parse_command(raw).map_err(widen)?;

        // Addressed traffic during a measurement abandons it.
        if matches!(self.state, SensorState::Measuring | SensorState::MeasuringConcurrent) {
            self.pending = None;
            self.cache.clear();
            self.data_available = false;
            self.state = SensorState::Ready;
        }

        self.dispatch(&cmd)
    }

    /// Completes a deferred measurement with the acquired values.
    /// Ignored unless a deferred measurement is actually outstanding.
    pub fn measurement_done(&mut self, values: &[Sdi12Value]) -> Result<(), Sdi12Error<IF::Error>> {
        match self.state {
            SensorState::Measuring => {
                self.fill_cache(values);
                self.state = SensorState::DataReady;
                if !self.interface.service_request() {
                    let len = format::write_ack(&mut self.resp_buf, self.address).map_err(widen)?;
                    self.send_frame(len)?;
                }
                Ok(())
            }
            SensorState::MeasuringConcurrent => {
                self.fill_cache(values);
                self.state = SensorState::DataReady;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// A break on the bus: back to `Ready`, pending measurement and
    /// data cache gone, address and registrations intact.
    pub fn break_signal(&mut self) {
        self.state = SensorState::Ready;
        self.pending = None;
        self.cache.clear();
        self.data_available = false;
        self.interface.on_reset();
    }

    /// Host signal that the line has been marking long enough for
    /// low-power standby; the engine then ignores everything until the
    /// next break.
    pub fn standby(&mut self) {
        self.state = SensorState::Standby;
    }

    // --- Dispatch ---

    fn dispatch(&mut self, cmd: &Command<'_>) -> Result<(), Sdi12Error<IF::Error>> {
        match cmd {
            Command::Acknowledge { .. } | Command::AddressQuery => {
                let len = format::write_ack(&mut self.resp_buf, self.address).map_err(widen)?;
                self.send_frame(len)
            }
            Command::Identify { .. } => {
                let len =
                    format::write_identification(&mut self.resp_buf, self.address, &self.ident)
                        .map_err(widen)?;
                self.send_frame(len)
            }
            Command::Measure { crc, group, .. } => {
                self.begin_measurement(MeasurementKind::Standard, group.value(), *crc)
            }
            Command::Concurrent { crc, group, .. } => {
                self.begin_measurement(MeasurementKind::Concurrent, group.value(), *crc)
            }
            Command::Verify { .. } => {
                self.begin_measurement(MeasurementKind::Verification, 0, false)
            }
            Command::HighVolume { binary, crc, .. } => {
                let kind = if *binary {
                    MeasurementKind::HighVolumeBinary
                } else {
                    MeasurementKind::HighVolumeAscii
                };
                self.begin_measurement(kind, 0, *crc)
            }
            Command::HighVolumeStub { .. } => {
                let len = format::write_high_volume_stub(&mut self.resp_buf, self.address)
                    .map_err(widen)?;
                self.send_frame(len)
            }
            Command::SendData { page, .. } => self.send_data_page(page.value()),
            Command::SendBinaryData { page, .. } => self.send_binary_page(page.value()),
            Command::ReadContinuous { crc, index, .. } => {
                self.send_continuous(index.value(), *crc)
            }
            Command::ChangeAddress { new_address, .. } => {
                self.address = *new_address;
                self.interface.save_address(new_address.as_char());
                let len = format::write_ack(&mut self.resp_buf, self.address).map_err(widen)?;
                self.send_frame(len)
            }
            Command::IdentifyMeasurement { desc, .. } => self.send_identify_meta(desc),
            Command::Extended { body, .. } => self.run_extended(body),
        }
    }

    // --- Measurement lifecycle ---

    fn begin_measurement(
        &mut self,
        kind: MeasurementKind,
        group: u8,
        crc: bool,
    ) -> Result<(), Sdi12Error<IF::Error>> {
        self.cache.clear();
        self.data_available = false;
        self.pending = Some(PendingMeasurement { kind, group, crc });

        let count = self.group_len(group) as u16;
        let deferred =
            if count > 0 { self.interface.start_measurement(group, kind) } else { None };

        match deferred {
            Some(ttt) if ttt > 0 => {
                let ttt = ttt.min(999);
                self.state = match kind {
                    MeasurementKind::Standard | MeasurementKind::Verification => {
                        SensorState::Measuring
                    }
                    _ => SensorState::MeasuringConcurrent,
                };
                let len =
                    format::write_header(&mut self.resp_buf, self.address, ttt, count, kind)
                        .map_err(widen)?;
                self.send_frame(len)
            }
            _ => {
                // Synchronous path, also taken when the start hook
                // promises the data immediately.
                self.read_group_sync(group);
                self.state = SensorState::DataReady;
                let len = format::write_header(&mut self.resp_buf, self.address, 0, count, kind)
                    .map_err(widen)?;
                self.send_frame(len)
            }
        }
    }

    fn read_group_sync(&mut self, group: u8) {
        self.cache.clear();
        for index in 0..self.params.len() {
            let (pgroup, decimals) = {
                let p = &self.params[index];
                (p.group, p.decimals)
            };
            if pgroup != group {
                continue;
            }
            let raw = self.interface.read_param(index);
            let _ = self.cache.push(Sdi12Value::new(raw, decimals));
        }
        self.data_available = true;
    }

    fn fill_cache(&mut self, values: &[Sdi12Value]) {
        self.cache.clear();
        for value in values.iter().take(self.cache.capacity()) {
            let _ = self.cache.push(*value);
        }
        self.data_available = true;
    }

    // --- Data retrieval ---

    fn send_data_page(&mut self, page: u16) -> Result<(), Sdi12Error<IF::Error>> {
        let (kind, crc) = match self.pending {
            Some(p) => (p.kind, p.crc),
            None => (MeasurementKind::Standard, false),
        };
        let len = format::write_data_page(
            &mut self.resp_buf,
            self.address,
            &self.cache,
            page,
            kind.page_budget(),
            crc,
        )
        .map_err(widen)?;
        self.send_frame(len)
    }

    fn send_binary_page(&mut self, page: u16) -> Result<(), Sdi12Error<IF::Error>> {
        if self.pending.map(|p| p.kind) == Some(MeasurementKind::HighVolumeBinary) {
            let written =
                self.interface.format_binary_page(page, &self.cache, &mut self.resp_buf[3..]);
            if let Some(written) = written {
                let written = if written == 0 {
                    self.resp_buf[3] = 0x00; // empty packet indicator
                    1
                } else {
                    written.min(RESPONSE_BUF_LEN - 3)
                };
                let len = format::write_binary_packet(&mut self.resp_buf, self.address, written)
                    .map_err(widen)?;
                return self.send_frame(len);
            }
        }
        // No binary formatter (or no binary measurement pending): same
        // values under ASCII framing.
        self.send_data_page(page)
    }

    fn send_continuous(&mut self, index: u8, crc: bool) -> Result<(), Sdi12Error<IF::Error>> {
        let mut values: Vec<Sdi12Value, MAX_PARAMS> = Vec::new();
        for i in 0..self.params.len() {
            let (pgroup, decimals) = {
                let p = &self.params[i];
                (p.group, p.decimals)
            };
            if pgroup != index {
                continue;
            }
            let raw = self.interface.read_param(i);
            let _ = values.push(Sdi12Value::new(raw, decimals));
        }
        let len = format::write_data_page(
            &mut self.resp_buf,
            self.address,
            &values,
            0,
            MeasurementKind::Continuous.page_budget(),
            crc,
        )
        .map_err(widen)?;
        self.send_frame(len)
    }

    // --- Metadata ---

    fn send_identify_meta(
        &mut self,
        desc: &IdentifyDescriptor,
    ) -> Result<(), Sdi12Error<IF::Error>> {
        let group = desc.group.value();
        match desc.param {
            None => {
                // Header-shaped: zero wait, the group's declared size.
                let count = self.group_len(group) as u16;
                let len =
                    format::write_header(&mut self.resp_buf, self.address, 0, count, desc.kind)
                        .map_err(widen)?;
                self.send_frame(len)
            }
            Some(nnn) => {
                let param = self
                    .params
                    .iter()
                    .filter(|p| p.group == group)
                    .nth(nnn.value() as usize - 1);
                let len =
                    format::write_param_meta(&mut self.resp_buf, self.address, param, desc.crc)
                        .map_err(widen)?;
                self.send_frame(len)
            }
        }
    }

    // --- Extended commands ---

    fn run_extended(&mut self, body: &str) -> Result<(), Sdi12Error<IF::Error>> {
        let handler = self
            .xcmds
            .iter()
            .find(|e| body.starts_with(e.prefix.as_str()))
            .map(|e| e.handler);

        self.resp_buf[0] = self.address.as_byte();
        let written = match handler {
            // A failing handler gets the fail-safe bare-address reply.
            Some(handler) => handler(body, &mut self.resp_buf[1..]).unwrap_or(0),
            None => 0,
        };
        let mut len = 1 + written.min(RESPONSE_BUF_LEN - 1);
        if len < 3 || self.resp_buf[len - 2..len] != *b"\r\n" {
            if len + 2 > RESPONSE_BUF_LEN {
                return Err(Sdi12Error::BufferOverflow {
                    needed: len + 2,
                    got: RESPONSE_BUF_LEN,
                });
            }
            self.resp_buf[len] = b'\r';
            self.resp_buf[len + 1] = b'\n';
            len += 2;
        }
        self.send_frame(len)
    }

    // --- Helpers ---

    fn group_len(&self, group: u8) -> usize {
        self.params.iter().filter(|p| p.group == group).count()
    }

    fn send_frame(&mut self, len: usize) -> Result<(), Sdi12Error<IF::Error>> {
        self.interface.set_direction(LineDirection::Tx)?;
        let result = self.interface.send_response(&self.resp_buf[..len]);
        self.interface.set_direction(LineDirection::Rx)?;
        result?;
        Ok(())
    }
}
