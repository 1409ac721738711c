// src/sensor/interface.rs

use crate::common::frame::LineDirection;
use crate::common::types::{MeasurementKind, Sdi12Value};
use core::fmt::Debug;

/// The I/O capability a host supplies to run a sensor.
///
/// The three required methods cover the response path and value
/// acquisition. Everything else is an optional hook with a default
/// implementation; the engine adapts to whichever hooks the host
/// overrides (deferred measurements, non-volatile address storage,
/// binary page formatting).
pub trait SensorInterface {
    /// Host I/O error type. Must implement Debug for error reporting.
    type Error: Debug;

    /// Puts a complete response frame on the bus. Called with the line
    /// already turned around; may block for the frame duration.
    fn send_response(&mut self, bytes: &[u8]) -> Result<(), Self::Error>;

    /// Turns the line driver around.
    fn set_direction(&mut self, direction: LineDirection) -> Result<(), Self::Error>;

    /// Reads the current value of the parameter at `index` (registration
    /// order). Must finish well inside the 15 ms response budget; slow
    /// acquisitions belong behind [`start_measurement`].
    ///
    /// [`start_measurement`]: SensorInterface::start_measurement
    fn read_param(&mut self, index: usize) -> f32;

    /// Loads a persisted address, if the host has one.
    fn load_address(&mut self) -> Option<char> {
        None
    }

    /// Persists a changed address.
    fn save_address(&mut self, _address: char) {}

    /// Begins a deferred measurement of `group`, returning the expected
    /// wait in seconds (clamped to 0..=999 by the engine). Returning
    /// `None` keeps the measurement synchronous. The host later calls
    /// `SensorEngine::measurement_done` with the acquired values.
    fn start_measurement(&mut self, _group: u8, _kind: MeasurementKind) -> Option<u16> {
        None
    }

    /// Emits the service request (`a<CR><LF>`) itself. Return `true` if
    /// handled; otherwise the engine sends it through `send_response`.
    fn service_request(&mut self) -> bool {
        false
    }

    /// Observes a bus break / engine reset.
    fn on_reset(&mut self) {}

    /// Formats one binary high-volume page. `out[0]` receives the
    /// element type code, the payload follows; returns the total bytes
    /// written (1 + payload length). Returning `None` (the default)
    /// makes all binary data requests degrade to ASCII framing.
    fn format_binary_page(
        &mut self,
        _page: u16,
        _values: &[Sdi12Value],
        _out: &mut [u8],
    ) -> Option<usize> {
        None
    }
}
