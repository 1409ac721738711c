// src/common/error.rs

/// Crate-wide error type, generic over the host's I/O error.
///
/// The variants form a closed set shared by both protocol roles. The
/// sensor engine returns `NotAddressed` / `InvalidCommand` for traffic it
/// must stay silent on; the recorder surfaces everything except the
/// timeout that `acknowledge` converts into "sensor absent".
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum Sdi12Error<E = ()>
where
    E: core::fmt::Debug,
{
    /// Underlying I/O error from the host capability.
    #[error("I/O error: {0:?}")]
    Io(E),

    /// No (complete) response arrived within the timeout budget.
    #[error("Operation timed out")]
    Timeout,

    /// Character is not a valid SDI-12 address.
    #[error("Invalid SDI-12 address character: '{0}'")]
    InvalidAddress(char),

    /// Command bytes do not form any recognized SDI-12 command.
    #[error("Invalid or malformed command")]
    InvalidCommand,

    /// A response or packet would not fit the available buffer.
    #[error("Buffer overflow: needed {needed}, got {got}")]
    BufferOverflow { needed: usize, got: usize },

    /// The command targets a different sensor; no bytes may be emitted.
    #[error("Command addressed to another sensor")]
    NotAddressed,

    /// A response carried no payload where one was required.
    #[error("No data in response")]
    NoData,

    /// Registration table (parameters or extended commands) is full.
    #[error("Registration table full")]
    ParamLimit,

    /// A required host hook is not installed.
    #[error("Required callback not installed")]
    CallbackMissing,

    /// Received CRC does not match the calculated one.
    #[error("CRC mismatch: expected {expected:#06x}, calculated {calculated:#06x}")]
    CrcMismatch { expected: u16, calculated: u16 },

    /// Response framing or field layout did not parse.
    #[error("Response failed to parse")]
    ParseFailed,

    /// The sensor aborted the measurement (empty CRC'd data response).
    #[error("Measurement aborted by sensor")]
    Aborted,
}

// Allow mapping from the underlying host error via `?`.
impl<E: core::fmt::Debug> From<E> for Sdi12Error<E> {
    fn from(e: E) -> Self {
        Sdi12Error::Io(e)
    }
}

/// Widens an infallible protocol error into one carrying the host's
/// I/O error type. Parsing helpers never do I/O, so their errors have
/// `E = ()` and get widened at the engine boundary.
pub fn widen<E: core::fmt::Debug>(e: Sdi12Error<()>) -> Sdi12Error<E> {
    match e {
        Sdi12Error::Io(()) => Sdi12Error::ParseFailed,
        Sdi12Error::Timeout => Sdi12Error::Timeout,
        Sdi12Error::InvalidAddress(c) => Sdi12Error::InvalidAddress(c),
        Sdi12Error::InvalidCommand => Sdi12Error::InvalidCommand,
        Sdi12Error::BufferOverflow { needed, got } => Sdi12Error::BufferOverflow { needed, got },
        Sdi12Error::NotAddressed => Sdi12Error::NotAddressed,
        Sdi12Error::NoData => Sdi12Error::NoData,
        Sdi12Error::ParamLimit => Sdi12Error::ParamLimit,
        Sdi12Error::CallbackMissing => Sdi12Error::CallbackMissing,
        Sdi12Error::CrcMismatch { expected, calculated } => {
            Sdi12Error::CrcMismatch { expected, calculated }
        }
        Sdi12Error::ParseFailed => Sdi12Error::ParseFailed,
        Sdi12Error::Aborted => Sdi12Error::Aborted,
    }
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct MockIoError;

    #[test]
    fn test_from_host_error() {
        let e: Sdi12Error<MockIoError> = MockIoError.into();
        assert_eq!(e, Sdi12Error::Io(MockIoError));
    }

    #[test]
    fn test_widen_preserves_fields() {
        let e: Sdi12Error<MockIoError> =
            widen(Sdi12Error::CrcMismatch { expected: 0x1234, calculated: 0x4321 });
        assert_eq!(e, Sdi12Error::CrcMismatch { expected: 0x1234, calculated: 0x4321 });

        let e: Sdi12Error<MockIoError> = widen(Sdi12Error::InvalidAddress('$'));
        assert_eq!(e, Sdi12Error::InvalidAddress('$'));
    }
}
