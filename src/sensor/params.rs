// src/sensor/params.rs

use crate::common::error::Sdi12Error;
use crate::common::types::{SHEF_LEN, UNITS_LEN};
use arrayvec::ArrayString;

/// Capacity of the parameter table.
pub const MAX_PARAMS: usize = 20;
/// Capacity of the extended-command table.
pub const MAX_XCMDS: usize = 8;

pub const XCMD_PREFIX_LEN: usize = 15;

/// One registered measurement parameter. Registration order is the
/// parameter index handed to the read hook; `group` selects which
/// measurement commands serve it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub shef: ArrayString<SHEF_LEN>,
    pub units: ArrayString<UNITS_LEN>,
    pub group: u8,
    pub decimals: u8,
}

impl Parameter {
    pub fn new(shef: &str, units: &str, group: u8, decimals: u8) -> Result<Self, Sdi12Error<()>> {
        if group > 9 || decimals > 7 {
            return Err(Sdi12Error::InvalidCommand);
        }
        Ok(Self {
            shef: ArrayString::from(shef).map_err(|_| Sdi12Error::BufferOverflow {
                needed: shef.len(),
                got: SHEF_LEN,
            })?,
            units: ArrayString::from(units).map_err(|_| Sdi12Error::BufferOverflow {
                needed: units.len(),
                got: UNITS_LEN,
            })?,
            group,
            decimals,
        })
    }
}

/// Handler for a manufacturer-defined (`aX...!`) command. Receives the
/// command body after `aX` and a response region that starts right
/// after the address byte; returns the number of bytes written.
pub type XcmdHandler = fn(body: &str, resp: &mut [u8]) -> Result<usize, ()>;

/// One extended-command registration; the first entry whose prefix
/// matches the start of the body wins.
#[derive(Clone)]
pub struct XcmdEntry {
    pub prefix: ArrayString<XCMD_PREFIX_LEN>,
    pub handler: XcmdHandler,
}

impl XcmdEntry {
    pub fn new(prefix: &str, handler: XcmdHandler) -> Result<Self, Sdi12Error<()>> {
        Ok(Self {
            prefix: ArrayString::from(prefix).map_err(|_| Sdi12Error::BufferOverflow {
                needed: prefix.len(),
                got: XCMD_PREFIX_LEN,
            })?,
            handler,
        })
    }
}

impl core::fmt::Debug for XcmdEntry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("XcmdEntry").field("prefix", &self.prefix.as_str()).finish()
    }
}
