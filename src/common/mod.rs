// src/common/mod.rs

pub mod address;
pub mod command;
pub mod crc;
pub mod error;
pub mod frame;
pub mod hal_traits;
pub mod timing;
pub mod types;
pub mod value;

// --- Re-export key types/traits/functions for easier access ---

pub use address::Sdi12Addr;

pub use command::{
    parse_command, Command, DataIndex, GroupIndex, IdentifyDescriptor, IdentifyParameterIndex,
};

pub use crc::{
    append_response_crc, calculate_crc16, decode_crc_ascii, decode_crc_binary, encode_crc_ascii,
    encode_crc_binary, verify_packet_crc_binary, verify_response_crc, verify_response_crc_ascii,
};

pub use error::Sdi12Error;

pub use frame::{FrameFormat, LineDirection};

pub use hal_traits::{Sdi12Instant, Sdi12Serial, Sdi12Timer};

pub use types::{BinaryDataType, Identification, MeasurementKind, Sdi12Value};

pub use value::{format_value, parse_values, MAX_VALUE_LEN};
