// src/recorder/mod.rs

pub mod engine;
pub mod interface;
pub mod response;

pub use engine::{Recorder, MAX_BINARY_PAYLOAD, RECV_BUF_LEN};
pub use interface::{RecorderInterface, SerialLink};
pub use response::{
    BinaryPacket, DataResponse, IdentResponse, MeasResponse, ParamMetaResponse, MAX_DATA_VALUES,
};
