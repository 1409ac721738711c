// src/sensor/mod.rs

pub mod engine;
pub mod format;
pub mod interface;
pub mod params;

pub use engine::{SensorEngine, SensorState, RESPONSE_BUF_LEN};
pub use interface::SensorInterface;
pub use params::{Parameter, XcmdEntry, XcmdHandler, MAX_PARAMS, MAX_XCMDS};
