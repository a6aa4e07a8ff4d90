//! Connection `SETTINGS` values (RFC 7540 §6.5, §11.3) and the payload
//! parser/applier for the SETTINGS frame.

use super::error::{ErrorCode, H2Error};

#[allow(dead_code)]
pub mod settings_id {
    pub const HEADER_TABLE_SIZE: u16 = 0x1;
    pub const ENABLE_PUSH: u16 = 0x2;
    pub const MAX_CONCURRENT_STREAMS: u16 = 0x3;
    pub const INITIAL_WINDOW_SIZE: u16 = 0x4;
    pub const MAX_FRAME_SIZE: u16 = 0x5;
    pub const MAX_HEADER_LIST_SIZE: u16 = 0x6;
}

/// Sentinel standing in for the "unbounded" values spec.md expresses as
/// infinity: `MAX_CONCURRENT_STREAMS` and `MAX_HEADER_LIST_SIZE` have no
/// wire representation for "no limit", so the default is `u32::MAX`.
pub const UNBOUNDED: u32 = u32::MAX;

/// One side's negotiated connection settings. A `Settings` value always
/// represents the sender's expectation of its peer (RFC 7540 §6.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    pub header_table_size: u32,
    pub enable_push: bool,
    pub max_concurrent_streams: u32,
    pub initial_window_size: u32,
    pub max_frame_size: u32,
    pub max_header_list_size: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            header_table_size: 4096,
            enable_push: true,
            max_concurrent_streams: UNBOUNDED,
            initial_window_size: 65_535,
            max_frame_size: 16_384,
            max_header_list_size: UNBOUNDED,
        }
    }
}

impl Settings {
    /// Applies one `(identifier, value)` pair, validating ranges per
    /// RFC 7540 §6.5.2. Unknown identifiers are ignored (forward
    /// compatibility), not an error.
    pub fn apply(&mut self, id: u16, value: u32) -> Result<(), H2Error> {
        match id {
            settings_id::HEADER_TABLE_SIZE => self.header_table_size = value,
            settings_id::ENABLE_PUSH => {
                if value > 1 {
                    return Err(protocol_error("SETTINGS_ENABLE_PUSH must be 0 or 1"));
                }
                self.enable_push = value == 1;
            }
            settings_id::MAX_CONCURRENT_STREAMS => self.max_concurrent_streams = value,
            settings_id::INITIAL_WINDOW_SIZE => {
                if value > 0x7FFF_FFFF {
                    return Err(H2Error::Connection(
                        ErrorCode::FlowControlError,
                        "SETTINGS_INITIAL_WINDOW_SIZE exceeds 2^31-1".into(),
                    ));
                }
                self.initial_window_size = value;
            }
            settings_id::MAX_FRAME_SIZE => {
                if !(16_384..=16_777_215).contains(&value) {
                    return Err(protocol_error("SETTINGS_MAX_FRAME_SIZE out of range"));
                }
                self.max_frame_size = value;
            }
            settings_id::MAX_HEADER_LIST_SIZE => self.max_header_list_size = value,
            _ => {}
        }
        Ok(())
    }
}

fn protocol_error(msg: &str) -> H2Error {
    H2Error::Connection(ErrorCode::ProtocolError, msg.to_string())
}

/// Parses a SETTINGS frame payload into `(identifier, value)` pairs.
/// `length` must be a multiple of 6 octets (RFC 7540 §6.5).
pub fn parse_settings_payload(payload: &[u8]) -> Result<Vec<(u16, u32)>, H2Error> {
    if payload.len() % 6 != 0 {
        return Err(H2Error::Connection(
            ErrorCode::FrameSizeError,
            "SETTINGS payload length is not a multiple of 6".into(),
        ));
    }
    let mut entries = Vec::with_capacity(payload.len() / 6);
    let mut pos = 0;
    while pos + 6 <= payload.len() {
        let id = u16::from_be_bytes([payload[pos], payload[pos + 1]]);
        let value = u32::from_be_bytes([payload[pos + 2], payload[pos + 3], payload[pos + 4], payload[pos + 5]]);
        entries.push((id, value));
        pos += 6;
    }
    Ok(entries)
}
