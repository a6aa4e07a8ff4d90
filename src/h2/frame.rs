//! 9-octet frame header parsing/encoding and per-type payload stripping
//! (RFC 7540 §4, §6).

use super::error::{ErrorCode, H2Error};

#[allow(dead_code)]
pub mod frame_type {
    pub const DATA: u8 = 0x0;
    pub const HEADERS: u8 = 0x1;
    pub const PRIORITY: u8 = 0x2;
    pub const RST_STREAM: u8 = 0x3;
    pub const SETTINGS: u8 = 0x4;
    pub const PUSH_PROMISE: u8 = 0x5;
    pub const PING: u8 = 0x6;
    pub const GOAWAY: u8 = 0x7;
    pub const WINDOW_UPDATE: u8 = 0x8;
    pub const CONTINUATION: u8 = 0x9;
}

#[allow(dead_code)]
pub mod flags {
    pub const END_STREAM: u8 = 0x1;
    pub const ACK: u8 = 0x1;
    pub const END_HEADERS: u8 = 0x4;
    pub const PADDED: u8 = 0x8;
    pub const PRIORITY: u8 = 0x20;
}

/// The fixed 24-octet client connection preface (RFC 7540 §3.5).
pub const CONNECTION_PREFACE: &[u8] = b"PRI * HTTP/2.0\r\n\r\nSM\r\n\r\n";

pub fn is_h2c_preface(data: &[u8]) -> bool {
    data.len() >= CONNECTION_PREFACE.len() && &data[..CONNECTION_PREFACE.len()] == CONNECTION_PREFACE
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub length: u32,
    pub frame_type: u8,
    pub flags: u8,
    pub stream_id: u32,
}

impl FrameHeader {
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < 9 {
            return None;
        }
        let length = ((data[0] as u32) << 16) | ((data[1] as u32) << 8) | (data[2] as u32);
        let frame_type = data[3];
        let flags = data[4];
        let stream_id = ((data[5] as u32) << 24)
            | ((data[6] as u32) << 16)
            | ((data[7] as u32) << 8)
            | (data[8] as u32);
        let stream_id = stream_id & 0x7FFF_FFFF;
        Some(Self { length, frame_type, flags, stream_id })
    }

    pub fn total_size(&self) -> usize {
        9 + self.length as usize
    }

    pub fn is_end_stream(&self) -> bool {
        self.flags & flags::END_STREAM != 0
    }

    pub fn is_end_headers(&self) -> bool {
        self.flags & flags::END_HEADERS != 0
    }

    pub fn is_ack(&self) -> bool {
        self.flags & flags::ACK != 0
    }

    pub fn is_padded(&self) -> bool {
        self.flags & flags::PADDED != 0
    }

    pub fn is_priority(&self) -> bool {
        self.flags & flags::PRIORITY != 0
    }

    fn encode_prefix(&self, payload_len: usize) -> [u8; 9] {
        let length = payload_len as u32;
        [
            (length >> 16) as u8,
            (length >> 8) as u8,
            length as u8,
            self.frame_type,
            self.flags,
            (self.stream_id >> 24) as u8,
            (self.stream_id >> 16) as u8,
            (self.stream_id >> 8) as u8,
            self.stream_id as u8,
        ]
    }

    pub fn encode(&self, payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(9 + payload.len());
        out.extend_from_slice(&self.encode_prefix(payload.len()));
        out.extend_from_slice(payload);
        out
    }
}

/// Strips DATA's optional pad-length byte and trailing padding (RFC 7540
/// §6.1).
pub fn extract_data_payload(header: &FrameHeader, mut payload: Vec<u8>) -> Result<Vec<u8>, H2Error> {
    if header.is_padded() {
        if payload.is_empty() {
            return Err(frame_size_error());
        }
        let pad_length = payload[0] as usize;
        if pad_length >= payload.len() {
            return Err(frame_size_error());
        }
        payload.truncate(payload.len() - pad_length);
        payload.remove(0);
    }
    Ok(payload)
}

/// Strips HEADERS' optional PADDED and PRIORITY prefix/suffix, returning
/// the remaining header block fragment plus the parsed priority (if any).
pub fn extract_headers_payload(
    header: &FrameHeader,
    mut payload: Vec<u8>,
) -> Result<Vec<u8>, H2Error> {
    let mut offset = 0usize;
    let mut end = payload.len();

    if header.is_padded() {
        if payload.is_empty() {
            return Err(frame_size_error());
        }
        let pad_length = payload[0] as usize;
        offset = 1;
        if offset + pad_length > payload.len() {
            return Err(frame_size_error());
        }
        end = payload.len() - pad_length;
    }

    if header.is_priority() {
        if end.saturating_sub(offset) < 5 {
            return Err(frame_size_error());
        }
        offset += 5;
    }

    if offset == 0 && end == payload.len() {
        return Ok(payload);
    }
    payload.truncate(end);
    if offset > 0 {
        payload.drain(..offset);
    }
    Ok(payload)
}

/// Strips PUSH_PROMISE's optional PADDED prefix/suffix and the mandatory
/// 4-octet promised-stream-id, returning `(promised_stream_id, fragment)`.
pub fn extract_push_promise_payload(
    header: &FrameHeader,
    mut payload: Vec<u8>,
) -> Result<(u32, Vec<u8>), H2Error> {
    let mut offset = 0usize;
    let mut end = payload.len();

    if header.is_padded() {
        if payload.is_empty() {
            return Err(frame_size_error());
        }
        let pad_length = payload[0] as usize;
        offset = 1;
        if offset + pad_length > payload.len() {
            return Err(frame_size_error());
        }
        end = payload.len() - pad_length;
    }

    if end.saturating_sub(offset) < 4 {
        return Err(frame_size_error());
    }
    let promised_stream_id = u32::from_be_bytes([
        payload[offset],
        payload[offset + 1],
        payload[offset + 2],
        payload[offset + 3],
    ]) & 0x7FFF_FFFF;
    offset += 4;

    payload.truncate(end);
    payload.drain(..offset);
    Ok((promised_stream_id, payload))
}

fn frame_size_error() -> H2Error {
    H2Error::Connection(ErrorCode::FrameSizeError, "malformed frame payload".into())
}

pub fn encode_settings(entries: &[(u16, u32)], ack: bool) -> Vec<u8> {
    let header = FrameHeader {
        length: 0,
        frame_type: frame_type::SETTINGS,
        flags: if ack { flags::ACK } else { 0 },
        stream_id: 0,
    };
    if ack {
        return header.encode(&[]);
    }
    let mut payload = Vec::with_capacity(entries.len() * 6);
    for &(id, value) in entries {
        payload.extend_from_slice(&id.to_be_bytes());
        payload.extend_from_slice(&value.to_be_bytes());
    }
    header.encode(&payload)
}

pub fn encode_window_update(stream_id: u32, increment: u32) -> Vec<u8> {
    let header = FrameHeader { length: 4, frame_type: frame_type::WINDOW_UPDATE, flags: 0, stream_id };
    header.encode(&(increment & 0x7FFF_FFFF).to_be_bytes())
}

pub fn encode_rst_stream(stream_id: u32, error_code: ErrorCode) -> Vec<u8> {
    let header = FrameHeader { length: 4, frame_type: frame_type::RST_STREAM, flags: 0, stream_id };
    header.encode(&error_code.as_u32().to_be_bytes())
}

pub fn encode_goaway(last_stream_id: u32, error_code: ErrorCode, debug: &[u8]) -> Vec<u8> {
    let header = FrameHeader {
        length: (8 + debug.len()) as u32,
        frame_type: frame_type::GOAWAY,
        flags: 0,
        stream_id: 0,
    };
    let mut payload = Vec::with_capacity(8 + debug.len());
    payload.extend_from_slice(&(last_stream_id & 0x7FFF_FFFF).to_be_bytes());
    payload.extend_from_slice(&error_code.as_u32().to_be_bytes());
    payload.extend_from_slice(debug);
    header.encode(&payload)
}

pub fn encode_ping(data: [u8; 8], ack: bool) -> Vec<u8> {
    let header = FrameHeader {
        length: 8,
        frame_type: frame_type::PING,
        flags: if ack { flags::ACK } else { 0 },
        stream_id: 0,
    };
    header.encode(&data)
}

pub fn encode_headers(stream_id: u32, header_block: &[u8], end_stream: bool, end_headers: bool) -> Vec<u8> {
    let mut frame_flags = 0u8;
    if end_stream {
        frame_flags |= flags::END_STREAM;
    }
    if end_headers {
        frame_flags |= flags::END_HEADERS;
    }
    let header = FrameHeader {
        length: header_block.len() as u32,
        frame_type: frame_type::HEADERS,
        flags: frame_flags,
        stream_id,
    };
    header.encode(header_block)
}

pub fn encode_continuation(stream_id: u32, payload: &[u8], end_headers: bool) -> Vec<u8> {
    let header = FrameHeader {
        length: payload.len() as u32,
        frame_type: frame_type::CONTINUATION,
        flags: if end_headers { flags::END_HEADERS } else { 0 },
        stream_id,
    };
    header.encode(payload)
}

pub fn encode_data(stream_id: u32, data: &[u8], end_stream: bool) -> Vec<u8> {
    let header = FrameHeader {
        length: data.len() as u32,
        frame_type: frame_type::DATA,
        flags: if end_stream { flags::END_STREAM } else { 0 },
        stream_id,
    };
    header.encode(data)
}
