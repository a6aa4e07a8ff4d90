//! Per-stream lifecycle, flow control, and header-block reassembly
//! (RFC 7540 §5.1, §5.3 is out of scope, §6.9).

use std::collections::HashMap;

use super::error::{ErrorCode, H2Error};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamLifecycle {
    Idle,
    Open,
    HalfClosedLocal,
    HalfClosedRemote,
    Closed,
}

#[derive(Debug, Clone)]
pub struct Stream {
    pub id: u32,
    pub state: StreamLifecycle,
    pub send_window: i64,
    pub recv_window: i64,
}

impl Stream {
    fn new(id: u32, initial_window_size: u32) -> Self {
        Self {
            id,
            state: StreamLifecycle::Open,
            send_window: initial_window_size as i64,
            recv_window: initial_window_size as i64,
        }
    }
}

/// Header block currently being reassembled across HEADERS +
/// CONTINUATION frames (RFC 7540 §4.3 atomicity).
#[derive(Debug)]
pub struct PendingHeaderBlock {
    pub stream_id: u32,
    pub end_stream: bool,
    pub block: Vec<u8>,
    /// `false` for a PUSH_PROMISE's header block: it must still flow
    /// through the HPACK decoder to keep the dynamic table in sync with
    /// the peer's encoder, but reception is parsed only, never acted on,
    /// so no [`H2Event::Headers`](super::connection::H2Event::Headers) is
    /// emitted for it.
    pub emits_event: bool,
}

/// Maximum accumulated header block size across HEADERS + CONTINUATION
/// frames, guarding against unbounded memory growth from a CONTINUATION
/// flood.
pub const MAX_HEADER_BLOCK_SIZE: usize = 256 * 1024;

/// Tracks every stream on one connection direction's view plus the two
/// connection-level flow-control windows.
#[derive(Debug)]
pub struct StreamManager {
    streams: HashMap<u32, Stream>,
    highest_client_id: u32,
    highest_server_id: u32,
    pub conn_send_window: i64,
    pub conn_recv_window: i64,
    pub max_concurrent_streams: u32,
    pub pending_header_block: Option<PendingHeaderBlock>,
}

impl StreamManager {
    pub fn new(initial_window_size: u32, max_concurrent_streams: u32) -> Self {
        Self {
            streams: HashMap::new(),
            highest_client_id: 0,
            highest_server_id: 0,
            conn_send_window: initial_window_size as i64,
            conn_recv_window: initial_window_size as i64,
            max_concurrent_streams,
            pending_header_block: None,
        }
    }

    pub fn get(&self, id: u32) -> Option<&Stream> {
        self.streams.get(&id)
    }

    fn active_count(&self) -> usize {
        self.streams
            .values()
            .filter(|s| !matches!(s.state, StreamLifecycle::Idle | StreamLifecycle::Closed))
            .count()
    }

    /// Creates a stream on first reference, inheriting the connection's
    /// *currently negotiated* INITIAL_WINDOW_SIZE at the moment of
    /// creation rather than a fixed global default.
    pub fn get_or_create(&mut self, id: u32, initial_window_size: u32) -> Result<&mut Stream, H2Error> {
        if !self.streams.contains_key(&id) {
            let is_client_id = id % 2 == 1;
            let highest = if is_client_id { &mut self.highest_client_id } else { &mut self.highest_server_id };
            if id != 0 && id <= *highest {
                return Err(H2Error::Connection(
                    ErrorCode::ProtocolError,
                    format!("stream id {} is not greater than previously seen id {}", id, highest),
                ));
            }
            if id != 0 {
                *highest = id;
            }
            if self.active_count() >= self.max_concurrent_streams as usize {
                return Err(H2Error::Stream(id, ErrorCode::RefusedStream));
            }
            self.streams.insert(id, Stream::new(id, initial_window_size));
        }
        Ok(self.streams.get_mut(&id).expect("just inserted or present"))
    }

    pub fn on_end_stream_sent_or_received(&mut self, id: u32, local: bool) {
        if let Some(stream) = self.streams.get_mut(&id) {
            stream.state = match stream.state {
                StreamLifecycle::Open if local => StreamLifecycle::HalfClosedLocal,
                StreamLifecycle::Open => StreamLifecycle::HalfClosedRemote,
                StreamLifecycle::HalfClosedLocal if !local => StreamLifecycle::Closed,
                StreamLifecycle::HalfClosedRemote if local => StreamLifecycle::Closed,
                other => other,
            };
        }
    }

    pub fn reset_stream(&mut self, id: u32) {
        if let Some(stream) = self.streams.get_mut(&id) {
            stream.state = StreamLifecycle::Closed;
        }
    }

    /// Applies a WINDOW_UPDATE increment, to the connection window if
    /// `stream_id == 0`, else to that stream's window. `raw_increment` is
    /// the frame's full 32-bit field exactly as it arrived, reserved bit
    /// included — the reserved bit is ordinarily ignored (RFC 7540 §6.9),
    /// but a raw value of exactly `2^31` (reserved bit set, 31-bit
    /// increment field all zero) is the one bit pattern that denotes an
    /// increment one past the largest representable window increment
    /// (`2^31 - 1`); masking it down to a 0 increment would hide that
    /// out-of-range request behind the ordinary "zero increment" rule, so
    /// it is rejected as a flow-control error before masking. Otherwise
    /// rejects a masked increment of zero and any update that would push
    /// the window past `2^31 - 1`.
    pub fn apply_window_update(&mut self, stream_id: u32, raw_increment: u32) -> Result<(), H2Error> {
        if raw_increment == 0x8000_0000 {
            return Err(if stream_id == 0 {
                H2Error::Connection(ErrorCode::FlowControlError, "WINDOW_UPDATE increment of 2^31 exceeds the legal range".into())
            } else {
                H2Error::Stream(stream_id, ErrorCode::FlowControlError)
            });
        }
        let increment = raw_increment & 0x7FFF_FFFF;
        if increment == 0 {
            return Err(if stream_id == 0 {
                H2Error::Connection(ErrorCode::ProtocolError, "WINDOW_UPDATE increment of 0 on connection".into())
            } else {
                H2Error::Stream(stream_id, ErrorCode::ProtocolError)
            });
        }
        const MAX_WINDOW: i64 = 0x7FFF_FFFF;
        if stream_id == 0 {
            let updated = self.conn_send_window + increment as i64;
            if updated > MAX_WINDOW {
                return Err(H2Error::Connection(ErrorCode::FlowControlError, "connection send window overflow".into()));
            }
            self.conn_send_window = updated;
        } else {
            let stream = self
                .streams
                .get_mut(&stream_id)
                .ok_or(H2Error::Stream(stream_id, ErrorCode::StreamClosed))?;
            let updated = stream.send_window + increment as i64;
            if updated > MAX_WINDOW {
                return Err(H2Error::Stream(stream_id, ErrorCode::FlowControlError));
            }
            stream.send_window = updated;
        }
        Ok(())
    }

    /// Accounts for received DATA bytes against both the stream and
    /// connection receive windows.
    pub fn consume_recv_window(&mut self, stream_id: u32, len: usize) -> Result<(), H2Error> {
        self.conn_recv_window -= len as i64;
        if self.conn_recv_window < 0 {
            return Err(H2Error::Connection(ErrorCode::FlowControlError, "connection receive window exceeded".into()));
        }
        if let Some(stream) = self.streams.get_mut(&stream_id) {
            stream.recv_window -= len as i64;
            if stream.recv_window < 0 {
                return Err(H2Error::Stream(stream_id, ErrorCode::FlowControlError));
            }
        }
        Ok(())
    }

    pub fn has_open_header_block(&self) -> bool {
        self.pending_header_block.is_some()
    }

    pub fn begin_header_block(&mut self, stream_id: u32, end_stream: bool, initial: Vec<u8>) -> Result<(), H2Error> {
        self.begin_header_block_inner(stream_id, end_stream, initial, true)
    }

    /// Like [`Self::begin_header_block`], but for a PUSH_PROMISE block:
    /// the decoded result will be discarded by the caller (see
    /// [`PendingHeaderBlock::emits_event`]).
    pub fn begin_push_promise_header_block(&mut self, stream_id: u32, initial: Vec<u8>) -> Result<(), H2Error> {
        self.begin_header_block_inner(stream_id, false, initial, false)
    }

    fn begin_header_block_inner(
        &mut self,
        stream_id: u32,
        end_stream: bool,
        initial: Vec<u8>,
        emits_event: bool,
    ) -> Result<(), H2Error> {
        if initial.len() > MAX_HEADER_BLOCK_SIZE {
            return Err(H2Error::Connection(ErrorCode::EnhanceYourCalm, "header block too large".into()));
        }
        self.pending_header_block = Some(PendingHeaderBlock { stream_id, end_stream, block: initial, emits_event });
        Ok(())
    }

    pub fn append_continuation(&mut self, stream_id: u32, fragment: &[u8]) -> Result<(), H2Error> {
        let pending = self
            .pending_header_block
            .as_mut()
            .ok_or_else(|| H2Error::Connection(ErrorCode::ProtocolError, "unexpected CONTINUATION frame".into()))?;
        if pending.stream_id != stream_id {
            return Err(H2Error::Connection(
                ErrorCode::ProtocolError,
                format!("CONTINUATION for stream {} while stream {} has an open header block", stream_id, pending.stream_id),
            ));
        }
        if pending.block.len() + fragment.len() > MAX_HEADER_BLOCK_SIZE {
            self.pending_header_block = None;
            return Err(H2Error::Connection(ErrorCode::EnhanceYourCalm, "header block too large".into()));
        }
        pending.block.extend_from_slice(fragment);
        Ok(())
    }

    pub fn take_header_block(&mut self) -> Option<PendingHeaderBlock> {
        self.pending_header_block.take()
    }
}
