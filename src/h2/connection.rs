//! Connection state machine: preface handshake, frame dispatch, and
//! callback-equivalent event emission (RFC 7540 §3.5, §4, §6).

use log::{debug, trace, warn};

use crate::hpack::{Decoder as HpackDecoder, DecodedHeader, Encoder as HpackEncoder};

use super::error::{ErrorCode, H2Error};
use super::frame::{self, frame_type, FrameHeader, CONNECTION_PREFACE};
use super::settings::{parse_settings_payload, settings_id, Settings};
use super::stream::StreamManager;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Client,
    Server,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    AwaitingPreface,
    AwaitingInitialSettings,
    Active,
    GoingAway,
    Closed,
}

/// Callback-equivalent output of [`Connection::process`]. Events are
/// returned in wire order, in a single `Vec`, rather than invoked through
/// a callback trait — the caller dispatches however it prefers; ordering
/// within one `process` call matches spec's callback ordering guarantees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum H2Event {
    Headers { stream_id: u32, headers: Vec<DecodedHeader>, end_stream: bool },
    Data { stream_id: u32, data: Vec<u8>, end_stream: bool },
    StreamEnd { stream_id: u32 },
    StreamError { stream_id: u32, code: ErrorCode },
    ConnectionError { code: ErrorCode, debug: String },
    Settings { settings: Vec<(u16, u32)> },
    Ping { ack: bool, data: [u8; 8] },
    GoAway { last_stream_id: u32, code: ErrorCode, debug: Vec<u8> },
}

/// Ties the frame codec, HPACK contexts, and stream manager together for
/// one HTTP/2 connection direction.
pub struct Connection {
    role: Role,
    state: ConnectionState,
    local_settings: Settings,
    peer_settings: Settings,
    hpack_decoder: HpackDecoder,
    hpack_encoder: HpackEncoder,
    streams: StreamManager,
    buffer: Vec<u8>,
    outbound: Vec<u8>,
    peer_goaway_last_stream_id: Option<u32>,
    last_processed_stream_id: u32,
    next_client_stream_id: u32,
}

impl Connection {
    pub fn new_client(local_settings: Settings) -> Self {
        Self::new(Role::Client, local_settings, ConnectionState::AwaitingInitialSettings)
    }

    pub fn new_server(local_settings: Settings) -> Self {
        Self::new(Role::Server, local_settings, ConnectionState::AwaitingPreface)
    }

    fn new(role: Role, local_settings: Settings, state: ConnectionState) -> Self {
        Self {
            role,
            state,
            local_settings,
            peer_settings: Settings::default(),
            hpack_decoder: HpackDecoder::new(local_settings.header_table_size as usize),
            hpack_encoder: HpackEncoder::new(Settings::default().header_table_size as usize),
            streams: StreamManager::new(Settings::default().initial_window_size, local_settings.max_concurrent_streams),
            buffer: Vec::new(),
            outbound: Vec::new(),
            peer_goaway_last_stream_id: None,
            last_processed_stream_id: 0,
            next_client_stream_id: 1,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// The 24-octet preface plus an initial SETTINGS frame, sent once by a
    /// client at connection start (RFC 7540 §3.5). Servers never send a
    /// preface of their own.
    pub fn preface(&self) -> Vec<u8> {
        let mut out = CONNECTION_PREFACE.to_vec();
        out.extend_from_slice(&self.initial_settings_frame());
        out
    }

    fn initial_settings_frame(&self) -> Vec<u8> {
        let s = &self.local_settings;
        frame::encode_settings(
            &[
                (settings_id::HEADER_TABLE_SIZE, s.header_table_size),
                (settings_id::ENABLE_PUSH, s.enable_push as u32),
                (settings_id::INITIAL_WINDOW_SIZE, s.initial_window_size),
                (settings_id::MAX_FRAME_SIZE, s.max_frame_size),
            ],
            false,
        )
    }

    /// Drains frames the connection itself queued (SETTINGS ACKs,
    /// RST_STREAM on stream errors, GOAWAY on connection errors) for the
    /// caller to write to its transport.
    pub fn drain_outbound(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.outbound)
    }

    pub fn send_data(&mut self, stream_id: u32, data: &[u8], end_stream: bool) -> Vec<u8> {
        if end_stream {
            self.streams.on_end_stream_sent_or_received(stream_id, true);
        }
        frame::encode_data(stream_id, data, end_stream)
    }

    pub fn send_headers(&mut self, stream_id: u32, headers: &[(Vec<u8>, Vec<u8>)], end_stream: bool) -> Vec<u8> {
        self.streams
            .get_or_create(stream_id, self.peer_settings.initial_window_size)
            .ok();
        let block = self.hpack_encoder.encode(headers);
        if end_stream {
            self.streams.on_end_stream_sent_or_received(stream_id, true);
        }
        frame::encode_headers(stream_id, &block, end_stream, true)
    }

    /// Allocates the next client-initiated stream id (odd, monotonically
    /// increasing) and emits a HEADERS frame on it — the client-side
    /// counterpart of [`Connection::send_response`].
    pub fn send_request(&mut self, headers: &[(Vec<u8>, Vec<u8>)], end_stream: bool) -> (u32, Vec<u8>) {
        let stream_id = self.next_client_stream_id;
        self.next_client_stream_id += 2;
        (stream_id, self.send_headers(stream_id, headers, end_stream))
    }

    /// Emits a HEADERS frame carrying a response on an already-referenced
    /// stream (opened by the peer's HEADERS).
    pub fn send_response(&mut self, stream_id: u32, headers: &[(Vec<u8>, Vec<u8>)], end_stream: bool) -> Vec<u8> {
        self.send_headers(stream_id, headers, end_stream)
    }

    /// Applies `entries` to this side's advertised settings and encodes
    /// them as a non-ACK SETTINGS frame for the caller to send.
    pub fn send_settings(&mut self, entries: &[(u16, u32)]) -> Vec<u8> {
        for &(id, value) in entries {
            let _ = self.local_settings.apply(id, value);
        }
        frame::encode_settings(entries, false)
    }

    pub fn send_window_update(&mut self, stream_id: u32, increment: u32) -> Vec<u8> {
        frame::encode_window_update(stream_id, increment)
    }

    pub fn send_ping(&self, data: [u8; 8], ack: bool) -> Vec<u8> {
        frame::encode_ping(data, ack)
    }

    /// Enqueues a RST_STREAM and marks the stream closed locally — the
    /// caller's cancellation primitive (spec §5).
    pub fn send_rst_stream(&mut self, stream_id: u32, code: ErrorCode) -> Vec<u8> {
        self.streams.reset_stream(stream_id);
        frame::encode_rst_stream(stream_id, code)
    }

    pub fn send_goaway(&mut self, code: ErrorCode, debug: &[u8]) -> Vec<u8> {
        self.state = ConnectionState::GoingAway;
        frame::encode_goaway(self.last_processed_stream_id, code, debug)
    }

    /// Feeds newly arrived bytes, advances the connection state machine,
    /// and returns the events produced (in wire order).
    pub fn process(&mut self, data: &[u8]) -> Result<Vec<H2Event>, H2Error> {
        self.buffer.extend_from_slice(data);
        let mut events = Vec::new();

        if self.state == ConnectionState::AwaitingPreface {
            if self.buffer.len() < CONNECTION_PREFACE.len() {
                return Ok(events);
            }
            if &self.buffer[..CONNECTION_PREFACE.len()] != CONNECTION_PREFACE {
                self.fail_connection(ErrorCode::ProtocolError, "missing HTTP/2 connection preface".into(), &mut events);
                return Ok(events);
            }
            self.buffer.drain(..CONNECTION_PREFACE.len());
            self.state = ConnectionState::AwaitingInitialSettings;
        }

        loop {
            if self.state == ConnectionState::Closed {
                break;
            }
            if self.buffer.len() < 9 {
                break;
            }
            let header = match FrameHeader::parse(&self.buffer) {
                Some(h) => h,
                None => break,
            };
            if header.length > self.local_settings.max_frame_size {
                self.fail_connection(ErrorCode::FrameSizeError, "frame length exceeds max_frame_size".into(), &mut events);
                break;
            }
            if self.buffer.len() < header.total_size() {
                break;
            }

            let remainder = self.buffer.split_off(header.total_size());
            let mut frame_bytes = std::mem::replace(&mut self.buffer, remainder);
            let payload = if frame_bytes.len() > 9 {
                frame_bytes.drain(..9);
                frame_bytes
            } else {
                Vec::new()
            };

            self.last_processed_stream_id = self.last_processed_stream_id.max(header.stream_id);

            if self.state == ConnectionState::AwaitingInitialSettings {
                if header.frame_type != frame_type::SETTINGS || header.is_ack() {
                    self.fail_connection(
                        ErrorCode::ProtocolError,
                        "first frame on the connection must be a non-ACK SETTINGS frame".into(),
                        &mut events,
                    );
                    break;
                }
            }

            match self.dispatch_frame(&header, payload, &mut events) {
                Ok(()) => {}
                Err(H2Error::Connection(code, debug)) => {
                    self.fail_connection(code, debug, &mut events);
                    break;
                }
                Err(H2Error::Stream(stream_id, code)) => {
                    events.push(H2Event::StreamError { stream_id, code });
                    let rst = self.send_rst_stream(stream_id, code);
                    self.outbound.extend_from_slice(&rst);
                }
                Err(H2Error::NeedMoreData) | Err(H2Error::FrameTooLarge) => unreachable!("frame fully buffered"),
            }

            if self.state == ConnectionState::AwaitingInitialSettings {
                self.state = ConnectionState::Active;
            }
        }

        Ok(events)
    }

    fn fail_connection(&mut self, code: ErrorCode, debug: String, events: &mut Vec<H2Event>) {
        warn!("h2 connection error: {} ({})", code, debug);
        events.push(H2Event::ConnectionError { code, debug: debug.clone() });
        let goaway = self.send_goaway(code, debug.as_bytes());
        self.outbound.extend_from_slice(&goaway);
        self.state = ConnectionState::Closed;
    }

    fn dispatch_frame(
        &mut self,
        header: &FrameHeader,
        payload: Vec<u8>,
        events: &mut Vec<H2Event>,
    ) -> Result<(), H2Error> {
        if self.streams.has_open_header_block() {
            let expects_continuation = header.frame_type == frame_type::CONTINUATION;
            if !expects_continuation {
                return Err(H2Error::Connection(
                    ErrorCode::ProtocolError,
                    "frame received while a HEADERS block is still open".into(),
                ));
            }
        }

        match header.frame_type {
            frame_type::DATA => self.on_data(header, payload, events),
            frame_type::HEADERS => self.on_headers(header, payload, events),
            frame_type::CONTINUATION => self.on_continuation(header, payload, events),
            frame_type::PRIORITY => {
                if header.stream_id == 0 {
                    return Err(H2Error::Connection(ErrorCode::ProtocolError, "PRIORITY on stream 0".into()));
                }
                if payload.len() != 5 {
                    return Err(H2Error::Stream(header.stream_id, ErrorCode::FrameSizeError));
                }
                Ok(())
            }
            frame_type::RST_STREAM => self.on_rst_stream(header, payload, events),
            frame_type::SETTINGS => self.on_settings(header, payload, events),
            frame_type::PUSH_PROMISE => self.on_push_promise(header, payload, events),
            frame_type::PING => self.on_ping(header, payload, events),
            frame_type::GOAWAY => self.on_goaway(header, payload, events),
            frame_type::WINDOW_UPDATE => self.on_window_update(header, payload),
            _ => {
                trace!("h2: discarding unknown frame type {}", header.frame_type);
                Ok(())
            }
        }
    }

    fn on_data(&mut self, header: &FrameHeader, payload: Vec<u8>, events: &mut Vec<H2Event>) -> Result<(), H2Error> {
        if header.stream_id == 0 {
            return Err(H2Error::Connection(ErrorCode::ProtocolError, "DATA on stream 0".into()));
        }
        let data = frame::extract_data_payload(header, payload)?;
        self.streams.consume_recv_window(header.stream_id, header.length as usize)?;
        let end_stream = header.is_end_stream();
        if end_stream {
            self.streams.on_end_stream_sent_or_received(header.stream_id, false);
        }
        events.push(H2Event::Data { stream_id: header.stream_id, data, end_stream });
        if end_stream {
            events.push(H2Event::StreamEnd { stream_id: header.stream_id });
        }
        Ok(())
    }

    fn on_headers(&mut self, header: &FrameHeader, payload: Vec<u8>, events: &mut Vec<H2Event>) -> Result<(), H2Error> {
        if header.stream_id == 0 {
            return Err(H2Error::Connection(ErrorCode::ProtocolError, "HEADERS on stream 0".into()));
        }
        if let Some(last_id) = self.peer_goaway_last_stream_id {
            if self.streams.get(header.stream_id).is_none() && header.stream_id > last_id {
                return Err(H2Error::Stream(header.stream_id, ErrorCode::RefusedStream));
            }
        }
        self.streams.get_or_create(header.stream_id, self.peer_settings.initial_window_size)?;
        let block = frame::extract_headers_payload(header, payload)?;
        let end_stream = header.is_end_stream();

        if header.is_end_headers() {
            self.finish_header_block(header.stream_id, end_stream, block, true, events)
        } else {
            self.streams.begin_header_block(header.stream_id, end_stream, block)
        }
    }

    fn on_continuation(&mut self, header: &FrameHeader, payload: Vec<u8>, events: &mut Vec<H2Event>) -> Result<(), H2Error> {
        self.streams.append_continuation(header.stream_id, &payload)?;
        if header.is_end_headers() {
            let pending = self.streams.take_header_block().expect("append_continuation validated it exists");
            self.finish_header_block(pending.stream_id, pending.end_stream, pending.block, pending.emits_event, events)
        } else {
            Ok(())
        }
    }

    fn finish_header_block(
        &mut self,
        stream_id: u32,
        end_stream: bool,
        block: Vec<u8>,
        emits_event: bool,
        events: &mut Vec<H2Event>,
    ) -> Result<(), H2Error> {
        let decoded = self
            .hpack_decoder
            .decode(&block)
            .map_err(|e| H2Error::Connection(ErrorCode::CompressionError, e.to_string()))?;
        debug!("h2: decoded {} header fields on stream {}", decoded.len(), stream_id);
        if !emits_event {
            // PUSH_PROMISE: decoding only keeps the dynamic table in sync
            // with the peer's encoder. Reception is parsed, not acted on.
            return Ok(());
        }
        if end_stream {
            self.streams.on_end_stream_sent_or_received(stream_id, false);
        }
        events.push(H2Event::Headers { stream_id, headers: decoded, end_stream });
        if end_stream {
            events.push(H2Event::StreamEnd { stream_id });
        }
        Ok(())
    }

    fn on_rst_stream(&mut self, header: &FrameHeader, payload: Vec<u8>, events: &mut Vec<H2Event>) -> Result<(), H2Error> {
        if header.stream_id == 0 {
            return Err(H2Error::Connection(ErrorCode::ProtocolError, "RST_STREAM on stream 0".into()));
        }
        if payload.len() != 4 {
            return Err(H2Error::Connection(ErrorCode::FrameSizeError, "RST_STREAM payload must be 4 bytes".into()));
        }
        let code = ErrorCode::from(u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]));
        self.streams.reset_stream(header.stream_id);
        events.push(H2Event::StreamError { stream_id: header.stream_id, code });
        Ok(())
    }

    fn on_settings(&mut self, header: &FrameHeader, payload: Vec<u8>, events: &mut Vec<H2Event>) -> Result<(), H2Error> {
        if header.stream_id != 0 {
            return Err(H2Error::Connection(ErrorCode::ProtocolError, "SETTINGS on a non-zero stream".into()));
        }
        if header.is_ack() {
            trace!("h2: received SETTINGS ACK");
            return Ok(());
        }
        let entries = parse_settings_payload(&payload)?;
        for &(id, value) in &entries {
            self.peer_settings.apply(id, value)?;
            if id == settings_id::HEADER_TABLE_SIZE {
                self.hpack_encoder.set_max_table_size(value as usize);
            }
        }
        events.push(H2Event::Settings { settings: entries });
        self.outbound.extend_from_slice(&frame::encode_settings(&[], true));
        Ok(())
    }

    fn on_push_promise(&mut self, header: &FrameHeader, payload: Vec<u8>, events: &mut Vec<H2Event>) -> Result<(), H2Error> {
        if header.stream_id == 0 {
            return Err(H2Error::Connection(ErrorCode::ProtocolError, "PUSH_PROMISE on stream 0".into()));
        }
        if self.role == Role::Server {
            return Err(H2Error::Connection(ErrorCode::ProtocolError, "a server must never receive PUSH_PROMISE".into()));
        }
        if !self.local_settings.enable_push {
            return Err(H2Error::Connection(ErrorCode::ProtocolError, "PUSH_PROMISE received with ENABLE_PUSH=0".into()));
        }
        // Reception is parsed only to preserve header-block atomicity and
        // HPACK dynamic-table synchronization; server push generation and
        // promised-stream dispatch are out of scope.
        let (_promised_stream_id, fragment) = frame::extract_push_promise_payload(header, payload)?;
        if header.is_end_headers() {
            self.finish_header_block(header.stream_id, false, fragment, false, events)
        } else {
            self.streams.begin_push_promise_header_block(header.stream_id, fragment)
        }
    }

    fn on_ping(&mut self, header: &FrameHeader, payload: Vec<u8>, events: &mut Vec<H2Event>) -> Result<(), H2Error> {
        if header.stream_id != 0 {
            return Err(H2Error::Connection(ErrorCode::ProtocolError, "PING on a non-zero stream".into()));
        }
        if payload.len() != 8 {
            return Err(H2Error::Connection(ErrorCode::FrameSizeError, "PING payload must be 8 bytes".into()));
        }
        let mut data = [0u8; 8];
        data.copy_from_slice(&payload);
        let ack = header.is_ack();
        events.push(H2Event::Ping { ack, data });
        Ok(())
    }

    fn on_goaway(&mut self, header: &FrameHeader, payload: Vec<u8>, events: &mut Vec<H2Event>) -> Result<(), H2Error> {
        if header.stream_id != 0 {
            return Err(H2Error::Connection(ErrorCode::ProtocolError, "GOAWAY on a non-zero stream".into()));
        }
        if payload.len() < 8 {
            return Err(H2Error::Connection(ErrorCode::FrameSizeError, "GOAWAY payload too short".into()));
        }
        let last_stream_id = u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]) & 0x7FFF_FFFF;
        let code = ErrorCode::from(u32::from_be_bytes([payload[4], payload[5], payload[6], payload[7]]));
        let debug = payload[8..].to_vec();
        self.peer_goaway_last_stream_id = Some(last_stream_id);
        self.state = ConnectionState::GoingAway;
        events.push(H2Event::GoAway { last_stream_id, code, debug });
        Ok(())
    }

    fn on_window_update(&mut self, header: &FrameHeader, payload: Vec<u8>) -> Result<(), H2Error> {
        if payload.len() != 4 {
            return Err(H2Error::Connection(ErrorCode::FrameSizeError, "WINDOW_UPDATE payload must be 4 bytes".into()));
        }
        let raw = u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]);
        self.streams.apply_window_update(header.stream_id, raw)
    }
}
