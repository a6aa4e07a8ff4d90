//! Integration tests for the HTTP/2 frame codec and connection state
//! machine.

use httpcore_sansio::h2::{
    frame, frame_type, Connection, ConnectionState, ErrorCode, H2Event, Settings,
    CONNECTION_PREFACE,
};

fn settings_frame(entries: &[(u16, u32)]) -> Vec<u8> {
    frame::encode_settings(entries, false)
}

#[test]
fn preface_plus_empty_settings_activates_connection() {
    let mut conn = Connection::new_server(Settings::default());
    let mut input = CONNECTION_PREFACE.to_vec();
    input.extend_from_slice(&settings_frame(&[]));

    let events = conn.process(&input).unwrap();
    assert_eq!(conn.state(), ConnectionState::Active);
    assert!(matches!(&events[0], H2Event::Settings { settings } if settings.is_empty()));

    let outbound = conn.drain_outbound();
    assert!(!outbound.is_empty(), "a SETTINGS ACK should be queued");
}

#[test]
fn flow_control_overflow_on_stream_zero_is_a_connection_error() {
    let mut conn = Connection::new_server(Settings::default());
    let mut input = CONNECTION_PREFACE.to_vec();
    input.extend_from_slice(&settings_frame(&[]));
    input.extend_from_slice(&frame::encode_window_update(0, 0x7FFF_FFFF));

    let events = conn.process(&input).unwrap();
    let conn_error = events
        .iter()
        .find(|e| matches!(e, H2Event::ConnectionError { .. }))
        .expect("connection error event");
    assert!(matches!(conn_error, H2Event::ConnectionError { code: ErrorCode::FlowControlError, .. }));

    let outbound = conn.drain_outbound();
    let header = frame::FrameHeader::parse(&outbound).unwrap();
    assert_eq!(header.frame_type, frame_type::GOAWAY);
    assert_eq!(conn.state(), ConnectionState::Closed);
}

#[test]
fn window_update_of_2_pow_31_on_stream_zero_is_a_flow_control_error() {
    // The WINDOW_UPDATE increment field is 31 bits; an increment of
    // 2^31 has no representation in that field. The one raw 32-bit wire
    // value that denotes it is the reserved bit set with an otherwise
    // all-zero field (0x8000_0000), which must not be mistaken for an
    // ordinary zero increment.
    let mut conn = Connection::new_server(Settings::default());
    let mut input = CONNECTION_PREFACE.to_vec();
    input.extend_from_slice(&settings_frame(&[]));
    let header = frame::FrameHeader { length: 4, frame_type: frame_type::WINDOW_UPDATE, flags: 0, stream_id: 0 };
    input.extend_from_slice(&header.encode(&0x8000_0000u32.to_be_bytes()));

    let events = conn.process(&input).unwrap();
    assert!(events
        .iter()
        .any(|e| matches!(e, H2Event::ConnectionError { code: ErrorCode::FlowControlError, .. })));

    let outbound = conn.drain_outbound();
    let goaway_header = frame::FrameHeader::parse(&outbound).unwrap();
    assert_eq!(goaway_header.frame_type, frame_type::GOAWAY);
    assert_eq!(conn.state(), ConnectionState::Closed);
}

#[test]
fn zero_increment_window_update_on_a_stream_is_a_stream_error() {
    let mut conn = Connection::new_server(Settings::default());
    let mut input = CONNECTION_PREFACE.to_vec();
    input.extend_from_slice(&settings_frame(&[]));

    let mut encoder = httpcore_sansio::hpack::Encoder::new(4096);
    let block = encoder.encode(&[(b":method".to_vec(), b"GET".to_vec())]);
    input.extend_from_slice(&frame::encode_headers(1, &block, false, true));
    input.extend_from_slice(&frame::encode_window_update(1, 0));

    let events = conn.process(&input).unwrap();
    assert!(events
        .iter()
        .any(|e| matches!(e, H2Event::StreamError { stream_id: 1, code: ErrorCode::ProtocolError })));
    assert_eq!(conn.state(), ConnectionState::Active, "a stream error must not close the connection");
}

#[test]
fn headers_on_stream_zero_is_a_connection_error() {
    let mut conn = Connection::new_server(Settings::default());
    let mut input = CONNECTION_PREFACE.to_vec();
    input.extend_from_slice(&settings_frame(&[]));
    input.extend_from_slice(&frame::encode_headers(0, &[], true, true));

    let events = conn.process(&input).unwrap();
    assert!(events
        .iter()
        .any(|e| matches!(e, H2Event::ConnectionError { code: ErrorCode::ProtocolError, .. })));
}

#[test]
fn settings_on_a_non_zero_stream_is_a_connection_error() {
    let mut conn = Connection::new_server(Settings::default());
    let mut input = CONNECTION_PREFACE.to_vec();
    input.extend_from_slice(&settings_frame(&[]));
    let bad_settings = frame::FrameHeader { length: 0, frame_type: frame_type::SETTINGS, flags: 0, stream_id: 1 };
    input.extend_from_slice(&bad_settings.encode(&[]));

    let events = conn.process(&input).unwrap();
    assert!(events
        .iter()
        .any(|e| matches!(e, H2Event::ConnectionError { code: ErrorCode::ProtocolError, .. })));
}

#[test]
fn headers_split_across_continuation_reassembles_atomically() {
    let mut conn = Connection::new_server(Settings::default());
    let mut input = CONNECTION_PREFACE.to_vec();
    input.extend_from_slice(&settings_frame(&[]));

    let mut encoder = httpcore_sansio::hpack::Encoder::new(4096);
    let block = encoder.encode(&[
        (b":method".to_vec(), b"GET".to_vec()),
        (b"x-custom".to_vec(), b"value".to_vec()),
    ]);
    let (first_half, second_half) = block.split_at(block.len() / 2);

    input.extend_from_slice(&frame::encode_headers(1, first_half, true, false));
    input.extend_from_slice(&frame::encode_continuation(1, second_half, true));

    let events = conn.process(&input).unwrap();
    let headers_event = events.iter().find(|e| matches!(e, H2Event::Headers { .. })).unwrap();
    match headers_event {
        H2Event::Headers { stream_id, headers, end_stream } => {
            assert_eq!(*stream_id, 1);
            assert_eq!(headers.len(), 2);
            assert!(*end_stream);
        }
        _ => unreachable!(),
    }
}

#[test]
fn frame_interleaved_in_an_open_header_block_is_a_connection_error() {
    let mut conn = Connection::new_server(Settings::default());
    let mut input = CONNECTION_PREFACE.to_vec();
    input.extend_from_slice(&settings_frame(&[]));
    input.extend_from_slice(&frame::encode_headers(1, &[0x82], false, false));
    input.extend_from_slice(&frame::encode_data(1, b"oops", false));

    let events = conn.process(&input).unwrap();
    assert!(events
        .iter()
        .any(|e| matches!(e, H2Event::ConnectionError { code: ErrorCode::ProtocolError, .. })));
}

#[test]
fn data_frame_length_over_max_frame_size_is_frame_size_error() {
    let mut conn = Connection::new_server(Settings::default());
    let mut input = CONNECTION_PREFACE.to_vec();
    input.extend_from_slice(&settings_frame(&[]));

    let oversized = frame::FrameHeader { length: 20_000, frame_type: frame_type::DATA, flags: 0, stream_id: 1 };
    input.extend_from_slice(&oversized.encode(&vec![0u8; 20_000]));

    let events = conn.process(&input).unwrap();
    assert!(events
        .iter()
        .any(|e| matches!(e, H2Event::ConnectionError { code: ErrorCode::FrameSizeError, .. })));
}

#[test]
fn rst_stream_is_surfaced_as_a_stream_error_event() {
    let mut conn = Connection::new_server(Settings::default());
    let mut input = CONNECTION_PREFACE.to_vec();
    input.extend_from_slice(&settings_frame(&[]));
    input.extend_from_slice(&frame::encode_headers(1, &[0x82], true, true));
    input.extend_from_slice(&frame::encode_rst_stream(1, ErrorCode::Cancel));

    let events = conn.process(&input).unwrap();
    assert!(events
        .iter()
        .any(|e| matches!(e, H2Event::StreamError { stream_id: 1, code: ErrorCode::Cancel })));
}

#[test]
fn goaway_is_surfaced_with_last_stream_id_and_debug_data() {
    let mut conn = Connection::new_client(Settings::default());
    let mut input = settings_frame(&[]);
    input.extend_from_slice(&frame::encode_goaway(3, ErrorCode::NoError, b"bye"));

    let events = conn.process(&input).unwrap();
    assert!(events.iter().any(|e| matches!(
        e,
        H2Event::GoAway { last_stream_id: 3, code: ErrorCode::NoError, debug } if debug == b"bye"
    )));
    assert_eq!(conn.state(), ConnectionState::GoingAway);
}

#[test]
fn priority_on_stream_zero_is_a_connection_error() {
    let mut conn = Connection::new_server(Settings::default());
    let mut input = CONNECTION_PREFACE.to_vec();
    input.extend_from_slice(&settings_frame(&[]));
    let bad = frame::FrameHeader { length: 5, frame_type: frame_type::PRIORITY, flags: 0, stream_id: 0 };
    input.extend_from_slice(&bad.encode(&[0, 0, 0, 0, 16]));

    let events = conn.process(&input).unwrap();
    assert!(events
        .iter()
        .any(|e| matches!(e, H2Event::ConnectionError { code: ErrorCode::ProtocolError, .. })));
}

#[test]
fn rst_stream_on_stream_zero_is_a_connection_error() {
    let mut conn = Connection::new_server(Settings::default());
    let mut input = CONNECTION_PREFACE.to_vec();
    input.extend_from_slice(&settings_frame(&[]));
    input.extend_from_slice(&frame::encode_rst_stream(0, ErrorCode::Cancel));

    let events = conn.process(&input).unwrap();
    assert!(events
        .iter()
        .any(|e| matches!(e, H2Event::ConnectionError { code: ErrorCode::ProtocolError, .. })));
}

#[test]
fn push_promise_is_parsed_but_does_not_emit_a_headers_event() {
    let mut conn = Connection::new_client(Settings::default());
    let mut input = settings_frame(&[]);

    let mut encoder = httpcore_sansio::hpack::Encoder::new(4096);
    let block = encoder.encode(&[(b":method".to_vec(), b"GET".to_vec())]);
    let mut payload = 2u32.to_be_bytes().to_vec();
    payload.extend_from_slice(&block);
    let header = frame::FrameHeader {
        length: payload.len() as u32,
        frame_type: frame_type::PUSH_PROMISE,
        flags: frame::flags::END_HEADERS,
        stream_id: 1,
    };
    input.extend_from_slice(&header.encode(&payload));

    let events = conn.process(&input).unwrap();
    assert!(!events.iter().any(|e| matches!(e, H2Event::Headers { .. })));
    assert!(!events.iter().any(|e| matches!(e, H2Event::ConnectionError { .. })));
}

#[test]
fn push_promise_received_by_a_server_is_a_connection_error() {
    let mut conn = Connection::new_server(Settings::default());
    let mut input = CONNECTION_PREFACE.to_vec();
    input.extend_from_slice(&settings_frame(&[]));

    let mut payload = 2u32.to_be_bytes().to_vec();
    payload.extend_from_slice(&[0x82]);
    let header = frame::FrameHeader {
        length: payload.len() as u32,
        frame_type: frame_type::PUSH_PROMISE,
        flags: frame::flags::END_HEADERS,
        stream_id: 1,
    };
    input.extend_from_slice(&header.encode(&payload));

    let events = conn.process(&input).unwrap();
    assert!(events
        .iter()
        .any(|e| matches!(e, H2Event::ConnectionError { code: ErrorCode::ProtocolError, .. })));
}

#[test]
fn push_promise_rejected_when_enable_push_is_disabled() {
    let mut settings = Settings::default();
    settings.enable_push = false;
    let mut conn = Connection::new_client(settings);
    let mut input = settings_frame(&[]);

    let mut payload = 2u32.to_be_bytes().to_vec();
    payload.extend_from_slice(&[0x82]);
    let header = frame::FrameHeader {
        length: payload.len() as u32,
        frame_type: frame_type::PUSH_PROMISE,
        flags: frame::flags::END_HEADERS,
        stream_id: 1,
    };
    input.extend_from_slice(&header.encode(&payload));

    let events = conn.process(&input).unwrap();
    assert!(events
        .iter()
        .any(|e| matches!(e, H2Event::ConnectionError { code: ErrorCode::ProtocolError, .. })));
}

#[test]
fn client_preface_carries_the_connection_preface_and_initial_settings() {
    let conn = Connection::new_client(Settings::default());
    let out = conn.preface();
    assert!(out.starts_with(CONNECTION_PREFACE));
    let header = frame::FrameHeader::parse(&out[CONNECTION_PREFACE.len()..]).unwrap();
    assert_eq!(header.frame_type, frame_type::SETTINGS);
    assert!(!header.is_ack());
}

#[test]
fn goaway_on_a_non_zero_stream_is_a_connection_error() {
    let mut conn = Connection::new_server(Settings::default());
    let mut input = CONNECTION_PREFACE.to_vec();
    input.extend_from_slice(&settings_frame(&[]));
    let bad = frame::FrameHeader { length: 8, frame_type: frame_type::GOAWAY, flags: 0, stream_id: 1 };
    input.extend_from_slice(&bad.encode(&[0, 0, 0, 0, 0, 0, 0, 0]));

    let events = conn.process(&input).unwrap();
    assert!(events
        .iter()
        .any(|e| matches!(e, H2Event::ConnectionError { code: ErrorCode::ProtocolError, .. })));
}
