//! Minimal end-to-end demo: parse an HTTP/1.1 request off the wire, then
//! drive a server-side HTTP/2 connection through a preface, a SETTINGS
//! frame, and a single HEADERS frame.
//!
//! Run with `RUST_LOG=trace cargo run --example roundtrip` to see the
//! crate's internal `log` output (frame dispatch, HPACK table updates).

use httpcore_sansio::h2::{frame, Connection, Settings, CONNECTION_PREFACE};
use httpcore_sansio::hpack::{Encoder as HpackEncoder, STATIC_TABLE};
use httpcore_sansio::http1::{Parser, Request};

fn main() {
    env_logger::init();

    let mut parser = Parser::new();
    let mut request = Request::new();
    let input = b"GET /index.html HTTP/1.1\r\nHost: example.com\r\n\r\n";
    match parser.parse_request(input, &mut request) {
        Ok(consumed) => println!(
            "http/1.1: {} {:?} ({} bytes consumed)",
            request.method,
            String::from_utf8_lossy(&request.target),
            consumed
        ),
        Err(e) => println!("http/1.1: {}", e),
    }
    println!("static table entry 2 is {:?}", STATIC_TABLE[1]);

    let mut conn = Connection::new_server(Settings::default());
    let mut wire = CONNECTION_PREFACE.to_vec();
    wire.extend_from_slice(&frame::encode_settings(&[], false));

    let mut encoder = HpackEncoder::new(4096);
    let block = encoder.encode(&[
        (b":method".to_vec(), b"GET".to_vec()),
        (b":path".to_vec(), b"/index.html".to_vec()),
    ]);
    wire.extend_from_slice(&frame::encode_headers(1, &block, true, true));

    let events = conn.process(&wire).expect("well-formed demo input");
    for event in &events {
        println!("h2 event: {:?}", event);
    }
    println!("{} bytes queued for the transport", conn.drain_outbound().len());
}
