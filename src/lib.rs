//! httpcore-sansio: a sans-I/O HTTP/1.x and HTTP/2 codec.
//!
//! This crate parses and encodes HTTP messages and frames without owning
//! any transport. Callers feed it byte slices as they arrive (from a
//! socket, a WASM host, a test harness) and drive the resulting state
//! machines forward; the crate never blocks, never spawns, and never
//! assumes an async runtime.
//!
//! # Modules
//!
//! - [`http1`]: incremental HTTP/1.x request/response parsing and encoding
//!   (RFC 7230/7231).
//! - [`hpack`]: HPACK header compression (RFC 7541) — static/dynamic
//!   tables, Huffman coding, and the encoder/decoder pair.
//! - [`h2`]: HTTP/2 framing, SETTINGS negotiation, stream lifecycle, flow
//!   control, and the connection state machine (RFC 7540).
//! - [`buffer`]: the growable byte buffer the parsers build on.
//!
//! # Quick start (HTTP/2 server side)
//!
//! ```rust
//! use httpcore_sansio::h2::{Connection, Settings};
//!
//! let mut conn = Connection::new_server(Settings::default());
//! let events = conn.process(b"").unwrap();
//! assert!(events.is_empty());
//! for frame in conn.drain_outbound() {
//!     let _ = frame; // write to your transport
//! }
//! ```
//!
//! # Non-goals
//!
//! This crate does not open sockets, negotiate TLS/ALPN, or run an event
//! loop — all I/O and scheduling belong to the embedder.

pub mod buffer;
pub mod h2;
pub mod hpack;
pub mod http1;

pub use buffer::ByteBuffer;
