//! HTTP/1.x incremental parser and encoder (RFC 7230/7231).
//!
//! The parser is a resumable byte-oriented state machine: it never blocks,
//! never re-parses already-consumed bytes, and returns `Error::NeedMoreData`
//! instead of suspending when the input runs out mid-token.

mod encoder;
mod error;
mod message;
mod parser;

pub use encoder::{encode_request, encode_response};
pub use error::Error;
pub use message::{Header, Method, Request, Response, Version};
pub use parser::Parser;
