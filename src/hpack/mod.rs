//! HPACK header compression (RFC 7541): static and dynamic tables,
//! canonical Huffman coding, and header block encode/decode.

mod decoder;
mod dynamic_table;
mod encoder;
mod error;
mod huffman;
mod primitives;
mod static_table;

pub use decoder::{DecodedHeader, Decoder};
pub use encoder::{Encoder, HeaderToEncode};
pub use error::{HpackError, IntegerError, StringError};
pub use static_table::STATIC_TABLE;

/// Default SETTINGS_HEADER_TABLE_SIZE per RFC 7540 §6.5.2.
pub const DEFAULT_HEADER_TABLE_SIZE: usize = 4096;
