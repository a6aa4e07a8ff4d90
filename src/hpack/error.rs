/// Errors that occur while decoding or encoding an HPACK header block.
///
/// Every variant except those wrapping a malformed-input condition
/// corresponds to a specific failure mode called out in RFC 7541. Decoder
/// errors that stem from a violated invariant (index out of range,
/// oversized dynamic table size update, truncated Huffman string) must be
/// treated as a connection error by the caller: the dynamic table state is
/// no longer trustworthy once decoding fails partway through a block.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HpackError {
    #[error("integer primitive: {0}")]
    Integer(#[from] IntegerError),

    #[error("string primitive: {0}")]
    String(#[from] StringError),

    #[error("index {0} is outside the static+dynamic table range")]
    InvalidIndex(u64),

    #[error("dynamic table size update of {requested} exceeds the negotiated maximum of {max}")]
    DynamicTableSizeTooLarge { requested: u32, max: u32 },

    #[error("dynamic table size update appeared after other instructions in the header block")]
    TableSizeUpdateNotAtStart,

    #[error("header block ended with a truncated instruction")]
    TruncatedBlock,

    #[error("more data is needed to decode this header block")]
    NeedMoreData,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntegerError {
    #[error("not enough octets to decode the integer")]
    NotEnoughOctets,

    #[error("integer continuation exceeded the maximum representable length")]
    TooManyOctets,

    #[error("decoded integer overflowed a 32-bit value")]
    Overflow,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StringError {
    #[error("not enough octets to decode the string literal")]
    NotEnoughOctets,

    #[error("Huffman-encoded string contained an invalid or incomplete code")]
    InvalidHuffmanCode,

    #[error("Huffman-encoded string padding was not all-ones")]
    InvalidPadding,
}
