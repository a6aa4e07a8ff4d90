use log::trace;

use super::dynamic_table::DynamicTable;
use super::error::HpackError;
use super::primitives::{decode_integer, decode_string};

/// One decoded header field, with HPACK-level metadata the caller may need
/// to forward unchanged (e.g. never-indexed fields must not be cached by
/// an intermediary).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedHeader {
    pub name: Vec<u8>,
    pub value: Vec<u8>,
    pub never_indexed: bool,
}

/// Decodes HPACK header blocks against a persistent dynamic table.
///
/// One `Decoder` is bound to one HTTP/2 connection's decompression
/// context; its dynamic table accumulates state across header blocks for
/// the lifetime of the connection.
pub struct Decoder {
    table: DynamicTable,
    max_table_size: usize,
}

impl Decoder {
    pub fn new(max_table_size: usize) -> Self {
        Self {
            table: DynamicTable::new(max_table_size),
            max_table_size,
        }
    }

    /// Updates the table size ceiling negotiated via SETTINGS_HEADER_TABLE_SIZE.
    /// Does not itself resize the table; the peer must still send an explicit
    /// dynamic table size update instruction for that.
    pub fn set_max_table_size(&mut self, max_table_size: usize) {
        self.max_table_size = max_table_size;
        if self.table.max_size() > max_table_size {
            self.table.set_max_size(max_table_size);
        }
    }

    pub fn decode(&mut self, block: &[u8]) -> Result<Vec<DecodedHeader>, HpackError> {
        let mut headers = Vec::new();
        let mut pos = 0usize;
        // RFC 7541 §4.2: a dynamic table size update instruction is only
        // legal before any other instruction in the header block.
        let mut seen_other_instruction = false;

        while pos < block.len() {
            let byte = block[pos];
            if byte & 0x20 != 0 && byte & 0xC0 == 0 {
                if seen_other_instruction {
                    return Err(HpackError::TableSizeUpdateNotAtStart);
                }
                pos += self.decode_dynamic_table_size_update(&block[pos..])?;
                continue;
            }
            seen_other_instruction = true;
            if byte & 0x80 != 0 {
                pos += self.decode_indexed(&block[pos..], &mut headers)?;
            } else if byte & 0x40 != 0 {
                pos += self.decode_literal_with_indexing(&block[pos..], &mut headers)?;
            } else if byte & 0x10 != 0 {
                pos += self.decode_literal_never_indexed(&block[pos..], &mut headers)?;
            } else {
                pos += self.decode_literal_without_indexing(&block[pos..], &mut headers)?;
            }
        }

        Ok(headers)
    }

    fn decode_indexed(
        &mut self,
        buf: &[u8],
        headers: &mut Vec<DecodedHeader>,
    ) -> Result<usize, HpackError> {
        let (index, consumed) = decode_integer(buf, 7)?;
        if index == 0 {
            return Err(HpackError::InvalidIndex(0));
        }
        let (name, value) = self
            .table
            .resolve(index)
            .ok_or(HpackError::InvalidIndex(index))?;
        headers.push(DecodedHeader {
            name: name.to_vec(),
            value: value.to_vec(),
            never_indexed: false,
        });
        trace!("hpack: indexed field at {}", index);
        Ok(consumed)
    }

    fn decode_literal_with_indexing(
        &mut self,
        buf: &[u8],
        headers: &mut Vec<DecodedHeader>,
    ) -> Result<usize, HpackError> {
        let (index, mut consumed) = decode_integer(buf, 6)?;
        let name = if index == 0 {
            let (name, n) = decode_string(&buf[consumed..])?;
            consumed += n;
            name
        } else {
            let (name, _) = self
                .table
                .resolve(index)
                .ok_or(HpackError::InvalidIndex(index))?;
            name.to_vec()
        };
        let (value, n) = decode_string(&buf[consumed..])?;
        consumed += n;

        self.table.insert(name.clone(), value.clone());
        headers.push(DecodedHeader {
            name,
            value,
            never_indexed: false,
        });
        Ok(consumed)
    }

    fn decode_literal_without_indexing(
        &mut self,
        buf: &[u8],
        headers: &mut Vec<DecodedHeader>,
    ) -> Result<usize, HpackError> {
        self.decode_literal_non_indexing(buf, headers, 4, false)
    }

    fn decode_literal_never_indexed(
        &mut self,
        buf: &[u8],
        headers: &mut Vec<DecodedHeader>,
    ) -> Result<usize, HpackError> {
        self.decode_literal_non_indexing(buf, headers, 4, true)
    }

    fn decode_literal_non_indexing(
        &mut self,
        buf: &[u8],
        headers: &mut Vec<DecodedHeader>,
        prefix_bits: u8,
        never_indexed: bool,
    ) -> Result<usize, HpackError> {
        let (index, mut consumed) = decode_integer(buf, prefix_bits)?;
        let name = if index == 0 {
            let (name, n) = decode_string(&buf[consumed..])?;
            consumed += n;
            name
        } else {
            let (name, _) = self
                .table
                .resolve(index)
                .ok_or(HpackError::InvalidIndex(index))?;
            name.to_vec()
        };
        let (value, n) = decode_string(&buf[consumed..])?;
        consumed += n;

        headers.push(DecodedHeader {
            name,
            value,
            never_indexed,
        });
        Ok(consumed)
    }

    fn decode_dynamic_table_size_update(&mut self, buf: &[u8]) -> Result<usize, HpackError> {
        let (new_size, consumed) = decode_integer(buf, 5)?;
        if new_size as usize > self.max_table_size {
            return Err(HpackError::DynamicTableSizeTooLarge {
                requested: new_size as u32,
                max: self.max_table_size as u32,
            });
        }
        self.table.set_max_size(new_size as usize);
        trace!("hpack: dynamic table resized to {}", new_size);
        Ok(consumed)
    }
}
