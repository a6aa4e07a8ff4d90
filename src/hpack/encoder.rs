use log::trace;

use super::dynamic_table::DynamicTable;
use super::primitives::{encode_integer, encode_string};
use super::static_table;

/// A header field to encode, with HPACK-level hints the caller controls:
/// whether it may be cached in the dynamic table and whether intermediaries
/// must forward it without re-encoding (`never_indexed`, RFC 7541 §7.1.3 —
/// for values like credentials the sender marks sensitive).
#[derive(Debug, Clone)]
pub struct HeaderToEncode {
    pub name: Vec<u8>,
    pub value: Vec<u8>,
    pub sensitive: bool,
}

impl HeaderToEncode {
    pub fn new(name: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            sensitive: false,
        }
    }

    pub fn sensitive(name: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            sensitive: true,
        }
    }
}

/// Encodes header lists into HPACK header blocks against a persistent
/// dynamic table, mirroring a peer [`Decoder`](super::decoder::Decoder)'s
/// state one block at a time.
pub struct Encoder {
    table: DynamicTable,
    use_huffman: bool,
    pending_resize: Option<usize>,
}

impl Encoder {
    pub fn new(max_table_size: usize) -> Self {
        Self {
            table: DynamicTable::new(max_table_size),
            use_huffman: true,
            pending_resize: None,
        }
    }

    pub fn set_huffman(&mut self, use_huffman: bool) {
        self.use_huffman = use_huffman;
    }

    /// Records a new table size ceiling (from the peer's
    /// SETTINGS_HEADER_TABLE_SIZE) to be applied via a dynamic table size
    /// update instruction prepended to the next encoded block, per RFC
    /// 7541 §6.3 — the table itself cannot shrink until that instruction
    /// is actually on the wire, or the peer's mirrored table would evict
    /// entries we never told it to evict.
    pub fn set_max_table_size(&mut self, new_max_size: usize) {
        self.pending_resize = Some(new_max_size);
    }

    /// Encodes a convenience `(name, value)` list with no sensitivity
    /// flags set, for tests and simple callers.
    pub fn encode(&mut self, headers: &[(Vec<u8>, Vec<u8>)]) -> Vec<u8> {
        let fields: Vec<HeaderToEncode> = headers
            .iter()
            .map(|(n, v)| HeaderToEncode::new(n.clone(), v.clone()))
            .collect();
        self.encode_fields(&fields)
    }

    pub fn encode_fields(&mut self, headers: &[HeaderToEncode]) -> Vec<u8> {
        let mut out = Vec::new();
        if let Some(new_max_size) = self.pending_resize.take() {
            encode_integer(&mut out, new_max_size as u64, 5, 0x20);
            self.table.set_max_size(new_max_size);
        }
        for header in headers {
            self.encode_one(header, &mut out);
        }
        out
    }

    fn encode_one(&mut self, header: &HeaderToEncode, out: &mut Vec<u8>) {
        let name = std::str::from_utf8(&header.name).ok();
        let value = std::str::from_utf8(&header.value).ok();
        let static_match = name.and_then(|n| value.map(|v| static_table::find(n, v)).flatten());

        if header.sensitive {
            self.encode_literal_never_indexed(header, static_match, out);
            return;
        }

        if let Some((index, full_match)) = static_match {
            if full_match {
                encode_integer(out, index, 7, 0x80);
                trace!("hpack: fully indexed static entry {}", index);
                return;
            }
        }

        self.encode_literal_with_indexing(header, static_match, out);
    }

    fn encode_literal_with_indexing(
        &mut self,
        header: &HeaderToEncode,
        static_match: Option<(u64, bool)>,
        out: &mut Vec<u8>,
    ) {
        match static_match {
            Some((index, _)) => encode_integer(out, index, 6, 0x40),
            None => {
                encode_integer(out, 0, 6, 0x40);
                encode_string(out, &header.name, self.use_huffman);
            }
        }
        encode_string(out, &header.value, self.use_huffman);
        self.table.insert(header.name.clone(), header.value.clone());
    }

    fn encode_literal_never_indexed(
        &mut self,
        header: &HeaderToEncode,
        static_match: Option<(u64, bool)>,
        out: &mut Vec<u8>,
    ) {
        match static_match {
            Some((index, _)) => encode_integer(out, index, 4, 0x10),
            None => {
                encode_integer(out, 0, 4, 0x10);
                encode_string(out, &header.name, self.use_huffman);
            }
        }
        encode_string(out, &header.value, self.use_huffman);
    }
}
