//! A growable contiguous byte container used for encoder output and frame
//! assembly.
//!
//! `ByteBuffer` is a thin wrapper over `Vec<u8>` that grows geometrically
//! and never shrinks. Rust's borrow checker enforces the "no mutation
//! while a view is outstanding" contract that an unmanaged-memory
//! implementation would otherwise have to document as a caller obligation.

/// Minimum growth factor applied when `reserve` needs more capacity than
/// is currently available.
const GROWTH_FACTOR: usize = 2;

#[derive(Debug, Default, Clone)]
pub struct ByteBuffer {
    data: Vec<u8>,
}

impl ByteBuffer {
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
        }
    }

    /// Appends `bytes` to the buffer, growing geometrically if needed.
    pub fn append(&mut self, bytes: &[u8]) {
        self.reserve(bytes.len());
        self.data.extend_from_slice(bytes);
    }

    pub fn append_byte(&mut self, b: u8) {
        self.reserve(1);
        self.data.push(b);
    }

    /// Ensures capacity for at least `additional` more bytes without
    /// reallocating on every single append. Growth is at least 1.5x to
    /// amortize the cost of repeated small appends.
    pub fn reserve(&mut self, additional: usize) {
        let required = self.data.len() + additional;
        if required <= self.data.capacity() {
            return;
        }
        let grown = self.data.capacity() * GROWTH_FACTOR;
        let target = required.max(grown).max(64);
        self.data.reserve(target - self.data.len());
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn view(&self) -> &[u8] {
        &self.data
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Splits off and returns the first `n` bytes, leaving the remainder
    /// in place. Used by incremental parsers to discard consumed input.
    pub fn drain_front(&mut self, n: usize) -> Vec<u8> {
        let remainder = self.data.split_off(n);
        std::mem::replace(&mut self.data, remainder)
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }
}

impl From<Vec<u8>> for ByteBuffer {
    fn from(data: Vec<u8>) -> Self {
        Self { data }
    }
}

impl Extend<u8> for ByteBuffer {
    fn extend<T: IntoIterator<Item = u8>>(&mut self, iter: T) {
        self.data.extend(iter);
    }
}
