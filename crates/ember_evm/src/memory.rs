use ember_primitives::{Bytes, U256};

/// Byte-addressable frame memory, growing in 32-byte words.
///
/// Expansion gas is charged by the dynamic-gas handlers before any access;
/// the structure itself only tracks the high-water mark and zero-fills.
#[derive(Clone, Debug, Default)]
pub struct Memory {
    data: Vec<u8>,
}

impl Memory {
    /// Creates an empty memory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Active memory size in bytes, always a multiple of 32.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether no memory word has been touched.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Active memory size in 32-byte words.
    pub fn word_count(&self) -> u64 {
        (self.data.len() / 32) as u64
    }

    /// The word count needed to address `offset + len`.
    pub fn words_for(offset: u64, len: u64) -> u64 {
        if len == 0 {
            return 0;
        }

        (offset + len).div_ceil(32)
    }

    /// Grows the backing store to hold at least `words` 32-byte words.
    pub fn grow(&mut self, words: u64) {
        let byte_len = (words as usize) * 32;
        if byte_len > self.data.len() {
            self.data.resize(byte_len, 0);
        }
    }

    /// Reads `len` bytes at `offset`. Reads past the high-water mark return
    /// zeros without growing the store.
    pub fn read(&self, offset: usize, len: usize) -> Bytes {
        if len == 0 {
            return Bytes::new();
        }

        let mut out = vec![0u8; len];
        if offset < self.data.len() {
            let available = (self.data.len() - offset).min(len);
            out[..available].copy_from_slice(&self.data[offset..offset + available]);
        }

        out.into()
    }

    /// Reads the 32-byte word at `offset`.
    pub fn read_word(&self, offset: usize) -> U256 {
        U256::from_be_slice(&self.read(offset, 32))
    }

    /// Writes `value` at `offset`. The caller must have grown the memory
    /// first; writes are truncated to the active size otherwise.
    pub fn write(&mut self, offset: usize, value: &[u8]) {
        if value.is_empty() || offset >= self.data.len() {
            return;
        }

        let available = (self.data.len() - offset).min(value.len());
        self.data[offset..offset + available].copy_from_slice(&value[..available]);
    }

    /// Writes the 32-byte big-endian form of `value` at `offset`.
    pub fn write_word(&mut self, offset: usize, value: U256) {
        self.write(offset, &value.to_be_bytes::<32>());
    }

    /// Writes the low byte of `value` at `offset`.
    pub fn write_byte(&mut self, offset: usize, value: u8) {
        self.write(offset, &[value]);
    }

    /// Copies `len` bytes from `src` to `dst` within the active memory,
    /// handling overlap.
    pub fn copy_within(&mut self, dst: usize, src: usize, len: usize) {
        if len == 0 {
            return;
        }

        self.data.copy_within(src..src + len, dst);
    }
}
