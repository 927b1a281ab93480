//! Byte accumulation buffer between transport reads and frame decoding

use crate::{Result, StreamError};

/// Compact once the consumed prefix grows past this many bytes.
///
/// Raw reads and frame boundaries are not aligned, so pending bytes drift to
/// ever-increasing offsets without periodic relocation.
const COMPACT_THRESHOLD: usize = 16 * 1024;

/// Ordered byte buffer with a read cursor.
///
/// Bytes before the cursor have been consumed by successful decodes and are
/// never re-read; bytes at and after the cursor are the pending region. The
/// buffer grows via [`append`](Self::append) and the cursor advances only via
/// [`consume`](Self::consume).
#[derive(Debug, Default)]
pub struct FrameBuffer {
    data: Vec<u8>,
    cursor: usize,
}

impl FrameBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty buffer with pre-allocated storage.
    pub fn with_capacity(capacity: usize) -> Self {
        Self { data: Vec::with_capacity(capacity), cursor: 0 }
    }

    /// Append raw bytes read from the transport.
    pub fn append(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    /// The not-yet-consumed byte window.
    pub fn pending(&self) -> &[u8] {
        &self.data[self.cursor..]
    }

    /// Number of pending bytes.
    pub fn pending_len(&self) -> usize {
        self.data.len() - self.cursor
    }

    /// Advance the cursor past `n` bytes consumed by a successful decode.
    ///
    /// Consuming more than the pending region is a decoder contract violation
    /// and reported as an invariant error. Compacts the underlying storage
    /// once the dead prefix crosses the relocation threshold.
    pub fn consume(&mut self, n: usize) -> Result<()> {
        if n > self.pending_len() {
            return Err(StreamError::invariant(format!(
                "consume({n}) exceeds pending region of {} bytes",
                self.pending_len()
            )));
        }
        self.cursor += n;

        if self.cursor >= COMPACT_THRESHOLD {
            self.compact();
        }
        Ok(())
    }

    /// Relocate pending bytes to the start of the underlying storage.
    ///
    /// Bounds memory growth across many read/decode cycles. Called
    /// automatically from [`consume`](Self::consume); exposed for callers
    /// that want eager relocation.
    pub fn compact(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.data.copy_within(self.cursor.., 0);
        self.data.truncate(self.data.len() - self.cursor);
        self.cursor = 0;
    }

    /// Drop all content, consumed and pending.
    pub fn clear(&mut self) {
        self.data.clear();
        self.cursor = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_extends_pending_region() {
        let mut buffer = FrameBuffer::new();
        assert_eq!(buffer.pending_len(), 0);

        buffer.append(&[1, 2, 3]);
        buffer.append(&[4]);
        assert_eq!(buffer.pending(), &[1, 2, 3, 4]);
    }

    #[test]
    fn consume_advances_cursor() {
        let mut buffer = FrameBuffer::new();
        buffer.append(&[1, 2, 3, 4, 5]);

        buffer.consume(2).expect("within pending region");
        assert_eq!(buffer.pending(), &[3, 4, 5]);

        buffer.consume(3).expect("exactly the pending region");
        assert_eq!(buffer.pending_len(), 0);
    }

    #[test]
    fn over_consume_is_an_invariant_error() {
        let mut buffer = FrameBuffer::new();
        buffer.append(&[1, 2]);

        let result = buffer.consume(3);
        assert!(matches!(result, Err(StreamError::Invariant { .. })));
        // Cursor untouched after the failed consume
        assert_eq!(buffer.pending(), &[1, 2]);
    }

    #[test]
    fn compact_preserves_pending_bytes() {
        let mut buffer = FrameBuffer::new();
        buffer.append(&[1, 2, 3, 4, 5]);
        buffer.consume(3).unwrap();

        buffer.compact();
        assert_eq!(buffer.pending(), &[4, 5]);

        // Appends after compaction continue the stream
        buffer.append(&[6]);
        assert_eq!(buffer.pending(), &[4, 5, 6]);
    }

    #[test]
    fn automatic_compaction_bounds_storage() {
        let mut buffer = FrameBuffer::new();
        let chunk = vec![0u8; 4096];

        // Many read/consume cycles with a persistent 10-byte remainder
        buffer.append(&[9u8; 10]);
        for _ in 0..64 {
            buffer.append(&chunk);
            buffer.consume(chunk.len()).unwrap();
        }

        assert_eq!(buffer.pending(), &[9u8; 10]);
        // The dead prefix must not keep growing unboundedly
        assert!(buffer.data.len() < COMPACT_THRESHOLD + chunk.len());
    }

    #[test]
    fn clear_resets_everything() {
        let mut buffer = FrameBuffer::new();
        buffer.append(&[1, 2, 3]);
        buffer.consume(1).unwrap();
        buffer.clear();
        assert_eq!(buffer.pending_len(), 0);
        buffer.consume(0).expect("consume(0) on empty buffer is fine");
    }
}
