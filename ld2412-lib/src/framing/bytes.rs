use crate::prelude::*;

/// Default high-water mark. Once the buffer grows past this it is cut back to
/// [DEFAULT_LOW_WATER] bytes.
pub const DEFAULT_HIGH_WATER: usize = 1000;
/// Default number of trailing bytes kept when the buffer is truncated.
pub const DEFAULT_LOW_WATER: usize = 500;

/// ByteStreamBuffer accumulates raw bytes from the transport until the scanner
/// has located the frames they contain.
///
/// Memory is bounded: if the buffer exceeds its high-water mark after a scan it is
/// truncated to its trailing low-water mark bytes, dropping the oldest bytes first.
/// Scanning always starts at the front, so only old, already unmatched bytes are
/// ever at risk.
#[derive(Debug, Clone)]
pub struct ByteStreamBuffer {
    data: Vec<u8>,
    high_water: usize,
    low_water: usize,
    // Number of bytes removed from the front, either consumed or truncated.
    dropped: usize,
    truncations: usize,
}

impl Default for ByteStreamBuffer {
    fn default() -> Self {
        ByteStreamBuffer {
            data: Vec::with_capacity(DEFAULT_HIGH_WATER),
            high_water: DEFAULT_HIGH_WATER,
            low_water: DEFAULT_LOW_WATER,
            dropped: 0,
            truncations: 0,
        }
    }
}

impl ByteStreamBuffer {
    /// Create a buffer with the given high and low water marks.
    ///
    /// # Errors
    /// [Error::Invariant] if `low_water` is not less than `high_water`.
    pub fn new(high_water: usize, low_water: usize) -> Result<Self> {
        if low_water >= high_water {
            return Err(Error::Invariant(format!(
                "low water mark {low_water} must be less than high water mark {high_water}"
            )));
        }
        Ok(ByteStreamBuffer {
            data: Vec::with_capacity(high_water.min(DEFAULT_HIGH_WATER)),
            high_water,
            low_water,
            dropped: 0,
            truncations: 0,
        })
    }

    pub fn append(&mut self, chunk: &[u8]) {
        self.data.extend_from_slice(chunk);
    }

    /// Read-only view of the buffered bytes for scanning.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[must_use]
    pub fn high_water(&self) -> usize {
        self.high_water
    }

    /// Drop the first `n` bytes, which the scanner has finished with.
    ///
    /// # Errors
    /// [Error::Invariant] if `n` is larger than the buffer.
    pub fn consume(&mut self, n: usize) -> Result<()> {
        if n > self.data.len() {
            return Err(Error::Invariant(format!(
                "cannot consume {n} bytes from a buffer of {}",
                self.data.len()
            )));
        }
        self.data.drain(..n);
        self.dropped += n;
        Ok(())
    }

    /// If the buffer is over the high-water mark keep only the last low-water mark
    /// bytes. Returns true if bytes were discarded.
    ///
    /// Must only be called between scans.
    pub fn truncate_if_oversized(&mut self) -> bool {
        if self.data.len() <= self.high_water {
            return false;
        }
        let excess = self.data.len() - self.low_water;
        self.data.drain(..excess);
        self.dropped += excess;
        self.truncations += 1;
        true
    }

    /// Stream offset of the first buffered byte, i.e., the total number of bytes
    /// that have been consumed or truncated away.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.dropped
    }

    /// Number of times the buffer was truncated for exceeding its high-water mark.
    #[must_use]
    pub fn truncations(&self) -> usize {
        self.truncations
    }

    pub fn clear(&mut self) {
        self.data.clear();
        self.dropped = 0;
        self.truncations = 0;
    }
}
