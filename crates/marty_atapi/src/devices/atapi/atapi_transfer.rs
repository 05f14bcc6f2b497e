/*
    MartyPC
    https://github.com/dbalsom/martypc

    Copyright 2022-2025 Daniel Balsom

    Permission is hereby granted, free of charge, to any person obtaining a
    copy of this software and associated documentation files (the “Software”),
    to deal in the Software without restriction, including without limitation
    the rights to use, copy, modify, merge, publish, distribute, sublicense,
    and/or sell copies of the Software, and to permit persons to whom the
    Software is furnished to do so, subject to the following conditions:

    The above copyright notice and this permission notice shall be included in
    all copies or substantial portions of the Software.

    THE SOFTWARE IS PROVIDED “AS IS”, WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
    IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
    FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
    AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
    LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
    FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
    DEALINGS IN THE SOFTWARE.

    --------------------------------------------------------------------------
*/

//! Transfer bookkeeping shared by the PIO and DMA delivery paths.

/// Largest chunk the controller will announce in the byte count registers.
pub const MAX_TRANSFER_SIZE: usize = 63488;
/// Logical sector size of a CD-ROM data track.
pub const CD_SECTOR_SIZE: usize = 2048;
/// Capacity of the host-readable staging buffer, in 16-bit words.
pub const STAGING_BUFFER_WORDS: usize = 32 * 1024;

/// The delivery path that has claimed the current command's data phase.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TransferPath {
    Pio,
    Dma,
}

/// Current-chunk and remaining-total byte counters for the in-flight command.
///
/// `chunk` never exceeds [MAX_TRANSFER_SIZE]. When a chunk is exhausted, [TransferState::refill]
/// carves the next chunk out of `total`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct TransferState {
    chunk: usize,
    total: usize,
    path: Option<TransferPath>,
}

impl TransferState {
    /// Seed the counters from a device result length.
    pub fn new(byte_count: usize) -> Self {
        let (chunk, total) = Self::split(byte_count);
        Self {
            chunk,
            total,
            path: None,
        }
    }

    #[inline]
    fn split(bytes: usize) -> (usize, usize) {
        if bytes > MAX_TRANSFER_SIZE {
            (MAX_TRANSFER_SIZE, bytes - MAX_TRANSFER_SIZE)
        }
        else {
            (bytes, 0)
        }
    }

    #[inline]
    pub fn chunk_remaining(&self) -> usize {
        self.chunk
    }

    #[inline]
    pub fn total_remaining(&self) -> usize {
        self.total
    }

    /// True if neither the current chunk nor any later chunk has bytes left.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.chunk == 0 && self.total == 0
    }

    #[inline]
    pub fn path(&self) -> Option<TransferPath> {
        self.path
    }

    /// Claim the data phase for `path`. Returns false if the other path already owns it.
    pub fn claim(&mut self, path: TransferPath) -> bool {
        match self.path {
            None => {
                self.path = Some(path);
                true
            }
            Some(owner) => owner == path,
        }
    }

    /// Take up to `max` bytes from the current chunk and return how many were taken.
    pub fn consume(&mut self, max: usize) -> usize {
        let n = self.chunk.min(max);
        self.chunk -= n;
        n
    }

    /// Move the remaining total into the next chunk, clipped to [MAX_TRANSFER_SIZE].
    /// Any bytes left in the current chunk are carried into the total first, so
    /// `chunk + total` is unchanged by this call.
    pub fn refill(&mut self) {
        let (chunk, total) = Self::split(self.chunk + self.total);
        self.chunk = chunk;
        self.total = total;
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Host-readable staging buffer of result words. Refilled in sector increments from the
/// device and drained one word per Data register read.
#[derive(Clone, Debug)]
pub struct WordBuffer {
    words: Vec<u16>,
    read_ptr: usize,
}

impl Default for WordBuffer {
    fn default() -> Self {
        Self {
            words: Vec::with_capacity(STAGING_BUFFER_WORDS),
            read_ptr: 0,
        }
    }
}

impl WordBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of words written since the last clear.
    #[inline]
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// True when every staged word has been read (or nothing was staged).
    #[inline]
    pub fn is_drained(&self) -> bool {
        self.read_ptr >= self.words.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    #[inline]
    pub fn read_ptr(&self) -> usize {
        self.read_ptr
    }

    /// Number of words that can still be appended.
    #[inline]
    pub fn space(&self) -> usize {
        STAGING_BUFFER_WORDS - self.words.len()
    }

    /// Append words, truncating at capacity. Returns the number of words stored.
    pub fn extend(&mut self, words: &[u16]) -> usize {
        let n = words.len().min(self.space());
        if n < words.len() {
            log::warn!("WordBuffer: staging buffer full, dropping {} words", words.len() - n);
        }
        self.words.extend_from_slice(&words[..n]);
        n
    }

    /// Pop the next unread word.
    pub fn pop(&mut self) -> Option<u16> {
        let word = self.words.get(self.read_ptr).copied()?;
        self.read_ptr += 1;
        Some(word)
    }

    pub fn clear(&mut self) {
        self.words.clear();
        self.read_ptr = 0;
    }
}
