//! Growable byte buffer used on every hot path of the tunnel.
//!
//! [`ByteBuffer`] keeps a logical length separate from its physical
//! capacity. Capacity only ever grows, and always by repeated doubling, so a
//! buffer that is reused across packets settles at a power-of-two multiple of
//! its initial size and stops reallocating.

use std::fmt;
use std::ops::{Deref, DerefMut};

use super::constants::DEFAULT_BUFFER_CAPACITY;

/// Owned byte storage with front/back insertion and removal.
///
/// Invariant: `len() <= capacity()`. Bytes outside the range touched by an
/// operation are preserved, including bytes beyond `len()` that become
/// visible again after [`set_len`](Self::set_len) grows the buffer.
#[derive(Clone)]
pub struct ByteBuffer {
    buf: Box<[u8]>,
    len: usize,
}

impl Default for ByteBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl ByteBuffer {
    /// Create an empty buffer with the default capacity (512 bytes).
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_BUFFER_CAPACITY)
    }

    /// Create an empty buffer with the given initial capacity.
    ///
    /// A capacity of zero is clamped to one so that doubling can make progress.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: vec![0u8; capacity.max(1)].into_boxed_slice(),
            len: 0,
        }
    }

    /// Logical length.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the logical length is zero.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Physical capacity.
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// The live bytes `[0, len)`.
    pub fn as_slice(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    /// The live bytes `[0, len)`, mutably.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.buf[..self.len]
    }

    /// Set the logical length, growing capacity if needed.
    pub fn set_len(&mut self, len: usize) {
        self.grow_to(len);
        self.len = len;
    }

    /// Insert `bytes` before the current contents.
    pub fn insert_front(&mut self, bytes: &[u8]) {
        let n = bytes.len();
        self.grow_to(self.len + n);
        self.buf.copy_within(..self.len, n);
        self.buf[..n].copy_from_slice(bytes);
        self.len += n;
    }

    /// Append `bytes` after the current contents.
    pub fn insert_back(&mut self, bytes: &[u8]) {
        let n = bytes.len();
        self.grow_to(self.len + n);
        self.buf[self.len..self.len + n].copy_from_slice(bytes);
        self.len += n;
    }

    /// Drop the first `n` bytes, shifting the remainder to offset 0.
    pub fn remove_front(&mut self, n: usize) {
        if n >= self.len {
            self.len = 0;
            return;
        }
        self.buf.copy_within(n..self.len, 0);
        self.len -= n;
    }

    /// Drop the last `n` bytes. Clamps at an empty buffer.
    pub fn remove_back(&mut self, n: usize) {
        self.len = self.len.saturating_sub(n);
    }

    /// Replace the contents with `bytes`.
    pub fn copy_from(&mut self, bytes: &[u8]) {
        self.grow_to(bytes.len());
        self.buf[..bytes.len()].copy_from_slice(bytes);
        self.len = bytes.len();
    }

    /// Ensure the physical capacity is at least `capacity` bytes.
    pub fn reserve(&mut self, capacity: usize) {
        self.grow_to(capacity);
    }

    /// Reset the logical length to zero. Capacity is kept.
    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Copy the live bytes into a new `Vec`.
    pub fn to_vec(&self) -> Vec<u8> {
        self.as_slice().to_vec()
    }

    /// Double the capacity until it holds `needed` bytes. At most one allocation.
    fn grow_to(&mut self, needed: usize) {
        let mut capacity = self.buf.len();
        if capacity >= needed {
            return;
        }
        while capacity < needed {
            capacity *= 2;
        }
        let mut grown = vec![0u8; capacity].into_boxed_slice();
        grown[..self.buf.len()].copy_from_slice(&self.buf);
        self.buf = grown;
    }
}

impl Deref for ByteBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl DerefMut for ByteBuffer {
    fn deref_mut(&mut self) -> &mut [u8] {
        self.as_mut_slice()
    }
}

impl PartialEq for ByteBuffer {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl Eq for ByteBuffer {}

impl AsRef<[u8]> for ByteBuffer {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl From<&[u8]> for ByteBuffer {
    fn from(bytes: &[u8]) -> Self {
        let mut buf = Self::new();
        buf.copy_from(bytes);
        buf
    }
}

impl fmt::Debug for ByteBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteBuffer")
            .field("len", &self.len)
            .field("capacity", &self.buf.len())
            .finish()
    }
}
