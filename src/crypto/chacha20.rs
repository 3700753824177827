//! ChaCha20 keystream generator (64-bit nonce, 64-bit block counter).
//!
//! This is the original Bernstein construction, not the IETF variant: the
//! last four state words are `counter_lo, counter_hi, nonce_lo, nonce_hi`.
//! With a nonce that fits in 64 bits and a counter below 2^32 the output is
//! identical to RFC 8439, which is what the golden tests rely on.

use crate::core::{BLOCK_SIZE, KEY_SIZE, NONCE_SIZE};

/// "expand 32-byte k"
const SIGMA: [u32; 4] = [0x6170_7865, 0x3320_646e, 0x7962_2d32, 0x6b20_6574];

/// Double rounds per block (20 rounds).
const DOUBLE_ROUNDS: usize = 10;

/// ChaCha20 stream cipher state.
///
/// The counter advances by one per 64-byte block and carries across calls to
/// [`apply_keystream`](Self::apply_keystream) on the same instance.
#[derive(Clone)]
pub struct ChaCha20 {
    state: [u32; 16],
}

impl ChaCha20 {
    /// Set up the state for `key`, `nonce`, and initial block `counter`.
    pub fn new(key: &[u8; KEY_SIZE], nonce: &[u8; NONCE_SIZE], counter: u64) -> Self {
        let mut state = [0u32; 16];
        state[..4].copy_from_slice(&SIGMA);
        for (word, chunk) in state[4..12].iter_mut().zip(key.chunks_exact(4)) {
            *word = load32_le(chunk);
        }
        state[12] = counter as u32;
        state[13] = (counter >> 32) as u32;
        state[14] = load32_le(&nonce[..4]);
        state[15] = load32_le(&nonce[4..]);
        Self { state }
    }

    /// Current block counter.
    pub fn counter(&self) -> u64 {
        (u64::from(self.state[13]) << 32) | u64::from(self.state[12])
    }

    /// XOR the keystream into `data` in place.
    ///
    /// A trailing partial block consumes a whole keystream block.
    pub fn apply_keystream(&mut self, data: &mut [u8]) {
        for chunk in data.chunks_mut(BLOCK_SIZE) {
            let block = self.next_block();
            for (byte, key) in chunk.iter_mut().zip(block.iter()) {
                *byte ^= key;
            }
        }
    }

    /// XOR the keystream of `input` into `output`.
    ///
    /// Only `min(input.len(), output.len())` bytes are written.
    pub fn apply_keystream_to(&mut self, input: &[u8], output: &mut [u8]) {
        let len = input.len().min(output.len());
        output[..len].copy_from_slice(&input[..len]);
        self.apply_keystream(&mut output[..len]);
    }

    /// Produce the next 64-byte keystream block and advance the counter.
    fn next_block(&mut self) -> [u8; BLOCK_SIZE] {
        let mut x = self.state;
        for _ in 0..DOUBLE_ROUNDS {
            // columns
            quarter_round(&mut x, 0, 4, 8, 12);
            quarter_round(&mut x, 1, 5, 9, 13);
            quarter_round(&mut x, 2, 6, 10, 14);
            quarter_round(&mut x, 3, 7, 11, 15);
            // diagonals
            quarter_round(&mut x, 0, 5, 10, 15);
            quarter_round(&mut x, 1, 6, 11, 12);
            quarter_round(&mut x, 2, 7, 8, 13);
            quarter_round(&mut x, 3, 4, 9, 14);
        }

        let mut out = [0u8; BLOCK_SIZE];
        for (i, chunk) in out.chunks_exact_mut(4).enumerate() {
            chunk.copy_from_slice(&x[i].wrapping_add(self.state[i]).to_le_bytes());
        }

        self.state[12] = self.state[12].wrapping_add(1);
        if self.state[12] == 0 {
            self.state[13] = self.state[13].wrapping_add(1);
        }
        out
    }
}

impl std::fmt::Debug for ChaCha20 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChaCha20")
            .field("state", &"[redacted]")
            .field("counter", &self.counter())
            .finish()
    }
}

#[inline(always)]
fn quarter_round(x: &mut [u32; 16], a: usize, b: usize, c: usize, d: usize) {
    x[a] = x[a].wrapping_add(x[b]);
    x[d] = (x[d] ^ x[a]).rotate_left(16);
    x[c] = x[c].wrapping_add(x[d]);
    x[b] = (x[b] ^ x[c]).rotate_left(12);
    x[a] = x[a].wrapping_add(x[b]);
    x[d] = (x[d] ^ x[a]).rotate_left(8);
    x[c] = x[c].wrapping_add(x[d]);
    x[b] = (x[b] ^ x[c]).rotate_left(7);
}

#[inline(always)]
fn load32_le(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}
