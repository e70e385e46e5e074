//! Hasher state machines.

/// Incremental 64-bit hasher.
///
/// Narrow writes are zero-extended, so a value hashes the same whatever
/// integer width carried it.
pub trait CrossCheckHasher: Default {
    fn write_u64(&mut self, x: u64);

    fn finish(&self) -> u64;

    #[inline]
    fn write_u8(&mut self, x: u8) {
        self.write_u64(u64::from(x));
    }

    #[inline]
    fn write_u16(&mut self, x: u16) {
        self.write_u64(u64::from(x));
    }

    #[inline]
    fn write_u32(&mut self, x: u32) {
        self.write_u64(u64::from(x));
    }

    #[inline]
    fn write_usize(&mut self, x: usize) {
        self.write_u64(x as u64);
    }

    /// Hash a byte string as little-endian 8-byte blocks followed by its length.
    fn write_bytes(&mut self, bytes: &[u8]) {
        let mut chunks = bytes.chunks_exact(8);
        for chunk in &mut chunks {
            let mut block = [0u8; 8];
            block.copy_from_slice(chunk);
            self.write_u64(u64::from_le_bytes(block));
        }
        let tail = chunks.remainder();
        if !tail.is_empty() {
            let mut block = [0u8; 8];
            block[..tail.len()].copy_from_slice(tail);
            self.write_u64(u64::from_le_bytes(block));
        }
        self.write_usize(bytes.len());
    }
}

const JODY_CONSTANT: u64 = 0x1f3d_5b79;
const JODY_SHIFT: u32 = 14;
const JODY_SEED: u64 = 0;

/// Aggregate hasher based on jodyhash.
///
/// Every block goes through add, rotate and xor steps, so swapping two
/// distinct blocks changes the result.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct JodyHasher(u64);

impl Default for JodyHasher {
    #[inline]
    fn default() -> Self {
        Self(JODY_SEED)
    }
}

impl JodyHasher {
    /// Start from an explicit state.
    #[must_use]
    pub const fn with_seed(seed: u64) -> Self {
        Self(seed)
    }

    #[inline]
    const fn mix(hash: u64, block: u64) -> u64 {
        let mut h = hash.wrapping_add(block).wrapping_add(JODY_CONSTANT);
        h = h.rotate_left(JODY_SHIFT);
        h ^= block;
        h = h.rotate_left(JODY_SHIFT);
        h ^= JODY_CONSTANT;
        h.wrapping_add(block)
    }
}

impl CrossCheckHasher for JodyHasher {
    #[inline]
    fn write_u64(&mut self, x: u64) {
        self.0 = Self::mix(self.0, x);
    }

    #[inline]
    fn finish(&self) -> u64 {
        self.0
    }
}

const SIMPLE_SEED: u64 = 0x5a5a_5a5a_5a5a_5a5a;

/// Scalar hasher: xor-folds every write into a fixed seed.
///
/// Injective for a single write, which is all scalars need.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SimpleHasher(u64);

impl Default for SimpleHasher {
    #[inline]
    fn default() -> Self {
        Self(SIMPLE_SEED)
    }
}

impl CrossCheckHasher for SimpleHasher {
    #[inline]
    fn write_u64(&mut self, x: u64) {
        self.0 ^= x;
    }

    #[inline]
    fn finish(&self) -> u64 {
        self.0
    }
}
