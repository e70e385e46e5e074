//! Checksums for cross-check instrumentation.
//!
//! Instrumented code hashes every observed value (function arguments, return
//! values, loop state) into a fixed-width `u64` before handing it to the
//! runtime. Hashing runs on every instrumented call, so this crate is
//! `no_std`, never allocates and has no side effects.
//!
//! Two hashers cooperate:
//!
//! | Hasher | Role |
//! |--------|------|
//! | [`JodyHasher`] | Aggregate hasher, folds field hashes in order (non-commutative) |
//! | [`SimpleHasher`] | Scalar hasher, xor-folds a single value into a seed |
//!
//! # Example
//!
//! ```
//! use xcheck_hash::{checksum, cross_check_record};
//!
//! struct Point { x: i32, y: i32 }
//! cross_check_record!(Point { x, y });
//!
//! let a = checksum(&Point { x: 1, y: 2 });
//! let b = checksum(&Point { x: 2, y: 1 });
//! assert_ne!(a, b);
//! ```

#![no_std]

mod hasher;
mod impls;
mod name;
mod record;

pub use hasher::{CrossCheckHasher, JodyHasher, SimpleHasher};
pub use name::djb2;
pub use record::RecordHasher;

/// Aggregate hasher used when instrumentation does not pick one.
pub type DefaultAggHasher = JodyHasher;

/// Scalar hasher used when instrumentation does not pick one.
pub type DefaultSimpleHasher = SimpleHasher;

/// Depth budget for following references and nested records.
pub const MAX_HASH_DEPTH: usize = 8;

/// Hash of a record whose depth budget is exhausted.
pub const LEAF_RECORD_HASH: u64 = 0x7eb8_c8f5_0cc9_2d6b;

/// Hash of a non-null pointer that is not followed.
pub const LEAF_POINTER_HASH: u64 = 0x7a6b_1d1f_2cd0_1e0b;

/// Hash of a null pointer or `None` reference.
pub const NULL_POINTER_HASH: u64 = 0x726d_a5c5_f6b0_8f3b;

/// Hash of an untagged union without a custom hash function.
pub const ANY_UNION_HASH: u64 = 0x6f9b_2f6e_d6a5_b1c3;

/// Values that can be cross-checked.
///
/// `HA` folds composite values; `HS` hashes scalars. `depth` bounds how many
/// references and nested records are followed before a leaf constant is
/// returned instead.
pub trait CrossCheckHash {
    fn cross_check_hash_depth<HA, HS>(&self, depth: usize) -> u64
    where
        HA: CrossCheckHasher,
        HS: CrossCheckHasher;

    /// Hash with the full depth budget.
    #[inline]
    fn cross_check_hash<HA, HS>(&self) -> u64
    where
        HA: CrossCheckHasher,
        HS: CrossCheckHasher,
    {
        self.cross_check_hash_depth::<HA, HS>(MAX_HASH_DEPTH)
    }
}

/// Hash a value with the default hasher pair.
#[inline]
#[must_use]
pub fn checksum<T: CrossCheckHash + ?Sized>(value: &T) -> u64 {
    value.cross_check_hash::<DefaultAggHasher, DefaultSimpleHasher>()
}

/// Hash raw bytes with the default aggregate hasher.
///
/// The length is mixed in, so trailing zero bytes change the result.
#[inline]
#[must_use]
pub fn hash_bytes(bytes: &[u8]) -> u64 {
    let mut hasher = DefaultAggHasher::default();
    hasher.write_bytes(bytes);
    hasher.finish()
}
