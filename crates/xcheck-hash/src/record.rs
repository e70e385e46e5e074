//! Composite (record) hashing.

use core::marker::PhantomData;

use crate::{CrossCheckHash, CrossCheckHasher, LEAF_RECORD_HASH};

/// Folds per-field hashes of a record in declaration order.
///
/// Each field is hashed one level deeper than the record itself; once the
/// depth budget is exhausted the whole record collapses to
/// [`LEAF_RECORD_HASH`].
pub struct RecordHasher<HA, HS> {
    hasher: HA,
    depth: usize,
    _marker: PhantomData<HS>,
}

impl<HA, HS> RecordHasher<HA, HS>
where
    HA: CrossCheckHasher,
    HS: CrossCheckHasher,
{
    #[inline]
    #[must_use]
    pub fn new(depth: usize) -> Self {
        Self {
            hasher: HA::default(),
            depth,
            _marker: PhantomData,
        }
    }

    /// Add the next field.
    #[inline]
    pub fn field<T: CrossCheckHash + ?Sized>(&mut self, value: &T) -> &mut Self {
        if self.depth > 0 {
            let hash = value.cross_check_hash_depth::<HA, HS>(self.depth - 1);
            self.hasher.write_u64(hash);
        }
        self
    }

    /// Add a field whose hash was computed elsewhere (fixed or custom hash).
    #[inline]
    pub fn raw(&mut self, hash: u64) -> &mut Self {
        if self.depth > 0 {
            self.hasher.write_u64(hash);
        }
        self
    }

    #[inline]
    #[must_use]
    pub fn finish(&self) -> u64 {
        if self.depth == 0 {
            LEAF_RECORD_HASH
        } else {
            self.hasher.finish()
        }
    }
}

/// Implement [`CrossCheckHash`] for a struct by listing its fields in
/// declaration order. Tuple structs use field indices.
///
/// ```
/// use xcheck_hash::cross_check_record;
///
/// struct Pair(u8, u16);
/// cross_check_record!(Pair { 0, 1 });
/// ```
#[macro_export]
macro_rules! cross_check_record {
    ($ty:ty { $($field:tt),* $(,)? }) => {
        impl $crate::CrossCheckHash for $ty {
            fn cross_check_hash_depth<HA, HS>(&self, depth: usize) -> u64
            where
                HA: $crate::CrossCheckHasher,
                HS: $crate::CrossCheckHasher,
            {
                let mut record = $crate::RecordHasher::<HA, HS>::new(depth);
                $( record.field(&self.$field); )*
                record.finish()
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::{JodyHasher, LEAF_RECORD_HASH, SimpleHasher, checksum};

    struct Pair {
        first: u32,
        second: u32,
    }
    cross_check_record!(Pair { first, second });

    struct Swapped {
        second: u32,
        first: u32,
    }
    cross_check_record!(Swapped { second, first });

    struct Wrapper(Pair);
    cross_check_record!(Wrapper { 0 });

    #[test]
    fn test_field_order_changes_checksum() {
        let a = checksum(&Pair { first: 3, second: 9 });
        let b = checksum(&Pair { first: 9, second: 3 });
        assert_ne!(a, b);
    }

    #[test]
    fn test_declaration_order_is_what_counts() {
        // Same logical values, fields declared in swapped order.
        let a = checksum(&Pair { first: 3, second: 9 });
        let b = checksum(&Swapped { second: 9, first: 3 });
        assert_ne!(a, b);
    }

    #[test]
    fn test_equal_records_hash_equal() {
        let a = checksum(&Pair { first: 1, second: 2 });
        let b = checksum(&Pair { first: 1, second: 2 });
        assert_eq!(a, b);
    }

    #[test]
    fn test_depth_zero_is_leaf() {
        use crate::CrossCheckHash;
        let pair = Pair { first: 1, second: 2 };
        assert_eq!(
            pair.cross_check_hash_depth::<JodyHasher, SimpleHasher>(0),
            LEAF_RECORD_HASH
        );
    }

    #[test]
    fn test_nested_record_uses_inner_hash() {
        use crate::CrossCheckHash;
        let inner = Pair { first: 4, second: 5 };
        let outer = Wrapper(Pair { first: 4, second: 5 });
        let inner_hash = inner.cross_check_hash_depth::<JodyHasher, SimpleHasher>(1);
        let mut expected = crate::RecordHasher::<JodyHasher, SimpleHasher>::new(2);
        expected.raw(inner_hash);
        assert_eq!(
            outer.cross_check_hash_depth::<JodyHasher, SimpleHasher>(2),
            expected.finish()
        );
    }

    #[test]
    fn test_union_field_uses_fixed_hash() {
        use crate::{ANY_UNION_HASH, CrossCheckHash, CrossCheckHasher, RecordHasher};

        #[allow(dead_code)]
        union Bits {
            int: u32,
            float: f32,
        }

        struct Tagged {
            tag: u8,
            bits: Bits,
        }

        impl CrossCheckHash for Tagged {
            fn cross_check_hash_depth<HA, HS>(&self, depth: usize) -> u64
            where
                HA: CrossCheckHasher,
                HS: CrossCheckHasher,
            {
                let _ = &self.bits;
                let mut record = RecordHasher::<HA, HS>::new(depth);
                record.field(&self.tag).raw(ANY_UNION_HASH);
                record.finish()
            }
        }

        let a = Tagged { tag: 1, bits: Bits { int: 7 } };
        let b = Tagged { tag: 1, bits: Bits { float: 2.5 } };
        assert_eq!(checksum(&a), checksum(&b));
    }
}
