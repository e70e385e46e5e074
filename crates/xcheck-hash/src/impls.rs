//! `CrossCheckHash` for primitive and standard types.

use crate::{
    CrossCheckHash, CrossCheckHasher, LEAF_POINTER_HASH, NULL_POINTER_HASH, RecordHasher,
};

#[inline]
fn scalar<HS: CrossCheckHasher>(value: u64) -> u64 {
    let mut hasher = HS::default();
    hasher.write_u64(value);
    hasher.finish()
}

macro_rules! impl_unsigned {
    ($($ty:ty),*) => {$(
        impl CrossCheckHash for $ty {
            #[inline]
            fn cross_check_hash_depth<HA, HS>(&self, _depth: usize) -> u64
            where
                HA: CrossCheckHasher,
                HS: CrossCheckHasher,
            {
                scalar::<HS>(*self as u64)
            }
        }
    )*};
}

// Signed values are sign-extended first so -1i8 and -1i64 agree.
macro_rules! impl_signed {
    ($($ty:ty),*) => {$(
        impl CrossCheckHash for $ty {
            #[inline]
            fn cross_check_hash_depth<HA, HS>(&self, _depth: usize) -> u64
            where
                HA: CrossCheckHasher,
                HS: CrossCheckHasher,
            {
                scalar::<HS>(i64::from(*self) as u64)
            }
        }
    )*};
}

impl_unsigned!(u8, u16, u32, u64, usize);
impl_signed!(i8, i16, i32, i64);

impl CrossCheckHash for isize {
    #[inline]
    fn cross_check_hash_depth<HA, HS>(&self, _depth: usize) -> u64
    where
        HA: CrossCheckHasher,
        HS: CrossCheckHasher,
    {
        scalar::<HS>(*self as i64 as u64)
    }
}

impl CrossCheckHash for bool {
    #[inline]
    fn cross_check_hash_depth<HA, HS>(&self, _depth: usize) -> u64
    where
        HA: CrossCheckHasher,
        HS: CrossCheckHasher,
    {
        scalar::<HS>(u64::from(*self))
    }
}

impl CrossCheckHash for char {
    #[inline]
    fn cross_check_hash_depth<HA, HS>(&self, _depth: usize) -> u64
    where
        HA: CrossCheckHasher,
        HS: CrossCheckHasher,
    {
        scalar::<HS>(u64::from(u32::from(*self)))
    }
}

// Floats hash their bit pattern, except that both zeros and all NaNs are
// canonicalized first.
impl CrossCheckHash for f32 {
    #[inline]
    fn cross_check_hash_depth<HA, HS>(&self, _depth: usize) -> u64
    where
        HA: CrossCheckHasher,
        HS: CrossCheckHasher,
    {
        let bits = if self.is_nan() {
            f32::NAN.to_bits()
        } else if *self == 0.0 {
            0
        } else {
            self.to_bits()
        };
        scalar::<HS>(u64::from(bits))
    }
}

impl CrossCheckHash for f64 {
    #[inline]
    fn cross_check_hash_depth<HA, HS>(&self, _depth: usize) -> u64
    where
        HA: CrossCheckHasher,
        HS: CrossCheckHasher,
    {
        let bits = if self.is_nan() {
            f64::NAN.to_bits()
        } else if *self == 0.0 {
            0
        } else {
            self.to_bits()
        };
        scalar::<HS>(bits)
    }
}

impl CrossCheckHash for () {
    #[inline]
    fn cross_check_hash_depth<HA, HS>(&self, depth: usize) -> u64
    where
        HA: CrossCheckHasher,
        HS: CrossCheckHasher,
    {
        RecordHasher::<HA, HS>::new(depth).finish()
    }
}

impl CrossCheckHash for str {
    #[inline]
    fn cross_check_hash_depth<HA, HS>(&self, _depth: usize) -> u64
    where
        HA: CrossCheckHasher,
        HS: CrossCheckHasher,
    {
        let mut hasher = HA::default();
        hasher.write_bytes(self.as_bytes());
        hasher.finish()
    }
}

// References are pointers that are always followed while depth remains.
impl<T: CrossCheckHash + ?Sized> CrossCheckHash for &T {
    #[inline]
    fn cross_check_hash_depth<HA, HS>(&self, depth: usize) -> u64
    where
        HA: CrossCheckHasher,
        HS: CrossCheckHasher,
    {
        if depth == 0 {
            LEAF_POINTER_HASH
        } else {
            (**self).cross_check_hash_depth::<HA, HS>(depth - 1)
        }
    }
}

impl<T: CrossCheckHash + ?Sized> CrossCheckHash for &mut T {
    #[inline]
    fn cross_check_hash_depth<HA, HS>(&self, depth: usize) -> u64
    where
        HA: CrossCheckHasher,
        HS: CrossCheckHasher,
    {
        if depth == 0 {
            LEAF_POINTER_HASH
        } else {
            (**self).cross_check_hash_depth::<HA, HS>(depth - 1)
        }
    }
}

impl<T: CrossCheckHash> CrossCheckHash for Option<&T> {
    #[inline]
    fn cross_check_hash_depth<HA, HS>(&self, depth: usize) -> u64
    where
        HA: CrossCheckHasher,
        HS: CrossCheckHasher,
    {
        match self {
            None => NULL_POINTER_HASH,
            Some(_) if depth == 0 => LEAF_POINTER_HASH,
            Some(r) => (*r).cross_check_hash_depth::<HA, HS>(depth - 1),
        }
    }
}

// Raw pointers are never dereferenced: only null-ness is observable.
impl<T> CrossCheckHash for *const T {
    #[inline]
    fn cross_check_hash_depth<HA, HS>(&self, _depth: usize) -> u64
    where
        HA: CrossCheckHasher,
        HS: CrossCheckHasher,
    {
        if self.is_null() {
            NULL_POINTER_HASH
        } else {
            LEAF_POINTER_HASH
        }
    }
}

impl<T> CrossCheckHash for *mut T {
    #[inline]
    fn cross_check_hash_depth<HA, HS>(&self, depth: usize) -> u64
    where
        HA: CrossCheckHasher,
        HS: CrossCheckHasher,
    {
        self.cast_const().cross_check_hash_depth::<HA, HS>(depth)
    }
}

impl<T: CrossCheckHash> CrossCheckHash for [T] {
    fn cross_check_hash_depth<HA, HS>(&self, depth: usize) -> u64
    where
        HA: CrossCheckHasher,
        HS: CrossCheckHasher,
    {
        let mut record = RecordHasher::<HA, HS>::new(depth);
        for element in self {
            record.field(element);
        }
        record.raw(self.len() as u64);
        record.finish()
    }
}

impl<T: CrossCheckHash, const N: usize> CrossCheckHash for [T; N] {
    #[inline]
    fn cross_check_hash_depth<HA, HS>(&self, depth: usize) -> u64
    where
        HA: CrossCheckHasher,
        HS: CrossCheckHasher,
    {
        self.as_slice().cross_check_hash_depth::<HA, HS>(depth)
    }
}

macro_rules! impl_tuple {
    ($($name:ident . $idx:tt),+) => {
        impl<$($name: CrossCheckHash),+> CrossCheckHash for ($($name,)+) {
            #[inline]
            fn cross_check_hash_depth<HA, HS>(&self, depth: usize) -> u64
            where
                HA: CrossCheckHasher,
                HS: CrossCheckHasher,
            {
                let mut record = RecordHasher::<HA, HS>::new(depth);
                $( record.field(&self.$idx); )+
                record.finish()
            }
        }
    };
}

impl_tuple!(A.0);
impl_tuple!(A.0, B.1);
impl_tuple!(A.0, B.1, C.2);
impl_tuple!(A.0, B.1, C.2, D.3);
impl_tuple!(A.0, B.1, C.2, D.3, E.4);
impl_tuple!(A.0, B.1, C.2, D.3, E.4, F.5);
impl_tuple!(A.0, B.1, C.2, D.3, E.4, F.5, G.6);
impl_tuple!(A.0, B.1, C.2, D.3, E.4, F.5, G.6, H.7);
