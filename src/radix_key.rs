use std::fmt::Debug;

use bytemuck::Pod;

use crate::{lanes, NumberSystem};

mod sealed {
    pub trait Sealed {}
}

/// Unsigned fixed-width integer the counting passes operate on.
///
/// Implemented for `u8`, `u16`, `u32` and `u64` only.
pub trait RadixKey: Pod + Ord + Debug + Send + Sync + sealed::Sealed {
    const BITS: u32;
    const SIGN_BIT: Self;
    const MAX: Self;

    fn to_u64(self) -> u64;

    /// `(unsigned)(v - MIN)` with `v` the key read as a signed integer.
    fn flip_sign(self) -> Self;

    /// `(signed)(k + MIN)`, the inverse of [`RadixKey::flip_sign`].
    fn unflip_sign(self) -> Self;

    /// Maps an IEEE-754 style sign/magnitude pattern onto a pattern that orders as a
    /// twos-complement integer. Negative values keep the sign bit and get every other
    /// bit inverted. Applying it twice returns the input.
    fn sign_magnitude_to_signed(self) -> Self;

    #[doc(hidden)]
    unsafe fn flip_sign_lanes(src: *const Self, dst: *mut Self, len: usize) -> usize;

    #[doc(hidden)]
    unsafe fn sign_magnitude_lanes(src: *const Self, dst: *mut Self, len: usize) -> usize;
}

/// A domain type that can be sorted through a radix key of the same width.
///
/// The type's bits are reinterpreted as `Radix` and mapped by the converter registered
/// for the pair.
pub trait RadixSortable: Pod + Send + Sync {
    type Radix: RadixKey;
}

macro_rules! radix_key_impl {
    ($($u:ty, $s:ty, $flip:ident, $sign_magnitude:ident);* $(;)?) => {$(
        impl sealed::Sealed for $u {}

        impl RadixKey for $u {
            const BITS: u32 = <$u>::BITS;
            const SIGN_BIT: Self = 1 << (<$u>::BITS - 1);
            const MAX: Self = <$u>::MAX;

            #[inline(always)]
            fn to_u64(self) -> u64 {
                self as u64
            }

            #[inline(always)]
            fn flip_sign(self) -> Self {
                (self as $s).wrapping_sub(<$s>::MIN) as $u
            }

            #[inline(always)]
            fn unflip_sign(self) -> Self {
                (self as $s).wrapping_add(<$s>::MIN) as $u
            }

            #[inline(always)]
            fn sign_magnitude_to_signed(self) -> Self {
                let neg_mask = ((self as $s) >> (<$u>::BITS - 1)) as $u;
                (neg_mask & (!self | Self::SIGN_BIT)) | (!neg_mask & self)
            }

            #[inline(always)]
            unsafe fn flip_sign_lanes(src: *const Self, dst: *mut Self, len: usize) -> usize {
                lanes::$flip(src, dst, len)
            }

            #[inline(always)]
            unsafe fn sign_magnitude_lanes(src: *const Self, dst: *mut Self, len: usize) -> usize {
                lanes::$sign_magnitude(src, dst, len)
            }
        }
    )*};
}

radix_key_impl! {
    u8, i8, flip_sign_u8, sign_magnitude_u8;
    u16, i16, flip_sign_u16, sign_magnitude_u16;
    u32, i32, flip_sign_u32, sign_magnitude_u32;
    u64, i64, flip_sign_u64, sign_magnitude_u64;
}

macro_rules! radix_sortable_impl {
    ($($t:ty => $radix:ty),* $(,)?) => {$(
        impl RadixSortable for $t {
            type Radix = $radix;
        }
    )*};
}

radix_sortable_impl! {
    u8 => u8, i8 => u8,
    u16 => u16, i16 => u16,
    u32 => u32, i32 => u32, f32 => u32,
    u64 => u64, i64 => u64, f64 => u64,
}

/// Position of `key` in ascending order when its bits follow `number_system`.
#[inline(always)]
pub(crate) fn order_rank<K: RadixKey>(key: K, number_system: NumberSystem) -> u64 {
    let bits = key.to_u64();
    let sign = K::SIGN_BIT.to_u64();
    match number_system {
        NumberSystem::Unsigned => bits,
        NumberSystem::OnesComplement | NumberSystem::TwosComplement => bits ^ sign,
        NumberSystem::SignBit if bits & sign != 0 => bits ^ K::MAX.to_u64(),
        NumberSystem::SignBit => bits ^ sign,
    }
}
