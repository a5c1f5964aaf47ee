//! Bulk mappings between domain bit patterns and radix keys.

use crate::{NumberSystem, RadixKey};

/// Maps domain values (already reinterpreted as `K`) to radix keys and back.
///
/// Implementations provide the scalar mapping; the bulk methods default to applying it
/// element by element and may be overridden with faster paths. `from_radix` must undo
/// `to_radix` exactly for every bit pattern.
pub trait RadixConverter<K: RadixKey>: Send + Sync {
    fn to_radix_key(&self, value: K) -> K;

    fn from_radix_key(&self, key: K) -> K;

    /// How the produced radix keys must be read to recover the domain order.
    fn number_system(&self) -> NumberSystem;

    /// A pass-through converter leaves the bits untouched and is skipped by the sorter.
    fn is_pass_through(&self) -> bool {
        false
    }

    fn to_radix(&self, source: &[K], destination: &mut [K]) {
        for (dst, &src) in destination.iter_mut().zip(source) {
            *dst = self.to_radix_key(src);
        }
    }

    fn from_radix(&self, source: &[K], destination: &mut [K]) {
        for (dst, &src) in destination.iter_mut().zip(source) {
            *dst = self.from_radix_key(src);
        }
    }

    fn to_radix_in_place(&self, keys: &mut [K]) {
        keys.iter_mut().for_each(|k| *k = self.to_radix_key(*k));
    }

    fn from_radix_in_place(&self, keys: &mut [K]) {
        keys.iter_mut().for_each(|k| *k = self.from_radix_key(*k));
    }
}

/// Identity mapping for keys whose bits already follow the declared number system.
#[derive(Debug, Clone, Copy)]
pub struct PassThrough {
    number_system: NumberSystem,
}

impl PassThrough {
    pub fn new(number_system: NumberSystem) -> Self {
        Self { number_system }
    }
}

impl<K: RadixKey> RadixConverter<K> for PassThrough {
    #[inline(always)]
    fn to_radix_key(&self, value: K) -> K {
        value
    }

    #[inline(always)]
    fn from_radix_key(&self, key: K) -> K {
        key
    }

    fn number_system(&self) -> NumberSystem {
        self.number_system
    }

    fn is_pass_through(&self) -> bool {
        true
    }

    fn to_radix(&self, source: &[K], destination: &mut [K]) {
        destination.copy_from_slice(source);
    }

    fn from_radix(&self, source: &[K], destination: &mut [K]) {
        destination.copy_from_slice(source);
    }

    fn to_radix_in_place(&self, _keys: &mut [K]) {}

    fn from_radix_in_place(&self, _keys: &mut [K]) {}
}

/// Shifts the signed range so that `MIN` maps to zero and `MAX` to the top of the unsigned
/// range. Also used for ones-complement values, whose order survives the same shift.
#[derive(Debug, Clone, Copy, Default)]
pub struct TwosComplementConverter;

impl<K: RadixKey> RadixConverter<K> for TwosComplementConverter {
    #[inline(always)]
    fn to_radix_key(&self, value: K) -> K {
        value.flip_sign()
    }

    #[inline(always)]
    fn from_radix_key(&self, key: K) -> K {
        key.unflip_sign()
    }

    fn number_system(&self) -> NumberSystem {
        NumberSystem::Unsigned
    }

    fn to_radix(&self, source: &[K], destination: &mut [K]) {
        map_lanes(source, destination, K::flip_sign_lanes, K::flip_sign);
    }

    fn from_radix(&self, source: &[K], destination: &mut [K]) {
        // the shift is its own inverse modulo 2^BITS
        map_lanes(source, destination, K::flip_sign_lanes, K::unflip_sign);
    }

    fn to_radix_in_place(&self, keys: &mut [K]) {
        map_lanes_in_place(keys, K::flip_sign_lanes, K::flip_sign);
    }

    fn from_radix_in_place(&self, keys: &mut [K]) {
        map_lanes_in_place(keys, K::flip_sign_lanes, K::unflip_sign);
    }
}

/// IEEE-754 sign/magnitude to a key that orders as a twos-complement integer.
///
/// The mapping is an involution, so both directions share one kernel. The keys it
/// produces still carry the sign in the top bit, which is why it declares
/// [`NumberSystem::TwosComplement`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SignBitConverter;

impl<K: RadixKey> RadixConverter<K> for SignBitConverter {
    #[inline(always)]
    fn to_radix_key(&self, value: K) -> K {
        value.sign_magnitude_to_signed()
    }

    #[inline(always)]
    fn from_radix_key(&self, key: K) -> K {
        key.sign_magnitude_to_signed()
    }

    fn number_system(&self) -> NumberSystem {
        NumberSystem::TwosComplement
    }

    fn to_radix(&self, source: &[K], destination: &mut [K]) {
        map_lanes(source, destination, K::sign_magnitude_lanes, K::sign_magnitude_to_signed);
    }

    fn from_radix(&self, source: &[K], destination: &mut [K]) {
        map_lanes(source, destination, K::sign_magnitude_lanes, K::sign_magnitude_to_signed);
    }

    fn to_radix_in_place(&self, keys: &mut [K]) {
        map_lanes_in_place(keys, K::sign_magnitude_lanes, K::sign_magnitude_to_signed);
    }

    fn from_radix_in_place(&self, keys: &mut [K]) {
        map_lanes_in_place(keys, K::sign_magnitude_lanes, K::sign_magnitude_to_signed);
    }
}

type LaneKernel<K> = unsafe fn(*const K, *mut K, usize) -> usize;

#[inline]
fn map_lanes<K: RadixKey>(source: &[K], destination: &mut [K], kernel: LaneKernel<K>, scalar: fn(K) -> K) {
    let len = source.len().min(destination.len());
    // SAFETY: both pointers are valid for `len` elements and the kernel stays below `len`.
    let done = unsafe { kernel(source.as_ptr(), destination.as_mut_ptr(), len) };
    for (dst, &src) in destination[done..len].iter_mut().zip(&source[done..len]) {
        *dst = scalar(src);
    }
}

#[inline]
fn map_lanes_in_place<K: RadixKey>(keys: &mut [K], kernel: LaneKernel<K>, scalar: fn(K) -> K) {
    let ptr = keys.as_mut_ptr();
    // SAFETY: the kernel loads each lane before storing it back to the same address.
    let done = unsafe { kernel(ptr, ptr, keys.len()) };
    keys[done..].iter_mut().for_each(|k| *k = scalar(*k));
}
