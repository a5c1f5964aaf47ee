// Counting sort building blocks shared by the LSD, parallel and MSD drivers.
// Based on
// http://codercorner.com/RadixSortRevisited.htm
// http://stereopsis.com/radix.html

use crate::radix_key::order_rank;
use crate::{NumberSystem, RadixKey};

/// One digit group of a radix key: `group_mask` bits at `shift`, read from the complemented key
/// when sorting descending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Digit {
    shift: u32,
    mask: u64,
    flip: u64,
    buckets: usize,
}

impl Digit {
    /// `mask` selects which of the `bits` digit bits take part. Buckets for masked-out bits stay empty.
    #[inline]
    pub(crate) fn new(shift: u32, bits: u32, mask: u64, descending: bool) -> Self {
        debug_assert!(mask < 1 << bits);
        Self { shift, mask, flip: if descending { u64::MAX } else { 0 }, buckets: 1 << bits }
    }

    #[inline(always)]
    pub(crate) fn bucket<K: RadixKey>(&self, key: K) -> usize {
        (((key.to_u64() ^ self.flip) >> self.shift) & self.mask) as usize
    }

    #[inline(always)]
    pub(crate) fn buckets(&self) -> usize {
        self.buckets
    }
}

/// Result of one counting-sort pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DigitPass {
    /// False when every key fell into the same bucket and nothing moved.
    pub(crate) applied: bool,
    /// Number of keys in the bucket emitted first.
    pub(crate) first_count: usize,
}

impl DigitPass {
    pub(crate) fn skipped(len: usize, bucket: usize, first_bucket: usize) -> Self {
        Self { applied: false, first_count: if bucket == first_bucket { len } else { 0 } }
    }
}

/// Fill `counts` with the bucket sizes of `keys` for `digit`.
///
/// Returns the bucket when all keys belong to it.
#[inline(never)]
pub(crate) fn count_digits<K: RadixKey>(keys: &[K], digit: Digit, counts: &mut [u32]) -> Option<usize> {
    let counts = &mut counts[..digit.buckets];
    counts.fill(0);

    let mut last_bucket = 0;
    keys.iter().for_each(|&key| {
        let bucket = digit.bucket(key);
        counts[bucket] += 1;
        last_bucket = bucket;
    });

    // if every key is in the same bucket then no reordering is necessary
    (counts[last_bucket] as usize == keys.len()).then_some(last_bucket)
}

/// Turn bucket sizes into write cursors starting at `base`, visiting buckets from `first_bucket`
/// and wrapping around to the ones before it.
#[inline(never)]
pub(crate) fn exclusive_prefix(counts: &mut [u32], first_bucket: usize, base: u32) {
    let (wrapped, leading) = counts.split_at_mut(first_bucket);
    let mut sum = base;
    leading.iter_mut().chain(wrapped.iter_mut()).for_each(|count| {
        let tmp = *count;
        *count = sum;
        sum += tmp;
    });
}

/// Stable scatter of `keys` to `output[cursor]`, advancing the cursor of each bucket.
///
/// # Safety
/// Every cursor, advanced once per key of its bucket, must stay inside the allocation behind
/// `output`, and no other thread may access those slots while this runs. Cursors produced by
/// [`exclusive_prefix`] over the counts of `keys` (or of a partition of the range being
/// scattered) satisfy this.
#[inline(never)]
pub(crate) unsafe fn scatter<K: RadixKey>(keys: &[K], output: *mut K, digit: Digit, cursors: &mut [u32]) {
    let cursors = &mut cursors[..digit.buckets];
    let chunks = keys.chunks_exact(8);
    let remainder = chunks.remainder();
    chunks.into_iter().for_each(|chunk| {
        chunk.iter().for_each(|&key| {
            let bucket = digit.bucket(key);
            let output_idx = cursors[bucket];
            *output.add(output_idx as usize) = key;
            cursors[bucket] = output_idx + 1;
        });
    });
    remainder.iter().for_each(|&key| {
        let bucket = digit.bucket(key);
        let output_idx = cursors[bucket];
        *output.add(output_idx as usize) = key;
        cursors[bucket] = output_idx + 1;
    });
}

/// Count, prefix and scatter `source` into `destination` on one digit.
///
/// When all keys share a bucket nothing is written and `destination` must not be treated as
/// holding the keys. Afterwards `counts[b]` holds the end offset of bucket `b`.
pub(crate) fn digit_pass<K: RadixKey>(
    source: &[K],
    destination: &mut [K],
    digit: Digit,
    first_bucket: usize,
    counts: &mut [u32],
) -> DigitPass {
    assert_eq!(source.len(), destination.len());

    if let Some(bucket) = count_digits(source, digit, counts) {
        return DigitPass::skipped(source.len(), bucket, first_bucket);
    }

    let first_count = counts[first_bucket] as usize;
    exclusive_prefix(&mut counts[..digit.buckets], first_bucket, 0);
    // SAFETY: the cursors partition 0..source.len() and destination has the same length.
    unsafe { scatter(source, destination.as_mut_ptr(), digit, counts) };
    DigitPass { applied: true, first_count }
}

/// How radix keys are ordered for one sort call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct KeyOrder {
    pub(crate) number_system: NumberSystem,
    pub(crate) bits: u32,
    pub(crate) key_mask: u64,
    pub(crate) descending: bool,
}

impl KeyOrder {
    pub(crate) fn new<K: RadixKey>(number_system: NumberSystem, bits: u32, key_mask: u64, descending: bool) -> Self {
        let key_mask = key_mask & K::MAX.to_u64();
        // without the sign bit the remaining bits are plain magnitudes
        let number_system = if key_mask & K::SIGN_BIT.to_u64() == 0 { NumberSystem::Unsigned } else { number_system };
        Self { number_system, bits: bits.min(K::BITS), key_mask, descending }
    }

    pub(crate) fn splits_sign(&self) -> bool {
        self.number_system.is_signed()
    }

    /// The one-bit pass that puts the half to be emitted first into bucket 1.
    pub(crate) fn sign_digit<K: RadixKey>(&self) -> Digit {
        Digit::new(K::BITS - 1, 1, 1, self.descending)
    }

    /// Directions of the two halves after the sign split, in emission order.
    ///
    /// Sign/magnitude keys store negatives as growing magnitudes, so the half emitted first
    /// (negatives ascending, positives descending) always runs descending and the other ascending.
    pub(crate) fn half_directions(&self) -> [bool; 2] {
        match self.number_system {
            NumberSystem::SignBit => [true, false],
            _ => [self.descending, self.descending],
        }
    }

    /// Mask of the key bits below the sign bit.
    pub(crate) fn magnitude_mask<K: RadixKey>(&self) -> u64 {
        self.key_mask & !K::SIGN_BIT.to_u64()
    }

    #[inline(always)]
    pub(crate) fn rank<K: RadixKey>(&self, key: K) -> u64 {
        let rank = order_rank(key, self.number_system) & self.key_mask;
        if self.descending {
            !rank
        } else {
            rank
        }
    }

    pub(crate) fn is_ordered<K: RadixKey>(&self, keys: &[K]) -> bool {
        keys.windows(2).all(|w| self.rank(w[0]) <= self.rank(w[1]))
    }
}

/// Largest bucket the MSD driver hands to a sorting network.
pub(crate) const MAX_NETWORK_LEN: usize = 5;

const NETWORK_2: &[(usize, usize)] = &[(0, 1)];
const NETWORK_3: &[(usize, usize)] = &[(0, 1), (1, 2), (0, 1)];
const NETWORK_4: &[(usize, usize)] = &[(0, 1), (2, 3), (0, 2), (1, 3), (1, 2)];
const NETWORK_5: &[(usize, usize)] = &[(0, 3), (1, 4), (0, 2), (1, 3), (0, 1), (2, 4), (1, 2), (3, 4), (2, 3)];

/// Sort up to [`MAX_NETWORK_LEN`] keys ascending by `rank` with a fixed compare-exchange network.
#[inline]
pub(crate) fn sort_network<K: RadixKey>(keys: &mut [K], rank: impl Fn(K) -> u64) {
    let network = match keys.len() {
        2 => NETWORK_2,
        3 => NETWORK_3,
        4 => NETWORK_4,
        5 => NETWORK_5,
        _ => return,
    };
    for &(a, b) in network {
        if rank(keys[a]) > rank(keys[b]) {
            keys.swap(a, b);
        }
    }
}
