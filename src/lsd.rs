//! Least-significant-digit radix sort.
//!
//! The driver only decides which digit runs over which range in which direction, and where
//! the authoritative copy of each range lives. Executing a pass is left to a [`PassEngine`],
//! so the serial and the parallel sorts share the split and reconcile logic.

use std::ops::Range;
use std::sync::Arc;

use log::trace;

use crate::counting::{self, Digit, DigitPass, KeyOrder};
use crate::{RadixConverter, RadixKey, Result, SortStats};

/// Executes digit passes over a pair of buffers: the caller's keys and the workspace elements.
pub(crate) trait PassEngine<K: RadixKey> {
    fn len(&self) -> usize;

    /// Radix keys in the caller's buffer. Only meaningful before the first pass.
    fn keys(&self) -> &[K];

    /// Counting-sort `range` on `digit` from one buffer into the other.
    fn digit_pass(
        &mut self,
        range: Range<usize>,
        from_workspace: bool,
        digit: Digit,
        first_bucket: usize,
    ) -> Result<DigitPass>;

    /// Copies `range` from the buffer it is in into the other one.
    fn copy_range(&mut self, range: Range<usize>, from_workspace: bool) -> Result<()>;

    fn to_radix(&mut self, converter: &Arc<dyn RadixConverter<K>>) -> Result<()>;

    /// Converts back into the caller's buffer, reading from the workspace if the sorted keys are there.
    fn from_radix(&mut self, converter: &Arc<dyn RadixConverter<K>>, from_workspace: bool) -> Result<()>;
}

/// Converts, sorts and converts back, leaving the result in the caller's buffer.
pub(crate) fn run<K: RadixKey, E: PassEngine<K>>(
    engine: &mut E,
    converter: Option<&Arc<dyn RadixConverter<K>>>,
    order: &KeyOrder,
    stats: &mut SortStats,
) -> Result<()> {
    if let Some(converter) = converter {
        engine.to_radix(converter)?;
    }

    let in_workspace = sort(engine, order, stats)?;

    match converter {
        Some(converter) => engine.from_radix(converter, in_workspace),
        None if in_workspace => engine.copy_range(0..engine.len(), true),
        None => Ok(()),
    }
}

/// Sorts the radix keys in the caller's buffer. Returns true when the result ended in the workspace.
pub(crate) fn sort<K: RadixKey, E: PassEngine<K>>(engine: &mut E, order: &KeyOrder, stats: &mut SortStats) -> Result<bool> {
    let len = engine.len();
    if order.is_ordered(engine.keys()) {
        trace!("{len} keys already ordered, no pass needed");
        stats.presorted = true;
        return Ok(false);
    }

    if !order.splits_sign() {
        return sort_range(engine, 0..len, false, order.key_mask, K::BITS, order.bits, order.descending, stats);
    }

    let pass = engine.digit_pass(0..len, false, order.sign_digit::<K>(), 1)?;
    count_pass(stats, pass);
    let split = pass.first_count;
    trace!("Sign split of {len} keys at {split}");

    let [first_descending, second_descending] = order.half_directions();
    let mask = order.magnitude_mask::<K>();
    let bits = K::BITS - 1;
    let in_workspace = pass.applied;

    let first = 0..split;
    let second = split..len;
    let first_in_workspace =
        sort_range(engine, first.clone(), in_workspace, mask, bits, order.bits, first_descending, stats)?;
    let second_in_workspace =
        sort_range(engine, second.clone(), in_workspace, mask, bits, order.bits, second_descending, stats)?;

    reconcile(engine, (first, first_in_workspace), (second, second_in_workspace))
}

/// Brings both halves into one buffer by moving the smaller one. Returns where they ended up.
fn reconcile<K: RadixKey, E: PassEngine<K>>(
    engine: &mut E,
    first: (Range<usize>, bool),
    second: (Range<usize>, bool),
) -> Result<bool> {
    let (smaller, larger) = if first.0.len() <= second.0.len() { (first, second) } else { (second, first) };
    if smaller.0.is_empty() || smaller.1 == larger.1 {
        return Ok(larger.1);
    }
    trace!("Moving {} keys to join {} keys", smaller.0.len(), larger.0.len());
    engine.copy_range(smaller.0, smaller.1)?;
    Ok(larger.1)
}

/// Runs the digit groups below `top_bits` over `range`, skipping groups without mask bits
/// and groups where every key shares a bucket.
#[allow(clippy::too_many_arguments)]
pub(crate) fn sort_range<K: RadixKey, E: PassEngine<K>>(
    engine: &mut E,
    range: Range<usize>,
    mut in_workspace: bool,
    key_mask: u64,
    top_bits: u32,
    radix_bits: u32,
    descending: bool,
    stats: &mut SortStats,
) -> Result<bool> {
    if range.len() < 2 {
        return Ok(in_workspace);
    }

    let key_mask = key_mask & low_bits(top_bits);
    let digit_mask = low_bits(radix_bits);
    let mut shift = 0;
    while shift < top_bits && key_mask >> shift != 0 {
        let group_mask = (key_mask >> shift) & digit_mask;
        if group_mask != 0 {
            let digit = Digit::new(shift, radix_bits, group_mask, descending);
            let pass = engine.digit_pass(range.clone(), in_workspace, digit, 0)?;
            count_pass(stats, pass);
            if pass.applied {
                in_workspace = !in_workspace;
            } else {
                trace!("Skipped digit at shift {shift} for {} keys", range.len());
            }
        }
        shift += radix_bits;
    }
    Ok(in_workspace)
}

#[inline]
pub(crate) fn low_bits(bits: u32) -> u64 {
    if bits >= u64::BITS {
        u64::MAX
    } else {
        (1 << bits) - 1
    }
}

pub(crate) fn count_pass(stats: &mut SortStats, pass: DigitPass) {
    if pass.applied {
        stats.passes += 1;
    } else {
        stats.skipped_passes += 1;
    }
}

/// Runs every pass on the calling thread.
pub(crate) struct SerialPasses<'a, K> {
    keys: &'a mut [K],
    workspace: &'a mut [K],
    counts: &'a mut [u32],
}

impl<'a, K: RadixKey> SerialPasses<'a, K> {
    pub(crate) fn new(keys: &'a mut [K], workspace: &'a mut [K], counts: &'a mut [u32]) -> Self {
        debug_assert_eq!(keys.len(), workspace.len());
        Self { keys, workspace, counts }
    }
}

impl<K: RadixKey> PassEngine<K> for SerialPasses<'_, K> {
    fn len(&self) -> usize {
        self.keys.len()
    }

    fn keys(&self) -> &[K] {
        &*self.keys
    }

    fn digit_pass(
        &mut self,
        range: Range<usize>,
        from_workspace: bool,
        digit: Digit,
        first_bucket: usize,
    ) -> Result<DigitPass> {
        let (source, destination) = if from_workspace {
            (&self.workspace[range.clone()], &mut self.keys[range])
        } else {
            (&self.keys[range.clone()], &mut self.workspace[range])
        };
        Ok(counting::digit_pass(source, destination, digit, first_bucket, self.counts))
    }

    fn copy_range(&mut self, range: Range<usize>, from_workspace: bool) -> Result<()> {
        if from_workspace {
            self.keys[range.clone()].copy_from_slice(&self.workspace[range]);
        } else {
            self.workspace[range.clone()].copy_from_slice(&self.keys[range]);
        }
        Ok(())
    }

    fn to_radix(&mut self, converter: &Arc<dyn RadixConverter<K>>) -> Result<()> {
        converter.to_radix_in_place(self.keys);
        Ok(())
    }

    fn from_radix(&mut self, converter: &Arc<dyn RadixConverter<K>>, from_workspace: bool) -> Result<()> {
        if from_workspace {
            converter.from_radix(self.workspace, self.keys);
        } else {
            converter.from_radix_in_place(self.keys);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NumberSystem;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn serial_sort<K: RadixKey>(keys: &mut [K], order: KeyOrder) -> SortStats {
        let mut workspace = keys.to_vec();
        let mut counts = vec![0u32; 1 << order.bits];
        let mut stats = SortStats::default();
        let mut engine = SerialPasses::new(keys, &mut workspace, &mut counts);
        run(&mut engine, None, &order, &mut stats).unwrap();
        stats
    }

    #[test]
    fn test_unsigned_ascending() {
        let mut keys = [3u32, 1, 2];
        let stats = serial_sort(&mut keys, KeyOrder::new::<u32>(NumberSystem::Unsigned, 4, u64::MAX, false));
        assert_eq!(keys, [1, 2, 3]);
        // only the lowest nibble differs
        assert_eq!(stats.passes, 1);
        assert_eq!(stats.skipped_passes, 7);
    }

    #[test]
    fn test_twos_complement_raw() {
        let mut keys = [-5i32, 3, -1, 0, i32::MIN, i32::MAX].map(|v| v as u32);
        serial_sort(&mut keys, KeyOrder::new::<u32>(NumberSystem::TwosComplement, 8, u64::MAX, false));
        assert_eq!(keys.map(|v| v as i32), [i32::MIN, -5, -1, 0, 3, i32::MAX]);
    }

    #[test]
    fn test_sign_bit_raw_both_directions() {
        let values = [1.5f64, -2.5, 0.0, -0.0, 3.25, -7.0, f64::INFINITY];
        let mut keys = values.map(f64::to_bits);
        serial_sort(&mut keys, KeyOrder::new::<u64>(NumberSystem::SignBit, 8, u64::MAX, false));
        assert_eq!(keys.map(f64::from_bits), [-7.0, -2.5, -0.0, 0.0, 1.5, 3.25, f64::INFINITY]);
        assert!(f64::from_bits(keys[2]).is_sign_negative());

        let mut keys = values.map(f64::to_bits);
        serial_sort(&mut keys, KeyOrder::new::<u64>(NumberSystem::SignBit, 8, u64::MAX, true));
        assert_eq!(keys.map(f64::from_bits), [f64::INFINITY, 3.25, 1.5, 0.0, -0.0, -2.5, -7.0]);
        assert!(f64::from_bits(keys[4]).is_sign_negative());
    }

    #[test]
    fn test_presorted_runs_no_pass() {
        let mut keys: Vec<u16> = (0..100).collect();
        let stats = serial_sort(&mut keys, KeyOrder::new::<u16>(NumberSystem::Unsigned, 4, u64::MAX, false));
        assert!(stats.presorted);
        assert_eq!(stats.passes + stats.skipped_passes, 0);
    }

    #[test]
    fn test_key_mask_skips_groups() {
        let mut keys = [0x0300u16, 0x0100, 0x0200];
        let stats = serial_sort(&mut keys, KeyOrder::new::<u16>(NumberSystem::Unsigned, 4, 0x0F00, false));
        assert_eq!(keys, [0x0100, 0x0200, 0x0300]);
        assert_eq!(stats.passes + stats.skipped_passes, 1);
    }

    #[test]
    fn test_reconcile_moves_smaller_half() {
        let mut rng = StdRng::seed_from_u64(42);
        for len in [2usize, 3, 17, 1000] {
            for negatives in [0, 1, len / 2, len - 1, len] {
                let mut keys: Vec<u32> = (0..len)
                    .map(|i| {
                        let magnitude = rng.gen_range(0..1000);
                        if i < negatives { -(magnitude as i32) - 1 } else { magnitude as i32 }
                    })
                    .map(|v| v as u32)
                    .collect();
                let mut expected: Vec<i32> = keys.iter().map(|&v| v as i32).collect();
                expected.sort_unstable();
                serial_sort(&mut keys, KeyOrder::new::<u32>(NumberSystem::TwosComplement, 4, u64::MAX, false));
                assert_eq!(keys.iter().map(|&v| v as i32).collect::<Vec<_>>(), expected, "{len} {negatives}");
            }
        }
    }

    #[test]
    fn test_low_bits() {
        assert_eq!(low_bits(0), 0);
        assert_eq!(low_bits(4), 0xF);
        assert_eq!(low_bits(64), u64::MAX);
    }
}
