//! Most-significant-digit radix sort.
//!
//! Each level scatters its range into the workspace on the top remaining digit, copies it
//! back and recurses into every bucket holding more than one key. Buckets of up to
//! [`MAX_NETWORK_LEN`] keys are finished with a sorting network. Unlike the LSD passes this
//! is not stable for small buckets.

use log::trace;

use crate::counting::{digit_pass, sort_network, Digit, KeyOrder, MAX_NETWORK_LEN};
use crate::lsd::{count_pass, low_bits};
use crate::{RadixKey, SortStats};

struct Level<'a> {
    counts: &'a mut [u32],
    order: &'a KeyOrder,
    stats: &'a mut SortStats,
}

/// Sorts radix keys in place. `workspace` must be as long as `keys`.
pub(crate) fn sort<K: RadixKey>(keys: &mut [K], workspace: &mut [K], counts: &mut [u32], order: &KeyOrder, stats: &mut SortStats) {
    debug_assert_eq!(keys.len(), workspace.len());
    if order.is_ordered(keys) {
        trace!("{} keys already ordered, no pass needed", keys.len());
        stats.presorted = true;
        return;
    }

    let mut level = Level { counts, order, stats };
    if !order.splits_sign() {
        level.sort(keys, workspace, K::BITS, order.key_mask, order.descending);
        return;
    }

    let pass = digit_pass(keys, workspace, order.sign_digit::<K>(), 1, level.counts);
    count_pass(level.stats, pass);
    if pass.applied {
        keys.copy_from_slice(workspace);
    }
    let split = pass.first_count;
    trace!("Sign split of {} keys at {split}", keys.len());

    let [first_descending, second_descending] = order.half_directions();
    let mask = order.magnitude_mask::<K>();
    let (first, second) = keys.split_at_mut(split);
    let (first_workspace, second_workspace) = workspace.split_at_mut(split);
    level.sort(first, first_workspace, K::BITS - 1, mask, first_descending);
    level.sort(second, second_workspace, K::BITS - 1, mask, second_descending);
}

impl Level<'_> {
    /// Orders `keys` on the bits of `key_mask` below `top_bits`.
    fn sort<K: RadixKey>(&mut self, keys: &mut [K], workspace: &mut [K], top_bits: u32, key_mask: u64, descending: bool) {
        let key_mask = key_mask & low_bits(top_bits);
        if keys.len() < 2 || key_mask == 0 {
            return;
        }
        if keys.len() <= MAX_NETWORK_LEN {
            let flip = if descending { u64::MAX } else { 0 };
            sort_network(keys, |key| (key.to_u64() & key_mask) ^ flip);
            return;
        }

        let low = top_bits.saturating_sub(self.order.bits);
        let width = top_bits - low;
        let group_mask = (key_mask >> low) & low_bits(width);
        if group_mask == 0 {
            return self.sort(keys, workspace, low, key_mask, descending);
        }

        let digit = Digit::new(low, width, group_mask, descending);
        let workspace = &mut workspace[..keys.len()];
        let pass = digit_pass(keys, workspace, digit, 0, self.counts);
        count_pass(self.stats, pass);

        if !pass.applied {
            return self.sort(keys, workspace, low, key_mask, descending);
        }

        keys.copy_from_slice(workspace);
        // the scatter leaves the keys grouped by ascending bucket
        let mut start = 0;
        while start < keys.len() {
            let bucket = digit.bucket(keys[start]);
            let end = start + keys[start..].partition_point(|&key| digit.bucket(key) == bucket);
            if end - start > 1 {
                self.sort(&mut keys[start..end], &mut workspace[start..end], low, key_mask, descending);
            }
            start = end;
        }
    }
}
