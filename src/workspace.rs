//! Workspace sizing and layout.
//!
//! A workspace starts with the bucket tables (`u32` counts, one table of `2^r` entries per
//! worker) followed by `n` elements used as the alternate scatter buffer. Both sizes are
//! expressed in elements of the key type so callers can allocate one buffer.

use std::any::type_name;
use std::mem::size_of;
use std::num::NonZeroUsize;

use bytemuck::Pod;

use crate::{RadixKey, Result, SortError, KEYS_PER_WORKER, MAX_RADIX_BITS, MIN_RADIX_BITS};

pub(crate) fn check_radix_bits(bits: u32) -> Result<u32> {
    if (MIN_RADIX_BITS..=MAX_RADIX_BITS).contains(&bits) {
        Ok(bits)
    } else {
        Err(SortError::RadixBitsOutOfRange { bits, min: MIN_RADIX_BITS, max: MAX_RADIX_BITS })
    }
}

pub(crate) fn check_key_width<T>() -> Result<usize> {
    match size_of::<T>() {
        bytes @ (1 | 2 | 4 | 8) => Ok(bytes),
        bytes => Err(SortError::UnsupportedKeyWidth { type_name: type_name::<T>(), bytes }),
    }
}

pub(crate) fn check_len(len: usize) -> Result<()> {
    if len > u32::MAX as usize {
        return Err(SortError::TooManyKeys { len, max: u32::MAX as usize });
    }
    Ok(())
}

/// Digit width actually used for keys of `bytes` bytes. Wider digits than the key are pointless.
#[inline]
pub(crate) fn effective_bits(bits: u32, bytes: usize) -> u32 {
    bits.min(bytes as u32 * 8)
}

/// Elements of `bytes` bytes needed to hold `tables` bucket tables of `2^bits` counts,
/// including slack to realign the `u32` counts inside a buffer of narrower elements.
fn table_units(bytes: usize, bits: u32, tables: usize) -> usize {
    let count_bytes = (1usize << bits) * size_of::<u32>() * tables;
    let slack = (size_of::<u32>() - bytes.min(size_of::<u32>())) / bytes;
    count_bytes.div_ceil(bytes) + slack
}

fn required_len(bytes: usize, len: usize, bits: u32, tables: usize) -> usize {
    if len <= 1 {
        return 0;
    }
    table_units(bytes, effective_bits(bits, bytes), tables) + len
}

/// Number of parallel workers for `len` keys: one per [`KEYS_PER_WORKER`] keys, bounded by
/// the available hardware threads and by `cap`.
pub(crate) fn worker_count(len: usize, cap: Option<usize>) -> usize {
    let hardware = std::thread::available_parallelism().map_or(1, NonZeroUsize::get);
    len.div_ceil(KEYS_PER_WORKER).min(hardware).min(cap.unwrap_or(usize::MAX)).max(1)
}

/// Minimum workspace length, in elements of `T`, for sorting `len` keys with `radix_bits`
/// wide digits on the serial and MSD paths.
///
/// ```
/// assert_eq!(radix_engine::workspace_size::<u32>(1000, 8).unwrap(), 256 + 1000);
/// assert_eq!(radix_engine::workspace_size::<u32>(1, 8).unwrap(), 0);
/// ```
pub fn workspace_size<T: Pod>(len: usize, radix_bits: u32) -> Result<usize> {
    let bits = check_radix_bits(radix_bits)?;
    let bytes = check_key_width::<T>()?;
    Ok(required_len(bytes, len, bits, 1))
}

/// Minimum workspace length for [`crate::parallel_sort`]: one bucket table per worker.
pub fn parallel_workspace_size<T: Pod>(len: usize, radix_bits: u32) -> Result<usize> {
    let bits = check_radix_bits(radix_bits)?;
    let bytes = check_key_width::<T>()?;
    Ok(required_len(bytes, len, bits, worker_count(len, None)))
}

pub(crate) fn required_workspace<K: RadixKey>(len: usize, bits: u32, tables: usize) -> usize {
    required_len(size_of::<K>(), len, bits, tables)
}

/// Splits a validated workspace into `tables` bucket tables of `2^bits` counts and the
/// element buffer for `len` keys.
pub(crate) fn carve<K: RadixKey>(
    workspace: &mut [K],
    len: usize,
    bits: u32,
    tables: usize,
) -> Result<(&mut [u32], &mut [K])> {
    let provided = workspace.len();
    let units = table_units(size_of::<K>(), bits, tables);
    let required = units + len;
    if provided < required {
        return Err(SortError::WorkspaceTooSmall { provided, required });
    }

    let (table, elements) = workspace.split_at_mut(units);
    let (_, counts, _) = bytemuck::pod_align_to_mut::<K, u32>(table);
    let counts = counts
        .get_mut(..(1usize << bits) * tables)
        .ok_or(SortError::WorkspaceTooSmall { provided, required })?;
    Ok((counts, &mut elements[..len]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workspace_size_u32() {
        assert_eq!(workspace_size::<u32>(1000, 8).unwrap(), 1256);
        assert_eq!(workspace_size::<i32>(3, 4).unwrap(), 16 + 3);
        assert_eq!(workspace_size::<f32>(0, 4).unwrap(), 0);
    }

    #[test]
    fn test_workspace_size_packing() {
        // 256 counts of 4 bytes in 8-byte elements
        assert_eq!(workspace_size::<u64>(10, 8).unwrap(), 128 + 10);
        // u8 keys use 8-bit digits at most, plus 3 bytes of realignment slack
        assert_eq!(workspace_size::<u8>(10, 16).unwrap(), 1024 + 3 + 10);
        assert_eq!(workspace_size::<i16>(10, 4).unwrap(), 32 + 1 + 10);
    }

    #[test]
    fn test_workspace_size_errors() {
        assert!(matches!(workspace_size::<u32>(10, 0), Err(SortError::RadixBitsOutOfRange { bits: 0, .. })));
        assert!(matches!(workspace_size::<u32>(10, 17), Err(SortError::RadixBitsOutOfRange { bits: 17, .. })));
        assert!(matches!(workspace_size::<[u8; 3]>(10, 4), Err(SortError::UnsupportedKeyWidth { bytes: 3, .. })));
    }

    #[test]
    fn test_parallel_workspace_size() {
        let workers = worker_count(100_000, None);
        assert_eq!(parallel_workspace_size::<u32>(100_000, 8).unwrap(), 256 * workers + 100_000);
        assert_eq!(parallel_workspace_size::<u32>(1, 8).unwrap(), 0);
    }

    #[test]
    fn test_worker_count() {
        assert_eq!(worker_count(0, None), 1);
        assert_eq!(worker_count(KEYS_PER_WORKER, None), 1);
        assert!(worker_count(1 << 30, Some(2)) <= 2);
        assert_eq!(worker_count(1 << 30, Some(1)), 1);
    }

    #[test]
    fn test_carve_aligns_counts() {
        let mut workspace = vec![0u8; required_workspace::<u8>(10, 4, 2) + 1];
        // misalign the start on purpose
        let (counts, elements) = carve(&mut workspace[1..], 10, 4, 2).unwrap();
        assert_eq!(counts.len(), 32);
        assert_eq!(elements.len(), 10);
        counts.fill(u32::MAX);
    }

    #[test]
    fn test_carve_too_small() {
        let mut workspace = vec![0u16; required_workspace::<u16>(10, 4, 1) - 1];
        assert!(matches!(carve(&mut workspace, 10, 4, 1), Err(SortError::WorkspaceTooSmall { .. })));
    }

    #[test]
    fn test_check_len() {
        assert!(check_len(u32::MAX as usize).is_ok());
        assert!(matches!(check_len(u32::MAX as usize + 1), Err(SortError::TooManyKeys { .. })));
    }
}
