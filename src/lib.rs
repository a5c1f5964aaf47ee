//! Radix sorting for fixed-width numeric keys.
//!
//! Values of 8, 16, 32 or 64 bits (unsigned and signed integers, IEEE-754 floats, or any
//! [`bytemuck::Pod`] type with a registered converter) are mapped to unsigned radix keys and
//! sorted with stable counting passes, serially, on a pool of workers, or most significant
//! digit first. Every sort takes a caller-provided workspace sized with [`workspace_size`] or
//! [`parallel_workspace_size`].
//!
//! ```
//! let mut values = [-5i32, 3, -1, 0];
//! let mut workspace = vec![0i32; radix_engine::workspace_size::<i32>(values.len(), 8).unwrap()];
//! radix_engine::sort(&mut values, &mut workspace, 8, false).unwrap();
//! assert_eq!(values, [-5, -1, 0, 3]);
//! ```

mod converter;
mod counting;
mod error;
mod lanes;
mod lsd;
mod msd;
mod number_system;
mod options;
mod parallel;
mod radix_key;
mod registry;
mod sorter;
mod workspace;

use std::time::Duration;

pub use converter::{PassThrough, RadixConverter, SignBitConverter, TwosComplementConverter};
pub use error::{Result, SortError};
pub use number_system::NumberSystem;
pub use options::{SortOptions, SortStats};
pub use radix_key::{RadixKey, RadixSortable};
pub use registry::{get_converter, Registry, SignedConverter};
pub use sorter::RadixSorter;
pub use workspace::{parallel_workspace_size, workspace_size};

// 4 -> 16 buckets, 8 passes per u32, table always in L1
// 8 -> 256 buckets, 4 passes per u32
// 11 -> 6 passes per u64, 8k table per worker
// 16 -> 4 passes per u64, 256k table per worker, no longer fits into L1 cache
pub const DEFAULT_RADIX_BITS: u32 = 4;
pub const MIN_RADIX_BITS: u32 = 1;
pub const MAX_RADIX_BITS: u32 = 16;

/// Each parallel worker gets at least this many keys; smaller ranges run on the calling thread.
pub const KEYS_PER_WORKER: usize = 1024;

pub(crate) const DEFAULT_WORKER_TIMEOUT: Duration = Duration::from_secs(10);

fn sorter(radix_bits: u32, descending: bool) -> RadixSorter<'static> {
    RadixSorter::new(SortOptions::new(radix_bits, descending))
}

/// Sorts `keys` using `workspace`, which must hold at least [`workspace_size`] elements.
pub fn sort<T: RadixSortable>(keys: &mut [T], workspace: &mut [T], radix_bits: u32, descending: bool) -> Result<()> {
    sorter(radix_bits, descending).sort(keys, workspace).map(|_| ())
}

/// Sorts `keys` with a transient workspace. Meant for small inputs.
pub fn sort_small<T: RadixSortable>(keys: &mut [T], radix_bits: u32, descending: bool) -> Result<()> {
    sorter(radix_bits, descending).sort_small(keys).map(|_| ())
}

/// Sorts `keys` on all available cores. Returns the number of workers that ran.
pub fn parallel_sort<T: RadixSortable>(
    keys: &mut [T],
    workspace: &mut [T],
    radix_bits: u32,
    descending: bool,
) -> Result<usize> {
    sorter(radix_bits, descending).parallel_sort(keys, workspace).map(|stats| stats.workers)
}

/// Most-significant-digit-first sort, using the same workspace as [`sort`].
pub fn msd_sort<T: RadixSortable>(keys: &mut [T], workspace: &mut [T], radix_bits: u32, descending: bool) -> Result<()> {
    sorter(radix_bits, descending).msd_sort(keys, workspace).map(|_| ())
}

/// Number system of `T` in the process-wide registry.
pub fn number_system<T: 'static>() -> Result<NumberSystem> {
    Registry::global().number_system::<T>()
}
