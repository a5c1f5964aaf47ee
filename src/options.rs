use std::time::Duration;

use crate::{DEFAULT_RADIX_BITS, DEFAULT_WORKER_TIMEOUT};

/// Per-call configuration of a [`crate::RadixSorter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortOptions {
    /// Digit width `r` in bits, 1 to 16. Clamped to the key width.
    pub radix_bits: u32,
    pub descending: bool,
    /// Only key bits set here take part in the ordering. Digit groups without any mask bit
    /// are skipped. If the sign bit is masked out, keys are ordered as unsigned.
    pub key_mask: u64,
    /// Upper bound on parallel workers, on top of the hardware limit.
    pub max_workers: Option<usize>,
    /// How long a parallel phase may take before the sort fails with
    /// [`crate::SortError::WorkerTimeout`]. The call still waits for a stalled worker to
    /// finish before it returns, since workers borrow the caller's buffers; this bounds the
    /// detection of the failure, not the duration of the call.
    pub worker_timeout: Duration,
}

impl Default for SortOptions {
    fn default() -> Self {
        Self {
            radix_bits: DEFAULT_RADIX_BITS,
            descending: false,
            key_mask: u64::MAX,
            max_workers: None,
            worker_timeout: DEFAULT_WORKER_TIMEOUT,
        }
    }
}

impl SortOptions {
    pub fn new(radix_bits: u32, descending: bool) -> Self {
        Self { radix_bits, descending, ..Self::default() }
    }

    pub fn with_radix_bits(mut self, radix_bits: u32) -> Self {
        self.radix_bits = radix_bits;
        self
    }

    pub fn with_descending(mut self, descending: bool) -> Self {
        self.descending = descending;
        self
    }

    pub fn with_key_mask(mut self, key_mask: u64) -> Self {
        self.key_mask = key_mask;
        self
    }

    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = Some(max_workers);
        self
    }

    pub fn with_worker_timeout(mut self, worker_timeout: Duration) -> Self {
        self.worker_timeout = worker_timeout;
        self
    }
}

/// What a sort call did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SortStats {
    /// Workers that took part, including the calling thread. Zero when there was nothing to sort.
    pub workers: usize,
    /// Digit passes that scattered keys.
    pub passes: usize,
    /// Digit passes skipped because every key fell into one bucket.
    pub skipped_passes: usize,
    /// The keys were already in order and no pass ran.
    pub presorted: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = SortOptions::default();
        assert_eq!(options.radix_bits, 4);
        assert!(!options.descending);
        assert_eq!(options.key_mask, u64::MAX);
        assert_eq!(options.worker_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_builders() {
        let options = SortOptions::new(8, true).with_key_mask(0xFF00).with_max_workers(2);
        assert_eq!(options.radix_bits, 8);
        assert!(options.descending);
        assert_eq!(options.key_mask, 0xFF00);
        assert_eq!(options.max_workers, Some(2));
    }
}
