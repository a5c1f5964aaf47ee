//! Worker-partitioned LSD passes.
//!
//! A fixed set of scoped worker threads lives for one sort call. The calling thread drives
//! them through phases (count, scatter, copy, convert) and acts as worker 0 itself. Each
//! worker owns one contiguous chunk of the phase range and one bucket table; the tables are
//! merged into global write cursors on the calling thread between the count and the scatter
//! phase, so the per-key loops never touch shared counters.

use std::marker::PhantomData;
use std::ops::Range;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};
use std::{ptr, slice, thread};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use log::{debug, warn};

use crate::counting::{self, count_digits, scatter, Digit, DigitPass};
use crate::lsd::PassEngine;
use crate::{RadixConverter, RadixKey, Result, SortError, KEYS_PER_WORKER};

/// Raw views of the buffers of one sort call, shared with the workers.
///
/// Phases hand every worker a disjoint chunk of the key ranges and its own bucket table, and
/// the calling thread only touches the buffers between phases.
struct Buffers<K> {
    keys: *mut K,
    workspace: *mut K,
    counts: *mut u32,
    len: usize,
    stride: usize,
}

impl<K> Clone for Buffers<K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K> Copy for Buffers<K> {}

// SAFETY: see the type docs; all access through the pointers is partitioned by phase and chunk.
unsafe impl<K: Send> Send for Buffers<K> {}
unsafe impl<K: Sync> Sync for Buffers<K> {}

impl<K: RadixKey> Buffers<K> {
    fn source_destination(self, from_workspace: bool) -> (*const K, *mut K) {
        if from_workspace {
            (self.workspace as *const K, self.keys)
        } else {
            (self.keys as *const K, self.workspace)
        }
    }

    /// # Safety
    /// Nobody else may access `range` of either buffer for the returned lifetime.
    unsafe fn ranges<'b>(self, range: Range<usize>, from_workspace: bool) -> (&'b [K], &'b mut [K]) {
        let (source, destination) = self.source_destination(from_workspace);
        (
            slice::from_raw_parts(source.add(range.start), range.len()),
            slice::from_raw_parts_mut(destination.add(range.start), range.len()),
        )
    }

    /// # Safety
    /// Nobody else may access the table of `worker` for the returned lifetime.
    unsafe fn counts<'b>(self, worker: usize) -> &'b mut [u32] {
        slice::from_raw_parts_mut(self.counts.add(worker * self.stride), self.stride)
    }
}

/// One unit of work, broadcast to every worker.
#[derive(Clone)]
enum Phase<K: RadixKey> {
    Count { range: Range<usize>, from_workspace: bool, digit: Digit },
    Scatter { range: Range<usize>, from_workspace: bool, digit: Digit },
    Copy { range: Range<usize>, from_workspace: bool },
    ToRadix(Arc<dyn RadixConverter<K>>),
    FromRadix { converter: Arc<dyn RadixConverter<K>>, from_workspace: bool },
}

impl<K: RadixKey> Phase<K> {
    fn name(&self) -> &'static str {
        match self {
            Phase::Count { .. } => "count",
            Phase::Scatter { .. } => "scatter",
            Phase::Copy { .. } => "copy",
            Phase::ToRadix(_) => "to_radix",
            Phase::FromRadix { .. } => "from_radix",
        }
    }
}

#[derive(Debug)]
struct Report {
    worker: usize,
    completed: bool,
}

/// Carried from a worker's count phase to its scatter phase.
#[derive(Debug, Default)]
struct WorkerState {
    single_bucket: Option<usize>,
}

/// Chunk of `range` owned by `worker` out of `workers`.
fn chunk(range: &Range<usize>, worker: usize, workers: usize) -> Range<usize> {
    let len = range.len();
    let per_worker = len.div_ceil(workers);
    let start = (worker * per_worker).min(len);
    let end = ((worker + 1) * per_worker).min(len);
    range.start + start..range.start + end
}

/// # Safety
/// `buffers` must be valid for the whole call and no other thread may touch this worker's
/// chunk of the phase range or its bucket table while it runs.
unsafe fn run_phase<K: RadixKey>(
    phase: &Phase<K>,
    worker: usize,
    workers: usize,
    buffers: Buffers<K>,
    state: &mut WorkerState,
) {
    let whole = 0..buffers.len;
    match phase {
        Phase::Count { range, from_workspace, digit } => {
            let (keys, _) = buffers.ranges(chunk(range, worker, workers), *from_workspace);
            state.single_bucket = count_digits(keys, *digit, buffers.counts(worker));
        }
        Phase::Scatter { range, from_workspace, digit } => {
            let own = chunk(range, worker, workers);
            let (source, destination) = buffers.source_destination(*from_workspace);
            let keys = slice::from_raw_parts(source.add(own.start), own.len());
            let cursors = buffers.counts(worker);
            match state.single_bucket {
                // the whole chunk lands contiguously at its bucket cursor
                Some(bucket) => ptr::copy_nonoverlapping(keys.as_ptr(), destination.add(cursors[bucket] as usize), keys.len()),
                None => scatter(keys, destination, *digit, cursors),
            }
        }
        Phase::Copy { range, from_workspace } => {
            let (source, destination) = buffers.ranges(chunk(range, worker, workers), *from_workspace);
            destination.copy_from_slice(source);
        }
        Phase::ToRadix(converter) => {
            let (_, keys) = buffers.ranges(chunk(&whole, worker, workers), true);
            converter.to_radix_in_place(keys);
        }
        Phase::FromRadix { converter, from_workspace } => {
            let (source, keys) = buffers.ranges(chunk(&whole, worker, workers), true);
            if *from_workspace {
                converter.from_radix(source, keys);
            } else {
                converter.from_radix_in_place(keys);
            }
        }
    }
}

fn worker_loop<K: RadixKey>(
    worker: usize,
    workers: usize,
    buffers: Buffers<K>,
    phases: Receiver<Phase<K>>,
    reports: Sender<Report>,
) {
    let mut state = WorkerState::default();
    for phase in phases.iter() {
        // SAFETY: the driver hands out disjoint chunks and waits for every report before
        // touching the buffers again.
        let result = panic::catch_unwind(AssertUnwindSafe(|| unsafe {
            run_phase(&phase, worker, workers, buffers, &mut state)
        }));
        if reports.send(Report { worker, completed: result.is_ok() }).is_err() {
            break;
        }
    }
}

/// Runs `body` with a pool of `workers` threads (the calling thread included) over the buffers.
pub(crate) fn with_workers<K: RadixKey, R>(
    keys: &mut [K],
    workspace: &mut [K],
    counts: &mut [u32],
    workers: usize,
    timeout: Duration,
    body: impl FnOnce(&mut ParallelPasses<'_, K>) -> Result<R>,
) -> Result<R> {
    debug_assert_eq!(keys.len(), workspace.len());
    debug_assert!(workers >= 1 && counts.len() % workers == 0);
    let buffers = Buffers {
        keys: keys.as_mut_ptr(),
        workspace: workspace.as_mut_ptr(),
        counts: counts.as_mut_ptr(),
        len: keys.len(),
        stride: counts.len() / workers,
    };

    thread::scope(|scope| {
        let (report_tx, report_rx) = bounded(workers);
        let mut commands = Vec::with_capacity(workers - 1);
        for worker in 1..workers {
            let (phase_tx, phase_rx) = bounded(1);
            let reports = report_tx.clone();
            thread::Builder::new()
                .name(format!("radix-worker-{worker}"))
                .spawn_scoped(scope, move || worker_loop(worker, workers, buffers, phase_rx, reports))
                .map_err(|source| SortError::WorkerSpawn { worker, source })?;
            commands.push(phase_tx);
        }
        drop(report_tx);
        debug!("Started {} radix workers for {} keys", workers, buffers.len);

        let mut engine = ParallelPasses {
            buffers,
            workers,
            commands,
            reports: report_rx,
            timeout,
            local: WorkerState::default(),
            _buffers: PhantomData,
        };
        // dropping the engine closes the phase channels and lets the scope join the workers
        body(&mut engine)
    })
}

/// [`PassEngine`] that fans every phase out over the worker pool.
pub(crate) struct ParallelPasses<'a, K: RadixKey> {
    buffers: Buffers<K>,
    workers: usize,
    commands: Vec<Sender<Phase<K>>>,
    reports: Receiver<Report>,
    timeout: Duration,
    local: WorkerState,
    _buffers: PhantomData<&'a mut [K]>,
}

impl<K: RadixKey> ParallelPasses<'_, K> {
    fn runs_serially(&self, len: usize) -> bool {
        self.workers == 1 || len < KEYS_PER_WORKER
    }

    /// Runs `phase` on every worker, the calling thread included, and waits for all of them.
    fn fan_out(&mut self, phase: Phase<K>) -> Result<()> {
        let name = phase.name();
        let deadline = Instant::now() + self.timeout;
        for (index, commands) in self.commands.iter().enumerate() {
            commands.send(phase.clone()).map_err(|_| SortError::WorkerFailed { worker: index + 1, phase: name })?;
        }

        let (buffers, workers, local) = (self.buffers, self.workers, &mut self.local);
        // SAFETY: worker 0's chunk and table belong to the calling thread during the phase.
        let own = panic::catch_unwind(AssertUnwindSafe(|| unsafe { run_phase(&phase, 0, workers, buffers, local) }));

        self.barrier(name, deadline)?;
        own.map_err(|_| {
            warn!("Radix worker 0 panicked during the {name} phase");
            SortError::WorkerFailed { worker: 0, phase: name }
        })
    }

    fn barrier(&self, phase: &'static str, deadline: Instant) -> Result<()> {
        let mut reported = vec![false; self.workers];
        let mut outstanding = self.workers - 1;
        while outstanding > 0 {
            match self.reports.recv_deadline(deadline) {
                Ok(Report { worker, completed: true }) => {
                    reported[worker] = true;
                    outstanding -= 1;
                }
                Ok(Report { worker, completed: false }) => {
                    warn!("Radix worker {worker} panicked during the {phase} phase");
                    return Err(SortError::WorkerFailed { worker, phase });
                }
                Err(RecvTimeoutError::Timeout) => {
                    warn!("Timed out after {:?} waiting for {outstanding} radix workers in the {phase} phase", self.timeout);
                    return Err(SortError::WorkerTimeout { timeout: self.timeout, outstanding });
                }
                Err(RecvTimeoutError::Disconnected) => {
                    let worker = (1..self.workers).find(|&w| !reported[w]).unwrap_or(0);
                    warn!("Radix worker {worker} exited during the {phase} phase");
                    return Err(SortError::WorkerFailed { worker, phase });
                }
            }
        }
        Ok(())
    }

    /// Sums the worker tables per bucket and rewrites them into global write cursors, bucket by
    /// bucket from `first_bucket` and worker by worker inside a bucket.
    fn merge_counts(&mut self, range: &Range<usize>, buckets: usize, first_bucket: usize) -> DigitPass {
        let stride = self.buffers.stride;
        // SAFETY: no phase is running.
        let counts = unsafe { slice::from_raw_parts_mut(self.buffers.counts, self.workers * stride) };

        let bucket_total = |counts: &[u32], bucket: usize| -> usize {
            (0..self.workers).map(|worker| counts[worker * stride + bucket] as usize).sum()
        };
        if let Some(bucket) = (0..buckets).find(|&bucket| bucket_total(counts, bucket) == range.len()) {
            return DigitPass::skipped(range.len(), bucket, first_bucket);
        }
        let first_count = bucket_total(counts, first_bucket);

        let mut cursor = range.start as u32;
        for bucket in (first_bucket..buckets).chain(0..first_bucket) {
            for worker in 0..self.workers {
                let slot = &mut counts[worker * stride + bucket];
                let count = *slot;
                *slot = cursor;
                cursor += count;
            }
        }
        DigitPass { applied: true, first_count }
    }
}

impl<K: RadixKey> PassEngine<K> for ParallelPasses<'_, K> {
    fn len(&self) -> usize {
        self.buffers.len
    }

    fn keys(&self) -> &[K] {
        // SAFETY: only called between phases.
        unsafe { slice::from_raw_parts(self.buffers.keys, self.buffers.len) }
    }

    fn digit_pass(
        &mut self,
        range: Range<usize>,
        from_workspace: bool,
        digit: Digit,
        first_bucket: usize,
    ) -> Result<DigitPass> {
        if self.runs_serially(range.len()) {
            // SAFETY: no phase is running, so the calling thread owns every buffer.
            let (source, destination) = unsafe { self.buffers.ranges(range, from_workspace) };
            let counts = unsafe { self.buffers.counts(0) };
            return Ok(counting::digit_pass(source, destination, digit, first_bucket, counts));
        }

        self.fan_out(Phase::Count { range: range.clone(), from_workspace, digit })?;
        let pass = self.merge_counts(&range, digit.buckets(), first_bucket);
        if pass.applied {
            self.fan_out(Phase::Scatter { range, from_workspace, digit })?;
        }
        Ok(pass)
    }

    fn copy_range(&mut self, range: Range<usize>, from_workspace: bool) -> Result<()> {
        if self.runs_serially(range.len()) {
            // SAFETY: no phase is running.
            let (source, destination) = unsafe { self.buffers.ranges(range, from_workspace) };
            destination.copy_from_slice(source);
            return Ok(());
        }
        self.fan_out(Phase::Copy { range, from_workspace })
    }

    fn to_radix(&mut self, converter: &Arc<dyn RadixConverter<K>>) -> Result<()> {
        if self.runs_serially(self.buffers.len) {
            // SAFETY: no phase is running.
            let (_, keys) = unsafe { self.buffers.ranges(0..self.buffers.len, true) };
            converter.to_radix_in_place(keys);
            return Ok(());
        }
        self.fan_out(Phase::ToRadix(Arc::clone(converter)))
    }

    fn from_radix(&mut self, converter: &Arc<dyn RadixConverter<K>>, from_workspace: bool) -> Result<()> {
        if self.runs_serially(self.buffers.len) {
            // SAFETY: no phase is running.
            let (source, keys) = unsafe { self.buffers.ranges(0..self.buffers.len, true) };
            if from_workspace {
                converter.from_radix(source, keys);
            } else {
                converter.from_radix_in_place(keys);
            }
            return Ok(());
        }
        self.fan_out(Phase::FromRadix { converter: Arc::clone(converter), from_workspace })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counting::KeyOrder;
    use crate::{lsd, NumberSystem, SortStats, TwosComplementConverter};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_chunks_cover_range() {
        let range = 5..5 + 1001;
        let chunks: Vec<_> = (0..4).map(|w| chunk(&range, w, 4)).collect();
        assert_eq!(chunks[0], 5..256);
        assert_eq!(chunks[3].end, 1006);
        assert!(chunks.windows(2).all(|w| w[0].end == w[1].start));
        assert_eq!(chunk(&(0..2), 3, 4), 2..2);
    }

    fn parallel_sort(keys: &mut [u32], workers: usize, order: KeyOrder) -> SortStats {
        let mut workspace = vec![0u32; keys.len()];
        let mut counts = vec![0u32; workers << order.bits];
        let mut stats = SortStats::default();
        with_workers(keys, &mut workspace, &mut counts, workers, Duration::from_secs(10), |engine| {
            lsd::run(engine, None, &order, &mut stats)
        })
        .unwrap();
        stats
    }

    #[test]
    fn test_converted_keys_round_trip() {
        let mut rng = StdRng::seed_from_u64(42);
        let converter: Arc<dyn RadixConverter<u32>> = Arc::new(TwosComplementConverter);
        // below KEYS_PER_WORKER the conversion stays on the calling thread
        for (len, workers) in [(600, 2), (8192, 3)] {
            let values: Vec<i32> = (0..len).map(|_| rng.gen()).collect();
            let mut keys: Vec<u32> = values.iter().map(|&v| v as u32).collect();
            let mut workspace = vec![0u32; keys.len()];
            let mut counts = vec![0u32; workers << 4];
            let order = KeyOrder::new::<u32>(converter.number_system(), 4, u64::MAX, false);
            let mut stats = SortStats::default();
            with_workers(&mut keys, &mut workspace, &mut counts, workers, Duration::from_secs(10), |engine| {
                lsd::run(engine, Some(&converter), &order, &mut stats)
            })
            .unwrap();

            let mut expected = values;
            expected.sort_unstable();
            assert_eq!(keys.iter().map(|&k| k as i32).collect::<Vec<_>>(), expected, "{len} keys");
        }
    }

    #[test]
    fn test_merge_keeps_worker_order() {
        // equal high digits across workers must keep the original relative order
        let mut keys: Vec<u32> = (0..8192u32).map(|i| ((i % 3) << 16) | i).collect();
        let order = KeyOrder::new::<u32>(NumberSystem::Unsigned, 8, 0xFFFF_0000, false);
        parallel_sort(&mut keys, 4, order);
        let tags: Vec<u32> = keys.iter().map(|k| k & 0xFFFF).collect();
        for group in 0..3 {
            let group_tags: Vec<u32> = tags.iter().copied().filter(|t| t % 3 == group).collect();
            assert!(group_tags.is_sorted(), "group {group}");
        }
        assert!(keys.windows(2).all(|w| w[0] >> 16 <= w[1] >> 16));
    }

    #[test]
    fn test_single_bucket_block_copy() {
        // each worker chunk holds one low digit, the chunks are in reverse order
        let mut keys: Vec<u32> = (0..4096u32).map(|i| 3 - i / 1024).collect();
        let stats = parallel_sort(&mut keys, 4, KeyOrder::new::<u32>(NumberSystem::Unsigned, 4, u64::MAX, false));
        assert_eq!(stats.passes, 1);
        assert!(keys.is_sorted());
        assert_eq!(keys[0], 0);
        assert_eq!(keys[4095], 3);
    }

    #[test]
    fn test_signed_matches_std() {
        let mut rng = StdRng::seed_from_u64(42);
        let values: Vec<i32> = (0..50_000).map(|_| rng.gen()).collect();
        let mut keys: Vec<u32> = values.iter().map(|&v| v as u32).collect();
        parallel_sort(&mut keys, 3, KeyOrder::new::<u32>(NumberSystem::TwosComplement, 8, u64::MAX, true));
        let mut expected = values;
        expected.sort_unstable_by(|a, b| b.cmp(a));
        assert_eq!(keys.iter().map(|&k| k as i32).collect::<Vec<_>>(), expected);
    }
}
