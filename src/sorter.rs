use std::any::type_name;
use std::mem::{size_of, size_of_val};
use std::sync::Arc;

use log::debug;

use crate::counting::KeyOrder;
use crate::lsd::{self, SerialPasses};
use crate::registry::SignedConverter;
use crate::workspace::{carve, check_key_width, check_len, check_radix_bits, effective_bits, required_workspace, worker_count};
use crate::{msd, parallel};
use crate::{NumberSystem, RadixConverter, RadixKey, RadixSortable, Registry, Result, SortError, SortOptions, SortStats};

/// Workspace `sort_small` keeps on the stack, in 8-byte words.
const SMALL_WORKSPACE_WORDS: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Algorithm {
    Lsd,
    ParallelLsd,
    Msd,
}

/// Sorts with fixed [`SortOptions`] and a converter [`Registry`].
///
/// ```
/// use radix_engine::{RadixSorter, SortOptions};
///
/// let mut values = [0.5f32, -3.0, 2.0, -0.25];
/// let mut workspace = vec![0f32; radix_engine::workspace_size::<f32>(values.len(), 4).unwrap()];
/// let sorter = RadixSorter::new(SortOptions::default().with_descending(true));
/// sorter.sort(&mut values, &mut workspace).unwrap();
/// assert_eq!(values, [2.0, 0.5, -0.25, -3.0]);
/// ```
#[derive(Clone)]
pub struct RadixSorter<'r> {
    registry: &'r Registry,
    options: SortOptions,
}

impl RadixSorter<'static> {
    /// Sorter using the process-wide registry.
    pub fn new(options: SortOptions) -> Self {
        Self { registry: Registry::global(), options }
    }
}

impl Default for RadixSorter<'static> {
    fn default() -> Self {
        Self::new(SortOptions::default())
    }
}

impl<'r> RadixSorter<'r> {
    pub fn with_registry(registry: &'r Registry, options: SortOptions) -> Self {
        Self { registry, options }
    }

    pub fn options(&self) -> &SortOptions {
        &self.options
    }

    /// Serial LSD sort. `workspace` needs at least [`crate::workspace_size`] elements.
    pub fn sort<T: RadixSortable>(&self, keys: &mut [T], workspace: &mut [T]) -> Result<SortStats> {
        self.sort_values(keys, workspace, Algorithm::Lsd)
    }

    /// Parallel LSD sort. `workspace` needs at least [`crate::parallel_workspace_size`] elements.
    pub fn parallel_sort<T: RadixSortable>(&self, keys: &mut [T], workspace: &mut [T]) -> Result<SortStats> {
        self.sort_values(keys, workspace, Algorithm::ParallelLsd)
    }

    /// MSD sort. Same workspace as [`RadixSorter::sort`]. Not stable.
    pub fn msd_sort<T: RadixSortable>(&self, keys: &mut [T], workspace: &mut [T]) -> Result<SortStats> {
        self.sort_values(keys, workspace, Algorithm::Msd)
    }

    /// Serial sort with a transient workspace, on the stack when it fits.
    pub fn sort_small<T: RadixSortable>(&self, keys: &mut [T]) -> Result<SortStats> {
        let required = crate::workspace_size::<T>(keys.len(), self.options.radix_bits)?;
        let mut words = [0u64; SMALL_WORKSPACE_WORDS];
        if required * size_of::<T>() <= size_of_val(&words) {
            if let Ok(workspace) = bytemuck::try_cast_slice_mut::<u64, T>(&mut words) {
                return self.sort(keys, &mut workspace[..required]);
            }
        }

        debug!("Workspace of {required} {} does not fit on the stack, allocating", type_name::<T>());
        let mut workspace = vec![T::zeroed(); required];
        self.sort(keys, &mut workspace)
    }

    /// Sorts raw radix keys whose bits follow `number_system`, without any converter.
    pub fn sort_keys<K: RadixKey>(&self, keys: &mut [K], workspace: &mut [K], number_system: NumberSystem) -> Result<SortStats> {
        self.dispatch(keys, workspace, None, number_system, Algorithm::Lsd)
    }

    pub fn parallel_sort_keys<K: RadixKey>(
        &self,
        keys: &mut [K],
        workspace: &mut [K],
        number_system: NumberSystem,
    ) -> Result<SortStats> {
        self.dispatch(keys, workspace, None, number_system, Algorithm::ParallelLsd)
    }

    pub fn msd_sort_keys<K: RadixKey>(&self, keys: &mut [K], workspace: &mut [K], number_system: NumberSystem) -> Result<SortStats> {
        self.dispatch(keys, workspace, None, number_system, Algorithm::Msd)
    }

    fn sort_values<T: RadixSortable>(&self, keys: &mut [T], workspace: &mut [T], algorithm: Algorithm) -> Result<SortStats> {
        let bytes = check_key_width::<T>()?;
        if bytes != size_of::<T::Radix>() {
            return Err(SortError::UnsupportedKeyWidth { type_name: type_name::<T>(), bytes });
        }
        let SignedConverter { converter, number_system } = self.registry.get_with_sign_support::<T, T::Radix>()?;
        let keys = cast::<T>(keys)?;
        let workspace = cast::<T>(workspace)?;
        self.dispatch(keys, workspace, converter, number_system, algorithm)
    }

    fn dispatch<K: RadixKey>(
        &self,
        keys: &mut [K],
        workspace: &mut [K],
        converter: Option<Arc<dyn RadixConverter<K>>>,
        number_system: NumberSystem,
        algorithm: Algorithm,
    ) -> Result<SortStats> {
        let len = keys.len();
        let bits = effective_bits(check_radix_bits(self.options.radix_bits)?, size_of::<K>());
        check_len(len)?;
        let workers = match algorithm {
            Algorithm::ParallelLsd => worker_count(len, self.options.max_workers),
            Algorithm::Lsd | Algorithm::Msd => 1,
        };
        let required = required_workspace::<K>(len, bits, workers);
        if workspace.len() < required {
            return Err(SortError::WorkspaceTooSmall { provided: workspace.len(), required });
        }

        let mut stats = SortStats::default();
        if len <= 1 {
            return Ok(stats);
        }

        let order = KeyOrder::new::<K>(number_system, bits, self.options.key_mask, self.options.descending);
        debug!(
            "{algorithm:?} sort of {len} {} keys, {bits}-bit digits, {:?}, descending: {}",
            type_name::<K>(),
            order.number_system,
            order.descending
        );

        let (counts, elements) = carve(workspace, len, bits, workers)?;
        stats.workers = workers;
        match algorithm {
            Algorithm::Lsd => {
                let mut engine = SerialPasses::new(keys, elements, counts);
                lsd::run(&mut engine, converter.as_ref(), &order, &mut stats)?;
            }
            Algorithm::ParallelLsd => {
                parallel::with_workers(keys, elements, counts, workers, self.options.worker_timeout, |engine| {
                    lsd::run(engine, converter.as_ref(), &order, &mut stats)
                })?;
            }
            Algorithm::Msd => {
                if let Some(converter) = &converter {
                    converter.to_radix_in_place(keys);
                }
                msd::sort(keys, elements, counts, &order, &mut stats);
                if let Some(converter) = &converter {
                    converter.from_radix_in_place(keys);
                }
            }
        }
        Ok(stats)
    }
}

fn cast<T: RadixSortable>(values: &mut [T]) -> Result<&mut [T::Radix]> {
    bytemuck::try_cast_slice_mut::<T, T::Radix>(values).map_err(|e| SortError::IncompatibleLayout {
        value_type: type_name::<T>(),
        radix_type: type_name::<T::Radix>(),
        reason: format!("{e:?}"),
    })
}
