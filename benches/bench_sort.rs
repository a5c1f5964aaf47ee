use criterion::{criterion_group, criterion_main, Criterion, Throughput};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use radix_engine::RadixSortable;

#[inline(never)]
pub fn standard_sort_slice<T: Copy, K: Ord>(slice: &[T], key: impl Fn(&T) -> K) -> Vec<T> {
    let mut data = slice.to_vec();
    data.sort_unstable_by_key(key);
    data
}

#[inline(never)]
pub fn radix_sort_slice<T: RadixSortable>(slice: &[T], workspace: &mut [T], radix_bits: u32) -> Vec<T> {
    let mut data = slice.to_vec();
    radix_engine::sort(&mut data, workspace, radix_bits, false).unwrap();
    data
}

#[inline(never)]
pub fn parallel_sort_slice<T: RadixSortable>(slice: &[T], workspace: &mut [T], radix_bits: u32) -> Vec<T> {
    let mut data = slice.to_vec();
    radix_engine::parallel_sort(&mut data, workspace, radix_bits, false).unwrap();
    data
}

#[inline(never)]
pub fn msd_sort_slice<T: RadixSortable>(slice: &[T], workspace: &mut [T], radix_bits: u32) -> Vec<T> {
    let mut data = slice.to_vec();
    radix_engine::msd_sort(&mut data, workspace, radix_bits, false).unwrap();
    data
}

fn total_order(v: &f64) -> i64 {
    let bits = v.to_bits() as i64;
    bits ^ (((bits >> 63) as u64) >> 1) as i64
}

const BATCH_SIZE: usize = 1_000_000;

fn bench_group<T: RadixSortable, K: Ord>(c: &mut Criterion, name: &str, data: &[T], key: impl Fn(&T) -> K + Copy) {
    let mut group = c.benchmark_group(name);
    group.throughput(Throughput::Bytes(std::mem::size_of_val(data) as u64));
    group.bench_function("standard", |b| b.iter(|| standard_sort_slice(data, key)));

    for radix_bits in [8, 11] {
        let mut workspace = vec![T::zeroed(); radix_engine::parallel_workspace_size::<T>(data.len(), radix_bits).unwrap()];
        group
            .bench_function(format!("radix_{radix_bits}"), |b| b.iter(|| radix_sort_slice(data, &mut workspace, radix_bits)))
            .bench_function(format!("parallel_{radix_bits}"), |b| {
                b.iter(|| parallel_sort_slice(data, &mut workspace, radix_bits))
            })
            .bench_function(format!("msd_{radix_bits}"), |b| b.iter(|| msd_sort_slice(data, &mut workspace, radix_bits)));
    }
}

pub fn bench_sort(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(42);

    let integers = (0..BATCH_SIZE).map(|_| rng.gen_range(0..u64::MAX) as i64).collect::<Vec<i64>>();

    let small_integers = (0..BATCH_SIZE).map(|_| rng.gen_range(0..10_000_i64)).collect::<Vec<i64>>();

    let floats = (0..BATCH_SIZE).map(|_| f64::from_bits(rng.gen_range(0..u64::MAX))).collect::<Vec<f64>>();

    bench_group(c, "integers", &integers, |v| *v);
    bench_group(c, "small_integers", &small_integers, |v| *v);
    bench_group(c, "floats", &floats, total_order);
}

criterion_group!(benches, bench_sort);
criterion_main!(benches);
