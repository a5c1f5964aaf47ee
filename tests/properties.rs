use std::cmp::Ordering;

use proptest::prelude::*;
use radix_engine::{RadixConverter, RadixSorter, SignBitConverter, SortOptions, TwosComplementConverter};

fn total_order(v: f64) -> i64 {
    let bits = v.to_bits() as i64;
    bits ^ (((bits >> 63) as u64) >> 1) as i64
}

proptest! {
    #[test]
    fn prop_twos_complement_keys_order_unsigned(a in any::<i64>(), b in any::<i64>()) {
        let (ka, kb) = (TwosComplementConverter.to_radix_key(a as u64), TwosComplementConverter.to_radix_key(b as u64));
        prop_assert_eq!(ka.cmp(&kb), a.cmp(&b));
        prop_assert_eq!(TwosComplementConverter.from_radix_key(ka), a as u64);
    }

    #[test]
    fn prop_sign_bit_keys_order_signed(a in any::<u64>(), b in any::<u64>()) {
        let (fa, fb) = (f64::from_bits(a), f64::from_bits(b));
        let (ka, kb) = (SignBitConverter.to_radix_key(a), SignBitConverter.to_radix_key(b));
        prop_assert_eq!((ka as i64).cmp(&(kb as i64)), fa.total_cmp(&fb));
        prop_assert_eq!(SignBitConverter.to_radix_key(ka), a);
        prop_assert_eq!(SignBitConverter.from_radix_key(ka), a);
    }

    #[test]
    fn prop_sort_matches_std(
        mut values in prop::collection::vec(any::<i32>(), 0..600),
        radix_bits in 1u32..=16,
        descending in any::<bool>(),
    ) {
        let mut expected = values.clone();
        expected.sort_unstable();
        if descending {
            expected.reverse();
        }
        let mut workspace = vec![0i32; radix_engine::workspace_size::<i32>(values.len(), radix_bits).unwrap()];
        radix_engine::sort(&mut values, &mut workspace, radix_bits, descending).unwrap();
        prop_assert_eq!(values, expected);
    }

    #[test]
    fn prop_float_sort_matches_total_cmp(
        values in prop::collection::vec(any::<f64>(), 0..600),
        radix_bits in prop::sample::select(vec![3u32, 8, 11]),
    ) {
        let mut expected = values.clone();
        expected.sort_by(f64::total_cmp);
        for algorithm in 0..2 {
            let mut keys = values.clone();
            let mut workspace = vec![0f64; radix_engine::workspace_size::<f64>(keys.len(), radix_bits).unwrap()];
            if algorithm == 0 {
                radix_engine::sort(&mut keys, &mut workspace, radix_bits, false).unwrap();
            } else {
                radix_engine::msd_sort(&mut keys, &mut workspace, radix_bits, false).unwrap();
            }
            prop_assert!(keys.windows(2).all(|w| total_order(w[0]).cmp(&total_order(w[1])) != Ordering::Greater));
            prop_assert!(keys.iter().map(|v| total_order(*v)).eq(expected.iter().map(|v| total_order(*v))));
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_parallel_matches_serial(
        values in prop::collection::vec(any::<i16>(), 0..6000),
        radix_bits in 1u32..=12,
        descending in any::<bool>(),
        max_workers in 1usize..=4,
    ) {
        let options = SortOptions::new(radix_bits, descending).with_max_workers(max_workers);
        let mut workspace = vec![0i16; radix_engine::parallel_workspace_size::<i16>(values.len(), radix_bits).unwrap()];

        let mut serial = values.clone();
        RadixSorter::new(options.clone()).sort(&mut serial, &mut workspace).unwrap();
        let mut parallel = values;
        RadixSorter::new(options).parallel_sort(&mut parallel, &mut workspace).unwrap();
        prop_assert_eq!(parallel, serial);
    }
}
