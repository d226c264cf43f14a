use fxhash::{FxHashMap, FxHashSet};

use super::*;
use crate::hash::{FastIntHash, KeyHasher, StrongerIntHash};
use crate::util::{
    generate_exponential, generate_uniform, generate_zipf, records_from_keys,
    verify_frequency_runs,
};

/// Check the semisort postconditions: the output is a permutation of the
/// input with every payload still bound to its key, and every hashed key
/// forms exactly one contiguous run. When hashing happens to be injective on
/// this input, additionally apply the check program's criterion on the domain
/// keys (distinct keys may legitimately share a hashed key with probability
/// ~n^-0.25, in which case their records share one run).
fn check_semisorted(keys: &[u64], records: &[Record<usize, u64>]) {
    assert_eq!(records.len(), keys.len());

    let mut objs: Vec<usize> = records.iter().map(|r| r.obj).collect();
    objs.sort_unstable();
    assert!(objs.iter().copied().eq(0..keys.len()), "payloads not a permutation");
    for rec in records {
        assert_eq!(rec.key, keys[rec.obj], "payload separated from its key");
    }

    let mut seen = FxHashSet::default();
    for run in records.chunk_by(|a, b| a.hashed_key == b.hashed_key) {
        assert!(run[0].hashed_key != 0, "empty sentinel leaked into output");
        assert!(
            seen.insert(run[0].hashed_key),
            "hashed key {} split across runs",
            run[0].hashed_key
        );
    }

    let mut hashed_of: FxHashMap<u64, u64> = FxHashMap::default();
    for rec in records {
        hashed_of.insert(rec.key, rec.hashed_key);
    }
    let distinct_hashed: FxHashSet<u64> = hashed_of.values().copied().collect();
    if distinct_hashed.len() == hashed_of.len() {
        let out_keys: Vec<u64> = records.iter().map(|r| r.key).collect();
        verify_frequency_runs(keys, &out_keys).unwrap();
    }
}

fn semisort_and_check(keys: &[u64], params: &SemiSortParams) -> Vec<Record<usize, u64>> {
    let mut records = records_from_keys(keys);
    semi_sort_with_hash::<FastIntHash, _, _>(&mut records, params);
    check_semisorted(keys, &records);
    records
}

#[test]
fn all_equal_keys() {
    let keys = vec![5u64; 4];
    let records = semisort_and_check(&keys, &SemiSortParams::default());
    assert!(records.iter().all(|r| r.key == 5));
    assert!(records.iter().all(|r| r.hashed_key == records[0].hashed_key));
}

#[test]
fn two_alternating_keys() {
    let keys = vec![1u64, 2, 1, 2, 1, 2];
    let records = semisort_and_check(&keys, &SemiSortParams::default());
    if records[0].hashed_key != records[5].hashed_key {
        let out: Vec<u64> = records.iter().map(|r| r.key).collect();
        assert!(out == [1, 1, 1, 2, 2, 2] || out == [2, 2, 2, 1, 1, 1]);
    }
}

#[test]
fn empty_input() {
    let mut records: Vec<Record<usize, u64>> = vec![];
    semi_sort(&mut records, &SemiSortParams::default());
    assert!(records.is_empty());
}

#[test]
fn single_record() {
    let keys = vec![99u64];
    let records = semisort_and_check(&keys, &SemiSortParams::default());
    assert_eq!(records[0].key, 99);
    assert_eq!(records[0].obj, 0);
}

#[test]
fn tiny_inputs() {
    // Exercises the no-sample single-bucket path and the smallest sampled
    // plans.
    for n in 1..=64usize {
        let keys: Vec<u64> = (0..n as u64).map(|i| i % 5).collect();
        semisort_and_check(&keys, &SemiSortParams::default());
    }
}

#[test]
fn all_distinct_keys() {
    let keys: Vec<u64> = (0..10_000u64).collect();
    semisort_and_check(&keys, &SemiSortParams::default());
}

#[test]
fn uniform_small_range() {
    // 100k records over 1000 keys: every key's occurrences form one run.
    let keys = generate_uniform(100_000, 999, 1);
    semisort_and_check(&keys, &SemiSortParams::default());
}

#[test]
fn skewed_majority_key_goes_heavy() {
    let n = 50_000;
    let mut keys = generate_uniform(n, u64::MAX, 2);
    for key in keys.iter_mut().take(n * 6 / 10) {
        *key = 7;
    }
    let mut records = records_from_keys(&keys);
    let params = SemiSortParams::default();
    let k = hash_range(n, params.hash_range_k);
    for rec in records.iter_mut() {
        rec.hashed_key = FastIntHash::hash(&rec.key, params.seed) % k + 1;
    }
    let stats = try_semi_sort_with_stats(&mut records, &params).unwrap();
    assert!(stats.heavy_buckets >= 1, "majority key must go heavy");
    check_semisorted(&keys, &records);
}

#[test]
fn two_heavy_keys_with_light_tail() {
    // 40% + 40% heavy, 20% unique light keys.
    let n = 50_000u64;
    let mut keys = Vec::with_capacity(n as usize);
    keys.extend(std::iter::repeat(1u64).take((n * 4 / 10) as usize));
    keys.extend(std::iter::repeat(2u64).take((n * 4 / 10) as usize));
    let tail = n - keys.len() as u64;
    keys.extend((0..tail).map(|i| 1_000_000 + i));

    let mut records = records_from_keys(&keys);
    let params = SemiSortParams::default();
    let k = hash_range(keys.len(), params.hash_range_k);
    for rec in records.iter_mut() {
        rec.hashed_key = FastIntHash::hash(&rec.key, params.seed) % k + 1;
    }
    let stats = try_semi_sort_with_stats(&mut records, &params).unwrap();
    assert!(stats.heavy_buckets >= 2);
    check_semisorted(&keys, &records);
}

#[test]
fn exponential_distribution() {
    let keys = generate_exponential(100_000, 10.0, 3);
    semisort_and_check(&keys, &SemiSortParams::default());
}

#[test]
fn zipf_distribution() {
    let keys = generate_zipf(100_000, 1.0, 10_000, 4);
    let records = semisort_and_check(&keys, &SemiSortParams::default());

    // Frequencies survive; the top key dominates.
    let top = keys.iter().filter(|&&k| k == 0).count();
    assert_eq!(records.iter().filter(|r| r.key == 0).count(), top);
    assert!(top > records.len() / 100);
}

#[test]
#[ignore = "large"]
fn exponential_1e6() {
    let keys = generate_exponential(1_000_000, 10.0, 5);
    semisort_and_check(&keys, &SemiSortParams::default());
}

#[test]
#[ignore = "large"]
fn zipf_1e6() {
    let keys = generate_zipf(1_000_000, 1.0, 10_000, 6);
    semisort_and_check(&keys, &SemiSortParams::default());
}

#[test]
fn legacy_params() {
    let keys = generate_uniform(50_000, 499, 8);
    semisort_and_check(&keys, &SemiSortParams::default_legacy());
}

#[test]
fn stronger_int_hash_on_regular_keys() {
    let keys: Vec<u64> = (0..20_000u64).map(|i| i * 1024).collect();
    let mut records = records_from_keys(&keys);
    semi_sort_with_hash::<StrongerIntHash, _, _>(&mut records, &SemiSortParams::default());
    check_semisorted(&keys, &records);
}

#[test]
fn hashed_keys_match_the_hash_formula() {
    let params = SemiSortParams::default();
    let keys = generate_uniform(10_000, 2_000, 9);
    let mut records = records_from_keys(&keys);
    semi_sort_with_hash::<FastIntHash, _, _>(&mut records, &params);

    let k = hash_range(keys.len(), params.hash_range_k);
    for rec in &records {
        assert_eq!(
            rec.hashed_key,
            FastIntHash::hash(&rec.key, params.seed) % k + 1
        );
        assert!(rec.hashed_key >= 1);
    }
}

#[test]
fn fixed_seed_preserves_frequencies_across_runs() {
    let keys = generate_zipf(30_000, 1.2, 500, 10);
    let params = SemiSortParams::default();

    let count =
        |records: &[Record<usize, u64>], key: u64| records.iter().filter(|r| r.key == key).count();
    let a = semisort_and_check(&keys, &params);
    let b = semisort_and_check(&keys, &params);
    for key in 0..500u64 {
        assert_eq!(count(&a, key), count(&b, key));
    }
}

#[test]
fn presupplied_hashed_keys_are_respected() {
    // semi_sort itself never hashes: records sharing a hashed key must end
    // up adjacent even when their domain keys differ.
    let n = 5_000;
    let mut records: Vec<Record<usize, u64>> = (0..n)
        .map(|i| Record {
            obj: i,
            key: i as u64,
            hashed_key: (i % 37 + 1) as u64,
        })
        .collect();
    semi_sort(&mut records, &SemiSortParams::default());
    assert_eq!(records.len(), n);
    let runs = records
        .chunk_by(|a, b| a.hashed_key == b.hashed_key)
        .count();
    assert_eq!(runs, 37);
}

#[test]
fn clone_payloads_survive() {
    // String payloads exercise the drop paths of the working array.
    let keys = generate_uniform(5_000, 99, 11);
    let mut records: Vec<Record<String, u64>> = keys
        .iter()
        .enumerate()
        .map(|(i, &key)| Record {
            obj: format!("object_{i}"),
            key,
            hashed_key: 0,
        })
        .collect();
    semi_sort_with_hash::<FastIntHash, _, _>(&mut records, &SemiSortParams::default());

    let mut in_sorted = keys.clone();
    in_sorted.sort_unstable();
    let mut out_sorted: Vec<u64> = records.iter().map(|r| r.key).collect();
    out_sorted.sort_unstable();
    assert_eq!(in_sorted, out_sorted);
    for rec in &records {
        let i: usize = rec.obj.strip_prefix("object_").unwrap().parse().unwrap();
        assert_eq!(rec.key, keys[i]);
    }
}
