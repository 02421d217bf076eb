//! Data-set builders and property-based generators.
//!
//! Provides deterministic builders for single records, seeded random
//! populations for stress-style tests, and proptest strategies that
//! maintain the record invariants.

use segstore_core::dataset::DataSet;

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Builds a minimal data set record in the given share.
pub fn data_set(code: &str, share_id: &str, size: u64) -> DataSet {
    DataSet {
        code: code.to_string(),
        size: Some(size),
        share_id: share_id.to_string(),
        location: format!("uuid/{code}"),
        space: "s1".to_string(),
        project: "p1".to_string(),
        experiment: "e1".to_string(),
        sample: None,
        type_code: "dt1".to_string(),
        access_timestamp: 0,
    }
}

/// Builds a data set with explicit grouping attributes.
#[allow(clippy::too_many_arguments)]
pub fn data_set_in(
    code: &str,
    share_id: &str,
    size: u64,
    space: &str,
    project: &str,
    experiment: &str,
    type_code: &str,
    access_timestamp: u64,
) -> DataSet {
    DataSet {
        code: code.to_string(),
        size: Some(size),
        share_id: share_id.to_string(),
        location: format!("uuid/{code}"),
        space: space.to_string(),
        project: project.to_string(),
        experiment: experiment.to_string(),
        sample: None,
        type_code: type_code.to_string(),
        access_timestamp,
    }
}

/// Generates `count` data sets with sizes and timestamps drawn from a
/// seeded generator. The same seed always yields the same population.
pub fn random_data_sets(seed: u64, count: usize, share_ids: &[&str]) -> Vec<DataSet> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|i| {
            let share = share_ids[rng.gen_range(0..share_ids.len())];
            let mut ds = data_set(&format!("ds-{i}"), share, rng.gen_range(1..100_000));
            ds.space = format!("s{}", rng.gen_range(1..4));
            ds.project = format!("p{}", rng.gen_range(1..4));
            ds.experiment = format!("e{}", rng.gen_range(1..4));
            ds.type_code = format!("dt{}", rng.gen_range(1..3));
            ds.access_timestamp = rng.gen_range(0..1_000_000);
            ds
        })
        .collect()
}

/// Strategy for generating data set codes.
pub fn code_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("ds-[a-z0-9]{4,12}").expect("Invalid regex")
}

/// Strategy for generating a single data set in the given share.
pub fn data_set_strategy(share_id: &'static str) -> impl Strategy<Value = DataSet> {
    (code_strategy(), 1u64..1_000_000, 0u64..1_000_000).prop_map(move |(code, size, access)| {
        let mut ds = data_set(&code, share_id, size);
        ds.access_timestamp = access;
        ds
    })
}

/// Strategy for generating size lists used by quota tests.
pub fn size_list_strategy() -> impl Strategy<Value = Vec<u64>> {
    prop::collection::vec(1u64..10_000, 1..20)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_yields_same_population() {
        let a = random_data_sets(7, 20, &["1", "2"]);
        let b = random_data_sets(7, 20, &["1", "2"]);
        assert_eq!(a, b);
    }

    #[test]
    fn different_seeds_differ() {
        let a = random_data_sets(7, 20, &["1", "2"]);
        let b = random_data_sets(8, 20, &["1", "2"]);
        assert_ne!(a, b);
    }

    proptest! {
        #[test]
        fn generated_data_sets_have_known_sizes(ds in data_set_strategy("1")) {
            prop_assert!(ds.known_size().is_ok());
            prop_assert_eq!(ds.share_id.as_str(), "1");
        }
    }
}
