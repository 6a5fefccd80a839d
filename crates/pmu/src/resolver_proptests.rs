//! Property-based tests for field resolution
//!
//! Resolution must not depend on the letter case used by the caller, and any
//! name absent from the metadata must fail with an error naming it.

use super::test_fixtures::sample_metadata;
use super::*;
use proptest::prelude::*;

// Randomly upper/lower-case each ASCII letter of `s`
fn recase(s: &str, mask: &[bool]) -> String {
    s.chars()
        .zip(mask.iter().cycle())
        .map(|(c, upper)| {
            if *upper {
                c.to_ascii_uppercase()
            } else {
                c.to_ascii_lowercase()
            }
        })
        .collect()
}

fn select_pair_strategy() -> impl Strategy<Value = (&'static str, &'static str)> {
    prop_oneof![
        Just(("Status", "Backlog")),
        Just(("Status", "In progress")),
        Just(("Status", "Done")),
        Just(("Priority", "P0")),
        Just(("Priority", "P2")),
    ]
}

proptest! {
    #[test]
    fn prop_resolution_ignores_case(
        (field, option) in select_pair_strategy(),
        field_mask in prop::collection::vec(any::<bool>(), 1..12),
        option_mask in prop::collection::vec(any::<bool>(), 1..12),
    ) {
        let metadata = sample_metadata();
        let canonical = resolve(&metadata, field, option).unwrap();
        let recased = resolve(
            &metadata,
            &recase(field, &field_mask),
            &recase(option, &option_mask),
        )
        .unwrap();

        prop_assert_eq!(canonical, recased);
    }

    #[test]
    fn prop_unknown_field_is_named(name in "[a-z]{3,12}") {
        let metadata = sample_metadata();
        prop_assume!(find_field(&metadata, &name).is_none());

        match resolve(&metadata, &name, "x") {
            Err(PmuError::UnknownField { field, .. }) => prop_assert_eq!(field, name),
            other => prop_assert!(false, "expected UnknownField, got {:?}", other),
        }
    }

    #[test]
    fn prop_values_outside_options_fail(value in "[a-z]{1,8}[0-9]{2}") {
        let metadata = sample_metadata();
        let is_unknown_option = matches!(
            resolve(&metadata, "Status", &value),
            Err(PmuError::UnknownOption { .. })
        );
        prop_assert!(is_unknown_option);
    }
}
