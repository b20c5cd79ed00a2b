//! Property-based tests for locator resolution.
//!
//! These tests use proptest to generate random locators and bases and check
//! that the resolver invariants hold for all of them.

#[cfg(test)]
mod proptest_tests {
    use crate::error::Error;
    use crate::locator::{abs_path, base_path, is_absolute};
    use proptest::prelude::*;

    fn absolute_locator() -> impl Strategy<Value = String> {
        prop_oneof![
            "/[a-z0-9_./-]{0,30}",
            "(template|http|https|file)://[a-z0-9_./-]{0,30}",
        ]
    }

    fn relative_locator() -> impl Strategy<Value = String> {
        "[a-z_][a-z0-9_./-]{0,30}"
    }

    fn concrete_base() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("/root".to_string()),
            Just("/".to_string()),
            Just("template://".to_string()),
            Just("template://foo".to_string()),
            Just("http://host/dir".to_string()),
            Just("file:///srv/templates".to_string()),
        ]
    }

    // ============================================================================
    // abs_path property tests
    // ============================================================================

    proptest! {
        /// Property: absolute locators are returned unchanged for any base
        #[test]
        fn abs_path_is_identity_on_absolute(locator in absolute_locator(), base in ".{0,20}") {
            let resolved = abs_path(&locator, &base);
            prop_assert!(resolved.is_ok());
            prop_assert_eq!(resolved.unwrap(), locator);
        }

        /// Property: resolving twice gives the same result as resolving once
        #[test]
        fn abs_path_is_idempotent(
            locator in "[a-z]{1,8}(/[a-z]{1,8}){0,3}",
            base in concrete_base(),
        ) {
            let once = abs_path(&locator, &base).unwrap();
            let twice = abs_path(&once, &base).unwrap();
            prop_assert_eq!(once, twice);
        }

        /// Property: an empty base defers resolution
        #[test]
        fn abs_path_without_base_is_identity(locator in relative_locator()) {
            prop_assert_eq!(abs_path(&locator, "").unwrap(), locator);
        }

        /// Property: relative locators can never be resolved against STDIN
        #[test]
        fn abs_path_against_stdin_fails(locator in relative_locator()) {
            prop_assume!(!is_absolute(&locator));
            prop_assert!(abs_path(&locator, "-").is_err());
        }

        /// Property: parent traversal is rejected for every concrete base
        #[test]
        fn abs_path_rejects_parent_traversal(
            prefix in "([a-z]{1,5}/){0,3}",
            rest in "[a-z]{1,5}",
            base in concrete_base(),
        ) {
            let locator = format!("{}../{}", prefix, rest);
            let result = abs_path(&locator, &base);
            prop_assert!(
                matches!(result, Err(Error::ContainmentViolation { .. })),
                "{:?} resolved against {:?} should be rejected",
                locator,
                base
            );
        }

        /// Property: resolved locators stay underneath their base
        #[test]
        fn abs_path_stays_under_base(locator in "[a-z]{1,8}(/[a-z]{1,8}){0,3}") {
            let resolved = abs_path(&locator, "/root").unwrap();
            prop_assert!(resolved.starts_with("/root/"));

            let resolved = abs_path(&locator, "http://host/dir").unwrap();
            prop_assert!(resolved.starts_with("http://host/dir/"));
        }
    }

    // ============================================================================
    // base_path property tests
    // ============================================================================

    proptest! {
        /// Property: the base of a resolved locator is the base it was resolved against
        #[test]
        fn base_path_recovers_parent(
            name in "[a-z]{1,8}\\.yaml",
            base in prop_oneof![
                Just("/root"),
                Just("/srv/templates"),
                Just("template://foo"),
                Just("http://host/dir"),
                Just("file:///srv/templates"),
            ],
        ) {
            let resolved = abs_path(&name, base).unwrap();
            prop_assert_eq!(base_path(&resolved), base);
        }
    }
}
