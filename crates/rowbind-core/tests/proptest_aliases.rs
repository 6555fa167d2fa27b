// crates/rowbind-core/tests/proptest_aliases.rs
// ============================================================================
// Module: Alias Registry Property-Based Tests
// Description: Property tests for case-insensitive alias resolution.
// Purpose: Check resolution is stable across arbitrary letter casing.
// ============================================================================

//! Property-based tests for alias registry invariants.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use proptest::prelude::*;
use rowbind_core::AliasRegistry;
use rowbind_core::TypeName;

/// Re-cases `alias` using one flag per character.
fn recase(alias: &str, upper: &[bool]) -> String {
    alias
        .chars()
        .zip(upper.iter().cycle())
        .map(|(ch, up)| if *up { ch.to_ascii_uppercase() } else { ch.to_ascii_lowercase() })
        .collect()
}

proptest! {
    #[test]
    fn resolution_ignores_case(
        alias in "[a-zA-Z][a-zA-Z0-9_]{0,15}",
        flags in prop::collection::vec(any::<bool>(), 1 .. 16),
    ) {
        let mut aliases = AliasRegistry::new();
        let target = TypeName::new(format!("domain.{alias}"));
        aliases.register(&alias, target.clone()).unwrap();
        let variant = recase(&alias, &flags);
        prop_assert_eq!(aliases.resolve(&variant), Some(target.clone()));
        prop_assert_eq!(aliases.resolve(&alias.to_uppercase()), Some(target.clone()));
        prop_assert_eq!(aliases.resolve(&alias.to_lowercase()), Some(target));
    }

    #[test]
    fn re_registering_any_casing_of_same_type_is_accepted(
        alias in "[a-z]{1,12}",
        flags in prop::collection::vec(any::<bool>(), 1 .. 12),
    ) {
        let mut aliases = AliasRegistry::new();
        aliases.register(&alias, TypeName::new("domain.Blog")).unwrap();
        prop_assert!(aliases.register(&recase(&alias, &flags), TypeName::new("domain.Blog")).is_ok());
        prop_assert!(aliases.register(&recase(&alias, &flags), TypeName::new("domain.Post")).is_err());
        prop_assert_eq!(aliases.len(), 1);
    }
}
