//! Canonicalization must be a fixed point after one application.

use aadhaar_gaps::canonical::{canonicalize, known_district_inputs, known_state_inputs, NameKind};
use proptest::prelude::*;

fn twice(raw: &str, kind: NameKind<'_>) -> (Option<String>, Option<String>) {
    let once = canonicalize(raw, kind);
    let again = once.as_deref().and_then(|c| canonicalize(c, kind));
    (once, again)
}

fn arb_state_input() -> impl Strategy<Value = &'static str> {
    prop::sample::select(known_state_inputs())
}

fn arb_district_input() -> impl Strategy<Value = (Option<&'static str>, &'static str)> {
    prop::sample::select(known_district_inputs())
}

proptest! {
    #[test]
    fn known_states_are_idempotent(raw in arb_state_input()) {
        let (once, again) = twice(raw, NameKind::State);
        if once.is_some() {
            prop_assert_eq!(once, again);
        }
    }

    #[test]
    fn known_districts_are_idempotent((state, raw) in arb_district_input()) {
        let state = state.unwrap_or("Bihar");
        let kind = NameKind::District { state };
        let (once, again) = twice(raw, kind);
        prop_assert_eq!(once, again);
    }

    #[test]
    fn arbitrary_names_are_idempotent(raw in "[A-Za-z0-9 &.\u{a0}-]{0,32}") {
        let (once, again) = twice(&raw, NameKind::State);
        if once.is_some() {
            prop_assert_eq!(once, again);
        }
        let (once, again) = twice(&raw, NameKind::District { state: "Sikkim" });
        prop_assert_eq!(once, again);
    }

    #[test]
    fn surrounding_whitespace_does_not_change_a_known_state(
        raw in arb_state_input(),
        pad in "[ \t]{0,3}",
    ) {
        let clean = canonicalize(raw, NameKind::State);
        let noisy = canonicalize(&format!("{pad}{raw}{pad}"), NameKind::State);
        prop_assert_eq!(clean, noisy);
    }
}
