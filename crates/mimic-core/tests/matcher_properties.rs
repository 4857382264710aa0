//! Property tests for matchers, resolution order and the indexer store.

use mimic_core::{
    IndexerStore, Matcher, MethodSetup, Mock, PatternOptions, Value, args, prelude::*,
};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Inclusive ranges accept exactly the values between their bounds.
    #[test]
    fn prop_range_agrees_with_comparison(a in any::<i64>(), b in any::<i64>(), x in any::<i64>()) {
        let (min, max) = if a <= b { (a, b) } else { (b, a) };
        let matcher = Matcher::in_range(min, max).expect("ordered bounds");
        prop_assert_eq!(matcher.matches(&Value::new(x)), min <= x && x <= max);

        if a != b {
            prop_assert!(Matcher::in_range(max, min).is_err());
        }
    }

    /// Typed matchers never accept values of another type.
    #[test]
    fn prop_typed_matchers_reject_other_types(x in any::<i32>()) {
        prop_assert!(Matcher::eq(x).matches(&Value::new(x)));
        prop_assert!(!Matcher::eq(x).matches(&Value::new(i64::from(x))));
        prop_assert!(!Matcher::satisfies("any i32", |_: &i32| true).matches(&Value::new(x.to_string())));
        prop_assert!(Matcher::any::<i32>().matches(&Value::null::<i32>()));
        prop_assert!(!Matcher::null::<i32>().matches(&Value::new(x)));
    }

    /// A wildcard made of the literal text matches that text and nothing
    /// longer.
    #[test]
    fn prop_literal_wildcard_matches_itself(text in "[a-zA-Z0-9 .+()\\[\\]^$|{}]{0,12}") {
        let matcher = Matcher::wildcard(&text).expect("escaped literal");
        let longer = format!("{text}!");
        prop_assert!(matcher.matches(&Value::new(text.clone())));
        prop_assert!(!matcher.matches(&Value::new(longer.clone())));

        let prefix = Matcher::wildcard(&format!("{text}*")).expect("escaped literal");
        prop_assert!(prefix.matches(&Value::new(longer)));
    }

    /// Case-insensitive wildcards ignore ASCII case.
    #[test]
    fn prop_ignore_case(text in "[a-z]{1,8}") {
        let options = PatternOptions { regex: false, ignore_case: true };
        let matcher = Matcher::pattern(&text, options).expect("plain text");
        prop_assert!(matcher.matches(&Value::new(text.to_uppercase())));
    }

    /// The most recently registered matching setup answers.
    #[test]
    fn prop_last_match_wins(thresholds in prop::collection::vec(0..100u32, 1..8), arg in 0..100u32) {
        let mock = Mock::default();
        for (i, threshold) in thresholds.iter().copied().enumerate() {
            mock.setup_method(
                MethodSetup::builder("Pick")
                    .args([Matcher::satisfies("at least", move |v: &u32| *v >= threshold)])
                    .returns(i),
            );
        }

        let expected = thresholds.iter().rposition(|t| arg >= *t);
        let actual = mock.invoke("Pick", args![arg]).expect("loose").value.and_then(|v| v.cast::<usize>());
        prop_assert_eq!(actual, expected);
    }

    /// Repeated lookups of one key return the same value and build it once.
    #[test]
    fn prop_indexer_lookup_is_idempotent(keys in prop::collection::vec(prop::collection::vec(0..4u8, 0..3), 1..20)) {
        let store = IndexerStore::new();
        let mut built = 0;

        for key in &keys {
            let args: Vec<Value> = key.iter().copied().map(Value::new).collect();
            let first = store.get_or_create(&args, || {
                built += 1;
                Some(Value::new(built))
            });
            let second = store.get_or_create(&args, || Some(Value::new(-1)));
            prop_assert_eq!(first, second);
        }

        let mut distinct = keys;
        distinct.sort();
        distinct.dedup();
        prop_assert_eq!(built, distinct.len());
    }
}
