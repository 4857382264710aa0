//! Fuzz target for wildcard and regex matchers
//!
//! # Strategy
//!
//! - Arbitrary pattern text, including unbalanced regex syntax
//! - Arbitrary candidate strings, both `String` and non-string values
//!
//! # Invariants
//!
//! - Building a matcher never panics; invalid patterns are errors
//! - Matching never panics
//! - A `*` wildcard accepts every string and rejects every non-string

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use mimic_core::{Matcher, PatternOptions, Value};

#[derive(Debug, Arbitrary)]
struct Input {
    pattern: String,
    regex: bool,
    ignore_case: bool,
    candidates: Vec<String>,
    number: i64,
}

fuzz_target!(|input: Input| {
    let options = PatternOptions { regex: input.regex, ignore_case: input.ignore_case };
    if let Ok(matcher) = Matcher::pattern(&input.pattern, options) {
        for candidate in &input.candidates {
            let _ = matcher.matches(&Value::new(candidate.clone()));
        }
        assert!(!matcher.matches(&Value::new(input.number)));
        assert!(!matcher.matches(&Value::null::<String>()));
    }

    let everything = Matcher::wildcard("*").expect("star is valid");
    for candidate in input.candidates {
        assert!(everything.matches(&Value::new(candidate)));
    }
    assert!(!everything.matches(&Value::new(input.number)));
});
