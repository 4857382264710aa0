//! Fuzz target for setup return sequences
//!
//! # Strategy
//!
//! - Up to eight producers, each with a repeat count and optional `forever`
//! - A run of calls long enough to wrap the sequence several times
//! - Reference model: the producer list expanded by repeat count
//!
//! # Invariants
//!
//! - Calls walk the expanded sequence round-robin
//! - The first `forever` producer sticks once reached
//! - Every call is recorded in the ledger exactly once

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use mimic_core::{ArgMatchers, MethodSetup, Mock, prelude::*};

#[derive(Debug, Arbitrary)]
struct Step {
    value: i32,
    repeat: u8,
    forever: bool,
}

#[derive(Debug, Arbitrary)]
struct Input {
    steps: Vec<Step>,
    calls: u8,
}

fuzz_target!(|input: Input| {
    let steps: Vec<&Step> = input.steps.iter().take(8).collect();
    let mock = Mock::default();

    let mut builder = MethodSetup::builder("Next").any_args();
    for step in &steps {
        builder = builder.returns(step.value).for_calls(usize::from(step.repeat % 4));
        if step.forever {
            builder = builder.forever();
        }
    }
    mock.setup_method(builder);

    let mut expanded = Vec::new();
    let mut sticky = None;
    for step in &steps {
        if step.forever && sticky.is_none() {
            sticky = Some((expanded.len(), step.value));
        }
        for _ in 0..(step.repeat % 4).max(1) {
            expanded.push(step.value);
        }
    }

    for k in 0..usize::from(input.calls) {
        let expected = match sticky {
            Some((start, value)) if k >= start => value,
            _ if expanded.is_empty() => 0,
            _ => expanded[k % expanded.len()],
        };
        let actual = mock.invoke_method::<i32>("Next", Vec::new()).expect("loose mock");
        assert_eq!(actual, expected, "call {k}");
    }

    assert_eq!(
        mock.verify_method("Next", ArgMatchers::Any).count(),
        usize::from(input.calls)
    );
});
