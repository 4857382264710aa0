//! Fuzz target for the indexer value store
//!
//! # Strategy
//!
//! - Short key tuples over a tiny alphabet so keys collide often
//! - Interleaved reads, lazy creation, overwrites and clears
//! - A `HashMap` keyed by the raw tuple as reference model
//!
//! # Invariants
//!
//! - A key's value is whatever was last written or first created
//! - Prefix keys never alias longer keys
//! - The factory runs at most once per key between clears

#![no_main]

use std::collections::HashMap;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use mimic_core::{IndexerStore, Value};

#[derive(Debug, Arbitrary)]
enum StoreOp {
    Get { key: Vec<Key> },
    GetOrCreate { key: Vec<Key>, value: i32 },
    Update { key: Vec<Key>, value: i32 },
    Clear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Arbitrary)]
enum Key {
    Null,
    Small(u8),
}

impl Key {
    fn value(self) -> Value {
        match self {
            Self::Null => Value::null::<u8>(),
            Self::Small(n) => Value::new(n % 4),
        }
    }

    fn normalized(self) -> Self {
        match self {
            Self::Null => Self::Null,
            Self::Small(n) => Self::Small(n % 4),
        }
    }
}

fn args(key: &[Key]) -> (Vec<Value>, Vec<Key>) {
    let key: Vec<Key> = key.iter().take(3).copied().map(Key::normalized).collect();
    (key.iter().copied().map(Key::value).collect(), key)
}

fuzz_target!(|ops: Vec<StoreOp>| {
    let store = IndexerStore::new();
    let mut model: HashMap<Vec<Key>, i32> = HashMap::new();

    for op in ops {
        match op {
            StoreOp::Get { key } => {
                let (args, key) = args(&key);
                let actual = store.get(&args).and_then(|v| v.cast::<i32>());
                assert_eq!(actual, model.get(&key).copied(), "get {key:?}");
            },
            StoreOp::GetOrCreate { key, value } => {
                let (args, key) = args(&key);
                let mut created = false;
                let actual = store
                    .get_or_create(&args, || {
                        created = true;
                        Some(Value::new(value))
                    })
                    .and_then(|v| v.cast::<i32>());
                assert_eq!(created, !model.contains_key(&key), "factory runs once for {key:?}");
                let expected = *model.entry(key).or_insert(value);
                assert_eq!(actual, Some(expected));
            },
            StoreOp::Update { key, value } => {
                let (args, key) = args(&key);
                store.update(&args, Value::new(value));
                model.insert(key, value);
            },
            StoreOp::Clear => {
                store.clear();
                model.clear();
            },
        }
    }
});
