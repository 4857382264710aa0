//! Persistent backing state for indexers.
//!
//! A trie keyed by the ordered index arguments. Each level is scanned with
//! [`Value::value_eq`]; nulls get their own branch so they never take part in
//! the scan. Node creation is idempotent under races: a missing child is
//! looked up again under the write lock before one is inserted, so two
//! threads creating the same key converge on one node.

use std::sync::{Arc, OnceLock};

use parking_lot::{Mutex, RwLock};

use crate::value::Value;

#[derive(Debug, Default)]
struct Slot {
    materialized: bool,
    value: Option<Value>,
}

#[derive(Debug, Default)]
struct Node {
    slot: Mutex<Slot>,
    children: RwLock<Vec<(Value, Arc<Node>)>>,
    null_child: OnceLock<Arc<Node>>,
}

impl Node {
    fn find(&self, key: &Value) -> Option<Arc<Node>> {
        if key.is_null() {
            return self.null_child.get().cloned();
        }
        self.children
            .read()
            .iter()
            .find(|(k, _)| k.value_eq(key))
            .map(|(_, node)| Arc::clone(node))
    }

    fn find_or_insert(&self, key: &Value) -> Arc<Node> {
        if key.is_null() {
            return Arc::clone(self.null_child.get_or_init(Arc::default));
        }
        if let Some(node) = self.find(key) {
            return node;
        }

        let mut children = self.children.write();
        if let Some((_, node)) = children.iter().find(|(k, _)| k.value_eq(key)) {
            return Arc::clone(node);
        }
        let node = Arc::new(Node::default());
        children.push((key.clone(), Arc::clone(&node)));
        node
    }
}

/// Key-tuple to value store backing every indexer of one mock.
#[derive(Debug, Default)]
pub struct IndexerStore {
    root: RwLock<Arc<Node>>,
}

impl IndexerStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn walk_or_create(&self, args: &[Value]) -> Arc<Node> {
        let root = Arc::clone(&self.root.read());
        args.iter().fold(root, |node, key| node.find_or_insert(key))
    }

    fn walk(&self, args: &[Value]) -> Option<Arc<Node>> {
        let root = Arc::clone(&self.root.read());
        args.iter().try_fold(root, |node, key| node.find(key))
    }

    /// Persisted value for `args`, materialising it with `factory` on first
    /// access.
    ///
    /// The factory runs without any lock held, so it may read other keys.
    /// Sequential lookups call it at most once per key tuple. When threads
    /// race on a fresh key the first stored value wins and the rest are
    /// dropped. A factory that returns `None` still marks the key as
    /// materialised without a value.
    pub fn get_or_create(
        &self,
        args: &[Value],
        factory: impl FnOnce() -> Option<Value>,
    ) -> Option<Value> {
        let node = self.walk_or_create(args);
        {
            let slot = node.slot.lock();
            if slot.materialized {
                return slot.value.clone();
            }
        }

        let created = factory();
        let mut slot = node.slot.lock();
        if !slot.materialized {
            slot.value = created;
            slot.materialized = true;
        }
        slot.value.clone()
    }

    /// Persisted value for `args` without materialising anything.
    pub fn get(&self, args: &[Value]) -> Option<Value> {
        self.walk(args).and_then(|node| node.slot.lock().value.clone())
    }

    /// Overwrite the value for `args`.
    pub fn update(&self, args: &[Value], value: Value) {
        let node = self.walk_or_create(args);
        let mut slot = node.slot.lock();
        slot.value = Some(value);
        slot.materialized = true;
    }

    /// Drop every persisted value.
    pub fn clear(&self) {
        *self.root.write() = Arc::default();
    }
}
