//! Callbacks and the return/throw sequence shared by every setup kind.
//!
//! A [`Behavior`] is filled in by a builder through the [`Configure`] trait
//! and frozen when the setup is registered. The only state that changes
//! afterwards is the dispatch counter and per-callback fire counts, both
//! atomics.
//!
//! # Producer selection
//!
//! Each dispatch takes one number `k` from the counter. Producers carry a
//! repeat count (default 1). If a `forever` producer sits at position `p` and
//! `k` is at or past the sum of the repeat counts before `p`, it is used.
//! Otherwise `k` modulo the total repeat count is walked through the prefix
//! sums, which reduces to plain round-robin when nothing was customised.

use std::{
    any::Any,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use crate::{
    error::{BoxError, MockError},
    value::{ArgValue, Value},
};

type Action = Arc<dyn Fn(&[Value]) + Send + Sync>;
type CallGate = Arc<dyn Fn(usize) -> bool + Send + Sync>;
type ValueProducer = Arc<dyn Fn(&[Value]) -> Value + Send + Sync>;
type ErrorProducer = Arc<dyn Fn(&[Value]) -> BoxError + Send + Sync>;

#[derive(Clone)]
enum Produce {
    Value(ValueProducer),
    Throw(ErrorProducer),
}

struct Producer {
    produce: Produce,
    repeat: usize,
    forever: bool,
    when: Option<CallGate>,
}

struct Callback {
    action: Action,
    when: Option<CallGate>,
    limit: Option<usize>,
    fired: AtomicUsize,
}

impl Callback {
    /// Claim one firing for dispatch `k`. `false` if gated out or exhausted.
    fn try_fire(&self, k: usize) -> bool {
        if self.when.as_ref().is_some_and(|gate| !gate(k)) {
            return false;
        }
        match self.limit {
            Some(limit) => self
                .fired
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |f| (f < limit).then_some(f + 1))
                .is_ok(),
            None => {
                self.fired.fetch_add(1, Ordering::SeqCst);
                true
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LastAdded {
    Callback,
    Producer,
}

/// Ordered callbacks, producer sequence and call-base-class override of a
/// setup.
#[derive(Default)]
pub struct Behavior {
    callbacks: Vec<Callback>,
    producers: Vec<Producer>,
    call_base_class: Option<bool>,
    last: Option<LastAdded>,
    dispatches: AtomicUsize,
}

impl Behavior {
    fn push_callback(&mut self, action: Action) {
        self.callbacks.push(Callback { action, when: None, limit: None, fired: AtomicUsize::new(0) });
        self.last = Some(LastAdded::Callback);
    }

    fn push_producer(&mut self, produce: Produce) {
        self.producers.push(Producer { produce, repeat: 1, forever: false, when: None });
        self.last = Some(LastAdded::Producer);
    }

    fn set_gate(&mut self, gate: CallGate) {
        match self.last {
            Some(LastAdded::Callback) => {
                if let Some(callback) = self.callbacks.last_mut() {
                    callback.when = Some(gate);
                }
            },
            Some(LastAdded::Producer) => {
                if let Some(producer) = self.producers.last_mut() {
                    producer.when = Some(gate);
                }
            },
            None => {},
        }
    }

    fn set_times(&mut self, times: usize) {
        match self.last {
            Some(LastAdded::Callback) => {
                if let Some(callback) = self.callbacks.last_mut() {
                    callback.limit = Some(times);
                }
            },
            Some(LastAdded::Producer) => {
                if let Some(producer) = self.producers.last_mut() {
                    producer.repeat = times.max(1);
                }
            },
            None => {},
        }
    }

    fn set_forever(&mut self) {
        if self.last == Some(LastAdded::Producer)
            && let Some(producer) = self.producers.last_mut()
        {
            producer.forever = true;
        }
    }

    /// Explicit call-base-class override, if any.
    pub fn call_base_class(&self) -> Option<bool> {
        self.call_base_class
    }

    /// Number of times this behaviour has been dispatched.
    pub fn dispatch_count(&self) -> usize {
        self.dispatches.load(Ordering::SeqCst)
    }

    /// Index of the producer serving dispatch `k`, before gating.
    fn select(&self, k: usize) -> Option<usize> {
        let mut start = 0;
        for (i, producer) in self.producers.iter().enumerate() {
            if producer.forever && k >= start {
                return Some(i);
            }
            start = start.saturating_add(producer.repeat);
        }

        if start == 0 {
            return None;
        }

        let mut position = k % start;
        for (i, producer) in self.producers.iter().enumerate() {
            if position < producer.repeat {
                return Some(i);
            }
            position -= producer.repeat;
        }
        None
    }

    /// First producer from the selected one onwards, cyclically, whose gate
    /// accepts `k`.
    fn producer_for(&self, k: usize) -> Option<&Producer> {
        let selected = self.select(k)?;
        let count = self.producers.len();
        (0..count)
            .map(|offset| &self.producers[(selected + offset) % count])
            .find(|producer| producer.when.as_ref().is_none_or(|gate| gate(k)))
    }

    /// Run one dispatch: callbacks in registration order, then the next
    /// producer.
    ///
    /// Returns the produced value, `None` if no producer applies, or the
    /// user error of a throw producer.
    ///
    /// # Invariants
    ///
    /// - Post: the dispatch counter advanced by exactly one
    pub(crate) fn run(&self, args: &[Value]) -> Result<Option<Value>, MockError> {
        let k = self.dispatches.fetch_add(1, Ordering::SeqCst);

        for callback in &self.callbacks {
            if callback.try_fire(k) {
                (callback.action)(args);
            }
        }

        match self.producer_for(k).map(|p| &p.produce) {
            Some(Produce::Value(produce)) => Ok(Some(produce(args))),
            Some(Produce::Throw(produce)) => Err(MockError::Thrown(produce(args))),
            None => Ok(None),
        }
    }
}

impl std::fmt::Debug for Behavior {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Behavior")
            .field("callbacks", &self.callbacks.len())
            .field("producers", &self.producers.len())
            .field("call_base_class", &self.call_base_class)
            .field("dispatches", &self.dispatch_count())
            .finish()
    }
}

/// Fluent configuration shared by method, property and indexer builders.
///
/// `when`, `for_calls` and `forever` modify whatever was added last, a
/// callback or a producer. Called before anything was added they do nothing.
pub trait Configure: Sized {
    /// Behaviour under construction.
    fn behavior_mut(&mut self) -> &mut Behavior;

    /// Append a fixed return value to the sequence.
    fn returns<T: ArgValue>(self, value: T) -> Self {
        self.returns_value(Value::new(value))
    }

    /// Append an already boxed return value, e.g. a typed null.
    fn returns_value(mut self, value: Value) -> Self {
        self.behavior_mut().push_producer(Produce::Value(Arc::new(move |_| value.clone())));
        self
    }

    /// Append a return value computed from the actual arguments.
    fn returns_with<T: ArgValue>(
        mut self,
        produce: impl Fn(&[Value]) -> T + Send + Sync + 'static,
    ) -> Self {
        self.behavior_mut()
            .push_producer(Produce::Value(Arc::new(move |args| Value::new(produce(args)))));
        self
    }

    /// Append a fixed error to the sequence.
    fn throws<E>(mut self, error: E) -> Self
    where
        E: std::error::Error + Clone + Send + Sync + 'static,
    {
        self.behavior_mut()
            .push_producer(Produce::Throw(Arc::new(move |_| Box::new(error.clone()) as BoxError)));
        self
    }

    /// Append an error computed from the actual arguments.
    fn throws_with<E>(mut self, produce: impl Fn(&[Value]) -> E + Send + Sync + 'static) -> Self
    where
        E: Into<BoxError>,
    {
        self.behavior_mut().push_producer(Produce::Throw(Arc::new(move |args| produce(args).into())));
        self
    }

    /// Append a callback receiving the actual arguments.
    fn callback(mut self, action: impl Fn(&[Value]) + Send + Sync + 'static) -> Self {
        self.behavior_mut().push_callback(Arc::new(action));
        self
    }

    /// Append a callback receiving the first argument as `T`.
    ///
    /// Does not fire when the first argument is missing, null or not a `T`.
    fn callback_with<T: Any>(mut self, action: impl Fn(&T) + Send + Sync + 'static) -> Self {
        self.behavior_mut().push_callback(Arc::new(move |args: &[Value]| {
            if let Some(value) = args.first().and_then(Value::downcast_ref::<T>) {
                action(value);
            }
        }));
        self
    }

    /// Gate the last callback or producer on the zero-based dispatch number.
    ///
    /// A gated-out producer passes the dispatch to the next producer whose
    /// gate accepts it.
    fn when(mut self, gate: impl Fn(usize) -> bool + Send + Sync + 'static) -> Self {
        self.behavior_mut().set_gate(Arc::new(gate));
        self
    }

    /// Repeat the last producer for `times` consecutive dispatches (at least
    /// one), or let the last callback fire at most `times` times.
    fn for_calls(mut self, times: usize) -> Self {
        self.behavior_mut().set_times(times);
        self
    }

    /// Once reached, keep using the last producer for every later dispatch.
    fn forever(mut self) -> Self {
        self.behavior_mut().set_forever();
        self
    }

    /// Override the mock-wide call-base-class default for this setup.
    fn call_base_class(mut self, call_base_class: bool) -> Self {
        self.behavior_mut().call_base_class = Some(call_base_class);
        self
    }
}

impl Configure for Behavior {
    fn behavior_mut(&mut self) -> &mut Behavior {
        self
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;
    use crate::args;

    #[derive(Debug, Clone, PartialEq)]
    struct Boom;

    impl std::fmt::Display for Boom {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("boom")
        }
    }

    impl std::error::Error for Boom {}

    fn outputs(behavior: &Behavior, n: usize) -> Vec<Option<i32>> {
        (0..n)
            .map(|_| {
                behavior
                    .run(&[])
                    .ok()
                    .flatten()
                    .and_then(|v| v.cast::<i32>())
            })
            .collect()
    }

    #[test]
    fn round_robin_wraps() {
        let behavior = Behavior::default().returns(1).returns(2).returns(3);
        assert_eq!(outputs(&behavior, 4), vec![Some(1), Some(2), Some(3), Some(1)]);
        assert_eq!(behavior.dispatch_count(), 4);
    }

    #[test]
    fn for_calls_then_forever() {
        let behavior = Behavior::default().returns(1).for_calls(2).returns(2).forever();
        assert_eq!(outputs(&behavior, 5), vec![Some(1), Some(1), Some(2), Some(2), Some(2)]);
    }

    #[test]
    fn forever_first_producer_wins_immediately() {
        let behavior = Behavior::default().returns(7).forever().returns(8);
        assert_eq!(outputs(&behavior, 3), vec![Some(7), Some(7), Some(7)]);
    }

    #[test]
    fn zero_repeat_is_clamped() {
        let behavior = Behavior::default().returns(1).for_calls(0).returns(2);
        assert_eq!(outputs(&behavior, 2), vec![Some(1), Some(2)]);
    }

    #[test]
    fn huge_repeat_counts_saturate() {
        let behavior = Behavior::default().returns(1).for_calls(usize::MAX).returns(2);
        assert_eq!(outputs(&behavior, 3), vec![Some(1), Some(1), Some(1)]);

        let sticky = Behavior::default()
            .returns(1)
            .for_calls(usize::MAX)
            .returns(2)
            .for_calls(usize::MAX)
            .returns(3)
            .forever();
        assert_eq!(outputs(&sticky, 2), vec![Some(1), Some(1)]);
    }

    #[test]
    fn gated_producer_defers_to_next() {
        let behavior = Behavior::default().returns(1).when(|k| k >= 2).returns(2).when(|k| k < 1);
        assert_eq!(outputs(&behavior, 4), vec![Some(2), None, Some(1), Some(1)]);
    }

    #[test]
    fn throws_propagates_user_error() {
        let behavior = Behavior::default().returns(1).throws(Boom);
        assert!(behavior.run(&[]).is_ok());
        let err = behavior.run(&[]).err();
        assert_eq!(err.as_ref().and_then(MockError::thrown_as::<Boom>), Some(&Boom));
    }

    #[test]
    fn callbacks_fire_in_order_with_limits() {
        let log = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let (first, second) = (Arc::clone(&log), Arc::clone(&log));
        let behavior = Behavior::default()
            .callback(move |_| first.lock().push("a"))
            .for_calls(1)
            .callback(move |_| second.lock().push("b"))
            .when(|k| k % 2 == 1);

        for _ in 0..4 {
            assert!(matches!(behavior.run(&[]), Ok(None)));
        }
        assert_eq!(*log.lock(), vec!["a", "b", "b"]);
    }

    #[test]
    fn typed_callback_skips_mismatched_argument() {
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        let behavior = Behavior::default().callback_with::<i32>(move |v| {
            counter.fetch_add(usize::try_from(*v).unwrap_or(0), Ordering::SeqCst);
        });

        behavior.run(&args![5_i32]).expect("no producer configured");
        behavior.run(&args!["five"]).expect("no producer configured");
        behavior.run(&[]).expect("no producer configured");
        assert_eq!(seen.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn returns_with_sees_arguments() {
        let behavior = Behavior::default().returns_with(|args| args.len() * 10);
        let value = behavior.run(&args![1, 2]).expect("value producer").expect("value");
        assert_eq!(value.cast::<usize>(), Some(20));
    }

    #[test]
    fn concurrent_dispatch_advances_once_each() {
        let behavior = Behavior::default().returns(0).returns(1);
        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    for _ in 0..100 {
                        behavior.run(&[]).expect("value producer");
                    }
                });
            }
        });
        assert_eq!(behavior.dispatch_count(), 400);
    }
}
