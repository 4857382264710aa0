//! Entry-point behaviour of a mock: dispatch, properties, indexers, events
//! and the not-set-up policy.

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use mimic_core::{
    DefaultValues, EventHandler, EventSetup, IndexerSetup, Matcher, MethodSetup, Mock, MockConfig,
    MockError, PropertySetup, SetupKind, TypeKey, Value, args, prelude::*,
};
use parking_lot::Mutex;

#[derive(Debug, Clone, PartialEq)]
struct Unavailable(&'static str);

impl std::fmt::Display for Unavailable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} unavailable", self.0)
    }
}

impl std::error::Error for Unavailable {}

#[test]
fn round_robin_returns() {
    let mock = Mock::default();
    mock.setup_method(MethodSetup::builder("Next").returns("a").returns("b").returns("c"));

    let results: Vec<&str> =
        (0..4).map(|_| mock.invoke_method::<&str>("Next", args![]).expect("configured")).collect();
    assert_eq!(results, vec!["a", "b", "c", "a"]);
}

#[test]
fn returns_for_calls_then_forever() {
    let mock = Mock::default();
    mock.setup_method(
        MethodSetup::builder("Fetch").returns(0_u8).for_calls(2).returns(1_u8).forever().returns(2_u8),
    );

    let results: Vec<u8> =
        (0..5).map(|_| mock.invoke_method::<u8>("Fetch", args![]).expect("configured")).collect();
    assert_eq!(results, vec![0, 0, 1, 1, 1]);
}

#[test]
fn throw_propagates_user_error_after_recording() {
    let mock = Mock::default();
    mock.setup_method(
        MethodSetup::builder("Connect")
            .args([Matcher::any::<String>()])
            .throws_with(|args: &[Value]| {
                Unavailable(if args[0].is_null() { "nothing" } else { "host" })
            }),
    );

    let err = mock.invoke_method::<bool>("Connect", args![String::from("db")]).expect_err("throws");
    assert_eq!(err.thrown_as::<Unavailable>(), Some(&Unavailable("host")));
    assert_eq!(err.to_string(), "host unavailable");

    let err = mock
        .invoke_method::<bool>("Connect", vec![Value::null::<String>()])
        .expect_err("throws");
    assert_eq!(err.thrown_as::<Unavailable>(), Some(&Unavailable("nothing")));

    assert_eq!(mock.interactions().len(), 2);
}

#[test]
fn callbacks_run_before_producer_in_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let (first, second, produced) = (Arc::clone(&log), Arc::clone(&log), Arc::clone(&log));

    let mock = Mock::default();
    mock.setup_method(
        MethodSetup::builder("Save")
            .args([Matcher::any::<i32>().on_match(|_: &i32| {})])
            .callback(move |_| first.lock().push("first"))
            .callback_with(move |v: &i32| second.lock().push(if *v > 0 { "positive" } else { "other" }))
            .returns_with(move |_| {
                produced.lock().push("produce");
                true
            }),
    );

    assert!(mock.invoke_method::<bool>("Save", args![5_i32]).expect("configured"));
    assert_eq!(*log.lock(), vec!["first", "positive", "produce"]);
}

#[test]
fn matcher_monitor_sees_actual_argument() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);

    let mock = Mock::default();
    mock.setup_method(
        MethodSetup::builder("Log").args([Matcher::any::<String>().on_match(move |s: &String| {
            sink.lock().push(s.clone());
        })]),
    );

    mock.invoke_void("Log", args![String::from("one")]).expect("loose");
    mock.invoke_void("Log", args![String::from("two")]).expect("loose");
    assert_eq!(*seen.lock(), vec!["one", "two"]);
}

#[test]
fn out_and_ref_outputs() {
    let mock = Mock::default();
    mock.setup_method(
        MethodSetup::builder("TryParse")
            .args([Matcher::eq("42"), Matcher::out(|| 42_i32)])
            .returns(true),
    );
    mock.setup_method(
        MethodSetup::builder("Bump").args([Matcher::ref_when(|v: &i32| *v >= 0, |v| v + 1)]),
    );
    mock.setup_method(MethodSetup::builder("Reset").args([Matcher::out_default::<u64>()]));

    let dispatch = mock.invoke("TryParse", args!["42", 0_i32]).expect("configured");
    assert_eq!(dispatch.value, Some(Value::new(true)));
    assert_eq!(dispatch.output(1), Some(&Value::new(42_i32)));

    let bumped = mock.invoke("Bump", args![1_i32]).expect("configured");
    assert_eq!(bumped.output(0), Some(&Value::new(2_i32)));

    let unmatched = mock.invoke("Bump", args![-1_i32]).expect("loose");
    assert_eq!(unmatched.output(0), None);

    let reset = mock.invoke("Reset", args![9_u64]).expect("configured");
    assert_eq!(reset.output(0), Some(&Value::new(0_u64)));
}

#[test]
fn ref_cast_failure_falls_back_to_default() {
    let mock = Mock::default();
    mock.setup_method(MethodSetup::builder("Bump").args([Matcher::ref_with(|v: &i32| v + 1)]));

    let dispatch = mock.invoke("Bump", args!["not a number"]).expect("ref always matches");
    assert_eq!(dispatch.output(0), Some(&Value::new(0_i32)));
}

#[test]
fn call_base_class_resolution() {
    let mock = Mock::new(MockConfig::default().with_call_base_class(true));
    mock.setup_method(MethodSetup::builder("Explicit").call_base_class(false));
    mock.setup_method(MethodSetup::builder("Inherited"));

    assert!(!mock.invoke("Explicit", args![]).expect("configured").call_base_class);
    assert!(mock.invoke("Inherited", args![]).expect("configured").call_base_class);
    assert!(mock.invoke("Unknown", args![]).expect("loose").call_base_class);
}

#[test]
fn strict_mode_fails_every_unstubbed_member() {
    let mock = Mock::strict();

    let err = mock.invoke_method::<i32>("Bar", args![7_i32]).expect_err("strict");
    assert!(matches!(&err, MockError::NotSetUp { member, arg_types } if member == "Bar" && arg_types == &["i32"]));

    assert!(mock.get_property::<i32>("Name").is_err());
    assert!(mock.set_property("Name", Value::new(1_i32)).is_err());
    assert!(mock.get_indexer::<i32>(args![1_u8]).is_err());
    assert!(mock.set_indexer(Value::new(1_i32), args![1_u8]).is_err());

    mock.add_event("Changed", None, EventHandler::new(|_| {}));

    assert_eq!(mock.interactions().len(), 6);
}

#[test]
fn loose_mode_returns_default_and_records_once() {
    let mock = Mock::default();
    assert_eq!(mock.invoke_method::<i32>("Bar", args![7_i32]).expect("loose"), 0);
    assert_eq!(mock.invoke_method::<String>("Bar", args![7_i32]).expect("loose"), "");
    assert_eq!(mock.interactions().len(), 2);
}

#[test]
fn custom_default_policy() {
    let mock = Mock::new(
        MockConfig::default().with_default_values(DefaultValues::standard().register(|| vec![1_u8, 2])),
    );
    assert_eq!(mock.invoke_method::<Vec<u8>>("Bytes", args![]).expect("registered"), vec![1, 2]);

    let mock = Mock::new(MockConfig::default().with_default_values(|ty: &TypeKey| {
        ty.is::<i32>().then(|| Value::new(-1_i32))
    }));
    assert_eq!(mock.invoke_method::<i32>("Anything", args![]).expect("closure policy"), -1);
    assert!(matches!(
        mock.invoke_method::<u8>("Anything", args![]),
        Err(MockError::NoDefaultValue { .. })
    ));
}

#[test]
fn unstubbed_property_round_trips() {
    let mock = Mock::default();
    assert_eq!(mock.get_property::<i32>("Count").expect("loose"), 0);
    assert!(!mock.set_property("Count", Value::new(5_i32)).expect("loose"));
    assert_eq!(mock.get_property::<i32>("Count").expect("loose"), 5);

    assert_eq!(mock.get_property_or("Title", || String::from("untitled")).expect("loose"), "untitled");
    assert_eq!(mock.get_property_or("Title", || String::from("ignored")).expect("loose"), "untitled");

    assert!(mock.unused_setups().is_empty());
    assert_eq!(mock.setups().len(SetupKind::Property), 2);
}

#[test]
fn property_factory_may_read_the_same_mock() {
    let mock = Arc::new(Mock::default());

    let (tx, rx) = std::sync::mpsc::channel();
    let worker = Arc::clone(&mock);
    std::thread::spawn(move || {
        let inner = Arc::clone(&worker);
        let value = worker.get_property_or("A", move || inner.get_property::<i32>("B").unwrap_or(0) + 1);
        let _ = tx.send(value);
    });

    let value = rx.recv_timeout(std::time::Duration::from_secs(5)).expect("factory must not block the mock");
    assert_eq!(value.expect("loose"), 1);
    assert_eq!(mock.get_property::<i32>("B").expect("loose"), 0);
    assert_eq!(mock.get_property::<i32>("A").expect("loose"), 1);
}

#[test]
fn huge_repeat_count_dispatches() {
    let mock = Mock::default();
    mock.setup_method(MethodSetup::builder("Next").returns(1_i32).for_calls(usize::MAX).returns(2_i32));

    for _ in 0..3 {
        assert_eq!(mock.invoke_method::<i32>("Next", args![]).expect("stubbed"), 1);
    }
}

#[test]
fn property_setup_initial_value_callbacks_and_producers() {
    let writes = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&writes);

    let mock = Mock::default();
    mock.setup_property(
        PropertySetup::builder("Name")
            .initialize_with(String::from("init"))
            .on_set(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .call_base_class(true),
    );
    mock.setup_property(PropertySetup::builder("Version").returns(1_u32).returns(2_u32));

    assert_eq!(mock.get_property::<String>("Name").expect("configured"), "init");
    assert!(mock.set_property("Name", Value::new(String::from("next"))).expect("configured"));
    assert_eq!(mock.get_property::<String>("Name").expect("configured"), "next");
    assert_eq!(writes.load(Ordering::SeqCst), 1);

    assert_eq!(mock.get_property::<u32>("Version").expect("configured"), 1);
    assert_eq!(mock.get_property::<u32>("Version").expect("configured"), 2);
}

#[test]
fn indexer_state_persists_without_setup() {
    let mock = Mock::default();
    assert_eq!(mock.get_indexer::<String>(args![1_i32, "a"]).expect("loose"), "");

    mock.set_indexer(Value::new(String::from("x")), args![1_i32, "a"]).expect("loose");
    assert_eq!(mock.get_indexer::<String>(args![1_i32, "a"]).expect("loose"), "x");
    assert_eq!(mock.get_indexer::<String>(args![1_i32, "b"]).expect("loose"), "");
}

#[test]
fn indexer_setup_layers_on_store() {
    let writes = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&writes);

    let mock = Mock::default();
    mock.setup_indexer(
        IndexerSetup::builder([Matcher::any::<u8>()])
            .initialize_with(|args| u32::from(args[0].cast::<u8>().unwrap_or_default()) * 10)
            .on_set(move |args, value| sink.lock().push((args[0].clone(), value.clone()))),
    );
    mock.setup_indexer(IndexerSetup::builder([Matcher::eq(99_u8)]).returns(7_u32));

    assert_eq!(mock.get_indexer::<u32>(args![3_u8]).expect("configured"), 30);
    mock.set_indexer(Value::new(1_u32), args![3_u8]).expect("configured");
    assert_eq!(mock.get_indexer::<u32>(args![3_u8]).expect("configured"), 1);
    assert_eq!(*writes.lock(), vec![(Value::new(3_u8), Value::new(1_u32))]);

    assert_eq!(mock.get_indexer::<u32>(args![99_u8]).expect("forced"), 7);
    mock.set_indexer(Value::new(5_u32), args![99_u8]).expect("configured");
    assert_eq!(mock.get_indexer::<u32>(args![99_u8]).expect("forced"), 7);
}

#[test]
fn events_subscribe_raise_unsubscribe() {
    let raised = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&raised);
    let handler = EventHandler::new(move |args| {
        counter.fetch_add(args.len(), Ordering::SeqCst);
    });

    let subscribed = Arc::new(AtomicUsize::new(0));
    let on_subscribe = Arc::clone(&subscribed);
    let unsubscribed = Arc::new(AtomicUsize::new(0));
    let on_unsubscribe = Arc::clone(&unsubscribed);

    let mock = Mock::default();
    mock.setup_event(
        EventSetup::builder("Changed")
            .on_subscribe(move |_| {
                on_subscribe.fetch_add(1, Ordering::SeqCst);
            })
            .on_unsubscribe(move |_| {
                on_unsubscribe.fetch_add(1, Ordering::SeqCst);
            }),
    );

    mock.add_event("Changed", None, handler.clone());
    assert_eq!(mock.raise_event("Changed", &args![1, 2]), 1);
    assert_eq!(raised.load(Ordering::SeqCst), 2);

    assert!(mock.remove_event("Changed", None, handler.clone()));
    assert!(!mock.remove_event("Changed", None, handler));
    assert_eq!(mock.raise_event("Changed", &[]), 0);

    assert_eq!(subscribed.load(Ordering::SeqCst), 1);
    assert_eq!(unsubscribed.load(Ordering::SeqCst), 1);
    assert_eq!(mock.interactions().len(), 3);
}

#[test]
fn clear_setups_restores_defaults() {
    let mock = Mock::default();
    mock.setup_method(MethodSetup::builder("Foo").returns(3_i32));
    mock.set_indexer(Value::new(1_i32), args![0_u8]).expect("loose");
    assert_eq!(mock.invoke_method::<i32>("Foo", args![]).expect("configured"), 3);

    mock.clear_setups();
    assert_eq!(mock.invoke_method::<i32>("Foo", args![]).expect("loose"), 0);
    assert_eq!(mock.get_indexer::<i32>(args![0_u8]).expect("loose"), 0);
}

#[test]
fn builder_errors_surface_at_setup_time() {
    let err = Matcher::in_range(5_i32, 1).map(|_| ()).expect_err("inverted range");
    assert!(matches!(err, MockError::InvalidConfiguration(_)));
    assert!(Matcher::regex("(unclosed").is_err());
}
