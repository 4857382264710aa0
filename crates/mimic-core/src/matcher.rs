//! Parameter matchers.
//!
//! A [`Matcher`] is a predicate over one type-erased argument. Typed
//! constructors downcast the actual value; a value of another type simply
//! does not match. `Out` and `Ref` matchers additionally produce a value
//! that the proxy writes back into the corresponding parameter.
//!
//! [`ArgMatchers`] lifts matchers to a whole argument vector.

use std::{any::Any, cmp::Ordering, fmt, sync::Arc};

use regex::{Regex, RegexBuilder};

use crate::{
    config::MockConfig,
    error::MockError,
    value::{ArgValue, TypeKey, Value, short_type_name},
};

type ValuePredicate = Arc<dyn Fn(&Value) -> bool + Send + Sync>;
type ValueComparer = Arc<dyn Fn(&Value, &Value) -> bool + Send + Sync>;
type ValueTransform = Arc<dyn Fn(&Value) -> Option<Value> + Send + Sync>;
type ValueFactory = Arc<dyn Fn() -> Value + Send + Sync>;
type MatchCallback = Arc<dyn Fn(&Value) + Send + Sync>;
type ArgsPredicate = Arc<dyn Fn(&[Value]) -> bool + Send + Sync>;

/// Options for [`Matcher::pattern`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatternOptions {
    /// Treat the pattern as a regular expression instead of a wildcard
    pub regex: bool,
    /// Match case-insensitively
    pub ignore_case: bool,
}

#[derive(Clone)]
enum Kind {
    Anything,
    Any { type_name: &'static str, accepts: ValuePredicate },
    Null { type_name: &'static str },
    Equals { expected: Value, comparer: Option<ValueComparer> },
    Predicate { label: String, test: ValuePredicate },
    Range { label: String, test: ValuePredicate },
    Pattern { pattern: String, regex: Regex },
    OneOf { values: Vec<Value>, comparer: Option<ValueComparer> },
    Out { type_key: TypeKey, generator: Option<ValueFactory> },
    Ref { type_key: TypeKey, test: Option<ValuePredicate>, transform: ValueTransform },
}

/// Predicate over a single argument value.
///
/// Cheap to clone; matchers are shared between a setup and the
/// verification queries built from it.
#[derive(Clone)]
pub struct Matcher {
    kind: Kind,
    callbacks: Vec<MatchCallback>,
}

fn erase_predicate<T: Any>(f: impl Fn(&T) -> bool + Send + Sync + 'static) -> ValuePredicate {
    Arc::new(move |value: &Value| value.downcast_ref::<T>().is_some_and(&f))
}

fn erase_comparer<T: Any>(f: impl Fn(&T, &T) -> bool + Send + Sync + 'static) -> ValueComparer {
    Arc::new(move |expected: &Value, actual: &Value| {
        match (expected.downcast_ref::<T>(), actual.downcast_ref::<T>()) {
            (Some(expected), Some(actual)) => f(expected, actual),
            _ => false,
        }
    })
}

fn erase_transform<T: ArgValue>(f: impl Fn(&T) -> T + Send + Sync + 'static) -> ValueTransform {
    Arc::new(move |value: &Value| value.downcast_ref::<T>().map(|v| Value::new(f(v))))
}

fn compare(expected: &Value, actual: &Value, comparer: Option<&ValueComparer>) -> bool {
    match comparer {
        Some(comparer) => comparer(expected, actual),
        None => expected.value_eq(actual),
    }
}

fn wildcard_to_regex(pattern: &str) -> String {
    let mut regex = String::with_capacity(pattern.len() + 2);
    regex.push_str("(?s)^");
    for ch in pattern.chars() {
        match ch {
            '*' => regex.push_str(".*"),
            '?' => regex.push('.'),
            _ => regex.push_str(&regex::escape(ch.encode_utf8(&mut [0; 4]))),
        }
    }
    regex.push('$');
    regex
}

impl Matcher {
    fn from_kind(kind: Kind) -> Self {
        Self { kind, callbacks: Vec::new() }
    }

    /// Matches every value, null or not, of any type.
    pub fn anything() -> Self {
        Self::from_kind(Kind::Anything)
    }

    /// Matches any `T`, or a null declared as `T`.
    pub fn any<T: Any>() -> Self {
        let type_name = std::any::type_name::<T>();
        Self::from_kind(Kind::Any {
            type_name,
            accepts: Arc::new(move |value: &Value| {
                value.is::<T>() || (value.is_null() && value.type_name() == type_name)
            }),
        })
    }

    /// Matches null only.
    pub fn null<T: ?Sized + 'static>() -> Self {
        Self::from_kind(Kind::Null { type_name: std::any::type_name::<T>() })
    }

    /// Matches values equal to `expected` by `PartialEq`.
    pub fn eq<T: ArgValue>(expected: T) -> Self {
        Self::from_kind(Kind::Equals { expected: Value::new(expected), comparer: None })
    }

    /// Matches values equal to `expected` under a custom comparer.
    pub fn eq_by<T: ArgValue>(
        expected: T,
        comparer: impl Fn(&T, &T) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self::from_kind(Kind::Equals {
            expected: Value::new(expected),
            comparer: Some(erase_comparer(comparer)),
        })
    }

    /// Matches a non-null `T` accepted by `test`.
    ///
    /// A null has no `T` to hand to `test` and never matches; use
    /// [`Matcher::satisfies_value`] to decide nulls.
    pub fn satisfies<T: Any>(
        label: impl Into<String>,
        test: impl Fn(&T) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self::from_kind(Kind::Predicate { label: label.into(), test: erase_predicate(test) })
    }

    /// Matches any value (including null) accepted by `test`.
    pub fn satisfies_value(
        label: impl Into<String>,
        test: impl Fn(&Value) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self::from_kind(Kind::Predicate { label: label.into(), test: Arc::new(test) })
    }

    /// Matches `min <= value <= max`.
    ///
    /// Fails if `min > max` or the bounds are incomparable.
    pub fn in_range<T: ArgValue + PartialOrd + Clone>(min: T, max: T) -> Result<Self, MockError> {
        Self::range(min, max, true)
    }

    /// Matches `min < value < max`.
    pub fn in_range_exclusive<T: ArgValue + PartialOrd + Clone>(
        min: T,
        max: T,
    ) -> Result<Self, MockError> {
        Self::range(min, max, false)
    }

    fn range<T: ArgValue + PartialOrd + Clone>(
        min: T,
        max: T,
        inclusive: bool,
    ) -> Result<Self, MockError> {
        if !matches!(min.partial_cmp(&max), Some(Ordering::Less | Ordering::Equal)) {
            return Err(MockError::InvalidConfiguration(format!(
                "range minimum {min:?} must not exceed maximum {max:?}"
            )));
        }

        let label = if inclusive {
            format!("InRange({min:?}, {max:?})")
        } else {
            format!("InRangeExclusive({min:?}, {max:?})")
        };
        let test = erase_predicate(move |value: &T| {
            if inclusive { *value >= min && *value <= max } else { *value > min && *value < max }
        });

        Ok(Self::from_kind(Kind::Range { label, test }))
    }

    /// Matches strings against a wildcard pattern (`*` any run, `?` one
    /// character), case-sensitively.
    pub fn wildcard(pattern: &str) -> Result<Self, MockError> {
        Self::pattern(pattern, PatternOptions::default())
    }

    /// Matches strings against a regular expression.
    pub fn regex(pattern: &str) -> Result<Self, MockError> {
        Self::pattern(pattern, PatternOptions { regex: true, ignore_case: false })
    }

    /// Matches `String` and `&str` values against a wildcard or regex.
    ///
    /// Wildcards are anchored at both ends; regular expressions search.
    pub fn pattern(pattern: &str, options: PatternOptions) -> Result<Self, MockError> {
        let source = if options.regex { pattern.to_string() } else { wildcard_to_regex(pattern) };
        let regex = RegexBuilder::new(&source)
            .case_insensitive(options.ignore_case)
            .build()
            .map_err(|e| MockError::InvalidConfiguration(format!("invalid pattern {pattern:?}: {e}")))?;

        Ok(Self::from_kind(Kind::Pattern { pattern: pattern.to_string(), regex }))
    }

    /// Matches values equal to any of `values`.
    pub fn one_of<T: ArgValue>(values: impl IntoIterator<Item = T>) -> Self {
        Self::from_kind(Kind::OneOf {
            values: values.into_iter().map(Value::new).collect(),
            comparer: None,
        })
    }

    /// Matches values equal to any of `values` under a custom comparer.
    pub fn one_of_by<T: ArgValue>(
        values: impl IntoIterator<Item = T>,
        comparer: impl Fn(&T, &T) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self::from_kind(Kind::OneOf {
            values: values.into_iter().map(Value::new).collect(),
            comparer: Some(erase_comparer(comparer)),
        })
    }

    /// Out parameter: always matches, writes back `generator()`.
    pub fn out<T: ArgValue>(generator: impl Fn() -> T + Send + Sync + 'static) -> Self {
        Self::from_kind(Kind::Out {
            type_key: TypeKey::of::<T>(),
            generator: Some(Arc::new(move || Value::new(generator()))),
        })
    }

    /// Out parameter: always matches, writes back the policy default for `T`.
    pub fn out_default<T: ArgValue>() -> Self {
        Self::from_kind(Kind::Out { type_key: TypeKey::of::<T>(), generator: None })
    }

    /// Ref parameter: always matches, writes back `transform(actual)`.
    pub fn ref_with<T: ArgValue>(transform: impl Fn(&T) -> T + Send + Sync + 'static) -> Self {
        Self::from_kind(Kind::Ref {
            type_key: TypeKey::of::<T>(),
            test: None,
            transform: erase_transform(transform),
        })
    }

    /// Ref parameter: matches when `test` accepts the input, writes back
    /// `transform(actual)`.
    pub fn ref_when<T: ArgValue>(
        test: impl Fn(&T) -> bool + Send + Sync + 'static,
        transform: impl Fn(&T) -> T + Send + Sync + 'static,
    ) -> Self {
        Self::from_kind(Kind::Ref {
            type_key: TypeKey::of::<T>(),
            test: Some(erase_predicate(test)),
            transform: erase_transform(transform),
        })
    }

    /// Register a monitoring callback fired with the actual argument each
    /// time the owning setup is dispatched.
    pub fn monitor(mut self, callback: impl Fn(&Value) + Send + Sync + 'static) -> Self {
        self.callbacks.push(Arc::new(callback));
        self
    }

    /// Typed [`Matcher::monitor`]; not fired when the argument is not a `T`.
    pub fn on_match<T: Any>(self, callback: impl Fn(&T) + Send + Sync + 'static) -> Self {
        self.monitor(move |value| {
            if let Some(value) = value.downcast_ref::<T>() {
                callback(value);
            }
        })
    }

    /// Whether `value` satisfies this matcher.
    pub fn matches(&self, value: &Value) -> bool {
        match &self.kind {
            Kind::Anything | Kind::Out { .. } | Kind::Ref { test: None, .. } => true,
            Kind::Any { accepts, .. } => accepts(value),
            Kind::Null { .. } => value.is_null(),
            Kind::Equals { expected, comparer } => compare(expected, value, comparer.as_ref()),
            Kind::Predicate { test, .. } | Kind::Range { test, .. } | Kind::Ref { test: Some(test), .. } => {
                test(value)
            },
            Kind::Pattern { regex, .. } => {
                let text = value
                    .downcast_ref::<String>()
                    .map(String::as_str)
                    .or_else(|| value.downcast_ref::<&'static str>().copied());
                text.is_some_and(|text| regex.is_match(text))
            },
            Kind::OneOf { values, comparer } => {
                values.iter().any(|expected| compare(expected, value, comparer.as_ref()))
            },
        }
    }

    /// Fire monitoring callbacks with the actual argument.
    pub(crate) fn notify(&self, value: &Value) {
        for callback in &self.callbacks {
            callback(value);
        }
    }

    /// Whether this matcher writes back a value.
    pub fn is_output(&self) -> bool {
        matches!(self.kind, Kind::Out { .. } | Kind::Ref { .. })
    }

    /// Value to write back into the parameter, for `Out`/`Ref` matchers.
    ///
    /// A ref transform that cannot handle the actual value falls back to the
    /// configured default for the declared type.
    pub(crate) fn output(&self, actual: &Value, config: &MockConfig) -> Option<Value> {
        match &self.kind {
            Kind::Out { generator: Some(generator), .. } => Some(generator()),
            Kind::Out { type_key, generator: None } => config.default_value(type_key),
            Kind::Ref { type_key, transform, .. } => transform(actual).or_else(|| {
                tracing::warn!(
                    expected = type_key.name,
                    actual = actual.type_name(),
                    "ref transform could not cast argument, using default value"
                );
                config.default_value(type_key)
            }),
            _ => None,
        }
    }

    /// Human-readable form used in verification and setup reports.
    pub fn describe(&self) -> String {
        match &self.kind {
            Kind::Anything => "Any()".to_string(),
            Kind::Any { type_name, .. } => format!("Any<{}>()", short_type_name(type_name)),
            Kind::Null { type_name } => format!("Null<{}>()", short_type_name(type_name)),
            Kind::Equals { expected, .. } => format!("{expected:?}"),
            Kind::Predicate { label, .. } | Kind::Range { label, .. } => label.clone(),
            Kind::Pattern { pattern, .. } => format!("Matches({pattern:?})"),
            Kind::OneOf { values, .. } => {
                let values: Vec<_> = values.iter().map(|v| format!("{v:?}")).collect();
                format!("OneOf({})", values.join(", "))
            },
            Kind::Out { type_key, .. } => format!("Out<{}>()", short_type_name(type_key.name)),
            Kind::Ref { type_key, .. } => format!("Ref<{}>()", short_type_name(type_key.name)),
        }
    }
}

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

/// Matcher expression over a whole argument vector.
#[derive(Clone)]
pub enum ArgMatchers {
    /// Any arguments, any arity
    Any,
    /// One matcher per position; arity must match
    Positional(Vec<Matcher>),
    /// A single predicate over the whole vector
    Predicate {
        /// Label used in descriptions
        label: String,
        /// The predicate
        test: ArgsPredicate,
    },
}

impl ArgMatchers {
    /// Positional matchers.
    pub fn positional(matchers: impl IntoIterator<Item = Matcher>) -> Self {
        Self::Positional(matchers.into_iter().collect())
    }

    /// Whole-vector predicate.
    pub fn predicate(
        label: impl Into<String>,
        test: impl Fn(&[Value]) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self::Predicate { label: label.into(), test: Arc::new(test) }
    }

    /// Whether `args` satisfy this expression.
    pub fn matches(&self, args: &[Value]) -> bool {
        match self {
            Self::Any => true,
            Self::Positional(matchers) => {
                matchers.len() == args.len()
                    && matchers.iter().zip(args).all(|(matcher, arg)| matcher.matches(arg))
            },
            Self::Predicate { test, .. } => test(args),
        }
    }

    /// Fire per-matcher monitoring callbacks.
    pub(crate) fn notify(&self, args: &[Value]) {
        if let Self::Positional(matchers) = self {
            for (matcher, arg) in matchers.iter().zip(args) {
                matcher.notify(arg);
            }
        }
    }

    /// Out/ref write-backs, one slot per actual argument.
    pub(crate) fn outputs(&self, args: &[Value], config: &MockConfig) -> Vec<Option<Value>> {
        match self {
            Self::Positional(matchers) => {
                matchers.iter().zip(args).map(|(matcher, arg)| matcher.output(arg, config)).collect()
            },
            Self::Any | Self::Predicate { .. } => vec![None; args.len()],
        }
    }

    /// Comma-separated description without surrounding brackets.
    pub fn describe(&self) -> String {
        match self {
            Self::Any => "..".to_string(),
            Self::Positional(matchers) => {
                matchers.iter().map(Matcher::describe).collect::<Vec<_>>().join(", ")
            },
            Self::Predicate { label, .. } => label.clone(),
        }
    }
}

impl Default for ArgMatchers {
    fn default() -> Self {
        Self::Positional(Vec::new())
    }
}

impl fmt::Debug for ArgMatchers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.describe())
    }
}

impl From<Vec<Matcher>> for ArgMatchers {
    fn from(matchers: Vec<Matcher>) -> Self {
        Self::Positional(matchers)
    }
}

impl<const N: usize> From<[Matcher; N]> for ArgMatchers {
    fn from(matchers: [Matcher; N]) -> Self {
        Self::positional(matchers)
    }
}

impl From<Matcher> for ArgMatchers {
    fn from(matcher: Matcher) -> Self {
        Self::Positional(vec![matcher])
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn null_matcher_accepts_only_null() {
        let m = Matcher::null::<String>();
        assert!(m.matches(&Value::null::<String>()));
        assert!(!m.matches(&Value::new(String::from("x"))));
    }

    #[test]
    fn any_matcher_accepts_null_and_typed_values() {
        let m = Matcher::any::<String>();
        assert!(m.matches(&Value::null::<String>()));
        assert!(m.matches(&Value::new(String::from("x"))));
        assert!(!m.matches(&Value::new(1_i32)));
        assert!(!m.matches(&Value::null::<i32>()));
    }

    #[test]
    fn satisfies_value_decides_nulls() {
        let m = Matcher::satisfies_value("null or empty", |v: &Value| {
            v.is_null() || v.downcast_ref::<String>().is_some_and(String::is_empty)
        });
        assert!(m.matches(&Value::null::<String>()));
        assert!(m.matches(&Value::new(String::new())));
        assert!(!m.matches(&Value::new(String::from("x"))));

        assert!(!Matcher::satisfies("any", |_: &String| true).matches(&Value::null::<String>()));
    }

    #[test]
    fn one_of_by_uses_comparer() {
        let m = Matcher::one_of_by([String::from("GET"), String::from("HEAD")], |a: &String, b: &String| {
            a.eq_ignore_ascii_case(b)
        });
        assert!(m.matches(&Value::new(String::from("get"))));
        assert!(m.matches(&Value::new(String::from("Head"))));
        assert!(!m.matches(&Value::new(String::from("post"))));
        assert!(!m.matches(&Value::null::<String>()));

        let plain = Matcher::one_of([String::from("GET")]);
        assert!(!plain.matches(&Value::new(String::from("get"))));
    }

    #[test]
    fn eq_rejects_null_and_other_types() {
        let m = Matcher::eq(5_i32);
        assert!(m.matches(&Value::new(5_i32)));
        assert!(!m.matches(&Value::new(5_i64)));
        assert!(!m.matches(&Value::null::<i32>()));
    }

    #[test]
    fn eq_by_uses_comparer() {
        let m = Matcher::eq_by(String::from("ABC"), |a: &String, b: &String| a.eq_ignore_ascii_case(b));
        assert!(m.matches(&Value::new(String::from("abc"))));
        assert!(!m.matches(&Value::new(String::from("abd"))));
    }

    #[test]
    fn range_rejects_inverted_bounds() {
        assert!(matches!(Matcher::in_range(5, 1), Err(MockError::InvalidConfiguration(_))));
        assert!(matches!(Matcher::in_range(1.0, f64::NAN), Err(MockError::InvalidConfiguration(_))));
        assert!(Matcher::in_range(3, 3).is_ok());
    }

    #[test]
    fn range_bounds() -> Result<(), MockError> {
        let inclusive = Matcher::in_range(1, 5)?;
        let exclusive = Matcher::in_range_exclusive(1, 5)?;
        assert!(inclusive.matches(&Value::new(1)));
        assert!(inclusive.matches(&Value::new(5)));
        assert!(!exclusive.matches(&Value::new(1)));
        assert!(exclusive.matches(&Value::new(3)));
        assert!(!inclusive.matches(&Value::new(6)));
        Ok(())
    }

    #[test]
    fn wildcard_patterns() -> Result<(), MockError> {
        let m = Matcher::wildcard("fo?.*")?;
        assert!(m.matches(&Value::new(String::from("foo.txt"))));
        assert!(m.matches(&Value::new("fox.")));
        assert!(!m.matches(&Value::new("foxtxt")));
        assert!(!m.matches(&Value::new(String::from("FOO.txt"))));
        assert!(!m.matches(&Value::null::<String>()));

        let m = Matcher::pattern("FOO*", PatternOptions { regex: false, ignore_case: true })?;
        assert!(m.matches(&Value::new("foobar")));
        Ok(())
    }

    #[test]
    fn regex_patterns() -> Result<(), MockError> {
        let m = Matcher::regex(r"^\d{3}$")?;
        assert!(m.matches(&Value::new("123")));
        assert!(!m.matches(&Value::new("12a")));
        assert!(matches!(Matcher::regex("("), Err(MockError::InvalidConfiguration(_))));
        Ok(())
    }

    #[test]
    fn one_of_matches_members() {
        let m = Matcher::one_of([1, 2, 3]);
        assert!(m.matches(&Value::new(2)));
        assert!(!m.matches(&Value::new(4)));
    }

    #[test]
    fn out_and_ref_write_back() {
        let config = MockConfig::default();
        let out = Matcher::out(|| 42_i32);
        assert!(out.matches(&Value::new(0_i32)));
        assert_eq!(out.output(&Value::new(0_i32), &config), Some(Value::new(42_i32)));

        let out_default = Matcher::out_default::<String>();
        assert_eq!(out_default.output(&Value::null::<String>(), &config), Some(Value::new(String::new())));

        let r = Matcher::ref_with(|v: &i32| v * 2);
        assert!(r.matches(&Value::new("not an int")));
        assert_eq!(r.output(&Value::new(21_i32), &config), Some(Value::new(42_i32)));
        // cast failure falls back to the default policy
        assert_eq!(r.output(&Value::new("x"), &config), Some(Value::new(0_i32)));

        let guarded = Matcher::ref_when(|v: &i32| *v > 0, |v| v + 1);
        assert!(guarded.matches(&Value::new(1_i32)));
        assert!(!guarded.matches(&Value::new(-1_i32)));
    }

    #[test]
    fn monitor_callbacks_fire_on_notify() {
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        let m = Matcher::any::<i32>().on_match(move |v: &i32| {
            counter.fetch_add(*v as usize, Ordering::SeqCst);
        });
        m.notify(&Value::new(3_i32));
        m.notify(&Value::new("ignored"));
        assert_eq!(seen.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn positional_arity_must_match() {
        let args = ArgMatchers::from([Matcher::eq(1), Matcher::any::<i32>()]);
        assert!(args.matches(&[Value::new(1), Value::new(9)]));
        assert!(!args.matches(&[Value::new(1)]));
        assert!(ArgMatchers::Any.matches(&[Value::new(1)]));
    }

    #[test]
    fn descriptions() -> Result<(), MockError> {
        let args = ArgMatchers::from([
            Matcher::eq(42),
            Matcher::any::<String>(),
            Matcher::in_range(1, 5)?,
            Matcher::wildcard("a*")?,
            Matcher::one_of([1, 2]),
            Matcher::out_default::<u8>(),
        ]);
        insta::assert_snapshot!(
            args.describe(),
            @r#"42, Any<String>(), InRange(1, 5), Matches("a*"), OneOf(1, 2), Out<u8>()"#
        );
        Ok(())
    }
}
