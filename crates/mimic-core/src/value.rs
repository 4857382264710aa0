//! Type-erased argument values.
//!
//! Proxies hand the engine arguments of arbitrary types. Each one is boxed
//! into a [`Value`]: a cheap-to-clone, thread-safe handle that remembers the
//! static type it was created for, even when it is null. Matchers and
//! callbacks downcast back to concrete types and treat a failed downcast as
//! "no match" rather than an error.

use std::{
    any::{Any, TypeId},
    fmt,
    sync::Arc,
};

/// Object-safe view of an argument value.
///
/// Blanket-implemented for every `Any + Send + Sync + Debug + PartialEq`
/// type, so user types only need the usual derives.
pub trait ArgValue: Any + Send + Sync + fmt::Debug {
    /// Upcast for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Equality across the erasure boundary. Values of different concrete
    /// types are never equal.
    fn eq_value(&self, other: &dyn ArgValue) -> bool;
}

impl<T> ArgValue for T
where
    T: Any + Send + Sync + fmt::Debug + PartialEq,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn eq_value(&self, other: &dyn ArgValue) -> bool {
        other.as_any().downcast_ref::<T>().is_some_and(|other| self == other)
    }
}

/// A boxed argument, return value or property value.
///
/// A null value carries no payload but keeps its declared type name so error
/// messages can still say what the caller passed.
#[derive(Clone)]
pub struct Value {
    inner: Option<Arc<dyn ArgValue>>,
    type_name: &'static str,
}

impl Value {
    /// Box a concrete value.
    pub fn new<T: ArgValue>(value: T) -> Self {
        Self { inner: Some(Arc::new(value)), type_name: std::any::type_name::<T>() }
    }

    /// Null value declared as type `T`.
    pub fn null<T: ?Sized + 'static>() -> Self {
        Self { inner: None, type_name: std::any::type_name::<T>() }
    }

    /// The unit value, used for void results.
    pub fn unit() -> Self {
        Self::new(())
    }

    /// `Some(v)` boxes `v`, `None` becomes a null declared as `T`.
    pub fn from_option<T: ArgValue>(value: Option<T>) -> Self {
        value.map_or_else(Self::null::<T>, Self::new)
    }

    /// Whether this value is null.
    pub fn is_null(&self) -> bool {
        self.inner.is_none()
    }

    /// Full type name this value was created with.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Type name with module paths stripped, for messages.
    pub fn short_type_name(&self) -> String {
        short_type_name(self.type_name)
    }

    /// Borrow the payload as `T`. `None` if null or of another type.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.as_deref().and_then(|inner| inner.as_any().downcast_ref::<T>())
    }

    /// Whether the payload is a non-null `T`.
    pub fn is<T: Any>(&self) -> bool {
        self.downcast_ref::<T>().is_some()
    }

    /// Clone the payload out as `T`. `None` if null or of another type.
    pub fn cast<T: Any + Clone>(&self) -> Option<T> {
        self.downcast_ref::<T>().cloned()
    }

    /// Null-aware equality: two nulls are equal regardless of declared type.
    pub fn value_eq(&self, other: &Self) -> bool {
        match (&self.inner, &other.inner) {
            (None, None) => true,
            (Some(a), Some(b)) => a.eq_value(b.as_ref()),
            _ => false,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.value_eq(other)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            Some(inner) => fmt::Debug::fmt(inner.as_ref(), f),
            None => f.write_str("null"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Identity of a requested result type, handed to the default-value policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeKey {
    /// Runtime type identity
    pub id: TypeId,
    /// Full type name
    pub name: &'static str,
}

impl TypeKey {
    /// Key for `T`.
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self { id: TypeId::of::<T>(), name: std::any::type_name::<T>() }
    }

    /// Whether this key identifies `T`.
    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

/// Strip module paths from a type name while keeping generic structure.
///
/// `alloc::vec::Vec<alloc::string::String>` becomes `Vec<String>`.
pub fn short_type_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut segment_start = 0;
    let mut chars = name.chars().peekable();

    while let Some(c) = chars.next() {
        if c == ':' && chars.peek() == Some(&':') {
            chars.next();
            out.truncate(segment_start);
        } else if c.is_alphanumeric() || c == '_' {
            out.push(c);
        } else {
            out.push(c);
            segment_start = out.len();
        }
    }

    out
}

/// Build a `Vec<Value>` from a list of expressions.
///
/// ```
/// use mimic_core::args;
///
/// let args = args![1, "two", 3.0_f64];
/// assert_eq!(args.len(), 3);
/// ```
#[macro_export]
macro_rules! args {
    () => {
        ::std::vec::Vec::<$crate::Value>::new()
    };
    ($($value:expr),+ $(,)?) => {
        ::std::vec![$($crate::Value::new($value)),+]
    };
}
