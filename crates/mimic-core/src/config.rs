//! Mock-wide configuration.
//!
//! The engine does not synthesise values for arbitrary types. When a member
//! has no configured result it asks a [`DefaultValuePolicy`] for the
//! requested [`TypeKey`]; [`DefaultValues`] is the stock registry.

use std::{any::TypeId, collections::HashMap, fmt, sync::Arc};

use crate::value::{ArgValue, TypeKey, Value};

/// Supplies values for types that have no configured result.
pub trait DefaultValuePolicy: Send + Sync {
    /// Default value for `ty`. `None` if this policy has nothing for it.
    fn default_value(&self, ty: &TypeKey) -> Option<Value>;
}

impl<F> DefaultValuePolicy for F
where
    F: Fn(&TypeKey) -> Option<Value> + Send + Sync,
{
    fn default_value(&self, ty: &TypeKey) -> Option<Value> {
        self(ty)
    }
}

type ValueFactory = Arc<dyn Fn() -> Value + Send + Sync>;

/// Registry of per-type default factories.
#[derive(Clone, Default)]
pub struct DefaultValues {
    factories: HashMap<TypeId, ValueFactory>,
}

impl DefaultValues {
    /// Empty registry: every lookup misses.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry pre-populated with primitives, `String`, `&str` and `()`.
    pub fn standard() -> Self {
        Self::empty()
            .with_default::<()>()
            .with_default::<bool>()
            .with_default::<char>()
            .with_default::<i8>()
            .with_default::<i16>()
            .with_default::<i32>()
            .with_default::<i64>()
            .with_default::<i128>()
            .with_default::<isize>()
            .with_default::<u8>()
            .with_default::<u16>()
            .with_default::<u32>()
            .with_default::<u64>()
            .with_default::<u128>()
            .with_default::<usize>()
            .with_default::<f32>()
            .with_default::<f64>()
            .with_default::<String>()
            .with_default::<&'static str>()
    }

    /// Register `T::default()` as the default for `T`.
    pub fn with_default<T: ArgValue + Default>(self) -> Self {
        self.register(T::default)
    }

    /// Register a factory for `T`, replacing any previous one.
    pub fn register<T: ArgValue>(mut self, factory: impl Fn() -> T + Send + Sync + 'static) -> Self {
        self.factories.insert(TypeId::of::<T>(), Arc::new(move || Value::new(factory())));
        self
    }

    /// Whether a factory is registered for `ty`.
    pub fn contains(&self, ty: &TypeKey) -> bool {
        self.factories.contains_key(&ty.id)
    }
}

impl DefaultValuePolicy for DefaultValues {
    fn default_value(&self, ty: &TypeKey) -> Option<Value> {
        self.factories.get(&ty.id).map(|factory| factory())
    }
}

impl fmt::Debug for DefaultValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultValues").field("types", &self.factories.len()).finish()
    }
}

/// Behaviour of a mock for members that have no matching setup.
#[derive(Clone)]
pub struct MockConfig {
    /// Fail with `NotSetUp` instead of returning a default value
    pub throw_when_not_setup: bool,
    /// Call-base-class answer when a setup leaves it unset
    pub call_base_class_default: bool,
    /// Source of default values for unconfigured results
    pub default_values: Arc<dyn DefaultValuePolicy>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            throw_when_not_setup: false,
            call_base_class_default: false,
            default_values: Arc::new(DefaultValues::standard()),
        }
    }
}

impl MockConfig {
    /// Loose defaults with strictness enabled.
    pub fn strict() -> Self {
        Self::default().with_throw_when_not_setup(true)
    }

    /// Set strictness.
    pub fn with_throw_when_not_setup(mut self, throw: bool) -> Self {
        self.throw_when_not_setup = throw;
        self
    }

    /// Set the mock-wide call-base-class default.
    pub fn with_call_base_class(mut self, call_base_class: bool) -> Self {
        self.call_base_class_default = call_base_class;
        self
    }

    /// Replace the default-value policy.
    pub fn with_default_values(mut self, policy: impl DefaultValuePolicy + 'static) -> Self {
        self.default_values = Arc::new(policy);
        self
    }

    /// Default value for `ty` from the configured policy.
    pub fn default_value(&self, ty: &TypeKey) -> Option<Value> {
        self.default_values.default_value(ty)
    }
}

impl fmt::Debug for MockConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockConfig")
            .field("throw_when_not_setup", &self.throw_when_not_setup)
            .field("call_base_class_default", &self.call_base_class_default)
            .finish_non_exhaustive()
    }
}
