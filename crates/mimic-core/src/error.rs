//! Error types for the mock engine.
//!
//! Resolution misses are not errors (they return `None`); these variants
//! cover what reaches the caller of an entry point, a setup constructor or a
//! verification assertion.

use thiserror::Error;

use crate::verify::Times;

/// Error raised by a user-configured producer.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors surfaced by the mock engine.
#[derive(Error, Debug)]
pub enum MockError {
    /// A member was accessed with no matching setup while the mock is strict.
    ///
    /// Never recovered silently. The interaction has already been recorded.
    #[error("{member}({}) was accessed but no matching setup exists", .arg_types.join(", "))]
    NotSetUp {
        /// Member description (method name, property name or `indexer`)
        member: String,
        /// Short type names of the actual arguments
        arg_types: Vec<String>,
    },

    /// A matcher or setup was built with invalid parameters.
    ///
    /// Raised at construction time, before any invocation happens.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A producer configured with `throws` fired.
    ///
    /// Carries the user error unchanged; see [`MockError::thrown_as`].
    #[error("{0}")]
    Thrown(BoxError),

    /// A count assertion on a verification result did not hold
    #[error("expected {description} {expected}, but it happened {actual} times")]
    VerificationFailed {
        /// What was verified
        description: String,
        /// Expected number of matching interactions
        expected: Times,
        /// Actual number of matching interactions
        actual: usize,
    },

    /// No value was configured and the default policy has none for the type
    #[error("no default value available for type {type_name}")]
    NoDefaultValue {
        /// Short name of the requested type
        type_name: String,
    },
}

impl MockError {
    /// Build the not-set-up error for a member and its actual arguments.
    pub fn not_set_up(member: impl Into<String>, args: &[crate::Value]) -> Self {
        Self::NotSetUp {
            member: member.into(),
            arg_types: args.iter().map(crate::Value::short_type_name).collect(),
        }
    }

    /// Borrow a thrown user error as its concrete type.
    pub fn thrown_as<E: std::error::Error + 'static>(&self) -> Option<&E> {
        match self {
            Self::Thrown(err) => err.downcast_ref::<E>(),
            _ => None,
        }
    }

    /// Whether this error came from a user producer.
    pub fn is_thrown(&self) -> bool {
        matches!(self, Self::Thrown(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args;

    #[derive(Debug, PartialEq)]
    struct Boom(u8);

    impl std::fmt::Display for Boom {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "boom {}", self.0)
        }
    }

    impl std::error::Error for Boom {}

    #[test]
    fn not_set_up_display_names_member_and_types() {
        let err = MockError::not_set_up("Bar", &args![7_i32, String::from("x")]);
        assert_eq!(err.to_string(), "Bar(i32, String) was accessed but no matching setup exists");
    }

    #[test]
    fn thrown_keeps_user_error() {
        let err = MockError::Thrown(Box::new(Boom(3)));
        assert!(err.is_thrown());
        assert_eq!(err.to_string(), "boom 3");
        assert_eq!(err.thrown_as::<Boom>(), Some(&Boom(3)));
        assert!(MockError::InvalidConfiguration(String::new()).thrown_as::<Boom>().is_none());
    }

    #[test]
    fn verification_failure_display() {
        let err = MockError::VerificationFailed {
            description: "invoked method Foo(1)".to_string(),
            expected: Times::Once,
            actual: 2,
        };
        assert_eq!(err.to_string(), "expected invoked method Foo(1) once, but it happened 2 times");
    }
}
