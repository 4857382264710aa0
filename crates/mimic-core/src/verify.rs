//! Verification queries over the ledger.
//!
//! A [`VerificationResult`] is computed on demand from a ledger snapshot and
//! never changes the ledger or the setups. Count assertions that hold mark
//! the matched interactions as verified in a set owned by the mock, which is
//! what [`crate::Mock::unverified_interactions`] reports against.

use std::fmt;

use dashmap::DashSet;

use crate::{error::MockError, interaction::Interaction};

/// Expected number of matching interactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Times {
    /// Zero
    Never,
    /// Exactly one
    Once,
    /// Exactly two
    Twice,
    /// Exactly `n`
    Exactly(usize),
    /// `n` or more
    AtLeast(usize),
    /// `n` or fewer
    AtMost(usize),
    /// Inclusive range
    Between(usize, usize),
}

impl Times {
    /// Inclusive range, rejecting `min > max`.
    pub fn between(min: usize, max: usize) -> Result<Self, MockError> {
        Self::Between(min, max).validate()
    }

    fn validate(self) -> Result<Self, MockError> {
        match self {
            Self::Between(min, max) if min > max => Err(MockError::InvalidConfiguration(format!(
                "times minimum {min} must not exceed maximum {max}"
            ))),
            _ => Ok(self),
        }
    }

    /// Whether `count` satisfies this expectation.
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Self::Never => count == 0,
            Self::Once => count == 1,
            Self::Twice => count == 2,
            Self::Exactly(n) => count == n,
            Self::AtLeast(n) => count >= n,
            Self::AtMost(n) => count <= n,
            Self::Between(min, max) => (min..=max).contains(&count),
        }
    }
}

impl fmt::Display for Times {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Never => f.write_str("never"),
            Self::Once => f.write_str("once"),
            Self::Twice => f.write_str("twice"),
            Self::Exactly(n) => write!(f, "exactly {n} times"),
            Self::AtLeast(n) => write!(f, "at least {n} times"),
            Self::AtMost(n) => write!(f, "at most {n} times"),
            Self::Between(min, max) => write!(f, "between {min} and {max} times"),
        }
    }
}

/// Ledger entries matching one verification query.
#[derive(Debug, Clone)]
pub struct VerificationResult<'a> {
    verified: &'a DashSet<u64>,
    description: String,
    matches: Vec<Interaction>,
    earlier_steps: Vec<u64>,
}

impl<'a> VerificationResult<'a> {
    pub(crate) fn new(
        verified: &'a DashSet<u64>,
        description: String,
        matches: Vec<Interaction>,
    ) -> Self {
        Self { verified, description, matches, earlier_steps: Vec::new() }
    }

    /// Number of matching interactions.
    pub fn count(&self) -> usize {
        self.matches.len()
    }

    /// Matching interactions in ledger order.
    pub fn interactions(&self) -> &[Interaction] {
        &self.matches
    }

    /// Ledger indices of the matching interactions.
    pub fn indices(&self) -> Vec<u64> {
        self.matches.iter().map(|i| i.index).collect()
    }

    /// Human-readable query, e.g. `invoked method Foo(42, Any<String>())`.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Ordered verification: keep the entries of `next` recorded after the
    /// first entry of this step.
    ///
    /// If this step matched nothing, the chained result is empty.
    pub fn then(self, next: Self) -> Self {
        let after = self.matches.first().map(|i| i.index);
        let matches = match after {
            Some(after) => next.matches.into_iter().filter(|i| i.index > after).collect(),
            None => Vec::new(),
        };

        let mut earlier_steps = self.earlier_steps;
        earlier_steps.extend(self.matches.iter().map(|i| i.index));
        earlier_steps.extend(next.earlier_steps);

        Self {
            verified: self.verified,
            description: format!("{}, then {}", self.description, next.description),
            matches,
            earlier_steps,
        }
    }

    /// Assert the count. On success every entry of every chained step is
    /// marked verified.
    ///
    /// An inverted [`Times::Between`] fails with
    /// [`MockError::InvalidConfiguration`] before anything is counted.
    pub fn times(&self, expected: Times) -> Result<(), MockError> {
        let expected = expected.validate()?;
        let actual = self.count();
        if !expected.accepts(actual) {
            return Err(MockError::VerificationFailed {
                description: self.description.clone(),
                expected,
                actual,
            });
        }

        for index in self.earlier_steps.iter().copied().chain(self.matches.iter().map(|i| i.index)) {
            self.verified.insert(index);
        }
        Ok(())
    }

    /// Exactly zero.
    pub fn never(&self) -> Result<(), MockError> {
        self.times(Times::Never)
    }

    /// Exactly one.
    pub fn once(&self) -> Result<(), MockError> {
        self.times(Times::Once)
    }

    /// Exactly two.
    pub fn twice(&self) -> Result<(), MockError> {
        self.times(Times::Twice)
    }

    /// One or more.
    pub fn at_least_once(&self) -> Result<(), MockError> {
        self.times(Times::AtLeast(1))
    }

    /// Exactly `n`.
    pub fn exactly(&self, n: usize) -> Result<(), MockError> {
        self.times(Times::Exactly(n))
    }

    /// `n` or more.
    pub fn at_least(&self, n: usize) -> Result<(), MockError> {
        self.times(Times::AtLeast(n))
    }

    /// `n` or fewer.
    pub fn at_most(&self, n: usize) -> Result<(), MockError> {
        self.times(Times::AtMost(n))
    }

    /// Between `min` and `max`, inclusive.
    pub fn between(&self, min: usize, max: usize) -> Result<(), MockError> {
        self.times(Times::between(min, max)?)
    }
}
