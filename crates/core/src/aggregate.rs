//! Aggregate root trait and optimistic concurrency expectations.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Aggregate root marker + minimal interface.
///
/// The version is what optimistic concurrency checks compare: it changes on every
/// persisted mutation of the aggregate.
pub trait AggregateRoot {
    /// Strongly-typed aggregate identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the aggregate identifier.
    fn id(&self) -> &Self::Id;

    /// Monotonically increasing version of the aggregate's state.
    fn version(&self) -> u64;
}

/// Optimistic concurrency expectation for an aggregate.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExpectedVersion {
    /// Skip version checking.
    Any,
    /// Require the aggregate to be at an exact version.
    Exact(u64),
}

/// A stored aggregate moved on since it was read.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("optimistic concurrency check failed (expected: {expected:?}, actual: {actual})")]
pub struct VersionConflict {
    pub expected: ExpectedVersion,
    pub actual: u64,
}

impl ExpectedVersion {
    pub fn matches(self, actual: u64) -> bool {
        match self {
            ExpectedVersion::Any => true,
            ExpectedVersion::Exact(v) => v == actual,
        }
    }

    pub fn check(self, actual: u64) -> Result<(), VersionConflict> {
        if self.matches(actual) {
            Ok(())
        } else {
            Err(VersionConflict {
                expected: self,
                actual,
            })
        }
    }

    /// Expect whatever version the aggregate had when it was read.
    pub fn of<A: AggregateRoot>(aggregate: &A) -> Self {
        ExpectedVersion::Exact(aggregate.version())
    }
}
