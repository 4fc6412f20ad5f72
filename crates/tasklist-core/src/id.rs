use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;

/// Identifier of a task row.
///
/// Ids are assigned by the store on first insert. The value `0` is reserved
/// as the "not yet persisted" sentinel, see [`TaskId::UNASSIGNED`].
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub i64);

impl TaskId {
    /// Sentinel asking the store to allocate a fresh id.
    pub const UNASSIGNED: Self = Self(0);

    /// Whether this id still needs to be assigned by the store.
    #[must_use]
    pub const fn is_unassigned(self) -> bool {
        self.0 == Self::UNASSIGNED.0
    }

    /// Raw integer value.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl From<i64> for TaskId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Error returned when a string cannot be parsed into a [`TaskId`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid task ID: {0}")]
pub struct InvalidTaskId(pub String);

impl FromStr for TaskId {
    type Err = InvalidTaskId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: i64 = s
            .trim()
            .parse()
            .map_err(|_| InvalidTaskId(s.to_owned()))?;
        if value < 0 {
            return Err(InvalidTaskId(s.to_owned()));
        }
        Ok(Self(value))
    }
}
