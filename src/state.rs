//! A task's reported state.

use std::{convert::Infallible, fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

const PENDING: &str = "PENDING";
const SUCCESS: &str = "SUCCESS";
const FAILURE: &str = "FAILURE";

/// The state of a task, as reported by the peer.
///
/// Only `PENDING`, `SUCCESS` and `FAILURE` carry meaning for rendering.
/// Any other label (e.g. `STARTED`, `PROGRESS`, `RETRY`) is a running task
/// and is kept verbatim.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum TaskState {
    /// The task has not reported anything yet.
    Pending,
    /// The task has finished successfully.
    Success,
    /// The task has failed.
    Failure,
    /// The task is in some other, in-flight state.
    Running(String),
}

impl TaskState {
    /// Returns the wire label of the state.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => PENDING,
            Self::Success => SUCCESS,
            Self::Failure => FAILURE,
            Self::Running(label) => label,
        }
    }

    /// Returns `true` if `self` is `Self::Pending`, otherwise `false`.
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Returns `true` if `self` is `Self::Success` or `Self::Failure`.
    ///
    /// Nothing prevents a later record from moving a bar out of a
    /// terminal state; this is informational only.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failure)
    }
}

impl FromStr for TaskState {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

impl From<&str> for TaskState {
    fn from(label: &str) -> Self {
        match label {
            PENDING => Self::Pending,
            SUCCESS => Self::Success,
            FAILURE => Self::Failure,
            other => Self::Running(other.to_owned()),
        }
    }
}

impl From<String> for TaskState {
    fn from(label: String) -> Self {
        match label.as_str() {
            PENDING => Self::Pending,
            SUCCESS => Self::Success,
            FAILURE => Self::Failure,
            _ => Self::Running(label),
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for TaskState {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TaskState {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(Self::from)
    }
}
