//! Wire records exchanged with the peer.

use std::{borrow::Borrow, fmt};

use serde::{Deserialize, Serialize};

use crate::{Error, Result, TaskState};

/// A task's opaque identifier.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TaskId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for TaskId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Borrow<str> for TaskId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One task's current status, as delivered by the peer.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct StatusRecord {
    /// The task this record describes.
    pub id: TaskId,
    /// The task's state.
    pub state: TaskState,
    /// Fractional progress, nominally within `0.0..=1.0`.
    pub progress: f64,
    /// A human-readable message.
    pub message: String,
}

impl StatusRecord {
    /// Creates a record.
    pub fn new(
        id: impl Into<TaskId>,
        state: impl Into<TaskState>,
        progress: f64,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            state: state.into(),
            progress,
            message: message.into(),
        }
    }

    /// A record for a task the peer knows nothing about yet.
    pub fn waiting(id: impl Into<TaskId>) -> Self {
        Self::new(id, TaskState::Pending, 0.0, "Waiting...")
    }

    /// A record for a task that finished with result `info`.
    pub fn succeeded(id: impl Into<TaskId>, info: impl fmt::Display) -> Self {
        Self::new(id, TaskState::Success, 1.0, format!("Success! {info}"))
    }

    /// A record for a task that failed with `info`.
    pub fn failed(id: impl Into<TaskId>, info: impl fmt::Display) -> Self {
        Self::new(id, TaskState::Failure, 1.0, format!("Failure: {info}"))
    }
}

/// An inbound frame: an ordered array of status records.
pub struct StatusFrame;

impl StatusFrame {
    /// Parses an inbound frame.
    ///
    /// Fails if `payload` is not a JSON array of well-formed records,
    /// in which case none of its records must be applied.
    pub fn parse(payload: &str) -> Result<Vec<StatusRecord>> {
        serde_json::from_str(payload).map_err(Error::MalformedFrame)
    }

    /// Parses an inbound frame from raw bytes, which must be UTF-8 JSON.
    pub fn parse_slice(payload: &[u8]) -> Result<Vec<StatusRecord>> {
        serde_json::from_slice(payload).map_err(Error::MalformedFrame)
    }

    /// Encodes `records` as an inbound frame.
    pub fn encode(records: &[StatusRecord]) -> String {
        // Strings and floats always serialize; non-finite floats become `null`.
        serde_json::to_string(records).expect("status records serialize to JSON")
    }
}

/// The single outbound frame, announcing the tasks to receive updates for.
#[derive(Clone, Eq, PartialEq, Default, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionFrame {
    /// The announced tasks, in registration order.
    pub task_ids: Vec<TaskId>,
}

impl SubscriptionFrame {
    /// Encodes the frame as a JSON array of strings.
    pub fn encode(&self) -> String {
        serde_json::to_string(&self.task_ids).expect("task ids serialize to JSON")
    }

    /// Decodes a frame previously produced by [`encode`](Self::encode).
    pub fn parse(payload: &str) -> Result<Self> {
        serde_json::from_str(payload).map_err(Error::MalformedFrame)
    }
}

impl FromIterator<TaskId> for SubscriptionFrame {
    fn from_iter<I: IntoIterator<Item = TaskId>>(iter: I) -> Self {
        Self {
            task_ids: iter.into_iter().collect(),
        }
    }
}
