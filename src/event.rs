//! Events reported while feeding progress bars.

use crate::{TaskId, TaskState};

/// An event reported by a [`ProgressBarController`](crate::ProgressBarController).
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum Event {
    /// The subscription frame was sent.
    Subscribed(SubscriptionEvent),
    /// A status record was rendered by its bar.
    Applied(RecordEvent),
    /// A pending status record was ignored by its bar.
    Ignored(RecordEvent),
    /// A status record named a task without a registered bar.
    UnknownTask(UnknownTaskEvent),
    /// An inbound frame was rejected as a whole.
    MalformedFrame(MalformedFrameEvent),
    /// The socket was closed.
    Closed(ClosedEvent),
}

/// A subscription event.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct SubscriptionEvent {
    /// The announced tasks, in registration order.
    pub task_ids: Vec<TaskId>,
}

/// A record event.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct RecordEvent {
    /// The task the record described.
    pub id: TaskId,
    /// The record's state.
    pub state: TaskState,
}

/// An unknown-task event.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct UnknownTaskEvent {
    /// The unregistered task.
    pub id: TaskId,
}

/// A malformed-frame event.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct MalformedFrameEvent {
    /// Why the frame was rejected.
    pub reason: String,
}

/// A socket-closed event.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct ClosedEvent {
    /// The close code sent by the peer, if any.
    ///
    /// `1006` if the connection dropped without a close handshake.
    pub code: Option<u16>,
    /// The close reason sent by the peer, if any.
    pub reason: String,
}
