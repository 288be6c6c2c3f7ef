//! Error types for progress feeds.

use tokio_tungstenite::tungstenite;

use crate::TaskId;

/// Convenience alias for results carrying [`Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Error type for everything that can go wrong while feeding progress bars.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A color literal is not a CSS hex color (`#rgb` or `#rrggbb`).
    #[error("invalid color {0:?}: expected `#rgb` or `#rrggbb`")]
    InvalidColor(String),

    /// A page origin could not be parsed.
    #[error("invalid page origin {origin:?}: {reason}")]
    InvalidOrigin {
        /// The offending input.
        origin: String,
        /// What is wrong with it.
        reason: &'static str,
    },

    /// An inbound frame is not a JSON array of status records.
    #[error("malformed status frame: {0}")]
    MalformedFrame(#[source] serde_json::Error),

    /// A status record names a task that was never registered.
    #[error("no progress bar registered for task {0}")]
    UnknownTask(TaskId),

    /// A configuration document could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    /// The socket connection failed.
    #[error("socket transport error: {0}")]
    Transport(#[from] tungstenite::Error),

    /// The socket was closed before the subscription frame could be sent.
    #[error("socket closed before subscribing")]
    Closed,

    /// A session task panicked or was aborted.
    #[error("session task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_task_names_the_id() {
        let error = Error::UnknownTask(TaskId::from("task-7"));

        assert_eq!(
            error.to_string(),
            "no progress bar registered for task task-7"
        );
    }

    #[test]
    fn malformed_frame_keeps_its_source() {
        let source = serde_json::from_str::<Vec<u8>>("{").unwrap_err();
        let error = Error::MalformedFrame(source);

        assert!(std::error::Error::source(&error).is_some());
    }
}
