//! A live socket session: one receive loop feeding one dispatcher.

use std::sync::Arc;

use futures_util::{Sink, SinkExt as _, Stream, StreamExt as _};
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_tungstenite::tungstenite::{
    error::ProtocolError, protocol::frame::coding::CloseCode, Error as WsError, Message,
};

use crate::{controller::Shared, event::ClosedEvent, DispatchStats, Error, Result};

/// What a session did, once its socket has closed.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct SessionSummary {
    /// How the socket was closed.
    pub closed: ClosedEvent,
    /// What dispatching the received frames did.
    pub stats: DispatchStats,
}

/// A running socket session.
///
/// The session ends when the peer closes the socket. It is never
/// reconnected.
pub struct Session {
    receiver: JoinHandle<Result<ClosedEvent>>,
    dispatcher: JoinHandle<DispatchStats>,
}

impl Session {
    /// Waits for the socket to close and every received frame to be dispatched.
    pub async fn join(self) -> Result<SessionSummary> {
        let received = self.receiver.await;

        // The dispatcher drains once the receiver has dropped its sender.
        let stats = self.dispatcher.await?;

        let closed = match received? {
            Ok(closed) => closed,
            Err(error) => {
                #[cfg(feature = "tracing")]
                tracing::error!(%error, "Socket failed.");

                return Err(error);
            }
        };

        Ok(SessionSummary { closed, stats })
    }
}

/// Sends the subscription frame over `socket` and spawns the session tasks.
pub(crate) async fn open<S>(socket: S, shared: Arc<Shared>, capacity: usize) -> Result<Session>
where
    S: Stream<Item = Result<Message, WsError>> + Sink<Message, Error = WsError>,
    S: Send + Unpin + 'static,
{
    let (mut sink, stream) = socket.split();

    let subscription = shared.subscription();

    sink.send(Message::Text(subscription.encode()))
        .await
        .map_err(|error| match error {
            WsError::ConnectionClosed | WsError::AlreadyClosed => Error::Closed,
            error => Error::Transport(error),
        })?;

    shared.subscribed(&subscription);

    let (frames, inbox) = mpsc::channel(capacity.max(1));

    let receiver = tokio::spawn(receive(stream, sink, frames, Arc::clone(&shared)));
    let dispatcher = tokio::spawn(dispatch(inbox, shared));

    Ok(Session {
        receiver,
        dispatcher,
    })
}

async fn receive<R, W>(
    mut stream: R,
    mut sink: W,
    frames: mpsc::Sender<Vec<u8>>,
    shared: Arc<Shared>,
) -> Result<ClosedEvent>
where
    R: Stream<Item = Result<Message, WsError>> + Unpin,
    W: Sink<Message, Error = WsError> + Unpin,
{
    let mut closed = ClosedEvent {
        code: None,
        reason: String::new(),
    };
    let mut failure = None;

    while let Some(message) = stream.next().await {
        let frame = match message {
            Ok(Message::Text(text)) => text.into_bytes(),
            Ok(Message::Binary(bytes)) => bytes,
            Ok(Message::Close(frame)) => {
                if let Some(frame) = frame {
                    closed.code = Some(u16::from(frame.code));
                    closed.reason = frame.reason.into_owned();
                }

                // Flushes the queued close reply, completing the handshake.
                let _ = sink.close().await;
                break;
            }
            Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => continue,
            Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => break,
            Err(WsError::Protocol(ProtocolError::ResetWithoutClosingHandshake)) => {
                closed.code = Some(u16::from(CloseCode::Abnormal));
                break;
            }
            Err(error) => {
                closed.code = Some(u16::from(CloseCode::Abnormal));
                closed.reason = error.to_string();
                failure = Some(error);
                break;
            }
        };

        if frames.send(frame).await.is_err() {
            break;
        }
    }

    shared.closed(closed.clone());

    match failure {
        Some(error) => Err(error.into()),
        None => Ok(closed),
    }
}

async fn dispatch(mut inbox: mpsc::Receiver<Vec<u8>>, shared: Arc<Shared>) -> DispatchStats {
    let mut stats = DispatchStats::default();

    while let Some(frame) = inbox.recv().await {
        match shared.dispatch(&frame) {
            Ok(frame_stats) => stats += frame_stats,
            Err(_) => stats.malformed += 1,
        }
    }

    stats
}
