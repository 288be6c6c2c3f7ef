use std::sync::mpsc;

use tokio::sync::mpsc as tokio_mpsc;

use crate::Event;

/// Types for observing events of a progress feed.
pub trait Observer: Send + Sync {
    /// Observes an event emitted by a progress feed.
    fn observe(&self, event: Event);
}

/// Implementation of `Observer` that ignores all events.
#[derive(Copy, Clone, Default, Debug)]
pub struct NopObserver;

impl Observer for NopObserver {
    fn observe(&self, _event: Event) {}
}

/// Implementation of `Observer` based on `std::sync::mpsc::Sender`.
#[derive(Clone, Debug)]
pub struct StdMpscObserver {
    /// The sending-half of std's channel type.
    pub sender: mpsc::Sender<Event>,
}

impl From<mpsc::Sender<Event>> for StdMpscObserver {
    fn from(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }
}

impl From<StdMpscObserver> for mpsc::Sender<Event> {
    fn from(observer: StdMpscObserver) -> Self {
        observer.sender
    }
}

impl Observer for StdMpscObserver {
    fn observe(&self, event: Event) {
        let _ = self.sender.send(event);
    }
}

/// Implementation of `Observer` based on `tokio::sync::mpsc::UnboundedSender`.
#[derive(Clone, Debug)]
pub struct TokioMpscObserver {
    /// The sending-half of tokio's unbounded channel type.
    pub sender: tokio_mpsc::UnboundedSender<Event>,
}

impl From<tokio_mpsc::UnboundedSender<Event>> for TokioMpscObserver {
    fn from(sender: tokio_mpsc::UnboundedSender<Event>) -> Self {
        Self { sender }
    }
}

impl From<TokioMpscObserver> for tokio_mpsc::UnboundedSender<Event> {
    fn from(observer: TokioMpscObserver) -> Self {
        observer.sender
    }
}

impl Observer for TokioMpscObserver {
    fn observe(&self, event: Event) {
        let _ = self.sender.send(event);
    }
}
