#![warn(missing_docs)]

//! Progress bars fed by a socket stream of task status updates.

mod appearance;
mod bar;
mod config;
mod controller;
mod error;
mod event;
mod observer;
mod record;
mod session;
mod state;

pub use self::{
    appearance::Appearance,
    bar::{
        Applied, FillElement, FillState, MemoryFill, MemoryMessage, MessageElement, ProgressBar,
        ProgressBarOptions,
    },
    config::{
        Color, ControllerConfig, PageOrigin, Palette, DEFAULT_CHANNEL_CAPACITY,
        DEFAULT_ENDPOINT_PATH, DEFAULT_WAITING_MESSAGE,
    },
    controller::{DispatchStats, ProgressBarController},
    error::{Error, Result},
    event::{
        ClosedEvent, Event, MalformedFrameEvent, RecordEvent, SubscriptionEvent, UnknownTaskEvent,
    },
    observer::{NopObserver, Observer, StdMpscObserver, TokioMpscObserver},
    record::{StatusFrame, StatusRecord, SubscriptionFrame, TaskId},
    session::{Session, SessionSummary},
    state::TaskState,
};

#[cfg(any(test, feature = "test-utils"))]
pub use self::controller::test_utils;
