//! Routing of inbound status frames to registered progress bars.

use std::{collections::HashMap, ops::AddAssign, sync::Arc};

use futures_util::{Sink, Stream};
use parking_lot::{Mutex, RwLock};
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

use crate::{
    appearance::Appearance,
    bar::{Applied, FillElement, MessageElement, ProgressBar, ProgressBarOptions},
    config::{ControllerConfig, PageOrigin},
    event::{
        ClosedEvent, Event, MalformedFrameEvent, RecordEvent, SubscriptionEvent, UnknownTaskEvent,
    },
    observer::{NopObserver, Observer},
    record::{StatusFrame, SubscriptionFrame},
    session::{self, Session},
    Result, TaskId,
};

/// Counters of what dispatching frames did.
#[derive(Copy, Clone, Eq, PartialEq, Default, Debug)]
pub struct DispatchStats {
    /// Frames that were parsed and dispatched.
    pub frames: usize,
    /// Frames that were rejected as a whole.
    pub malformed: usize,
    /// Records rendered by their bar.
    pub applied: usize,
    /// Pending records ignored by their bar.
    pub ignored: usize,
    /// Records naming a task without a registered bar.
    pub unknown: usize,
}

impl AddAssign for DispatchStats {
    fn add_assign(&mut self, other: Self) {
        self.frames += other.frames;
        self.malformed += other.malformed;
        self.applied += other.applied;
        self.ignored += other.ignored;
        self.unknown += other.unknown;
    }
}

/// The task-to-bar registry.
///
/// Entries are never removed. Overwriting an entry keeps its
/// original position in the subscription order.
///
/// Each bar sits behind its own lock, so bars are updated
/// without holding the registry.
#[derive(Default)]
struct Registry {
    order: Vec<TaskId>,
    bars: HashMap<TaskId, Arc<Mutex<ProgressBar>>>,
}

impl Registry {
    fn insert(&mut self, task_id: TaskId, bar: ProgressBar) -> bool {
        let bar = Arc::new(Mutex::new(bar));
        let replaced = self.bars.insert(task_id.clone(), bar).is_some();

        if !replaced {
            self.order.push(task_id);
        }

        replaced
    }

    fn get(&self, task_id: &str) -> Option<Arc<Mutex<ProgressBar>>> {
        self.bars.get(task_id).cloned()
    }
}

/// State shared between a controller and its session tasks.
pub(crate) struct Shared {
    registry: Mutex<Registry>,
    observer: RwLock<Arc<dyn Observer>>,
}

impl Shared {
    fn new() -> Self {
        Self {
            registry: Mutex::default(),
            observer: RwLock::new(Arc::new(NopObserver)),
        }
    }

    fn emit(&self, event: Event) {
        let observer = self.observer.read().clone();
        observer.observe(event);
    }

    pub(crate) fn subscription(&self) -> SubscriptionFrame {
        self.registry.lock().order.iter().cloned().collect()
    }

    pub(crate) fn subscribed(&self, frame: &SubscriptionFrame) {
        #[cfg(feature = "tracing")]
        tracing::debug!(tasks = frame.task_ids.len(), "Sent subscription frame.");

        self.emit(Event::Subscribed(SubscriptionEvent {
            task_ids: frame.task_ids.clone(),
        }));
    }

    pub(crate) fn closed(&self, event: ClosedEvent) {
        #[cfg(feature = "tracing")]
        tracing::error!(
            code = ?event.code,
            reason = %event.reason,
            "Socket closed unexpectedly."
        );

        self.emit(Event::Closed(event));
    }

    pub(crate) fn dispatch(&self, frame: &[u8]) -> Result<DispatchStats> {
        let records = match StatusFrame::parse_slice(frame) {
            Ok(records) => records,
            Err(error) => {
                #[cfg(feature = "tracing")]
                tracing::error!(%error, "Rejected status frame.");

                self.emit(Event::MalformedFrame(MalformedFrameEvent {
                    reason: error.to_string(),
                }));

                return Err(error);
            }
        };

        let mut stats = DispatchStats {
            frames: 1,
            ..DispatchStats::default()
        };

        // Bars are resolved up front; elements and observers then run
        // without the registry locked and may call back into the controller.
        let resolved: Vec<_> = {
            let registry = self.registry.lock();

            records
                .into_iter()
                .map(|record| {
                    let bar = registry.get(record.id.as_str());
                    (record, bar)
                })
                .collect()
        };

        for (record, bar) in resolved {
            let Some(bar) = bar else {
                #[cfg(feature = "tracing")]
                tracing::error!(task = %record.id, "No progress bar registered for task.");

                stats.unknown += 1;
                self.emit(Event::UnknownTask(UnknownTaskEvent { id: record.id }));
                continue;
            };

            let applied = bar.lock().update(&record);

            let event = RecordEvent {
                id: record.id,
                state: record.state,
            };

            match applied {
                Applied::Rendered => {
                    stats.applied += 1;
                    self.emit(Event::Applied(event));
                }
                Applied::Ignored => {
                    stats.ignored += 1;
                    self.emit(Event::Ignored(event));
                }
            }
        }

        Ok(stats)
    }
}

/// Owns the socket connection of a page and routes inbound
/// status frames to the progress bars registered with it.
pub struct ProgressBarController {
    url: String,
    config: ControllerConfig,
    shared: Arc<Shared>,
}

impl ProgressBarController {
    /// Creates a controller for the socket endpoint at `endpoint_path`
    /// on the host of `origin`, with an otherwise default configuration.
    ///
    /// No connection is opened until [`start`](Self::start) is called.
    pub fn new(endpoint_path: impl Into<String>, origin: &PageOrigin) -> Self {
        let config = ControllerConfig {
            endpoint_path: endpoint_path.into(),
            ..ControllerConfig::default()
        };

        Self::with_config(config, origin)
    }

    /// Creates a controller from `config` for the host of `origin`.
    pub fn with_config(config: ControllerConfig, origin: &PageOrigin) -> Self {
        let url = origin.socket_url(&config.endpoint_path);

        Self {
            url,
            config,
            shared: Arc::new(Shared::new()),
        }
    }

    /// Returns the socket URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the controller's configuration.
    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Replaces the observer receiving the controller's events,
    /// returning the previous one.
    pub fn set_observer(&self, observer: Arc<dyn Observer>) -> Arc<dyn Observer> {
        std::mem::replace(&mut *self.shared.observer.write(), observer)
    }

    /// Returns bar options for the given elements using the controller's
    /// palette, placeholder and clamping.
    pub fn bar_options(
        &self,
        fill: impl FillElement + 'static,
        message: impl MessageElement + 'static,
    ) -> ProgressBarOptions {
        ProgressBarOptions::new(fill, message).config(&self.config)
    }

    /// Registers `bar` for `task_id`, returning `true` if it replaced a bar.
    ///
    /// Bars registered after the subscription frame was sent are not
    /// announced to the peer.
    pub fn register(&self, task_id: impl Into<TaskId>, bar: ProgressBar) -> bool {
        self.shared.registry.lock().insert(task_id.into(), bar)
    }

    /// Returns the registered tasks, in registration order.
    pub fn task_ids(&self) -> Vec<TaskId> {
        self.shared.registry.lock().order.clone()
    }

    /// Returns the appearance of the bar registered for `task_id`.
    pub fn appearance(&self, task_id: &str) -> Option<Appearance> {
        let bar = self.shared.registry.lock().get(task_id)?;
        let appearance = bar.lock().appearance().clone();
        Some(appearance)
    }

    /// Returns the subscription frame announcing all registered tasks.
    pub fn subscription(&self) -> SubscriptionFrame {
        self.shared.subscription()
    }

    /// Dispatches an inbound frame to the registered bars, in record order.
    ///
    /// A frame that is not a JSON array of status records is rejected as a
    /// whole, leaving every bar untouched. Records for unregistered tasks
    /// are reported and skipped; the remaining records are still applied.
    pub fn dispatch(&self, frame: impl AsRef<[u8]>) -> Result<DispatchStats> {
        self.shared.dispatch(frame.as_ref())
    }

    /// Opens the socket connection and subscribes to the registered tasks.
    pub async fn start(&self) -> Result<Session> {
        #[cfg(feature = "tracing")]
        tracing::debug!(url = %self.url, "Connecting.");

        let (socket, _response) = tokio_tungstenite::connect_async(self.url.as_str()).await?;

        self.attach(socket).await
    }

    /// Subscribes to the registered tasks over an already open `socket`.
    pub async fn attach<S>(&self, socket: S) -> Result<Session>
    where
        S: Stream<Item = Result<Message, WsError>> + Sink<Message, Error = WsError>,
        S: Send + Unpin + 'static,
    {
        session::open(socket, Arc::clone(&self.shared), self.config.channel_capacity).await
    }
}

#[doc(hidden)]
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils {
    use super::*;
    use crate::{
        bar::{MemoryFill, MemoryMessage},
        StatusRecord,
    };

    #[doc(hidden)]
    pub fn make_controller(tasks: usize) -> (ProgressBarController, Vec<TaskId>) {
        let origin = PageOrigin::new("localhost", false);
        let controller = ProgressBarController::new(crate::DEFAULT_ENDPOINT_PATH, &origin);

        let task_ids: Vec<_> = (0..tasks).map(|i| TaskId::from(format!("task-{i}"))).collect();

        for task_id in &task_ids {
            let options = controller.bar_options(MemoryFill::new(), MemoryMessage::new());
            controller.register(task_id.clone(), ProgressBar::new(options));
        }

        (controller, task_ids)
    }

    #[doc(hidden)]
    pub fn make_frame(task_ids: &[TaskId], state: &str, progress: f64) -> String {
        let records: Vec<_> = task_ids
            .iter()
            .map(|id| StatusRecord::new(id.clone(), state, progress, "Working"))
            .collect();

        StatusFrame::encode(&records)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{mpsc, Weak};

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        bar::{MemoryFill, MemoryMessage},
        observer::StdMpscObserver,
        Error, Palette, TaskState,
    };

    fn controller() -> ProgressBarController {
        ProgressBarController::new("/ws/progress", &PageOrigin::new("example.com", false))
    }

    fn register(controller: &ProgressBarController, id: &str) -> (MemoryFill, MemoryMessage) {
        let fill = MemoryFill::new();
        let message = MemoryMessage::new();

        let bar = ProgressBar::new(controller.bar_options(fill.clone(), message.clone()));
        controller.register(id, bar);

        (fill, message)
    }

    #[test]
    fn derives_socket_url() {
        let controller =
            ProgressBarController::new("/ws/progress", &PageOrigin::new("example.com", true));

        assert_eq!(controller.url(), "wss://example.com/ws/progress");
        assert!(controller.task_ids().is_empty());
    }

    #[test]
    fn subscription_follows_registration_order() {
        let controller = controller();

        for id in ["task-7", "task-1", "task-3"] {
            register(&controller, id);
        }

        assert_eq!(controller.subscription().encode(), r#"["task-7","task-1","task-3"]"#);
    }

    #[test]
    fn overwriting_keeps_position() {
        let controller = controller();

        register(&controller, "a");
        register(&controller, "b");
        let (fill, message) = register(&controller, "a");

        assert_eq!(controller.task_ids(), vec![TaskId::from("a"), TaskId::from("b")]);

        controller
            .dispatch(r#"[{"id":"a","state":"SUCCESS","progress":1.0,"message":"Done"}]"#)
            .unwrap();

        assert_eq!(fill.width_percent(), Some(100.0));
        assert_eq!(message.text().as_deref(), Some("Done"));
    }

    #[test]
    fn dispatches_in_record_order() {
        let controller = controller();
        let (fill, message) = register(&controller, "a");

        let stats = controller
            .dispatch(
                r#"[{"id":"a","state":"PROGRESS","progress":0.25,"message":"First"},
                    {"id":"a","state":"PROGRESS","progress":0.75,"message":"Second"}]"#,
            )
            .unwrap();

        assert_eq!(stats.applied, 2);
        assert_eq!(fill.width_percent(), Some(75.0));
        assert_eq!(message.text().as_deref(), Some("Second"));
    }

    #[test]
    fn unknown_task_is_skipped() {
        let controller = controller();
        let (sender, receiver) = mpsc::channel();
        controller.set_observer(Arc::new(StdMpscObserver::from(sender)));

        let (fill, _) = register(&controller, "a");

        let stats = controller
            .dispatch(
                r#"[{"id":"ghost","state":"SUCCESS","progress":1.0,"message":"Boo"},
                    {"id":"a","state":"SUCCESS","progress":1.0,"message":"Done"}]"#,
            )
            .unwrap();

        assert_eq!(
            stats,
            DispatchStats {
                frames: 1,
                applied: 1,
                unknown: 1,
                ..DispatchStats::default()
            }
        );
        assert_eq!(fill.width_percent(), Some(100.0));

        let events: Vec<_> = receiver.try_iter().collect();
        assert_eq!(
            events,
            vec![
                Event::UnknownTask(UnknownTaskEvent {
                    id: TaskId::from("ghost")
                }),
                Event::Applied(RecordEvent {
                    id: TaskId::from("a"),
                    state: TaskState::Success
                }),
            ]
        );
    }

    #[test]
    fn malformed_frame_touches_nothing() {
        let controller = controller();
        let (sender, receiver) = mpsc::channel();
        controller.set_observer(Arc::new(StdMpscObserver::from(sender)));

        let (fill, message) = register(&controller, "a");
        let before = fill.state();

        // The second record lacks its message.
        let result = controller.dispatch(
            r#"[{"id":"a","state":"SUCCESS","progress":1.0,"message":"Done"},
                {"id":"a","state":"FAILURE","progress":1.0}]"#,
        );

        assert!(matches!(result, Err(Error::MalformedFrame(_))));
        assert_eq!(fill.state(), before);
        assert_eq!(message.text().as_deref(), Some("Waiting..."));
        assert!(matches!(
            receiver.try_recv(),
            Ok(Event::MalformedFrame(_))
        ));
    }

    #[test]
    fn pending_records_are_counted_as_ignored() {
        let controller = controller();
        register(&controller, "a");

        let stats = controller
            .dispatch(r#"[{"id":"a","state":"PENDING","progress":0,"message":"Waiting..."}]"#)
            .unwrap();

        assert_eq!(stats.ignored, 1);
        assert_eq!(stats.applied, 0);
    }

    #[test]
    fn observer_may_register_while_dispatching() {
        struct Registering(Arc<ProgressBarController>);

        impl Observer for Registering {
            fn observe(&self, event: Event) {
                if let Event::UnknownTask(UnknownTaskEvent { id }) = event {
                    let options = self.0.bar_options(MemoryFill::new(), MemoryMessage::new());
                    self.0.register(id, ProgressBar::new(options));
                }
            }
        }

        let controller = Arc::new(controller());
        controller.set_observer(Arc::new(Registering(Arc::clone(&controller))));

        controller
            .dispatch(r#"[{"id":"late","state":"PROGRESS","progress":0.5,"message":"x"}]"#)
            .unwrap();

        assert_eq!(controller.task_ids(), vec![TaskId::from("late")]);

        // Break the reference cycle.
        controller.set_observer(Arc::new(NopObserver));
    }

    #[test]
    fn every_bar_in_a_frame_is_updated() {
        let (controller, task_ids) = test_utils::make_controller(50);

        let stats = controller
            .dispatch(test_utils::make_frame(&task_ids, "SUCCESS", 1.0))
            .unwrap();

        assert_eq!(stats.applied, 50);

        for task_id in &task_ids {
            let appearance = controller.appearance(task_id.as_str()).unwrap();

            assert_eq!(appearance.color, Palette::default().success);
            assert_eq!(appearance.width_percent, 100.0);
        }
    }

    #[test]
    fn elements_may_call_back_into_the_controller() {
        struct Spawning {
            controller: Weak<ProgressBarController>,
            seen: Arc<Mutex<Option<Appearance>>>,
        }

        impl MessageElement for Spawning {
            fn set_text(&mut self, text: &str) {
                if text != "Spawn" {
                    return;
                }

                let Some(controller) = self.controller.upgrade() else {
                    return;
                };

                *self.seen.lock() = controller.appearance("b");

                let options = controller.bar_options(MemoryFill::new(), MemoryMessage::new());
                controller.register("spawned", ProgressBar::new(options));
            }
        }

        let controller = Arc::new(controller());
        let seen = Arc::new(Mutex::new(None));

        let element = Spawning {
            controller: Arc::downgrade(&controller),
            seen: Arc::clone(&seen),
        };
        let options = controller.bar_options(MemoryFill::new(), element);
        controller.register("a", ProgressBar::new(options));
        register(&controller, "b");

        let stats = controller
            .dispatch(r#"[{"id":"a","state":"PROGRESS","progress":0.5,"message":"Spawn"}]"#)
            .unwrap();

        assert_eq!(stats.applied, 1);
        assert_eq!(
            controller.task_ids(),
            vec![TaskId::from("a"), TaskId::from("b"), TaskId::from("spawned")]
        );
        assert_eq!(
            seen.lock().as_ref().map(|appearance| appearance.message.clone()),
            Some("Waiting...".to_owned())
        );
        assert_eq!(controller.appearance("a").unwrap().message, "Spawn");
    }

    #[test]
    fn re_registering_reports_replacement() {
        let controller = controller();
        let options = || controller.bar_options(MemoryFill::new(), MemoryMessage::new());

        assert!(!controller.register("a", ProgressBar::new(options())));
        assert!(controller.register("a", ProgressBar::new(options())));
    }

    #[test]
    fn stats_accumulate() {
        let mut total = DispatchStats::default();

        total += DispatchStats {
            frames: 1,
            applied: 2,
            ..DispatchStats::default()
        };
        total += DispatchStats {
            malformed: 1,
            unknown: 3,
            ..DispatchStats::default()
        };

        assert_eq!(
            total,
            DispatchStats {
                frames: 1,
                malformed: 1,
                applied: 2,
                ignored: 0,
                unknown: 3,
            }
        );
    }
}
