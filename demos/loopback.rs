use std::{sync::Arc, time::Duration};

use futures_util::{SinkExt as _, StreamExt as _};
use progress_feed::{
    Color, Event, FillElement, MessageElement, Observer, PageOrigin, ProgressBar,
    ProgressBarController, StatusFrame, StatusRecord, SubscriptionFrame,
};
use tokio::net::TcpListener;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing_subscriber::EnvFilter;

/// A fill printing every change to stdout.
struct PrintFill(&'static str);

impl FillElement for PrintFill {
    fn set_width_percent(&mut self, percent: f64) {
        let filled = (percent / 5.0).round().clamp(0.0, 20.0) as usize;
        println!("{:>8} [{:<20}] {percent:.0}%", self.0, "#".repeat(filled));
    }

    fn set_background_color(&mut self, color: &Color) {
        println!("{:>8} color {color}", self.0);
    }
}

/// A message printing every change to stdout.
struct PrintMessage(&'static str);

impl MessageElement for PrintMessage {
    fn set_text(&mut self, text: &str) {
        println!("{:>8} {text:?}", self.0);
    }
}

struct LogObserver;

impl Observer for LogObserver {
    fn observe(&self, event: Event) {
        if let Event::Closed(closed) = event {
            println!("Socket closed: {closed:?}");
        }
    }
}

/// Plays the server: answers the subscription with a snapshot of every
/// task's status, then pushes one update per tick.
async fn serve(listener: TcpListener) {
    let (stream, _) = listener.accept().await.unwrap();
    let mut socket = accept_async(stream).await.unwrap();

    let Some(Ok(Message::Text(text))) = socket.next().await else {
        return;
    };

    let subscription = SubscriptionFrame::parse(&text).unwrap();

    let snapshot: Vec<_> = subscription
        .task_ids
        .iter()
        .cloned()
        .map(StatusRecord::waiting)
        .collect();
    socket.send(Message::Text(StatusFrame::encode(&snapshot))).await.unwrap();

    for step in 1..=4 {
        tokio::time::sleep(Duration::from_millis(200)).await;

        let progress = f64::from(step) / 4.0;
        let records = [
            StatusRecord::new("scan", "PROGRESS", progress, format!("Scanned {step}/4")),
            StatusRecord::new("index", "PROGRESS", progress / 2.0, "Indexing"),
        ];
        socket.send(Message::Text(StatusFrame::encode(&records))).await.unwrap();
    }

    let records = [
        StatusRecord::succeeded("scan", "4 packs"),
        StatusRecord::failed("index", "database locked"),
    ];
    socket.send(Message::Text(StatusFrame::encode(&records))).await.unwrap();

    socket.close(None).await.unwrap();
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let origin = PageOrigin::new(listener.local_addr().unwrap().to_string(), false);

    let server = tokio::spawn(serve(listener));

    let controller = ProgressBarController::new("/ws/progress", &origin);
    controller.set_observer(Arc::new(LogObserver));

    for id in ["scan", "index"] {
        let options = controller.bar_options(PrintFill(id), PrintMessage(id));
        controller.register(id, ProgressBar::new(options));
    }

    let session = controller.start().await.unwrap();
    let summary = session.join().await.unwrap();

    server.await.unwrap();

    println!("{:?}", summary.stats);
}
