use progress_feed::{
    MemoryFill, MemoryMessage, PageOrigin, ProgressBar, ProgressBarController, StatusFrame,
    StatusRecord,
};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let origin: PageOrigin = "https://example.com/admin/".parse().unwrap();
    let controller = ProgressBarController::new("/ws/progress", &origin);

    println!("Would connect to {}", controller.url());

    let bars: Vec<_> = ["upload", "analyze"]
        .into_iter()
        .map(|id| {
            let fill = MemoryFill::new();
            let message = MemoryMessage::new();

            let options = controller.bar_options(fill.clone(), message.clone());
            controller.register(id, ProgressBar::new(options));

            (id, fill, message)
        })
        .collect();

    println!("Subscription frame: {}", controller.subscription().encode());

    // Frames as the peer would push them:
    let frames = [
        StatusFrame::encode(&[
            StatusRecord::new("upload", "PROGRESS", 0.4, "Uploading pack.zip"),
            StatusRecord::waiting("analyze"),
        ]),
        StatusFrame::encode(&[StatusRecord::succeeded("upload", "pack.zip")]),
        StatusFrame::encode(&[StatusRecord::new("analyze", "PROGRESS", 0.7, "Analyzing charts")]),
        StatusFrame::encode(&[StatusRecord::failed("analyze", "unreadable chart")]),
        StatusFrame::encode(&[StatusRecord::new("unknown", "PROGRESS", 0.1, "Not ours")]),
    ];

    for frame in frames {
        let stats = controller.dispatch(&frame).unwrap();
        println!("Dispatched {frame}: {stats:?}");

        for (id, fill, message) in &bars {
            let state = fill.state();

            println!(
                "  {id:>8} [{width:>5.1}%] {color} {text:?}",
                width = state.width_percent.unwrap_or_default(),
                color = state.color.map(|color| color.to_string()).unwrap_or_default(),
                text = message.text().unwrap_or_default(),
            );
        }
    }
}
