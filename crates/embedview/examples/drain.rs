//! Create a web view, kick off a navigation and print whatever the
//! backend delivers. With no backend feature enabled this exercises the
//! null fallback and prints nothing.
//!
//! Run with `RUST_LOG=embedview=debug` to watch the factory decide.

use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut view = embedview::create_web_view();
    println!("native handle: {:?}", view.native_window());

    view.set_url("https://example.com");

    for _ in 0..10 {
        for event in view.drain_events() {
            println!("{event:?}");
        }
        if !view.is_loading() {
            break;
        }
        std::thread::sleep(std::time::Duration::from_millis(200));
    }

    println!(
        "url={} title={:?} progress={}",
        view.url(),
        view.title(),
        view.load_progress()
    );
}
