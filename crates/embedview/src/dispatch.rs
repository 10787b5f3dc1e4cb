//! Queued cross-thread event delivery.
//!
//! Native engine callbacks may run on a toolkit-internal thread. They never
//! touch WebView state directly; they push canonical events into an
//! `EventSink`, and the owning thread drains the queue via
//! [`WebView::drain_events`](crate::WebView::drain_events). Closing the sink
//! at the start of teardown guarantees no event is delivered into a
//! partially-destroyed adapter.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use crate::events::WebViewEvent;
use crate::state::LoadTracker;

#[derive(Default)]
struct SinkInner {
    queue: VecDeque<WebViewEvent>,
    tracker: LoadTracker,
    closed: bool,
}

/// Shared event queue between native callbacks and the owning thread.
///
/// Clones share the same queue; backends hand clones to each native
/// callback they register.
#[derive(Clone, Default)]
pub(crate) struct EventSink {
    inner: Arc<Mutex<SinkInner>>,
}

impl EventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Native engine reported the start of a navigation.
    pub fn load_started(&self, url: &str) {
        let Ok(mut inner) = self.inner.lock() else {
            return;
        };
        if inner.closed {
            return;
        }
        let events = inner.tracker.begin(url);
        for event in events {
            inner.queue.push_back(WebViewEvent::Load(event));
        }
    }

    /// Native engine finished the navigation without error.
    pub fn load_finished(&self, url: Option<&str>) {
        let Ok(mut inner) = self.inner.lock() else {
            return;
        };
        if inner.closed {
            return;
        }
        if let Some(event) = inner.tracker.succeed(url) {
            inner.queue.push_back(WebViewEvent::Load(event));
        }
    }

    /// Native engine reported a navigation failure.
    pub fn load_failed(&self, url: Option<&str>, message: &str) {
        let Ok(mut inner) = self.inner.lock() else {
            return;
        };
        if inner.closed {
            return;
        }
        if let Some(event) = inner.tracker.fail(url, message) {
            inner.queue.push_back(WebViewEvent::Load(event));
        }
    }

    /// The host asked for the navigation in flight to be interrupted. The
    /// terminal event still comes from the native engine's callback.
    pub fn request_stop(&self) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.tracker.request_stop();
        }
    }

    /// Progress estimate as a fraction in `0.0..=1.0`.
    pub fn progress_changed(&self, fraction: f64) {
        let Ok(mut inner) = self.inner.lock() else {
            return;
        };
        if inner.closed {
            return;
        }
        let percent = (fraction.clamp(0.0, 1.0) * 100.0).round() as u8;
        if let Some(percent) = inner.tracker.progress(percent) {
            inner.queue.push_back(WebViewEvent::ProgressChanged(percent));
        }
    }

    pub fn title_changed(&self, title: &str) {
        self.push(WebViewEvent::TitleChanged(title.to_string()));
    }

    pub fn url_changed(&self, url: &str) {
        self.push(WebViewEvent::UrlChanged(url.to_string()));
    }

    pub fn history_changed(&self, can_go_back: bool, can_go_forward: bool) {
        self.push(WebViewEvent::HistoryChanged {
            can_go_back,
            can_go_forward,
        });
    }

    pub fn script_result(&self, callback_id: u64, result: Result<String, String>) {
        self.push(WebViewEvent::ScriptResult {
            callback_id,
            result,
        });
    }

    /// Whether the cached load state says an episode is in flight.
    pub fn is_loading(&self) -> bool {
        self.inner
            .lock()
            .map(|inner| inner.tracker.is_loading())
            .unwrap_or(false)
    }

    /// Drain all pending events, in push order. Owning thread only.
    pub fn drain(&self) -> Vec<WebViewEvent> {
        match self.inner.lock() {
            Ok(mut inner) => inner.queue.drain(..).collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Stop accepting events. First step of adapter teardown; events pushed
    /// by late native callbacks are discarded, and anything still queued is
    /// dropped so nothing is delivered after destruction begins.
    pub fn close(&self) {
        let Ok(mut inner) = self.inner.lock() else {
            return;
        };
        if inner.closed {
            return;
        }
        inner.closed = true;
        if !inner.queue.is_empty() {
            debug!(
                pending = inner.queue.len(),
                "event sink closed with undelivered events"
            );
            inner.queue.clear();
        }
    }

    fn push(&self, event: WebViewEvent) {
        let Ok(mut inner) = self.inner.lock() else {
            warn!("event sink lock poisoned; dropping event");
            return;
        };
        if inner.closed {
            return;
        }
        inner.queue.push_back(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{LoadStatus, WebViewEvent};

    fn load_statuses(events: &[WebViewEvent]) -> Vec<LoadStatus> {
        events
            .iter()
            .filter_map(|e| match e {
                WebViewEvent::Load(load) => Some(load.status),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn successful_episode_in_order() {
        let sink = EventSink::new();
        sink.load_started("https://example.test");
        sink.progress_changed(0.3);
        sink.progress_changed(0.9);
        sink.load_finished(None);

        let events = sink.drain();
        assert_eq!(
            load_statuses(&events),
            vec![LoadStatus::Started, LoadStatus::Succeeded]
        );
        assert_eq!(
            events[1],
            WebViewEvent::ProgressChanged(30),
            "progress delivered between started and terminal"
        );
    }

    #[test]
    fn failed_episode_carries_message() {
        let sink = EventSink::new();
        sink.load_started("https://bad.test");
        sink.load_failed(None, "host not found");
        // WebKit-style trailing finished must not produce a second terminal.
        sink.load_finished(None);

        let events = sink.drain();
        let statuses = load_statuses(&events);
        assert_eq!(statuses, vec![LoadStatus::Started, LoadStatus::Failed]);
        if let WebViewEvent::Load(load) = &events[1] {
            assert_eq!(load.error, "host not found");
        }
    }

    #[test]
    fn stop_request_turns_cancellation_into_stopped() {
        let sink = EventSink::new();
        sink.load_started("https://slow.test");
        sink.request_stop();
        sink.load_failed(None, "Load request cancelled");

        let statuses = load_statuses(&sink.drain());
        assert_eq!(statuses, vec![LoadStatus::Started, LoadStatus::Stopped]);
    }

    #[test]
    fn full_progress_does_not_survive_failure() {
        let sink = EventSink::new();
        sink.load_started("https://bad.test");
        sink.progress_changed(1.0);
        sink.load_failed(None, "connection reset");

        let mut snap = crate::state::StateSnapshot::default();
        for event in sink.drain() {
            snap.apply(&event);
        }
        assert!(!snap.loading);
        assert_eq!(snap.progress, 0, "100 is reserved for Succeeded");
    }

    #[test]
    fn drain_empties_queue() {
        let sink = EventSink::new();
        sink.title_changed("One");
        assert_eq!(sink.drain().len(), 1);
        assert!(sink.drain().is_empty());
    }

    #[test]
    fn closed_sink_delivers_nothing() {
        let sink = EventSink::new();
        sink.load_started("https://example.test");
        sink.close();
        // Late native callbacks after teardown began.
        sink.load_finished(None);
        sink.title_changed("too late");
        sink.progress_changed(1.0);
        assert!(sink.drain().is_empty());
    }

    #[test]
    fn clones_share_one_queue() {
        let sink = EventSink::new();
        let native_side = sink.clone();
        std::thread::spawn(move || {
            native_side.load_started("https://example.test");
            native_side.load_finished(None);
        })
        .join()
        .unwrap();

        assert_eq!(
            load_statuses(&sink.drain()),
            vec![LoadStatus::Started, LoadStatus::Succeeded]
        );
    }

    #[test]
    fn script_results_tagged_with_callback_id() {
        let sink = EventSink::new();
        sink.script_result(7, Ok("42".into()));
        sink.script_result(9, Err("ReferenceError".into()));

        let events = sink.drain();
        assert_eq!(
            events[0],
            WebViewEvent::ScriptResult {
                callback_id: 7,
                result: Ok("42".into())
            }
        );
        assert_eq!(
            events[1],
            WebViewEvent::ScriptResult {
                callback_id: 9,
                result: Err("ReferenceError".into())
            }
        );
    }
}
