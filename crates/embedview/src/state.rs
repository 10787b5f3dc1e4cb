//! Load-episode tracking and owning-thread state.
//!
//! `LoadTracker` enforces the episode contract — one `Started` and one
//! terminal event per load, no matter how the native engine mangles its
//! callbacks (WebKit, for one, reports load-finished after load-failed).
//! `StateSnapshot` is the cached state the contract queries read; it is
//! only mutated by applying drained events on the owning thread.

use tracing::debug;

use crate::events::{LoadEvent, WebViewEvent};

/// State machine for one WebView's load episodes.
///
/// Lives behind the event sink's lock, so native callbacks from any thread
/// funnel through it one at a time.
#[derive(Debug, Default)]
pub(crate) struct LoadTracker {
    loading: bool,
    stop_requested: bool,
    /// URL of the episode in flight. Used when a native callback reports a
    /// transition without repeating the URL.
    url: String,
}

impl LoadTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// A navigation has begun. Returns the events to deliver.
    ///
    /// If an episode is already in flight it is closed with `Stopped`
    /// first, so every episode still gets exactly one terminal event.
    pub fn begin(&mut self, url: &str) -> Vec<LoadEvent> {
        let mut out = Vec::with_capacity(2);
        if self.loading {
            debug!(old = %self.url, new = %url, "navigation superseded in flight");
            out.push(LoadEvent::stopped(self.url.clone()));
        }
        self.loading = true;
        self.stop_requested = false;
        self.url = url.to_string();
        out.push(LoadEvent::started(url));
        out
    }

    /// The native engine finished the episode without error.
    ///
    /// Returns `None` when no episode is in flight (duplicate terminal).
    pub fn succeed(&mut self, url: Option<&str>) -> Option<LoadEvent> {
        if !self.loading {
            return None;
        }
        self.close(url);
        Some(LoadEvent::succeeded(self.url.clone()))
    }

    /// The native engine reported a failure.
    ///
    /// Maps to `Stopped` when `stop()` was requested for this episode:
    /// engines report user-initiated interruption as a cancellation error,
    /// which is not a failure from the host's point of view.
    pub fn fail(&mut self, url: Option<&str>, message: &str) -> Option<LoadEvent> {
        if !self.loading {
            return None;
        }
        let stopped = self.stop_requested;
        self.close(url);
        if stopped {
            Some(LoadEvent::stopped(self.url.clone()))
        } else {
            Some(LoadEvent::failed(self.url.clone(), message))
        }
    }

    /// Mark the episode in flight as interrupted by the host.
    pub fn request_stop(&mut self) {
        if self.loading {
            self.stop_requested = true;
        }
    }

    /// Progress estimates only pass while an episode is in flight.
    pub fn progress(&self, percent: u8) -> Option<u8> {
        self.loading.then_some(percent.min(100))
    }

    fn close(&mut self, url: Option<&str>) {
        if let Some(url) = url {
            self.url = url.to_string();
        }
        self.loading = false;
        self.stop_requested = false;
    }
}

/// Cached per-WebView state, mutated only on the owning thread.
#[derive(Debug, Clone, Default)]
pub(crate) struct StateSnapshot {
    pub url: String,
    pub title: String,
    pub progress: u8,
    pub loading: bool,
    pub can_go_back: bool,
    pub can_go_forward: bool,
}

impl StateSnapshot {
    /// Fold one delivered event into the snapshot.
    pub fn apply(&mut self, event: &WebViewEvent) {
        match event {
            WebViewEvent::Load(load) => match load.status {
                crate::events::LoadStatus::Started => {
                    self.url = load.url.clone();
                    self.loading = true;
                    self.progress = 0;
                }
                crate::events::LoadStatus::Succeeded => {
                    self.url = load.url.clone();
                    self.loading = false;
                    self.progress = 100;
                }
                crate::events::LoadStatus::Failed | crate::events::LoadStatus::Stopped => {
                    self.loading = false;
                    // 100 is reserved for a successful terminal; a late
                    // progress estimate must not survive the episode.
                    self.progress = 0;
                }
            },
            WebViewEvent::TitleChanged(title) => self.title = title.clone(),
            WebViewEvent::UrlChanged(url) => self.url = url.clone(),
            WebViewEvent::ProgressChanged(percent) => self.progress = (*percent).min(100),
            WebViewEvent::HistoryChanged {
                can_go_back,
                can_go_forward,
            } => {
                self.can_go_back = *can_go_back;
                self.can_go_forward = *can_go_forward;
            }
            WebViewEvent::ScriptResult { .. } => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::LoadStatus;

    // -- LoadTracker --

    #[test]
    fn begin_emits_started_once() {
        let mut tracker = LoadTracker::new();
        let events = tracker.begin("https://example.test");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].status, LoadStatus::Started);
        assert_eq!(events[0].url, "https://example.test");
        assert!(tracker.is_loading());
    }

    #[test]
    fn finish_without_error_is_succeeded() {
        let mut tracker = LoadTracker::new();
        tracker.begin("https://example.test");
        let done = tracker.succeed(None).unwrap();
        assert_eq!(done.status, LoadStatus::Succeeded);
        assert_eq!(done.url, "https://example.test");
        assert!(!tracker.is_loading());
    }

    #[test]
    fn duplicate_terminal_is_swallowed() {
        let mut tracker = LoadTracker::new();
        tracker.begin("https://example.test");
        // WebKit fires load-failed and then still reports load-finished.
        assert!(tracker.fail(None, "host not found").is_some());
        assert!(tracker.succeed(None).is_none());
        assert!(tracker.fail(None, "again").is_none());
    }

    #[test]
    fn terminal_without_episode_is_swallowed() {
        let mut tracker = LoadTracker::new();
        assert!(tracker.succeed(Some("https://example.test")).is_none());
        assert!(tracker.fail(None, "boom").is_none());
    }

    #[test]
    fn superseding_navigation_stops_previous_episode() {
        let mut tracker = LoadTracker::new();
        tracker.begin("https://first.test");
        let events = tracker.begin("https://second.test");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].status, LoadStatus::Stopped);
        assert_eq!(events[0].url, "https://first.test");
        assert_eq!(events[1].status, LoadStatus::Started);
        assert_eq!(events[1].url, "https://second.test");
    }

    #[test]
    fn cancellation_after_stop_request_maps_to_stopped() {
        let mut tracker = LoadTracker::new();
        tracker.begin("https://example.test");
        tracker.request_stop();
        let done = tracker.fail(None, "Load request cancelled").unwrap();
        assert_eq!(done.status, LoadStatus::Stopped);
        assert_eq!(done.error, "");
    }

    #[test]
    fn failure_without_stop_request_stays_failed() {
        let mut tracker = LoadTracker::new();
        tracker.begin("https://bad.test");
        let done = tracker.fail(None, "host not found").unwrap();
        assert_eq!(done.status, LoadStatus::Failed);
        assert_eq!(done.error, "host not found");
    }

    #[test]
    fn stop_request_does_not_outlive_episode() {
        let mut tracker = LoadTracker::new();
        tracker.begin("https://one.test");
        tracker.request_stop();
        tracker.fail(None, "cancelled");
        // Next episode fails for real; must not be masked as Stopped.
        tracker.begin("https://two.test");
        let done = tracker.fail(None, "tls error").unwrap();
        assert_eq!(done.status, LoadStatus::Failed);
    }

    #[test]
    fn progress_only_passes_while_loading() {
        let mut tracker = LoadTracker::new();
        assert_eq!(tracker.progress(50), None);
        tracker.begin("https://example.test");
        assert_eq!(tracker.progress(50), Some(50));
        assert_eq!(tracker.progress(250), Some(100));
        tracker.succeed(None);
        assert_eq!(tracker.progress(80), None);
    }

    // -- StateSnapshot --

    #[test]
    fn snapshot_tracks_load_sequence() {
        let mut snap = StateSnapshot::default();
        snap.apply(&WebViewEvent::Load(LoadEvent::started("https://a.test")));
        assert!(snap.loading);
        assert_eq!(snap.progress, 0);
        assert_eq!(snap.url, "https://a.test");

        snap.apply(&WebViewEvent::ProgressChanged(40));
        assert_eq!(snap.progress, 40);

        snap.apply(&WebViewEvent::Load(LoadEvent::succeeded("https://a.test")));
        assert!(!snap.loading);
        assert_eq!(snap.progress, 100);
    }

    #[test]
    fn progress_is_100_only_after_success() {
        let mut snap = StateSnapshot::default();
        snap.apply(&WebViewEvent::Load(LoadEvent::started("https://a.test")));
        // Engines may report a full progress estimate before failing.
        snap.apply(&WebViewEvent::ProgressChanged(100));
        snap.apply(&WebViewEvent::Load(LoadEvent::failed("https://a.test", "refused")));
        assert!(!snap.loading);
        assert_eq!(snap.progress, 0);

        snap.apply(&WebViewEvent::Load(LoadEvent::started("https://a.test")));
        snap.apply(&WebViewEvent::ProgressChanged(100));
        snap.apply(&WebViewEvent::Load(LoadEvent::stopped("https://a.test")));
        assert_eq!(snap.progress, 0);
    }

    #[test]
    fn title_and_url_apply_outside_episodes() {
        let mut snap = StateSnapshot::default();
        snap.apply(&WebViewEvent::TitleChanged("Example".into()));
        snap.apply(&WebViewEvent::UrlChanged("https://a.test/#frag".into()));
        assert_eq!(snap.title, "Example");
        assert_eq!(snap.url, "https://a.test/#frag");
        assert!(!snap.loading);
    }

    #[test]
    fn history_availability_applies() {
        let mut snap = StateSnapshot::default();
        snap.apply(&WebViewEvent::HistoryChanged {
            can_go_back: true,
            can_go_forward: false,
        });
        assert!(snap.can_go_back);
        assert!(!snap.can_go_forward);
    }
}
