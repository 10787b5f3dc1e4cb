//! Canonical event model.
//!
//! Every backend translates its native engine notifications into these
//! types, so host code observes one vocabulary regardless of which engine
//! is compiled in.

use serde::{Deserialize, Serialize};

/// Status of a load episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoadStatus {
    /// A navigation has begun.
    Started,
    /// The navigation was interrupted before it could complete.
    Stopped,
    /// The navigation finished without error.
    Succeeded,
    /// The navigation finished with an error.
    Failed,
}

impl LoadStatus {
    /// Whether this status ends a load episode.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Started)
    }
}

/// A load notification translated from a native engine callback.
///
/// Each episode carries exactly one `Started` and exactly one terminal
/// status (`Succeeded`, `Failed` or `Stopped`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadEvent {
    /// URL the episode is loading.
    pub url: String,
    pub status: LoadStatus,
    /// Human-readable failure description. Empty unless `status` is `Failed`.
    pub error: String,
}

impl LoadEvent {
    pub fn started(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status: LoadStatus::Started,
            error: String::new(),
        }
    }

    pub fn succeeded(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status: LoadStatus::Succeeded,
            error: String::new(),
        }
    }

    pub fn failed(url: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status: LoadStatus::Failed,
            error: error.into(),
        }
    }

    pub fn stopped(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status: LoadStatus::Stopped,
            error: String::new(),
        }
    }
}

/// Events drained from a WebView on its owning thread, in delivery order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WebViewEvent {
    /// A load episode transition.
    Load(LoadEvent),
    /// Document title changed. May fire outside a load episode.
    TitleChanged(String),
    /// Visible URL changed (navigation, redirect, fragment).
    UrlChanged(String),
    /// Load progress estimate in percent, `0..=100`.
    ProgressChanged(u8),
    /// Back/forward availability changed.
    HistoryChanged {
        can_go_back: bool,
        can_go_forward: bool,
    },
    /// Result of a `run_java_script` call, tagged with its callback id.
    /// Delivery order across distinct calls is not guaranteed.
    ScriptResult {
        callback_id: u64,
        result: Result<String, String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn started_is_not_terminal() {
        assert!(!LoadStatus::Started.is_terminal());
    }

    #[test]
    fn other_statuses_are_terminal() {
        assert!(LoadStatus::Stopped.is_terminal());
        assert!(LoadStatus::Succeeded.is_terminal());
        assert!(LoadStatus::Failed.is_terminal());
    }

    #[test]
    fn constructors_fill_error_only_on_failure() {
        assert_eq!(LoadEvent::started("https://a.test").error, "");
        assert_eq!(LoadEvent::succeeded("https://a.test").error, "");
        assert_eq!(LoadEvent::stopped("https://a.test").error, "");
        let failed = LoadEvent::failed("https://a.test", "dns error");
        assert_eq!(failed.error, "dns error");
        assert_eq!(failed.status, LoadStatus::Failed);
    }

    #[test]
    fn events_round_trip_through_serde() {
        let event = WebViewEvent::Load(LoadEvent::failed("https://bad.test", "host not found"));
        let json = serde_json::to_string(&event).unwrap();
        let back: WebViewEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, back);
    }
}
