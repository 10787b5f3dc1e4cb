//! The polymorphic WebView contract.

use tracing::warn;
use url::Url;

use crate::events::WebViewEvent;
use crate::settings::WebViewSettings;

/// Opaque platform window/surface identifier owned by a backend.
///
/// Exposed weakly so host UI code can embed the surface into its own
/// hierarchy. The host must never destroy it; the owning WebView does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeWindowHandle {
    /// X11 window id of a GTK plug, for XEmbed-style embedding.
    XWindow(u64),
    /// Win32 window hosting a WebView2 controller.
    Win32(isize),
    /// Pointer to the NSView backing a WKWebView.
    AppKit(usize),
}

/// One embedded web view bound to one backend and one native window.
///
/// State queries are pure reads of cached state — they reflect only events
/// already delivered through [`drain_events`](Self::drain_events) and never
/// block on the native engine. Operations that reach the engine
/// (navigation, script execution, cookies) are fire-and-forget; outcomes
/// arrive later as [`WebViewEvent`]s.
pub trait WebView {
    /// Begin navigating to `url`. Syntactically invalid URLs are a logged
    /// no-op and emit nothing.
    fn set_url(&mut self, url: &str);

    fn url(&self) -> String;
    fn title(&self) -> String;
    /// Load progress in percent, `0..=100`. Reaches 100 only when the
    /// latest episode succeeded.
    fn load_progress(&self) -> u8;
    fn is_loading(&self) -> bool;
    fn can_go_back(&self) -> bool;
    fn can_go_forward(&self) -> bool;

    /// No-op unless `can_go_back()` is currently true.
    fn go_back(&mut self);
    /// No-op unless `can_go_forward()` is currently true.
    fn go_forward(&mut self);
    fn reload(&mut self);
    /// Interrupt the navigation in flight, if any. Asynchronous: the effect
    /// is observed as a `Stopped` terminal event, not a return value.
    fn stop(&mut self);

    /// Load literal markup, resolving relative references against
    /// `base_url`. Backends need not record a history entry for this.
    fn load_html(&mut self, html: &str, base_url: &str);

    fn http_user_agent(&self) -> String;
    /// Backends that cannot change the user agent log a diagnostic and
    /// keep the previous value.
    fn set_http_user_agent(&mut self, agent: &str);

    /// Best-effort; unsupported backends accept the call and do nothing.
    fn set_cookie(&mut self, domain: &str, name: &str, value: &str);
    /// Best-effort; unsupported backends accept the call and do nothing.
    fn delete_cookie(&mut self, domain: &str, name: &str);
    /// Best-effort; unsupported backends accept the call and do nothing.
    fn delete_all_cookies(&mut self);

    /// Fire-and-forget script execution. The result (or failure) is
    /// delivered later as a `ScriptResult` event tagged with
    /// `callback_id`; ordering across calls is not guaranteed.
    fn run_java_script(&mut self, script: &str, callback_id: u64);

    /// The embeddable window handle, or `None` if native construction
    /// failed. A windowless instance still answers state queries.
    fn native_window(&self) -> Option<NativeWindowHandle>;

    /// Propagate a host resize to the embedding surface. `width` and
    /// `height` are logical pixels; the backend scales by
    /// `device_pixel_ratio`.
    fn set_geometry(&mut self, width: u32, height: u32, device_pixel_ratio: f64);

    fn settings(&self) -> &dyn WebViewSettings;
    fn settings_mut(&mut self) -> &mut dyn WebViewSettings;

    /// Drain pending events in delivery order, folding them into the
    /// cached state first. Call from the owning thread's loop.
    fn drain_events(&mut self) -> Vec<WebViewEvent>;
}

/// Parse and validate a URL for `set_url`. Logs and returns `None` on
/// syntactically invalid input.
pub(crate) fn checked_url(raw: &str) -> Option<Url> {
    match Url::parse(raw) {
        Ok(url) => Some(url),
        Err(err) => {
            warn!(url = %raw, %err, "ignoring syntactically invalid url");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_well_formed_urls() {
        assert!(checked_url("https://example.test").is_some());
        assert!(checked_url("https://example.test/path?q=1#frag").is_some());
        assert!(checked_url("file:///tmp/index.html").is_some());
        assert!(checked_url("about:blank").is_some());
    }

    #[test]
    fn rejects_malformed_urls() {
        assert!(checked_url("").is_none());
        assert!(checked_url("not-a-url").is_none());
        assert!(checked_url("http//missing.scheme").is_none());
        assert!(checked_url("://no-scheme").is_none());
    }

    #[test]
    fn handle_variants_compare() {
        assert_eq!(
            NativeWindowHandle::XWindow(42),
            NativeWindowHandle::XWindow(42)
        );
        assert_ne!(
            NativeWindowHandle::XWindow(42),
            NativeWindowHandle::Win32(42)
        );
    }
}
