//! Compile-time plugin selection with null fallback.
//!
//! Exactly one backend plugin is compiled per target platform, chosen by
//! target OS plus its cargo feature. When no plugin is compiled in, or the
//! plugin declines to create an instance, callers get the inert null
//! backend instead of an error.

use tracing::warn;

use crate::null::NullWebView;
use crate::plugin::{WebViewPlugin, WEBVIEW_PLUGIN_KEY};
use crate::webview::WebView;

/// The backend plugin compiled into this build, if any.
pub fn platform_plugin() -> Option<Box<dyn WebViewPlugin>> {
    #[cfg(all(target_os = "linux", feature = "webkitgtk"))]
    {
        return Some(Box::new(crate::backend::linux::WebKitGtkPlugin));
    }

    #[cfg(all(target_os = "windows", feature = "webview2"))]
    {
        return Some(Box::new(crate::backend::windows::WebView2Plugin));
    }

    #[cfg(all(target_os = "macos", feature = "wkwebview"))]
    {
        return Some(Box::new(crate::backend::macos::WkWebViewPlugin));
    }

    #[allow(unreachable_code)]
    None
}

/// Create a web view for the current platform.
///
/// Falls back to [`NullWebView`] when no plugin is available, so the
/// returned instance always satisfies the full contract.
pub fn create_web_view() -> Box<dyn WebView> {
    match platform_plugin() {
        Some(plugin) => {
            plugin.prepare();
            match plugin.create(WEBVIEW_PLUGIN_KEY) {
                Some(view) => view,
                None => {
                    warn!("webview plugin created no instance; using null backend");
                    Box::new(NullWebView::new())
                }
            }
        }
        None => {
            warn!("no webview plugin compiled for this platform; using null backend");
            Box::new(NullWebView::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // These run with backend features off, exercising the fallback path.

    #[cfg(not(any(feature = "webkitgtk", feature = "webview2", feature = "wkwebview")))]
    #[test]
    fn no_plugin_without_backend_features() {
        assert!(platform_plugin().is_none());
    }

    #[cfg(not(any(feature = "webkitgtk", feature = "webview2", feature = "wkwebview")))]
    #[test]
    fn fallback_instance_is_fully_inert() {
        let mut view = create_web_view();
        assert_eq!(view.title(), "");
        assert_eq!(view.load_progress(), 0);
        assert!(view.native_window().is_none());

        view.set_url("https://example.test");
        view.reload();
        assert!(!view.is_loading());
        assert!(view.drain_events().is_empty());
    }

    #[test]
    fn create_always_yields_an_instance() {
        let view = create_web_view();
        // Whatever the backend, the contract holds without null checks.
        let _ = view.url();
        let _ = view.can_go_back();
    }
}
