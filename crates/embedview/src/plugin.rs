//! Backend plugin contract.

use crate::webview::WebView;

/// The one key the factory asks plugins for. Other keys are reserved for
/// future backend variants and must yield no instance.
pub const WEBVIEW_PLUGIN_KEY: &str = "webview";

/// One plugin per backend, keyed by a logical name.
pub trait WebViewPlugin {
    /// One-time engine preparation before the first `create` call.
    fn prepare(&self) {}

    /// Construct a backend for `key`, or `None` when the key is not
    /// recognized (or construction is impossible at the plugin level).
    fn create(&self, key: &str) -> Option<Box<dyn WebView>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::null::NullWebView;

    struct RecordingPlugin;

    impl WebViewPlugin for RecordingPlugin {
        fn create(&self, key: &str) -> Option<Box<dyn WebView>> {
            (key == WEBVIEW_PLUGIN_KEY).then(|| Box::new(NullWebView::new()) as Box<dyn WebView>)
        }
    }

    #[test]
    fn create_answers_only_the_webview_key() {
        let plugin = RecordingPlugin;
        assert!(plugin.create("webview").is_some());
        assert!(plugin.create("").is_none());
        assert!(plugin.create("WEBVIEW").is_none());
        assert!(plugin.create("webview2").is_none());
    }
}
