//! Inert backend used when no real backend is available.
//!
//! Satisfies the whole contract with side-effect-free answers so calling
//! code never needs to null-check the web view itself.

use tracing::debug;

use crate::events::WebViewEvent;
use crate::settings::WebViewSettings;
use crate::webview::{NativeWindowHandle, WebView};

/// Settings counterpart of [`NullWebView`]: every attribute reads false,
/// every setter is a no-op.
#[derive(Debug, Default)]
pub struct NullSettings;

impl WebViewSettings for NullSettings {
    fn local_storage_enabled(&self) -> bool {
        false
    }

    fn javascript_enabled(&self) -> bool {
        false
    }

    fn local_content_can_access_file_urls(&self) -> bool {
        false
    }

    fn allow_file_access(&self) -> bool {
        false
    }

    fn set_local_storage_enabled(&mut self, _enabled: bool) {}

    fn set_javascript_enabled(&mut self, _enabled: bool) {}

    fn set_local_content_can_access_file_urls(&mut self, _enabled: bool) {}

    fn set_allow_file_access(&mut self, _enabled: bool) {}
}

/// WebView that renders nothing and navigates nowhere.
#[derive(Debug, Default)]
pub struct NullWebView {
    settings: NullSettings,
}

impl NullWebView {
    pub fn new() -> Self {
        debug!("null webview created");
        Self::default()
    }
}

impl WebView for NullWebView {
    fn set_url(&mut self, _url: &str) {}

    fn url(&self) -> String {
        String::new()
    }

    fn title(&self) -> String {
        String::new()
    }

    fn load_progress(&self) -> u8 {
        0
    }

    fn is_loading(&self) -> bool {
        false
    }

    fn can_go_back(&self) -> bool {
        false
    }

    fn can_go_forward(&self) -> bool {
        false
    }

    fn go_back(&mut self) {}

    fn go_forward(&mut self) {}

    fn reload(&mut self) {}

    fn stop(&mut self) {}

    fn load_html(&mut self, _html: &str, _base_url: &str) {}

    fn http_user_agent(&self) -> String {
        String::new()
    }

    fn set_http_user_agent(&mut self, _agent: &str) {}

    fn set_cookie(&mut self, _domain: &str, _name: &str, _value: &str) {}

    fn delete_cookie(&mut self, _domain: &str, _name: &str) {}

    fn delete_all_cookies(&mut self) {}

    fn run_java_script(&mut self, _script: &str, _callback_id: u64) {}

    fn native_window(&self) -> Option<NativeWindowHandle> {
        None
    }

    fn set_geometry(&mut self, _width: u32, _height: u32, _device_pixel_ratio: f64) {}

    fn settings(&self) -> &dyn WebViewSettings {
        &self.settings
    }

    fn settings_mut(&mut self) -> &mut dyn WebViewSettings {
        &mut self.settings
    }

    fn drain_events(&mut self) -> Vec<WebViewEvent> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queries_return_inert_defaults() {
        let view = NullWebView::new();
        assert_eq!(view.url(), "");
        assert_eq!(view.title(), "");
        assert_eq!(view.load_progress(), 0);
        assert!(!view.is_loading());
        assert!(!view.can_go_back());
        assert!(!view.can_go_forward());
        assert_eq!(view.http_user_agent(), "");
        assert!(view.native_window().is_none());
    }

    #[test]
    fn mutators_accept_anything_and_change_nothing() {
        let mut view = NullWebView::new();
        view.set_url("https://example.test");
        view.set_url("");
        view.set_url("not-a-url");
        view.go_back();
        view.go_forward();
        view.reload();
        view.stop();
        view.load_html("<p>hi</p>", "https://example.test");
        view.set_http_user_agent("Agent/1.0");
        view.set_cookie("example.test", "session", "abc");
        view.delete_cookie("example.test", "session");
        view.delete_all_cookies();
        view.run_java_script("1 + 1", 1);
        view.set_geometry(640, 480, 2.0);

        assert_eq!(view.url(), "");
        assert_eq!(view.title(), "");
        assert_eq!(view.http_user_agent(), "");
        assert!(!view.is_loading());
    }

    #[test]
    fn never_emits_events() {
        let mut view = NullWebView::new();
        view.set_url("https://example.test");
        view.reload();
        view.run_java_script("1", 1);
        assert!(view.drain_events().is_empty());
    }

    #[test]
    fn settings_read_false_and_ignore_writes() {
        let mut view = NullWebView::new();
        view.settings_mut().set_javascript_enabled(true);
        view.settings_mut().set_local_storage_enabled(true);
        view.settings_mut().set_allow_file_access(true);
        view.settings_mut()
            .set_local_content_can_access_file_urls(true);

        let settings = view.settings();
        assert!(!settings.javascript_enabled());
        assert!(!settings.local_storage_enabled());
        assert!(!settings.allow_file_access());
        assert!(!settings.local_content_can_access_file_urls());
    }
}
