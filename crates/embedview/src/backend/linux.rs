//! WebKitGTK backend.
//!
//! Owns one `webkit2gtk::WebView` inside a `gtk::Plug`; the plug's XEmbed
//! window id is the handle the host embeds. WebKit signals run on the GTK
//! main loop, which is not necessarily the owning thread, so every signal
//! handler pushes into the shared [`EventSink`] and nothing else.
//!
//! History navigation is not wired on this backend: `can_go_back` /
//! `can_go_forward` always report false. Cookie management is accepted but
//! performs no action.

use gtk::prelude::*;
use tracing::{debug, warn};
use webkit2gtk::prelude::*;
use webkit2gtk::{LoadEvent as WebKitLoadEvent, WebView as WebKitWebView};

use javascriptcore::ValueExt;

use crate::dispatch::EventSink;
use crate::errors::BackendError;
use crate::events::WebViewEvent;
use crate::plugin::{WebViewPlugin, WEBVIEW_PLUGIN_KEY};
use crate::settings::WebViewSettings;
use crate::state::StateSnapshot;
use crate::webview::{checked_url, NativeWindowHandle, WebView};

/// Plugin wrapper for the WebKitGTK backend.
pub struct WebKitGtkPlugin;

impl WebViewPlugin for WebKitGtkPlugin {
    fn prepare(&self) {
        if !gtk::is_initialized() {
            if let Err(err) = gtk::init() {
                warn!(%err, "gtk initialization failed");
            }
        }
    }

    fn create(&self, key: &str) -> Option<Box<dyn WebView>> {
        (key == WEBVIEW_PLUGIN_KEY)
            .then(|| Box::new(WebKitGtkWebView::new()) as Box<dyn WebView>)
    }
}

/// Settings backed by `webkit2gtk::Settings` where WebKit exposes the
/// knob; the rest are logged no-ops.
pub struct WebKitGtkSettings {
    javascript: bool,
    allow_file_access: bool,
    webkit: Option<webkit2gtk::Settings>,
}

impl WebKitGtkSettings {
    fn new(webkit: Option<webkit2gtk::Settings>) -> Self {
        let mut settings = Self {
            javascript: true,
            allow_file_access: false,
            webkit,
        };
        // Push the defaults down so cached and engine state agree.
        settings.set_javascript_enabled(true);
        settings.set_allow_file_access(false);
        settings
    }
}

impl WebViewSettings for WebKitGtkSettings {
    fn local_storage_enabled(&self) -> bool {
        // WebKit keeps HTML5 local storage on; the toggle is not exposed.
        true
    }

    fn javascript_enabled(&self) -> bool {
        self.javascript
    }

    fn local_content_can_access_file_urls(&self) -> bool {
        self.allow_file_access
    }

    fn allow_file_access(&self) -> bool {
        self.allow_file_access
    }

    fn set_local_storage_enabled(&mut self, _enabled: bool) {
        warn!("local storage toggle not supported by this backend");
    }

    fn set_javascript_enabled(&mut self, enabled: bool) {
        self.javascript = enabled;
        if let Some(webkit) = &self.webkit {
            webkit.set_enable_javascript(enabled);
        }
    }

    fn set_local_content_can_access_file_urls(&mut self, _enabled: bool) {
        warn!("local content file-url access toggle not supported by this backend");
    }

    fn set_allow_file_access(&mut self, enabled: bool) {
        self.allow_file_access = enabled;
        if let Some(webkit) = &self.webkit {
            webkit.set_allow_file_access_from_file_urls(enabled);
        }
    }
}

struct NativeParts {
    webview: WebKitWebView,
    plug: gtk::Plug,
    window_id: u64,
    signal_ids: Vec<glib::SignalHandlerId>,
}

/// WebKitGTK adapter. Construction is synchronous; if any native step
/// fails the instance stays windowless and inert apart from cached state.
pub struct WebKitGtkWebView {
    native: Option<NativeParts>,
    sink: EventSink,
    snapshot: StateSnapshot,
    settings: WebKitGtkSettings,
    user_agent: String,
}

impl WebKitGtkWebView {
    pub fn new() -> Self {
        let sink = EventSink::new();
        let native = match build_native(&sink) {
            Ok(parts) => Some(parts),
            Err(err) => {
                warn!(%err, "webkitgtk construction failed; running windowless");
                None
            }
        };

        let webkit_settings = native
            .as_ref()
            .and_then(|parts| parts.webview.settings());
        let user_agent = webkit_settings
            .as_ref()
            .and_then(|s| s.user_agent())
            .map(|ua| ua.to_string())
            .unwrap_or_default();
        let settings = WebKitGtkSettings::new(webkit_settings);

        if let Some(parts) = &native {
            debug!(window_id = parts.window_id, "webkitgtk webview created");
        }

        Self {
            native,
            sink,
            snapshot: StateSnapshot::default(),
            settings,
            user_agent,
        }
    }
}

impl Default for WebKitGtkWebView {
    fn default() -> Self {
        Self::new()
    }
}

/// Create the engine and the plug surface, and wire the engine's signals
/// into the sink. Any failure leaves nothing dangling.
fn build_native(sink: &EventSink) -> Result<NativeParts, BackendError> {
    if !gtk::is_initialized() {
        gtk::init().map_err(|err| BackendError::EngineInit(format!("gtk_init failed: {err}")))?;
    }

    let webview = WebKitWebView::new();
    let plug = gtk::Plug::new(0);
    plug.add(&webview);
    plug.show_all();
    plug.realize();

    let window_id = plug.id() as u64;
    if window_id == 0 {
        unsafe { plug.destroy() };
        return Err(BackendError::Surface("plug has no window id".into()));
    }

    let mut signal_ids = Vec::with_capacity(5);

    let events = sink.clone();
    signal_ids.push(webview.connect_load_changed(move |wv, event| {
        let uri = wv.uri().map(|u| u.to_string()).unwrap_or_default();
        match event {
            WebKitLoadEvent::Started => events.load_started(&uri),
            WebKitLoadEvent::Committed => events.url_changed(&uri),
            WebKitLoadEvent::Finished => events.load_finished(Some(&uri)),
            _ => {}
        }
    }));

    let events = sink.clone();
    signal_ids.push(webview.connect_load_failed(move |_wv, _event, failing_uri, error| {
        events.load_failed(Some(failing_uri), &error.to_string());
        // Let WebKit render its own error page.
        false
    }));

    let events = sink.clone();
    signal_ids.push(webview.connect_estimated_load_progress_notify(move |wv| {
        events.progress_changed(wv.estimated_load_progress());
    }));

    let events = sink.clone();
    signal_ids.push(webview.connect_title_notify(move |wv| {
        events.title_changed(wv.title().as_deref().unwrap_or_default());
    }));

    let events = sink.clone();
    signal_ids.push(webview.connect_uri_notify(move |wv| {
        events.url_changed(wv.uri().as_deref().unwrap_or_default());
    }));

    Ok(NativeParts {
        webview,
        plug,
        window_id,
        signal_ids,
    })
}

impl WebView for WebKitGtkWebView {
    fn set_url(&mut self, url: &str) {
        let Some(url) = checked_url(url) else { return };
        match &self.native {
            Some(parts) => parts.webview.load_uri(url.as_str()),
            None => debug!(url = %url, "no native engine; navigation ignored"),
        }
    }

    fn url(&self) -> String {
        self.snapshot.url.clone()
    }

    fn title(&self) -> String {
        self.snapshot.title.clone()
    }

    fn load_progress(&self) -> u8 {
        self.snapshot.progress
    }

    fn is_loading(&self) -> bool {
        self.snapshot.loading
    }

    fn can_go_back(&self) -> bool {
        false
    }

    fn can_go_forward(&self) -> bool {
        false
    }

    fn go_back(&mut self) {
        debug!("history navigation not supported by this backend");
    }

    fn go_forward(&mut self) {
        debug!("history navigation not supported by this backend");
    }

    fn reload(&mut self) {
        if let Some(parts) = &self.native {
            parts.webview.reload();
        }
    }

    fn stop(&mut self) {
        if !self.sink.is_loading() {
            return;
        }
        if let Some(parts) = &self.native {
            // WebKit reports the interruption as a cancellation error; the
            // sink maps it to a Stopped terminal event.
            self.sink.request_stop();
            parts.webview.stop_loading();
        }
    }

    fn load_html(&mut self, html: &str, base_url: &str) {
        if let Some(parts) = &self.native {
            let base = (!base_url.is_empty()).then_some(base_url);
            parts.webview.load_html(html, base);
        }
    }

    fn http_user_agent(&self) -> String {
        self.user_agent.clone()
    }

    fn set_http_user_agent(&mut self, agent: &str) {
        match &self.settings.webkit {
            Some(webkit) => {
                webkit.set_user_agent(Some(agent));
                self.user_agent = agent.to_string();
            }
            None => warn!("no native engine; user agent unchanged"),
        }
    }

    fn set_cookie(&mut self, domain: &str, name: &str, _value: &str) {
        debug!(domain, name, "cookie management not supported by this backend");
    }

    fn delete_cookie(&mut self, domain: &str, name: &str) {
        debug!(domain, name, "cookie management not supported by this backend");
    }

    fn delete_all_cookies(&mut self) {
        debug!("cookie management not supported by this backend");
    }

    fn run_java_script(&mut self, script: &str, callback_id: u64) {
        let Some(parts) = &self.native else {
            self.sink
                .script_result(callback_id, Err("no native engine".into()));
            return;
        };
        let events = self.sink.clone();
        parts
            .webview
            .run_javascript(script, None::<&gio::Cancellable>, move |result| {
                let outcome = match result {
                    Ok(js) => Ok(js
                        .js_value()
                        .map(|value| value.to_str().to_string())
                        .unwrap_or_default()),
                    Err(err) => Err(err.to_string()),
                };
                events.script_result(callback_id, outcome);
            });
    }

    fn native_window(&self) -> Option<NativeWindowHandle> {
        self.native
            .as_ref()
            .map(|parts| NativeWindowHandle::XWindow(parts.window_id))
    }

    fn set_geometry(&mut self, width: u32, height: u32, device_pixel_ratio: f64) {
        if let Some(parts) = &self.native {
            let width = (width as f64 * device_pixel_ratio).round() as i32;
            let height = (height as f64 * device_pixel_ratio).round() as i32;
            parts.plug.set_size_request(width, height);
        }
    }

    fn settings(&self) -> &dyn WebViewSettings {
        &self.settings
    }

    fn settings_mut(&mut self) -> &mut dyn WebViewSettings {
        &mut self.settings
    }

    fn drain_events(&mut self) -> Vec<WebViewEvent> {
        let events = self.sink.drain();
        for event in &events {
            self.snapshot.apply(event);
        }
        events
    }
}

impl Drop for WebKitGtkWebView {
    fn drop(&mut self) {
        let Some(mut parts) = self.native.take() else {
            return;
        };
        // Teardown order: halt the load, stop event delivery, drop the
        // engine's callbacks, then the surface.
        parts.webview.stop_loading();
        self.sink.close();
        for id in parts.signal_ids.drain(..) {
            parts.webview.disconnect(id);
        }
        parts.plug.hide();
        unsafe { parts.plug.destroy() };
    }
}
