//! WKWebView backend.
//!
//! Owns one `WKWebView` whose `NSView` pointer is the handle the host
//! embeds. WebKit requires the main thread for all view work, so
//! construction fails (and the instance stays windowless) when called off
//! it. A navigation-delegate object forwards WebKit's callbacks into the
//! shared [`EventSink`] and nothing else.
//!
//! Cookie management is accepted but performs no action; the WebKit cookie
//! store is asynchronous and not exposed through this contract.

use block2::RcBlock;
use objc2::rc::Retained;
use objc2::runtime::{AnyObject, ProtocolObject};
use objc2::{define_class, msg_send, DefinedClass, MainThreadMarker, MainThreadOnly};
use objc2_app_kit::NSView;
use objc2_foundation::{
    NSError, NSObject, NSObjectProtocol, NSPoint, NSRect, NSSize, NSString, NSURLRequest, NSURL,
};
use objc2_web_kit::{
    WKNavigation, WKNavigationDelegate, WKPreferences, WKWebView, WKWebViewConfiguration,
};
use tracing::{debug, warn};

use crate::dispatch::EventSink;
use crate::errors::BackendError;
use crate::events::WebViewEvent;
use crate::plugin::{WebViewPlugin, WEBVIEW_PLUGIN_KEY};
use crate::settings::WebViewSettings;
use crate::state::StateSnapshot;
use crate::webview::{checked_url, NativeWindowHandle, WebView};

/// Plugin wrapper for the WKWebView backend.
pub struct WkWebViewPlugin;

impl WebViewPlugin for WkWebViewPlugin {
    fn create(&self, key: &str) -> Option<Box<dyn WebView>> {
        (key == WEBVIEW_PLUGIN_KEY).then(|| Box::new(WkWebView::new()) as Box<dyn WebView>)
    }
}

/// Settings backed by `WKPreferences` where WebKit exposes the knob; the
/// rest are logged no-ops.
pub struct WkSettings {
    javascript: bool,
    preferences: Option<Retained<WKPreferences>>,
}

impl WkSettings {
    fn new(preferences: Option<Retained<WKPreferences>>) -> Self {
        let mut settings = Self {
            javascript: true,
            preferences,
        };
        settings.set_javascript_enabled(true);
        settings
    }
}

impl WebViewSettings for WkSettings {
    fn local_storage_enabled(&self) -> bool {
        // WebKit keeps HTML5 local storage on; the toggle is not exposed.
        true
    }

    fn javascript_enabled(&self) -> bool {
        self.javascript
    }

    fn local_content_can_access_file_urls(&self) -> bool {
        false
    }

    fn allow_file_access(&self) -> bool {
        false
    }

    fn set_local_storage_enabled(&mut self, _enabled: bool) {
        warn!("local storage toggle not supported by this backend");
    }

    fn set_javascript_enabled(&mut self, enabled: bool) {
        self.javascript = enabled;
        if let Some(preferences) = &self.preferences {
            #[allow(deprecated)]
            unsafe {
                preferences.setJavaScriptEnabled(enabled)
            };
        }
    }

    fn set_local_content_can_access_file_urls(&mut self, _enabled: bool) {
        warn!("local content file-url access toggle not supported by this backend");
    }

    fn set_allow_file_access(&mut self, _enabled: bool) {
        warn!("file access toggle not supported by this backend");
    }
}

struct DelegateIvars {
    sink: EventSink,
}

define_class!(
    #[unsafe(super(NSObject))]
    #[thread_kind = MainThreadOnly]
    #[name = "EmbedViewNavigationDelegate"]
    #[ivars = DelegateIvars]
    struct NavigationDelegate;

    unsafe impl NSObjectProtocol for NavigationDelegate {}

    unsafe impl WKNavigationDelegate for NavigationDelegate {
        #[unsafe(method(webView:didStartProvisionalNavigation:))]
        fn did_start(&self, webview: &WKWebView, _navigation: Option<&WKNavigation>) {
            self.ivars().sink.load_started(&current_url(webview));
        }

        #[unsafe(method(webView:didCommitNavigation:))]
        fn did_commit(&self, webview: &WKWebView, _navigation: Option<&WKNavigation>) {
            let sink = &self.ivars().sink;
            sink.url_changed(&current_url(webview));
            sink.progress_changed(unsafe { webview.estimatedProgress() });
        }

        #[unsafe(method(webView:didFinishNavigation:))]
        fn did_finish(&self, webview: &WKWebView, _navigation: Option<&WKNavigation>) {
            let sink = &self.ivars().sink;
            sink.load_finished(Some(&current_url(webview)));
            let title = unsafe { webview.title() }
                .map(|t| t.to_string())
                .unwrap_or_default();
            sink.title_changed(&title);
            unsafe {
                sink.history_changed(webview.canGoBack(), webview.canGoForward());
            }
        }

        #[unsafe(method(webView:didFailNavigation:withError:))]
        fn did_fail(
            &self,
            webview: &WKWebView,
            _navigation: Option<&WKNavigation>,
            error: &NSError,
        ) {
            self.ivars()
                .sink
                .load_failed(Some(&current_url(webview)), &error.localizedDescription().to_string());
        }

        #[unsafe(method(webView:didFailProvisionalNavigation:withError:))]
        fn did_fail_provisional(
            &self,
            webview: &WKWebView,
            _navigation: Option<&WKNavigation>,
            error: &NSError,
        ) {
            self.ivars()
                .sink
                .load_failed(Some(&current_url(webview)), &error.localizedDescription().to_string());
        }
    }
);

impl NavigationDelegate {
    fn new(mtm: MainThreadMarker, sink: EventSink) -> Retained<Self> {
        let this = Self::alloc(mtm).set_ivars(DelegateIvars { sink });
        unsafe { msg_send![super(this), init] }
    }
}

fn current_url(webview: &WKWebView) -> String {
    unsafe { webview.URL() }
        .and_then(|url| unsafe { url.absoluteString() })
        .map(|s| s.to_string())
        .unwrap_or_default()
}

struct NativeParts {
    webview: Retained<WKWebView>,
    _delegate: Retained<NavigationDelegate>,
}

/// WKWebView adapter. Construction is synchronous; off the main thread or
/// on failure the instance stays windowless.
pub struct WkWebView {
    native: Option<NativeParts>,
    sink: EventSink,
    snapshot: StateSnapshot,
    settings: WkSettings,
    user_agent: String,
}

impl WkWebView {
    pub fn new() -> Self {
        let sink = EventSink::new();
        let native = match build_native(&sink) {
            Ok(parts) => Some(parts),
            Err(err) => {
                warn!(%err, "wkwebview construction failed; running windowless");
                None
            }
        };

        let preferences = native.as_ref().map(|parts| unsafe {
            parts.webview.configuration().preferences()
        });
        let user_agent = native
            .as_ref()
            .and_then(|parts| unsafe { parts.webview.customUserAgent() })
            .map(|ua| ua.to_string())
            .unwrap_or_default();
        let settings = WkSettings::new(preferences);

        if let Some(parts) = &native {
            debug!(view = ?Retained::as_ptr(&parts.webview), "wkwebview created");
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

impl Default for WkWebView {
    fn default() -> Self {
        Self::new()
    }
}

fn build_native(sink: &EventSink) -> Result<NativeParts, BackendError> {
    let mtm = MainThreadMarker::new().ok_or_else(|| {
        BackendError::EngineInit("wkwebview must be created on the main thread".into())
    })?;

    let frame = NSRect::new(NSPoint::new(0.0, 0.0), NSSize::new(800.0, 600.0));
    let webview = unsafe {
        let configuration = WKWebViewConfiguration::new();
        WKWebView::initWithFrame_configuration(WKWebView::alloc(mtm), frame, &configuration)
    };

    let delegate = NavigationDelegate::new(mtm, sink.clone());
    unsafe {
        webview.setNavigationDelegate(Some(ProtocolObject::from_ref(&*delegate)));
    }

    Ok(NativeParts {
        webview,
        _delegate: delegate,
    })
}

impl WebView for WkWebView {
    fn set_url(&mut self, url: &str) {
        let Some(url) = checked_url(url) else { return };
        match &self.native {
            Some(parts) => unsafe {
                if let Some(target) = NSURL::URLWithString(&NSString::from_str(url.as_str())) {
                    let request = NSURLRequest::requestWithURL(&target);
                    parts.webview.loadRequest(&request);
                }
            },
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
        self.snapshot.can_go_back
    }

    fn can_go_forward(&self) -> bool {
        self.snapshot.can_go_forward
    }

    fn go_back(&mut self) {
        if !self.snapshot.can_go_back {
            return;
        }
        if let Some(parts) = &self.native {
            unsafe { parts.webview.goBack() };
        }
    }

    fn go_forward(&mut self) {
        if !self.snapshot.can_go_forward {
            return;
        }
        if let Some(parts) = &self.native {
            unsafe { parts.webview.goForward() };
        }
    }

    fn reload(&mut self) {
        if let Some(parts) = &self.native {
            unsafe { parts.webview.reload() };
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
            unsafe { parts.webview.stopLoading() };
        }
    }

    fn load_html(&mut self, html: &str, base_url: &str) {
        if let Some(parts) = &self.native {
            unsafe {
                let base = (!base_url.is_empty())
                    .then(|| NSURL::URLWithString(&NSString::from_str(base_url)))
                    .flatten();
                parts
                    .webview
                    .loadHTMLString_baseURL(&NSString::from_str(html), base.as_deref());
            }
        }
    }

    fn http_user_agent(&self) -> String {
        self.user_agent.clone()
    }

    fn set_http_user_agent(&mut self, agent: &str) {
        match &self.native {
            Some(parts) => {
                unsafe {
                    parts
                        .webview
                        .setCustomUserAgent(Some(&NSString::from_str(agent)));
                }
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
        let handler = RcBlock::new(move |result: *mut AnyObject, error: *mut NSError| {
            let outcome = if error.is_null() {
                let value = if result.is_null() {
                    String::new()
                } else {
                    unsafe { &*result.cast::<NSObject>() }.description().to_string()
                };
                Ok(value)
            } else {
                Err(unsafe { &*error }.localizedDescription().to_string())
            };
            events.script_result(callback_id, outcome);
        });
        unsafe {
            parts
                .webview
                .evaluateJavaScript_completionHandler(&NSString::from_str(script), Some(&handler));
        }
    }

    fn native_window(&self) -> Option<NativeWindowHandle> {
        self.native.as_ref().map(|parts| {
            let view: *const WKWebView = Retained::as_ptr(&parts.webview);
            NativeWindowHandle::AppKit(view as usize)
        })
    }

    fn set_geometry(&mut self, width: u32, height: u32, _device_pixel_ratio: f64) {
        // Cocoa geometry is in points; the backing scale factor is applied
        // by the window server.
        if let Some(parts) = &self.native {
            let view: &NSView = &parts.webview;
            unsafe { view.setFrameSize(NSSize::new(f64::from(width), f64::from(height))) };
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

impl Drop for WkWebView {
    fn drop(&mut self) {
        let Some(parts) = self.native.take() else {
            return;
        };
        // Teardown order: halt the load, stop event delivery, drop the
        // engine's callbacks, then the surface.
        unsafe {
            parts.webview.stopLoading();
            self.sink.close();
            parts.webview.setNavigationDelegate(None);
            parts.webview.removeFromSuperview();
        }
    }
}
