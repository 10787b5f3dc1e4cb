//! WebView2 backend.
//!
//! Owns one WebView2 controller hosted on a hidden Win32 window; the HWND
//! is the handle the host embeds. Environment and controller bring-up are
//! asynchronous COM calls pumped to completion during construction, so the
//! adapter is fully wired (or degraded) by the time `new` returns. COM
//! event handlers push into the shared [`EventSink`] only.

use std::sync::mpsc;

use tracing::{debug, warn};

use webview2_com::Microsoft::Web::WebView2::Win32::{
    ICoreWebView2, ICoreWebView2Controller, ICoreWebView2CookieManager, ICoreWebView2Environment,
    ICoreWebView2Settings, ICoreWebView2Settings2, ICoreWebView2_2,
    CreateCoreWebView2EnvironmentWithOptions, COREWEBVIEW2_WEB_ERROR_STATUS,
    COREWEBVIEW2_WEB_ERROR_STATUS_OPERATION_CANCELED, EventRegistrationToken,
};
use webview2_com::{
    wait_with_pump, CreateCoreWebView2ControllerCompletedHandler,
    CreateCoreWebView2EnvironmentCompletedHandler, DocumentTitleChangedEventHandler,
    ExecuteScriptCompletedHandler, HistoryChangedEventHandler, NavigationCompletedEventHandler,
    NavigationStartingEventHandler, SourceChangedEventHandler,
};
use windows::core::{Error, Interface, HSTRING, PCWSTR, PWSTR};
use windows::Win32::Foundation::{BOOL, E_FAIL, HWND, LPARAM, LRESULT, RECT, WPARAM};
use windows::Win32::System::Com::{CoInitializeEx, CoTaskMemFree, COINIT_APARTMENTTHREADED};
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::UI::WindowsAndMessaging::{
    CreateWindowExW, DefWindowProcW, DestroyWindow, RegisterClassW, ShowWindow, CW_USEDEFAULT,
    SW_HIDE, WINDOW_EX_STYLE, WNDCLASSW, WS_OVERLAPPEDWINDOW,
};

use crate::dispatch::EventSink;
use crate::errors::BackendError;
use crate::events::WebViewEvent;
use crate::plugin::{WebViewPlugin, WEBVIEW_PLUGIN_KEY};
use crate::settings::WebViewSettings;
use crate::state::StateSnapshot;
use crate::webview::{checked_url, NativeWindowHandle, WebView};

const HOST_CLASS_NAME: &str = "EmbedViewWebView2Host";

/// Plugin wrapper for the WebView2 backend.
pub struct WebView2Plugin;

impl WebViewPlugin for WebView2Plugin {
    fn prepare(&self) {
        // Harmless if the thread already joined an apartment.
        let _ = unsafe { CoInitializeEx(None, COINIT_APARTMENTTHREADED) };
    }

    fn create(&self, key: &str) -> Option<Box<dyn WebView>> {
        (key == WEBVIEW_PLUGIN_KEY).then(|| Box::new(WebView2WebView::new()) as Box<dyn WebView>)
    }
}

/// Settings backed by `ICoreWebView2Settings` where WebView2 exposes the
/// knob; the rest are logged no-ops.
pub struct WebView2Settings {
    javascript: bool,
    native: Option<ICoreWebView2Settings>,
}

impl WebView2Settings {
    fn new(native: Option<ICoreWebView2Settings>) -> Self {
        let mut settings = Self {
            javascript: true,
            native,
        };
        settings.set_javascript_enabled(true);
        settings
    }
}

impl WebViewSettings for WebView2Settings {
    fn local_storage_enabled(&self) -> bool {
        // DOM storage is always on in WebView2; the toggle is not exposed.
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
        if let Some(native) = &self.native {
            if let Err(err) = unsafe { native.SetIsScriptEnabled(BOOL::from(enabled)) } {
                warn!(%err, "failed to toggle script execution");
            }
        }
    }

    fn set_local_content_can_access_file_urls(&mut self, _enabled: bool) {
        warn!("local content file-url access toggle not supported by this backend");
    }

    fn set_allow_file_access(&mut self, _enabled: bool) {
        warn!("file access toggle not supported by this backend");
    }
}

struct EventTokens {
    navigation_starting: EventRegistrationToken,
    navigation_completed: EventRegistrationToken,
    title_changed: EventRegistrationToken,
    source_changed: EventRegistrationToken,
    history_changed: EventRegistrationToken,
}

struct NativeParts {
    _environment: ICoreWebView2Environment,
    controller: ICoreWebView2Controller,
    webview: ICoreWebView2,
    hwnd: HWND,
    tokens: EventTokens,
}

/// WebView2 adapter. Construction is synchronous from the caller's point
/// of view; on failure the instance stays windowless.
pub struct WebView2WebView {
    native: Option<NativeParts>,
    sink: EventSink,
    snapshot: StateSnapshot,
    settings: WebView2Settings,
    user_agent: String,
}

impl WebView2WebView {
    pub fn new() -> Self {
        let sink = EventSink::new();
        let native = match build_native(&sink) {
            Ok(parts) => Some(parts),
            Err(err) => {
                warn!(%err, "webview2 construction failed; running windowless");
                None
            }
        };

        let native_settings = native
            .as_ref()
            .and_then(|parts| unsafe { parts.webview.Settings() }.ok());
        let user_agent = native_settings
            .as_ref()
            .and_then(|s| s.cast::<ICoreWebView2Settings2>().ok())
            .map(|s2| {
                let mut agent = PWSTR::null();
                let _ = unsafe { s2.UserAgent(&mut agent) };
                take_pwstr(agent)
            })
            .unwrap_or_default();
        let settings = WebView2Settings::new(native_settings);

        if let Some(parts) = &native {
            debug!(hwnd = parts.hwnd.0 as isize, "webview2 webview created");
        }

        Self {
            native,
            sink,
            snapshot: StateSnapshot::default(),
            settings,
            user_agent,
        }
    }

    fn cookie_manager(&self) -> Option<ICoreWebView2CookieManager> {
        let parts = self.native.as_ref()?;
        let extended: ICoreWebView2_2 = parts.webview.cast().ok()?;
        unsafe { extended.CookieManager() }.ok()
    }
}

impl Default for WebView2WebView {
    fn default() -> Self {
        Self::new()
    }
}

fn take_pwstr(source: PWSTR) -> String {
    if source.is_null() {
        return String::new();
    }
    let value = unsafe { source.to_string() }.unwrap_or_default();
    unsafe { CoTaskMemFree(Some(source.0 as *const _)) };
    value
}

fn current_source(webview: &ICoreWebView2) -> String {
    let mut uri = PWSTR::null();
    if unsafe { webview.Source(&mut uri) }.is_err() {
        return String::new();
    }
    take_pwstr(uri)
}

fn create_environment() -> Result<ICoreWebView2Environment, BackendError> {
    let (tx, rx) = mpsc::channel::<Result<ICoreWebView2Environment, Error>>();

    let handler =
        CreateCoreWebView2EnvironmentCompletedHandler::create(Box::new(move |result, environment| {
            let outcome = match result {
                Ok(()) => environment.ok_or_else(|| Error::from(E_FAIL)),
                Err(err) => Err(err),
            };
            let _ = tx.send(outcome);
            Ok(())
        }));
    unsafe { CreateCoreWebView2EnvironmentWithOptions(PCWSTR::null(), PCWSTR::null(), None, &handler) }
        .map_err(|err| BackendError::EngineInit(format!("webview2 environment: {err}")))?;

    match wait_with_pump(rx) {
        Ok(outcome) => {
            outcome.map_err(|err| BackendError::EngineInit(format!("webview2 environment: {err}")))
        }
        Err(err) => Err(BackendError::EngineInit(format!(
            "webview2 environment wait: {err:?}"
        ))),
    }
}

fn create_controller(
    environment: &ICoreWebView2Environment,
    hwnd: HWND,
) -> Result<ICoreWebView2Controller, BackendError> {
    let (tx, rx) = mpsc::channel::<Result<ICoreWebView2Controller, Error>>();

    let handler =
        CreateCoreWebView2ControllerCompletedHandler::create(Box::new(move |result, controller| {
            let outcome = match result {
                Ok(()) => controller.ok_or_else(|| Error::from(E_FAIL)),
                Err(err) => Err(err),
            };
            let _ = tx.send(outcome);
            Ok(())
        }));
    unsafe { environment.CreateCoreWebView2Controller(hwnd, &handler) }
        .map_err(|err| BackendError::EngineInit(format!("webview2 controller: {err}")))?;

    match wait_with_pump(rx) {
        Ok(outcome) => {
            outcome.map_err(|err| BackendError::EngineInit(format!("webview2 controller: {err}")))
        }
        Err(err) => Err(BackendError::EngineInit(format!(
            "webview2 controller wait: {err:?}"
        ))),
    }
}

fn create_host_window() -> Result<HWND, BackendError> {
    unsafe extern "system" fn host_proc(
        hwnd: HWND,
        msg: u32,
        wparam: WPARAM,
        lparam: LPARAM,
    ) -> LRESULT {
        unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) }
    }

    unsafe {
        let hinstance = GetModuleHandleW(PCWSTR::null())
            .map_err(|err| BackendError::Surface(format!("module handle: {err}")))?;
        let class_name = HSTRING::from(HOST_CLASS_NAME);
        let wnd_class = WNDCLASSW {
            lpfnWndProc: Some(host_proc),
            hInstance: hinstance.into(),
            lpszClassName: PCWSTR(class_name.as_ptr()),
            ..Default::default()
        };
        // Re-registration of an existing class is fine.
        RegisterClassW(&wnd_class);

        let hwnd = CreateWindowExW(
            WINDOW_EX_STYLE::default(),
            PCWSTR(class_name.as_ptr()),
            PCWSTR(class_name.as_ptr()),
            WS_OVERLAPPEDWINDOW,
            CW_USEDEFAULT,
            CW_USEDEFAULT,
            800,
            600,
            None,
            None,
            Some(hinstance.into()),
            None,
        )
        .map_err(|err| BackendError::Surface(format!("host window: {err}")))?;
        let _ = ShowWindow(hwnd, SW_HIDE);
        Ok(hwnd)
    }
}

fn attach_handlers(webview: &ICoreWebView2, sink: &EventSink) -> Result<EventTokens, Error> {
    let mut tokens = EventTokens {
        navigation_starting: EventRegistrationToken::default(),
        navigation_completed: EventRegistrationToken::default(),
        title_changed: EventRegistrationToken::default(),
        source_changed: EventRegistrationToken::default(),
        history_changed: EventRegistrationToken::default(),
    };

    let events = sink.clone();
    let handler = NavigationStartingEventHandler::create(Box::new(move |_webview, args| {
        if let Some(args) = args {
            let mut uri = PWSTR::null();
            unsafe { args.Uri(&mut uri) }?;
            events.load_started(&take_pwstr(uri));
        }
        Ok(())
    }));
    unsafe { webview.add_NavigationStarting(&handler, &mut tokens.navigation_starting) }?;

    let events = sink.clone();
    let handler = NavigationCompletedEventHandler::create(Box::new(move |webview, args| {
        let uri = webview.as_ref().map(current_source).unwrap_or_default();
        let mut success = BOOL::default();
        if let Some(args) = &args {
            unsafe { args.IsSuccess(&mut success) }?;
        }
        if success.as_bool() {
            events.load_finished(Some(&uri));
        } else {
            let mut status = COREWEBVIEW2_WEB_ERROR_STATUS::default();
            if let Some(args) = &args {
                unsafe { args.WebErrorStatus(&mut status) }?;
            }
            if status == COREWEBVIEW2_WEB_ERROR_STATUS_OPERATION_CANCELED {
                // The sink maps this to Stopped when the host asked for it.
                events.load_failed(Some(&uri), "navigation cancelled");
            } else {
                events.load_failed(Some(&uri), &format!("navigation failed: {status:?}"));
            }
        }
        Ok(())
    }));
    unsafe { webview.add_NavigationCompleted(&handler, &mut tokens.navigation_completed) }?;

    let events = sink.clone();
    let handler = DocumentTitleChangedEventHandler::create(Box::new(move |webview, _args| {
        if let Some(webview) = webview {
            let mut title = PWSTR::null();
            unsafe { webview.DocumentTitle(&mut title) }?;
            events.title_changed(&take_pwstr(title));
        }
        Ok(())
    }));
    unsafe { webview.add_DocumentTitleChanged(&handler, &mut tokens.title_changed) }?;

    let events = sink.clone();
    let handler = SourceChangedEventHandler::create(Box::new(move |webview, _args| {
        if let Some(webview) = &webview {
            events.url_changed(&current_source(webview));
        }
        Ok(())
    }));
    unsafe { webview.add_SourceChanged(&handler, &mut tokens.source_changed) }?;

    let events = sink.clone();
    let handler = HistoryChangedEventHandler::create(Box::new(move |webview, _args| {
        if let Some(webview) = &webview {
            let mut back = BOOL::default();
            let mut forward = BOOL::default();
            unsafe {
                webview.CanGoBack(&mut back)?;
                webview.CanGoForward(&mut forward)?;
            }
            events.history_changed(back.as_bool(), forward.as_bool());
        }
        Ok(())
    }));
    unsafe { webview.add_HistoryChanged(&handler, &mut tokens.history_changed) }?;

    Ok(tokens)
}

fn build_native(sink: &EventSink) -> Result<NativeParts, BackendError> {
    let _ = unsafe { CoInitializeEx(None, COINIT_APARTMENTTHREADED) };

    let environment = create_environment()?;
    let hwnd = create_host_window()?;
    let controller = match create_controller(&environment, hwnd) {
        Ok(controller) => controller,
        Err(err) => {
            let _ = unsafe { DestroyWindow(hwnd) };
            return Err(err);
        }
    };

    let bounds = RECT {
        left: 0,
        top: 0,
        right: 800,
        bottom: 600,
    };
    let webview = unsafe {
        controller.SetBounds(bounds)?;
        controller.SetIsVisible(true)?;
        controller.CoreWebView2()
    }
    .map_err(|err| BackendError::EngineInit(format!("webview2 core: {err}")))?;

    let tokens = attach_handlers(&webview, sink)
        .map_err(|err| BackendError::EngineInit(format!("webview2 handlers: {err}")))?;

    Ok(NativeParts {
        _environment: environment,
        controller,
        webview,
        hwnd,
        tokens,
    })
}

impl WebView for WebView2WebView {
    fn set_url(&mut self, url: &str) {
        let Some(url) = checked_url(url) else { return };
        match &self.native {
            Some(parts) => {
                if let Err(err) = unsafe { parts.webview.Navigate(&HSTRING::from(url.as_str())) } {
                    warn!(%err, "navigate call failed");
                }
            }
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
            let _ = unsafe { parts.webview.GoBack() };
        }
    }

    fn go_forward(&mut self) {
        if !self.snapshot.can_go_forward {
            return;
        }
        if let Some(parts) = &self.native {
            let _ = unsafe { parts.webview.GoForward() };
        }
    }

    fn reload(&mut self) {
        if let Some(parts) = &self.native {
            let _ = unsafe { parts.webview.Reload() };
        }
    }

    fn stop(&mut self) {
        if !self.sink.is_loading() {
            return;
        }
        if let Some(parts) = &self.native {
            self.sink.request_stop();
            let _ = unsafe { parts.webview.Stop() };
        }
    }

    fn load_html(&mut self, html: &str, base_url: &str) {
        if !base_url.is_empty() {
            // NavigateToString resolves relative references against
            // about:blank; there is no base-URL override.
            debug!(base_url, "base url ignored by this backend");
        }
        if let Some(parts) = &self.native {
            if let Err(err) = unsafe { parts.webview.NavigateToString(&HSTRING::from(html)) } {
                warn!(%err, "load_html call failed");
            }
        }
    }

    fn http_user_agent(&self) -> String {
        self.user_agent.clone()
    }

    fn set_http_user_agent(&mut self, agent: &str) {
        let extended = self
            .settings
            .native
            .as_ref()
            .and_then(|s| s.cast::<ICoreWebView2Settings2>().ok());
        match extended {
            Some(settings) => {
                if let Err(err) = unsafe { settings.SetUserAgent(&HSTRING::from(agent)) } {
                    warn!(%err, "failed to set user agent");
                } else {
                    self.user_agent = agent.to_string();
                }
            }
            None => warn!("user agent not supported by this webview2 runtime"),
        }
    }

    fn set_cookie(&mut self, domain: &str, name: &str, value: &str) {
        let Some(manager) = self.cookie_manager() else {
            debug!("cookie manager unavailable");
            return;
        };
        let created = unsafe {
            manager.CreateCookie(
                &HSTRING::from(name),
                &HSTRING::from(value),
                &HSTRING::from(domain),
                &HSTRING::from("/"),
            )
        };
        match created {
            Ok(cookie) => {
                if let Err(err) = unsafe { manager.AddOrUpdateCookie(&cookie) } {
                    warn!(%err, domain, name, "failed to store cookie");
                }
            }
            Err(err) => warn!(%err, domain, name, "failed to create cookie"),
        }
    }

    fn delete_cookie(&mut self, domain: &str, name: &str) {
        if let Some(manager) = self.cookie_manager() {
            let result = unsafe {
                manager.DeleteCookiesWithDomainAndPath(
                    &HSTRING::from(name),
                    &HSTRING::from(domain),
                    &HSTRING::from("/"),
                )
            };
            if let Err(err) = result {
                warn!(%err, domain, name, "failed to delete cookie");
            }
        }
    }

    fn delete_all_cookies(&mut self) {
        if let Some(manager) = self.cookie_manager() {
            if let Err(err) = unsafe { manager.DeleteAllCookies() } {
                warn!(%err, "failed to delete cookies");
            }
        }
    }

    fn run_java_script(&mut self, script: &str, callback_id: u64) {
        let Some(parts) = &self.native else {
            self.sink
                .script_result(callback_id, Err("no native engine".into()));
            return;
        };
        let events = self.sink.clone();
        let handler = ExecuteScriptCompletedHandler::create(Box::new(move |error_code, result| {
            match error_code {
                Ok(()) => events.script_result(callback_id, Ok(result)),
                Err(err) => events.script_result(callback_id, Err(err.to_string())),
            }
            Ok(())
        }));
        if let Err(err) = unsafe { parts.webview.ExecuteScript(&HSTRING::from(script), &handler) } {
            warn!(%err, "script execution failed to start");
            self.sink.script_result(callback_id, Err(err.to_string()));
        }
    }

    fn native_window(&self) -> Option<NativeWindowHandle> {
        self.native
            .as_ref()
            .map(|parts| NativeWindowHandle::Win32(parts.hwnd.0 as isize))
    }

    fn set_geometry(&mut self, width: u32, height: u32, device_pixel_ratio: f64) {
        if let Some(parts) = &self.native {
            let bounds = RECT {
                left: 0,
                top: 0,
                right: (width as f64 * device_pixel_ratio).round() as i32,
                bottom: (height as f64 * device_pixel_ratio).round() as i32,
            };
            if let Err(err) = unsafe { parts.controller.SetBounds(bounds) } {
                warn!(%err, "failed to resize webview2 controller");
            }
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

impl Drop for WebView2WebView {
    fn drop(&mut self) {
        let Some(parts) = self.native.take() else {
            return;
        };
        // Teardown order: halt the load, stop event delivery, drop the
        // engine's callbacks, then controller and host window.
        unsafe {
            let _ = parts.webview.Stop();
            self.sink.close();
            let _ = parts
                .webview
                .remove_NavigationStarting(parts.tokens.navigation_starting);
            let _ = parts
                .webview
                .remove_NavigationCompleted(parts.tokens.navigation_completed);
            let _ = parts
                .webview
                .remove_DocumentTitleChanged(parts.tokens.title_changed);
            let _ = parts
                .webview
                .remove_SourceChanged(parts.tokens.source_changed);
            let _ = parts
                .webview
                .remove_HistoryChanged(parts.tokens.history_changed);
            let _ = parts.controller.Close();
            let _ = DestroyWindow(parts.hwnd);
        }
    }
}
