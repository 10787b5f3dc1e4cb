//! Platform-neutral embedded web view.
//!
//! Hides three native browser engines behind one contract:
//! - WebKitGTK on Linux (GTK plug / XEmbed surface)
//! - WebView2 on Windows (hidden host window + COM controller)
//! - WKWebView on macOS (NSView surface)
//!
//! Hosts ask the [`factory`] for a [`WebView`], embed the
//! [`NativeWindowHandle`] it exposes, and observe canonical
//! [`WebViewEvent`]s drained on the owning thread. Native callbacks never
//! mutate state directly; they are queued and redelivered in order. When no
//! backend is compiled in (or native construction fails at the plugin
//! level) the factory degrades to an inert [`NullWebView`].

pub mod backend;
pub mod errors;
pub mod events;
pub mod factory;
pub mod null;
pub mod plugin;
pub mod settings;
pub mod webview;

mod dispatch;
mod state;

pub use errors::BackendError;
pub use events::{LoadEvent, LoadStatus, WebViewEvent};
pub use factory::{create_web_view, platform_plugin};
pub use null::{NullSettings, NullWebView};
pub use plugin::{WebViewPlugin, WEBVIEW_PLUGIN_KEY};
pub use settings::WebViewSettings;
pub use webview::{NativeWindowHandle, WebView};
