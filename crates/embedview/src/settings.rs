//! Per-backend configurable knobs.

/// Settings owned by exactly one WebView for its lifetime.
///
/// Each attribute is an independent boolean. Backends that cannot honor a
/// setter log a single diagnostic and leave the stored value unchanged —
/// they never fail the call.
pub trait WebViewSettings {
    fn local_storage_enabled(&self) -> bool;
    fn javascript_enabled(&self) -> bool;
    fn local_content_can_access_file_urls(&self) -> bool;
    fn allow_file_access(&self) -> bool;

    fn set_local_storage_enabled(&mut self, enabled: bool);
    fn set_javascript_enabled(&mut self, enabled: bool);
    fn set_local_content_can_access_file_urls(&mut self, enabled: bool);
    fn set_allow_file_access(&mut self, enabled: bool);
}
