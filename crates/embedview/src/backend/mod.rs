//! Platform backend adapters.
//!
//! One adapter per target, gated on both the target OS and a cargo
//! feature. Each adapter owns exactly one native engine instance and one
//! embedding surface, both created synchronously during construction; a
//! failure at any step degrades to a windowless instance instead of an
//! error.

#[cfg(all(target_os = "linux", feature = "webkitgtk"))]
pub mod linux;

#[cfg(all(target_os = "windows", feature = "webview2"))]
pub mod windows;

#[cfg(all(target_os = "macos", feature = "wkwebview"))]
pub mod macos;
