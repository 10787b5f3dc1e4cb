//! Internal error taxonomy for backend construction.
//!
//! These never cross the contract boundary: a failed construction step is
//! logged and the adapter degrades to a windowless instance
//! (`native_window()` returns `None`). Navigation failures travel as
//! `Failed` load events, not as errors.

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("native engine initialization failed: {0}")]
    EngineInit(String),

    #[error("embedding surface creation failed: {0}")]
    Surface(String),

    #[error("not supported: {0}")]
    NotSupported(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_error_display() {
        let err = BackendError::EngineInit("gtk_init failed".into());
        assert_eq!(
            err.to_string(),
            "native engine initialization failed: gtk_init failed"
        );

        let err = BackendError::Surface("plug has no window id".into());
        assert_eq!(
            err.to_string(),
            "embedding surface creation failed: plug has no window id"
        );

        let err = BackendError::NotSupported("cookie store".into());
        assert_eq!(err.to_string(), "not supported: cookie store");
    }
}
