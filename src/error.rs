//! Viewer error taxonomy
//!
//! Three failure classes with different blast radii: missing GPU capability
//! and renderer initialization failures are fatal for the 3D experience,
//! asset load failures leave the render loop running with an empty scene.

use thiserror::Error;

/// Errors produced by the viewer's setup and loading stages
#[derive(Debug, Error)]
pub enum ViewerError {
    /// No hardware-accelerated adapter is available. Fatal; nothing else
    /// gets initialized after this is reported.
    #[error("no compatible graphics adapter: {0}")]
    CapabilityUnavailable(String),

    /// Surface, device, or pipeline construction failed after a successful
    /// probe. Fatal for the 3D experience.
    #[error("renderer initialization failed: {0}")]
    Initialization(String),

    /// The model file could not be read or decoded. Non-fatal; the scene
    /// stays lit and the loop keeps running.
    #[error("asset load failed: {0}")]
    AssetLoad(String),
}

impl ViewerError {
    /// Whether this failure must prevent the render loop from starting
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ViewerError::AssetLoad(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_failures_are_not_fatal() {
        assert!(ViewerError::CapabilityUnavailable("x".into()).is_fatal());
        assert!(ViewerError::Initialization("x".into()).is_fatal());
        assert!(!ViewerError::AssetLoad("x".into()).is_fatal());
    }

    #[test]
    fn messages_carry_the_underlying_cause() {
        let err = ViewerError::AssetLoad("unexpected end of file".into());
        assert!(err.to_string().contains("unexpected end of file"));
    }
}
