// src/lib.rs
//! Plinth 3D Model Viewer
//!
//! A single-window model viewer built on wgpu and winit. It probes for a
//! hardware adapter, sets up a fixed lighting rig with soft shadows and an
//! environment map, loads one binary glTF asset in the background,
//! normalizes it to a canonical viewing size, and runs an orbit-camera
//! render loop until the window closes.

pub mod app;
pub mod assets;
pub mod error;
pub mod gfx;
pub mod probe;
pub mod session;
pub mod ui;
pub mod wgpu_utils;

// Re-export main types for convenience
pub use app::{ViewerApp, DEFAULT_MODEL_PATH};
pub use error::ViewerError;

/// Creates a viewer for the model at `model_path`
pub fn viewer(model_path: &str) -> Result<ViewerApp, ViewerError> {
    ViewerApp::new(model_path)
}
