//! # Graphics Module
//!
//! All graphics-related functionality for the viewer: the orbit camera and
//! its damped controller, the scene root, the fixed lighting rig and
//! environment map, GPU resource management, and the render engine that
//! ties them together.

pub mod camera;
pub mod environment;
pub mod lighting;
pub mod pipeline_manager;
pub mod render_engine;
pub mod resources;
pub mod scene;

// Re-export commonly used types
pub use camera::orbit_camera::OrbitCamera;
pub use render_engine::RenderEngine;
pub use scene::Scene;
