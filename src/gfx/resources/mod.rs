//! GPU resource management
//!
//! Materials, textures, and the global uniform plumbing shared by every
//! render pipeline.

pub mod global_bindings;
pub mod material;
pub mod texture_resource;

pub use global_bindings::{GlobalBindings, GlobalUBO};
pub use material::{Material, MaterialId, MaterialManager};
pub use texture_resource::TextureResource;
