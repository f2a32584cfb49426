//! Asset loading and normalization
//!
//! The load pipeline: fetch bytes on a worker thread → decode via the
//! `gltf` crate → post-process materials and shadow flags → recenter and
//! rescale to the canonical viewing size → attach to the scene. The last
//! three steps all happen within a single event-loop turn.

pub mod loader;
pub mod normalize;

pub use loader::{AssetLoader, DecodedAsset, LoadEvent};
pub use normalize::{normalize_objects, world_aabb, Aabb, NormalizeReport};
