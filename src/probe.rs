//! GPU capability probing
//!
//! Runs before any window or surface exists and gates the whole viewer: if
//! no hardware adapter can be acquired, initialization stops at a single
//! reported error. The effectful part (`probe`) is a thin shell around the
//! pure `GpuCapabilities` descriptor so the gating logic itself is
//! unit-testable without a GPU.

use crate::error::ViewerError;
use crate::gfx::lighting::SHADOW_MAP_SIZE;

/// Anisotropy ceiling defined by the WebGPU sampler model
pub const MAX_SAMPLER_ANISOTROPY: u16 = 16;

/// Descriptor of the adapter the viewer would run on
///
/// A plain value: constructing one in tests does not touch the GPU.
#[derive(Debug, Clone)]
pub struct GpuCapabilities {
    pub adapter_name: String,
    pub backend: String,
    pub max_texture_dimension_2d: u32,
    pub max_sampler_anisotropy: u16,
}

impl GpuCapabilities {
    /// Whether the adapter can host the viewer's fixed resource budget
    ///
    /// The shadow map is the largest fixed allocation; an adapter that
    /// cannot hold it is treated the same as no adapter at all.
    pub fn supports_viewer(&self) -> bool {
        self.max_texture_dimension_2d >= SHADOW_MAP_SIZE
    }
}

/// Probes for a hardware-accelerated adapter
///
/// Creates a throwaway instance, requests an adapter with no surface and no
/// software fallback, and distills its limits into a [`GpuCapabilities`]
/// value. Nothing is retained; the instance and adapter drop on return.
pub fn probe() -> Result<GpuCapabilities, ViewerError> {
    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        ..Default::default()
    });

    let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: wgpu::PowerPreference::default(),
        compatible_surface: None,
        force_fallback_adapter: false,
    }))
    .map_err(|e| ViewerError::CapabilityUnavailable(e.to_string()))?;

    let info = adapter.get_info();
    let limits = adapter.limits();

    let capabilities = GpuCapabilities {
        adapter_name: info.name,
        backend: format!("{:?}", info.backend),
        max_texture_dimension_2d: limits.max_texture_dimension_2d,
        max_sampler_anisotropy: MAX_SAMPLER_ANISOTROPY,
    };

    log::info!(
        "probed adapter '{}' ({}), max 2d texture {}",
        capabilities.adapter_name,
        capabilities.backend,
        capabilities.max_texture_dimension_2d
    );

    if !capabilities.supports_viewer() {
        return Err(ViewerError::CapabilityUnavailable(format!(
            "adapter '{}' cannot hold a {}x{} shadow map",
            capabilities.adapter_name, SHADOW_MAP_SIZE, SHADOW_MAP_SIZE
        )));
    }

    Ok(capabilities)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(max_dim: u32) -> GpuCapabilities {
        GpuCapabilities {
            adapter_name: "test adapter".to_string(),
            backend: "Vulkan".to_string(),
            max_texture_dimension_2d: max_dim,
            max_sampler_anisotropy: MAX_SAMPLER_ANISOTROPY,
        }
    }

    #[test]
    fn shadow_map_budget_gates_support() {
        assert!(descriptor(SHADOW_MAP_SIZE).supports_viewer());
        assert!(descriptor(8192).supports_viewer());
        assert!(!descriptor(SHADOW_MAP_SIZE - 1).supports_viewer());
        assert!(!descriptor(2048).supports_viewer());
    }
}
