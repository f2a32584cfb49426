//! Global uniform bindings for camera, lighting, and frame parameters
//!
//! Manages the per-frame uniform buffer shared across all pipelines:
//! camera matrices, the fixed lighting rig, and render parameters like
//! exposure and shadow bias. Bound at slot 0 everywhere.

use crate::{
    gfx::camera::camera_utils::CameraUniform,
    gfx::lighting::{LightingRig, SHADOW_DEPTH_BIAS, SHADOW_MAP_SIZE},
    wgpu_utils::{
        binding_builder::{BindGroupBuilder, BindGroupLayoutBuilder, BindGroupLayoutWithDesc},
        binding_types,
        uniform_buffer::UniformBuffer,
    },
};

/// Global uniform buffer content structure
///
/// MUST match the GlobalUniform struct in the shaders exactly.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GlobalUBOContent {
    // Camera
    view_position: [f32; 4],
    view_proj: [[f32; 4]; 4],

    // Key light's matrix for the shadow pass
    light_view_proj: [[f32; 4]; 4],

    // Lighting rig: rgb + intensity / direction + intensity packing
    ambient: [f32; 4],
    sun_direction: [f32; 4],
    spot_position: [f32; 4],
    spot_direction: [f32; 4],

    // exposure, shadow bias, shadow texel size, environment mip count
    render_params: [f32; 4],
}

/// Type alias for the global uniform buffer
pub type GlobalUBO = UniformBuffer<GlobalUBOContent>;

/// Updates the global uniform buffer with camera, rig, and frame data
///
/// Called once per frame before encoding; the buffer write is skipped when
/// nothing changed.
pub fn update_global_ubo(
    ubo: &mut GlobalUBO,
    queue: &wgpu::Queue,
    camera: CameraUniform,
    rig: &LightingRig,
    exposure: f32,
    env_mip_count: u32,
) {
    let sun = rig.sun_direction();
    let spot_dir = rig.spot_direction();

    let content = GlobalUBOContent {
        view_position: camera.view_position,
        view_proj: camera.view_proj,
        light_view_proj: rig.light_view_proj().into(),
        ambient: [
            rig.ambient.color[0],
            rig.ambient.color[1],
            rig.ambient.color[2],
            rig.ambient.intensity,
        ],
        sun_direction: [sun.x, sun.y, sun.z, rig.directional.intensity],
        spot_position: [
            rig.spot.position[0],
            rig.spot.position[1],
            rig.spot.position[2],
            rig.spot.intensity,
        ],
        spot_direction: [
            spot_dir.x,
            spot_dir.y,
            spot_dir.z,
            rig.spot.cos_outer_angle,
        ],
        render_params: [
            exposure,
            SHADOW_DEPTH_BIAS,
            1.0 / SHADOW_MAP_SIZE as f32,
            env_mip_count as f32,
        ],
    };

    ubo.update_content(queue, content);
}

/// Manages bind group layouts and bind groups for global uniforms
pub struct GlobalBindings {
    bind_group_layout: BindGroupLayoutWithDesc,
    bind_group: Option<wgpu::BindGroup>,
}

impl GlobalBindings {
    pub fn new(device: &wgpu::Device) -> Self {
        let bind_group_layout = BindGroupLayoutBuilder::new()
            .next_binding_rendering(binding_types::uniform()) // Global uniforms (camera + lights)
            .create(device, "Globals Bind Group");

        GlobalBindings {
            bind_group_layout,
            bind_group: None,
        }
    }

    /// Creates the bind group with the provided uniform buffer
    ///
    /// Must be called after the uniform buffer is created and before any
    /// rendering operations that need global uniforms.
    pub fn create_bind_group(&mut self, device: &wgpu::Device, ubo: &GlobalUBO) {
        self.bind_group = Some(
            BindGroupBuilder::new(&self.bind_group_layout)
                .resource(ubo.binding_resource())
                .create(device, "Global Bind Group"),
        );
    }

    pub fn bind_group_layouts(&self) -> &wgpu::BindGroupLayout {
        &self.bind_group_layout.layout
    }

    /// # Panics
    /// Panics if `create_bind_group()` hasn't been called yet
    pub fn bind_groups(&self) -> &wgpu::BindGroup {
        self.bind_group
            .as_ref()
            .expect("Bind group has not been created yet!")
    }
}
