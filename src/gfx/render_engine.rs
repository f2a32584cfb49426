//! WGPU-based rendering engine for the viewer
//!
//! Owns the surface, device, and the two render passes: a depth-only shadow
//! pass from the key light, then the main PBR pass with the overlay drawn
//! on top. Output is filmic tone mapped at a fixed exposure.

use std::sync::Arc;

use wgpu::{Device, TextureFormat};

use crate::{
    error::ViewerError,
    gfx::{
        camera::camera_utils::CameraUniform,
        environment::CubemapData,
        lighting::{LightingRig, SHADOW_MAP_SIZE},
        pipeline_manager::{PipelineConfig, PipelineManager},
        resources::{
            global_bindings::{update_global_ubo, GlobalBindings, GlobalUBO},
            texture_resource::TextureResource,
        },
        scene::{object::DrawObject, scene::Scene, Object},
    },
    probe::GpuCapabilities,
    wgpu_utils::{
        binding_builder::{BindGroupBuilder, BindGroupLayoutBuilder},
        binding_types,
    },
};

/// Fixed exposure multiplier applied before tone mapping
///
/// Lowered from the 1.0 default so the filmic curve does not clip
/// highlights on reflective materials.
pub const EXPOSURE: f32 = 0.6;

/// Core rendering engine managing GPU resources and draw calls
pub struct RenderEngine {
    surface: wgpu::Surface<'static>,
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    config: wgpu::SurfaceConfiguration,
    depth_texture: TextureResource,
    format: TextureFormat,
    pub pipeline_manager: PipelineManager,
    global_ubo: GlobalUBO,
    global_bindings: GlobalBindings,

    // Shadow mapping
    shadow_depth_texture: TextureResource,

    // Shadow map + environment cubemap, bound together at slot 3
    frame_bind_group: wgpu::BindGroup,
    _environment: TextureResource,
    env_mip_count: u32,
}

impl RenderEngine {
    /// Creates a render engine for the given window
    ///
    /// Configures the swapchain at the viewport size, allocates depth and
    /// shadow resources, uploads the environment map, and builds both
    /// pipelines up front so configuration errors surface here rather than
    /// at first draw.
    pub async fn new(
        window: impl Into<wgpu::SurfaceTarget<'static>>,
        width: u32,
        height: u32,
        capabilities: &GpuCapabilities,
        environment: &CubemapData,
    ) -> Result<RenderEngine, ViewerError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance
            .create_surface(window)
            .map_err(|e| ViewerError::Initialization(e.to_string()))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| ViewerError::Initialization(e.to_string()))?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Viewer Device"),
                required_features: wgpu::Features::default(),
                required_limits: wgpu::Limits {
                    // The shadow map must fit; the probe guaranteed it does.
                    max_texture_dimension_2d: SHADOW_MAP_SIZE
                        .min(capabilities.max_texture_dimension_2d),
                    ..wgpu::Limits::downlevel_defaults()
                },
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .map_err(|e| ViewerError::Initialization(e.to_string()))?;

        let surface_capabilities = surface.get_capabilities(&adapter);
        // Non-sRGB swapchain; the shader does the display encoding itself.
        let format = surface_capabilities
            .formats
            .iter()
            .copied()
            .find(|f| !f.is_srgb())
            .unwrap_or(surface_capabilities.formats[0]);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width,
            height,
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_capabilities.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let depth_texture =
            TextureResource::create_depth_texture(&device, &config, "depth_texture");
        let shadow_depth_texture = TextureResource::create_shadow_map(&device, SHADOW_MAP_SIZE);

        let environment_texture = environment.upload(&device, &queue);
        let env_mip_count = environment.mip_count();

        let frame_layout = BindGroupLayoutBuilder::new()
            .next_binding_fragment(binding_types::depth_texture_2d())
            .next_binding_fragment(binding_types::sampler(wgpu::SamplerBindingType::Comparison))
            .next_binding_fragment(binding_types::texture_cube())
            .next_binding_fragment(binding_types::sampler(wgpu::SamplerBindingType::Filtering))
            .create(&device, "Frame Resources Bind Group");

        let frame_bind_group = BindGroupBuilder::new(&frame_layout)
            .texture(&shadow_depth_texture.view)
            .sampler(&shadow_depth_texture.sampler)
            .texture(&environment_texture.view)
            .sampler(&environment_texture.sampler)
            .create(&device, "Frame Resources Bind Group");

        let global_ubo = GlobalUBO::new(&device);
        let mut global_bindings = GlobalBindings::new(&device);
        global_bindings.create_bind_group(&device, &global_ubo);

        let transform_bind_group_layout = Object::bind_group_layout(&device);

        // Temporary bindings just to obtain the material layout
        let temp_material_bindings =
            crate::gfx::resources::material::MaterialBindings::new(&device);
        let material_bind_group_layout = temp_material_bindings.bind_group_layouts().clone();

        let device_handle: Arc<Device> = device.into();
        let queue_handle: Arc<wgpu::Queue> = queue.into();
        let mut pipeline_manager = PipelineManager::new(device_handle.clone());

        pipeline_manager.load_shader("pbr", include_str!("shaders/pbr.wgsl"));
        pipeline_manager.load_shader("shadow", include_str!("shaders/shadow_pass.wgsl"));

        // Shadow depth pass - no culling to prevent light leaks
        pipeline_manager.register_pipeline(
            "Shadow",
            PipelineConfig::default()
                .with_label("SHADOW")
                .with_shader("shadow")
                .with_vertex_only()
                .with_depth_stencil(shadow_depth_texture.texture.clone())
                .with_cull_mode(None)
                .with_bind_group_layouts(vec![
                    global_bindings.bind_group_layouts().clone(),
                    transform_bind_group_layout.clone(),
                ])
                .with_color_targets(vec![]),
        );

        pipeline_manager.register_pipeline(
            "PBR",
            PipelineConfig::default()
                .with_label("PBR")
                .with_shader("pbr")
                .with_depth_stencil(depth_texture.texture.clone())
                .with_bind_group_layouts(vec![
                    global_bindings.bind_group_layouts().clone(),
                    transform_bind_group_layout,
                    material_bind_group_layout,
                    frame_layout.layout,
                ])
                .with_color_targets(vec![Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })]),
        );

        pipeline_manager
            .create_all_pipelines()
            .map_err(|errors| ViewerError::Initialization(errors.join("; ")))?;

        Ok(RenderEngine {
            device: device_handle,
            config,
            format,
            surface,
            queue: queue_handle,
            depth_texture,
            pipeline_manager,
            global_bindings,
            global_ubo,
            shadow_depth_texture,
            frame_bind_group,
            _environment: environment_texture,
            env_mip_count,
        })
    }

    /// Renders one frame: shadow pass, main pass, then the overlay
    ///
    /// Surface loss is handled by reconfiguring and skipping the frame;
    /// a running render loop never dies here.
    pub fn render_frame<F>(&mut self, scene: &Scene, ui_callback: Option<F>)
    where
        F: FnOnce(&wgpu::Device, &wgpu::Queue, &mut wgpu::CommandEncoder, &wgpu::TextureView),
    {
        let surface_texture = match self.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.surface.configure(&self.device, &self.config);
                return;
            }
            Err(e) => {
                log::warn!("skipping frame: {}", e);
                return;
            }
        };

        let surface_texture_view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        // PASS 1: Shadow depth from the key light
        {
            let mut shadow_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Shadow Depth Pass"),
                color_attachments: &[],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.shadow_depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            shadow_pass.set_bind_group(0, self.global_bindings.bind_groups(), &[]);

            if let Some(shadow_pipeline) = self.pipeline_manager.get_pipeline("Shadow") {
                shadow_pass.set_pipeline(shadow_pipeline);
                for object in scene.objects.iter() {
                    if object.visible && object.cast_shadows {
                        shadow_pass.draw_object(object);
                    }
                }
            }
        }

        // PASS 2: Main rendering with shadows and environment
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Main Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &surface_texture_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: 0.08,
                            g: 0.09,
                            b: 0.11,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            render_pass.set_bind_group(0, self.global_bindings.bind_groups(), &[]);
            render_pass.set_bind_group(3, &self.frame_bind_group, &[]);

            if let Some(pipeline) = self.pipeline_manager.get_pipeline("PBR") {
                render_pass.set_pipeline(pipeline);

                for object in scene.objects.iter() {
                    if !object.visible {
                        continue;
                    }
                    let material = scene.get_material_for_object(object);
                    if let Some(material_bind_group) = material.get_bind_group() {
                        render_pass.set_bind_group(2, material_bind_group, &[]);
                        render_pass.draw_object(object);
                    } else {
                        log::debug!(
                            "skipping '{}' - material '{}' has no GPU resources",
                            object.name,
                            material.name
                        );
                    }
                }
            }
        }

        // PASS 3: Overlay (status banner, progress)
        if let Some(ui_callback) = ui_callback {
            ui_callback(
                &self.device,
                &self.queue,
                &mut encoder,
                &surface_texture_view,
            );
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        surface_texture.present();
    }

    /// Updates the per-frame global uniforms
    pub fn update(&mut self, camera_uniform: CameraUniform, rig: &LightingRig) {
        update_global_ubo(
            &mut self.global_ubo,
            &self.queue,
            camera_uniform,
            rig,
            EXPOSURE,
            self.env_mip_count,
        );
    }

    /// Resizes the surface and recreates the depth buffer
    ///
    /// Zero-sized events are ignored and identical sizes are a no-op, so
    /// repeated resize events are idempotent. Shadow map resolution is
    /// fixed and unaffected.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        if width == self.config.width && height == self.config.height {
            return;
        }

        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);

        self.depth_texture =
            TextureResource::create_depth_texture(&self.device, &self.config, "depth_texture");
    }

    /// Returns current surface dimensions
    pub fn get_surface_size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Shared handle to the device, for resource creation outside the engine
    pub fn device_arc(&self) -> Arc<wgpu::Device> {
        self.device.clone()
    }

    /// Shared handle to the queue
    pub fn queue_arc(&self) -> Arc<wgpu::Queue> {
        self.queue.clone()
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.format
    }
}
