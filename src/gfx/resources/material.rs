//! Material system for PBR rendering
//!
//! Materials are stored centrally in MaterialManager and objects reference
//! them by ID. A material carries its CPU-side image data until GPU
//! resources are (re)built; textures get the device's maximum anisotropic
//! filtering, and a refresh flag marks materials whose GPU state is stale.

use std::collections::HashMap;
use wgpu::Device;

use crate::wgpu_utils::{
    binding_builder::{BindGroupBuilder, BindGroupLayoutBuilder, BindGroupLayoutWithDesc},
    binding_types,
    uniform_buffer::UniformBuffer,
};

use super::texture_resource::TextureResource;

/// Material ID for referencing materials
pub type MaterialId = String;

/// Default environment-reflection strength before any post-processing
pub const DEFAULT_ENV_INTENSITY: f32 = 1.0;

/// Decoded RGBA8 image data awaiting upload
#[derive(Clone)]
pub struct MaterialImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// The texture-bearing properties a material may carry
#[derive(Default, Clone)]
pub struct MaterialMaps {
    pub base_color: Option<MaterialImage>,
    pub metallic_roughness: Option<MaterialImage>,
    pub normal: Option<MaterialImage>,
    pub emissive: Option<MaterialImage>,
}

/// GPU uniform data for materials; must match MaterialUniform in pbr.wgsl
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialUniform {
    pub base_color: [f32; 4],
    // rgb used, w padding
    pub emissive: [f32; 4],
    // metallic, roughness, normal scale, env intensity
    pub params: [f32; 4],
    // which texture slots are populated
    pub texture_flags: [f32; 4],
}

type MaterialUBO = UniformBuffer<MaterialUniform>;

/// Resources shared by every material bind group
///
/// The 1x1 fallbacks stand in for absent texture slots so a single pipeline
/// layout covers textured and untextured materials alike.
pub struct SharedMaterialResources {
    pub white: TextureResource,
    pub flat_normal: TextureResource,
    pub sampler: wgpu::Sampler,
}

impl SharedMaterialResources {
    pub fn new(device: &Device, queue: &wgpu::Queue, anisotropy: u16) -> Self {
        let white = TextureResource::create_from_rgba_data(
            device,
            queue,
            &[255, 255, 255, 255],
            1,
            1,
            "Fallback White",
            1,
        );
        let flat_normal = TextureResource::create_from_rgba_data(
            device,
            queue,
            &[128, 128, 255, 255],
            1,
            1,
            "Fallback Normal",
            1,
        );
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Material Sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            anisotropy_clamp: anisotropy.max(1),
            ..Default::default()
        });
        Self {
            white,
            flat_normal,
            sampler,
        }
    }
}

/// Material bind group management
pub struct MaterialBindings {
    bind_group_layout: BindGroupLayoutWithDesc,
    bind_group: Option<wgpu::BindGroup>,
}

impl MaterialBindings {
    pub fn new(device: &Device) -> Self {
        let bind_group_layout = BindGroupLayoutBuilder::new()
            .next_binding_fragment(binding_types::uniform())
            .next_binding_fragment(binding_types::texture_2d()) // base color
            .next_binding_fragment(binding_types::sampler(wgpu::SamplerBindingType::Filtering))
            .next_binding_fragment(binding_types::texture_2d()) // metallic-roughness
            .next_binding_fragment(binding_types::texture_2d()) // normal
            .next_binding_fragment(binding_types::texture_2d()) // emissive
            .create(device, "Material Bind Group");

        MaterialBindings {
            bind_group_layout,
            bind_group: None,
        }
    }

    pub fn create_bind_group(
        &mut self,
        device: &Device,
        ubo: &MaterialUBO,
        views: [&wgpu::TextureView; 4],
        sampler: &wgpu::Sampler,
    ) {
        self.bind_group = Some(
            BindGroupBuilder::new(&self.bind_group_layout)
                .resource(ubo.binding_resource())
                .texture(views[0])
                .sampler(sampler)
                .texture(views[1])
                .texture(views[2])
                .texture(views[3])
                .create(device, "Material Bind Group"),
        );
    }

    pub fn bind_group_layouts(&self) -> &wgpu::BindGroupLayout {
        &self.bind_group_layout.layout
    }

    pub fn bind_groups(&self) -> Option<&wgpu::BindGroup> {
        self.bind_group.as_ref()
    }
}

/// Uploaded textures kept alive for the material's bind group
#[derive(Default)]
struct MaterialTextures {
    base_color: Option<TextureResource>,
    metallic_roughness: Option<TextureResource>,
    normal: Option<TextureResource>,
    emissive: Option<TextureResource>,
}

/// Material definition with PBR properties
pub struct Material {
    pub name: String,
    pub base_color: [f32; 4],
    pub metallic: f32,
    pub roughness: f32,
    pub normal_scale: f32,
    pub emissive: [f32; 3],
    pub env_intensity: f32,
    pub maps: MaterialMaps,

    needs_refresh: bool,
    textures: MaterialTextures,
    material_ubo: Option<MaterialUBO>,
    material_bindings: Option<MaterialBindings>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: "Default".to_string(),
            base_color: [0.8, 0.8, 0.8, 1.0],
            metallic: 0.0,
            roughness: 0.5,
            normal_scale: 1.0,
            emissive: [0.0, 0.0, 0.0],
            env_intensity: DEFAULT_ENV_INTENSITY,
            maps: MaterialMaps::default(),
            needs_refresh: false,
            textures: MaterialTextures::default(),
            material_ubo: None,
            material_bindings: None,
        }
    }
}

impl Material {
    /// Creates a new material with basic PBR properties
    pub fn new(name: &str, base_color: [f32; 4], metallic: f32, roughness: f32) -> Self {
        Self {
            name: name.to_string(),
            base_color,
            metallic: metallic.clamp(0.0, 1.0),
            roughness: roughness.clamp(0.0, 1.0),
            ..Default::default()
        }
    }

    /// Flags the material's GPU state as stale
    pub fn mark_needs_refresh(&mut self) {
        self.needs_refresh = true;
    }

    pub fn needs_refresh(&self) -> bool {
        self.needs_refresh
    }

    fn build_uniform(&self) -> MaterialUniform {
        MaterialUniform {
            base_color: self.base_color,
            emissive: [self.emissive[0], self.emissive[1], self.emissive[2], 0.0],
            params: [
                self.metallic,
                self.roughness,
                self.normal_scale,
                self.env_intensity,
            ],
            texture_flags: [
                flag(self.maps.base_color.is_some()),
                flag(self.maps.metallic_roughness.is_some()),
                flag(self.maps.normal.is_some()),
                flag(self.maps.emissive.is_some()),
            ],
        }
    }

    /// Creates or refreshes this material's GPU resources
    pub fn update_gpu_resources(
        &mut self,
        device: &Device,
        queue: &wgpu::Queue,
        shared: &SharedMaterialResources,
        anisotropy: u16,
    ) {
        let first_time = self.material_ubo.is_none();
        if !first_time && !self.needs_refresh {
            return;
        }

        if first_time {
            self.textures.base_color = upload(device, queue, &self.maps.base_color, anisotropy);
            self.textures.metallic_roughness =
                upload(device, queue, &self.maps.metallic_roughness, anisotropy);
            self.textures.normal = upload(device, queue, &self.maps.normal, anisotropy);
            self.textures.emissive = upload(device, queue, &self.maps.emissive, anisotropy);
        }

        let uniform = self.build_uniform();
        match self.material_ubo.as_mut() {
            Some(ubo) => ubo.update_content(queue, uniform),
            None => self.material_ubo = Some(MaterialUBO::new_with_data(device, &uniform)),
        }

        let ubo = self.material_ubo.as_ref().unwrap();
        let views = [
            view_or(&self.textures.base_color, &shared.white),
            view_or(&self.textures.metallic_roughness, &shared.white),
            view_or(&self.textures.normal, &shared.flat_normal),
            view_or(&self.textures.emissive, &shared.white),
        ];

        let mut bindings = match self.material_bindings.take() {
            Some(bindings) => bindings,
            None => MaterialBindings::new(device),
        };
        bindings.create_bind_group(device, ubo, views, &shared.sampler);
        self.material_bindings = Some(bindings);

        self.needs_refresh = false;
    }

    /// Returns the bind group for rendering, if GPU resources exist
    pub fn get_bind_group(&self) -> Option<&wgpu::BindGroup> {
        self.material_bindings
            .as_ref()
            .and_then(|bindings| bindings.bind_groups())
    }
}

fn flag(present: bool) -> f32 {
    if present {
        1.0
    } else {
        0.0
    }
}

fn upload(
    device: &Device,
    queue: &wgpu::Queue,
    image: &Option<MaterialImage>,
    anisotropy: u16,
) -> Option<TextureResource> {
    image.as_ref().map(|image| {
        TextureResource::create_from_rgba_data(
            device,
            queue,
            &image.pixels,
            image.width,
            image.height,
            "Material Texture",
            anisotropy,
        )
    })
}

fn view_or<'a>(
    texture: &'a Option<TextureResource>,
    fallback: &'a TextureResource,
) -> &'a wgpu::TextureView {
    texture
        .as_ref()
        .map(|t| &t.view)
        .unwrap_or(&fallback.view)
}

/// Centralized material storage
///
/// Objects reference materials by name; unknown or missing IDs resolve to
/// the default material so draws never fail on a dangling reference.
pub struct MaterialManager {
    materials: HashMap<MaterialId, Material>,
    default_material: Material,
    shared: Option<SharedMaterialResources>,
    anisotropy: u16,
}

impl MaterialManager {
    pub fn new() -> Self {
        Self {
            materials: HashMap::new(),
            default_material: Material::default(),
            shared: None,
            anisotropy: 1,
        }
    }

    /// Sets the anisotropy applied to every texture uploaded from here on
    pub fn set_anisotropy(&mut self, anisotropy: u16) {
        self.anisotropy = anisotropy.max(1);
    }

    pub fn add_material(&mut self, material: Material) {
        self.materials.insert(material.name.clone(), material);
    }

    pub fn get_material(&self, id: &str) -> Option<&Material> {
        self.materials.get(id)
    }

    pub fn get_material_mut(&mut self, id: &str) -> Option<&mut Material> {
        self.materials.get_mut(id)
    }

    pub fn get_material_for_object(&self, material_id: Option<&MaterialId>) -> &Material {
        material_id
            .and_then(|id| self.materials.get(id))
            .unwrap_or(&self.default_material)
    }

    pub fn list_materials(&self) -> Vec<&MaterialId> {
        self.materials.keys().collect()
    }

    pub fn material_count(&self) -> usize {
        self.materials.len()
    }

    /// Creates or refreshes GPU resources for every stale material
    pub fn update_all_gpu_resources(&mut self, device: &Device, queue: &wgpu::Queue) {
        let shared = self
            .shared
            .get_or_insert_with(|| SharedMaterialResources::new(device, queue, self.anisotropy));

        self.default_material
            .update_gpu_resources(device, queue, shared, self.anisotropy);
        for material in self.materials.values_mut() {
            material.update_gpu_resources(device, queue, shared, self.anisotropy);
        }
    }
}

impl Default for MaterialManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_ids_resolve_to_the_default_material() {
        let manager = MaterialManager::new();
        let id = "missing".to_string();
        let material = manager.get_material_for_object(Some(&id));
        assert_eq!(material.name, "Default");
        assert_eq!(manager.get_material_for_object(None).name, "Default");
    }

    #[test]
    fn refresh_flag_round_trips() {
        let mut material = Material::new("test", [1.0, 0.0, 0.0, 1.0], 0.0, 0.5);
        assert!(!material.needs_refresh());
        material.mark_needs_refresh();
        assert!(material.needs_refresh());
    }

    #[test]
    fn uniform_reflects_texture_slots() {
        let mut material = Material::new("test", [1.0; 4], 0.2, 0.7);
        material.maps.base_color = Some(MaterialImage {
            width: 1,
            height: 1,
            pixels: vec![255; 4],
        });
        let uniform = material.build_uniform();
        assert_eq!(uniform.texture_flags, [1.0, 0.0, 0.0, 0.0]);
        assert_eq!(uniform.params[0], 0.2);
        assert_eq!(uniform.params[1], 0.7);
    }

    #[test]
    fn factors_are_clamped() {
        let material = Material::new("test", [1.0; 4], 2.0, -1.0);
        assert_eq!(material.metallic, 1.0);
        assert_eq!(material.roughness, 0.0);
    }
}
