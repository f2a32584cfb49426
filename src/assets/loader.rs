//! Asset loading
//!
//! Fetches one binary glTF file on a worker thread, streams byte-level
//! progress, and delegates decoding to the `gltf` crate. The decoded,
//! CPU-only asset is handed back over a channel and turned into scene
//! objects on the event-loop thread, so the render loop never blocks on
//! I/O and never observes a half-built asset.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, Sender};

use cgmath::{Matrix4, SquareMatrix};

use crate::gfx::resources::material::{
    Material, MaterialImage, MaterialMaps, DEFAULT_ENV_INTENSITY,
};
use crate::gfx::scene::object::{Mesh, Object};

/// Environment-reflection boost applied to every loaded material
///
/// Compensates for the lowered render exposure.
pub const ENV_INTENSITY_BOOST: f32 = 1.5;

const READ_CHUNK_SIZE: usize = 64 * 1024;

/// Events delivered by the loader worker, drained once per frame
pub enum LoadEvent {
    /// Fraction of the file read so far, in [0, 1]. Advisory only.
    Progress(f32),
    Loaded(Box<DecodedAsset>),
    Failed(String),
}

/// One mesh primitive flattened out of the node hierarchy
pub struct DecodedPrimitive {
    pub name: String,
    pub positions: Vec<f32>,
    pub normals: Vec<f32>,
    pub uvs: Vec<f32>,
    pub indices: Vec<u32>,
    pub material_index: Option<usize>,
    pub transform: Matrix4<f32>,
}

/// Material factors and decoded image data, not yet on the GPU
pub struct DecodedMaterial {
    pub name: String,
    pub base_color: [f32; 4],
    pub metallic: f32,
    pub roughness: f32,
    pub emissive: [f32; 3],
    pub normal_scale: f32,
    pub maps: MaterialMaps,
}

/// The complete decoded asset graph, CPU-side only
pub struct DecodedAsset {
    pub name: String,
    pub primitives: Vec<DecodedPrimitive>,
    pub materials: Vec<DecodedMaterial>,
}

/// Handle to an in-flight load
///
/// At most one load is issued per session; there is no cancellation.
pub struct AssetLoader {
    receiver: Receiver<LoadEvent>,
}

impl AssetLoader {
    /// Spawns the worker thread and starts loading immediately
    pub fn spawn(path: PathBuf) -> Self {
        let (sender, receiver) = channel();
        std::thread::Builder::new()
            .name("asset-loader".to_string())
            .spawn(move || run_load(&path, &sender))
            .expect("Failed to spawn asset loader thread");
        Self { receiver }
    }

    /// Drains every event delivered since the last poll, without blocking
    pub fn poll(&mut self) -> Vec<LoadEvent> {
        self.receiver.try_iter().collect()
    }
}

fn run_load(path: &Path, sender: &Sender<LoadEvent>) {
    let name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "model".to_string());

    let result = read_with_progress(path, sender).and_then(|bytes| decode_glb(&name, &bytes));

    // Send errors are ignored: a dropped receiver means the session ended.
    let _ = match result {
        Ok(asset) => sender.send(LoadEvent::Loaded(Box::new(asset))),
        Err(message) => sender.send(LoadEvent::Failed(message)),
    };
}

/// Reads the whole file, reporting bytes-loaded / bytes-total as it goes
fn read_with_progress(path: &Path, sender: &Sender<LoadEvent>) -> Result<Vec<u8>, String> {
    let mut file = File::open(path).map_err(|e| format!("{}: {}", path.display(), e))?;
    let total = file
        .metadata()
        .map(|metadata| metadata.len())
        .unwrap_or(0);

    let mut bytes = Vec::with_capacity(total as usize);
    let mut chunk = vec![0u8; READ_CHUNK_SIZE];
    loop {
        let read = file
            .read(&mut chunk)
            .map_err(|e| format!("{}: {}", path.display(), e))?;
        if read == 0 {
            break;
        }
        bytes.extend_from_slice(&chunk[..read]);
        let fraction = if total > 0 {
            (bytes.len() as f32 / total as f32).min(1.0)
        } else {
            1.0
        };
        let _ = sender.send(LoadEvent::Progress(fraction));
    }

    Ok(bytes)
}

/// Decodes a binary glTF payload into a CPU-side asset graph
///
/// Decoding itself is entirely the `gltf` crate's job; this walks the
/// decoded document, flattens the node hierarchy into world-transformed
/// primitives, and converts material images to RGBA8.
pub fn decode_glb(name: &str, bytes: &[u8]) -> Result<DecodedAsset, String> {
    let (document, buffers, images) =
        gltf::import_slice(bytes).map_err(|e| e.to_string())?;

    let mut primitives = Vec::new();
    let scene = document
        .default_scene()
        .or_else(|| document.scenes().next())
        .ok_or_else(|| "model contains no scene".to_string())?;

    for node in scene.nodes() {
        collect_primitives(&node, Matrix4::identity(), &buffers, &mut primitives);
    }

    if primitives.iter().all(|p| p.positions.is_empty()) {
        return Err("model contains no mesh geometry".to_string());
    }

    let materials = document
        .materials()
        .enumerate()
        .map(|(index, material)| decode_material(index, &material, &images))
        .collect();

    Ok(DecodedAsset {
        name: name.to_string(),
        primitives,
        materials,
    })
}

fn collect_primitives(
    node: &gltf::Node,
    parent: Matrix4<f32>,
    buffers: &[gltf::buffer::Data],
    out: &mut Vec<DecodedPrimitive>,
) {
    let transform = parent * Matrix4::from(node.transform().matrix());

    if let Some(mesh) = node.mesh() {
        let node_name = node
            .name()
            .or_else(|| mesh.name())
            .unwrap_or("mesh")
            .to_string();

        for primitive in mesh.primitives() {
            let reader = primitive.reader(|buffer| {
                buffers.get(buffer.index()).map(|data| data.0.as_slice())
            });

            let positions: Vec<f32> = reader
                .read_positions()
                .map(|iter| iter.flatten().collect())
                .unwrap_or_default();
            if positions.is_empty() {
                continue;
            }

            let normals: Vec<f32> = reader
                .read_normals()
                .map(|iter| iter.flatten().collect())
                .unwrap_or_default();
            let uvs: Vec<f32> = reader
                .read_tex_coords(0)
                .map(|coords| coords.into_f32().flatten().collect())
                .unwrap_or_default();
            let indices: Vec<u32> = match reader.read_indices() {
                Some(indices) => indices.into_u32().collect(),
                // Unindexed geometry draws as a plain triangle list.
                None => (0..(positions.len() / 3) as u32).collect(),
            };

            out.push(DecodedPrimitive {
                name: node_name.clone(),
                positions,
                normals,
                uvs,
                indices,
                material_index: primitive.material().index(),
                transform,
            });
        }
    }

    for child in node.children() {
        collect_primitives(&child, transform, buffers, out);
    }
}

fn decode_material(
    index: usize,
    material: &gltf::Material,
    images: &[gltf::image::Data],
) -> DecodedMaterial {
    let pbr = material.pbr_metallic_roughness();

    let image_at = |texture: Option<gltf::texture::Texture>| -> Option<MaterialImage> {
        texture
            .and_then(|texture| images.get(texture.source().index()))
            .and_then(to_rgba8)
    };

    DecodedMaterial {
        name: material
            .name()
            .map(|name| name.to_string())
            .unwrap_or_else(|| format!("material_{}", index)),
        base_color: pbr.base_color_factor(),
        metallic: pbr.metallic_factor(),
        roughness: pbr.roughness_factor(),
        emissive: material.emissive_factor(),
        normal_scale: material
            .normal_texture()
            .map(|normal| normal.scale())
            .unwrap_or(1.0),
        maps: MaterialMaps {
            base_color: image_at(pbr.base_color_texture().map(|info| info.texture())),
            metallic_roughness: image_at(
                pbr.metallic_roughness_texture().map(|info| info.texture()),
            ),
            normal: image_at(material.normal_texture().map(|normal| normal.texture())),
            emissive: image_at(material.emissive_texture().map(|info| info.texture())),
        },
    }
}

/// Converts a decoded image to RGBA8, the only format uploaded to the GPU
fn to_rgba8(data: &gltf::image::Data) -> Option<MaterialImage> {
    use gltf::image::Format;

    let pixel_count = (data.width * data.height) as usize;
    let pixels = match data.format {
        Format::R8G8B8A8 => data.pixels.clone(),
        Format::R8G8B8 => expand(&data.pixels, pixel_count, 3, |c| c.to_vec()),
        Format::R8 => expand(&data.pixels, pixel_count, 1, |c| vec![c[0], c[0], c[0]]),
        Format::R8G8 => expand(&data.pixels, pixel_count, 2, |c| vec![c[0], c[1], 0]),
        Format::R16G16B16A16 => expand(&data.pixels, pixel_count, 8, |c| {
            vec![c[1], c[3], c[5], c[7]]
        }),
        Format::R16G16B16 => expand(&data.pixels, pixel_count, 6, |c| vec![c[1], c[3], c[5]]),
        other => {
            log::warn!("unsupported texture format {:?}, dropping texture", other);
            return None;
        }
    };

    Some(MaterialImage {
        width: data.width,
        height: data.height,
        pixels,
    })
}

fn expand(
    source: &[u8],
    pixel_count: usize,
    stride: usize,
    convert: impl Fn(&[u8]) -> Vec<u8>,
) -> Vec<u8> {
    let mut out = Vec::with_capacity(pixel_count * 4);
    for chunk in source.chunks_exact(stride).take(pixel_count) {
        let rgb = convert(chunk);
        out.extend_from_slice(&rgb);
        out.resize(out.len() + 4 - rgb.len().min(4), 255);
    }
    out
}

/// Turns a decoded asset into scene objects and materials
///
/// Applies the per-asset post-processing: every object casts and receives
/// shadows, and every material gets the environment-intensity boost and is
/// flagged for a GPU refresh. Purely CPU-side; normalization and GPU
/// uploads happen afterwards, before the asset is attached.
pub fn instantiate(asset: DecodedAsset) -> (Vec<Object>, Vec<Material>) {
    let materials: Vec<Material> = asset
        .materials
        .into_iter()
        .map(|decoded| {
            let mut material = Material::new(
                &decoded.name,
                decoded.base_color,
                decoded.metallic,
                decoded.roughness,
            );
            material.emissive = decoded.emissive;
            material.normal_scale = decoded.normal_scale;
            material.maps = decoded.maps;
            material.env_intensity = DEFAULT_ENV_INTENSITY * ENV_INTENSITY_BOOST;
            material.mark_needs_refresh();
            material
        })
        .collect();

    let objects = asset
        .primitives
        .into_iter()
        .map(|primitive| {
            let mesh = Mesh::new(
                primitive.positions,
                primitive.normals,
                primitive.uvs,
                primitive.indices,
            );
            let mut object = Object::new(vec![mesh]);
            object.set_name(primitive.name);
            object.transform = primitive.transform;
            object.cast_shadows = true;
            object.receive_shadows = true;
            if let Some(material_index) = primitive.material_index {
                if let Some(material) = materials.get(material_index) {
                    object.set_material(&material.name);
                }
            }
            object
        })
        .collect();

    (objects, materials)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::normalize::{normalize_objects, world_aabb, NORMALIZED_EXTENT};
    use cgmath::InnerSpace;

    /// Builds a minimal valid GLB containing one triangle
    fn tiny_glb() -> Vec<u8> {
        let positions: [f32; 9] = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        let indices: [u16; 3] = [0, 1, 2];

        let mut bin = Vec::new();
        for value in positions {
            bin.extend_from_slice(&value.to_le_bytes());
        }
        for value in indices {
            bin.extend_from_slice(&value.to_le_bytes());
        }
        let bin_unpadded = bin.len();
        while bin.len() % 4 != 0 {
            bin.push(0);
        }

        let json = format!(
            concat!(
                r#"{{"asset":{{"version":"2.0"}},"scene":0,"scenes":[{{"nodes":[0]}}],"#,
                r#""nodes":[{{"mesh":0,"name":"tri"}}],"#,
                r#""meshes":[{{"primitives":[{{"attributes":{{"POSITION":0}},"indices":1}}]}}],"#,
                r#""buffers":[{{"byteLength":{}}}],"#,
                r#""bufferViews":[{{"buffer":0,"byteOffset":0,"byteLength":36}},"#,
                r#"{{"buffer":0,"byteOffset":36,"byteLength":6}}],"#,
                r#""accessors":[{{"bufferView":0,"componentType":5126,"count":3,"type":"VEC3","#,
                r#""min":[0.0,0.0,0.0],"max":[1.0,1.0,0.0]}},"#,
                r#"{{"bufferView":1,"componentType":5123,"count":3,"type":"SCALAR"}}]}}"#,
            ),
            bin_unpadded
        );
        let mut json = json.into_bytes();
        while json.len() % 4 != 0 {
            json.push(b' ');
        }

        let total = 12 + 8 + json.len() + 8 + bin.len();
        let mut glb = Vec::with_capacity(total);
        glb.extend_from_slice(&0x46546C67u32.to_le_bytes()); // "glTF"
        glb.extend_from_slice(&2u32.to_le_bytes());
        glb.extend_from_slice(&(total as u32).to_le_bytes());
        glb.extend_from_slice(&(json.len() as u32).to_le_bytes());
        glb.extend_from_slice(&0x4E4F534Au32.to_le_bytes()); // "JSON"
        glb.extend_from_slice(&json);
        glb.extend_from_slice(&(bin.len() as u32).to_le_bytes());
        glb.extend_from_slice(&0x004E4942u32.to_le_bytes()); // "BIN\0"
        glb.extend_from_slice(&bin);
        glb
    }

    #[test]
    fn decodes_a_minimal_model() {
        let asset = decode_glb("tri", &tiny_glb()).unwrap();
        assert_eq!(asset.name, "tri");
        assert_eq!(asset.primitives.len(), 1);
        let primitive = &asset.primitives[0];
        assert_eq!(primitive.name, "tri");
        assert_eq!(primitive.positions.len(), 9);
        assert_eq!(primitive.indices, vec![0, 1, 2]);
    }

    #[test]
    fn corrupt_bytes_fail_with_a_message() {
        let result = decode_glb("junk", b"definitely not a gltf file");
        let message = result.err().expect("decode should fail");
        assert!(!message.is_empty());
    }

    #[test]
    fn truncated_glb_fails() {
        let mut bytes = tiny_glb();
        bytes.truncate(bytes.len() / 2);
        assert!(decode_glb("partial", &bytes).is_err());
    }

    #[test]
    fn instantiate_applies_asset_post_processing() {
        let asset = decode_glb("tri", &tiny_glb()).unwrap();
        let (objects, _materials) = instantiate(asset);

        assert_eq!(objects.len(), 1);
        assert!(objects[0].cast_shadows);
        assert!(objects[0].receive_shadows);
        assert!(objects[0].visible);
    }

    #[test]
    fn instantiate_boosts_environment_intensity() {
        let asset = DecodedAsset {
            name: "synthetic".to_string(),
            primitives: Vec::new(),
            materials: vec![DecodedMaterial {
                name: "paint".to_string(),
                base_color: [1.0, 0.0, 0.0, 1.0],
                metallic: 0.5,
                roughness: 0.4,
                emissive: [0.0; 3],
                normal_scale: 1.0,
                maps: MaterialMaps::default(),
            }],
        };

        let (_, materials) = instantiate(asset);

        assert_eq!(materials.len(), 1);
        assert!((materials[0].env_intensity - 1.5).abs() < 1e-6);
        assert!(materials[0].needs_refresh());
    }

    #[test]
    fn decoded_model_normalizes_end_to_end() {
        let asset = decode_glb("tri", &tiny_glb()).unwrap();
        let (mut objects, _) = instantiate(asset);

        let report = normalize_objects(&mut objects).unwrap();

        // Triangle bounds: size (1, 1, 0) -> scale 3.
        assert!((report.scale - 3.0).abs() < 1e-5);
        let aabb = world_aabb(&objects).unwrap();
        assert!(aabb.center().magnitude() < 1e-5);
        assert!((aabb.max_extent() - NORMALIZED_EXTENT).abs() < 1e-4);
    }

    #[test]
    fn missing_file_reports_failure() {
        let mut loader = AssetLoader::spawn(PathBuf::from("no/such/model.glb"));

        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        loop {
            let events = loader.poll();
            if events
                .iter()
                .any(|event| matches!(event, LoadEvent::Failed(_)))
            {
                break;
            }
            assert!(
                std::time::Instant::now() < deadline,
                "loader never reported failure"
            );
            std::thread::sleep(std::time::Duration::from_millis(10));
        }
    }

    #[test]
    fn rgba8_conversion_expands_rgb() {
        let data = gltf::image::Data {
            pixels: vec![10, 20, 30, 40, 50, 60],
            format: gltf::image::Format::R8G8B8,
            width: 2,
            height: 1,
        };
        let image = to_rgba8(&data).unwrap();
        assert_eq!(image.pixels, vec![10, 20, 30, 255, 40, 50, 60, 255]);
    }
}
