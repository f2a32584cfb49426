//! Prefiltered environment lighting map
//!
//! Generates a small cubemap from a procedural enclosed-room preset (warm
//! ceiling light, neutral walls, darker floor) and box-filters it into a
//! mip chain, so rougher materials sample blurrier reflections. Built once
//! at startup; physically-based materials read it for ambient reflections.

use crate::gfx::resources::texture_resource::TextureResource;

/// Edge length of the base mip
pub const ENVIRONMENT_MAP_SIZE: u32 = 64;

/// CPU-side cubemap data: `mips[level][face]`, faces in +X,-X,+Y,-Y,+Z,-Z order
pub struct CubemapData {
    pub size: u32,
    pub mips: Vec<[Vec<u8>; 6]>,
}

impl CubemapData {
    /// Number of mip levels in the chain
    pub fn mip_count(&self) -> u32 {
        self.mips.len() as u32
    }

    /// Generates the enclosed-room preset
    ///
    /// Radiance is evaluated per texel direction, tone-compressed to RGBA8,
    /// then the mip chain is built by repeated 2x2 box filtering.
    pub fn room_preset(size: u32) -> Self {
        let base: [Vec<u8>; 6] =
            std::array::from_fn(|face| render_face(face as u32, size));

        let mut mips = vec![base];
        let mut mip_size = size;
        while mip_size > 1 {
            let next_size = mip_size / 2;
            let previous = mips.last().unwrap();
            let next: [Vec<u8>; 6] =
                std::array::from_fn(|face| downsample(&previous[face], mip_size));
            mips.push(next);
            mip_size = next_size;
        }

        Self { size, mips }
    }

    /// Uploads the chain as a cube texture
    pub fn upload(&self, device: &wgpu::Device, queue: &wgpu::Queue) -> TextureResource {
        TextureResource::create_cubemap(device, queue, self.size, &self.mips, "Environment Map")
    }
}

fn render_face(face: u32, size: u32) -> Vec<u8> {
    let mut pixels = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        for x in 0..size {
            // Texel center in [-1, 1]
            let u = (x as f32 + 0.5) / size as f32 * 2.0 - 1.0;
            let v = (y as f32 + 0.5) / size as f32 * 2.0 - 1.0;
            let dir = face_direction(face, u, v);
            let radiance = room_radiance(dir);
            pixels.extend_from_slice(&encode(radiance));
        }
    }
    pixels
}

/// Standard cubemap face direction convention
fn face_direction(face: u32, u: f32, v: f32) -> [f32; 3] {
    let dir = match face {
        0 => [1.0, -v, -u],  // +X
        1 => [-1.0, -v, u],  // -X
        2 => [u, 1.0, v],    // +Y
        3 => [u, -1.0, -v],  // -Y
        4 => [u, -v, 1.0],   // +Z
        _ => [-u, -v, -1.0], // -Z
    };
    normalize(dir)
}

/// Radiance of the synthetic room along `dir`
///
/// A bright warm patch straight up (the ceiling light), neutral walls that
/// brighten toward the top, and a darker floor.
fn room_radiance(dir: [f32; 3]) -> [f32; 3] {
    let up = dir[1];

    let floor = [0.18, 0.17, 0.16];
    let wall = [0.42, 0.42, 0.44];
    let t = (up * 0.5 + 0.5).clamp(0.0, 1.0);
    let mut color = [
        floor[0] + (wall[0] - floor[0]) * t,
        floor[1] + (wall[1] - floor[1]) * t,
        floor[2] + (wall[2] - floor[2]) * t,
    ];

    // Ceiling light patch with a soft falloff
    if up > 0.0 {
        let focus = ((up - 0.75) / 0.25).clamp(0.0, 1.0);
        let glow = focus * focus;
        color[0] += 2.4 * glow;
        color[1] += 2.2 * glow;
        color[2] += 1.9 * glow;
    }

    color
}

fn downsample(pixels: &[u8], size: u32) -> Vec<u8> {
    let next_size = (size / 2).max(1);
    let mut out = Vec::with_capacity((next_size * next_size * 4) as usize);
    for y in 0..next_size {
        for x in 0..next_size {
            for channel in 0..4usize {
                let mut sum = 0u32;
                for (dx, dy) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
                    let sx = (x * 2 + dx).min(size - 1);
                    let sy = (y * 2 + dy).min(size - 1);
                    sum += pixels[((sy * size + sx) * 4) as usize + channel] as u32;
                }
                out.push((sum / 4) as u8);
            }
        }
    }
    out
}

fn normalize(v: [f32; 3]) -> [f32; 3] {
    let length = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
    [v[0] / length, v[1] / length, v[2] / length]
}

// Reinhard compression keeps the bright ceiling within RGBA8 range
fn encode(radiance: [f32; 3]) -> [u8; 4] {
    let mut out = [0u8; 4];
    for i in 0..3 {
        let compressed = radiance[i] / (1.0 + radiance[i]);
        out[i] = (compressed * 255.0).round().clamp(0.0, 255.0) as u8;
    }
    out[3] = 255;
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mip_chain_runs_down_to_one_texel() {
        let data = CubemapData::room_preset(ENVIRONMENT_MAP_SIZE);
        let expected = (ENVIRONMENT_MAP_SIZE as f32).log2() as u32 + 1;
        assert_eq!(data.mip_count(), expected);
        let last = &data.mips[data.mips.len() - 1][0];
        assert_eq!(last.len(), 4);
    }

    #[test]
    fn faces_are_correctly_sized() {
        let data = CubemapData::room_preset(16);
        assert_eq!(data.mips[0][0].len(), 16 * 16 * 4);
        assert_eq!(data.mips[1][3].len(), 8 * 8 * 4);
    }

    #[test]
    fn room_is_not_black() {
        let data = CubemapData::room_preset(16);
        for faces in &data.mips {
            for face in faces {
                let max = face.iter().step_by(4).copied().max().unwrap_or(0);
                assert!(max > 0, "a face rendered fully black");
            }
        }
    }

    #[test]
    fn ceiling_is_the_brightest_face() {
        let data = CubemapData::room_preset(16);
        let brightness = |face: &[u8]| -> u32 {
            face.chunks(4).map(|p| p[0] as u32 + p[1] as u32 + p[2] as u32).sum()
        };
        let up = brightness(&data.mips[0][2]);
        let down = brightness(&data.mips[0][3]);
        assert!(up > down);
    }

    #[test]
    fn face_directions_are_unit_length() {
        for face in 0..6 {
            let dir = face_direction(face, 0.3, -0.7);
            let length = (dir[0] * dir[0] + dir[1] * dir[1] + dir[2] * dir[2]).sqrt();
            assert!((length - 1.0).abs() < 1e-6);
        }
    }
}
