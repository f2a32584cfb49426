//! Fixed lighting rig for the viewer
//!
//! Layered lighting (ambient fill + shadow-casting key + rim accent +
//! environment reflections) presents a physically-based asset legibly
//! without per-asset tuning. The rig is built once at startup and never
//! reacts to the scene.

use cgmath::{InnerSpace, Matrix4, Point3, Vector3};

use crate::gfx::camera::orbit_camera::OPENGL_TO_WGPU_MATRIX;

/// Shadow map edge length in texels
pub const SHADOW_MAP_SIZE: u32 = 4096;

/// Depth bias applied when comparing against the shadow map
///
/// Slightly negative to suppress self-shadowing acne on curved surfaces.
pub const SHADOW_DEPTH_BIAS: f32 = -0.0001;

/// Flat fill preventing pure-black unlit surfaces
#[derive(Debug, Clone, Copy)]
pub struct AmbientLight {
    pub color: [f32; 3],
    pub intensity: f32,
}

/// Key light; the only shadow caster
#[derive(Debug, Clone, Copy)]
pub struct DirectionalLight {
    pub position: [f32; 3],
    pub color: [f32; 3],
    pub intensity: f32,
}

/// Rim/accent light opposite the key, aimed at the origin
#[derive(Debug, Clone, Copy)]
pub struct SpotLight {
    pub position: [f32; 3],
    pub color: [f32; 3],
    pub intensity: f32,
    /// Cosine of the outer cone half-angle
    pub cos_outer_angle: f32,
}

/// The complete fixed rig
#[derive(Debug, Clone, Copy)]
pub struct LightingRig {
    pub ambient: AmbientLight,
    pub directional: DirectionalLight,
    pub spot: SpotLight,
}

impl Default for LightingRig {
    fn default() -> Self {
        Self {
            ambient: AmbientLight {
                color: [0.5, 0.5, 0.5],
                intensity: 0.7,
            },
            directional: DirectionalLight {
                position: [5.0, 10.0, 7.5],
                color: [1.0, 1.0, 1.0],
                intensity: 1.0,
            },
            spot: SpotLight {
                position: [-5.0, 10.0, -7.5],
                color: [1.0, 1.0, 1.0],
                intensity: 1.5,
                cos_outer_angle: std::f32::consts::FRAC_PI_4.cos(),
            },
        }
    }
}

impl LightingRig {
    /// Unit vector from the origin toward the key light
    pub fn sun_direction(&self) -> Vector3<f32> {
        Vector3::from(self.directional.position).normalize()
    }

    /// Unit vector the spot light shines along (toward the origin)
    pub fn spot_direction(&self) -> Vector3<f32> {
        (-Vector3::from(self.spot.position)).normalize()
    }

    /// View-projection matrix of the key light for the shadow pass
    ///
    /// Orthographic bounds sized for the normalized asset (3-unit extent
    /// centered at the origin) with generous margin for pan.
    pub fn light_view_proj(&self) -> Matrix4<f32> {
        let position = Point3::from(self.directional.position);
        let view = Matrix4::look_at_rh(position, Point3::new(0.0, 0.0, 0.0), Vector3::unit_y());
        let proj = cgmath::ortho(-6.0, 6.0, -6.0, 6.0, 0.1, 40.0);
        OPENGL_TO_WGPU_MATRIX * proj * view
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rig_matches_fixed_setup() {
        let rig = LightingRig::default();
        assert_eq!(rig.ambient.intensity, 0.7);
        assert_eq!(rig.directional.intensity, 1.0);
        assert_eq!(rig.directional.position, [5.0, 10.0, 7.5]);
        assert_eq!(rig.spot.intensity, 1.5);
    }

    #[test]
    fn spot_sits_opposite_the_key_light() {
        let rig = LightingRig::default();
        let key = rig.directional.position;
        let rim = rig.spot.position;
        // Mirrored across the vertical axis.
        assert_eq!(rim[0], -key[0]);
        assert_eq!(rim[2], -key[2]);
        // Horizontal components point away from each other.
        let dot = key[0] * rim[0] + key[2] * rim[2];
        assert!(dot < 0.0);
    }

    #[test]
    fn spot_aims_at_the_origin() {
        let rig = LightingRig::default();
        let dir = rig.spot_direction();
        let expected = (-Vector3::from(rig.spot.position)).normalize();
        assert!((dir - expected).magnitude() < 1e-6);
        assert!((dir.magnitude() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn light_matrix_is_finite() {
        let m = rig_matrix_elements(LightingRig::default().light_view_proj());
        assert!(m.iter().all(|v| v.is_finite()));
    }

    fn rig_matrix_elements(m: Matrix4<f32>) -> Vec<f32> {
        let cols: [[f32; 4]; 4] = m.into();
        cols.iter().flatten().copied().collect()
    }
}
