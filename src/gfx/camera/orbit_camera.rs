use super::camera_utils::{convert_matrix4_to_array, Camera, CameraUniform};
use cgmath::*;

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: cgmath::Matrix4<f32> = cgmath::Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.5,
    0.0, 0.0, 0.0, 1.0,
);

/// Vertical field of view of the viewer camera
pub const FIELD_OF_VIEW_DEG: f32 = 75.0;

/// Initial eye distance from the origin along the view axis
pub const INITIAL_DISTANCE: f32 = 5.0;

#[derive(Debug, Clone, Copy)]
pub struct OrbitCamera {
    pub distance: f32,
    pub pitch: f32,
    pub yaw: f32,
    pub eye: Vector3<f32>,
    pub target: Vector3<f32>,
    pub up: Vector3<f32>,
    pub bounds: OrbitCameraBounds,
    pub aspect: f32,
    pub fovy: Rad<f32>,
    pub znear: f32,
    pub zfar: f32,
    pub uniform: CameraUniform,
}

impl Camera for OrbitCamera {
    fn build_view_projection_matrix(&self) -> Matrix4<f32> {
        let eye = Point3::from_vec(self.eye);
        let target = Point3::from_vec(self.target);
        let view = Matrix4::look_at_rh(eye, target, self.up);
        let proj =
            OPENGL_TO_WGPU_MATRIX * perspective(self.fovy, self.aspect, self.znear, self.zfar);
        proj * view
    }
}

impl OrbitCamera {
    /// Creates the viewer camera at its default framing
    ///
    /// 75 degree vertical field of view, near plane 0.1, far plane 1000,
    /// eye 5 units from the origin looking back at it.
    pub fn new(aspect: f32) -> Self {
        let mut camera = Self {
            distance: INITIAL_DISTANCE,
            pitch: 0.0,
            yaw: 0.0,
            eye: Vector3::zero(), // Recomputed in `update()`.
            target: Vector3::zero(),
            up: Vector3::unit_y(),
            bounds: OrbitCameraBounds::default(),
            aspect,
            fovy: Deg(FIELD_OF_VIEW_DEG).into(),
            znear: 0.1,
            zfar: 1000.0,
            uniform: CameraUniform::default(),
        };
        camera.update();
        camera
    }

    /// Returns the camera to its initial framing
    pub fn reset_to_default(&mut self) {
        self.distance = INITIAL_DISTANCE;
        self.pitch = 0.0;
        self.yaw = 0.0;
        self.target = Vector3::zero();
        self.update();
    }

    pub fn set_distance(&mut self, distance: f32) {
        self.distance = distance.clamp(
            self.bounds.min_distance.unwrap_or(f32::EPSILON),
            self.bounds.max_distance.unwrap_or(f32::MAX),
        );
        self.update();
    }

    pub fn add_distance(&mut self, delta: f32) {
        // Log scaling keeps zoom speed proportional at any distance.
        let corrected_zoom = f32::log10(self.distance.max(1.0 + f32::EPSILON)) * delta;
        self.set_distance(self.distance + corrected_zoom + delta * 0.1);
    }

    pub fn set_pitch(&mut self, pitch: f32) {
        self.pitch = pitch.clamp(self.bounds.min_pitch, self.bounds.max_pitch);
        self.update();
    }

    pub fn add_pitch(&mut self, delta: f32) {
        self.set_pitch(self.pitch + delta);
    }

    pub fn set_yaw(&mut self, yaw: f32) {
        self.yaw = yaw;
        self.update();
    }

    pub fn add_yaw(&mut self, delta: f32) {
        self.set_yaw(self.yaw + delta);
    }

    /// Pans the camera relative to the current view direction
    ///
    /// delta.0 = horizontal pan, delta.1 = vertical pan, both in view space.
    pub fn pan(&mut self, delta: (f32, f32)) {
        let forward = (self.target - self.eye).normalize();
        let right = forward.cross(self.up).normalize();
        let up = right.cross(forward).normalize();

        // Scale by distance for a consistent feel at any zoom level.
        let pan_scale = self.distance * 0.1;

        let movement = right * delta.0 * pan_scale + up * delta.1 * pan_scale;
        self.eye += movement;
        self.target += movement;
    }

    /// Updates the eye position after changing `distance`, `pitch` or `yaw`
    fn update(&mut self) {
        self.eye =
            calculate_cartesian_eye_position(self.pitch, self.yaw, self.distance, self.target);
    }

    pub fn resize_projection(&mut self, width: u32, height: u32) {
        self.aspect = width as f32 / height as f32;
    }

    pub fn update_view_proj(&mut self) {
        self.uniform.view_position = [self.eye.x, self.eye.y, self.eye.z, 1.0];
        self.uniform.view_proj = convert_matrix4_to_array(self.build_view_projection_matrix());
    }
}

#[derive(Debug, Clone, Copy)]
pub struct OrbitCameraBounds {
    pub min_distance: Option<f32>,
    pub max_distance: Option<f32>,
    pub min_pitch: f32,
    pub max_pitch: f32,
}

impl Default for OrbitCameraBounds {
    fn default() -> Self {
        Self {
            min_distance: Some(0.5),
            max_distance: Some(100.0),
            min_pitch: -std::f32::consts::PI / 2.0 + f32::EPSILON,
            max_pitch: std::f32::consts::PI / 2.0 - f32::EPSILON,
        }
    }
}

fn calculate_cartesian_eye_position(
    pitch: f32,
    yaw: f32,
    distance: f32,
    target: Vector3<f32>,
) -> Vector3<f32> {
    Vector3::new(
        distance * yaw.sin() * pitch.cos(),
        distance * pitch.sin(),
        distance * yaw.cos() * pitch.cos(),
    ) + target
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_five_units_down_the_view_axis() {
        let camera = OrbitCamera::new(1.0);
        assert!((camera.eye - Vector3::new(0.0, 0.0, 5.0)).magnitude() < 1e-6);
        assert_eq!(camera.znear, 0.1);
        assert_eq!(camera.zfar, 1000.0);
        let expected: Rad<f32> = Deg(75.0).into();
        assert!((camera.fovy.0 - expected.0).abs() < 1e-6);
    }

    #[test]
    fn resize_sets_aspect_and_is_idempotent() {
        let mut camera = OrbitCamera::new(1.0);
        camera.resize_projection(1920, 1080);
        let expected = 1920.0 / 1080.0;
        assert!((camera.aspect - expected).abs() < 1e-6);
        camera.resize_projection(1920, 1080);
        assert!((camera.aspect - expected).abs() < 1e-6);
    }

    #[test]
    fn pitch_is_clamped_short_of_the_poles() {
        let mut camera = OrbitCamera::new(1.0);
        camera.add_pitch(10.0);
        assert!(camera.pitch < std::f32::consts::PI / 2.0);
        camera.add_pitch(-20.0);
        assert!(camera.pitch > -std::f32::consts::PI / 2.0);
    }

    #[test]
    fn zoom_respects_distance_bounds() {
        let mut camera = OrbitCamera::new(1.0);
        camera.set_distance(0.001);
        assert!(camera.distance >= 0.5);
        camera.set_distance(1e6);
        assert!(camera.distance <= 100.0);
    }

    #[test]
    fn pan_moves_eye_and_target_together() {
        let mut camera = OrbitCamera::new(1.0);
        let before = camera.target - camera.eye;
        camera.pan((1.0, 0.5));
        let after = camera.target - camera.eye;
        assert!((before - after).magnitude() < 1e-5);
    }

    #[test]
    fn view_projection_is_finite() {
        let mut camera = OrbitCamera::new(16.0 / 9.0);
        camera.update_view_proj();
        for row in camera.uniform.view_proj.iter() {
            assert!(row.iter().all(|v| v.is_finite()));
        }
    }
}
