use winit::{
    dpi::PhysicalPosition,
    event::{DeviceEvent, ElementState, KeyEvent, MouseScrollDelta},
    keyboard::{KeyCode, PhysicalKey},
    window::Window,
};

use super::orbit_camera::OrbitCamera;

/// Fraction of pending motion applied (and removed) each frame
///
/// Input events accumulate into velocities; `update` feeds them into the
/// camera a damped slice at a time so motion coasts to rest instead of
/// stopping with the pointer.
pub const DAMPING_FACTOR: f32 = 0.05;

/// Velocities below this are snapped to zero
const REST_EPSILON: f32 = 1e-6;

pub struct CameraController {
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
    yaw_velocity: f32,
    pitch_velocity: f32,
    zoom_velocity: f32,
    pan_velocity: (f32, f32),
    is_shift_held: bool,
    is_mouse_pressed: bool,
}

impl CameraController {
    pub fn new(rotate_speed: f32, zoom_speed: f32) -> Self {
        Self {
            rotate_speed,
            zoom_speed,
            pan_speed: 0.01,
            yaw_velocity: 0.0,
            pitch_velocity: 0.0,
            zoom_velocity: 0.0,
            pan_velocity: (0.0, 0.0),
            is_shift_held: false,
            is_mouse_pressed: false,
        }
    }

    /// Accumulates pointer input into the pending velocities
    ///
    /// Nothing is applied to the camera here; that happens once per frame
    /// in [`CameraController::update`].
    pub fn process_events(&mut self, event: &DeviceEvent, window: &Window) {
        match event {
            DeviceEvent::Button {
                button: 0, // Left Mouse Button
                state,
            } => {
                self.is_mouse_pressed = *state == ElementState::Pressed;
            }
            DeviceEvent::MouseWheel { delta, .. } => {
                let scroll_amount = -match delta {
                    MouseScrollDelta::LineDelta(_, scroll) => *scroll,
                    MouseScrollDelta::PixelDelta(PhysicalPosition { y: scroll, .. }) => {
                        *scroll as f32
                    }
                };
                self.zoom_velocity += scroll_amount * self.zoom_speed;
                window.request_redraw();
            }
            DeviceEvent::MouseMotion { delta } => {
                if self.is_mouse_pressed {
                    if self.is_shift_held {
                        // SHIFT + DRAG = PAN (move focus point)
                        self.pan_velocity.0 += -delta.0 as f32 * self.pan_speed;
                        self.pan_velocity.1 += delta.1 as f32 * self.pan_speed;
                    } else {
                        // NORMAL DRAG = ROTATE (orbit around focus)
                        self.yaw_velocity += -delta.0 as f32 * self.rotate_speed;
                        self.pitch_velocity += delta.1 as f32 * self.rotate_speed;
                    }
                    window.request_redraw();
                }
            }
            _ => (),
        }
    }

    pub fn process_keyed_events(&mut self, event: &KeyEvent, camera: &mut OrbitCamera) {
        match event {
            KeyEvent {
                physical_key: PhysicalKey::Code(KeyCode::ShiftLeft | KeyCode::ShiftRight),
                state,
                ..
            } => {
                self.is_shift_held = *state == ElementState::Pressed;
            }
            KeyEvent {
                physical_key: PhysicalKey::Code(KeyCode::KeyC),
                state: ElementState::Pressed,
                ..
            } => {
                if self.is_shift_held {
                    camera.reset_to_default();
                    self.stop();
                }
            }
            _ => (),
        }
    }

    /// Advances the damping state by exactly one frame
    ///
    /// Applies the damped slice of every pending velocity to the camera,
    /// then decays the remainder, whether or not the user is interacting.
    /// Must be called once per frame and only once.
    pub fn update(&mut self, camera: &mut OrbitCamera) {
        if self.yaw_velocity.abs() > REST_EPSILON {
            camera.add_yaw(self.yaw_velocity * DAMPING_FACTOR);
        }
        if self.pitch_velocity.abs() > REST_EPSILON {
            camera.add_pitch(self.pitch_velocity * DAMPING_FACTOR);
        }
        if self.zoom_velocity.abs() > REST_EPSILON {
            camera.add_distance(self.zoom_velocity * DAMPING_FACTOR);
        }
        if self.pan_velocity.0.abs() > REST_EPSILON || self.pan_velocity.1.abs() > REST_EPSILON {
            camera.pan((
                self.pan_velocity.0 * DAMPING_FACTOR,
                self.pan_velocity.1 * DAMPING_FACTOR,
            ));
        }

        let keep = 1.0 - DAMPING_FACTOR;
        self.yaw_velocity = decay(self.yaw_velocity, keep);
        self.pitch_velocity = decay(self.pitch_velocity, keep);
        self.zoom_velocity = decay(self.zoom_velocity, keep);
        self.pan_velocity.0 = decay(self.pan_velocity.0, keep);
        self.pan_velocity.1 = decay(self.pan_velocity.1, keep);
    }

    /// Whether residual motion is still decaying
    pub fn is_coasting(&self) -> bool {
        self.yaw_velocity.abs() > REST_EPSILON
            || self.pitch_velocity.abs() > REST_EPSILON
            || self.zoom_velocity.abs() > REST_EPSILON
            || self.pan_velocity.0.abs() > REST_EPSILON
            || self.pan_velocity.1.abs() > REST_EPSILON
    }

    /// Zeroes all pending motion
    pub fn stop(&mut self) {
        self.yaw_velocity = 0.0;
        self.pitch_velocity = 0.0;
        self.zoom_velocity = 0.0;
        self.pan_velocity = (0.0, 0.0);
    }

    #[cfg(test)]
    fn inject_rotation(&mut self, yaw: f32, pitch: f32) {
        self.yaw_velocity += yaw;
        self.pitch_velocity += pitch;
    }
}

fn decay(velocity: f32, keep: f32) -> f32 {
    let next = velocity * keep;
    if next.abs() > REST_EPSILON {
        next
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_update_applies_one_damping_step() {
        let mut controller = CameraController::new(0.005, 0.1);
        let mut camera = OrbitCamera::new(1.0);
        controller.inject_rotation(1.0, 0.0);

        controller.update(&mut camera);

        assert!((camera.yaw - DAMPING_FACTOR).abs() < 1e-6);
        assert!(controller.is_coasting());
    }

    #[test]
    fn residual_motion_decays_to_rest() {
        let mut controller = CameraController::new(0.005, 0.1);
        let mut camera = OrbitCamera::new(1.0);
        controller.inject_rotation(1.0, -0.5);

        let mut previous = 1.0f32;
        for _ in 0..600 {
            controller.update(&mut camera);
            assert!(controller.yaw_velocity.abs() <= previous);
            previous = controller.yaw_velocity.abs();
        }
        assert!(!controller.is_coasting());
    }

    #[test]
    fn total_applied_motion_converges_to_the_input() {
        let mut controller = CameraController::new(0.005, 0.1);
        let mut camera = OrbitCamera::new(1.0);
        controller.inject_rotation(0.8, 0.0);

        for _ in 0..600 {
            controller.update(&mut camera);
        }
        // Geometric series: sum of v * d * (1-d)^n approaches v.
        assert!((camera.yaw - 0.8).abs() < 1e-3);
    }

    #[test]
    fn update_with_no_pending_motion_is_a_no_op() {
        let mut controller = CameraController::new(0.005, 0.1);
        let mut camera = OrbitCamera::new(1.0);
        let yaw = camera.yaw;
        let distance = camera.distance;

        controller.update(&mut camera);

        assert_eq!(camera.yaw, yaw);
        assert_eq!(camera.distance, distance);
        assert!(!controller.is_coasting());
    }

    #[test]
    fn stop_clears_all_velocities() {
        let mut controller = CameraController::new(0.005, 0.1);
        controller.inject_rotation(1.0, 1.0);
        controller.stop();
        assert!(!controller.is_coasting());
    }
}
