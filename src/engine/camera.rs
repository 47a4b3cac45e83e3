// Free-look shooter camera
//
// Camera model:
//   - Eye follows the player at a fixed offset, then is clamped to a box
//   - Orientation is heading/pitch/roll in degrees, rotated by held keys
//   - Bullets leave from the eye along forward()
//   - Z is up, +Y is forward at heading 0

use bevy_ecs::prelude::*;
use glam::{Mat4, Vec3};

use super::components::forward_from_hpr;
use super::config::CameraLimits;
use super::input::{Action, ActionState};

/// Pitch stays strictly inside ±90° so the view never flips over the pole.
pub const PITCH_LIMIT: f32 = 89.0;

#[derive(Resource, Debug, Clone)]
pub struct ShooterCamera {
    /// Eye position. Always inside the limits after clamp_to().
    pub position: Vec3,

    /// Heading, pitch, roll in degrees.
    pub hpr: Vec3,

    /// Vertical field of view in radians
    pub fov: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for ShooterCamera {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            hpr: Vec3::ZERO,
            fov: 45.0_f32.to_radians(),
            near: 0.1,
            far: 200.0,
        }
    }
}

impl ShooterCamera {
    /// Apply held rotate actions. `speed` is degrees per second.
    pub fn rotate(&mut self, actions: &ActionState, speed: f32, dt: f32) {
        let step = speed * dt;
        if actions.held(Action::RotateLeft)  { self.hpr.x += step; }
        if actions.held(Action::RotateRight) { self.hpr.x -= step; }
        if actions.held(Action::RotateUp)    { self.hpr.y += step; }
        if actions.held(Action::RotateDown)  { self.hpr.y -= step; }
        self.hpr.y = self.hpr.y.clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }

    pub fn follow(&mut self, target: Vec3, offset: Vec3) {
        self.position = target + offset;
    }

    pub fn clamp_to(&mut self, limits: &CameraLimits) {
        self.position = self.position.clamp(limits.min(), limits.max());
    }

    pub fn forward(&self) -> Vec3 {
        forward_from_hpr(self.hpr)
    }

    /// Up vector including roll.
    pub fn up(&self) -> Vec3 {
        let forward = self.forward();
        let right = forward.cross(Vec3::Z);
        // Looking straight up or down: any horizontal right axis will do.
        let right = if right.length_squared() > 1e-8 { right.normalize() } else { Vec3::X };
        let up = right.cross(forward).normalize();
        let roll = Mat4::from_axis_angle(forward, self.hpr.z.to_radians());
        roll.transform_vector3(up)
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_to_rh(self.position, self.forward(), self.up())
    }

    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov, aspect, self.near, self.far)
    }

    /// Combined view-projection matrix ready to upload to the GPU.
    pub fn view_projection(&self, aspect: f32) -> Mat4 {
        self.projection_matrix(aspect) * self.view_matrix()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotate_left_raises_heading() {
        let mut cam = ShooterCamera::default();
        let mut actions = ActionState::default();
        actions.hold(Action::RotateLeft).hold(Action::RotateUp);
        cam.rotate(&actions, 50.0, 0.5);
        assert_eq!(cam.hpr, Vec3::new(25.0, 25.0, 0.0));
    }

    #[test]
    fn pitch_stops_short_of_vertical() {
        let mut cam = ShooterCamera::default();
        let mut up = ActionState::default();
        up.hold(Action::RotateUp);
        cam.rotate(&up, 50.0, 3.0);
        assert_eq!(cam.hpr.y, PITCH_LIMIT);
        // Up vector still agrees with the upward-tilted forward.
        assert!(cam.up().z > 0.0);

        let mut down = ActionState::default();
        down.hold(Action::RotateDown);
        cam.rotate(&down, 50.0, 10.0);
        assert_eq!(cam.hpr.y, -PITCH_LIMIT);
    }

    #[test]
    fn opposite_rotations_cancel() {
        let mut cam = ShooterCamera::default();
        let mut actions = ActionState::default();
        actions.hold(Action::RotateLeft).hold(Action::RotateRight);
        cam.rotate(&actions, 50.0, 1.0);
        assert_eq!(cam.hpr.x, 0.0);
    }

    #[test]
    fn clamp_keeps_eye_in_box() {
        let mut cam = ShooterCamera::default();
        cam.follow(Vec3::new(40.0, -30.0, 2.0), Vec3::ZERO);
        cam.clamp_to(&CameraLimits::default());
        assert_eq!(cam.position, Vec3::new(15.0, -5.0, 2.0));
    }

    #[test]
    fn clamp_leaves_inside_point_alone() {
        let mut cam = ShooterCamera::default();
        cam.follow(Vec3::new(1.0, 2.0, 3.0), Vec3::ZERO);
        cam.clamp_to(&CameraLimits::default());
        assert_eq!(cam.position, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn view_looks_down_forward() {
        let cam = ShooterCamera::default();
        // A point straight ahead maps to the view-space -Z axis.
        let p = cam.view_matrix().transform_point3(Vec3::new(0.0, 10.0, 0.0));
        assert!(p.x.abs() < 1e-5 && p.y.abs() < 1e-5);
        assert!((p.z + 10.0).abs() < 1e-5);
    }

    #[test]
    fn up_is_z_without_roll() {
        let cam = ShooterCamera::default();
        assert!((cam.up() - Vec3::Z).length() < 1e-5);
    }
}
