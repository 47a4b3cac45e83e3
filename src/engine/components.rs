// Core ECS components for the shooter
// Positions are world space, Z-up, +Y forward

use bevy_ecs::prelude::*;
use glam::Vec3;

use super::collision::{CollideMask, CollisionSolid};

/// Position and orientation of an entity.
/// `hpr` is heading/pitch/roll in degrees.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub hpr: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            hpr: Vec3::ZERO,
        }
    }
}

impl Transform {
    pub fn from_position(position: Vec3) -> Self {
        Self { position, ..Default::default() }
    }

    pub fn with_hpr(mut self, hpr: Vec3) -> Self {
        self.hpr = hpr;
        self
    }

    /// Unit vector the entity is facing.
    pub fn forward(&self) -> Vec3 {
        forward_from_hpr(self.hpr)
    }
}

/// Forward (+Y local) axis rotated by heading then pitch. Roll does not move it.
pub fn forward_from_hpr(hpr: Vec3) -> Vec3 {
    let (h, p) = (hpr.x.to_radians(), hpr.y.to_radians());
    Vec3::new(-h.sin() * p.cos(), h.cos() * p.cos(), p.sin())
}

/// RGB color for rendering
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, 1.0]
    }
}

/// The player-controlled avatar.
#[derive(Component, Debug, Clone, Copy)]
pub struct Player;

/// A projectile fired from the camera.
#[derive(Component, Debug, Clone, Copy)]
pub struct Bullet {
    /// World position the bullet was fired from.
    pub origin: Vec3,
}

/// An enemy target. `index` is its slot in the wave it was spawned with.
#[derive(Component, Debug, Clone, Copy)]
pub struct Enemy {
    pub index: usize,
    pub wave: u32,
}

/// What a collider belongs to. Drives hit classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColliderKind {
    Player,
    Bullet,
    Hitbox,
}

/// A collision volume attached to an entity.
///
/// `from_mask` says what this collider actively looks for; `into_mask` says
/// what may find it. A collider with an empty `from_mask` never initiates
/// a test.
#[derive(Component, Debug, Clone)]
pub struct Collider {
    pub name: String,
    pub kind: ColliderKind,
    pub solid: CollisionSolid,
    pub from_mask: CollideMask,
    pub into_mask: CollideMask,
}

impl Collider {
    pub fn player(radius: f32) -> Self {
        Self {
            name: "player".to_string(),
            kind: ColliderKind::Player,
            solid: CollisionSolid::sphere(Vec3::ZERO, radius),
            from_mask: CollideMask::PLAYER,
            into_mask: CollideMask::NONE,
        }
    }

    pub fn bullet(radius: f32) -> Self {
        Self {
            name: "bullet".to_string(),
            kind: ColliderKind::Bullet,
            solid: CollisionSolid::sphere(Vec3::ZERO, radius),
            from_mask: CollideMask::TARGET,
            into_mask: CollideMask::NONE,
        }
    }

    pub fn hitbox(index: usize, half_extents: Vec3) -> Self {
        Self {
            name: format!("hitbox-{index}"),
            kind: ColliderKind::Hitbox,
            solid: CollisionSolid::cuboid(Vec3::ZERO, half_extents),
            from_mask: CollideMask::NONE,
            into_mask: CollideMask::TARGET,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-5
    }

    #[test]
    fn zero_hpr_faces_forward() {
        assert!(close(forward_from_hpr(Vec3::ZERO), Vec3::Y));
    }

    #[test]
    fn positive_heading_turns_left() {
        assert!(close(forward_from_hpr(Vec3::new(90.0, 0.0, 0.0)), -Vec3::X));
    }

    #[test]
    fn positive_pitch_looks_up() {
        assert!(close(forward_from_hpr(Vec3::new(0.0, 90.0, 0.0)), Vec3::Z));
    }

    #[test]
    fn roll_does_not_change_forward() {
        let hpr = Vec3::new(30.0, 10.0, 0.0);
        let rolled = Vec3::new(30.0, 10.0, 45.0);
        assert!(close(forward_from_hpr(hpr), forward_from_hpr(rolled)));
    }

    #[test]
    fn hitbox_names_carry_index() {
        assert_eq!(Collider::hitbox(3, Vec3::ONE).name, "hitbox-3");
    }
}
