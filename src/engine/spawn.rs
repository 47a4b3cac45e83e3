// Entity bundles and spawn helpers for the player, enemies and bullets

use bevy_ecs::prelude::*;
use glam::Vec3;
use rand::Rng;

use super::components::*;
use super::config::{EnemyConfig, GameConfig};

pub const PLAYER_COLOR: Color = Color::rgb(0.9, 0.9, 0.95);
pub const ENEMY_COLOR: Color = Color::rgb(0.85, 0.2, 0.15);
pub const BULLET_COLOR: Color = Color::rgb(1.0, 0.85, 0.1);

pub fn player_bundle(config: &GameConfig) -> (Transform, Player, Collider, Color) {
    (
        Transform::from_position(Vec3::ZERO),
        Player,
        Collider::player(config.player.collider_radius),
        PLAYER_COLOR,
    )
}

pub fn enemy_bundle(
    index: usize,
    wave: u32,
    position: Vec3,
    config: &EnemyConfig,
) -> (Transform, Enemy, Collider, Color) {
    (
        Transform::from_position(position),
        Enemy { index, wave },
        Collider::hitbox(index, config.hitbox_half_extents),
        ENEMY_COLOR,
    )
}

pub fn bullet_bundle(position: Vec3, hpr: Vec3, radius: f32) -> (Transform, Bullet, Collider, Color) {
    (
        Transform::from_position(position).with_hpr(hpr),
        Bullet { origin: position },
        Collider::bullet(radius),
        BULLET_COLOR,
    )
}

/// Uniform random point in the enemy spawn rectangle, on the ground (z = 0).
pub fn random_spawn_point(rng: &mut impl Rng, config: &EnemyConfig) -> Vec3 {
    Vec3::new(
        rng.gen_range(config.spawn_x.x..config.spawn_x.y),
        rng.gen_range(config.spawn_y.x..config.spawn_y.y),
        0.0,
    )
}

/// Queue a full wave of enemies at random spawn points.
pub fn spawn_wave(commands: &mut Commands, rng: &mut impl Rng, wave: u32, config: &EnemyConfig) {
    for index in 0..config.count {
        let position = random_spawn_point(rng, config);
        commands.spawn(enemy_bundle(index, wave, position, config));
        log::debug!("Enemy {} created at {}", index, position);
    }
    log::info!("Wave {} spawned with {} enemies", wave, config.count);
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn spawn_points_stay_in_range() {
        let config = EnemyConfig::default();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let p = random_spawn_point(&mut rng, &config);
            assert!((-5.0..5.0).contains(&p.x));
            assert!((10.0..20.0).contains(&p.y));
            assert_eq!(p.z, 0.0);
        }
    }

    #[test]
    fn bullet_remembers_origin_and_heading() {
        let (transform, bullet, collider, _) =
            bullet_bundle(Vec3::new(1.0, 2.0, 3.0), Vec3::new(90.0, 0.0, 0.0), 0.1);
        assert_eq!(bullet.origin, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(transform.hpr.x, 90.0);
        assert_eq!(collider.kind, ColliderKind::Bullet);
    }
}
