// ECS systems for one frame of the shooter
// Chained in game.rs in the order they appear here

use std::collections::HashSet;

use bevy_ecs::prelude::*;
use glam::Vec3;
use rand::rngs::StdRng;

use super::camera::ShooterCamera;
use super::collision::{CollisionEntry, CollisionQueue, traverse};
use super::components::*;
use super::config::GameConfig;
use super::input::{Action, ActionState};
use super::spawn;

// ============================================================================
// RESOURCES
// ============================================================================

/// Seconds since the previous frame.
#[derive(Resource, Debug, Default, Clone, Copy)]
pub struct FrameTime {
    pub delta: f32,
}

#[derive(Resource)]
pub struct GameRng(pub StdRng);

/// Running totals since startup.
#[derive(Resource, Debug, Default, Clone, PartialEq)]
pub struct GameStats {
    pub wave: u32,
    pub hits: u32,
    pub bullets_fired: u32,
    pub bullets_expired: u32,
    pub enemies_respawned: u32,
}

/// Entities removed by hit resolution on the most recent frame.
#[derive(Resource, Debug, Default, Clone, PartialEq)]
pub struct ResolvedHits {
    pub bullets: Vec<Entity>,
    pub enemies: Vec<Entity>,
}

// ============================================================================
// MOVEMENT
// ============================================================================

/// Arrow keys move the player on the ground plane. Retreating stops at min_y.
pub fn player_movement_system(
    actions: Res<ActionState>,
    config: Res<GameConfig>,
    time: Res<FrameTime>,
    mut players: Query<&mut Transform, With<Player>>,
) {
    let step = config.player.speed * time.delta;

    for mut transform in players.iter_mut() {
        let mut delta = Vec3::ZERO;
        if actions.held(Action::MoveForward) { delta.y += step; }
        if actions.held(Action::MoveBack) && transform.position.y > config.player.min_y {
            delta.y -= step;
        }
        if actions.held(Action::MoveLeft)  { delta.x -= step; }
        if actions.held(Action::MoveRight) { delta.x += step; }
        transform.position += delta;
    }
}

/// Rotate, follow the player, then clamp the eye to the camera box.
pub fn camera_system(
    actions: Res<ActionState>,
    config: Res<GameConfig>,
    time: Res<FrameTime>,
    mut camera: ResMut<ShooterCamera>,
    players: Query<&Transform, With<Player>>,
) {
    camera.rotate(&actions, config.camera.rotate_speed, time.delta);
    if let Ok(player) = players.get_single() {
        camera.follow(player.position, config.camera.offset);
    }
    camera.clamp_to(&config.camera.limits);
}

// ============================================================================
// BULLETS
// ============================================================================

pub fn fire_system(
    mut commands: Commands,
    actions: Res<ActionState>,
    config: Res<GameConfig>,
    camera: Res<ShooterCamera>,
    mut stats: ResMut<GameStats>,
) {
    if !actions.just_pressed(Action::Fire) {
        return;
    }
    commands.spawn(spawn::bullet_bundle(camera.position, camera.hpr, config.bullet.radius));
    stats.bullets_fired += 1;
    log::debug!("Bullet created at {}", camera.position);
}

/// Advance bullets along their heading and drop the ones out of bounds.
pub fn bullet_system(
    mut commands: Commands,
    config: Res<GameConfig>,
    time: Res<FrameTime>,
    mut stats: ResMut<GameStats>,
    mut bullets: Query<(Entity, &mut Transform, &Bullet)>,
) {
    let step = config.bullet.speed * time.delta;

    for (entity, mut transform, bullet) in bullets.iter_mut() {
        let forward = transform.forward();
        transform.position += forward * step;

        let travelled = transform.position.distance(bullet.origin);
        if transform.position.y > config.bullet.max_y || travelled > config.bullet.max_range {
            log::debug!("Bullet out of bounds at {}, removing", transform.position);
            commands.entity(entity).despawn();
            stats.bullets_expired += 1;
        }
    }
}

// ============================================================================
// ENEMIES
// ============================================================================

/// Enemies drift toward -Y and reappear at a spawn point once past respawn_y.
pub fn enemy_system(
    config: Res<GameConfig>,
    time: Res<FrameTime>,
    mut rng: ResMut<GameRng>,
    mut stats: ResMut<GameStats>,
    mut enemies: Query<(&mut Transform, &Enemy)>,
) {
    let step = config.enemy.drift_speed * time.delta;

    for (mut transform, enemy) in enemies.iter_mut() {
        transform.position.y -= step;
        if transform.position.y < config.enemy.respawn_y {
            transform.position = spawn::random_spawn_point(&mut rng.0, &config.enemy);
            stats.enemies_respawned += 1;
            log::debug!(
                "Enemy {} of wave {} respawned at {}",
                enemy.index,
                enemy.wave,
                transform.position
            );
        }
    }
}

// ============================================================================
// COLLISION
// ============================================================================

pub fn collision_system(
    colliders: Query<(Entity, &Transform, &Collider)>,
    mut queue: ResMut<CollisionQueue>,
) {
    let snapshot: Vec<_> = colliders
        .iter()
        .map(|(entity, transform, collider)| (entity, transform.position, collider))
        .collect();

    traverse(&snapshot, &mut queue);

    for entry in &queue.entries {
        log::debug!("Collision detected: {} hit {}", entry.from_name, entry.into_name);
    }
}

/// Bullets and enemies to remove this frame, each listed once, in the
/// order they were first seen.
#[derive(Debug, Default, PartialEq)]
pub struct HitPlan {
    pub bullets: Vec<Entity>,
    pub enemies: Vec<Entity>,
}

impl HitPlan {
    pub fn from_entries(entries: &[CollisionEntry]) -> Self {
        let mut plan = Self::default();
        let mut seen = HashSet::new();

        for entry in entries {
            match (entry.from_kind, entry.into_kind) {
                (ColliderKind::Bullet, ColliderKind::Hitbox) => {
                    if seen.insert(entry.from) {
                        plan.bullets.push(entry.from);
                    }
                    if seen.insert(entry.into) {
                        plan.enemies.push(entry.into);
                    }
                }
                _ => {
                    log::trace!("Ignoring collision {} -> {}", entry.from_name, entry.into_name);
                }
            }
        }
        plan
    }
}

/// Turn bullet -> hitbox entries into removals. Every entity is despawned at
/// most once, and only if it is still the kind the entry said it was.
pub fn hit_resolution_system(
    mut commands: Commands,
    queue: Res<CollisionQueue>,
    mut stats: ResMut<GameStats>,
    mut resolved: ResMut<ResolvedHits>,
    bullets: Query<&Transform, With<Bullet>>,
    enemies: Query<&Transform, With<Enemy>>,
) {
    let plan = HitPlan::from_entries(&queue.entries);
    resolved.bullets.clear();
    resolved.enemies.clear();

    for entity in plan.bullets {
        if let Ok(transform) = bullets.get(entity) {
            log::debug!("Removing bullet at {}", transform.position);
            commands.entity(entity).despawn();
            resolved.bullets.push(entity);
        }
    }

    for entity in plan.enemies {
        if let Ok(transform) = enemies.get(entity) {
            log::debug!("Removing enemy at {}", transform.position);
            commands.entity(entity).despawn();
            resolved.enemies.push(entity);
            stats.hits += 1;
        }
    }

    if !resolved.enemies.is_empty() {
        log::info!(
            "{} enemies destroyed by {} bullets (total hits {})",
            resolved.enemies.len(),
            resolved.bullets.len(),
            stats.hits
        );
    }
}

// ============================================================================
// WAVES
// ============================================================================

/// Startup only: the first wave always spawns, whether or not later waves are enabled.
pub fn first_wave_system(
    mut commands: Commands,
    config: Res<GameConfig>,
    mut rng: ResMut<GameRng>,
    mut stats: ResMut<GameStats>,
) {
    stats.wave = 1;
    spawn::spawn_wave(&mut commands, &mut rng.0, stats.wave, &config.enemy);
}

/// Spawn the next wave once the current one is gone.
pub fn wave_system(
    mut commands: Commands,
    config: Res<GameConfig>,
    mut rng: ResMut<GameRng>,
    mut stats: ResMut<GameStats>,
    enemies: Query<(), With<Enemy>>,
) {
    if !config.waves.enabled || !enemies.is_empty() {
        return;
    }
    stats.wave += 1;
    spawn::spawn_wave(&mut commands, &mut rng.0, stats.wave, &config.enemy);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(from: u32, from_kind: ColliderKind, into: u32, into_kind: ColliderKind) -> CollisionEntry {
        CollisionEntry {
            from: Entity::from_raw(from),
            into: Entity::from_raw(into),
            from_kind,
            into_kind,
            from_name: format!("{from_kind:?}"),
            into_name: format!("{into_kind:?}"),
        }
    }

    #[test]
    fn plan_pairs_bullet_with_hitbox() {
        let plan = HitPlan::from_entries(&[entry(1, ColliderKind::Bullet, 2, ColliderKind::Hitbox)]);
        assert_eq!(plan.bullets, vec![Entity::from_raw(1)]);
        assert_eq!(plan.enemies, vec![Entity::from_raw(2)]);
    }

    #[test]
    fn plan_ignores_other_pairs() {
        let plan = HitPlan::from_entries(&[
            entry(0, ColliderKind::Player, 2, ColliderKind::Hitbox),
            entry(2, ColliderKind::Hitbox, 1, ColliderKind::Bullet),
        ]);
        assert_eq!(plan, HitPlan::default());
    }

    #[test]
    fn plan_lists_each_entity_once() {
        // Two bullets into one hitbox, and one of them also into a second hitbox.
        let plan = HitPlan::from_entries(&[
            entry(1, ColliderKind::Bullet, 5, ColliderKind::Hitbox),
            entry(2, ColliderKind::Bullet, 5, ColliderKind::Hitbox),
            entry(2, ColliderKind::Bullet, 6, ColliderKind::Hitbox),
        ]);
        assert_eq!(plan.bullets, vec![Entity::from_raw(1), Entity::from_raw(2)]);
        assert_eq!(plan.enemies, vec![Entity::from_raw(5), Entity::from_raw(6)]);
    }
}
