// Owns the ECS world and the per-frame schedule.
// The renderer and the tests drive the game only through this type.

use bevy_ecs::prelude::*;
use glam::Vec3;
use rand::SeedableRng;
use rand::rngs::StdRng;

use super::camera::ShooterCamera;
use super::collision::{CollisionEntry, CollisionQueue, CollisionSolid};
use super::components::*;
use super::config::GameConfig;
use super::error::ConfigError;
use super::input::ActionState;
use super::spawn;
use super::systems::*;

/// What the renderer needs to draw one entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderInstance {
    pub kind: ColliderKind,
    pub position: Vec3,
    pub hpr: Vec3,
    pub color: Color,
    /// Half extents of the collision volume (radius on every axis for spheres).
    pub half_extents: Vec3,
    pub bounding_radius: f32,
}

pub struct Game {
    world: World,
    frame: Schedule,
}

impl Game {
    /// Validate the config, then spawn the player and the first wave.
    pub fn new(config: GameConfig, seed: u64) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut world = World::new();
        world.insert_resource(config);
        world.insert_resource(GameRng(StdRng::seed_from_u64(seed)));
        world.init_resource::<ShooterCamera>();
        world.init_resource::<ActionState>();
        world.init_resource::<FrameTime>();
        world.init_resource::<CollisionQueue>();
        world.init_resource::<GameStats>();
        world.init_resource::<ResolvedHits>();

        let mut startup = Schedule::default();
        startup.add_systems((spawn_player_system, first_wave_system).chain());
        startup.run(&mut world);

        let mut frame = Schedule::default();
        frame.add_systems(
            (
                player_movement_system,
                camera_system,
                fire_system,
                bullet_system,
                enemy_system,
                collision_system,
                hit_resolution_system,
                wave_system,
            )
                .chain(),
        );

        log::info!("Game started with seed {}", seed);
        Ok(Self { world, frame })
    }

    /// Run one frame with the given input and elapsed seconds.
    pub fn step(&mut self, actions: &ActionState, dt: f32) {
        self.world.insert_resource(actions.clone());
        self.world.insert_resource(FrameTime { delta: dt });
        self.frame.run(&mut self.world);
    }

    pub fn config(&self) -> &GameConfig {
        self.world.resource::<GameConfig>()
    }

    pub fn camera(&self) -> &ShooterCamera {
        self.world.resource::<ShooterCamera>()
    }

    pub fn stats(&self) -> &GameStats {
        self.world.resource::<GameStats>()
    }

    /// Entries found by the most recent traversal.
    pub fn collisions(&self) -> &[CollisionEntry] {
        &self.world.resource::<CollisionQueue>().entries
    }

    /// Bullets and enemies removed by hits on the most recent frame.
    pub fn last_hits(&self) -> &ResolvedHits {
        self.world.resource::<ResolvedHits>()
    }

    pub fn player_position(&mut self) -> Option<Vec3> {
        let mut query = self.world.query_filtered::<&Transform, With<Player>>();
        query.get_single(&self.world).ok().map(|t| t.position)
    }

    pub fn bullet_positions(&mut self) -> Vec<Vec3> {
        let mut query = self.world.query_filtered::<&Transform, With<Bullet>>();
        query.iter(&self.world).map(|t| t.position).collect()
    }

    pub fn enemy_positions(&mut self) -> Vec<Vec3> {
        let mut query = self.world.query_filtered::<&Transform, With<Enemy>>();
        query.iter(&self.world).map(|t| t.position).collect()
    }

    pub fn entity_count(&self) -> usize {
        self.world.entities().len() as usize
    }

    pub fn render_instances(&mut self) -> Vec<RenderInstance> {
        let mut query = self.world.query::<(&Transform, &Collider, &Color)>();
        query
            .iter(&self.world)
            .map(|(transform, collider, color)| RenderInstance {
                kind: collider.kind,
                position: transform.position,
                hpr: transform.hpr,
                color: *color,
                half_extents: match collider.solid {
                    CollisionSolid::Sphere { radius, .. } => Vec3::splat(radius),
                    CollisionSolid::Cuboid { half_extents, .. } => half_extents,
                },
                bounding_radius: collider.solid.bounding_radius(),
            })
            .collect()
    }

    #[cfg(test)]
    fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }
}

fn spawn_player_system(mut commands: Commands, config: Res<GameConfig>) {
    commands.spawn(spawn::player_bundle(&config));
}
