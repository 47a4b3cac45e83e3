// Tunable game constants, loadable from a JSON file.
// Every field has a default so partial files are accepted.

use std::path::Path;

use bevy_ecs::prelude::*;
use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use super::error::ConfigError;

#[derive(Resource, Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub player: PlayerConfig,
    pub camera: CameraConfig,
    pub bullet: BulletConfig,
    pub enemy: EnemyConfig,
    pub floor: FloorConfig,
    pub waves: WaveConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// World units per second.
    pub speed: f32,
    /// "Move back" is refused once the player is at or behind this Y.
    pub min_y: f32,
    pub collider_radius: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            speed: 25.0,
            min_y: 0.0,
            collider_radius: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Degrees per second.
    pub rotate_speed: f32,
    /// Eye offset from the player position.
    pub offset: Vec3,
    pub limits: CameraLimits,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            rotate_speed: 50.0,
            offset: Vec3::new(0.0, -12.0, 4.0),
            limits: CameraLimits::default(),
        }
    }
}

/// Axis-aligned box the camera eye is clamped to.
/// left/right bound X, near/far bound Y, bottom/top bound Z.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraLimits {
    pub left: f32,
    pub right: f32,
    pub bottom: f32,
    pub top: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraLimits {
    fn default() -> Self {
        Self {
            left: -15.0,
            right: 15.0,
            bottom: -15.0,
            top: 15.0,
            near: -5.0,
            far: 25.0,
        }
    }
}

impl CameraLimits {
    pub fn min(&self) -> Vec3 {
        Vec3::new(self.left, self.near, self.bottom)
    }

    pub fn max(&self) -> Vec3 {
        Vec3::new(self.right, self.far, self.top)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BulletConfig {
    pub speed: f32,
    pub radius: f32,
    /// Bullets beyond this forward depth are removed.
    pub max_y: f32,
    /// Bullets further than this from their spawn point are removed.
    pub max_range: f32,
}

impl Default for BulletConfig {
    fn default() -> Self {
        Self {
            speed: 30.0,
            radius: 0.1,
            max_y: 50.0,
            max_range: 100.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnemyConfig {
    pub count: usize,
    pub drift_speed: f32,
    /// Half-open spawn range on X.
    pub spawn_x: Vec2,
    /// Half-open spawn range on Y.
    pub spawn_y: Vec2,
    /// Enemies that drift below this Y are moved back to a spawn point.
    pub respawn_y: f32,
    pub hitbox_half_extents: Vec3,
}

impl Default for EnemyConfig {
    fn default() -> Self {
        Self {
            count: 5,
            drift_speed: 3.0,
            spawn_x: Vec2::new(-5.0, 5.0),
            spawn_y: Vec2::new(10.0, 20.0),
            respawn_y: -10.0,
            hitbox_half_extents: Vec3::ONE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FloorConfig {
    pub min: Vec2,
    pub max: Vec2,
    pub z: f32,
}

impl Default for FloorConfig {
    fn default() -> Self {
        Self {
            min: Vec2::new(-10.0, 0.0),
            max: Vec2::new(10.0, 20.0),
            z: -0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveConfig {
    /// Spawn a fresh wave once every enemy has been destroyed.
    pub enabled: bool,
}

impl Default for WaveConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl GameConfig {
    /// Read a JSON config file and validate it.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("player.speed", self.player.speed)?;
        positive("player.collider_radius", self.player.collider_radius)?;
        positive("camera.rotate_speed", self.camera.rotate_speed)?;
        positive("bullet.speed", self.bullet.speed)?;
        positive("bullet.radius", self.bullet.radius)?;
        positive("bullet.max_range", self.bullet.max_range)?;
        positive("enemy.drift_speed", self.enemy.drift_speed)?;

        let l = &self.camera.limits;
        if l.left > l.right || l.near > l.far || l.bottom > l.top {
            return Err(ConfigError::invalid(
                "camera.limits",
                "each lower limit must not exceed its upper limit",
            ));
        }

        if self.enemy.count == 0 {
            return Err(ConfigError::invalid("enemy.count", "must spawn at least one enemy"));
        }
        range("enemy.spawn_x", self.enemy.spawn_x)?;
        range("enemy.spawn_y", self.enemy.spawn_y)?;
        if self.enemy.respawn_y >= self.enemy.spawn_y.x {
            return Err(ConfigError::invalid(
                "enemy.respawn_y",
                "must lie below the spawn range or enemies respawn forever",
            ));
        }
        if self.enemy.hitbox_half_extents.min_element() <= 0.0 {
            return Err(ConfigError::invalid(
                "enemy.hitbox_half_extents",
                "every half extent must be positive",
            ));
        }

        if self.floor.min.cmpgt(self.floor.max).any() {
            return Err(ConfigError::invalid("floor", "min corner exceeds max corner"));
        }
        Ok(())
    }
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, format!("must be positive, got {value}")))
    }
}

// gen_range panics on an empty range or one whose width overflows f32.
fn range(field: &'static str, r: Vec2) -> Result<(), ConfigError> {
    if r.x < r.y && (r.y - r.x).is_finite() {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, format!("empty or unbounded range [{}, {})", r.x, r.y)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        assert!(GameConfig::default().validate().is_ok());
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "enemy": {{ "count": 8 }}, "bullet": {{ "speed": 40.0 }} }}"#).unwrap();

        let config = GameConfig::load(file.path()).unwrap();
        assert_eq!(config.enemy.count, 8);
        assert_eq!(config.bullet.speed, 40.0);
        assert_eq!(config.enemy.drift_speed, 3.0);
        assert_eq!(config.camera.limits, CameraLimits::default());
    }

    #[test]
    fn vectors_parse_as_arrays() {
        let config: GameConfig =
            serde_json::from_str(r#"{ "camera": { "offset": [1.0, -2.0, 3.0] } }"#).unwrap();
        assert_eq!(config.camera.offset, Vec3::new(1.0, -2.0, 3.0));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = GameConfig::load(Path::new("/nonexistent/skirmish.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        let err = GameConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn empty_spawn_range_rejected() {
        let mut config = GameConfig::default();
        config.enemy.spawn_x = Vec2::new(3.0, 3.0);
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "enemy.spawn_x", .. }));
    }

    #[test]
    fn inverted_camera_limits_rejected() {
        let mut config = GameConfig::default();
        config.camera.limits.near = 30.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_enemies_rejected() {
        let mut config = GameConfig::default();
        config.enemy.count = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn overflowing_spawn_range_rejected() {
        let mut config = GameConfig::default();
        config.enemy.spawn_x = Vec2::new(-3e38, 3e38);
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "enemy.spawn_x", .. }));
    }

    #[test]
    fn flat_hitbox_rejected() {
        let mut config = GameConfig::default();
        config.enemy.hitbox_half_extents = Vec3::new(1.0, 0.0, 1.0);
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "enemy.hitbox_half_extents", .. }));
    }

    #[test]
    fn inverted_floor_rejected() {
        let mut config = GameConfig::default();
        config.floor.min = Vec2::new(20.0, 0.0);
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "floor", .. }));
    }

    #[test]
    fn respawn_line_inside_spawn_range_rejected() {
        let mut config = GameConfig::default();
        config.enemy.respawn_y = 15.0;
        assert!(config.validate().is_err());
    }
}
