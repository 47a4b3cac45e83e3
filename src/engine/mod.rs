// Engine module - game state, ECS systems and the pieces the renderer reads

pub mod camera;
pub mod collision;
pub mod components;
pub mod config;
pub mod debug_overlay;
pub mod error;
pub mod game;
pub mod input;
pub mod mesh;
pub mod spawn;
pub mod systems;

// Re-export commonly used items
pub use components::*;
pub use config::GameConfig;
pub use game::{Game, RenderInstance};
