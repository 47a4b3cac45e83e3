// Input state tracking for the keyboard
// Abstracts winit events into a queryable per-frame snapshot of game actions

use std::collections::{HashMap, HashSet};

use bevy_ecs::prelude::*;
use winit::event::{ElementState, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    MoveForward,
    MoveBack,
    MoveLeft,
    MoveRight,
    RotateLeft,
    RotateRight,
    RotateUp,
    RotateDown,
    Fire,
    ToggleStats,
    ToggleColliders,
}

/// Which physical key triggers which action.
pub struct KeyBindings {
    map: HashMap<KeyCode, Action>,
}

impl Default for KeyBindings {
    fn default() -> Self {
        let map = HashMap::from([
            (KeyCode::ArrowUp, Action::MoveForward),
            (KeyCode::ArrowDown, Action::MoveBack),
            (KeyCode::ArrowLeft, Action::MoveLeft),
            (KeyCode::ArrowRight, Action::MoveRight),
            (KeyCode::KeyA, Action::RotateLeft),
            (KeyCode::KeyD, Action::RotateRight),
            (KeyCode::KeyW, Action::RotateUp),
            (KeyCode::KeyS, Action::RotateDown),
            (KeyCode::Space, Action::Fire),
            (KeyCode::F3, Action::ToggleStats),
            (KeyCode::F4, Action::ToggleColliders),
        ]);
        Self { map }
    }
}

impl KeyBindings {
    pub fn action(&self, key: KeyCode) -> Option<Action> {
        self.map.get(&key).copied()
    }
}

/// Engine-facing input for one frame. Inserted as a resource before
/// the schedule runs.
#[derive(Resource, Debug, Default, Clone)]
pub struct ActionState {
    held: HashSet<Action>,
    pressed: HashSet<Action>,
}

impl ActionState {
    pub fn held(&self, action: Action) -> bool {
        self.held.contains(&action)
    }

    /// True only on the frame the key went down.
    pub fn just_pressed(&self, action: Action) -> bool {
        self.pressed.contains(&action)
    }

    pub fn hold(&mut self, action: Action) -> &mut Self {
        self.held.insert(action);
        self
    }

    pub fn press(&mut self, action: Action) -> &mut Self {
        self.held.insert(action);
        self.pressed.insert(action);
        self
    }
}

pub struct InputState {
    keys_held: HashSet<KeyCode>,
    // Keys that went down since the last end_frame(), OS key repeat excluded
    keys_pressed: HashSet<KeyCode>,

    // Window dimensions (used to project debug overlays)
    pub window_size: (u32, u32),
}

impl InputState {
    pub fn new() -> Self {
        Self {
            keys_held: HashSet::new(),
            keys_pressed: HashSet::new(),
            window_size: (0, 0),
        }
    }

    /// Feed a winit WindowEvent into the input state.
    /// Call this once per event before the game's own event handling.
    pub fn process_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(key) = event.physical_key {
                    match event.state {
                        ElementState::Pressed => {
                            if !event.repeat {
                                self.keys_pressed.insert(key);
                            }
                            self.keys_held.insert(key);
                        }
                        ElementState::Released => { self.keys_held.remove(&key); }
                    }
                }
            }
            WindowEvent::Resized(size) => {
                self.window_size = (size.width, size.height);
            }
            // Released keys are never reported once focus is gone.
            WindowEvent::Focused(false) => {
                self.keys_held.clear();
            }
            _ => {}
        }
    }

    /// Call once per frame after update() and render() have consumed input.
    /// Resets per-frame accumulators.
    pub fn end_frame(&mut self) {
        self.keys_pressed.clear();
    }

    pub fn actions(&self, bindings: &KeyBindings) -> ActionState {
        let mut state = ActionState::default();
        for action in self.keys_held.iter().filter_map(|k| bindings.action(*k)) {
            state.hold(action);
        }
        for action in self.keys_pressed.iter().filter_map(|k| bindings.action(*k)) {
            state.press(action);
        }
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_bindings_match_layout() {
        let b = KeyBindings::default();
        assert_eq!(b.action(KeyCode::ArrowUp), Some(Action::MoveForward));
        assert_eq!(b.action(KeyCode::KeyA), Some(Action::RotateLeft));
        assert_eq!(b.action(KeyCode::KeyW), Some(Action::RotateUp));
        assert_eq!(b.action(KeyCode::Space), Some(Action::Fire));
        assert_eq!(b.action(KeyCode::KeyQ), None);
    }

    #[test]
    fn press_implies_held() {
        let mut state = ActionState::default();
        state.press(Action::Fire).hold(Action::MoveLeft);
        assert!(state.just_pressed(Action::Fire));
        assert!(state.held(Action::Fire));
        assert!(state.held(Action::MoveLeft));
        assert!(!state.just_pressed(Action::MoveLeft));
    }

    #[test]
    fn fresh_input_has_no_actions() {
        let input = InputState::new();
        let actions = input.actions(&KeyBindings::default());
        assert!(!actions.held(Action::MoveForward));
        assert!(!actions.just_pressed(Action::Fire));
    }
}
