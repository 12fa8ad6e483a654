use macroquad::prelude::*;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use tracing::trace;

use crate::animation::{Animation, AnimationKey};
use crate::direction::Direction;
use crate::geometry::{control_points, ControlPoints};
use crate::input::{InputEvent, Key};

/// Displacement per tick at walking speed, in pixels.
pub const STEP_PER_TICK: f32 = 8.0;
/// Each tick's displacement is validated in this many equal parts.
pub const SUB_STEPS: u32 = 8;
pub const RUN_MULTIPLIER: f32 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum CharacterState {
    #[default]
    Idle,
    Walk,
    Run,
    Sit,
    /// Input is suspended; only outside code brings the character back.
    Controlled,
}

/// Emote shown above the character's head.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Bubble {
    Question,
    Exclamation,
    Dots,
    Love,
}

impl Bubble {
    pub fn sheet_row(&self) -> usize {
        match self {
            Bubble::Question => 0,
            Bubble::Exclamation => 1,
            Bubble::Dots => 2,
            Bubble::Love => 3,
        }
    }
}

/// Decides whether the character may stand at a position.
pub trait MovementGate {
    fn allow_move(&mut self, pos: Vec2) -> bool;
}

#[derive(Debug, Clone)]
pub struct Character {
    position: Vec2,
    direction: Direction,
    state: CharacterState,
    run_held: bool,
    animation_key: Option<AnimationKey>,
    animation: Animation,
    animation_changed: bool,
    bubble: Option<(Bubble, Animation)>,
}

impl Default for Character {
    fn default() -> Self {
        Self::new()
    }
}

impl Character {
    pub fn new() -> Self {
        let key = AnimationKey::for_state(CharacterState::Idle, Direction::Up);
        Self {
            position: Vec2::ZERO,
            direction: Direction::Up,
            state: CharacterState::Idle,
            run_held: false,
            animation: Animation::idle(Direction::Up.sheet_row()),
            animation_key: key,
            animation_changed: false,
            bubble: None,
        }
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn set_position(&mut self, position: Vec2) {
        self.position = position;
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn set_direction(&mut self, direction: Direction) {
        self.direction = direction;
    }

    pub fn state(&self) -> CharacterState {
        self.state
    }

    /// Sets the state from outside input handling: cutscenes, dialogue, sitting.
    pub fn set_state(&mut self, state: CharacterState) {
        self.state = state;
    }

    pub fn control_points(&self) -> ControlPoints {
        control_points(self.position)
    }

    pub fn bubble(&self) -> Option<Bubble> {
        self.bubble.as_ref().map(|(b, _)| *b)
    }

    pub fn set_bubble(&mut self, bubble: Option<Bubble>) {
        self.bubble = bubble.map(|b| (b, Animation::bubble(b.sheet_row())));
    }

    pub fn bubble_animation(&self) -> Option<&Animation> {
        self.bubble.as_ref().map(|(_, a)| a)
    }

    /// Where the bubble sprite is drawn, relative to the world.
    pub fn bubble_position(&self) -> Vec2 {
        self.position + vec2(30.0, 50.0)
    }

    pub fn animation(&self) -> &Animation {
        &self.animation
    }

    pub fn animation_key(&self) -> Option<AnimationKey> {
        self.animation_key
    }

    /// Whether the last tick switched to a different animation.
    pub fn animation_changed(&self) -> bool {
        self.animation_changed
    }

    /// Applies a movement key. Returns `false` when the event is ignored.
    pub fn handle_input(&mut self, event: &InputEvent) -> bool {
        if self.state == CharacterState::Controlled {
            return false;
        }
        match *event {
            InputEvent::Pressed(Key::Run) => self.run_held = true,
            InputEvent::Pressed(Key::Move(dir)) => {
                self.direction = dir;
                self.state = CharacterState::Walk;
            }
            InputEvent::Released(Key::Run) => {
                self.run_held = false;
                if self.state == CharacterState::Run {
                    self.state = CharacterState::Walk;
                }
            }
            InputEvent::Released(Key::Move(dir)) => {
                if dir == self.direction && self.is_moving() {
                    self.state = CharacterState::Idle;
                }
            }
            _ => return false,
        }
        if self.run_held && self.state == CharacterState::Walk {
            self.state = CharacterState::Run;
        }
        true
    }

    pub fn is_moving(&self) -> bool {
        matches!(self.state, CharacterState::Walk | CharacterState::Run)
    }

    /// One frame: animation bookkeeping, then gated movement in sub-steps.
    ///
    /// Motion stops at the first rejected sub-step, so the character never
    /// crosses a region thinner than the whole tick's displacement.
    pub fn tick(&mut self, dt: f32, gate: &mut dyn MovementGate) {
        self.animation_changed = false;
        if let Some(key) = AnimationKey::for_state(self.state, self.direction) {
            if self.animation_key != Some(key) {
                self.animation_key = Some(key);
                self.animation = key.animation();
                self.animation_changed = true;
            }
        }
        self.animation.tick(dt);

        if let Some((_, anim)) = &mut self.bubble {
            if anim.tick(dt) {
                self.bubble = None;
            }
        }

        if !self.is_moving() {
            return;
        }
        let multiplier = if self.state == CharacterState::Run {
            RUN_MULTIPLIER
        } else {
            1.0
        };
        let step = self.direction.as_vec2() * (STEP_PER_TICK / SUB_STEPS as f32) * multiplier;
        for i in 0..SUB_STEPS {
            let next = self.position + step;
            if !gate.allow_move(next) {
                trace!(sub_step = i, x = next.x, y = next.y, "Movement rejected");
                break;
            }
            self.position = next;
        }
    }
}
