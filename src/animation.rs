use macroquad::prelude::*;
use strum_macros::{AsRefStr, Display};

use crate::character::CharacterState;
use crate::direction::Direction;

/// Size of one frame in the character and bubble sheets.
pub const FRAME_SIZE: f32 = 64.0;

/// Character sprite sheets; each has one row per direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum Sheet {
    Idle,
    Walk,
    Run,
    Sit,
}

impl Sheet {
    pub fn texture_path(&self) -> String {
        format!("textures/character/{self}.png")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AnimationKey {
    pub sheet: Sheet,
    pub direction: Direction,
}

impl AnimationKey {
    /// `None` for `Controlled`: a frozen character keeps whatever it was playing.
    pub fn for_state(state: CharacterState, direction: Direction) -> Option<Self> {
        let sheet = match state {
            CharacterState::Idle => Sheet::Idle,
            CharacterState::Walk => Sheet::Walk,
            CharacterState::Run => Sheet::Run,
            CharacterState::Sit => Sheet::Sit,
            CharacterState::Controlled => return None,
        };
        Some(Self { sheet, direction })
    }

    pub fn animation(&self) -> Animation {
        match self.sheet {
            Sheet::Idle | Sheet::Sit => Animation::idle(self.direction.sheet_row()),
            Sheet::Walk | Sheet::Run => Animation::stride(self.direction.sheet_row()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub column: usize,
    pub duration: f32,
}

/// Frame timings over one row of a sprite sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct Animation {
    row: usize,
    frames: Vec<Frame>,
    looped: bool,
    current: usize,
    time_bank: f32,
    finished: bool,
}

impl Animation {
    pub fn new(row: usize, frames: Vec<Frame>, looped: bool) -> Self {
        Self {
            row,
            frames,
            looped,
            current: 0,
            time_bank: 0.0,
            finished: false,
        }
    }

    /// Blink cycle: open, half, open, half.
    pub fn idle(row: usize) -> Self {
        let frames = [(0, 0.4), (1, 0.1), (2, 0.4), (1, 0.1)]
            .into_iter()
            .map(|(column, duration)| Frame { column, duration })
            .collect();
        Self::new(row, frames, true)
    }

    /// Eight even steps, shared by walking and running.
    pub fn stride(row: usize) -> Self {
        let frames = (0..8).map(|column| Frame { column, duration: 0.0625 }).collect();
        Self::new(row, frames, true)
    }

    /// Seven quick frames and a one second hold, played once.
    pub fn bubble(row: usize) -> Self {
        let frames = (0..8)
            .map(|column| Frame {
                column,
                duration: if column < 7 { 0.1 } else { 1.0 },
            })
            .collect();
        Self::new(row, frames, false)
    }

    /// Advances by `dt` seconds. Returns `true` on the tick a one-shot
    /// animation completes.
    pub fn tick(&mut self, dt: f32) -> bool {
        if self.finished || self.frames.is_empty() {
            return false;
        }
        self.time_bank += dt;
        let mut zero_steps = 0;
        loop {
            let duration = self.frames[self.current].duration;
            if duration > 0.0 {
                if self.time_bank < duration {
                    break;
                }
                self.time_bank -= duration;
                zero_steps = 0;
            } else {
                // A lap of zero-length frames consumes no time.
                if zero_steps >= self.frames.len() {
                    break;
                }
                zero_steps += 1;
            }
            if self.current + 1 < self.frames.len() {
                self.current += 1;
            } else if self.looped {
                self.current = 0;
            } else {
                self.finished = true;
                return true;
            }
        }
        false
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn current_frame(&self) -> Option<Frame> {
        self.frames.get(self.current).copied()
    }

    /// Source rect of the current frame. Sheet rows are counted from the top.
    pub fn source_rect(&self) -> Option<Rect> {
        let frame = self.current_frame()?;
        Some(Rect::new(
            frame.column as f32 * FRAME_SIZE,
            self.row as f32 * FRAME_SIZE,
            FRAME_SIZE,
            FRAME_SIZE,
        ))
    }

    pub fn total_duration(&self) -> f32 {
        self.frames.iter().map(|f| f.duration).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use speculoos::prelude::*;

    #[test]
    fn keys_are_a_function_of_state_and_direction() {
        let key = AnimationKey::for_state(CharacterState::Run, Direction::Left).unwrap();
        assert_eq!(key.sheet, Sheet::Run);
        assert_eq!(key, AnimationKey::for_state(CharacterState::Run, Direction::Left).unwrap());
        assert_ne!(key, AnimationKey::for_state(CharacterState::Walk, Direction::Left).unwrap());
        assert!(AnimationKey::for_state(CharacterState::Controlled, Direction::Up).is_none());
        assert_eq!(Sheet::Walk.texture_path(), "textures/character/walk.png");
    }

    #[test]
    fn idle_loops_through_blink_cycle() {
        let mut anim = Animation::idle(3);
        let columns: Vec<usize> = (0..5)
            .map(|_| {
                let col = anim.current_frame().unwrap().column;
                let step = anim.current_frame().unwrap().duration;
                assert!(!anim.tick(step));
                col
            })
            .collect();
        assert_eq!(columns, vec![0, 1, 2, 1, 0]);
        assert_that!(anim.source_rect().unwrap().y).is_equal_to(192.0);
    }

    #[test]
    fn stride_timing() {
        let mut anim = Animation::stride(0);
        assert_that!(anim.total_duration()).is_equal_to(0.5);
        anim.tick(0.0625 * 3.0);
        assert_eq!(anim.current_frame().unwrap().column, 3);
        anim.tick(0.5);
        assert_eq!(anim.current_frame().unwrap().column, 3);
        assert!(!anim.is_finished());
    }

    #[test]
    fn bubble_finishes_once() {
        let mut anim = Animation::bubble(1);
        assert!(!anim.tick(0.65));
        assert_eq!(anim.current_frame().unwrap().column, 6);
        assert!(!anim.tick(0.1));
        assert_eq!(anim.current_frame().unwrap().column, 7);
        assert!(anim.tick(1.0));
        assert!(anim.is_finished());
        assert!(!anim.tick(10.0));
    }

    #[test]
    fn zero_length_frames_do_not_stall() {
        let frames = |n| (0..n).map(|column| Frame { column, duration: 0.0 }).collect::<Vec<_>>();
        let mut looped = Animation::new(0, frames(3), true);
        assert!(!looped.tick(0.1));
        assert!(!looped.is_finished());

        let mut once = Animation::new(0, frames(2), false);
        assert!(once.tick(0.0));
        assert!(once.is_finished());
    }
}
