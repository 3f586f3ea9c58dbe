//! Roster entries and their chat-driven input state

use std::collections::VecDeque;

use crate::ws::protocol::{PlayerInfo, UserTier};

use super::commands::Primitive;
use super::geometry::Vec2;

/// Chat user id
pub type PlayerId = String;

/// One of the six held-input flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFlag {
    Left,
    Right,
    Up,
    Down,
    DiagonalLeft,
    DiagonalRight,
}

impl InputFlag {
    const COUNT: usize = 6;

    fn index(self) -> usize {
        match self {
            Self::Left => 0,
            Self::Right => 1,
            Self::Up => 2,
            Self::Down => 3,
            Self::DiagonalLeft => 4,
            Self::DiagonalRight => 5,
        }
    }
}

/// A combo step waiting for its due time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledStep {
    pub due_ms: u64,
    pub primitive: Primitive,
}

/// Held flags plus the timers that release them.
///
/// A flag is held while it has a release deadline. Clearing the deadline is
/// how a pulse timer gets cancelled.
#[derive(Debug, Clone, Default)]
pub struct InputState {
    release_at: [Option<u64>; InputFlag::COUNT],
    scheduled: VecDeque<ScheduledStep>,
}

impl InputState {
    pub fn is_held(&self, flag: InputFlag) -> bool {
        self.release_at[flag.index()].is_some()
    }

    /// Hold `flag` until `now_ms + duration_ms`, restarting any running pulse
    pub fn pulse(&mut self, flag: InputFlag, now_ms: u64, duration_ms: u64) {
        self.release_at[flag.index()] = Some(now_ms + duration_ms);
    }

    pub fn release(&mut self, flag: InputFlag) {
        self.release_at[flag.index()] = None;
    }

    /// Release every flag whose pulse has run out
    pub fn expire(&mut self, now_ms: u64) {
        for slot in self.release_at.iter_mut() {
            if matches!(slot, Some(deadline) if *deadline <= now_ms) {
                *slot = None;
            }
        }
    }

    /// Queue a step, keeping the queue ordered by due time. Steps due at the
    /// same instant run in the order they were scheduled.
    pub fn schedule(&mut self, primitive: Primitive, due_ms: u64) {
        let at = self.scheduled.partition_point(|step| step.due_ms <= due_ms);
        self.scheduled.insert(at, ScheduledStep { due_ms, primitive });
    }

    /// Pop the next step that is due at `now_ms`
    pub fn next_due(&mut self, now_ms: u64) -> Option<ScheduledStep> {
        match self.scheduled.front() {
            Some(step) if step.due_ms <= now_ms => self.scheduled.pop_front(),
            _ => None,
        }
    }

    pub fn pending_steps(&self) -> usize {
        self.scheduled.len()
    }

    /// Cancel every pulse and queued combo step
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// One participant
#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    pub display_name: String,
    pub tier: UserTier,
    pub color: &'static str,

    // Kinematics
    pub pos: Vec2,
    pub prev_pos: Vec2,
    pub vel: Vec2,
    pub alive: bool,
    pub grounded: bool,

    // Jump bookkeeping
    pub jump_count: u8,
    pub has_double_jumped: bool,
    pub jump_buffer: u8,
    /// Buffered jumps are forgotten at this host time
    pub jump_buffer_until: Option<u64>,

    pub input: InputState,

    // Scoring
    pub score: u32,
    pub joined_at: u64,
    pub finished_at: Option<u64>,
}

impl Player {
    pub const MAX_JUMP_BUFFER: u8 = 2;

    pub fn new(
        id: PlayerId,
        display_name: String,
        tier: UserTier,
        color: &'static str,
        spawn: Vec2,
        joined_at: u64,
    ) -> Self {
        Self {
            id,
            display_name,
            tier,
            color,
            pos: spawn,
            prev_pos: spawn,
            vel: Vec2::ZERO,
            alive: true,
            grounded: true,
            jump_count: 0,
            has_double_jumped: false,
            jump_buffer: 0,
            jump_buffer_until: None,
            input: InputState::default(),
            score: 0,
            joined_at,
            finished_at: None,
        }
    }

    /// Put the player back on the spawn point, keeping identity and join time
    pub fn reset_to_spawn(&mut self, spawn: Vec2) {
        self.pos = spawn;
        self.prev_pos = spawn;
        self.vel = Vec2::ZERO;
        self.alive = true;
        self.grounded = true;
        self.jump_count = 0;
        self.has_double_jumped = false;
        self.jump_buffer = 0;
        self.jump_buffer_until = None;
        self.input.clear();
        self.score = 0;
        self.finished_at = None;
    }

    /// Buffer one more jump request, valid until `at_ms + window_ms`
    pub fn buffer_jump(&mut self, at_ms: u64, window_ms: u64) {
        self.jump_buffer = (self.jump_buffer + 1).min(Self::MAX_JUMP_BUFFER);
        self.jump_buffer_until = Some(at_ms + window_ms);
    }

    /// Drop buffered jumps whose window has passed
    pub fn expire_jump_buffer(&mut self, now_ms: u64) {
        if self.jump_buffer_until.is_some_and(|until| until <= now_ms) {
            self.jump_buffer = 0;
            self.jump_buffer_until = None;
        }
    }

    /// Touching ground resets all jump bookkeeping except the buffer
    pub fn land(&mut self) {
        self.grounded = true;
        self.jump_count = 0;
        self.has_double_jumped = false;
    }

    pub fn info(&self) -> PlayerInfo {
        PlayerInfo {
            player_id: self.id.clone(),
            display_name: self.display_name.clone(),
            tier: self.tier,
            color: self.color.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pulse_holds_until_deadline() {
        let mut input = InputState::default();
        input.pulse(InputFlag::Left, 1_000, 200);
        assert!(input.is_held(InputFlag::Left));

        input.expire(1_199);
        assert!(input.is_held(InputFlag::Left));

        input.expire(1_200);
        assert!(!input.is_held(InputFlag::Left));
    }

    #[test]
    fn repulse_restarts_window() {
        let mut input = InputState::default();
        input.pulse(InputFlag::Right, 0, 200);
        input.pulse(InputFlag::Right, 150, 200);
        input.expire(250);
        assert!(input.is_held(InputFlag::Right));
        input.expire(350);
        assert!(!input.is_held(InputFlag::Right));
    }

    #[test]
    fn scheduled_steps_pop_in_due_order() {
        let mut input = InputState::default();
        input.schedule(Primitive::Left, 300);
        input.schedule(Primitive::Up, 600);

        assert!(input.next_due(299).is_none());
        assert_eq!(input.next_due(300).map(|s| s.primitive), Some(Primitive::Left));
        assert!(input.next_due(599).is_none());
        assert_eq!(input.next_due(900).map(|s| s.primitive), Some(Primitive::Up));
        assert_eq!(input.pending_steps(), 0);
    }

    #[test]
    fn late_scheduled_step_runs_before_earlier_queued_ones() {
        let mut input = InputState::default();
        input.schedule(Primitive::Right, 300);
        input.schedule(Primitive::Right, 1_200);
        input.schedule(Primitive::Left, 400);
        input.schedule(Primitive::Up, 400);

        let order: Vec<_> = std::iter::from_fn(|| input.next_due(u64::MAX))
            .map(|s| (s.due_ms, s.primitive))
            .collect();
        assert_eq!(
            order,
            vec![
                (300, Primitive::Right),
                (400, Primitive::Left),
                (400, Primitive::Up),
                (1_200, Primitive::Right),
            ]
        );
    }

    #[test]
    fn jump_buffer_is_forgotten_after_its_window() {
        let mut player = Player::new(
            "u1".to_string(),
            "Ana".to_string(),
            UserTier::Viewer,
            "#fff",
            Vec2::new(60.0, 560.0),
            0,
        );
        player.buffer_jump(1_000, 200);
        player.buffer_jump(1_100, 200);
        player.buffer_jump(1_150, 200);
        assert_eq!(player.jump_buffer, Player::MAX_JUMP_BUFFER);

        player.expire_jump_buffer(1_349);
        assert_eq!(player.jump_buffer, 2);

        player.expire_jump_buffer(1_350);
        assert_eq!(player.jump_buffer, 0);
        assert_eq!(player.jump_buffer_until, None);
    }

    #[test]
    fn clear_cancels_pulses_and_steps() {
        let mut input = InputState::default();
        input.pulse(InputFlag::Up, 0, 200);
        input.schedule(Primitive::Right, 300);
        input.clear();
        assert!(!input.is_held(InputFlag::Up));
        assert_eq!(input.pending_steps(), 0);
    }

    #[test]
    fn reset_to_spawn_keeps_identity() {
        let mut player = Player::new(
            "u1".to_string(),
            "Ana".to_string(),
            UserTier::Viewer,
            "#fff",
            Vec2::new(60.0, 560.0),
            42,
        );
        player.pos = Vec2::new(500.0, 100.0);
        player.vel = Vec2::new(30.0, -10.0);
        player.alive = false;
        player.score = 100;
        player.finished_at = Some(9);
        player.jump_buffer = 2;

        player.reset_to_spawn(Vec2::new(60.0, 560.0));

        assert_eq!(player.pos, Vec2::new(60.0, 560.0));
        assert_eq!(player.vel, Vec2::ZERO);
        assert!(player.alive && player.grounded);
        assert_eq!(player.jump_buffer, 0);
        assert_eq!(player.finished_at, None);
        assert_eq!(player.joined_at, 42);
        assert_eq!(player.id, "u1");
    }
}
