//! Chat movement commands → timed player input
//!
//! `!a`/`!left`, `!d`/`!right`, `!w`/`!up`, `!down`, `!q`, `!e` apply one
//! primitive. A body of 2–5 letters drawn from `adwqe` is a combo: one
//! primitive per letter, spaced `combo_step_ms` apart.

use tracing::debug;

use super::physics::Tuning;
use super::player::{InputFlag, Player};

pub const COMMAND_SIGIL: char = '!';

const COMBO_LETTERS: &str = "adwqe";
const COMBO_MIN_LEN: usize = 2;
const COMBO_MAX_LEN: usize = 5;

/// A single movement input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    Left,
    Right,
    Up,
    Down,
    DiagonalLeft,
    DiagonalRight,
}

impl Primitive {
    fn from_letter(c: char) -> Option<Self> {
        match c {
            'a' => Some(Self::Left),
            'd' => Some(Self::Right),
            'w' => Some(Self::Up),
            'q' => Some(Self::DiagonalLeft),
            'e' => Some(Self::DiagonalRight),
            _ => None,
        }
    }

    /// Single-primitive body: a combo letter or a legacy word
    pub fn parse(body: &str) -> Option<Self> {
        match body {
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            "up" => Some(Self::Up),
            "down" => Some(Self::Down),
            _ => {
                let mut chars = body.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Self::from_letter(c),
                    _ => None,
                }
            }
        }
    }
}

/// Strip the sigil and normalise. `None` when the text is not a command.
pub fn command_body(raw: &str) -> Option<String> {
    let body = raw.trim().strip_prefix(COMMAND_SIGIL)?;
    let body = body.trim().to_ascii_lowercase();
    if body.is_empty() {
        None
    } else {
        Some(body)
    }
}

/// Decompose a combo body, or `None` if it is not one
pub fn parse_combo(body: &str) -> Option<Vec<Primitive>> {
    let len = body.chars().count();
    if !(COMBO_MIN_LEN..=COMBO_MAX_LEN).contains(&len) {
        return None;
    }
    if !body.chars().all(|c| COMBO_LETTERS.contains(c)) {
        return None;
    }
    body.chars().map(Primitive::from_letter).collect()
}

/// Apply `raw` chat text to `player`. Returns false if it is not a movement command.
pub fn translate(player: &mut Player, raw: &str, now_ms: u64, tuning: &Tuning) -> bool {
    let Some(body) = command_body(raw) else {
        return false;
    };

    if let Some(steps) = parse_combo(&body) {
        debug!(player_id = %player.id, combo = %body, "Scheduling combo");
        let mut due = now_ms;
        for (i, primitive) in steps.into_iter().enumerate() {
            if i == 0 {
                apply_primitive(player, primitive, now_ms, tuning);
            } else {
                due += tuning.combo_step_ms;
                player.input.schedule(primitive, due);
            }
        }
        return true;
    }

    match Primitive::parse(&body) {
        Some(primitive) => {
            apply_primitive(player, primitive, now_ms, tuning);
            true
        }
        None => false,
    }
}

/// Run combo steps that have come due. Steps of a player who died since
/// scheduling are discarded.
pub fn run_due_steps(player: &mut Player, now_ms: u64, tuning: &Tuning) {
    while let Some(step) = player.input.next_due(now_ms) {
        if !player.alive {
            continue;
        }
        apply_primitive(player, step.primitive, step.due_ms, tuning);
    }
}

/// Mutate input state for one primitive issued at `at_ms`
pub fn apply_primitive(player: &mut Player, primitive: Primitive, at_ms: u64, tuning: &Tuning) {
    let pulse = tuning.pulse_ms;
    match primitive {
        Primitive::Left => player.input.pulse(InputFlag::Left, at_ms, pulse),
        Primitive::Right => player.input.pulse(InputFlag::Right, at_ms, pulse),
        Primitive::Down => player.input.pulse(InputFlag::Down, at_ms, pulse),
        Primitive::Up => {
            player.buffer_jump(at_ms, tuning.jump_buffer_ms);
            player.input.pulse(InputFlag::Up, at_ms, pulse);
        }
        Primitive::DiagonalLeft => diagonal(player, -1.0, at_ms, tuning),
        Primitive::DiagonalRight => diagonal(player, 1.0, at_ms, tuning),
    }
}

/// Lateral kick now, jump with extra boost if grounded next tick
fn diagonal(player: &mut Player, dir: f32, at_ms: u64, tuning: &Tuning) {
    let pulse = tuning.pulse_ms;
    let (diag_flag, lateral_flag) = if dir < 0.0 {
        (InputFlag::DiagonalLeft, InputFlag::Left)
    } else {
        (InputFlag::DiagonalRight, InputFlag::Right)
    };
    player.input.pulse(diag_flag, at_ms, pulse);
    player.input.pulse(lateral_flag, at_ms, pulse);
    player.input.pulse(InputFlag::Up, at_ms, pulse);

    let max = tuning.max_horizontal_speed;
    player.vel.x = (player.vel.x + dir * tuning.diagonal_impulse()).clamp(-max, max);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::geometry::Vec2;
    use crate::ws::protocol::UserTier;

    fn player() -> Player {
        Player::new(
            "p1".to_string(),
            "Runner".to_string(),
            UserTier::Viewer,
            "#fff",
            Vec2::new(60.0, 560.0),
            0,
        )
    }

    #[test]
    fn non_commands_are_ignored() {
        let tuning = Tuning::default();
        let mut p = player();
        assert!(!translate(&mut p, "a", 0, &tuning));
        assert!(!translate(&mut p, "!", 0, &tuning));
        assert!(!translate(&mut p, "!jump", 0, &tuning));
        assert!(!translate(&mut p, "!x", 0, &tuning));
        assert!(!p.input.is_held(InputFlag::Left));
    }

    #[test]
    fn single_letter_is_a_primitive_not_a_combo() {
        assert_eq!(parse_combo("a"), None);

        let tuning = Tuning::default();
        let mut p = player();
        assert!(translate(&mut p, "!a", 1_000, &tuning));
        assert!(p.input.is_held(InputFlag::Left));
        assert_eq!(p.input.pending_steps(), 0);
    }

    #[test]
    fn combo_length_and_alphabet_are_gated() {
        assert_eq!(parse_combo("adwqe").map(|s| s.len()), Some(5));
        assert_eq!(parse_combo("adwqea"), None);
        assert_eq!(parse_combo("adx"), None);
        assert_eq!(parse_combo("up"), None);

        let tuning = Tuning::default();
        let mut p = player();
        assert!(!translate(&mut p, "!adwqea", 0, &tuning));
        assert_eq!(p.input.pending_steps(), 0);
    }

    #[test]
    fn legacy_words_map_to_primitives() {
        assert_eq!(Primitive::parse("left"), Some(Primitive::Left));
        assert_eq!(Primitive::parse("right"), Some(Primitive::Right));
        assert_eq!(Primitive::parse("up"), Some(Primitive::Up));
        assert_eq!(Primitive::parse("down"), Some(Primitive::Down));

        let tuning = Tuning::default();
        let mut p = player();
        assert!(translate(&mut p, "  !LEFT ", 0, &tuning));
        assert!(p.input.is_held(InputFlag::Left));
    }

    #[test]
    fn up_buffers_jumps_up_to_two() {
        let tuning = Tuning::default();
        let mut p = player();
        for _ in 0..4 {
            assert!(translate(&mut p, "!w", 0, &tuning));
        }
        assert_eq!(p.jump_buffer, 2);
        assert!(p.input.is_held(InputFlag::Up));
    }

    #[test]
    fn pulses_release_after_pulse_duration() {
        let tuning = Tuning::default();
        let mut p = player();
        translate(&mut p, "!d", 1_000, &tuning);
        p.input.expire(1_000 + tuning.pulse_ms - 1);
        assert!(p.input.is_held(InputFlag::Right));
        p.input.expire(1_000 + tuning.pulse_ms);
        assert!(!p.input.is_held(InputFlag::Right));
    }

    #[test]
    fn combo_applies_first_step_and_staggers_the_rest() {
        let tuning = Tuning::default();
        let mut p = player();
        assert!(translate(&mut p, "!dwa", 1_000, &tuning));

        assert!(p.input.is_held(InputFlag::Right));
        assert_eq!(p.jump_buffer, 0);
        assert_eq!(p.input.pending_steps(), 2);

        run_due_steps(&mut p, 1_299, &tuning);
        assert_eq!(p.jump_buffer, 0);

        run_due_steps(&mut p, 1_300, &tuning);
        assert_eq!(p.jump_buffer, 1);
        assert!(!p.input.is_held(InputFlag::Left));

        run_due_steps(&mut p, 1_600, &tuning);
        assert!(p.input.is_held(InputFlag::Left));
        assert_eq!(p.input.pending_steps(), 0);
    }

    #[test]
    fn overlapping_combos_fire_on_their_own_schedule() {
        let tuning = Tuning::default();
        let mut p = player();
        assert!(translate(&mut p, "!ddddd", 0, &tuning));
        assert!(translate(&mut p, "!aa", 100, &tuning));
        assert_eq!(p.input.pending_steps(), 5);

        run_due_steps(&mut p, 400, &tuning);
        p.input.expire(400);
        assert!(p.input.is_held(InputFlag::Left));
        assert!(p.input.is_held(InputFlag::Right));
        assert_eq!(p.input.pending_steps(), 3);
    }

    #[test]
    fn combo_steps_are_skipped_once_player_died() {
        let tuning = Tuning::default();
        let mut p = player();
        translate(&mut p, "!www", 0, &tuning);
        assert_eq!(p.jump_buffer, 1);

        p.alive = false;
        run_due_steps(&mut p, 10_000, &tuning);
        assert_eq!(p.jump_buffer, 1);
        assert_eq!(p.input.pending_steps(), 0);
    }

    #[test]
    fn diagonal_pulses_three_flags_and_kicks_sideways() {
        let tuning = Tuning::default();
        let mut p = player();
        assert!(translate(&mut p, "!e", 0, &tuning));

        assert!(p.input.is_held(InputFlag::DiagonalRight));
        assert!(p.input.is_held(InputFlag::Right));
        assert!(p.input.is_held(InputFlag::Up));
        assert_eq!(p.jump_buffer, 0);
        assert!((p.vel.x - tuning.diagonal_impulse()).abs() < 1e-3);

        assert!(translate(&mut p, "!q", 0, &tuning));
        assert!(p.input.is_held(InputFlag::DiagonalLeft));
        assert!(p.vel.x.abs() < 1e-3);
    }

    #[test]
    fn repeated_diagonals_respect_speed_cap() {
        let tuning = Tuning::default();
        let mut p = player();
        for _ in 0..50 {
            translate(&mut p, "!e", 0, &tuning);
            assert!(p.vel.x.abs() <= tuning.max_horizontal_speed);
        }
        assert_eq!(p.vel.x, tuning.max_horizontal_speed);

        for _ in 0..50 {
            translate(&mut p, "!qq", 0, &tuning);
            run_due_steps(&mut p, u64::MAX, &tuning);
            assert!(p.vel.x.abs() <= tuning.max_horizontal_speed);
        }
        assert_eq!(p.vel.x, -tuning.max_horizontal_speed);
    }
}
