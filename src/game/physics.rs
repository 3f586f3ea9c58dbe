//! Platformer physics: jumping, movement, collision and goal detection

use super::geometry::{Rect, Vec2};
use super::player::{InputFlag, Player};

/// Physics and scoring constants
#[derive(Debug, Clone, Copy)]
pub struct Tuning {
    pub arena_width: f32,
    pub arena_height: f32,
    pub player_radius: f32,
    /// Extra gap kept between a player and the side walls
    pub clamp_buffer: f32,
    pub spawn: Vec2,

    /// Downward acceleration while airborne
    pub gravity: f32,
    /// Initial upward speed of a ground jump
    pub jump_force: f32,
    pub double_jump_multiplier: f32,
    /// Gravity multiplier while the down flag is held in the air
    pub fast_fall_multiplier: f32,

    pub move_acceleration: f32,
    pub move_max_speed: f32,
    /// Per-tick horizontal damping with no lateral input
    pub friction: f32,
    /// Horizontal acceleration added at takeoff of a diagonal jump (× dt)
    pub diagonal_jump_boost: f32,
    pub base_impulse: f32,
    pub impulse_multiplier: f32,
    pub max_horizontal_speed: f32,

    /// How far below a platform top the previous bottom may be and still land
    pub landing_tolerance: f32,
    /// Height above the floor beyond which an unsupported player is airborne
    pub ground_clear_height: f32,

    pub goal_offset: f32,
    /// Goal requires `y <= goal_max_y`
    pub goal_max_y: f32,
    pub fall_out_margin: f32,
    pub finish_bonus: u32,

    pub pulse_ms: u64,
    /// How long a buffered jump request stays usable
    pub jump_buffer_ms: u64,
    pub combo_step_ms: u64,
    pub trail_cap: usize,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            arena_width: 1280.0,
            arena_height: 720.0,
            player_radius: 12.0,
            clamp_buffer: 2.0,
            spawn: Vec2::new(60.0, 560.0),
            gravity: 1500.0,
            jump_force: 560.0,
            double_jump_multiplier: 0.85,
            fast_fall_multiplier: 1.6,
            move_acceleration: 1800.0,
            move_max_speed: 260.0,
            friction: 0.85,
            diagonal_jump_boost: 9000.0,
            base_impulse: 200.0,
            impulse_multiplier: 0.45,
            max_horizontal_speed: 500.0,
            landing_tolerance: 6.0,
            ground_clear_height: 1.0,
            goal_offset: 60.0,
            goal_max_y: 570.0,
            fall_out_margin: 100.0,
            finish_bonus: 100,
            pulse_ms: 200,
            jump_buffer_ms: 200,
            combo_step_ms: 300,
            trail_cap: 20,
        }
    }
}

impl Tuning {
    /// Magnitude of the instantaneous diagonal kick
    pub fn diagonal_impulse(&self) -> f32 {
        self.base_impulse * self.impulse_multiplier
    }
}

/// Observable results of one integration step
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepEvent {
    Jumped { double: bool },
    Finished,
    Eliminated,
    /// Emitted last, with the post-step position
    Moved(Vec2),
}

/// Per-tick context shared by every player
#[derive(Debug, Clone, Copy)]
pub struct StepEnv<'a> {
    pub tuning: &'a Tuning,
    pub solid_floor: bool,
    /// Host clock, stamped on finishers
    pub now_ms: u64,
}

/// Tolerance absorbing float error when re-landing on a surface
const SURFACE_EPSILON: f32 = 1e-3;

/// Physics system for advancing players
pub struct PhysicsSystem;

impl PhysicsSystem {
    /// Advance one live player by `dt` seconds against the solid platform set
    pub fn step(
        player: &mut Player,
        platforms: &[Rect],
        env: &StepEnv<'_>,
        dt: f32,
        events: &mut Vec<StepEvent>,
    ) {
        let t = env.tuning;
        let r = t.player_radius;

        player.prev_pos = player.pos;

        Self::resolve_jump(player, t, dt, events);
        Self::apply_horizontal_control(player, t, dt);

        if !player.grounded {
            let mut gravity = t.gravity;
            if player.input.is_held(InputFlag::Down) {
                gravity *= t.fast_fall_multiplier;
            }
            player.vel.y += gravity * dt;
        }

        player.pos.x += player.vel.x * dt;
        player.pos.y += player.vel.y * dt;

        if env.solid_floor && player.pos.y + r >= t.arena_height {
            player.pos.y = t.arena_height - r;
            if player.vel.y > 0.0 {
                player.vel.y = 0.0;
            }
            player.land();
        }

        Self::clamp_to_arena(player, t);

        let landed = Self::collide_platforms(player, platforms, t);
        if !landed {
            let height_above_floor = t.arena_height - (player.pos.y + r);
            if !env.solid_floor || height_above_floor > t.ground_clear_height {
                player.grounded = false;
            }
        }

        Self::check_goal(player, env, events);

        events.push(StepEvent::Moved(player.pos));
    }

    fn resolve_jump(player: &mut Player, t: &Tuning, dt: f32, events: &mut Vec<StepEvent>) {
        let requested = player.input.is_held(InputFlag::Up) || player.jump_buffer > 0;
        if !requested {
            return;
        }

        if player.grounded {
            player.vel.y = -t.jump_force;

            let boost_dir = if player.input.is_held(InputFlag::DiagonalLeft) {
                -1.0
            } else if player.input.is_held(InputFlag::DiagonalRight) {
                1.0
            } else {
                0.0
            };
            if boost_dir != 0.0 {
                player.vel.x = (player.vel.x + boost_dir * t.diagonal_jump_boost * dt)
                    .clamp(-t.max_horizontal_speed, t.max_horizontal_speed);
            }

            player.grounded = false;
            player.jump_count = 1;
            player.has_double_jumped = false;
            player.jump_buffer = player.jump_buffer.saturating_sub(1);
            player.input.release(InputFlag::Up);
            events.push(StepEvent::Jumped { double: false });
        } else if player.jump_buffer > 0 && player.jump_count == 1 && !player.has_double_jumped {
            player.vel.y = -t.jump_force * t.double_jump_multiplier;
            player.has_double_jumped = true;
            player.jump_count = 2;
            player.jump_buffer -= 1;
            events.push(StepEvent::Jumped { double: true });
        }
    }

    fn apply_horizontal_control(player: &mut Player, t: &Tuning, dt: f32) {
        let left = player.input.is_held(InputFlag::Left);
        let right = player.input.is_held(InputFlag::Right);
        let step = t.move_acceleration * dt;

        if left && player.vel.x > -t.move_max_speed {
            player.vel.x = (player.vel.x - step).max(-t.move_max_speed);
        }
        if right && player.vel.x < t.move_max_speed {
            player.vel.x = (player.vel.x + step).min(t.move_max_speed);
        }
        if !left && !right {
            player.vel.x *= t.friction;
            if player.vel.x.abs() < 0.5 {
                player.vel.x = 0.0;
            }
        }

        player.vel.x = player
            .vel
            .x
            .clamp(-t.max_horizontal_speed, t.max_horizontal_speed);
    }

    fn clamp_to_arena(player: &mut Player, t: &Tuning) {
        let margin = t.player_radius + t.clamp_buffer;
        if player.pos.x < margin {
            player.pos.x = margin;
            if player.vel.x < 0.0 {
                player.vel.x = 0.0;
            }
        } else if player.pos.x > t.arena_width - margin {
            player.pos.x = t.arena_width - margin;
            if player.vel.x > 0.0 {
                player.vel.x = 0.0;
            }
        }
    }

    /// Swept landing and side blocking. Returns true if the player landed.
    fn collide_platforms(player: &mut Player, platforms: &[Rect], t: &Tuning) -> bool {
        let r = t.player_radius;

        for platform in platforms {
            let prev = player.prev_pos;
            let bottom = player.pos.y + r;
            let prev_bottom = prev.y + r;

            let over = platform.overlaps_x(player.pos.x, r);
            let lands = over
                && bottom >= platform.top() - SURFACE_EPSILON
                && prev_bottom <= platform.top() + t.landing_tolerance
                && player.vel.y >= 0.0;

            if lands {
                player.pos.y = platform.top() - r;
                if player.vel.y > 0.0 {
                    player.vel.y = 0.0;
                }
                player.land();
                return true;
            }

            let beside = over
                && platform.overlaps_y(player.pos.y, r)
                && platform.overlaps_y(prev.y, r);
            if !beside {
                continue;
            }

            if player.vel.x > 0.0
                && prev.x + r <= platform.left()
                && player.pos.x + r > platform.left()
            {
                player.pos.x = platform.left() - r;
                player.vel.x = player.vel.x.min(0.0);
            } else if player.vel.x < 0.0
                && prev.x - r >= platform.right()
                && player.pos.x - r < platform.right()
            {
                player.pos.x = platform.right() + r;
                player.vel.x = player.vel.x.max(0.0);
            }
        }

        false
    }

    /// Finishing takes precedence over falling out
    fn check_goal(player: &mut Player, env: &StepEnv<'_>, events: &mut Vec<StepEvent>) {
        let t = env.tuning;
        if !player.alive {
            return;
        }

        let in_goal =
            player.pos.x >= t.arena_width - t.goal_offset && player.pos.y <= t.goal_max_y;
        if in_goal {
            player.score += t.finish_bonus;
            player.alive = false;
            player.finished_at = Some(env.now_ms);
            events.push(StepEvent::Finished);
        } else if player.pos.y > t.arena_height + t.fall_out_margin {
            player.alive = false;
            events.push(StepEvent::Eliminated);
        }
    }
}
