//! Match lifecycle and authoritative tick
//!
//! `ParkourMatch` is a plain owned value: every operation runs to completion
//! on the caller's thread and never reads a wall clock. Hosts pass their
//! monotonic clock in as `now_ms`. Timers are deadlines on this value (match
//! duration, cleanup) or on each player's input state (pulses, combo steps),
//! so cancelling a timer is clearing a field.

use std::collections::{HashMap, VecDeque};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::util::time::delta_from_millis;
use crate::ws::protocol::{
    FinalScore, GameEvent, HazardSnapshot, MapChoice, Outcome, PlatformSnapshot, PlayerSnapshot,
    RenderSnapshot, UserTier,
};

use super::commands;
use super::error::GameError;
use super::geometry::Vec2;
use super::hooks::{EffectHooks, NoopHooks};
use super::kinetics;
use super::maps::Map;
use super::physics::{PhysicsSystem, StepEnv, StepEvent, Tuning};
use super::player::{Player, PlayerId};

/// Match phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPhase {
    /// No match
    Idle,
    /// Waiting for a map pick
    MapSelection,
    /// Accepting joins
    Lobby,
    /// Simulation running
    Running,
    /// Results out, waiting for cleanup
    Ended,
}

impl MatchPhase {
    pub fn is_active(self) -> bool {
        matches!(self, Self::MapSelection | Self::Lobby | Self::Running)
    }
}

const PLAYER_COLORS: [&str; 8] = [
    "#ff6b6b", "#4ecdc4", "#ffe66d", "#a29bfe", "#fd79a8", "#55efc4", "#fab1a0", "#74b9ff",
];

/// Roster limits, timers and physics tuning
#[derive(Debug, Clone)]
pub struct MatchSettings {
    pub min_players: usize,
    pub max_players: usize,
    pub duration_ms: u64,
    pub cleanup_delay_ms: u64,
    /// Seeds colour assignment
    pub seed: u64,
    pub tuning: Tuning,
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self {
            min_players: 2,
            max_players: 20,
            duration_ms: 120_000,
            cleanup_delay_ms: 10_000,
            seed: 0,
            tuning: Tuning::default(),
        }
    }
}

/// The single parkour match
pub struct ParkourMatch {
    settings: MatchSettings,
    maps: Vec<Map>,
    hooks: Box<dyn EffectHooks>,

    phase: MatchPhase,
    id: Option<Uuid>,
    map: Option<Map>,
    roster: Vec<Player>,
    /// Player id → roster slot
    index: HashMap<PlayerId, usize>,
    trails: HashMap<PlayerId, VecDeque<Vec2>>,

    start_ms: Option<u64>,
    /// Time credited on top of the wall elapsed time by a forced end
    credited_ms: u64,
    last_tick_ms: Option<u64>,
    tick: u64,
    end_deadline: Option<u64>,
    cleanup_deadline: Option<u64>,

    rng: ChaCha8Rng,
    outbox: Vec<GameEvent>,
}

impl ParkourMatch {
    pub fn new(settings: MatchSettings, maps: Vec<Map>) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(settings.seed);
        Self {
            settings,
            maps,
            hooks: Box::new(NoopHooks),
            phase: MatchPhase::Idle,
            id: None,
            map: None,
            roster: Vec::new(),
            index: HashMap::new(),
            trails: HashMap::new(),
            start_ms: None,
            credited_ms: 0,
            last_tick_ms: None,
            tick: 0,
            end_deadline: None,
            cleanup_deadline: None,
            rng,
            outbox: Vec::new(),
        }
    }

    pub fn with_hooks(mut self, hooks: Box<dyn EffectHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    pub fn match_id(&self) -> Option<Uuid> {
        self.id
    }

    pub fn settings(&self) -> &MatchSettings {
        &self.settings
    }

    pub fn selected_map(&self) -> Option<&Map> {
        self.map.as_ref()
    }

    pub fn roster(&self) -> &[Player] {
        &self.roster
    }

    pub fn player(&self, player_id: &str) -> Option<&Player> {
        self.index.get(player_id).and_then(|&i| self.roster.get(i))
    }

    pub fn trail(&self, player_id: &str) -> Option<&VecDeque<Vec2>> {
        self.trails.get(player_id)
    }

    /// Map id selected by the 1-based chat token `!n`
    pub fn map_id_for_token(&self, n: usize) -> Option<u32> {
        n.checked_sub(1)
            .and_then(|i| self.maps.get(i))
            .map(|map| map.id)
    }

    /// Take the notifications produced since the last drain
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.outbox)
    }

    /// Match time in ms, including any time credited by a forced end
    pub fn elapsed_ms(&self, now_ms: u64) -> u64 {
        self.start_ms
            .map(|start| now_ms.saturating_sub(start) + self.credited_ms)
            .unwrap_or(0)
    }

    // ------------------------------------------------------------------
    // Lifecycle operations
    // ------------------------------------------------------------------

    /// Idle → MapSelection
    pub fn start_game(&mut self) -> Outcome {
        self.guard("start_game", |m| {
            if m.phase.is_active() {
                return Err(GameError::AlreadyActive);
            }
            m.expect_phase(MatchPhase::Idle)?;

            m.clear_roster();
            let id = Uuid::new_v4();
            m.id = Some(id);
            m.phase = MatchPhase::MapSelection;

            let maps = m
                .maps
                .iter()
                .enumerate()
                .map(|(i, map)| MapChoice {
                    token: format!("!{}", i + 1),
                    map_id: map.id,
                    name: map.name.clone(),
                })
                .collect();
            m.outbox.push(GameEvent::GameStarted { match_id: id, maps });

            Ok("Parkour is starting, vote for a map".to_string())
        })
    }

    /// MapSelection → Lobby
    pub fn select_map(&mut self, map_id: u32) -> Outcome {
        self.guard("select_map", |m| {
            m.expect_phase(MatchPhase::MapSelection)?;
            let map = m
                .maps
                .iter()
                .find(|map| map.id == map_id)
                .cloned()
                .ok_or(GameError::UnknownMap(map_id))?;

            m.clear_roster();
            m.outbox.push(GameEvent::MapSelected {
                map_id: map.id,
                map_name: map.name.clone(),
            });
            let message = format!("{} selected, type !ben to join", map.name);
            m.map = Some(map);
            m.phase = MatchPhase::Lobby;

            Ok(message)
        })
    }

    /// Add a player to the open lobby
    pub fn join_game(
        &mut self,
        player_id: impl Into<PlayerId>,
        display_name: impl Into<String>,
        tier: UserTier,
        now_ms: u64,
    ) -> Outcome {
        let player_id = player_id.into();
        let display_name = display_name.into();

        self.guard("join_game", move |m| {
            m.expect_phase(MatchPhase::Lobby)?;
            if m.index.contains_key(&player_id) {
                return Err(GameError::AlreadyJoined);
            }
            if m.roster.len() >= m.settings.max_players {
                return Err(GameError::RosterFull(m.settings.max_players));
            }

            let color = PLAYER_COLORS[m.rng.gen_range(0..PLAYER_COLORS.len())];
            let player = Player::new(
                player_id.clone(),
                display_name,
                tier,
                color,
                m.settings.tuning.spawn,
                now_ms,
            );
            let info = player.info();

            m.index.insert(player_id.clone(), m.roster.len());
            m.roster.push(player);
            m.trails
                .insert(player_id, VecDeque::with_capacity(m.settings.tuning.trail_cap));

            let roster_size = m.roster.len();
            let message = format!(
                "{} joined ({}/{})",
                info.display_name, roster_size, m.settings.max_players
            );
            m.outbox.push(GameEvent::PlayerJoined {
                player: info,
                roster_size,
            });

            Ok(message)
        })
    }

    /// Lobby → Running once enough players joined
    pub fn manual_start(&mut self, now_ms: u64) -> Outcome {
        self.guard("manual_start", |m| m.begin_game(now_ms))
    }

    /// End a running match now, crediting the full duration
    pub fn force_end_game(&mut self, now_ms: u64) -> Outcome {
        self.guard("force_end_game", |m| {
            m.expect_phase(MatchPhase::Running)?;
            m.end_deadline = None;
            m.credited_ms = m.settings.duration_ms;
            m.finish_match(now_ms)
        })
    }

    /// Any active phase → Ended, publishing final scores
    pub fn end_game(&mut self, now_ms: u64) -> Outcome {
        self.guard("end_game", |m| m.finish_match(now_ms))
    }

    /// Chat-facing stop: ends the match if one is active
    pub fn stop_game(&mut self, now_ms: u64) -> Outcome {
        self.guard("stop_game", |m| {
            if !m.phase.is_active() {
                return Err(GameError::NotActive);
            }
            m.finish_match(now_ms)
        })
    }

    /// Any phase → Idle without scoring
    pub fn cancel_game(&mut self, reason: &str) -> Outcome {
        info!(phase = ?self.phase, reason = %reason, "Cancelling game");
        self.reset();
        self.outbox.push(GameEvent::GameCancelled {
            reason: reason.to_string(),
        });
        Outcome::ok("Game cancelled")
    }

    /// Ended → Idle
    pub fn cleanup(&mut self) -> Outcome {
        self.guard("cleanup", |m| {
            m.expect_phase(MatchPhase::Ended)?;
            m.reset();
            Ok("Arena cleared".to_string())
        })
    }

    /// Route a movement command to a live joined player
    pub fn apply_movement(&mut self, player_id: &str, raw: &str, now_ms: u64) -> bool {
        if self.phase != MatchPhase::Running {
            return false;
        }
        let Some(&slot) = self.index.get(player_id) else {
            return false;
        };
        let tuning = &self.settings.tuning;
        match self.roster.get_mut(slot) {
            Some(player) if player.alive => commands::translate(player, raw, now_ms, tuning),
            _ => false,
        }
    }

    // ------------------------------------------------------------------
    // Tick
    // ------------------------------------------------------------------

    /// Fire due match timers and, while running, advance every live player
    pub fn tick(&mut self, now_ms: u64) {
        if self.phase == MatchPhase::Ended
            && self.cleanup_deadline.is_some_and(|due| now_ms >= due)
        {
            self.cleanup();
            return;
        }

        if self.phase != MatchPhase::Running {
            return;
        }

        if self.end_deadline.is_some_and(|due| now_ms >= due) {
            info!(match_id = ?self.id, "Match duration elapsed");
            self.end_game(now_ms);
            return;
        }

        if let Err(e) = self.integrate(now_ms) {
            error!(error = %e, "Tick failed, cancelling game");
            self.cancel_game(&e.to_string());
            return;
        }

        if !self.roster.is_empty() && self.roster.iter().all(|p| !p.alive) {
            info!(match_id = ?self.id, "Every runner is done, ending early");
            self.end_game(now_ms);
        }
    }

    fn integrate(&mut self, now_ms: u64) -> Result<(), GameError> {
        let elapsed = self.running_elapsed_ms(now_ms)?;
        let map = self
            .map
            .as_ref()
            .ok_or_else(|| GameError::Internal("running match has no map".to_string()))?;
        let platforms = kinetics::solid_rects(&map.platforms, elapsed as f32 / 1000.0);
        let solid_floor = map.solid_floor;

        let dt = delta_from_millis(self.last_tick_ms.unwrap_or(now_ms), now_ms);
        self.last_tick_ms = Some(now_ms);
        self.tick += 1;

        let tuning = &self.settings.tuning;
        let env = StepEnv {
            tuning,
            solid_floor,
            now_ms,
        };
        let mut events = Vec::new();

        for player in self.roster.iter_mut() {
            if !player.alive {
                continue;
            }

            commands::run_due_steps(player, now_ms, tuning);
            player.input.expire(now_ms);
            player.expire_jump_buffer(now_ms);
            PhysicsSystem::step(player, &platforms, &env, dt, &mut events);

            for event in events.drain(..) {
                match event {
                    StepEvent::Jumped { double } => {
                        self.hooks.jump_particle(&player.id, player.pos, double);
                    }
                    StepEvent::Finished => {
                        info!(player_id = %player.id, score = player.score, "Player finished");
                        player.input.clear();
                        self.hooks.finish_particle(&player.id, player.pos);
                        self.outbox.push(GameEvent::PlayerFinished {
                            player: player.info(),
                            score: player.score,
                            finished_at: player.finished_at.unwrap_or(now_ms),
                        });
                    }
                    StepEvent::Eliminated => {
                        info!(player_id = %player.id, "Player eliminated");
                        player.input.clear();
                        self.outbox.push(GameEvent::PlayerEliminated {
                            player: player.info(),
                        });
                    }
                    StepEvent::Moved(at) => {
                        let trail = self.trails.entry(player.id.clone()).or_default();
                        trail.push_back(at);
                        while trail.len() > tuning.trail_cap {
                            trail.pop_front();
                        }
                        self.hooks.trail_update(&player.id, at);
                    }
                }
            }
        }

        Ok(())
    }

    // ------------------------------------------------------------------
    // Results and rendering
    // ------------------------------------------------------------------

    /// Score desc, then earlier finish (finishers first), then earlier join
    pub fn final_scores(&self) -> Vec<FinalScore> {
        let mut ranked: Vec<&Player> = self.roster.iter().collect();
        ranked.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then_with(|| finish_order(a.finished_at, b.finished_at))
                .then_with(|| a.joined_at.cmp(&b.joined_at))
        });

        ranked
            .into_iter()
            .enumerate()
            .map(|(i, p)| FinalScore {
                rank: i as u32 + 1,
                player_id: p.id.clone(),
                display_name: p.display_name.clone(),
                score: p.score,
                finished_at: p.finished_at,
                joined_at: p.joined_at,
            })
            .collect()
    }

    pub fn render_snapshot(&self, now_ms: u64) -> RenderSnapshot {
        let elapsed_ms = self.elapsed_ms(now_ms);
        let t = elapsed_ms as f32 / 1000.0;

        let (map_id, platforms, hazards) = match &self.map {
            Some(map) => (
                Some(map.id),
                map.platforms
                    .iter()
                    .map(|p| {
                        let e = kinetics::effective(p, t);
                        PlatformSnapshot {
                            rect: e.rect,
                            visible: e.visible,
                        }
                    })
                    .collect(),
                map.hazards
                    .iter()
                    .map(|h| HazardSnapshot {
                        rect: h.rect,
                        kind: h.kind,
                    })
                    .collect(),
            ),
            None => (None, Vec::new(), Vec::new()),
        };

        let players = self
            .roster
            .iter()
            .map(|p| PlayerSnapshot {
                player_id: p.id.clone(),
                display_name: p.display_name.clone(),
                color: p.color.to_string(),
                x: p.pos.x,
                y: p.pos.y,
                alive: p.alive,
                score: p.score,
            })
            .collect();

        let trails = self
            .trails
            .iter()
            .map(|(id, trail)| (id.clone(), trail.iter().copied().collect()))
            .collect();

        RenderSnapshot {
            tick: self.tick,
            running: self.phase == MatchPhase::Running,
            map_id,
            start_ms: self.start_ms,
            duration_ms: self.settings.duration_ms,
            elapsed_ms,
            players,
            trails,
            platforms,
            hazards,
        }
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Run a transition. Rejections leave state untouched; internal faults
    /// reset the whole match.
    fn guard<F>(&mut self, operation: &'static str, f: F) -> Outcome
    where
        F: FnOnce(&mut Self) -> Result<String, GameError>,
    {
        match f(self) {
            Ok(message) => {
                info!(op = operation, phase = ?self.phase, "{}", message);
                Outcome::ok(message)
            }
            Err(e) if e.is_internal() => {
                error!(op = operation, error = %e, "Internal fault during transition");
                self.cancel_game(&e.to_string());
                Outcome::fail(e.to_string())
            }
            Err(e) => {
                debug!(op = operation, phase = ?self.phase, error = %e, "Rejected");
                Outcome::fail(e.to_string())
            }
        }
    }

    fn begin_game(&mut self, now_ms: u64) -> Result<String, GameError> {
        self.expect_phase(MatchPhase::Lobby)?;
        if self.roster.len() < self.settings.min_players {
            return Err(GameError::NotEnoughPlayers {
                have: self.roster.len(),
                need: self.settings.min_players,
            });
        }
        if self.map.is_none() {
            return Err(GameError::Internal("lobby has no selected map".to_string()));
        }
        self.verify_index()?;

        let spawn = self.settings.tuning.spawn;
        for player in self.roster.iter_mut() {
            player.reset_to_spawn(spawn);
        }
        for trail in self.trails.values_mut() {
            trail.clear();
        }

        self.start_ms = Some(now_ms);
        self.credited_ms = 0;
        self.last_tick_ms = Some(now_ms);
        self.tick = 0;
        self.end_deadline = Some(now_ms + self.settings.duration_ms);
        self.phase = MatchPhase::Running;

        self.outbox.push(GameEvent::GameBegun {
            players: self.roster.iter().map(Player::info).collect(),
            start_ms: now_ms,
            duration_ms: self.settings.duration_ms,
        });

        Ok(format!(
            "Go! {} runners, {}s on the clock",
            self.roster.len(),
            self.settings.duration_ms / 1000
        ))
    }

    fn finish_match(&mut self, now_ms: u64) -> Result<String, GameError> {
        if !self.phase.is_active() {
            return Err(GameError::NotActive);
        }

        let duration_ms = if self.phase == MatchPhase::Running {
            self.running_elapsed_ms(now_ms)?
        } else {
            0
        };

        self.phase = MatchPhase::Ended;
        self.end_deadline = None;
        self.last_tick_ms = None;
        for player in self.roster.iter_mut() {
            player.input.clear();
        }

        let final_scores = self.final_scores();
        let winner = final_scores
            .first()
            .filter(|s| s.finished_at.is_some())
            .map(|s| s.display_name.clone());
        self.outbox.push(GameEvent::GameEnded {
            duration_ms,
            final_scores,
        });
        self.cleanup_deadline = Some(now_ms + self.settings.cleanup_delay_ms);

        Ok(match winner {
            Some(name) => format!("Game over, {name} wins"),
            None => "Game over, nobody reached the goal".to_string(),
        })
    }

    fn running_elapsed_ms(&self, now_ms: u64) -> Result<u64, GameError> {
        if self.start_ms.is_none() {
            return Err(GameError::Internal(
                "running match has no start time".to_string(),
            ));
        }
        Ok(self.elapsed_ms(now_ms))
    }

    fn expect_phase(&self, expected: MatchPhase) -> Result<(), GameError> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(GameError::WrongPhase {
                expected,
                actual: self.phase,
            })
        }
    }

    fn verify_index(&self) -> Result<(), GameError> {
        let in_sync = self.index.len() == self.roster.len()
            && self
                .roster
                .iter()
                .enumerate()
                .all(|(i, p)| self.index.get(&p.id) == Some(&i));
        if in_sync {
            Ok(())
        } else {
            Err(GameError::Internal("roster index out of sync".to_string()))
        }
    }

    fn clear_roster(&mut self) {
        self.roster.clear();
        self.index.clear();
        self.trails.clear();
    }

    fn reset(&mut self) {
        self.clear_roster();
        self.phase = MatchPhase::Idle;
        self.id = None;
        self.map = None;
        self.start_ms = None;
        self.credited_ms = 0;
        self.last_tick_ms = None;
        self.tick = 0;
        self.end_deadline = None;
        self.cleanup_deadline = None;
    }
}

fn finish_order(a: Option<u64>, b: Option<u64>) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
