//! WebSocket protocol message definitions
//! These are the wire types between the overlay server, the chat bridge and
//! the renderer.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::geometry::{Rect, Vec2};
use crate::game::maps::HazardKind;

/// Chat privilege tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum UserTier {
    #[default]
    Viewer,
    Subscriber,
    Vip,
    Moderator,
    Broadcaster,
}

impl UserTier {
    /// May run match-control commands
    pub fn can_control(self) -> bool {
        matches!(self, Self::Moderator | Self::Broadcaster)
    }
}

impl From<String> for UserTier {
    fn from(raw: String) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "subscriber" | "sub" => Self::Subscriber,
            "vip" => Self::Vip,
            "moderator" | "mod" => Self::Moderator,
            "broadcaster" | "streamer" | "owner" => Self::Broadcaster,
            _ => Self::Viewer,
        }
    }
}

/// Chat message forwarded by the chat bridge
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatEvent {
    /// Leading token including the sigil, e.g. `!ben`
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(alias = "userId")]
    pub user_id: String,
    pub username: String,
    #[serde(default, alias = "userType")]
    pub user_type: UserTier,
    /// Unix milliseconds
    #[serde(with = "chrono::serde::ts_milliseconds", default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

/// Structured result of a match operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub success: bool,
    pub message: String,
}

impl Outcome {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Messages sent from server to overlay clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Lifecycle notification
    Event { event: GameEvent },

    /// Render snapshot (sent at regular intervals while running)
    Snapshot { snapshot: RenderSnapshot },

    /// Per-player visual side effect
    Effect { effect: EffectEvent },

    /// Result of a chat match-control command
    CommandResult {
        user_id: String,
        command: String,
        outcome: Outcome,
    },
}

/// Player identity for lobby and scoreboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub player_id: String,
    pub display_name: String,
    pub tier: UserTier,
    pub color: String,
}

/// One row of the final scoreboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalScore {
    pub rank: u32,
    pub player_id: String,
    pub display_name: String,
    pub score: u32,
    /// Host-clock ms, unset for players who never reached the goal
    pub finished_at: Option<u64>,
    pub joined_at: u64,
}

/// Match lifecycle notifications
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GameEvent {
    GameStarted {
        match_id: Uuid,
        maps: Vec<MapChoice>,
    },
    MapSelected {
        map_id: u32,
        map_name: String,
    },
    PlayerJoined {
        player: PlayerInfo,
        roster_size: usize,
    },
    GameBegun {
        players: Vec<PlayerInfo>,
        start_ms: u64,
        duration_ms: u64,
    },
    PlayerFinished {
        player: PlayerInfo,
        score: u32,
        finished_at: u64,
    },
    PlayerEliminated {
        player: PlayerInfo,
    },
    GameEnded {
        duration_ms: u64,
        final_scores: Vec<FinalScore>,
    },
    GameCancelled {
        reason: String,
    },
}

/// Map option announced during map selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapChoice {
    /// Chat token that selects it, e.g. `!2`
    pub token: String,
    pub map_id: u32,
    pub name: String,
}

/// Per-player visual side effects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum EffectEvent {
    JumpParticle {
        player_id: String,
        at: Vec2,
        double: bool,
    },
    FinishParticle {
        player_id: String,
        at: Vec2,
    },
}

/// Everything the renderer needs for one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderSnapshot {
    pub tick: u64,
    pub running: bool,
    pub map_id: Option<u32>,
    pub start_ms: Option<u64>,
    pub duration_ms: u64,
    pub elapsed_ms: u64,
    pub players: Vec<PlayerSnapshot>,
    pub trails: HashMap<String, Vec<Vec2>>,
    pub platforms: Vec<PlatformSnapshot>,
    pub hazards: Vec<HazardSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub player_id: String,
    pub display_name: String,
    pub color: String,
    pub x: f32,
    pub y: f32,
    pub alive: bool,
    pub score: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformSnapshot {
    pub rect: Rect,
    pub visible: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HazardSnapshot {
    pub rect: Rect,
    pub kind: HazardKind,
}
