//! Match operation errors

use super::r#match::MatchPhase;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GameError {
    #[error("A game is already active")]
    AlreadyActive,

    #[error("Not allowed while {actual:?}, expected {expected:?}")]
    WrongPhase {
        expected: MatchPhase,
        actual: MatchPhase,
    },

    #[error("Unknown map {0}")]
    UnknownMap(u32),

    #[error("No map for !{0}")]
    UnknownMapToken(usize),

    #[error("Player already joined")]
    AlreadyJoined,

    #[error("Roster is full ({0} players)")]
    RosterFull(usize),

    #[error("Need at least {need} players, have {have}")]
    NotEnoughPlayers { have: usize, need: usize },

    #[error("No active game")]
    NotActive,

    #[error("Only moderators can do that")]
    NotPrivileged,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl GameError {
    /// Faults that leave the match untrustworthy and force a reset
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Internal(_))
    }
}
