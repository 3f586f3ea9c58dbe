//! Game simulation modules

pub mod commands;
pub mod dispatch;
pub mod error;
pub mod geometry;
pub mod hooks;
pub mod kinetics;
pub mod maps;
pub mod r#match;
pub mod physics;
pub mod player;
pub mod session;
pub mod snapshot;

pub use error::GameError;
pub use r#match::{MatchPhase, MatchSettings, ParkourMatch};
pub use session::{GameSession, SessionHandle, SessionStatus};
