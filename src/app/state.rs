//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::game::maps;
use crate::game::{GameSession, SessionHandle};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub session: SessionHandle,
}

impl AppState {
    /// Spawns the game session; must run inside a tokio runtime
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);

        let session = GameSession::spawn(
            config.match_settings(),
            maps::catalogue(),
            config.restrict_control,
        );

        Self { config, session }
    }
}
