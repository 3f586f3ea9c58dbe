//! Game session actor: owns the match and drives its tick loop

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{interval, Instant};
use tracing::{debug, info};
use uuid::Uuid;

use crate::util::time::{SIMULATION_TPS, SNAPSHOT_TPS, TICK_DURATION_MICROS};
use crate::ws::protocol::{ChatEvent, ServerMsg};

use super::dispatch::dispatch;
use super::hooks::BroadcastHooks;
use super::maps::Map;
use super::r#match::{MatchPhase, MatchSettings, ParkourMatch};
use super::snapshot::SnapshotBuilder;

const INPUT_CAPACITY: usize = 256;
const OUTPUT_CAPACITY: usize = 256;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Game session has shut down")]
    Closed,
}

/// Match summary readable without going through the actor
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub phase: MatchPhase,
    pub match_id: Option<Uuid>,
    pub players: usize,
    pub map: Option<String>,
}

impl Default for SessionStatus {
    fn default() -> Self {
        Self {
            phase: MatchPhase::Idle,
            match_id: None,
            players: 0,
            map: None,
        }
    }
}

/// Handle to the running session
#[derive(Clone)]
pub struct SessionHandle {
    input_tx: mpsc::Sender<ChatEvent>,
    output_tx: broadcast::Sender<ServerMsg>,
    status: Arc<RwLock<SessionStatus>>,
}

impl SessionHandle {
    /// Queue a chat event for the next tick
    pub async fn submit(&self, event: ChatEvent) -> Result<(), SessionError> {
        self.input_tx
            .send(event)
            .await
            .map_err(|_| SessionError::Closed)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerMsg> {
        self.output_tx.subscribe()
    }

    pub fn status(&self) -> SessionStatus {
        self.status.read().clone()
    }
}

/// The authoritative session
pub struct GameSession {
    game: ParkourMatch,
    input_rx: mpsc::Receiver<ChatEvent>,
    output_tx: broadcast::Sender<ServerMsg>,
    snapshot_builder: SnapshotBuilder,
    status: Arc<RwLock<SessionStatus>>,
    restrict_control: bool,
    epoch: Instant,
}

impl GameSession {
    pub fn new(
        settings: MatchSettings,
        maps: Vec<Map>,
        restrict_control: bool,
    ) -> (Self, SessionHandle) {
        let (input_tx, input_rx) = mpsc::channel(INPUT_CAPACITY);
        let (output_tx, _) = broadcast::channel(OUTPUT_CAPACITY);
        let status = Arc::new(RwLock::new(SessionStatus::default()));

        let handle = SessionHandle {
            input_tx,
            output_tx: output_tx.clone(),
            status: status.clone(),
        };

        let game = ParkourMatch::new(settings, maps)
            .with_hooks(Box::new(BroadcastHooks::new(output_tx.clone())));

        let session = Self {
            game,
            input_rx,
            output_tx,
            snapshot_builder: SnapshotBuilder::for_rates(SIMULATION_TPS, SNAPSHOT_TPS),
            status,
            restrict_control,
            epoch: Instant::now(),
        };

        (session, handle)
    }

    /// Create the session and run it on its own task
    pub fn spawn(settings: MatchSettings, maps: Vec<Map>, restrict_control: bool) -> SessionHandle {
        let (session, handle) = Self::new(settings, maps, restrict_control);
        tokio::spawn(session.run());
        handle
    }

    /// Run the tick loop until every handle is dropped
    pub async fn run(mut self) {
        info!(
            tps = SIMULATION_TPS,
            restrict_control = self.restrict_control,
            "Game session started"
        );

        self.epoch = Instant::now();
        let mut tick_interval = interval(Duration::from_micros(TICK_DURATION_MICROS));
        tick_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tick_interval.tick().await;
            let now_ms = self.now_ms();
            let phase_before = self.game.phase();

            // Drain chat queue
            if !self.process_inputs(now_ms) {
                break;
            }

            self.game.tick(now_ms);
            self.publish_events();

            if self.game.phase() != phase_before {
                self.snapshot_builder.force_next();
            }

            if self.game.phase() == MatchPhase::Running && self.snapshot_builder.should_send() {
                let snapshot = self.snapshot_builder.build(&self.game, now_ms);
                let _ = self.output_tx.send(snapshot);
            }

            self.refresh_status();
        }

        info!("All session handles dropped, stopping game session");
    }

    fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    /// Apply every queued chat event. Returns false once the channel is closed.
    fn process_inputs(&mut self, now_ms: u64) -> bool {
        loop {
            match self.input_rx.try_recv() {
                Ok(event) => self.handle_chat(event, now_ms),
                Err(mpsc::error::TryRecvError::Empty) => return true,
                Err(mpsc::error::TryRecvError::Disconnected) => return false,
            }
        }
    }

    fn handle_chat(&mut self, event: ChatEvent, now_ms: u64) {
        let Some(outcome) = dispatch(&mut self.game, &event, now_ms, self.restrict_control)
        else {
            return;
        };

        debug!(
            user_id = %event.user_id,
            command = %event.command,
            success = outcome.success,
            "Command handled"
        );
        // Lifecycle notifications go out before the reply
        self.publish_events();
        let _ = self.output_tx.send(ServerMsg::CommandResult {
            user_id: event.user_id,
            command: event.command,
            outcome,
        });
    }

    fn publish_events(&mut self) {
        for event in self.game.drain_events() {
            let _ = self.output_tx.send(ServerMsg::Event { event });
        }
    }

    fn refresh_status(&self) {
        let mut status = self.status.write();
        status.phase = self.game.phase();
        status.match_id = self.game.match_id();
        status.players = self.game.roster().len();
        status.map = self.game.selected_map().map(|m| m.name.clone());
    }
}
