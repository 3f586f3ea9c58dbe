//! Render snapshot pacing

use crate::ws::protocol::ServerMsg;

use super::r#match::ParkourMatch;

/// Decides which simulation ticks publish a render snapshot
pub struct SnapshotBuilder {
    /// Tick counter since last snapshot
    ticks_since_snapshot: u32,
    /// Snapshot interval in ticks
    snapshot_interval: u32,
}

impl SnapshotBuilder {
    pub fn new(snapshot_interval: u32) -> Self {
        Self {
            ticks_since_snapshot: 0,
            snapshot_interval: snapshot_interval.max(1),
        }
    }

    /// Interval that turns `simulation_tps` into roughly `snapshot_tps`
    pub fn for_rates(simulation_tps: u32, snapshot_tps: u32) -> Self {
        Self::new(simulation_tps / snapshot_tps.max(1))
    }

    /// Check if it's time to send a snapshot
    pub fn should_send(&mut self) -> bool {
        self.ticks_since_snapshot += 1;
        if self.ticks_since_snapshot >= self.snapshot_interval {
            self.ticks_since_snapshot = 0;
            true
        } else {
            false
        }
    }

    /// Force snapshot on next check (used for lifecycle changes)
    pub fn force_next(&mut self) {
        self.ticks_since_snapshot = self.snapshot_interval;
    }

    /// Build a snapshot message for the current frame
    pub fn build(&self, game: &ParkourMatch, now_ms: u64) -> ServerMsg {
        ServerMsg::Snapshot {
            snapshot: game.render_snapshot(now_ms),
        }
    }
}
