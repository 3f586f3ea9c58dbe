//! Per-player side-effect callbacks
//!
//! The match invokes these while integrating; none of them feed back into the
//! simulation, so `NoopHooks` is always a valid choice.

use tokio::sync::broadcast;

use crate::ws::protocol::{EffectEvent, ServerMsg};

use super::geometry::Vec2;

pub trait EffectHooks: Send {
    fn trail_update(&mut self, _player_id: &str, _at: Vec2) {}

    fn jump_particle(&mut self, _player_id: &str, _at: Vec2, _double: bool) {}

    fn finish_particle(&mut self, _player_id: &str, _at: Vec2) {}
}

pub struct NoopHooks;

impl EffectHooks for NoopHooks {}

/// Publishes particle effects to overlay clients. Trails already ride along
/// in render snapshots, so trail updates are not forwarded.
pub struct BroadcastHooks {
    tx: broadcast::Sender<ServerMsg>,
}

impl BroadcastHooks {
    pub fn new(tx: broadcast::Sender<ServerMsg>) -> Self {
        Self { tx }
    }

    fn publish(&self, effect: EffectEvent) {
        // No subscribers is fine
        let _ = self.tx.send(ServerMsg::Effect { effect });
    }
}

impl EffectHooks for BroadcastHooks {
    fn jump_particle(&mut self, player_id: &str, at: Vec2, double: bool) {
        self.publish(EffectEvent::JumpParticle {
            player_id: player_id.to_string(),
            at,
            double,
        });
    }

    fn finish_particle(&mut self, player_id: &str, at: Vec2) {
        self.publish(EffectEvent::FinishParticle {
            player_id: player_id.to_string(),
            at,
        });
    }
}
