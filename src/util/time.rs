//! Time utilities for game simulation

use std::time::Instant;

/// Server start time for uptime tracking
static SERVER_START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Initialize server start time (call once at startup)
pub fn init_server_time() {
    SERVER_START.get_or_init(Instant::now);
}

/// Get server uptime in seconds
pub fn uptime_secs() -> u64 {
    SERVER_START
        .get()
        .map(|start| start.elapsed().as_secs())
        .unwrap_or(0)
}

/// Tick rate configuration
pub const SIMULATION_TPS: u32 = 60; // one tick per animation frame
pub const SNAPSHOT_TPS: u32 = 30; // 30 render snapshots per second
pub const TICK_DURATION_MICROS: u64 = 1_000_000 / SIMULATION_TPS as u64;

/// Upper bound on a single integration step (seconds)
pub const MAX_TICK_DT: f32 = 0.05;

/// Nominal delta time for physics (in seconds)
pub fn tick_delta() -> f32 {
    1.0 / SIMULATION_TPS as f32
}

/// Convert a host-clock gap in milliseconds into a clamped physics delta
pub fn delta_from_millis(last_ms: u64, now_ms: u64) -> f32 {
    let gap = now_ms.saturating_sub(last_ms) as f32 / 1000.0;
    gap.clamp(0.0, MAX_TICK_DT)
}
