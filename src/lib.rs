//! Liquidation Rain - crypto liquidations as falling money bags
//!
//! Core modules:
//! - `sim`: Frame simulation (pool, factories, physics, defenders, explosions)
//! - `feed`: Relay message shapes (liquidations, aggregate stats)
//! - `ingest`: Admission of live liquidations into the simulation
//! - `housekeeping`: Periodic sweep bounding memory
//! - `renderer`: Drawing-surface abstraction and scene drawing
//! - `platform`: Browser shell (canvas, animation frames, websocket)
//! - `settings`: Data-driven tuning

pub mod feed;
pub mod housekeeping;
pub mod ingest;
pub mod platform;
pub mod renderer;
pub mod settings;
pub mod sim;

pub use feed::{AggregateStats, LiquidationEvent, RelayMessage, Side};
pub use housekeeping::Housekeeper;
pub use ingest::{AdmitReport, IngestionAdapter, RejectReason};
pub use settings::{ActorKind, Settings};
pub use sim::{FrameDriver, FrameReport, SimulationState};

use glam::Vec2;

/// Simulation constants
pub mod consts {
    /// Reference frame duration (60 Hz); velocities are expressed per reference frame
    pub const FRAME_REFERENCE_MS: f32 = 1000.0 / 60.0;
    /// Largest delta accepted by the driver (tab switches, debugger pauses)
    pub const MAX_FRAME_DELTA_MS: f32 = 100.0;

    /// Particle gravity (px per reference frame²)
    pub const PARTICLE_GRAVITY: f32 = 0.15;
    /// Per-reference-frame size multiplier for particles
    pub const PARTICLE_SHRINK: f32 = 0.97;

    /// Routine (floor impact) burst: min(cap, width / divisor)
    pub const ROUTINE_BURST_CAP: usize = 15;
    pub const ROUTINE_BURST_DIVISOR: f32 = 5.0;
    /// Dramatic (interactive) burst: min(cap, width / divisor)
    pub const DRAMATIC_BURST_CAP: usize = 50;
    pub const DRAMATIC_BURST_DIVISOR: f32 = 2.0;

    /// Projectile travel speed (px per reference frame)
    pub const PROJECTILE_SPEED: f32 = 14.0;
    pub const PROJECTILE_RADIUS: f32 = 6.0;

    /// Cannon fire cycle advance per reference frame
    pub const FIRE_RATE: f32 = 0.04;
    /// Robot swing advance per reference frame
    pub const SWING_RATE: f32 = 0.06;
    /// Swing progress at which a melee strike connects
    pub const SWING_STRIKE_AT: f32 = 0.5;
    /// Horizontal actor speed (px per reference frame)
    pub const ACTOR_SPEED: f32 = 6.0;
    /// Distance at which a robot counts as under its target
    pub const ACTOR_REACH: f32 = 8.0;
    /// Distance from the floor to the actor's pivot
    pub const ACTOR_GROUND_OFFSET: f32 = 30.0;
    /// Horizontal margin keeping actor tracks inside the viewport
    pub const ACTOR_TRACK_MARGIN: f32 = 40.0;
}

/// Multiplier converting a frame delta into reference frames
#[inline]
pub fn frame_multiplier(delta_ms: f32) -> f32 {
    delta_ms / consts::FRAME_REFERENCE_MS
}

/// Strip a known quote-currency suffix from an exchange ticker
pub fn base_symbol(symbol: &str) -> &str {
    symbol
        .strip_suffix("USDT")
        .or_else(|| symbol.strip_suffix("USD"))
        .filter(|s| !s.is_empty())
        .unwrap_or(symbol)
}

/// Angle from `from` toward `to` (radians, screen coordinates)
#[inline]
pub fn aim_angle(from: Vec2, to: Vec2) -> f32 {
    let d = to - from;
    d.y.atan2(d.x)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_symbol() {
        assert_eq!(base_symbol("BTCUSDT"), "BTC");
        assert_eq!(base_symbol("ETHUSD"), "ETH");
        assert_eq!(base_symbol("SOL"), "SOL");
        // A bare quote currency is kept as-is
        assert_eq!(base_symbol("USDT"), "USDT");
    }

    #[test]
    fn test_frame_multiplier() {
        assert!((frame_multiplier(consts::FRAME_REFERENCE_MS) - 1.0).abs() < 1e-6);
        assert!((frame_multiplier(consts::FRAME_REFERENCE_MS * 2.0) - 2.0).abs() < 1e-5);
    }
}
