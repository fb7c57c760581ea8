//! Simulation module
//!
//! All scene logic lives here. Stages receive the [`SimulationState`]
//! explicitly from the frame driver; nothing is global:
//! - Seeded RNG only (`Settings::seed`)
//! - Motion scaled by the frame multiplier, never by frame count
//! - Drawing goes through the `Surface` trait, never a concrete backend

pub mod explosion;
pub mod factory;
pub mod interaction;
pub mod physics;
pub mod pool;
pub mod state;
pub mod tick;

pub use explosion::{BurstKind, burst_count, detonate_at, explode};
pub use factory::{ExplosionStyle, SpawnError, make_falling_block, make_particle, tier_for};
pub use interaction::interact;
pub use physics::{BlockFate, ProjectileFate};
pub use pool::{ParticleInit, ParticlePool};
pub use state::{
    Actor, ActorPhase, BlockId, Candidate, Census, Engagement, FallingBlock, Particle,
    ParticleShape, Projectile, SimulationState, Strike, Viewport,
};
pub use tick::{FrameDriver, FrameReport};
