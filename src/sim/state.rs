//! Simulation entities and the state owned by the frame driver

use std::collections::HashMap;

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;

use super::pool::ParticlePool;
use crate::consts::*;
use crate::feed::{AggregateStats, Side};
use crate::settings::{ActorKind, Settings};

/// Source identifier of a liquidation, shared by its block
pub type BlockId = String;

/// RGBA, components in 0-1
pub type Color = [f32; 4];

/// Drawable area in CSS pixels, origin top-left
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// A zero-area viewport means the drawing surface is not available yet
    pub fn is_usable(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }

    /// Blocks hitting this line explode
    pub fn floor(&self) -> f32 {
        self.height
    }
}

/// One liquidation falling through the scene
#[derive(Debug, Clone, PartialEq)]
pub struct FallingBlock {
    pub id: BlockId,
    /// Top-left corner
    pub pos: Vec2,
    /// Width and height
    pub size: Vec2,
    /// Fall speed (px per reference frame)
    pub velocity: f32,
    pub rotation: f32,
    /// Coin symbol with the quote currency stripped
    pub symbol: String,
    pub side: Side,
    pub value: f64,
    pub price: f64,
    pub opacity: f32,
    pub exploding: bool,
    /// Time spent exploding (ms)
    pub explosion_elapsed: f32,
    /// Claimed by a defender
    pub caught: bool,
}

impl FallingBlock {
    pub fn center(&self) -> Vec2 {
        self.pos + self.size * 0.5
    }

    pub fn width(&self) -> f32 {
        self.size.x
    }

    pub fn bottom(&self) -> f32 {
        self.pos.y + self.size.y
    }

    /// Point-in-bounding-box test
    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.pos.x
            && point.x <= self.pos.x + self.size.x
            && point.y >= self.pos.y
            && point.y <= self.pos.y + self.size.y
    }
}

/// Visual variant of a particle; the renderer switches on this
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticleShape {
    /// Gold coin (floor impacts)
    Coin,
    /// Small bright streak
    Spark,
    /// Expanding shockwave outline
    Ring,
    /// Glowing blob
    Ember,
    /// Angular fragment
    Shard,
    /// Tumbling paper square
    Confetti,
}

/// Short-lived effect unit, recycled through [`ParticlePool`]
#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    /// Pool slot; stable across reuse
    pub slot: u32,
    pub pos: Vec2,
    /// px per reference frame
    pub vel: Vec2,
    /// 1.0 at birth, dead at 0
    pub life: f32,
    /// Life lost per reference frame
    pub decay: f32,
    pub color: Color,
    pub size: f32,
    pub shape: ParticleShape,
    /// Frame clock at creation (ms)
    pub created_at: f64,
}

/// A shot travelling toward a claimed block
#[derive(Debug, Clone, PartialEq)]
pub struct Projectile {
    /// Index of the firing actor
    pub owner: usize,
    pub target: BlockId,
    pub pos: Vec2,
    /// Fixed at launch (px per reference frame)
    pub vel: Vec2,
    /// Remaining lifetime budget (ms)
    pub lifetime_ms: f32,
}

/// Defender state machine phase
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ActorPhase {
    /// Nothing to defend against; parked out of view
    Idle,
    /// Patrolling its track, or walking to a claimed target
    Acquiring,
    /// Committed: the fire/swing cycle is running
    Firing {
        /// 0 → 1 over one cycle
        progress: f32,
        /// The strike for this cycle has been delivered
        struck: bool,
    },
}

/// A persistent defender
#[derive(Debug, Clone, PartialEq)]
pub struct Actor {
    pub id: usize,
    pub kind: ActorKind,
    pub pos: Vec2,
    /// Where the actor is heading or aiming
    pub target_pos: Vec2,
    /// Barrel/tool angle (radians)
    pub aim: f32,
    pub phase: ActorPhase,
    /// Claimed block, at most one
    pub target: Option<BlockId>,
    /// Patrol direction (+1 right, -1 left)
    pub patrol_dir: f32,
}

impl Actor {
    pub fn new(id: usize, kind: ActorKind, pos: Vec2) -> Self {
        Self {
            id,
            kind,
            pos,
            target_pos: pos,
            aim: -std::f32::consts::FRAC_PI_2,
            phase: ActorPhase::Idle,
            target: None,
            patrol_dir: if id % 2 == 0 { 1.0 } else { -1.0 },
        }
    }

    pub fn is_active(&self) -> bool {
        self.phase != ActorPhase::Idle
    }

    pub fn is_firing(&self) -> bool {
        matches!(self.phase, ActorPhase::Firing { .. })
    }

    /// Current fire/swing progress (0 when not firing)
    pub fn progress(&self) -> f32 {
        match self.phase {
            ActorPhase::Firing { progress, .. } => progress,
            _ => 0.0,
        }
    }
}

/// A block hit by a projectile or melee swing, resolved on the next block pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Strike {
    pub block: BlockId,
    pub by: usize,
}

/// A block offering itself for targeting this frame
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub block: BlockId,
    pub center: Vec2,
}

/// Per-frame output of the block pass consumed by the interaction stage
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Engagement {
    /// Unclaimed blocks inside the engagement band
    pub in_band: Vec<Candidate>,
    /// Subset that passed this frame's random fire check
    pub offers: Vec<Candidate>,
}

/// Everything the frame driver advances, passed explicitly to each stage
#[derive(Debug, Clone)]
pub struct SimulationState {
    pub settings: Settings,
    pub viewport: Viewport,
    pub rng: Pcg32,
    /// Timestamp of the current frame (ms, host clock)
    pub clock_ms: f64,
    /// Falling, targetable blocks
    pub blocks: Vec<FallingBlock>,
    /// Exploded blocks playing their fade-out
    pub wrecks: Vec<FallingBlock>,
    pub particles: Vec<Particle>,
    pub projectiles: Vec<Projectile>,
    pub actors: Vec<Actor>,
    pub pool: ParticlePool,
    /// Hits waiting for the next block pass
    pub pending_strikes: Vec<Strike>,
    /// Claimed block → actor index, written by the interaction stage
    pub claims: HashMap<BlockId, usize>,
    /// Sidebar aggregates
    pub stats: AggregateStats,
}

impl SimulationState {
    pub fn new(settings: Settings, viewport: Viewport) -> Self {
        let settings = settings.sanitized();
        let pool = ParticlePool::new(settings.pool_prewarm, settings.pool_max);
        let mut state = Self {
            rng: Pcg32::seed_from_u64(settings.seed),
            viewport,
            clock_ms: 0.0,
            blocks: Vec::new(),
            wrecks: Vec::new(),
            particles: Vec::new(),
            projectiles: Vec::new(),
            actors: Vec::new(),
            pool,
            pending_strikes: Vec::new(),
            claims: HashMap::new(),
            stats: AggregateStats::default(),
            settings,
        };
        state.spawn_actors();
        state
    }

    /// Allocate the defender roster (once per state)
    fn spawn_actors(&mut self) {
        let (left, right) = self.actor_track();
        let count = self.settings.actors.len();
        let ground = self.viewport.floor() - ACTOR_GROUND_OFFSET;
        self.actors = self
            .settings
            .actors
            .iter()
            .enumerate()
            .map(|(i, &kind)| {
                let t = (i as f32 + 1.0) / (count as f32 + 1.0);
                Actor::new(i, kind, Vec2::new(left + (right - left) * t, ground))
            })
            .collect();
    }

    /// Horizontal limits of the actor patrol track
    pub fn actor_track(&self) -> (f32, f32) {
        let left = ACTOR_TRACK_MARGIN.min(self.viewport.width * 0.5);
        let right = (self.viewport.width - ACTOR_TRACK_MARGIN).max(left);
        (left, right)
    }

    /// Host viewport changed; keep actors on the ground and inside their track
    pub fn resize(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        let (left, right) = self.actor_track();
        let ground = viewport.floor() - ACTOR_GROUND_OFFSET;
        for actor in &mut self.actors {
            actor.pos = Vec2::new(actor.pos.x.clamp(left, right), ground);
            actor.target_pos.x = actor.target_pos.x.clamp(left, right);
        }
    }

    /// Whether a live (falling) block with this source id exists
    pub fn has_live_block(&self, id: &str) -> bool {
        self.blocks.iter().any(|b| b.id == id)
    }

    pub fn block(&self, id: &str) -> Option<&FallingBlock> {
        self.blocks.iter().find(|b| b.id == id)
    }

    /// Entity counts, for diagnostics
    pub fn census(&self) -> Census {
        Census {
            blocks: self.blocks.len(),
            wrecks: self.wrecks.len(),
            particles: self.particles.len(),
            pooled: self.pool.pooled_count(),
            projectiles: self.projectiles.len(),
            active_actors: self.actors.iter().filter(|a| a.is_active()).count(),
        }
    }
}

/// Snapshot of collection sizes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Census {
    pub blocks: usize,
    pub wrecks: usize,
    pub particles: usize,
    pub pooled: usize,
    pub projectiles: usize,
    pub active_actors: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_spawns_roster() {
        let settings = Settings {
            actors: vec![ActorKind::Cannon, ActorKind::Robot],
            ..Default::default()
        };
        let state = SimulationState::new(settings, Viewport::new(800.0, 600.0));
        assert_eq!(state.actors.len(), 2);
        assert!(state.actors.iter().all(|a| !a.is_active()));
        assert!(state.actors[0].pos.x < state.actors[1].pos.x);
        assert_eq!(state.pool.pooled_count(), 200);
    }

    #[test]
    fn test_resize_clamps_actors() {
        let mut state = SimulationState::new(Settings::default(), Viewport::new(1200.0, 800.0));
        state.actors[0].pos.x = 1100.0;
        state.resize(Viewport::new(400.0, 300.0));
        let (_, right) = state.actor_track();
        assert!(state.actors[0].pos.x <= right);
        assert_eq!(state.actors[0].pos.y, 300.0 - ACTOR_GROUND_OFFSET);
    }

    #[test]
    fn test_block_contains() {
        let block = FallingBlock {
            id: "b".into(),
            pos: Vec2::new(10.0, 10.0),
            size: Vec2::new(40.0, 40.0),
            velocity: 1.0,
            rotation: 0.0,
            symbol: "BTC".into(),
            side: Side::Long,
            value: 1.0,
            price: 1.0,
            opacity: 1.0,
            exploding: false,
            explosion_elapsed: 0.0,
            caught: false,
        };
        assert!(block.contains(Vec2::new(30.0, 30.0)));
        assert!(!block.contains(Vec2::new(5.0, 30.0)));
        assert_eq!(block.center(), Vec2::new(30.0, 30.0));
    }
}
