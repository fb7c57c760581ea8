//! Detonation and particle bursts

use glam::Vec2;
use rand::Rng;

use super::factory::{ExplosionStyle, make_particle};
use super::pool::ParticlePool;
use super::state::{BlockId, FallingBlock, Particle, SimulationState};
use crate::consts::*;

/// What destroyed the block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BurstKind {
    /// Unassisted floor impact
    Routine,
    /// Projectile, melee strike or pointer click
    Dramatic,
}

/// Particles spawned for a block of `width` px
pub fn burst_count(kind: BurstKind, width: f32) -> usize {
    let (cap, divisor) = match kind {
        BurstKind::Routine => (ROUTINE_BURST_CAP, ROUTINE_BURST_DIVISOR),
        BurstKind::Dramatic => (DRAMATIC_BURST_CAP, DRAMATIC_BURST_DIVISOR),
    };
    ((width.max(0.0) / divisor).floor() as usize).min(cap)
}

/// Put a block into its exploding state and spawn its burst at the center.
/// Returns the number of particles spawned (0 if it was already exploding).
pub fn explode<R: Rng>(
    block: &mut FallingBlock,
    kind: BurstKind,
    pool: &mut ParticlePool,
    rng: &mut R,
    particles: &mut Vec<Particle>,
    now: f64,
) -> usize {
    if block.exploding {
        return 0;
    }
    block.exploding = true;
    block.explosion_elapsed = 0.0;

    let style = match kind {
        BurstKind::Routine => ExplosionStyle::Routine,
        BurstKind::Dramatic => ExplosionStyle::random_dramatic(rng),
    };
    let count = burst_count(kind, block.width());
    let origin = block.center();
    particles.reserve(count);
    for i in 0..count {
        particles.push(make_particle(pool, rng, origin, style, i, count, now));
    }
    log::debug!("{} exploded ({:?}, {} particles)", block.id, style, count);
    count
}

/// Detonate the topmost live block under `point` (pointer click).
/// The block leaves the live collection on the next block pass.
pub fn detonate_at(state: &mut SimulationState, point: Vec2) -> Option<BlockId> {
    let SimulationState {
        blocks,
        pool,
        rng,
        particles,
        clock_ms,
        ..
    } = state;

    // Later blocks are drawn on top
    let block = blocks
        .iter_mut()
        .rev()
        .find(|b| !b.exploding && b.contains(point))?;
    explode(block, BurstKind::Dramatic, pool, rng, particles, *clock_ms);
    Some(block.id.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::Side;
    use crate::settings::Settings;
    use crate::sim::state::Viewport;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn block(id: &str, x: f32, size: f32) -> FallingBlock {
        FallingBlock {
            id: id.into(),
            pos: Vec2::new(x, 100.0),
            size: Vec2::splat(size),
            velocity: 2.0,
            rotation: 0.0,
            symbol: "SOL".into(),
            side: Side::Long,
            value: 1000.0,
            price: 1.0,
            opacity: 1.0,
            exploding: false,
            explosion_elapsed: 0.0,
            caught: false,
        }
    }

    #[test]
    fn test_burst_counts() {
        assert_eq!(burst_count(BurstKind::Routine, 40.0), 8);
        assert_eq!(burst_count(BurstKind::Routine, 120.0), 15);
        assert_eq!(burst_count(BurstKind::Dramatic, 40.0), 20);
        assert_eq!(burst_count(BurstKind::Dramatic, 120.0), 50);
        assert_eq!(burst_count(BurstKind::Dramatic, 0.0), 0);
    }

    #[test]
    fn test_explode_is_idempotent() {
        let mut rng = Pcg32::seed_from_u64(9);
        let mut pool = ParticlePool::new(10, 100);
        let mut particles = Vec::new();
        let mut b = block("a", 0.0, 60.0);

        let n = explode(&mut b, BurstKind::Routine, &mut pool, &mut rng, &mut particles, 0.0);
        assert_eq!(n, 12);
        assert!(b.exploding);
        assert_eq!(particles.len(), 12);
        assert!(particles.iter().all(|p| p.pos == b.center()));

        let again = explode(&mut b, BurstKind::Dramatic, &mut pool, &mut rng, &mut particles, 0.0);
        assert_eq!(again, 0);
        assert_eq!(particles.len(), 12);
        assert_eq!(pool.active_count(), 12);
    }

    #[test]
    fn test_detonate_at_hits_topmost() {
        let mut state = SimulationState::new(Settings::default(), Viewport::new(800.0, 600.0));
        state.blocks.push(block("under", 100.0, 60.0));
        state.blocks.push(block("over", 120.0, 60.0));

        let hit = detonate_at(&mut state, Vec2::new(130.0, 120.0));
        assert_eq!(hit.as_deref(), Some("over"));
        assert!(state.blocks[1].exploding);
        assert!(!state.blocks[0].exploding);
        assert_eq!(state.particles.len(), 30);

        assert_eq!(detonate_at(&mut state, Vec2::new(700.0, 500.0)), None);
    }
}
