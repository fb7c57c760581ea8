//! Particle recycling
//!
//! Particles are moved out of the free list on `acquire` and moved back on
//! `release`. Each instance keeps its slot number for its whole life, so the
//! pool can tell an active particle from a stray one.

use std::collections::HashSet;

use glam::Vec2;

use super::state::{Color, Particle, ParticleShape};

/// Initial values for an acquired particle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticleInit {
    pub pos: Vec2,
    pub vel: Vec2,
    pub life: f32,
    pub decay: f32,
    pub color: Color,
    pub size: f32,
    pub shape: ParticleShape,
    pub created_at: f64,
}

/// Free list plus active-slot bookkeeping
#[derive(Debug, Clone)]
pub struct ParticlePool {
    free: Vec<Particle>,
    active: HashSet<u32>,
    max_retained: usize,
    next_slot: u32,
    prewarmed: usize,
    fresh_allocations: usize,
    dropped: usize,
}

impl ParticlePool {
    /// Pool with `prewarm` idle particles, retaining at most `max_retained`
    pub fn new(prewarm: usize, max_retained: usize) -> Self {
        let prewarm = prewarm.min(max_retained);
        let mut pool = Self {
            free: Vec::with_capacity(max_retained),
            active: HashSet::with_capacity(max_retained),
            max_retained,
            next_slot: 0,
            prewarmed: prewarm,
            fresh_allocations: 0,
            dropped: 0,
        };
        for _ in 0..prewarm {
            let particle = pool.allocate();
            pool.free.push(particle);
        }
        pool
    }

    fn allocate(&mut self) -> Particle {
        let slot = self.next_slot;
        self.next_slot = self.next_slot.wrapping_add(1);
        Particle {
            slot,
            pos: Vec2::ZERO,
            vel: Vec2::ZERO,
            life: 0.0,
            decay: 0.0,
            color: [0.0; 4],
            size: 0.0,
            shape: ParticleShape::Spark,
            created_at: 0.0,
        }
    }

    /// Hand out a particle, reusing a released one when possible.
    /// Never fails: an empty free list falls back to a fresh allocation.
    pub fn acquire(&mut self, init: ParticleInit) -> Particle {
        let mut particle = match self.free.pop() {
            Some(p) => p,
            None => {
                self.fresh_allocations += 1;
                self.allocate()
            }
        };
        particle.pos = init.pos;
        particle.vel = init.vel;
        particle.life = init.life;
        particle.decay = init.decay;
        particle.color = init.color;
        particle.size = init.size;
        particle.shape = init.shape;
        particle.created_at = init.created_at;
        self.active.insert(particle.slot);
        particle
    }

    /// Return a dead particle. Returns false (and keeps nothing) if the
    /// particle was not handed out by this pool or was already released.
    pub fn release(&mut self, particle: Particle) -> bool {
        if !self.active.remove(&particle.slot) {
            log::warn!("Released particle slot {} that is not active", particle.slot);
            debug_assert!(false, "double release of particle slot {}", particle.slot);
            return false;
        }
        if self.free.len() < self.max_retained {
            self.free.push(particle);
        } else {
            self.dropped += 1;
        }
        true
    }

    /// Particles currently handed out
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Particles idle in the free list
    pub fn pooled_count(&self) -> usize {
        self.free.len()
    }

    /// Pre-warmed plus freshly allocated instances
    pub fn total_allocated(&self) -> usize {
        self.prewarmed + self.fresh_allocations
    }

    pub fn fresh_allocations(&self) -> usize {
        self.fresh_allocations
    }

    /// Released particles discarded because the free list was full
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn max_retained(&self) -> usize {
        self.max_retained
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init() -> ParticleInit {
        ParticleInit {
            pos: Vec2::new(1.0, 2.0),
            vel: Vec2::new(0.5, -1.0),
            life: 1.0,
            decay: 0.02,
            color: [1.0, 0.8, 0.0, 1.0],
            size: 4.0,
            shape: ParticleShape::Coin,
            created_at: 10.0,
        }
    }

    #[test]
    fn test_prewarmed_particles_are_reused() {
        let mut pool = ParticlePool::new(4, 8);
        let p = pool.acquire(init());
        assert_eq!(pool.fresh_allocations(), 0);
        assert_eq!(pool.pooled_count(), 3);
        assert_eq!(pool.active_count(), 1);
        assert_eq!(p.pos, Vec2::new(1.0, 2.0));

        let slot = p.slot;
        assert!(pool.release(p));
        let again = pool.acquire(init());
        assert_eq!(again.slot, slot);
    }

    #[test]
    fn test_exhaustion_falls_back_to_allocation() {
        let mut pool = ParticlePool::new(1, 8);
        let a = pool.acquire(init());
        let b = pool.acquire(init());
        assert_ne!(a.slot, b.slot);
        assert_eq!(pool.fresh_allocations(), 1);
        assert_eq!(pool.total_allocated(), 2);
    }

    #[test]
    fn test_release_beyond_cap_is_dropped() {
        let mut pool = ParticlePool::new(0, 2);
        let taken: Vec<_> = (0..3).map(|_| pool.acquire(init())).collect();
        for p in taken {
            assert!(pool.release(p));
        }
        assert_eq!(pool.pooled_count(), 2);
        assert_eq!(pool.dropped(), 1);
        assert_eq!(pool.active_count(), 0);
    }

    #[test]
    fn test_conservation() {
        let mut pool = ParticlePool::new(5, 6);
        let mut live = Vec::new();
        for round in 0..20 {
            for _ in 0..(round % 7) {
                live.push(pool.acquire(init()));
            }
            if round % 3 == 0 {
                for p in live.drain(..) {
                    pool.release(p);
                }
            }
            assert!(pool.active_count() + pool.pooled_count() <= pool.total_allocated());
            assert_eq!(pool.active_count(), live.len());
        }
    }

    #[test]
    #[cfg(not(debug_assertions))]
    fn test_foreign_release_is_refused() {
        let mut pool = ParticlePool::new(0, 4);
        let p = pool.acquire(init());
        let copy = p.clone();
        assert!(pool.release(p));
        assert!(!pool.release(copy));
        assert_eq!(pool.pooled_count(), 1);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "double release")]
    fn test_double_release_asserts() {
        let mut pool = ParticlePool::new(0, 4);
        let p = pool.acquire(init());
        let copy = p.clone();
        pool.release(p);
        pool.release(copy);
    }
}
