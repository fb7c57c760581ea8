//! Entity construction
//!
//! Blocks are sized from the liquidation's USD value; particles are built
//! from an explosion style that fixes palette, speed, size and motion.

use std::f32::consts::TAU;

use glam::Vec2;
use rand::Rng;
use thiserror::Error;

use super::pool::{ParticleInit, ParticlePool};
use super::state::{Color, FallingBlock, Particle, ParticleShape, Viewport};
use crate::base_symbol;
use crate::feed::LiquidationEvent;

/// Value breakpoints → (block size px, fall speed px/frame).
/// Size grows and speed drops at every breakpoint.
pub const VALUE_TIERS: [(f64, f32, f32); 7] = [
    (5_000.0, 40.0, 3.0),
    (15_000.0, 50.0, 2.6),
    (50_000.0, 60.0, 2.2),
    (100_000.0, 72.0, 1.9),
    (500_000.0, 86.0, 1.6),
    (1_000_000.0, 100.0, 1.3),
    (f64::INFINITY, 120.0, 1.0),
];

/// (size, base velocity) for a USD value
pub fn tier_for(value: f64) -> (f32, f32) {
    VALUE_TIERS
        .iter()
        .find(|(limit, _, _)| value < *limit)
        .map(|&(_, size, velocity)| (size, velocity))
        .unwrap_or((VALUE_TIERS[6].1, VALUE_TIERS[6].2))
}

/// Block construction failure
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum SpawnError {
    #[error("drawing surface unavailable ({width}x{height})")]
    NoSurface { width: f32, height: f32 },
}

/// Build the block for one liquidation, just above the top edge
pub fn make_falling_block<R: Rng>(
    event: &LiquidationEvent,
    viewport: &Viewport,
    rng: &mut R,
) -> Result<FallingBlock, SpawnError> {
    if !viewport.is_usable() {
        return Err(SpawnError::NoSurface {
            width: viewport.width,
            height: viewport.height,
        });
    }

    let (size, velocity) = tier_for(event.value);
    let span = viewport.width - size;
    let x = if span > 0.0 {
        rng.random_range(0.0..span)
    } else {
        0.0
    };

    Ok(FallingBlock {
        id: event.id.clone(),
        pos: Vec2::new(x, -size),
        size: Vec2::splat(size),
        velocity,
        rotation: 0.0,
        symbol: base_symbol(&event.symbol).to_string(),
        side: event.side,
        value: event.value,
        price: event.price,
        opacity: 1.0,
        exploding: false,
        explosion_elapsed: 0.0,
        caught: false,
    })
}

/// Explosion look, chosen by what destroyed the block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExplosionStyle {
    /// Unassisted floor impact: a handful of coins
    Routine,
    /// Random sparks in warm colors
    Fireworks,
    /// Evenly spaced radial embers behind a shockwave ring
    Supernova,
    /// Shards thrown out along a spiral
    Vortex,
    /// Sparks grouped into rays
    Starburst,
    /// Slow multicolor paper
    Confetti,
}

/// Styles used for interactive destructions
pub const DRAMATIC_STYLES: [ExplosionStyle; 5] = [
    ExplosionStyle::Fireworks,
    ExplosionStyle::Supernova,
    ExplosionStyle::Vortex,
    ExplosionStyle::Starburst,
    ExplosionStyle::Confetti,
];

/// How a style computes particle velocity
#[derive(Debug, Clone, Copy, PartialEq)]
enum Motion {
    /// Mild random spread, biased upward
    Toss,
    /// Uniform random direction
    Scatter,
    /// Evenly spaced angles
    Radial,
    /// Angle and speed grow with index
    Spiral { turns: f32 },
    /// Particles bunched into `rays` directions
    Burst { rays: u32 },
}

struct StyleSpec {
    palette: &'static [Color],
    speed: f32,
    size: (f32, f32),
    decay: f32,
    shape: ParticleShape,
    motion: Motion,
}

const GOLD: &[Color] = &[[1.0, 0.84, 0.0, 1.0], [0.93, 0.75, 0.1, 1.0], [1.0, 0.92, 0.45, 1.0]];
const FIRE: &[Color] = &[[1.0, 0.35, 0.1, 1.0], [1.0, 0.6, 0.0, 1.0], [1.0, 0.9, 0.3, 1.0]];
const PLASMA: &[Color] = &[[0.6, 0.3, 1.0, 1.0], [0.3, 0.6, 1.0, 1.0], [1.0, 1.0, 1.0, 1.0]];
const TOXIC: &[Color] = &[[0.2, 1.0, 0.4, 1.0], [0.6, 1.0, 0.2, 1.0], [0.1, 0.8, 0.6, 1.0]];
const ELECTRIC: &[Color] = &[[0.4, 0.9, 1.0, 1.0], [1.0, 1.0, 1.0, 1.0], [0.2, 0.5, 1.0, 1.0]];
const PARTY: &[Color] = &[
    [1.0, 0.2, 0.4, 1.0],
    [0.2, 0.8, 1.0, 1.0],
    [1.0, 0.9, 0.2, 1.0],
    [0.5, 1.0, 0.3, 1.0],
    [0.8, 0.4, 1.0, 1.0],
];

impl ExplosionStyle {
    fn spec(self) -> StyleSpec {
        match self {
            ExplosionStyle::Routine => StyleSpec {
                palette: GOLD,
                speed: 2.5,
                size: (4.0, 7.0),
                decay: 0.015,
                shape: ParticleShape::Coin,
                motion: Motion::Toss,
            },
            ExplosionStyle::Fireworks => StyleSpec {
                palette: FIRE,
                speed: 8.0,
                size: (2.0, 5.0),
                decay: 0.025,
                shape: ParticleShape::Spark,
                motion: Motion::Scatter,
            },
            ExplosionStyle::Supernova => StyleSpec {
                palette: PLASMA,
                speed: 9.0,
                size: (3.0, 6.0),
                decay: 0.02,
                shape: ParticleShape::Ember,
                motion: Motion::Radial,
            },
            ExplosionStyle::Vortex => StyleSpec {
                palette: TOXIC,
                speed: 7.0,
                size: (3.0, 7.0),
                decay: 0.018,
                shape: ParticleShape::Shard,
                motion: Motion::Spiral { turns: 2.0 },
            },
            ExplosionStyle::Starburst => StyleSpec {
                palette: ELECTRIC,
                speed: 10.0,
                size: (2.0, 4.0),
                decay: 0.03,
                shape: ParticleShape::Spark,
                motion: Motion::Burst { rays: 8 },
            },
            ExplosionStyle::Confetti => StyleSpec {
                palette: PARTY,
                speed: 5.0,
                size: (4.0, 8.0),
                decay: 0.012,
                shape: ParticleShape::Confetti,
                motion: Motion::Scatter,
            },
        }
    }

    /// Pick one of the dramatic styles uniformly
    pub fn random_dramatic<R: Rng>(rng: &mut R) -> Self {
        DRAMATIC_STYLES[rng.random_range(0..DRAMATIC_STYLES.len())]
    }
}

/// Build particle `index` of a `count`-particle burst centred on `origin`
pub fn make_particle<R: Rng>(
    pool: &mut ParticlePool,
    rng: &mut R,
    origin: Vec2,
    style: ExplosionStyle,
    index: usize,
    count: usize,
    now: f64,
) -> Particle {
    let spec = style.spec();
    let t = index as f32 / count.max(1) as f32;
    let jitter: f32 = rng.random_range(0.85..1.15);

    let vel = match spec.motion {
        Motion::Toss => Vec2::new(
            rng.random_range(-1.0f32..1.0) * spec.speed * 0.6,
            -rng.random_range(0.5f32..1.0) * spec.speed,
        ),
        Motion::Scatter => {
            let angle = rng.random_range(0.0..TAU);
            let speed = spec.speed * rng.random_range(0.3f32..1.0);
            Vec2::from_angle(angle) * speed
        }
        Motion::Radial => Vec2::from_angle(t * TAU) * spec.speed * jitter,
        Motion::Spiral { turns } => {
            let angle = t * TAU * turns;
            let radial = Vec2::from_angle(angle);
            let tangent = radial.perp();
            (radial + tangent * 0.6) * spec.speed * (0.3 + 0.7 * t)
        }
        Motion::Burst { rays } => {
            let rays = rays.max(1) as usize;
            let angle = (index % rays) as f32 / rays as f32 * TAU + rng.random_range(-0.08f32..0.08);
            // Later particles in a ray travel slower, forming a streak
            let laps = count.div_ceil(rays).max(1) as f32;
            let along = 1.0 - (index / rays) as f32 / (laps + 1.0);
            Vec2::from_angle(angle) * spec.speed * along
        }
    };

    // A supernova opens with a stationary shockwave ring
    let (shape, size, vel) = if style == ExplosionStyle::Supernova && index == 0 {
        (ParticleShape::Ring, spec.size.1 * 2.0, Vec2::ZERO)
    } else {
        (spec.shape, rng.random_range(spec.size.0..spec.size.1), vel)
    };

    let color = spec.palette[rng.random_range(0..spec.palette.len())];

    pool.acquire(ParticleInit {
        pos: origin,
        vel,
        life: 1.0,
        decay: spec.decay * jitter,
        color,
        size,
        shape,
        created_at: now,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::Side;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn event(value: f64) -> LiquidationEvent {
        LiquidationEvent {
            id: "x1".into(),
            timestamp: 0.0,
            symbol: "BTCUSDT".into(),
            side: Side::Short,
            size: 1.0,
            price: value,
            value,
        }
    }

    #[test]
    fn test_tier_breakpoints_are_strict_steps() {
        let pairs = [
            (4_999.0, 5_000.0),
            (14_999.0, 15_000.0),
            (49_999.0, 50_000.0),
            (99_999.0, 100_000.0),
            (499_999.0, 500_000.0),
            (999_999.0, 1_000_000.0),
        ];
        for (below, at) in pairs {
            let (s0, v0) = tier_for(below);
            let (s1, v1) = tier_for(at);
            assert!(s0 < s1, "size must step up at {at}");
            assert!(v0 > v1, "velocity must step down at {at}");
        }
    }

    #[test]
    fn test_smallest_and_largest_tiers() {
        let mut rng = Pcg32::seed_from_u64(1);
        let vp = Viewport::new(800.0, 600.0);

        let small = make_falling_block(&event(4000.0), &vp, &mut rng).expect("spawns");
        assert_eq!(small.size.x, VALUE_TIERS[0].1);
        assert_eq!(small.velocity, VALUE_TIERS[0].2);
        assert_eq!(small.symbol, "BTC");
        assert!(small.pos.y < 0.0);
        assert!(small.pos.x >= 0.0 && small.pos.x + small.size.x <= 800.0);

        let large = make_falling_block(&event(2_000_000.0), &vp, &mut rng).expect("spawns");
        assert_eq!(large.size.x, VALUE_TIERS[6].1);
        assert_eq!(large.velocity, VALUE_TIERS[6].2);
    }

    #[test]
    fn test_no_surface_is_an_error() {
        let mut rng = Pcg32::seed_from_u64(1);
        let err = make_falling_block(&event(1000.0), &Viewport::new(0.0, 0.0), &mut rng);
        assert!(matches!(err, Err(SpawnError::NoSurface { .. })));
    }

    #[test]
    fn test_narrow_viewport_pins_block_left() {
        let mut rng = Pcg32::seed_from_u64(1);
        let block = make_falling_block(&event(2_000_000.0), &Viewport::new(50.0, 400.0), &mut rng)
            .expect("spawns");
        assert_eq!(block.pos.x, 0.0);
    }

    #[test]
    fn test_routine_particles_rise_gently() {
        let mut rng = Pcg32::seed_from_u64(7);
        let mut pool = ParticlePool::new(0, 16);
        for i in 0..10 {
            let p = make_particle(&mut pool, &mut rng, Vec2::ZERO, ExplosionStyle::Routine, i, 10, 0.0);
            assert_eq!(p.shape, ParticleShape::Coin);
            assert!(p.vel.y < 0.0);
            assert!(p.vel.length() <= 2.5 * 1.2);
        }
    }

    #[test]
    fn test_supernova_is_radial_with_ring() {
        let mut rng = Pcg32::seed_from_u64(7);
        let mut pool = ParticlePool::new(0, 16);
        let ring = make_particle(&mut pool, &mut rng, Vec2::ZERO, ExplosionStyle::Supernova, 0, 8, 0.0);
        assert_eq!(ring.shape, ParticleShape::Ring);
        assert_eq!(ring.vel, Vec2::ZERO);

        let quarter = make_particle(&mut pool, &mut rng, Vec2::ZERO, ExplosionStyle::Supernova, 2, 8, 0.0);
        // Index 2 of 8 points straight down the screen
        assert!(quarter.vel.x.abs() < 1e-3);
        assert!(quarter.vel.y > 0.0);
    }

    proptest! {
        #[test]
        fn prop_size_monotone_velocity_antitone(a in 0.0f64..5_000_000.0, b in 0.0f64..5_000_000.0) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let (s_lo, v_lo) = tier_for(lo);
            let (s_hi, v_hi) = tier_for(hi);
            prop_assert!(s_lo <= s_hi);
            prop_assert!(v_lo >= v_hi);
        }
    }
}
