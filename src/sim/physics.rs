//! Per-entity motion and terminal conditions
//!
//! Every step takes the frame delta in ms plus the matching frame multiplier
//! (delta / reference frame), so motion does not depend on the frame rate.

use glam::Vec2;
use rand::Rng;

use super::state::{Candidate, FallingBlock, Particle, Projectile, Viewport};
use crate::consts::*;
use crate::settings::Settings;

/// Outcome of one block step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockFate {
    /// Still falling
    Falling,
    /// Hit by a resolved strike; explode dramatically
    Struck,
    /// Reached the floor unassisted; explode routinely
    Impact,
    /// Fell out of view without exploding
    OffScreen,
    /// Exploding and still fading
    Fading,
    /// Fade finished
    Faded,
}

impl BlockFate {
    pub fn is_alive(self) -> bool {
        matches!(self, BlockFate::Falling | BlockFate::Fading)
    }
}

/// Advance one block and classify it
pub fn step_block(
    block: &mut FallingBlock,
    delta_ms: f32,
    mult: f32,
    viewport: &Viewport,
    settings: &Settings,
    struck: bool,
) -> BlockFate {
    if block.exploding {
        block.explosion_elapsed += delta_ms;
        let duration = settings.explosion_duration_ms;
        block.opacity = (1.0 - block.explosion_elapsed / duration).max(0.0);
        return if block.explosion_elapsed < duration {
            BlockFate::Fading
        } else {
            BlockFate::Faded
        };
    }

    block.pos.y += block.velocity * mult;

    if struck {
        BlockFate::Struck
    } else if settings.floor_impacts && block.bottom() >= viewport.floor() {
        BlockFate::Impact
    } else if block.pos.y > viewport.height + block.size.y {
        BlockFate::OffScreen
    } else {
        BlockFate::Falling
    }
}

/// Per-frame fire probability for a block centred at `center_y`, or `None`
/// outside the engagement band. Ramps linearly from the base probability at
/// the top of the band to `fire_ramp` times that at the bottom.
pub fn fire_probability(center_y: f32, viewport: &Viewport, settings: &Settings) -> Option<f32> {
    if viewport.height <= 0.0 {
        return None;
    }
    let ratio = center_y / viewport.height;
    let (top, bottom) = settings.engagement_band;
    if ratio < top || ratio > bottom {
        return None;
    }
    let t = (ratio - top) / (bottom - top);
    let p = settings.fire_probability * (1.0 + (settings.fire_ramp - 1.0) * t);
    Some(p.min(1.0))
}

/// Evaluate a falling, unclaimed block against the engagement band.
/// `None` outside the band; otherwise the candidate and whether it passed
/// this frame's random fire check.
pub fn engagement_check<R: Rng>(
    block: &FallingBlock,
    mult: f32,
    viewport: &Viewport,
    settings: &Settings,
    rng: &mut R,
) -> Option<(Candidate, bool)> {
    if block.exploding || block.caught {
        return None;
    }
    let center = block.center();
    let p = fire_probability(center.y, viewport, settings)?;
    // Scale the per-reference-frame chance to this frame's length
    let p_frame = 1.0 - (1.0 - p).powf(mult.max(0.0));
    let fire = rng.random::<f32>() < p_frame;
    Some((
        Candidate {
            block: block.id.clone(),
            center,
        },
        fire,
    ))
}

/// Advance one particle; returns whether it is still alive
pub fn step_particle(particle: &mut Particle, mult: f32) -> bool {
    particle.pos += particle.vel * mult;
    particle.vel.y += PARTICLE_GRAVITY * mult;
    particle.life -= particle.decay * mult;
    particle.size *= PARTICLE_SHRINK.powf(mult);
    particle.life > 0.0
}

/// Outcome of one projectile step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectileFate {
    Flying,
    Hit,
    Expired,
}

/// Advance one projectile. `target` is the current center and half-width of
/// its block, or `None` if that block is gone.
pub fn step_projectile(
    projectile: &mut Projectile,
    delta_ms: f32,
    mult: f32,
    target: Option<(Vec2, f32)>,
) -> ProjectileFate {
    projectile.pos += projectile.vel * mult;
    projectile.lifetime_ms -= delta_ms;

    let hit = target.is_some_and(|(center, half_width)| {
        projectile.pos.distance(center) < PROJECTILE_RADIUS + half_width
    });
    if hit {
        return ProjectileFate::Hit;
    }
    if projectile.lifetime_ms <= 0.0 {
        ProjectileFate::Expired
    } else {
        ProjectileFate::Flying
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::Side;
    use crate::sim::state::ParticleShape;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn block_at(y: f32, size: f32) -> FallingBlock {
        FallingBlock {
            id: "b1".into(),
            pos: Vec2::new(100.0, y),
            size: Vec2::splat(size),
            velocity: 2.0,
            rotation: 0.0,
            symbol: "ETH".into(),
            side: Side::Long,
            value: 10_000.0,
            price: 2000.0,
            opacity: 1.0,
            exploding: false,
            explosion_elapsed: 0.0,
            caught: false,
        }
    }

    fn particle() -> Particle {
        Particle {
            slot: 0,
            pos: Vec2::ZERO,
            vel: Vec2::new(1.0, -2.0),
            life: 1.0,
            decay: 0.05,
            color: [1.0; 4],
            size: 5.0,
            shape: ParticleShape::Spark,
            created_at: 0.0,
        }
    }

    const VP: Viewport = Viewport {
        width: 800.0,
        height: 600.0,
    };

    #[test]
    fn test_fall_is_frame_rate_independent() {
        let settings = Settings::default();
        let mut a = block_at(0.0, 40.0);
        let mut b = block_at(0.0, 40.0);
        // One long frame vs two short ones
        step_block(&mut a, FRAME_REFERENCE_MS * 2.0, 2.0, &VP, &settings, false);
        step_block(&mut b, FRAME_REFERENCE_MS, 1.0, &VP, &settings, false);
        step_block(&mut b, FRAME_REFERENCE_MS, 1.0, &VP, &settings, false);
        assert!((a.pos.y - b.pos.y).abs() < 1e-4);
        assert!((a.pos.y - 4.0).abs() < 1e-4);
    }

    #[test]
    fn test_floor_impact() {
        let settings = Settings::default();
        let mut block = block_at(600.0 - 41.0, 40.0);
        assert_eq!(
            step_block(&mut block, FRAME_REFERENCE_MS, 1.0, &VP, &settings, false),
            BlockFate::Impact
        );
    }

    #[test]
    fn test_strike_takes_priority_over_floor() {
        let settings = Settings::default();
        let mut block = block_at(600.0 - 41.0, 40.0);
        assert_eq!(
            step_block(&mut block, FRAME_REFERENCE_MS, 1.0, &VP, &settings, true),
            BlockFate::Struck
        );
    }

    #[test]
    fn test_offscreen_without_floor_impacts() {
        let settings = Settings {
            floor_impacts: false,
            ..Default::default()
        };
        let mut block = block_at(600.0 + 37.0, 40.0);
        assert_eq!(
            step_block(&mut block, FRAME_REFERENCE_MS, 1.0, &VP, &settings, false),
            BlockFate::Falling
        );
        assert_eq!(
            step_block(&mut block, FRAME_REFERENCE_MS, 1.0, &VP, &settings, false),
            BlockFate::OffScreen
        );
    }

    #[test]
    fn test_exploding_block_only_fades() {
        let settings = Settings::default();
        let mut block = block_at(200.0, 40.0);
        block.exploding = true;
        let y = block.pos.y;

        let fate = step_block(&mut block, 250.0, 15.0, &VP, &settings, false);
        assert_eq!(fate, BlockFate::Fading);
        assert_eq!(block.pos.y, y);
        assert!((block.opacity - 0.5).abs() < 1e-6);

        let fate = step_block(&mut block, 250.0, 15.0, &VP, &settings, false);
        assert_eq!(fate, BlockFate::Faded);
        assert_eq!(block.opacity, 0.0);
    }

    #[test]
    fn test_fire_probability_ramp() {
        let settings = Settings::default();
        assert_eq!(fire_probability(0.5 * 600.0, &VP, &settings), None);
        assert_eq!(fire_probability(0.97 * 600.0, &VP, &settings), None);

        let top = fire_probability(0.70 * 600.0, &VP, &settings).expect("in band");
        let bottom = fire_probability(0.95 * 600.0, &VP, &settings).expect("in band");
        assert!((top - 0.01).abs() < 1e-4);
        assert!((bottom - 0.2).abs() < 1e-3);
    }

    #[test]
    fn test_caught_block_offers_nothing() {
        let settings = Settings::default();
        let mut rng = Pcg32::seed_from_u64(3);
        let mut block = block_at(0.8 * 600.0, 40.0);
        assert!(engagement_check(&block, 1.0, &VP, &settings, &mut rng).is_some());
        block.caught = true;
        assert!(engagement_check(&block, 1.0, &VP, &settings, &mut rng).is_none());
    }

    #[test]
    fn test_certain_fire_always_offers() {
        let settings = Settings {
            fire_probability: 1.0,
            ..Default::default()
        };
        let mut rng = Pcg32::seed_from_u64(3);
        let block = block_at(0.8 * 600.0, 40.0);
        let (candidate, fire) =
            engagement_check(&block, 1.0, &VP, &settings, &mut rng).expect("in band");
        assert!(fire);
        assert_eq!(candidate.block, "b1");
    }

    #[test]
    fn test_particle_gravity_and_shrink() {
        let mut p = particle();
        assert!(step_particle(&mut p, 1.0));
        assert!((p.vel.y - (-2.0 + PARTICLE_GRAVITY)).abs() < 1e-6);
        assert!(p.size < 5.0);
        assert!((p.life - 0.95).abs() < 1e-6);
    }

    #[test]
    fn test_projectile_times_out_without_target() {
        let mut shot = Projectile {
            owner: 0,
            target: "gone".into(),
            pos: Vec2::ZERO,
            vel: Vec2::new(0.0, -PROJECTILE_SPEED),
            lifetime_ms: 90.0,
        };
        let mut frames = 0;
        while step_projectile(&mut shot, FRAME_REFERENCE_MS, 1.0, None) == ProjectileFate::Flying {
            frames += 1;
            assert!(frames < 10);
        }
        assert_eq!(frames, 5);
    }

    fn shot_at(y: f32) -> Projectile {
        Projectile {
            owner: 0,
            target: "b1".into(),
            pos: Vec2::new(0.0, y),
            vel: Vec2::new(0.0, -10.0),
            lifetime_ms: 1000.0,
        }
    }

    #[test]
    fn test_projectile_hit() {
        // Ends 25px from the center; threshold is 6 + 20
        let mut shot = shot_at(35.0);
        let fate = step_projectile(&mut shot, FRAME_REFERENCE_MS, 1.0, Some((Vec2::ZERO, 20.0)));
        assert_eq!(fate, ProjectileFate::Hit);
    }

    #[test]
    fn test_projectile_just_outside_reach_keeps_flying() {
        // Ends 27px from the center
        let mut shot = shot_at(37.0);
        let fate = step_projectile(&mut shot, FRAME_REFERENCE_MS, 1.0, Some((Vec2::ZERO, 20.0)));
        assert_eq!(fate, ProjectileFate::Flying);
    }

    proptest! {
        #[test]
        fn prop_particle_life_strictly_decreases(
            decay in 0.001f32..0.1,
            delta in 0.5f32..100.0,
            frames in 1usize..400,
        ) {
            let mut p = particle();
            p.decay = decay;
            let mult = delta / FRAME_REFERENCE_MS;
            for _ in 0..frames {
                let before = p.life;
                let alive = step_particle(&mut p, mult);
                prop_assert!(p.life < before);
                prop_assert_eq!(alive, p.life > 0.0);
                if !alive {
                    break;
                }
            }
        }

        #[test]
        fn prop_projectile_always_terminates(
            lifetime in 1.0f32..5000.0,
            delta in 1.0f32..100.0,
            vx in -20.0f32..20.0,
            vy in -20.0f32..20.0,
        ) {
            let mut shot = Projectile {
                owner: 0,
                target: "t".into(),
                pos: Vec2::ZERO,
                vel: Vec2::new(vx, vy),
                lifetime_ms: lifetime,
            };
            let bound = (lifetime / delta).ceil() as usize;
            let mult = delta / FRAME_REFERENCE_MS;
            let mut frames = 0;
            while step_projectile(&mut shot, delta, mult, None) == ProjectileFate::Flying {
                frames += 1;
                prop_assert!(frames <= bound);
            }
        }
    }
}
