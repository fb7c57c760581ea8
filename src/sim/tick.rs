//! Frame driver
//!
//! One call per host animation frame. Stages run in a fixed order and each
//! receives the [`SimulationState`] explicitly:
//! background → blocks → particles → actors → projectiles.

use std::collections::HashSet;

use super::explosion::{BurstKind, explode};
use super::interaction::interact;
use super::physics::{
    BlockFate, ProjectileFate, engagement_check, step_block, step_particle, step_projectile,
};
use super::state::{BlockId, Engagement, SimulationState, Strike};
use crate::consts::*;
use crate::frame_multiplier;
use crate::renderer::chart::PriceChart;
use crate::renderer::scene::{
    draw_actor, draw_background, draw_block, draw_particle, draw_projectile,
};
use crate::renderer::surface::Surface;

/// Per-frame counts for diagnostics
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameReport {
    /// Frame was skipped (paused or no surface)
    pub skipped: bool,
    /// Clamped frame delta (ms)
    pub delta_ms: f32,
    pub blocks: usize,
    pub wrecks: usize,
    pub particles: usize,
    pub projectiles: usize,
    /// Strikes resolved this frame
    pub hits: usize,
    /// Unassisted floor impacts this frame
    pub impacts: usize,
    /// Particles spawned this frame
    pub spawned: usize,
}

/// Owns frame timing and the background chart; advances a state per frame
#[derive(Debug, Clone, Default)]
pub struct FrameDriver {
    last_frame: Option<f64>,
    paused: bool,
    frames: u64,
    pub chart: PriceChart,
}

impl FrameDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn pause(&mut self) {
        if !self.paused {
            log::info!("Animation paused");
        }
        self.paused = true;
    }

    pub fn resume(&mut self) {
        if self.paused {
            log::info!("Animation resumed");
        }
        self.paused = false;
    }

    /// Frames simulated so far (skipped frames excluded)
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Clamped delta since the previous call; the first frame counts as one
    /// reference frame
    fn delta(&mut self, now: f64) -> f32 {
        let delta = match self.last_frame {
            Some(last) => ((now - last) as f32).clamp(0.0, MAX_FRAME_DELTA_MS),
            None => FRAME_REFERENCE_MS,
        };
        self.last_frame = Some(now);
        delta
    }

    /// Advance and draw one frame at host time `now` (ms)
    pub fn frame<S: Surface + ?Sized>(
        &mut self,
        state: &mut SimulationState,
        now: f64,
        surface: &mut S,
    ) -> FrameReport {
        let delta_ms = self.delta(now);
        if self.paused || !state.viewport.is_usable() {
            return FrameReport {
                skipped: true,
                delta_ms,
                ..Default::default()
            };
        }

        let mult = frame_multiplier(delta_ms);
        state.clock_ms = now;
        self.frames += 1;

        let mut report = FrameReport {
            delta_ms,
            ..Default::default()
        };

        if state.settings.show_chart {
            self.chart.advance(delta_ms);
            draw_background(surface, Some(&self.chart));
        } else {
            draw_background(surface, None);
        }

        let engagement = block_pass(state, delta_ms, mult, surface, &mut report);
        particle_pass(state, mult, surface);
        interact(state, &engagement, mult);
        for actor in &state.actors {
            draw_actor(surface, actor);
        }
        projectile_pass(state, delta_ms, mult, surface);

        report.blocks = state.blocks.len();
        report.wrecks = state.wrecks.len();
        report.particles = state.particles.len();
        report.projectiles = state.projectiles.len();
        report
    }
}

/// Resolve last frame's strikes, move blocks, publish the engagement band
fn block_pass<S: Surface + ?Sized>(
    state: &mut SimulationState,
    delta_ms: f32,
    mult: f32,
    surface: &mut S,
    report: &mut FrameReport,
) -> Engagement {
    let struck: HashSet<BlockId> = state.pending_strikes.drain(..).map(|s| s.block).collect();
    let mut engagement = Engagement::default();

    let SimulationState {
        settings,
        viewport,
        rng,
        clock_ms,
        blocks,
        wrecks,
        particles,
        pool,
        claims,
        ..
    } = state;
    let now = *clock_ms;

    // Exploding wrecks fade out first so they sit under live blocks
    wrecks.retain_mut(|wreck| {
        let fate = step_block(wreck, delta_ms, mult, viewport, settings, false);
        if fate.is_alive() {
            draw_block(surface, wreck);
        }
        fate.is_alive()
    });

    let mut survivors = Vec::with_capacity(blocks.len());
    for mut block in blocks.drain(..) {
        if block.exploding {
            // Detonated by a click since the last pass
            draw_block(surface, &block);
            wrecks.push(block);
            continue;
        }
        let hit = struck.contains(&block.id);
        let fate = step_block(&mut block, delta_ms, mult, viewport, settings, hit);
        match fate {
            BlockFate::Struck => {
                report.spawned +=
                    explode(&mut block, BurstKind::Dramatic, pool, rng, particles, now);
                report.hits += 1;
                draw_block(surface, &block);
                wrecks.push(block);
            }
            BlockFate::Impact => {
                report.spawned +=
                    explode(&mut block, BurstKind::Routine, pool, rng, particles, now);
                report.impacts += 1;
                draw_block(surface, &block);
                wrecks.push(block);
            }
            BlockFate::OffScreen | BlockFate::Faded => {
                log::trace!("{} left the scene", block.id);
            }
            BlockFate::Falling | BlockFate::Fading => {
                block.caught = claims.contains_key(&block.id);
                if let Some((candidate, fire)) =
                    engagement_check(&block, mult, viewport, settings, rng)
                {
                    if fire {
                        engagement.offers.push(candidate.clone());
                    }
                    engagement.in_band.push(candidate);
                }
                draw_block(surface, &block);
                survivors.push(block);
            }
        }
    }
    *blocks = survivors;
    engagement
}

/// Move particles, returning dead ones to the pool
fn particle_pass<S: Surface + ?Sized>(state: &mut SimulationState, mult: f32, surface: &mut S) {
    let SimulationState {
        particles, pool, ..
    } = state;

    let mut alive = Vec::with_capacity(particles.len());
    for mut particle in particles.drain(..) {
        if step_particle(&mut particle, mult) {
            draw_particle(surface, &particle);
            alive.push(particle);
        } else {
            pool.release(particle);
        }
    }
    *particles = alive;
}

/// Move projectiles; hits become strikes for the next block pass
fn projectile_pass<S: Surface + ?Sized>(
    state: &mut SimulationState,
    delta_ms: f32,
    mult: f32,
    surface: &mut S,
) {
    let SimulationState {
        projectiles,
        blocks,
        pending_strikes,
        ..
    } = state;

    projectiles.retain_mut(|shot| {
        let target = blocks
            .iter()
            .find(|b| b.id == shot.target)
            .map(|b| (b.center(), b.width() * 0.5));
        match step_projectile(shot, delta_ms, mult, target) {
            ProjectileFate::Flying => {
                draw_projectile(surface, shot);
                true
            }
            ProjectileFate::Hit => {
                pending_strikes.push(Strike {
                    block: shot.target.clone(),
                    by: shot.owner,
                });
                false
            }
            ProjectileFate::Expired => {
                log::trace!("Shot at {} expired", shot.target);
                false
            }
        }
    });
}
