//! Defender state machines
//!
//! Idle → Acquiring → Firing → Idle. The block pass publishes an
//! [`Engagement`] (blocks in the band and the ones offering themselves this
//! frame); this stage claims targets, launches projectiles or swings, and
//! publishes [`Strike`]s that the next block pass resolves.

use std::collections::HashMap;

use glam::Vec2;

use super::state::{
    Actor, ActorPhase, BlockId, Engagement, FallingBlock, Projectile, SimulationState, Strike,
};
use crate::aim_angle;
use crate::consts::*;
use crate::settings::ActorKind;

/// Run every actor for one frame
pub fn interact(state: &mut SimulationState, engagement: &Engagement, mult: f32) {
    let track = state.actor_track();
    let SimulationState {
        actors,
        claims,
        blocks,
        projectiles,
        pending_strikes,
        settings,
        ..
    } = state;

    let mut ctx = Context {
        engagement,
        claims,
        blocks,
        projectiles,
        strikes: pending_strikes,
        track,
        projectile_lifetime_ms: settings.projectile_lifetime_ms,
        mult,
    };

    for actor in actors.iter_mut() {
        step_actor(actor, &mut ctx);
    }
}

struct Context<'a> {
    engagement: &'a Engagement,
    claims: &'a mut HashMap<BlockId, usize>,
    blocks: &'a [FallingBlock],
    projectiles: &'a mut Vec<Projectile>,
    strikes: &'a mut Vec<Strike>,
    track: (f32, f32),
    projectile_lifetime_ms: f32,
    mult: f32,
}

impl Context<'_> {
    fn block(&self, id: &str) -> Option<&FallingBlock> {
        self.blocks.iter().find(|b| b.id == id)
    }
}

fn step_actor(actor: &mut Actor, ctx: &mut Context<'_>) {
    // Target destroyed by other means (floor, click, another defender)
    let vanished = actor
        .target
        .clone()
        .filter(|id| ctx.block(id).is_none());
    if let Some(id) = vanished {
        ctx.claims.remove(&id);
        if !actor.is_firing() {
            actor.target = None;
        }
    }

    if let ActorPhase::Firing { progress, struck } = actor.phase {
        advance_cycle(actor, ctx, progress, struck);
        return;
    }

    if actor.target.is_none() {
        try_commit(actor, ctx);
        if actor.is_firing() {
            return;
        }
    }

    match (&actor.target, actor.kind) {
        (Some(_), ActorKind::Robot) => approach(actor, ctx),
        _ => patrol(actor, ctx),
    }
}

/// Claim the first unclaimed offer
fn try_commit(actor: &mut Actor, ctx: &mut Context<'_>) {
    let Some(offer) = ctx
        .engagement
        .offers
        .iter()
        .find(|c| !ctx.claims.contains_key(&c.block))
    else {
        return;
    };

    ctx.claims.insert(offer.block.clone(), actor.id);
    actor.target = Some(offer.block.clone());
    actor.target_pos = offer.center;
    log::debug!("{} {} claims {}", actor.kind.as_str(), actor.id, offer.block);

    match actor.kind {
        ActorKind::Cannon => {
            actor.aim = aim_angle(actor.pos, offer.center);
            let dir = (offer.center - actor.pos).normalize_or_zero();
            ctx.projectiles.push(Projectile {
                owner: actor.id,
                target: offer.block.clone(),
                pos: actor.pos,
                vel: dir * PROJECTILE_SPEED,
                lifetime_ms: ctx.projectile_lifetime_ms,
            });
            actor.phase = ActorPhase::Firing {
                progress: 0.0,
                struck: true,
            };
        }
        ActorKind::Robot => {
            actor.phase = ActorPhase::Acquiring;
        }
    }
}

/// Advance the fire/swing cycle; a robot's swing connects halfway through
fn advance_cycle(actor: &mut Actor, ctx: &mut Context<'_>, progress: f32, struck: bool) {
    let rate = match actor.kind {
        ActorKind::Cannon => FIRE_RATE,
        ActorKind::Robot => SWING_RATE,
    };
    let progress = progress + rate * ctx.mult;
    let mut struck = struck;

    if !struck && progress > SWING_STRIKE_AT {
        if let Some(id) = actor.target.as_ref().filter(|id| ctx.block(id).is_some()) {
            ctx.strikes.push(Strike {
                block: id.clone(),
                by: actor.id,
            });
        }
        struck = true;
    }

    if progress >= 1.0 {
        release(actor, ctx.claims);
        actor.phase = ActorPhase::Idle;
    } else {
        actor.phase = ActorPhase::Firing { progress, struck };
    }
}

/// Robot walks under its target, then starts swinging
fn approach(actor: &mut Actor, ctx: &mut Context<'_>) {
    let Some(center) = actor
        .target
        .as_deref()
        .and_then(|id| ctx.block(id))
        .map(FallingBlock::center)
    else {
        return;
    };

    let (left, right) = ctx.track;
    actor.target_pos = Vec2::new(center.x.clamp(left, right), actor.pos.y);
    actor.pos.x = move_toward(actor.pos.x, actor.target_pos.x, ACTOR_SPEED * ctx.mult);
    actor.aim = aim_angle(actor.pos, center);

    if (actor.pos.x - actor.target_pos.x).abs() <= ACTOR_REACH {
        actor.phase = ActorPhase::Firing {
            progress: 0.0,
            struck: false,
        };
    }
}

/// No target: pace the track while something is in the band, else stand down
fn patrol(actor: &mut Actor, ctx: &mut Context<'_>) {
    // Lowest block in the band is the most urgent
    let Some(threat) = ctx
        .engagement
        .in_band
        .iter()
        .max_by(|a, b| a.center.y.total_cmp(&b.center.y))
    else {
        actor.phase = ActorPhase::Idle;
        return;
    };

    actor.phase = ActorPhase::Acquiring;
    let (left, right) = ctx.track;
    actor.pos.x += actor.patrol_dir * ACTOR_SPEED * 0.5 * ctx.mult;
    if actor.pos.x <= left {
        actor.pos.x = left;
        actor.patrol_dir = 1.0;
    } else if actor.pos.x >= right {
        actor.pos.x = right;
        actor.patrol_dir = -1.0;
    }
    actor.target_pos = threat.center;
    actor.aim = aim_angle(actor.pos, threat.center);
}

fn release(actor: &mut Actor, claims: &mut HashMap<BlockId, usize>) {
    if let Some(id) = actor.target.take() {
        if claims.get(&id) == Some(&actor.id) {
            claims.remove(&id);
        }
    }
}

fn move_toward(current: f32, target: f32, max_step: f32) -> f32 {
    let delta = target - current;
    current + delta.clamp(-max_step, max_step)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::Side;
    use crate::settings::Settings;
    use crate::sim::state::{Candidate, Viewport};

    fn state_with(kind: ActorKind) -> SimulationState {
        let settings = Settings {
            actors: vec![kind],
            ..Default::default()
        };
        SimulationState::new(settings, Viewport::new(800.0, 600.0))
    }

    fn block(id: &str, x: f32, y: f32) -> FallingBlock {
        FallingBlock {
            id: id.into(),
            pos: Vec2::new(x, y),
            size: Vec2::splat(40.0),
            velocity: 2.0,
            rotation: 0.0,
            symbol: "BTC".into(),
            side: Side::Short,
            value: 1000.0,
            price: 1.0,
            opacity: 1.0,
            exploding: false,
            explosion_elapsed: 0.0,
            caught: false,
        }
    }

    fn offer(b: &FallingBlock) -> Candidate {
        Candidate {
            block: b.id.clone(),
            center: b.center(),
        }
    }

    fn engagement_for(blocks: &[&FallingBlock]) -> Engagement {
        Engagement {
            in_band: blocks.iter().map(|b| offer(b)).collect(),
            offers: blocks.iter().map(|b| offer(b)).collect(),
        }
    }

    #[test]
    fn test_idle_without_threats() {
        let mut state = state_with(ActorKind::Cannon);
        interact(&mut state, &Engagement::default(), 1.0);
        assert_eq!(state.actors[0].phase, ActorPhase::Idle);
    }

    #[test]
    fn test_patrol_when_band_occupied_but_no_offer() {
        let mut state = state_with(ActorKind::Cannon);
        let b = block("a", 300.0, 450.0);
        state.blocks.push(b.clone());
        let engagement = Engagement {
            in_band: vec![offer(&b)],
            offers: Vec::new(),
        };
        let x = state.actors[0].pos.x;
        interact(&mut state, &engagement, 1.0);
        assert_eq!(state.actors[0].phase, ActorPhase::Acquiring);
        assert_ne!(state.actors[0].pos.x, x);
        assert!(state.actors[0].target.is_none());
    }

    #[test]
    fn test_patrol_reverses_at_track_end() {
        let mut state = state_with(ActorKind::Cannon);
        let b = block("a", 300.0, 450.0);
        state.blocks.push(b.clone());
        let (_, right) = state.actor_track();
        state.actors[0].pos.x = right - 0.5;
        state.actors[0].patrol_dir = 1.0;
        let engagement = Engagement {
            in_band: vec![offer(&b)],
            offers: Vec::new(),
        };
        interact(&mut state, &engagement, 1.0);
        assert_eq!(state.actors[0].pos.x, right);
        assert_eq!(state.actors[0].patrol_dir, -1.0);
    }

    #[test]
    fn test_cannon_fires_once_per_commitment() {
        let mut state = state_with(ActorKind::Cannon);
        let a = block("a", 300.0, 450.0);
        let b = block("b", 500.0, 460.0);
        state.blocks.extend([a.clone(), b.clone()]);
        let engagement = engagement_for(&[&a, &b]);

        interact(&mut state, &engagement, 1.0);
        assert!(state.actors[0].is_firing());
        assert_eq!(state.actors[0].target.as_deref(), Some("a"));
        assert_eq!(state.projectiles.len(), 1);
        assert_eq!(state.claims.len(), 1);

        // Busy: ignores the other offer
        interact(&mut state, &engagement, 1.0);
        assert_eq!(state.projectiles.len(), 1);
        assert_eq!(state.actors[0].target.as_deref(), Some("a"));

        // Cycle completes and the claim is released
        for _ in 0..30 {
            interact(&mut state, &Engagement::default(), 1.0);
        }
        assert_eq!(state.actors[0].phase, ActorPhase::Idle);
        assert!(state.actors[0].target.is_none());
        assert!(state.claims.is_empty());
    }

    #[test]
    fn test_projectile_aims_at_target_center() {
        let mut state = state_with(ActorKind::Cannon);
        let a = block("a", 300.0, 450.0);
        state.blocks.push(a.clone());
        interact(&mut state, &engagement_for(&[&a]), 1.0);
        let shot = &state.projectiles[0];
        let to_target = (a.center() - shot.pos).normalize();
        assert!(shot.vel.normalize().dot(to_target) > 0.999);
        assert!((shot.vel.length() - PROJECTILE_SPEED).abs() < 1e-3);
    }

    #[test]
    fn test_two_actors_never_share_a_target() {
        let settings = Settings {
            actors: vec![ActorKind::Cannon, ActorKind::Cannon],
            ..Default::default()
        };
        let mut state = SimulationState::new(settings, Viewport::new(800.0, 600.0));
        let a = block("a", 300.0, 450.0);
        state.blocks.push(a.clone());
        interact(&mut state, &engagement_for(&[&a]), 1.0);
        let firing = state.actors.iter().filter(|x| x.is_firing()).count();
        assert_eq!(firing, 1);
        assert_eq!(state.projectiles.len(), 1);
    }

    #[test]
    fn test_robot_walks_then_strikes() {
        let mut state = state_with(ActorKind::Robot);
        let start = state.actors[0].pos.x;
        let a = block("a", start + 100.0 - 20.0, 450.0);
        state.blocks.push(a.clone());

        interact(&mut state, &engagement_for(&[&a]), 1.0);
        assert_eq!(state.actors[0].phase, ActorPhase::Acquiring);
        assert_eq!(state.actors[0].target.as_deref(), Some("a"));
        assert!(state.projectiles.is_empty());

        let mut frames = 0;
        while state.pending_strikes.is_empty() {
            interact(&mut state, &Engagement::default(), 1.0);
            frames += 1;
            assert!(frames < 60, "robot never struck");
        }
        assert_eq!(
            state.pending_strikes,
            vec![Strike {
                block: "a".into(),
                by: 0
            }]
        );
        assert!((state.actors[0].pos.x - (start + 100.0)).abs() <= ACTOR_REACH);

        // Exactly one strike per swing
        for _ in 0..30 {
            interact(&mut state, &Engagement::default(), 1.0);
        }
        assert_eq!(state.pending_strikes.len(), 1);
        assert!(state.actors[0].target.is_none());
    }

    #[test]
    fn test_robot_gives_up_when_target_vanishes() {
        let mut state = state_with(ActorKind::Robot);
        let a = block("a", 700.0, 450.0);
        state.blocks.push(a.clone());
        interact(&mut state, &engagement_for(&[&a]), 1.0);
        assert!(state.actors[0].target.is_some());

        state.blocks.clear();
        interact(&mut state, &Engagement::default(), 1.0);
        assert!(state.actors[0].target.is_none());
        assert_eq!(state.actors[0].phase, ActorPhase::Idle);
        assert!(state.claims.is_empty());
    }
}
