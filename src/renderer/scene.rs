//! Drawing of simulation entities
//!
//! Pure functions of entity state; the only side effect is on the surface.

use glam::Vec2;

use super::chart::PriceChart;
use super::surface::Surface;
use crate::feed::Side;
use crate::settings::ActorKind;
use crate::sim::state::{
    Actor, Color, FallingBlock, Particle, ParticleShape, Projectile, SimulationState,
};

pub const BACKGROUND: Color = [0.04, 0.05, 0.09, 1.0];
const LONG_BAG: Color = [0.85, 0.2, 0.25, 1.0];
const SHORT_BAG: Color = [0.15, 0.7, 0.4, 1.0];
const BAG_OUTLINE: Color = [0.0, 0.0, 0.0, 0.6];
const LABEL: Color = [1.0, 1.0, 1.0, 1.0];
const CAUGHT_MARK: Color = [1.0, 0.85, 0.2, 0.9];
const SHOT: Color = [1.0, 0.95, 0.6, 1.0];
const SHOT_GLOW: Color = [1.0, 0.6, 0.1, 0.0];
const CANNON: Color = [0.55, 0.6, 0.7, 1.0];
const ROBOT: Color = [0.35, 0.75, 0.95, 1.0];

/// Bag color by liquidated side
pub fn side_color(side: Side) -> Color {
    match side {
        Side::Long => LONG_BAG,
        Side::Short => SHORT_BAG,
    }
}

/// Compact USD label: $950, $12.5K, $1.2M
pub fn format_usd(value: f64) -> String {
    if value >= 1_000_000.0 {
        format!("${:.1}M", value / 1_000_000.0)
    } else if value >= 1_000.0 {
        format!("${:.1}K", value / 1_000.0)
    } else {
        format!("${:.0}", value)
    }
}

/// Clear and draw the chart layer
pub fn draw_background<S: Surface + ?Sized>(surface: &mut S, chart: Option<&PriceChart>) {
    surface.clear(BACKGROUND);
    if let Some(chart) = chart {
        chart.draw(surface);
    }
}

/// Money bag with symbol and amount; fades while exploding
pub fn draw_block<S: Surface + ?Sized>(surface: &mut S, block: &FallingBlock) {
    if block.opacity <= 0.0 {
        return;
    }
    surface.set_alpha(block.opacity);

    let center = block.center();
    let radius = block.width() * 0.5;
    let body = side_color(block.side);
    // Sack body plus a tied neck
    surface.fill_circle(center + Vec2::new(0.0, radius * 0.15), radius * 0.85, body);
    surface.fill_rect(
        Vec2::new(center.x - radius * 0.3, block.pos.y),
        Vec2::new(radius * 0.6, radius * 0.35),
        body,
    );
    surface.stroke_circle(center + Vec2::new(0.0, radius * 0.15), radius * 0.85, 2.0, BAG_OUTLINE);

    if !block.exploding {
        let font = (radius * 0.45).max(9.0);
        surface.text(center, &block.symbol, font, LABEL);
        surface.text(
            center + Vec2::new(0.0, font * 1.1),
            &format_usd(block.value),
            font * 0.8,
            LABEL,
        );
        if block.caught {
            surface.stroke_rect(block.pos, block.size, 1.5, CAUGHT_MARK);
        }
    }

    surface.set_alpha(1.0);
}

/// Particle by explicit shape tag
pub fn draw_particle<S: Surface + ?Sized>(surface: &mut S, particle: &Particle) {
    if particle.life <= 0.0 {
        return;
    }
    let alpha = particle.life.clamp(0.0, 1.0);
    let size = particle.size.max(0.1);
    let mut color = particle.color;
    color[3] *= alpha;

    match particle.shape {
        ParticleShape::Coin => {
            surface.fill_circle(particle.pos, size, color);
            surface.stroke_circle(particle.pos, size, 1.0, [0.6, 0.45, 0.0, alpha]);
        }
        ParticleShape::Spark => {
            let tail = particle.pos - particle.vel.normalize_or_zero() * size * 2.0;
            surface.line(tail, particle.pos, size * 0.6, color);
        }
        ParticleShape::Ring => {
            // Expands as it fades
            let radius = size * (1.0 + (1.0 - alpha) * 6.0);
            surface.stroke_circle(particle.pos, radius, 2.0, color);
        }
        ParticleShape::Ember => {
            let mut rim = color;
            rim[3] = 0.0;
            surface.radial_gradient(particle.pos, size * 1.8, color, rim);
        }
        ParticleShape::Shard => {
            let dir = particle.vel.normalize_or(Vec2::X);
            surface.line(particle.pos - dir * size, particle.pos + dir * size, size * 0.5, color);
        }
        ParticleShape::Confetti => {
            surface.fill_rect(
                particle.pos - Vec2::splat(size * 0.5),
                Vec2::new(size, size * 0.6),
                color,
            );
        }
    }
}

pub fn draw_projectile<S: Surface + ?Sized>(surface: &mut S, projectile: &Projectile) {
    surface.radial_gradient(projectile.pos, 14.0, SHOT, SHOT_GLOW);
    surface.fill_circle(projectile.pos, 4.0, SHOT);
}

/// Defender; nothing is drawn while idle (parked out of view)
pub fn draw_actor<S: Surface + ?Sized>(surface: &mut S, actor: &Actor) {
    if !actor.is_active() {
        return;
    }
    let dir = Vec2::from_angle(actor.aim);
    match actor.kind {
        ActorKind::Cannon => {
            // Recoil pulls the barrel back during the fire cycle
            let recoil = (1.0 - actor.progress()) * if actor.is_firing() { 6.0 } else { 0.0 };
            let muzzle = actor.pos + dir * (30.0 - recoil);
            surface.line(actor.pos, muzzle, 10.0, CANNON);
            surface.fill_circle(actor.pos, 16.0, CANNON);
        }
        ActorKind::Robot => {
            let head = actor.pos - Vec2::new(0.0, 26.0);
            surface.fill_rect(actor.pos - Vec2::new(10.0, 18.0), Vec2::new(20.0, 30.0), ROBOT);
            surface.fill_circle(head, 8.0, ROBOT);
            // Tool sweeps through an arc while swinging
            let swing = if actor.is_firing() {
                (actor.progress() - 0.5) * std::f32::consts::PI
            } else {
                0.0
            };
            let tool = Vec2::from_angle(actor.aim + swing);
            surface.line(head, head + tool * 34.0, 4.0, ROBOT);
        }
    }
}

/// Draw the full scene without advancing anything
pub fn draw_scene<S: Surface + ?Sized>(
    surface: &mut S,
    state: &SimulationState,
    chart: Option<&PriceChart>,
) {
    draw_background(surface, chart);
    for block in state.wrecks.iter().chain(&state.blocks) {
        draw_block(surface, block);
    }
    for particle in &state.particles {
        draw_particle(surface, particle);
    }
    for actor in &state.actors {
        draw_actor(surface, actor);
    }
    for projectile in &state.projectiles {
        draw_projectile(surface, projectile);
    }
}
