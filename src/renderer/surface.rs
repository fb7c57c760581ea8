//! Abstract 2D drawing surface
//!
//! Anything offering these primitives can display the scene: the browser
//! canvas (`platform::canvas`) or the in-memory [`RecordingSurface`].

use glam::Vec2;

use crate::sim::state::Color;

/// Immediate-mode 2D drawing primitives
pub trait Surface {
    /// Drawable size in CSS pixels
    fn size(&self) -> (f32, f32);
    /// Fill the whole surface
    fn clear(&mut self, color: Color);
    /// Global alpha applied to following commands
    fn set_alpha(&mut self, alpha: f32);
    fn fill_rect(&mut self, origin: Vec2, size: Vec2, color: Color);
    fn stroke_rect(&mut self, origin: Vec2, size: Vec2, width: f32, color: Color);
    fn fill_circle(&mut self, center: Vec2, radius: f32, color: Color);
    fn stroke_circle(&mut self, center: Vec2, radius: f32, width: f32, color: Color);
    fn line(&mut self, from: Vec2, to: Vec2, width: f32, color: Color);
    /// Centered text
    fn text(&mut self, pos: Vec2, text: &str, size: f32, color: Color);
    /// Filled circle shading from `inner` at the center to `outer` at the rim
    fn radial_gradient(&mut self, center: Vec2, radius: f32, inner: Color, outer: Color);
}

/// CSS color string for a [`Color`]
pub fn css(color: Color) -> String {
    let [r, g, b, a] = color;
    format!(
        "rgba({},{},{},{:.3})",
        (r.clamp(0.0, 1.0) * 255.0).round() as u8,
        (g.clamp(0.0, 1.0) * 255.0).round() as u8,
        (b.clamp(0.0, 1.0) * 255.0).round() as u8,
        a.clamp(0.0, 1.0)
    )
}

/// One recorded primitive
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Clear(Color),
    Alpha(f32),
    FillRect { origin: Vec2, size: Vec2, color: Color },
    StrokeRect { origin: Vec2, size: Vec2, width: f32, color: Color },
    FillCircle { center: Vec2, radius: f32, color: Color },
    StrokeCircle { center: Vec2, radius: f32, width: f32, color: Color },
    Line { from: Vec2, to: Vec2, width: f32, color: Color },
    Text { pos: Vec2, text: String, size: f32, color: Color },
    RadialGradient { center: Vec2, radius: f32, inner: Color, outer: Color },
}

/// Surface that stores commands instead of drawing them
#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
    pub width: f32,
    pub height: f32,
    pub commands: Vec<DrawCommand>,
}

impl RecordingSurface {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            commands: Vec::new(),
        }
    }

    /// Drop recorded commands, keeping the size
    pub fn reset(&mut self) {
        self.commands.clear();
    }

    /// Recorded text strings, in draw order
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().filter_map(|c| match c {
            DrawCommand::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }
}

impl Surface for RecordingSurface {
    fn size(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    fn clear(&mut self, color: Color) {
        self.commands.push(DrawCommand::Clear(color));
    }

    fn set_alpha(&mut self, alpha: f32) {
        self.commands.push(DrawCommand::Alpha(alpha));
    }

    fn fill_rect(&mut self, origin: Vec2, size: Vec2, color: Color) {
        self.commands.push(DrawCommand::FillRect { origin, size, color });
    }

    fn stroke_rect(&mut self, origin: Vec2, size: Vec2, width: f32, color: Color) {
        self.commands.push(DrawCommand::StrokeRect {
            origin,
            size,
            width,
            color,
        });
    }

    fn fill_circle(&mut self, center: Vec2, radius: f32, color: Color) {
        self.commands.push(DrawCommand::FillCircle {
            center,
            radius,
            color,
        });
    }

    fn stroke_circle(&mut self, center: Vec2, radius: f32, width: f32, color: Color) {
        self.commands.push(DrawCommand::StrokeCircle {
            center,
            radius,
            width,
            color,
        });
    }

    fn line(&mut self, from: Vec2, to: Vec2, width: f32, color: Color) {
        self.commands.push(DrawCommand::Line {
            from,
            to,
            width,
            color,
        });
    }

    fn text(&mut self, pos: Vec2, text: &str, size: f32, color: Color) {
        self.commands.push(DrawCommand::Text {
            pos,
            text: text.to_string(),
            size,
            color,
        });
    }

    fn radial_gradient(&mut self, center: Vec2, radius: f32, inner: Color, outer: Color) {
        self.commands.push(DrawCommand::RadialGradient {
            center,
            radius,
            inner,
            outer,
        });
    }
}
