//! `Surface` on a 2D canvas context

use glam::Vec2;
use thiserror::Error;
use wasm_bindgen::JsCast;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

use crate::renderer::surface::{Surface, css};
use crate::sim::state::{Color, Viewport};

#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("no element #{0}")]
    MissingElement(String),
    #[error("element #{0} is not a canvas")]
    NotACanvas(String),
    #[error("2d context unavailable: {0}")]
    NoContext(String),
}

pub struct CanvasSurface {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
    /// CSS size; the backing store is this times the pixel ratio
    width: f32,
    height: f32,
}

impl CanvasSurface {
    /// Attach to the canvas with the given element id
    pub fn attach(id: &str) -> Result<Self, SurfaceError> {
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| SurfaceError::MissingElement(id.to_string()))?;
        let canvas: HtmlCanvasElement = document
            .get_element_by_id(id)
            .ok_or_else(|| SurfaceError::MissingElement(id.to_string()))?
            .dyn_into()
            .map_err(|_| SurfaceError::NotACanvas(id.to_string()))?;
        let ctx: CanvasRenderingContext2d = canvas
            .get_context("2d")
            .map_err(|e| SurfaceError::NoContext(format!("{:?}", e)))?
            .ok_or_else(|| SurfaceError::NoContext("null".into()))?
            .dyn_into()
            .map_err(|_| SurfaceError::NoContext("unexpected context type".into()))?;

        let mut surface = Self {
            canvas,
            ctx,
            width: 0.0,
            height: 0.0,
        };
        surface.fit();
        Ok(surface)
    }

    pub fn canvas(&self) -> &HtmlCanvasElement {
        &self.canvas
    }

    /// Match the backing store to the element's CSS size and pixel ratio.
    /// Returns the viewport in CSS pixels.
    pub fn fit(&mut self) -> Viewport {
        let dpr = web_sys::window().map_or(1.0, |w| w.device_pixel_ratio());
        let client_w = self.canvas.client_width().max(0);
        let client_h = self.canvas.client_height().max(0);
        self.canvas.set_width((client_w as f64 * dpr) as u32);
        self.canvas.set_height((client_h as f64 * dpr) as u32);
        // Draw in CSS pixels
        let _ = self.ctx.set_transform(dpr, 0.0, 0.0, dpr, 0.0, 0.0);

        self.width = client_w as f32;
        self.height = client_h as f32;
        Viewport::new(self.width, self.height)
    }

    /// Element-relative CSS position of a client-space point
    pub fn to_local(&self, client_x: f64, client_y: f64) -> Vec2 {
        let rect = self.canvas.get_bounding_client_rect();
        Vec2::new((client_x - rect.left()) as f32, (client_y - rect.top()) as f32)
    }

    fn circle_path(&self, center: Vec2, radius: f32) {
        self.ctx.begin_path();
        let _ = self.ctx.arc(
            center.x as f64,
            center.y as f64,
            radius.max(0.0) as f64,
            0.0,
            std::f64::consts::TAU,
        );
    }
}

impl Surface for CanvasSurface {
    fn size(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    fn clear(&mut self, color: Color) {
        self.ctx.set_global_alpha(1.0);
        self.ctx.set_fill_style_str(&css(color));
        self.ctx
            .fill_rect(0.0, 0.0, self.width as f64, self.height as f64);
    }

    fn set_alpha(&mut self, alpha: f32) {
        self.ctx.set_global_alpha(alpha.clamp(0.0, 1.0) as f64);
    }

    fn fill_rect(&mut self, origin: Vec2, size: Vec2, color: Color) {
        self.ctx.set_fill_style_str(&css(color));
        self.ctx
            .fill_rect(origin.x as f64, origin.y as f64, size.x as f64, size.y as f64);
    }

    fn stroke_rect(&mut self, origin: Vec2, size: Vec2, width: f32, color: Color) {
        self.ctx.set_stroke_style_str(&css(color));
        self.ctx.set_line_width(width as f64);
        self.ctx
            .stroke_rect(origin.x as f64, origin.y as f64, size.x as f64, size.y as f64);
    }

    fn fill_circle(&mut self, center: Vec2, radius: f32, color: Color) {
        self.ctx.set_fill_style_str(&css(color));
        self.circle_path(center, radius);
        self.ctx.fill();
    }

    fn stroke_circle(&mut self, center: Vec2, radius: f32, width: f32, color: Color) {
        self.ctx.set_stroke_style_str(&css(color));
        self.ctx.set_line_width(width as f64);
        self.circle_path(center, radius);
        self.ctx.stroke();
    }

    fn line(&mut self, from: Vec2, to: Vec2, width: f32, color: Color) {
        self.ctx.set_stroke_style_str(&css(color));
        self.ctx.set_line_width(width as f64);
        self.ctx.set_line_cap("round");
        self.ctx.begin_path();
        self.ctx.move_to(from.x as f64, from.y as f64);
        self.ctx.line_to(to.x as f64, to.y as f64);
        self.ctx.stroke();
    }

    fn text(&mut self, pos: Vec2, text: &str, size: f32, color: Color) {
        self.ctx.set_fill_style_str(&css(color));
        self.ctx
            .set_font(&format!("bold {}px system-ui, sans-serif", size.round()));
        self.ctx.set_text_align("center");
        self.ctx.set_text_baseline("middle");
        let _ = self.ctx.fill_text(text, pos.x as f64, pos.y as f64);
    }

    fn radial_gradient(&mut self, center: Vec2, radius: f32, inner: Color, outer: Color) {
        let (x, y, r) = (center.x as f64, center.y as f64, radius.max(0.0) as f64);
        let Ok(gradient) = self.ctx.create_radial_gradient(x, y, 0.0, x, y, r) else {
            return;
        };
        let _ = gradient.add_color_stop(0.0, &css(inner));
        let _ = gradient.add_color_stop(1.0, &css(outer));
        self.ctx.set_fill_style_canvas_gradient(&gradient);
        self.circle_path(center, radius);
        self.ctx.fill();
    }
}
