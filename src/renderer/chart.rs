//! Scrolling candlestick background

use std::collections::VecDeque;

use glam::Vec2;

use super::surface::Surface;
use crate::feed::Candle;
use crate::sim::state::Color;

/// Maximum candles retained
pub const MAX_CANDLES: usize = 120;
/// Horizontal distance between candle centers (px)
pub const CANDLE_SPACING: f32 = 12.0;
/// Background drift speed (px per second)
pub const SCROLL_SPEED: f32 = 6.0;

const UP: Color = [0.1, 0.75, 0.45, 0.35];
const DOWN: Color = [0.9, 0.25, 0.3, 0.35];

/// Price series drawn behind the falling blocks
#[derive(Debug, Clone, Default)]
pub struct PriceChart {
    candles: VecDeque<Candle>,
    /// Sub-spacing drift since the last candle (px)
    scroll: f32,
}

impl PriceChart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the series (e.g. after a symbol change)
    pub fn set_candles(&mut self, candles: impl IntoIterator<Item = Candle>) {
        self.candles = candles.into_iter().collect();
        while self.candles.len() > MAX_CANDLES {
            self.candles.pop_front();
        }
        self.scroll = 0.0;
    }

    pub fn push_candle(&mut self, candle: Candle) {
        self.candles.push_back(candle);
        if self.candles.len() > MAX_CANDLES {
            self.candles.pop_front();
        }
        self.scroll = 0.0;
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// Drift left with frame time, at most one candle width
    pub fn advance(&mut self, delta_ms: f32) {
        self.scroll = (self.scroll + SCROLL_SPEED * delta_ms / 1000.0).min(CANDLE_SPACING);
    }

    /// Draw newest candle at the right edge, scaled to the visible range
    pub fn draw<S: Surface + ?Sized>(&self, surface: &mut S) {
        if self.candles.is_empty() {
            return;
        }
        let (width, height) = surface.size();
        let visible = ((width / CANDLE_SPACING).ceil() as usize + 1).min(self.candles.len());
        let shown = self.candles.iter().skip(self.candles.len() - visible);

        let (lo, hi) = self
            .candles
            .iter()
            .skip(self.candles.len() - visible)
            .fold((f64::MAX, f64::MIN), |(lo, hi), c| (lo.min(c.low), hi.max(c.high)));
        let range = (hi - lo).max(f64::EPSILON);
        // Keep the chart in the upper two thirds, clear of the defenders
        let top = height * 0.1;
        let span = height * 0.55;
        let y_of = |price: f64| top + ((hi - price) / range) as f32 * span;

        for (i, candle) in shown.enumerate() {
            let from_right = (visible - 1 - i) as f32;
            let x = width - CANDLE_SPACING * 0.5 - from_right * CANDLE_SPACING - self.scroll;
            let color = if candle.is_up() { UP } else { DOWN };
            surface.line(Vec2::new(x, y_of(candle.high)), Vec2::new(x, y_of(candle.low)), 1.0, color);

            let body_top = y_of(candle.open.max(candle.close));
            let body_bottom = y_of(candle.open.min(candle.close));
            surface.fill_rect(
                Vec2::new(x - CANDLE_SPACING * 0.35, body_top),
                Vec2::new(CANDLE_SPACING * 0.7, (body_bottom - body_top).max(1.0)),
                color,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::surface::{DrawCommand, RecordingSurface};

    fn candle(open: f64, close: f64) -> Candle {
        Candle {
            open,
            high: open.max(close) + 1.0,
            low: open.min(close) - 1.0,
            close,
        }
    }

    #[test]
    fn test_series_is_bounded() {
        let mut chart = PriceChart::new();
        for i in 0..(MAX_CANDLES + 10) {
            chart.push_candle(candle(i as f64, i as f64 + 1.0));
        }
        assert_eq!(chart.len(), MAX_CANDLES);
    }

    #[test]
    fn test_draws_visible_candles_only() {
        let mut chart = PriceChart::new();
        chart.set_candles((0..50).map(|i| candle(100.0 + i as f64, 101.0 + i as f64)));
        let mut surface = RecordingSurface::new(120.0, 300.0);
        chart.draw(&mut surface);
        let bodies = surface
            .commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::FillRect { .. }))
            .count();
        assert_eq!(bodies, 11);
    }

    #[test]
    fn test_scroll_is_capped() {
        let mut chart = PriceChart::new();
        chart.advance(1_000_000.0);
        assert_eq!(chart.scroll, CANDLE_SPACING);
        chart.push_candle(candle(1.0, 2.0));
        assert_eq!(chart.scroll, 0.0);
    }
}
