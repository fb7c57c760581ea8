//! Rendering module
//!
//! Backend-agnostic 2D drawing. The scene is described through the
//! [`Surface`] trait so the same code draws to a browser canvas or records
//! commands for tests.

pub mod chart;
pub mod scene;
pub mod surface;

pub use chart::PriceChart;
pub use scene::draw_scene;
pub use surface::{DrawCommand, RecordingSurface, Surface};
