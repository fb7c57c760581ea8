//! Platform layer
//!
//! Browser-only pieces (wasm32):
//! - `canvas`: `Surface` on a 2D canvas context
//! - `web`: animation frames, housekeeping timer, relay socket, input
//!
//! Native builds have no platform layer; `main.rs` drives the simulation
//! headless against a `RecordingSurface`.

#[cfg(target_arch = "wasm32")]
pub mod canvas;
#[cfg(target_arch = "wasm32")]
pub mod web;
