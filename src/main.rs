//! Liquidation Rain entry point
//!
//! Browser: installs logging and starts the canvas shell.
//! Native: runs the simulation headless on synthetic liquidations.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() {
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Info).expect("Failed to init logger");

    let settings = liquidation_rain::Settings::load();
    if let Err(e) = liquidation_rain::platform::web::run(settings) {
        log::error!("Cannot start: {}", e);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Liquidation Rain (native) starting headless demo...");
    headless::run(liquidation_rain::Settings::load(), 1800);
}

#[cfg(not(target_arch = "wasm32"))]
mod headless {
    use liquidation_rain::feed::{LiquidationEvent, Side};
    use liquidation_rain::renderer::RecordingSurface;
    use liquidation_rain::sim::Viewport;
    use liquidation_rain::{FrameDriver, FrameReport, Housekeeper, IngestionAdapter, Settings};
    use liquidation_rain::{SimulationState, consts::FRAME_REFERENCE_MS};
    use rand::{Rng, SeedableRng};
    use rand_pcg::Pcg32;

    const SYMBOLS: [&str; 5] = ["BTCUSDT", "ETHUSDT", "SOLUSDT", "DOGEUSDT", "XRPUSDT"];
    /// Arbitrary wall-clock origin for synthetic timestamps
    const EPOCH_MS: f64 = 1_700_000_000_000.0;

    /// One synthetic liquidation; values spread over every size tier
    fn synthetic(rng: &mut Pcg32, n: u64, timestamp: f64) -> LiquidationEvent {
        let price = rng.random_range(0.1..70_000.0);
        let value = 10f64.powf(rng.random_range(3.0..6.5));
        LiquidationEvent {
            id: format!("demo-{n}"),
            timestamp,
            symbol: SYMBOLS[rng.random_range(0..SYMBOLS.len())].to_string(),
            side: if rng.random_bool(0.5) { Side::Long } else { Side::Short },
            size: value / price,
            price,
            value: 0.0,
        }
    }

    pub fn run(settings: Settings, frames: usize) {
        let viewport = Viewport::new(1280.0, 720.0);
        let mut rng = Pcg32::seed_from_u64(settings.seed ^ 0x5eed);
        let mut adapter = IngestionAdapter::new(EPOCH_MS, &settings);
        let mut keeper = Housekeeper::new(settings.housekeeping_interval_ms);
        let mut state = SimulationState::new(settings, viewport);
        let mut driver = FrameDriver::new();
        let mut surface = RecordingSurface::new(viewport.width, viewport.height);

        let mut totals = FrameReport::default();
        let mut admitted = 0;
        for frame in 0..frames {
            let now = frame as f64 * FRAME_REFERENCE_MS as f64;
            let wall = EPOCH_MS + now;

            // Roughly two liquidations per second, with an occasional replay
            if rng.random_bool(2.0 / 60.0) {
                let event = synthetic(&mut rng, frame as u64, wall);
                let replay = rng.random_bool(0.1).then(|| event.clone());
                let report = adapter.admit(std::iter::once(event).chain(replay), &mut state, wall);
                admitted += report.admitted.len();
            }

            surface.reset();
            let report = driver.frame(&mut state, now, &mut surface);
            totals.hits += report.hits;
            totals.impacts += report.impacts;
            totals.spawned += report.spawned;

            if let Some(sweep) = keeper.run_if_due(&mut state, &mut adapter, now) {
                log::info!(
                    "t={:.1}s evicted {} particles; {:?}",
                    now / 1000.0,
                    sweep.evicted_particles,
                    sweep.census
                );
            }
        }

        log::info!(
            "{} frames: {} admitted, {} shot down, {} floor impacts, {} particles spawned",
            driver.frames(),
            admitted,
            totals.hits,
            totals.impacts,
            totals.spawned
        );
        log::info!(
            "Pool: {} allocated ({} fresh), {} pooled, {} dropped",
            state.pool.total_allocated(),
            state.pool.fresh_allocations(),
            state.pool.pooled_count(),
            state.pool.dropped()
        );
        log::info!(
            "Long ${:.0} / short ${:.0}",
            state.stats.total_long_usd,
            state.stats.total_short_usd
        );
    }
}
