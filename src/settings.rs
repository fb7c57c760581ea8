//! Visualization settings
//!
//! Read from LocalStorage on web, from a JSON file on native.

use serde::{Deserialize, Serialize};

/// Defender variants, differing in how a strike is resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActorKind {
    /// Ranged: aims and fires a projectile at the target
    Cannon,
    /// Melee: walks under the target and swings a tool
    Robot,
}

impl ActorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActorKind::Cannon => "cannon",
            ActorKind::Robot => "robot",
        }
    }
}

/// Tuning and feature toggles
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// RNG seed (0 = derive from clock at startup)
    pub seed: u64,

    // === Pool ===
    /// Particles allocated up front
    pub pool_prewarm: usize,
    /// Free-list bound; releases past this are dropped
    pub pool_max: usize,

    // === Ingestion ===
    /// Events older than this are not admitted (ms)
    pub freshness_ms: f64,
    /// Dedup ledger bound
    pub ledger_max: usize,

    // === Housekeeping ===
    pub housekeeping_interval_ms: f64,
    /// Particles older than this are evicted by housekeeping (ms)
    pub particle_max_age_ms: f64,

    // === Simulation ===
    /// Fade duration of an exploded block (ms)
    pub explosion_duration_ms: f32,
    /// Engagement band as fractions of viewport height (top, bottom)
    pub engagement_band: (f32, f32),
    /// Per-frame fire probability at the top of the band
    pub fire_probability: f32,
    /// Fire probability multiplier reached at the bottom of the band
    pub fire_ramp: f32,
    /// Projectile lifetime budget (ms)
    pub projectile_lifetime_ms: f32,
    /// Defender roster
    pub actors: Vec<ActorKind>,
    /// Blocks explode on reaching the floor (otherwise they fall out of view)
    pub floor_impacts: bool,

    // === Visuals ===
    /// Draw the scrolling price chart behind the scene
    pub show_chart: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            seed: 0,

            pool_prewarm: 200,
            pool_max: 500,

            freshness_ms: 3000.0,
            ledger_max: 1000,

            housekeeping_interval_ms: 5000.0,
            particle_max_age_ms: 5000.0,

            explosion_duration_ms: 500.0,
            engagement_band: (0.70, 0.95),
            fire_probability: 0.01,
            fire_ramp: 20.0,
            projectile_lifetime_ms: 3000.0,
            actors: vec![ActorKind::Cannon],
            floor_impacts: true,

            show_chart: true,
        }
    }
}

impl Settings {
    /// Clamp values that would break invariants (inverted band, zero pool, ...)
    pub fn sanitized(mut self) -> Self {
        let (top, bottom) = self.engagement_band;
        let top = top.clamp(0.0, 1.0);
        let bottom = bottom.clamp(0.0, 1.0);
        self.engagement_band = if top < bottom { (top, bottom) } else { (bottom, top) };
        if (self.engagement_band.1 - self.engagement_band.0).abs() < f32::EPSILON {
            self.engagement_band = Self::default().engagement_band;
        }
        self.pool_prewarm = self.pool_prewarm.min(self.pool_max);
        self.ledger_max = self.ledger_max.max(2);
        self.fire_probability = self.fire_probability.clamp(0.0, 1.0);
        self.fire_ramp = self.fire_ramp.max(1.0);
        self.explosion_duration_ms = self.explosion_duration_ms.max(1.0);
        self.projectile_lifetime_ms = self.projectile_lifetime_ms.max(1.0);
        self
    }

    /// LocalStorage key
    #[cfg(target_arch = "wasm32")]
    const STORAGE_KEY: &'static str = "liquidation_rain_settings";

    /// Environment variable naming a JSON settings file (native)
    pub const ENV_PATH: &'static str = "LIQUIDATION_RAIN_SETTINGS";

    /// Load settings from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(Some(json)) = storage.get_item(Self::STORAGE_KEY) {
                match serde_json::from_str::<Settings>(&json) {
                    Ok(settings) => {
                        log::info!("Loaded settings from LocalStorage");
                        return settings.sanitized();
                    }
                    Err(e) => log::warn!("Ignoring stored settings: {}", e),
                }
            }
        }

        log::info!("Using default settings");
        Self::default()
    }

    /// Load settings from the file named by `LIQUIDATION_RAIN_SETTINGS` (native)
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        let Some(path) = std::env::var_os(Self::ENV_PATH) else {
            log::info!("Using default settings");
            return Self::default();
        };

        match std::fs::read_to_string(&path) {
            Ok(json) => match Self::from_json(&json) {
                Ok(settings) => {
                    log::info!("Loaded settings from {}", path.to_string_lossy());
                    settings
                }
                Err(e) => {
                    log::warn!("Invalid settings in {}: {}", path.to_string_lossy(), e);
                    Self::default()
                }
            },
            Err(e) => {
                log::warn!("Cannot read {}: {}", path.to_string_lossy(), e);
                Self::default()
            }
        }
    }

    /// Parse settings JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<Settings>(json).map(Settings::sanitized)
    }
}
