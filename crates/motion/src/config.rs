//! Tunable physics constants, loaded from a `toml` file.

use std::{fmt::Debug, fs, path::Path};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

/// Every constant the motion code reads at runtime. Missing keys fall back to the defaults.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Push applied per tick by flowing water.
    pub water_flow_scale: f64,
    pub lava_flow_scale: f64,
    /// Lava push in ultra-warm dimensions.
    pub ultra_warm_lava_flow_scale: f64,
    /// Floor for a fluid push on an entity that is horizontally still.
    pub min_fluid_push: f64,
    /// Largest piston displacement an entity accumulates per axis within one game tick.
    pub piston_limit: f64,
    pub safe_fall_distance: f32,
    pub ticks_required_to_freeze: i32,
    pub freeze_damage_interval: u32,
    pub fire_damage_interval: i32,
    pub lava_fire_seconds: i32,
    pub lava_damage: f32,
    pub gravity: f64,
    /// Block friction used when the world does not report one.
    pub default_friction: f64,
    /// How far below the minimum build height an entity may fall before taking void damage.
    pub out_of_world_depth: i32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            water_flow_scale: 0.014,
            lava_flow_scale: 0.002_333_333_333_333_333_5,
            ultra_warm_lava_flow_scale: 0.007,
            min_fluid_push: 0.004_500_000_000_000_000_5,
            piston_limit: 0.51,
            safe_fall_distance: 3.0,
            ticks_required_to_freeze: 140,
            freeze_damage_interval: 40,
            fire_damage_interval: 20,
            lava_fire_seconds: 15,
            lava_damage: 4.0,
            gravity: 0.08,
            default_friction: 0.6,
            out_of_world_depth: 64,
        }
    }
}

impl PhysicsConfig {
    /// Reads the configuration at `path`. A missing file is created with the defaults so that
    /// it can be edited for the next run.
    #[instrument]
    pub fn load<P: AsRef<Path> + Debug>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("reading physics configuration {}", path.display()))?;
            let config = toml::from_str::<Self>(&contents)
                .with_context(|| format!("parsing physics configuration {}", path.display()))?;
            info!("loaded physics configuration");
            return Ok(config);
        }

        let config = Self::default();
        let parent = path.parent().filter(|parent| !parent.as_os_str().is_empty());
        if let Some(Err(error)) = parent.map(fs::create_dir_all) {
            warn!(%error, "cannot create configuration directory, using defaults");
            return Ok(config);
        }
        fs::write(path, toml::to_string(&config)?)
            .with_context(|| format!("writing default physics configuration {}", path.display()))?;
        info!("wrote default physics configuration");

        Ok(config)
    }

    /// Push scale for a fluid, taking the dimension into account.
    #[must_use]
    pub const fn flow_scale(&self, kind: crate::FluidKind, ultra_warm: bool) -> f64 {
        match kind {
            crate::FluidKind::Water => self.water_flow_scale,
            crate::FluidKind::Lava if ultra_warm => self.ultra_warm_lava_flow_scale,
            crate::FluidKind::Lava => self.lava_flow_scale,
        }
    }
}
