//! The TOML scenario format: a block layout plus the entities to drop into it.

use std::{fmt::Debug, fs, path::Path};

use anyhow::Context;
use glam::{DVec3, IVec3};
use motion::{Entity, EntityId, MotionProfile, Side, WorldBorder};
use serde::Deserialize;
use tracing::{info, instrument};
use voxel_grid::{Block, GridWorld};

const fn default_ticks() -> u64 {
    100
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    #[serde(default = "default_ticks")]
    pub ticks: u64,
    #[serde(default)]
    pub side: Side,
    #[serde(default)]
    pub raining: bool,
    #[serde(default)]
    pub ultra_warm: bool,
    pub border: Option<WorldBorder>,
    #[serde(default)]
    pub fill: Vec<Fill>,
    #[serde(default)]
    pub blocks: Vec<Placed>,
    #[serde(default)]
    pub entities: Vec<EntitySpec>,
}

/// Every block in the inclusive range `min..=max`.
#[derive(Deserialize, Debug)]
pub struct Fill {
    pub min: IVec3,
    pub max: IVec3,
    pub block: Block,
}

#[derive(Deserialize, Debug)]
pub struct Placed {
    pub pos: IVec3,
    pub block: Block,
}

#[derive(Deserialize, Debug, Copy, Clone)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Kind {
    Player,
    Mob { width: f64, height: f64 },
    Vehicle { width: f64, height: f64 },
    Fish { width: f64, height: f64 },
}

impl Kind {
    fn profile(self) -> MotionProfile {
        match self {
            Self::Player => MotionProfile::player(),
            Self::Mob { width, height } => MotionProfile::mob(width, height),
            Self::Vehicle { width, height } => MotionProfile::vehicle(width, height),
            Self::Fish { width, height } => MotionProfile::fish(width, height),
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct EntitySpec {
    pub id: u64,
    #[serde(flatten)]
    pub kind: Kind,
    pub position: DVec3,
    #[serde(default)]
    pub motion: DVec3,
    /// Added to the entity's motion every tick.
    #[serde(default)]
    pub acceleration: DVec3,
    #[serde(default)]
    pub sneaking: bool,
    #[serde(default)]
    pub sprinting: bool,
    pub step_height: Option<f64>,
    pub fire_ticks: Option<i32>,
}

impl EntitySpec {
    fn spawn(&self) -> anyhow::Result<Entity> {
        let mut profile = self.kind.profile();
        if let Some(step_height) = self.step_height {
            profile.step_height = step_height;
        }

        let mut entity = Entity::new(EntityId::from(self.id), profile, self.position)
            .with_context(|| format!("spawning entity {}", self.id))?;
        entity
            .state
            .set_motion(self.motion)
            .with_context(|| format!("initial motion of entity {}", self.id))?;
        if let Some(fire_ticks) = self.fire_ticks {
            entity.state.fire_ticks = fire_ticks;
        }
        entity.input.acceleration = self.acceleration;
        entity.input.sneaking = self.sneaking;
        entity.input.sprinting = self.sprinting;
        Ok(entity)
    }
}

impl Scenario {
    #[instrument]
    pub fn load<P: AsRef<Path> + Debug>(path: P) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path.as_ref())
            .with_context(|| format!("reading scenario {:?}", path.as_ref()))?;
        let scenario = toml::from_str::<Self>(&contents)?;
        info!(
            entities = scenario.entities.len(),
            ticks = scenario.ticks,
            "loaded scenario"
        );
        Ok(scenario)
    }

    #[must_use]
    pub fn world(&self) -> GridWorld {
        let mut world = GridWorld::new();
        for fill in &self.fill {
            world.fill(fill.min, fill.max, fill.block);
        }
        for placed in &self.blocks {
            world.set(placed.pos, placed.block);
        }
        if let Some(border) = self.border {
            world.set_border(border);
        }
        world.set_raining(self.raining);
        world.set_ultra_warm(self.ultra_warm);
        world
    }

    pub fn entities(&self) -> anyhow::Result<Vec<Entity>> {
        self.entities.iter().map(EntitySpec::spawn).collect()
    }
}
