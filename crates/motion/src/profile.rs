//! Per-kind entity traits: size by pose, step height, fire and fluid behaviour.

use enumset::EnumSet;
use geometry::Aabb;
use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::FluidKind;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Pose {
    #[default]
    Standing,
    FallFlying,
    Sleeping,
    Swimming,
    SpinAttack,
    Crouching,
    Dying,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntityDimensions {
    pub width: f64,
    pub height: f64,
    pub eye_height: f64,
}

impl EntityDimensions {
    /// Dimensions with the eyes at 85% of the height.
    #[must_use]
    pub fn scalable(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            eye_height: height * 0.85,
        }
    }

    #[must_use]
    pub const fn with_eye_height(mut self, eye_height: f64) -> Self {
        self.eye_height = eye_height;
        self
    }

    /// The box of an entity with these dimensions standing at `feet`.
    #[must_use]
    pub fn make_box(&self, feet: DVec3) -> Aabb {
        Aabb::create(feet, self.width, self.height)
    }
}

/// Maps a pose to the entity's size in that pose.
pub trait PoseSizer {
    fn dimensions(&self, pose: Pose) -> EntityDimensions;
}

impl PoseSizer for EntityDimensions {
    fn dimensions(&self, _pose: Pose) -> EntityDimensions {
        *self
    }
}

/// Standing dimensions plus overrides for the poses that change the box.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PoseDimensions {
    pub standing: EntityDimensions,
    pub crouching: Option<EntityDimensions>,
    /// Used for swimming, fall flying and spin attacks.
    pub prone: Option<EntityDimensions>,
    pub sleeping: Option<EntityDimensions>,
}

impl PoseDimensions {
    #[must_use]
    pub const fn fixed(standing: EntityDimensions) -> Self {
        Self {
            standing,
            crouching: None,
            prone: None,
            sleeping: None,
        }
    }
}

impl PoseSizer for PoseDimensions {
    fn dimensions(&self, pose: Pose) -> EntityDimensions {
        let dimensions = match pose {
            Pose::Crouching => self.crouching,
            Pose::Swimming | Pose::FallFlying | Pose::SpinAttack => self.prone,
            Pose::Sleeping => self.sleeping,
            Pose::Standing | Pose::Dying => None,
        };
        dimensions.unwrap_or(self.standing)
    }
}

/// How an entity turns its input into motion each tick.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MovementMode {
    /// Walks, falls, swims and wades through lava.
    #[default]
    Land,
    /// Ignores gravity and drags evenly on every axis.
    Flying,
    /// Fish and the like: swim freely in water, flop around on land.
    WaterBreather,
}

/// Static properties shared by every entity of a kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MotionProfile {
    pub dimensions: PoseDimensions,
    pub step_height: f64,
    pub fire_immune: bool,
    /// Ticks of fire immunity after leaving a fire source.
    pub fire_immune_ticks: i32,
    pub can_freeze: bool,
    /// Fluids whose flow pushes this entity.
    pub pushed_by: EnumSet<FluidKind>,
    /// Players keep the magnitude of the averaged fluid flow instead of normalising it.
    pub player: bool,
    pub mode: MovementMode,
    pub no_gravity: bool,
    /// Other entities collide with this one.
    pub solid: bool,
    pub takes_fall_damage: bool,
    /// Emits step and swim sounds.
    pub noisy: bool,
}

impl MotionProfile {
    #[must_use]
    pub fn player() -> Self {
        let prone = EntityDimensions::scalable(0.6, 0.6).with_eye_height(0.4);
        Self {
            dimensions: PoseDimensions {
                standing: EntityDimensions::scalable(0.6, 1.8).with_eye_height(1.62),
                crouching: Some(EntityDimensions::scalable(0.6, 1.5).with_eye_height(1.27)),
                prone: Some(prone),
                sleeping: Some(EntityDimensions::scalable(0.2, 0.2).with_eye_height(0.2)),
            },
            step_height: 0.6,
            fire_immune: false,
            fire_immune_ticks: 20,
            can_freeze: true,
            pushed_by: EnumSet::all(),
            player: true,
            mode: MovementMode::Land,
            no_gravity: false,
            solid: false,
            takes_fall_damage: true,
            noisy: true,
        }
    }

    /// A generic land mob of the given size.
    #[must_use]
    pub fn mob(width: f64, height: f64) -> Self {
        Self {
            dimensions: PoseDimensions::fixed(EntityDimensions::scalable(width, height)),
            step_height: 0.6,
            fire_immune: false,
            fire_immune_ticks: 1,
            can_freeze: true,
            pushed_by: EnumSet::all(),
            player: false,
            mode: MovementMode::Land,
            no_gravity: false,
            solid: false,
            takes_fall_damage: true,
            noisy: true,
        }
    }

    /// A boat-like rideable that other entities bump into.
    #[must_use]
    pub fn vehicle(width: f64, height: f64) -> Self {
        Self {
            step_height: 0.0,
            solid: true,
            takes_fall_damage: false,
            noisy: false,
            ..Self::mob(width, height)
        }
    }

    #[must_use]
    pub fn fish(width: f64, height: f64) -> Self {
        Self {
            step_height: 0.0,
            can_freeze: false,
            mode: MovementMode::WaterBreather,
            takes_fall_damage: false,
            ..Self::mob(width, height)
        }
    }

    #[must_use]
    pub fn is_pushed_by(&self, kind: FluidKind) -> bool {
        self.pushed_by.contains(kind)
    }
}
