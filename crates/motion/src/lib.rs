//! Per-tick entity motion in a voxel world.
//!
//! An [`Entity`] is ticked against a [`World`] by [`Simulation::tick`]: fluids, fire and freezing
//! first, then the entity's own travel through [`move_entity`], which resolves the move with
//! swept per-axis collision and applies landing, step sounds and block contacts. Everything the
//! host should react to comes out as an [`Effect`].

mod clock;
pub mod collision;
mod config;
mod effect;
mod error;
pub mod fluid;
mod kinematics;
mod movement;
mod profile;
pub mod status;
mod tick;
mod travel;
mod world;

pub use clock::GameClock;
pub use collision::{MoverType, Resolver, resolve_movement, sweep};
pub use config::PhysicsConfig;
pub use effect::{DamageSource, Effect, EffectSink, GameEvent};
pub use error::{CollisionError, InvalidInput, Query, QueryError, TickError};
pub use kinematics::{FluidHeights, Kinematics, PistonDeltas};
pub use movement::{MoveOutcome, move_entity};
pub use profile::{
    EntityDimensions, MotionProfile, MovementMode, Pose, PoseDimensions, PoseSizer,
};
pub use tick::{Entity, Side, Simulation, TickContext, TickReport};
pub use travel::{MovementInput, travel};
pub use world::{
    CollidableBox, CollisionContext, Contact, EntityId, FluidKind, FluidState, World, WorldBorder,
};
