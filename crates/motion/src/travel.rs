//! Turns an entity's input and environment into this tick's desired displacement, moves it, and
//! applies drag and gravity for the next tick.

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::{
    EffectSink, Entity, FluidKind, MoveOutcome, MovementMode, MoverType, Resolver, TickContext,
    TickError, World, move_entity,
};

/// Per-tick input from a controller (player input or AI), already in world space.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MovementInput {
    pub acceleration: DVec3,
    pub sprinting: bool,
    pub sneaking: bool,
}

const WATER_DRAG: f64 = 0.8;
const SPRINT_WATER_DRAG: f64 = 0.9;
const LAVA_DRAG: f64 = 0.5;
const AIR_DRAG: f64 = 0.91;
const VERTICAL_AIR_DRAG: f64 = 0.98;
const WATER_BREATHER_DRAG: f64 = 0.9;

/// Upward kick given to an entity swimming against a ledge it can climb out onto.
const CLIMB_OUT_SPEED: f64 = 0.3;

/// Sinking in fluid: a slow, steady descent instead of full gravity.
fn fluid_falling(motion: DVec3, gravity: f64, falling: bool, sprinting: bool, no_gravity: bool) -> DVec3 {
    if no_gravity || sprinting {
        return motion;
    }

    let sink = gravity / 16.0;
    let y = if falling && (motion.y - 0.005).abs() >= 0.003 && (motion.y - sink).abs() < 0.003 {
        -0.003
    } else {
        motion.y - sink
    };

    DVec3::new(motion.x, y, motion.z)
}

fn accelerate(entity: &mut Entity) {
    let acceleration = entity.input.acceleration;
    entity.state.push(acceleration).ok();
}

fn set_motion(entity: &mut Entity, motion: DVec3) {
    entity.state.set_motion(motion).ok();
}

fn move_self<W: World + ?Sized>(
    world: &W,
    entity: &mut Entity,
    ctx: &TickContext<'_>,
    sink: &mut impl EffectSink,
) -> Result<MoveOutcome, TickError> {
    let motion = entity.state.motion();
    move_entity(world, entity, MoverType::SelfMotion, motion, ctx, sink)
}

/// After a blocked move in fluid, hops the entity up if the space above the ledge is open.
fn climb_out<W: World + ?Sized>(
    world: &W,
    entity: &mut Entity,
    start_y: f64,
) -> Result<(), TickError> {
    let state = &entity.state;
    if !state.horizontal_collision {
        return Ok(());
    }

    let motion = state.motion();
    let lift = motion.y + 0.6 - state.position().y + start_y;
    let query = state
        .bounding_box()
        .move_by(DVec3::new(motion.x, lift, motion.z));

    let resolver = Resolver::new(world, entity.id, state.collision_context());
    if resolver
        .is_free(&query)
        .map_err(TickError::collision(entity.id))?
    {
        set_motion(entity, DVec3::new(motion.x, CLIMB_OUT_SPEED, motion.z));
    }
    Ok(())
}

fn travel_in_water<W: World + ?Sized>(
    world: &W,
    entity: &mut Entity,
    ctx: &TickContext<'_>,
    sink: &mut impl EffectSink,
) -> Result<MoveOutcome, TickError> {
    let start_y = entity.state.position().y;
    let falling = entity.state.motion().y <= 0.0;
    let sprinting = entity.state.sprinting;
    let drag = if sprinting { SPRINT_WATER_DRAG } else { WATER_DRAG };

    accelerate(entity);
    let outcome = move_self(world, entity, ctx, sink)?;

    let motion = entity.state.motion() * DVec3::new(drag, WATER_DRAG, drag);
    let motion = fluid_falling(
        motion,
        ctx.config.gravity,
        falling,
        sprinting,
        entity.profile.no_gravity,
    );
    set_motion(entity, motion);

    climb_out(world, entity, start_y)?;
    Ok(outcome)
}

fn travel_in_lava<W: World + ?Sized>(
    world: &W,
    entity: &mut Entity,
    ctx: &TickContext<'_>,
    sink: &mut impl EffectSink,
) -> Result<MoveOutcome, TickError> {
    let start_y = entity.state.position().y;
    let falling = entity.state.motion().y <= 0.0;

    accelerate(entity);
    let outcome = move_self(world, entity, ctx, sink)?;

    let state = &entity.state;
    let jump_threshold = if state.dimensions().eye_height < 0.4 { 0.0 } else { 0.4 };
    let mut motion = if state.fluid_heights.get(FluidKind::Lava) <= jump_threshold {
        let motion = state.motion() * DVec3::new(LAVA_DRAG, WATER_DRAG, LAVA_DRAG);
        fluid_falling(
            motion,
            ctx.config.gravity,
            falling,
            state.sprinting,
            entity.profile.no_gravity,
        )
    } else {
        state.motion() * LAVA_DRAG
    };

    if !entity.profile.no_gravity {
        motion.y -= ctx.config.gravity / 4.0;
    }
    set_motion(entity, motion);

    climb_out(world, entity, start_y)?;
    Ok(outcome)
}

fn travel_on_land<W: World + ?Sized>(
    world: &W,
    entity: &mut Entity,
    ctx: &TickContext<'_>,
    sink: &mut impl EffectSink,
) -> Result<MoveOutcome, TickError> {
    let state = &entity.state;
    let drag = if state.on_ground {
        let position = state.position();
        let below = DVec3::new(position.x, state.bounding_box().min.y - 0.500_000_1, position.z)
            .floor()
            .as_ivec3();
        world.friction_at(below).unwrap_or(ctx.config.default_friction) * AIR_DRAG
    } else {
        AIR_DRAG
    };

    accelerate(entity);
    let outcome = move_self(world, entity, ctx, sink)?;

    let mut motion = entity.state.motion();
    if !entity.profile.no_gravity {
        motion.y -= ctx.config.gravity;
    }
    set_motion(entity, motion * DVec3::new(drag, VERTICAL_AIR_DRAG, drag));

    Ok(outcome)
}

/// Drags evenly on every axis and never falls.
fn travel_flying<W: World + ?Sized>(
    world: &W,
    entity: &mut Entity,
    ctx: &TickContext<'_>,
    sink: &mut impl EffectSink,
) -> Result<MoveOutcome, TickError> {
    let state = &entity.state;
    let drag = if state.is_in_water() {
        WATER_DRAG
    } else if state.is_in_lava() {
        LAVA_DRAG
    } else if state.on_ground {
        ctx.config.default_friction * AIR_DRAG
    } else {
        AIR_DRAG
    };

    accelerate(entity);
    let outcome = move_self(world, entity, ctx, sink)?;
    let motion = entity.state.motion() * drag;
    set_motion(entity, motion);
    Ok(outcome)
}

fn swim_freely<W: World + ?Sized>(
    world: &W,
    entity: &mut Entity,
    ctx: &TickContext<'_>,
    sink: &mut impl EffectSink,
) -> Result<MoveOutcome, TickError> {
    accelerate(entity);
    let outcome = move_self(world, entity, ctx, sink)?;
    let motion = entity.state.motion() * WATER_BREATHER_DRAG;
    set_motion(entity, motion);
    Ok(outcome)
}

/// Moves the entity once according to its movement mode and surroundings.
pub fn travel<W: World + ?Sized>(
    world: &W,
    entity: &mut Entity,
    ctx: &TickContext<'_>,
    sink: &mut impl EffectSink,
) -> Result<MoveOutcome, TickError> {
    match entity.profile.mode {
        MovementMode::Flying => travel_flying(world, entity, ctx, sink),
        MovementMode::WaterBreather if entity.state.is_in_water() => {
            swim_freely(world, entity, ctx, sink)
        }
        MovementMode::Land | MovementMode::WaterBreather => {
            if entity.state.is_in_water() {
                travel_in_water(world, entity, ctx, sink)
            } else if entity.state.is_in_lava() {
                travel_in_lava(world, entity, ctx, sink)
            } else {
                travel_on_land(world, entity, ctx, sink)
            }
        }
    }
}
