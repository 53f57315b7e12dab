//! Submersion depth, current push and the water/lava state transitions.

use geometry::{Aabb, FLUID_EPSILON, cells};
use glam::{DVec3, IVec3};
use tracing::{instrument, trace};

use crate::{
    CollisionError, DamageSource, Effect, EffectSink, Entity, FluidKind, GameEvent, Query,
    Side, TickContext, World, status,
};

/// Depth below which a block's flow only counts in proportion to the depth.
const SHALLOW_DEPTH: f64 = 0.4;

/// Eyes sit this far above the sampling point used for eye submersion.
const EYE_OFFSET: f64 = 0.111_111_11;

/// Horizontal speed under which a slow current is floored to the minimum push.
const STILL_SPEED: f64 = 0.003;

/// One fluid kind sampled around an entity box.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct FluidSample {
    pub submerged: bool,
    /// Deepest fluid surface above the bottom of the box.
    pub height: f64,
    /// Sum of the contributing blocks' flow.
    pub flow: DVec3,
    pub contributors: u32,
}

/// Samples `kind` around `bbox`. `None` if any column within one block of the box is unloaded.
pub fn sample_fluid<W: World + ?Sized>(
    world: &W,
    bbox: &Aabb,
    kind: FluidKind,
) -> Result<Option<FluidSample>, CollisionError> {
    let reach = bbox.inflate(1.0);
    if !world.is_area_loaded(reach.min.floor().as_ivec3(), reach.max.ceil().as_ivec3()) {
        return Ok(None);
    }

    let inner = bbox.shrink(FLUID_EPSILON);
    let min = inner.min.floor().as_ivec3();
    let max = inner.max.ceil().as_ivec3() - IVec3::ONE;

    let mut sample = FluidSample::default();
    for pos in cells(min, max) {
        let fluid = world
            .fluid_at(pos)
            .map_err(CollisionError::at(Query::Fluid, pos))?;
        if !fluid.is(kind) {
            continue;
        }

        let surface = f64::from(pos.y) + fluid.height;
        if surface < inner.min.y {
            continue;
        }

        sample.submerged = true;
        sample.height = sample.height.max(surface - inner.min.y);

        let mut flow = fluid.flow;
        if sample.height < SHALLOW_DEPTH {
            flow *= sample.height;
        }
        sample.flow += flow;
        sample.contributors += 1;
    }

    Ok(Some(sample))
}

/// The push a sampled current applies to an entity moving at `motion`.
///
/// The flow is averaged over the contributing blocks and, unless `keep_magnitude` is set,
/// reduced to its direction before scaling.
#[must_use]
pub fn fluid_push(
    sample: &FluidSample,
    motion: DVec3,
    scale: f64,
    keep_magnitude: bool,
    min_push: f64,
) -> DVec3 {
    if sample.flow.length() <= 0.0 {
        return DVec3::ZERO;
    }

    let mut push = sample.flow;
    if sample.contributors > 0 {
        push /= f64::from(sample.contributors);
    }
    if !keep_magnitude {
        push = push.normalize();
    }
    push *= scale;

    if motion.x.abs() < STILL_SPEED && motion.z.abs() < STILL_SPEED && push.length() < min_push {
        push = push.normalize() * min_push;
    }

    push
}

/// Samples one fluid kind, records its depth in the entity's fluid heights and applies the
/// current. Returns whether the entity touches that fluid at all.
///
/// Entities next to unloaded terrain are reported as not submerged and left untouched.
#[instrument(skip_all, level = "trace", fields(entity = %entity.id, ?kind))]
pub fn update_fluid_push<W: World + ?Sized>(
    world: &W,
    entity: &mut Entity,
    kind: FluidKind,
    flow_scale: f64,
    ctx: &TickContext<'_>,
) -> Result<bool, CollisionError> {
    let state = &mut entity.state;
    let Some(sample) = sample_fluid(world, &state.bounding_box(), kind)? else {
        trace!("touching unloaded terrain, skipping fluid");
        return Ok(false);
    };

    if entity.profile.is_pushed_by(kind) {
        let push = fluid_push(
            &sample,
            state.motion(),
            flow_scale,
            entity.profile.player,
            ctx.config.min_fluid_push,
        );
        if push != DVec3::ZERO {
            state.push(push).ok();
        }
    }

    state.fluid_heights.set(kind, sample.height);
    Ok(sample.submerged)
}

fn splash(entity: &Entity, sink: &mut impl EffectSink) {
    let motion = entity.state.motion();
    let speed = (motion.x * motion.x)
        .mul_add(0.2, (motion.z * motion.z).mul_add(0.2, motion.y * motion.y))
        .sqrt();

    #[expect(clippy::cast_possible_truncation, reason = "particle strength is a small ratio")]
    let strength = (speed * 0.2).min(1.0) as f32;

    sink.emit(entity.id, Effect::SpawnSplashParticles { strength });
    sink.emit(entity.id, Effect::EmitGameEvent(GameEvent::Splash));
}

/// Water then lava, followed by eye submersion and swimming.
#[instrument(skip_all, level = "trace", fields(entity = %entity.id))]
pub fn update_fluid_state<W: World + ?Sized>(
    world: &W,
    entity: &mut Entity,
    ctx: &TickContext<'_>,
    sink: &mut impl EffectSink,
) -> Result<(), CollisionError> {
    entity.state.fluid_heights.clear();

    let water_scale = ctx.config.flow_scale(FluidKind::Water, world.ultra_warm());
    if update_fluid_push(world, entity, FluidKind::Water, water_scale, ctx)? {
        if !entity.state.was_touching_water && !entity.state.first_tick {
            splash(entity, sink);
        }

        let state = &mut entity.state;
        state.fall_distance = 0.0;
        state.was_touching_water = true;

        let put_out = status::extinguish(state.fire_ticks, entity.profile.fire_immune_ticks);
        state.fire_ticks = put_out.counter;
        if let Some(effect) = put_out.effect {
            sink.emit(entity.id, effect);
        }
    } else {
        entity.state.was_touching_water = false;
    }

    let lava_scale = ctx.config.flow_scale(FluidKind::Lava, world.ultra_warm());
    update_fluid_push(world, entity, FluidKind::Lava, lava_scale, ctx)?;

    update_eyes(world, entity)?;
    update_swimming(world, entity)
}

/// Lava sets non-immune entities alight and hurts them every tick they stay in it.
pub fn touch_lava(entity: &mut Entity, ctx: &TickContext<'_>, sink: &mut impl EffectSink) {
    let state = &mut entity.state;
    if !state.is_in_lava() {
        return;
    }

    if !entity.profile.fire_immune {
        state.ignite_for(ctx.config.lava_fire_seconds * 20);
        if ctx.side == Side::Server {
            sink.emit(entity.id, Effect::ApplyDamage {
                source: DamageSource::Lava,
                amount: ctx.config.lava_damage,
            });
        }
    }
    state.fall_distance *= 0.5;
}

fn update_eyes<W: World + ?Sized>(world: &W, entity: &mut Entity) -> Result<(), CollisionError> {
    let state = &mut entity.state;
    let eye = state.eye_y() - EYE_OFFSET;
    let position = state.position();
    let pos = DVec3::new(position.x, eye, position.z).floor().as_ivec3();

    let fluid = world
        .fluid_at(pos)
        .map_err(CollisionError::at(Query::Fluid, pos))?;
    state.eyes_in_water = fluid.is(FluidKind::Water) && eye < f64::from(pos.y) + fluid.height;
    Ok(())
}

/// Swimming starts when sprinting with the head under water and water in the entity's own
/// block, and lasts while the entity keeps sprinting in water.
fn update_swimming<W: World + ?Sized>(world: &W, entity: &mut Entity) -> Result<(), CollisionError> {
    let state = &mut entity.state;
    if state.swimming {
        state.swimming = state.sprinting && state.is_in_water();
        return Ok(());
    }

    if !(state.sprinting && state.eyes_in_water) {
        return Ok(());
    }

    let pos = state.block_position();
    let fluid = world
        .fluid_at(pos)
        .map_err(CollisionError::at(Query::Fluid, pos))?;
    state.swimming = fluid.is(FluidKind::Water);
    Ok(())
}
