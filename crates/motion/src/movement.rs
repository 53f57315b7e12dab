//! Applying a resolved move to an entity and everything that follows from it.

use geometry::{COLLISION_EPSILON, cells};
use glam::{DVec3, IVec3};
use tracing::{instrument, trace, warn};

use crate::{
    Contact, CollisionError, DamageSource, Effect, EffectSink, Entity, FluidKind, GameEvent,
    InvalidInput, MoverType, Query, Resolver, Side, TickContext, TickError, World,
    resolve_movement,
    status::{self, FireContact},
};

/// Distance a sneaking entity's move is shortened by per attempt while looking for support.
const EDGE_STEP: f64 = 0.05;

/// How long an entity burns once a fire block has set it alight.
const FIRE_BLOCK_SECONDS: i32 = 8;

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct MoveOutcome {
    /// The displacement handed to the resolver, after sticky blocks and edge back-off.
    pub desired: DVec3,
    pub achieved: DVec3,
}

fn shorten(d: f64) -> f64 {
    if d.abs() < EDGE_STEP {
        0.0
    } else {
        d - EDGE_STEP.copysign(d)
    }
}

/// Keeps a sneaking entity from walking off a ledge taller than its step height.
fn back_off_from_edge<W: World + ?Sized>(
    world: &W,
    entity: &Entity,
    kind: MoverType,
    movement: DVec3,
) -> Result<DVec3, CollisionError> {
    let state = &entity.state;
    let step = entity.profile.step_height;

    if movement.y > 0.0
        || !matches!(kind, MoverType::SelfMotion | MoverType::Player)
        || !state.sneaking
    {
        return Ok(movement);
    }

    let resolver = Resolver::new(world, entity.id, state.collision_context());
    let bbox = state.bounding_box();

    let above_ground = state.on_ground || {
        let fall = f64::from(state.fall_distance);
        fall < step && resolver.has_collision(&bbox.move_by(DVec3::new(0.0, fall - step, 0.0)))?
    };
    if !above_ground {
        return Ok(movement);
    }

    let supported = |dx: f64, dz: f64| resolver.has_collision(&bbox.move_by(DVec3::new(dx, -step, dz)));

    let mut x = movement.x;
    let mut z = movement.z;

    while x != 0.0 && !supported(x, 0.0)? {
        x = shorten(x);
    }
    while z != 0.0 && !supported(0.0, z)? {
        z = shorten(z);
    }
    while x != 0.0 && z != 0.0 && !supported(x, z)? {
        x = shorten(x);
        z = shorten(z);
    }

    Ok(DVec3::new(x, movement.y, z))
}

/// Lands the entity or keeps counting how far it has fallen.
fn check_fall(entity: &mut Entity, achieved_y: f64, ctx: &TickContext<'_>, sink: &mut impl EffectSink) {
    let state = &mut entity.state;

    if !state.on_ground {
        if achieved_y < 0.0 {
            #[expect(clippy::cast_possible_truncation, reason = "fall distances are small")]
            let fallen = achieved_y as f32;
            state.fall_distance -= fallen;
        }
        return;
    }

    if state.fall_distance > 0.0 {
        if entity.profile.takes_fall_damage && ctx.side == Side::Server {
            let damage = (state.fall_distance - ctx.config.safe_fall_distance).ceil();
            if damage > 0.0 {
                sink.emit(entity.id, Effect::PlayFallSound { damage });
                sink.emit(entity.id, Effect::ApplyDamage {
                    source: DamageSource::Fall,
                    amount: damage,
                });
            }
        }
        sink.emit(entity.id, Effect::EmitGameEvent(GameEvent::HitGround));
    }
    state.fall_distance = 0.0;
}

#[expect(clippy::cast_possible_truncation, reason = "walked distances are small")]
fn step_sounds<W: World + ?Sized>(
    world: &W,
    entity: &mut Entity,
    achieved: DVec3,
    on_pos: IVec3,
    sink: &mut impl EffectSink,
) -> Result<(), CollisionError> {
    if !entity.profile.noisy {
        return Ok(());
    }

    let below = world
        .contact_at(on_pos)
        .map_err(CollisionError::at(Query::Contact, on_pos))?;

    let state = &mut entity.state;
    let dy = if below == Contact::PowderSnow { achieved.y } else { 0.0 };
    let horizontal = achieved.x.hypot(achieved.z);

    state.fly_distance += (achieved.length() * 0.6) as f32;
    state.walk_distance += (horizontal * 0.6) as f32;
    state.move_distance += (DVec3::new(achieved.x, dy, achieved.z).length() * 0.6) as f32;

    if state.move_distance <= state.next_step || below == Contact::Air {
        return Ok(());
    }
    state.next_step = state.move_distance.floor() + 1.0;

    if state.is_in_water() {
        let motion = state.motion();
        let speed = (motion.x * motion.x)
            .mul_add(0.2, (motion.z * motion.z).mul_add(0.2, motion.y * motion.y))
            .sqrt();
        let volume = (speed * 0.35).min(1.0) as f32;
        sink.emit(entity.id, Effect::PlaySwimSound { volume });
        sink.emit(entity.id, Effect::EmitGameEvent(GameEvent::Swim));
    } else {
        sink.emit(entity.id, Effect::PlayStepSound { pos: on_pos });
        sink.emit(entity.id, Effect::EmitGameEvent(GameEvent::Step));
    }

    Ok(())
}

/// Applies every block the moved box overlaps. Returns whether any of them burns.
fn touch_blocks<W: World + ?Sized>(
    world: &W,
    entity: &mut Entity,
    ctx: &TickContext<'_>,
    sink: &mut impl EffectSink,
) -> Result<bool, CollisionError> {
    let id = entity.id;
    let fire_immune = entity.profile.fire_immune;
    let state = &mut entity.state;

    let (min, max) = state.bounding_box().block_range();
    let previous = state.last_contacts.replace((min, max));
    let was_inside = |pos: IVec3| {
        previous.is_some_and(|(lo, hi)| pos.cmpge(lo).all() && pos.cmple(hi).all())
    };

    let mut touching_fire = false;
    for pos in cells(min, max) {
        let contact = world
            .contact_at(pos)
            .map_err(CollisionError::at(Query::Contact, pos))?;

        match contact {
            Contact::Fire { damage } => {
                touching_fire = true;
                if !fire_immune {
                    state.fire_ticks += 1;
                    if state.fire_ticks == 0 {
                        state.ignite_for(FIRE_BLOCK_SECONDS * 20);
                    }
                    if ctx.side == Side::Server {
                        sink.emit(id, Effect::ApplyDamage {
                            source: DamageSource::InFire,
                            amount: damage,
                        });
                    }
                }
            }
            Contact::PowderSnow => state.in_powder_snow = true,
            Contact::Sticky { multiplier } => state.make_stuck(multiplier),
            Contact::Air | Contact::Inert => {}
        }

        let fluid = world
            .fluid_at(pos)
            .map_err(CollisionError::at(Query::Fluid, pos))?;
        touching_fire |= fluid.is(FluidKind::Lava);

        if contact != Contact::Air && !was_inside(pos) {
            sink.emit(id, Effect::BlockEntered { pos });
        }
    }

    Ok(touching_fire)
}

/// Moves `entity` by `desired`, or as far as the world allows, and applies the consequences:
/// collision flags, fall damage, step sounds, block contacts and fire.
#[instrument(skip_all, level = "trace", fields(entity = %entity.id, ?kind))]
#[expect(clippy::float_cmp, reason = "clipping leaves unblocked components untouched")]
pub fn move_entity<W: World + ?Sized>(
    world: &W,
    entity: &mut Entity,
    kind: MoverType,
    desired: DVec3,
    ctx: &TickContext<'_>,
    sink: &mut impl EffectSink,
) -> Result<MoveOutcome, TickError> {
    let id = entity.id;

    if !desired.is_finite() {
        warn!(?desired, "rejecting non-finite displacement");
        return Err(TickError::invalid(id)(InvalidInput::Displacement(desired)));
    }

    if entity.state.no_physics {
        entity.state.translate(desired).map_err(TickError::invalid(id))?;
        return Ok(MoveOutcome {
            desired,
            achieved: desired,
        });
    }

    entity.state.was_on_fire = entity.state.is_on_fire();

    let mut movement = desired;
    let stuck = entity.state.stuck_speed_multiplier;
    if stuck.length_squared() > COLLISION_EPSILON {
        movement *= stuck;
        entity.state.stuck_speed_multiplier = DVec3::ZERO;
        entity.state.zero_motion_on([true; 3]);
    }

    let movement = back_off_from_edge(world, entity, kind, movement)
        .map_err(TickError::collision(id))?;
    let achieved = resolve_movement(world, entity, kind, movement, ctx)?;

    if achieved.length_squared() > COLLISION_EPSILON {
        entity.state.translate(achieved).map_err(TickError::invalid(id))?;
    }

    let x_hit = movement.x != achieved.x;
    let y_hit = movement.y != achieved.y;
    let z_hit = movement.z != achieved.z;

    let state = &mut entity.state;
    state.horizontal_collision = x_hit || z_hit;
    state.vertical_collision = y_hit;
    state.on_ground = y_hit && movement.y < 0.0;
    let on_pos = state.on_pos();

    check_fall(entity, achieved.y, ctx, sink);
    entity.state.zero_motion_on([x_hit, y_hit, z_hit]);

    step_sounds(world, entity, achieved, on_pos, sink).map_err(TickError::contact(id))?;
    let touching_fire = touch_blocks(world, entity, ctx, sink).map_err(TickError::contact(id))?;

    let state = &mut entity.state;
    let raining = world.is_raining_at(state.block_position());
    let contact = FireContact {
        touching_fire,
        wet: state.is_wet(raining) || state.in_powder_snow,
        was_on_fire: state.was_on_fire,
    };
    let settled = status::settle_fire(state.fire_ticks, contact, entity.profile.fire_immune_ticks);
    state.fire_ticks = settled.counter;
    if let Some(effect) = settled.effect {
        sink.emit(id, effect);
    }

    trace!(?movement, ?achieved, on_ground = state.on_ground, "moved");

    Ok(MoveOutcome {
        desired: movement,
        achieved,
    })
}
