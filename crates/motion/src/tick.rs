//! The per-tick driver: one entity at a time, in a fixed phase order.

use geometry::{Aabb, VoxelShape};
use glam::{DVec3, IVec3};
use serde::{Deserialize, Serialize};
use tracing::{error, instrument, trace};

use crate::{
    CollidableBox, CollisionContext, Contact, DamageSource, Effect, EffectSink, EntityId,
    FluidState, GameClock, InvalidInput, Kinematics, MotionProfile, MoveOutcome, MovementInput,
    PhysicsConfig, QueryError, TickError, World, WorldBorder,
    fluid::{touch_lava, update_fluid_state},
    status::{self, FreezeEnvironment},
    travel,
};

/// Whether this tick runs on the authoritative side. Clients never deal damage or freeze.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Side {
    Client,
    #[default]
    Server,
}

/// Everything a tick needs besides the world and the entity.
#[derive(Copy, Clone, Debug)]
pub struct TickContext<'a> {
    pub game_time: u64,
    pub side: Side,
    pub config: &'a PhysicsConfig,
}

/// A simulated entity: its kind's profile, its state and this tick's input.
#[derive(Clone, Debug, PartialEq)]
pub struct Entity {
    pub id: EntityId,
    pub profile: MotionProfile,
    pub state: Kinematics,
    pub input: MovementInput,
}

impl Entity {
    pub fn new(id: EntityId, profile: MotionProfile, position: DVec3) -> Result<Self, InvalidInput> {
        let state = Kinematics::new(position, &profile)?;
        Ok(Self {
            id,
            profile,
            state,
            input: MovementInput::default(),
        })
    }

    fn emit_effect(&self, sink: &mut impl EffectSink, effect: Option<Effect>) {
        if let Some(effect) = effect {
            sink.emit(self.id, effect);
        }
    }

    /// Age, portal cooldown, fluids, fire, freezing and the void: everything before movement.
    fn base_tick<W: World + ?Sized>(
        &mut self,
        world: &W,
        ctx: &TickContext<'_>,
        sink: &mut impl EffectSink,
    ) -> Result<(), TickError> {
        let state = &mut self.state;
        state.remember_position();
        state.sprinting = self.input.sprinting;
        state.sneaking = self.input.sneaking;

        state.age = state.age.wrapping_add(1);
        if state.portal_cooldown > 0 {
            state.portal_cooldown -= 1;
        }
        state.was_in_powder_snow = state.in_powder_snow;
        state.in_powder_snow = false;

        update_fluid_state(world, self, ctx, sink).map_err(TickError::fluid(self.id))?;

        match ctx.side {
            Side::Client => self.state.fire_ticks = 0,
            Side::Server => {
                let state = &mut self.state;
                let burning = state.is_on_fire();
                let burned = status::burn(
                    state.fire_ticks,
                    self.profile.fire_immune,
                    state.is_in_lava(),
                    ctx.config.fire_damage_interval,
                );
                state.fire_ticks = burned.counter;
                if burning {
                    state.ticks_frozen = 0;
                }
                self.emit_effect(sink, burned.effect);

                let frozen = status::freeze(
                    self.state.ticks_frozen,
                    FreezeEnvironment {
                        in_powder_snow: self.state.was_in_powder_snow,
                        can_freeze: self.profile.can_freeze,
                        age: self.state.age,
                    },
                    ctx.config,
                );
                self.state.ticks_frozen = frozen.counter;
                self.emit_effect(sink, frozen.effect);
            }
        }

        touch_lava(self, ctx, sink);

        let void = world.min_build_height() - ctx.config.out_of_world_depth;
        if ctx.side == Side::Server && self.state.position().y < f64::from(void) {
            sink.emit(self.id, Effect::ApplyDamage {
                source: DamageSource::OutOfWorld,
                amount: 4.0,
            });
        }

        self.state.first_tick = false;
        Ok(())
    }

    /// Runs one full tick. On error the entity may be left half-updated; [`Simulation::tick`]
    /// restores it.
    #[instrument(skip_all, level = "trace", fields(entity = %self.id))]
    pub fn tick<W: World + ?Sized>(
        &mut self,
        world: &W,
        ctx: &TickContext<'_>,
        sink: &mut impl EffectSink,
    ) -> Result<MoveOutcome, TickError> {
        self.base_tick(world, ctx, sink)?;
        travel(world, self, ctx, sink)
    }
}

/// The world as seen during one tick: entity boxes are the ones committed before the tick
/// started, so no entity sees another half-way through its move.
struct Committed<'w, W: ?Sized> {
    world: &'w W,
    boxes: Vec<CollidableBox>,
}

impl<W: World + ?Sized> World for Committed<'_, W> {
    fn shape_at(
        &self,
        pos: IVec3,
        context: &CollisionContext,
    ) -> Result<Option<VoxelShape>, QueryError> {
        self.world.shape_at(pos, context)
    }

    fn fluid_at(&self, pos: IVec3) -> Result<FluidState, QueryError> {
        self.world.fluid_at(pos)
    }

    fn contact_at(&self, pos: IVec3) -> Result<Contact, QueryError> {
        self.world.contact_at(pos)
    }

    fn entities_near(
        &self,
        query: &Aabb,
        excluding: EntityId,
    ) -> Result<Vec<CollidableBox>, QueryError> {
        let mut near = self.world.entities_near(query, excluding)?;
        near.extend(
            self.boxes
                .iter()
                .filter(|other| other.id != excluding && other.aabb.intersects(query)),
        );
        Ok(near)
    }

    fn world_border(&self) -> WorldBorder {
        self.world.world_border()
    }

    fn is_area_loaded(&self, min: IVec3, max: IVec3) -> bool {
        self.world.is_area_loaded(min, max)
    }

    fn is_raining_at(&self, pos: IVec3) -> bool {
        self.world.is_raining_at(pos)
    }

    fn min_build_height(&self) -> i32 {
        self.world.min_build_height()
    }

    fn ultra_warm(&self) -> bool {
        self.world.ultra_warm()
    }

    fn friction_at(&self, pos: IVec3) -> Option<f64> {
        self.world.friction_at(pos)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    pub ticked: usize,
    /// Entities whose tick failed and were left as they were before it.
    pub frozen: Vec<EntityId>,
}

/// Owns the game clock and the physics constants, and ticks a set of entities against a
/// world.
#[derive(Clone, Debug, Default)]
pub struct Simulation {
    clock: GameClock,
    config: PhysicsConfig,
    side: Side,
}

impl Simulation {
    #[must_use]
    pub fn new(config: PhysicsConfig, side: Side) -> Self {
        Self {
            clock: GameClock::new(),
            config,
            side,
        }
    }

    #[must_use]
    pub const fn clock(&self) -> &GameClock {
        &self.clock
    }

    #[must_use]
    pub const fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    /// Called when a world is loaded.
    pub fn reset(&mut self) {
        self.clock.reset();
    }

    #[must_use]
    pub const fn context(&self) -> TickContext<'_> {
        TickContext {
            game_time: self.clock.now(),
            side: self.side,
            config: &self.config,
        }
    }

    /// Ticks every entity once, then advances the clock.
    ///
    /// A failed entity is restored to its pre-tick state and its effects are dropped; the
    /// remaining entities still tick.
    #[instrument(skip_all, fields(tick = self.clock.now(), entities = entities.len()))]
    pub fn tick<W: World + ?Sized>(
        &mut self,
        world: &W,
        entities: &mut [Entity],
        sink: &mut impl EffectSink,
    ) -> TickReport {
        let committed = Committed {
            world,
            boxes: entities
                .iter()
                .filter(|entity| entity.profile.solid)
                .map(|entity| CollidableBox {
                    id: entity.id,
                    aabb: entity.state.bounding_box(),
                })
                .collect(),
        };

        let ctx = self.context();
        let mut report = TickReport::default();
        let mut effects: Vec<(EntityId, Effect)> = Vec::new();

        for entity in entities.iter_mut() {
            let before = entity.state.clone();
            effects.clear();

            match entity.tick(&committed, &ctx, &mut effects) {
                Ok(outcome) => {
                    trace!(entity = %entity.id, achieved = ?outcome.achieved, "ticked");
                    for (id, effect) in effects.drain(..) {
                        sink.emit(id, effect);
                    }
                    report.ticked += 1;
                }
                Err(failure) => {
                    error!(
                        entity = %failure.entity(),
                        block = ?failure.block(),
                        error = &failure as &(dyn std::error::Error + 'static),
                        "entity tick failed, freezing it for this tick"
                    );
                    entity.state = before;
                    report.frozen.push(entity.id);
                }
            }
        }

        self.clock.advance();
        report
    }
}
