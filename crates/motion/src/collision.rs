//! Swept collision: how far an entity can actually move this tick.
//!
//! A move is resolved one axis at a time against every obstacle near the swept volume: block
//! shapes, other entities' committed boxes and the world border. Grounded entities that hit
//! something horizontally get a second attempt that first lifts them by their step height.

use geometry::{Aabb, Axis, COLLISION_EPSILON, VoxelShape, cells, clip, clip_all};
use glam::{DVec3, IVec3};
use serde::{Deserialize, Serialize};
use tracing::{instrument, trace, warn};

use crate::{
    CollisionContext, CollisionError, Entity, EntityId, InvalidInput, Query, TickContext, TickError,
    World,
};

/// What is causing a move. Only pistons are subject to the per-tick push budget.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MoverType {
    #[default]
    SelfMotion,
    Player,
    Piston,
    ShulkerBox,
    Shulker,
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "block coordinates of in-world boxes fit in an i32"
)]
fn cell(v: f64) -> i32 {
    v.floor() as i32
}

/// Y first, then the horizontal axis with the smaller displacement, then the larger one.
fn axis_order(movement: DVec3) -> [Axis; 3] {
    if movement.x.abs() < movement.z.abs() {
        [Axis::Y, Axis::X, Axis::Z]
    } else {
        [Axis::Y, Axis::Z, Axis::X]
    }
}

fn horizontal_distance_squared(v: DVec3) -> f64 {
    v.x.mul_add(v.x, v.z * v.z)
}

/// Sweeps `bbox` by `movement` against a fixed obstacle list, one axis at a time, moving the
/// box by each clipped component before resolving the next.
#[must_use]
pub fn sweep(movement: DVec3, bbox: &Aabb, obstacles: &[Aabb]) -> DVec3 {
    if obstacles.is_empty() {
        return movement;
    }

    let mut bbox = *bbox;
    let mut resolved = DVec3::ZERO;

    for axis in axis_order(movement) {
        let d = axis.of(movement);
        if d == 0.0 {
            continue;
        }

        let d = clip_all(axis, &bbox, obstacles, d);
        if d != 0.0 {
            bbox = bbox.move_by(axis.vec(d));
        }
        axis.set(&mut resolved, d);
    }

    resolved
}

/// Resolves moves for one entity against one world.
pub struct Resolver<'w, W: ?Sized> {
    world: &'w W,
    entity: EntityId,
    context: CollisionContext,
}

impl<'w, W: World + ?Sized> Resolver<'w, W> {
    pub const fn new(world: &'w W, entity: EntityId, context: CollisionContext) -> Self {
        Self {
            world,
            entity,
            context,
        }
    }

    /// Unloaded blocks collide as full cubes.
    fn shape_at(&self, pos: IVec3) -> Result<VoxelShape, CollisionError> {
        let shape = self
            .world
            .shape_at(pos, &self.context)
            .map_err(CollisionError::at(Query::Shape, pos))?;
        Ok(shape.unwrap_or_else(VoxelShape::block))
    }

    /// Collects every block box strictly intersecting `query`. Cells one beyond the query are
    /// visited too, since shapes such as fences reach outside their own cell.
    fn block_obstacles(&self, query: &Aabb, out: &mut Vec<Aabb>) -> Result<(), CollisionError> {
        let min = (query.min - COLLISION_EPSILON).floor().as_ivec3() - IVec3::ONE;
        let max = (query.max + COLLISION_EPSILON).floor().as_ivec3() + IVec3::ONE;

        for pos in cells(min, max) {
            let shape = self.shape_at(pos)?;
            out.extend(shape.at(pos).filter(|aabb| aabb.intersects(query)));
        }

        Ok(())
    }

    fn entity_obstacles(&self, query: &Aabb) -> Result<Vec<Aabb>, CollisionError> {
        let near = self
            .world
            .entities_near(query, self.entity)
            .map_err(CollisionError::at(Query::Entities, query.min.floor().as_ivec3()))?;

        Ok(near
            .into_iter()
            .filter(|other| other.id != self.entity && other.aabb.intersects(query))
            .map(|other| other.aabb)
            .collect())
    }

    /// Entity boxes near the sweep plus the world border, if the sweep reaches past it.
    fn ambient_obstacles(&self, bbox: &Aabb, query: &Aabb) -> Result<Vec<Aabb>, CollisionError> {
        let mut obstacles = self.entity_obstacles(query)?;

        let border = self.world.world_border();
        if border.contains(&bbox.shrink(COLLISION_EPSILON)) && !border.contains(query) {
            trace!("sweep crosses the world border");
            obstacles.extend_from_slice(border.shape().boxes());
        }

        Ok(obstacles)
    }

    /// Clips `d` along `axis` by walking block layers in the direction of travel, stopping as
    /// soon as the remaining displacement cannot reach the next layer.
    fn clip_through_blocks(&self, axis: Axis, bbox: &Aabb, mut d: f64) -> Result<f64, CollisionError> {
        if d.abs() < COLLISION_EPSILON {
            return Ok(0.0);
        }

        let [a, b] = axis.others();
        let span = |other: Axis| {
            (
                cell(bbox.min_on(other) - COLLISION_EPSILON) - 1,
                cell(bbox.max_on(other) + COLLISION_EPSILON) + 1,
            )
        };
        let (a_min, a_max) = span(a);
        let (b_min, b_max) = span(b);

        let lead_min = bbox.min_on(axis) - COLLISION_EPSILON;
        let lead_max = bbox.max_on(axis) + COLLISION_EPSILON;
        let last_layer = |d: f64| {
            if d > 0.0 {
                cell(lead_max + d) + 1
            } else {
                cell(lead_min + d) - 1
            }
        };

        let forward = d > 0.0;
        let step = if forward { 1 } else { -1 };
        let mut layer = if forward {
            cell(bbox.max_on(axis) - COLLISION_EPSILON) - 1
        } else {
            cell(bbox.min_on(axis) + COLLISION_EPSILON) + 1
        };
        let mut last = last_layer(d);

        while (forward && layer <= last) || (!forward && layer >= last) {
            for i in a_min..=a_max {
                for j in b_min..=b_max {
                    let mut pos = IVec3::ZERO;
                    axis.set_cell(&mut pos, layer);
                    a.set_cell(&mut pos, i);
                    b.set_cell(&mut pos, j);

                    for obstacle in self.shape_at(pos)?.at(pos) {
                        d = clip(axis, bbox, &obstacle, d);
                    }
                    if d.abs() < COLLISION_EPSILON {
                        return Ok(0.0);
                    }
                    last = last_layer(d);
                }
            }
            layer += step;
        }

        Ok(d)
    }

    /// Resolves one sweep: the layered block walk for purely axial moves, the general
    /// per-axis sweep over an eagerly collected obstacle list otherwise.
    fn collide_box(&self, movement: DVec3, bbox: &Aabb, ambient: &[Aabb]) -> Result<DVec3, CollisionError> {
        let mut moving = Axis::ALL.into_iter().filter(|axis| axis.of(movement) != 0.0);

        match (moving.next(), moving.next()) {
            (None, _) => Ok(DVec3::ZERO),
            (Some(axis), None) => {
                let d = clip_all(axis, bbox, ambient, axis.of(movement));
                let d = self.clip_through_blocks(axis, bbox, d)?;
                Ok(axis.vec(d))
            }
            _ => {
                let query = bbox.expand_towards(movement);
                let mut obstacles = ambient.to_vec();
                self.block_obstacles(&query, &mut obstacles)?;
                Ok(sweep(movement, bbox, &obstacles))
            }
        }
    }

    /// Resolves `movement` for a box, trying a step up when a grounded move is blocked
    /// horizontally. The stepped result only wins if it gets strictly further horizontally.
    #[expect(clippy::float_cmp, reason = "clipping leaves unblocked components untouched")]
    pub fn collide(
        &self,
        movement: DVec3,
        bbox: &Aabb,
        on_ground: bool,
        step_height: f64,
    ) -> Result<DVec3, CollisionError> {
        let ambient = self.ambient_obstacles(bbox, &bbox.expand_towards(movement))?;
        let flat = self.collide_box(movement, bbox, &ambient)?;

        let blocked_horizontally = movement.x != flat.x || movement.z != flat.z;
        let grounded = on_ground || (movement.y != flat.y && movement.y < 0.0);

        if step_height <= 0.0 || !grounded || !blocked_horizontally {
            return Ok(flat);
        }

        let horizontal = DVec3::new(movement.x, 0.0, movement.z);
        let mut stepped = self.collide_box(
            DVec3::new(movement.x, step_height, movement.z),
            bbox,
            &ambient,
        )?;

        let rise = self.collide_box(
            DVec3::new(0.0, step_height, 0.0),
            &bbox.expand_towards(horizontal),
            &ambient,
        )?;
        if rise.y < step_height {
            let across = self.collide_box(horizontal, &bbox.move_by(rise), &ambient)? + rise;
            if horizontal_distance_squared(across) > horizontal_distance_squared(stepped) {
                stepped = across;
            }
        }

        if horizontal_distance_squared(stepped) > horizontal_distance_squared(flat) {
            let settle = self.collide_box(
                DVec3::new(0.0, movement.y - stepped.y, 0.0),
                &bbox.move_by(stepped),
                &ambient,
            )?;
            trace!(?flat, ?stepped, ?settle, "stepping up");
            return Ok(stepped + settle);
        }

        Ok(flat)
    }

    /// `true` if any block or collidable entity intersects `query`.
    pub fn has_collision(&self, query: &Aabb) -> Result<bool, CollisionError> {
        let mut blocks = Vec::new();
        self.block_obstacles(query, &mut blocks)?;
        if !blocks.is_empty() {
            return Ok(true);
        }
        Ok(!self.entity_obstacles(query)?.is_empty())
    }

    /// No collision and no fluid of any kind inside `query`.
    pub fn is_free(&self, query: &Aabb) -> Result<bool, CollisionError> {
        if self.has_collision(query)? {
            return Ok(false);
        }

        let min = query.min.floor().as_ivec3();
        let max = query.max.ceil().as_ivec3() - IVec3::ONE;
        for pos in cells(min, max) {
            let fluid = self
                .world
                .fluid_at(pos)
                .map_err(CollisionError::at(Query::Fluid, pos))?;
            if fluid.kind.is_some() {
                return Ok(false);
            }
        }

        Ok(true)
    }
}

/// How far an entity can move along `desired` this tick.
///
/// Near-zero displacements are returned unchanged. Piston moves are first clamped against the
/// entity's per-tick push budget. A non-finite `desired` is rejected before anything about the
/// entity changes.
#[instrument(skip_all, level = "trace", fields(entity = %entity.id))]
pub fn resolve_movement<W: World + ?Sized>(
    world: &W,
    entity: &mut Entity,
    kind: MoverType,
    desired: DVec3,
    ctx: &TickContext<'_>,
) -> Result<DVec3, TickError> {
    if !desired.is_finite() {
        warn!(?desired, "rejecting non-finite displacement");
        return Err(TickError::Invalid {
            entity: entity.id,
            source: InvalidInput::Displacement(desired),
        });
    }

    if desired.length_squared() <= COLLISION_EPSILON {
        return Ok(desired);
    }

    let desired = if kind == MoverType::Piston {
        let limited = entity
            .state
            .piston
            .limit(desired, ctx.game_time, ctx.config.piston_limit);
        if limited == DVec3::ZERO {
            return Ok(DVec3::ZERO);
        }
        limited
    } else {
        desired
    };

    let state = &entity.state;
    let resolver = Resolver::new(world, entity.id, state.collision_context());
    resolver
        .collide(
            desired,
            &state.bounding_box(),
            state.on_ground,
            entity.profile.step_height,
        )
        .map_err(TickError::collision(entity.id))
}
