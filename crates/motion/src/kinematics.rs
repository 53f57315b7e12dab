//! Per-entity kinematic state.

use geometry::{Aabb, Axis, COLLISION_EPSILON, PISTON_EPSILON};
use glam::{DVec3, IVec3};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    CollisionContext, EntityDimensions, FluidKind, InvalidInput, MotionProfile, Pose, PoseSizer,
};

/// Submersion depth per fluid, rebuilt every tick.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FluidHeights {
    water: f64,
    lava: f64,
}

impl FluidHeights {
    #[must_use]
    pub const fn get(&self, kind: FluidKind) -> f64 {
        match kind {
            FluidKind::Water => self.water,
            FluidKind::Lava => self.lava,
        }
    }

    pub const fn set(&mut self, kind: FluidKind, height: f64) {
        match kind {
            FluidKind::Water => self.water = height,
            FluidKind::Lava => self.lava = height,
        }
    }

    pub const fn clear(&mut self) {
        *self = Self {
            water: 0.0,
            lava: 0.0,
        };
    }
}

/// Running total of piston displacement within one game tick.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PistonDeltas {
    deltas: [f64; 3],
    game_time: Option<u64>,
}

impl PistonDeltas {
    /// Clamps a piston push so that the net push on each axis within `game_time` stays inside
    /// `±limit`. Only the first non-zero axis of `movement` (x, then y, then z) is honoured.
    /// A non-finite push moves nothing and leaves the budget alone.
    pub fn limit(&mut self, movement: DVec3, game_time: u64, limit: f64) -> DVec3 {
        if !movement.is_finite() {
            return DVec3::ZERO;
        }
        if movement.length_squared() <= COLLISION_EPSILON {
            return movement;
        }

        if self.game_time != Some(game_time) {
            self.deltas = [0.0; 3];
            self.game_time = Some(game_time);
        }

        let Some(axis) = Axis::ALL.into_iter().find(|axis| axis.of(movement) != 0.0) else {
            return DVec3::ZERO;
        };

        let slot = &mut self.deltas[axis.index()];
        let before = *slot;
        let after = (before + axis.of(movement)).clamp(-limit, limit);
        *slot = after;

        let allowed = after - before;
        if allowed.abs() <= PISTON_EPSILON {
            DVec3::ZERO
        } else {
            axis.vec(allowed)
        }
    }

    #[must_use]
    pub const fn total(&self, axis: Axis) -> f64 {
        self.deltas[axis.index()]
    }
}

/// Everything about an entity that physics reads or writes.
///
/// `bounding_box` is always `dimensions.make_box(position)`: the position, pose and dimension
/// setters all rebuild it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Kinematics {
    position: DVec3,
    previous_position: DVec3,
    block_position: IVec3,
    motion: DVec3,
    yaw: f32,
    pitch: f32,
    pose: Pose,
    dimensions: EntityDimensions,
    bounding_box: Aabb,

    pub on_ground: bool,
    pub horizontal_collision: bool,
    pub vertical_collision: bool,
    pub fall_distance: f32,
    pub fluid_heights: FluidHeights,
    pub stuck_speed_multiplier: DVec3,
    /// Negative: cooldown before the entity can ignite. Zero: not burning. Positive: burning.
    pub fire_ticks: i32,
    pub ticks_frozen: i32,
    pub no_physics: bool,

    pub was_touching_water: bool,
    pub eyes_in_water: bool,
    pub swimming: bool,
    pub sprinting: bool,
    pub sneaking: bool,
    pub in_powder_snow: bool,
    pub was_in_powder_snow: bool,
    pub was_on_fire: bool,

    pub portal_cooldown: i32,
    pub age: u32,
    pub first_tick: bool,
    pub piston: PistonDeltas,

    pub walk_distance: f32,
    pub move_distance: f32,
    pub fly_distance: f32,
    pub next_step: f32,
    /// Block cells the box overlapped after the last move.
    pub(crate) last_contacts: Option<(IVec3, IVec3)>,
}

fn check(v: DVec3, error: fn(DVec3) -> InvalidInput) -> Result<DVec3, InvalidInput> {
    if v.is_finite() {
        Ok(v)
    } else {
        let error = error(v);
        warn!("discarding {error}");
        Err(error)
    }
}

impl Kinematics {
    /// A freshly spawned entity at rest.
    pub fn new(position: DVec3, profile: &MotionProfile) -> Result<Self, InvalidInput> {
        let position = check(position, InvalidInput::Position)?;
        let dimensions = profile.dimensions.dimensions(Pose::Standing);

        Ok(Self {
            position,
            previous_position: position,
            block_position: position.floor().as_ivec3(),
            motion: DVec3::ZERO,
            yaw: 0.0,
            pitch: 0.0,
            pose: Pose::Standing,
            dimensions,
            bounding_box: dimensions.make_box(position),
            on_ground: false,
            horizontal_collision: false,
            vertical_collision: false,
            fall_distance: 0.0,
            fluid_heights: FluidHeights::default(),
            stuck_speed_multiplier: DVec3::ZERO,
            fire_ticks: -profile.fire_immune_ticks,
            ticks_frozen: 0,
            no_physics: false,
            was_touching_water: false,
            eyes_in_water: false,
            swimming: false,
            sprinting: false,
            sneaking: false,
            in_powder_snow: false,
            was_in_powder_snow: false,
            was_on_fire: false,
            portal_cooldown: 0,
            age: 0,
            first_tick: true,
            piston: PistonDeltas::default(),
            walk_distance: 0.0,
            move_distance: 0.0,
            fly_distance: 0.0,
            next_step: 1.0,
            last_contacts: None,
        })
    }

    #[must_use]
    pub const fn position(&self) -> DVec3 {
        self.position
    }

    #[must_use]
    pub const fn previous_position(&self) -> DVec3 {
        self.previous_position
    }

    #[must_use]
    pub const fn block_position(&self) -> IVec3 {
        self.block_position
    }

    #[must_use]
    pub const fn motion(&self) -> DVec3 {
        self.motion
    }

    #[must_use]
    pub const fn bounding_box(&self) -> Aabb {
        self.bounding_box
    }

    #[must_use]
    pub const fn dimensions(&self) -> EntityDimensions {
        self.dimensions
    }

    #[must_use]
    pub const fn pose(&self) -> Pose {
        self.pose
    }

    #[must_use]
    pub const fn rotation(&self) -> (f32, f32) {
        (self.yaw, self.pitch)
    }

    #[must_use]
    pub fn eye_y(&self) -> f64 {
        self.position.y + self.dimensions.eye_height
    }

    /// The block the entity stands on, sampled just below its feet.
    #[must_use]
    pub fn on_pos(&self) -> IVec3 {
        DVec3::new(self.position.x, self.position.y - 0.2, self.position.z)
            .floor()
            .as_ivec3()
    }

    /// What block shapes may ask about this entity.
    #[must_use]
    pub const fn collision_context(&self) -> CollisionContext {
        CollisionContext {
            descending: self.sneaking,
            entity_bottom: self.bounding_box.min.y,
        }
    }

    pub fn set_position(&mut self, position: DVec3) -> Result<(), InvalidInput> {
        let position = check(position, InvalidInput::Position)?;
        self.position = position;
        self.block_position = position.floor().as_ivec3();
        self.bounding_box = self.dimensions.make_box(position);
        Ok(())
    }

    /// Moves the entity and clears its interpolation history.
    pub fn teleport(&mut self, position: DVec3) -> Result<(), InvalidInput> {
        self.set_position(position)?;
        self.previous_position = self.position;
        self.last_contacts = None;
        Ok(())
    }

    pub(crate) fn translate(&mut self, displacement: DVec3) -> Result<(), InvalidInput> {
        let displacement = check(displacement, InvalidInput::Displacement)?;
        self.set_position(self.position + displacement)
    }

    pub(crate) const fn remember_position(&mut self) {
        self.previous_position = self.position;
    }

    pub fn set_motion(&mut self, motion: DVec3) -> Result<(), InvalidInput> {
        self.motion = check(motion, InvalidInput::Motion)?;
        Ok(())
    }

    /// Adds an external impulse such as knockback or an explosion push.
    pub fn push(&mut self, impulse: DVec3) -> Result<(), InvalidInput> {
        let impulse = check(impulse, InvalidInput::Motion)?;
        self.set_motion(self.motion + impulse)
    }

    /// Sets yaw (wrapped into `[-180, 180)`) and pitch (clamped to `[-90, 90]`).
    pub fn set_rotation(&mut self, yaw: f32, pitch: f32) -> Result<(), InvalidInput> {
        if !yaw.is_finite() || !pitch.is_finite() {
            let error = InvalidInput::Rotation { yaw, pitch };
            warn!("discarding {error}");
            return Err(error);
        }
        self.yaw = (yaw + 180.0).rem_euclid(360.0) - 180.0;
        self.pitch = pitch.clamp(-90.0, 90.0);
        Ok(())
    }

    pub fn set_pose(&mut self, pose: Pose, sizer: &impl PoseSizer) {
        self.pose = pose;
        self.set_dimensions(sizer.dimensions(pose));
    }

    pub fn set_dimensions(&mut self, dimensions: EntityDimensions) {
        self.dimensions = dimensions;
        self.bounding_box = dimensions.make_box(self.position);
    }

    #[must_use]
    pub const fn is_on_fire(&self) -> bool {
        self.fire_ticks > 0
    }

    #[must_use]
    pub const fn is_in_water(&self) -> bool {
        self.was_touching_water
    }

    #[must_use]
    pub fn is_in_lava(&self) -> bool {
        self.fluid_heights.get(FluidKind::Lava) > 0.0
    }

    /// Rain and water both count as wet.
    #[must_use]
    pub const fn is_wet(&self, raining: bool) -> bool {
        self.was_touching_water || raining
    }

    /// Sets the entity on fire for at least `ticks`.
    pub const fn ignite_for(&mut self, ticks: i32) {
        if self.fire_ticks < ticks {
            self.fire_ticks = ticks;
        }
    }

    #[must_use]
    pub const fn is_fully_frozen(&self, required: i32) -> bool {
        required > 0 && self.ticks_frozen >= required
    }

    /// Caught in a cobweb-like block: the next move is scaled by `multiplier`.
    pub const fn make_stuck(&mut self, multiplier: DVec3) {
        self.fall_distance = 0.0;
        self.stuck_speed_multiplier = multiplier;
    }

    /// Mirrors `axis_hit` onto `motion`: axes the last move was blocked on lose their velocity.
    pub(crate) fn zero_motion_on(&mut self, axes: [bool; 3]) {
        for axis in Axis::ALL {
            if axes[axis.index()] {
                axis.set(&mut self.motion, 0.0);
            }
        }
    }
}
