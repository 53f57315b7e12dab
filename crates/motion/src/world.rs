//! What the motion code needs to know about the world around an entity.

use derive_more::{Display, From};
use enumset::EnumSetType;
use geometry::{Aabb, HasAabb, VoxelShape};
use glam::{DVec3, IVec3};
use serde::{Deserialize, Serialize};

use crate::QueryError;

#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Display, From, Serialize, Deserialize,
)]
pub struct EntityId(u64);

#[derive(Debug, Hash, Serialize, Deserialize, EnumSetType)]
pub enum FluidKind {
    Water,
    Lava,
}

/// The fluid occupying one block cell.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FluidState {
    pub kind: Option<FluidKind>,
    /// Height of the fluid surface above the bottom of the cell, in `[0, 1]`.
    pub height: f64,
    /// Direction the fluid flows in, or zero for still fluid.
    pub flow: DVec3,
}

impl FluidState {
    pub const EMPTY: Self = Self {
        kind: None,
        height: 0.0,
        flow: DVec3::ZERO,
    };

    #[must_use]
    pub const fn still(kind: FluidKind, height: f64) -> Self {
        Self {
            kind: Some(kind),
            height,
            flow: DVec3::ZERO,
        }
    }

    #[must_use]
    pub fn is(&self, kind: FluidKind) -> bool {
        self.kind == Some(kind)
    }
}

impl Default for FluidState {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// What happens to an entity whose box overlaps a block.
#[derive(Copy, Clone, Debug, PartialEq, Default)]
pub enum Contact {
    #[default]
    Air,
    /// A non-air block with no effect on entities inside it.
    Inert,
    Fire {
        damage: f32,
    },
    PowderSnow,
    /// Cobwebs, berry bushes and the like scale the next movement.
    Sticky {
        multiplier: DVec3,
    },
}

/// Another entity that moving entities collide with.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CollidableBox {
    pub id: EntityId,
    pub aabb: Aabb,
}

impl HasAabb for CollidableBox {
    fn aabb(&self) -> Aabb {
        self.aabb
    }
}

/// Slack allowed when deciding whether an entity stands above a block's top face.
const ABOVE_TOLERANCE: f64 = 1.0e-5;

/// Facts about the moving entity that some block shapes depend on (scaffolding lets a sneaking
/// entity descend, and is only solid to entities above it).
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CollisionContext {
    pub descending: bool,
    /// Bottom of the entity's box.
    pub entity_bottom: f64,
}

impl CollisionContext {
    /// The context used for queries with no entity attached.
    pub const EMPTY: Self = Self {
        descending: false,
        entity_bottom: f64::NEG_INFINITY,
    };

    #[must_use]
    pub fn is_above(&self, shape: &VoxelShape, pos: IVec3) -> bool {
        shape
            .max_y()
            .is_some_and(|top| self.entity_bottom > f64::from(pos.y) + top - ABOVE_TOLERANCE)
    }
}

/// Extent used for the open sides of the world border's collision slabs.
const BORDER_REACH: f64 = 1.0e8;

/// A square border centred on `center`, with side length `size`.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorldBorder {
    pub center_x: f64,
    pub center_z: f64,
    pub size: f64,
}

impl Default for WorldBorder {
    fn default() -> Self {
        Self {
            center_x: 0.0,
            center_z: 0.0,
            size: 59_999_968.0,
        }
    }
}

impl WorldBorder {
    #[must_use]
    pub fn min_x(&self) -> f64 {
        self.center_x - self.size / 2.0
    }

    #[must_use]
    pub fn max_x(&self) -> f64 {
        self.center_x + self.size / 2.0
    }

    #[must_use]
    pub fn min_z(&self) -> f64 {
        self.center_z - self.size / 2.0
    }

    #[must_use]
    pub fn max_z(&self) -> f64 {
        self.center_z + self.size / 2.0
    }

    /// `true` when the horizontal extent of `aabb` lies inside the border.
    #[must_use]
    pub fn contains(&self, aabb: &Aabb) -> bool {
        aabb.min.x >= self.min_x()
            && aabb.max.x <= self.max_x()
            && aabb.min.z >= self.min_z()
            && aabb.max.z <= self.max_z()
    }

    /// Everything outside the border, as four disjoint slabs.
    #[must_use]
    pub fn shape(&self) -> VoxelShape {
        let (min_x, max_x) = (self.min_x(), self.max_x());
        let (min_z, max_z) = (self.min_z(), self.max_z());
        let far = BORDER_REACH;

        VoxelShape::from_disjoint([
            Aabb::new((-far, -far, -far), (min_x, far, far)),
            Aabb::new((max_x, -far, -far), (far, far, far)),
            Aabb::new((min_x, -far, -far), (max_x, far, min_z)),
            Aabb::new((min_x, -far, max_z), (max_x, far, far)),
        ])
    }
}

/// Read access to blocks, fluids and other entities.
///
/// Every block query may fail; the motion code never treats a failed query as air.
pub trait World {
    /// The collision shape of the block at `pos`, or `None` if the block is not loaded. Unloaded
    /// blocks collide as full cubes.
    fn shape_at(
        &self,
        pos: IVec3,
        context: &CollisionContext,
    ) -> Result<Option<VoxelShape>, QueryError>;

    fn fluid_at(&self, pos: IVec3) -> Result<FluidState, QueryError>;

    fn contact_at(&self, pos: IVec3) -> Result<Contact, QueryError>;

    /// Collidable entities whose boxes intersect `query`, other than `excluding`.
    fn entities_near(
        &self,
        query: &Aabb,
        excluding: EntityId,
    ) -> Result<Vec<CollidableBox>, QueryError>;

    fn world_border(&self) -> WorldBorder {
        WorldBorder::default()
    }

    /// `true` when every column in the inclusive range is loaded.
    fn is_area_loaded(&self, min: IVec3, max: IVec3) -> bool;

    fn is_raining_at(&self, _pos: IVec3) -> bool {
        false
    }

    fn min_build_height(&self) -> i32 {
        -64
    }

    /// Nether-like dimensions where lava flows faster.
    fn ultra_warm(&self) -> bool {
        false
    }

    /// Friction of the block an entity stands on.
    fn friction_at(&self, _pos: IVec3) -> Option<f64> {
        None
    }
}

#[cfg(test)]
mod tests {
    use geometry::{Aabb, VoxelShape};
    use glam::{DVec3, IVec3};

    use super::*;

    #[test]
    fn border_shape_surrounds_interior() {
        let border = WorldBorder {
            center_x: 0.0,
            center_z: 0.0,
            size: 20.0,
        };
        let shape = border.shape();
        let inside = Aabb::create(DVec3::new(0.0, 64.0, 0.0), 0.6, 1.8);

        assert!(border.contains(&inside));
        assert!(shape.boxes().iter().all(|slab| !slab.intersects(&inside)));

        let straddling = Aabb::create(DVec3::new(10.0, 64.0, 0.0), 0.6, 1.8);
        assert!(!border.contains(&straddling));
        assert!(shape.boxes().iter().any(|slab| slab.intersects(&straddling)));
    }

    #[test]
    fn context_is_above_top_face() {
        let context = CollisionContext {
            descending: false,
            entity_bottom: 3.0,
        };
        assert!(context.is_above(&VoxelShape::block(), IVec3::new(0, 2, 0)));
        assert!(!context.is_above(&VoxelShape::block(), IVec3::new(0, 3, 0)));
        assert!(!CollisionContext::EMPTY.is_above(&VoxelShape::block(), IVec3::ZERO));
        assert!(!context.is_above(&VoxelShape::empty(), IVec3::ZERO));
    }
}
